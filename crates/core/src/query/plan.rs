use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::buc::BucketFilter;
use crate::ctx::Context;
use crate::err::Error;
use crate::iam::Action;

/// A reference from a compiled query to one bucket.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct BucketAccess {
	pub filter: BucketFilter,
	pub action: Action,
}

impl BucketAccess {
	pub fn read(filter: BucketFilter) -> Self {
		Self {
			filter,
			action: Action::Read,
		}
	}

	pub fn write(filter: BucketFilter) -> Self {
		Self {
			filter,
			action: Action::Write,
		}
	}
}

/// The bucket references of a compiled query.
///
/// Accesses are de-duplicated when the plan is built, keeping the order in
/// which the compiler reported them.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CompiledPlan {
	accesses: Vec<BucketAccess>,
}

impl CompiledPlan {
	pub fn new(accesses: impl IntoIterator<Item = BucketAccess>) -> Self {
		let mut out: Vec<BucketAccess> = Vec::new();
		for access in accesses {
			if !out.contains(&access) {
				out.push(access);
			}
		}
		Self {
			accesses: out,
		}
	}

	pub fn accesses(&self) -> &[BucketAccess] {
		&self.accesses
	}

	/// The buckets read by the query
	pub fn reads(&self) -> impl Iterator<Item = &BucketFilter> {
		self.by_action(Action::Read)
	}

	/// The buckets written by the query
	pub fn writes(&self) -> impl Iterator<Item = &BucketFilter> {
		self.by_action(Action::Write)
	}

	fn by_action(&self, action: Action) -> impl Iterator<Item = &BucketFilter> {
		self.accesses.iter().filter(move |a| a.action == action).map(|a| &a.filter)
	}
}

/// Compiles query scripts into plans.
#[async_trait]
pub trait Compiler: Send + Sync {
	/// Compile a script as of the given time
	async fn compile(&self, ctx: &Context, script: &str, now: DateTime<Utc>)
	-> Result<CompiledPlan, Error>;
}
