use std::sync::Arc;

use crate::buc::{Bucket, BucketFilter, BucketService};
use crate::ctx::Context;
use crate::err::Error;
use crate::iam::{Action, Authorizer, Permission, ResourceType};
use crate::query::plan::CompiledPlan;

const TARGET: &str = "fluxgate::core::query::preauth";

/// Checks the bucket references of a compiled query against a principal
/// before the query is allowed to run or be stored.
///
/// Authorization is all or nothing. Every bucket read by the plan is checked
/// before any bucket it writes, and the first bucket which is not allowed
/// rejects the whole plan.
#[derive(Clone)]
pub struct PreAuthorizer {
	buckets: Arc<dyn BucketService>,
}

impl PreAuthorizer {
	pub fn new(buckets: Arc<dyn BucketService>) -> Self {
		Self {
			buckets,
		}
	}

	#[instrument(level = "trace", target = "fluxgate::core::query::preauth", name = "PreAuthorizer.pre_authorize", skip_all, fields(identity = %auth.identity()))]
	pub async fn pre_authorize(
		&self,
		ctx: &Context,
		plan: &CompiledPlan,
		auth: &dyn Authorizer,
	) -> Result<(), Error> {
		let mut checked: Vec<(Bucket, Action)> = Vec::new();
		let accesses =
			plan.reads().map(|f| (f, Action::Read)).chain(plan.writes().map(|f| (f, Action::Write)));
		for (filter, action) in accesses {
			let bucket = self.resolve(ctx, filter).await?;
			if checked.iter().any(|(b, a)| b.id == bucket.id && *a == action) {
				continue;
			}
			let permission =
				Permission::at_id(bucket.id, action, ResourceType::Buckets, bucket.org_id);
			if !auth.allowed(&permission) {
				trace!(target: TARGET, "Permission failed for {}: {}", auth.identity(), permission);
				return Err(Error::BucketNotAllowed {
					action,
					bucket: bucket.name,
					org_id: bucket.org_id,
				});
			}
			checked.push((bucket, action));
		}
		Ok(())
	}

	async fn resolve(&self, ctx: &Context, filter: &BucketFilter) -> Result<Bucket, Error> {
		self.buckets.find_bucket(ctx, filter).await.map_err(|e| Error::BucketLookup {
			filter: filter.to_string(),
			source: Box::new(e),
		})
	}
}
