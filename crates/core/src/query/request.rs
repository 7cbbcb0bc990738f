use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::iam::{Authorization, Id};
use crate::query::encode::Dialect;

/// The source of a query, tagged with the language it is written in.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "compiler_type", rename_all = "lowercase")]
#[non_exhaustive]
pub enum QueryCompiler {
	Flux {
		query: String,
	},
	#[serde(rename = "influxql")]
	InfluxQl {
		query: String,
		#[serde(default)]
		db: String,
		#[serde(default)]
		rp: String,
		#[serde(default)]
		cluster: String,
	},
}

impl QueryCompiler {
	pub fn flux(query: impl Into<String>) -> Self {
		Self::Flux {
			query: query.into(),
		}
	}

	pub fn compiler_type(&self) -> &'static str {
		match self {
			Self::Flux {
				..
			} => "flux",
			Self::InfluxQl {
				..
			} => "influxql",
		}
	}

	/// The query source text
	pub fn script(&self) -> &str {
		match self {
			Self::Flux {
				query,
			} => query,
			Self::InfluxQl {
				query,
				..
			} => query,
		}
	}
}

/// A request to execute a query on behalf of an organization.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Request {
	/// The authorization the query executes with, if it was issued by a token
	#[serde(skip)]
	pub authorization: Option<Arc<Authorization>>,
	#[serde(rename = "organization_id")]
	pub organization_id: Id,
	pub compiler: QueryCompiler,
}

impl Request {
	pub fn new(organization_id: Id, compiler: QueryCompiler) -> Self {
		Self {
			authorization: None,
			organization_id,
			compiler,
		}
	}
}

/// A query request together with the dialect its results are encoded in.
#[derive(Clone)]
pub struct ProxyRequest {
	pub request: Request,
	pub dialect: Arc<dyn Dialect>,
}

impl ProxyRequest {
	pub fn new(request: Request, dialect: Arc<dyn Dialect>) -> Self {
		Self {
			request,
			dialect,
		}
	}
}

impl fmt::Debug for ProxyRequest {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ProxyRequest")
			.field("request", &self.request)
			.field("dialect", &self.dialect.name())
			.finish()
	}
}
