//! Documents and the ownership graph which decides who may access them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::iam::Id;

pub mod auth;
pub mod index;
pub mod store;

pub use self::auth::{CreateOption, FindOption};
pub use self::index::{DocumentIndex, MemoryIndex};
pub use self::store::{DocumentService, DocumentStore, MemoryDocumentService, MemoryDocumentStore};

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct DocumentMeta {
	pub name: String,
}

/// A stored JSON document, such as a dashboard template.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
	pub id: Id,
	pub meta: DocumentMeta,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<serde_json::Value>,
}

/// The kind of node owning a document.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerType {
	Org,
	User,
}

impl fmt::Display for OwnerType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Org => write!(f, "org"),
			Self::User => write!(f, "user"),
		}
	}
}
