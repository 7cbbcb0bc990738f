use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::auth::{CreateOption, FindOption};
use super::index::{DocumentIndex, MemoryIndex, StagedIndex};
use super::{Document, DocumentMeta};
use crate::ctx::Context;
use crate::err::Error;
use crate::iam::Id;

/// A named collection of documents.
///
/// Create options run against every document that is created or updated,
/// and any failure rejects the write. Find options each select a set of
/// document IDs, and only the documents selected by every option are
/// returned.
#[async_trait]
pub trait DocumentStore: Send + Sync {
	async fn create_document(
		&self,
		ctx: &Context,
		meta: DocumentMeta,
		data: Option<serde_json::Value>,
		opts: &[CreateOption],
	) -> Result<Document, Error>;

	async fn update_document(&self, ctx: &Context, doc: Document, opts: &[CreateOption]) -> Result<(), Error>;

	async fn find_documents(&self, ctx: &Context, opts: &[FindOption]) -> Result<Vec<Document>, Error>;

	async fn delete_documents(&self, ctx: &Context, opts: &[FindOption]) -> Result<(), Error>;
}

/// Creates and finds document stores by name.
#[async_trait]
pub trait DocumentService: Send + Sync {
	/// Create the named store, or return it if it already exists
	async fn create_document_store(&self, ctx: &Context, name: &str) -> Result<Arc<dyn DocumentStore>, Error>;

	async fn find_document_store(&self, ctx: &Context, name: &str) -> Result<Arc<dyn DocumentStore>, Error>;
}

/// An in memory [`DocumentStore`] over a shared [`MemoryIndex`].
pub struct MemoryDocumentStore {
	name: String,
	index: Arc<MemoryIndex>,
	ids: Arc<AtomicU64>,
	docs: RwLock<BTreeMap<Id, Document>>,
}

impl MemoryDocumentStore {
	pub fn new(name: impl Into<String>, index: Arc<MemoryIndex>) -> Self {
		Self::with_ids(name, index, Arc::new(AtomicU64::new(1)))
	}

	fn with_ids(name: impl Into<String>, index: Arc<MemoryIndex>, ids: Arc<AtomicU64>) -> Self {
		Self {
			name: name.into(),
			index,
			ids,
			docs: RwLock::new(BTreeMap::new()),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	fn next_id(&self) -> Result<Id, Error> {
		let v = self.ids.fetch_add(1, Ordering::Relaxed);
		Id::new(v).ok_or_else(|| Error::Internal("document identifiers exhausted".into()))
	}

	/// Runs the options against a staging of the index, applying the
	/// ownership changes only if every option succeeds
	fn apply(&self, id: Id, opts: &[CreateOption]) -> Result<(), Error> {
		let staged = StagedIndex::new(self.index.as_ref());
		for opt in opts {
			opt(id, &staged)?;
		}
		staged.commit()
	}

	/// The IDs selected by every option, in the order of the first
	fn select(&self, opts: &[FindOption]) -> Result<Vec<Id>, Error> {
		let index: &dyn DocumentIndex = self.index.as_ref();
		let mut selected: Option<Vec<Id>> = None;
		for opt in opts {
			let ids = opt(index)?;
			selected = Some(match selected {
				None => ids,
				Some(prev) => prev.into_iter().filter(|id| ids.contains(id)).collect(),
			});
		}
		Ok(selected.unwrap_or_else(|| self.docs.read().keys().copied().collect()))
	}
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
	#[instrument(level = "trace", target = "fluxgate::core::doc", name = "DocumentStore.create_document", skip_all, fields(store = %self.name))]
	async fn create_document(
		&self,
		_ctx: &Context,
		meta: DocumentMeta,
		data: Option<serde_json::Value>,
		opts: &[CreateOption],
	) -> Result<Document, Error> {
		let id = self.next_id()?;
		self.apply(id, opts)?;
		let doc = Document {
			id,
			meta,
			data,
		};
		self.docs.write().insert(id, doc.clone());
		Ok(doc)
	}

	#[instrument(level = "trace", target = "fluxgate::core::doc", name = "DocumentStore.update_document", skip_all, fields(store = %self.name, id = %doc.id))]
	async fn update_document(&self, _ctx: &Context, doc: Document, opts: &[CreateOption]) -> Result<(), Error> {
		if !self.docs.read().contains_key(&doc.id) {
			return Err(Error::NotFound("document".into()));
		}
		self.apply(doc.id, opts)?;
		self.docs.write().insert(doc.id, doc);
		Ok(())
	}

	#[instrument(level = "trace", target = "fluxgate::core::doc", name = "DocumentStore.find_documents", skip_all, fields(store = %self.name))]
	async fn find_documents(&self, _ctx: &Context, opts: &[FindOption]) -> Result<Vec<Document>, Error> {
		let ids = self.select(opts)?;
		let docs = self.docs.read();
		Ok(ids.iter().filter_map(|id| docs.get(id).cloned()).collect())
	}

	#[instrument(level = "trace", target = "fluxgate::core::doc", name = "DocumentStore.delete_documents", skip_all, fields(store = %self.name))]
	async fn delete_documents(&self, _ctx: &Context, opts: &[FindOption]) -> Result<(), Error> {
		let ids = self.select(opts)?;
		let mut docs = self.docs.write();
		for id in ids {
			if docs.remove(&id).is_some() {
				self.index.remove_document(id);
			}
		}
		Ok(())
	}
}

/// An in memory [`DocumentService`]. All of its stores share one ownership
/// index and one identifier sequence.
pub struct MemoryDocumentService {
	index: Arc<MemoryIndex>,
	ids: Arc<AtomicU64>,
	stores: RwLock<BTreeMap<String, Arc<MemoryDocumentStore>>>,
}

impl MemoryDocumentService {
	pub fn new(index: Arc<MemoryIndex>) -> Self {
		Self {
			index,
			ids: Arc::new(AtomicU64::new(1)),
			stores: RwLock::new(BTreeMap::new()),
		}
	}
}

#[async_trait]
impl DocumentService for MemoryDocumentService {
	async fn create_document_store(&self, _ctx: &Context, name: &str) -> Result<Arc<dyn DocumentStore>, Error> {
		let mut stores = self.stores.write();
		let store = stores
			.entry(name.to_owned())
			.or_insert_with(|| {
				Arc::new(MemoryDocumentStore::with_ids(name, self.index.clone(), self.ids.clone()))
			})
			.clone();
		Ok(store)
	}

	async fn find_document_store(&self, _ctx: &Context, name: &str) -> Result<Arc<dyn DocumentStore>, Error> {
		match self.stores.read().get(name) {
			Some(store) => Ok(store.clone()),
			None => Err(Error::NotFound(format!("document store {name}"))),
		}
	}
}
