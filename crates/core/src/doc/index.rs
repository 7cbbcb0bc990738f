use std::collections::BTreeMap;

use parking_lot::{Mutex, RwLock};

use super::OwnerType;
use crate::err::Error;
use crate::iam::Id;

/// The ownership graph between documents and their owners.
///
/// Documents are owned by organizations and users. The index can be walked
/// from an owner to its documents, and from a document to its owners.
pub trait DocumentIndex: Send + Sync {
	fn add_document_owner(&self, doc: Id, owner_type: OwnerType, owner: Id) -> Result<(), Error>;

	fn remove_document_owner(&self, doc: Id, owner_type: OwnerType, owner: Id) -> Result<(), Error>;

	/// The documents owned by an owner
	fn accessors_documents(&self, owner_type: OwnerType, owner: Id) -> Result<Vec<Id>, Error>;

	/// The owners of a document, empty for a document without owners
	fn documents_accessors(&self, doc: Id) -> Result<Vec<Id>, Error>;

	/// The organizations a user is a member of
	fn users_orgs(&self, user: Id) -> Result<Vec<Id>, Error>;

	/// Succeeds if the user is a member of the organization
	fn is_org_accessor(&self, user: Id, org: Id) -> Result<(), Error>;

	fn find_organization_by_name(&self, name: &str) -> Result<Id, Error>;
}

#[derive(Default)]
struct Graph {
	// Owners of each document, in the order they were added
	owners: BTreeMap<Id, Vec<(OwnerType, Id)>>,
	// Organization IDs by name
	orgs: BTreeMap<String, Id>,
	// Organizations of each user
	members: BTreeMap<Id, Vec<Id>>,
}

/// An in memory [`DocumentIndex`].
#[derive(Default)]
pub struct MemoryIndex {
	graph: RwLock<Graph>,
}

impl MemoryIndex {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add_org(&self, name: impl Into<String>, id: Id) {
		self.graph.write().orgs.insert(name.into(), id);
	}

	pub fn add_member(&self, user: Id, org: Id) {
		let mut graph = self.graph.write();
		let orgs = graph.members.entry(user).or_default();
		if !orgs.contains(&org) {
			orgs.push(org);
		}
	}

	/// Removes a document and all of its ownership edges
	pub fn remove_document(&self, doc: Id) {
		self.graph.write().owners.remove(&doc);
	}
}

impl DocumentIndex for MemoryIndex {
	fn add_document_owner(&self, doc: Id, owner_type: OwnerType, owner: Id) -> Result<(), Error> {
		let mut graph = self.graph.write();
		let owners = graph.owners.entry(doc).or_default();
		if !owners.contains(&(owner_type, owner)) {
			owners.push((owner_type, owner));
		}
		Ok(())
	}

	fn remove_document_owner(&self, doc: Id, owner_type: OwnerType, owner: Id) -> Result<(), Error> {
		let mut graph = self.graph.write();
		let owners = graph.owners.get_mut(&doc).ok_or_else(|| Error::NotFound("document".into()))?;
		owners.retain(|o| *o != (owner_type, owner));
		Ok(())
	}

	fn accessors_documents(&self, owner_type: OwnerType, owner: Id) -> Result<Vec<Id>, Error> {
		let graph = self.graph.read();
		let docs = graph
			.owners
			.iter()
			.filter(|(_, owners)| owners.contains(&(owner_type, owner)))
			.map(|(doc, _)| *doc)
			.collect();
		Ok(docs)
	}

	fn documents_accessors(&self, doc: Id) -> Result<Vec<Id>, Error> {
		let graph = self.graph.read();
		let owners = graph.owners.get(&doc).map(|owners| owners.iter().map(|(_, id)| *id).collect());
		Ok(owners.unwrap_or_default())
	}

	fn users_orgs(&self, user: Id) -> Result<Vec<Id>, Error> {
		Ok(self.graph.read().members.get(&user).cloned().unwrap_or_default())
	}

	fn is_org_accessor(&self, user: Id, org: Id) -> Result<(), Error> {
		let graph = self.graph.read();
		match graph.members.get(&user) {
			Some(orgs) if orgs.contains(&org) => Ok(()),
			_ => Err(Error::Unauthorized(format!("user {user} is not a member of organization {org}"))),
		}
	}

	fn find_organization_by_name(&self, name: &str) -> Result<Id, Error> {
		self.graph.read().orgs.get(name).copied().ok_or_else(|| Error::NotFound("organization".into()))
	}
}

enum Staged {
	Add(Id, OwnerType, Id),
	Remove(Id, OwnerType, Id),
}

/// Records ownership changes against an index without applying them.
///
/// Ownership reads see the underlying index with the recorded changes laid
/// over it, in the order they were made. The recorded changes are applied
/// with [`StagedIndex::commit`], or discarded when the staging is dropped.
pub(crate) struct StagedIndex<'a> {
	index: &'a dyn DocumentIndex,
	changes: Mutex<Vec<Staged>>,
}

impl<'a> StagedIndex<'a> {
	pub(crate) fn new(index: &'a dyn DocumentIndex) -> Self {
		Self {
			index,
			changes: Mutex::new(Vec::new()),
		}
	}

	pub(crate) fn commit(self) -> Result<(), Error> {
		for change in self.changes.into_inner() {
			match change {
				Staged::Add(doc, kind, owner) => self.index.add_document_owner(doc, kind, owner)?,
				Staged::Remove(doc, kind, owner) => self.index.remove_document_owner(doc, kind, owner)?,
			}
		}
		Ok(())
	}
}

impl DocumentIndex for StagedIndex<'_> {
	fn add_document_owner(&self, doc: Id, owner_type: OwnerType, owner: Id) -> Result<(), Error> {
		self.changes.lock().push(Staged::Add(doc, owner_type, owner));
		Ok(())
	}

	fn remove_document_owner(&self, doc: Id, owner_type: OwnerType, owner: Id) -> Result<(), Error> {
		self.changes.lock().push(Staged::Remove(doc, owner_type, owner));
		Ok(())
	}

	fn accessors_documents(&self, owner_type: OwnerType, owner: Id) -> Result<Vec<Id>, Error> {
		let mut docs = self.index.accessors_documents(owner_type, owner)?;
		for change in self.changes.lock().iter() {
			match *change {
				Staged::Add(doc, kind, o) if kind == owner_type && o == owner => {
					if !docs.contains(&doc) {
						docs.push(doc);
					}
				}
				Staged::Remove(doc, kind, o) if kind == owner_type && o == owner => {
					docs.retain(|d| *d != doc);
				}
				_ => (),
			}
		}
		Ok(docs)
	}

	fn documents_accessors(&self, doc: Id) -> Result<Vec<Id>, Error> {
		let mut owners = self.index.documents_accessors(doc)?;
		for change in self.changes.lock().iter() {
			match *change {
				Staged::Add(d, _, owner) if d == doc => {
					if !owners.contains(&owner) {
						owners.push(owner);
					}
				}
				Staged::Remove(d, _, owner) if d == doc => owners.retain(|o| *o != owner),
				_ => (),
			}
		}
		Ok(owners)
	}

	fn users_orgs(&self, user: Id) -> Result<Vec<Id>, Error> {
		self.index.users_orgs(user)
	}

	fn is_org_accessor(&self, user: Id, org: Id) -> Result<(), Error> {
		self.index.is_org_accessor(user, org)
	}

	fn find_organization_by_name(&self, name: &str) -> Result<Id, Error> {
		self.index.find_organization_by_name(name)
	}
}
