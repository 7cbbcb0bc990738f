//! Predicates which add ownership to documents as they are created, and
//! which select the documents a principal may access.
//!
//! Principals carrying explicit permissions are checked against those
//! permissions. Every other principal is checked through its user's
//! organization memberships. Inactive principals are always rejected.

use std::sync::Arc;

use super::index::DocumentIndex;
use super::OwnerType;
use crate::err::Error;
use crate::iam::{Action, Authorizer, Id, Permission, ResourceType};

/// Runs against a document as it is created or updated.
pub type CreateOption = Box<dyn Fn(Id, &dyn DocumentIndex) -> Result<(), Error> + Send + Sync>;

/// Selects the IDs of documents.
pub type FindOption = Box<dyn Fn(&dyn DocumentIndex) -> Result<Vec<Id>, Error> + Send + Sync>;

fn unauthorized(message: &str) -> Error {
	Error::Unauthorized(message.to_owned())
}

/// Removes repeated IDs, keeping the first occurrence of each
fn dedup(ids: Vec<Id>) -> Vec<Id> {
	let mut out = Vec::with_capacity(ids.len());
	for id in ids {
		if !out.contains(&id) {
			out.push(id);
		}
	}
	out
}

/// Checks whether explicit permissions cover a document with the given owners
fn covers(permissions: &[Permission], doc: Id, owners: &[Id], writes_only: bool) -> bool {
	permissions.iter().filter(|p| !writes_only || p.action != Action::Read).any(|p| {
		let r = &p.resource;
		if r.kind != ResourceType::Documents {
			return false;
		}
		// A permission on the document itself, or on every document
		if r.id == Some(doc) || r.is_unscoped() {
			return true;
		}
		r.is_org_scoped() && matches!(r.org_id, Some(org) if owners.contains(&org))
	})
}

/// Adds the named organization as an owner
pub fn with_org(org: impl Into<String>) -> CreateOption {
	let org = org.into();
	Box::new(move |id, idx| {
		let oid = idx.find_organization_by_name(&org)?;
		idx.add_document_owner(id, OwnerType::Org, oid)
	})
}

/// Requires the principal to have write access to the document
pub fn authorized(auth: Arc<dyn Authorizer>) -> CreateOption {
	Box::new(move |id, idx| {
		if !auth.is_active() {
			return Err(unauthorized("authorizer cannot access document"));
		}
		let owners = idx.documents_accessors(id)?;
		let Some(permissions) = auth.permissions() else {
			let user = auth.user_id();
			if owners.iter().any(|org| idx.is_org_accessor(user, *org).is_ok()) {
				return Ok(());
			}
			return Err(unauthorized("authorizer cannot access document"));
		};
		if covers(permissions, id, &owners, true) {
			return Ok(());
		}
		trace!("Permission failed for {}: write access to document {id}", auth.identity());
		Err(unauthorized("authorization cannot access document"))
	})
}

/// Adds the named organization as an owner, if the principal may write
/// documents in it
pub fn authorized_with_org(auth: Arc<dyn Authorizer>, org: impl Into<String>) -> CreateOption {
	let org = org.into();
	Box::new(move |id, idx| {
		if !auth.is_active() {
			return Err(unauthorized("authorization cannot add org as document owner"));
		}
		let oid = idx.find_organization_by_name(&org)?;
		if auth.permissions().is_none() {
			idx.is_org_accessor(auth.user_id(), oid)?;
			return idx.add_document_owner(id, OwnerType::Org, oid);
		}
		let permission = Permission::new(Action::Write, ResourceType::Documents, oid);
		if !auth.allowed(&permission) {
			trace!("Permission failed for {}: {permission}", auth.identity());
			return Err(unauthorized("authorization cannot add org as document owner"));
		}
		idx.add_document_owner(id, OwnerType::Org, oid)
	})
}

/// Selects the documents owned by the named organization
pub fn where_org(org: impl Into<String>) -> FindOption {
	let org = org.into();
	Box::new(move |idx| {
		let oid = idx.find_organization_by_name(&org)?;
		Ok(dedup(idx.accessors_documents(OwnerType::Org, oid)?))
	})
}

/// Selects a single document
pub fn where_id(doc: Id) -> FindOption {
	Box::new(move |_| Ok(vec![doc]))
}

/// Selects every document the principal may access
pub fn authorized_where(auth: Arc<dyn Authorizer>) -> FindOption {
	Box::new(move |idx| {
		if !auth.is_active() {
			return Err(unauthorized("authorizer cannot access documents"));
		}
		let mut ids = Vec::new();
		let Some(permissions) = auth.permissions() else {
			let user = auth.user_id();
			ids.extend(idx.accessors_documents(OwnerType::User, user)?);
			for org in idx.users_orgs(user)? {
				ids.extend(idx.accessors_documents(OwnerType::Org, org)?);
			}
			return Ok(dedup(ids));
		};
		for p in permissions.iter().filter(|p| p.resource.kind == ResourceType::Documents) {
			match (p.resource.id, p.resource.org_id) {
				(Some(id), _) => ids.push(id),
				(None, Some(org)) => ids.extend(idx.accessors_documents(OwnerType::Org, org)?),
				(None, None) => (),
			}
		}
		Ok(dedup(ids))
	})
}

/// Selects the documents of the named organization, if the principal may
/// read the organization
pub fn authorized_where_org(auth: Arc<dyn Authorizer>, org: impl Into<String>) -> FindOption {
	let org = org.into();
	Box::new(move |idx| {
		if !auth.is_active() {
			return Err(unauthorized("authorizer cannot access documents"));
		}
		let oid = idx.find_organization_by_name(&org)?;
		if auth.permissions().is_none() {
			idx.is_org_accessor(auth.user_id(), oid)?;
		} else {
			let permission = Permission::new(Action::Read, ResourceType::Orgs, oid);
			if !auth.allowed(&permission) {
				trace!("Permission failed for {}: {permission}", auth.identity());
				return Err(unauthorized("authorizer cannot access documents"));
			}
		}
		Ok(dedup(idx.accessors_documents(OwnerType::Org, oid)?))
	})
}

/// Selects a single document, if the principal may access it
pub fn authorized_where_id(auth: Arc<dyn Authorizer>, doc: Id) -> FindOption {
	Box::new(move |idx| {
		if !auth.is_active() {
			return Err(unauthorized("authorizer cannot access documents"));
		}
		let owners = idx.documents_accessors(doc)?;
		let Some(permissions) = auth.permissions() else {
			let user = auth.user_id();
			if owners.iter().any(|org| idx.is_org_accessor(user, *org).is_ok()) {
				return Ok(vec![doc]);
			}
			return Err(unauthorized("authorizer cannot access document"));
		};
		if covers(permissions, doc, &owners, false) {
			return Ok(vec![doc]);
		}
		Err(unauthorized("authorization cannot access document"))
	})
}
