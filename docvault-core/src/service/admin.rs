//! Permission administration.
//!
//! Folder entry lists are edited in place. Document entry lists are
//! versioned: additive grants append to the current revision, while modify
//! and delete always re-issue the current revision through the revision
//! manager so archived snapshots keep the entries they had.

use uuid::Uuid;

use super::DocumentService;
use crate::auth::Principal;
use crate::error::{Error, Result};
use crate::events::Event;
use crate::permissions::{PermissionEntry, PermissionMode, PermissionSubject, SubjectRef};
use crate::revisions::{self, PermissionChange};
use crate::storage::{EntryLocation, NodeKind};

impl DocumentService {
    /// Grant a capability on a folder or on a document's current revision.
    /// Requires Admin on the node; the subject must name exactly one
    /// existing user or role.
    pub async fn add_permission(
        &self,
        node_id: Uuid,
        subject: SubjectRef,
        mode: PermissionMode,
        principal: &Principal,
    ) -> Result<Uuid> {
        if mode.is_empty() {
            return Err(Error::InvalidArgument(
                "permission mode must not be empty".into(),
            ));
        }
        let subject = subject.validate()?;
        let mut store = self.store.write().await;
        match subject {
            PermissionSubject::User(id) if store.user(id).is_none() => {
                return Err(Error::NotFound("user"))
            }
            PermissionSubject::Role(id) if store.role(id).is_none() => {
                return Err(Error::NotFound("role"))
            }
            _ => {}
        }
        let node = store.get(node_id).ok_or(Error::NotFound("node"))?;
        if !node.grants(principal, PermissionMode::ADMIN) {
            return Err(Error::Forbidden);
        }
        let entry = PermissionEntry::new(subject, mode);
        let entry_id = entry.id;
        if let Some(node) = store.get_mut(node_id) {
            match &mut node.kind {
                NodeKind::Folder(folder) => folder.permissions.push(entry),
                // additive grants append to the current revision in place
                NodeKind::Document(body) => body.current_mut().permissions.push(entry),
            }
        }
        drop(store);
        tracing::debug!(%node_id, %entry_id, "permission granted");
        self.events.send(Event::PermissionAdded {
            node: node_id,
            entry: entry_id,
        });
        Ok(entry_id)
    }

    /// Rewrite the mode of an existing entry. Document entries are cloned
    /// into a new revision; `InvalidState` if the entry is archived.
    pub async fn modify_permission(
        &self,
        entry_id: Uuid,
        new_mode: PermissionMode,
        principal: &Principal,
    ) -> Result<()> {
        if new_mode.is_empty() {
            return Err(Error::InvalidArgument(
                "permission mode must not be empty".into(),
            ));
        }
        let node_id = self
            .change_permission(entry_id, PermissionChange::SetMode(new_mode), principal)
            .await?;
        self.events.send(Event::PermissionModified {
            node: node_id,
            entry: entry_id,
        });
        Ok(())
    }

    /// Remove an existing entry, with the same clone semantics as
    /// `modify_permission`.
    pub async fn delete_permission(&self, entry_id: Uuid, principal: &Principal) -> Result<()> {
        let node_id = self
            .change_permission(entry_id, PermissionChange::Delete, principal)
            .await?;
        self.events.send(Event::PermissionRemoved {
            node: node_id,
            entry: entry_id,
        });
        Ok(())
    }

    async fn change_permission(
        &self,
        entry_id: Uuid,
        change: PermissionChange,
        principal: &Principal,
    ) -> Result<Uuid> {
        let mut store = self.store.write().await;
        let location = store
            .locate_entry(entry_id)
            .ok_or(Error::NotFound("permission entry"))?;
        match location {
            EntryLocation::Folder { folder_id } => {
                let folder = store.folder(folder_id)?;
                if !folder.grants(principal, PermissionMode::ADMIN) {
                    return Err(Error::Forbidden);
                }
                if let Some(node) = store.get_mut(folder_id) {
                    if let NodeKind::Folder(body) = &mut node.kind {
                        match change {
                            PermissionChange::SetMode(mode) => {
                                if let Some(entry) =
                                    body.permissions.iter_mut().find(|e| e.id == entry_id)
                                {
                                    entry.mode = mode;
                                }
                            }
                            PermissionChange::Delete => {
                                body.permissions.retain(|e| e.id != entry_id)
                            }
                        }
                    }
                }
                tracing::debug!(%folder_id, %entry_id, "folder permission changed");
                Ok(folder_id)
            }
            EntryLocation::Revision { document_id, .. } => {
                let node = store.document(document_id)?;
                if !node.grants(principal, PermissionMode::ADMIN) {
                    return Err(Error::Forbidden);
                }
                let node = store.get_mut(document_id).ok_or(Error::NotFound("document"))?;
                let NodeKind::Document(body) = &mut node.kind else {
                    return Err(Error::NotFound("document"));
                };
                revisions::clone_with_permission_change(body, document_id, entry_id, change)?;
                tracing::debug!(%document_id, %entry_id, "document permission re-issued");
                Ok(document_id)
            }
        }
    }

    /// List the entries on a node. Requires Read and Admin on the parent
    /// folder rather than the node itself; the root, having no parent,
    /// falls back to its own surface.
    pub async fn get_permissions(
        &self,
        node_id: Uuid,
        principal: &Principal,
    ) -> Result<Vec<PermissionEntry>> {
        let store = self.store.read().await;
        let node = store.get(node_id).ok_or(Error::NotFound("node"))?;
        let gate = match node.parent_id {
            Some(parent_id) => store.folder(parent_id)?,
            None => node,
        };
        if !gate.grants(principal, PermissionMode::READ | PermissionMode::ADMIN) {
            return Err(Error::Forbidden);
        }
        Ok(node.authoritative_entries().to_vec())
    }
}
