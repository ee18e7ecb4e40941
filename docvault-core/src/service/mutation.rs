//! Create, update, move and delete operations on the node tree.

use bytes::Bytes;
use uuid::Uuid;

use super::{DocumentInfo, DocumentService, RevisionSummary};
use crate::auth::Principal;
use crate::error::{Error, Result};
use crate::events::Event;
use crate::permissions::PermissionMode;
use crate::revisions;
use crate::storage::{DocumentBody, FolderBody, Metadata, Node, NodeKind};

fn require_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidArgument("node name must not be empty".into()));
    }
    Ok(())
}

impl DocumentService {
    /// Create an empty folder under `parent_id`, owned by the caller.
    pub async fn create_folder(
        &self,
        parent_id: Uuid,
        name: &str,
        principal: &Principal,
    ) -> Result<Uuid> {
        require_name(name)?;
        let mut store = self.store.write().await;
        let parent = store.folder(parent_id)?;
        if !parent.grants(principal, PermissionMode::WRITE) {
            return Err(Error::Forbidden);
        }
        let node = Node {
            id: Uuid::new_v4(),
            name: name.to_string(),
            parent_id: Some(parent_id),
            owner_id: Some(principal.id),
            kind: NodeKind::Folder(FolderBody::default()),
        };
        let id = node.id;
        store.insert(node);
        drop(store);
        tracing::debug!(%id, parent = %parent_id, "folder created");
        self.events.send(Event::Created { id });
        Ok(id)
    }

    /// Create a document with one initial revision. The content blob is
    /// written before the node is committed, so a visible revision always
    /// resolves in the blob store; permissions are re-checked under the
    /// write guard because the lock was released during the blob write.
    pub async fn create_document(
        &self,
        parent_id: Uuid,
        name: &str,
        content: Bytes,
        principal: &Principal,
    ) -> Result<Uuid> {
        require_name(name)?;
        {
            let store = self.store.read().await;
            let parent = store.folder(parent_id)?;
            if !parent.grants(principal, PermissionMode::WRITE) {
                return Err(Error::Forbidden);
            }
        }
        let content_ref = Uuid::new_v4().to_string();
        self.blobs.put(&content_ref, content).await?;

        let mut store = self.store.write().await;
        let parent = store.folder(parent_id)?;
        if !parent.grants(principal, PermissionMode::WRITE) {
            return Err(Error::Forbidden);
        }
        let id = Uuid::new_v4();
        let mut body = DocumentBody {
            metadata: Metadata::now(),
            revisions: Vec::new(),
        };
        revisions::append_content_revision(&mut body, id, content_ref, Vec::new());
        store.insert(Node {
            id,
            name: name.to_string(),
            parent_id: Some(parent_id),
            owner_id: Some(principal.id),
            kind: NodeKind::Document(body),
        });
        drop(store);
        tracing::debug!(%id, parent = %parent_id, "document created");
        self.events.send(Event::Created { id });
        Ok(id)
    }

    /// Append a content revision, carrying the current permission set
    /// forward under fresh entry ids. Returns the new revision id.
    pub async fn update_document(
        &self,
        document_id: Uuid,
        content: Bytes,
        principal: &Principal,
    ) -> Result<Uuid> {
        {
            let store = self.store.read().await;
            let node = store.document(document_id)?;
            if !node.grants(principal, PermissionMode::WRITE) {
                return Err(Error::Forbidden);
            }
        }
        let content_ref = Uuid::new_v4().to_string();
        self.blobs.put(&content_ref, content).await?;

        let mut store = self.store.write().await;
        let node = store.get_mut(document_id).ok_or(Error::NotFound("document"))?;
        if !node.grants(principal, PermissionMode::WRITE) {
            return Err(Error::Forbidden);
        }
        let NodeKind::Document(body) = &mut node.kind else {
            return Err(Error::NotFound("document"));
        };
        let carried: Vec<_> = body
            .current()
            .permissions
            .iter()
            .map(|entry| entry.duplicate())
            .collect();
        let revision = revisions::append_content_revision(body, document_id, content_ref, carried);
        let revision_id = revision.id;
        drop(store);
        tracing::debug!(%document_id, %revision_id, "content revision appended");
        self.events.send(Event::Updated { id: document_id });
        Ok(revision_id)
    }

    /// Metadata and revision history; requires Read on the current revision.
    pub async fn get_document_info(
        &self,
        document_id: Uuid,
        principal: &Principal,
    ) -> Result<DocumentInfo> {
        let store = self.store.read().await;
        let node = store.document(document_id)?;
        if !node.grants(principal, PermissionMode::READ) {
            return Err(Error::Forbidden);
        }
        let NodeKind::Document(body) = &node.kind else {
            return Err(Error::NotFound("document"));
        };
        Ok(DocumentInfo {
            id: node.id,
            name: node.name.clone(),
            created: body.metadata.created,
            updated: body.metadata.updated,
            revisions: body
                .revisions
                .iter()
                .map(|revision| RevisionSummary {
                    id: revision.id,
                    created: revision.created,
                })
                .collect(),
        })
    }

    /// Fetch the current revision's content; requires Read on it.
    pub async fn get_document_content(
        &self,
        document_id: Uuid,
        principal: &Principal,
    ) -> Result<Bytes> {
        let content_ref = {
            let store = self.store.read().await;
            let node = store.document(document_id)?;
            if !node.grants(principal, PermissionMode::READ) {
                return Err(Error::Forbidden);
            }
            let NodeKind::Document(body) = &node.kind else {
                return Err(Error::NotFound("document"));
            };
            body.current().content_ref.clone()
        };
        self.blobs.get(&content_ref).await.map_err(|err| match err {
            // a committed revision must resolve; a missing blob is corruption
            Error::NotFound(_) => {
                Error::Internal("content blob missing for committed revision".into())
            }
            other => other,
        })
    }

    /// Re-parent and/or rename a node. Requires Write on the node, its
    /// current parent, and the destination when relocating. All checks run
    /// before any change; a failed move leaves the node where it was.
    pub async fn move_node(
        &self,
        node_id: Uuid,
        dest_folder_id: Option<Uuid>,
        new_name: Option<&str>,
        principal: &Principal,
    ) -> Result<()> {
        if let Some(name) = new_name {
            require_name(name)?;
        }
        let mut store = self.store.write().await;
        let node = store.get(node_id).ok_or(Error::NotFound("node"))?;
        if node_id == store.root_id() {
            return Err(Error::InvalidArgument(
                "the root folder cannot be moved".into(),
            ));
        }
        if !node.grants(principal, PermissionMode::WRITE) {
            return Err(Error::Forbidden);
        }
        let parent_id = node.parent_id.ok_or(Error::NotFound("parent folder"))?;
        let parent = store.folder(parent_id)?;
        if !parent.grants(principal, PermissionMode::WRITE) {
            return Err(Error::Forbidden);
        }
        if let Some(dest) = dest_folder_id {
            if dest != parent_id {
                let dest_node = store.get(dest).ok_or(Error::NotFound("destination folder"))?;
                if !dest_node.is_folder() {
                    return Err(Error::InvalidArgument(
                        "destination is not a folder".into(),
                    ));
                }
                if !dest_node.grants(principal, PermissionMode::WRITE) {
                    return Err(Error::Forbidden);
                }
                if store.descendant_ids(node_id).contains(&dest) {
                    return Err(Error::InvalidArgument(
                        "cannot move a folder into its own descendant".into(),
                    ));
                }
            }
        }

        if let Some(node) = store.get_mut(node_id) {
            if let Some(dest) = dest_folder_id {
                node.parent_id = Some(dest);
            }
            if let Some(name) = new_name {
                node.name = name.to_string();
            }
        }
        let new_parent = dest_folder_id.unwrap_or(parent_id);
        drop(store);
        tracing::debug!(%node_id, %new_parent, "node moved");
        self.events.send(Event::Moved {
            id: node_id,
            new_parent,
        });
        Ok(())
    }

    /// Delete a node, cascading to every descendant with their revisions
    /// and permission entries. Requires Write on the node and its parent.
    pub async fn delete_node(&self, node_id: Uuid, principal: &Principal) -> Result<()> {
        let mut store = self.store.write().await;
        let node = store.get(node_id).ok_or(Error::NotFound("node"))?;
        if node_id == store.root_id() {
            return Err(Error::InvalidArgument(
                "the root folder cannot be deleted".into(),
            ));
        }
        if !node.grants(principal, PermissionMode::WRITE) {
            return Err(Error::Forbidden);
        }
        let parent_id = node.parent_id.ok_or(Error::NotFound("parent folder"))?;
        let parent = store.folder(parent_id)?;
        if !parent.grants(principal, PermissionMode::WRITE) {
            return Err(Error::Forbidden);
        }
        let removed = store.remove_subtree(node_id);
        drop(store);
        tracing::info!(%node_id, removed, "node deleted");
        self.events.send(Event::Deleted { id: node_id });
        Ok(())
    }
}
