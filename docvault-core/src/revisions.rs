//! Revision lifecycle: append-only content history and copy-on-write
//! permission snapshots.
//!
//! A document's permission state is versioned. Only the current revision's
//! entries are authoritative; once a revision is superseded its list is
//! frozen, so what was accessible for any archived content snapshot stays
//! reconstructable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::permissions::{PermissionEntry, PermissionMode};
use crate::storage::DocumentBody;

/// One content snapshot of a document. `content_ref` keys into the blob
/// store.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Revision {
    pub id: Uuid,
    pub created: DateTime<Utc>,
    pub document_id: Uuid,
    pub content_ref: String,
    pub permissions: Vec<PermissionEntry>,
}

/// Requested change to a single entry of the current revision.
#[derive(Clone, Copy, Debug)]
pub enum PermissionChange {
    SetMode(PermissionMode),
    Delete,
}

/// Append a revision carrying new content. The caller chooses the entry
/// list: empty for a newly created document, a copy of the current set for
/// an update. Stamps `metadata.updated` unless this is the first revision.
pub fn append_content_revision(
    doc: &mut DocumentBody,
    document_id: Uuid,
    content_ref: String,
    permissions: Vec<PermissionEntry>,
) -> &Revision {
    let now = Utc::now();
    let first = doc.revisions.is_empty();
    doc.revisions.push(Revision {
        id: Uuid::new_v4(),
        created: now,
        document_id,
        content_ref,
        permissions,
    });
    if !first {
        doc.metadata.updated = Some(now);
    }
    doc.current()
}

/// Re-issue the current revision with one entry changed.
///
/// Fails `InvalidState` unless `target_entry` belongs to the current
/// revision. The new revision reuses the same content blob; every
/// surviving entry is copied under a fresh id so the archived revision
/// keeps its own list untouched.
pub fn clone_with_permission_change(
    doc: &mut DocumentBody,
    document_id: Uuid,
    target_entry: Uuid,
    change: PermissionChange,
) -> Result<&Revision> {
    let current = doc.current();
    if !current.permissions.iter().any(|e| e.id == target_entry) {
        return Err(Error::InvalidState(
            "permission entry does not belong to the current revision".into(),
        ));
    }

    let content_ref = current.content_ref.clone();
    let mut permissions = Vec::with_capacity(current.permissions.len());
    for entry in &current.permissions {
        if entry.id == target_entry {
            match change {
                PermissionChange::Delete => {}
                PermissionChange::SetMode(mode) => {
                    let mut copy = entry.duplicate();
                    copy.mode = mode;
                    permissions.push(copy);
                }
            }
        } else {
            permissions.push(entry.duplicate());
        }
    }

    let now = Utc::now();
    doc.revisions.push(Revision {
        id: Uuid::new_v4(),
        created: now,
        document_id,
        content_ref,
        permissions,
    });
    doc.metadata.updated = Some(now);
    Ok(doc.current())
}
