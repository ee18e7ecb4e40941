//! Capability bitmask and the permission resolver shared by folders and
//! document revisions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use uuid::Uuid;

use crate::auth::Principal;
use crate::error::{Error, Result};

/// Capability bits a permission entry can grant.
#[derive(Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionMode(u8);

impl PermissionMode {
    pub const NONE: PermissionMode = PermissionMode(0);
    pub const WRITE: PermissionMode = PermissionMode(2);
    pub const READ: PermissionMode = PermissionMode(4);
    pub const ADMIN: PermissionMode = PermissionMode(8);

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when every bit of `other` is present in `self`.
    pub fn contains(self, other: PermissionMode) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for PermissionMode {
    type Output = PermissionMode;

    fn bitor(self, rhs: PermissionMode) -> PermissionMode {
        PermissionMode(self.0 | rhs.0)
    }
}

impl BitOrAssign for PermissionMode {
    fn bitor_assign(&mut self, rhs: PermissionMode) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for PermissionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.contains(PermissionMode::READ) {
            parts.push("Read");
        }
        if self.contains(PermissionMode::WRITE) {
            parts.push("Write");
        }
        if self.contains(PermissionMode::ADMIN) {
            parts.push("Admin");
        }
        if parts.is_empty() {
            parts.push("None");
        }
        write!(f, "{}", parts.join("|"))
    }
}

/// Grant subject: exactly one user or one role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionSubject {
    User(Uuid),
    Role(Uuid),
}

/// A capability grant attached to a folder or to a document revision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionEntry {
    pub id: Uuid,
    pub subject: PermissionSubject,
    pub mode: PermissionMode,
}

impl PermissionEntry {
    pub fn new(subject: PermissionSubject, mode: PermissionMode) -> Self {
        Self {
            id: Uuid::new_v4(),
            subject,
            mode,
        }
    }

    /// Copy of this entry under a fresh id, used when a revision clones its
    /// permission list.
    pub fn duplicate(&self) -> Self {
        Self {
            id: Uuid::new_v4(),
            subject: self.subject,
            mode: self.mode,
        }
    }
}

/// Unvalidated subject reference as supplied by callers.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct SubjectRef {
    pub user: Option<Uuid>,
    pub role: Option<Uuid>,
}

impl SubjectRef {
    pub fn user(id: Uuid) -> Self {
        Self {
            user: Some(id),
            role: None,
        }
    }

    pub fn role(id: Uuid) -> Self {
        Self {
            user: None,
            role: Some(id),
        }
    }

    /// A subject must name exactly one user or one role.
    pub fn validate(self) -> Result<PermissionSubject> {
        match (self.user, self.role) {
            (Some(user), None) => Ok(PermissionSubject::User(user)),
            (None, Some(role)) => Ok(PermissionSubject::Role(role)),
            _ => Err(Error::InvalidArgument(
                "permission subject must be exactly one user or role".into(),
            )),
        }
    }
}

/// Decide whether `principal` holds `requested` on a node or revision with
/// the given owner and entry list.
///
/// The owner holds every capability implicitly. Otherwise a single matched
/// entry must cover every requested bit; bits are never combined across
/// entries, so separate Read and Write grants do not add up to Read|Write.
pub fn has_permission(
    owner_id: Option<Uuid>,
    entries: &[PermissionEntry],
    principal: &Principal,
    requested: PermissionMode,
) -> bool {
    if owner_id == Some(principal.id) {
        return true;
    }
    entries
        .iter()
        .filter(|entry| match entry.subject {
            PermissionSubject::User(id) => id == principal.id,
            PermissionSubject::Role(id) => principal.roles.contains(&id),
        })
        .any(|entry| entry.mode.contains(requested))
}
