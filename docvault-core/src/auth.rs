//! Principal resolution.
//!
//! Token issuance and password handling live outside this crate; the only
//! contract here is mapping an opaque caller identity to a resolved
//! principal or reporting that the caller is unknown.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::storage::{NodeStore, User};

/// Resolved caller identity: user id, display name and role memberships.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub name: String,
    pub roles: HashSet<Uuid>,
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            roles: user.roles.clone(),
        }
    }
}

#[async_trait]
pub trait PrincipalResolver: Send + Sync {
    /// Map an opaque caller identity to a principal.
    async fn resolve(&self, caller: &str) -> Result<Principal>;
}

/// Resolver backed by the user directory in the node store.
pub struct DirectoryResolver {
    store: Arc<RwLock<NodeStore>>,
}

impl DirectoryResolver {
    pub fn new(store: Arc<RwLock<NodeStore>>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl PrincipalResolver for DirectoryResolver {
    async fn resolve(&self, caller: &str) -> Result<Principal> {
        let store = self.store.read().await;
        store
            .user_by_name(caller)
            .map(Principal::from)
            .ok_or(Error::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_known_users_and_rejects_strangers() {
        let mut store = NodeStore::new();
        let user_id = store.add_user("alice").unwrap();
        let role_id = store.add_role("staff").unwrap();
        store.assign_role(user_id, role_id).unwrap();

        let resolver = DirectoryResolver::new(Arc::new(RwLock::new(store)));
        let principal = resolver.resolve("alice").await.unwrap();
        assert_eq!(principal.id, user_id);
        assert!(principal.roles.contains(&role_id));

        assert!(matches!(
            resolver.resolve("mallory").await,
            Err(Error::Unauthenticated)
        ));
    }
}
