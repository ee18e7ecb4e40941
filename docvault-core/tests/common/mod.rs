//! Shared fixture: a service over an in-memory blob store, seeded with the
//! stock roles and users.

#![allow(dead_code)]

use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use docvault_core::auth::Principal;
use docvault_core::blob::MemoryBlobStore;
use docvault_core::permissions::{PermissionEntry, PermissionMode, PermissionSubject};
use docvault_core::service::DocumentService;
use docvault_core::storage::{NodeKind, NodeStore};

pub struct Fixture {
    pub service: DocumentService,
    pub store: Arc<RwLock<NodeStore>>,
    pub root: Uuid,
    pub user1: Principal,
    pub user2: Principal,
    pub anyone: Uuid,
    pub office: Uuid,
    pub management: Uuid,
}

pub fn fixture() -> Fixture {
    let mut store = NodeStore::new();
    let root = store.root_id();
    let anyone = store.add_role("Anyone").unwrap();
    let office = store.add_role("office").unwrap();
    let management = store.add_role("management").unwrap();
    let u1 = store.add_user("user1").unwrap();
    let u2 = store.add_user("user2").unwrap();
    store.assign_role(u1, management).unwrap();
    store.assign_role(u1, anyone).unwrap();
    store.assign_role(u2, office).unwrap();
    store.assign_role(u2, anyone).unwrap();
    let user1 = Principal::from(store.user(u1).unwrap());
    let user2 = Principal::from(store.user(u2).unwrap());

    let store = Arc::new(RwLock::new(store));
    let service = DocumentService::new(store.clone(), Arc::new(MemoryBlobStore::new()));
    Fixture {
        service,
        store,
        root,
        user1,
        user2,
        anyone,
        office,
        management,
    }
}

/// A principal that exists nowhere in the directory and holds no roles.
pub fn stranger() -> Principal {
    Principal {
        id: Uuid::new_v4(),
        name: "user3".to_string(),
        roles: Default::default(),
    }
}

/// Bootstrap grant applied directly to the arena, bypassing the admin
/// checks the tests themselves exercise.
pub async fn grant(
    store: &Arc<RwLock<NodeStore>>,
    node_id: Uuid,
    subject: PermissionSubject,
    mode: PermissionMode,
) -> Uuid {
    let mut store = store.write().await;
    let entry = PermissionEntry::new(subject, mode);
    let id = entry.id;
    let node = store.get_mut(node_id).unwrap();
    match &mut node.kind {
        NodeKind::Folder(folder) => folder.permissions.push(entry),
        NodeKind::Document(doc) => doc.current_mut().permissions.push(entry),
    }
    id
}
