//! Operation facade. Every public operation resolves permissions and
//! applies its mutation under one arena guard, so a concurrent revocation
//! can never slip between check and act.

mod admin;
mod mutation;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::Principal;
use crate::blob::BlobStore;
use crate::error::Result;
use crate::events::EventBus;
use crate::storage::NodeStore;
use crate::tree::{self, SearchHit, TreeFolder};

/// Revision row of a document info response.
#[derive(Clone, Debug, Serialize)]
pub struct RevisionSummary {
    pub id: Uuid,
    pub created: DateTime<Utc>,
}

/// Metadata and revision history of a single document.
#[derive(Clone, Debug, Serialize)]
pub struct DocumentInfo {
    pub id: Uuid,
    pub name: String,
    pub created: DateTime<Utc>,
    pub updated: Option<DateTime<Utc>>,
    pub revisions: Vec<RevisionSummary>,
}

pub struct DocumentService {
    store: Arc<RwLock<NodeStore>>,
    blobs: Arc<dyn BlobStore>,
    events: EventBus,
}

impl DocumentService {
    pub fn new(store: Arc<RwLock<NodeStore>>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            store,
            blobs,
            events: EventBus::new(),
        }
    }

    pub fn store(&self) -> &Arc<RwLock<NodeStore>> {
        &self.store
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Permission-filtered listing of the subtree under `folder_id`.
    pub async fn folder_tree(
        &self,
        folder_id: Uuid,
        principal: &Principal,
    ) -> Result<TreeFolder> {
        let store = self.store.read().await;
        tree::folder_tree(&store, folder_id, principal)
    }

    /// Name search under `folder_id`, gated like `folder_tree`.
    pub async fn search(
        &self,
        folder_id: Uuid,
        principal: &Principal,
        term: &str,
    ) -> Result<Vec<SearchHit>> {
        let store = self.store.read().await;
        tree::search(&store, folder_id, principal, term)
    }
}
