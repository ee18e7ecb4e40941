//! Node arena and user directory.
//!
//! Folders and documents share one identity record and live in a single
//! arena keyed by id. A folder's contents are derived by querying the arena
//! for nodes whose `parent_id` points at it, so there is no backing
//! collection to keep in sync with re-parenting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use uuid::Uuid;

use crate::auth::Principal;
use crate::error::{Error, Result};
use crate::permissions::{self, PermissionEntry, PermissionMode};
use crate::revisions::Revision;

pub const ROOT_NAME: &str = "root";

/// Creation and update stamps carried by documents.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Metadata {
    pub created: DateTime<Utc>,
    pub updated: Option<DateTime<Utc>>,
}

impl Metadata {
    pub fn now() -> Self {
        Self {
            created: Utc::now(),
            updated: None,
        }
    }
}

/// Folder payload: a permission list mutated in place.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FolderBody {
    pub permissions: Vec<PermissionEntry>,
}

/// Document payload: metadata plus the append-only revision history.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocumentBody {
    pub metadata: Metadata,
    pub revisions: Vec<Revision>,
}

impl DocumentBody {
    /// The authoritative revision. Revisions are append-only and stamped at
    /// creation, so the latest `created` is always the last element.
    pub fn current(&self) -> &Revision {
        self.revisions.last().expect("document has no revisions")
    }

    pub fn current_mut(&mut self) -> &mut Revision {
        self.revisions.last_mut().expect("document has no revisions")
    }
}

/// Variant payload distinguishing folders from documents.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum NodeKind {
    Folder(FolderBody),
    Document(DocumentBody),
}

/// Common identity and placement record for folders and documents.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Node {
    pub id: Uuid,
    pub name: String,
    pub parent_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
    pub kind: NodeKind,
}

impl Node {
    pub fn is_folder(&self) -> bool {
        matches!(self.kind, NodeKind::Folder(_))
    }

    pub fn is_document(&self) -> bool {
        matches!(self.kind, NodeKind::Document(_))
    }

    pub fn as_folder(&self) -> Option<&FolderBody> {
        match &self.kind {
            NodeKind::Folder(folder) => Some(folder),
            NodeKind::Document(_) => None,
        }
    }

    pub fn as_document(&self) -> Option<&DocumentBody> {
        match &self.kind {
            NodeKind::Document(doc) => Some(doc),
            NodeKind::Folder(_) => None,
        }
    }

    /// The entry list that governs access to this node right now: a
    /// folder's own list, or the document's current revision list.
    pub fn authoritative_entries(&self) -> &[PermissionEntry] {
        match &self.kind {
            NodeKind::Folder(folder) => &folder.permissions,
            NodeKind::Document(doc) => &doc.current().permissions,
        }
    }

    /// Does `principal` hold `mode` on this node? Folder and revision
    /// checks share one resolver, parameterized by owner and entries.
    pub fn grants(&self, principal: &Principal, mode: PermissionMode) -> bool {
        permissions::has_permission(self.owner_id, self.authoritative_entries(), principal, mode)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub roles: HashSet<Uuid>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
}

/// Where a permission entry lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryLocation {
    Folder {
        folder_id: Uuid,
    },
    Revision {
        document_id: Uuid,
        revision_id: Uuid,
        current: bool,
    },
}

/// In-memory arena over every entity the system persists: nodes keyed by
/// id plus the user/role directory.
#[derive(Debug, Serialize, Deserialize)]
pub struct NodeStore {
    nodes: HashMap<Uuid, Node>,
    users: HashMap<Uuid, User>,
    roles: HashMap<Uuid, Role>,
    root: Uuid,
}

impl NodeStore {
    /// Create a store holding the single well-known root folder. The root
    /// is unowned; access to it is granted through entries only.
    pub fn new() -> Self {
        let root = Node {
            id: Uuid::new_v4(),
            name: ROOT_NAME.to_string(),
            parent_id: None,
            owner_id: None,
            kind: NodeKind::Folder(FolderBody::default()),
        };
        let root_id = root.id;
        let mut nodes = HashMap::new();
        nodes.insert(root_id, root);
        Self {
            nodes,
            users: HashMap::new(),
            roles: HashMap::new(),
            root: root_id,
        }
    }

    pub fn root_id(&self) -> Uuid {
        self.root
    }

    pub fn get(&self, id: Uuid) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// The node at `id` when it exists and is a folder.
    pub fn folder(&self, id: Uuid) -> Result<&Node> {
        self.nodes
            .get(&id)
            .filter(|node| node.is_folder())
            .ok_or(Error::NotFound("folder"))
    }

    /// The node at `id` when it exists and is a document.
    pub fn document(&self, id: Uuid) -> Result<&Node> {
        self.nodes
            .get(&id)
            .filter(|node| node.is_document())
            .ok_or(Error::NotFound("document"))
    }

    pub fn insert(&mut self, node: Node) {
        self.nodes.insert(node.id, node);
    }

    /// Children of a folder, derived from the arena. Sorted by name so
    /// listings are stable across runs.
    pub fn children(&self, folder_id: Uuid) -> Vec<&Node> {
        let mut out: Vec<&Node> = self
            .nodes
            .values()
            .filter(|node| node.parent_id == Some(folder_id))
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        out
    }

    /// The subtree rooted at `id`, including `id` itself.
    pub fn descendant_ids(&self, id: Uuid) -> Vec<Uuid> {
        fn gather(store: &NodeStore, id: Uuid, seen: &mut HashSet<Uuid>, out: &mut Vec<Uuid>) {
            if !seen.insert(id) {
                return;
            }
            out.push(id);
            for child in store.children(id) {
                gather(store, child.id, seen, out);
            }
        }
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        gather(self, id, &mut seen, &mut out);
        out
    }

    /// Remove a node and every descendant, dropping their revisions and
    /// permission entries with them. Returns how many nodes were removed.
    pub fn remove_subtree(&mut self, id: Uuid) -> usize {
        let ids = self.descendant_ids(id);
        for id in &ids {
            self.nodes.remove(id);
        }
        ids.len()
    }

    /// Scan folders and revision histories for the entry with this id.
    pub fn locate_entry(&self, entry_id: Uuid) -> Option<EntryLocation> {
        for node in self.nodes.values() {
            match &node.kind {
                NodeKind::Folder(folder) => {
                    if folder.permissions.iter().any(|e| e.id == entry_id) {
                        return Some(EntryLocation::Folder { folder_id: node.id });
                    }
                }
                NodeKind::Document(doc) => {
                    let current_id = doc.current().id;
                    for revision in &doc.revisions {
                        if revision.permissions.iter().any(|e| e.id == entry_id) {
                            return Some(EntryLocation::Revision {
                                document_id: node.id,
                                revision_id: revision.id,
                                current: revision.id == current_id,
                            });
                        }
                    }
                }
            }
        }
        None
    }

    pub fn add_user(&mut self, name: &str) -> Result<Uuid> {
        if name.is_empty() {
            return Err(Error::InvalidArgument("user name must not be empty".into()));
        }
        if self.users.values().any(|user| user.name == name) {
            return Err(Error::InvalidArgument(format!(
                "user name '{name}' is already taken"
            )));
        }
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            roles: HashSet::new(),
        };
        let id = user.id;
        self.users.insert(id, user);
        Ok(id)
    }

    pub fn add_role(&mut self, name: &str) -> Result<Uuid> {
        if name.is_empty() {
            return Err(Error::InvalidArgument("role name must not be empty".into()));
        }
        if self.roles.values().any(|role| role.name == name) {
            return Err(Error::InvalidArgument(format!(
                "role name '{name}' is already taken"
            )));
        }
        let role = Role {
            id: Uuid::new_v4(),
            name: name.to_string(),
        };
        let id = role.id;
        self.roles.insert(id, role);
        Ok(id)
    }

    pub fn assign_role(&mut self, user_id: Uuid, role_id: Uuid) -> Result<()> {
        if !self.roles.contains_key(&role_id) {
            return Err(Error::NotFound("role"));
        }
        let user = self.users.get_mut(&user_id).ok_or(Error::NotFound("user"))?;
        user.roles.insert(role_id);
        Ok(())
    }

    pub fn user(&self, id: Uuid) -> Option<&User> {
        self.users.get(&id)
    }

    pub fn role(&self, id: Uuid) -> Option<&Role> {
        self.roles.get(&id)
    }

    pub fn user_by_name(&self, name: &str) -> Option<&User> {
        self.users.values().find(|user| user.name == name)
    }

    pub fn role_by_name(&self, name: &str) -> Option<&Role> {
        self.roles.values().find(|role| role.name == name)
    }

    /// Serialize the whole arena to a JSON snapshot on disk.
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, data)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Ok(serde_json::from_slice(&data)?)
    }
}

impl Default for NodeStore {
    fn default() -> Self {
        Self::new()
    }
}
