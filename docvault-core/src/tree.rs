//! Permission-filtered tree listing and name search.
//!
//! Access-denied subtrees are omitted from results instead of surfacing
//! per-subtree errors; only the entry folder of a call is allowed to fail.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use uuid::Uuid;

use crate::auth::Principal;
use crate::error::{Error, Result};
use crate::permissions::{PermissionEntry, PermissionMode};
use crate::storage::{Node, NodeKind, NodeStore};

/// Listing row for a single node. `created`/`updated` come from document
/// metadata; folders carry none.
#[derive(Clone, Debug, Serialize)]
pub struct NodeSummary {
    pub id: Uuid,
    pub name: String,
    pub folder: bool,
    pub owner_name: Option<String>,
    pub permissions: Vec<PermissionEntry>,
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
}

/// One folder of the listing: its own summary plus visible children.
#[derive(Clone, Debug, Serialize)]
pub struct TreeFolder {
    pub summary: NodeSummary,
    pub children: Vec<TreeEntry>,
}

/// Child of a listed folder. Documents and unreadable child folders appear
/// as plain summaries; readable child folders are expanded.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind")]
pub enum TreeEntry {
    Folder(TreeFolder),
    Leaf(NodeSummary),
}

/// A search match and the folder path it was found under.
#[derive(Clone, Debug, Serialize)]
pub struct SearchHit {
    pub summary: NodeSummary,
    pub location: String,
}

/// Recursive listing of the subtree under `folder_id`.
///
/// The entry folder must exist and grant Read. Below it, every child is
/// summarized; recursion descends only into child folders that separately
/// grant Read, and denied subtrees stay collapsed without erroring.
pub fn folder_tree(
    store: &NodeStore,
    folder_id: Uuid,
    principal: &Principal,
) -> Result<TreeFolder> {
    let folder = store.folder(folder_id)?;
    if !folder.grants(principal, PermissionMode::READ) {
        return Err(Error::Forbidden);
    }
    let mut visited = HashSet::new();
    Ok(expand(store, folder, principal, &mut visited))
}

fn expand(
    store: &NodeStore,
    folder: &Node,
    principal: &Principal,
    visited: &mut HashSet<Uuid>,
) -> TreeFolder {
    visited.insert(folder.id);
    let mut children = Vec::new();
    for child in store.children(folder.id) {
        let readable_folder = child.is_folder() && child.grants(principal, PermissionMode::READ);
        if readable_folder && !visited.contains(&child.id) {
            children.push(TreeEntry::Folder(expand(store, child, principal, visited)));
        } else {
            children.push(TreeEntry::Leaf(summarize(store, child)));
        }
    }
    TreeFolder {
        summary: summarize(store, folder),
        children,
    }
}

/// Case-sensitive name search under `folder_id`, gated like `folder_tree`.
/// Hits come back in traversal order with the containing folder path.
pub fn search(
    store: &NodeStore,
    folder_id: Uuid,
    principal: &Principal,
    term: &str,
) -> Result<Vec<SearchHit>> {
    let folder = store.folder(folder_id)?;
    if !folder.grants(principal, PermissionMode::READ) {
        return Err(Error::Forbidden);
    }
    let mut visited = HashSet::new();
    let mut hits = Vec::new();
    walk(store, folder, principal, term, &mut visited, &mut hits);
    Ok(hits)
}

fn walk(
    store: &NodeStore,
    folder: &Node,
    principal: &Principal,
    term: &str,
    visited: &mut HashSet<Uuid>,
    hits: &mut Vec<SearchHit>,
) {
    visited.insert(folder.id);
    for child in store.children(folder.id) {
        if child.name.contains(term) {
            hits.push(SearchHit {
                summary: summarize(store, child),
                location: location_of(store, child),
            });
        }
        if child.is_folder()
            && child.grants(principal, PermissionMode::READ)
            && !visited.contains(&child.id)
        {
            walk(store, child, principal, term, visited, hits);
        }
    }
}

fn summarize(store: &NodeStore, node: &Node) -> NodeSummary {
    let (created, updated) = match &node.kind {
        NodeKind::Document(doc) => (Some(doc.metadata.created), doc.metadata.updated),
        NodeKind::Folder(_) => (None, None),
    };
    NodeSummary {
        id: node.id,
        name: node.name.clone(),
        folder: node.is_folder(),
        owner_name: node
            .owner_id
            .and_then(|id| store.user(id))
            .map(|user| user.name.clone()),
        permissions: node.authoritative_entries().to_vec(),
        created,
        updated,
    }
}

/// Parent path below the root, `/`-joined with a leading slash: a node at
/// `root/A/B` reports `/A/B`.
fn location_of(store: &NodeStore, node: &Node) -> String {
    let mut names = Vec::new();
    let mut seen = HashSet::new();
    let mut current = node.parent_id;
    while let Some(id) = current {
        if !seen.insert(id) {
            break;
        }
        let Some(parent) = store.get(id) else { break };
        if parent.parent_id.is_some() {
            names.push(parent.name.clone());
        }
        current = parent.parent_id;
    }
    names.reverse();
    format!("/{}", names.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::PermissionSubject;
    use crate::storage::{DocumentBody, FolderBody, Metadata};
    use crate::revisions;

    fn principal(id: Uuid) -> Principal {
        Principal {
            id,
            name: "tester".to_string(),
            roles: HashSet::new(),
        }
    }

    fn add_folder(store: &mut NodeStore, parent: Uuid, name: &str, owner: Option<Uuid>) -> Uuid {
        let node = Node {
            id: Uuid::new_v4(),
            name: name.to_string(),
            parent_id: Some(parent),
            owner_id: owner,
            kind: NodeKind::Folder(FolderBody::default()),
        };
        let id = node.id;
        store.insert(node);
        id
    }

    fn add_document(store: &mut NodeStore, parent: Uuid, name: &str, owner: Option<Uuid>) -> Uuid {
        let id = Uuid::new_v4();
        let mut body = DocumentBody {
            metadata: Metadata::now(),
            revisions: Vec::new(),
        };
        revisions::append_content_revision(&mut body, id, format!("blob-{id}"), Vec::new());
        store.insert(Node {
            id,
            name: name.to_string(),
            parent_id: Some(parent),
            owner_id: owner,
            kind: NodeKind::Document(body),
        });
        id
    }

    fn grant_read(store: &mut NodeStore, folder_id: Uuid, user: Uuid) {
        let node = store.get_mut(folder_id).unwrap();
        let NodeKind::Folder(body) = &mut node.kind else {
            unreachable!()
        };
        body.permissions.push(PermissionEntry::new(
            PermissionSubject::User(user),
            PermissionMode::READ,
        ));
    }

    #[test]
    fn listing_requires_read_on_the_entry_folder() {
        let store = NodeStore::new();
        let stranger = principal(Uuid::new_v4());
        assert!(matches!(
            folder_tree(&store, store.root_id(), &stranger),
            Err(Error::Forbidden)
        ));
        assert!(matches!(
            folder_tree(&store, Uuid::new_v4(), &stranger),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn denied_child_folders_stay_collapsed() {
        let owner = Uuid::new_v4();
        let mut store = NodeStore::new();
        let root = store.root_id();
        let mine = add_folder(&mut store, root, "mine", Some(owner));
        let theirs = add_folder(&mut store, root, "theirs", Some(Uuid::new_v4()));
        add_document(&mut store, mine, "inner.txt", Some(owner));
        add_document(&mut store, theirs, "secret.txt", Some(Uuid::new_v4()));
        grant_read(&mut store, root, owner);

        let tree = folder_tree(&store, root, &principal(owner)).unwrap();
        assert_eq!(tree.children.len(), 2);
        match &tree.children[0] {
            TreeEntry::Folder(folder) => {
                assert_eq!(folder.summary.name, "mine");
                assert_eq!(folder.children.len(), 1);
            }
            other => panic!("expected expanded folder, got {other:?}"),
        }
        // the foreign folder is listed but never expanded
        match &tree.children[1] {
            TreeEntry::Leaf(summary) => assert_eq!(summary.name, "theirs"),
            other => panic!("expected collapsed folder, got {other:?}"),
        }
    }

    #[test]
    fn summaries_carry_owner_and_metadata() {
        let mut store = NodeStore::new();
        let root = store.root_id();
        let owner = store.add_user("user1").unwrap();
        let doc = add_document(&mut store, root, "a.txt", Some(owner));
        grant_read(&mut store, root, owner);

        let tree = folder_tree(&store, root, &principal(owner)).unwrap();
        let TreeEntry::Leaf(summary) = &tree.children[0] else {
            panic!("expected document leaf");
        };
        assert_eq!(summary.id, doc);
        assert_eq!(summary.owner_name.as_deref(), Some("user1"));
        assert!(summary.created.is_some());
        assert!(summary.updated.is_none());
        // the folder row itself has no metadata
        assert!(tree.summary.created.is_none());
    }

    #[test]
    fn search_reports_the_containing_folder_path() {
        let owner = Uuid::new_v4();
        let mut store = NodeStore::new();
        let root = store.root_id();
        grant_read(&mut store, root, owner);
        let a = add_folder(&mut store, root, "A", Some(owner));
        let b = add_folder(&mut store, a, "B", Some(owner));
        add_document(&mut store, b, "doc1", Some(owner));

        let hits = search(&store, root, &principal(owner), "doc").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].summary.name, "doc1");
        assert_eq!(hits[0].location, "/A/B");
    }

    #[test]
    fn search_is_case_sensitive_and_matches_folders_too() {
        let owner = Uuid::new_v4();
        let mut store = NodeStore::new();
        let root = store.root_id();
        grant_read(&mut store, root, owner);
        add_folder(&mut store, root, "reports", Some(owner));
        add_document(&mut store, root, "Report.txt", Some(owner));

        let hits = search(&store, root, &principal(owner), "report").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].summary.name, "reports");
        assert_eq!(hits[0].location, "/");
    }

    #[test]
    fn search_does_not_descend_into_denied_folders() {
        let owner = Uuid::new_v4();
        let mut store = NodeStore::new();
        let root = store.root_id();
        grant_read(&mut store, root, owner);
        let closed = add_folder(&mut store, root, "closed", Some(Uuid::new_v4()));
        add_document(&mut store, closed, "doc-hidden", Some(Uuid::new_v4()));

        let hits = search(&store, root, &principal(owner), "doc").unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn traversal_survives_a_parent_cycle() {
        let owner = Uuid::new_v4();
        let mut store = NodeStore::new();
        let root = store.root_id();
        grant_read(&mut store, root, owner);
        let a = add_folder(&mut store, root, "a", Some(owner));
        let b = add_folder(&mut store, a, "b", Some(owner));
        // corrupt the parent chain into a cycle
        store.get_mut(a).unwrap().parent_id = Some(b);

        let hits = search(&store, b, &principal(owner), "").unwrap();
        assert!(!hits.is_empty());
        let tree = folder_tree(&store, a, &principal(owner)).unwrap();
        assert_eq!(tree.summary.name, "a");
    }
}
