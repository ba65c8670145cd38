//! # Arbre de contenu
//!
//! The content tree maps node ids to [`ContentNode`]s below a single root.
//! It is published as immutable [`TreeSnapshot`]s: writers assemble a new
//! version in a [`TreeBuilder`] and [`ContentTree::publish`] swaps it in with
//! one atomic pointer store. Readers call [`ContentTree::snapshot`] and answer
//! a whole request from that one version, so they never see a count that
//! disagrees with a child list, nor a child id whose node was discarded.
//!
//! ```text
//! 0 (root)
//! ├── 1-videos
//! │   └── video-<sha1(dir)>-<dir>      (one container per shared directory)
//! │       └── video-<sha1(file)>-<file>
//! ├── 2-images
//! └── 3-audio
//! ```

use crate::error::{Error, Result};
use crate::format::ContentGroup;
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Id du container racine
pub const ROOT_ID: &str = "0";

/// `parentID` annoncé pour la racine
pub const ROOT_PARENT_ID: &str = "-1";

/// Fichier sous-jacent d'un item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub path: PathBuf,
    pub mime: String,
    pub size: u64,
    pub group: ContentGroup,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Container {
        containers: Vec<String>,
        items: Vec<String>,
        child_count: u32,
    },
    Item(MediaFile),
}

/// A node of the content tree, exclusively owned by its snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentNode {
    pub id: String,
    /// `None` only for the root
    pub parent_id: Option<String>,
    pub title: String,
    pub kind: NodeKind,
}

impl ContentNode {
    fn container(id: &str, parent_id: Option<&str>, title: &str) -> Self {
        Self {
            id: id.to_string(),
            parent_id: parent_id.map(str::to_string),
            title: title.to_string(),
            kind: NodeKind::Container {
                containers: Vec::new(),
                items: Vec::new(),
                child_count: 0,
            },
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self.kind, NodeKind::Container { .. })
    }

    /// Child container ids and child item ids, in insertion order
    pub fn children(&self) -> Option<(&[String], &[String])> {
        match &self.kind {
            NodeKind::Container {
                containers, items, ..
            } => Some((containers, items)),
            NodeKind::Item(_) => None,
        }
    }

    pub fn child_count(&self) -> Option<u32> {
        match &self.kind {
            NodeKind::Container { child_count, .. } => Some(*child_count),
            NodeKind::Item(_) => None,
        }
    }

    pub fn media_file(&self) -> Option<&MediaFile> {
        match &self.kind {
            NodeKind::Item(file) => Some(file),
            NodeKind::Container { .. } => None,
        }
    }
}

/// Result of [`TreeBuilder::add_container`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerOutcome {
    Created,
    /// The id already existed: its children were discarded and it kept its place
    Reset,
}

/// One immutable version of the tree
#[derive(Debug, Clone)]
pub struct TreeSnapshot {
    nodes: HashMap<String, ContentNode>,
    item_count: usize,
    system_update_id: u32,
}

impl TreeSnapshot {
    pub fn root(&self) -> &ContentNode {
        // La racine est insérée par TreeBuilder::new et ne peut pas être retirée
        &self.nodes[ROOT_ID]
    }

    pub fn get_node(&self, id: &str) -> Option<&ContentNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ContentNode> {
        self.nodes.values()
    }

    /// Number of live nodes, root included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// True when nothing is attached under the root
    pub fn has_only_root(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Number of item (leaf) nodes
    pub fn item_count(&self) -> usize {
        self.item_count
    }

    /// Incremented on every publication, exposed as the ContentDirectory UpdateID
    pub fn system_update_id(&self) -> u32 {
        self.system_update_id
    }
}

/// Mutable working copy of the tree, private to one writer
#[derive(Debug, Clone)]
pub struct TreeBuilder {
    nodes: HashMap<String, ContentNode>,
    item_count: usize,
}

impl TreeBuilder {
    /// Creates a tree holding only the root container
    pub fn new(root_title: &str) -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(
            ROOT_ID.to_string(),
            ContentNode::container(ROOT_ID, None, root_title),
        );
        Self {
            nodes,
            item_count: 0,
        }
    }

    /// Starts from a copy of a published version
    pub fn from_snapshot(snapshot: &TreeSnapshot) -> Self {
        Self {
            nodes: snapshot.nodes.clone(),
            item_count: snapshot.item_count,
        }
    }

    pub fn get_node(&self, id: &str) -> Option<&ContentNode> {
        self.nodes.get(id)
    }

    pub fn item_count(&self) -> usize {
        self.item_count
    }

    /// Adds a container under `parent_id`, or resets it if `id` already exists
    ///
    /// A reset discards the container's whole subtree and zeroes its count but
    /// keeps its id, title, parent and position, so handles held by clients
    /// stay valid.
    pub fn add_container(
        &mut self,
        parent_id: &str,
        id: &str,
        title: &str,
    ) -> Result<ContainerOutcome> {
        if let Some(existing) = self.nodes.get(id) {
            let (containers, items) = existing
                .children()
                .ok_or_else(|| Error::NotAContainer(id.to_string()))?;
            let children: Vec<String> = containers.iter().chain(items).cloned().collect();
            for child in children {
                self.remove_subtree(&child);
            }
            if let Some(node) = self.nodes.get_mut(id) {
                node.kind = NodeKind::Container {
                    containers: Vec::new(),
                    items: Vec::new(),
                    child_count: 0,
                };
            }
            return Ok(ContainerOutcome::Reset);
        }

        self.attach(parent_id, id, true)?;
        self.nodes.insert(
            id.to_string(),
            ContentNode::container(id, Some(parent_id), title),
        );
        Ok(ContainerOutcome::Created)
    }

    /// Adds an item under `parent_id`, replacing any node with the same id
    pub fn add_item(&mut self, parent_id: &str, id: &str, title: &str, file: MediaFile) -> Result<()> {
        if self.nodes.contains_key(id) {
            self.discard(id);
        }

        self.attach(parent_id, id, false)?;
        self.nodes.insert(
            id.to_string(),
            ContentNode {
                id: id.to_string(),
                parent_id: Some(parent_id.to_string()),
                title: title.to_string(),
                kind: NodeKind::Item(file),
            },
        );
        self.item_count += 1;
        Ok(())
    }

    /// Removes a node and its subtree, detaching it from its parent
    ///
    /// Returns false when the id is unknown. The root cannot be discarded.
    pub fn discard(&mut self, id: &str) -> bool {
        if id == ROOT_ID {
            return false;
        }
        let Some(parent_id) = self.nodes.get(id).and_then(|n| n.parent_id.clone()) else {
            return false;
        };

        if let Some(NodeKind::Container {
            containers,
            items,
            child_count,
        }) = self.nodes.get_mut(&parent_id).map(|p| &mut p.kind)
        {
            let before = containers.len() + items.len();
            containers.retain(|c| c != id);
            items.retain(|i| i != id);
            let removed = before - (containers.len() + items.len());
            *child_count = child_count.saturating_sub(removed as u32);
        }

        self.remove_subtree(id);
        true
    }

    /// Registers `id` as a child of `parent_id` and bumps the parent's count
    fn attach(&mut self, parent_id: &str, id: &str, is_container: bool) -> Result<()> {
        let parent = self
            .nodes
            .get_mut(parent_id)
            .ok_or_else(|| Error::NotFound(parent_id.to_string()))?;
        match &mut parent.kind {
            NodeKind::Container {
                containers,
                items,
                child_count,
            } => {
                if is_container {
                    containers.push(id.to_string());
                } else {
                    items.push(id.to_string());
                }
                *child_count += 1;
                Ok(())
            }
            NodeKind::Item(_) => Err(Error::NotAContainer(parent_id.to_string())),
        }
    }

    /// Drops a node and all its descendants from the map, without touching the parent
    fn remove_subtree(&mut self, id: &str) {
        let mut pending = vec![id.to_string()];
        while let Some(current) = pending.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                match node.kind {
                    NodeKind::Container {
                        containers, items, ..
                    } => {
                        pending.extend(containers);
                        pending.extend(items);
                    }
                    NodeKind::Item(_) => self.item_count -= 1,
                }
            }
        }
    }

    fn into_snapshot(self, system_update_id: u32) -> TreeSnapshot {
        TreeSnapshot {
            nodes: self.nodes,
            item_count: self.item_count,
            system_update_id,
        }
    }
}

/// The shared content tree: many concurrent readers, one writer at a time
#[derive(Debug)]
pub struct ContentTree {
    current: ArcSwap<TreeSnapshot>,
    write_lock: Mutex<()>,
}

impl ContentTree {
    /// Creates a tree holding only the root container, at UpdateID 0
    pub fn new(root_title: &str) -> Self {
        Self {
            current: ArcSwap::from_pointee(TreeBuilder::new(root_title).into_snapshot(0)),
            write_lock: Mutex::new(()),
        }
    }

    /// Current version; stays valid and unchanged for as long as it is held
    pub fn snapshot(&self) -> Arc<TreeSnapshot> {
        self.current.load_full()
    }

    /// Replaces the whole tree with `builder`, returning the new UpdateID
    ///
    /// Nodes of the previous version that `builder` does not hold are gone
    /// for every reader that loads after this call.
    pub fn publish(&self, builder: TreeBuilder) -> u32 {
        let _guard = self.write_lock.lock();
        self.store(builder)
    }

    /// Applies `edit` to a copy of the current version and publishes it
    ///
    /// Nothing is published when `edit` fails.
    pub fn modify<R, F>(&self, edit: F) -> Result<R>
    where
        F: FnOnce(&mut TreeBuilder) -> Result<R>,
    {
        let _guard = self.write_lock.lock();
        let mut builder = TreeBuilder::from_snapshot(&self.current.load());
        let result = edit(&mut builder)?;
        self.store(builder);
        Ok(result)
    }

    fn store(&self, builder: TreeBuilder) -> u32 {
        let update_id = self.current.load().system_update_id.wrapping_add(1);
        self.current.store(Arc::new(builder.into_snapshot(update_id)));
        update_id
    }

    pub fn get_node(&self, id: &str) -> Option<ContentNode> {
        self.current.load().get_node(id).cloned()
    }

    pub fn root_title(&self) -> String {
        self.current.load().root().title.clone()
    }

    pub fn item_count(&self) -> usize {
        self.current.load().item_count()
    }

    pub fn system_update_id(&self) -> u32 {
        self.current.load().system_update_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str) -> MediaFile {
        MediaFile {
            path: PathBuf::from("/media").join(name),
            mime: "audio/mpeg".to_string(),
            size: 10,
            group: ContentGroup::Audio,
        }
    }

    fn assert_counts_consistent(nodes: &HashMap<String, ContentNode>) {
        for node in nodes.values() {
            if let NodeKind::Container {
                containers,
                items,
                child_count,
            } = &node.kind
            {
                assert_eq!(*child_count as usize, containers.len() + items.len(), "{}", node.id);
                for child in containers.iter().chain(items) {
                    let child = nodes.get(child).expect("dangling child id");
                    assert_eq!(child.parent_id.as_deref(), Some(node.id.as_str()));
                }
            }
        }
    }

    #[test]
    fn test_containers_and_items_keep_insertion_order() {
        let mut builder = TreeBuilder::new("Root");
        builder.add_item(ROOT_ID, "i1", "one", file("1.mp3")).unwrap();
        builder.add_container(ROOT_ID, "c1", "first").unwrap();
        builder.add_item(ROOT_ID, "i2", "two", file("2.mp3")).unwrap();
        builder.add_container(ROOT_ID, "c2", "second").unwrap();

        let root = builder.get_node(ROOT_ID).unwrap();
        let (containers, items) = root.children().unwrap();
        assert_eq!(containers, ["c1", "c2"]);
        assert_eq!(items, ["i1", "i2"]);
        assert_eq!(root.child_count(), Some(4));
        assert_eq!(builder.item_count(), 2);
        assert_counts_consistent(&builder.nodes);
    }

    #[test]
    fn test_existing_container_is_reset_in_place() {
        let mut builder = TreeBuilder::new("Root");
        builder.add_container(ROOT_ID, "a", "A").unwrap();
        builder.add_container(ROOT_ID, "b", "B").unwrap();
        builder.add_container("a", "a/sub", "Sub").unwrap();
        builder.add_item("a/sub", "a/sub/x", "x", file("x.mp3")).unwrap();
        builder.add_item("a", "a/y", "y", file("y.mp3")).unwrap();

        let outcome = builder.add_container(ROOT_ID, "a", "ignored").unwrap();

        assert_eq!(outcome, ContainerOutcome::Reset);
        let a = builder.get_node("a").unwrap();
        assert_eq!(a.title, "A");
        assert_eq!(a.child_count(), Some(0));
        assert!(builder.get_node("a/sub").is_none());
        assert!(builder.get_node("a/sub/x").is_none());
        assert!(builder.get_node("a/y").is_none());
        assert_eq!(builder.item_count(), 0);
        // la position sous la racine est conservée
        let (containers, _) = builder.get_node(ROOT_ID).unwrap().children().unwrap();
        assert_eq!(containers, ["a", "b"]);
        assert_counts_consistent(&builder.nodes);
    }

    #[test]
    fn test_discard_detaches_and_decrements_parent() {
        let mut builder = TreeBuilder::new("Root");
        builder.add_container(ROOT_ID, "dir", "dir").unwrap();
        builder.add_item("dir", "f1", "f1", file("f1.mp3")).unwrap();
        builder.add_item("dir", "f2", "f2", file("f2.mp3")).unwrap();

        assert!(builder.discard("f1"));
        assert!(!builder.discard("f1"));
        assert!(!builder.discard(ROOT_ID));

        let dir = builder.get_node("dir").unwrap();
        assert_eq!(dir.child_count(), Some(1));
        assert_eq!(dir.children().unwrap().1, ["f2"]);
        assert_eq!(builder.item_count(), 1);
        assert_counts_consistent(&builder.nodes);
    }

    #[test]
    fn test_adding_under_missing_or_item_parent_fails() {
        let mut builder = TreeBuilder::new("Root");
        builder.add_item(ROOT_ID, "leaf", "leaf", file("leaf.mp3")).unwrap();

        assert!(matches!(
            builder.add_container("nope", "c", "c"),
            Err(Error::NotFound(id)) if id == "nope"
        ));
        assert!(matches!(
            builder.add_item("leaf", "x", "x", file("x.mp3")),
            Err(Error::NotAContainer(id)) if id == "leaf"
        ));
        assert!(matches!(
            builder.add_container(ROOT_ID, "leaf", "leaf"),
            Err(Error::NotAContainer(_))
        ));
    }

    #[test]
    fn test_fresh_tree_holds_only_the_root() {
        let tree = ContentTree::new("Root");
        let snapshot = tree.snapshot();
        assert!(snapshot.has_only_root());
        assert_eq!(snapshot.node_count(), 1);

        tree.modify(|b| b.add_container(ROOT_ID, "c", "c")).unwrap();
        let snapshot = tree.snapshot();
        assert!(!snapshot.has_only_root());
        assert_eq!(snapshot.node_count(), 2);
    }

    #[test]
    fn test_readers_keep_their_snapshot_across_publish() {
        let tree = ContentTree::new("Root");
        assert_eq!(tree.system_update_id(), 0);

        tree.modify(|b| b.add_container(ROOT_ID, "c", "c")).unwrap();
        let before = tree.snapshot();
        assert_eq!(before.system_update_id(), 1);

        let update_id = tree.publish(TreeBuilder::new("Root"));
        assert_eq!(update_id, 2);

        assert!(before.contains("c"));
        assert!(!tree.snapshot().contains("c"));
        assert!(tree.get_node("c").is_none());
    }

    #[test]
    fn test_failed_modify_publishes_nothing() {
        let tree = ContentTree::new("Root");
        let result = tree.modify(|b| {
            b.add_container(ROOT_ID, "c", "c")?;
            b.add_container("missing", "d", "d")
        });
        assert!(result.is_err());
        assert_eq!(tree.system_update_id(), 0);
        assert!(tree.get_node("c").is_none());
    }
}
