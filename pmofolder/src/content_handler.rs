//! # ContentDirectory Handler - Logique métier du service ContentDirectory
//!
//! Ce module répond aux requêtes Browse à partir de l'arbre de contenu et
//! résout les ids d'items vers les fichiers à diffuser.
//!
//! ## Fonctionnalités
//!
//! - **Browse** : `BrowseDirectChildren` (pagination containers puis items) et
//!   `BrowseMetadata`
//! - **Resolve** : id d'item → chemin, type MIME, taille
//! - **Update ID** : SystemUpdateID de l'arbre publié
//!
//! Every call loads one tree snapshot and answers entirely from it, so a
//! refresh published meanwhile never shows up half-applied in a response.

use crate::error::{Error, Result};
use crate::tree::{ContentNode, ContentTree, ROOT_PARENT_ID, TreeSnapshot};
use pmodidl::{CONTAINER_CLASS, Container, DIDLLite, Item, Resource};
use std::ops::Range;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// Argument `BrowseFlag` de l'action Browse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowseFlag {
    Metadata,
    DirectChildren,
}

impl BrowseFlag {
    /// Parse l'argument tel que reçu dans l'action SOAP
    pub fn parse(flag: &str) -> Result<Self> {
        flag.parse()
    }
}

impl FromStr for BrowseFlag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "BrowseMetadata" => Ok(BrowseFlag::Metadata),
            "BrowseDirectChildren" => Ok(BrowseFlag::DirectChildren),
            other => Err(Error::InvalidBrowseFlag(other.to_string())),
        }
    }
}

/// Structured answer to a Browse request, ready to be serialized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseResult {
    pub containers: Vec<ContentNode>,
    pub items: Vec<ContentNode>,
    pub returned: u32,
    pub total_matches: u32,
    pub update_id: u32,
}

/// Slices of the child containers and child items covered by a browse window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseWindow {
    pub containers: Range<usize>,
    pub items: Range<usize>,
}

impl BrowseWindow {
    pub fn len(&self) -> usize {
        self.containers.len() + self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Computes which children a `(start, count)` window covers
///
/// Children are ordered with the `dirs` containers first, then the `items`
/// items. `count == 0` means no upper bound. A start at or past the end
/// gives an empty window, not an error.
pub fn browse_window(dirs: usize, items: usize, start: usize, count: usize) -> BrowseWindow {
    let total = dirs + items;
    if start >= total {
        return BrowseWindow {
            containers: 0..0,
            items: 0..0,
        };
    }

    let end = if count == 0 {
        total
    } else {
        start.saturating_add(count).min(total)
    };

    let containers = if start < dirs {
        start..end.min(dirs)
    } else {
        0..0
    };
    let items = if end > dirs {
        (start.max(dirs) - dirs)..(end - dirs)
    } else {
        0..0
    };

    BrowseWindow { containers, items }
}

/// Fichier à diffuser pour un id d'item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedResource {
    pub path: PathBuf,
    pub mime: String,
    pub size: u64,
}

/// Handler pour le service ContentDirectory
///
/// Cheap to clone; every clone reads the same shared tree.
#[derive(Debug, Clone)]
pub struct ContentHandler {
    tree: Arc<ContentTree>,
    external_http_context: String,
}

impl ContentHandler {
    /// `external_http_context` is the URL prefix under which the transport
    /// serves item bytes; an item's URL is `<prefix>/<item id>`.
    pub fn new(tree: Arc<ContentTree>, external_http_context: impl Into<String>) -> Self {
        Self {
            tree,
            external_http_context: external_http_context.into(),
        }
    }

    /// Browse un container ou récupère les métadonnées d'un objet
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] when `object_id` is not in the tree
    /// - [`Error::NotAContainer`] when listing the children of an item
    pub fn browse(
        &self,
        object_id: &str,
        flag: BrowseFlag,
        starting_index: u32,
        requested_count: u32,
    ) -> Result<BrowseResult> {
        tracing::debug!(
            object_id = %object_id,
            browse_flag = ?flag,
            starting_index = %starting_index,
            requested_count = %requested_count,
            "ContentDirectory::Browse"
        );

        let snapshot = self.tree.snapshot();
        let node = snapshot
            .get_node(object_id)
            .ok_or_else(|| Error::NotFound(object_id.to_string()))?;

        match flag {
            BrowseFlag::Metadata => Ok(browse_metadata(&snapshot, node)),
            BrowseFlag::DirectChildren => {
                browse_direct_children(&snapshot, node, starting_index, requested_count)
            }
        }
    }

    /// Browse au format de l'action UPnP
    ///
    /// Returns the DIDL-Lite `Result`, `NumberReturned`, `TotalMatches` and
    /// `UpdateID` output arguments.
    pub fn browse_didl(
        &self,
        object_id: &str,
        browse_flag: &str,
        starting_index: u32,
        requested_count: u32,
    ) -> Result<(String, u32, u32, u32)> {
        let flag = BrowseFlag::parse(browse_flag)?;
        let result = self.browse(object_id, flag, starting_index, requested_count)?;
        let didl = self.to_didl_lite(&result)?;
        Ok((didl, result.returned, result.total_matches, result.update_id))
    }

    /// Convertit un BrowseResult en XML DIDL-Lite
    pub fn to_didl_lite(&self, result: &BrowseResult) -> Result<String> {
        let containers = result.containers.iter().filter_map(to_didl_container).collect();
        let items = result
            .items
            .iter()
            .filter_map(|node| self.to_didl_item(node))
            .collect();

        DIDLLite::new(containers, items).to_xml().map_err(Error::Didl)
    }

    fn to_didl_item(&self, node: &ContentNode) -> Option<Item> {
        let file = node.media_file()?;
        Some(Item {
            id: node.id.clone(),
            parent_id: parent_id(node),
            restricted: Some("1".to_string()),
            title: node.title.clone(),
            class: file.group.item_class().to_string(),
            resources: vec![Resource {
                protocol_info: pmodidl::http_get_protocol_info(&file.mime),
                size: Some(file.size.to_string()),
                duration: None,
                resolution: None,
                url: self.resource_url(&node.id),
            }],
        })
    }

    /// URL under which the transport serves an item's bytes
    pub fn resource_url(&self, item_id: &str) -> String {
        format!("{}/{}", self.external_http_context, item_id)
    }

    /// Resolves an item id to the file the transport must stream
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] when the id is unknown (or was pruned)
    /// - [`Error::NotAnItem`] when the id names a container
    pub fn resolve(&self, item_id: &str) -> Result<ResolvedResource> {
        let snapshot = self.tree.snapshot();
        let node = snapshot
            .get_node(item_id)
            .ok_or_else(|| Error::NotFound(item_id.to_string()))?;
        let file = node
            .media_file()
            .ok_or_else(|| Error::NotAnItem(item_id.to_string()))?;

        Ok(ResolvedResource {
            path: file.path.clone(),
            mime: file.mime.clone(),
            size: file.size,
        })
    }

    /// Aucune recherche n'est proposée
    pub fn get_search_capabilities(&self) -> String {
        String::new()
    }

    /// Aucun tri : l'ordre est celui de l'indexation
    pub fn get_sort_capabilities(&self) -> String {
        String::new()
    }

    pub fn get_system_update_id(&self) -> u32 {
        self.tree.system_update_id()
    }
}

fn browse_metadata(snapshot: &TreeSnapshot, node: &ContentNode) -> BrowseResult {
    let (containers, items) = if node.is_container() {
        (vec![node.clone()], vec![])
    } else {
        (vec![], vec![node.clone()])
    };
    BrowseResult {
        containers,
        items,
        returned: 1,
        total_matches: 1,
        update_id: snapshot.system_update_id(),
    }
}

fn browse_direct_children(
    snapshot: &TreeSnapshot,
    node: &ContentNode,
    starting_index: u32,
    requested_count: u32,
) -> Result<BrowseResult> {
    let (child_containers, child_items) = node
        .children()
        .ok_or_else(|| Error::NotAContainer(node.id.clone()))?;

    let window = browse_window(
        child_containers.len(),
        child_items.len(),
        starting_index as usize,
        requested_count as usize,
    );

    let resolve = |ids: &[String]| -> Vec<ContentNode> {
        ids.iter()
            .filter_map(|id| snapshot.get_node(id))
            .cloned()
            .collect()
    };
    let containers = resolve(&child_containers[window.containers.clone()]);
    let items = resolve(&child_items[window.items.clone()]);

    Ok(BrowseResult {
        returned: (containers.len() + items.len()) as u32,
        total_matches: node.child_count().unwrap_or(0),
        containers,
        items,
        update_id: snapshot.system_update_id(),
    })
}

fn to_didl_container(node: &ContentNode) -> Option<Container> {
    let child_count = node.child_count()?;
    Some(Container {
        id: node.id.clone(),
        parent_id: parent_id(node),
        restricted: Some("1".to_string()),
        child_count: Some(child_count.to_string()),
        title: node.title.clone(),
        class: CONTAINER_CLASS.to_string(),
    })
}

fn parent_id(node: &ContentNode) -> String {
    node.parent_id
        .clone()
        .unwrap_or_else(|| ROOT_PARENT_ID.to_string())
}
