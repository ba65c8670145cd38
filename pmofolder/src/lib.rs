//! # pmofolder - ContentDirectory sur dossiers locaux
//!
//! Ce crate indexe des répertoires locaux et les expose selon le modèle
//! ContentDirectory UPnP/DLNA : un arbre de containers et d'items, parcouru
//! par l'action Browse.
//!
//! # Architecture
//!
//! - [`format`] : extensions reconnues, type MIME et groupe (vidéo, image, audio)
//! - [`tree`] : arbre de contenu publié par snapshots immuables
//! - [`walker`] / [`index`] : parcours des dossiers et reconstruction de l'arbre
//! - [`content_handler`] : Browse (`BrowseDirectChildren`, `BrowseMetadata`),
//!   génération DIDL-Lite et résolution des items
//! - [`scheduler`] : rafraîchissement périodique sur le pool bloquant de tokio
//! - [`config_ext`] : section `folder` de pmoconfig
//!
//! # Utilisation de base
//!
//! ```no_run
//! use pmofolder::{BrowseFlag, ContentHandler, ContentTree, MediaIndex};
//! use std::sync::Arc;
//!
//! let tree = Arc::new(ContentTree::new("PMOFolder"));
//! let index = MediaIndex::new(vec!["/srv/media".into()], tree.clone());
//! index.refresh()?;
//!
//! let handler = ContentHandler::new(tree, "http://192.168.1.10:8080/media");
//! let page = handler.browse("3-audio", BrowseFlag::DirectChildren, 0, 20)?;
//! println!("{} / {}", page.returned, page.total_matches);
//! # Ok::<(), pmofolder::Error>(())
//! ```

pub mod config_ext;
pub mod content_handler;
pub mod error;
pub mod format;
pub mod index;
pub mod scheduler;
pub mod tree;
pub mod walker;

pub use config_ext::FolderConfigExt;
pub use content_handler::{BrowseFlag, BrowseResult, ContentHandler, ResolvedResource, browse_window};
pub use error::{Error, Result};
pub use format::{ContentGroup, MediaFormat};
pub use index::MediaIndex;
pub use scheduler::{refresh_in_background, spawn_refresh_task};
pub use tree::{ContentNode, ContentTree, MediaFile, NodeKind, ROOT_ID, TreeBuilder, TreeSnapshot};
