//! Types d'erreurs pour pmofolder

use std::path::PathBuf;

/// Erreurs de l'index et du ContentDirectory
///
/// Every error is scoped to one operation: a failed refresh keeps the
/// previously published tree, a failed browse touches nothing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to traverse {}: {source}", path.display())]
    IndexIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Object is not a container: {0}")]
    NotAContainer(String),

    #[error("Object is not an item: {0}")]
    NotAnItem(String),

    #[error("Invalid BrowseFlag: {0}")]
    InvalidBrowseFlag(String),

    #[error("DIDL-Lite error: {0}")]
    Didl(String),

    #[error("Refresh task failed: {0}")]
    RefreshTask(String),
}

/// Type Result spécialisé pour pmofolder
pub type Result<T> = std::result::Result<T, Error>;
