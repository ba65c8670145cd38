//! Extension pour intégrer l'index de dossiers dans pmoconfig
//!
//! Ce module fournit le trait `FolderConfigExt` qui ajoute à
//! `pmoconfig::Config` la lecture de la section `folder` et la création des
//! composants configurés.

use crate::content_handler::ContentHandler;
use crate::index::MediaIndex;
use crate::tree::ContentTree;
use anyhow::{Result, anyhow};
use pmoconfig::Config;
use serde_yaml::{Number, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_SERVER_NAME: &str = "PMOFolder";
const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 900;

/// Trait d'extension pour la section `folder` de la configuration
///
/// # Exemple
///
/// ```rust,ignore
/// use pmoconfig::get_config;
/// use pmofolder::{ContentTree, FolderConfigExt};
///
/// let config = get_config();
/// let tree = Arc::new(ContentTree::new(&config.get_server_name()));
/// let index = config.create_media_index(tree.clone())?;
/// index.refresh()?;
/// ```
pub trait FolderConfigExt {
    /// Répertoires partagés (`folder.media_dirs`)
    fn get_media_dirs(&self) -> Result<Vec<PathBuf>>;

    fn set_media_dirs(&self, dirs: &[PathBuf]) -> Result<()>;

    /// Préfixe des URLs de ressources, sans `/` final
    ///
    /// Defaults to `http://<base_url>:<http_port>/media` when
    /// `folder.external_url` is empty.
    fn get_external_url(&self) -> Result<String>;

    /// Période de rafraîchissement; `Duration::ZERO` désactive le rafraîchissement périodique
    fn get_refresh_interval(&self) -> Result<Duration>;

    /// Définit la période de rafraîchissement en secondes
    fn set_refresh_interval(&self, secs: u64) -> Result<()>;

    /// Titre du container racine
    fn get_server_name(&self) -> String;

    /// Crée l'index sur les répertoires configurés
    fn create_media_index(&self, tree: Arc<ContentTree>) -> Result<Arc<MediaIndex>>;

    /// Crée le handler Browse avec le préfixe d'URL configuré
    fn create_content_handler(&self, tree: Arc<ContentTree>) -> Result<ContentHandler>;
}

impl FolderConfigExt for Config {
    fn get_media_dirs(&self) -> Result<Vec<PathBuf>> {
        match self.get_value(&["folder", "media_dirs"]) {
            Ok(Value::Sequence(seq)) => seq
                .into_iter()
                .map(|v| match v {
                    Value::String(s) => Ok(PathBuf::from(s)),
                    other => Err(anyhow!("Invalid media directory: {:?}", other)),
                })
                .collect(),
            // Un seul répertoire peut être donné sans liste
            Ok(Value::String(s)) if !s.is_empty() => Ok(vec![PathBuf::from(s)]),
            Ok(Value::String(_)) | Ok(Value::Null) | Err(_) => Ok(Vec::new()),
            Ok(other) => Err(anyhow!("folder.media_dirs must be a list, got {:?}", other)),
        }
    }

    fn set_media_dirs(&self, dirs: &[PathBuf]) -> Result<()> {
        let seq = dirs
            .iter()
            .map(|d| Value::String(d.to_string_lossy().to_string()))
            .collect();
        self.set_value(&["folder", "media_dirs"], Value::Sequence(seq))
    }

    fn get_external_url(&self) -> Result<String> {
        let url = match self.get_value(&["folder", "external_url"]) {
            Ok(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            _ => format!(
                "http://{}:{}/media",
                self.get_base_url(),
                self.get_http_port()
            ),
        };
        Ok(url.trim_end_matches('/').to_string())
    }

    fn get_refresh_interval(&self) -> Result<Duration> {
        let secs = match self.get_value(&["folder", "refresh_interval"]) {
            Ok(Value::Number(n)) => n
                .as_u64()
                .ok_or_else(|| anyhow!("folder.refresh_interval must be a positive integer"))?,
            Ok(Value::String(s)) => s
                .trim()
                .parse::<u64>()
                .map_err(|e| anyhow!("Invalid folder.refresh_interval {:?}: {}", s, e))?,
            _ => DEFAULT_REFRESH_INTERVAL_SECS,
        };
        Ok(Duration::from_secs(secs))
    }

    fn set_refresh_interval(&self, secs: u64) -> Result<()> {
        self.set_value(
            &["folder", "refresh_interval"],
            Value::Number(Number::from(secs)),
        )
    }

    fn get_server_name(&self) -> String {
        match self.get_value(&["folder", "server_name"]) {
            Ok(Value::String(s)) if !s.is_empty() => s,
            _ => DEFAULT_SERVER_NAME.to_string(),
        }
    }

    fn create_media_index(&self, tree: Arc<ContentTree>) -> Result<Arc<MediaIndex>> {
        let dirs = self.get_media_dirs()?;
        if dirs.is_empty() {
            tracing::warn!("No media directory configured (folder.media_dirs)");
        }
        Ok(Arc::new(MediaIndex::new(dirs, tree)))
    }

    fn create_content_handler(&self, tree: Arc<ContentTree>) -> Result<ContentHandler> {
        Ok(ContentHandler::new(tree, self.get_external_url()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert!(config.get_media_dirs().unwrap().is_empty());
        assert_eq!(config.get_refresh_interval().unwrap(), Duration::from_secs(900));
        assert_eq!(config.get_server_name(), "PMOFolder");
    }

    #[test]
    fn test_media_dirs_list_or_single_string() {
        let config = Config::from_yaml("folder:\n  media_dirs: [/srv/a, /srv/b]\n").unwrap();
        assert_eq!(
            config.get_media_dirs().unwrap(),
            vec![PathBuf::from("/srv/a"), PathBuf::from("/srv/b")]
        );

        let config = Config::from_yaml("folder:\n  media_dirs: /srv/only\n").unwrap();
        assert_eq!(config.get_media_dirs().unwrap(), vec![PathBuf::from("/srv/only")]);

        let config = Config::from_yaml("folder:\n  media_dirs: [1, 2]\n").unwrap();
        assert!(config.get_media_dirs().is_err());
    }

    #[test]
    fn test_set_media_dirs() {
        let config = Config::from_yaml("{}").unwrap();
        config
            .set_media_dirs(&[PathBuf::from("/music"), PathBuf::from("/videos")])
            .unwrap();
        assert_eq!(config.get_media_dirs().unwrap().len(), 2);
    }

    #[test]
    fn test_external_url_trailing_slash_and_default() {
        let config = Config::from_yaml("folder:\n  external_url: http://nas:9000/files/\n").unwrap();
        assert_eq!(config.get_external_url().unwrap(), "http://nas:9000/files");

        let config = Config::from_yaml("host:\n  base_url: 10.0.0.2\n  http_port: 8200\n").unwrap();
        assert_eq!(config.get_external_url().unwrap(), "http://10.0.0.2:8200/media");
    }

    #[test]
    fn test_refresh_interval_parsing() {
        let config = Config::from_yaml("folder:\n  refresh_interval: 0\n").unwrap();
        assert_eq!(config.get_refresh_interval().unwrap(), Duration::ZERO);

        let config = Config::from_yaml("folder:\n  refresh_interval: \"60\"\n").unwrap();
        assert_eq!(config.get_refresh_interval().unwrap(), Duration::from_secs(60));

        let config = Config::from_yaml("folder:\n  refresh_interval: -5\n").unwrap();
        assert!(config.get_refresh_interval().is_err());

        config.set_refresh_interval(30).unwrap();
        assert_eq!(config.get_refresh_interval().unwrap(), Duration::from_secs(30));
    }

    #[test]
    fn test_created_handler_uses_configured_url() {
        let config = Config::from_yaml("folder:\n  server_name: Salon\n  external_url: http://h/m\n").unwrap();
        let tree = Arc::new(ContentTree::new(&config.get_server_name()));
        let index = config.create_media_index(tree.clone()).unwrap();
        let handler = config.create_content_handler(tree.clone()).unwrap();

        assert!(index.base_dirs().is_empty());
        assert_eq!(tree.root_title(), "Salon");
        assert_eq!(handler.resource_url("audio-x"), "http://h/m/audio-x");
    }
}
