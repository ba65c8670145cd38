//! # Media index
//!
//! [`MediaIndex`] walks the shared directories and publishes a fresh content
//! tree on every refresh. Each pass starts from the fixed skeleton (root and
//! the three group containers), so anything the pass does not re-assert is
//! pruned when the new tree is published. Ids are derived from absolute paths
//! only, which keeps them stable from one pass (or one process) to the next.

use crate::error::Result;
use crate::format::{self, ContentGroup};
use crate::tree::{ContentTree, MediaFile, ROOT_ID, TreeBuilder};
use crate::walker::TreeWalker;
use parking_lot::Mutex;
use sha1::{Digest, Sha1};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

pub struct MediaIndex {
    base_dirs: Vec<PathBuf>,
    tree: Arc<ContentTree>,
    refresh_lock: Mutex<()>,
}

impl MediaIndex {
    /// Creates the index and attaches the group containers to an empty tree
    ///
    /// Relative base directories are resolved against the current directory.
    pub fn new(base_dirs: Vec<PathBuf>, tree: Arc<ContentTree>) -> Self {
        let base_dirs = base_dirs
            .into_iter()
            .map(|dir| std::path::absolute(&dir).unwrap_or(dir))
            .collect();

        let index = Self {
            base_dirs,
            tree,
            refresh_lock: Mutex::new(()),
        };

        if index.tree.snapshot().has_only_root() {
            match index.skeleton() {
                Ok(builder) => {
                    index.tree.publish(builder);
                }
                Err(e) => warn!("⚠️ Failed to build the group containers: {}", e),
            }
        }
        index
    }

    pub fn base_dirs(&self) -> &[PathBuf] {
        &self.base_dirs
    }

    pub fn tree(&self) -> &Arc<ContentTree> {
        &self.tree
    }

    /// Re-walks every base directory and publishes the resulting tree
    ///
    /// Waits for a refresh already running on another thread, then runs.
    /// Returns the number of indexed items. On a traversal error nothing is
    /// published and the previous tree stays in place.
    pub fn refresh(&self) -> Result<usize> {
        let _guard = self.refresh_lock.lock();
        self.refresh_locked()
    }

    /// Same as [`refresh`](Self::refresh), but returns `Ok(None)` at once
    /// when a refresh is already in progress
    pub fn try_refresh(&self) -> Result<Option<usize>> {
        let Some(_guard) = self.refresh_lock.try_lock() else {
            debug!("Refresh already in progress, skipping");
            return Ok(None);
        };
        self.refresh_locked().map(Some)
    }

    fn refresh_locked(&self) -> Result<usize> {
        let started = Instant::now();
        let mut builder = self.skeleton()?;

        TreeWalker::new(&self.base_dirs, format::is_indexable)
            .walk(|dir, files| put_dir_to_tree(&mut builder, dir, files))?;

        let item_count = builder.item_count();
        let update_id = self.tree.publish(builder);
        info!(
            update_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "refreshed: {} items.",
            item_count
        );
        Ok(item_count)
    }

    /// Root and the three group containers, in display order
    fn skeleton(&self) -> Result<TreeBuilder> {
        let mut builder = TreeBuilder::new(&self.tree.root_title());
        for group in ContentGroup::ALL {
            builder.add_container(ROOT_ID, group.container_id(), group.human_name())?;
        }
        Ok(builder)
    }
}

/// Adds one directory and its files to the tree being built
///
/// One container per group is created lazily under the group's top-level
/// container, so a directory holding only audio shows up under Audio only.
fn put_dir_to_tree(builder: &mut TreeBuilder, dir: &Path, files: &[PathBuf]) -> Result<()> {
    let dir_title = file_name(dir);
    let mut containers: HashMap<ContentGroup, String> = HashMap::new();
    let mut counts: HashMap<ContentGroup, usize> = HashMap::new();

    for file in files {
        let Some(format) = format::classify(file) else {
            continue;
        };
        let size = match fs::metadata(file) {
            Ok(metadata) => metadata.len(),
            Err(err) => {
                debug!(path = %file.display(), error = %err, "Skipping unreadable file");
                continue;
            }
        };

        let group = format.group;
        let container_id = match containers.get(&group) {
            Some(id) => id.clone(),
            None => {
                let id = content_id(group, dir);
                builder.add_container(group.container_id(), &id, &dir_title)?;
                containers.insert(group, id.clone());
                id
            }
        };

        let item_id = content_id(group, file);
        trace!(id = %item_id, path = %file.display(), "Indexing file");
        builder.add_item(
            &container_id,
            &item_id,
            &file_name(file),
            MediaFile {
                path: file.clone(),
                mime: format.mime.to_string(),
                size,
                group,
            },
        )?;
        *counts.entry(group).or_default() += 1;
    }

    let count = |group: ContentGroup| counts.get(&group).copied().unwrap_or(0);
    info!(
        "shared: {} ({}v, {}i, {}a)",
        dir_title,
        count(ContentGroup::Video),
        count(ContentGroup::Image),
        count(ContentGroup::Audio)
    );
    Ok(())
}

/// Stable id for a file or directory of the given group
///
/// `<group prefix><sha1 of the absolute path>-<sanitized name>`
pub fn content_id(group: ContentGroup, path: &Path) -> String {
    // Octets bruts du chemin : deux noms non UTF-8 distincts ne doivent pas se confondre
    let digest = Sha1::digest(path.as_os_str().as_encoded_bytes());
    format!(
        "{}{}-{}",
        group.item_id_prefix(),
        hex::encode(digest),
        safe_name(&file_name(path))
    )
}

/// Replaces every character outside `[a-zA-Z0-9]` with `_`
pub fn safe_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_name_replaces_everything_but_ascii_alphanumerics() {
        assert_eq!(safe_name("My Song (live).mp3"), "My_Song__live__mp3");
        assert_eq!(safe_name("été.flac"), "_t__flac");
        assert_eq!(safe_name("abcXYZ019"), "abcXYZ019");
    }

    #[test]
    fn test_content_id_is_deterministic_and_group_scoped() {
        let path = Path::new("/srv/media/clip 1.mkv");
        let id = content_id(ContentGroup::Video, path);

        assert_eq!(id, content_id(ContentGroup::Video, path));
        assert!(id.starts_with("video-"));
        assert!(id.ends_with("-clip_1_mkv"));
        // préfixe + 40 caractères hexadécimaux + '-' + nom
        assert_eq!(id.len(), "video-".len() + 40 + 1 + "clip_1_mkv".len());
        assert_ne!(id, content_id(ContentGroup::Audio, path));
        assert_ne!(id, content_id(ContentGroup::Video, Path::new("/srv/other/clip 1.mkv")));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_names_get_distinct_ids() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let tmp = tempfile::tempdir().unwrap();
        let first = tmp.path().join(OsStr::from_bytes(b"a\xff.mp3"));
        let second = tmp.path().join(OsStr::from_bytes(b"a\xfe.mp3"));
        // Certains systèmes de fichiers (APFS, ZFS utf8only) refusent ces noms
        if fs::write(&first, b"1").is_err() || fs::write(&second, b"2").is_err() {
            return;
        }

        let first_id = content_id(ContentGroup::Audio, &first);
        let second_id = content_id(ContentGroup::Audio, &second);
        assert_ne!(first_id, second_id);
        assert_eq!(safe_name(&file_name(&first)), safe_name(&file_name(&second)));

        let tree = Arc::new(ContentTree::new("Root"));
        let index = MediaIndex::new(vec![tmp.path().to_path_buf()], tree.clone());
        assert_eq!(index.refresh().unwrap(), 2);

        let dir_id = content_id(ContentGroup::Audio, &index.base_dirs()[0]);
        let dir = tree.get_node(&dir_id).unwrap();
        assert_eq!(dir.child_count(), Some(2));
        assert!(tree.get_node(&first_id).is_some());
        assert!(tree.get_node(&second_id).is_some());
    }

    #[test]
    fn test_refresh_rebuilds_every_group_container() {
        let tmp = tempfile::tempdir().unwrap();
        let tree = Arc::new(ContentTree::new("Root"));
        let index = MediaIndex::new(vec![tmp.path().to_path_buf()], tree.clone());

        assert_eq!(index.refresh().unwrap(), 0);
        let snapshot = tree.snapshot();
        let (containers, _) = snapshot.root().children().unwrap();
        assert_eq!(containers, ["1-videos", "2-images", "3-audio"]);
        assert_eq!(snapshot.node_count(), 4);
    }

    #[test]
    fn test_new_index_publishes_group_skeleton() {
        let tree = Arc::new(ContentTree::new("Root"));
        let index = MediaIndex::new(vec![PathBuf::from("relative/dir")], tree.clone());

        assert!(index.base_dirs()[0].is_absolute());
        let snapshot = tree.snapshot();
        let (containers, items) = snapshot.root().children().unwrap();
        assert_eq!(containers, ["1-videos", "2-images", "3-audio"]);
        assert!(items.is_empty());
        assert_eq!(snapshot.get_node("3-audio").unwrap().title, "Audio");
        assert_eq!(snapshot.system_update_id(), 1);

        // Un second index sur le même arbre ne republie pas le squelette
        MediaIndex::new(vec![], tree.clone());
        assert_eq!(tree.system_update_id(), 1);
    }
}
