//! Parcours des répertoires partagés.

use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Depth-first walk over a set of base directories
///
/// For each directory holding at least one file accepted by the filter, the
/// callback receives the directory and its accepted files sorted by name.
/// Directories are visited in name order; symlinked directories are not
/// followed, symlinked files are.
///
/// Each directory is read once: entries are sorted files first, so a
/// directory's files all come right after it and before any subdirectory.
pub struct TreeWalker<'a, P> {
    roots: &'a [PathBuf],
    filter: P,
}

impl<'a, P> TreeWalker<'a, P>
where
    P: Fn(&Path) -> bool,
{
    pub fn new(roots: &'a [PathBuf], filter: P) -> Self {
        Self { roots, filter }
    }

    /// Walks every root in order
    ///
    /// Stops at the first traversal error (missing root, unreadable directory)
    /// or at the first error returned by `on_dir`.
    pub fn walk<F>(&self, mut on_dir: F) -> Result<()>
    where
        F: FnMut(&Path, &[PathBuf]) -> Result<()>,
    {
        for root in self.roots {
            let mut pending: Option<(PathBuf, Vec<PathBuf>)> = None;

            for entry in WalkDir::new(root).sort_by(files_first) {
                let entry = entry.map_err(|err| Error::IndexIo {
                    path: err.path().unwrap_or(root.as_path()).to_path_buf(),
                    source: err.into(),
                })?;

                if entry.file_type().is_dir() {
                    emit(pending.take(), &mut on_dir)?;
                    pending = Some((entry.into_path(), Vec::new()));
                } else if self.accepts(&entry) {
                    if let Some((_, files)) = pending.as_mut() {
                        files.push(entry.into_path());
                    }
                }
            }
            emit(pending, &mut on_dir)?;
        }
        Ok(())
    }

    fn accepts(&self, entry: &DirEntry) -> bool {
        let is_file = if entry.path_is_symlink() {
            match fs::metadata(entry.path()) {
                Ok(metadata) => metadata.is_file(),
                Err(err) => {
                    tracing::debug!(path = %entry.path().display(), error = %err, "Skipping unreadable entry");
                    false
                }
            }
        } else {
            entry.file_type().is_file()
        };
        is_file && (self.filter)(entry.path())
    }
}

/// Files before directories, then by name
fn files_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    a.file_type()
        .is_dir()
        .cmp(&b.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}

fn emit<F>(pending: Option<(PathBuf, Vec<PathBuf>)>, on_dir: &mut F) -> Result<()>
where
    F: FnMut(&Path, &[PathBuf]) -> Result<()>,
{
    match pending {
        Some((dir, files)) if !files.is_empty() => on_dir(&dir, &files),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::is_indexable;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"data").unwrap();
    }

    fn collect(roots: &[PathBuf]) -> Result<Vec<(PathBuf, Vec<String>)>> {
        let mut seen = Vec::new();
        TreeWalker::new(roots, is_indexable).walk(|dir, files| {
            let names = files
                .iter()
                .map(|f| f.file_name().unwrap().to_string_lossy().to_string())
                .collect();
            seen.push((dir.to_path_buf(), names));
            Ok(())
        })?;
        Ok(seen)
    }

    #[test]
    fn test_groups_files_per_directory_depth_first() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().to_path_buf();
        touch(&base.join("b.mp3"));
        touch(&base.join("a.jpg"));
        touch(&base.join("notes.txt"));
        touch(&base.join("x/inner/deep.flac"));
        touch(&base.join("x/one.mkv"));
        touch(&base.join("y/two.ogg"));
        fs::create_dir_all(base.join("empty")).unwrap();
        touch(&base.join("only-text/readme.txt"));

        let seen = collect(&[base.clone()]).unwrap();

        assert_eq!(
            seen,
            vec![
                (base.clone(), vec!["a.jpg".to_string(), "b.mp3".to_string()]),
                (base.join("x"), vec!["one.mkv".to_string()]),
                (base.join("x/inner"), vec!["deep.flac".to_string()]),
                (base.join("y"), vec!["two.ogg".to_string()]),
            ]
        );
    }

    #[test]
    fn test_missing_root_is_an_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("does-not-exist");

        let err = collect(&[missing.clone()]).unwrap_err();
        match err {
            Error::IndexIo { path, .. } => assert_eq!(path, missing),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_files_are_grouped_with_their_directory_around_subdirectories() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().to_path_buf();
        // "m" trie entre les deux fichiers mais est listé après eux
        touch(&base.join("a.mp3"));
        touch(&base.join("m/inner.mp3"));
        touch(&base.join("z.mp3"));

        let seen = collect(&[base.clone()]).unwrap();

        assert_eq!(
            seen,
            vec![
                (base.clone(), vec!["a.mp3".to_string(), "z.mp3".to_string()]),
                (base.join("m"), vec!["inner.mp3".to_string()]),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_files_are_kept_and_symlinked_dirs_skipped() {
        use std::os::unix::fs::symlink;

        let tmp = tempfile::tempdir().unwrap();
        let outside = tmp.path().join("outside");
        touch(&outside.join("real.mp3"));
        let base = tmp.path().join("base");
        fs::create_dir_all(&base).unwrap();
        symlink(outside.join("real.mp3"), base.join("link.mp3")).unwrap();
        symlink(&outside, base.join("linked_dir")).unwrap();
        symlink(tmp.path().join("missing.mp3"), base.join("broken.mp3")).unwrap();

        let seen = collect(&[base.clone()]).unwrap();

        assert_eq!(seen, vec![(base, vec!["link.mp3".to_string()])]);
    }

    #[test]
    fn test_callback_error_stops_the_walk() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("a/1.mp3"));
        touch(&tmp.path().join("b/2.mp3"));

        let mut calls = 0;
        let roots = [tmp.path().to_path_buf()];
        let result = TreeWalker::new(&roots, is_indexable).walk(|_, _| {
            calls += 1;
            Err(Error::NotFound("stop".to_string()))
        });

        assert!(matches!(result, Err(Error::NotFound(_))));
        assert_eq!(calls, 1);
    }
}
