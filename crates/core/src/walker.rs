use crate::entry::Entry;
use crate::error::{Result, RsrError};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Lazy, depth-first sequence of entries below a root directory.
///
/// Directories are yielded after their descendants and siblings come in
/// file-name order, so the sequence is stable for a given tree. The root
/// itself is never yielded. Renaming a directory once it has been yielded
/// never invalidates a path still to come.
pub struct Entries {
    inner: walkdir::IntoIter,
}

impl Iterator for Entries {
    type Item = Entry;

    fn next(&mut self) -> Option<Self::Item> {
        for item in self.inner.by_ref() {
            let dir_entry = match item {
                Ok(dir_entry) => dir_entry,
                Err(err) => {
                    warn!("skipping unreadable entry: {err}");
                    continue;
                }
            };
            match dir_entry.metadata() {
                Ok(metadata) => return Some(Entry::from_metadata(dir_entry.path(), &metadata)),
                Err(err) => {
                    warn!(
                        "skipping entry without metadata {}: {err}",
                        dir_entry.path().display()
                    );
                }
            }
        }
        None
    }
}

/// Checks that `root` exists and returns the entries below it.
///
/// The root is made absolute first so that every yielded path (and thus the
/// full-path comparison string) is absolute.
pub fn enumerate(root: &Path, recursive: bool) -> Result<Entries> {
    if !root.is_dir() {
        return Err(RsrError::DirectoryNotFound(root.to_path_buf()));
    }
    let root = absolute_root(root)?;
    debug!(root = %root.display(), recursive, "enumerating");

    let walker = WalkDir::new(&root)
        .min_depth(1)
        .max_depth(if recursive { usize::MAX } else { 1 })
        .follow_links(false)
        .contents_first(true)
        .sort_by_file_name();

    Ok(Entries {
        inner: walker.into_iter(),
    })
}

fn absolute_root(root: &Path) -> Result<PathBuf> {
    std::path::absolute(root).map_err(|source| RsrError::Io {
        path: root.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::enumerate;
    use crate::error::RsrError;
    use std::fs;
    use tempfile::tempdir;

    fn names(root: &std::path::Path, recursive: bool) -> Vec<String> {
        enumerate(root, recursive)
            .expect("enumerate")
            .map(|e| {
                e.path
                    .strip_prefix(root)
                    .expect("under root")
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn flat_enumeration_lists_direct_children_only() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join("b.txt"), b"b").expect("write b");
        fs::write(temp.path().join("a.txt"), b"a").expect("write a");
        fs::create_dir(temp.path().join("sub")).expect("create sub");
        fs::write(temp.path().join("sub").join("c.txt"), b"c").expect("write c");

        assert_eq!(names(temp.path(), false), vec!["a.txt", "b.txt", "sub"]);
    }

    #[test]
    fn recursive_enumeration_yields_directory_after_descendants() {
        let temp = tempdir().expect("tempdir");
        fs::create_dir_all(temp.path().join("sub").join("deep")).expect("create tree");
        fs::write(temp.path().join("sub").join("deep").join("x.txt"), b"x").expect("write x");
        fs::write(temp.path().join("z.txt"), b"z").expect("write z");

        assert_eq!(
            names(temp.path(), true),
            vec!["sub/deep/x.txt", "sub/deep", "sub", "z.txt"]
        );
    }

    #[test]
    fn yielded_paths_are_absolute() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join("a.txt"), b"a").expect("write a");

        let entry = enumerate(temp.path(), false)
            .expect("enumerate")
            .next()
            .expect("one entry");
        assert!(entry.path.is_absolute());
        assert_eq!(entry.name, "a.txt");
    }

    #[test]
    fn missing_root_is_directory_not_found() {
        let temp = tempdir().expect("tempdir");
        let missing = temp.path().join("nope");

        let err = enumerate(&missing, false).err().expect("must fail");
        assert!(matches!(err, RsrError::DirectoryNotFound(path) if path == missing));
    }

    #[test]
    fn file_root_is_directory_not_found() {
        let temp = tempdir().expect("tempdir");
        let file = temp.path().join("file.txt");
        fs::write(&file, b"x").expect("write file");

        assert!(matches!(
            enumerate(&file, true),
            Err(RsrError::DirectoryNotFound(_))
        ));
    }
}
