//! Corpus enumeration and content hashing.
//!
//! All listings are sorted so query selection and the corpus digest are
//! deterministic across platforms and runs.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::IndexError;

/// Chunk size used when streaming file contents into the digest.
pub const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// Immediate children of `dir`, sorted by path.
pub fn sorted_children(dir: &Path) -> Result<Vec<PathBuf>, IndexError> {
    let entries = fs::read_dir(dir).map_err(|e| IndexError::io(dir, e))?;
    let mut children = Vec::new();
    for entry in entries {
        children.push(entry.map_err(|e| IndexError::io(dir, e))?.path());
    }
    children.sort();
    Ok(children)
}

/// What a corpus walk does with a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A real directory; symlinked directories are never descended into.
    Dir,
    /// A regular file, or a symlink resolving to one.
    File,
    /// Symlinked directories, dangling links, sockets and the like.
    Other,
}

pub fn entry_kind(path: &Path) -> Result<EntryKind, IndexError> {
    let meta = fs::symlink_metadata(path).map_err(|e| IndexError::io(path, e))?;
    let file_type = meta.file_type();
    if file_type.is_dir() {
        return Ok(EntryKind::Dir);
    }
    if file_type.is_file() {
        return Ok(EntryKind::File);
    }
    if file_type.is_symlink() && fs::metadata(path).is_ok_and(|target| target.is_file()) {
        return Ok(EntryKind::File);
    }
    Ok(EntryKind::Other)
}

/// Every regular file below `dir` (recursively), sorted by path.
pub fn collect_files(dir: &Path) -> Result<Vec<PathBuf>, IndexError> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for child in sorted_children(&current)? {
            match entry_kind(&child)? {
                EntryKind::Dir => pending.push(child),
                EntryKind::File => files.push(child),
                EntryKind::Other => {}
            }
        }
    }
    files.sort();
    Ok(files)
}

/// First file of the corpus in sorted order, if any.
pub fn first_file(root: &Path) -> Result<Option<PathBuf>, IndexError> {
    Ok(collect_files(root)?.into_iter().next())
}

/// SHA-256 hex digest over every file below `root`.
///
/// For each file, in sorted order, the digest absorbs the `/`-separated path
/// relative to `root`, a NUL byte, the file contents and the content length
/// as little-endian `u64`. Any byte change anywhere changes the digest.
pub fn corpus_digest(root: &Path) -> Result<String, IndexError> {
    if !root.is_dir() {
        return Err(IndexError::CorpusNotFound(root.to_path_buf()));
    }

    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_CHUNK_SIZE];
    for path in collect_files(root)? {
        let rel = path.strip_prefix(root).unwrap_or(&path);
        let rel = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        hasher.update(rel.as_bytes());
        hasher.update([0u8]);

        let mut file = File::open(&path).map_err(|e| IndexError::io(&path, e))?;
        let mut len = 0u64;
        loop {
            let n = file.read(&mut buf).map_err(|e| IndexError::io(&path, e))?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            len += n as u64;
        }
        hasher.update(len.to_le_bytes());
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, body: &[u8]) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    #[test]
    fn files_are_listed_recursively_in_sorted_order() {
        let dir = tempdir().unwrap();
        write(dir.path(), "b/2.txt", b"x");
        write(dir.path(), "b/1.txt", b"x");
        write(dir.path(), "a/deep/z.txt", b"x");
        write(dir.path(), "c.txt", b"x");

        let rel: Vec<_> = collect_files(dir.path())
            .unwrap()
            .into_iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            rel,
            vec![
                PathBuf::from("a/deep/z.txt"),
                PathBuf::from("b/1.txt"),
                PathBuf::from("b/2.txt"),
                PathBuf::from("c.txt"),
            ]
        );
        assert_eq!(
            first_file(dir.path()).unwrap(),
            Some(dir.path().join("a/deep/z.txt"))
        );
    }

    #[test]
    fn digest_is_stable_and_content_sensitive() {
        let a = tempdir().unwrap();
        let b = tempdir().unwrap();
        for root in [a.path(), b.path()] {
            write(root, "c1/q.txt", b"hello world");
            write(root, "c1/m.txt", b"hello there world");
            write(root, "loose.txt", b"unrelated");
        }
        let da = corpus_digest(a.path()).unwrap();
        assert_eq!(da, corpus_digest(b.path()).unwrap());
        assert_eq!(da.len(), 64);

        write(b.path(), "c1/m.txt", b"hello there World");
        assert_ne!(da, corpus_digest(b.path()).unwrap());
    }

    #[test]
    fn digest_covers_file_names() {
        let a = tempdir().unwrap();
        let b = tempdir().unwrap();
        write(a.path(), "c/1.txt", b"same");
        write(b.path(), "c/2.txt", b"same");
        assert_ne!(
            corpus_digest(a.path()).unwrap(),
            corpus_digest(b.path()).unwrap()
        );
    }

    #[test]
    fn missing_corpus_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            corpus_digest(&dir.path().join("nope")),
            Err(IndexError::CorpusNotFound(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directories_are_not_followed() {
        let dir = tempdir().unwrap();
        write(dir.path(), "c1/q.txt", b"hello world");
        std::os::unix::fs::symlink(dir.path().join("c1"), dir.path().join("c1/loop")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("c1/q.txt"), dir.path().join("c1/alias.txt"))
            .unwrap();

        let files = collect_files(dir.path()).unwrap();
        assert_eq!(
            files,
            vec![dir.path().join("c1/alias.txt"), dir.path().join("c1/q.txt")]
        );
        assert_eq!(entry_kind(&dir.path().join("c1/loop")).unwrap(), EntryKind::Other);
        assert!(corpus_digest(dir.path()).is_ok());
    }
}
