//! Scratch directories holding raw artifacts between polling and the daily
//! report.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::registry::write_atomic;
use crate::types::{ItemKey, RawArtifact};

const ARTIFACT_EXTENSION: &str = "txt";

/// Raw artifact found in scratch storage together with its identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedArtifact {
    pub path: PathBuf,
    /// `"<path>:<sha256-hex>"`
    pub fingerprint: ItemKey,
    pub artifact: RawArtifact,
}

/// Content identity of a scratch file.
pub fn fingerprint(path: &Path, bytes: &[u8]) -> ItemKey {
    let digest = Sha256::digest(bytes);
    format!("{}:{}", path.display(), hex::encode(digest))
}

/// Set of scratch directories, scanned in the order given.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dirs: Vec<PathBuf>,
}

impl ArtifactStore {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    /// File name an artifact for item `name` is stored under.
    ///
    /// Names that are already safe are kept as is. Anything else is sanitized
    /// and suffixed with a short hash of the raw name, so distinct ids never
    /// share a file.
    pub fn file_name(name: &str) -> String {
        let safe = sanitize(name);
        if safe == name {
            format!("{}.{}", safe, ARTIFACT_EXTENSION)
        } else {
            let digest = hex::encode(Sha256::digest(name.as_bytes()));
            format!("{}-{}.{}", safe, &digest[..8], ARTIFACT_EXTENSION)
        }
    }

    /// Write one artifact as `<dir>/<file name>`, replacing any previous one.
    pub fn write(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = dir.join(Self::file_name(name));
        write_atomic(&path, bytes).with_context(|| format!("writing artifact {:?}", path))?;
        debug!("Artifact written to {:?}", path);
        Ok(path)
    }

    /// All non-empty artifacts, directories in order, files sorted by name.
    /// Missing directories are skipped.
    pub fn scan(&self) -> Result<Vec<ScannedArtifact>> {
        let mut found = Vec::new();
        for dir in &self.dirs {
            for path in list_dir(dir)? {
                let bytes = match std::fs::read(&path) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!("Skipping unreadable artifact {:?}: {}", path, e);
                        continue;
                    }
                };
                if bytes.iter().all(u8::is_ascii_whitespace) {
                    debug!("Skipping empty artifact {:?}", path);
                    continue;
                }
                found.push(ScannedArtifact {
                    fingerprint: fingerprint(&path, &bytes),
                    artifact: RawArtifact::new(path.display().to_string(), bytes),
                    path,
                });
            }
        }
        Ok(found)
    }

    /// Delete the given artifacts if their content is unchanged since they
    /// were scanned. Returns the fingerprints actually removed.
    pub fn remove(&self, scanned: &[ScannedArtifact]) -> Result<Vec<ItemKey>> {
        let mut removed = Vec::new();
        for artifact in scanned {
            let bytes = match std::fs::read(&artifact.path) {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e).with_context(|| format!("reading {:?}", artifact.path)),
            };
            if fingerprint(&artifact.path, &bytes) != artifact.fingerprint {
                debug!("Keeping {:?}: rewritten since it was scanned", artifact.path);
                continue;
            }
            std::fs::remove_file(&artifact.path)
                .with_context(|| format!("removing {:?}", artifact.path))?;
            removed.push(artifact.fingerprint.clone());
        }
        if !removed.is_empty() {
            debug!("Removed {} scratch artifacts", removed.len());
        }
        Ok(removed)
    }
}

fn list_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e).with_context(|| format!("listing {:?}", dir)),
    };
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == ARTIFACT_EXTENSION) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_skips_empty_and_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        ArtifactStore::write(dir.path(), "TX-1", b"Job ID: TX-1").unwrap();
        ArtifactStore::write(dir.path(), "blank", b"  \n").unwrap();
        std::fs::write(dir.path().join("notes.md"), b"ignored").unwrap();

        let store = ArtifactStore::new(vec![dir.path().to_path_buf(), dir.path().join("missing")]);
        let found = store.scan().unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].artifact.text(), "Job ID: TX-1");
        assert!(found[0].fingerprint.ends_with(&hex::encode(Sha256::digest(b"Job ID: TX-1"))));
    }

    #[test]
    fn test_fingerprint_follows_content() {
        let path = Path::new("out/a.txt");
        assert_eq!(fingerprint(path, b"x"), fingerprint(path, b"x"));
        assert_ne!(fingerprint(path, b"x"), fingerprint(path, b"y"));
        assert!(fingerprint(path, b"x").starts_with("out/a.txt:"));
    }

    #[test]
    fn test_distinct_ids_get_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let slashed = ArtifactStore::write(dir.path(), "a/b", b"one").unwrap();
        let plain = ArtifactStore::write(dir.path(), "a_b", b"two").unwrap();

        assert_ne!(slashed, plain);
        assert_eq!(plain, dir.path().join("a_b.txt"));
        assert!(ArtifactStore::file_name("a/b").starts_with("a_b-"));
        assert_eq!(std::fs::read(&slashed).unwrap(), b"one");
        assert_eq!(std::fs::read(&plain).unwrap(), b"two");
    }

    #[test]
    fn test_remove_only_touches_scanned_unchanged_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        ArtifactStore::write(dir.path(), "kept", b"one").unwrap();
        ArtifactStore::write(dir.path(), "gone", b"two").unwrap();
        let store = ArtifactStore::new(vec![dir.path().to_path_buf()]);
        let scanned = store.scan().unwrap();

        ArtifactStore::write(dir.path(), "kept", b"one, edited").unwrap();
        ArtifactStore::write(dir.path(), "late", b"three").unwrap();

        let removed = store.remove(&scanned).unwrap();
        assert_eq!(removed.len(), 1);
        assert!(removed[0].contains("gone.txt"));

        let left: Vec<_> = store.scan().unwrap().into_iter().map(|a| a.path).collect();
        assert_eq!(left, vec![dir.path().join("kept.txt"), dir.path().join("late.txt")]);
    }
}
