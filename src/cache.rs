//! On-disk bytecode artifact store, the middle tier of the three-tier
//! lookup (in-memory module table, disk, recompile).
//!
//! Entries are keyed by a digest of the canonical source path, the
//! compile-options tuple, and the artifact format version. Validation is
//! by recorded source mtime; stale, corrupt, or version-mismatched entries
//! are treated as misses and removed. Writes are atomic
//! (temp-then-rename) and never follow symlinks out of the cache root.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::host::CODE_VERSION;
use crate::program::CompileOptions;

/// Identifies one cache entry.
#[derive(Clone, Debug, PartialEq)]
pub struct CacheKey {
    pub path: PathBuf,
    pub options: CompileOptions,
}

impl CacheKey {
    pub fn for_source(path: &Path, minimal: bool) -> Self {
        CacheKey {
            path: path.to_path_buf(),
            options: CompileOptions {
                minimal,
                ..CompileOptions::default()
            },
        }
    }

    fn digest(&self) -> String {
        let canonical = self
            .path
            .canonicalize()
            .unwrap_or_else(|_| self.path.clone());
        let mut hasher = Sha256::new();
        hasher.update(canonical.display().to_string().as_bytes());
        hasher.update(b"|");
        hasher.update(self.options.fingerprint().as_bytes());
        hasher.update(b"|");
        hasher.update(CODE_VERSION.to_le_bytes());
        let digest = hasher.finalize();
        format!("{:x}", digest)
    }
}

#[derive(Serialize, Deserialize)]
struct DiskEntry {
    /// Source mtime recorded at write time, seconds since the epoch.
    mtime_secs: u64,
    bytecode: Vec<u8>,
}

/// The disk tier. A `None` directory disables it (misses on every get,
/// drops every put), which is how ephemeral embedders opt out.
pub struct BytecodeCache {
    dir: Option<PathBuf>,
}

impl BytecodeCache {
    /// Cache rooted at `<base>/.jac/cache`. The base is typically the
    /// project root (see `project::find_project_root`).
    pub fn new(base: &Path) -> Self {
        BytecodeCache {
            dir: Some(base.join(".jac").join("cache")),
        }
    }

    /// Resolve the base from the working directory's project root, falling
    /// back to the user cache directory.
    pub fn from_discovery() -> Self {
        let base = std::env::current_dir()
            .ok()
            .and_then(|cwd| crate::project::find_project_root(&cwd))
            .or_else(|| dirs::cache_dir().map(|d| d.join("jaclang")));
        BytecodeCache {
            dir: base.map(|b| b.join(".jac").join("cache")),
        }
    }

    pub fn disabled() -> Self {
        BytecodeCache { dir: None }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    fn entry_path(&self, key: &CacheKey) -> Option<PathBuf> {
        let dir = self.dir.as_ref()?;
        let basename = key
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("module");
        Some(dir.join(format!("{}_{}.jbc", basename, key.digest())))
    }

    fn source_mtime_secs(path: &Path) -> Option<u64> {
        let mtime = fs::metadata(path).ok()?.modified().ok()?;
        mtime
            .duration_since(SystemTime::UNIX_EPOCH)
            .ok()
            .map(|d| d.as_secs())
    }

    /// Fetch the artifact if present and current. Corruption, a stale
    /// mtime, or a format mismatch all read as a miss.
    pub fn get(&self, key: &CacheKey) -> Option<Vec<u8>> {
        let entry_path = self.entry_path(key)?;
        let raw = fs::read(&entry_path).ok()?;
        let entry: DiskEntry = match bincode::deserialize(&raw) {
            Ok(entry) => entry,
            Err(_) => {
                let _ = fs::remove_file(&entry_path);
                return None;
            }
        };
        let actual = Self::source_mtime_secs(&key.path)?;
        if actual > entry.mtime_secs {
            let _ = fs::remove_file(&entry_path);
            return None;
        }
        // The artifact header must also decode.
        if crate::host::CodeObject::from_bytes(&entry.bytecode).is_err() {
            let _ = fs::remove_file(&entry_path);
            return None;
        }
        Some(entry.bytecode)
    }

    /// Store an artifact. Directories are created lazily; the write is
    /// temp-then-rename so readers never observe a partial entry.
    pub fn put(&self, key: &CacheKey, bytecode: &[u8]) -> std::io::Result<()> {
        let Some(entry_path) = self.entry_path(key) else {
            return Ok(());
        };
        let Some(dir) = self.dir.as_ref() else {
            return Ok(());
        };
        fs::create_dir_all(dir)?;
        let mtime_secs = Self::source_mtime_secs(&key.path).unwrap_or(0);
        let entry = DiskEntry {
            mtime_secs,
            bytecode: bytecode.to_vec(),
        };
        let encoded = bincode::serialize(&entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let tmp_path = entry_path.with_extension("jbc.tmp");
        fs::write(&tmp_path, &encoded)?;
        fs::rename(&tmp_path, &entry_path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{CodeObject, HostModule};

    fn artifact() -> Vec<u8> {
        CodeObject::new(
            HostModule {
                name: "m".into(),
                doc: None,
                body: vec![],
            },
            "m.jac",
        )
        .to_bytes()
    }

    #[test]
    fn put_then_get_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("m.jac");
        fs::write(&source, "glob x = 1;").unwrap();

        let cache = BytecodeCache::new(tmp.path());
        let key = CacheKey::for_source(&source, false);
        let bytes = artifact();
        cache.put(&key, &bytes).unwrap();
        assert_eq!(cache.get(&key), Some(bytes));
    }

    #[test]
    fn missing_entry_is_miss() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("m.jac");
        fs::write(&source, "glob x = 1;").unwrap();
        let cache = BytecodeCache::new(tmp.path());
        assert_eq!(cache.get(&CacheKey::for_source(&source, false)), None);
    }

    #[test]
    fn touched_source_invalidates() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("m.jac");
        fs::write(&source, "glob x = 1;").unwrap();
        let cache = BytecodeCache::new(tmp.path());
        let key = CacheKey::for_source(&source, false);
        cache.put(&key, &artifact()).unwrap();

        // Bump the source mtime past the recorded one.
        let future = SystemTime::now() + std::time::Duration::from_secs(5);
        let file = fs::File::options().write(true).open(&source).unwrap();
        file.set_modified(future).unwrap();
        drop(file);

        assert_eq!(cache.get(&key), None);
    }

    #[test]
    fn options_tuple_is_part_of_the_key() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("m.jac");
        fs::write(&source, "glob x = 1;").unwrap();
        let cache = BytecodeCache::new(tmp.path());
        let plain = CacheKey::for_source(&source, false);
        let minimal = CacheKey::for_source(&source, true);
        cache.put(&plain, &artifact()).unwrap();
        assert!(cache.get(&plain).is_some());
        assert!(cache.get(&minimal).is_none());
    }

    #[test]
    fn corrupt_entry_is_transparent_miss() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("m.jac");
        fs::write(&source, "glob x = 1;").unwrap();
        let cache = BytecodeCache::new(tmp.path());
        let key = CacheKey::for_source(&source, false);
        cache.put(&key, &artifact()).unwrap();

        // Scribble over the entry.
        let entry = fs::read_dir(cache.dir().unwrap())
            .unwrap()
            .next()
            .unwrap()
            .unwrap()
            .path();
        fs::write(&entry, b"garbage").unwrap();
        assert_eq!(cache.get(&key), None);
        // And the bad entry is gone.
        assert!(!entry.exists());
    }

    #[test]
    fn disabled_cache_is_inert() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("m.jac");
        fs::write(&source, "x").unwrap();
        let cache = BytecodeCache::disabled();
        let key = CacheKey::for_source(&source, false);
        cache.put(&key, &artifact()).unwrap();
        assert_eq!(cache.get(&key), None);
    }
}
