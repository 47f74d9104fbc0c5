//! SCIP index cache.
//!
//! A generated index is kept under `<project>/.depreader/` and reused while
//! the project's source files and dependency lock file are unchanged.
//!
//! Cache structure:
//! - `index.scip` - the SCIP protobuf index
//! - `index.scip.meta` - JSON metadata for cache validation

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::domain::language::Language;

pub const CACHE_DIR: &str = ".depreader";

/// Cache metadata stored alongside the SCIP index.
#[derive(Debug, Serialize, Deserialize)]
pub struct ScipCacheMetadata {
    pub version: u32,
    pub created_at: u64,
    pub language: String,
    /// Source file path -> modification time (unix millis).
    pub source_files: BTreeMap<String, u64>,
    /// SHA-256 of the language's lock file, if present.
    pub lock_hash: Option<String>,
}

impl ScipCacheMetadata {
    pub const CURRENT_VERSION: u32 = 2;
}

pub struct ScipCache {
    project_root: PathBuf,
    cache_dir: PathBuf,
    index_path: PathBuf,
    meta_path: PathBuf,
    language: Language,
}

impl ScipCache {
    pub fn new(project_root: &Path, language: Language) -> Self {
        let cache_dir = project_root.join(CACHE_DIR);
        Self {
            project_root: project_root.to_path_buf(),
            index_path: cache_dir.join("index.scip"),
            meta_path: cache_dir.join("index.scip.meta"),
            cache_dir,
            language,
        }
    }

    /// Path of the cached index if it is still valid.
    pub fn get_valid_cache(&self) -> Option<PathBuf> {
        if !self.index_path.exists() || !self.meta_path.exists() {
            debug!(dir = %self.cache_dir.display(), "no cached index");
            return None;
        }

        let meta = match self.load_metadata() {
            Ok(m) => m,
            Err(e) => {
                debug!(error = %e, "unreadable cache metadata");
                return None;
            }
        };

        if meta.version != ScipCacheMetadata::CURRENT_VERSION
            || meta.language != self.language.name()
        {
            debug!("cache format or language changed");
            return None;
        }
        if meta.source_files != self.snapshot_sources() {
            debug!("source files changed since last index");
            return None;
        }
        if meta.lock_hash != self.lock_hash() {
            debug!(lock_file = self.language.lock_file(), "lock file changed");
            return None;
        }

        debug!(index = %self.index_path.display(), "reusing cached index");
        Some(self.index_path.clone())
    }

    /// Records the current project state for the index just written.
    pub fn update_metadata(&self) -> Result<()> {
        let meta = ScipCacheMetadata {
            version: ScipCacheMetadata::CURRENT_VERSION,
            created_at: SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default(),
            language: self.language.name().to_string(),
            source_files: self.snapshot_sources(),
            lock_hash: self.lock_hash(),
        };

        let json =
            serde_json::to_string_pretty(&meta).context("failed to serialize cache metadata")?;
        fs::write(&self.meta_path, json)
            .with_context(|| format!("failed to write {}", self.meta_path.display()))?;

        debug!(files = meta.source_files.len(), "cache metadata updated");
        Ok(())
    }

    pub fn invalidate(&self) -> Result<()> {
        for path in [&self.index_path, &self.meta_path] {
            if path.exists() {
                fs::remove_file(path)
                    .with_context(|| format!("failed to remove {}", path.display()))?;
            }
        }
        Ok(())
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    fn load_metadata(&self) -> Result<ScipCacheMetadata> {
        let contents = fs::read_to_string(&self.meta_path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn snapshot_sources(&self) -> BTreeMap<String, u64> {
        let mut files = BTreeMap::new();
        // Hidden directories, including the cache itself, are skipped.
        for entry in WalkBuilder::new(&self.project_root).build().flatten() {
            let path = entry.path();
            if Language::from_path(path) != Some(self.language) {
                continue;
            }
            if let Ok(mtime) = file_mtime(path) {
                files.insert(path.to_string_lossy().into_owned(), mtime);
            }
        }
        files
    }

    fn lock_hash(&self) -> Option<String> {
        let contents = fs::read(self.project_root.join(self.language.lock_file())).ok()?;
        let digest = Sha256::digest(&contents);
        Some(digest.iter().map(|b| format!("{:02x}", b)).collect())
    }
}

fn file_mtime(path: &Path) -> Result<u64> {
    let modified = fs::metadata(path)?.modified()?;
    let since_epoch = modified.duration_since(SystemTime::UNIX_EPOCH)?;
    Ok(since_epoch.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn seeded_cache(dir: &Path) -> ScipCache {
        fs::write(dir.join("main.go"), "package main\nfunc main() {}\n").unwrap();
        let cache = ScipCache::new(dir, Language::Go);
        fs::create_dir_all(cache.cache_dir()).unwrap();
        fs::write(cache.index_path(), b"fake scip data").unwrap();
        cache
    }

    #[test]
    fn test_cache_miss_when_no_files() {
        let dir = tempdir().unwrap();
        let cache = ScipCache::new(dir.path(), Language::Go);
        assert!(cache.get_valid_cache().is_none());
    }

    #[test]
    fn test_cache_hit_after_metadata_update() {
        let dir = tempdir().unwrap();
        let cache = seeded_cache(dir.path());
        cache.update_metadata().unwrap();
        assert_eq!(cache.get_valid_cache().as_deref(), Some(cache.index_path()));
    }

    #[test]
    fn test_new_source_file_invalidates() {
        let dir = tempdir().unwrap();
        let cache = seeded_cache(dir.path());
        cache.update_metadata().unwrap();

        fs::write(dir.path().join("extra.go"), "package main\n").unwrap();
        assert!(cache.get_valid_cache().is_none());
    }

    #[test]
    fn test_other_languages_are_ignored() {
        let dir = tempdir().unwrap();
        let cache = seeded_cache(dir.path());
        cache.update_metadata().unwrap();

        fs::write(dir.path().join("notes.py"), "print(1)\n").unwrap();
        assert!(cache.get_valid_cache().is_some());
    }

    #[test]
    fn test_lock_file_change_invalidates() {
        let dir = tempdir().unwrap();
        let cache = seeded_cache(dir.path());
        fs::write(dir.path().join("go.sum"), "a v1.0.0 h1:x\n").unwrap();
        cache.update_metadata().unwrap();
        assert!(cache.get_valid_cache().is_some());

        fs::write(dir.path().join("go.sum"), "a v1.0.1 h1:y\n").unwrap();
        assert!(cache.get_valid_cache().is_none());
    }

    #[test]
    fn test_explicit_invalidation() {
        let dir = tempdir().unwrap();
        let cache = seeded_cache(dir.path());
        cache.update_metadata().unwrap();

        cache.invalidate().unwrap();
        assert!(!cache.index_path().exists());
        assert!(cache.get_valid_cache().is_none());
    }
}
