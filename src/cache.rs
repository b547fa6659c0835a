//! TTL-expiring cache for remote search results.
//!
//! One JSON file per (repository, search text) pair under the cache
//! directory, named by a blake3 digest of both: same inputs always land on
//! the same file, different inputs practically never collide. The hash is
//! addressing, not security.
//!
//! The cache is an optimization, never a correctness dependency: read and
//! write failures degrade to misses and corrupt entries are deleted on
//! sight. After any issue write the owning repository's entries are purged
//! wholesale, so later queries in the same run observe the write.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::gh::IssueSummary;

#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    repository: String,
    search_text: String,
    /// Unix seconds at write time
    created_at: u64,
    results: Vec<IssueSummary>,
}

/// Disk-backed query cache with per-entry TTL.
#[derive(Debug)]
pub struct QueryCache {
    dir: PathBuf,
    ttl: Duration,
}

impl QueryCache {
    pub fn new(dir: PathBuf, ttl: Duration) -> Self {
        Self { dir, ttl }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.cache_dir.clone(), config.cache_ttl)
    }

    /// Deterministic cache key for a (repository, search text) pair.
    pub fn key(repository: &str, search_text: &str) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(repository.as_bytes());
        hasher.update(b"\0");
        hasher.update(search_text.as_bytes());
        hasher.finalize().to_hex().to_string()
    }

    fn entry_path(&self, repository: &str, search_text: &str) -> PathBuf {
        self.dir.join(format!("{}.json", Self::key(repository, search_text)))
    }

    /// Look up a prior result. Expired and corrupt entries are misses.
    pub fn get(&self, repository: &str, search_text: &str) -> Option<Vec<IssueSummary>> {
        self.get_at(repository, search_text, now_secs())
    }

    fn get_at(&self, repository: &str, search_text: &str, now: u64) -> Option<Vec<IssueSummary>> {
        let path = self.entry_path(repository, search_text);
        let entry = match read_entry(&path) {
            Some(entry) => entry,
            None => return None,
        };

        if now.saturating_sub(entry.created_at) > self.ttl.as_secs() {
            tracing::debug!("Cache entry expired: {}", path.display());
            let _ = std::fs::remove_file(&path);
            return None;
        }

        tracing::debug!("Cache hit: {}", path.display());
        Some(entry.results)
    }

    /// Store a search result. Failures are logged and swallowed.
    pub fn put(&self, repository: &str, search_text: &str, results: &[IssueSummary]) {
        self.put_at(repository, search_text, results, now_secs());
    }

    fn put_at(&self, repository: &str, search_text: &str, results: &[IssueSummary], now: u64) {
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            tracing::warn!("Cannot create cache dir {}: {}", self.dir.display(), e);
            return;
        }

        let entry = StoredEntry {
            repository: repository.to_string(),
            search_text: search_text.to_string(),
            created_at: now,
            results: results.to_vec(),
        };
        let path = self.entry_path(repository, search_text);
        match serde_json::to_string(&entry) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    tracing::warn!("Cache write failed for {}: {}", path.display(), e);
                }
            }
            Err(e) => tracing::warn!("Cache serialization failed: {}", e),
        }
    }

    /// Purge every entry belonging to `repository`. Returns how many were
    /// removed. Entries that cannot be read are removed too.
    pub fn invalidate(&self, repository: &str) -> usize {
        let mut removed = 0;
        for path in self.entry_files() {
            let matches = match read_entry(&path) {
                Some(entry) => entry.repository == repository,
                // Unreadable entries carry no provenance; drop them
                None => true,
            };
            if matches && std::fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::debug!("Invalidated {} cache entries for {}", removed, repository);
        }
        removed
    }

    /// Remove expired and corrupt entries. Returns (removed, kept).
    pub fn cleanup(&self) -> (usize, usize) {
        self.cleanup_at(now_secs())
    }

    fn cleanup_at(&self, now: u64) -> (usize, usize) {
        let mut removed = 0;
        let mut kept = 0;
        for path in self.entry_files() {
            let expired = match read_entry(&path) {
                Some(entry) => now.saturating_sub(entry.created_at) > self.ttl.as_secs(),
                None => true,
            };
            if expired {
                if std::fs::remove_file(&path).is_ok() {
                    removed += 1;
                }
            } else {
                kept += 1;
            }
        }
        (removed, kept)
    }

    fn entry_files(&self) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect()
    }
}

fn read_entry(path: &Path) -> Option<StoredEntry> {
    let content = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&content) {
        Ok(entry) => Some(entry),
        Err(e) => {
            tracing::warn!("Corrupt cache entry {}, treating as miss: {}", path.display(), e);
            None
        }
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn issue(number: u64, title: &str) -> IssueSummary {
        IssueSummary {
            number,
            title: title.to_string(),
        }
    }

    fn cache_in(dir: &TempDir, ttl_secs: u64) -> QueryCache {
        QueryCache::new(dir.path().to_path_buf(), Duration::from_secs(ttl_secs))
    }

    #[test]
    fn test_key_deterministic_and_distinct() {
        let a = QueryCache::key("acme/app", "\"CVE-2024-0001\" in:title");
        let b = QueryCache::key("acme/app", "\"CVE-2024-0001\" in:title");
        assert_eq!(a, b);

        assert_ne!(a, QueryCache::key("acme/other", "\"CVE-2024-0001\" in:title"));
        assert_ne!(a, QueryCache::key("acme/app", "\"CVE-2024-0002\" in:title"));
    }

    #[test]
    fn test_roundtrip() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir, 3600);

        assert!(cache.get("acme/app", "q").is_none());
        cache.put("acme/app", "q", &[issue(42, "CVE-2024-0001 detected")]);
        let hit = cache.get("acme/app", "q").unwrap();
        assert_eq!(hit, vec![issue(42, "CVE-2024-0001 detected")]);
    }

    #[test]
    fn test_empty_result_set_is_cached() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir, 3600);

        cache.put("acme/app", "q", &[]);
        assert_eq!(cache.get("acme/app", "q"), Some(vec![]));
    }

    #[test]
    fn test_ttl_boundary() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir, 3600);

        cache.put_at("acme/app", "q", &[issue(1, "t")], 1000);
        // One second before expiry: servable
        assert!(cache.get_at("acme/app", "q", 1000 + 3600 - 1).is_some());
        // One second past expiry: miss
        cache.put_at("acme/app", "q", &[issue(1, "t")], 1000);
        assert!(cache.get_at("acme/app", "q", 1000 + 3600 + 1).is_none());
    }

    #[test]
    fn test_corrupt_entry_is_miss() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir, 3600);

        let path = dir
            .path()
            .join(format!("{}.json", QueryCache::key("acme/app", "q")));
        std::fs::write(&path, "not json {{{").unwrap();
        assert!(cache.get("acme/app", "q").is_none());
    }

    #[test]
    fn test_invalidate_only_matching_repository() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir, 3600);

        cache.put("acme/app", "q1", &[issue(1, "a")]);
        cache.put("acme/app", "q2", &[issue(2, "b")]);
        cache.put("acme/other", "q1", &[issue(3, "c")]);

        let removed = cache.invalidate("acme/app");
        assert_eq!(removed, 2);
        assert!(cache.get("acme/app", "q1").is_none());
        assert!(cache.get("acme/app", "q2").is_none());
        assert!(cache.get("acme/other", "q1").is_some());
    }

    #[test]
    fn test_cleanup_removes_expired_and_corrupt() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir, 3600);

        cache.put_at("acme/app", "old", &[], 0);
        cache.put_at("acme/app", "fresh", &[], 10_000);
        std::fs::write(dir.path().join("garbage.json"), "{{{").unwrap();

        let (removed, kept) = cache.cleanup_at(10_001);
        assert_eq!(removed, 2);
        assert_eq!(kept, 1);
    }

    #[test]
    fn test_cleanup_on_missing_dir() {
        let dir = TempDir::new().unwrap();
        let cache = QueryCache::new(dir.path().join("nonexistent"), Duration::from_secs(60));
        assert_eq!(cache.cleanup(), (0, 0));
    }
}
