//! Memoisation of load results keyed by file content.
//!
//! A key is the SHA-256 of the uploaded bytes, the reader chosen from the file
//! name and the skip-row count. A renamed copy of the same file hits the cache,
//! while the same bytes under an unsupported extension are still rejected.
//! Only successful loads are stored.

use indexmap::IndexMap;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::data_loader::SourceFormat;
use crate::errors::LoadResult;
use crate::pipeline::LoadOutcome;

/// Number of datasets kept by a plan run
pub const DEFAULT_CAPACITY: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub format: SourceFormat,
    pub content_hash: String,
    pub skip_rows: usize,
}

impl CacheKey {
    pub fn new(format: SourceFormat, content: &[u8], skip_rows: usize) -> Self {
        Self {
            format,
            content_hash: format!("{:x}", Sha256::digest(content)),
            skip_rows,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Least-recently-used store of successful loads. `None` capacity never evicts.
#[derive(Debug, Default)]
pub struct DatasetCache {
    entries: IndexMap<CacheKey, LoadOutcome>,
    capacity: Option<usize>,
    stats: CacheStats,
}

impl DatasetCache {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            entries: IndexMap::new(),
            capacity: capacity.map(|c| c.max(1)),
            stats: CacheStats::default(),
        }
    }

    /// Looks up `key` and marks it most recently used.
    pub fn get(&mut self, key: &CacheKey) -> Option<LoadOutcome> {
        let index = self.entries.get_index_of(key)?;
        let last = self.entries.len() - 1;
        self.entries.move_index(index, last);
        self.entries.get_index(last).map(|(_, outcome)| outcome.clone())
    }

    /// Returns the cached outcome for this content, or runs `load` and stores
    /// its result when it succeeds. An unsupported `file_name` fails before
    /// the lookup.
    pub fn get_or_insert_with<F>(
        &mut self,
        file_name: &str,
        content: &[u8],
        skip_rows: usize,
        load: F,
    ) -> LoadResult<LoadOutcome>
    where
        F: FnOnce() -> LoadResult<LoadOutcome>,
    {
        let format = SourceFormat::from_file_name(file_name)?;
        let key = CacheKey::new(format, content, skip_rows);
        if let Some(outcome) = self.get(&key) {
            self.stats.hits += 1;
            debug!("Cache hit for {} (skip {})", key.content_hash, skip_rows);
            return Ok(outcome);
        }

        self.stats.misses += 1;
        let outcome = load()?;
        if let Some(capacity) = self.capacity {
            while self.entries.len() >= capacity {
                if let Some((evicted, _)) = self.entries.shift_remove_index(0) {
                    debug!("Evicted cached dataset {}", evicted.content_hash);
                }
            }
        }
        self.entries.insert(key, outcome.clone());
        Ok(outcome)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{ClassifierConfig, KeywordClassifier};
    use crate::errors::LoadError;
    use crate::pipeline::LoadPipeline;
    use crate::schema::ColumnAliases;
    use std::cell::Cell;
    use std::sync::Arc;

    const CSV: &str = "Date;Nature;Message\n05/01/2024;Sécurité;bagarre\n";

    fn pipeline() -> LoadPipeline {
        let classifier = KeywordClassifier::new(&ClassifierConfig::default()).unwrap();
        LoadPipeline::new(ColumnAliases::default(), classifier).with_diagnostic_log(None)
    }

    #[test]
    fn test_key_depends_on_format_content_and_skip_rows() {
        let a = CacheKey::new(SourceFormat::Csv, b"abc", 3);
        assert_eq!(a, CacheKey::new(SourceFormat::Csv, b"abc", 3));
        assert_ne!(a, CacheKey::new(SourceFormat::Csv, b"abc", 0));
        assert_ne!(a, CacheKey::new(SourceFormat::Csv, b"abd", 3));
        assert_ne!(a, CacheKey::new(SourceFormat::Xlsx, b"abc", 3));
        assert_eq!(a.content_hash.len(), 64);
    }

    #[test]
    fn test_cached_content_under_unsupported_name_is_rejected() {
        let p = pipeline();
        let mut cache = DatasetCache::new(None);
        cache
            .get_or_insert_with("a.csv", CSV.as_bytes(), 0, || p.load("a.csv", CSV.as_bytes(), 0))
            .unwrap();

        let calls = Cell::new(0);
        let err = cache
            .get_or_insert_with("a.pdf", CSV.as_bytes(), 0, || {
                calls.set(calls.get() + 1);
                p.load("a.pdf", CSV.as_bytes(), 0)
            })
            .unwrap_err();

        assert!(matches!(err, LoadError::UnsupportedFileType(ref name) if name == "a.pdf"));
        assert_eq!(calls.get(), 0);
        assert_eq!(cache.stats(), CacheStats { hits: 0, misses: 1 });
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_second_load_is_served_from_cache() {
        let p = pipeline();
        let mut cache = DatasetCache::new(None);
        let calls = Cell::new(0);
        let load = || {
            calls.set(calls.get() + 1);
            p.load("a.csv", CSV.as_bytes(), 0)
        };

        let first = cache
            .get_or_insert_with("a.csv", CSV.as_bytes(), 0, load)
            .unwrap();
        let second = cache
            .get_or_insert_with("renamed.csv", CSV.as_bytes(), 0, || {
                calls.set(calls.get() + 1);
                p.load("renamed.csv", CSV.as_bytes(), 0)
            })
            .unwrap();

        assert_eq!(calls.get(), 1);
        assert!(Arc::ptr_eq(&first.dataset, &second.dataset));
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1 });
    }

    #[test]
    fn test_failures_are_not_cached() {
        let p = pipeline();
        let mut cache = DatasetCache::new(None);
        let bad = b"Jour\n05/01/2024\n";
        assert!(cache
            .get_or_insert_with("a.csv", bad, 0, || p.load("a.csv", bad, 0))
            .is_err());
        assert!(cache.is_empty());
        assert!(cache
            .get_or_insert_with("a.csv", bad, 0, || p.load("a.csv", bad, 0))
            .is_err());
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn test_least_recently_used_is_evicted() {
        let p = pipeline();
        let mut cache = DatasetCache::new(Some(2));
        let files: Vec<String> = (1..=3)
            .map(|day| format!("Date\n0{}/01/2024\n", day))
            .collect();

        for file in &files[..2] {
            cache
                .get_or_insert_with("a.csv", file.as_bytes(), 0, || {
                    p.load("a.csv", file.as_bytes(), 0)
                })
                .unwrap();
        }
        // touch the first entry so the second becomes the oldest
        assert!(cache.get(&CacheKey::new(SourceFormat::Csv, files[0].as_bytes(), 0)).is_some());
        cache
            .get_or_insert_with("a.csv", files[2].as_bytes(), 0, || {
                p.load("a.csv", files[2].as_bytes(), 0)
            })
            .unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&CacheKey::new(SourceFormat::Csv, files[0].as_bytes(), 0)).is_some());
        assert!(cache.get(&CacheKey::new(SourceFormat::Csv, files[1].as_bytes(), 0)).is_none());
    }

    #[test]
    fn test_zero_capacity_keeps_one_entry() {
        let p = pipeline();
        let mut cache = DatasetCache::new(Some(0));
        cache
            .get_or_insert_with("a.csv", CSV.as_bytes(), 0, || {
                p.load("a.csv", CSV.as_bytes(), 0)
            })
            .unwrap();
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
