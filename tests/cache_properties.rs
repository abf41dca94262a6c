/// Integration tests for the analysis cache across handles and threads
use archlens::cache::{AnalysisCache, CacheMetadata, CacheNamespace, CacheSet};
use chrono::{TimeDelta, Utc};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn metadata() -> CacheMetadata {
    CacheMetadata::new("PAYROLL.cbl", "cobol").with_attribute("chunk", 1)
}

#[test]
fn test_entries_survive_reopening() {
    let dir = TempDir::new().unwrap();
    {
        let cache = AnalysisCache::open(dir.path(), CacheNamespace::Cobol, 24).unwrap();
        cache.put("PROCEDURE DIVISION.", &metadata(), "analysis").unwrap();
    }

    let reopened = AnalysisCache::open(dir.path(), CacheNamespace::Cobol, 24).unwrap();
    assert_eq!(
        reopened.get("PROCEDURE DIVISION.", &metadata()).as_deref(),
        Some("analysis")
    );
}

#[test]
fn test_concurrent_writers_of_same_key_leave_one_entry() {
    let dir = TempDir::new().unwrap();
    let cache = Arc::new(AnalysisCache::open(dir.path(), CacheNamespace::Generic, 24).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for _ in 0..10 {
                    cache.put("shared chunk", &metadata(), "same response").unwrap();
                    // Readers never observe a partial record
                    if let Some(response) = cache.get("shared chunk", &metadata()) {
                        assert_eq!(response, "same response");
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let stats = cache.stats().unwrap();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.valid, 1);
}

#[test]
fn test_expired_entry_is_deleted_on_read() {
    let dir = TempDir::new().unwrap();
    let cache = AnalysisCache::open(dir.path(), CacheNamespace::Repository, 24).unwrap();
    let stale = Utc::now() - TimeDelta::hours(25);

    cache
        .put_with_timestamp("repo summary", &metadata(), "old", stale)
        .unwrap();
    let path = cache
        .dir()
        .join(format!("{}.json", AnalysisCache::fingerprint("repo summary", &metadata())));
    assert!(path.exists());

    assert_eq!(cache.get("repo summary", &metadata()), None);
    assert!(!path.exists());
    assert_eq!(cache.purge_expired().unwrap(), 0);
}

#[test]
fn test_purge_counts_only_stale_entries() {
    let dir = TempDir::new().unwrap();
    let set = CacheSet::open(dir.path(), 24).unwrap();
    let stale = Utc::now() - TimeDelta::hours(30);

    set.generic
        .put_with_timestamp("a", &metadata(), "r", stale)
        .unwrap();
    set.generic
        .put_with_timestamp("b", &metadata(), "r", stale)
        .unwrap();
    set.generic.put("c", &metadata(), "r").unwrap();
    set.cobol.put_with_timestamp("a", &metadata(), "r", stale).unwrap();

    assert_eq!(set.generic.purge_expired().unwrap(), 2);
    assert_eq!(set.generic.stats().unwrap().total, 1);
    // Other namespaces are untouched
    assert_eq!(set.cobol.stats().unwrap().total, 1);
}

#[test]
fn test_ttl_boundary() {
    let dir = TempDir::new().unwrap();
    let cache = AnalysisCache::open(dir.path(), CacheNamespace::Generic, 24).unwrap();

    let recent = Utc::now() - TimeDelta::hours(23);
    cache.put_with_timestamp("recent", &metadata(), "r", recent).unwrap();
    assert_eq!(cache.get("recent", &metadata()).as_deref(), Some("r"));

    let old = Utc::now() - TimeDelta::hours(24);
    cache.put_with_timestamp("old", &metadata(), "r", old).unwrap();
    assert_eq!(cache.get("old", &metadata()), None);
}
