//! Content-addressed cache of analysis responses
//!
//! Each namespace is a directory holding one JSON record per fingerprint.
//! Keys are derived from content and metadata only, so concurrent writers of
//! the same key write equivalent records and no locking is needed.

use crate::error::{CacheError, ValidationError};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Kind of analysis a cache directory holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheNamespace {
    Cobol,
    Generic,
    Repository,
}

impl CacheNamespace {
    pub const ALL: [CacheNamespace; 3] = [
        CacheNamespace::Cobol,
        CacheNamespace::Generic,
        CacheNamespace::Repository,
    ];

    /// Directory name of the namespace
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheNamespace::Cobol => "cobol_analysis",
            CacheNamespace::Generic => "generic_analysis",
            CacheNamespace::Repository => "repository_analysis",
        }
    }
}

impl std::fmt::Display for CacheNamespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheNamespace {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cobol" | "cobol_analysis" => Ok(CacheNamespace::Cobol),
            "generic" | "generic_analysis" => Ok(CacheNamespace::Generic),
            "repository" | "repository_analysis" => Ok(CacheNamespace::Repository),
            _ => Err(ValidationError::UnknownNamespace(s.to_string())),
        }
    }
}

/// Metadata stored with an entry; `name` and `language` are part of the key
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub name: String,
    pub language: String,
    /// Informational only, not part of the key
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl CacheMetadata {
    pub fn new(name: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            language: language.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.attributes.insert(key.into(), value.to_string());
        self
    }
}

/// One persisted analysis response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub timestamp: DateTime<Utc>,
    pub metadata: CacheMetadata,
    pub fingerprint: String,
    /// SHA-256 of the content alone
    pub content_hash: String,
    pub analysis_response: String,
}

/// Entry counts of one namespace
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub namespace: String,
    pub total: usize,
    pub valid: usize,
    /// Expired or unreadable entries
    pub expired: usize,
    pub size_bytes: u64,
}

/// Cache handle for one namespace
#[derive(Debug, Clone)]
pub struct AnalysisCache {
    dir: PathBuf,
    namespace: CacheNamespace,
    ttl: TimeDelta,
}

impl AnalysisCache {
    /// Open (and create if needed) the namespace directory under `root`
    pub fn open(root: &Path, namespace: CacheNamespace, ttl_hours: u64) -> Result<Self, CacheError> {
        let dir = root.join(namespace.as_str());
        fs::create_dir_all(&dir).map_err(|e| {
            CacheError::DirectoryCreationFailed(format!("{}: {}", dir.display(), e))
        })?;

        let ttl = i64::try_from(ttl_hours)
            .ok()
            .and_then(TimeDelta::try_hours)
            .unwrap_or(TimeDelta::MAX);

        tracing::debug!("Analysis cache {} initialized at {}", namespace, dir.display());
        Ok(Self { dir, namespace, ttl })
    }

    pub fn namespace(&self) -> CacheNamespace {
        self.namespace
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Key of `content` under `metadata`
    ///
    /// Fields are separated by a NUL byte so that shifting characters between
    /// them changes the key.
    pub fn fingerprint(content: &str, metadata: &CacheMetadata) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        hasher.update([0u8]);
        hasher.update(metadata.name.as_bytes());
        hasher.update([0u8]);
        hasher.update(metadata.language.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn content_hash(content: &str) -> String {
        format!("{:x}", Sha256::digest(content.as_bytes()))
    }

    fn entry_path(&self, fingerprint: &str) -> PathBuf {
        self.dir.join(format!("{}.json", fingerprint))
    }

    fn is_expired(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(entry.timestamp) >= self.ttl
    }

    fn read_entry(path: &Path) -> Result<CacheEntry, CacheError> {
        let raw = fs::read_to_string(path).map_err(|e| CacheError::LoadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&raw).map_err(|e| CacheError::ParseFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    fn remove(path: &Path) -> Result<(), CacheError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::RemoveFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// Fresh entry for `content`, if any
    ///
    /// A stale entry is deleted and reported as a miss.
    pub fn lookup(
        &self,
        content: &str,
        metadata: &CacheMetadata,
    ) -> Result<Option<CacheEntry>, CacheError> {
        let path = self.entry_path(&Self::fingerprint(content, metadata));
        if !path.exists() {
            return Ok(None);
        }

        let entry = Self::read_entry(&path)?;
        if self.is_expired(&entry, Utc::now()) {
            Self::remove(&path)?;
            tracing::info!("Removed expired cache entry for {}", metadata.name);
            return Ok(None);
        }

        Ok(Some(entry))
    }

    /// Cached response for `content`; any cache fault is a miss
    pub fn get(&self, content: &str, metadata: &CacheMetadata) -> Option<String> {
        match self.lookup(content, metadata) {
            Ok(Some(entry)) => {
                tracing::info!("Cache hit in {} for {}", self.namespace, metadata.name);
                Some(entry.analysis_response)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Cache read failed, treating as miss: {}", e);
                None
            }
        }
    }

    /// Store `response`, replacing any entry with the same key
    pub fn put(
        &self,
        content: &str,
        metadata: &CacheMetadata,
        response: &str,
    ) -> Result<(), CacheError> {
        self.put_with_timestamp(content, metadata, response, Utc::now())
    }

    /// Store `response` as if it had been written at `timestamp`
    pub fn put_with_timestamp(
        &self,
        content: &str,
        metadata: &CacheMetadata,
        response: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        let fingerprint = Self::fingerprint(content, metadata);
        let path = self.entry_path(&fingerprint);
        let entry = CacheEntry {
            timestamp,
            metadata: metadata.clone(),
            content_hash: Self::content_hash(content),
            fingerprint,
            analysis_response: response.to_string(),
        };

        let save_failed = |reason: String| CacheError::SaveFailed {
            path: path.display().to_string(),
            reason,
        };

        let json = serde_json::to_string_pretty(&entry).map_err(|e| save_failed(e.to_string()))?;

        // Write to a sibling temp file and rename, so readers never see a partial record
        let mut tmp =
            tempfile::NamedTempFile::new_in(&self.dir).map_err(|e| save_failed(e.to_string()))?;
        tmp.write_all(json.as_bytes())
            .map_err(|e| save_failed(e.to_string()))?;
        tmp.persist(&path)
            .map_err(|e| save_failed(e.error.to_string()))?;

        tracing::debug!("Analysis cached in {} for {}", self.namespace, metadata.name);
        Ok(())
    }

    /// [`get`](Self::get) run on the blocking pool
    pub async fn fetch(&self, content: String, metadata: CacheMetadata) -> Option<String> {
        let cache = self.clone();
        match tokio::task::spawn_blocking(move || cache.get(&content, &metadata)).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!("Cache read task failed, treating as miss: {}", e);
                None
            }
        }
    }

    /// [`put`](Self::put) run on the blocking pool
    pub async fn store(
        &self,
        content: String,
        metadata: CacheMetadata,
        response: String,
    ) -> Result<(), CacheError> {
        let cache = self.clone();
        tokio::task::spawn_blocking(move || cache.put(&content, &metadata, &response))
            .await
            .map_err(|e| CacheError::SaveFailed {
                path: self.dir.display().to_string(),
                reason: e.to_string(),
            })?
    }

    fn entry_files(&self) -> Result<Vec<PathBuf>, CacheError> {
        let read_dir = fs::read_dir(&self.dir).map_err(|e| CacheError::LoadFailed {
            path: self.dir.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut files: Vec<PathBuf> = read_dir
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort();
        Ok(files)
    }

    /// Delete expired and unreadable entries, returning how many were removed
    pub fn purge_expired(&self) -> Result<usize, CacheError> {
        let now = Utc::now();
        let mut removed = 0;

        for path in self.entry_files()? {
            let stale = match Self::read_entry(&path) {
                Ok(entry) => self.is_expired(&entry, now),
                Err(e) => {
                    tracing::warn!("Removing unreadable cache entry: {}", e);
                    true
                }
            };
            if stale {
                Self::remove(&path)?;
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::info!("Cleaned up {} expired entries from {}", removed, self.namespace);
        }
        Ok(removed)
    }

    /// Delete every entry, returning how many were removed
    pub fn purge_all(&self) -> Result<usize, CacheError> {
        let files = self.entry_files()?;
        for path in &files {
            Self::remove(path)?;
        }
        tracing::info!("Cleared {} entries from {}", files.len(), self.namespace);
        Ok(files.len())
    }

    pub fn stats(&self) -> Result<CacheStats, CacheError> {
        let now = Utc::now();
        let mut stats = CacheStats {
            namespace: self.namespace.to_string(),
            ..CacheStats::default()
        };

        for path in self.entry_files()? {
            stats.total += 1;
            stats.size_bytes += fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            match Self::read_entry(&path) {
                Ok(entry) if !self.is_expired(&entry, now) => stats.valid += 1,
                _ => stats.expired += 1,
            }
        }

        Ok(stats)
    }
}

/// Handles for every namespace under one root
#[derive(Debug, Clone)]
pub struct CacheSet {
    pub cobol: AnalysisCache,
    pub generic: AnalysisCache,
    pub repository: AnalysisCache,
}

impl CacheSet {
    pub fn open(root: &Path, ttl_hours: u64) -> Result<Self, CacheError> {
        Ok(Self {
            cobol: AnalysisCache::open(root, CacheNamespace::Cobol, ttl_hours)?,
            generic: AnalysisCache::open(root, CacheNamespace::Generic, ttl_hours)?,
            repository: AnalysisCache::open(root, CacheNamespace::Repository, ttl_hours)?,
        })
    }

    pub fn get(&self, namespace: CacheNamespace) -> &AnalysisCache {
        match namespace {
            CacheNamespace::Cobol => &self.cobol,
            CacheNamespace::Generic => &self.generic,
            CacheNamespace::Repository => &self.repository,
        }
    }
}
