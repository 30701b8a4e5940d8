//! Persistent question -> answer cache.
//!
//! Keys are normalized question texts so that "Years of experience with Rust?*"
//! and "years of experience with rust" share an entry. The backing file is a
//! JSON document written atomically (temp file + rename).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{AnswerSource, AnswerValue, FieldType};

const CACHE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache I/O error: {0}")]
    Io(String),

    #[error("Cache serialization error: {0}")]
    Serialization(String),
}

/// One remembered answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerCacheEntry {
    pub field_type: FieldType,
    pub answer: AnswerValue,
    pub source: AnswerSource,
    pub updated_at: DateTime<Utc>,
}

impl AnswerCacheEntry {
    pub fn new(field_type: FieldType, answer: AnswerValue, source: AnswerSource) -> Self {
        Self {
            field_type,
            answer,
            source,
            updated_at: Utc::now(),
        }
    }
}

/// Aggregate view of the cache contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub total: usize,
    pub by_source: BTreeMap<AnswerSource, usize>,
    /// AI answers past their maximum age.
    pub expired: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    answers: BTreeMap<String, AnswerCacheEntry>,
}

/// Normalize question text into a cache key.
///
/// Lowercases, turns punctuation into spaces and collapses whitespace.
pub fn normalize_question(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub struct AnswerCache {
    path: Option<PathBuf>,
    entries: BTreeMap<String, AnswerCacheEntry>,
    ai_max_age: Option<Duration>,
    dirty: bool,
}

impl AnswerCache {
    /// Cache with no backing file.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: BTreeMap::new(),
            ai_max_age: None,
            dirty: false,
        }
    }

    /// Load the cache stored at `path`. A missing file yields an empty cache
    /// that will be created on the first flush.
    pub fn load(path: &Path) -> Result<Self, CacheError> {
        let entries = if path.exists() {
            let content =
                std::fs::read_to_string(path).map_err(|e| CacheError::Io(e.to_string()))?;
            Self::parse(&content)?
        } else {
            tracing::debug!(path = %path.display(), "No answer cache yet, starting empty");
            BTreeMap::new()
        };

        Ok(Self {
            path: Some(path.to_path_buf()),
            entries,
            ai_max_age: None,
            dirty: false,
        })
    }

    /// Treat AI-generated entries older than `days` as misses.
    pub fn with_ai_max_age_days(mut self, days: u32) -> Self {
        self.ai_max_age = Some(Duration::days(days as i64));
        self
    }

    fn parse(content: &str) -> Result<BTreeMap<String, AnswerCacheEntry>, CacheError> {
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        let file: CacheFile =
            serde_json::from_str(content).map_err(|e| CacheError::Serialization(e.to_string()))?;
        if file.version > CACHE_FORMAT_VERSION {
            return Err(CacheError::Serialization(format!(
                "unsupported cache version {}",
                file.version
            )));
        }
        Ok(file.answers)
    }

    /// Restore entries from a JSON document produced by [`AnswerCache::to_json`].
    pub fn from_json(content: &str) -> Result<Self, CacheError> {
        Ok(Self {
            entries: Self::parse(content)?,
            ..Self::in_memory()
        })
    }

    pub fn to_json(&self) -> Result<String, CacheError> {
        let file = CacheFile {
            version: CACHE_FORMAT_VERSION,
            answers: self.entries.clone(),
        };
        serde_json::to_string_pretty(&file).map_err(|e| CacheError::Serialization(e.to_string()))
    }

    fn is_expired(&self, entry: &AnswerCacheEntry) -> bool {
        match (entry.source, self.ai_max_age) {
            (AnswerSource::AiGenerated, Some(max_age)) => Utc::now() - entry.updated_at > max_age,
            _ => false,
        }
    }

    /// Look up a question. Expired AI answers are misses.
    pub fn get(&self, question: &str) -> Option<&AnswerCacheEntry> {
        self.entries
            .get(&normalize_question(question))
            .filter(|entry| !self.is_expired(entry))
    }

    /// Store an answer.
    ///
    /// A live entry is only replaced when `overwrite` is set; expired entries
    /// are always replaced. Returns whether the cache changed.
    pub fn put(&mut self, question: &str, entry: AnswerCacheEntry, overwrite: bool) -> bool {
        let key = normalize_question(question);
        if key.is_empty() {
            return false;
        }

        if let Some(existing) = self.entries.get(&key) {
            if !self.is_expired(existing) {
                if !overwrite {
                    return false;
                }
                if existing.answer == entry.answer
                    && existing.source == entry.source
                    && existing.field_type == entry.field_type
                {
                    return false;
                }
            }
        }

        self.entries.insert(key, entry);
        self.dirty = true;
        true
    }

    /// Drop a single question. Returns whether it was present.
    pub fn remove(&mut self, question: &str) -> bool {
        let removed = self.entries.remove(&normalize_question(question)).is_some();
        self.dirty |= removed;
        removed
    }

    /// Remove every expired AI answer, returning how many were dropped.
    pub fn prune_expired(&mut self) -> usize {
        let before = self.entries.len();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| self.is_expired(entry))
            .map(|(key, _)| key.clone())
            .collect();
        for key in expired {
            self.entries.remove(&key);
        }
        let removed = before - self.entries.len();
        self.dirty |= removed > 0;
        removed
    }

    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            self.entries.clear();
            self.dirty = true;
        }
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats {
            total: self.entries.len(),
            ..Default::default()
        };
        for entry in self.entries.values() {
            *stats.by_source.entry(entry.source).or_insert(0) += 1;
            if self.is_expired(entry) {
                stats.expired += 1;
            }
        }
        stats
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AnswerCacheEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether there are changes not yet flushed.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Persist pending changes. A no-op for in-memory caches or when nothing changed.
    pub fn flush(&mut self) -> Result<(), CacheError> {
        let Some(path) = self.path.clone() else {
            self.dirty = false;
            return Ok(());
        };
        if !self.dirty {
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| CacheError::Io(e.to_string()))?;
            }
        }

        let json = self.to_json()?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| CacheError::Io(e.to_string()))?;
        std::fs::rename(&tmp, &path).map_err(|e| CacheError::Io(e.to_string()))?;

        self.dirty = false;
        tracing::debug!(path = %path.display(), entries = self.entries.len(), "Answer cache flushed");
        Ok(())
    }
}
