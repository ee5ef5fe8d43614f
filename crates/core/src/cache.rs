use std::{
    collections::HashMap,
    sync::Mutex,
    time::Duration,
};

use tokio::time::Instant;

/// Cache key: exact (video id, language) pair, no normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub video_id: String,
    pub language: String,
}

impl CacheKey {
    pub fn new(video_id: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            language: language.into(),
        }
    }
}

struct CacheEntry {
    transcript: String,
    stored_at: Instant,
}

pub const DEFAULT_TRANSCRIPT_TTL: Duration = Duration::from_secs(10 * 60);

/// In-memory TTL-bounded transcript store, shared across concurrent
/// requests. Expired entries are treated as absent and purged on read.
/// A failed fetch is never stored, so there is no negative caching.
pub struct TranscriptCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    ttl: Duration,
}

impl TranscriptCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached transcript, or `None` if the key is absent or
    /// the entry has outlived its TTL.
    pub fn get(&self, key: &CacheKey) -> Option<String> {
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        match entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => {
                Some(entry.transcript.clone())
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Stores a transcript, replacing any existing entry. Last put wins.
    pub fn put(&self, key: CacheKey, transcript: String) {
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        entries.insert(
            key,
            CacheEntry {
                transcript,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn invalidate(&self, key: &CacheKey) {
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        entries.remove(key);
    }
}

impl Default for TranscriptCache {
    fn default() -> Self {
        Self::new(DEFAULT_TRANSCRIPT_TTL)
    }
}
