//! Shared pattern cache
//!
//! Maps notation text plus options to one live [`Pattern`]. A hit hands back
//! the same pattern, so a caller asking for "the next event of this text" on
//! every call walks through it like a persistent iterator without holding on
//! to it. Entries expire a fixed time after insertion and the least recently
//! used entry makes room when the cache is full.

use crate::options::Options;
use crate::pattern::Pattern;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;
use ziffers_core::Event;

/// A cached pattern. Lock it for every use; `next` is not safe to call from
/// two places at once without the lock.
pub type SharedPattern = Arc<Mutex<Pattern>>;

/// Source of the current time for expiry
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheConfig {
    /// Maximum number of live patterns
    pub capacity: usize,
    /// Lifetime of an entry, counted from insertion
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            capacity: 1000,
            ttl: Duration::from_secs(5 * 60),
        }
    }
}

struct Entry {
    pattern: SharedPattern,
    inserted_at: Instant,
    last_used: u64,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, Entry>,
    tick: u64,
}

/// Bounded, expiring store of live patterns
pub struct PatternCache {
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<CacheState>,
}

impl PatternCache {
    /// Create a cache on the system clock
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        PatternCache {
            config,
            clock,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn config(&self) -> CacheConfig {
        self.config
    }

    /// Return the live pattern for `text` and `options`, building it on a
    /// miss. Lookup and insertion happen under one lock so concurrent callers
    /// never build the same pattern twice.
    pub fn get_or_create(&self, text: &str, options: &Options) -> SharedPattern {
        let key = options.cache_key(text);
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.tick += 1;
        let tick = state.tick;

        let expired = state
            .entries
            .get(&key)
            .is_some_and(|entry| now.duration_since(entry.inserted_at) >= self.config.ttl);
        if expired {
            debug!(key = %key, "cache entry expired");
            state.entries.remove(&key);
        }

        if let Some(entry) = state.entries.get_mut(&key) {
            debug!(key = %key, "cache hit");
            entry.last_used = tick;
            return entry.pattern.clone();
        }

        debug!(key = %key, "cache miss");
        if self.config.capacity == 0 {
            return Arc::new(Mutex::new(Pattern::new(text, options.clone())));
        }
        while state.entries.len() >= self.config.capacity {
            let Some(oldest) = state
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| key.clone())
            else {
                break;
            };
            debug!(key = %oldest, "evicting least recently used pattern");
            state.entries.remove(&oldest);
        }

        let pattern = Arc::new(Mutex::new(Pattern::new(text, options.clone())));
        state.entries.insert(
            key,
            Entry {
                pattern: pattern.clone(),
                inserted_at: now,
                last_used: tick,
            },
        );
        pattern
    }

    /// Next event of the cached pattern for `text` and `options`
    pub fn next(&self, text: &str, options: &Options) -> Option<Event> {
        self.get_or_create(text, options).lock().next()
    }

    /// Event at `index` of the cached pattern, without moving its cursor
    pub fn get(&self, text: &str, options: &Options, index: usize) -> Option<Event> {
        self.get_or_create(text, options).lock().get(index).cloned()
    }

    /// Remove one entry; returns whether it was present
    pub fn clear(&self, text: &str, options: &Options) -> bool {
        let key = options.cache_key(text);
        self.state.lock().entries.remove(&key).is_some()
    }

    pub fn clear_all(&self) {
        self.state.lock().entries.clear();
    }

    /// Drop every expired entry and return how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let ttl = self.config.ttl;
        let mut state = self.state.lock();
        let before = state.entries.len();
        state
            .entries
            .retain(|_, entry| now.duration_since(entry.inserted_at) < ttl);
        before - state.entries.len()
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PatternCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
