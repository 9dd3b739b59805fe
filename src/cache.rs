//! Last-shown cache of loaded photos with rate-limited age eviction.
//!
//! The slideshow re-shows images from a small rotating pool. An entry that
//! has not been shown for `max_age` is assumed to have cycled out and is
//! dropped by the next sweep. Sweeps themselves run at most once per
//! `sweep_interval`, however often they are requested.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::image_ref::ImageRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvictionPolicy {
    /// Minimum spacing between two sweeps that actually scan the store.
    pub sweep_interval: Duration,
    /// Entries last shown longer ago than this are evicted.
    pub max_age: Duration,
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::minutes(15),
            max_age: Duration::hours(4),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry<H> {
    pub key: ImageRef,
    pub image: H,
    pub last_shown: DateTime<Utc>,
}

#[derive(Debug)]
pub struct ImageCache<H, C = SystemClock> {
    entries: HashMap<ImageRef, CacheEntry<H>>,
    last_cleanup: DateTime<Utc>,
    policy: EvictionPolicy,
    clock: C,
}

impl<H: Clone, C: Clock> ImageCache<H, C> {
    pub fn new(policy: EvictionPolicy, clock: C) -> Self {
        let last_cleanup = clock.now();
        Self {
            entries: HashMap::new(),
            last_cleanup,
            policy,
            clock,
        }
    }

    /// Returns the cached handle for `image`, creating it with `load` on a
    /// miss. Either way the entry counts as shown now.
    pub fn get_or_load(&mut self, image: &ImageRef, load: impl FnOnce(&ImageRef) -> H) -> H {
        let now = self.clock.now();
        let entry = self.entries.entry(image.clone()).or_insert_with(|| {
            debug!(uri = %image, "cache miss; loading");
            CacheEntry {
                key: image.clone(),
                image: load(image),
                last_shown: now,
            }
        });
        entry.last_shown = now;
        entry.image.clone()
    }

    /// Marks `image` as shown now. Returns false if it is not cached.
    pub fn touch(&mut self, image: &ImageRef) -> bool {
        let now = self.clock.now();
        match self.entries.get_mut(image) {
            Some(entry) => {
                entry.last_shown = now;
                true
            }
            None => false,
        }
    }

    /// Evicts stale entries unless a sweep already ran within the rate-limit
    /// window. Returns the number removed, or `None` when skipped.
    pub fn sweep(&mut self) -> Option<usize> {
        let now = self.clock.now();
        if now - self.last_cleanup < self.policy.sweep_interval {
            return None;
        }
        self.last_cleanup = now;

        // A max age reaching past the earliest representable instant keeps everything.
        let Some(cutoff) = now.checked_sub_signed(self.policy.max_age) else {
            debug!(retained = self.entries.len(), "cache sweep; nothing can be stale");
            return Some(0);
        };
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.last_shown >= cutoff);
        let removed = before - self.entries.len();
        if removed > 0 {
            self.entries.shrink_to_fit();
        }
        debug!(removed, retained = self.entries.len(), "cache sweep");
        Some(removed)
    }

    pub fn get(&self, image: &ImageRef) -> Option<&CacheEntry<H>> {
        self.entries.get(image)
    }

    pub fn contains(&self, image: &ImageRef) -> bool {
        self.entries.contains_key(image)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last_cleanup(&self) -> DateTime<Utc> {
        self.last_cleanup
    }
}
