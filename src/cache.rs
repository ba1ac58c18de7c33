use crate::types::ExtractedIcon;
use lru::LruCache;
use std::num::NonZeroUsize;

/// Bounded store of successful extractions.
///
/// Eviction is by insertion order: reads use `peek`, so a hit never
/// refreshes an entry and the oldest insert is always the next to go.
pub struct IconCache {
    entries: LruCache<String, ExtractedIcon>,
}

impl IconCache {
    /// A capacity of 0 is raised to 1.
    pub fn new(max_size: usize) -> Self {
        let capacity = NonZeroUsize::new(max_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains(key)
    }

    pub fn get(&self, key: &str) -> Option<&ExtractedIcon> {
        self.entries.peek(key)
    }

    /// Stores `icon` if it is a success. Returns whether it was stored.
    pub fn insert(&mut self, key: impl Into<String>, icon: ExtractedIcon) -> bool {
        if !icon.success() {
            return false;
        }
        let key = key.into();
        // Re-inserting an existing key keeps its age.
        if let Some(slot) = self.entries.peek_mut(&key) {
            *slot = icon;
            return true;
        }
        if let Some((evicted, _)) = self.entries.push(key, icon) {
            tracing::debug!(key = %evicted, "evicted oldest icon");
        }
        true
    }

    pub fn get_or_compute(
        &mut self,
        key: &str,
        compute: impl FnOnce() -> ExtractedIcon,
    ) -> ExtractedIcon {
        if let Some(hit) = self.entries.peek(key) {
            tracing::debug!(key, "icon cache hit");
            return hit.clone();
        }
        tracing::debug!(key, "icon cache miss");
        let icon = compute();
        self.insert(key, icon.clone());
        icon
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
