// clusterconfig-core/src/intern.rs

use std::convert::Infallible;
use std::sync::Arc;

use quick_cache::sync::Cache;

use crate::common::SharedStr;

/// Bounded, thread-safe cache that maps decoded strings to one shared instance.
///
/// Large configuration trees repeat the same keys and values (file extensions,
/// timeouts, host names) thousands of times; routing every decoded string
/// through the interner collapses them into a single allocation. The cache is
/// bounded, so under pressure older entries are evicted and later decodes
/// allocate fresh instances again.
///
/// Cloning is cheap and yields a handle to the same cache.
#[derive(Clone)]
pub struct StringInterner {
    cache: Arc<Cache<SharedStr, SharedStr>>,
}

impl StringInterner {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: Arc::new(Cache::new(capacity)),
        }
    }

    /// Returns the canonical instance for `value`, inserting it on a miss.
    pub fn intern(&self, value: &str) -> SharedStr {
        if let Some(existing) = self.cache.get(value) {
            return existing;
        }
        let fresh: SharedStr = Arc::from(value);
        // Concurrent decoders may race on the same miss; get_or_insert_with hands
        // every one of them whichever instance won.
        match self
            .cache
            .get_or_insert_with(&fresh, || Ok::<_, Infallible>(fresh.clone()))
        {
            Ok(canonical) => canonical,
            Err(never) => match never {},
        }
    }

    /// Looks a string up without inserting it.
    pub fn get(&self, value: &str) -> Option<SharedStr> {
        self.cache.get(value)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.len() == 0
    }

    pub fn capacity(&self) -> u64 {
        self.cache.capacity()
    }
}

impl std::fmt::Debug for StringInterner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StringInterner")
            .field("len", &self.cache.len())
            .field("capacity", &self.cache.capacity())
            .finish()
    }
}
