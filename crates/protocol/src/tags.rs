//! TagMemo - Process-wide cache of joined tag strings
//!
//! Rendering `%T` joins a record's tags with `", "`. Doing that join on every
//! record would dominate formatting cost, so the memo caches the joined
//! string per source location. The producer API documents the contract that
//! makes this sound: tags are constant per source location for the lifetime
//! of the process.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

static GLOBAL_MEMO: Lazy<TagMemo> = Lazy::new(TagMemo::new);

/// Get the process-wide tag memo
pub fn tag_memo() -> &'static TagMemo {
    &GLOBAL_MEMO
}

/// Read-mostly map from source location to comma-joined tag string
///
/// Many concurrent `%T` renders share the read lock; the first sight of a
/// source location takes the write lock and re-checks for a racing insert.
/// Entries are never mutated once inserted, so two records with equal source
/// locations always render equal tag strings.
#[derive(Debug, Default)]
pub struct TagMemo {
    map: RwLock<HashMap<&'static str, Arc<str>>>,
}

impl TagMemo {
    /// Create a private memo (tests isolate state with their own instance)
    pub fn new() -> Self {
        Self {
            map: RwLock::new(HashMap::new()),
        }
    }

    /// Get the joined tag string for a source location
    ///
    /// On first sight, inserts the join of `tags` in slice order. The join
    /// order is therefore stable for a given source location.
    pub fn joined(&self, source: &'static str, tags: &[&'static str]) -> Arc<str> {
        {
            let map = self.map.read();
            if let Some(joined) = map.get(source) {
                return Arc::clone(joined);
            }
        }
        self.insert(source, tags)
    }

    /// Number of memoised source locations
    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    /// Check if the memo is empty
    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }

    fn insert(&self, source: &'static str, tags: &[&'static str]) -> Arc<str> {
        let mut map = self.map.write();

        // Another writer may have raced us here between the read unlock and
        // the write lock; their entry wins.
        if let Some(joined) = map.get(source) {
            return Arc::clone(joined);
        }

        let joined: Arc<str> = Arc::from(tags.join(", "));
        map.insert(source, Arc::clone(&joined));
        joined
    }
}
