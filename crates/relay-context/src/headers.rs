//! # Headers
//!
//! Immutable string metadata attached to a scope at publish time.

use std::collections::HashMap;
use std::sync::Arc;

/// An immutable key/value bag shared by every delivery of one event.
///
/// Construction copies the source map, so a publisher mutating its own map
/// after attaching headers never affects envelopes already in flight. Clones
/// are cheap (`Arc` behind the scenes) and all clones observe the same frozen
/// entries.
#[derive(Clone, Debug, Default)]
pub struct Headers {
    entries: Arc<HashMap<String, String>>,
}

impl Headers {
    /// Copy `map` into a new frozen bag.
    #[must_use]
    pub fn from_map(map: &HashMap<String, String>) -> Self {
        Self {
            entries: Arc::new(map.clone()),
        }
    }

    /// Look up a header value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the bag holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl From<HashMap<String, String>> for Headers {
    fn from(map: HashMap<String, String>) -> Self {
        Self {
            entries: Arc::new(map),
        }
    }
}
