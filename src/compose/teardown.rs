//! Ordered registry of one-shot teardown callbacks

use super::BeforeUnset;
use crate::dom::{Document, NodeId};

/// A registered callback and the id of the node it guards
pub struct TeardownEntry {
    pub id: String,
    callback: BeforeUnset,
}

impl TeardownEntry {
    pub fn new(id: impl Into<String>, callback: BeforeUnset) -> Self {
        Self {
            id: id.into(),
            callback,
        }
    }

    /// Run the callback, consuming the entry
    pub fn fire(self, doc: &Document, node: NodeId) {
        (self.callback)(doc, node)
    }
}

impl std::fmt::Debug for TeardownEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeardownEntry")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Teardown entries in insertion order, keyed only by id string
#[derive(Debug, Default)]
pub struct TeardownRegistry {
    entries: Vec<TeardownEntry>,
}

impl TeardownRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry
    pub fn register(&mut self, id: impl Into<String>, callback: BeforeUnset) {
        self.entries.push(TeardownEntry::new(id, callback));
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ids in registry order
    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.id.as_str()).collect()
    }

    /// Swap the callback of the first entry with `id`, keeping its position
    ///
    /// Returns the old callback, or `None` if there is no such entry.
    pub fn refresh(&mut self, id: &str, callback: BeforeUnset) -> Option<BeforeUnset> {
        let entry = self.entries.iter_mut().find(|e| e.id == id)?;
        Some(std::mem::replace(&mut entry.callback, callback))
    }

    /// Remove and return the first entry with `id`
    pub fn take(&mut self, id: &str) -> Option<TeardownEntry> {
        let pos = self.position(id)?;
        Some(self.entries.remove(pos))
    }

    /// Remove every entry whose node is found inside `scope` (inclusive)
    ///
    /// Entries come back in registry order, paired with the located node.
    /// An entry whose id equals `except` is left alone.
    pub fn drain_within(
        &mut self,
        doc: &Document,
        scope: NodeId,
        except: Option<&str>,
    ) -> Vec<(TeardownEntry, NodeId)> {
        let mut drained = Vec::new();
        let mut kept = Vec::with_capacity(self.entries.len());

        for entry in std::mem::take(&mut self.entries) {
            let located = if except == Some(entry.id.as_str()) {
                None
            } else {
                doc.find_by_id(scope, &entry.id)
            };
            match located {
                Some(node) => drained.push((entry, node)),
                None => kept.push(entry),
            }
        }

        self.entries = kept;
        drained
    }
}
