//! Priority-ordered listener registry.
//!
//! `OrderedRegistry` is the leaf storage layer: a vector of entries kept
//! sorted by ascending priority, with registration order preserved among
//! equal priorities. It knows nothing about dispatch; mutating it while a
//! caller is walking it by index is the caller's problem.

use std::slice;

use crate::error::RegistryError;

/// Listener priority. Lower values are delivered first.
pub type Priority = i32;

/// A single registration: a listener handle and the priority it was
/// registered at.
///
/// Only `handle` takes part in identity. There is deliberately no
/// `PartialEq` on `Entry` itself so that removal can never compare priorities.
#[derive(Debug, Clone)]
pub struct Entry<H> {
    /// Registered listener.
    pub handle: H,
    /// Delivery priority.
    pub priority: Priority,
}

impl<H> Entry<H> {
    /// Creates a new entry.
    #[must_use]
    pub const fn new(handle: H, priority: Priority) -> Self {
        Self { handle, priority }
    }
}

/// Entries sorted by non-decreasing priority, FIFO among equals.
#[derive(Debug, Clone)]
pub struct OrderedRegistry<H> {
    entries: Vec<Entry<H>>,
}

impl<H> Default for OrderedRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> OrderedRegistry<H> {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Creates an empty registry with room for `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Inserts `entry` after every entry with a priority less than or equal
    /// to its own. Duplicates are allowed.
    pub fn insert(&mut self, entry: Entry<H>) {
        let at = self.entries.partition_point(|e| e.priority <= entry.priority);
        self.entries.insert(at, entry);
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`. Out-of-range access is a contract
    /// violation; check `len()` first or use [`try_at`](Self::try_at).
    #[must_use]
    pub fn at(&self, index: usize) -> &Entry<H> {
        match self.try_at(index) {
            Ok(entry) => entry,
            Err(err) => panic!("{err}"),
        }
    }

    /// Entry at `index`, or `IndexOutOfRange`.
    pub fn try_at(&self, index: usize) -> Result<&Entry<H>, RegistryError> {
        self.entries.get(index).ok_or(RegistryError::IndexOutOfRange {
            index,
            len: self.entries.len(),
        })
    }

    /// Entry at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Entry<H>> {
        self.entries.get(index)
    }

    /// Entries in delivery order.
    pub fn iter(&self) -> slice::Iter<'_, Entry<H>> {
        self.entries.iter()
    }

    /// Entries in delivery order, as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[Entry<H>] {
        &self.entries
    }

    /// Drops all entries, keeping the allocation.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<H: PartialEq> OrderedRegistry<H> {
    /// Removes the first entry whose handle equals `handle`.
    ///
    /// Returns the removed entry; absence is not an error.
    pub fn remove_by_handle(&mut self, handle: &H) -> Option<Entry<H>> {
        let at = self.position(handle)?;
        Some(self.entries.remove(at))
    }

    /// Returns true if any entry is registered under `handle`.
    #[must_use]
    pub fn contains(&self, handle: &H) -> bool {
        self.position(handle).is_some()
    }

    fn position(&self, handle: &H) -> Option<usize> {
        self.entries.iter().position(|e| e.handle == *handle)
    }
}

impl<'a, H> IntoIterator for &'a OrderedRegistry<H> {
    type Item = &'a Entry<H>;
    type IntoIter = slice::Iter<'a, Entry<H>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(reg: &OrderedRegistry<&'static str>) -> Vec<(&'static str, Priority)> {
        reg.iter().map(|e| (e.handle, e.priority)).collect()
    }

    #[test]
    fn test_insert_sorts_ascending() {
        let mut reg = OrderedRegistry::new();
        reg.insert(Entry::new("c", 10));
        reg.insert(Entry::new("a", -1));
        reg.insert(Entry::new("b", 5));
        assert_eq!(order(&reg), vec![("a", -1), ("b", 5), ("c", 10)]);
    }

    #[test]
    fn test_equal_priorities_keep_registration_order() {
        let mut reg = OrderedRegistry::new();
        reg.insert(Entry::new("first", 0));
        reg.insert(Entry::new("early", -5));
        reg.insert(Entry::new("second", 0));
        reg.insert(Entry::new("third", 0));
        assert_eq!(
            order(&reg),
            vec![("early", -5), ("first", 0), ("second", 0), ("third", 0)]
        );
    }

    #[test]
    fn test_duplicates_are_independent_entries() {
        let mut reg = OrderedRegistry::new();
        reg.insert(Entry::new("h", 9));
        reg.insert(Entry::new("h", 5));
        assert_eq!(reg.len(), 2);
        assert_eq!(order(&reg), vec![("h", 5), ("h", 9)]);
    }

    #[test]
    fn test_remove_takes_first_match_only() {
        let mut reg = OrderedRegistry::new();
        reg.insert(Entry::new("h", 9));
        reg.insert(Entry::new("x", 7));
        reg.insert(Entry::new("h", 5));

        let removed = reg.remove_by_handle(&"h").unwrap();
        assert_eq!(removed.priority, 5);
        assert_eq!(order(&reg), vec![("x", 7), ("h", 9)]);
        assert!(reg.contains(&"h"));
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut reg = OrderedRegistry::new();
        reg.insert(Entry::new("a", 1));
        assert!(reg.remove_by_handle(&"zzz").is_none());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_try_at_bounds() {
        let mut reg = OrderedRegistry::new();
        reg.insert(Entry::new("a", 1));
        assert_eq!(reg.try_at(0).unwrap().handle, "a");
        assert_eq!(
            reg.try_at(1).unwrap_err(),
            RegistryError::IndexOutOfRange { index: 1, len: 1 }
        );
        assert!(reg.get(1).is_none());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_at_out_of_range_panics() {
        let reg: OrderedRegistry<&str> = OrderedRegistry::new();
        let _ = reg.at(0);
    }

    #[test]
    fn test_clear_empties_registry() {
        let mut reg = OrderedRegistry::with_capacity(16);
        reg.insert(Entry::new("a", 1));
        reg.clear();
        assert!(reg.is_empty());
        assert!(reg.as_slice().is_empty());
    }
}
