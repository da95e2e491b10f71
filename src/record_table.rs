//! RecordTable: structural layer keyed by record id, with stable handles
//! and a debug reentrancy guard.

use crate::reentrancy::ReentryCheck;
use crate::record::Record;
use core::hash::BuildHasher;
use hashbrown::HashTable;
use slotmap::{DefaultKey, SlotMap};
use std::collections::hash_map::RandomState;

/// Stable reference to a record slot.
///
/// Handles are generational: once the record is removed, the handle never
/// resolves again, even if its slot is reused by a later record.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct RecordHandle(DefaultKey);

impl RecordHandle {
    pub(crate) fn new(k: DefaultKey) -> Self {
        RecordHandle(k)
    }
    pub(crate) fn raw_handle(&self) -> DefaultKey {
        self.0
    }
}

#[derive(Debug)]
struct Slot {
    record: Record,
    hash: u64,
}

pub(crate) struct RecordTable<S = RandomState> {
    hasher: S,
    index: HashTable<DefaultKey>,
    slots: SlotMap<DefaultKey, Slot>,
    reentrancy: ReentryCheck,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum InsertError {
    DuplicateKey,
}

impl RecordTable {
    #[cfg(test)]
    pub(crate) fn new() -> Self {
        Self::with_capacity_and_hasher(0, Default::default())
    }
}

impl<S> RecordTable<S>
where
    S: BuildHasher,
{
    pub(crate) fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self {
            hasher,
            index: HashTable::with_capacity(capacity),
            slots: SlotMap::with_capacity_and_key(capacity),
            reentrancy: ReentryCheck::new(),
        }
    }

    fn make_hash(&self, id: i32) -> u64 {
        self.hasher.hash_one(id)
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub(crate) fn find(&self, id: i32) -> Option<RecordHandle> {
        let _g = self.reentrancy.enter();
        let hash = self.make_hash(id);
        self.index
            .find(hash, |&k| {
                self.slots
                    .get(k)
                    .map(|s| s.record.id() == id)
                    .unwrap_or(false)
            })
            .map(|&k| RecordHandle::new(k))
    }

    pub(crate) fn contains(&self, id: i32) -> bool {
        self.find(id).is_some()
    }

    pub(crate) fn find_mut(&mut self, id: i32) -> Option<(RecordHandle, &mut Record)> {
        let handle = self.find(id)?;
        let record = self.get_mut(handle)?;
        Some((handle, record))
    }

    /// Makes room for `additional` more ids in the index without reallocating.
    pub(crate) fn try_reserve(
        &mut self,
        additional: usize,
    ) -> Result<(), hashbrown::TryReserveError> {
        let _g = self.reentrancy.enter();
        let slots = &self.slots;
        self.index
            .try_reserve(additional, |&k| slots.get(k).map(|s| s.hash).unwrap_or(0))
    }

    /// Inserts `record` under its own id. An id already present is
    /// rejected and the table is left unchanged.
    pub(crate) fn insert(&mut self, record: Record) -> Result<RecordHandle, InsertError> {
        let _g = self.reentrancy.enter();
        let id = record.id();
        let hash = self.make_hash(id);
        match self.index.entry(
            hash,
            |&kk| {
                self.slots
                    .get(kk)
                    .map(|s| s.record.id() == id)
                    .unwrap_or(false)
            },
            |&kk| self.slots.get(kk).map(|s| s.hash).unwrap_or(0),
        ) {
            hashbrown::hash_table::Entry::Occupied(_) => Err(InsertError::DuplicateKey),
            hashbrown::hash_table::Entry::Vacant(v) => {
                let k = self.slots.insert(Slot { record, hash });
                let _ = v.insert(k);
                Ok(RecordHandle::new(k))
            }
        }
    }

    pub(crate) fn remove(&mut self, handle: RecordHandle) -> Option<Record> {
        let _g = self.reentrancy.enter();
        let k = handle.raw_handle();

        let slot = self.slots.remove(k)?;

        // Every live slot has exactly one index entry.
        if let Ok(entry) = self.index.find_entry(slot.hash, |&kk| kk == k) {
            entry.remove();
        }

        Some(slot.record)
    }

    pub(crate) fn get(&self, handle: RecordHandle) -> Option<&Record> {
        let _g = self.reentrancy.enter();
        self.slots.get(handle.raw_handle()).map(|s| &s.record)
    }

    pub(crate) fn get_mut(&mut self, handle: RecordHandle) -> Option<&mut Record> {
        let _g = self.reentrancy.enter();
        self.slots.get_mut(handle.raw_handle()).map(|s| &mut s.record)
    }

    pub(crate) fn iter(&self) -> Iter<'_> {
        Iter {
            it: self.slots.iter(),
        }
    }

    /// Removes every record, yielding them by value. Each record is
    /// unlinked from the index as it leaves its slot, so the table stays
    /// consistent at every step; records the caller does not consume are
    /// removed when the iterator is dropped.
    pub(crate) fn drain(&mut self) -> Drain<'_> {
        Drain {
            index: &mut self.index,
            it: self.slots.drain(),
        }
    }
}

/// Iterator over the live records of a table, in slot order.
pub(crate) struct Iter<'a> {
    it: slotmap::basic::Iter<'a, DefaultKey, Slot>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (RecordHandle, &'a Record);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it
            .next()
            .map(|(k, s)| (RecordHandle::new(k), &s.record))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

/// Owning iterator produced by [`RecordTable::drain`].
pub(crate) struct Drain<'a> {
    index: &'a mut HashTable<DefaultKey>,
    it: slotmap::basic::Drain<'a, DefaultKey, Slot>,
}

impl Drop for Drain<'_> {
    fn drop(&mut self) {
        // Finish through `next` so the index is unlinked too.
        self.by_ref().for_each(drop);
    }
}

impl Iterator for Drain<'_> {
    type Item = Record;
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let (k, slot) = self.it.next()?;
        if let Ok(entry) = self.index.find_entry(slot.hash, |&kk| kk == k) {
            entry.remove();
        }
        Some(slot.record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::hash::Hasher;

    fn rec(id: i32, name: &str) -> Record {
        Record::new(id, name).unwrap()
    }

    #[derive(Clone, Default)]
    struct ConstBuildHasher;
    struct ConstHasher;
    impl BuildHasher for ConstBuildHasher {
        type Hasher = ConstHasher;
        fn build_hasher(&self) -> Self::Hasher {
            ConstHasher
        }
    }
    impl Hasher for ConstHasher {
        fn write(&mut self, _bytes: &[u8]) {}
        fn finish(&self) -> u64 {
            0
        } // force all ids into the same hash bucket
    }

    /// Invariant: Duplicate ids are rejected and the table remains unchanged.
    #[test]
    fn duplicate_insert_rejected() {
        let mut t = RecordTable::new();
        let h = t.insert(rec(1, "first")).unwrap();
        assert_eq!(t.insert(rec(1, "second")), Err(InsertError::DuplicateKey));
        assert_eq!(t.get(h).map(Record::name), Some("first"));
        assert_eq!(t.len(), 1);
    }

    /// Invariant: `find(id).is_some() == contains(id)` for present/absent ids.
    #[test]
    fn find_contains_parity() {
        let mut t = RecordTable::new();
        for id in [-3, 0, 42] {
            t.insert(rec(id, "x")).unwrap();
        }
        for id in [-3, 0, 42] {
            assert!(t.find(id).is_some());
            assert!(t.contains(id));
        }
        for id in [-2, 1, i32::MAX, i32::MIN] {
            assert!(t.find(id).is_none());
            assert!(!t.contains(id));
        }
    }

    /// Invariant: Handle-based access resolves while the record exists and
    /// becomes `None` after removal; `get_mut` edits are visible to lookups.
    #[test]
    fn handle_access_and_mutation() {
        let mut t = RecordTable::new();
        let h = t.insert(rec(5, "five")).unwrap();
        assert_eq!(t.get(h).map(Record::id), Some(5));

        t.get_mut(h).unwrap().rename("FIVE").unwrap();
        let found = t.find(5).unwrap();
        assert_eq!(found, h);
        assert_eq!(t.get(found).map(Record::name), Some("FIVE"));

        let removed = t.remove(h).unwrap();
        assert_eq!(removed.name(), "FIVE");
        assert!(t.get(h).is_none());
        assert!(t.remove(h).is_none(), "second removal is a no-op");
    }

    /// Invariant: A removed record's handle does not alias a record inserted
    /// afterward, even if the physical slot is reused.
    #[test]
    fn stale_handle_does_not_alias_new_record() {
        let mut t = RecordTable::new();
        let h1 = t.insert(rec(1, "old")).unwrap();
        t.remove(h1).unwrap();
        let h2 = t.insert(rec(2, "new")).unwrap();
        assert_ne!(h1, h2, "handles must differ across generations");
        assert!(t.get(h1).is_none(), "stale handle must not resolve");
        assert!(t.contains(2));
        assert!(!t.contains(1));
    }

    /// Invariant: Iteration yields each live record exactly once.
    #[test]
    fn iteration_visits_every_record_once() {
        let mut t = RecordTable::new();
        for id in 0..50 {
            t.insert(rec(id, "n")).unwrap();
        }
        let h = t.find(10).unwrap();
        t.remove(h).unwrap();

        let ids: Vec<i32> = t.iter().map(|(_, r)| r.id()).collect();
        let unique: BTreeSet<i32> = ids.iter().copied().collect();
        assert_eq!(ids.len(), unique.len());
        let expected: BTreeSet<i32> = (0..50).filter(|&i| i != 10).collect();
        assert_eq!(unique, expected);
    }

    /// Invariant: Lookups work under heavy hash collisions; id equality
    /// resolves to the correct record.
    #[test]
    fn collision_handling_with_const_hasher() {
        let mut t = RecordTable::with_capacity_and_hasher(0, ConstBuildHasher);
        let ha = t.insert(rec(1, "a")).unwrap();
        let hb = t.insert(rec(2, "b")).unwrap();
        assert_ne!(ha, hb);
        assert_eq!(t.find(1), Some(ha));
        assert_eq!(t.find(2), Some(hb));

        t.remove(ha).unwrap();
        assert_eq!(t.find(1), None);
        assert_eq!(t.find(2), Some(hb));
    }

    /// Invariant: `drain` empties both index and slots; ids can be reused
    /// afterward.
    #[test]
    fn drain_empties_table() {
        let mut t = RecordTable::new();
        for id in 0..8 {
            t.insert(rec(id, "n")).unwrap();
        }
        let mut drained: Vec<i32> = t.drain().map(|r| r.id()).collect();
        drained.sort_unstable();
        assert_eq!(drained, (0..8).collect::<Vec<_>>());
        assert!(t.is_empty());
        for id in 0..8 {
            assert!(!t.contains(id));
        }
        t.insert(rec(3, "again")).unwrap();
        assert_eq!(t.len(), 1);
    }

    /// Invariant: Dropping a partially consumed drain still removes everything.
    #[test]
    fn partial_drain_still_clears() {
        let mut t = RecordTable::new();
        for id in 0..8 {
            t.insert(rec(id, "n")).unwrap();
        }
        let first = t.drain().next();
        assert!(first.is_some());
        assert_eq!(t.len(), 0);
        assert!(t.iter().next().is_none());
    }

    /// Invariant: A drain leaked with `mem::forget` leaves the table
    /// consistent: unyielded records stay findable and ids stay unique.
    #[test]
    fn forgotten_drain_keeps_index_and_slots_in_step() {
        let mut t = RecordTable::new();
        for id in 0..4 {
            t.insert(rec(id, "n")).unwrap();
        }
        let mut d = t.drain();
        let first = d.next().expect("one record yielded").id();
        std::mem::forget(d);

        assert_eq!(t.len(), 3);
        assert!(!t.contains(first));
        for id in (0..4).filter(|&id| id != first) {
            assert!(t.contains(id), "record {id} lost from index");
        }
        // Reinserting a live id is still a duplicate.
        let live = (0..4).find(|&id| id != first).unwrap();
        assert_eq!(t.insert(rec(live, "y")), Err(InsertError::DuplicateKey));
        t.insert(rec(first, "y")).unwrap();
        assert_eq!(t.iter().filter(|(_, r)| r.id() == first).count(), 1);
        assert_eq!(t.len(), 4);
    }

    /// Invariant: `find_mut` resolves the same handle as `find`.
    #[test]
    fn find_mut_matches_find() {
        let mut t = RecordTable::new();
        let h = t.insert(rec(8, "eight")).unwrap();
        let (fh, r) = t.find_mut(8).unwrap();
        assert_eq!(fh, h);
        r.rename("EIGHT").unwrap();
        assert_eq!(t.get(h).map(Record::name), Some("EIGHT"));
        assert!(t.find_mut(9).is_none());
    }

    /// Invariant: `try_reserve` pre-sizes the index; inserts after it
    /// behave normally.
    #[test]
    fn try_reserve_then_insert() {
        let mut t = RecordTable::new();
        t.try_reserve(64).unwrap();
        for id in 0..64 {
            t.insert(rec(id, "n")).unwrap();
        }
        assert_eq!(t.len(), 64);
        assert!(t.try_reserve(usize::MAX).is_err());
        assert_eq!(t.len(), 64, "failed reserve leaves table intact");
    }

    /// Invariant (debug-only): re-entering the table from inside the hasher
    /// panics due to the reentrancy guard.
    #[cfg(debug_assertions)]
    #[test]
    fn reentrancy_panics_from_hasher_during_find() {
        use std::cell::Cell;

        thread_local! {
            static TABLE: Cell<*const RecordTable<ReentrantBuildHasher>> =
                const { Cell::new(core::ptr::null()) };
        }

        #[derive(Clone, Default)]
        struct ReentrantBuildHasher;
        struct ReentrantHasher;
        impl BuildHasher for ReentrantBuildHasher {
            type Hasher = ReentrantHasher;
            fn build_hasher(&self) -> Self::Hasher {
                ReentrantHasher
            }
        }
        impl Hasher for ReentrantHasher {
            fn write(&mut self, _bytes: &[u8]) {}
            fn finish(&self) -> u64 {
                let p = TABLE.with(|c| c.get());
                if !p.is_null() {
                    // Attempt to re-enter the same table during a lookup.
                    unsafe {
                        let _ = (*p).len();
                        let _ = (*p).get(RecordHandle::new(DefaultKey::default()));
                    }
                }
                0
            }
        }

        let mut t = RecordTable::with_capacity_and_hasher(0, ReentrantBuildHasher);
        t.insert(rec(1, "a")).unwrap();
        TABLE.with(|c| c.set(&t as *const _));

        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = t.find(1);
        }));
        TABLE.with(|c| c.set(core::ptr::null()));
        assert!(res.is_err(), "expected reentrancy to panic in debug builds");
    }
}
