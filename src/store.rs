//! RecordStore: the public keyed record store.

use crate::builder::StoreBuilder;
use crate::error::StoreError;
use crate::record::{check_name, Record};
use crate::record_table::{self, InsertError, RecordHandle, RecordTable};
use core::hash::BuildHasher;
use std::collections::hash_map::RandomState;

/// An in-memory store mapping `i32` ids to records with bounded-length
/// names.
///
/// The store exclusively owns its records. Lookups hand out borrowed
/// `&Record`s that live until the next mutating call; `remove` and `drain`
/// hand records back by value.
///
/// `RecordStore` is single-threaded: it is neither `Send` nor `Sync`.
///
/// # Examples
///
/// ```rust
/// use record_store::{RecordStore, StoreError};
///
/// let mut store = RecordStore::new();
/// store.upsert(7, "Alice")?;
/// store.upsert(7, "Bob")?;
/// assert_eq!(store.find(7).map(|r| r.name()), Some("Bob"));
/// assert_eq!(store.len(), 1);
///
/// // The default name capacity is 9 bytes.
/// assert_eq!(
///     store.upsert(3, "1234567890"),
///     Err(StoreError::OversizedValue { len: 10, capacity: 9 })
/// );
///
/// assert_eq!(store.clear(), 1);
/// assert!(store.find(7).is_none());
/// # Ok::<(), StoreError>(())
/// ```
pub struct RecordStore<S = RandomState> {
    table: RecordTable<S>,
    name_capacity: usize,
    label: Option<String>,
    #[cfg(test)]
    reserve_override: Option<usize>,
}

impl RecordStore {
    /// Creates an empty store with the default name capacity.
    pub fn new() -> Self {
        StoreBuilder::new().build()
    }

    /// Returns a [`StoreBuilder`] for configuring a new store.
    pub fn builder() -> StoreBuilder {
        StoreBuilder::new()
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> RecordStore<S>
where
    S: BuildHasher,
{
    pub(crate) fn from_parts(
        table: RecordTable<S>,
        name_capacity: usize,
        label: Option<String>,
    ) -> Self {
        Self {
            table,
            name_capacity,
            label,
            #[cfg(test)]
            reserve_override: None,
        }
    }

    /// Maximum name length, in UTF-8 bytes, accepted by this store.
    pub fn name_capacity(&self) -> usize {
        self.name_capacity
    }

    /// The label given through [`StoreBuilder::name`], if any.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Inserts a record for `id` or, if one exists, overwrites its name.
    ///
    /// On error nothing is written: no record is created, and an existing
    /// record keeps its previous name.
    pub fn upsert(&mut self, id: i32, name: &str) -> Result<RecordHandle, StoreError> {
        self.check(id, name)?;
        match self.table.find_mut(id) {
            Some((handle, record)) => {
                record.rename(name)?;
                Ok(handle)
            }
            None => self.insert_new(id, name),
        }
    }

    /// Inserts a record for `id`, failing with
    /// [`StoreError::DuplicateKey`] if the id is already present.
    pub fn insert(&mut self, id: i32, name: &str) -> Result<RecordHandle, StoreError> {
        self.check(id, name)?;
        if self.table.contains(id) {
            return Err(StoreError::DuplicateKey(id));
        }
        self.insert_new(id, name)
    }

    /// Looks up the record with `id`.
    pub fn find(&self, id: i32) -> Option<&Record> {
        let handle = self.table.find(id)?;
        self.table.get(handle)
    }

    pub fn contains(&self, id: i32) -> bool {
        self.table.contains(id)
    }

    /// Resolves a handle returned by `upsert` or `insert`. Returns `None`
    /// once that record has been removed.
    pub fn get(&self, handle: RecordHandle) -> Option<&Record> {
        self.table.get(handle)
    }

    /// Removes the record with `id` and returns it.
    pub fn remove(&mut self, id: i32) -> Option<Record> {
        let handle = self.table.find(id)?;
        let record = self.table.remove(handle)?;
        #[cfg(feature = "logging")]
        log::trace!("{}removed record {id}", self.log_prefix());
        Some(record)
    }

    /// Destroys every record, returning how many there were.
    pub fn clear(&mut self) -> usize {
        let count = self.table.drain().count();
        #[cfg(feature = "logging")]
        log::debug!("{}cleared {count} records", self.log_prefix());
        count
    }

    /// Removes every record, yielding each one by value.
    ///
    /// Each record leaves the store as it is yielded; records not consumed
    /// by the caller are removed when the iterator is dropped. A leaked
    /// iterator leaves the unyielded records in place.
    pub fn drain(&mut self) -> Drain<'_> {
        #[cfg(feature = "logging")]
        log::debug!(
            "{}draining {} records",
            self.log_prefix(),
            self.table.len()
        );
        Drain {
            inner: self.table.drain(),
        }
    }

    /// Visits every record once, in unspecified order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.table.iter(),
        }
    }

    #[cfg_attr(not(feature = "logging"), allow(unused_variables))]
    fn check(&self, id: i32, name: &str) -> Result<(), StoreError> {
        let res = check_name(name, self.name_capacity);
        #[cfg(feature = "logging")]
        if let Err(e) = &res {
            log::warn!("{}rejected write to record {id}: {e}", self.log_prefix());
        }
        res
    }

    fn insert_new(&mut self, id: i32, name: &str) -> Result<RecordHandle, StoreError> {
        let additional = self.reserve_amount();
        let reserved = self
            .table
            .try_reserve(additional)
            .map_err(|_| StoreError::AllocationFailure);
        let record = match reserved.and_then(|()| Record::new(id, name)) {
            Ok(record) => record,
            Err(e) => {
                #[cfg(feature = "logging")]
                log::warn!("{}could not allocate record {id}: {e}", self.log_prefix());
                return Err(e);
            }
        };

        let handle = self.table.insert(record).map_err(|e| match e {
            InsertError::DuplicateKey => StoreError::DuplicateKey(id),
        })?;
        #[cfg(feature = "logging")]
        log::trace!("{}created record {id}", self.log_prefix());
        Ok(handle)
    }

    #[cfg(not(test))]
    fn reserve_amount(&self) -> usize {
        1
    }

    #[cfg(test)]
    fn reserve_amount(&self) -> usize {
        self.reserve_override.unwrap_or(1)
    }

    #[cfg(feature = "logging")]
    fn log_prefix(&self) -> String {
        self.label
            .as_deref()
            .map(|name| format!("[{name}] "))
            .unwrap_or_default()
    }
}

impl<S> core::fmt::Debug for RecordStore<S>
where
    S: BuildHasher,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut d = f.debug_struct("RecordStore");
        if let Some(label) = &self.label {
            d.field("label", label);
        }
        d.field("name_capacity", &self.name_capacity)
            .field("len", &self.len())
            .finish()
    }
}

impl<'a, S> IntoIterator for &'a RecordStore<S>
where
    S: BuildHasher,
{
    type Item = &'a Record;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the records of a [`RecordStore`].
pub struct Iter<'a> {
    inner: record_table::Iter<'a>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Record;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, r)| r)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// Owning iterator returned by [`RecordStore::drain`].
pub struct Drain<'a> {
    inner: record_table::Drain<'a>,
}

impl Iterator for Drain<'_> {
    type Item = Record;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
