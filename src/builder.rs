//! StoreBuilder: configuration for a new record store.

use crate::record::DEFAULT_NAME_CAPACITY;
use crate::record_table::RecordTable;
use crate::store::RecordStore;

use std::{
    collections::hash_map::RandomState,
    hash::BuildHasher,
};

/// Builds a [`RecordStore`][store-struct] with various configuration knobs.
///
/// [store-struct]: ./struct.RecordStore.html
///
/// # Examples
///
/// ```rust
/// use record_store::StoreBuilder;
///
/// let mut store = StoreBuilder::new()
///     // Accept names up to 32 bytes long.
///     .name_capacity(32)
///     // Pre-size for 1,000 records.
///     .initial_capacity(1_000)
///     // Prefix log records from this store with "[users] ".
///     .name("users")
///     .build();
///
/// store.upsert(1, "a name longer than nine bytes").unwrap();
/// assert_eq!(store.name_capacity(), 32);
/// ```
///
#[must_use]
pub struct StoreBuilder<S = RandomState> {
    name_capacity: usize,
    initial_capacity: Option<usize>,
    label: Option<String>,
    hasher: S,
}

impl Default for StoreBuilder {
    fn default() -> Self {
        Self {
            name_capacity: DEFAULT_NAME_CAPACITY,
            initial_capacity: None,
            label: None,
            hasher: RandomState::new(),
        }
    }
}

impl StoreBuilder {
    /// Construct a new `StoreBuilder` for a store with the default name
    /// capacity of 9 bytes.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S> StoreBuilder<S>
where
    S: BuildHasher,
{
    /// Sets the maximum name length, in UTF-8 bytes. Zero is allowed and
    /// admits only the empty name.
    pub fn name_capacity(self, capacity: usize) -> Self {
        Self {
            name_capacity: capacity,
            ..self
        }
    }

    /// Sets the number of records the store can hold before its index or
    /// slot storage has to grow.
    pub fn initial_capacity(self, number_of_records: usize) -> Self {
        Self {
            initial_capacity: Some(number_of_records),
            ..self
        }
    }

    /// Sets the store's label. Log records emitted by the store (with the
    /// `logging` feature) are prefixed with it.
    pub fn name(self, name: impl Into<String>) -> Self {
        Self {
            label: Some(name.into()),
            ..self
        }
    }

    /// Sets the hasher used for record ids.
    pub fn hasher<S2>(self, hasher: S2) -> StoreBuilder<S2>
    where
        S2: BuildHasher,
    {
        StoreBuilder {
            name_capacity: self.name_capacity,
            initial_capacity: self.initial_capacity,
            label: self.label,
            hasher,
        }
    }

    /// Builds a `RecordStore<S>`.
    pub fn build(self) -> RecordStore<S> {
        let table =
            RecordTable::with_capacity_and_hasher(self.initial_capacity.unwrap_or(0), self.hasher);
        RecordStore::from_parts(table, self.name_capacity, self.label)
    }
}
