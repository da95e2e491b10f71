//! The stored record and its bounded name field.

use crate::error::StoreError;
use core::fmt;

/// Name capacity used when a store is built without an explicit one.
pub const DEFAULT_NAME_CAPACITY: usize = 9;

/// One keyed entry owned by a [`RecordStore`](crate::RecordStore).
///
/// The name buffer holds only the current name; the store's capacity is a
/// bound on its length, not a preallocation.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Record {
    id: i32,
    name: String,
}

impl Record {
    /// Creates a record holding a copy of `name`. The caller has already
    /// checked `name` against the store capacity.
    pub(crate) fn new(id: i32, name: &str) -> Result<Self, StoreError> {
        let mut buf = String::new();
        buf.try_reserve_exact(name.len())
            .map_err(|_| StoreError::AllocationFailure)?;
        buf.push_str(name);
        Ok(Self { id, name: buf })
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Overwrites the name, growing the buffer only when `name` does not
    /// fit. If growing fails the old name is left in place.
    pub(crate) fn rename(&mut self, name: &str) -> Result<(), StoreError> {
        let additional = name.len().saturating_sub(self.name.len());
        self.name
            .try_reserve(additional)
            .map_err(|_| StoreError::AllocationFailure)?;
        self.name.clear();
        self.name.push_str(name);
        Ok(())
    }

    /// Consumes the record, returning its id and name.
    pub fn into_parts(self) -> (i32, String) {
        (self.id, self.name)
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

/// Rejects `name` if its UTF-8 length exceeds `capacity` bytes.
pub(crate) fn check_name(name: &str, capacity: usize) -> Result<(), StoreError> {
    if name.len() > capacity {
        return Err(StoreError::OversizedValue {
            len: name.len(),
            capacity,
        });
    }
    Ok(())
}
