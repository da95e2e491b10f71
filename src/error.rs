/// The error type returned by mutating [`RecordStore`][store] operations.
///
/// A lookup that finds nothing is not an error; `find` and `get` return
/// `None` for it.
///
/// [store]: ./struct.RecordStore.html
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The name is longer than the store's name capacity. Nothing was
    /// written; an existing record keeps its previous name.
    #[error("name is {len} bytes but the store's name capacity is {capacity}")]
    OversizedValue { len: usize, capacity: usize },

    /// Memory for a new record or for growing the index could not be
    /// obtained. The store is unchanged.
    #[error("failed to allocate memory for a new record")]
    AllocationFailure,

    /// [`RecordStore::insert`][insert] was called with an id that is
    /// already present. Use `upsert` to overwrite.
    ///
    /// [insert]: ./struct.RecordStore.html#method.insert
    #[error("a record with id {0} already exists")]
    DuplicateKey(i32),
}
