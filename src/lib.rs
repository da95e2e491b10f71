//! record-store: a single-threaded store of keyed records, each holding an
//! `i32` id and a name of bounded length.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a keyed store that exclusively owns its records, where writes
//!   that do not fit are rejected rather than truncated.
//! - Layers:
//!   - RecordTable<S>: structural table keyed by record id. A
//!     `hashbrown::HashTable` index over `slotmap` storage returns stable,
//!     generational `RecordHandle`s; includes a debug-only reentrancy
//!     guard.
//!   - RecordStore<S>: public API. Validates names against the configured
//!     capacity and layers upsert semantics over the table.
//!   - StoreBuilder<S>: configuration (name capacity, initial capacity,
//!     label, hasher).
//!
//! Constraints
//! - Single-threaded: `!Send`/`!Sync` (no locks, no atomics).
//! - Ids are unique. `upsert` overwrites, `insert` rejects duplicates.
//! - Names are measured in UTF-8 bytes. A name longer than the capacity
//!   fails with `StoreError::OversizedValue` and writes nothing.
//! - The capacity bounds a name's length; it is not preallocated. A
//!   record's buffer holds its current name and grows only on rename.
//! - Lookup misses are `None`, not errors.
//!
//! Hasher and rehashing invariants
//! - Each slot stores the `u64` hash of its id and the index always uses
//!   the stored hash, so the hasher only runs on lookup and insert.
//!
//! Removal
//! - `clear` and `drain` take records out one slot at a time and unlink
//!   each from the index in the same step, so index and slots agree even
//!   if a drain is leaked. A record is never reachable after it is dropped.
//!
//! Logging
//! - With the `logging` feature the store emits `log` records: trace on
//!   record creation/removal, debug on clear/drain, warn on rejected
//!   writes.

mod builder;
mod error;
mod record;
mod record_table;
mod record_table_proptest;
mod reentrancy;
mod store;

// Public surface
pub use builder::StoreBuilder;
pub use error::StoreError;
pub use record::{Record, DEFAULT_NAME_CAPACITY};
pub use record_table::RecordHandle;
pub use store::{Drain, Iter, RecordStore};
