//! Debug-only reentrancy check for the record table.
//!
//! The table runs user-supplied `BuildHasher` code while its index and
//! slot storage may disagree. Entering the table again from inside that
//! code is a bug; debug builds catch it with a panic, release builds do
//! nothing.

use core::cell::Cell;
use core::marker::PhantomData;

/// Depth counter embedded in the table. Each public entry point starts
/// with `let _g = self.reentrancy.enter();`.
///
/// The raw-pointer marker makes the owner `!Send + !Sync`.
#[derive(Debug)]
pub(crate) struct ReentryCheck {
    #[cfg(debug_assertions)]
    depth: Cell<u32>,
    _single_thread: PhantomData<*mut ()>,
}

impl ReentryCheck {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            depth: Cell::new(0),
            _single_thread: PhantomData,
        }
    }

    /// Marks the table as entered until the returned value is dropped.
    ///
    /// # Panics
    ///
    /// In debug builds, if the table is already entered.
    #[inline]
    pub(crate) fn enter(&self) -> Entered<'_> {
        #[cfg(debug_assertions)]
        {
            let depth = self.depth.get();
            assert!(depth == 0, "record table re-entered while busy");
            self.depth.set(depth + 1);
            Entered { check: self }
        }

        #[cfg(not(debug_assertions))]
        {
            Entered { _lt: PhantomData }
        }
    }
}

impl Default for ReentryCheck {
    fn default() -> Self {
        Self::new()
    }
}

/// Scope marker returned by [`ReentryCheck::enter`].
pub(crate) struct Entered<'a> {
    #[cfg(debug_assertions)]
    check: &'a ReentryCheck,
    #[cfg(not(debug_assertions))]
    _lt: PhantomData<&'a ()>,
}

impl Drop for Entered<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        {
            let depth = self.check.depth.get();
            debug_assert!(depth > 0);
            self.check.depth.set(depth - 1);
        }
    }
}
