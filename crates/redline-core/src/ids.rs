//! Marker id allocation
//!
//! Bookmarks and drawings share one id space per document. The allocator
//! scans the document once, on first use, and from then on hands out ids from
//! a cached cursor.

use std::collections::BTreeSet;
use std::sync::{Mutex, PoisonError};

#[derive(Debug)]
struct IdCursor {
    next: u32,
    taken: BTreeSet<u32>,
}

impl IdCursor {
    fn take(&mut self) -> u32 {
        while self.taken.contains(&self.next) {
            self.next += 1;
        }
        let id = self.next;
        self.taken.insert(id);
        self.next += 1;
        id
    }
}

/// Thread-safe allocator for bookmark and drawing marker ids.
///
/// Ids are positive. The cursor is advisory: ids that enter the document
/// after the first scan must be registered with [`IdAllocator::observe`],
/// and duplicates produced by structural copies are fixed by the
/// renumbering pass, not here.
#[derive(Debug, Default)]
pub struct IdAllocator {
    cursor: Mutex<Option<IdCursor>>,
}

impl IdAllocator {
    /// Create an allocator that will scan on first use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a fresh id.
    ///
    /// `scan` is invoked only on the first call and must list every marker id
    /// currently present in the document.
    pub fn next_id<I>(&self, scan: impl FnOnce() -> I) -> u32
    where
        I: IntoIterator<Item = u32>,
    {
        let mut guard = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
        let cursor = guard.get_or_insert_with(|| {
            let taken: BTreeSet<u32> = scan().into_iter().collect();
            tracing::debug!(existing = taken.len(), "scanned document for marker ids");
            IdCursor { next: 1, taken }
        });
        cursor.take()
    }

    /// Register ids that entered the document after the initial scan.
    ///
    /// Before the first scan this is a no-op: the scan will see them anyway.
    pub fn observe(&self, ids: impl IntoIterator<Item = u32>) {
        let mut guard = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cursor) = guard.as_mut() {
            cursor.taken.extend(ids);
        }
    }

    /// Forget the cached cursor; the next call rescans.
    pub fn reset(&self) {
        *self.cursor.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
