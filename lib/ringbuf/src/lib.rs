// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A fixed-size, always-on circular trace buffer.
//!
//! Every task keeps one or more of these as a static. Tracing with
//! [`ringbuf_entry!`] costs a critical section and an array write — no
//! allocation, no formatting, no blocking I/O — so it is cheap enough to
//! leave on in every build and inspect post-hoc (via debugger memory dump on
//! target, or directly in tests on host). This is deliberately a different,
//! cheaper facility than the queued, TCP-published logger: ring buffers are
//! for "what did this task do right before it broke," not for operator-
//! facing output.
//!
//! A repeated entry (equal to the one last recorded) coalesces into a
//! repeat count instead of consuming a fresh slot, so a tight loop emitting
//! the same trace doesn't evict older, more interesting history.

#![cfg_attr(not(test), no_std)]

use core::cell::RefCell;

use critical_section::Mutex;

/// One slot: a payload plus how many consecutive times it was recorded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Entry<T> {
    pub payload: T,
    pub count: u32,
}

/// A fixed-capacity circular buffer of trace entries, newest-overwrites-
/// oldest, with consecutive-repeat coalescing.
pub struct Ringbuf<T, const N: usize> {
    inner: Mutex<RefCell<Inner<T, N>>>,
}

struct Inner<T, const N: usize> {
    entries: [Option<Entry<T>>; N],
    next: usize,
    last_idx: Option<usize>,
}

impl<T: Copy + PartialEq, const N: usize> Ringbuf<T, N> {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Inner {
                entries: [None; N],
                next: 0,
                last_idx: None,
            })),
        }
    }

    /// Records `payload`, coalescing into the previous slot if it holds the
    /// same value.
    pub fn entry(&self, payload: T) {
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow(cs).borrow_mut();
            if let Some(last_idx) = inner.last_idx {
                if let Some(last) = &mut inner.entries[last_idx] {
                    if last.payload == payload {
                        last.count += 1;
                        return;
                    }
                }
            }
            let idx = inner.next;
            inner.entries[idx] = Some(Entry { payload, count: 1 });
            inner.last_idx = Some(idx);
            inner.next = (idx + 1) % N;
        });
    }

    /// Copies out the recorded entries, oldest first. Intended for tests and
    /// debugger inspection, not the hot path.
    pub fn snapshot(&self) -> heapless::Vec<Entry<T>, N> {
        critical_section::with(|cs| {
            let inner = self.inner.borrow(cs).borrow();
            let mut out = heapless::Vec::new();
            for i in 0..N {
                let idx = (inner.next + i) % N;
                if let Some(entry) = inner.entries[idx] {
                    let _ = out.push(entry);
                }
            }
            out
        })
    }
}

impl<T: Copy + PartialEq, const N: usize> Default for Ringbuf<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

// Safety: all access to `inner` is mediated by `critical_section::with`.
unsafe impl<T: Send, const N: usize> Sync for Ringbuf<T, N> {}

/// Declares a static ring buffer of the given entry type and capacity.
///
/// ```ignore
/// #[derive(Clone, Copy, PartialEq)]
/// enum Trace {
///     None,
///     Accepted,
///     Closed(u8),
/// }
/// ringbuf!(Trace, 32, Trace::None);
/// ringbuf_entry!(Trace::Accepted);
/// ```
#[macro_export]
macro_rules! ringbuf {
    ($entry_ty:ty, $cap:expr, $init:expr) => {
        static RINGBUF: $crate::Ringbuf<$entry_ty, $cap> = $crate::Ringbuf::new();
    };
    ($name:ident, $entry_ty:ty, $cap:expr, $init:expr) => {
        static $name: $crate::Ringbuf<$entry_ty, $cap> = $crate::Ringbuf::new();
    };
}

/// Records an entry into the ring buffer declared by [`ringbuf!`] in scope.
#[macro_export]
macro_rules! ringbuf_entry {
    ($payload:expr) => {
        RINGBUF.entry($payload)
    };
    ($name:ident, $payload:expr) => {
        $name.entry($payload)
    };
}
