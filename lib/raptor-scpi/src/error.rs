// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The circular SCPI error queue and its IEEE-488.2 numeric/text mapping.
//!
//! Every push and pop is performed while holding the queue's guard for the
//! duration of the matching status-byte bit update, so a concurrent reader
//! of the register file never observes a push that hasn't yet set the bit
//! or a pop-to-empty that hasn't yet cleared it.

use raptor_sysreg::{Offset, STB_ERROR_QUEUE_BIT, REGISTERS};
use userlib::Guarded;

/// Queue capacity. On the 21st push without an intervening pop, the tail
/// slot is overwritten with [`ScpiError::QueueOverflow`].
pub const ERROR_QUEUE_CAPACITY: usize = 20;

/// An externally reported SCPI error code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScpiError {
    Null,
    Syntax,
    BadArg,
    UndefinedHeader,
    OutOfRange,
    QueueOverflow,
}

impl ScpiError {
    /// The `(numeric_code, reason)` pair this error formats to.
    pub fn code_and_reason(self) -> (i32, &'static str) {
        match self {
            ScpiError::Null => (0, "No error"),
            ScpiError::Syntax => (-222, "Bad syntax"),
            ScpiError::BadArg => (-104, "Data type error"),
            ScpiError::UndefinedHeader => (-113, "Undefined header"),
            ScpiError::OutOfRange => (-222, "Data out of range"),
            ScpiError::QueueOverflow => (-350, "Error queue overflow"),
        }
    }

    /// Writes `"<code>,\"<reason>\"\n"` into `out`, returning the formatted
    /// slice. `out` must be at least 40 bytes.
    pub fn format<'a>(self, out: &'a mut [u8]) -> &'a str {
        let (code, reason) = self.code_and_reason();
        let mut w = Writer { buf: out, len: 0 };
        let _ = write_i32(&mut w, code);
        let _ = w.push_str(",\"");
        let _ = w.push_str(reason);
        let _ = w.push_str("\"\n");
        core::str::from_utf8(&out_slice(w)).unwrap_or("")
    }
}

struct Writer<'a> {
    buf: &'a mut [u8],
    len: usize,
}

impl<'a> Writer<'a> {
    fn push_str(&mut self, s: &str) -> Result<(), ()> {
        for b in s.bytes() {
            if self.len >= self.buf.len() {
                return Err(());
            }
            self.buf[self.len] = b;
            self.len += 1;
        }
        Ok(())
    }
}

fn out_slice<'a>(w: Writer<'a>) -> &'a [u8] {
    &w.buf[..w.len]
}

fn write_i32(w: &mut Writer, value: i32) -> Result<(), ()> {
    if value < 0 {
        w.push_str("-")?;
    }
    let mut digits = [0u8; 10];
    let mut n = value.unsigned_abs();
    let mut i = digits.len();
    loop {
        i -= 1;
        digits[i] = b'0' + (n % 10) as u8;
        n /= 10;
        if n == 0 {
            break;
        }
    }
    for &d in &digits[i..] {
        if w.len >= w.buf.len() {
            return Err(());
        }
        w.buf[w.len] = d;
        w.len += 1;
    }
    Ok(())
}

struct Ring {
    entries: [ScpiError; ERROR_QUEUE_CAPACITY],
    head: usize,
    len: usize,
}

impl Ring {
    const fn new() -> Self {
        Self {
            entries: [ScpiError::Null; ERROR_QUEUE_CAPACITY],
            head: 0,
            len: 0,
        }
    }
}

/// The process-wide SCPI error queue.
pub struct ErrorQueue {
    ring: Guarded<Ring>,
}

impl ErrorQueue {
    pub const fn new() -> Self {
        Self {
            ring: Guarded::new(Ring::new()),
        }
    }

    /// Empties the queue and clears the status-byte error-queue bit.
    pub fn init(&self) {
        self.ring.lock(|ring| *ring = Ring::new());
        let _ = REGISTERS.set_u8(Offset::Stb, 0);
    }

    /// Pushes `error`. A `Null` push is a no-op (nothing to report). On a
    /// full queue the tail slot is replaced with `QueueOverflow`, so the
    /// client can always learn overflow occurred; earlier entries keep
    /// their FIFO order.
    pub fn push(&self, error: ScpiError) {
        if error == ScpiError::Null {
            return;
        }
        self.ring.lock(|ring| {
            if ring.len == ERROR_QUEUE_CAPACITY {
                let tail = (ring.head + ring.len - 1) % ERROR_QUEUE_CAPACITY;
                ring.entries[tail] = ScpiError::QueueOverflow;
            } else {
                let tail = (ring.head + ring.len) % ERROR_QUEUE_CAPACITY;
                ring.entries[tail] = error;
                ring.len += 1;
            }
        });
        if let Ok(stb) = REGISTERS.get_u8(Offset::Stb) {
            let _ = REGISTERS.set_u8(Offset::Stb, stb | STB_ERROR_QUEUE_BIT);
        }
    }

    /// Pops the oldest error, or `Null` if the queue is empty. A pop that
    /// empties the queue clears the status-byte bit.
    pub fn pop(&self) -> ScpiError {
        let (value, now_empty) = self.ring.lock(|ring| {
            if ring.len == 0 {
                return (ScpiError::Null, false);
            }
            let value = ring.entries[ring.head];
            ring.head = (ring.head + 1) % ERROR_QUEUE_CAPACITY;
            ring.len -= 1;
            (value, ring.len == 0)
        });
        if now_empty {
            if let Ok(stb) = REGISTERS.get_u8(Offset::Stb) {
                let _ = REGISTERS.set_u8(Offset::Stb, stb & !STB_ERROR_QUEUE_BIT);
            }
        }
        value
    }
}

impl Default for ErrorQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// The process-wide error queue singleton.
pub static ERRORS: ErrorQueue = ErrorQueue::new();

#[cfg(test)]
mod tests {
    use super::*;

    fn with_clean_state<R>(f: impl FnOnce() -> R) -> R {
        REGISTERS.init();
        ERRORS.init();
        f()
    }

    #[test]
    fn init_then_pop_is_null_and_bit_clear() {
        with_clean_state(|| {
            assert_eq!(ERRORS.pop(), ScpiError::Null);
            assert_eq!(REGISTERS.get_u8(Offset::Stb).unwrap() & STB_ERROR_QUEUE_BIT, 0);
        });
    }

    #[test]
    fn push_sets_status_bit() {
        with_clean_state(|| {
            ERRORS.push(ScpiError::Syntax);
            assert_ne!(REGISTERS.get_u8(Offset::Stb).unwrap() & STB_ERROR_QUEUE_BIT, 0);
        });
    }

    #[test]
    fn overflow_replaces_tail_and_preserves_order() {
        with_clean_state(|| {
            for _ in 0..ERROR_QUEUE_CAPACITY {
                ERRORS.push(ScpiError::BadArg);
            }
            ERRORS.push(ScpiError::BadArg);
            for _ in 0..ERROR_QUEUE_CAPACITY - 1 {
                assert_eq!(ERRORS.pop(), ScpiError::BadArg);
            }
            assert_eq!(ERRORS.pop(), ScpiError::QueueOverflow);
            assert_eq!(ERRORS.pop(), ScpiError::Null);
        });
    }

    #[test]
    fn pop_to_empty_clears_bit() {
        with_clean_state(|| {
            ERRORS.push(ScpiError::Syntax);
            ERRORS.pop();
            assert_eq!(REGISTERS.get_u8(Offset::Stb).unwrap() & STB_ERROR_QUEUE_BIT, 0);
        });
    }

    #[test]
    fn formats_ieee_error_string() {
        let mut buf = [0u8; 40];
        assert_eq!(ScpiError::Null.format(&mut buf), "0,\"No error\"\n");
        let mut buf = [0u8; 40];
        assert_eq!(
            ScpiError::UndefinedHeader.format(&mut buf),
            "-113,\"Undefined header\"\n"
        );
    }
}
