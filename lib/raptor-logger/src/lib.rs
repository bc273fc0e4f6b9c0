// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The operator-facing logger: a bounded queue of log records drained by a
//! dedicated TCP task, distinct from [`ringbuf`](../ringbuf)'s cheap,
//! always-on trace buffers.
//!
//! Producers never block on the network, or on each other: [`log`] (and the
//! [`sys_log!`] call-site macro built on it) formats the message and
//! enqueues non-blocking, silently dropping the record if the queue is
//! full. The draining side — accepting a client, writing formatted lines,
//! re-accepting on write failure — belongs to the task that owns the
//! listening socket.

#![cfg_attr(not(test), no_std)]

use core::fmt::Write as _;

use userlib::time::now_ticks;
use userlib::{Guarded, StaticQueue, Ticks};

/// Longest message body a single record can carry. Text beyond this is
/// silently truncated by the formatter, matching the reference's
/// `vsnprintf`-into-fixed-buffer behavior.
pub const MESSAGE_CAPACITY: usize = 248;

/// Depth of the bounded record queue between producers and the draining
/// task.
pub const LOG_QUEUE_CAPACITY: usize = 16;

/// Longest formatted line (`format_line`'s output), header plus message.
pub const LINE_CAPACITY: usize = 300;

/// Severity, ordered least to most urgent so `configured_level > record`
/// is a cheap filter test. `Disable` is a threshold value only — no record
/// is ever tagged with it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Trace,
    Info,
    Warning,
    Error,
    Critical,
    Disable,
}

impl Level {
    /// The fixed-width label this level formats to on the wire.
    pub fn label(self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Info => "INFO",
            Level::Warning => "WARN",
            Level::Error => "ERR",
            Level::Critical | Level::Disable => "CRIT",
        }
    }
}

/// One queued log entry: a timestamp, a severity, and a pre-formatted
/// message. `Copy` (a fixed byte array, not a `String`) so it can live in a
/// [`StaticQueue`] slot.
#[derive(Clone, Copy)]
pub struct LogRecord {
    pub epoch_ticks: Ticks,
    pub level: Level,
    message: [u8; MESSAGE_CAPACITY],
    message_len: u16,
}

impl LogRecord {
    pub fn message(&self) -> &str {
        core::str::from_utf8(&self.message[..self.message_len as usize]).unwrap_or("")
    }

    /// Writes `"[ <epoch> <LEVEL> ]\t<message>"` into `out`, returning the
    /// formatted slice.
    pub fn format_line<'a>(&self, out: &'a mut heapless::String<LINE_CAPACITY>) -> &'a str {
        out.clear();
        let _ = write!(out, "[ {:>9} {:>5} ]\t", self.epoch_ticks, self.level.label());
        let _ = out.push_str(self.message());
        out.as_str()
    }
}

/// Writes formatted text into a fixed byte buffer, truncating silently past
/// capacity — the no_std stand-in for `vsnprintf`'s size-limited write.
struct RecordWriter {
    buf: [u8; MESSAGE_CAPACITY],
    len: usize,
}

impl core::fmt::Write for RecordWriter {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        let remaining = MESSAGE_CAPACITY - self.len;
        let n = s.len().min(remaining);
        self.buf[self.len..self.len + n].copy_from_slice(&s.as_bytes()[..n]);
        self.len += n;
        Ok(())
    }
}

struct Inner {
    queue: StaticQueue<LogRecord, LOG_QUEUE_CAPACITY>,
    level: Level,
}

/// The process-wide logger: threshold plus the record queue the draining
/// task reads from.
pub struct Logger {
    inner: Guarded<Inner>,
}

impl Logger {
    pub const fn new() -> Self {
        Self {
            inner: Guarded::new(Inner {
                queue: StaticQueue::new(),
                level: Level::Info,
            }),
        }
    }

    pub fn set_level(&self, level: Level) {
        self.inner.lock(|inner| inner.level = level);
    }

    pub fn level(&self) -> Level {
        self.inner.lock(|inner| inner.level)
    }

    fn enqueue(&self, record: LogRecord) {
        self.inner.lock(|inner| {
            let _ = inner.queue.send(record, 0);
        });
    }

    /// Drains the oldest queued record, if any. Called by the task that
    /// owns the logger's listening socket.
    pub fn drain(&self) -> Option<LogRecord> {
        self.inner.lock(|inner| inner.queue.recv(0))
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

/// The process-wide logger singleton.
pub static LOGGER: Logger = Logger::new();

/// Formats `args` and enqueues it at `level`, unless the configured
/// threshold filters it out. Non-blocking: a full queue silently drops the
/// record rather than stalling the caller.
pub fn log(level: Level, args: core::fmt::Arguments) {
    if LOGGER.level() > level {
        return;
    }
    let mut writer = RecordWriter {
        buf: [0u8; MESSAGE_CAPACITY],
        len: 0,
    };
    let _ = core::fmt::write(&mut writer, args);
    let record = LogRecord {
        epoch_ticks: now_ticks(),
        level,
        message: writer.buf,
        message_len: writer.len as u16,
    };
    LOGGER.enqueue(record);
}

/// Formats and enqueues a log record at the named severity.
///
/// ```ignore
/// sys_log!(info, "accepted connection with fd: {}", fd);
/// sys_log!(warning, "retrying sensor init");
/// ```
#[macro_export]
macro_rules! sys_log {
    (trace, $($arg:tt)*) => {
        $crate::log($crate::Level::Trace, core::format_args!($($arg)*))
    };
    (info, $($arg:tt)*) => {
        $crate::log($crate::Level::Info, core::format_args!($($arg)*))
    };
    (warning, $($arg:tt)*) => {
        $crate::log($crate::Level::Warning, core::format_args!($($arg)*))
    };
    (error, $($arg:tt)*) => {
        $crate::log($crate::Level::Error, core::format_args!($($arg)*))
    };
    (critical, $($arg:tt)*) => {
        $crate::log($crate::Level::Critical, core::format_args!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::fmt::Write as _;

    fn reset() {
        while LOGGER.drain().is_some() {}
        LOGGER.set_level(Level::Trace);
    }

    #[test]
    fn records_drain_in_fifo_order() {
        reset();
        sys_log!(info, "first");
        sys_log!(warning, "second {}", 2);
        let a = LOGGER.drain().unwrap();
        let b = LOGGER.drain().unwrap();
        assert_eq!(a.message(), "first");
        assert_eq!(b.message(), "second 2");
        assert!(LOGGER.drain().is_none());
    }

    #[test]
    fn below_threshold_records_are_not_enqueued() {
        reset();
        LOGGER.set_level(Level::Warning);
        sys_log!(info, "should be filtered");
        assert!(LOGGER.drain().is_none());
        sys_log!(error, "should pass");
        assert!(LOGGER.drain().is_some());
    }

    #[test]
    fn full_queue_drops_the_newest_record_without_blocking() {
        reset();
        for i in 0..LOG_QUEUE_CAPACITY {
            log(Level::Info, format_args!("msg {}", i));
        }
        log(Level::Info, format_args!("overflow"));
        for i in 0..LOG_QUEUE_CAPACITY {
            assert_eq!(LOGGER.drain().unwrap().message(), fmt_msg(i).as_str());
        }
        assert!(LOGGER.drain().is_none());
    }

    fn fmt_msg(i: usize) -> heapless::String<16> {
        let mut s = heapless::String::new();
        let _ = write!(s, "msg {}", i);
        s
    }

    #[test]
    fn format_line_matches_ieee_style() {
        reset();
        sys_log!(error, "bus timeout");
        let record = LOGGER.drain().unwrap();
        let mut buf: heapless::String<LINE_CAPACITY> = heapless::String::new();
        let line = record.format_line(&mut buf);
        assert!(line.starts_with("[ "));
        assert!(line.contains("  ERR ]\t"));
        assert!(line.ends_with("bus timeout"));
    }
}
