// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fault trap: the last-resort handler for an invariant violation that
//! leaves the system in a state no recovery path can trust.
//!
//! [`raptor_assert!`] is for conditions that must never happen in a
//! correctly operating firmware (a range check on a value already validated
//! at the boundary, a state the HSM's own table says is unreachable) — not
//! for anything an operator or a malformed SCPI command can trigger. Those
//! go through [`raptor_sysreg::Error`] / [`raptor_scpi::ScpiError`] instead
//! and are recoverable by construction.
//!
//! Behavior on trip differs by build: a host test treats a trip as a test
//! failure (`panic!`), a debug build halts the core so a debugger can
//! inspect it, and a release build spins, relying on the watchdog task to
//! reset the system — there is no software recovery from a tripped
//! assertion.

#![cfg_attr(not(test), no_std)]

use userlib::Guarded;

/// Snapshot of where an assertion tripped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct AssertTrace {
    pub line: u32,
    pub file_hash: u32,
}

static LAST_TRAP: Guarded<Option<AssertTrace>> = Guarded::new(None);

/// Returns the most recently recorded trap, if any tripped since startup.
pub fn last_trap() -> Option<AssertTrace> {
    LAST_TRAP.lock(|slot| *slot)
}

/// Hashes a `&'static str` into a `u32` so [`AssertTrace`] stays `Copy` and
/// fixed-size (no `&'static str` payload to carry across the ring buffer /
/// guarded-static boundary).
const fn fnv1a(s: &str) -> u32 {
    let bytes = s.as_bytes();
    let mut hash: u32 = 0x811c_9dc5;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u32;
        hash = hash.wrapping_mul(0x0100_0193);
        i += 1;
    }
    hash
}

#[doc(hidden)]
pub fn trap(file: &'static str, line: u32) -> ! {
    let trace = AssertTrace {
        line,
        file_hash: fnv1a(file),
    };
    LAST_TRAP.lock(|slot| *slot = Some(trace));

    #[cfg(test)]
    {
        panic!("raptor_assert tripped at {}:{}", file, line);
    }

    #[cfg(not(test))]
    {
        #[cfg(debug_assertions)]
        {
            #[cfg(feature = "bkpt")]
            cortex_m::asm::bkpt();
        }
        loop {
            // Awaiting a watchdog reset. No path out of this loop is
            // trusted to leave the system in a known-good state.
        }
    }
}

/// Traps the fault handler if `cond` is false.
#[macro_export]
macro_rules! raptor_assert {
    ($cond:expr) => {
        if !($cond) {
            $crate::trap(file!(), line!());
        }
    };
    ($cond:expr, $($_arg:tt)*) => {
        $crate::raptor_assert!($cond)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "raptor_assert tripped")]
    fn failing_condition_traps() {
        raptor_assert!(1 + 1 == 3);
    }

    #[test]
    fn passing_condition_does_not_trap() {
        raptor_assert!(1 + 1 == 2);
    }

    #[test]
    fn hash_is_stable_for_same_input() {
        assert_eq!(fnv1a("a.rs"), fnv1a("a.rs"));
        assert_ne!(fnv1a("a.rs"), fnv1a("b.rs"));
    }
}
