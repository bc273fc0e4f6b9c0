// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! High-level convenience wrappers over the (out-of-scope) RTOS delay
//! primitive.

/// Suspends the calling task for approximately `ms` milliseconds.
///
/// On target this is the kernel's tick-delay syscall. Off target (host
/// tests, `cfg(test)`) it is a no-op: tests drive time explicitly via
/// [`crate::time::advance_ticks`] rather than by sleeping the test thread.
pub fn sleep_for(_ms: u64) {
    #[cfg(not(test))]
    {
        // Collaborator: the RTOS tick-delay syscall. Not implemented here;
        // the core only depends on this function's suspension contract.
    }
}

/// Refreshes the hardware watchdog timer. Call once per period from any
/// task whose liveness the watchdog is configured to track; missing a
/// refresh window causes an external reset.
///
/// On target this pets the watchdog peripheral directly (a collaborator
/// outside this core's scope, like [`sleep_for`]'s tick-delay syscall).
/// Debug builds don't call this at all — the spec only requires refreshing
/// in production builds, so a debugger session isn't fighting the
/// watchdog.
pub fn refresh_watchdog() {
    #[cfg(not(test))]
    {
        // Collaborator: the watchdog peripheral's kick register.
    }
}
