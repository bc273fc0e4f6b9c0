// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Monotonic tick source.
//!
//! The real firmware derives this from a hardware timer serviced by the
//! kernel. Here it is a free-running counter advanced by whoever owns the
//! tick (normally the HSM supervisor task); components that only need to
//! timestamp events read it.

use core::sync::atomic::{AtomicU64, Ordering};

pub type Ticks = u64;

static TICKS: AtomicU64 = AtomicU64::new(0);

/// Returns the current tick count.
pub fn now_ticks() -> Ticks {
    TICKS.load(Ordering::Relaxed)
}

/// Advances the tick counter by `delta`. Called once per scheduler period
/// by the task that owns the tick source (the HSM supervisor, in this
/// firmware); other tasks only observe [`now_ticks`].
pub fn advance_ticks(delta: Ticks) {
    TICKS.fetch_add(delta, Ordering::Relaxed);
}

#[cfg(test)]
pub fn reset_ticks_for_test() {
    TICKS.store(0, Ordering::Relaxed);
}
