// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Minimal task-runtime support library.
//!
//! This plays the role that `userlib` plays in a Hubris-style firmware: a
//! thin crate every task and driver links against for the handful of things
//! the RTOS/kernel provides (task handles, a monotonic tick source, blocking
//! primitives, inter-task queues). The real scheduler, syscall ABI, and
//! interrupt controller are out of scope here (per the core firmware spec,
//! they are external collaborators) — this crate models their *observable
//! contract* well enough to build and test the core against, not their
//! implementation.
#![cfg_attr(not(test), no_std)]

pub mod hl;
pub mod macros;
pub mod queue;
pub mod sync;
pub mod task_slot;
pub mod time;

pub use queue::{QueueFull, StaticQueue};
pub use sync::Guarded;
pub use task_slot::TaskSlot;
pub use time::Ticks;

/// Identifies a peer task. On real Hubris this is a generation-checked
/// kernel handle; here it is an opaque small integer bound once at startup
/// by `task_slot!` and never reused for anything but logging/diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct TaskId(pub u16);

impl TaskId {
    pub const UNBOUND: TaskId = TaskId(0xffff);
}
