// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Peer-task handle resolution.
//!
//! Tasks never hardcode the identity of the peers they talk to; they declare
//! a named slot with [`crate::task_slot!`] and resolve it once at startup.
//! On real Hubris this indirection lets the image builder assign task IDs
//! per-application without touching driver source; here it is a `Cell`
//! bound by `bind` before first use.

use core::cell::Cell;

use crate::TaskId;

/// A task's reference to one of its peers, resolved once at startup.
pub struct TaskSlot {
    id: Cell<TaskId>,
}

impl TaskSlot {
    pub const UNBOUND: TaskSlot = TaskSlot {
        id: Cell::new(TaskId::UNBOUND),
    };

    /// Binds this slot to a concrete peer. Called once during task
    /// initialization (in production, by generated startup code; in tests,
    /// directly).
    pub fn bind(&self, id: TaskId) {
        self.id.set(id);
    }

    /// Returns the bound task ID.
    ///
    /// # Panics
    ///
    /// Panics if the slot was never bound — this is a programmer error
    /// (missing wiring), not a runtime condition, so it is not a `Result`.
    pub fn get_task_id(&self) -> TaskId {
        let id = self.id.get();
        assert_ne!(id, TaskId::UNBOUND, "task slot used before binding");
        id
    }
}

// Safety: TaskSlot is only ever accessed from the single task that owns it,
// and real Hubris tasks are themselves single-threaded, so the lack of
// interior synchronization on the Cell is sound in that context. Tests run
// single-threaded per-slot as well.
unsafe impl Sync for TaskSlot {}
