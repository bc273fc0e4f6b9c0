// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `task_slot!` declares a statically-named handle to a peer task.
//!
//! ```ignore
//! task_slot!(W5100, w5100_driver);
//!
//! let w5100 = W5100.get_task_id();
//! ```

#[macro_export]
macro_rules! task_slot {
    ($vis:vis $var:ident, $task_name:ident) => {
        $vis static $var: $crate::task_slot::TaskSlot = $crate::task_slot::TaskSlot::UNBOUND;

        #[allow(dead_code)]
        const _: &str = stringify!($task_name);
    };
}
