// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![no_std]
#![no_main]

use raptor_hsm::Supervisor;
use raptor_logger::sys_log;
use userlib::*;

/// Fixed tick period the HSM services its event queue, transitions, and
/// tick cascade at.
const TICK_RATE_MS: u64 = 100;

#[export_name = "main"]
fn main() -> ! {
    let mut supervisor = Supervisor::new();
    sys_log!(info, "hsm: starting in RESET");

    loop {
        supervisor.step();
        userlib::time::advance_ticks(TICK_RATE_MS);
        hl::sleep_for(TICK_RATE_MS);
    }
}
