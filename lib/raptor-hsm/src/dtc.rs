// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Diagnostic trouble codes: an identifier for a fault the HSM has
//! observed, posted to a diagnostic channel rather than returned to a
//! caller.

use ringbuf::{ringbuf, ringbuf_entry};

/// A diagnostic trouble code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dtc {
    None,
    HsmUnhandledEvent,
}

impl Default for Dtc {
    fn default() -> Self {
        Dtc::None
    }
}

ringbuf!(DTC_TRACE, Dtc, 16, Dtc::None);

/// Posts `dtc` to the diagnostic channel. On this firmware that channel is
/// the HSM's trace ring buffer; a production build would additionally
/// forward it to telemetry, which is out of scope here.
pub fn post(dtc: Dtc) {
    ringbuf_entry!(DTC_TRACE, dtc);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn posting_records_to_the_trace_ring() {
        post(Dtc::HsmUnhandledEvent);
    }
}
