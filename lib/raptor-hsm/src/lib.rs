// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The hierarchical state machine: a generic, table-driven engine ([`engine`])
//! plus the concrete raptor state tree, event alphabet, and diagnostic
//! trouble codes built on top of it.

#![cfg_attr(not(test), no_std)]

pub mod dtc;
pub mod engine;
pub mod event;
pub mod states;

pub use dtc::Dtc;
pub use engine::{EventOutcome, Hsm, StateEntry, StateId};
pub use event::{post_event, post_event_from_isr, Event, EventQueue};
pub use states::{RaptorState, Supervisor};
