// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The command table: endpoints registered by header chain, matched and
//! dispatched against a parsed command.

use ringbuf::{ringbuf, ringbuf_entry};

use crate::error::ScpiError;
use crate::parser::{Command, CommandSpec};
use crate::token::Identifier;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Trace {
    None,
    Dispatched,
    UndefinedHeader,
    WrongDirection,
}

ringbuf!(Trace, 32, Trace::None);

/// One mnemonic's abbreviated and full spelling, e.g. `("SYST", "SYSTEM")`.
#[derive(Clone, Copy, Debug)]
pub struct Header {
    pub abbr: &'static str,
    pub full: &'static str,
}

impl Header {
    /// Matches case-insensitively against either the abbreviated or full
    /// spelling, requiring an exact length match first — this is what lets
    /// `SYST` and `SYSTEM` both match while `SYSTE` matches neither.
    pub fn matches(&self, token: &Identifier) -> bool {
        let candidate = token.as_str();
        let against = if candidate.len() == self.abbr.len() {
            self.abbr
        } else if candidate.len() == self.full.len() {
            self.full
        } else {
            return false;
        };
        candidate.eq_ignore_ascii_case(against)
    }
}

pub type QueryHandler = fn(args: &[Identifier], response: &mut heapless::String<256>) -> ScpiError;
pub type WriteHandler = fn(args: &[Identifier]) -> ScpiError;

/// A registered endpoint: its header chain plus optional query/write
/// handlers. An endpoint that exists but lacks the requested direction is a
/// dispatch error distinct from "no endpoint matches at all".
pub struct Endpoint {
    pub headers: &'static [Header],
    pub query: Option<QueryHandler>,
    pub write: Option<WriteHandler>,
}

/// Finds the first endpoint whose header chain exactly matches `headers`
/// (same length, every header matching in order).
pub fn find<'a>(table: &'a [Endpoint], headers: &[Identifier]) -> Option<&'a Endpoint> {
    table.iter().find(|ep| {
        ep.headers.len() == headers.len()
            && ep
                .headers
                .iter()
                .zip(headers.iter())
                .all(|(h, tok)| h.matches(tok))
    })
}

/// Dispatches one parsed command against the table, returning the response
/// text for a query (empty for a write) and the resulting error, if any.
pub fn dispatch(
    table: &[Endpoint],
    command: &Command,
    response: &mut heapless::String<256>,
) -> ScpiError {
    let endpoint = match find(table, &command.headers) {
        Some(ep) => ep,
        None => {
            ringbuf_entry!(Trace::UndefinedHeader);
            return ScpiError::UndefinedHeader;
        }
    };

    let result = if command.spec.contains(CommandSpec::QUERY) {
        match endpoint.query {
            Some(handler) => handler(&command.args, response),
            None => {
                ringbuf_entry!(Trace::WrongDirection);
                return ScpiError::UndefinedHeader;
            }
        }
    } else {
        match endpoint.write {
            Some(handler) => handler(&command.args),
            None => {
                ringbuf_entry!(Trace::WrongDirection);
                return ScpiError::UndefinedHeader;
            }
        }
    };

    ringbuf_entry!(Trace::Dispatched);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abbreviated_and_full_forms_both_match() {
        let h = Header {
            abbr: "SYST",
            full: "SYSTEM",
        };
        assert!(h.matches(&Identifier::from("SYST")));
        assert!(h.matches(&Identifier::from("system")));
        assert!(!h.matches(&Identifier::from("SYSTE")));
    }
}
