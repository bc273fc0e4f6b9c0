// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The reference endpoint table: device identification, reset, the error
//! queue query, and the two reserved control endpoints.

use crate::endpoint::{Endpoint, Header};
use crate::error::{ScpiError, ERRORS};
use crate::token::Identifier;
use raptor_sysreg::{Offset, REGISTERS};

const IDN_STRING: &str = "dronectl, raptor, v0.1.0\n";

fn get_idn(_args: &[Identifier], response: &mut heapless::String<256>) -> ScpiError {
    let _ = response.push_str(IDN_STRING);
    ScpiError::Null
}

fn system_reset(_args: &[Identifier]) -> ScpiError {
    REGISTERS.reset();
    ScpiError::Null
}

fn system_error_pop(_args: &[Identifier], response: &mut heapless::String<256>) -> ScpiError {
    let error = ERRORS.pop();
    let mut buf = [0u8; 40];
    let formatted = error.format(&mut buf);
    let _ = response.push_str(formatted);
    ScpiError::Null
}

static IDN: [Header; 1] = [Header { abbr: "idn", full: "idn" }];
static RST: [Header; 1] = [Header { abbr: "rst", full: "rst" }];
static SYST_ERR: [Header; 2] = [
    Header { abbr: "syst", full: "system" },
    Header { abbr: "err", full: "error" },
];
static CONT_SET: [Header; 2] = [
    Header { abbr: "cont", full: "control" },
    Header { abbr: "set", full: "setpoint" },
];
static CONT_STAT: [Header; 2] = [
    Header { abbr: "cont", full: "control" },
    Header { abbr: "stat", full: "status" },
];

/// The endpoint table this core registers. `CONTrol:SETpoint` and
/// `CONTrol:STATus?` are reserved: they resolve (so a client learns the
/// endpoint exists) but neither direction is implemented here, matching
/// the core's explicit scope boundary around the motion/control subsystem.
pub static ENDPOINTS: [Endpoint; 5] = [
    Endpoint {
        headers: &IDN,
        query: Some(get_idn),
        write: None,
    },
    Endpoint {
        headers: &SYST_ERR,
        query: Some(system_error_pop),
        write: None,
    },
    Endpoint {
        headers: &RST,
        query: None,
        write: Some(system_reset),
    },
    Endpoint {
        headers: &CONT_SET,
        query: None,
        write: None,
    },
    Endpoint {
        headers: &CONT_STAT,
        query: None,
        write: None,
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::dispatch;
    use crate::lexer::lex;
    use crate::parser::parse;

    fn run(line: &[u8]) -> (heapless::String<256>, ScpiError) {
        REGISTERS.init();
        let tokens = lex(line).unwrap();
        let (commands, _) = parse(&tokens);
        let mut response = heapless::String::new();
        let mut status = ScpiError::Null;
        for cmd in commands.iter() {
            status = dispatch(&ENDPOINTS, cmd, &mut response);
        }
        (response, status)
    }

    #[test]
    fn idn_query_returns_identification_string() {
        let (response, status) = run(b"*IDN?\n");
        assert_eq!(status, ScpiError::Null);
        assert!(response.starts_with("dronectl"));
        assert!(response.ends_with('\n'));
    }

    #[test]
    fn reserved_control_endpoints_report_undefined_direction() {
        ERRORS.init();
        let (_, status) = run(b"CONT:SET\n");
        assert_eq!(status, ScpiError::UndefinedHeader);
    }

    #[test]
    fn lowercase_header_matches_endpoint() {
        let (response, status) = run(b"syst:err?\n");
        assert_eq!(status, ScpiError::Null);
        assert!(response.ends_with('\n'));
    }
}
