// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Ties the lexer, parser, error queue, and command table into the single
//! entry point a session task calls per input line.
//!
//! This is deliberately a pure function over its inputs and the process-
//! wide register/error-queue singletons — no socket, no task handle — so
//! it can be driven directly in tests exactly as a session would drive it.

use crate::builtins::ENDPOINTS;
use crate::endpoint::dispatch;
use crate::error::{ScpiError, ERRORS};
use crate::lexer::{lex, LexError};
use crate::parser::{parse, ParserErrorCode};

/// Response buffer size for one processed line. Query responses from every
/// command on the line are concatenated into this buffer in input order.
pub const RESPONSE_CAPACITY: usize = 256;

/// Processes one complete input line (already stripped of any surrounding
/// session framing) and returns the concatenated response text for every
/// query on the line, in input order.
///
/// Errors at any stage — lex, parse, or dispatch — are pushed to the error
/// queue and do not stop processing of commands already recognized on the
/// line; a lex or parse failure simply means no further commands on this
/// line are attempted.
pub fn process_line(line: &[u8]) -> heapless::String<RESPONSE_CAPACITY> {
    let mut response = heapless::String::new();

    let tokens = match lex(line) {
        Ok(tokens) => tokens,
        Err(LexError::LexemeOverflow) | Err(LexError::UnsupportedChar(_)) => {
            ERRORS.push(ScpiError::Syntax);
            return response;
        }
    };

    let (commands, parse_error) = parse(&tokens);

    for command in commands.iter() {
        let mut command_response: heapless::String<256> = heapless::String::new();
        let status = dispatch(&ENDPOINTS, command, &mut command_response);
        ERRORS.push(status);
        let _ = response.push_str(&command_response);
    }

    if let Some(err) = parse_error {
        let scpi_error = match err.code {
            ParserErrorCode::Unexpected => ScpiError::Syntax,
            ParserErrorCode::InvalidHeader => ScpiError::Syntax,
            ParserErrorCode::InvalidArg => ScpiError::BadArg,
        };
        ERRORS.push(scpi_error);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use raptor_sysreg::REGISTERS;

    fn reset_all() {
        REGISTERS.init();
        ERRORS.init();
    }

    fn pop_error_text() -> heapless::String<RESPONSE_CAPACITY> {
        process_line(b"SYST:ERR?\n")
    }

    #[test]
    fn idn_then_reset_then_clean_error_queue() {
        reset_all();
        process_line(b"*RST\n");
        let response = pop_error_text();
        assert_eq!(response.as_str(), "0,\"No error\"\n");
    }

    #[test]
    fn all_unsupported_characters_report_bad_syntax() {
        reset_all();
        process_line(b"@@@\n");
        let response = pop_error_text();
        assert_eq!(response.as_str(), "-222,\"Bad syntax\"\n");
    }

    #[test]
    fn well_formed_unknown_endpoint_reports_undefined_header() {
        reset_all();
        process_line(b"FOO:BAR?\n");
        let response = pop_error_text();
        assert_eq!(response.as_str(), "-113,\"Undefined header\"\n");
    }

    #[test]
    fn multiple_commands_concatenate_responses_in_order() {
        reset_all();
        let response = process_line(b"*IDN?;SYST:ERR?\n");
        let mut lines = response.lines();
        assert!(lines.next().unwrap().starts_with("dronectl"));
        assert_eq!(lines.next(), Some("0,\"No error\""));
    }

    #[test]
    fn overflowing_the_error_queue_reports_overflow_on_the_twenty_first_pop() {
        reset_all();
        for _ in 0..21 {
            process_line(b"@\n");
        }
        let mut response = heapless::String::<RESPONSE_CAPACITY>::new();
        for _ in 0..20 {
            response = pop_error_text();
        }
        assert_eq!(response.as_str(), "-350,\"Error queue overflow\"\n");
    }
}
