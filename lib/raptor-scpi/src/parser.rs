// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Builds a sequence of commands (header chain + args + spec bits) from a
//! lexed token sequence, rejecting malformed syntax.

use bitflags::bitflags;
use ringbuf::{ringbuf, ringbuf_entry};

use crate::token::{Identifier, Token};

pub const MAX_HEADERS: usize = 5;
pub const MAX_ARGS: usize = 10;
pub const MAX_COMMANDS: usize = 5;

bitflags! {
    pub struct CommandSpec: u8 {
        const COMMON = 1 << 0;
        const QUERY = 1 << 1;
        const SET = 1 << 2;
    }
}

#[derive(Clone, Copy)]
pub struct Command {
    pub spec: CommandSpec,
    pub headers: heapless::Vec<Identifier, MAX_HEADERS>,
    pub args: heapless::Vec<Identifier, MAX_ARGS>,
}

impl Command {
    fn new() -> Self {
        Self {
            spec: CommandSpec::empty(),
            headers: heapless::Vec::new(),
            args: heapless::Vec::new(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParserErrorCode {
    /// A token appeared somewhere the grammar does not allow it.
    Unexpected,
    InvalidHeader,
    InvalidArg,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParserError {
    pub code: ParserErrorCode,
    pub token_index: usize,
    pub char_index: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Trace {
    None,
    Parsed(usize),
    CommandTableFull,
    Error(ParserErrorCode),
}

ringbuf!(Trace, 32, Trace::None);

bitflags! {
    struct Flags: u8 {
        const HDR_DELIM_EXPECTED = 1 << 0;
        const ARG_DELIM_EXPECTED = 1 << 1;
        const END_OF_HEADERS = 1 << 2;
        /// Set by a header separator, cleared by the next identifier. A
        /// second separator while this is still set (no identifier
        /// in between) is a double colon, e.g. `"::IDN"`.
        const JUST_SAW_HDR_SEP = 1 << 3;
    }
}

fn is_valid_header(id: &Identifier) -> bool {
    let s = id.as_str();
    if s.is_empty() || s.len() > 15 {
        return false;
    }
    let mut seen_digit = false;
    for c in s.chars() {
        if c.is_ascii_digit() {
            seen_digit = true;
        } else if c.is_ascii_alphabetic() {
            if seen_digit {
                return false;
            }
        } else {
            return false;
        }
    }
    true
}

fn is_valid_arg(id: &Identifier) -> bool {
    !id.is_empty()
}

/// Parses a lexed token sequence into a bounded command list.
///
/// On the first grammar violation, parsing stops; the command under
/// construction at that point is discarded, but commands already committed
/// (terminated by `;` or end of sequence) remain valid.
pub fn parse(
    tokens: &[Token],
) -> (heapless::Vec<Command, MAX_COMMANDS>, Option<ParserError>) {
    let mut commands: heapless::Vec<Command, MAX_COMMANDS> = heapless::Vec::new();
    let mut current = Command::new();
    let mut flags = Flags::HDR_DELIM_EXPECTED;

    for (i, token) in tokens.iter().enumerate() {
        let err = match token {
            Token::Common => {
                current.spec |= CommandSpec::COMMON;
                None
            }
            Token::Query => {
                if flags.contains(Flags::HDR_DELIM_EXPECTED) {
                    Some(ParserErrorCode::Unexpected)
                } else {
                    current.spec |= CommandSpec::QUERY;
                    None
                }
            }
            Token::Eos | Token::CmdSep => {
                if !current.spec.contains(CommandSpec::QUERY) {
                    current.spec |= CommandSpec::SET;
                }
                let finished = core::mem::replace(&mut current, Command::new());
                if commands.push(finished).is_err() {
                    // Command table full: stop silently, as with the token
                    // table filling up in the lexer.
                    ringbuf_entry!(Trace::CommandTableFull);
                    return (commands, None);
                }
                flags = Flags::HDR_DELIM_EXPECTED;
                None
            }
            Token::HdrSep => {
                if flags.contains(Flags::END_OF_HEADERS)
                    || flags.contains(Flags::JUST_SAW_HDR_SEP)
                {
                    Some(ParserErrorCode::Unexpected)
                } else {
                    flags |= Flags::HDR_DELIM_EXPECTED | Flags::JUST_SAW_HDR_SEP;
                    None
                }
            }
            Token::ArgSep => {
                if !flags.contains(Flags::END_OF_HEADERS)
                    || current.spec.contains(CommandSpec::COMMON)
                {
                    Some(ParserErrorCode::Unexpected)
                } else {
                    flags |= Flags::ARG_DELIM_EXPECTED;
                    None
                }
            }
            Token::Space => {
                if !flags.contains(Flags::HDR_DELIM_EXPECTED) {
                    flags |= Flags::END_OF_HEADERS;
                }
                None
            }
            Token::Id(id) => {
                if current.spec.contains(CommandSpec::COMMON) && !current.headers.is_empty() {
                    Some(ParserErrorCode::Unexpected)
                } else if flags.contains(Flags::END_OF_HEADERS) {
                    if is_valid_arg(id) {
                        let _ = current.args.push(*id);
                        flags.remove(Flags::ARG_DELIM_EXPECTED);
                        None
                    } else {
                        Some(ParserErrorCode::InvalidArg)
                    }
                } else if is_valid_header(id) {
                    let _ = current.headers.push(*id);
                    flags.remove(Flags::HDR_DELIM_EXPECTED | Flags::JUST_SAW_HDR_SEP);
                    None
                } else {
                    Some(ParserErrorCode::InvalidHeader)
                }
            }
        };

        if let Some(code) = err {
            ringbuf_entry!(Trace::Error(code));
            return (
                commands,
                Some(ParserError {
                    code,
                    token_index: i,
                    char_index: 0,
                }),
            );
        }
    }

    ringbuf_entry!(Trace::Parsed(commands.len()));
    (commands, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn parse_line(line: &[u8]) -> (heapless::Vec<Command, MAX_COMMANDS>, Option<ParserError>) {
        let tokens = lex(line).expect("line lexes cleanly");
        parse(&tokens)
    }

    fn header_strs(cmd: &Command) -> heapless::Vec<&str, MAX_HEADERS> {
        cmd.headers.iter().map(|id| id.as_str()).collect()
    }

    #[test]
    fn rst_is_common_and_set() {
        let (commands, err) = parse_line(b"*RST\n");
        assert!(err.is_none());
        assert_eq!(commands.len(), 1);
        let cmd = &commands[0];
        assert!(cmd.spec.contains(CommandSpec::COMMON));
        assert!(cmd.spec.contains(CommandSpec::SET));
        assert_eq!(&header_strs(cmd)[..], &["RST"]);
    }

    #[test]
    fn idn_query_is_common_and_query() {
        let (commands, err) = parse_line(b"*IDN?\n");
        assert!(err.is_none());
        let cmd = &commands[0];
        assert!(cmd.spec.contains(CommandSpec::COMMON));
        assert!(cmd.spec.contains(CommandSpec::QUERY));
    }

    #[test]
    fn syst_err_query_headers_split() {
        let (commands, err) = parse_line(b"SYST:ERR?\n");
        assert!(err.is_none());
        let cmd = &commands[0];
        assert!(cmd.spec.contains(CommandSpec::QUERY));
        assert_eq!(&header_strs(cmd)[..], &["SYST", "ERR"]);
    }

    #[test]
    fn leading_colon_is_equivalent() {
        let (a, _) = parse_line(b"SYST:ERR?\n");
        let (b, _) = parse_line(b":SYST:ERR?\n");
        assert_eq!(header_strs(&a[0]), header_strs(&b[0]));
        assert_eq!(a[0].spec, b[0].spec);
    }

    #[test]
    fn two_commands_on_one_line() {
        let (commands, err) = parse_line(b"ABC:DEF;GHI:JKL?\n");
        assert!(err.is_none());
        assert_eq!(commands.len(), 2);
        assert!(commands[0].spec.contains(CommandSpec::SET));
        assert!(commands[1].spec.contains(CommandSpec::QUERY));
    }

    #[test]
    fn single_letter_headers_are_accepted() {
        let (commands, err) = parse_line(b"A:B;C:D?\n");
        assert!(err.is_none());
        assert_eq!(commands.len(), 2);
        assert!(commands[0].spec.contains(CommandSpec::SET));
        assert_eq!(&header_strs(&commands[0])[..], &["A", "B"]);
        assert!(commands[1].spec.contains(CommandSpec::QUERY));
        assert_eq!(&header_strs(&commands[1])[..], &["C", "D"]);
    }

    #[test]
    fn double_colon_is_unexpected() {
        let (_, err) = parse_line(b"::IDN\n");
        let err = err.expect("double colon should fail to parse");
        assert_eq!(err.code, ParserErrorCode::Unexpected);
        assert_eq!(err.token_index, 1);
    }
}
