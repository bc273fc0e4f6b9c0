// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Single-pass classification of an input line into a bounded token
//! sequence. One lexer run is local to the command line being processed;
//! it holds no state across calls.

use ringbuf::{ringbuf, ringbuf_entry};

use crate::token::{Identifier, Token};

/// Maximum number of tokens a single line can lex into.
pub const MAX_TOKENS: usize = 30;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LexError {
    /// An identifier exceeded [`crate::token::MAX_TOKEN_LEN`].
    LexemeOverflow,
    /// A byte outside `[:;, \n?*A-Za-z0-9]` was encountered.
    UnsupportedChar(u8),
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Trace {
    None,
    Lexed(usize),
    TableFull,
    LexemeOverflow,
    UnsupportedChar(u8),
}

ringbuf!(Trace, 32, Trace::None);

/// Lexes `line` into a bounded token sequence.
///
/// Stops at the first of: the end-of-sequence character (`\n`), an error,
/// end of input, or the token table filling up (not itself an error — a
/// line too long to fully tokenize is simply truncated at the token
/// boundary, mirroring the reference lexer's early return).
pub fn lex(line: &[u8]) -> Result<heapless::Vec<Token, MAX_TOKENS>, LexError> {
    let mut tokens: heapless::Vec<Token, MAX_TOKENS> = heapless::Vec::new();
    let mut current: Option<Identifier> = None;

    macro_rules! flush_identifier {
        () => {
            if let Some(id) = current.take() {
                if tokens.push(Token::Id(id)).is_err() {
                    ringbuf_entry!(Trace::TableFull);
                    return Ok(tokens);
                }
            }
        };
    }

    for &byte in line {
        let single = match byte {
            b':' => Some(Token::HdrSep),
            b';' => Some(Token::CmdSep),
            b',' => Some(Token::ArgSep),
            b' ' => Some(Token::Space),
            b'\n' => Some(Token::Eos),
            b'?' => Some(Token::Query),
            b'*' => Some(Token::Common),
            _ => None,
        };

        if let Some(tok) = single {
            flush_identifier!();
            let is_eos = tok == Token::Eos;
            if tokens.push(tok).is_err() {
                ringbuf_entry!(Trace::TableFull);
                return Ok(tokens);
            }
            if is_eos {
                ringbuf_entry!(Trace::Lexed(tokens.len()));
                return Ok(tokens);
            }
            continue;
        }

        if byte.is_ascii_alphanumeric() {
            let id = current.get_or_insert_with(Identifier::empty);
            if id.push(byte).is_err() {
                ringbuf_entry!(Trace::LexemeOverflow);
                return Err(LexError::LexemeOverflow);
            }
        } else {
            ringbuf_entry!(Trace::UnsupportedChar(byte));
            return Err(LexError::UnsupportedChar(byte));
        }
    }

    flush_identifier!();
    ringbuf_entry!(Trace::Lexed(tokens.len()));
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(tokens: &[Token]) -> heapless::Vec<&str, 8> {
        tokens
            .iter()
            .filter_map(|t| match t {
                Token::Id(id) => Some(id.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn idn_query_classifies_correctly() {
        let tokens = lex(b"*IDN?\n").unwrap();
        assert_eq!(
            &tokens[..],
            &[
                Token::Common,
                Token::Id(Identifier::from("IDN")),
                Token::Query,
                Token::Eos,
            ]
        );
    }

    #[test]
    fn header_chain_splits_on_colon() {
        let tokens = lex(b"SYST:ERR?\n").unwrap();
        let names = ids(&tokens);
        assert_eq!(&names[..], &["SYST", "ERR"]);
        assert_eq!(tokens.last(), Some(&Token::Eos));
    }

    #[test]
    fn overlong_identifier_overflows() {
        let line = b"ABCDEFGHIJKLMNOPQ\n";
        assert_eq!(lex(line), Err(LexError::LexemeOverflow));
    }

    #[test]
    fn unsupported_character_errors() {
        assert_eq!(lex(b"@\n"), Err(LexError::UnsupportedChar(b'@')));
    }
}
