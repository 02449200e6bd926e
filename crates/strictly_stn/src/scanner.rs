//! Byte scanner for tree notation.
//!
//! Outside values the scanner skips whitespace and yields structural tokens
//! and property identifiers. After a `[` the parser switches it into value
//! mode, which consumes everything up to the next unescaped `]`.

use crate::error::{StnError, TextLocation};
use derive_more::Display;

/// A lexical token.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum Token {
    /// `(`
    #[display("'('")]
    Open,
    /// `)`
    #[display("')'")]
    Close,
    /// `;`
    #[display("';'")]
    Semicolon,
    /// `[`
    #[display("'['")]
    LeftBracket,
    /// `]`
    #[display("']'")]
    RightBracket,
    /// Property identifier letters.
    #[display("identifier '{}'", _0)]
    PropIdent(String),
    /// Value bytes with escapes intact and line breaks normalized.
    #[display("value")]
    Value(Vec<u8>),
    /// End of input.
    #[display("end of input")]
    Eof,
}

/// Scanner over an in-memory byte buffer.
#[derive(Debug)]
pub struct Scanner<'a> {
    input: &'a [u8],
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Scanner<'a> {
    /// Starts scanning at line 1, column 1.
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    /// Current position.
    pub fn location(&self) -> TextLocation {
        TextLocation {
            line: self.line,
            column: self.column,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    /// Consumes one byte, treating CR, LF, CRLF and LFCR as one line break.
    ///
    /// Line breaks are returned as LF.
    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        match byte {
            b'\n' | b'\r' => {
                let partner = if byte == b'\n' { b'\r' } else { b'\n' };
                if self.peek() == Some(partner) {
                    self.pos += 1;
                }
                self.line += 1;
                self.column = 1;
                Some(b'\n')
            }
            _ => {
                self.column += 1;
                Some(byte)
            }
        }
    }

    /// Next token in structural mode, with the location where it starts.
    pub fn next_token(&mut self) -> Result<(Token, TextLocation), StnError> {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.bump();
        }
        let location = self.location();
        let Some(byte) = self.peek() else {
            return Ok((Token::Eof, location));
        };
        let token = match byte {
            b'(' => Token::Open,
            b')' => Token::Close,
            b';' => Token::Semicolon,
            b'[' => Token::LeftBracket,
            b']' => Token::RightBracket,
            b if b.is_ascii_alphabetic() => {
                let mut ident = String::new();
                while let Some(b) = self.peek().filter(u8::is_ascii_alphabetic) {
                    ident.push(char::from(b));
                    self.bump();
                }
                return Ok((Token::PropIdent(ident), location));
            }
            other => {
                return Err(StnError::syntax(
                    location,
                    "'(', ')', ';', '[' or a property identifier",
                    format!("'{}'", char::from(other).escape_default()),
                ));
            }
        };
        self.bump();
        Ok((token, location))
    }

    /// Reads value bytes up to, but not including, the next unescaped `]`.
    pub fn read_value(&mut self) -> (Token, TextLocation) {
        let location = self.location();
        let mut bytes = Vec::new();
        while let Some(byte) = self.peek() {
            if byte == b']' {
                break;
            }
            let Some(byte) = self.bump() else { break };
            bytes.push(byte);
            if byte == b'\\'
                && let Some(escaped) = self.bump()
            {
                bytes.push(escaped);
            }
        }
        (Token::Value(bytes), location)
    }
}
