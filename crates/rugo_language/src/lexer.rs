//! Lexer for canonical rugo text.
//!
//! Tokenizes the preprocessor's output. String literals keep their raw
//! inner text — escape processing and interpolation splitting happen in
//! the parser, which can recurse into `#{...}` with a fresh sub-lexer.
//! Newlines are real tokens: statements are newline-separated and the
//! parser decides where they are insignificant (inside argument lists).

use crate::token::{Token, TokenKind};
use rugo_base::{Result, RugoError};

pub struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    line: usize,
    path: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(path: &'a str, src: &'a str) -> Self {
        Self {
            src: src.as_bytes(),
            pos: 0,
            line: 0,
            path,
        }
    }

    /// Tokenizes the whole input, ending with an `Eof` token.
    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        tokens.push(Token {
            kind: TokenKind::Eof,
            line: self.line,
        });
        Ok(tokens)
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek2(&self) -> Option<u8> {
        self.src.get(self.pos + 1).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
        }
        Some(b)
    }

    fn token(&self, kind: TokenKind, line: usize) -> Token {
        Token { kind, line }
    }

    fn next_token(&mut self) -> Result<Option<Token>> {
        // Skip horizontal whitespace.
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r')) {
            self.pos += 1;
        }
        let line = self.line;
        let Some(b) = self.peek() else {
            return Ok(None);
        };

        match b {
            b'\n' => {
                self.bump();
                Ok(Some(Token { kind: TokenKind::Newline, line }))
            }
            b'(' => {
                self.bump();
                Ok(Some(Token { kind: TokenKind::LParen, line }))
            }
            b')' => {
                self.bump();
                Ok(Some(Token { kind: TokenKind::RParen, line }))
            }
            b'[' => {
                self.bump();
                Ok(Some(Token { kind: TokenKind::LBracket, line }))
            }
            b']' => {
                self.bump();
                Ok(Some(Token { kind: TokenKind::RBracket, line }))
            }
            b'{' => {
                self.bump();
                Ok(Some(Token { kind: TokenKind::LBrace, line }))
            }
            b'}' => {
                self.bump();
                Ok(Some(Token { kind: TokenKind::RBrace, line }))
            }
            b',' => {
                self.bump();
                Ok(Some(Token { kind: TokenKind::Comma, line }))
            }
            b'.' => {
                self.bump();
                Ok(Some(Token { kind: TokenKind::Dot, line }))
            }
            b':' => {
                self.bump();
                Ok(Some(Token { kind: TokenKind::Colon, line }))
            }
            b';' => {
                self.bump();
                Ok(Some(Token { kind: TokenKind::Semicolon, line }))
            }
            b'+' => {
                self.bump();
                Ok(Some(Token { kind: TokenKind::Plus, line }))
            }
            b'-' => {
                self.bump();
                Ok(Some(Token { kind: TokenKind::Minus, line }))
            }
            b'*' => {
                self.bump();
                Ok(Some(Token { kind: TokenKind::Star, line }))
            }
            b'/' => {
                self.bump();
                Ok(Some(Token { kind: TokenKind::Slash, line }))
            }
            b'%' => {
                self.bump();
                Ok(Some(Token { kind: TokenKind::Percent, line }))
            }
            b'=' => {
                self.bump();
                match self.peek() {
                    Some(b'=') => {
                        self.bump();
                        Ok(Some(Token { kind: TokenKind::EqEq, line }))
                    }
                    Some(b'>') => {
                        self.bump();
                        Ok(Some(Token { kind: TokenKind::Arrow, line }))
                    }
                    _ => Ok(Some(Token { kind: TokenKind::Assign, line })),
                }
            }
            b'!' => {
                self.bump();
                if self.peek() == Some(b'=') {
                    self.bump();
                    Ok(Some(Token { kind: TokenKind::NotEq, line }))
                } else {
                    Ok(Some(Token { kind: TokenKind::Bang, line }))
                }
            }
            b'<' => {
                self.bump();
                if self.peek() == Some(b'=') {
                    self.bump();
                    Ok(Some(Token { kind: TokenKind::LtEq, line }))
                } else {
                    Ok(Some(Token { kind: TokenKind::Lt, line }))
                }
            }
            b'>' => {
                self.bump();
                if self.peek() == Some(b'=') {
                    self.bump();
                    Ok(Some(Token { kind: TokenKind::GtEq, line }))
                } else {
                    Ok(Some(Token { kind: TokenKind::Gt, line }))
                }
            }
            b'&' => {
                self.bump();
                if self.peek() == Some(b'&') {
                    self.bump();
                    Ok(Some(Token { kind: TokenKind::AndAnd, line }))
                } else {
                    Err(self.error("unexpected '&'", line))
                }
            }
            b'|' => {
                self.bump();
                if self.peek() == Some(b'|') {
                    self.bump();
                    Ok(Some(Token { kind: TokenKind::OrOr, line }))
                } else {
                    Err(self.error("unexpected '|'", line))
                }
            }
            b'"' => self.lex_string(line).map(Some),
            b'\'' => self.lex_raw_string(line).map(Some),
            b'0'..=b'9' => self.lex_number(line).map(Some),
            b if b.is_ascii_alphabetic() || b == b'_' => Ok(Some(self.lex_ident(line))),
            other => Err(self.error(format!("unexpected character '{}'", other as char), line)),
        }
    }

    fn lex_ident(&mut self, line: usize) -> Token {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_alphanumeric() || b == b'_') {
            self.pos += 1;
        }
        let text = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
        self.token(TokenKind::Ident(text), line)
    }

    fn lex_number(&mut self, line: usize) -> Result<Token> {
        let start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        let is_float = self.peek() == Some(b'.') && matches!(self.peek2(), Some(b'0'..=b'9'));
        if is_float {
            self.pos += 1;
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.pos += 1;
            }
        }
        let text = std::str::from_utf8(&self.src[start..self.pos])
            .map_err(|_| self.error("invalid number", line))?;
        if is_float {
            let value: f64 = text
                .parse()
                .map_err(|_| self.error(format!("invalid float '{}'", text), line))?;
            Ok(self.token(TokenKind::Float(value), line))
        } else {
            let value: i64 = text
                .parse()
                .map_err(|_| self.error(format!("integer '{}' is out of range", text), line))?;
            Ok(self.token(TokenKind::Int(value), line))
        }
    }

    /// Double-quoted string: collect raw inner text, honoring escapes and
    /// balancing `#{...}` so interpolations may contain string literals.
    fn lex_string(&mut self, line: usize) -> Result<Token> {
        self.bump(); // opening quote
        let start = self.pos;
        let mut interp_depth = 0u32;
        loop {
            match self.peek() {
                None | Some(b'\n') => {
                    return Err(self.error("unterminated string literal", line));
                }
                Some(b'\\') => {
                    self.pos += 2;
                }
                Some(b'#') if self.peek2() == Some(b'{') => {
                    self.pos += 2;
                    interp_depth += 1;
                }
                Some(b'{') if interp_depth > 0 => {
                    self.pos += 1;
                    interp_depth += 1;
                }
                Some(b'}') if interp_depth > 0 => {
                    self.pos += 1;
                    interp_depth -= 1;
                }
                Some(b'"') if interp_depth == 0 => {
                    let inner =
                        String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
                    self.bump();
                    return Ok(self.token(TokenKind::Str(inner), line));
                }
                Some(_) => {
                    self.pos += 1;
                }
            }
        }
    }

    fn lex_raw_string(&mut self, line: usize) -> Result<Token> {
        self.bump();
        let start = self.pos;
        loop {
            match self.peek() {
                None | Some(b'\n') => {
                    return Err(self.error("unterminated string literal", line));
                }
                Some(b'\\') => {
                    self.pos += 2;
                }
                Some(b'\'') => {
                    let inner =
                        String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
                    self.bump();
                    return Ok(self.token(TokenKind::RawStr(inner), line));
                }
                Some(_) => {
                    self.pos += 1;
                }
            }
        }
    }

    fn error(&self, message: impl Into<String>, line: usize) -> RugoError {
        RugoError::at(message, self.path, line as u32 + 1)
    }
}
