//! Tokens for canonical rugo text.
//!
//! The lexer runs on *preprocessed* source, so the token set is small: the
//! preprocessor has already rewritten heredocs, pipes, backticks and
//! paren-free calls away. Every token carries the 0-based line of the
//! canonical text it came from; the parser resolves that to an original
//! source line through the preprocessor's line map.

/// Kind and payload of one token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Integer literal.
    Int(i64),
    /// Float literal.
    Float(f64),
    /// Double-quoted string; raw inner text with escapes and `#{...}`
    /// interpolations still intact (the parser expands both).
    Str(String),
    /// Single-quoted string; raw inner text, `\'` and `\\` still intact.
    RawStr(String),
    /// Identifier or keyword (the parser distinguishes by spelling).
    Ident(String),

    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Dot,
    Colon,
    Semicolon,
    Newline,

    Plus,
    Minus,
    Star,
    Slash,
    Percent,

    Assign,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    AndAnd,
    OrOr,
    Bang,
    /// `=>` in hash literals.
    Arrow,

    Eof,
}

/// One token with its 0-based canonical line.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

impl Token {
    /// Returns `true` if this token is the identifier/keyword `word`.
    pub fn is_word(&self, word: &str) -> bool {
        matches!(&self.kind, TokenKind::Ident(s) if s == word)
    }

    /// A short human-readable description for error messages.
    pub fn describe(&self) -> String {
        match &self.kind {
            TokenKind::Int(n) => format!("number {}", n),
            TokenKind::Float(f) => format!("number {}", f),
            TokenKind::Str(_) | TokenKind::RawStr(_) => "string literal".to_string(),
            TokenKind::Ident(s) => format!("'{}'", s),
            TokenKind::Newline => "end of line".to_string(),
            TokenKind::Eof => "end of file".to_string(),
            other => format!("'{}'", punct_text(other)),
        }
    }
}

fn punct_text(kind: &TokenKind) -> &'static str {
    match kind {
        TokenKind::LParen => "(",
        TokenKind::RParen => ")",
        TokenKind::LBracket => "[",
        TokenKind::RBracket => "]",
        TokenKind::LBrace => "{",
        TokenKind::RBrace => "}",
        TokenKind::Comma => ",",
        TokenKind::Dot => ".",
        TokenKind::Colon => ":",
        TokenKind::Semicolon => ";",
        TokenKind::Plus => "+",
        TokenKind::Minus => "-",
        TokenKind::Star => "*",
        TokenKind::Slash => "/",
        TokenKind::Percent => "%",
        TokenKind::Assign => "=",
        TokenKind::EqEq => "==",
        TokenKind::NotEq => "!=",
        TokenKind::Lt => "<",
        TokenKind::LtEq => "<=",
        TokenKind::Gt => ">",
        TokenKind::GtEq => ">=",
        TokenKind::AndAnd => "&&",
        TokenKind::OrOr => "||",
        TokenKind::Bang => "!",
        TokenKind::Arrow => "=>",
        _ => "?",
    }
}
