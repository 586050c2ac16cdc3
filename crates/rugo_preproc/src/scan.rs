//! String-aware scanning shared by every preprocessor pass.
//!
//! All passes operate on whole lines of text, and none of them may touch
//! content inside a string literal. [`StrState`] is the single tracker for
//! "am I inside a double-quoted, single-quoted, or backtick literal" with
//! escape handling; the helpers below build per-byte masks, locate
//! characters, and split lines at top level (outside strings *and* outside
//! bracket nesting) on top of it.
//!
//! Strings never span lines in canonical Rugo — heredocs are expanded into
//! single-line literals before any other pass runs — so every line is
//! scanned from a clean state. A line that ends while a quote is still open
//! is an unterminated literal, which [`StrState::open_kind`] reports.

/// Which literal the scanner is currently inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteKind {
    Double,
    Single,
    Backtick,
}

/// Incremental literal tracker with escape handling.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrState {
    inside: Option<QuoteKind>,
    escaped: bool,
}

impl StrState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one character, updating the state.
    pub fn step(&mut self, c: char) {
        if self.escaped {
            self.escaped = false;
            return;
        }
        match (self.inside, c) {
            (Some(_), '\\') => self.escaped = true,
            (Some(QuoteKind::Double), '"') => self.inside = None,
            (Some(QuoteKind::Single), '\'') => self.inside = None,
            (Some(QuoteKind::Backtick), '`') => self.inside = None,
            (Some(_), _) => {}
            (None, '"') => self.inside = Some(QuoteKind::Double),
            (None, '\'') => self.inside = Some(QuoteKind::Single),
            (None, '`') => self.inside = Some(QuoteKind::Backtick),
            (None, _) => {}
        }
    }

    /// Returns `true` while inside any literal.
    pub fn in_string(&self) -> bool {
        self.inside.is_some()
    }

    /// The literal kind still open, if any.
    pub fn open_kind(&self) -> Option<QuoteKind> {
        self.inside
    }
}

/// Per-byte mask: `true` where the byte is inside a string literal.
///
/// The opening and closing quotes themselves are masked too, so replacing
/// unmasked regions can never clip a literal.
pub fn string_mask(line: &str) -> Vec<bool> {
    let mut mask = vec![false; line.len()];
    let mut state = StrState::new();
    for (i, c) in line.char_indices() {
        let was_inside = state.in_string();
        state.step(c);
        let inside = was_inside || state.in_string();
        for b in i..i + c.len_utf8() {
            mask[b] = inside;
        }
    }
    mask
}

/// Returns the line with every string-literal byte replaced by a space.
///
/// Byte positions are preserved — a masked multibyte character becomes as
/// many spaces as it had bytes — so indices found in the blanked copy are
/// valid in the original.
pub fn blank_strings(line: &str) -> String {
    let mask = string_mask(line);
    let mut out = String::with_capacity(line.len());
    for (i, c) in line.char_indices() {
        if mask[i] {
            for _ in 0..c.len_utf8() {
                out.push(' ');
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Finds the first occurrence of `needle` outside string literals.
pub fn find_outside_strings(line: &str, needle: char) -> Option<usize> {
    let mask = string_mask(line);
    line.char_indices()
        .find(|&(i, c)| c == needle && !mask[i])
        .map(|(i, _)| i)
}

/// Net bracket-depth change of a line, counting only outside strings.
///
/// Used to detect multi-line array/hash literals: while the running depth
/// is positive, a following line is a continuation, not a new statement.
pub fn depth_delta(line: &str) -> i32 {
    let blanked = blank_strings(line);
    let mut delta = 0;
    for c in blanked.chars() {
        match c {
            '(' | '[' | '{' => delta += 1,
            ')' | ']' | '}' => delta -= 1,
            _ => {}
        }
    }
    delta
}

/// Splits a line at every position where `sep` occurs at top level:
/// outside strings and outside any `()`, `[]`, `{}` nesting.
///
/// Returns byte ranges of the segments (separators excluded). A single
/// segment spanning the whole line means "no top-level separator".
pub fn split_top_level(line: &str, sep: char) -> Vec<(usize, usize)> {
    let blanked = blank_strings(line);
    let mut depth = 0i32;
    let mut segs = Vec::new();
    let mut start = 0usize;
    for (i, c) in blanked.char_indices() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            c if c == sep && depth == 0 => {
                segs.push((start, i));
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    segs.push((start, line.len()));
    segs
}

/// Finds the position of the first top-level occurrence of `needle`.
pub fn find_top_level(line: &str, needle: char) -> Option<usize> {
    let segs = split_top_level(line, needle);
    if segs.len() > 1 {
        Some(segs[0].1)
    } else {
        None
    }
}

/// Finds a whole word (identifier-boundary delimited) outside strings,
/// returning its byte offset.
pub fn find_word(line: &str, word: &str) -> Option<usize> {
    let blanked = blank_strings(line);
    let bytes = blanked.as_bytes();
    let mut from = 0;
    while let Some(rel) = blanked[from..].find(word) {
        let pos = from + rel;
        let before_ok = pos == 0 || !is_ident_byte(bytes[pos - 1]);
        let after = pos + word.len();
        let after_ok = after >= bytes.len() || !is_ident_byte(bytes[after]);
        if before_ok && after_ok {
            return Some(pos);
        }
        from = pos + word.len();
    }
    None
}

/// Counts whole-word occurrences outside strings.
pub fn count_word(line: &str, word: &str) -> usize {
    let mut count = 0;
    let mut rest = line;
    let mut offset = 0;
    while let Some(pos) = find_word(rest, word) {
        count += 1;
        offset += pos + word.len();
        rest = &line[offset..];
    }
    count
}

/// Returns the last top-level whole-word occurrence of `word`:
/// outside strings and outside any bracket nesting.
pub fn find_last_top_level_word(line: &str, word: &str) -> Option<usize> {
    let blanked = blank_strings(line);
    let bytes = blanked.as_bytes();
    let mut depth = 0i32;
    let mut found = None;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            _ => {}
        }
        if depth == 0 && blanked[i..].starts_with(word) {
            let before_ok = i == 0 || !is_ident_byte(bytes[i - 1]);
            let after = i + word.len();
            let after_ok = after >= bytes.len() || !is_ident_byte(bytes[after]);
            if before_ok && after_ok {
                found = Some(i);
            }
        }
        i += 1;
    }
    found
}

/// Returns `true` for bytes that can appear in an identifier.
pub fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Extracts the first identifier-shaped token of a trimmed line, if any.
pub fn first_word(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    let end = trimmed
        .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .unwrap_or(trimmed.len());
    if end == 0 {
        None
    } else {
        Some(&trimmed[..end])
    }
}

/// Leading whitespace of a line.
pub fn indent_of(line: &str) -> &str {
    let end = line
        .find(|c: char| !c.is_whitespace())
        .unwrap_or(line.len());
    &line[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_covers_literals_and_quotes() {
        let mask = string_mask(r#"x = "a#b" # tail"#);
        assert!(!mask[0]);
        assert!(mask[4]); // opening quote
        assert!(mask[6]); // the # inside the string
        assert!(mask[8]); // closing quote
        assert!(!mask[10]); // the real comment #
    }

    #[test]
    fn escapes_do_not_close_literals() {
        let mut state = StrState::new();
        for c in r#""a\"b"#.chars() {
            state.step(c);
        }
        assert!(state.in_string());
        state.step('"');
        assert!(!state.in_string());
    }

    #[test]
    fn split_ignores_nested_and_quoted_separators() {
        let line = r#"f(a, b), "x, y", c"#;
        let segs = split_top_level(line, ',');
        let parts: Vec<&str> = segs.iter().map(|&(s, e)| line[s..e].trim()).collect();
        assert_eq!(parts, vec!["f(a, b)", r#""x, y""#, "c"]);
    }

    #[test]
    fn find_word_respects_boundaries() {
        assert_eq!(find_word("bend end", "end"), Some(5));
        assert_eq!(find_word("ending", "end"), None);
        assert_eq!(find_word(r#""end""#, "end"), None);
    }

    #[test]
    fn last_top_level_word_skips_brackets() {
        let line = "puts x if cond";
        assert_eq!(find_last_top_level_word(line, "if"), Some(7));
        let bracketed = "puts [1, 2][x if y]";
        assert_eq!(find_last_top_level_word(bracketed, "if"), None);
    }

    #[test]
    fn depth_delta_tracks_open_brackets() {
        assert_eq!(depth_delta("xs = ["), 1);
        assert_eq!(depth_delta("]"), -1);
        assert_eq!(depth_delta(r#"x = "[[""#), 0);
    }

    #[test]
    fn first_word_and_indent() {
        assert_eq!(first_word("  puts x"), Some("puts"));
        assert_eq!(first_word("  [1]"), None);
        assert_eq!(indent_of("    x"), "    ");
    }
}
