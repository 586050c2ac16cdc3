//! Early hygiene passes: comment stripping and surface-form rejection.
//!
//! Four passes live here, in pipeline order:
//!
//! 2. **Comment strip** — removes `#` to end of line outside strings and
//!    backticks. A line that ends with a quote still open is an
//!    unterminated literal and aborts the build.
//! 3. **User-semicolon rejection** — `;` is reserved as the preprocessor's
//!    own statement separator (inserted much later, by the disambiguator).
//! 4. **Trailing-comma rejection** — a comma directly before `]` or `}`,
//!    same line or across a line break.
//! 5. **Hash colon-shorthand** — `{ident: expr}` becomes `{"ident" => expr}`.
//!    Lines starting with `sandbox` are skipped (the colon belongs to the
//!    sandbox directive). Integer keys with `:` are rejected with a
//!    suggestion to use `=>`.

use crate::scan::{blank_strings, string_mask, QuoteKind, StrState};
use crate::Line;
use rugo_base::{Result, RugoError};

/// Pass 2: strip `#` comments; detect unterminated literals.
pub fn strip_comments(lines: Vec<Line>, path: &str) -> Result<Vec<Line>> {
    let mut out = Vec::with_capacity(lines.len());
    for line in lines {
        let mut state = StrState::new();
        let mut cut = None;
        for (i, c) in line.text.char_indices() {
            if c == '#' && !state.in_string() {
                cut = Some(i);
                break;
            }
            state.step(c);
        }
        if cut.is_none() {
            if let Some(kind) = state.open_kind() {
                let what = match kind {
                    QuoteKind::Backtick => "unterminated backtick",
                    _ => "unterminated string literal",
                };
                return Err(RugoError::at(what, path, line.orig));
            }
        }
        let text = match cut {
            Some(i) => line.text[..i].trim_end().to_string(),
            None => line.text.trim_end().to_string(),
        };
        out.push(Line {
            text,
            orig: line.orig,
        });
    }
    Ok(out)
}

/// Pass 3: any user-written `;` outside strings is fatal.
pub fn reject_user_semicolons(lines: &[Line], path: &str) -> Result<()> {
    for line in lines {
        if blank_strings(&line.text).contains(';') {
            return Err(RugoError::at(
                "semicolons are reserved for the preprocessor; write one statement per line",
                path,
                line.orig,
            ));
        }
    }
    Ok(())
}

/// Pass 4: reject `,` immediately before `]` or `}`.
pub fn reject_trailing_commas(lines: &[Line], path: &str) -> Result<()> {
    let mut pending_comma: Option<u32> = None;
    for line in lines {
        let blanked = blank_strings(&line.text);
        let trimmed = blanked.trim();

        if let Some(orig) = pending_comma {
            if trimmed.starts_with(']') || trimmed.starts_with('}') {
                return Err(trailing_comma_error(path, orig));
            }
            if !trimmed.is_empty() {
                pending_comma = None;
            }
        }

        let bytes = blanked.as_bytes();
        for (i, &b) in bytes.iter().enumerate() {
            if b != b',' {
                continue;
            }
            let rest = blanked[i + 1..].trim_start();
            if rest.starts_with(']') || rest.starts_with('}') {
                return Err(trailing_comma_error(path, line.orig));
            }
        }
        if trimmed.ends_with(',') {
            pending_comma = Some(line.orig);
        }
    }
    Ok(())
}

fn trailing_comma_error(path: &str, line: u32) -> RugoError {
    RugoError::at("trailing comma before closing bracket", path, line)
}

/// Pass 5: `{ident: expr}` → `{"ident" => expr}`.
///
/// The rewrite only fires inside braces (tracked across lines for
/// multi-line hashes), and only when the key sits after `{` or `,`, so
/// slice syntax `a[1:2]` and the sandbox directive are never touched.
/// Applying the pass twice yields the same text: the rewritten key is
/// inside a string literal the second time around.
pub fn colon_shorthand(lines: Vec<Line>, path: &str) -> Result<Vec<Line>> {
    let mut out = Vec::with_capacity(lines.len());
    let mut brace_depth = 0i32;
    for line in lines {
        if line.text.trim_start().starts_with("sandbox") {
            out.push(line);
            continue;
        }
        let (text, depth) = rewrite_colon_keys(&line.text, brace_depth, path, line.orig)?;
        brace_depth = depth;
        out.push(Line {
            text,
            orig: line.orig,
        });
    }
    Ok(out)
}

fn rewrite_colon_keys(
    line: &str,
    mut brace_depth: i32,
    path: &str,
    orig: u32,
) -> Result<(String, i32)> {
    let mask = string_mask(line);
    let bytes = line.as_bytes();
    let mut output = String::with_capacity(line.len() + 8);
    // Last meaningful unmasked byte copied so far: a key is only rewritten
    // directly after `{` or `,`. A continuation line inside an open hash
    // starts as if a comma preceded it, so keys on their own line rewrite.
    let mut last_sig: Option<u8> = if brace_depth > 0 { Some(b',') } else { None };
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if mask[i] || !b.is_ascii() {
            let c = line[i..].chars().next().unwrap_or(' ');
            output.push(c);
            i += c.len_utf8();
            continue;
        }
        match b {
            b'{' => brace_depth += 1,
            b'}' => brace_depth -= 1,
            _ => {}
        }
        let key_position = brace_depth > 0
            && (last_sig == Some(b'{') || last_sig == Some(b','))
            && (b.is_ascii_alphabetic() || b == b'_' || b.is_ascii_digit());
        if key_position {
            let start = i;
            let mut j = i;
            while j < bytes.len() && crate::scan::is_ident_byte(bytes[j]) {
                j += 1;
            }
            let token = &line[start..j];
            let after = line[j..].trim_start();
            if after.starts_with(':') && !after.starts_with("::") {
                if token.bytes().all(|c| c.is_ascii_digit()) {
                    return Err(RugoError::at(
                        format!("integer hash keys need '=>' ({} => value)", token),
                        path,
                        orig,
                    ));
                }
                if token.bytes().next().is_some_and(|c| !c.is_ascii_digit()) {
                    let colon = j + (line[j..].len() - line[j..].trim_start().len());
                    output.push('"');
                    output.push_str(token);
                    output.push_str("\" =>");
                    i = colon + 1;
                    last_sig = Some(b'>');
                    continue;
                }
            }
            output.push_str(token);
            if !token.is_empty() {
                last_sig = Some(bytes[j - 1]);
            }
            i = j;
            continue;
        }
        if !b.is_ascii_whitespace() {
            last_sig = Some(b);
        }
        output.push(b as char);
        i += 1;
    }
    Ok((output, brace_depth))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(src: &str) -> Vec<Line> {
        src.lines()
            .enumerate()
            .map(|(i, l)| Line {
                text: l.to_string(),
                orig: i as u32 + 1,
            })
            .collect()
    }

    fn texts(lines: &[Line]) -> Vec<&str> {
        lines.iter().map(|l| l.text.as_str()).collect()
    }

    #[test]
    fn strips_comments_outside_strings() {
        let out = strip_comments(lines("x = 1 # one\ny = \"a # b\" # real\n"), "t").unwrap();
        assert_eq!(texts(&out), vec!["x = 1", "y = \"a # b\""]);
    }

    #[test]
    fn unterminated_string_is_fatal() {
        let err = strip_comments(lines("x = \"oops\n"), "t.rugo").unwrap_err();
        assert!(err.to_string().contains("unterminated string literal"));
        let err = strip_comments(lines("x = `oops\n"), "t.rugo").unwrap_err();
        assert!(err.to_string().contains("unterminated backtick"));
    }

    #[test]
    fn user_semicolon_rejected() {
        let err = reject_user_semicolons(&lines("a = 1; b = 2"), "t.rugo").unwrap_err();
        assert!(err.to_string().contains("reserved"));
        assert!(reject_user_semicolons(&lines("a = \"x;y\""), "t.rugo").is_ok());
    }

    #[test]
    fn trailing_comma_same_line() {
        assert!(reject_trailing_commas(&lines("x = [1, 2,]"), "t").is_err());
        assert!(reject_trailing_commas(&lines("h = {\"a\" => 1,}"), "t").is_err());
        assert!(reject_trailing_commas(&lines("x = [1, 2]"), "t").is_ok());
    }

    #[test]
    fn trailing_comma_across_lines() {
        assert!(reject_trailing_commas(&lines("x = [\n  1,\n  2,\n]"), "t").is_err());
        assert!(reject_trailing_commas(&lines("x = [\n  1,\n  2\n]"), "t").is_ok());
    }

    #[test]
    fn colon_shorthand_rewrites_ident_keys() {
        let out = colon_shorthand(lines("h = {name: \"Rex\", age: 3}"), "t").unwrap();
        assert_eq!(out[0].text, "h = {\"name\" => \"Rex\", \"age\" => 3}");
    }

    #[test]
    fn colon_shorthand_is_idempotent() {
        let once = colon_shorthand(lines("h = {a: 1}"), "t").unwrap();
        let twice = colon_shorthand(once.clone(), "t").unwrap();
        assert_eq!(texts(&once), texts(&twice));
    }

    #[test]
    fn slice_colon_untouched() {
        let out = colon_shorthand(lines("x = a[1:2]"), "t").unwrap();
        assert_eq!(out[0].text, "x = a[1:2]");
    }

    #[test]
    fn sandbox_lines_skipped() {
        let out = colon_shorthand(lines("sandbox net: off"), "t").unwrap();
        assert_eq!(out[0].text, "sandbox net: off");
    }

    #[test]
    fn integer_key_with_colon_rejected() {
        let err = colon_shorthand(lines("h = {1: \"one\"}"), "t.rugo").unwrap_err();
        assert!(err.to_string().contains("=>"));
        assert_eq!(err.line, 1);
    }

    #[test]
    fn multiline_hash_keys_rewritten() {
        let out = colon_shorthand(lines("h = {\n  name: 1\n}"), "t").unwrap();
        assert_eq!(out[1].text, "  \"name\" => 1");
    }
}
