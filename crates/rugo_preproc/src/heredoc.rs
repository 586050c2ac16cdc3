//! Heredoc expansion — the first pass, running on raw lines.
//!
//! Recognizes `<<DELIM`, `<<~DELIM`, `<<'DELIM'` and `<<~'DELIM'` appearing
//! after `=` or after `return`, collects body lines until a line whose
//! trimmed content equals the delimiter, and replaces the whole construct
//! with a single-line string literal:
//!
//! - the interpolating form becomes one double-quoted literal with embedded
//!   `\n` escapes (interpolation `#{...}` preserved verbatim);
//! - the raw (quoted-delimiter) form becomes a concatenation of
//!   single-quoted segments joined by `"\n"`, so nothing in the body is ever
//!   interpolated;
//! - the squiggly forms strip the common leading indentation first (blank
//!   lines ignored when computing the minimum, tabs counted as 4 columns).
//!
//! This pass must run before comment stripping: heredoc bodies may contain
//! `#`, and once they are ordinary string literals the stripper's string
//! mask protects them.

use crate::Line;
use rugo_base::{Result, RugoError};

struct HeredocHead {
    /// Byte offset of `<<` in the line.
    start: usize,
    delim: String,
    squiggly: bool,
    raw: bool,
}

pub fn expand_heredocs(lines: Vec<Line>, path: &str) -> Result<Vec<Line>> {
    let mut out = Vec::with_capacity(lines.len());
    let mut i = 0;
    while i < lines.len() {
        let line = &lines[i];
        let Some(head) = detect_head(&line.text) else {
            out.push(line.clone());
            i += 1;
            continue;
        };

        let mut body: Vec<String> = Vec::new();
        let mut close = None;
        for (j, candidate) in lines.iter().enumerate().skip(i + 1) {
            if candidate.text.trim() == head.delim {
                close = Some(j);
                break;
            }
            body.push(candidate.text.clone());
        }
        let Some(close) = close else {
            return Err(RugoError::at(
                format!("unterminated heredoc '{}'", head.delim),
                path,
                line.orig,
            ));
        };

        if head.squiggly {
            strip_common_indent(&mut body);
        }
        let literal = if head.raw {
            raw_literal(&body)
        } else {
            interpolating_literal(&body)
        };

        let prefix = &line.text[..head.start];
        out.push(Line {
            text: format!("{}{}", prefix, literal),
            orig: line.orig,
        });
        i = close + 1;
    }
    Ok(out)
}

/// Detects a heredoc opener on a line. Only positions after a top-level `=`
/// or after leading `return` count; `<<` anywhere else (shifts, shell
/// redirections in fallback lines) is left alone.
fn detect_head(line: &str) -> Option<HeredocHead> {
    let pos = find_heredoc_pos(line)?;
    let rest = &line[pos + 2..];
    let (squiggly, rest) = match rest.strip_prefix('~') {
        Some(r) => (true, r),
        None => (false, rest),
    };
    let (raw, rest) = match rest.strip_prefix('\'') {
        Some(r) => (true, r),
        None => (false, rest),
    };
    let end = rest
        .find(|c: char| !(c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_'))
        .unwrap_or(rest.len());
    if end == 0 || !rest.starts_with(|c: char| c.is_ascii_uppercase() || c == '_') {
        return None;
    }
    let delim = rest[..end].to_string();
    let tail = &rest[end..];
    let tail = if raw { tail.strip_prefix('\'')? } else { tail };
    if !tail.trim().is_empty() {
        return None;
    }
    Some(HeredocHead {
        start: pos,
        delim,
        squiggly,
        raw,
    })
}

fn find_heredoc_pos(line: &str) -> Option<usize> {
    let blanked = crate::scan::blank_strings(line);
    let pos = blanked.find("<<")?;
    let before = line[..pos].trim_end();
    let after_assign = before.ends_with('=')
        && !before.ends_with("==")
        && !before.ends_with("!=")
        && !before.ends_with("<=")
        && !before.ends_with(">=");
    let after_return = before.trim_start() == "return";
    if after_assign || after_return {
        Some(pos)
    } else {
        None
    }
}

/// Column width of a line's leading whitespace, tabs counted as 4.
fn indent_columns(line: &str) -> usize {
    let mut cols = 0;
    for c in line.chars() {
        match c {
            ' ' => cols += 1,
            '\t' => cols += 4,
            _ => break,
        }
    }
    cols
}

/// Removes the common leading indentation (in columns) from every line.
/// Blank lines are ignored when computing the minimum and become empty.
fn strip_common_indent(body: &mut [String]) {
    let min = body
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| indent_columns(l))
        .min()
        .unwrap_or(0);
    for line in body.iter_mut() {
        if line.trim().is_empty() {
            line.clear();
            continue;
        }
        let mut cols = 0;
        let mut cut = 0;
        for (i, c) in line.char_indices() {
            if cols >= min {
                cut = i;
                break;
            }
            match c {
                ' ' => cols += 1,
                '\t' => cols += 4,
                _ => {
                    cut = i;
                    break;
                }
            }
            cut = i + c.len_utf8();
        }
        *line = line[cut..].to_string();
    }
}

/// One double-quoted literal with `\n` between body lines. `#{...}`
/// interpolations are copied verbatim, everything else is escaped.
fn interpolating_literal(body: &[String]) -> String {
    let mut out = String::from("\"");
    for (i, line) in body.iter().enumerate() {
        if i > 0 {
            out.push_str("\\n");
        }
        push_escaped_dq(&mut out, line);
    }
    out.push('"');
    out
}

fn push_escaped_dq(out: &mut String, s: &str) {
    let mut chars = s.chars().peekable();
    let mut interp_depth = 0u32;
    while let Some(c) = chars.next() {
        if interp_depth > 0 {
            match c {
                '{' => interp_depth += 1,
                '}' => interp_depth -= 1,
                _ => {}
            }
            out.push(c);
            continue;
        }
        match c {
            '#' if chars.peek() == Some(&'{') => {
                interp_depth = 1;
                out.push('#');
                out.push(chars.next().unwrap_or('{'));
            }
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
}

/// Concatenation of single-quoted segments joined by `"\n"`.
fn raw_literal(body: &[String]) -> String {
    if body.is_empty() {
        return "''".to_string();
    }
    body.iter()
        .map(|line| {
            let escaped = line.replace('\\', "\\\\").replace('\'', "\\'");
            format!("'{}'", escaped)
        })
        .collect::<Vec<_>>()
        .join(" + \"\\n\" + ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(src: &str) -> Vec<String> {
        let lines: Vec<Line> = src
            .lines()
            .enumerate()
            .map(|(i, l)| Line {
                text: l.to_string(),
                orig: i as u32 + 1,
            })
            .collect();
        expand_heredocs(lines, "test.rugo")
            .unwrap()
            .into_iter()
            .map(|l| l.text)
            .collect()
    }

    #[test]
    fn plain_heredoc_becomes_one_literal() {
        let out = run("msg = <<EOS\nhello\nworld\nEOS\nputs msg");
        assert_eq!(out[0], "msg = \"hello\\nworld\"");
        assert_eq!(out[1], "puts msg");
    }

    #[test]
    fn squiggly_strips_common_indent() {
        let out = run("msg = <<~EOS\n    hello\n      deep\n    back\nEOS");
        assert_eq!(out[0], "msg = \"hello\\n  deep\\nback\"");
    }

    #[test]
    fn tabs_count_four_columns() {
        let out = run("msg = <<~EOS\n\thello\n        indented\nEOS");
        assert_eq!(out[0], "msg = \"hello\\n    indented\"");
    }

    #[test]
    fn raw_heredoc_never_interpolates() {
        let out = run("msg = <<'EOS'\na #{x}\nb\nEOS");
        assert_eq!(out[0], "msg = 'a #{x}' + \"\\n\" + 'b'");
    }

    #[test]
    fn interpolation_preserved_unescaped() {
        let out = run("msg = <<EOS\nhi #{name(\"x\")}!\nEOS");
        assert_eq!(out[0], "msg = \"hi #{name(\"x\")}!\"");
    }

    #[test]
    fn after_return_counts() {
        let out = run("def f()\nreturn <<EOS\nbody\nEOS\nend");
        assert_eq!(out[1], "return \"body\"");
    }

    #[test]
    fn missing_closer_is_fatal() {
        let lines = vec![Line {
            text: "x = <<EOS".to_string(),
            orig: 1,
        }];
        let err = expand_heredocs(lines, "t.rugo").unwrap_err();
        assert!(err.to_string().contains("unterminated heredoc 'EOS'"));
        assert_eq!(err.line, 1);
    }

    #[test]
    fn shell_redirect_is_not_a_heredoc() {
        let out = run("cat <<difficult");
        assert_eq!(out[0], "cat <<difficult");
    }
}
