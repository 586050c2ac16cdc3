//! Single-line sugar rewrites.
//!
//! These passes each look at one line at a time (plus a running bracket
//! depth for the separator pass) and rewrite surface conveniences into
//! canonical form:
//!
//! 6.  compound assignment `t OP= e` → `t = t OP e`
//! 7.  destructuring `a, b = e` → hidden temporary + index reads
//! 8.  `def name` → `def name()`
//! 9.  postfix `stmt if cond` → block form
//! 10. backtick command capture
//! 17. bare `append(x, v)` statement → `x = append(x, v)`
//! 18. semicolon separators for LL(1) disambiguation
//!
//! Every pass that splits one line into several stamps each output line
//! with the input line's origin, which is all the line-map discipline
//! requires.

use crate::scan::{
    blank_strings, depth_delta, find_last_top_level_word, first_word, indent_of, is_ident_byte,
    split_top_level, string_mask,
};
use crate::Line;
use rugo_base::names::is_identifier;
use rugo_base::{Result, RugoError};

/// Position of the first top-level `=` that is an assignment, along with
/// the compound operator directly before it, if any.
///
/// Returns `None` for lines whose first `=` belongs to `==`, `!=`, `<=`,
/// `>=` or `=>`.
pub fn assignment_eq(line: &str) -> Option<(usize, Option<char>)> {
    let blanked = blank_strings(line);
    let bytes = blanked.as_bytes();
    let mut depth = 0i32;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b'=' if depth == 0 => {
                if bytes.get(i + 1) == Some(&b'=') || bytes.get(i + 1) == Some(&b'>') {
                    return None;
                }
                let prev = if i > 0 { Some(bytes[i - 1]) } else { None };
                return match prev {
                    Some(b'=') | Some(b'!') | Some(b'<') | Some(b'>') => None,
                    Some(op @ (b'+' | b'-' | b'*' | b'/' | b'%')) => Some((i, Some(op as char))),
                    _ => Some((i, None)),
                };
            }
            _ => {}
        }
    }
    None
}

/// Pass 6: compound assignment.
pub fn expand_compound_assign(lines: Vec<Line>) -> Vec<Line> {
    lines
        .into_iter()
        .map(|line| {
            let Some((eq, Some(op))) = assignment_eq(&line.text) else {
                return line;
            };
            let target = line.text[..eq - 1].trim();
            let rhs = line.text[eq + 1..].trim();
            if !is_lvalue(target) || rhs.is_empty() {
                return line;
            }
            Line {
                text: format!(
                    "{}{} = {} {} {}",
                    indent_of(&line.text),
                    target,
                    target,
                    op,
                    rhs
                ),
                orig: line.orig,
            }
        })
        .collect()
}

/// An identifier, optionally followed by one or more `[...]` index chains.
fn is_lvalue(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() && is_ident_byte(bytes[i]) {
        i += 1;
    }
    if i == 0 || bytes[0].is_ascii_digit() {
        return false;
    }
    let mut depth = 0i32;
    for &b in &bytes[i..] {
        match b {
            b'[' => depth += 1,
            b']' => depth -= 1,
            _ if depth == 0 => return false,
            _ => {}
        }
    }
    depth == 0 && (i == bytes.len() || bytes[i] == b'[')
}

/// Pass 7: destructuring assignment.
pub fn expand_destructuring(lines: Vec<Line>, counter: &mut u32) -> Vec<Line> {
    let mut out = Vec::with_capacity(lines.len());
    for line in lines {
        let Some((eq, None)) = assignment_eq(&line.text) else {
            out.push(line);
            continue;
        };
        let lhs = &line.text[..eq];
        let targets: Vec<&str> = split_top_level(lhs, ',')
            .iter()
            .map(|&(s, e)| lhs[s..e].trim())
            .collect();
        if targets.len() < 2 || !targets.iter().all(|t| is_identifier(t)) {
            out.push(line);
            continue;
        }
        let indent = indent_of(&line.text).to_string();
        let rhs = line.text[eq + 1..].trim();
        let tmp = format!("__destr{}", *counter);
        *counter += 1;
        out.push(Line {
            text: format!("{}{} = {}", indent, tmp, rhs),
            orig: line.orig,
        });
        for (i, target) in targets.iter().enumerate() {
            out.push(Line {
                text: format!("{}{} = {}[{}]", indent, target, tmp, i),
                orig: line.orig,
            });
        }
    }
    out
}

/// Pass 8: `def name` → `def name()`; `def Type.method` → `def Type.method()`.
pub fn normalize_def_parens(lines: Vec<Line>, path: &str) -> Result<Vec<Line>> {
    let mut out = Vec::with_capacity(lines.len());
    for line in lines {
        let trimmed = line.text.trim_start();
        if first_word(trimmed) != Some("def") {
            out.push(line);
            continue;
        }
        let rest = trimmed[3..].trim_start();
        if rest.is_empty() {
            return Err(RugoError::at("def without a name", path, line.orig));
        }
        if rest.contains('(') {
            out.push(line);
            continue;
        }
        let name = rest.trim_end();
        let valid = name
            .split('.')
            .all(|part| is_identifier(part))
            && name.split('.').count() <= 2;
        if !valid {
            return Err(RugoError::at(
                format!("invalid function name '{}'", name),
                path,
                line.orig,
            ));
        }
        out.push(Line {
            text: format!("{}def {}()", indent_of(&line.text), name),
            orig: line.orig,
        });
    }
    Ok(out)
}

/// First words that postfix-`if` must not rewrite after.
const POSTFIX_IF_BLOCKED: &[&str] = &[
    "if", "elsif", "else", "end", "while", "for", "def", "try", "spawn", "parallel", "rats",
    "bench", "struct", "do", "or", "use", "import", "require", "sandbox",
];

/// Pass 9: postfix `if`.
pub fn expand_postfix_if(lines: Vec<Line>) -> Vec<Line> {
    let mut out = Vec::with_capacity(lines.len());
    for line in lines {
        if let Some(word) = first_word(&line.text) {
            if POSTFIX_IF_BLOCKED.contains(&word) {
                out.push(line);
                continue;
            }
        }
        let Some(pos) = find_last_top_level_word(&line.text, "if") else {
            out.push(line);
            continue;
        };
        let stmt = line.text[..pos].trim_end();
        let cond = line.text[pos + 2..].trim();
        if stmt.is_empty() || cond.is_empty() {
            out.push(line);
            continue;
        }
        let indent = indent_of(&line.text).to_string();
        let stmt = stmt.trim_start().to_string();
        out.push(Line {
            text: format!("{}if {}", indent, cond),
            orig: line.orig,
        });
        out.push(Line {
            text: format!("{}  {}", indent, stmt),
            orig: line.orig,
        });
        out.push(Line {
            text: format!("{}end", indent),
            orig: line.orig,
        });
    }
    out
}

/// Pass 10: backtick command capture.
///
/// `` `cmd` `` becomes `__shell_capture("cmd")`. Double quotes and
/// backslashes in the command are escaped; `#{...}` interpolations are
/// copied verbatim so they survive into the string literal.
pub fn expand_backticks(lines: Vec<Line>) -> Vec<Line> {
    lines
        .into_iter()
        .map(|line| {
            let mut text = line.text;
            while let Some(rewritten) = rewrite_first_backtick(&text) {
                text = rewritten;
            }
            Line {
                text,
                orig: line.orig,
            }
        })
        .collect()
}

fn rewrite_first_backtick(line: &str) -> Option<String> {
    let mask = string_mask(line);
    let open = line
        .char_indices()
        .find(|&(i, c)| c == '`' && is_opening_backtick(line, i, &mask))?
        .0;
    // The mask marks the whole literal including both backticks. Honor
    // escapes when looking for the closer.
    let mut close = None;
    let mut escaped = false;
    for (i, c) in line[open + 1..].char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '`' {
            close = Some(open + 1 + i);
            break;
        }
    }
    let close = close?;
    let cmd = &line[open + 1..close];
    let mut escaped = String::with_capacity(cmd.len() + 8);
    push_escaped_command(&mut escaped, cmd);
    Some(format!(
        "{}{}(\"{}\"){}",
        &line[..open],
        crate::keywords::INTERNAL_SHELL_CAPTURE,
        escaped,
        &line[close + 1..]
    ))
}

/// A backtick opens a capture only when it is not inside a single- or
/// double-quoted literal.
fn is_opening_backtick(line: &str, pos: usize, mask: &[bool]) -> bool {
    if !mask[pos] {
        return false; // stray closing tick; scanner said we're outside
    }
    // The scanner masks backtick literals too; the first masked backtick
    // whose preceding text is balanced w.r.t. quotes is an opener.
    let mut state = crate::scan::StrState::new();
    for c in line[..pos].chars() {
        state.step(c);
    }
    !state.in_string()
}

pub(crate) fn push_escaped_command(out: &mut String, cmd: &str) {
    let mut chars = cmd.chars().peekable();
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

/// Pass 17: a line-leading `append(x, v)` call becomes `x = append(x, v)`.
pub fn rewrite_bare_append(lines: Vec<Line>) -> Vec<Line> {
    lines
        .into_iter()
        .map(|line| {
            let trimmed = line.text.trim_start();
            let Some(args) = trimmed
                .strip_prefix("append(")
                .and_then(|r| r.strip_suffix(')'))
            else {
                return line;
            };
            let segs = split_top_level(args, ',');
            let first = args[segs[0].0..segs[0].1].trim();
            if segs.len() < 2 || !is_identifier(first) {
                return line;
            }
            Line {
                text: format!("{}{} = {}", indent_of(&line.text), first, trimmed),
                orig: line.orig,
            }
        })
        .collect()
}

/// Pass 18: separator insertion.
///
/// Inserts the preprocessor's own `;` where the LL(1) grammar would
/// otherwise glue two statements together: after `sandbox` directives,
/// before a line starting with `[` (unless it continues a multi-line
/// array), and before a line starting with a negative number literal.
pub fn insert_separators(lines: Vec<Line>) -> Vec<Line> {
    let mut out = Vec::with_capacity(lines.len());
    let mut depth = 0i32;
    for line in lines {
        let trimmed = line.text.trim_start();
        let text = if trimmed.starts_with("sandbox") {
            format!("{};", line.text)
        } else if depth == 0 && trimmed.starts_with('[') {
            format!("{};{}", indent_of(&line.text), trimmed)
        } else if depth == 0
            && trimmed.starts_with('-')
            && trimmed[1..].starts_with(|c: char| c.is_ascii_digit())
        {
            format!("{};{}", indent_of(&line.text), trimmed)
        } else {
            line.text.clone()
        };
        depth += depth_delta(&line.text);
        out.push(Line {
            text,
            orig: line.orig,
        });
    }
    out
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

    fn texts(lines: &[Line]) -> Vec<String> {
        lines.iter().map(|l| l.text.clone()).collect()
    }

    #[test]
    fn compound_assign_expands() {
        let out = expand_compound_assign(lines("x += 1\ncounts[k] *= 2"));
        assert_eq!(out[0].text, "x = x + 1");
        assert_eq!(out[1].text, "counts[k] = counts[k] * 2");
    }

    #[test]
    fn comparison_not_compound() {
        let out = expand_compound_assign(lines("x == 1\ny <= 2"));
        assert_eq!(out[0].text, "x == 1");
        assert_eq!(out[1].text, "y <= 2");
    }

    #[test]
    fn destructuring_expands_with_temp() {
        let mut n = 0;
        let out = expand_destructuring(lines("a, b, found = parts"), &mut n);
        assert_eq!(
            texts(&out),
            vec![
                "__destr0 = parts",
                "a = __destr0[0]",
                "b = __destr0[1]",
                "found = __destr0[2]",
            ]
        );
        assert!(out.iter().all(|l| l.orig == 1));
    }

    #[test]
    fn call_on_lhs_is_not_destructuring() {
        let mut n = 0;
        let out = expand_destructuring(lines("f(a), b = x"), &mut n);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn hash_rocket_is_not_assignment() {
        assert_eq!(assignment_eq("h = {\"a\" => 1}"), Some((2, None)));
        assert_eq!(assignment_eq("\"a\" => 1"), None);
    }

    #[test]
    fn def_gets_parens() {
        let out = normalize_def_parens(lines("def greet\ndef Dog.bark\ndef f(x)"), "t").unwrap();
        assert_eq!(
            texts(&out),
            vec!["def greet()", "def Dog.bark()", "def f(x)"]
        );
    }

    #[test]
    fn def_without_name_is_fatal() {
        let err = normalize_def_parens(lines("def"), "t.rugo").unwrap_err();
        assert!(err.to_string().contains("def without a name"));
    }

    #[test]
    fn postfix_if_becomes_block() {
        let out = expand_postfix_if(lines("return x if x > 0"));
        assert_eq!(texts(&out), vec!["if x > 0", "  return x", "end"]);
        assert!(out.iter().all(|l| l.orig == 1));
    }

    #[test]
    fn leading_if_is_untouched() {
        let out = expand_postfix_if(lines("if x > 0"));
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn if_inside_string_or_brackets_untouched() {
        let out = expand_postfix_if(lines("puts \"if only\""));
        assert_eq!(out.len(), 1);
        let out = expand_postfix_if(lines("x = [a if b]"));
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn backticks_become_capture_calls() {
        let out = expand_backticks(lines("files = `ls -la`"));
        assert_eq!(out[0].text, "files = __shell_capture(\"ls -la\")");
    }

    #[test]
    fn backtick_interpolation_survives() {
        let out = expand_backticks(lines("out = `echo #{name}`"));
        assert_eq!(out[0].text, "out = __shell_capture(\"echo #{name}\")");
    }

    #[test]
    fn backtick_quotes_escaped() {
        let out = expand_backticks(lines("out = `grep \"x\" f`"));
        assert_eq!(out[0].text, "out = __shell_capture(\"grep \\\"x\\\" f\")");
    }

    #[test]
    fn bare_append_reassigns() {
        let out = rewrite_bare_append(lines("append(xs, 1)"));
        assert_eq!(out[0].text, "xs = append(xs, 1)");
        let out = rewrite_bare_append(lines("ys = append(xs, 1)"));
        assert_eq!(out[0].text, "ys = append(xs, 1)");
    }

    #[test]
    fn separator_before_bracket_line() {
        let out = insert_separators(lines("x = f\n[1, 2].each(g)"));
        assert_eq!(out[1].text, ";[1, 2].each(g)");
    }

    #[test]
    fn no_separator_inside_multiline_array() {
        let out = insert_separators(lines("x = [\n[1],\n[2]]"));
        assert_eq!(out[1].text, "[1],");
    }

    #[test]
    fn separator_for_negative_literal_and_sandbox() {
        let out = insert_separators(lines("sandbox net off\n-5"));
        assert_eq!(out[0].text, "sandbox net off;");
        assert_eq!(out[1].text, ";-5");
    }
}
