//! Block-structure rewrites: `try`/`spawn` sugar, `do`/`end` lowering,
//! and inline-`fn` expansion.
//!
//! These passes need to match `end` keywords across lines, so they share
//! one accounting function, [`net_opens`], that knows every construct that
//! opens a block: line-leading block keywords (optionally behind an
//! `x = ` prefix), a trailing `do`, and mid-line `fn(`.
//!
//! The try and spawn one-liners are expanded before `do`/`end` matching
//! runs; once they are in canonical block form, `try`, `spawn` and
//! `parallel` only ever appear as bare block heads and the accounting is
//! exact. The observable rewrite is the one the pass list describes — the
//! expression after `try` always lands on its own line so shell fallback
//! can still apply to bare identifiers.

use crate::keywords::{is_builtin, TRY_BLOCK_KEYWORDS};
use crate::scan::{blank_strings, count_word, first_word, indent_of, is_ident_byte};
use crate::sugar::assignment_eq;
use crate::Line;
use rugo_base::names::is_identifier;
use rugo_base::{Result, RugoError};

/// Splits a line into an assignment prefix (`x = `, possibly indexed) and
/// the statement head after it. Lines without a top-level assignment
/// return an empty prefix.
pub(crate) fn split_assign_prefix(text: &str) -> (&str, &str) {
    match assignment_eq(text) {
        Some((pos, None)) => {
            let head = text[pos + 1..].trim_start();
            let consumed = text.len() - head.len();
            (&text[..consumed], head)
        }
        _ => {
            let head = text.trim_start();
            let consumed = text.len() - head.len();
            (&text[..consumed], head)
        }
    }
}

/// Number of blocks a line opens and the number of `end` words it carries.
fn net_opens(text: &str) -> (i32, i32) {
    let blanked = blank_strings(text);
    let (_, head) = split_assign_prefix(&blanked);
    let mut opens = 0i32;
    match first_word(head) {
        Some("def" | "if" | "while" | "for" | "rats" | "bench" | "struct") => opens += 1,
        Some("try") => {
            let tail = head[3..].trim();
            if tail.is_empty() {
                opens += 1;
            } else if TRY_BLOCK_KEYWORDS.contains(&first_word(tail).unwrap_or("")) {
                opens += 2;
            }
        }
        Some("spawn" | "parallel") => {
            let word_len = first_word(head).map(str::len).unwrap_or(0);
            if head[word_len..].trim().is_empty() {
                opens += 1;
            }
        }
        _ => {}
    }
    if ends_with_word(&blanked, "do") {
        opens += 1;
    }
    opens += count_fn_open(&blanked);
    let ends = count_word(text, "end") as i32;
    (opens, ends)
}

fn ends_with_word(blanked: &str, word: &str) -> bool {
    let trimmed = blanked.trim_end();
    trimmed.ends_with(word)
        && trimmed[..trimmed.len() - word.len()]
            .bytes()
            .last()
            .map_or(false, |b| !is_ident_byte(b))
}

/// Counts `fn(` occurrences outside strings (word-boundary checked).
fn count_fn_open(blanked: &str) -> i32 {
    let bytes = blanked.as_bytes();
    let mut count = 0;
    let mut from = 0;
    while let Some(rel) = blanked[from..].find("fn(") {
        let pos = from + rel;
        if pos == 0 || !is_ident_byte(bytes[pos - 1]) {
            count += 1;
        }
        from = pos + 3;
    }
    count
}

/// First top-level whole-word occurrence (outside strings and brackets).
fn find_first_top_level_word(text: &str, word: &str) -> Option<usize> {
    let blanked = blank_strings(text);
    let bytes = blanked.as_bytes();
    let mut depth = 0i32;
    for i in 0..bytes.len() {
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
                return Some(i);
            }
        }
    }
    None
}

/// Does a handler block follow this `or IDENT` line? The handler body is
/// indented relative to the line that introduced it; a same-indent next
/// line means the identifier was a fallback value instead.
fn block_follows(lines: &[Line], after: usize, indent: &str) -> bool {
    lines
        .iter()
        .skip(after + 1)
        .find(|l| !l.text.trim().is_empty())
        .is_some_and(|next| indent_of(&next.text).len() > indent.len())
}

/// Pass 12: `try` sugar.
pub fn expand_try_sugar(lines: Vec<Line>, path: &str) -> Result<Vec<Line>> {
    let mut out = Vec::with_capacity(lines.len());
    for i in 0..lines.len() {
        let line = &lines[i];
        let (prefix, head) = split_assign_prefix(&line.text);
        let indent = indent_of(&line.text);
        let orig = line.orig;
        let push = |out: &mut Vec<Line>, text: String| out.push(Line { text, orig });

        if first_word(head) == Some("try") {
            let tail = head[3..].trim();
            if tail.is_empty() {
                out.push(line.clone());
                continue;
            }
            if TRY_BLOCK_KEYWORDS.contains(&first_word(tail).unwrap_or("")) {
                push(&mut out, format!("{}try", prefix));
                push(&mut out, format!("{}{}", indent, tail));
                continue;
            }
            match split_or_clause(tail, path, orig)? {
                None => {
                    push(&mut out, format!("{}try", prefix));
                    push(&mut out, format!("{}  {}", indent, tail));
                    push(&mut out, format!("{}end", indent));
                }
                Some((expr, rescue)) => {
                    push(&mut out, format!("{}try", prefix));
                    push(&mut out, format!("{}  {}", indent, expr));
                    if is_identifier(rescue) && block_follows(&lines, i, indent) {
                        push(&mut out, format!("{}or {}", indent, rescue));
                    } else {
                        push(&mut out, format!("{}or _err", indent));
                        push(&mut out, format!("{}  {}", indent, rescue));
                        push(&mut out, format!("{}end", indent));
                    }
                }
            }
            continue;
        }

        // `end or ...` closes a block-keyword try expression.
        if first_word(head) == Some("end") && prefix.trim().is_empty() {
            let after_end = head[3..].trim_start();
            if first_word(after_end) == Some("or") {
                let rescue = after_end[2..].trim();
                push(&mut out, format!("{}end", indent));
                if rescue.is_empty() {
                    return Err(RugoError::at("expected expression after 'or'", path, orig));
                }
                if is_identifier(rescue) && block_follows(&lines, i, indent) {
                    push(&mut out, format!("{}or {}", indent, rescue));
                } else {
                    push(&mut out, format!("{}or _err", indent));
                    push(&mut out, format!("{}  {}", indent, rescue));
                    push(&mut out, format!("{}end", indent));
                }
                continue;
            }
        }

        out.push(line.clone());
    }
    Ok(out)
}

/// Splits `EXPR or RESCUE` at the first top-level `or`.
fn split_or_clause<'a>(
    tail: &'a str,
    path: &str,
    orig: u32,
) -> Result<Option<(&'a str, &'a str)>> {
    let Some(pos) = find_first_top_level_word(tail, "or") else {
        return Ok(None);
    };
    let expr = tail[..pos].trim();
    let rescue = tail[pos + 2..].trim();
    if expr.is_empty() {
        return Err(RugoError::at("expected expression before 'or'", path, orig));
    }
    if rescue.is_empty() {
        return Err(RugoError::at("expected expression after 'or'", path, orig));
    }
    Ok(Some((expr, rescue)))
}

/// Pass 13: `spawn EXPR` one-liner → block form.
pub fn expand_spawn_oneliner(lines: Vec<Line>) -> Vec<Line> {
    let mut out = Vec::with_capacity(lines.len());
    for line in lines {
        let (prefix, head) = split_assign_prefix(&line.text);
        if first_word(head) != Some("spawn") {
            out.push(line);
            continue;
        }
        let tail = head[5..].trim();
        if tail.is_empty() {
            out.push(line);
            continue;
        }
        let indent = indent_of(&line.text).to_string();
        let orig = line.orig;
        out.push(Line {
            text: format!("{}spawn", prefix),
            orig,
        });
        out.push(Line {
            text: format!("{}  {}", indent, tail),
            orig,
        });
        out.push(Line {
            text: format!("{}end", indent),
            orig,
        });
    }
    out
}

/// Pass 11: `call ARGS do … end` → `call(ARGS, fn() … end)`.
///
/// Iterated until fixpoint so nested `do` blocks lower inner-to-outer.
pub fn expand_do_end(lines: Vec<Line>, path: &str) -> Result<Vec<Line>> {
    let mut lines = lines;
    loop {
        match rewrite_one_do(&lines, path)? {
            Some(rewritten) => lines = rewritten,
            None => return Ok(lines),
        }
    }
}

fn rewrite_one_do(lines: &[Line], path: &str) -> Result<Option<Vec<Line>>> {
    let Some(start) = lines.iter().position(|l| {
        let blanked = blank_strings(&l.text);
        if !blanked.trim_end().ends_with(" do") || is_bare_do(&l.text) {
            return false;
        }
        // A block keyword before `do` is not call sugar.
        let (_, head) = split_assign_prefix(&l.text);
        !matches!(
            first_word(head),
            Some(
                "def" | "if" | "elsif" | "else" | "while" | "for" | "try" | "spawn" | "parallel"
                    | "rats" | "bench" | "struct" | "end" | "or"
            )
        )
    }) else {
        return Ok(None);
    };

    let head_line = &lines[start];
    let trimmed = head_line.text.trim_end();
    let before_do = trimmed[..trimmed.len() - 2].trim_end();
    let head = rewrite_do_head(before_do).ok_or_else(|| {
        RugoError::at(
            "'do' must follow a function call",
            path,
            head_line.orig,
        )
    })?;

    // Find the matching `end`.
    let mut depth = 1i32;
    for (j, line) in lines.iter().enumerate().skip(start + 1) {
        let (opens, ends) = net_opens(&line.text);
        depth += opens;
        let mut remaining = ends;
        while remaining > 0 {
            depth -= 1;
            remaining -= 1;
            if depth == 0 {
                // Close the lowered lambda and the original call here:
                // the last `end` on this line becomes `end)`.
                let closed = replace_last_end(&line.text);
                let mut out = lines.to_vec();
                out[start] = Line {
                    text: head,
                    orig: head_line.orig,
                };
                out[j] = Line {
                    text: closed,
                    orig: line.orig,
                };
                return Ok(Some(out));
            }
        }
    }
    Err(RugoError::at(
        "missing 'end' for 'do' block",
        path,
        head_line.orig,
    ))
}

/// A lone `do` line (no call before it) is not call sugar.
fn is_bare_do(text: &str) -> bool {
    text.trim() == "do"
}

fn replace_last_end(text: &str) -> String {
    // Safe because the caller counted at least one word-boundary `end`.
    let blanked = blank_strings(text);
    let mut pos = None;
    let mut from = 0;
    while let Some(rel) = blanked[from..].find("end") {
        let p = from + rel;
        let bytes = blanked.as_bytes();
        let before_ok = p == 0 || !is_ident_byte(bytes[p - 1]);
        let after_ok = p + 3 >= bytes.len() || !is_ident_byte(bytes[p + 3]);
        if before_ok && after_ok {
            pos = Some(p);
        }
        from = p + 3;
    }
    match pos {
        Some(p) => format!("{}end){}", &text[..p], &text[p + 3..]),
        None => text.to_string(),
    }
}

/// Turns the call before `do` into an open call with a trailing lambda:
/// `f(a)` → `f(a, fn()`; `f a, b` → `f(a, b, fn()`; `f` → `f(fn()`.
fn rewrite_do_head(before_do: &str) -> Option<String> {
    let (prefix, head) = split_assign_prefix(before_do);
    if head.is_empty() {
        return None;
    }
    if head.ends_with(')') {
        let inner = &head[..head.len() - 1];
        if inner.ends_with('(') {
            return Some(format!("{}{}fn()", prefix, inner));
        }
        return Some(format!("{}{}, fn()", prefix, inner));
    }
    // Paren-free: first token is the callee (possibly dotted).
    let callee_end = head
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '.'))
        .unwrap_or(head.len());
    if callee_end == 0 {
        return None;
    }
    let callee = &head[..callee_end];
    let args = head[callee_end..].trim();
    if args.is_empty() {
        Some(format!("{}{}(fn()", prefix, callee))
    } else {
        Some(format!("{}{}({}, fn()", prefix, callee, args))
    }
}

/// Pass 14: inline `fn(PARAMS) BODY end` on one line → multi-line form,
/// iterated to fixpoint (outermost first).
pub fn expand_inline_fn(lines: Vec<Line>) -> Vec<Line> {
    let mut out = Vec::with_capacity(lines.len());
    for line in lines {
        expand_inline_fn_line(line, &mut out);
    }
    out
}

fn expand_inline_fn_line(line: Line, out: &mut Vec<Line>) {
    let Some((head, body, tail)) = split_inline_fn(&line.text) else {
        out.push(line);
        return;
    };
    let indent = indent_of(&line.text).to_string();
    out.push(Line {
        text: head,
        orig: line.orig,
    });
    // The body may itself contain an inline fn; recurse on it.
    expand_inline_fn_line(
        Line {
            text: format!("{}{}", indent, prewrap_builtin(&body)),
            orig: line.orig,
        },
        out,
    );
    expand_inline_fn_line(
        Line {
            text: format!("{}{}", indent, tail),
            orig: line.orig,
        },
        out,
    );
}

/// Finds the first `fn(` whose matching `end` sits on the same line, and
/// splits the line into (head-ending-with-params, body, end-plus-rest).
fn split_inline_fn(text: &str) -> Option<(String, String, String)> {
    let blanked = blank_strings(text);
    let bytes = blanked.as_bytes();
    let mut from = 0;
    while let Some(rel) = blanked[from..].find("fn(") {
        let pos = from + rel;
        if pos > 0 && is_ident_byte(bytes[pos - 1]) {
            from = pos + 3;
            continue;
        }
        // Match the parameter list's closing paren.
        let mut depth = 0i32;
        let mut params_end = None;
        for i in pos + 2..bytes.len() {
            match bytes[i] {
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        params_end = Some(i);
                        break;
                    }
                }
                _ => {}
            }
        }
        let params_end = params_end?;
        // Find this fn's `end`, skipping ends of nested inline fns.
        let mut nested = 0i32;
        let mut i = params_end + 1;
        while i < bytes.len() {
            if blanked[i..].starts_with("fn(")
                && (i == 0 || !is_ident_byte(bytes[i - 1]))
            {
                nested += 1;
                i += 3;
                continue;
            }
            if blanked[i..].starts_with("end")
                && !is_ident_byte(bytes[i - 1])
                && (i + 3 >= bytes.len() || !is_ident_byte(bytes[i + 3]))
            {
                if nested > 0 {
                    nested -= 1;
                } else {
                    let body = text[params_end + 1..i].trim();
                    if body.is_empty() {
                        // `fn() end` stays inline for the parser to read as
                        // an empty lambda once split; emit an empty body line.
                    }
                    return Some((
                        text[..params_end + 1].to_string(),
                        body.to_string(),
                        text[i..].to_string(),
                    ));
                }
                i += 3;
                continue;
            }
            i += 1;
        }
        from = pos + 3;
    }
    None
}

/// `puts a` → `puts(a)` when the body of an inline fn starts with a
/// paren-free builtin call; keeps the later line classifier from seeing a
/// fragment it cannot attribute.
fn prewrap_builtin(body: &str) -> String {
    let Some(word) = first_word(body) else {
        return body.to_string();
    };
    if !is_builtin(word) {
        return body.to_string();
    }
    let rest = body.trim_start()[word.len()..].trim_start();
    if rest.is_empty() || rest.starts_with('(') {
        return body.to_string();
    }
    format!("{}({})", word, rest)
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
    fn try_oneliner_nil_fallback() {
        let out = expand_try_sugar(lines("x = try conv.to_i(s)"), "t").unwrap();
        assert_eq!(texts(&out), vec!["x = try", "  conv.to_i(s)", "end"]);
    }

    #[test]
    fn try_oneliner_with_default() {
        let out = expand_try_sugar(lines("x = try conv.to_i(\"abc\") or 0"), "t").unwrap();
        assert_eq!(
            texts(&out),
            vec![
                "x = try",
                "  conv.to_i(\"abc\")",
                "or _err",
                "  0",
                "end"
            ]
        );
    }

    #[test]
    fn try_with_handler_block_keeps_binding() {
        let out = expand_try_sugar(lines("try risky() or err\n  puts err\nend"), "t").unwrap();
        assert_eq!(
            texts(&out),
            vec!["try", "  risky()", "or err", "  puts err", "end"]
        );
    }

    #[test]
    fn try_or_known_value_without_block_is_default() {
        let out = expand_try_sugar(lines("x = try f() or backup\nputs x"), "t").unwrap();
        assert_eq!(
            texts(&out),
            vec!["x = try", "  f()", "or _err", "  backup", "end", "puts x"]
        );
    }

    #[test]
    fn try_parallel_splits_block_keyword() {
        let src = "try parallel\n  1\n  raise \"boom\"\nend or err\n  puts err\nend";
        let out = expand_try_sugar(lines(src), "t").unwrap();
        assert_eq!(
            texts(&out),
            vec![
                "try",
                "parallel",
                "  1",
                "  raise \"boom\"",
                "end",
                "or err",
                "  puts err",
                "end"
            ]
        );
    }

    #[test]
    fn spawn_oneliner_expands() {
        let out = expand_spawn_oneliner(lines("t = spawn fetch(url)"));
        assert_eq!(texts(&out), vec!["t = spawn", "  fetch(url)", "end"]);
        let out = expand_spawn_oneliner(lines("spawn\n  work()\nend"));
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn do_end_lowers_to_fn_argument() {
        let out = expand_do_end(lines("items.each do\n  puts 1\nend"), "t").unwrap();
        assert_eq!(texts(&out), vec!["items.each(fn()", "  puts 1", "end)"]);
    }

    #[test]
    fn do_end_with_existing_args() {
        let out = expand_do_end(lines("retry_n(3) do\n  fetch()\nend"), "t").unwrap();
        assert_eq!(texts(&out), vec!["retry_n(3, fn()", "  fetch()", "end)"]);
    }

    #[test]
    fn do_end_paren_free_args() {
        let out = expand_do_end(lines("each x, y do\n  puts x\nend"), "t").unwrap();
        assert_eq!(texts(&out), vec!["each(x, y, fn()", "  puts x", "end)"]);
    }

    #[test]
    fn nested_do_blocks_both_lower() {
        let src = "outer do\n  inner do\n    puts 1\n  end\nend";
        let out = expand_do_end(lines(src), "t").unwrap();
        assert_eq!(
            texts(&out),
            vec![
                "outer(fn()",
                "  inner(fn()",
                "    puts 1",
                "  end)",
                "end)"
            ]
        );
    }

    #[test]
    fn do_end_skips_nested_if_blocks() {
        let src = "walk do\n  if x\n    puts 1\n  end\nend";
        let out = expand_do_end(lines(src), "t").unwrap();
        assert_eq!(out[4].text, "end)");
        assert_eq!(out[3].text, "  end");
    }

    #[test]
    fn missing_end_for_do_is_fatal() {
        let err = expand_do_end(lines("each do\n  puts 1"), "t.rugo").unwrap_err();
        assert!(err.to_string().contains("missing 'end'"));
    }

    #[test]
    fn inline_fn_expands_to_three_lines() {
        let out = expand_inline_fn(lines("xs.map(fn(a) a * 2 end)"));
        assert_eq!(texts(&out), vec!["xs.map(fn(a)", "a * 2", "end)"]);
        assert!(out.iter().all(|l| l.orig == 1));
    }

    #[test]
    fn nested_inline_fns_expand_outermost_first() {
        let out = expand_inline_fn(lines("f(fn(a) g(fn(b) b end) end)"));
        assert_eq!(
            texts(&out),
            vec!["f(fn(a)", "g(fn(b)", "b", "end)", "end)"]
        );
    }

    #[test]
    fn inline_fn_prewraps_builtin_body() {
        let out = expand_inline_fn(lines("each(fn(x) puts x end)"));
        assert_eq!(texts(&out), vec!["each(fn(x)", "puts(x)", "end)"]);
    }

    #[test]
    fn multiline_fn_left_alone() {
        let out = expand_inline_fn(lines("f = fn(a)\n  a + 1\nend"));
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].text, "f = fn(a)");
    }
}
