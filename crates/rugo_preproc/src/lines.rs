//! The line classification pass — shell fallback lives here.
//!
//! For every line, the classifier decides what its first token is: a
//! keyword, an assignment, a parenthesized call, a paren-free call to a
//! known callable, or an unknown identifier — which makes the whole line a
//! shell command. Getting this decision right requires tracking, line by
//! line:
//!
//! - which user functions are visible (*positionally* at the top level —
//!   a paren-free call only binds after its `def` was seen above — but all
//!   functions are visible inside a function body, so forward references
//!   work);
//! - which variables are known in the current scope, so `x - 1` is a
//!   subtraction when `x` is known and `x -1` is a shell invocation when it
//!   is not;
//! - which namespaces `use`/`import`/`require` have claimed;
//! - block structure, so `struct` bodies and handler bindings resolve.
//!
//! Pipe expansion runs first on each line: top-level `|` segments (never
//! `||`, never inside strings or brackets) become nested calls when at
//! least one segment is a Rugo construct; an all-shell pipe is left for
//! the shell itself. A void builtin anywhere but the final segment is a
//! hard error.

use crate::keywords::{
    is_builtin, is_void_builtin, suggest_keyword, INTERNAL_SHELL, INTERNAL_SHELL_CAPTURE,
    INTERNAL_SHELL_PIPE,
};
use crate::scan::{blank_strings, first_word, indent_of, is_ident_byte};
use crate::sugar::{assignment_eq, push_escaped_command};
use crate::Line;
use rugo_base::names::is_identifier;
use rugo_base::{Result, RugoError};
use rustc_hash::FxHashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Opener {
    Def,
    Lambda,
    Loop,
    If,
    Try,
    Struct,
    Rats,
    Plain,
}

/// How far variable lookup may descend past a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Barrier {
    /// Read through (lambdas, loops, if-transparent frames).
    None,
    /// See this frame and the global frame only (function bodies).
    Global,
    /// See this frame only (test blocks: no implicit captures).
    Full,
}

struct Frame {
    vars: FxHashSet<String>,
    barrier: Barrier,
}

pub struct Classifier<'a> {
    path: &'a str,
    all_defs: FxHashSet<String>,
    seen_defs: FxHashSet<String>,
    namespaces: FxHashSet<String>,
    frames: Vec<Frame>,
    /// Parallel to block structure: which opener produced each level and
    /// whether it pushed a variable frame.
    blocks: Vec<(Opener, bool)>,
    in_struct: bool,
}

impl<'a> Classifier<'a> {
    pub fn new(path: &'a str, lines: &[Line]) -> Self {
        let mut all_defs = FxHashSet::default();
        for line in lines {
            let trimmed = line.text.trim_start();
            if first_word(trimmed) == Some("def") {
                if let Some(name) = def_name(trimmed) {
                    if !name.contains('.') {
                        all_defs.insert(name.to_string());
                    }
                }
            }
        }
        Self {
            path,
            all_defs,
            seen_defs: FxHashSet::default(),
            namespaces: FxHashSet::default(),
            frames: vec![Frame {
                vars: FxHashSet::default(),
                barrier: Barrier::None,
            }],
            blocks: Vec::new(),
            in_struct: false,
        }
    }

    pub fn run(mut self, lines: Vec<Line>) -> Result<Vec<Line>> {
        let mut out = Vec::with_capacity(lines.len());
        for line in lines {
            let text = self.classify_line(&line)?;
            self.track_structure(&text, line.orig)?;
            out.push(Line {
                text,
                orig: line.orig,
            });
        }
        Ok(out)
    }

    fn inside_body(&self) -> bool {
        self.blocks
            .iter()
            .any(|(k, _)| matches!(k, Opener::Def | Opener::Lambda | Opener::Rats))
    }

    fn is_known_fn(&self, name: &str) -> bool {
        if self.inside_body() {
            self.all_defs.contains(name)
        } else {
            self.seen_defs.contains(name)
        }
    }

    fn is_known_var(&self, name: &str) -> bool {
        for (i, frame) in self.frames.iter().enumerate().rev() {
            if frame.vars.contains(name) {
                return true;
            }
            match frame.barrier {
                Barrier::None => {}
                Barrier::Global => {
                    return i > 0 && self.frames[0].vars.contains(name);
                }
                Barrier::Full => return false,
            }
        }
        false
    }

    fn declare_var(&mut self, name: &str) {
        if let Some(frame) = self.frames.last_mut() {
            frame.vars.insert(name.to_string());
        }
    }

    /// Classifies and possibly rewrites one line.
    fn classify_line(&mut self, line: &Line) -> Result<String> {
        let text = &line.text;
        let trimmed = text.trim_start();
        if trimmed.is_empty() || self.in_struct && first_word(trimmed) != Some("end") {
            return Ok(text.clone());
        }

        // Keyword-led lines are never pipes or shell commands.
        if let Some(word) = first_word(trimmed) {
            if let Some(handled) = self.classify_keyword_line(word, trimmed, text, line.orig)? {
                return Ok(handled);
            }
        }

        // Assignment introduces the target, then the RHS may be a pipe.
        if let Some((eq, None)) = assignment_eq(text) {
            let lhs = text[..eq].trim();
            if let Some(base) = lvalue_base(lhs) {
                let plain = base.len() == lhs.len();
                if plain {
                    self.declare_var(base);
                }
            }
            let rhs = text[eq + 1..].trim();
            if let Some(rewritten) = self.expand_pipes(rhs, line.orig)? {
                return Ok(format!("{} = {}", text[..eq].trim_end(), rewritten));
            }
            return Ok(text.clone());
        }

        if let Some(rewritten) = self.expand_pipes(trimmed, line.orig)? {
            return Ok(format!("{}{}", indent_of(text), rewritten));
        }

        self.classify_expression_line(text, line.orig)
    }

    /// Handles lines led by a keyword. Returns `None` when the word is not
    /// a keyword and ordinary classification should continue.
    fn classify_keyword_line(
        &mut self,
        word: &str,
        trimmed: &str,
        text: &str,
        orig: u32,
    ) -> Result<Option<String>> {
        match word {
            "def" => {
                if let Some(name) = def_name(trimmed) {
                    if !name.contains('.') {
                        self.seen_defs.insert(name.to_string());
                    }
                }
                Ok(Some(text.to_string()))
            }
            "use" | "import" | "require" => {
                for ns in declared_namespaces(trimmed) {
                    self.namespaces.insert(ns);
                }
                Ok(Some(text.to_string()))
            }
            "or" => {
                let in_try = self
                    .blocks
                    .iter()
                    .rev()
                    .find(|(k, _)| !matches!(k, Opener::If | Opener::Loop))
                    .is_some_and(|(k, _)| *k == Opener::Try);
                if !in_try {
                    return Err(RugoError::at(
                        "orphan 'or': there is no 'try' to recover from",
                        self.path,
                        orig,
                    ));
                }
                let binding = trimmed[2..].trim();
                if !binding.is_empty() {
                    self.declare_var(binding);
                }
                Ok(Some(text.to_string()))
            }
            "end" | "if" | "elsif" | "else" | "while" | "for" | "try" | "spawn" | "parallel"
            | "struct" | "rats" | "bench" | "return" | "break" | "continue" | "sandbox" | "in"
            | "do" | "fn" | "true" | "false" | "nil" | "as" | "with" => Ok(Some(text.to_string())),
            _ => Ok(None),
        }
    }

    /// Classifies a non-keyword, non-assignment line.
    fn classify_expression_line(&mut self, text: &str, orig: u32) -> Result<String> {
        let trimmed = text.trim_start();
        let indent = indent_of(text);

        // Lines starting with a literal or bracket are plain expressions.
        let first_char = trimmed.chars().next().unwrap_or(' ');
        if !(first_char.is_ascii_alphabetic() || first_char == '_') {
            return Ok(text.to_string());
        }

        let word = first_word(trimmed).unwrap_or("");
        let after = trimmed[word.len()..].trim_start();

        // Internal calls emitted by earlier passes.
        if word.starts_with("__") {
            return Ok(text.to_string());
        }

        // Dotted head: namespace call or method call on a known variable.
        if after.starts_with('.') || trimmed[word.len()..].starts_with('.') {
            return self.classify_dotted_line(text, orig);
        }

        // A parenthesized call is a call no matter whether the callee is
        // known yet; unknown callees fail later with a compile error, not
        // a shell invocation.
        if trimmed[word.len()..].starts_with('(') {
            return Ok(text.to_string());
        }

        if self.is_known_fn(word) || is_builtin(word) {
            if after.starts_with('(') || after.is_empty() {
                let wrapped = if after.is_empty() {
                    format!("{}{}()", indent, word)
                } else {
                    text.to_string()
                };
                return Ok(wrapped);
            }
            if starts_with_operator(after) {
                // `f - 1` on a known callable is still a call in spirit,
                // but an operator here means the user meant an expression.
                return Ok(text.to_string());
            }
            return Ok(format!("{}{}({})", indent, word, after));
        }

        if self.is_known_var(word) {
            // Known variable: expression statement (`x`, `x - 1`, `x(1)`).
            return Ok(text.to_string());
        }

        // Unknown identifier: shell fallback — unless it smells like a typo.
        if let Some(suggestion) = suggest_keyword(word) {
            if !after.is_empty() {
                return Err(RugoError::at(
                    format!("unknown command '{}' — did you mean '{}'?", word, suggestion),
                    self.path,
                    orig,
                ));
            }
        }
        if crate::scan::find_last_top_level_word(trimmed, "or").is_some() {
            return Err(RugoError::at(
                "orphan 'or' in a shell command; 'or' only recovers from 'try'",
                self.path,
                orig,
            ));
        }
        let mut escaped = String::with_capacity(trimmed.len() + 8);
        push_escaped_command(&mut escaped, trimmed);
        log::debug!("{}:{}: shell fallback: {}", self.path, orig, trimmed);
        Ok(format!("{}{}(\"{}\")", indent, INTERNAL_SHELL, escaped))
    }

    /// `ns.fn args`, `x.method args`, `x.field` — wraps paren-free forms.
    fn classify_dotted_line(&mut self, text: &str, orig: u32) -> Result<String> {
        let trimmed = text.trim_start();
        let indent = indent_of(text);
        let blanked = blank_strings(trimmed);
        // Head: leading dotted identifier path.
        let head_end = blanked
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '.'))
            .unwrap_or(blanked.len());
        let head = &trimmed[..head_end];
        let base = head.split('.').next().unwrap_or("");
        let after = trimmed[head_end..].trim_start();

        let known_base = self.is_known_var(base)
            || self.namespaces.contains(base)
            || self.is_known_fn(base)
            || is_builtin(base);
        if !known_base {
            if let Some(suggestion) = suggest_keyword(base) {
                if !after.is_empty() {
                    return Err(RugoError::at(
                        format!("unknown command '{}' — did you mean '{}'?", base, suggestion),
                        self.path,
                        orig,
                    ));
                }
            }
            let mut escaped = String::with_capacity(trimmed.len() + 8);
            push_escaped_command(&mut escaped, trimmed);
            return Ok(format!("{}{}(\"{}\")", indent, INTERNAL_SHELL, escaped));
        }

        if after.is_empty() || after.starts_with('(') || starts_with_operator(after) {
            return Ok(text.to_string());
        }
        Ok(format!("{}{}({})", indent, head, after))
    }

    /// Pipe expansion. Returns `Some(rewritten)` when the text was a pipe
    /// that involved at least one Rugo construct.
    fn expand_pipes(&mut self, text: &str, orig: u32) -> Result<Option<String>> {
        let segments = split_pipes(text);
        if segments.len() < 2 {
            return Ok(None);
        }
        let kinds: Vec<SegmentKind> = segments
            .iter()
            .map(|s| self.segment_kind(s))
            .collect();
        if kinds.iter().all(|k| *k == SegmentKind::Shell) {
            return Ok(None); // all-shell pipes belong to the shell
        }

        let mut acc = match kinds[0] {
            SegmentKind::Shell => {
                let mut escaped = String::new();
                push_escaped_command(&mut escaped, segments[0].trim());
                format!("{}(\"{}\")", INTERNAL_SHELL_CAPTURE, escaped)
            }
            SegmentKind::Rugo => self.render_initial_segment(segments[0].trim()),
        };
        for (i, seg) in segments.iter().enumerate().skip(1) {
            let seg = seg.trim();
            let final_seg = i == segments.len() - 1;
            let callee = first_word(seg).unwrap_or("");
            if !final_seg && is_void_builtin(callee) {
                return Err(RugoError::at(
                    format!("'{}' produces no value and cannot be used mid-pipe", callee),
                    self.path,
                    orig,
                ));
            }
            acc = match kinds[i] {
                SegmentKind::Shell => {
                    let mut escaped = String::new();
                    push_escaped_command(&mut escaped, seg);
                    format!("{}(\"{}\", {})", INTERNAL_SHELL_PIPE, escaped, acc)
                }
                SegmentKind::Rugo => append_piped_arg(seg, &acc),
            };
        }
        Ok(Some(acc))
    }

    /// A segment is a Rugo construct when its head is a known callable,
    /// variable, namespace, literal, or parenthesized expression.
    fn segment_kind(&self, seg: &str) -> SegmentKind {
        let seg = seg.trim();
        let first_char = seg.chars().next().unwrap_or(' ');
        if !(first_char.is_ascii_alphabetic() || first_char == '_') {
            return SegmentKind::Rugo;
        }
        let word = first_word(seg).unwrap_or("");
        let base = word.split('.').next().unwrap_or(word);
        if self.is_known_fn(base)
            || is_builtin(base)
            || self.is_known_var(base)
            || self.namespaces.contains(base)
            || base.starts_with("__")
        {
            SegmentKind::Rugo
        } else {
            SegmentKind::Shell
        }
    }

    /// First pipe segment: wrap a paren-free call, keep everything else.
    fn render_initial_segment(&self, seg: &str) -> String {
        let word = first_word(seg).unwrap_or("");
        let blanked = blank_strings(seg);
        let head_end = blanked
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '.'))
            .unwrap_or(blanked.len());
        let head = &seg[..head_end];
        let after = seg[head_end..].trim_start();
        let callable = self.is_known_fn(word) || is_builtin(word) || head.contains('.');
        if callable && !after.is_empty() && !after.starts_with('(') && !starts_with_operator(after)
        {
            format!("{}({})", head, after)
        } else {
            seg.to_string()
        }
    }

    /// Records block structure effects of the final text: keyword openers,
    /// `fn(` lambda openers with their parameters, and `end` closers.
    fn track_structure(&mut self, text: &str, orig: u32) -> Result<()> {
        let trimmed = text.trim_start();
        let blanked = blank_strings(trimmed);
        // Block heads may sit behind an assignment prefix (`x = try`).
        let (_, head) = crate::blocks::split_assign_prefix(trimmed);
        let word = first_word(head).unwrap_or("");

        match word {
            "def" => {
                let params = paren_params(trimmed);
                let mut vars: FxHashSet<String> =
                    params.into_iter().collect();
                if def_name(trimmed).is_some_and(|n| n.contains('.')) {
                    vars.insert("self".to_string());
                }
                self.frames.push(Frame {
                    vars,
                    barrier: Barrier::Global,
                });
                self.blocks.push((Opener::Def, true));
            }
            "if" | "elsif" | "else" => {
                if word == "if" {
                    self.blocks.push((Opener::If, false));
                }
            }
            "while" => {
                self.frames.push(Frame {
                    vars: FxHashSet::default(),
                    barrier: Barrier::None,
                });
                self.blocks.push((Opener::Loop, true));
            }
            "for" => {
                let mut vars = FxHashSet::default();
                for var in for_loop_vars(trimmed) {
                    vars.insert(var);
                }
                self.frames.push(Frame {
                    vars,
                    barrier: Barrier::None,
                });
                self.blocks.push((Opener::Loop, true));
            }
            "try" => self.blocks.push((Opener::Try, false)),
            "spawn" | "parallel" => self.blocks.push((Opener::Plain, false)),
            "struct" => {
                self.in_struct = true;
                self.blocks.push((Opener::Struct, false));
            }
            "rats" | "bench" => {
                self.frames.push(Frame {
                    vars: FxHashSet::default(),
                    barrier: Barrier::Full,
                });
                self.blocks.push((Opener::Rats, true));
            }
            _ => {}
        }

        // Mid-line events: every `fn(` opens a lambda scope, every `end`
        // closes the innermost block — processed left to right.
        let bytes = blanked.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if blanked[i..].starts_with("fn(") && (i == 0 || !is_ident_byte(bytes[i - 1])) {
                let params = paren_params(&trimmed[i..]);
                self.frames.push(Frame {
                    vars: params.into_iter().collect(),
                    barrier: Barrier::None,
                });
                self.blocks.push((Opener::Lambda, true));
                i += 3;
                continue;
            }
            if blanked[i..].starts_with("end")
                && (i == 0 || !is_ident_byte(bytes[i - 1]))
                && (i + 3 >= bytes.len() || !is_ident_byte(bytes[i + 3]))
            {
                self.close_block(orig)?;
                i += 3;
                continue;
            }
            i += 1;
        }
        Ok(())
    }

    fn close_block(&mut self, orig: u32) -> Result<()> {
        let Some((kind, pushed)) = self.blocks.pop() else {
            return Err(RugoError::at(
                "'end' without an open block",
                self.path,
                orig,
            ));
        };
        if kind == Opener::Struct {
            self.in_struct = false;
        }
        if pushed {
            self.frames.pop();
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SegmentKind {
    Rugo,
    Shell,
}

/// Pass 15 entry point.
pub fn classify_lines(lines: Vec<Line>, path: &str) -> Result<Vec<Line>> {
    Classifier::new(path, &lines).run(lines)
}

/// Splits at top-level single `|` (never `||`).
fn split_pipes(text: &str) -> Vec<&str> {
    let blanked = blank_strings(text);
    let bytes = blanked.as_bytes();
    let mut depth = 0i32;
    let mut segs = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b'|' if depth == 0 => {
                if bytes.get(i + 1) == Some(&b'|') {
                    i += 2;
                    continue;
                }
                segs.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    segs.push(&text[start..]);
    segs
}

/// Appends the piped value as the last argument of a call segment.
fn append_piped_arg(seg: &str, piped: &str) -> String {
    if seg.ends_with(')') {
        let inner = &seg[..seg.len() - 1];
        if inner.ends_with('(') {
            return format!("{}{})", inner, piped);
        }
        return format!("{}, {})", inner, piped);
    }
    format!("{}({})", seg, piped)
}

fn starts_with_operator(s: &str) -> bool {
    matches!(
        s.chars().next(),
        Some('+' | '-' | '*' | '/' | '%' | '=' | '<' | '>' | '!' | '&' | '|' | '[' | '?')
    )
}

/// Name from a `def name(...)` line.
fn def_name(trimmed: &str) -> Option<&str> {
    let rest = trimmed.strip_prefix("def")?.trim_start();
    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '.'))
        .unwrap_or(rest.len());
    if end == 0 {
        None
    } else {
        Some(&rest[..end])
    }
}

/// Parameters inside the first `(...)` of a line fragment.
fn paren_params(fragment: &str) -> Vec<String> {
    let open = match fragment.find('(') {
        Some(p) => p,
        None => return Vec::new(),
    };
    let close = match fragment[open..].find(')') {
        Some(p) => open + p,
        None => return Vec::new(),
    };
    fragment[open + 1..close]
        .split(',')
        .map(|p| p.trim().to_string())
        .filter(|p| is_identifier(p))
        .collect()
}

/// Loop variables of a `for a[, b] in expr` line.
fn for_loop_vars(trimmed: &str) -> Vec<String> {
    let rest = match trimmed.strip_prefix("for") {
        Some(r) => r,
        None => return Vec::new(),
    };
    let Some(in_pos) = crate::scan::find_word(rest, "in") else {
        return Vec::new();
    };
    rest[..in_pos]
        .split(',')
        .map(|v| v.trim().to_string())
        .filter(|v| is_identifier(v))
        .collect()
}

/// Namespaces a `use`/`import`/`require` line introduces.
///
/// - `use "name"` claims `name`;
/// - `import "pkg/path" as alias` claims `alias`, otherwise the last path
///   segment;
/// - `require "path" as alias` claims `alias`; `require "path" with a,b`
///   claims each listed name; otherwise the file stem of the path.
pub(crate) fn declared_namespaces(trimmed: &str) -> Vec<String> {
    let word = first_word(trimmed).unwrap_or("");
    let rest = trimmed[word.len()..].trim();
    let Some(target) = quoted_string(rest) else {
        return Vec::new();
    };
    let after = rest[target.len() + 2..].trim();

    if let Some(alias) = after.strip_prefix("as ") {
        let alias = alias.trim();
        if is_identifier(alias) {
            return vec![alias.to_string()];
        }
    }
    if word == "require" {
        if let Some(names) = after.strip_prefix("with ") {
            return names
                .split(',')
                .map(|n| n.trim().to_string())
                .filter(|n| is_identifier(n))
                .collect();
        }
    }
    let derived = match word {
        "use" => target.to_string(),
        "import" => target.rsplit('/').next().unwrap_or(target).to_string(),
        _ => {
            let base = rugo_base::strip_source_ext(
                target.rsplit('/').next().unwrap_or(target),
            );
            // Remote requires may pin a ref: strip `@ref`.
            base.split('@').next().unwrap_or(base).to_string()
        }
    };
    vec![derived]
}

/// Content of a leading double-quoted string, without the quotes.
fn quoted_string(s: &str) -> Option<&str> {
    let rest = s.strip_prefix('"')?;
    let end = rest.find('"')?;
    Some(&rest[..end])
}

/// Base identifier of an lvalue (`xs` in `xs[0]`), or `None`.
fn lvalue_base(lhs: &str) -> Option<&str> {
    let end = lhs
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(lhs.len());
    if end == 0 || lhs.as_bytes()[0].is_ascii_digit() {
        return None;
    }
    Some(&lhs[..end])
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
        classify_lines(lines, "test.rugo")
            .unwrap()
            .into_iter()
            .map(|l| l.text)
            .collect()
    }

    fn run_err(src: &str) -> RugoError {
        let lines: Vec<Line> = src
            .lines()
            .enumerate()
            .map(|(i, l)| Line {
                text: l.to_string(),
                orig: i as u32 + 1,
            })
            .collect();
        classify_lines(lines, "test.rugo").unwrap_err()
    }

    #[test]
    fn unknown_command_becomes_shell_call() {
        let out = run("ls -la");
        assert_eq!(out[0], "__shell(\"ls -la\")");
    }

    #[test]
    fn shell_call_preserves_interpolation() {
        let out = run("name = \"x\"\ngit checkout #{name}");
        assert_eq!(out[1], "__shell(\"git checkout #{name}\")");
    }

    #[test]
    fn known_variable_is_expression_not_shell() {
        let out = run("x = 1\nx - 1");
        assert_eq!(out[1], "x - 1");
    }

    #[test]
    fn unknown_with_dash_is_shell() {
        let out = run("x -1");
        assert_eq!(out[0], "__shell(\"x -1\")");
    }

    #[test]
    fn builtin_paren_free_call_wraps() {
        let out = run("puts \"hi\", 2");
        assert_eq!(out[0], "puts(\"hi\", 2)");
    }

    #[test]
    fn top_level_call_binds_positionally() {
        let out = run("greet\ndef greet()\nend\ngreet");
        assert_eq!(out[0], "__shell(\"greet\")");
        assert_eq!(out[3], "greet()");
    }

    #[test]
    fn forward_reference_inside_body_works() {
        let out = run("def a()\n  b()\nend\ndef b()\nend");
        assert_eq!(out[1], "  b()");
    }

    #[test]
    fn paren_free_forward_reference_inside_body() {
        let out = run("def a()\n  helper 1\nend\ndef helper(n)\nend");
        assert_eq!(out[1], "  helper(1)");
    }

    #[test]
    fn namespace_calls_wrap() {
        let out = run("use \"conv\"\nconv.to_i \"42\"");
        assert_eq!(out[1], "conv.to_i(\"42\")");
    }

    #[test]
    fn method_call_on_known_var_wraps() {
        let out = run("xs = [1]\nxs.push 2");
        assert_eq!(out[1], "xs.push(2)");
    }

    #[test]
    fn dot_access_left_alone() {
        let out = run("t = 1\nt.value");
        assert_eq!(out[1], "t.value");
    }

    #[test]
    fn struct_fields_are_not_shell() {
        let out = run("struct Dog\n  name\nend");
        assert_eq!(out[1], "  name");
    }

    #[test]
    fn misspelled_keyword_suggested() {
        let err = run_err("whlie x > 0");
        assert!(err.to_string().contains("did you mean 'while'"));
    }

    #[test]
    fn orphan_or_on_shell_line_rejected() {
        let err = run_err("frobnicate or die");
        assert!(err.to_string().contains("orphan 'or'"));
    }

    #[test]
    fn or_outside_try_rejected() {
        let err = run_err("x = 1\nor err");
        assert!(err.to_string().contains("orphan 'or'"));
    }

    #[test]
    fn mixed_pipe_nests_calls() {
        let out = run("def clean(s)\nend\nx = 1\ny = x | clean");
        assert_eq!(out[3], "y = clean(x)");
    }

    #[test]
    fn pipe_with_args_appends_value() {
        let out = run("def pad(s, n)\nend\nx = 1\ny = x | pad(3)");
        assert_eq!(out[3], "y = pad(3, x)");
    }

    #[test]
    fn shell_segment_mid_pipe_feeds_stdin() {
        let out = run("x = \"hi\"\ny = x | tr a b");
        assert_eq!(out[1], "y = __shell_pipe(\"tr a b\", x)");
    }

    #[test]
    fn all_shell_pipe_left_to_shell() {
        let out = run("ls -la | grep rugo");
        assert_eq!(out[0], "__shell(\"ls -la | grep rugo\")");
    }

    #[test]
    fn void_builtin_mid_pipe_is_fatal() {
        let err = run_err("x = 1\nx | puts | len");
        assert!(err.to_string().contains("cannot be used mid-pipe"));
    }

    #[test]
    fn void_builtin_final_pipe_ok() {
        let out = run("x = 1\nx | puts");
        assert_eq!(out[1], "puts(x)");
    }

    #[test]
    fn lambda_params_visible_in_body() {
        let out = run("xs = [1]\nxs.map(fn(a)\na * 2\nend)");
        assert_eq!(out[2], "a * 2");
    }

    #[test]
    fn loop_vars_visible_in_body() {
        let out = run("xs = [1]\nfor i, v in xs\nv + i\nend");
        assert_eq!(out[2], "v + i");
    }

    #[test]
    fn test_blocks_are_isolated() {
        let out = run("x = 1\nrats \"t\"\nx\nend");
        // `x` is not visible inside the rats block: shell fallback.
        assert_eq!(out[2], "__shell(\"x\")");
    }

    #[test]
    fn handler_binding_is_known() {
        let out = run("try\n  f()\nor err\n  puts err\nend");
        assert_eq!(out[3], "  puts(err)");
    }

    #[test]
    fn def_params_visible_self_in_methods() {
        let out = run("def Dog.bark()\n  self.name\nend");
        assert_eq!(out[1], "  self.name");
    }
}
