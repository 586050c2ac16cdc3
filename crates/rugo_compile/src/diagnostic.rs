//! Translating `go build` output back to Rugo source positions.
//!
//! The code generator plants a `//line file.rugo:N` directive before
//! every statement, so the Go toolchain already reports most errors in
//! Rugo coordinates — this module parses the `file:line:col: message`
//! stderr shape, keeps the diagnostics that landed in `.rugo` files, and
//! demotes anything still pointing at generated Go to an internal error
//! (a compiler bug: we promise never to emit broken host source).

use rugo_base::RugoError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoDiagnostic {
    pub file: String,
    pub line: u32,
    pub column: Option<u32>,
    pub message: String,
}

/// Parses `go build` stderr lines of the form `file:line[:col]: message`.
pub fn parse_go_errors(stderr: &str) -> Vec<GoDiagnostic> {
    let mut out = Vec::new();
    for line in stderr.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(diag) = parse_line(line) {
            out.push(diag);
        }
    }
    out
}

fn parse_line(line: &str) -> Option<GoDiagnostic> {
    // Split as path:line[:col]: message — the path may contain colons on
    // exotic platforms, so scan for the first `:<digits>:` group.
    let mut search_from = 0;
    while let Some(rel) = line[search_from..].find(':') {
        let colon = search_from + rel;
        let rest = &line[colon + 1..];
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if digits_end > 0 && rest[digits_end..].starts_with(':') {
            let file = line[..colon].to_string();
            let line_no: u32 = rest[..digits_end].parse().ok()?;
            let tail = &rest[digits_end + 1..];
            // Optional column.
            let (column, message) = match tail.split_once(':') {
                Some((maybe_col, msg)) if maybe_col.bytes().all(|b| b.is_ascii_digit()) => {
                    (maybe_col.parse().ok(), msg.trim().to_string())
                }
                _ => (None, tail.trim().to_string()),
            };
            if message.is_empty() {
                return None;
            }
            return Some(GoDiagnostic {
                file,
                line: line_no,
                column,
                message,
            });
        }
        search_from = colon + 1;
    }
    None
}

/// Reduces toolchain diagnostics to one error. Diagnostics in rugo
/// source files (either accepted extension) surface as user errors at
/// the original position; anything else means the generated Go was
/// broken, which is an internal error.
pub fn to_build_error(stderr: &str) -> RugoError {
    let diags = parse_go_errors(stderr);
    if let Some(diag) = diags
        .iter()
        .find(|d| rugo_base::has_source_suffix(&d.file))
    {
        return RugoError::at(diag.message.clone(), diag.file.clone(), diag.line);
    }
    if let Some(diag) = diags.first() {
        return RugoError::internal(format!(
            "generated Go failed to compile at {}:{}: {}",
            diag.file, diag.line, diag.message
        ));
    }
    RugoError::internal(format!("go build failed: {}", stderr.trim()))
}
