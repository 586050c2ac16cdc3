//! `rugo doc` — documentation extracted from `#` comments.
//!
//! Doc extraction works on the **raw** source, before the preprocessor's
//! comment strip destroys the comments: a block of `#` lines immediately
//! preceding a `def` or `struct` (no blank line between) documents that
//! symbol, and a leading `#` block before any code is the file-level
//! doc. Output is plain text; headers are bold unless `NO_COLOR` is set.

use rugo_base::{Result, RugoError};
use std::path::Path;

/// One documented symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocEntry {
    /// `greet`, `Dog`, or `Dog.bark`.
    pub symbol: String,
    /// `def` or `struct`.
    pub kind: &'static str,
    pub doc: String,
    pub line: u32,
}

/// Extracts the file-level doc and per-symbol docs from raw source.
pub fn extract_docs(raw: &str) -> (String, Vec<DocEntry>) {
    let mut file_doc: Vec<String> = Vec::new();
    let mut file_doc_done = false;
    let mut pending: Vec<String> = Vec::new();
    let mut entries = Vec::new();

    for (i, line) in raw.lines().enumerate() {
        let trimmed = line.trim();
        if let Some(text) = trimmed.strip_prefix('#') {
            pending.push(text.trim_start().to_string());
            continue;
        }
        if trimmed.is_empty() {
            // A blank line ends the file-level block and detaches any
            // pending comment from whatever follows.
            if !file_doc_done && !pending.is_empty() {
                file_doc = std::mem::take(&mut pending);
                file_doc_done = true;
            }
            pending.clear();
            continue;
        }
        file_doc_done = true;
        if !pending.is_empty() {
            if let Some((kind, symbol)) = symbol_of(trimmed) {
                entries.push(DocEntry {
                    symbol,
                    kind,
                    doc: pending.join("\n"),
                    line: i as u32 + 1,
                });
            }
        }
        pending.clear();
    }
    // A comment block right at the top with no code after the block and
    // no blank separator is still the file doc.
    if !file_doc_done && !pending.is_empty() {
        file_doc = pending;
    }
    (file_doc.join("\n"), entries)
}

fn symbol_of(line: &str) -> Option<(&'static str, String)> {
    if let Some(rest) = line.strip_prefix("def ") {
        let name = rest
            .split(|c: char| c == '(' || c.is_whitespace())
            .next()
            .unwrap_or("");
        if !name.is_empty() {
            return Some(("def", name.to_string()));
        }
    }
    if let Some(rest) = line.strip_prefix("struct ") {
        let name = rest.trim();
        if !name.is_empty() {
            return Some(("struct", name.to_string()));
        }
    }
    None
}

fn bold(text: &str) -> String {
    if std::env::var_os("NO_COLOR").is_some() {
        text.to_string()
    } else {
        format!("\x1b[1m{}\x1b[0m", text)
    }
}

/// `rugo doc [file[:symbol]]`.
pub fn run_doc(target: Option<&str>) -> Result<i32> {
    let Some(target) = target else {
        return Err(RugoError::new("doc: pass a file, e.g. 'rugo doc app.rugo'"));
    };
    let (file, symbol) = match target.rsplit_once(':') {
        Some((file, symbol)) if rugo_base::has_source_suffix(file) => (file, Some(symbol)),
        _ => (target, None),
    };
    let raw = std::fs::read_to_string(Path::new(file))
        .map_err(|e| RugoError::new(format!("cannot read {}: {}", file, e)))?;
    let (file_doc, entries) = extract_docs(&raw);

    match symbol {
        Some(symbol) => {
            let entry = entries
                .iter()
                .find(|e| e.symbol == symbol)
                .ok_or_else(|| {
                    RugoError::new(format!("no documented symbol '{}' in {}", symbol, file))
                })?;
            println!("{}", bold(&format!("{} {}", entry.kind, entry.symbol)));
            println!("{}", entry.doc);
        }
        None => {
            if !file_doc.is_empty() {
                println!("{}", file_doc);
                println!();
            }
            for entry in &entries {
                println!("{}", bold(&format!("{} {}", entry.kind, entry.symbol)));
                println!("{}", entry.doc);
                println!();
            }
            if file_doc.is_empty() && entries.is_empty() {
                println!("{}: no documentation comments", file);
            }
        }
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_doc_is_the_leading_block() {
        let src = "# My tool.\n# Does things.\n\nputs 1\n";
        let (file_doc, entries) = extract_docs(src);
        assert_eq!(file_doc, "My tool.\nDoes things.");
        assert!(entries.is_empty());
    }

    #[test]
    fn def_doc_requires_no_blank_gap() {
        let src = "# Greets.\ndef greet(name)\nend\n\n# Orphan.\n\ndef other()\nend\n";
        let (_, entries) = extract_docs(src);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].symbol, "greet");
        assert_eq!(entries[0].doc, "Greets.");
    }

    #[test]
    fn struct_and_method_docs() {
        let src = "\nx = 1\n# A dog.\nstruct Dog\n  name\nend\n# Barks.\ndef Dog.bark()\nend\n";
        let (_, entries) = extract_docs(src);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].symbol, "Dog");
        assert_eq!(entries[0].kind, "struct");
        assert_eq!(entries[1].symbol, "Dog.bark");
    }

    #[test]
    fn leading_block_before_def_is_symbol_doc_not_file_doc() {
        let src = "# Adds.\ndef add(a, b)\nend\n";
        let (file_doc, entries) = extract_docs(src);
        assert!(file_doc.is_empty());
        assert_eq!(entries[0].symbol, "add");
    }
}
