//! Source units flowing through one build.
//!
//! A [`SourceUnit`] is a single `.rugo` file together with everything the
//! preprocessor learned about it: the canonical rewritten text, the
//! [`LineMap`] back to the raw text, and the struct declarations the
//! lowering pass discovered. The compiler driver owns all units for the
//! lifetime of a build; nothing in a unit outlives it.

use crate::line_map::LineMap;
use std::path::Path;

/// Accepted source-file extensions, preferred first: `.rugo`, plus the
/// legacy `.rg` kept for backward compatibility. Every place that
/// discovers or resolves source files goes through this table so the two
/// spellings can never drift apart.
pub const SOURCE_EXTENSIONS: &[&str] = &["rugo", "rg"];

/// Returns `true` when the path carries an accepted source extension.
pub fn is_source_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SOURCE_EXTENSIONS.contains(&e))
}

/// Returns `true` when a textual path ends in an accepted source
/// extension (`app.rugo`, `app.rg`).
pub fn has_source_suffix(name: &str) -> bool {
    SOURCE_EXTENSIONS
        .iter()
        .any(|ext| name.ends_with(&format!(".{}", ext)))
}

/// Strips an accepted source extension (`util.rg` → `util`); other names
/// pass through unchanged.
pub fn strip_source_ext(name: &str) -> &str {
    for ext in SOURCE_EXTENSIONS {
        if let Some(stem) = name.strip_suffix(&format!(".{}", ext)) {
            return stem;
        }
    }
    name
}

/// A struct declaration discovered by the preprocessor's lowering pass.
///
/// After lowering, the rest of the pipeline never sees `struct` syntax:
/// the constructor is an ordinary function and methods are ordinary
/// functions taking an explicit `self`. The descriptor preserves what the
/// surface syntax said so the code generator can register dot-dispatch
/// methods and `doc` can attribute comments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructDescriptor {
    /// Surface type name (`Dog`).
    pub name: String,
    /// Field names in declaration order.
    pub fields: Vec<String>,
    /// Method names declared as `def Name.method`.
    pub methods: Vec<String>,
    /// 1-based line of the `struct` keyword in the original source.
    pub line: u32,
}

/// One source file, raw and preprocessed, with provenance.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    /// Path as the user spelled it (used verbatim in diagnostics).
    pub path: String,
    /// Raw text as read from disk.
    pub raw: String,
    /// Canonical text after all preprocessor passes.
    pub preprocessed: String,
    /// Maps preprocessed lines back to raw lines.
    pub line_map: LineMap,
    /// Structs lowered out of this file.
    pub structs: Vec<StructDescriptor>,
}

impl SourceUnit {
    /// Creates a unit that has not been preprocessed yet.
    pub fn new(path: impl Into<String>, raw: impl Into<String>) -> Self {
        let raw = raw.into();
        Self {
            path: path.into(),
            line_map: LineMap::identity(raw.lines().count()),
            preprocessed: String::new(),
            structs: Vec::new(),
            raw,
        }
    }

    /// Resolves a 0-based preprocessed line to the original 1-based line.
    pub fn original_line(&self, preprocessed: usize) -> u32 {
        self.line_map.lookup(preprocessed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_unit_starts_with_identity_map() {
        let unit = SourceUnit::new("main.rugo", "a = 1\nputs a\n");
        assert_eq!(unit.original_line(0), 1);
        assert_eq!(unit.original_line(1), 2);
        assert!(unit.structs.is_empty());
    }

    #[test]
    fn both_source_extensions_accepted() {
        assert!(is_source_path(Path::new("app.rugo")));
        assert!(is_source_path(Path::new("app.rg")));
        assert!(!is_source_path(Path::new("app.go")));
        assert!(has_source_suffix("lib/util.rg"));
        assert!(!has_source_suffix("lib/util.rgx"));
    }

    #[test]
    fn source_ext_strips_either_spelling() {
        assert_eq!(strip_source_ext("tools.rugo"), "tools");
        assert_eq!(strip_source_ext("tools.rg"), "tools");
        assert_eq!(strip_source_ext("tools"), "tools");
        assert_eq!(strip_source_ext("cargo"), "cargo");
    }
}
