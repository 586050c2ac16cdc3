//! Require-target resolution.
//!
//! `require "path"` can point at a rugo source file, at a directory of
//! rugo source, at a directory of Go source (bridged via the source
//! inspector), or at a remote module. This module owns the pure path
//! logic: entry-point selection for directories, the `with`-clause
//! lookup, and namespace derivation.
//!
//! Source files are accepted under both spellings in
//! [`SOURCE_EXTENSIONS`] — `.rugo`, and the legacy `.rg` kept for
//! backward compatibility — with `.rugo` preferred wherever both exist.
//!
//! Entry-point order for a rugo directory: `<dirname>.rugo`, then
//! `main.rugo`, then the sole source file (each step trying `.rg` after
//! `.rugo`). A `with` clause bypasses the entry point entirely: each
//! listed name resolves on its own, in the directory root first and
//! under `lib/` as the fallback.

use rugo_base::{strip_source_ext, Result, RugoError, SOURCE_EXTENSIONS};
use std::path::{Path, PathBuf};

/// What a require spec resolved into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequireTarget {
    /// A single rugo source file.
    RugoFile(PathBuf),
    /// A Go package directory for the source inspector.
    GoPackage(PathBuf),
}

/// Derives the default namespace for a require path: the file stem of
/// its last segment, with any `@ref` suffix stripped.
pub fn derive_namespace(spec: &str) -> String {
    let base = strip_source_ext(
        spec.trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(spec),
    );
    base.split('@').next().unwrap_or(base).to_string()
}

/// `dir/name.rugo`, falling back to `dir/name.rg`.
fn existing_source_file(dir: &Path, stem: &str) -> Option<PathBuf> {
    SOURCE_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{}.{}", stem, ext)))
        .find(|p| p.is_file())
}

/// Resolves a local require spec relative to the requiring file's
/// directory.
pub fn resolve_local(base_dir: &Path, spec: &str) -> Result<RequireTarget> {
    let candidate = base_dir.join(spec);
    if candidate.is_dir() {
        return resolve_dir(&candidate);
    }
    if candidate.is_file() {
        return Ok(RequireTarget::RugoFile(candidate));
    }
    if let Some(found) = existing_source_file(base_dir, spec) {
        return Ok(RequireTarget::RugoFile(found));
    }
    Err(RugoError::new(format!(
        "cannot require '{}': no such file or directory under {}",
        spec,
        base_dir.display()
    )))
}

/// Resolves a directory: Go packages are detected by the presence of
/// `.go` files; rugo directories pick an entry point.
pub fn resolve_dir(dir: &Path) -> Result<RequireTarget> {
    if !files_with_ext(dir, "go")?.is_empty() {
        return Ok(RequireTarget::GoPackage(dir.to_path_buf()));
    }
    let entry = pick_entry_point(dir)?;
    Ok(RequireTarget::RugoFile(entry))
}

/// `<dirname>.rugo` → `main.rugo` → the sole source file, trying the
/// legacy `.rg` spelling after `.rugo` at each step.
pub fn pick_entry_point(dir: &Path) -> Result<PathBuf> {
    let dirname = dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    if let Some(named) = existing_source_file(dir, dirname) {
        return Ok(named);
    }
    if let Some(main) = existing_source_file(dir, "main") {
        return Ok(main);
    }
    let source_files = source_files_in(dir)?;
    match source_files.as_slice() {
        [sole] => Ok(sole.clone()),
        [] => Err(RugoError::new(format!(
            "cannot require '{}': no rugo source files",
            dir.display()
        ))),
        _ => Err(RugoError::new(format!(
            "cannot require '{}': multiple source files and no entry point \
             ({}.rugo or main.rugo); use 'with' to pick modules",
            dir.display(),
            dirname
        ))),
    }
}

/// `with` clause: each name loads as its own namespace, found in the
/// directory root first, then under `lib/`.
pub fn resolve_with_name(dir: &Path, name: &str) -> Result<PathBuf> {
    if let Some(root) = existing_source_file(dir, name) {
        return Ok(root);
    }
    if let Some(lib) = existing_source_file(&dir.join("lib"), name) {
        return Ok(lib);
    }
    Err(RugoError::new(format!(
        "cannot find module '{}' in {} (looked in the root and lib/)",
        name,
        dir.display()
    )))
}

fn files_with_ext(dir: &Path, ext: &str) -> Result<Vec<PathBuf>> {
    let mut out: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|e| e == ext))
        .collect();
    out.sort();
    Ok(out)
}

/// Source files of either accepted extension, sorted.
fn source_files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut out: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| rugo_base::is_source_path(p))
        .collect();
    out.sort();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn namespace_derivation() {
        assert_eq!(derive_namespace("lib/util"), "util");
        assert_eq!(derive_namespace("tools.rugo"), "tools");
        assert_eq!(derive_namespace("tools.rg"), "tools");
        assert_eq!(derive_namespace("github.com/acme/tools@v1"), "tools");
    }

    #[test]
    fn legacy_rg_extension_resolves() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("old.rg"));
        let t = resolve_local(tmp.path(), "old").unwrap();
        assert_eq!(t, RequireTarget::RugoFile(tmp.path().join("old.rg")));
        let t = resolve_local(tmp.path(), "old.rg").unwrap();
        assert_eq!(t, RequireTarget::RugoFile(tmp.path().join("old.rg")));
    }

    #[test]
    fn rugo_spelling_wins_over_legacy() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("util.rugo"));
        touch(&tmp.path().join("util.rg"));
        let t = resolve_local(tmp.path(), "util").unwrap();
        assert_eq!(t, RequireTarget::RugoFile(tmp.path().join("util.rugo")));
    }

    #[test]
    fn legacy_entry_points_found() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("old");
        touch(&dir.join("main.rg"));
        touch(&dir.join("extra.rg"));
        assert_eq!(pick_entry_point(&dir).unwrap(), dir.join("main.rg"));

        let sole = tmp.path().join("sole");
        touch(&sole.join("only.rg"));
        assert_eq!(pick_entry_point(&sole).unwrap(), sole.join("only.rg"));
    }

    #[test]
    fn with_clause_accepts_legacy_extension() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("pack");
        touch(&dir.join("lib/net.rg"));
        assert_eq!(
            resolve_with_name(&dir, "net").unwrap(),
            dir.join("lib/net.rg")
        );
    }

    #[test]
    fn file_requires_resolve_with_and_without_extension() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("util.rugo"));
        let t = resolve_local(tmp.path(), "util").unwrap();
        assert_eq!(
            t,
            RequireTarget::RugoFile(tmp.path().join("util.rugo"))
        );
        let t = resolve_local(tmp.path(), "util.rugo").unwrap();
        assert_eq!(
            t,
            RequireTarget::RugoFile(tmp.path().join("util.rugo"))
        );
    }

    #[test]
    fn entry_point_prefers_dirname_then_main() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("tools");
        touch(&dir.join("main.rugo"));
        touch(&dir.join("tools.rugo"));
        assert_eq!(pick_entry_point(&dir).unwrap(), dir.join("tools.rugo"));

        fs::remove_file(dir.join("tools.rugo")).unwrap();
        assert_eq!(pick_entry_point(&dir).unwrap(), dir.join("main.rugo"));
    }

    #[test]
    fn sole_rugo_file_is_the_entry_point() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("one");
        touch(&dir.join("only.rugo"));
        assert_eq!(pick_entry_point(&dir).unwrap(), dir.join("only.rugo"));
    }

    #[test]
    fn ambiguous_directory_suggests_with() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("many");
        touch(&dir.join("a.rugo"));
        touch(&dir.join("b.rugo"));
        let err = pick_entry_point(&dir).unwrap_err();
        assert!(err.to_string().contains("with"));
    }

    #[test]
    fn go_directory_detected() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("gopkg");
        touch(&dir.join("lib.go"));
        assert_eq!(
            resolve_dir(&dir).unwrap(),
            RequireTarget::GoPackage(dir.clone())
        );
    }

    #[test]
    fn with_clause_checks_root_then_lib() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("pack");
        touch(&dir.join("fmt.rugo"));
        touch(&dir.join("lib/net.rugo"));
        // `with` bypasses the entry point even though main.rugo exists.
        touch(&dir.join("main.rugo"));
        assert_eq!(resolve_with_name(&dir, "fmt").unwrap(), dir.join("fmt.rugo"));
        assert_eq!(
            resolve_with_name(&dir, "net").unwrap(),
            dir.join("lib/net.rugo")
        );
        assert!(resolve_with_name(&dir, "missing").is_err());
    }
}
