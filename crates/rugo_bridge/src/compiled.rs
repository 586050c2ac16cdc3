//! Compiled-package introspection — the `import` entry point.
//!
//! `import "encoding/hex"` bridges a package the user has no source tree
//! for. Go ships no stable programmatic export-data reader outside the
//! toolchain, so "load export data" is realized by asking the toolchain
//! where the package lives (`go list -json`) and scanning the buildable
//! sources it reports — GOROOT for the standard library, the module
//! cache for third-party packages.
//!
//! Classification is identical to source introspection, but **struct
//! discovery is disabled**: without a local source tree the bridge only
//! exposes the export surface (functions, consts, vars, auto-wraps),
//! which preserves the source/compiled asymmetry of the design.

use crate::inspect::{build_package, go_list, scan_listed_files, GoListLoader};
use crate::registry::BridgedPackage;
use rugo_base::Result;
use std::path::Path;

/// Introspects a compiled package by import path.
///
/// `module_dir` supplies the module context for `go list` resolution of
/// third-party paths; `None` resolves stdlib packages from anywhere.
pub fn inspect_compiled_package(
    import_path: &str,
    namespace: &str,
    module_dir: Option<&Path>,
) -> Result<BridgedPackage> {
    let meta = go_list(import_path, module_dir)?;
    log::debug!(
        "bridge: import {} -> {} (standard: {})",
        import_path,
        meta.dir.display(),
        meta.standard
    );
    let files = scan_listed_files(&meta)?;
    let mut loader = GoListLoader::new(meta.dir.clone());
    build_package(&files, namespace, &meta.import_path, &mut loader, false)
}

/// `true` when the Go toolchain is runnable; used by tests and by the
/// driver's preflight check.
pub fn go_toolchain_available() -> bool {
    std::process::Command::new("go")
        .arg("version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}
