//! Package introspection — the source entry point.
//!
//! `inspect_source_package` takes a directory of Go source, finds the
//! enclosing module manifest (walking parents; a missing `go.mod` is
//! fatal and names the directory searched), scans every non-test file,
//! and drives the shared pipeline:
//!
//! ```text
//! scan files ─▶ classify funcs ─▶ autowrap ─▶ finalize_structs
//!            ─▶ reclassify ─▶ const/var accessors ─▶ registered package
//! ```
//!
//! Dependency types referenced by blocked signatures are resolved with a
//! module-aware loader that shells out to `go list -json` — the analog of
//! the host toolchain's export data. Packages without external
//! references never spawn a subprocess.

use crate::autowrap;
use crate::classify::{classify_result, classify_signature, ClassifyCtx, StringView};
use crate::gosrc::{is_exported, scan_file, GoFile, GoTypeKind};
use crate::gotype::GoType;
use crate::registry::{BridgedFn, BridgedPackage, FnKind, SkippedFn};
use crate::reclassify::reclassify;
use crate::wrappers::{basic_underlying, finalize_structs, import_map_of, DepLoader};
use rugo_base::names::to_snake_case;
use rugo_base::{Result, RugoError};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Walks parent directories looking for `go.mod`; returns its directory
/// and the declared module path.
pub fn find_go_mod(dir: &Path) -> Result<(PathBuf, String)> {
    let mut current = dir.to_path_buf();
    loop {
        let candidate = current.join("go.mod");
        if candidate.is_file() {
            let text = std::fs::read_to_string(&candidate)?;
            let module = text
                .lines()
                .find_map(|l| l.trim().strip_prefix("module "))
                .map(|m| m.trim().to_string())
                .ok_or_else(|| {
                    RugoError::new(format!("{}: missing module directive", candidate.display()))
                })?;
            return Ok((current, module));
        }
        if !current.pop() {
            return Err(RugoError::new(format!(
                "no go.mod found above {}; bridged packages must live in a Go module",
                dir.display()
            )));
        }
    }
}

/// Scans every buildable `.go` file of a directory.
pub fn scan_dir(dir: &Path) -> Result<Vec<GoFile>> {
    let mut files = Vec::new();
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.extension().is_some_and(|e| e == "go")
                && !p
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with("_test.go"))
        })
        .collect();
    entries.sort();
    for path in entries {
        let src = std::fs::read_to_string(&path)?;
        files.push(scan_file(&path.display().to_string(), &src)?);
    }
    if files.is_empty() {
        return Err(RugoError::new(format!(
            "{}: no Go source files",
            dir.display()
        )));
    }
    Ok(files)
}

/// Source introspection of a local Go package directory.
pub fn inspect_source_package(dir: &Path, namespace: &str) -> Result<BridgedPackage> {
    let (mod_root, module) = find_go_mod(dir)?;
    let rel = dir.strip_prefix(&mod_root).unwrap_or(Path::new(""));
    let import_path = if rel.as_os_str().is_empty() {
        module
    } else {
        format!("{}/{}", module, rel.display().to_string().replace('\\', "/"))
    };
    let files = scan_dir(dir)?;
    let mut loader = GoListLoader::new(dir.to_path_buf());
    build_package(&files, namespace, &import_path, &mut loader, true)
}

/// The shared introspection pipeline. `struct_discovery` is off for
/// compiled packages (export surface only, per the source/compiled
/// asymmetry).
pub fn build_package(
    files: &[GoFile],
    namespace: &str,
    import_path: &str,
    loader: &mut dyn DepLoader,
    struct_discovery: bool,
) -> Result<BridgedPackage> {
    let qualifier = files
        .first()
        .map(|f| f.package.clone())
        .unwrap_or_else(|| namespace.to_string());
    let mut pkg = BridgedPackage {
        path: import_path.to_string(),
        namespace: namespace.to_string(),
        qualifier: qualifier.clone(),
        compiled_only: !struct_discovery,
        ..Default::default()
    };
    let mut ctx = build_ctx(files, &qualifier);

    // Auto-wrapped output-buffer pairs replace their workers' signatures.
    let autowraps: HashMap<String, autowrap::AutoWrapSpec> = {
        let all_funcs: Vec<_> = files.iter().flat_map(|f| f.funcs.iter()).cloned().collect();
        autowrap::detect(&all_funcs)
            .into_iter()
            .map(|s| (s.func.clone(), s))
            .collect()
    };

    for func in files.iter().flat_map(|f| f.funcs.iter()) {
        if func.receiver.is_some() || !is_exported(&func.name) {
            continue;
        }
        if func.generic {
            pkg.skipped.push(SkippedFn {
                go_name: func.name.clone(),
                sig: func.sig.clone(),
                reason: "generic function".to_string(),
                doc: func.doc.clone(),
            });
            continue;
        }
        if let Some(spec) = autowraps.get(&func.name) {
            let name = to_snake_case(&func.name);
            pkg.register_fn(
                &name,
                BridgedFn {
                    go_call: format!("{}.{}", qualifier, spec.func),
                    sig: crate::classify::BridgedSig {
                        params: vec![crate::classify::BridgeTag::Str],
                        results: vec![crate::classify::BridgeTag::Str],
                        has_error: false,
                        variadic: false,
                    },
                    kind: FnKind::AutoWrap {
                        sizer: format!("{}.{}", qualifier, spec.sizer),
                        has_error: spec.has_error,
                    },
                    doc: func.doc.clone(),
                    helpers: Vec::new(),
                    emitter: None,
                },
            );
            continue;
        }
        match classify_signature(&func.sig, &ctx) {
            Ok(sig) => {
                let name = to_snake_case(&func.name);
                pkg.register_fn(
                    &name,
                    BridgedFn {
                        go_call: format!("{}.{}", qualifier, func.name),
                        sig,
                        kind: FnKind::Plain,
                        doc: func.doc.clone(),
                        helpers: Vec::new(),
                        emitter: None,
                    },
                );
            }
            Err(reason) => pkg.skipped.push(SkippedFn {
                go_name: func.name.clone(),
                sig: func.sig.clone(),
                reason,
                doc: func.doc.clone(),
            }),
        }
    }

    if struct_discovery {
        finalize_structs(&mut pkg, files, &mut ctx, loader)?;
        let rescued = reclassify(&mut pkg, &ctx);
        log::debug!(
            "bridge: {}: {} functions, {} rescued, {} skipped",
            import_path,
            pkg.functions.len(),
            rescued,
            pkg.skipped.len()
        );
    }

    register_value_accessors(&mut pkg, files, &ctx);
    crate::custom::apply(&mut pkg);

    if pkg.functions.is_empty() {
        return Err(pkg.no_symbols_error());
    }
    Ok(pkg)
}

/// Builds the classifier context from the scanned files: package-local
/// named basics, string-view constructors, and the import map.
fn build_ctx(files: &[GoFile], qualifier: &str) -> ClassifyCtx {
    let mut ctx = ClassifyCtx {
        qualifier: qualifier.to_string(),
        import_paths: import_map_of(files),
        ..Default::default()
    };
    for decl in files.iter().flat_map(|f| f.types.iter()) {
        if !is_exported(&decl.name) || decl.generic {
            continue;
        }
        if let GoTypeKind::Named(t) | GoTypeKind::Alias(t) = &decl.kind {
            if let Some(u) = basic_underlying(t) {
                ctx.own_basics.insert(decl.name.clone(), u);
            }
        }
    }
    // String-view convention: a value struct `Xxx` with `NewXxx(string)`
    // returning `Xxx` or `*Xxx`.
    for func in files.iter().flat_map(|f| f.funcs.iter()) {
        let Some(type_name) = func.name.strip_prefix("New") else {
            continue;
        };
        if func.receiver.is_some()
            || func.generic
            || func.sig.params.len() != 1
            || func.sig.params[0].ty != GoType::named("string")
            || func.sig.results.len() != 1
        {
            continue;
        }
        let is_struct = files.iter().flat_map(|f| f.types.iter()).any(|t| {
            t.name == type_name && matches!(t.kind, GoTypeKind::Struct { .. })
        });
        if !is_struct {
            continue;
        }
        let (ret_name, deref) = match &func.sig.results[0] {
            GoType::Named { pkg: None, name } => (name.as_str(), false),
            GoType::Pointer(inner) => match inner.as_ref() {
                GoType::Named { pkg: None, name } => (name.as_str(), true),
                _ => continue,
            },
            _ => continue,
        };
        if ret_name == type_name {
            ctx.string_views.insert(
                type_name.to_string(),
                StringView {
                    ctor: format!("{}.{}", qualifier, func.name),
                    deref,
                },
            );
        }
    }
    ctx
}

/// Exported package vars and consts become zero-arg accessors. Runs
/// after wrapper synthesis so struct-typed vars wrap into handles.
fn register_value_accessors(pkg: &mut BridgedPackage, files: &[GoFile], ctx: &ClassifyCtx) {
    let qualifier = pkg.qualifier.clone();
    let values: Vec<(bool, crate::gosrc::GoValue)> = files
        .iter()
        .flat_map(|f| {
            f.consts
                .iter()
                .map(|v| (true, v.clone()))
                .chain(f.vars.iter().map(|v| (false, v.clone())))
                .collect::<Vec<_>>()
        })
        .collect();
    for (is_const, value) in values {
        if !is_exported(&value.name) {
            continue;
        }
        let tag = match &value.ty {
            Some(ty) => match classify_result(ty, ctx) {
                Ok(tag) => Some(tag),
                Err(reason) => {
                    log::debug!(
                        "bridge: {}: skipping {} accessor: {}",
                        pkg.path,
                        value.name,
                        reason
                    );
                    continue;
                }
            },
            // Untyped constants convert implicitly when wrapped as any.
            None if is_const => None,
            None => continue,
        };
        let mut helpers = Vec::new();
        if let Some(crate::classify::BridgeTag::Handle { wrapper, .. }) = &tag {
            helpers.push(format!("bridge_wrapper:{}", wrapper));
        }
        let name = to_snake_case(&value.name);
        pkg.register_fn(
            &name,
            BridgedFn {
                go_call: format!("{}.{}", qualifier, value.name),
                sig: crate::classify::BridgedSig {
                    params: vec![],
                    results: tag.clone().into_iter().collect(),
                    has_error: false,
                    variadic: false,
                },
                kind: if is_const {
                    FnKind::ConstAccessor
                } else {
                    FnKind::VarAccessor
                },
                doc: value.doc.clone(),
                helpers,
                emitter: None,
            },
        );
    }
}

// ── go list ─────────────────────────────────────────────────────────────

/// The subset of `go list -json` output the bridge reads.
#[derive(Debug, Clone, Deserialize)]
pub struct GoListPackage {
    #[serde(rename = "Dir")]
    pub dir: PathBuf,
    #[serde(rename = "ImportPath")]
    pub import_path: String,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "GoFiles", default)]
    pub go_files: Vec<String>,
    #[serde(rename = "Standard", default)]
    pub standard: bool,
}

/// Runs `go list -json <path>`, optionally from a working directory
/// (module context).
pub fn go_list(import_path: &str, cwd: Option<&Path>) -> Result<GoListPackage> {
    let mut cmd = Command::new("go");
    cmd.args(["list", "-json", import_path]);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    let output = cmd
        .output()
        .map_err(|e| RugoError::new(format!("cannot run go list: {}", e)))?;
    if !output.status.success() {
        return Err(RugoError::new(format!(
            "go list {} failed: {}",
            import_path,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    serde_json::from_slice(&output.stdout)
        .map_err(|e| RugoError::new(format!("go list {}: bad json: {}", import_path, e)))
}

/// Dependency loader backed by `go list`, caching scanned packages.
pub struct GoListLoader {
    cwd: PathBuf,
    cache: HashMap<String, Vec<GoFile>>,
}

impl GoListLoader {
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            cwd,
            cache: HashMap::new(),
        }
    }
}

impl DepLoader for GoListLoader {
    fn load(&mut self, import_path: &str) -> Result<Vec<GoFile>> {
        if let Some(files) = self.cache.get(import_path) {
            return Ok(files.clone());
        }
        let meta = go_list(import_path, Some(&self.cwd))?;
        let files = scan_listed_files(&meta)?;
        self.cache.insert(import_path.to_string(), files.clone());
        Ok(files)
    }
}

/// Scans exactly the files `go list` reports as buildable.
pub fn scan_listed_files(meta: &GoListPackage) -> Result<Vec<GoFile>> {
    let mut files = Vec::new();
    for name in &meta.go_files {
        let path = meta.dir.join(name);
        let src = std::fs::read_to_string(&path)?;
        files.push(scan_file(&path.display().to_string(), &src)?);
    }
    if files.is_empty() {
        files = scan_dir(&meta.dir)?;
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wrappers::NoDeps;
    use std::fs;

    fn write_pkg(dir: &Path, gomod: &str, files: &[(&str, &str)]) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join("go.mod"), gomod).unwrap();
        for (name, src) in files {
            fs::write(dir.join(name), src).unwrap();
        }
    }

    #[test]
    fn missing_go_mod_is_fatal_and_names_dir() {
        let tmp = tempfile::tempdir().unwrap();
        // tempdirs live under the system temp root, which has no go.mod
        // all the way up in any sane environment.
        let deep = tmp.path().join("a/b");
        fs::create_dir_all(&deep).unwrap();
        let err = find_go_mod(&deep).unwrap_err();
        assert!(err.to_string().contains("no go.mod found above"));
        assert!(err.to_string().contains("a/b"));
    }

    #[test]
    fn inspects_self_contained_package_without_toolchain() {
        let tmp = tempfile::tempdir().unwrap();
        write_pkg(
            tmp.path(),
            "module example.com/mathx\n\ngo 1.22\n",
            &[(
                "mathx.go",
                "package mathx\n\n\
                 // Double doubles.\n\
                 func Double(n int) int { return n * 2 }\n\
                 func Scale(xs []string, factor float64) []string { return xs }\n\
                 func Watch(c chan int) {}\n\
                 const Version = \"1.0\"\n\
                 var MaxDepth int = 8\n",
            )],
        );
        let pkg = inspect_source_package(tmp.path(), "mathx").unwrap();
        assert_eq!(pkg.path, "example.com/mathx");
        assert!(pkg.functions.contains_key("double"));
        assert!(pkg.functions.contains_key("scale"));
        assert!(pkg.functions.contains_key("version"));
        assert!(pkg.functions.contains_key("max_depth"));
        assert_eq!(pkg.functions["double"].doc, "Double doubles.");
        assert!(pkg
            .skipped
            .iter()
            .any(|s| s.go_name == "Watch" && s.reason.contains("channel")));
    }

    #[test]
    fn structs_and_methods_bridge_from_source() {
        let tmp = tempfile::tempdir().unwrap();
        write_pkg(
            tmp.path(),
            "module example.com/srv\n",
            &[(
                "srv.go",
                "package srv\n\n\
                 type Server struct {\n\tHost string\n\tPort int\n}\n\n\
                 func (s *Server) Listen() error { return nil }\n\
                 func Dial(s *Server) error { return nil }\n",
            )],
        );
        let pkg = inspect_source_package(tmp.path(), "srv").unwrap();
        // Constructor for the struct plus the reclassified Dial.
        assert!(pkg.functions.contains_key("server"));
        assert!(pkg.functions.contains_key("dial"));
        let s = &pkg.structs[0];
        assert!(s.methods.contains_key("listen"));
        assert!(pkg.helpers.keys().any(|k| k.starts_with("bridge_wrapper:")));
    }

    #[test]
    fn empty_export_surface_is_fatal_with_report() {
        let files = vec![scan_file(
            "t.go",
            "package nope\nfunc Only(c chan int) {}\n",
        )
        .unwrap()];
        let err =
            build_package(&files, "nope", "example.com/nope", &mut NoDeps, true).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("no bridgeable functions"));
        assert!(msg.contains("- Only"));
    }

    #[test]
    fn string_view_constructor_detected() {
        let files = vec![scan_file(
            "t.go",
            "package ip\n\
             type Addr struct {\n\thi uint64\n\tlo uint64\n}\n\
             func NewAddr(s string) Addr { return Addr{} }\n\
             func Mask(a Addr, bits int) Addr { return a }\n",
        )
        .unwrap()];
        let pkg = build_package(&files, "ip", "example.com/ip", &mut NoDeps, true).unwrap();
        // Mask's Addr parameter classifies through the constructor; it
        // must not be blocked.
        assert!(pkg.functions.contains_key("mask"));
    }
}
