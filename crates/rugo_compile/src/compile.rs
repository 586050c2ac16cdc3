//! The compiler driver: load → preprocess → parse → resolve modules →
//! generate Go → invoke the Go toolchain.
//!
//! # Pipeline
//!
//! ```text
//! entry.rugo
//!   ├─ preprocess (canonical text + line map + structs)
//!   ├─ parse
//!   ├─ resolve: use → stdlib registry
//!   │           import → compiled inspector (lazy, per path)
//!   │           require → files / Go packages / remote modules
//!   ├─ codegen (one Go file, //line directives)
//!   ├─ synthesize go.mod (replace directives for local Go modules)
//!   └─ go build (errors mapped back through the line directives)
//! ```
//!
//! Namespace conflicts (the same name claimed by two of use / import /
//! require) abort with a message asking for an `as` rename. The bridge
//! registry lives inside one [`BuildOptions`]-driven call; nothing
//! survives between builds.

use crate::codegen::{codegen_program, CodegenInput, EmitMode, RequiredUnit};
use crate::diagnostic::to_build_error;
use crate::fetch::{fetch_remote, parse_remote};
use crate::lockfile::{Lockfile, LOCKFILE_NAME};
use crate::modules::{self, StdlibModule};
use crate::resolve::{derive_namespace, resolve_dir, resolve_local, resolve_with_name, RequireTarget};
use rugo_base::{Result, RugoError, SourceUnit};
use rugo_bridge::{inspect_source_package, BridgeRegistry};
use rugo_language::ast::{Program, Stmt};
use rugo_language::parse_program;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Refuse the network; every remote module must be pinned.
    pub frozen: bool,
    /// Re-fetch branch-pinned remote modules (`mod update`).
    pub update: bool,
    pub mode: EmitMode,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            frozen: false,
            update: false,
            mode: EmitMode::Program,
        }
    }
}

/// Everything a build produced before the toolchain runs.
#[derive(Debug)]
pub struct Emitted {
    pub go_source: String,
    pub go_mod: String,
    pub lockfile: Lockfile,
    /// Local Go modules referenced via `replace` directives.
    pub local_modules: Vec<(String, PathBuf)>,
}

/// Compiles an entry file from disk. Persists the lockfile next to the
/// entry when remote resolution changed it.
pub fn compile_entry(entry: &Path, opts: &BuildOptions) -> Result<Emitted> {
    let src = std::fs::read_to_string(entry)
        .map_err(|e| RugoError::new(format!("cannot read {}: {}", entry.display(), e)))?;
    let base_dir = entry.parent().unwrap_or(Path::new(".")).to_path_buf();
    let lock_path = base_dir.join(LOCKFILE_NAME);
    let lockfile = Lockfile::load(&lock_path)?;
    let emitted = compile_source(&entry.display().to_string(), &src, &base_dir, lockfile, opts)?;
    if emitted.lockfile.dirty && !opts.frozen {
        emitted.lockfile.save(&lock_path)?;
        log::debug!("updated {}", lock_path.display());
    }
    Ok(emitted)
}

/// Compiles source text (the entry file's content) with requires
/// resolved relative to `base_dir`.
pub fn compile_source(
    path: &str,
    src: &str,
    base_dir: &Path,
    lockfile: Lockfile,
    opts: &BuildOptions,
) -> Result<Emitted> {
    let unit = preprocess_unit(path, src)?;
    let program = parse_program(path, &unit.preprocessed, &unit.line_map)?;

    let mut resolver = Resolver {
        opts,
        registry: BridgeRegistry::new(),
        stdlib: BTreeMap::new(),
        required: Vec::new(),
        claimed: HashMap::new(),
        seen_files: HashSet::new(),
        local_modules: Vec::new(),
        lockfile,
    };
    resolver.process(&program, base_dir, path)?;

    let input = CodegenInput {
        program: &program,
        structs: &unit.structs,
        required: &resolver.required,
        stdlib: resolver.stdlib.clone(),
        bridged: &resolver.registry,
        mode: opts.mode,
    };
    let go_source = codegen_program(&input)?;
    let go_mod = synthesize_go_mod(&resolver.local_modules);
    Ok(Emitted {
        go_source,
        go_mod,
        lockfile: resolver.lockfile,
        local_modules: resolver.local_modules,
    })
}

fn preprocess_unit(path: &str, src: &str) -> Result<SourceUnit> {
    let output = rugo_preproc::preprocess(path, src)?;
    let mut unit = SourceUnit::new(path, src);
    unit.preprocessed = output.text;
    unit.line_map = output.line_map;
    unit.structs = output.structs;
    Ok(unit)
}

struct Resolver<'a> {
    opts: &'a BuildOptions,
    registry: BridgeRegistry,
    stdlib: BTreeMap<String, &'static StdlibModule>,
    required: Vec<RequiredUnit>,
    /// namespace → how it was claimed, for conflict messages.
    claimed: HashMap<String, String>,
    seen_files: HashSet<PathBuf>,
    local_modules: Vec<(String, PathBuf)>,
    lockfile: Lockfile,
}

impl Resolver<'_> {
    fn claim(&mut self, ns: &str, how: String, path: &str, line: u32) -> Result<bool> {
        if let Some(existing) = self.claimed.get(ns) {
            if *existing == how {
                return Ok(false); // same declaration again: deduplicate
            }
            return Err(RugoError::at(
                format!(
                    "namespace '{}' is claimed twice ({} and {}); rename one side with 'as'",
                    ns, existing, how
                ),
                path,
                line,
            ));
        }
        self.claimed.insert(ns.to_string(), how);
        Ok(true)
    }

    fn process(&mut self, program: &Program, base_dir: &Path, path: &str) -> Result<()> {
        reject_nested_declarations(program)?;
        for stmt in &program.stmts {
            match stmt {
                Stmt::Use { name, line } => {
                    let module = modules::lookup(name).ok_or_else(|| {
                        RugoError::at(format!("unknown module '{}'", name), path, *line)
                    })?;
                    if self.claim(name, format!("use \"{}\"", name), path, *line)? {
                        self.stdlib.insert(name.clone(), module);
                    }
                }
                Stmt::Import {
                    path: pkg_path,
                    alias,
                    line,
                } => {
                    let ns = alias.clone().unwrap_or_else(|| {
                        pkg_path.rsplit('/').next().unwrap_or(pkg_path).to_string()
                    });
                    let how = format!("import \"{}\"", pkg_path);
                    if !self.claim(&ns, how, path, *line)? {
                        continue;
                    }
                    if self.registry.by_path(pkg_path).is_some() {
                        continue;
                    }
                    let pkg =
                        rugo_bridge::inspect_compiled_package(pkg_path, &ns, None)
                            .map_err(|e| e.with_position(path, *line))?;
                    self.registry.register(pkg)?;
                }
                Stmt::Require {
                    path: spec,
                    alias,
                    with,
                    line,
                } => {
                    self.require(spec, alias.as_deref(), with, base_dir, path, *line)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn require(
        &mut self,
        spec: &str,
        alias: Option<&str>,
        with: &[String],
        base_dir: &Path,
        path: &str,
        line: u32,
    ) -> Result<()> {
        // Remote modules fetch into the cache, then resolve like a local
        // directory.
        let (target_dir, target): (PathBuf, Option<RequireTarget>) =
            if let Some(remote) = parse_remote(spec) {
                let (dir, label, sha) = fetch_remote(
                    &remote,
                    &mut self.lockfile,
                    self.opts.frozen,
                    self.opts.update,
                )
                .map_err(|e| e.with_position(path, line))?;
                log::debug!("require {} -> {} ({} {})", spec, dir.display(), label, sha);
                // A `with` clause bypasses entry-point selection entirely.
                let resolved = if with.is_empty() {
                    Some(resolve_dir(&dir)?)
                } else {
                    None
                };
                (dir, resolved)
            } else if !with.is_empty() {
                // The `with` clause needs the directory itself.
                let dir = base_dir.join(spec);
                if !dir.is_dir() {
                    return Err(RugoError::at(
                        format!("cannot require '{}': not a directory", spec),
                        path,
                        line,
                    ));
                }
                (dir, None)
            } else {
                let target = resolve_local(base_dir, spec)
                    .map_err(|e| e.with_position(path, line))?;
                (base_dir.to_path_buf(), Some(target))
            };

        // `with name1, name2` loads each name as its own namespace and
        // bypasses the entry point.
        if !with.is_empty() {
            for name in with {
                let file = resolve_with_name(&target_dir, name)
                    .map_err(|e| e.with_position(path, line))?;
                self.claim(name, format!("require \"{}\" with {}", spec, name), path, line)?;
                self.load_rugo_file(&file, name)?;
            }
            return Ok(());
        }

        let ns = alias
            .map(|a| a.to_string())
            .unwrap_or_else(|| derive_namespace(spec));
        let Some(target) = target else {
            return Err(RugoError::internal(format!(
                "require '{}' resolved no target",
                spec
            )));
        };
        match target {
            RequireTarget::GoPackage(dir) => {
                if !self.claim(&ns, format!("require \"{}\"", spec), path, line)? {
                    return Ok(());
                }
                let pkg = inspect_source_package(&dir, &ns)
                    .map_err(|e| e.with_position(path, line))?;
                self.registry.register(pkg)?;
                let (mod_root, module) = rugo_bridge::inspect::find_go_mod(&dir)?;
                if !self.local_modules.iter().any(|(m, _)| *m == module) {
                    self.local_modules.push((module, mod_root));
                }
            }
            RequireTarget::RugoFile(file) => {
                let canonical = file.canonicalize().unwrap_or(file.clone());
                if !self.claim(&ns, format!("require \"{}\"", spec), path, line)? {
                    return Ok(());
                }
                if !self.seen_files.insert(canonical) {
                    return Ok(());
                }
                self.load_rugo_file(&file, &ns)?;
            }
        }
        Ok(())
    }

    fn load_rugo_file(&mut self, file: &Path, ns: &str) -> Result<()> {
        let src = std::fs::read_to_string(file)
            .map_err(|e| RugoError::new(format!("cannot read {}: {}", file.display(), e)))?;
        let file_path = file.display().to_string();
        let unit = preprocess_unit(&file_path, &src)?;
        let program = parse_program(&file_path, &unit.preprocessed, &unit.line_map)?;
        // Resolve the unit's own declarations first so its dependencies'
        // top-level code runs before it does.
        let child_base = file.parent().unwrap_or(Path::new(".")).to_path_buf();
        self.process(&program, &child_base, &file_path)?;
        self.required.push(RequiredUnit {
            namespace: ns.to_string(),
            program,
            structs: unit.structs,
        });
        Ok(())
    }
}

/// Namespace declarations must sit at the program's top level.
fn reject_nested_declarations(program: &Program) -> Result<()> {
    fn check(stmts: &[Stmt], path: &str, top: bool) -> Result<()> {
        for stmt in stmts {
            match stmt {
                Stmt::Use { line, .. } | Stmt::Import { line, .. } | Stmt::Require { line, .. }
                    if !top =>
                {
                    return Err(RugoError::at(
                        "use/import/require must be at the top level",
                        path,
                        *line,
                    ));
                }
                Stmt::FuncDef(def) => check(&def.body, path, false)?,
                Stmt::If {
                    arms, else_body, ..
                } => {
                    for arm in arms {
                        check(&arm.body, path, false)?;
                    }
                    check(else_body, path, false)?;
                }
                Stmt::While { body, .. }
                | Stmt::For { body, .. }
                | Stmt::Rats { body, .. }
                | Stmt::Bench { body, .. } => check(body, path, false)?,
                _ => {}
            }
        }
        Ok(())
    }
    check(&program.stmts, &program.path, true)
}

fn synthesize_go_mod(local_modules: &[(String, PathBuf)]) -> String {
    let mut out = String::from("module rugo_program\n\ngo 1.22\n");
    for (module, dir) in local_modules {
        out.push_str(&format!("\nrequire {} v0.0.0\n", module));
        out.push_str(&format!(
            "replace {} => {}\n",
            module,
            dir.display()
        ));
    }
    out
}

// ── toolchain invocation ────────────────────────────────────────────────

/// Stable per-entry build directory under the system temp dir.
pub fn build_dir_for(entry: &Path) -> PathBuf {
    let canonical = entry
        .canonicalize()
        .unwrap_or_else(|_| entry.to_path_buf());
    let mut hash: u64 = 5381;
    for b in canonical.display().to_string().bytes() {
        hash = hash.wrapping_mul(33) ^ u64::from(b);
    }
    std::env::temp_dir().join(format!("rugo-build-{:016x}", hash))
}

/// Writes the emitted program and manifest into the build directory.
pub fn write_build_dir(entry: &Path, emitted: &Emitted) -> Result<PathBuf> {
    let dir = build_dir_for(entry);
    std::fs::create_dir_all(&dir)?;
    std::fs::write(dir.join("main.go"), &emitted.go_source)?;
    std::fs::write(dir.join("go.mod"), &emitted.go_mod)?;
    Ok(dir)
}

/// Compiles an entry file all the way to a native binary.
pub fn build_binary(entry: &Path, opts: &BuildOptions, output: Option<&Path>) -> Result<PathBuf> {
    if !rugo_bridge::go_toolchain_available() {
        return Err(RugoError::new(
            "the Go toolchain is required to build rugo programs (https://go.dev/dl)",
        ));
    }
    let emitted = compile_entry(entry, opts)?;
    let dir = write_build_dir(entry, &emitted)?;

    // Let the toolchain resolve transitive host dependencies normally.
    let tidy = Command::new("go")
        .args(["mod", "tidy"])
        .current_dir(&dir)
        .output()
        .map_err(|e| RugoError::new(format!("cannot run go: {}", e)))?;
    if !tidy.status.success() {
        log::warn!(
            "go mod tidy: {}",
            String::from_utf8_lossy(&tidy.stderr).trim()
        );
    }

    let out_path = match output {
        Some(path) => path.to_path_buf(),
        None => {
            let stem = entry
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("rugo_out");
            PathBuf::from(stem)
        }
    };
    let out_abs = if out_path.is_absolute() {
        out_path.clone()
    } else {
        std::env::current_dir()?.join(&out_path)
    };

    let build = Command::new("go")
        .args(["build", "-o"])
        .arg(&out_abs)
        .arg(".")
        .current_dir(&dir)
        .output()
        .map_err(|e| RugoError::new(format!("cannot run go: {}", e)))?;
    if !build.status.success() {
        return Err(to_build_error(&String::from_utf8_lossy(&build.stderr)));
    }
    log::debug!("built {}", out_abs.display());
    Ok(out_abs)
}

/// Builds and runs an entry file; returns the program's exit code.
pub fn run_entry(entry: &Path, opts: &BuildOptions, args: &[String]) -> Result<i32> {
    let dir = build_dir_for(entry);
    std::fs::create_dir_all(&dir)?;
    let bin = dir.join("program");
    build_binary(entry, opts, Some(&bin))?;
    let status = Command::new(&bin)
        .args(args)
        .status()
        .map_err(|e| RugoError::new(format!("cannot run {}: {}", bin.display(), e)))?;
    Ok(status.code().unwrap_or(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emit(src: &str) -> String {
        compile_source(
            "test.rugo",
            src,
            Path::new("."),
            Lockfile::default(),
            &BuildOptions::default(),
        )
        .unwrap()
        .go_source
    }

    fn emit_err(src: &str) -> RugoError {
        compile_source(
            "test.rugo",
            src,
            Path::new("."),
            Lockfile::default(),
            &BuildOptions::default(),
        )
        .unwrap_err()
    }

    #[test]
    fn hello_world_emits_main_with_recover() {
        let go = emit("puts \"hello\"\n");
        assert!(go.contains("package main"));
        assert!(go.contains("func main() {"));
        assert!(go.contains("rugoBacktrace(r)"));
        assert!(go.contains("rugoPuts(\"hello\")"));
        assert!(go.contains("//line test.rugo:1"));
    }

    #[test]
    fn unknown_module_is_fatal() {
        let err = emit_err("use \"nope\"\n");
        assert!(err.to_string().contains("unknown module 'nope'"));
        assert_eq!(err.line, 1);
    }

    #[test]
    fn stdlib_module_instance_and_call() {
        let go = emit("use \"conv\"\nx = conv.to_i(\"42\")\nputs x\n");
        assert!(go.contains("var mod_conv = &RugoConv{}"));
        assert!(go.contains("mod_conv.ToI(\"42\")"));
        assert!(go.contains("type RugoConv struct{}"));
        // Module runtime prelude must be stripped.
        assert_eq!(go.matches("package ").count(), 1);
    }

    #[test]
    fn namespace_conflict_reports_both_sides() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("conv.rugo"), "def helper()\nend\n").unwrap();
        let err = compile_source(
            "test.rugo",
            "use \"conv\"\nrequire \"conv\"\n",
            tmp.path(),
            Lockfile::default(),
            &BuildOptions::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("claimed twice"));
        assert!(err.to_string().contains("'as'"));
    }

    #[test]
    fn nested_declaration_rejected() {
        let err = emit_err("def f()\n  use \"conv\"\nend\n");
        assert!(err.to_string().contains("top level"));
    }

    #[test]
    fn required_file_functions_are_namespaced() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("util.rugo"),
            "def pad(s)\n  return s + \"!\"\nend\n",
        )
        .unwrap();
        let emitted = compile_source(
            "main.rugo",
            "require \"util\"\nputs util.pad(\"hi\")\n",
            tmp.path(),
            Lockfile::default(),
            &BuildOptions::default(),
        )
        .unwrap();
        assert!(emitted.go_source.contains("func u_util_pad(v_s any) any"));
        assert!(emitted.go_source.contains("u_util_pad(\"hi\")"));
    }

    #[test]
    fn required_legacy_extension_file_compiles() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("util.rg"),
            "def pad(s)\n  return s + \"!\"\nend\n",
        )
        .unwrap();
        let emitted = compile_source(
            "main.rugo",
            "require \"util\"\nputs util.pad(\"hi\")\n",
            tmp.path(),
            Lockfile::default(),
            &BuildOptions::default(),
        )
        .unwrap();
        assert!(emitted.go_source.contains("func u_util_pad(v_s any) any"));
    }

    #[test]
    fn wrong_arity_for_required_function() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("util.rugo"), "def pad(s)\nend\n").unwrap();
        let err = compile_source(
            "main.rugo",
            "require \"util\"\nputs util.pad(\"a\", \"b\")\n",
            tmp.path(),
            Lockfile::default(),
            &BuildOptions::default(),
        )
        .unwrap_err();
        assert!(err
            .to_string()
            .contains("wrong number of arguments for util.pad (2 for 1)"));
    }

    #[test]
    fn go_mod_lists_local_module_replaces() {
        let go_mod = synthesize_go_mod(&[(
            "example.com/mylib".to_string(),
            PathBuf::from("/work/mylib"),
        )]);
        assert!(go_mod.contains("module rugo_program"));
        assert!(go_mod.contains("require example.com/mylib v0.0.0"));
        assert!(go_mod.contains("replace example.com/mylib => /work/mylib"));
    }

    #[test]
    fn constant_reassignment_is_compile_error() {
        let err = emit_err("PI = 3\nPI = 4\n");
        assert_eq!(err.line, 2);
        assert!(err.to_string().contains("cannot reassign constant PI"));
    }
}
