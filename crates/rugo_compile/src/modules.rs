//! Stdlib module registry.
//!
//! Every stdlib module declares the same four things: its Rugo name, the
//! Go type implementing it, its function signatures (Rugo name, Go
//! method, arity), and its runtime source with any extra imports. The
//! code generator emits the runtime (prelude-stripped) once, plus one
//! package-level instance per used module; calls lower to plain method
//! calls on that instance.
//!
//! Module runtime `.go` files live in this crate's `runtime/` directory
//! and are embedded at build time. `conv` and `os` are the reference
//! registrations exercising the contract; the full stdlib breadth lives
//! outside the compilation core.

use include_dir::{include_dir, Dir};
use once_cell::sync::Lazy;
use std::collections::BTreeMap;

static RUNTIME_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/runtime");

/// One callable of a stdlib module.
#[derive(Debug, Clone)]
pub struct StdFn {
    /// Rugo-visible name (`to_i`).
    pub name: &'static str,
    /// Method on the module's Go type (`ToI`).
    pub go_method: &'static str,
    pub arity: usize,
    pub variadic: bool,
    pub doc: &'static str,
}

/// A registered stdlib module.
#[derive(Debug, Clone)]
pub struct StdlibModule {
    /// Rugo namespace (`conv`), claimed by `use "conv"`.
    pub name: &'static str,
    /// Go type implementing the module (`RugoConv`).
    pub type_name: &'static str,
    pub functions: Vec<StdFn>,
    /// Imports the runtime source needs (its own prelude is stripped).
    pub extra_imports: &'static [&'static str],
    /// Embedded Go runtime source.
    pub runtime: &'static str,
}

fn runtime_src(file: &str) -> &'static str {
    RUNTIME_DIR
        .get_file(file)
        .and_then(|f| f.contents_utf8())
        .unwrap_or_default()
}

static STDLIB: Lazy<BTreeMap<&'static str, StdlibModule>> = Lazy::new(|| {
    let mut modules = BTreeMap::new();
    register_conv(&mut modules);
    register_os(&mut modules);
    modules
});

/// The process-global registration table, populated once.
pub fn stdlib() -> &'static BTreeMap<&'static str, StdlibModule> {
    &STDLIB
}

/// Looks up a module by `use` name.
pub fn lookup(name: &str) -> Option<&'static StdlibModule> {
    STDLIB.get(name)
}

fn register_conv(modules: &mut BTreeMap<&'static str, StdlibModule>) {
    modules.insert(
        "conv",
        StdlibModule {
            name: "conv",
            type_name: "RugoConv",
            functions: vec![
                StdFn {
                    name: "to_i",
                    go_method: "ToI",
                    arity: 1,
                    variadic: false,
                    doc: "Converts a value to an integer; raises when it cannot.",
                },
                StdFn {
                    name: "to_f",
                    go_method: "ToF",
                    arity: 1,
                    variadic: false,
                    doc: "Converts a value to a float; raises when it cannot.",
                },
                StdFn {
                    name: "to_s",
                    go_method: "ToS",
                    arity: 1,
                    variadic: false,
                    doc: "Converts any value to its display string.",
                },
            ],
            extra_imports: &["strconv", "strings"],
            runtime: runtime_src("conv.go"),
        },
    );
}

fn register_os(modules: &mut BTreeMap<&'static str, StdlibModule>) {
    modules.insert(
        "os",
        StdlibModule {
            name: "os",
            type_name: "RugoOs",
            functions: vec![
                StdFn {
                    name: "env",
                    go_method: "Env",
                    arity: 1,
                    variadic: false,
                    doc: "Reads an environment variable; empty string when unset.",
                },
                StdFn {
                    name: "args",
                    go_method: "CmdArgs",
                    arity: 0,
                    variadic: false,
                    doc: "Command-line arguments, without the program name.",
                },
                StdFn {
                    name: "getwd",
                    go_method: "Getwd",
                    arity: 0,
                    variadic: false,
                    doc: "The current working directory.",
                },
                StdFn {
                    name: "hostname",
                    go_method: "Hostname",
                    arity: 0,
                    variadic: false,
                    doc: "The machine's host name.",
                },
            ],
            extra_imports: &["os"],
            runtime: runtime_src("os.go"),
        },
    );
}
