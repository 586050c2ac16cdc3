//! The bridge registry: everything call-site emission needs to know about
//! an introspected package.
//!
//! The registry is a build-context object owned by the compiler driver —
//! it is created fresh per build and never shared across builds. Function
//! records move through a monotone state machine:
//!
//! ```text
//! unseen ──classify──▶ registered          (auto/castable/func-param)
//!        └───────────▶ skipped(reason) ──FinalizeStructs + reclassify──▶ registered
//!                                      └─▶ permanently skipped (updated reason)
//! ```
//!
//! Once a function is registered its signature is immutable for the rest
//! of the build; reclassification only ever moves entries *off* the skip
//! list.

use crate::classify::{BridgeTag, BridgedSig};
use crate::gotype::GoSignature;
use rugo_base::{Result, RugoError};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// How a bridged function's Go-side call is produced.
#[derive(Debug, Clone, PartialEq)]
pub enum FnKind {
    /// Ordinary call of `go_call(args...)`.
    Plain,
    /// Zero-arg accessor returning a package var.
    VarAccessor,
    /// Zero-arg accessor returning a package const.
    ConstAccessor,
    /// Zero-value struct constructor returning a handle.
    Constructor { wrapper: String },
    /// Output-buffer pattern rewritten to `f(src) string`; `sizer` is the
    /// qualified sizing function.
    AutoWrap { sizer: String, has_error: bool },
}

/// Writes a custom glue body (the lines inside the glue function) for
/// packages whose natural Go API does not fit the generic lowering.
pub type EmitterFn = fn() -> String;

/// One bridged function, keyed in the package by its Rugo-visible
/// snake_case name.
#[derive(Debug, Clone)]
pub struct BridgedFn {
    /// Qualified Go expression to call/read (`strings.Cut`, `flag.Usage`).
    pub go_call: String,
    pub sig: BridgedSig,
    pub kind: FnKind,
    pub doc: String,
    /// Keys of runtime-helper snippets this function's glue requires.
    pub helpers: Vec<String>,
    /// Custom code emitter, replacing the generic glue body.
    pub emitter: Option<EmitterFn>,
}

/// A function that could not be bridged, with a human-readable reason.
#[derive(Debug, Clone)]
pub struct SkippedFn {
    pub go_name: String,
    pub sig: GoSignature,
    pub reason: String,
    pub doc: String,
}

/// One field of a wrapped struct.
#[derive(Debug, Clone)]
pub struct BridgedField {
    pub go_name: String,
    pub rugo_name: String,
    pub tag: BridgeTag,
}

/// A struct with a synthesized opaque-handle wrapper.
#[derive(Debug, Clone)]
pub struct BridgedStruct {
    /// Go type name (`FlagSet`).
    pub go_name: String,
    /// Lookup key: bare name in-package, `import/path.Name` for externals.
    pub key: String,
    /// Qualified Go type expression (`flag.FlagSet`, `pflag.Flag`).
    pub qualified: String,
    /// Wrapper type name in emitted Go (`RugoH_flag_FlagSet`).
    pub wrapper: String,
    pub fields: Vec<BridgedField>,
    /// Methods by Rugo-visible name.
    pub methods: BTreeMap<String, BridgedFn>,
    /// Wrapper names of embedded pointer-to-struct fields, in order —
    /// these produce upcast accessors.
    pub embedded: Vec<String>,
    /// Go field names of those embedded fields, parallel to `embedded`.
    pub embedded_fields: Vec<String>,
    /// Defined in a dependency package rather than the inspected one.
    pub external: bool,
    /// Import path supplying the type, when external.
    pub import_path: Option<String>,
}

/// A host package registered for bridging.
#[derive(Debug, Clone, Default)]
pub struct BridgedPackage {
    /// Import path (`encoding/hex`, `./mylib`).
    pub path: String,
    /// Rugo-visible namespace (`hex`).
    pub namespace: String,
    /// Selector used in emitted Go (import alias; usually the package
    /// name).
    pub qualifier: String,
    /// Functions by Rugo-visible snake_case name.
    pub functions: BTreeMap<String, BridgedFn>,
    pub structs: Vec<BridgedStruct>,
    pub skipped: Vec<SkippedFn>,
    /// Additional imports the emitted glue needs (external wrapper types).
    pub extra_imports: BTreeSet<String>,
    /// Introspected from compiled export data only (no struct discovery).
    pub compiled_only: bool,
    /// Keyed runtime-helper snippets; each key emits at most once per
    /// program.
    pub helpers: BTreeMap<String, String>,
}

impl BridgedPackage {
    /// Registers a function under `name`, resolving collisions with a
    /// `new_` prefix (struct constructors colliding with functions).
    /// Returns the name actually used.
    pub fn register_fn(&mut self, name: &str, func: BridgedFn) -> String {
        let key = if self.functions.contains_key(name) {
            format!("new_{}", name)
        } else {
            name.to_string()
        };
        self.functions.insert(key.clone(), func);
        key
    }

    /// Finds a struct by lookup key.
    pub fn struct_by_key(&self, key: &str) -> Option<&BridgedStruct> {
        self.structs.iter().find(|s| s.key == key)
    }

    pub fn struct_by_wrapper(&self, wrapper: &str) -> Option<&BridgedStruct> {
        self.structs.iter().find(|s| s.wrapper == wrapper)
    }

    /// The fatal "nothing bridgeable" report: a bulleted list of skipped
    /// functions and reasons.
    pub fn no_symbols_error(&self) -> RugoError {
        let mut msg = format!(
            "package {} exports no bridgeable functions\n",
            self.path
        );
        for skip in &self.skipped {
            msg.push_str(&format!(
                "  - {}{}: {}\n",
                skip.go_name, skip.sig, skip.reason
            ));
        }
        RugoError::new(msg.trim_end().to_string())
    }
}

/// All packages bridged in one build.
#[derive(Debug, Default)]
pub struct BridgeRegistry {
    packages: Vec<BridgedPackage>,
    by_namespace: HashMap<String, usize>,
    by_path: HashMap<String, usize>,
}

impl BridgeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a package; the namespace must be unclaimed.
    pub fn register(&mut self, pkg: BridgedPackage) -> Result<()> {
        if self.by_namespace.contains_key(&pkg.namespace) {
            return Err(RugoError::new(format!(
                "namespace '{}' is already taken; rename one side with 'as'",
                pkg.namespace
            )));
        }
        let idx = self.packages.len();
        self.by_namespace.insert(pkg.namespace.clone(), idx);
        self.by_path.insert(pkg.path.clone(), idx);
        self.packages.push(pkg);
        Ok(())
    }

    pub fn by_namespace(&self, ns: &str) -> Option<&BridgedPackage> {
        self.by_namespace.get(ns).map(|&i| &self.packages[i])
    }

    pub fn by_path(&self, path: &str) -> Option<&BridgedPackage> {
        self.by_path.get(path).map(|&i| &self.packages[i])
    }

    pub fn has_namespace(&self, ns: &str) -> bool {
        self.by_namespace.contains_key(ns)
    }

    pub fn packages(&self) -> impl Iterator<Item = &BridgedPackage> {
        self.packages.iter()
    }

    /// Drops everything; called between builds.
    pub fn clear(&mut self) {
        self.packages.clear();
        self.by_namespace.clear();
        self.by_path.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::BridgedSig;

    fn dummy_fn() -> BridgedFn {
        BridgedFn {
            go_call: "p.F".to_string(),
            sig: BridgedSig {
                params: vec![],
                results: vec![],
                has_error: false,
                variadic: false,
            },
            kind: FnKind::Plain,
            doc: String::new(),
            helpers: Vec::new(),
            emitter: None,
        }
    }

    #[test]
    fn constructor_collision_gets_new_prefix() {
        let mut pkg = BridgedPackage::default();
        assert_eq!(pkg.register_fn("parse", dummy_fn()), "parse");
        assert_eq!(pkg.register_fn("parse", dummy_fn()), "new_parse");
        assert_eq!(pkg.functions.len(), 2);
    }

    #[test]
    fn namespace_conflicts_rejected() {
        let mut reg = BridgeRegistry::new();
        reg.register(BridgedPackage {
            namespace: "hex".to_string(),
            path: "encoding/hex".to_string(),
            ..Default::default()
        })
        .unwrap();
        let err = reg
            .register(BridgedPackage {
                namespace: "hex".to_string(),
                path: "other/hex".to_string(),
                ..Default::default()
            })
            .unwrap_err();
        assert!(err.to_string().contains("'hex'"));
        assert!(err.to_string().contains("as"));
    }

    #[test]
    fn no_symbols_error_lists_reasons() {
        let pkg = BridgedPackage {
            path: "some/pkg".to_string(),
            skipped: vec![SkippedFn {
                go_name: "Watch".to_string(),
                sig: GoSignature::default(),
                reason: "channel type chan int".to_string(),
                doc: String::new(),
            }],
            ..Default::default()
        };
        let msg = pkg.no_symbols_error().to_string();
        assert!(msg.contains("no bridgeable functions"));
        assert!(msg.contains("- Watch"));
        assert!(msg.contains("channel type"));
    }

    #[test]
    fn clear_resets_everything() {
        let mut reg = BridgeRegistry::new();
        reg.register(BridgedPackage {
            namespace: "a".to_string(),
            ..Default::default()
        })
        .unwrap();
        reg.clear();
        assert!(!reg.has_namespace("a"));
        assert!(reg.by_path("").is_none());
    }
}
