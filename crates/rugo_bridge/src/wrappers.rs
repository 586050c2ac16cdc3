//! Struct wrapper synthesis — `finalize_structs`.
//!
//! After the first classification pass a package usually has a skip list
//! full of "pointer to struct X" entries. This pass makes those
//! resolvable:
//!
//! 1. every exported in-package struct gets a deterministic wrapper name
//!    `RugoH_<ns>_<Name>` and enters the classifier's wrapper table;
//! 2. external types referenced by blocked signatures are discovered
//!    through the dependency loader and wrapped as
//!    `RugoX_<pkg>_<Name>`, **closed under embedded-field reachability**
//!    — a worklist keeps following embedded pointer fields of
//!    already-discovered externals, which is what makes multi-level
//!    hierarchies (subclass → abstract base → base) bridgeable;
//! 3. wrappers get their field tables, pointer-receiver method sets and
//!    embedded upcast accessors; each in-package struct also gets a
//!    zero-value constructor `ns.struct_name()` (collision → `new_`
//!    prefix);
//! 4. helper snippets (wrapper type, dot-get/set/call, unwrap-with-upcast)
//!    are generated and keyed so each emits at most once per program.

use crate::classify::{classify_param, classify_signature, ClassifyCtx, Underlying};
use crate::emit::emit_wrapper_snippets;
use crate::gosrc::{GoFile, GoTypeDecl, GoTypeKind, is_exported};
use crate::gotype::{GoSignature, GoType};
use crate::registry::{BridgedField, BridgedFn, BridgedPackage, BridgedStruct, FnKind, SkippedFn};
use rugo_base::names::to_snake_case;
use rugo_base::{Result, RugoError};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Loads dependency package sources by import path.
///
/// The production implementation shells out to `go list -json`; tests
/// supply in-memory packages.
pub trait DepLoader {
    fn load(&mut self, import_path: &str) -> Result<Vec<GoFile>>;
}

/// A loader for packages with no resolvable dependencies.
pub struct NoDeps;

impl DepLoader for NoDeps {
    fn load(&mut self, import_path: &str) -> Result<Vec<GoFile>> {
        Err(RugoError::new(format!(
            "cannot resolve dependency package '{}'",
            import_path
        )))
    }
}

/// Sanitizes the last path segment into an identifier usable in wrapper
/// names and import selectors (`github.com/spf13/pflag` → `pflag`).
pub fn path_selector(import_path: &str) -> String {
    let seg = import_path.rsplit('/').next().unwrap_or(import_path);
    seg.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Runs wrapper synthesis over an inspected package.
pub fn finalize_structs(
    pkg: &mut BridgedPackage,
    files: &[GoFile],
    ctx: &mut ClassifyCtx,
    loader: &mut dyn DepLoader,
) -> Result<()> {
    // Phase 1: name every in-package exported struct.
    let own_structs: Vec<&GoTypeDecl> = files
        .iter()
        .flat_map(|f| f.types.iter())
        .filter(|t| {
            is_exported(&t.name)
                && !t.generic
                && matches!(t.kind, GoTypeKind::Struct { .. })
        })
        .collect();
    for decl in &own_structs {
        let wrapper = format!("RugoH_{}_{}", pkg.namespace, decl.name);
        ctx.wrappers.insert(decl.name.clone(), wrapper);
    }

    // Phase 2: discover external types, closed under embedding.
    let mut loaded: HashMap<String, Vec<GoFile>> = HashMap::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut worklist: Vec<(String, String)> = Vec::new(); // (import path, type name)
    for skip in &pkg.skipped {
        for (sel, name) in qualified_types(&skip.sig) {
            if let Some(path) = ctx.import_paths.get(&sel) {
                worklist.push((path.clone(), name));
            }
        }
    }
    while let Some((path, name)) = worklist.pop() {
        let key = format!("{}.{}", path, name);
        if !seen.insert(key.clone()) {
            continue;
        }
        if ctx.wrappers.contains_key(&key) || ctx.external_basics.contains_key(&key) {
            continue;
        }
        let files = match loaded.entry(path.clone()) {
            std::collections::hash_map::Entry::Occupied(e) => e.into_mut(),
            std::collections::hash_map::Entry::Vacant(e) => match loader.load(&path) {
                Ok(fs) => e.insert(fs),
                Err(err) => {
                    log::debug!("bridge: cannot load {}: {}", path, err);
                    continue;
                }
            },
        };
        let Some(decl) = files
            .iter()
            .flat_map(|f| f.types.iter())
            .find(|t| t.name == name)
        else {
            continue;
        };
        match &decl.kind {
            GoTypeKind::Struct { embedded, .. } if !decl.generic => {
                let wrapper = format!("RugoX_{}_{}", path_selector(&path), name);
                ctx.wrappers.insert(key, wrapper);
                pkg.extra_imports.insert(path.clone());
                // Follow embedded fields in the dependency's own import
                // context: that is what closes multi-level hierarchies.
                let dep_imports = import_map_of(files);
                for emb in embedded {
                    if let Some((pkg_sel, emb_name)) = emb.base_name() {
                        match pkg_sel {
                            None => worklist.push((path.clone(), emb_name.to_string())),
                            Some(sel) => {
                                if let Some(p) = dep_imports.get(sel) {
                                    worklist.push((p.clone(), emb_name.to_string()));
                                }
                            }
                        }
                    }
                }
            }
            GoTypeKind::Named(underlying) | GoTypeKind::Alias(underlying) => {
                if let Some(u) = basic_underlying(underlying) {
                    ctx.external_basics.insert(key, u);
                }
            }
            _ => {}
        }
    }

    // Phase 3a: build in-package struct records.
    let mut built: Vec<BridgedStruct> = Vec::new();
    for decl in &own_structs {
        let GoTypeKind::Struct { fields, embedded } = &decl.kind else {
            continue;
        };
        let wrapper = ctx.wrappers[&decl.name].clone();
        let mut record = BridgedStruct {
            go_name: decl.name.clone(),
            key: decl.name.clone(),
            qualified: format!("{}.{}", ctx.qualifier, decl.name),
            wrapper,
            fields: Vec::new(),
            methods: BTreeMap::new(),
            embedded: Vec::new(),
            embedded_fields: Vec::new(),
            external: false,
            import_path: None,
        };
        fill_fields(&mut record, fields, ctx);
        fill_embedded(&mut record, embedded, ctx, None);
        fill_methods(&mut record, files, &decl.name, ctx, &mut pkg.skipped);
        built.push(record);
    }

    // Phase 3b: external struct records.
    let external_keys: Vec<(String, String)> = ctx
        .wrappers
        .iter()
        .filter(|(k, _)| k.contains('.'))
        .map(|(k, w)| (k.clone(), w.clone()))
        .collect();
    for (key, wrapper) in external_keys {
        let Some((path, name)) = key.rsplit_once('.') else {
            continue;
        };
        let Some(files) = loaded.get(path) else {
            continue;
        };
        let Some(decl) = files
            .iter()
            .flat_map(|f| f.types.iter())
            .find(|t| t.name == name)
        else {
            continue;
        };
        let GoTypeKind::Struct { fields, embedded } = &decl.kind else {
            continue;
        };
        let selector = path_selector(path);
        let mut dep_ctx = external_ctx(path, files, ctx);
        dep_ctx.qualifier = selector.clone();
        let mut record = BridgedStruct {
            go_name: name.to_string(),
            key: key.clone(),
            qualified: format!("{}.{}", selector, name),
            wrapper,
            fields: Vec::new(),
            methods: BTreeMap::new(),
            embedded: Vec::new(),
            embedded_fields: Vec::new(),
            external: true,
            import_path: Some(path.to_string()),
        };
        fill_fields(&mut record, fields, &dep_ctx);
        fill_embedded(&mut record, embedded, &dep_ctx, Some(path));
        fill_methods(&mut record, files, name, &dep_ctx, &mut pkg.skipped);
        built.push(record);
    }

    // Phase 4: constructors for in-package structs, then helper snippets.
    for record in &built {
        if !record.external {
            let ctor = BridgedFn {
                go_call: record.qualified.clone(),
                sig: crate::classify::BridgedSig {
                    params: vec![],
                    results: vec![crate::classify::BridgeTag::Handle {
                        wrapper: record.wrapper.clone(),
                        value: false,
                    }],
                    has_error: false,
                    variadic: false,
                },
                kind: FnKind::Constructor {
                    wrapper: record.wrapper.clone(),
                },
                doc: format!("Zero-value {} constructor.", record.go_name),
                helpers: vec![format!("bridge_wrapper:{}", record.wrapper)],
                emitter: None,
            };
            let used = pkg.register_fn(&to_snake_case(&record.go_name), ctor);
            log::debug!(
                "bridge: {}: constructor {} -> {}",
                pkg.namespace,
                record.go_name,
                used
            );
        }
    }
    for record in &built {
        for (key, code) in emit_wrapper_snippets(record, &built) {
            pkg.helpers.insert(key, code);
        }
    }
    pkg.structs = built;
    Ok(())
}

/// Classifier context for an external package's own declarations: its
/// bare type names resolve through the main context's path-qualified
/// wrapper and basic tables.
fn external_ctx(path: &str, files: &[GoFile], main: &ClassifyCtx) -> ClassifyCtx {
    let mut ctx = ClassifyCtx {
        qualifier: path_selector(path),
        import_paths: import_map_of(files),
        ..Default::default()
    };
    for (key, wrapper) in &main.wrappers {
        if let Some((p, name)) = key.rsplit_once('.') {
            if p == path {
                ctx.wrappers.insert(name.to_string(), wrapper.clone());
            } else {
                ctx.wrappers.insert(key.clone(), wrapper.clone());
            }
        } else {
            // In-package wrappers of the inspected package are not
            // visible from a dependency.
        }
    }
    for (key, u) in &main.external_basics {
        if let Some((p, name)) = key.rsplit_once('.') {
            if p == path {
                ctx.own_basics.insert(name.to_string(), *u);
            }
        }
        ctx.external_basics.insert(key.clone(), *u);
    }
    ctx
}

pub(crate) fn import_map_of(files: &[GoFile]) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for file in files {
        for import in &file.imports {
            let sel = import
                .alias
                .clone()
                .unwrap_or_else(|| path_selector(&import.path));
            map.insert(sel, import.path.clone());
        }
    }
    map
}

fn fill_fields(record: &mut BridgedStruct, fields: &[crate::gosrc::GoField], ctx: &ClassifyCtx) {
    for field in fields {
        if !field.exported {
            continue;
        }
        match classify_param(&field.ty, ctx) {
            Ok(tag) => record.fields.push(BridgedField {
                go_name: field.name.clone(),
                rugo_name: to_snake_case(&field.name),
                tag,
            }),
            Err(reason) => {
                log::debug!(
                    "bridge: field {}.{} skipped: {}",
                    record.go_name,
                    field.name,
                    reason
                );
            }
        }
    }
}

fn fill_embedded(
    record: &mut BridgedStruct,
    embedded: &[GoType],
    ctx: &ClassifyCtx,
    _home_path: Option<&str>,
) {
    for emb in embedded {
        let GoType::Pointer(inner) = emb else {
            continue; // only pointer embedding produces upcasts
        };
        let Some((pkg_sel, name)) = inner.base_name() else {
            continue;
        };
        let Some(key) = ctx.type_key(pkg_sel, name) else {
            continue;
        };
        if let Some(wrapper) = ctx.wrappers.get(&key) {
            record.embedded.push(wrapper.clone());
            record.embedded_fields.push(name.to_string());
        }
    }
}

/// Discovers the pointer-receiver method set of a struct and classifies
/// each method with the wrappers in scope. Blocked methods land on the
/// skip list as `Type.Method`.
fn fill_methods(
    record: &mut BridgedStruct,
    files: &[GoFile],
    type_name: &str,
    ctx: &ClassifyCtx,
    skipped: &mut Vec<SkippedFn>,
) {
    for func in files.iter().flat_map(|f| f.funcs.iter()) {
        let Some(recv) = &func.receiver else { continue };
        if recv.type_name != type_name || !is_exported(&func.name) || func.generic {
            continue;
        }
        match classify_signature(&func.sig, ctx) {
            Ok(sig) => {
                record.methods.insert(
                    to_snake_case(&func.name),
                    BridgedFn {
                        go_call: func.name.clone(),
                        sig,
                        kind: FnKind::Plain,
                        doc: func.doc.clone(),
                        helpers: Vec::new(),
                        emitter: None,
                    },
                );
            }
            Err(reason) => skipped.push(SkippedFn {
                go_name: format!("{}.{}", type_name, func.name),
                sig: func.sig.clone(),
                reason,
                doc: func.doc.clone(),
            }),
        }
    }
}

/// Qualified type names referenced anywhere in a signature.
fn qualified_types(sig: &GoSignature) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let mut push = |ty: &GoType| {
        if let Some((Some(sel), name)) = ty.base_name().map(|(p, n)| (p.clone(), n)) {
            out.push((sel, name.to_string()));
        }
    };
    for p in &sig.params {
        push(&p.ty);
    }
    for r in &sig.results {
        push(r);
    }
    out
}

/// Basic underlying kind of a named/aliased type, when it has one.
pub(crate) fn basic_underlying(ty: &GoType) -> Option<Underlying> {
    match ty {
        GoType::Named { pkg: None, name } => match name.as_str() {
            "int" | "int8" | "int16" | "int32" | "int64" | "uint" | "uint8" | "uint16"
            | "uint32" | "uint64" | "byte" | "rune" => Some(Underlying::Int),
            "float32" | "float64" => Some(Underlying::Float),
            "string" => Some(Underlying::Str),
            "bool" => Some(Underlying::Bool),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::BridgeTag;
    use crate::gosrc::scan_file;

    struct MapLoader(HashMap<String, &'static str>);

    impl DepLoader for MapLoader {
        fn load(&mut self, import_path: &str) -> Result<Vec<GoFile>> {
            let src = self.0.get(import_path).ok_or_else(|| {
                RugoError::new(format!("no such package {}", import_path))
            })?;
            Ok(vec![scan_file("dep.go", src)?])
        }
    }

    fn base_ctx(files: &[GoFile], qualifier: &str) -> ClassifyCtx {
        ClassifyCtx {
            qualifier: qualifier.to_string(),
            import_paths: import_map_of(files),
            ..Default::default()
        }
    }

    #[test]
    fn in_package_struct_gets_wrapper_and_constructor() {
        let files = vec![scan_file(
            "t.go",
            "package web\n\
             type Server struct {\n\tHost string\n\tPort int\n}\n\
             func (s *Server) Start(port int) error { return nil }\n",
        )
        .unwrap()];
        let mut pkg = BridgedPackage {
            namespace: "web".into(),
            qualifier: "web".into(),
            ..Default::default()
        };
        let mut ctx = base_ctx(&files, "web");
        finalize_structs(&mut pkg, &files, &mut ctx, &mut NoDeps).unwrap();

        assert_eq!(pkg.structs.len(), 1);
        let s = &pkg.structs[0];
        assert_eq!(s.wrapper, "RugoH_web_Server");
        assert_eq!(s.fields.len(), 2);
        assert!(s.methods.contains_key("start"));
        assert!(pkg.functions.contains_key("server"));
        assert!(matches!(
            pkg.functions["server"].kind,
            FnKind::Constructor { .. }
        ));
        assert!(pkg.helpers.contains_key("bridge_wrapper:RugoH_web_Server"));
        assert!(pkg.helpers.contains_key("bridge_unwrap:RugoH_web_Server"));
    }

    #[test]
    fn constructor_collision_gets_new_prefix() {
        let files = vec![scan_file(
            "t.go",
            "package p\n\
             func Server(kind string) string { return kind }\n\
             type Server struct {\n\tName string\n}\n",
        )
        .unwrap()];
        let mut pkg = BridgedPackage {
            namespace: "p".into(),
            qualifier: "p".into(),
            ..Default::default()
        };
        // Simulate the initial function pass having registered Server().
        let ctx0 = base_ctx(&files, "p");
        let sig = classify_signature(&files[0].funcs[0].sig, &ctx0).unwrap();
        pkg.register_fn(
            "server",
            BridgedFn {
                go_call: "p.Server".into(),
                sig,
                kind: FnKind::Plain,
                doc: String::new(),
                helpers: vec![],
                emitter: None,
            },
        );
        let mut ctx = base_ctx(&files, "p");
        finalize_structs(&mut pkg, &files, &mut ctx, &mut NoDeps).unwrap();
        assert!(pkg.functions.contains_key("server"));
        assert!(pkg.functions.contains_key("new_server"));
    }

    #[test]
    fn external_worklist_closes_over_embedding() {
        // Our package references dep.Sub in a blocked signature; Sub
        // embeds *Mid (same package), Mid embeds *core.Base (another
        // package). All three must be discovered.
        let files = vec![scan_file(
            "t.go",
            "package app\n\
             import \"example.com/dep\"\n\
             func Use(s *dep.Sub) {}\n",
        )
        .unwrap()];
        let mut deps = HashMap::new();
        deps.insert(
            "example.com/dep".to_string(),
            "package dep\nimport \"example.com/core\"\ntype Sub struct {\n\t*Mid\n\tName string\n}\ntype Mid struct {\n\t*core.Base\n}\n",
        );
        deps.insert(
            "example.com/core".to_string(),
            "package core\ntype Base struct {\n\tID int\n}\n",
        );
        let mut loader = MapLoader(deps);

        let mut pkg = BridgedPackage {
            namespace: "app".into(),
            qualifier: "app".into(),
            ..Default::default()
        };
        pkg.skipped.push(SkippedFn {
            go_name: "Use".into(),
            sig: files[0].funcs[0].sig.clone(),
            reason: "external type dep.Sub".into(),
            doc: String::new(),
        });
        let mut ctx = base_ctx(&files, "app");
        finalize_structs(&mut pkg, &files, &mut ctx, &mut loader).unwrap();

        assert!(ctx.wrappers.contains_key("example.com/dep.Sub"));
        assert!(ctx.wrappers.contains_key("example.com/dep.Mid"));
        assert!(ctx.wrappers.contains_key("example.com/core.Base"));
        assert!(pkg.extra_imports.contains("example.com/dep"));
        assert!(pkg.extra_imports.contains("example.com/core"));

        let sub = pkg
            .structs
            .iter()
            .find(|s| s.key == "example.com/dep.Sub")
            .unwrap();
        assert_eq!(sub.wrapper, "RugoX_dep_Sub");
        assert_eq!(sub.embedded, vec!["RugoX_dep_Mid"]);
        assert!(sub.external);
    }

    #[test]
    fn external_named_basic_recorded() {
        let files = vec![scan_file(
            "t.go",
            "package app\nimport \"example.com/lvl\"\nfunc Set(l lvl.Level) {}\n",
        )
        .unwrap()];
        let mut deps = HashMap::new();
        deps.insert("example.com/lvl".to_string(), "package lvl\ntype Level int\n");
        let mut loader = MapLoader(deps);
        let mut pkg = BridgedPackage {
            namespace: "app".into(),
            qualifier: "app".into(),
            ..Default::default()
        };
        pkg.skipped.push(SkippedFn {
            go_name: "Set".into(),
            sig: files[0].funcs[0].sig.clone(),
            reason: "external type lvl.Level".into(),
            doc: String::new(),
        });
        let mut ctx = base_ctx(&files, "app");
        finalize_structs(&mut pkg, &files, &mut ctx, &mut loader).unwrap();
        assert_eq!(
            ctx.external_basics.get("example.com/lvl.Level"),
            Some(&Underlying::Int)
        );
    }

    #[test]
    fn blocked_method_lands_on_skip_list() {
        let files = vec![scan_file(
            "t.go",
            "package p\n\
             type Pool struct {\n\tSize int\n}\n\
             func (p *Pool) Chans() chan int { return nil }\n\
             func (p *Pool) Len() int { return 0 }\n",
        )
        .unwrap()];
        let mut pkg = BridgedPackage {
            namespace: "p".into(),
            qualifier: "p".into(),
            ..Default::default()
        };
        let mut ctx = base_ctx(&files, "p");
        finalize_structs(&mut pkg, &files, &mut ctx, &mut NoDeps).unwrap();
        let pool = &pkg.structs[0];
        assert!(pool.methods.contains_key("len"));
        assert!(!pool.methods.contains_key("chans"));
        assert!(pkg
            .skipped
            .iter()
            .any(|s| s.go_name == "Pool.Chans" && s.reason.contains("channel")));
    }

    #[test]
    fn method_taking_same_package_struct_is_bridgeable() {
        let files = vec![scan_file(
            "t.go",
            "package p\n\
             type A struct {\n\tN int\n}\n\
             type B struct {\n\tM int\n}\n\
             func (a *A) Merge(b *B) int { return 0 }\n",
        )
        .unwrap()];
        let mut pkg = BridgedPackage {
            namespace: "p".into(),
            qualifier: "p".into(),
            ..Default::default()
        };
        let mut ctx = base_ctx(&files, "p");
        finalize_structs(&mut pkg, &files, &mut ctx, &mut NoDeps).unwrap();
        let a = pkg.structs.iter().find(|s| s.go_name == "A").unwrap();
        let merge = &a.methods["merge"];
        assert!(matches!(
            merge.sig.params[0],
            BridgeTag::Handle { value: false, .. }
        ));
    }
}
