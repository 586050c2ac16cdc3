//! Call-site emission: turns bridged records into Go glue.
//!
//! Every bridged function becomes one uniform glue function
//! `rugoB_<ns>_<name>(args ...any) any` that performs argument
//! conversions, makes the host call, and applies the return conventions:
//!
//! | host results      | Rugo value                                 |
//! |-------------------|--------------------------------------------|
//! | `()`              | nil                                        |
//! | `(T)`             | wrapped value                              |
//! | `(error)`         | nil; panic on non-nil error                |
//! | `(T, error)`      | wrapped value; panic routes into `try/or`  |
//! | `(T, bool)`       | nil when the bool is false                 |
//! | multi             | sequence of wrapped values                 |
//! | struct            | opaque handle                              |
//!
//! Struct wrappers additionally get `rugoGet`/`rugoSet`/`rugoCall`
//! methods (dot-get, dot-set, dot-call on handles) and an unwrap helper
//! whose type switch carries the upcast cases, so a subclass handle can
//! be passed where a base is required.
//!
//! The emitted code leans on the core runtime helpers of the code
//! generator (`rugoToString`, `rugoCall`, `rugoBridgeErr`, ...); the
//! names used here are the contract between the two crates.

use crate::classify::{BridgeTag, BridgedSig, Underlying};
use crate::registry::{BridgedPackage, BridgedStruct, FnKind};
use std::fmt::Write;

/// Name of the glue function for `ns.name`.
pub fn glue_fn_name(ns: &str, rugo_name: &str) -> String {
    format!("rugoB_{}_{}", ns, rugo_name)
}

/// Go expression converting a Rugo `any` into the host-side type.
pub fn conv_arg(tag: &BridgeTag, expr: &str) -> String {
    match tag {
        BridgeTag::Str => format!("rugoToString({})", expr),
        BridgeTag::Int => format!("rugoToInt({})", expr),
        BridgeTag::Float => format!("rugoToFloat({})", expr),
        BridgeTag::Bool => format!("rugoToBool({})", expr),
        BridgeTag::Byte => format!("byte(rugoToInt({}))", expr),
        BridgeTag::Any => expr.to_string(),
        BridgeTag::StrSlice => format!("rugoToStrSlice({})", expr),
        BridgeTag::ByteSlice => format!("[]byte(rugoToString({}))", expr),
        BridgeTag::NamedBasic { cast, underlying } => {
            let inner = match underlying {
                Underlying::Int => format!("rugoToInt({})", expr),
                Underlying::Float => format!("rugoToFloat({})", expr),
                Underlying::Str => format!("rugoToString({})", expr),
                Underlying::Bool => format!("rugoToBool({})", expr),
            };
            format!("{}({})", cast, inner)
        }
        BridgeTag::StringView { ctor, deref } => {
            if *deref {
                format!("*{}(rugoToString({}))", ctor, expr)
            } else {
                format!("{}(rugoToString({}))", ctor, expr)
            }
        }
        BridgeTag::Handle { wrapper, value } => {
            if *value {
                format!("*rugoUnwrap_{}({})", wrapper, expr)
            } else {
                format!("rugoUnwrap_{}({})", wrapper, expr)
            }
        }
        BridgeTag::FuncValue(sig) => func_adapter(sig, expr),
        BridgeTag::ErrorRet => expr.to_string(), // unreachable in params
    }
}

/// Go expression wrapping a host value back into a Rugo `any`.
pub fn wrap_result(tag: &BridgeTag, expr: &str) -> String {
    match tag {
        BridgeTag::Str | BridgeTag::Int | BridgeTag::Float | BridgeTag::Bool | BridgeTag::Any => {
            expr.to_string()
        }
        BridgeTag::Byte => format!("int({})", expr),
        BridgeTag::StrSlice => format!("rugoFromStrSlice({})", expr),
        BridgeTag::ByteSlice => format!("string({})", expr),
        BridgeTag::NamedBasic { underlying, .. } => match underlying {
            Underlying::Int => format!("int({})", expr),
            Underlying::Float => format!("float64({})", expr),
            Underlying::Str => format!("string({})", expr),
            Underlying::Bool => format!("bool({})", expr),
        },
        // String-view values surface as their canonical string form.
        BridgeTag::StringView { .. } => format!("{}.String()", expr),
        BridgeTag::Handle { wrapper, value } => {
            if *value {
                format!("{}{{v: &{}}}", wrapper, expr)
            } else {
                format!("{}{{v: {}}}", wrapper, expr)
            }
        }
        BridgeTag::FuncValue(_) | BridgeTag::ErrorRet => expr.to_string(), // unreachable
    }
}

/// Go type text for basic tags, used in function-adapter parameters.
fn go_type_text(tag: &BridgeTag) -> &str {
    match tag {
        BridgeTag::Str => "string",
        BridgeTag::Int => "int",
        BridgeTag::Float => "float64",
        BridgeTag::Bool => "bool",
        BridgeTag::Byte => "byte",
        BridgeTag::Any => "any",
        BridgeTag::StrSlice => "[]string",
        BridgeTag::ByteSlice => "[]byte",
        BridgeTag::NamedBasic { cast, .. } => cast,
        _ => "any",
    }
}

/// Adapts a Rugo lambda to a host function type.
fn func_adapter(sig: &BridgedSig, expr: &str) -> String {
    let params: Vec<String> = sig
        .params
        .iter()
        .enumerate()
        .map(|(i, t)| format!("fp{} {}", i, go_type_text(t)))
        .collect();
    let call_args: Vec<String> = (0..sig.params.len())
        .map(|i| format!("fp{}", i))
        .collect();
    let call = if call_args.is_empty() {
        format!("rugoCall({})", expr)
    } else {
        format!("rugoCall({}, {})", expr, call_args.join(", "))
    };
    match sig.results.first() {
        None => format!("func({}) {{ {} }}", params.join(", "), call),
        Some(ret) => format!(
            "func({}) {} {{ return {} }}",
            params.join(", "),
            go_type_text(ret),
            conv_arg(ret, &call)
        ),
    }
}

/// Emits the glue function for one bridged function.
pub fn emit_fn_glue(ns: &str, rugo_name: &str, func: &crate::registry::BridgedFn) -> String {
    let mut out = String::new();
    let name = glue_fn_name(ns, rugo_name);
    let _ = writeln!(out, "func {}(args ...any) any {{", name);
    if let Some(emitter) = func.emitter {
        arity_check(&mut out, ns, rugo_name, func.sig.params.len(), func.sig.variadic);
        out.push_str(&emitter());
        let _ = writeln!(out, "}}");
        return out;
    }
    match &func.kind {
        FnKind::ConstAccessor | FnKind::VarAccessor => {
            let expr = &func.go_call;
            let wrapped = match func.sig.results.first() {
                Some(tag) => wrap_result(tag, expr),
                None => format!("any({})", expr),
            };
            let _ = writeln!(out, "\t_ = args");
            let _ = writeln!(out, "\treturn {}", wrapped);
        }
        FnKind::Constructor { wrapper } => {
            let _ = writeln!(out, "\t_ = args");
            let _ = writeln!(out, "\treturn {}{{v: &{}{{}}}}", wrapper, func.go_call);
        }
        FnKind::AutoWrap { sizer, has_error } => {
            arity_check(&mut out, ns, rugo_name, 1, false);
            let _ = writeln!(out, "\tsrc := []byte(rugoToString(args[0]))");
            let _ = writeln!(out, "\tdst := make([]byte, {}(len(src)))", sizer);
            if *has_error {
                let _ = writeln!(out, "\tn, err := {}(dst, src)", func.go_call);
                let _ = writeln!(
                    out,
                    "\tif err != nil {{\n\t\tpanic(rugoBridgeErr(err.Error()))\n\t}}"
                );
            } else {
                let _ = writeln!(out, "\tn := {}(dst, src)", func.go_call);
            }
            let _ = writeln!(out, "\treturn string(dst[:n])");
        }
        FnKind::Plain => {
            emit_plain_call(&mut out, ns, rugo_name, &func.go_call, &func.sig, "args");
        }
    }
    let _ = writeln!(out, "}}");
    out
}

fn arity_check(out: &mut String, ns: &str, rugo_name: &str, n: usize, variadic: bool) {
    if variadic {
        let fixed = n.saturating_sub(1);
        let _ = writeln!(
            out,
            "\tif len(args) < {} {{\n\t\tpanic(rugoBridgeErr(\"{}.{} expects at least {} arguments\"))\n\t}}",
            fixed, ns, rugo_name, fixed
        );
    } else {
        let _ = writeln!(
            out,
            "\tif len(args) != {} {{\n\t\tpanic(rugoBridgeErr(\"{}.{} expects {} arguments\"))\n\t}}",
            n, ns, rugo_name, n
        );
    }
}

/// Emits the conversion + call + return-convention body for a plain call.
fn emit_plain_call(
    out: &mut String,
    ns: &str,
    rugo_name: &str,
    go_call: &str,
    sig: &BridgedSig,
    args_name: &str,
) {
    arity_check(out, ns, rugo_name, sig.params.len(), sig.variadic);
    let mut call_args = Vec::new();
    let fixed = if sig.variadic {
        sig.params.len().saturating_sub(1)
    } else {
        sig.params.len()
    };
    for (i, tag) in sig.params.iter().take(fixed).enumerate() {
        call_args.push(conv_arg(tag, &format!("{}[{}]", args_name, i)));
    }
    if let (true, Some(elem)) = (sig.variadic, sig.params.last()) {
        let elem_ty = go_type_text(elem).to_string();
        let _ = writeln!(out, "\tva := make([]{}, 0, len({})-{})", elem_ty, args_name, fixed);
        let _ = writeln!(out, "\tfor _, a := range {}[{}:] {{", args_name, fixed);
        let _ = writeln!(out, "\t\tva = append(va, {})", conv_arg(elem, "a"));
        let _ = writeln!(out, "\t}}");
        call_args.push("va...".to_string());
    }
    let call = format!("{}({})", go_call, call_args.join(", "));

    let bool_missing = sig.results.len() == 2
        && sig.results[1] == BridgeTag::Bool
        && !sig.has_error;

    match (sig.results.len(), sig.has_error) {
        (0, false) => {
            let _ = writeln!(out, "\t{}", call);
            let _ = writeln!(out, "\treturn nil");
        }
        (0, true) => {
            let _ = writeln!(out, "\tif err := {}; err != nil {{", call);
            let _ = writeln!(out, "\t\tpanic(rugoBridgeErr(err.Error()))");
            let _ = writeln!(out, "\t}}");
            let _ = writeln!(out, "\treturn nil");
        }
        (1, false) => {
            let _ = writeln!(out, "\tr0 := {}", call);
            let _ = writeln!(out, "\treturn {}", wrap_result(&sig.results[0], "r0"));
        }
        (1, true) => {
            let _ = writeln!(out, "\tr0, err := {}", call);
            let _ = writeln!(out, "\tif err != nil {{");
            let _ = writeln!(out, "\t\tpanic(rugoBridgeErr(err.Error()))");
            let _ = writeln!(out, "\t}}");
            let _ = writeln!(out, "\treturn {}", wrap_result(&sig.results[0], "r0"));
        }
        (2, false) if bool_missing => {
            let _ = writeln!(out, "\tr0, ok := {}", call);
            let _ = writeln!(out, "\tif !ok {{");
            let _ = writeln!(out, "\t\treturn nil");
            let _ = writeln!(out, "\t}}");
            let _ = writeln!(out, "\treturn {}", wrap_result(&sig.results[0], "r0"));
        }
        (n, has_error) => {
            let names: Vec<String> = (0..n).map(|i| format!("r{}", i)).collect();
            let mut lhs = names.join(", ");
            if has_error {
                lhs.push_str(", err");
            }
            let _ = writeln!(out, "\t{} := {}", lhs, call);
            if has_error {
                let _ = writeln!(out, "\tif err != nil {{");
                let _ = writeln!(out, "\t\tpanic(rugoBridgeErr(err.Error()))");
                let _ = writeln!(out, "\t}}");
            }
            let wrapped: Vec<String> = sig
                .results
                .iter()
                .zip(&names)
                .map(|(tag, name)| wrap_result(tag, name))
                .collect();
            let _ = writeln!(out, "\treturn []any{{{}}}", wrapped.join(", "));
        }
    }
}

/// Emits every glue function of a package, deterministically ordered.
pub fn emit_package_glue(pkg: &BridgedPackage) -> String {
    let mut out = String::new();
    for (name, func) in &pkg.functions {
        out.push_str(&emit_fn_glue(&pkg.namespace, name, func));
        out.push('\n');
    }
    out
}

/// Wrapper-type snippets: type definition, dot-get/set/call methods, and
/// the unwrap helper with upcast cases. Returned as `(key, code)` pairs;
/// the code generator emits each key at most once per program.
pub fn emit_wrapper_snippets(
    s: &BridgedStruct,
    all: &[BridgedStruct],
) -> Vec<(String, String)> {
    let mut snippets = Vec::new();
    let mut def = String::new();
    let _ = writeln!(def, "type {} struct {{ v *{} }}", s.wrapper, s.qualified);

    // Dot-get: fields, then upcast accessors for embedded bases.
    let _ = writeln!(def, "func (h {}) rugoGet(name string) any {{", s.wrapper);
    let _ = writeln!(def, "\tswitch name {{");
    for field in &s.fields {
        let _ = writeln!(
            def,
            "\tcase {:?}:\n\t\treturn {}",
            field.rugo_name,
            wrap_result(&field.tag, &format!("h.v.{}", field.go_name))
        );
    }
    for (wrapper, field) in s.embedded.iter().zip(&s.embedded_fields) {
        let rugo_name = rugo_base::names::to_snake_case(field);
        let _ = writeln!(
            def,
            "\tcase {:?}:\n\t\treturn {}{{v: h.v.{}}}",
            rugo_name, wrapper, field
        );
    }
    let _ = writeln!(def, "\t}}");
    let _ = writeln!(
        def,
        "\tpanic(rugoBridgeErr(\"unknown field \" + name + \" on {}\"))",
        s.go_name
    );
    let _ = writeln!(def, "}}");

    // Dot-set.
    let _ = writeln!(
        def,
        "func (h {}) rugoSet(name string, val any) {{",
        s.wrapper
    );
    let _ = writeln!(def, "\tswitch name {{");
    for field in &s.fields {
        let _ = writeln!(
            def,
            "\tcase {:?}:\n\t\th.v.{} = {}\n\t\treturn",
            field.rugo_name,
            field.go_name,
            conv_arg(&field.tag, "val")
        );
    }
    let _ = writeln!(def, "\t}}");
    let _ = writeln!(
        def,
        "\tpanic(rugoBridgeErr(\"unknown field \" + name + \" on {}\"))",
        s.go_name
    );
    let _ = writeln!(def, "}}");

    // Dot-call.
    let _ = writeln!(
        def,
        "func (h {}) rugoCall(name string, args []any) any {{",
        s.wrapper
    );
    let _ = writeln!(def, "\tswitch name {{");
    for (name, method) in &s.methods {
        let _ = writeln!(def, "\tcase {:?}:", name);
        let mut body = String::new();
        emit_plain_call(
            &mut body,
            &s.go_name,
            name,
            &format!("h.v.{}", method.go_call),
            &method.sig,
            "args",
        );
        for line in body.lines() {
            let _ = writeln!(def, "\t{}", line);
        }
    }
    let _ = writeln!(def, "\t}}");
    let _ = writeln!(
        def,
        "\tpanic(rugoBridgeErr(\"unknown method \" + name + \" on {}\"))",
        s.go_name
    );
    let _ = writeln!(def, "}}");
    snippets.push((format!("bridge_wrapper:{}", s.wrapper), def));

    // Unwrap helper with upcast cases.
    let mut unwrap = String::new();
    let _ = writeln!(
        unwrap,
        "func rugoUnwrap_{}(v any) *{} {{",
        s.wrapper, s.qualified
    );
    let _ = writeln!(unwrap, "\tswitch h := v.(type) {{");
    let _ = writeln!(unwrap, "\tcase {}:\n\t\treturn h.v", s.wrapper);
    for (sub, chain) in upcast_chains(s, all) {
        let _ = writeln!(
            unwrap,
            "\tcase {}:\n\t\treturn h.v.{}",
            sub,
            chain.join(".")
        );
    }
    let _ = writeln!(unwrap, "\t}}");
    let _ = writeln!(
        unwrap,
        "\tpanic(rugoBridgeErr(\"expected {} handle\"))",
        s.go_name
    );
    let _ = writeln!(unwrap, "}}");
    snippets.push((format!("bridge_unwrap:{}", s.wrapper), unwrap));

    snippets
}

/// All wrappers whose embedding chains reach `base`, with the Go field
/// path from the sub-struct to the base. Closed under multi-level
/// hierarchies (subclass → abstract base → base).
fn upcast_chains(base: &BridgedStruct, all: &[BridgedStruct]) -> Vec<(String, Vec<String>)> {
    let mut found = Vec::new();
    for s in all {
        if s.wrapper == base.wrapper {
            continue;
        }
        if let Some(chain) = chain_to(s, &base.wrapper, all, 0) {
            found.push((s.wrapper.clone(), chain));
        }
    }
    found.sort();
    found
}

fn chain_to(
    from: &BridgedStruct,
    target: &str,
    all: &[BridgedStruct],
    depth: usize,
) -> Option<Vec<String>> {
    if depth > 8 {
        return None; // cyclic embedding guard
    }
    for (wrapper, field) in from.embedded.iter().zip(&from.embedded_fields) {
        if wrapper == target {
            return Some(vec![field.clone()]);
        }
        if let Some(next) = all.iter().find(|s| &s.wrapper == wrapper) {
            if let Some(mut chain) = chain_to(next, target, all, depth + 1) {
                chain.insert(0, field.clone());
                return Some(chain);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::BridgedFn;
    use std::collections::BTreeMap;

    fn sig(params: Vec<BridgeTag>, results: Vec<BridgeTag>, has_error: bool) -> BridgedSig {
        BridgedSig {
            params,
            results,
            has_error,
            variadic: false,
        }
    }

    #[test]
    fn conversion_expressions() {
        assert_eq!(conv_arg(&BridgeTag::Str, "args[0]"), "rugoToString(args[0])");
        assert_eq!(
            conv_arg(
                &BridgeTag::NamedBasic {
                    cast: "flag.ErrorHandling".into(),
                    underlying: Underlying::Int
                },
                "args[1]"
            ),
            "flag.ErrorHandling(rugoToInt(args[1]))"
        );
        assert_eq!(
            conv_arg(
                &BridgeTag::Handle {
                    wrapper: "RugoH_x_T".into(),
                    value: true
                },
                "a"
            ),
            "*rugoUnwrap_RugoH_x_T(a)"
        );
    }

    #[test]
    fn multi_return_becomes_sequence() {
        let func = BridgedFn {
            go_call: "strings.Cut".into(),
            sig: sig(
                vec![BridgeTag::Str, BridgeTag::Str],
                vec![BridgeTag::Str, BridgeTag::Str, BridgeTag::Bool],
                false,
            ),
            kind: FnKind::Plain,
            doc: String::new(),
            helpers: vec![],
            emitter: None,
        };
        let glue = emit_fn_glue("strings", "cut", &func);
        assert!(glue.contains("func rugoB_strings_cut(args ...any) any {"));
        assert!(glue.contains("r0, r1, r2 := strings.Cut(rugoToString(args[0]), rugoToString(args[1]))"));
        assert!(glue.contains("return []any{r0, r1, r2}"));
    }

    #[test]
    fn error_return_panics_for_try() {
        let func = BridgedFn {
            go_call: "strconv.Atoi".into(),
            sig: sig(vec![BridgeTag::Str], vec![BridgeTag::Int], true),
            kind: FnKind::Plain,
            doc: String::new(),
            helpers: vec![],
            emitter: None,
        };
        let glue = emit_fn_glue("strconv", "atoi", &func);
        assert!(glue.contains("r0, err := strconv.Atoi(rugoToString(args[0]))"));
        assert!(glue.contains("panic(rugoBridgeErr(err.Error()))"));
    }

    #[test]
    fn bool_missing_idiom_returns_nil() {
        let func = BridgedFn {
            go_call: "os.LookupEnv".into(),
            sig: sig(
                vec![BridgeTag::Str],
                vec![BridgeTag::Str, BridgeTag::Bool],
                false,
            ),
            kind: FnKind::Plain,
            doc: String::new(),
            helpers: vec![],
            emitter: None,
        };
        let glue = emit_fn_glue("os", "lookup_env", &func);
        assert!(glue.contains("r0, ok := os.LookupEnv"));
        assert!(glue.contains("return nil"));
    }

    #[test]
    fn autowrap_glue_sizes_destination() {
        let func = BridgedFn {
            go_call: "hex.Encode".into(),
            sig: sig(vec![BridgeTag::Str], vec![BridgeTag::Str], false),
            kind: FnKind::AutoWrap {
                sizer: "hex.EncodedLen".into(),
                has_error: false,
            },
            doc: String::new(),
            helpers: vec![],
            emitter: None,
        };
        let glue = emit_fn_glue("hex", "encode", &func);
        assert!(glue.contains("dst := make([]byte, hex.EncodedLen(len(src)))"));
        assert!(glue.contains("n := hex.Encode(dst, src)"));
        assert!(glue.contains("return string(dst[:n])"));
    }

    #[test]
    fn func_adapter_wraps_lambda() {
        let adapter = func_adapter(
            &sig(vec![BridgeTag::Str], vec![BridgeTag::Bool], false),
            "args[0]",
        );
        assert_eq!(
            adapter,
            "func(fp0 string) bool { return rugoToBool(rugoCall(args[0], fp0)) }"
        );
    }

    #[test]
    fn variadic_glue_converts_tail() {
        let func = BridgedFn {
            go_call: "path.Join".into(),
            sig: BridgedSig {
                params: vec![BridgeTag::Str],
                results: vec![BridgeTag::Str],
                has_error: false,
                variadic: true,
            },
            kind: FnKind::Plain,
            doc: String::new(),
            helpers: vec![],
            emitter: None,
        };
        let glue = emit_fn_glue("path", "join", &func);
        assert!(glue.contains("va := make([]string, 0, len(args)-0)"));
        assert!(glue.contains("path.Join(va...)"));
    }

    fn make_struct(wrapper: &str, qualified: &str, embedded: Vec<(&str, &str)>) -> BridgedStruct {
        BridgedStruct {
            go_name: qualified.rsplit('.').next().unwrap_or(qualified).to_string(),
            key: qualified.to_string(),
            qualified: qualified.to_string(),
            wrapper: wrapper.to_string(),
            fields: vec![],
            methods: BTreeMap::new(),
            embedded: embedded.iter().map(|(w, _)| w.to_string()).collect(),
            embedded_fields: embedded.iter().map(|(_, f)| f.to_string()).collect(),
            external: false,
            import_path: None,
        }
    }

    #[test]
    fn upcast_chain_closes_over_levels() {
        // Sub embeds Mid embeds Base: unwrapping a Base from a Sub handle
        // walks two fields.
        let base = make_struct("W_Base", "pkg.Base", vec![]);
        let mid = make_struct("W_Mid", "pkg.Mid", vec![("W_Base", "Base")]);
        let sub = make_struct("W_Sub", "pkg.Sub", vec![("W_Mid", "Mid")]);
        let all = vec![base.clone(), mid, sub];
        let snippets = emit_wrapper_snippets(&base, &all);
        let unwrap = &snippets[1].1;
        assert!(unwrap.contains("case W_Mid:\n\t\treturn h.v.Base"));
        assert!(unwrap.contains("case W_Sub:\n\t\treturn h.v.Mid.Base"));
    }

    #[test]
    fn wrapper_get_set_call_generated() {
        let mut s = make_struct("W_S", "pkg.Server", vec![]);
        s.fields.push(crate::registry::BridgedField {
            go_name: "Host".into(),
            rugo_name: "host".into(),
            tag: BridgeTag::Str,
        });
        s.methods.insert(
            "start".into(),
            BridgedFn {
                go_call: "Start".into(),
                sig: sig(vec![BridgeTag::Int], vec![], true),
                kind: FnKind::Plain,
                doc: String::new(),
                helpers: vec![],
                emitter: None,
            },
        );
        let snippets = emit_wrapper_snippets(&s, &[s.clone()]);
        let def = &snippets[0].1;
        assert!(def.contains("type W_S struct { v *pkg.Server }"));
        assert!(def.contains("case \"host\":\n\t\treturn h.v.Host"));
        assert!(def.contains("h.v.Host = rugoToString(val)"));
        assert!(def.contains("h.v.Start(rugoToInt(args[0]))"));
    }
}
