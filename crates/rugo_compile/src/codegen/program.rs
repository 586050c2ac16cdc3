//! Whole-program emission.
//!
//! Produces the single Go compilation unit: import block, core runtime,
//! module runtimes (prelude-stripped), package-level module instances,
//! bridged glue and wrapper snippets, the struct-method dispatch table,
//! promoted package-scope variables, hoisted user functions, and `main`
//! with its top-level recover printing a Rugo-shaped backtrace.
//!
//! `rats` and `bench` blocks are skipped in a normal build; in the
//! corresponding emit mode they become the program's payload (TAP-ish
//! output, regexp filtering via `RUGO_RATS_FILTER`, timing via
//! `RUGO_RATS_TIMING`).

use super::context::{Ctx, NamespaceKind, UserFn};
use super::expr::go_quote;
use super::runtime::{strip_go_prelude, CORE_IMPORTS, CORE_RUNTIME};
use super::stmt::{gen_block_value, gen_stmt};
use super::Env;
use crate::modules::StdlibModule;
use rugo_base::{Result, RugoError, StructDescriptor};
use rugo_bridge::BridgeRegistry;
use rugo_language::ast::{Expr, Program, Stmt, StrPart};
use rustc_hash::FxHashSet;
use std::collections::BTreeMap;
use std::fmt::Write;

/// What `main` should contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitMode {
    Program,
    Rats,
    Bench,
}

/// One `require`d user source unit, already parsed.
#[derive(Debug, Clone)]
pub struct RequiredUnit {
    /// Namespace its functions are called through.
    pub namespace: String,
    pub program: Program,
    pub structs: Vec<StructDescriptor>,
}

/// Everything program emission consumes.
pub struct CodegenInput<'a> {
    pub program: &'a Program,
    pub structs: &'a [StructDescriptor],
    pub required: &'a [RequiredUnit],
    /// Stdlib modules in use, by namespace.
    pub stdlib: BTreeMap<String, &'static StdlibModule>,
    pub bridged: &'a BridgeRegistry,
    pub mode: EmitMode,
}

/// Emits the complete Go source for one build.
pub fn codegen_program(input: &CodegenInput) -> Result<String> {
    let env = Env {
        stdlib: &input.stdlib,
        bridged: input.bridged,
    };

    // Shared callable tables, cloned into each unit's context.
    let mut funcs = rustc_hash::FxHashMap::default();
    collect_funcs(&mut funcs, &input.program.stmts, None)?;
    for unit in input.required {
        collect_funcs(&mut funcs, &unit.program.stmts, Some(&unit.namespace))?;
    }
    let mut namespaces = rustc_hash::FxHashMap::default();
    for ns in input.stdlib.keys() {
        namespaces.insert(ns.clone(), NamespaceKind::Stdlib);
    }
    for pkg in input.bridged.packages() {
        namespaces.insert(pkg.namespace.clone(), NamespaceKind::Bridge);
    }
    for unit in input.required {
        namespaces.insert(
            unit.namespace.clone(),
            NamespaceKind::User {
                prefix: unit.namespace.clone(),
            },
        );
    }

    let mut out = String::new();
    let _ = writeln!(out, "// Code generated by rugo; do not edit.");
    let _ = writeln!(out, "package main");
    let _ = writeln!(out);
    emit_imports(&mut out, input);
    out.push_str(CORE_RUNTIME);

    // Module runtimes, prelude-stripped, each exactly once.
    for module in input.stdlib.values() {
        let _ = writeln!(out, "// ── module runtime: {} ──", module.name);
        out.push_str(&strip_go_prelude(module.runtime));
    }
    for (ns, module) in &input.stdlib {
        let _ = writeln!(out, "var mod_{} = &{}{{}}", ns, module.type_name);
    }
    let _ = writeln!(out);

    // Bridged glue: helper snippets (keyed, deduplicated program-wide),
    // then the uniform call glue.
    let mut emitted_helpers = FxHashSet::default();
    for pkg in input.bridged.packages() {
        for (key, code) in &pkg.helpers {
            if emitted_helpers.insert(key.clone()) {
                out.push_str(code);
            }
        }
    }
    for pkg in input.bridged.packages() {
        out.push_str(&rugo_bridge::emit::emit_package_glue(pkg));
    }

    // Struct-method dispatch table.
    emit_method_table(&mut out, input, &funcs)?;

    // Per-unit generation: required units first, then the entry file.
    let mut body_main = String::new();
    let mut func_defs = String::new();

    for unit in input.required {
        let mut ctx = unit_ctx(&unit.program.path, &funcs, &namespaces);
        ctx.global_prefix = format!("{}_", unit.namespace);
        ctx.fn_prefix = Some(unit.namespace.clone());
        promote_globals(&mut ctx, &unit.program);
        emit_globals(&mut out, &ctx);
        emit_unit_funcs(
            &mut func_defs,
            &mut ctx,
            &env,
            &unit.program,
            Some(&unit.namespace),
        )?;
        let _ = writeln!(body_main, "\t{{");
        emit_top_level(&mut body_main, &mut ctx, &env, &unit.program, EmitMode::Program)?;
        let _ = writeln!(body_main, "\t}}");
    }

    let mut ctx = unit_ctx(&input.program.path, &funcs, &namespaces);
    promote_globals(&mut ctx, input.program);
    emit_globals(&mut out, &ctx);
    emit_unit_funcs(&mut func_defs, &mut ctx, &env, input.program, None)?;
    emit_top_level(&mut body_main, &mut ctx, &env, input.program, input.mode)?;

    out.push_str(&func_defs);
    let _ = writeln!(out, "func main() {{");
    let _ = writeln!(out, "\tdefer func() {{");
    let _ = writeln!(out, "\t\tif r := recover(); r != nil {{");
    let _ = writeln!(out, "\t\t\trugoBacktrace(r)");
    let _ = writeln!(out, "\t\t\tos.Exit(1)");
    let _ = writeln!(out, "\t\t}}");
    let _ = writeln!(out, "\t}}()");
    out.push_str(&body_main);
    let _ = writeln!(out, "}}");
    Ok(out)
}

fn unit_ctx(
    path: &str,
    funcs: &rustc_hash::FxHashMap<String, UserFn>,
    namespaces: &rustc_hash::FxHashMap<String, NamespaceKind>,
) -> Ctx {
    let mut ctx = Ctx::new(path);
    ctx.funcs = funcs.clone();
    ctx.namespaces = namespaces.clone();
    ctx
}

fn collect_funcs(
    funcs: &mut rustc_hash::FxHashMap<String, UserFn>,
    stmts: &[Stmt],
    namespace: Option<&str>,
) -> Result<()> {
    for stmt in stmts {
        if let Stmt::FuncDef(def) = stmt {
            let (key, go_name) = match namespace {
                None => (def.name.clone(), format!("u_{}", def.name)),
                Some(ns) => (
                    format!("{}.{}", ns, def.name),
                    format!("u_{}_{}", ns, def.name),
                ),
            };
            if funcs.contains_key(&key) {
                return Err(RugoError::at(
                    format!("function '{}' is defined twice", def.name),
                    "",
                    def.line,
                ));
            }
            funcs.insert(
                key,
                UserFn {
                    go_name,
                    arity: def.params.len(),
                },
            );
        }
    }
    Ok(())
}

/// Top-level names assigned in the unit and referenced from any `def`
/// body are promoted to package scope.
fn promote_globals(ctx: &mut Ctx, program: &Program) {
    let mut assigned = FxHashSet::default();
    for stmt in &program.stmts {
        if let Stmt::Assign {
            target: rugo_language::ast::AssignTarget::Name(name),
            ..
        } = stmt
        {
            assigned.insert(name.clone());
        }
    }
    let mut referenced = FxHashSet::default();
    for stmt in &program.stmts {
        if let Stmt::FuncDef(def) = stmt {
            collect_idents_stmts(&def.body, &mut referenced);
        }
    }
    for name in assigned.intersection(&referenced) {
        ctx.promote_global(name);
    }
}

fn emit_globals(out: &mut String, ctx: &Ctx) {
    let mut names: Vec<&String> = ctx.globals().collect();
    names.sort();
    for name in names {
        let _ = writeln!(out, "var {} any", ctx.var_name(name));
        let _ = writeln!(out, "var _ = {}", ctx.var_name(name));
    }
}

fn emit_unit_funcs(
    out: &mut String,
    ctx: &mut Ctx,
    env: &Env,
    program: &Program,
    namespace: Option<&str>,
) -> Result<()> {
    for stmt in &program.stmts {
        let Stmt::FuncDef(def) = stmt else { continue };
        let key = match namespace {
            None => def.name.clone(),
            Some(ns) => format!("{}.{}", ns, def.name),
        };
        let go_name = ctx.funcs[&key].go_name.clone();
        ctx.push_scope();
        let mut params = Vec::new();
        for p in &def.params {
            ctx.declare(p)?;
            params.push(format!("{} any", ctx.var_name(p)));
        }
        let was = ctx.in_function;
        ctx.in_function = true;
        let body = gen_block_value(ctx, env, &def.body);
        ctx.in_function = was;
        ctx.pop_scope();

        let _ = writeln!(out, "func {}({}) any {{", go_name, params.join(", "));
        for p in &def.params {
            let _ = writeln!(out, "\t_ = v_{}", p);
        }
        out.push_str(&body?);
        let _ = writeln!(out, "}}");
        let _ = writeln!(out);
    }
    Ok(())
}

/// Struct methods dispatch through one table keyed `Type.method`.
fn emit_method_table(
    out: &mut String,
    input: &CodegenInput,
    funcs: &rustc_hash::FxHashMap<String, UserFn>,
) -> Result<()> {
    let mut entries: Vec<(String, String, usize)> = Vec::new();
    let mut add = |descs: &[StructDescriptor], namespace: Option<&str>| {
        for desc in descs {
            for method in &desc.methods {
                let key = match namespace {
                    None => method.clone(),
                    Some(ns) => format!("{}.{}", ns, method),
                };
                if let Some(func) = funcs.get(&key) {
                    entries.push((
                        format!("{}.{}", desc.name, method),
                        func.go_name.clone(),
                        func.arity,
                    ));
                }
            }
        }
    };
    add(input.structs, None);
    for unit in input.required {
        add(&unit.structs, Some(&unit.namespace));
    }
    entries.sort();

    let _ = writeln!(out, "var rugoMethods = map[string]func(args []any) any{{");
    for (key, go_name, arity) in entries {
        let _ = writeln!(out, "\t{}: func(args []any) any {{", go_quote(&key));
        let _ = writeln!(out, "\t\tif len(args) != {} {{", arity);
        let short = key.rsplit('.').next().unwrap_or(&key).to_string();
        let _ = writeln!(
            out,
            "\t\t\tpanic(fmt.Sprintf(\"wrong number of arguments for {} (%d for {})\", len(args)-1))",
            short,
            arity.saturating_sub(1)
        );
        let _ = writeln!(out, "\t\t}}");
        let call_args: Vec<String> = (0..arity).map(|i| format!("args[{}]", i)).collect();
        let _ = writeln!(out, "\t\treturn {}({})", go_name, call_args.join(", "));
        let _ = writeln!(out, "\t}},");
    }
    let _ = writeln!(out, "}}");
    let _ = writeln!(out, "var _ = rugoMethods");
    let _ = writeln!(out);
    Ok(())
}

fn emit_imports(out: &mut String, input: &CodegenInput) {
    // path → optional alias; BTreeMap keeps the block deterministic.
    let mut imports: BTreeMap<String, Option<String>> = BTreeMap::new();
    for import in CORE_IMPORTS {
        imports.insert((*import).to_string(), None);
    }
    for module in input.stdlib.values() {
        for import in module.extra_imports {
            imports.entry((*import).to_string()).or_insert(None);
        }
    }
    for pkg in input.bridged.packages() {
        imports.insert(pkg.path.clone(), Some(pkg.qualifier.clone()));
        for extra in &pkg.extra_imports {
            let alias = rugo_bridge::wrappers::path_selector(extra);
            imports.entry(extra.clone()).or_insert(Some(alias));
        }
    }
    if input.mode == EmitMode::Rats {
        imports.entry("regexp".to_string()).or_insert(None);
    }
    let _ = writeln!(out, "import (");
    for (path, alias) in &imports {
        match alias {
            Some(alias) if Some(alias.as_str()) != path.rsplit('/').next() => {
                let _ = writeln!(out, "\t{} \"{}\"", alias, path);
            }
            _ => {
                let _ = writeln!(out, "\t\"{}\"", path);
            }
        }
    }
    let _ = writeln!(out, ")");
    let _ = writeln!(out);
}

fn emit_top_level(
    out: &mut String,
    ctx: &mut Ctx,
    env: &Env,
    program: &Program,
    mode: EmitMode,
) -> Result<()> {
    for stmt in &program.stmts {
        match stmt {
            Stmt::Rats { .. } | Stmt::Bench { .. } | Stmt::FuncDef(_) => {}
            other => gen_stmt(ctx, env, out, other)?,
        }
    }
    match mode {
        EmitMode::Program => {}
        EmitMode::Rats => emit_rats_harness(out, ctx, env, program)?,
        EmitMode::Bench => emit_bench_harness(out, ctx, env, program)?,
    }
    Ok(())
}

fn emit_rats_harness(
    out: &mut String,
    ctx: &mut Ctx,
    env: &Env,
    program: &Program,
) -> Result<()> {
    let tests: Vec<(&String, &Vec<Stmt>, u32)> = program
        .stmts
        .iter()
        .filter_map(|s| match s {
            Stmt::Rats { name, body, line } => Some((name, body, *line)),
            _ => None,
        })
        .collect();
    let _ = writeln!(out, "\tfmt.Printf(\"1..%d\\n\", {})", tests.len());
    let _ = writeln!(out, "\trugoFailures := 0");
    let _ = writeln!(out, "\tvar rugoFilter *regexp.Regexp");
    let _ = writeln!(
        out,
        "\tif p := os.Getenv(\"RUGO_RATS_FILTER\"); p != \"\" {{"
    );
    let _ = writeln!(out, "\t\trugoFilter = regexp.MustCompile(p)");
    let _ = writeln!(out, "\t}}");
    let _ = writeln!(out, "\t_ = rugoFilter");
    for (i, (name, body, line)) in tests.iter().enumerate() {
        let n = i + 1;
        let quoted = go_quote(name);
        let _ = writeln!(out, "\tfunc() {{");
        let _ = writeln!(
            out,
            "\t\tif rugoFilter != nil && !rugoFilter.MatchString({}) {{",
            quoted
        );
        let _ = writeln!(
            out,
            "\t\t\tfmt.Printf(\"ok %d - %s # SKIP\\n\", {}, {})",
            n, quoted
        );
        let _ = writeln!(out, "\t\t\treturn");
        let _ = writeln!(out, "\t\t}}");
        let _ = writeln!(out, "\t\trugoStart := time.Now()");
        let _ = writeln!(out, "\t\tdefer func() {{");
        let _ = writeln!(out, "\t\t\tif r := recover(); r != nil {{");
        let _ = writeln!(out, "\t\t\t\trugoFailures++");
        let _ = writeln!(
            out,
            "\t\t\t\tfmt.Printf(\"not ok %d - %s: %s\\n\", {}, {}, rugoPanicMsg(r))",
            n, quoted
        );
        let _ = writeln!(out, "\t\t\t}} else {{");
        let _ = writeln!(
            out,
            "\t\t\t\tfmt.Printf(\"ok %d - %s\\n\", {}, {})",
            n, quoted
        );
        let _ = writeln!(out, "\t\t\t}}");
        let _ = writeln!(
            out,
            "\t\t\tif os.Getenv(\"RUGO_RATS_TIMING\") != \"\" {{"
        );
        let _ = writeln!(
            out,
            "\t\t\t\tfmt.Printf(\"# %s took %s\\n\", {}, time.Since(rugoStart))",
            quoted
        );
        let _ = writeln!(out, "\t\t\t}}");
        let _ = writeln!(out, "\t\t}}()");
        // Isolated from the top-level scope: no implicit captures.
        let saved = ctx.enter_isolated();
        ctx.line = *line;
        let mut body_out = String::new();
        let result: Result<()> = (|| {
            for stmt in body.iter() {
                gen_stmt(ctx, env, &mut body_out, stmt)?;
            }
            Ok(())
        })();
        ctx.exit_isolated(saved);
        result?;
        out.push_str(&body_out);
        let _ = writeln!(out, "\t}}()");
    }
    let _ = writeln!(out, "\tif rugoFailures > 0 {{");
    let _ = writeln!(out, "\t\tos.Exit(1)");
    let _ = writeln!(out, "\t}}");
    Ok(())
}

fn emit_bench_harness(
    out: &mut String,
    ctx: &mut Ctx,
    env: &Env,
    program: &Program,
) -> Result<()> {
    for stmt in &program.stmts {
        let Stmt::Bench { name, body, line } = stmt else {
            continue;
        };
        let quoted = go_quote(name);
        let _ = writeln!(out, "\tfunc() {{");
        let _ = writeln!(out, "\t\tvar rugoBest time.Duration");
        let _ = writeln!(out, "\t\tfor rugoRun := 0; rugoRun < 3; rugoRun++ {{");
        let _ = writeln!(out, "\t\t\trugoStart := time.Now()");
        let _ = writeln!(out, "\t\t\tfunc() {{");
        let saved = ctx.enter_isolated();
        ctx.line = *line;
        let mut body_out = String::new();
        let result: Result<()> = (|| {
            for inner in body.iter() {
                gen_stmt(ctx, env, &mut body_out, inner)?;
            }
            Ok(())
        })();
        ctx.exit_isolated(saved);
        result?;
        out.push_str(&body_out);
        let _ = writeln!(out, "\t\t\t}}()");
        let _ = writeln!(out, "\t\t\trugoTook := time.Since(rugoStart)");
        let _ = writeln!(
            out,
            "\t\t\tif rugoRun == 0 || rugoTook < rugoBest {{ rugoBest = rugoTook }}"
        );
        let _ = writeln!(out, "\t\t}}");
        let _ = writeln!(out, "\t\tfmt.Printf(\"bench %s: %s\\n\", {}, rugoBest)", quoted);
        let _ = writeln!(out, "\t}}()");
    }
    Ok(())
}

/// Collects identifier references (variable reads) across statements.
fn collect_idents_stmts(stmts: &[Stmt], out: &mut FxHashSet<String>) {
    for stmt in stmts {
        match stmt {
            Stmt::Expr { expr, .. } => collect_idents(expr, out),
            Stmt::Assign { target, value, .. } => {
                match target {
                    rugo_language::ast::AssignTarget::Index { base, index } => {
                        collect_idents(base, out);
                        collect_idents(index, out);
                    }
                    rugo_language::ast::AssignTarget::Field { recv, .. } => {
                        collect_idents(recv, out);
                    }
                    rugo_language::ast::AssignTarget::Name(_) => {}
                }
                collect_idents(value, out);
            }
            Stmt::FuncDef(def) => collect_idents_stmts(&def.body, out),
            Stmt::If {
                arms, else_body, ..
            } => {
                for arm in arms {
                    collect_idents(&arm.cond, out);
                    collect_idents_stmts(&arm.body, out);
                }
                collect_idents_stmts(else_body, out);
            }
            Stmt::While { cond, body, .. } => {
                collect_idents(cond, out);
                collect_idents_stmts(body, out);
            }
            Stmt::For {
                iterable, body, ..
            } => {
                collect_idents(iterable, out);
                collect_idents_stmts(body, out);
            }
            Stmt::Return { value, .. } => {
                if let Some(expr) = value {
                    collect_idents(expr, out);
                }
            }
            Stmt::Rats { body, .. } | Stmt::Bench { body, .. } => {
                collect_idents_stmts(body, out);
            }
            _ => {}
        }
    }
}

fn collect_idents(expr: &Expr, out: &mut FxHashSet<String>) {
    match expr {
        Expr::Ident(name) => {
            out.insert(name.clone());
        }
        Expr::Str(parts) => {
            for part in parts {
                if let StrPart::Interp(inner) = part {
                    collect_idents(inner, out);
                }
            }
        }
        Expr::Array(elems) => {
            for e in elems {
                collect_idents(e, out);
            }
        }
        Expr::Hash(pairs) => {
            for (k, v) in pairs {
                collect_idents(k, out);
                collect_idents(v, out);
            }
        }
        Expr::Binary { lhs, rhs, .. } => {
            collect_idents(lhs, out);
            collect_idents(rhs, out);
        }
        Expr::Unary { operand, .. } => collect_idents(operand, out),
        Expr::Call { args, .. } => {
            for a in args {
                collect_idents(a, out);
            }
        }
        Expr::MethodCall { recv, args, .. } => {
            collect_idents(recv, out);
            for a in args {
                collect_idents(a, out);
            }
        }
        Expr::Field { recv, .. } => collect_idents(recv, out),
        Expr::Index { base, index } => {
            collect_idents(base, out);
            collect_idents(index, out);
        }
        Expr::Slice { base, start, end } => {
            collect_idents(base, out);
            if let Some(e) = start {
                collect_idents(e, out);
            }
            if let Some(e) = end {
                collect_idents(e, out);
            }
        }
        Expr::Lambda { body, .. } | Expr::Spawn { body } => collect_idents_stmts(body, out),
        Expr::Parallel { stmts } => collect_idents_stmts(stmts, out),
        Expr::Try { body, handler, .. } => {
            collect_idents_stmts(body, out);
            collect_idents_stmts(handler, out);
        }
        _ => {}
    }
}
