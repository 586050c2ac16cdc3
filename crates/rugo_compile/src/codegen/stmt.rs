//! Statement lowering.
//!
//! Every statement is preceded by a `//line file:N` directive pointing at
//! the original source, so Go's own error positions and panic stacks
//! already speak in Rugo coordinates. Assignments emit a declaration on
//! first sight and an assignment afterwards, always followed by a discard
//! reference so unused bindings never trip the Go compiler.

use super::context::Ctx;
use super::expr::gen_expr;
use super::Env;
use rugo_base::{Result, RugoError};
use rugo_language::ast::{AssignTarget, Expr, Stmt};
use std::fmt::Write;

/// Emits the `//line` directive for a statement. Line directives must
/// start at column one to be honored by the Go toolchain.
fn line_directive(out: &mut String, ctx: &Ctx) {
    let _ = writeln!(out, "//line {}:{}", ctx.path, ctx.line);
}

pub fn gen_stmt(ctx: &mut Ctx, env: &Env, out: &mut String, stmt: &Stmt) -> Result<()> {
    ctx.line = stmt.line();
    match stmt {
        Stmt::Expr { expr, .. } => {
            let code = gen_expr(ctx, env, expr)?;
            line_directive(out, ctx);
            let _ = writeln!(out, "\t_ = {}", code);
        }
        Stmt::Assign { target, value, .. } => {
            gen_assign(ctx, env, out, target, value)?;
        }
        Stmt::If {
            arms, else_body, ..
        } => {
            // Rugo's if-arms are scope-transparent but Go blocks are not:
            // names first assigned inside an arm are hoisted to a `var`
            // declaration so they stay visible after the `if`.
            let mut assigned = rustc_hash::FxHashSet::default();
            for arm in arms {
                collect_transparent_assigns(&arm.body, &mut assigned);
            }
            collect_transparent_assigns(else_body, &mut assigned);
            let mut hoist: Vec<&String> = assigned
                .iter()
                .filter(|n| !ctx.is_declared(n) && !ctx.is_global(n))
                .collect();
            hoist.sort();
            let hoist: Vec<String> = hoist.into_iter().cloned().collect();
            for name in &hoist {
                if ctx.predeclare(name) {
                    let var = ctx.var_name(name);
                    let _ = writeln!(out, "\tvar {} any", var);
                    let _ = writeln!(out, "\t_ = {}", var);
                }
            }
            line_directive(out, ctx);
            for (i, arm) in arms.iter().enumerate() {
                let cond = gen_expr(ctx, env, &arm.cond)?;
                if i == 0 {
                    let _ = writeln!(out, "\tif rugoToBool({}) {{", cond);
                } else {
                    let _ = writeln!(out, "\t}} else if rugoToBool({}) {{", cond);
                }
                // if/elsif/else are transparent to scoping.
                for inner in &arm.body {
                    gen_stmt(ctx, env, out, inner)?;
                }
            }
            if !else_body.is_empty() {
                let _ = writeln!(out, "\t}} else {{");
                for inner in else_body {
                    gen_stmt(ctx, env, out, inner)?;
                }
            }
            let _ = writeln!(out, "\t}}");
        }
        Stmt::While { cond, body, .. } => {
            line_directive(out, ctx);
            let cond_code = gen_expr(ctx, env, cond)?;
            let _ = writeln!(out, "\tfor rugoToBool({}) {{", cond_code);
            ctx.push_scope();
            for inner in body {
                gen_stmt(ctx, env, out, inner)?;
            }
            ctx.pop_scope();
            let _ = writeln!(out, "\t}}");
        }
        Stmt::For {
            vars,
            iterable,
            body,
            ..
        } => {
            gen_for(ctx, env, out, vars, iterable, body)?;
        }
        Stmt::Return { value, .. } => {
            line_directive(out, ctx);
            let code = match value {
                Some(expr) => gen_expr(ctx, env, expr)?,
                None => "nil".to_string(),
            };
            if ctx.in_function {
                let _ = writeln!(out, "\treturn {}", code);
            } else {
                // Top-level return ends the program.
                let _ = writeln!(out, "\t_ = {}", code);
                let _ = writeln!(out, "\treturn");
            }
        }
        Stmt::Break { .. } => {
            line_directive(out, ctx);
            let _ = writeln!(out, "\tbreak");
        }
        Stmt::Continue { .. } => {
            line_directive(out, ctx);
            let _ = writeln!(out, "\tcontinue");
        }
        // Module declarations produce no code; the driver consumed them.
        Stmt::Use { .. } | Stmt::Import { .. } | Stmt::Require { .. } => {}
        // Test and bench blocks only emit in their dedicated modes,
        // handled by program emission.
        Stmt::Rats { .. } | Stmt::Bench { .. } => {}
        Stmt::Sandbox { directive, .. } => {
            let _ = writeln!(out, "\t// sandbox: {}", directive);
        }
        Stmt::FuncDef(def) => {
            // Top-level defs are hoisted by program emission; reaching one
            // here means it was nested.
            return Err(RugoError::at(
                format!("function '{}' cannot be defined inside a block", def.name),
                &ctx.path,
                def.line,
            ));
        }
    }
    Ok(())
}

fn gen_assign(
    ctx: &mut Ctx,
    env: &Env,
    out: &mut String,
    target: &AssignTarget,
    value: &Expr,
) -> Result<()> {
    let value_code = gen_expr(ctx, env, value)?;
    match target {
        AssignTarget::Name(name) => {
            if ctx.is_global(name) {
                // Promoted to package scope; the var declaration exists.
                ctx.assign_global(name)?;
                line_directive(out, ctx);
                let _ = writeln!(out, "\t{} = {}", ctx.var_name(name), value_code);
            } else if ctx.take_hoisted(name) {
                // Hoisted ahead of an if; the declaration already exists.
                let var = ctx.var_name(name);
                line_directive(out, ctx);
                let _ = writeln!(out, "\t{} = {}", var, value_code);
            } else {
                let first = ctx.declare(name)?;
                let var = ctx.var_name(name);
                line_directive(out, ctx);
                if first {
                    // Always `any`-typed: `:=` would freeze the first
                    // value's concrete type and break reassignment.
                    let _ = writeln!(out, "\tvar {} any = {}", var, value_code);
                } else {
                    let _ = writeln!(out, "\t{} = {}", var, value_code);
                }
                let _ = writeln!(out, "\t_ = {}", var);
            }
        }
        AssignTarget::Index { base, index } => {
            let base_code = gen_expr(ctx, env, base)?;
            let index_code = gen_expr(ctx, env, index)?;
            line_directive(out, ctx);
            let _ = writeln!(
                out,
                "\trugoIndexSet({}, {}, {})",
                base_code, index_code, value_code
            );
        }
        AssignTarget::Field { recv, name } => {
            let recv_code = gen_expr(ctx, env, recv)?;
            line_directive(out, ctx);
            let _ = writeln!(
                out,
                "\trugoDotSet({}, {}, {})",
                recv_code,
                super::expr::go_quote(name),
                value_code
            );
        }
    }
    Ok(())
}

fn gen_for(
    ctx: &mut Ctx,
    env: &Env,
    out: &mut String,
    vars: &[String],
    iterable: &Expr,
    body: &[Stmt],
) -> Result<()> {
    line_directive(out, ctx);
    let iter_code = gen_expr(ctx, env, iterable)?;
    ctx.push_scope();
    if vars.len() == 1 {
        ctx.declare(&vars[0])?;
        let var = ctx.var_name(&vars[0]);
        let _ = writeln!(out, "\tfor _, {} := range rugoIterVals({}) {{", var, iter_code);
        let _ = writeln!(out, "\t\t_ = {}", var);
    } else {
        ctx.declare(&vars[0])?;
        ctx.declare(&vars[1])?;
        let a = ctx.var_name(&vars[0]);
        let b = ctx.var_name(&vars[1]);
        let _ = writeln!(
            out,
            "\tfor _, rugoKV := range rugoIterPairs({}) {{",
            iter_code
        );
        let _ = writeln!(out, "\t\t{} := rugoKV[0]", a);
        let _ = writeln!(out, "\t\t{} := rugoKV[1]", b);
        let _ = writeln!(out, "\t\t_, _ = {}, {}", a, b);
    }
    for inner in body {
        gen_stmt(ctx, env, out, inner)?;
    }
    ctx.pop_scope();
    let _ = writeln!(out, "\t}}");
    Ok(())
}

/// Names assigned in scope-transparent positions: directly in the list
/// or inside nested if-arms. Loop, lambda, and block-expression bodies
/// have their own scopes and do not leak.
fn collect_transparent_assigns(stmts: &[Stmt], out: &mut rustc_hash::FxHashSet<String>) {
    for stmt in stmts {
        match stmt {
            Stmt::Assign {
                target: AssignTarget::Name(name),
                ..
            } => {
                out.insert(name.clone());
            }
            Stmt::If {
                arms, else_body, ..
            } => {
                for arm in arms {
                    collect_transparent_assigns(&arm.body, out);
                }
                collect_transparent_assigns(else_body, out);
            }
            _ => {}
        }
    }
}

/// Emits a statement list as the body of a `func() any` closure: the
/// last expression statement becomes the closure's return value, and a
/// trailing `return nil` covers every other shape (including an empty
/// body, so `spawn end` yields a task whose value is nil).
pub fn gen_block_value(ctx: &mut Ctx, env: &Env, stmts: &[Stmt]) -> Result<String> {
    let mut out = String::new();
    for (i, stmt) in stmts.iter().enumerate() {
        let last = i == stmts.len() - 1;
        if last {
            if let Stmt::Expr { expr, line } = stmt {
                ctx.line = *line;
                let code = gen_expr(ctx, env, expr)?;
                line_directive(&mut out, ctx);
                let _ = writeln!(out, "\treturn {}", code);
                return Ok(out);
            }
        }
        let was_in_function = ctx.in_function;
        ctx.in_function = true;
        gen_stmt(ctx, env, &mut out, stmt)?;
        ctx.in_function = was_in_function;
    }
    let _ = writeln!(out, "\treturn nil");
    Ok(out)
}
