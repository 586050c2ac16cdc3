//! Expression lowering: every Rugo expression becomes one Go expression
//! of type `any` (or a concrete type that converts implicitly).
//!
//! Concrete-type coercion happens only at boundaries — arithmetic
//! operands, indexing, bridge calls — via the runtime dispatchers
//! (`rugoAdd`, `rugoIndex`, ...). `try`, `spawn` and `parallel` lower to
//! immediately invoked function literals so they stay expressions.

use super::context::{Ctx, NamespaceKind};
use super::stmt::gen_block_value;
use super::Env;
use rugo_base::Result;
use rugo_language::ast::{BinOp, Expr, StrPart, UnOp};

/// Quotes a string for emission as a Go string literal.
pub fn go_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\x00"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

pub fn gen_expr(ctx: &mut Ctx, env: &Env, expr: &Expr) -> Result<String> {
    match expr {
        Expr::Int(n) => Ok(n.to_string()),
        Expr::Float(f) => {
            let text = f.to_string();
            if text.contains('.') || text.contains('e') {
                Ok(text)
            } else {
                Ok(format!("{}.0", text))
            }
        }
        Expr::Bool(b) => Ok(b.to_string()),
        Expr::Nil => Ok("nil".to_string()),
        Expr::Str(parts) => gen_string(ctx, env, parts),
        Expr::Array(elems) => {
            let parts: Result<Vec<String>> =
                elems.iter().map(|e| gen_expr(ctx, env, e)).collect();
            Ok(format!("[]any{{{}}}", parts?.join(", ")))
        }
        Expr::Hash(pairs) => {
            let mut flat = Vec::with_capacity(pairs.len() * 2);
            for (k, v) in pairs {
                flat.push(gen_expr(ctx, env, k)?);
                flat.push(gen_expr(ctx, env, v)?);
            }
            Ok(format!("rugoMapLit({})", flat.join(", ")))
        }
        Expr::Ident(name) => {
            if ctx.is_declared(name) {
                Ok(ctx.var_name(name))
            } else {
                Err(ctx.error(format!("undefined variable '{}'", name)))
            }
        }
        Expr::Binary { op, lhs, rhs } => gen_binary(ctx, env, *op, lhs, rhs),
        Expr::Unary { op, operand } => {
            let inner = gen_expr(ctx, env, operand)?;
            Ok(match op {
                UnOp::Neg => format!("rugoNeg({})", inner),
                UnOp::Not => format!("rugoNot({})", inner),
            })
        }
        Expr::Call { name, args } => gen_call(ctx, env, name, args),
        Expr::MethodCall { recv, name, args } => gen_method_call(ctx, env, recv, name, args),
        Expr::Field { recv, name } => gen_field(ctx, env, recv, name),
        Expr::Index { base, index } => {
            let b = gen_expr(ctx, env, base)?;
            let i = gen_expr(ctx, env, index)?;
            Ok(format!("rugoIndex({}, {})", b, i))
        }
        Expr::Slice { base, start, end } => {
            let b = gen_expr(ctx, env, base)?;
            let lo = match start {
                Some(e) => gen_expr(ctx, env, e)?,
                None => "nil".to_string(),
            };
            let hi = match end {
                Some(e) => gen_expr(ctx, env, e)?,
                None => "nil".to_string(),
            };
            Ok(format!("rugoSlice({}, {}, {})", b, lo, hi))
        }
        Expr::Lambda { params, body } => gen_lambda(ctx, env, params, body),
        Expr::Spawn { body } => gen_spawn(ctx, env, body),
        Expr::Parallel { stmts } => gen_parallel(ctx, env, stmts),
        Expr::Try {
            body,
            err_name,
            handler,
        } => gen_try(ctx, env, body, err_name.as_deref(), handler),
    }
}

fn gen_string(ctx: &mut Ctx, env: &Env, parts: &[StrPart]) -> Result<String> {
    if parts.len() == 1 {
        if let StrPart::Lit(lit) = &parts[0] {
            return Ok(go_quote(lit));
        }
    }
    let mut pieces = Vec::with_capacity(parts.len());
    for part in parts {
        match part {
            StrPart::Lit(lit) => pieces.push(go_quote(lit)),
            StrPart::Interp(expr) => {
                let inner = gen_expr(ctx, env, expr)?;
                pieces.push(format!("rugoToString({})", inner));
            }
        }
    }
    if pieces.is_empty() {
        return Ok("\"\"".to_string());
    }
    Ok(format!("({})", pieces.join(" + ")))
}

fn gen_binary(ctx: &mut Ctx, env: &Env, op: BinOp, lhs: &Expr, rhs: &Expr) -> Result<String> {
    let l = gen_expr(ctx, env, lhs)?;
    let r = gen_expr(ctx, env, rhs)?;
    Ok(match op {
        BinOp::Add => format!("rugoAdd({}, {})", l, r),
        BinOp::Sub => format!("rugoSub({}, {})", l, r),
        BinOp::Mul => format!("rugoMul({}, {})", l, r),
        BinOp::Div => format!("rugoDiv({}, {})", l, r),
        BinOp::Mod => format!("rugoMod({}, {})", l, r),
        BinOp::Eq => format!("rugoEq({}, {})", l, r),
        BinOp::NotEq => format!("!rugoEq({}, {})", l, r),
        BinOp::Lt => format!("(rugoCompare({}, {}) < 0)", l, r),
        BinOp::LtEq => format!("(rugoCompare({}, {}) <= 0)", l, r),
        BinOp::Gt => format!("(rugoCompare({}, {}) > 0)", l, r),
        BinOp::GtEq => format!("(rugoCompare({}, {}) >= 0)", l, r),
        BinOp::And => format!("rugoAnd({}, func() any {{ return {} }})", l, r),
        BinOp::Or => format!("rugoOr({}, func() any {{ return {} }})", l, r),
    })
}

fn gen_args(ctx: &mut Ctx, env: &Env, args: &[Expr]) -> Result<Vec<String>> {
    args.iter().map(|a| gen_expr(ctx, env, a)).collect()
}

fn gen_call(ctx: &mut Ctx, env: &Env, name: &str, args: &[Expr]) -> Result<String> {
    // Internal shell calls emitted by the preprocessor.
    match name {
        "__shell" | "__shell_capture" if args.len() == 1 => {
            let cmd = gen_expr(ctx, env, &args[0])?;
            let helper = if name == "__shell" {
                "rugoShell"
            } else {
                "rugoShellCapture"
            };
            return Ok(format!("{}(rugoToString({}))", helper, cmd));
        }
        "__shell_pipe" if args.len() == 2 => {
            let cmd = gen_expr(ctx, env, &args[0])?;
            let input = gen_expr(ctx, env, &args[1])?;
            return Ok(format!(
                "rugoShellPipe(rugoToString({}), {})",
                cmd, input
            ));
        }
        _ => {}
    }

    if let Some(builtin) = gen_builtin(ctx, env, name, args)? {
        return Ok(builtin);
    }

    if let Some(func) = env.lookup_fn(ctx, name) {
        if args.len() != func.arity {
            return Err(ctx.error(format!(
                "wrong number of arguments for {} ({} for {})",
                name,
                args.len(),
                func.arity
            )));
        }
        let go_name = func.go_name.clone();
        return Ok(format!("{}({})", go_name, gen_args(ctx, env, args)?.join(", ")));
    }

    // A lambda held in a variable.
    if ctx.is_declared(name) {
        let mut call_args = vec![ctx.var_name(name)];
        call_args.extend(gen_args(ctx, env, args)?);
        return Ok(format!("rugoCall({})", call_args.join(", ")));
    }

    Err(ctx.error(format!("unknown function '{}'", name)))
}

fn gen_builtin(ctx: &mut Ctx, env: &Env, name: &str, args: &[Expr]) -> Result<Option<String>> {
    let gen = |ctx: &mut Ctx, args: &[Expr]| -> Result<String> {
        Ok(gen_args(ctx, env, args)?.join(", "))
    };
    let out = match name {
        "puts" => format!("rugoPuts({})", gen(ctx, args)?),
        "print" => format!("rugoPrint({})", gen(ctx, args)?),
        "len" => {
            expect_arity(ctx, "len", args, 1)?;
            format!("rugoLen({})", gen(ctx, args)?)
        }
        "append" => {
            if args.len() < 2 {
                return Err(ctx.error(format!(
                    "wrong number of arguments for append ({} for 2+)",
                    args.len()
                )));
            }
            format!("rugoAppend({})", gen(ctx, args)?)
        }
        "raise" => {
            expect_arity(ctx, "raise", args, 1)?;
            format!("rugoRaise({})", gen(ctx, args)?)
        }
        "type" => {
            expect_arity(ctx, "type", args, 1)?;
            format!("rugoType({})", gen(ctx, args)?)
        }
        "exit" => {
            if args.is_empty() {
                "rugoExit(0)".to_string()
            } else {
                expect_arity(ctx, "exit", args, 1)?;
                format!("rugoExit({})", gen(ctx, args)?)
            }
        }
        "sleep" => {
            expect_arity(ctx, "sleep", args, 1)?;
            format!("rugoSleep({})", gen(ctx, args)?)
        }
        "gets" => {
            expect_arity(ctx, "gets", args, 0)?;
            "rugoGets()".to_string()
        }
        _ => return Ok(None),
    };
    Ok(Some(out))
}

fn expect_arity(ctx: &Ctx, name: &str, args: &[Expr], n: usize) -> Result<()> {
    if args.len() != n {
        return Err(ctx.error(format!(
            "wrong number of arguments for {} ({} for {})",
            name,
            args.len(),
            n
        )));
    }
    Ok(())
}

fn gen_method_call(
    ctx: &mut Ctx,
    env: &Env,
    recv: &Expr,
    name: &str,
    args: &[Expr],
) -> Result<String> {
    // Namespace call: `conv.to_i(x)`, `hex.encode(s)`, `util.pad(s)`.
    if let Expr::Ident(ns) = recv {
        if let Some(kind) = ctx.namespaces.get(ns).cloned() {
            return gen_namespace_call(ctx, env, ns, &kind, name, args);
        }
    }
    let recv_expr = gen_expr(ctx, env, recv)?;
    let mut call_args = vec![recv_expr, go_quote(name)];
    call_args.extend(gen_args(ctx, env, args)?);
    Ok(format!("rugoMethod({})", call_args.join(", ")))
}

fn gen_namespace_call(
    ctx: &mut Ctx,
    env: &Env,
    ns: &str,
    kind: &NamespaceKind,
    name: &str,
    args: &[Expr],
) -> Result<String> {
    match kind {
        NamespaceKind::Stdlib => {
            let module = env
                .stdlib
                .get(ns)
                .ok_or_else(|| ctx.error(format!("unknown module '{}'", ns)))?;
            let func = module
                .functions
                .iter()
                .find(|f| f.name == name)
                .ok_or_else(|| ctx.error(format!("unknown function '{}.{}'", ns, name)))?;
            if !func.variadic && args.len() != func.arity {
                return Err(ctx.error(format!(
                    "wrong number of arguments for {}.{} ({} for {})",
                    ns,
                    name,
                    args.len(),
                    func.arity
                )));
            }
            Ok(format!(
                "mod_{}.{}({})",
                ns,
                func.go_method,
                gen_args(ctx, env, args)?.join(", ")
            ))
        }
        NamespaceKind::Bridge => {
            let pkg = env
                .bridged
                .by_namespace(ns)
                .ok_or_else(|| ctx.error(format!("unknown package namespace '{}'", ns)))?;
            let func = pkg
                .functions
                .get(name)
                .ok_or_else(|| ctx.error(format!("unknown function '{}.{}'", ns, name)))?;
            if !func.sig.variadic && args.len() != func.sig.params.len() {
                return Err(ctx.error(format!(
                    "wrong number of arguments for {}.{} ({} for {})",
                    ns,
                    name,
                    args.len(),
                    func.sig.params.len()
                )));
            }
            for key in &func.helpers {
                ctx.used_helpers.insert(key.clone());
            }
            Ok(format!(
                "{}({})",
                rugo_bridge::emit::glue_fn_name(ns, name),
                gen_args(ctx, env, args)?.join(", ")
            ))
        }
        NamespaceKind::User { prefix } => {
            let key = format!("{}.{}", ns, name);
            let func = ctx
                .funcs
                .get(&key)
                .cloned()
                .ok_or_else(|| ctx.error(format!("unknown function '{}.{}'", ns, name)))?;
            if args.len() != func.arity {
                return Err(ctx.error(format!(
                    "wrong number of arguments for {}.{} ({} for {})",
                    ns,
                    name,
                    args.len(),
                    func.arity
                )));
            }
            let _ = prefix;
            Ok(format!(
                "{}({})",
                func.go_name,
                gen_args(ctx, env, args)?.join(", ")
            ))
        }
    }
}

fn gen_field(ctx: &mut Ctx, env: &Env, recv: &Expr, name: &str) -> Result<String> {
    // A namespace field read is a zero-argument call.
    if let Expr::Ident(ns) = recv {
        if let Some(kind) = ctx.namespaces.get(ns).cloned() {
            return gen_namespace_call(ctx, env, ns, &kind, name, &[]);
        }
    }
    let recv_expr = gen_expr(ctx, env, recv)?;
    Ok(format!("rugoDot({}, {})", recv_expr, go_quote(name)))
}

fn gen_lambda(
    ctx: &mut Ctx,
    env: &Env,
    params: &[String],
    body: &[rugo_language::ast::Stmt],
) -> Result<String> {
    ctx.push_scope();
    let mut header = String::new();
    for (i, p) in params.iter().enumerate() {
        ctx.declare(p)?;
        header.push_str(&format!("\t{} := args[{}]\n", ctx.var_name(p), i));
        header.push_str(&format!("\t_ = {}\n", ctx.var_name(p)));
    }
    let was_in_function = ctx.in_function;
    ctx.in_function = true;
    let body_code = gen_block_value(ctx, env, body);
    ctx.in_function = was_in_function;
    ctx.pop_scope();
    let body_code = body_code?;
    Ok(format!(
        "&RugoFunc{{Arity: {}, Fn: func(args []any) any {{\n{}{}}}}}",
        params.len(),
        header,
        body_code
    ))
}

fn gen_spawn(ctx: &mut Ctx, env: &Env, body: &[rugo_language::ast::Stmt]) -> Result<String> {
    ctx.push_scope();
    let body_code = gen_block_value(ctx, env, body);
    ctx.pop_scope();
    let body_code = body_code?;
    Ok(format!(
        "func() any {{\n\
         \tt := rugoNewTask()\n\
         \tgo func() {{\n\
         \t\tdefer func() {{\n\
         \t\t\tif r := recover(); r != nil {{\n\
         \t\t\t\tt.err = rugoPanicMsg(r)\n\
         \t\t\t}}\n\
         \t\t\tclose(t.done)\n\
         \t\t}}()\n\
         \t\tt.result = func() any {{\n{}}}()\n\
         \t}}()\n\
         \treturn t\n\
         }}()",
        body_code
    ))
}

fn gen_parallel(ctx: &mut Ctx, env: &Env, stmts: &[rugo_language::ast::Stmt]) -> Result<String> {
    let mut out = String::new();
    out.push_str("func() any {\n");
    out.push_str(&format!("\tresults := make([]any, {})\n", stmts.len()));
    out.push_str("\tvar wg sync.WaitGroup\n");
    out.push_str("\tvar once sync.Once\n");
    out.push_str("\tvar firstErr any\n");
    out.push_str("\t_ = &once\n");
    for (i, stmt) in stmts.iter().enumerate() {
        ctx.push_scope();
        let value = gen_block_value(ctx, env, std::slice::from_ref(stmt));
        ctx.pop_scope();
        let value = value?;
        out.push_str("\twg.Add(1)\n");
        out.push_str("\tgo func() {\n");
        out.push_str("\t\tdefer rugoParallelDone(&wg, &once, &firstErr)\n");
        out.push_str(&format!(
            "\t\tresults[{}] = func() any {{\n{}}}()\n",
            i, value
        ));
        out.push_str("\t}()\n");
    }
    out.push_str("\twg.Wait()\n");
    out.push_str("\tif firstErr != nil {\n\t\tpanic(firstErr)\n\t}\n");
    out.push_str("\treturn results\n");
    out.push_str("}()");
    Ok(out)
}

fn gen_try(
    ctx: &mut Ctx,
    env: &Env,
    body: &[rugo_language::ast::Stmt],
    err_name: Option<&str>,
    handler: &[rugo_language::ast::Stmt],
) -> Result<String> {
    ctx.push_scope();
    let body_code = gen_block_value(ctx, env, body);
    ctx.pop_scope();
    let body_code = body_code?;

    let recover_body = if err_name.is_some() || !handler.is_empty() {
        ctx.push_scope();
        let bind = match err_name {
            Some(name) => {
                ctx.declare(name)?;
                let var = ctx.var_name(name);
                format!(
                    "\t\t\t\tvar {} any = rugoPanicMsg(r)\n\t\t\t\t_ = {}\n",
                    var, var
                )
            }
            None => String::new(),
        };
        let handler_code = gen_block_value(ctx, env, handler);
        ctx.pop_scope();
        format!(
            "{}\t\t\t\tret = func() any {{\n{}}}()\n",
            bind, handler_code?
        )
    } else {
        // No handler: the expression recovers to nil.
        "\t\t\t\tret = nil\n".to_string()
    };

    Ok(format!(
        "func() any {{\n\
         \tvar ret any\n\
         \tfunc() {{\n\
         \t\tdefer func() {{\n\
         \t\t\tif r := recover(); r != nil {{\n\
         {}\
         \t\t\t}}\n\
         \t\t}}()\n\
         \t\tret = func() any {{\n{}}}()\n\
         \t}}()\n\
         \treturn ret\n\
         }}()",
        recover_body, body_code
    ))
}
