//! Code generation from the rugo AST to Go source.
//!
//! # Pipeline position
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ .rugo → preprocess → parse → resolve modules → HERE      │
//! └──────────────────────────────────────────────────────────┘
//!                                                   ↓
//!                                       one Go file + go.mod
//! ```
//!
//! # Lowering rules
//!
//! | Rugo                   | Go                                        |
//! |------------------------|-------------------------------------------|
//! | `x = 1`                | `var v_x any = 1`, then `v_x = ...`       |
//! | `a + b`                | `rugoAdd(v_a, v_b)`                       |
//! | `xs[i]` / `xs[-1]`     | `rugoIndex(v_xs, ...)`                    |
//! | `try E or err ... end` | IIFE with deferred recover                |
//! | `spawn ... end`        | IIFE returning a task handle              |
//! | `parallel ... end`     | IIFE, one goroutine per statement         |
//! | `d.bark()`             | `rugoMethod(v_d, "bark")`                 |
//! | `conv.to_i(x)`         | `mod_conv.ToI(v_x)`                       |
//! | `hex.encode(s)`        | `rugoB_hex_encode(v_s)`                   |
//! | `ls -la` (fallback)    | `rugoShell("ls -la")`                     |
//!
//! Every statement is preceded by a `//line` directive so toolchain
//! errors and panic backtraces point at the original source.

pub mod context;
pub mod expr;
pub mod program;
pub mod runtime;
pub mod stmt;

use crate::modules::StdlibModule;
use context::{Ctx, UserFn};
use rugo_bridge::BridgeRegistry;
use std::collections::BTreeMap;

pub use program::{codegen_program, CodegenInput, EmitMode, RequiredUnit};

/// Read-only lookup environment shared by expression and statement
/// generation.
pub struct Env<'a> {
    pub stdlib: &'a BTreeMap<String, &'static StdlibModule>,
    pub bridged: &'a BridgeRegistry,
}

impl Env<'_> {
    /// Resolves a bare function name: inside a required unit the unit's
    /// own functions win, then entry-file functions.
    pub fn lookup_fn(&self, ctx: &Ctx, name: &str) -> Option<UserFn> {
        if let Some(prefix) = &ctx.fn_prefix {
            if let Some(func) = ctx.funcs.get(&format!("{}.{}", prefix, name)) {
                return Some(func.clone());
            }
        }
        ctx.funcs.get(name).cloned()
    }
}
