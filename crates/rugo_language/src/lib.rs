//! # rugo-language
//!
//! Lexer, parser and AST for canonical rugo source — the text the
//! preprocessor produces.
//!
//! # Pipeline position
//!
//! ```text
//! raw .rugo ──preprocess──▶ canonical text + line map ──HERE──▶ AST
//! ```
//!
//! The grammar is LL(1) with the precedence tower `||` < `&&` <
//! comparison < additive < multiplicative < unary < postfix. The
//! original design's separate parse/walk stages are one typed
//! recursive-descent parser here; its contract is unchanged: a purely
//! structural [`Program`] whose statements carry original source lines
//! resolved through the preprocessor's line map.
//!
//! # Example
//!
//! ```
//! use rugo_base::LineMap;
//!
//! let src = "x = 1\nputs(x)\n";
//! let map = LineMap::identity(2);
//! let program = rugo_language::parse_program("demo.rugo", src, &map).unwrap();
//! assert_eq!(program.stmts.len(), 2);
//! ```

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::{AssignTarget, BinOp, Expr, FuncDef, IfArm, Program, Stmt, StrPart, UnOp};
pub use parser::parse_program;
