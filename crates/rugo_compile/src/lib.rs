//! # rugo-compile
//!
//! The rugo compilation pipeline: code generation to Go, the stdlib
//! module registry, the `require` resolver with lockfile-backed remote
//! fetching, and the driver that invokes the Go toolchain.
//!
//! # Pipeline overview
//!
//! ```text
//! .rugo source
//!       │
//!       ▼
//! ┌──────────────────┐
//! │ rugo-preproc     │ canonical text + line map + structs
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │ rugo-language    │ AST with original source lines
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │ resolve          │ use / import / require (rugo-bridge)
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │ codegen          │ one Go file + synthesized go.mod
//! └────────┬─────────┘
//!          ▼
//!      go build
//! ```
//!
//! # Entry points
//!
//! | Function | Use case |
//! |----------|----------|
//! | [`compile::compile_entry`] | emit Go + go.mod for a file |
//! | [`compile::build_binary`]  | full build to a native binary |
//! | [`compile::run_entry`]     | build and execute |

pub mod codegen;
pub mod compile;
pub mod diagnostic;
pub mod fetch;
pub mod lockfile;
pub mod modules;
pub mod resolve;

pub use codegen::{CodegenInput, EmitMode, RequiredUnit};
pub use compile::{build_binary, compile_entry, compile_source, run_entry, BuildOptions, Emitted};
pub use lockfile::{Lockfile, LOCKFILE_NAME};
pub use modules::{lookup as stdlib_lookup, stdlib, StdFn, StdlibModule};
