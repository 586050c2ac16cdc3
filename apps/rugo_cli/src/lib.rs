//! Command implementations for the `rugo` binary.
//!
//! The binary in `main.rs` is a thin wrapper; everything testable lives
//! here: argument parsing and dispatch ([`cli`]), the `rats`/`bench`
//! runners ([`rats`]), `#`-comment doc extraction ([`doc`]), lockfile
//! maintenance ([`modcmd`]) and tool installation ([`tool`]).

pub mod cli;
pub mod doc;
pub mod modcmd;
pub mod rats;
pub mod tool;

pub use cli::run_cli;
