//! rugo — standalone binary.
//!
//! A thin wrapper around [`rugo_cli::run_cli`]: all command logic lives
//! in the library crate for testability.
//!
//! # Exit codes
//!
//! - `0` — success
//! - `1` — user error (preprocessor, compile, or test failure)
//! - `2` — internal error

fn main() {
    env_logger::init();
    std::process::exit(rugo_cli::run_cli());
}
