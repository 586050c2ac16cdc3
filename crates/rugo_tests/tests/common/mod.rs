//! Shared helpers for the end-to-end tests.

use rugo_compile::{BuildOptions, EmitMode, Lockfile};
use std::path::Path;

/// Compiles rugo source text to Go source, with no base directory (so
/// requires are not usable from here — use a tempdir helper for those).
pub fn emit(src: &str) -> String {
    emit_with(src, EmitMode::Program)
}

pub fn emit_with(src: &str, mode: EmitMode) -> String {
    let opts = BuildOptions {
        mode,
        ..Default::default()
    };
    rugo_compile::compile_source("test.rugo", src, Path::new("."), Lockfile::default(), &opts)
        .expect("compilation should succeed")
        .go_source
}

/// Compiles and returns the error.
pub fn emit_err(src: &str) -> rugo_base::RugoError {
    rugo_compile::compile_source(
        "test.rugo",
        src,
        Path::new("."),
        Lockfile::default(),
        &BuildOptions::default(),
    )
    .expect_err("compilation should fail")
}

/// Preprocesses source text.
pub fn preprocess(src: &str) -> rugo_preproc::PreprocessOutput {
    rugo_preproc::preprocess("test.rugo", src).expect("preprocessing should succeed")
}
