//! # rugo-base
//!
//! Structural atoms for the rugo compiler.
//!
//! This crate provides the foundational types used throughout rugo:
//!
//! - [`RugoError`]/[`Result`] — Diagnostics carrying an original source position
//! - [`LineMap`] — Provenance from preprocessed lines back to source lines
//! - [`SourceUnit`] — One source file through the pipeline
//! - [`names`] — Identifier-case helpers shared by the bridge and codegen
//!
//! # Design Principles
//!
//! This crate has **no knowledge of Rugo syntax or of Go**. It provides only
//! generic infrastructure that higher-level crates build upon.
//!
//! # Example
//!
//! ```
//! use rugo_base::{LineMap, RugoError};
//!
//! let mut map = LineMap::new();
//! map.push(1);
//! map.push(1); // one input line expanded to two output lines
//! assert_eq!(map.lookup(1), 1);
//!
//! let err = RugoError::at("unexpected end", "main.rugo", 4);
//! assert_eq!(err.to_string(), "main.rugo:4: unexpected end");
//! ```

pub mod error;
pub mod line_map;
pub mod names;
pub mod source;

pub use error::{Result, RugoError};
pub use line_map::LineMap;
pub use source::{
    has_source_suffix, is_source_path, strip_source_ext, SourceUnit, StructDescriptor,
    SOURCE_EXTENSIONS,
};
