//! # rugo-bridge
//!
//! The native-package bridge: introspects Go packages and synthesizes
//! the call-site glue, struct wrappers and type reclassification that
//! make Go functions first-class Rugo callables.
//!
//! # Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ gosrc      declaration scanner (signatures, structs)    │
//! │ gotype     parsed Go type model                         │
//! ├─────────────────────────────────────────────────────────┤
//! │ classify   type → bridge tag + tier                     │
//! │ autowrap   output-buffer pattern (hex.Encode + len)     │
//! ├─────────────────────────────────────────────────────────┤
//! │ inspect    source introspection  (require)              │
//! │ compiled   compiled introspection (import)              │
//! │ wrappers   FinalizeStructs: handles, externals, upcasts │
//! │ reclassify skip-list rescue after wrappers exist        │
//! ├─────────────────────────────────────────────────────────┤
//! │ registry   per-build package records                    │
//! │ emit       Go glue: conversions, return conventions     │
//! │ custom     per-package emitters (sort, base64, json)    │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! The registry is a build-context object owned by the compiler driver;
//! nothing in this crate is process-global. The classification state
//! machine is monotone within a build: unseen → registered | skipped,
//! and reclassification only ever rescues skipped entries.

pub mod autowrap;
pub mod classify;
pub mod compiled;
pub mod custom;
pub mod emit;
pub mod gosrc;
pub mod gotype;
pub mod inspect;
pub mod reclassify;
pub mod registry;
pub mod wrappers;

pub use classify::{BridgeTag, BridgedSig, ClassifyCtx, Tier};
pub use compiled::{go_toolchain_available, inspect_compiled_package};
pub use inspect::inspect_source_package;
pub use registry::{BridgeRegistry, BridgedFn, BridgedPackage, BridgedStruct, FnKind, SkippedFn};
pub use wrappers::{finalize_structs, DepLoader, NoDeps};
