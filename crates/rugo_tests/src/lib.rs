//! End-to-end test aggregation crate.
//!
//! Empty on purpose: the tests under `tests/` exercise the public
//! surfaces of the pipeline crates together (preprocessor → parser →
//! code generator → bridge) without any of them depending on each other
//! in their dev-dependencies.
