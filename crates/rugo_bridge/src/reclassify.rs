//! Skip-list reclassification after wrapper synthesis.
//!
//! With struct wrappers and external basics in the classifier context,
//! signatures that were blocked on "pointer to struct", "external type"
//! or "function parameter with struct" resolve into bridgeable ones. A
//! signature registers as soon as *every* parameter and return resolves;
//! otherwise it stays skipped with a refreshed reason.
//!
//! The move is monotone: once registered a function never returns to the
//! skip list within a build, and method-shaped entries (`Type.Method`)
//! stay on the list — they were already handled during wrapper synthesis.

use crate::classify::{classify_signature, ClassifyCtx};
use crate::registry::{BridgedFn, BridgedPackage, FnKind, SkippedFn};
use rugo_base::names::to_snake_case;

/// Re-examines every skipped function; registers the newly resolvable.
/// Returns how many were rescued.
pub fn reclassify(pkg: &mut BridgedPackage, ctx: &ClassifyCtx) -> usize {
    let mut rescued = 0;
    let mut remaining: Vec<SkippedFn> = Vec::new();
    for skip in std::mem::take(&mut pkg.skipped) {
        if skip.go_name.contains('.') {
            remaining.push(skip);
            continue;
        }
        match classify_signature(&skip.sig, ctx) {
            Ok(sig) => {
                let mut helpers = Vec::new();
                for tag in sig.params.iter().chain(sig.results.iter()) {
                    if let crate::classify::BridgeTag::Handle { wrapper, .. } = tag {
                        helpers.push(format!("bridge_wrapper:{}", wrapper));
                        helpers.push(format!("bridge_unwrap:{}", wrapper));
                    }
                }
                let name = to_snake_case(&skip.go_name);
                let used = pkg.register_fn(
                    &name,
                    BridgedFn {
                        go_call: format!("{}.{}", ctx.qualifier, skip.go_name),
                        sig,
                        kind: FnKind::Plain,
                        doc: skip.doc,
                        helpers,
                        emitter: None,
                    },
                );
                log::debug!("bridge: reclassified {} as {}", skip.go_name, used);
                rescued += 1;
            }
            Err(reason) => {
                remaining.push(SkippedFn { reason, ..skip });
            }
        }
    }
    pkg.skipped = remaining;
    rescued
}
