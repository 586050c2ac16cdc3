//! Output-buffer auto-wrapping.
//!
//! Go's encoding packages follow a convention: a worker that writes into
//! a caller-allocated destination, paired with a sizing function.
//!
//! ```text
//! func Encode(dst, src []byte) int        +  func EncodedLen(n int) int
//! func Decode(dst, src []byte) (int, error) + func DecodedLen(n int) int
//! ```
//!
//! The bridge replaces such signatures wholesale: the destination
//! disappears, the source is the sole (string) parameter, and the return
//! is the written prefix of an auto-sized destination — which is what
//! makes `hex.encode("hi")` a natural Rugo call.

use crate::gosrc::GoFunc;
use crate::gotype::GoType;

/// One detected worker/sizer pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoWrapSpec {
    /// Worker function name (`Encode`).
    pub func: String,
    /// Sizing function name (`EncodedLen`).
    pub sizer: String,
    /// Worker returns `(int, error)` rather than `int`.
    pub has_error: bool,
}

/// Finds every worker/sizer pair in a scanned function list.
pub fn detect(funcs: &[GoFunc]) -> Vec<AutoWrapSpec> {
    let mut specs = Vec::new();
    for f in funcs {
        if f.receiver.is_some() || f.generic {
            continue;
        }
        let Some(has_error) = dst_src_shape(f) else {
            continue;
        };
        let candidates = [format!("{}dLen", f.name), format!("{}Len", f.name)];
        let sizer = candidates.iter().find(|name| {
            funcs
                .iter()
                .any(|s| s.receiver.is_none() && s.name == **name && int_to_int(s))
        });
        if let Some(sizer) = sizer {
            specs.push(AutoWrapSpec {
                func: f.name.clone(),
                sizer: sizer.clone(),
                has_error,
            });
        }
    }
    specs
}

/// `f(dst, src []byte) int` or `(int, error)`; returns `Some(has_error)`.
fn dst_src_shape(f: &GoFunc) -> Option<bool> {
    if f.sig.params.len() != 2 || f.sig.variadic {
        return None;
    }
    if !f.sig.params.iter().all(|p| is_byte_slice(&p.ty)) {
        return None;
    }
    match f.sig.results.as_slice() {
        [r] if is_int(r) => Some(false),
        [r, e] if is_int(r) && e.is_error() => Some(true),
        _ => None,
    }
}

fn int_to_int(f: &GoFunc) -> bool {
    f.sig.params.len() == 1
        && is_int(&f.sig.params[0].ty)
        && f.sig.results.len() == 1
        && is_int(&f.sig.results[0])
}

fn is_byte_slice(ty: &GoType) -> bool {
    matches!(
        ty,
        GoType::Slice(inner)
            if matches!(inner.as_ref(), GoType::Named { pkg: None, name } if name == "byte" || name == "uint8")
    )
}

fn is_int(ty: &GoType) -> bool {
    matches!(ty, GoType::Named { pkg: None, name } if name == "int")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gosrc::scan_file;

    fn funcs(src: &str) -> Vec<GoFunc> {
        scan_file("t.go", src).unwrap().funcs
    }

    #[test]
    fn detects_encode_decode_pairs() {
        let fs = funcs(
            "package hex\n\
             func EncodedLen(n int) int { return n * 2 }\n\
             func Encode(dst, src []byte) int { return 0 }\n\
             func DecodedLen(x int) int { return x / 2 }\n\
             func Decode(dst, src []byte) (int, error) { return 0, nil }\n",
        );
        let specs = detect(&fs);
        assert_eq!(
            specs,
            vec![
                AutoWrapSpec {
                    func: "Encode".into(),
                    sizer: "EncodedLen".into(),
                    has_error: false,
                },
                AutoWrapSpec {
                    func: "Decode".into(),
                    sizer: "DecodedLen".into(),
                    has_error: true,
                },
            ]
        );
    }

    #[test]
    fn plain_len_suffix_also_matches() {
        let fs = funcs(
            "package p\n\
             func PackLen(n int) int { return n }\n\
             func Pack(dst, src []byte) int { return 0 }\n",
        );
        let specs = detect(&fs);
        assert_eq!(specs[0].sizer, "PackLen");
    }

    #[test]
    fn no_sizer_no_wrap() {
        let fs = funcs("package p\nfunc Copy(dst, src []byte) int { return 0 }\n");
        assert!(detect(&fs).is_empty());
    }

    #[test]
    fn wrong_shapes_ignored() {
        let fs = funcs(
            "package p\n\
             func FooLen(n int) int { return n }\n\
             func Foo(dst []byte, src string) int { return 0 }\n",
        );
        assert!(detect(&fs).is_empty());
    }
}
