//! Per-package customizations: the custom code-emitter closures.
//!
//! Most bridged calls go through the generic lowering, but a handful of
//! well-known packages have Go APIs the generic rules cannot express
//! naturally:
//!
//! - `sort` mutates its argument in place — the glue copies in, sorts,
//!   and returns the sorted sequence (`xs = sort.strings(xs)`);
//! - `encoding/base64` hides everything behind `StdEncoding` method
//!   chains, so `base64.encode`/`base64.decode` are synthesized outright;
//! - `time` returns a struct the compiled inspector cannot wrap, so
//!   `time.now` and `time.unix` surface as string/integer;
//! - `encoding/json` needs a pre-normalizer that turns Rugo's ordered
//!   mapping into plain Go maps before `json.Marshal` can see it.
//!
//! Each customization either attaches an emitter to an already-registered
//! function or inserts a synthetic one, and hangs any runtime-helper
//! snippet it needs on the package (keyed, emitted at most once per
//! program).

use crate::classify::{BridgeTag, BridgedSig};
use crate::registry::{BridgedFn, BridgedPackage, FnKind};

/// Applies the customizations for `pkg.path`, if any.
pub fn apply(pkg: &mut BridgedPackage) {
    match pkg.path.as_str() {
        "sort" => customize_sort(pkg),
        "encoding/base64" => customize_base64(pkg),
        "time" => customize_time(pkg),
        "encoding/json" => customize_json(pkg),
        _ => {}
    }
}

fn synthetic(params: Vec<BridgeTag>, results: Vec<BridgeTag>, doc: &str, emitter: fn() -> String) -> BridgedFn {
    BridgedFn {
        go_call: String::new(),
        sig: BridgedSig {
            params,
            results,
            has_error: false,
            variadic: false,
        },
        kind: FnKind::Plain,
        doc: doc.to_string(),
        helpers: Vec::new(),
        emitter: Some(emitter),
    }
}

fn customize_sort(pkg: &mut BridgedPackage) {
    // sort.Strings / sort.Ints mutate in place; copy in, copy out.
    if let Some(func) = pkg.functions.get_mut("strings") {
        func.emitter = Some(|| {
            "\txs := rugoToStrSlice(args[0])\n\
             \tsort.Strings(xs)\n\
             \treturn rugoFromStrSlice(xs)\n"
                .to_string()
        });
    }
}

fn customize_base64(pkg: &mut BridgedPackage) {
    pkg.functions.insert(
        "encode".to_string(),
        synthetic(
            vec![BridgeTag::Str],
            vec![BridgeTag::Str],
            "Standard base64 encoding of a string.",
            || {
                "\treturn base64.StdEncoding.EncodeToString([]byte(rugoToString(args[0])))\n"
                    .to_string()
            },
        ),
    );
    pkg.functions.insert(
        "decode".to_string(),
        synthetic(
            vec![BridgeTag::Str],
            vec![BridgeTag::Str],
            "Standard base64 decoding; raises on malformed input.",
            || {
                "\tr0, err := base64.StdEncoding.DecodeString(rugoToString(args[0]))\n\
                 \tif err != nil {\n\t\tpanic(rugoBridgeErr(err.Error()))\n\t}\n\
                 \treturn string(r0)\n"
                    .to_string()
            },
        ),
    );
}

fn customize_time(pkg: &mut BridgedPackage) {
    pkg.functions.insert(
        "now".to_string(),
        synthetic(
            vec![],
            vec![BridgeTag::Str],
            "The current local time as \"2006-01-02 15:04:05\".",
            || "\treturn time.Now().Format(\"2006-01-02 15:04:05\")\n".to_string(),
        ),
    );
    pkg.functions.insert(
        "unix".to_string(),
        synthetic(
            vec![],
            vec![BridgeTag::Int],
            "Seconds since the Unix epoch.",
            || "\treturn int(time.Now().Unix())\n".to_string(),
        ),
    );
}

fn customize_json(pkg: &mut BridgedPackage) {
    // Rugo mappings carry unexported bookkeeping; normalize to plain Go
    // maps before Marshal sees them.
    pkg.helpers.insert(
        "bridge_json_norm".to_string(),
        "func rugoJSONNorm(v any) any {\n\
         \tswitch x := v.(type) {\n\
         \tcase *RugoMap:\n\
         \t\tout := make(map[string]any, len(x.keys))\n\
         \t\tfor _, ck := range x.keys {\n\
         \t\t\tout[rugoToString(x.disp[ck])] = rugoJSONNorm(x.vals[ck])\n\
         \t\t}\n\
         \t\treturn out\n\
         \tcase []any:\n\
         \t\tout := make([]any, len(x))\n\
         \t\tfor i, e := range x {\n\
         \t\t\tout[i] = rugoJSONNorm(e)\n\
         \t\t}\n\
         \t\treturn out\n\
         \t}\n\
         \treturn v\n\
         }\n"
            .to_string(),
    );
    let mut marshal = synthetic(
        vec![BridgeTag::Any],
        vec![BridgeTag::Str],
        "Marshals a value to JSON text; raises on unsupported values.",
        || {
            "\tr0, err := json.Marshal(rugoJSONNorm(args[0]))\n\
             \tif err != nil {\n\t\tpanic(rugoBridgeErr(err.Error()))\n\t}\n\
             \treturn string(r0)\n"
                .to_string()
        },
    );
    marshal.helpers.push("bridge_json_norm".to_string());
    pkg.functions.insert("marshal".to_string(), marshal);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pkg(path: &str) -> BridgedPackage {
        BridgedPackage {
            path: path.to_string(),
            namespace: path.rsplit('/').next().unwrap_or(path).to_string(),
            qualifier: path.rsplit('/').next().unwrap_or(path).to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn base64_gets_synthetic_encode_decode() {
        let mut p = pkg("encoding/base64");
        apply(&mut p);
        assert!(p.functions.contains_key("encode"));
        assert!(p.functions.contains_key("decode"));
        let body = (p.functions["encode"].emitter.unwrap())();
        assert!(body.contains("base64.StdEncoding.EncodeToString"));
    }

    #[test]
    fn json_marshal_normalizes_first() {
        let mut p = pkg("encoding/json");
        apply(&mut p);
        assert!(p.helpers.contains_key("bridge_json_norm"));
        let body = (p.functions["marshal"].emitter.unwrap())();
        assert!(body.contains("json.Marshal(rugoJSONNorm(args[0]))"));
    }

    #[test]
    fn sort_strings_copies_in_and_out() {
        let mut p = pkg("sort");
        p.functions.insert(
            "strings".to_string(),
            synthetic(
                vec![BridgeTag::StrSlice],
                vec![],
                "",
                || String::new(),
            ),
        );
        apply(&mut p);
        let body = (p.functions["strings"].emitter.unwrap())();
        assert!(body.contains("sort.Strings(xs)"));
        assert!(body.contains("rugoFromStrSlice(xs)"));
    }

    #[test]
    fn unrelated_packages_untouched() {
        let mut p = pkg("strings");
        apply(&mut p);
        assert!(p.functions.is_empty());
    }
}
