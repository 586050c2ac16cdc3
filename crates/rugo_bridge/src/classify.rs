//! Host-type classification: every Go type maps to a bridge tag and a
//! bridgeability tier.
//!
//! Tiers, in order:
//!
//! - **auto** — converts with no host-level cast: `string`, `int`,
//!   `float64`, `bool`, `byte`, `error` (return position only),
//!   `[]string`, and the empty interface;
//! - **castable** — needs one explicit cast at the boundary: named
//!   integer/enum aliases, narrow integer widths, `[]byte`, and
//!   value-type "string view" structs whose `NewXxx(string)` constructor
//!   lets the bridge build them from a Rugo string;
//! - **func-param** — function values whose sub-signature recursively
//!   classifies to basic tags;
//! - **blocked** — everything else, until (and unless) struct wrappers
//!   make it resolvable.
//!
//! A signature's tier is the max of its parts. Classification never
//! consults the network or the Go toolchain — everything it needs is in
//! the [`ClassifyCtx`] the inspector builds.

use crate::gotype::{GoSignature, GoType};
use std::collections::HashMap;

/// Bridgeability tier; ordered from cheapest to impossible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    Auto,
    Castable,
    FuncParam,
    Blocked,
}

/// Underlying kind of a named basic type; picks the coercion helper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Underlying {
    Int,
    Float,
    Str,
    Bool,
}

/// How one parameter or result crosses the bridge.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeTag {
    Str,
    Int,
    Float,
    Bool,
    Byte,
    /// `interface{}` / `any`: passes through unchanged.
    Any,
    StrSlice,
    ByteSlice,
    /// `error` in the last result position.
    ErrorRet,
    /// Named basic type needing an explicit cast (`flag.ErrorHandling`,
    /// `int8`).
    NamedBasic { cast: String, underlying: Underlying },
    /// Value struct built from a string via its conventional constructor.
    StringView { ctor: String, deref: bool },
    /// Function-typed parameter; a Rugo lambda is adapted to it.
    FuncValue(Box<BridgedSig>),
    /// Struct handle (opaque wrapper). `value` means the host side takes
    /// the struct by value, so unwrapping dereferences the pointer.
    Handle { wrapper: String, value: bool },
}

impl BridgeTag {
    pub fn tier(&self) -> Tier {
        match self {
            BridgeTag::Str
            | BridgeTag::Int
            | BridgeTag::Float
            | BridgeTag::Bool
            | BridgeTag::Byte
            | BridgeTag::Any
            | BridgeTag::StrSlice
            | BridgeTag::ErrorRet => Tier::Auto,
            BridgeTag::ByteSlice
            | BridgeTag::NamedBasic { .. }
            | BridgeTag::StringView { .. }
            | BridgeTag::Handle { .. } => Tier::Castable,
            BridgeTag::FuncValue(_) => Tier::FuncParam,
        }
    }
}

/// A fully classified signature.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgedSig {
    pub params: Vec<BridgeTag>,
    pub results: Vec<BridgeTag>,
    /// `true` when the trailing Go result was `error` (stripped from
    /// `results`); the glue panics on it so `try/or` composes.
    pub has_error: bool,
    pub variadic: bool,
}

impl BridgedSig {
    pub fn tier(&self) -> Tier {
        self.params
            .iter()
            .chain(self.results.iter())
            .map(BridgeTag::tier)
            .max()
            .unwrap_or(Tier::Auto)
    }
}

/// String-view constructor info (`NewAddr(string) Addr` / `*Addr`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringView {
    /// Qualified constructor expression, e.g. `netip.MustParseAddr`.
    pub ctor: String,
    /// The constructor returns a pointer that must be dereferenced.
    pub deref: bool,
}

/// Everything classification can know about the package under inspection.
#[derive(Debug, Default)]
pub struct ClassifyCtx {
    /// Selector used to qualify in-package names in emitted Go
    /// (the package name, e.g. `flag`).
    pub qualifier: String,
    /// Package-local named types with basic underlying kinds.
    pub own_basics: HashMap<String, Underlying>,
    /// Package-local value-struct types constructible from a string.
    pub string_views: HashMap<String, StringView>,
    /// Struct wrappers in scope. In-package structs are keyed by bare
    /// name; external ones by `import/path.Name`.
    pub wrappers: HashMap<String, String>,
    /// Named basic types of dependency packages, keyed like wrappers.
    pub external_basics: HashMap<String, Underlying>,
    /// Import selector → import path, from the scanned file's imports.
    pub import_paths: HashMap<String, String>,
}

impl ClassifyCtx {
    /// Key used for wrapper/basic lookups of a possibly-qualified name.
    pub fn type_key(&self, pkg: &Option<String>, name: &str) -> Option<String> {
        match pkg {
            None => Some(name.to_string()),
            Some(sel) => self
                .import_paths
                .get(sel)
                .map(|path| format!("{}.{}", path, name)),
        }
    }
}

/// Classifies a parameter type.
pub fn classify_param(ty: &GoType, ctx: &ClassifyCtx) -> Result<BridgeTag, String> {
    match ty {
        GoType::Named { pkg: None, name } => match name.as_str() {
            "string" => Ok(BridgeTag::Str),
            "int" => Ok(BridgeTag::Int),
            "float64" => Ok(BridgeTag::Float),
            "bool" => Ok(BridgeTag::Bool),
            "byte" | "uint8" => Ok(BridgeTag::Byte),
            "any" => Ok(BridgeTag::Any),
            "int8" | "int16" | "uint16" | "int32" | "int64" | "uint" | "uint32" | "uint64"
            | "rune" => Ok(BridgeTag::NamedBasic {
                cast: name.clone(),
                underlying: Underlying::Int,
            }),
            "float32" => Ok(BridgeTag::NamedBasic {
                cast: "float32".to_string(),
                underlying: Underlying::Float,
            }),
            "error" => Err("error-typed parameter".to_string()),
            other => self_package_named(other, ctx),
        },
        GoType::Named {
            pkg: Some(sel),
            name,
        } => qualified_named(sel, name, ctx, true),
        GoType::Pointer(inner) => match inner.as_ref() {
            GoType::Named { pkg, name } => {
                let key = ctx
                    .type_key(pkg, name)
                    .ok_or_else(|| format!("pointer to unknown package type {}", inner))?;
                match ctx.wrappers.get(&key) {
                    Some(wrapper) => Ok(BridgeTag::Handle {
                        wrapper: wrapper.clone(),
                        value: false,
                    }),
                    None => Err(format!("pointer to struct {}", inner)),
                }
            }
            _ => Err(format!("pointer to {}", inner)),
        },
        GoType::Slice(inner) => match inner.as_ref() {
            GoType::Named { pkg: None, name } if name == "string" => Ok(BridgeTag::StrSlice),
            GoType::Named { pkg: None, name } if name == "byte" || name == "uint8" => {
                Ok(BridgeTag::ByteSlice)
            }
            other => Err(format!("slice of {}", other)),
        },
        GoType::Interface { methods: 0 } => Ok(BridgeTag::Any),
        GoType::Interface { methods } => Err(format!("interface with {} methods", methods)),
        GoType::Func(sig) => classify_func_value(sig, ctx),
        GoType::Map { .. } => Err(format!("map type {}", ty)),
        GoType::Chan(_) => Err(format!("channel type {}", ty)),
        GoType::Array { .. } => Err(format!("array type {}", ty)),
        GoType::AnonStruct => Err("anonymous struct type".to_string()),
        GoType::Ellipsis(inner) => classify_param(inner, ctx),
    }
}

fn self_package_named(name: &str, ctx: &ClassifyCtx) -> Result<BridgeTag, String> {
    if let Some(&underlying) = ctx.own_basics.get(name) {
        return Ok(BridgeTag::NamedBasic {
            cast: format!("{}.{}", ctx.qualifier, name),
            underlying,
        });
    }
    if let Some(view) = ctx.string_views.get(name) {
        return Ok(BridgeTag::StringView {
            ctor: view.ctor.clone(),
            deref: view.deref,
        });
    }
    if let Some(wrapper) = ctx.wrappers.get(name) {
        return Ok(BridgeTag::Handle {
            wrapper: wrapper.clone(),
            value: true,
        });
    }
    Err(format!("unsupported type {}", name))
}

fn qualified_named(
    sel: &str,
    name: &str,
    ctx: &ClassifyCtx,
    _param: bool,
) -> Result<BridgeTag, String> {
    let Some(key) = ctx.type_key(&Some(sel.to_string()), name) else {
        return Err(format!("type {}.{} from unknown import", sel, name));
    };
    if let Some(&underlying) = ctx.external_basics.get(&key) {
        return Ok(BridgeTag::NamedBasic {
            cast: format!("{}.{}", sel, name),
            underlying,
        });
    }
    if let Some(wrapper) = ctx.wrappers.get(&key) {
        return Ok(BridgeTag::Handle {
            wrapper: wrapper.clone(),
            value: true,
        });
    }
    Err(format!("external type {}.{}", sel, name))
}

/// Classifies a result type. Differs from parameters in that `error` is
/// allowed (in the last position, enforced by the signature pass).
pub fn classify_result(ty: &GoType, ctx: &ClassifyCtx) -> Result<BridgeTag, String> {
    if ty.is_error() {
        return Ok(BridgeTag::ErrorRet);
    }
    match ty {
        // A value-struct result wraps into a handle when known.
        GoType::Named { pkg, name } if ty.base_name().is_some() => {
            if let Some(key) = ctx.type_key(pkg, name) {
                if let Some(wrapper) = ctx.wrappers.get(&key) {
                    return Ok(BridgeTag::Handle {
                        wrapper: wrapper.clone(),
                        value: true,
                    });
                }
            }
            classify_param(ty, ctx)
        }
        _ => classify_param(ty, ctx),
    }
}

/// Function-typed parameter: the sub-signature must classify to basic
/// tags (auto/castable) on both sides, with at most one result.
fn classify_func_value(sig: &GoSignature, ctx: &ClassifyCtx) -> Result<BridgeTag, String> {
    if sig.variadic {
        return Err("variadic function parameter".to_string());
    }
    let mut params = Vec::new();
    for p in &sig.params {
        let tag = classify_param(&p.ty, ctx)
            .map_err(|e| format!("function parameter: {}", e))?;
        if tag.tier() > Tier::Castable
            || matches!(tag, BridgeTag::StringView { .. } | BridgeTag::Handle { .. })
        {
            return Err("function parameter with non-basic signature".to_string());
        }
        params.push(tag);
    }
    if sig.results.len() > 1 {
        return Err("function parameter with multiple results".to_string());
    }
    let mut results = Vec::new();
    for r in &sig.results {
        let tag = classify_param(r, ctx)
            .map_err(|e| format!("function parameter result: {}", e))?;
        if tag.tier() > Tier::Castable
            || matches!(tag, BridgeTag::StringView { .. } | BridgeTag::Handle { .. })
        {
            return Err("function parameter with non-basic result".to_string());
        }
        results.push(tag);
    }
    Ok(BridgeTag::FuncValue(Box::new(BridgedSig {
        params,
        results,
        has_error: false,
        variadic: sig.variadic,
    })))
}

/// Classifies a whole signature into a [`BridgedSig`].
pub fn classify_signature(sig: &GoSignature, ctx: &ClassifyCtx) -> Result<BridgedSig, String> {
    let mut params = Vec::new();
    for p in &sig.params {
        params.push(classify_param(&p.ty, ctx)?);
    }
    let mut results = Vec::new();
    let mut has_error = false;
    for (i, r) in sig.results.iter().enumerate() {
        let tag = classify_result(r, ctx)?;
        if tag == BridgeTag::ErrorRet {
            if i != sig.results.len() - 1 {
                return Err("error is not the last result".to_string());
            }
            has_error = true;
            continue;
        }
        results.push(tag);
    }
    Ok(BridgedSig {
        params,
        results,
        has_error,
        variadic: sig.variadic,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gotype::GoParam;

    fn sig(params: Vec<GoType>, results: Vec<GoType>) -> GoSignature {
        GoSignature {
            params: params
                .into_iter()
                .map(|ty| GoParam {
                    name: String::new(),
                    ty,
                })
                .collect(),
            results,
            variadic: false,
        }
    }

    #[test]
    fn basic_types_are_auto() {
        let ctx = ClassifyCtx::default();
        let s = classify_signature(
            &sig(
                vec![GoType::named("string"), GoType::named("int")],
                vec![GoType::named("bool")],
            ),
            &ctx,
        )
        .unwrap();
        assert_eq!(s.tier(), Tier::Auto);
        assert_eq!(s.params, vec![BridgeTag::Str, BridgeTag::Int]);
    }

    #[test]
    fn string_slice_is_auto_byte_slice_castable() {
        let ctx = ClassifyCtx::default();
        let auto = classify_param(&GoType::Slice(Box::new(GoType::named("string"))), &ctx).unwrap();
        assert_eq!(auto.tier(), Tier::Auto);
        let cast = classify_param(&GoType::Slice(Box::new(GoType::named("byte"))), &ctx).unwrap();
        assert_eq!(cast.tier(), Tier::Castable);
    }

    #[test]
    fn trailing_error_is_stripped() {
        let ctx = ClassifyCtx::default();
        let s = classify_signature(
            &sig(
                vec![GoType::named("string")],
                vec![GoType::named("int"), GoType::named("error")],
            ),
            &ctx,
        )
        .unwrap();
        assert!(s.has_error);
        assert_eq!(s.results, vec![BridgeTag::Int]);
    }

    #[test]
    fn error_mid_results_rejected() {
        let ctx = ClassifyCtx::default();
        let err = classify_signature(
            &sig(
                vec![],
                vec![GoType::named("error"), GoType::named("int")],
            ),
            &ctx,
        )
        .unwrap_err();
        assert!(err.contains("last result"));
    }

    #[test]
    fn named_local_enum_is_castable() {
        let mut ctx = ClassifyCtx {
            qualifier: "flag".to_string(),
            ..Default::default()
        };
        ctx.own_basics.insert("ErrorHandling".to_string(), Underlying::Int);
        let tag = classify_param(&GoType::named("ErrorHandling"), &ctx).unwrap();
        let BridgeTag::NamedBasic { cast, .. } = tag else {
            panic!("expected named basic");
        };
        assert_eq!(cast, "flag.ErrorHandling");
    }

    #[test]
    fn unknown_struct_pointer_blocked_until_wrapped() {
        let mut ctx = ClassifyCtx::default();
        let ty = GoType::Pointer(Box::new(GoType::named("FlagSet")));
        assert!(classify_param(&ty, &ctx).is_err());

        ctx.wrappers
            .insert("FlagSet".to_string(), "RugoH_flag_FlagSet".to_string());
        let tag = classify_param(&ty, &ctx).unwrap();
        assert_eq!(
            tag,
            BridgeTag::Handle {
                wrapper: "RugoH_flag_FlagSet".to_string(),
                value: false,
            }
        );
    }

    #[test]
    fn external_type_resolves_through_import_paths() {
        let mut ctx = ClassifyCtx::default();
        ctx.import_paths
            .insert("pflag".to_string(), "github.com/spf13/pflag".to_string());
        let ty = GoType::Pointer(Box::new(GoType::qualified("pflag", "Flag")));
        assert!(classify_param(&ty, &ctx).is_err());

        ctx.wrappers.insert(
            "github.com/spf13/pflag.Flag".to_string(),
            "RugoX_pflag_Flag".to_string(),
        );
        let tag = classify_param(&ty, &ctx).unwrap();
        assert!(matches!(tag, BridgeTag::Handle { value: false, .. }));
    }

    #[test]
    fn func_param_with_basic_signature_classifies() {
        let ctx = ClassifyCtx::default();
        let f = GoType::Func(Box::new(sig(
            vec![GoType::named("string")],
            vec![GoType::named("bool")],
        )));
        let tag = classify_param(&f, &ctx).unwrap();
        assert_eq!(tag.tier(), Tier::FuncParam);
    }

    #[test]
    fn func_param_with_struct_blocked() {
        let ctx = ClassifyCtx::default();
        let f = GoType::Func(Box::new(sig(
            vec![GoType::Pointer(Box::new(GoType::named("T")))],
            vec![],
        )));
        assert!(classify_param(&f, &ctx).is_err());
    }

    #[test]
    fn maps_chans_interfaces_blocked() {
        let ctx = ClassifyCtx::default();
        let m = GoType::Map {
            key: Box::new(GoType::named("string")),
            value: Box::new(GoType::named("int")),
        };
        assert!(classify_param(&m, &ctx).unwrap_err().contains("map"));
        assert!(classify_param(&GoType::Chan(Box::new(GoType::named("int"))), &ctx)
            .unwrap_err()
            .contains("channel"));
        assert!(
            classify_param(&GoType::Interface { methods: 3 }, &ctx)
                .unwrap_err()
                .contains("interface")
        );
        assert_eq!(
            classify_param(&GoType::Interface { methods: 0 }, &ctx).unwrap(),
            BridgeTag::Any
        );
    }

    #[test]
    fn string_view_param_uses_constructor() {
        let mut ctx = ClassifyCtx::default();
        ctx.string_views.insert(
            "Addr".to_string(),
            StringView {
                ctor: "netip.MustParseAddr".to_string(),
                deref: false,
            },
        );
        let tag = classify_param(&GoType::named("Addr"), &ctx).unwrap();
        assert!(matches!(tag, BridgeTag::StringView { .. }));
        assert_eq!(tag.tier(), Tier::Castable);
    }
}
