//! Parsed model of Go types and signatures.
//!
//! This is the bridge's own minimal view of Go's type grammar — just
//! enough structure to classify a type into a bridge tier and to print it
//! back in diagnostics (`skipped: func uses chan int`). It is produced by
//! the declaration scanner in [`crate::gosrc`] and consumed by the
//! classifier.

use std::fmt;

/// A Go type as written in a declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoType {
    /// `int`, `Buffer`, `bytes.Buffer` — `pkg` is the selector as written.
    Named { pkg: Option<String>, name: String },
    Pointer(Box<GoType>),
    Slice(Box<GoType>),
    Array { len: String, elem: Box<GoType> },
    Map { key: Box<GoType>, value: Box<GoType> },
    Func(Box<GoSignature>),
    Chan(Box<GoType>),
    /// `interface{ ... }`; only the method count matters for tiering.
    Interface { methods: usize },
    /// Anonymous `struct{...}` literal type.
    AnonStruct,
    /// `...T` in a final parameter position.
    Ellipsis(Box<GoType>),
}

impl GoType {
    pub fn named(name: &str) -> Self {
        GoType::Named {
            pkg: None,
            name: name.to_string(),
        }
    }

    pub fn qualified(pkg: &str, name: &str) -> Self {
        GoType::Named {
            pkg: Some(pkg.to_string()),
            name: name.to_string(),
        }
    }

    /// `true` for the predeclared `error` interface.
    pub fn is_error(&self) -> bool {
        matches!(self, GoType::Named { pkg: None, name } if name == "error")
    }

    /// `true` for `interface{}` / `any`.
    pub fn is_empty_interface(&self) -> bool {
        matches!(self, GoType::Interface { methods: 0 })
            || matches!(self, GoType::Named { pkg: None, name } if name == "any")
    }

    /// The bare type name when this is `Name`, `pkg.Name`, `*Name` or
    /// `*pkg.Name`.
    pub fn base_name(&self) -> Option<(&Option<String>, &str)> {
        match self {
            GoType::Named { pkg, name } => Some((pkg, name)),
            GoType::Pointer(inner) => inner.base_name(),
            _ => None,
        }
    }
}

impl fmt::Display for GoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GoType::Named { pkg: Some(p), name } => write!(f, "{}.{}", p, name),
            GoType::Named { pkg: None, name } => write!(f, "{}", name),
            GoType::Pointer(t) => write!(f, "*{}", t),
            GoType::Slice(t) => write!(f, "[]{}", t),
            GoType::Array { len, elem } => write!(f, "[{}]{}", len, elem),
            GoType::Map { key, value } => write!(f, "map[{}]{}", key, value),
            GoType::Func(sig) => write!(f, "func{}", sig),
            GoType::Chan(t) => write!(f, "chan {}", t),
            GoType::Interface { methods: 0 } => write!(f, "interface{{}}"),
            GoType::Interface { methods } => write!(f, "interface{{{} methods}}", methods),
            GoType::AnonStruct => write!(f, "struct{{...}}"),
            GoType::Ellipsis(t) => write!(f, "...{}", t),
        }
    }
}

/// One named parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoParam {
    pub name: String,
    pub ty: GoType,
}

/// A function or method signature.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GoSignature {
    pub params: Vec<GoParam>,
    pub results: Vec<GoType>,
    pub variadic: bool,
}

impl fmt::Display for GoSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", p.ty)?;
        }
        write!(f, ")")?;
        match self.results.len() {
            0 => Ok(()),
            1 => write!(f, " {}", self.results[0]),
            _ => {
                write!(f, " (")?;
                for (i, r) in self.results.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", r)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_round_trips_common_shapes() {
        let t = GoType::Slice(Box::new(GoType::named("string")));
        assert_eq!(t.to_string(), "[]string");

        let t = GoType::Pointer(Box::new(GoType::qualified("bytes", "Buffer")));
        assert_eq!(t.to_string(), "*bytes.Buffer");

        let t = GoType::Map {
            key: Box::new(GoType::named("string")),
            value: Box::new(GoType::named("int")),
        };
        assert_eq!(t.to_string(), "map[string]int");
    }

    #[test]
    fn base_name_sees_through_pointers() {
        let t = GoType::Pointer(Box::new(GoType::qualified("flag", "FlagSet")));
        let (pkg, name) = t.base_name().unwrap();
        assert_eq!(pkg.as_deref(), Some("flag"));
        assert_eq!(name, "FlagSet");
    }

    #[test]
    fn error_and_any_detection() {
        assert!(GoType::named("error").is_error());
        assert!(GoType::named("any").is_empty_interface());
        assert!(GoType::Interface { methods: 0 }.is_empty_interface());
        assert!(!GoType::Interface { methods: 2 }.is_empty_interface());
    }
}
