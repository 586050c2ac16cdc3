//! Struct lowering — the last rewriting pass.
//!
//! After this pass the rest of the pipeline never sees `struct` syntax:
//!
//! - `struct Name` with a field list becomes a constructor function
//!   returning a mapping tagged `__type__`, so struct values are ordinary
//!   mappings;
//! - when the file declares exactly one struct, a `new` alias is emitted;
//! - `def Name.method(params)` becomes `def method(self, params)` — struct
//!   methods are plain functions taking an explicit `self`, and the
//!   descriptor records them so the code generator can register
//!   dot-dispatch.

use crate::scan::{first_word, indent_of};
use crate::Line;
use rugo_base::names::is_identifier;
use rugo_base::{Result, RugoError, StructDescriptor};

pub fn lower_structs(
    lines: Vec<Line>,
    path: &str,
) -> Result<(Vec<Line>, Vec<StructDescriptor>)> {
    let mut descriptors: Vec<StructDescriptor> = Vec::new();
    let mut out: Vec<Line> = Vec::new();
    let has_user_new = lines.iter().any(|l| {
        l.text.trim_start().starts_with("def new(")
    });

    let mut i = 0;
    while i < lines.len() {
        let line = &lines[i];
        let trimmed = line.text.trim_start();

        if first_word(trimmed) == Some("struct") {
            let name = trimmed[6..].trim();
            if !is_identifier(name) || !name.starts_with(|c: char| c.is_ascii_uppercase()) {
                return Err(RugoError::at(
                    format!("invalid struct name '{}'", name),
                    path,
                    line.orig,
                ));
            }
            let (fields, close) = collect_fields(&lines, i, path, name)?;
            emit_constructor(&mut out, name, &fields, line.orig);
            descriptors.push(StructDescriptor {
                name: name.to_string(),
                fields,
                methods: Vec::new(),
                line: line.orig,
            });
            i = close + 1;
            continue;
        }

        if first_word(trimmed) == Some("def") {
            if let Some(rewritten) = rewrite_method_def(trimmed, &mut descriptors, path, line.orig)?
            {
                out.push(Line {
                    text: format!("{}{}", indent_of(&line.text), rewritten),
                    orig: line.orig,
                });
                i += 1;
                continue;
            }
        }

        out.push(line.clone());
        i += 1;
    }

    // `new` alias only when the file declares exactly one struct and the
    // user did not define their own `new`.
    if descriptors.len() == 1 && !has_user_new {
        let d = &descriptors[0];
        let params = d.fields.join(", ");
        out.push(Line {
            text: format!("def new({})", params),
            orig: d.line,
        });
        out.push(Line {
            text: format!("  return {}({})", d.name, params),
            orig: d.line,
        });
        out.push(Line {
            text: "end".to_string(),
            orig: d.line,
        });
    }

    Ok((out, descriptors))
}

fn collect_fields(
    lines: &[Line],
    start: usize,
    path: &str,
    name: &str,
) -> Result<(Vec<String>, usize)> {
    let mut fields = Vec::new();
    for (j, line) in lines.iter().enumerate().skip(start + 1) {
        let trimmed = line.text.trim();
        if trimmed == "end" {
            return Ok((fields, j));
        }
        if trimmed.is_empty() {
            continue;
        }
        if !is_identifier(trimmed) {
            return Err(RugoError::at(
                format!("invalid field '{}' in struct {}", trimmed, name),
                path,
                line.orig,
            ));
        }
        fields.push(trimmed.to_string());
    }
    Err(RugoError::at(
        format!("missing 'end' for struct {}", name),
        path,
        lines[start].orig,
    ))
}

fn emit_constructor(out: &mut Vec<Line>, name: &str, fields: &[String], orig: u32) {
    let params = fields.join(", ");
    out.push(Line {
        text: format!("def {}({})", name, params),
        orig,
    });
    let mut pairs = format!("\"__type__\" => \"{}\"", name);
    for field in fields {
        pairs.push_str(&format!(", \"{}\" => {}", field, field));
    }
    out.push(Line {
        text: format!("  return {{{}}}", pairs),
        orig,
    });
    out.push(Line {
        text: "end".to_string(),
        orig,
    });
}

/// `def Name.method(params)` → `def method(self, params)`.
fn rewrite_method_def(
    trimmed: &str,
    descriptors: &mut [StructDescriptor],
    path: &str,
    orig: u32,
) -> Result<Option<String>> {
    let rest = trimmed[3..].trim_start();
    let Some(dot) = rest.find('.') else {
        return Ok(None);
    };
    let type_name = &rest[..dot];
    if !type_name.starts_with(|c: char| c.is_ascii_uppercase()) {
        return Ok(None);
    }
    let after = &rest[dot + 1..];
    let Some(open) = after.find('(') else {
        return Ok(None);
    };
    let method = &after[..open];
    if !is_identifier(method) {
        return Err(RugoError::at(
            format!("invalid method name '{}'", method),
            path,
            orig,
        ));
    }
    let params = after[open + 1..].trim_end_matches(')').trim();
    let rewritten = if params.is_empty() {
        format!("def {}(self)", method)
    } else {
        format!("def {}(self, {})", method, params)
    };
    if let Some(desc) = descriptors.iter_mut().find(|d| d.name == type_name) {
        desc.methods.push(method.to_string());
    }
    Ok(Some(rewritten))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(src: &str) -> (Vec<String>, Vec<StructDescriptor>) {
        let lines: Vec<Line> = src
            .lines()
            .enumerate()
            .map(|(i, l)| Line {
                text: l.to_string(),
                orig: i as u32 + 1,
            })
            .collect();
        let (lines, descs) = lower_structs(lines, "t.rugo").unwrap();
        (lines.into_iter().map(|l| l.text).collect(), descs)
    }

    #[test]
    fn struct_becomes_constructor_and_new_alias() {
        let (out, descs) = run("struct Dog\n  name\nend");
        assert_eq!(
            out,
            vec![
                "def Dog(name)",
                "  return {\"__type__\" => \"Dog\", \"name\" => name}",
                "end",
                "def new(name)",
                "  return Dog(name)",
                "end",
            ]
        );
        assert_eq!(descs.len(), 1);
        assert_eq!(descs[0].fields, vec!["name"]);
    }

    #[test]
    fn two_structs_no_new_alias() {
        let (out, descs) = run("struct A\n  x\nend\nstruct B\n  y\nend");
        assert_eq!(descs.len(), 2);
        assert!(!out.iter().any(|l| l.starts_with("def new(")));
    }

    #[test]
    fn method_def_gains_explicit_self() {
        let (out, descs) = run("struct Dog\n  name\nend\ndef Dog.bark()\n  return 1\nend");
        assert!(out.contains(&"def bark(self)".to_string()));
        assert_eq!(descs[0].methods, vec!["bark"]);
    }

    #[test]
    fn method_with_params_keeps_them_after_self() {
        let (out, _) = run("struct Dog\n  name\nend\ndef Dog.speak(word)\nend");
        assert!(out.contains(&"def speak(self, word)".to_string()));
    }

    #[test]
    fn struct_missing_end_is_fatal() {
        let lines = vec![
            Line {
                text: "struct Dog".into(),
                orig: 1,
            },
            Line {
                text: "  name".into(),
                orig: 2,
            },
        ];
        let err = lower_structs(lines, "t.rugo").unwrap_err();
        assert!(err.to_string().contains("missing 'end'"));
    }

    #[test]
    fn user_new_suppresses_alias() {
        let (out, _) = run("struct Dog\n  name\nend\ndef new(x)\nend");
        assert_eq!(
            out.iter().filter(|l| l.starts_with("def new(")).count(),
            1
        );
    }
}
