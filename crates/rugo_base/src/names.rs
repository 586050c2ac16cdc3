//! Identifier-case helpers shared by the bridge and the code generator.
//!
//! Go exports `PascalCase` names; Rugo users call `snake_case` ones. The
//! conversions here are the single source of truth for that mapping, so the
//! bridge registry and the call-site emitter can never disagree about what a
//! function is called.

/// Converts a Go exported name to the Rugo-visible snake_case name.
///
/// Runs of uppercase letters are kept together (`ParseURL` → `parse_url`,
/// `HTTPServer` → `http_server`), matching how Go's own tooling splits
/// initialisms.
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev_lower = i > 0 && chars[i - 1].is_lowercase();
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let prev_upper = i > 0 && chars[i - 1].is_uppercase();
            if i > 0 && (prev_lower || (prev_upper && next_lower)) {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Converts a snake_case name to Go PascalCase (`sort_by` → `SortBy`).
pub fn to_pascal_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for part in name.split('_') {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// Returns `true` for identifiers Rugo treats as constants.
///
/// A leading uppercase letter makes a binding single-assignment. The bound
/// value may still be mutated through indexing; only the binding itself is
/// protected.
pub fn is_constant_name(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_uppercase())
}

/// Returns `true` if `name` is a legal Rugo identifier.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Escapes an identifier that collides with a Go keyword or runtime name.
///
/// Generated Go code prefixes user identifiers, so only the emitted helper
/// names themselves ever need this; it exists so emitted code can never
/// shadow a keyword regardless of what the user called a variable.
pub fn escape_go_ident(name: &str) -> String {
    if is_go_keyword(name) {
        format!("{}_", name)
    } else {
        name.to_string()
    }
}

/// Go keyword table (Go spec, "Keywords").
pub fn is_go_keyword(name: &str) -> bool {
    matches!(
        name,
        "break"
            | "case"
            | "chan"
            | "const"
            | "continue"
            | "default"
            | "defer"
            | "else"
            | "fallthrough"
            | "for"
            | "func"
            | "go"
            | "goto"
            | "if"
            | "import"
            | "interface"
            | "map"
            | "package"
            | "range"
            | "return"
            | "select"
            | "struct"
            | "switch"
            | "type"
            | "var"
    )
}
