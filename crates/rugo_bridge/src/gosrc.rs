//! Lightweight Go declaration scanner.
//!
//! Parses just enough of a Go source file to enumerate its exported
//! surface: the package clause, imports, top-level functions and methods
//! (signatures only — bodies are skipped by brace matching), type
//! declarations with struct fields and embedded fields, and const/var
//! names with their declared types. Doc comments directly above a
//! declaration are kept for `rugo doc`.
//!
//! The scanner is deliberately forgiving: build tags and `//go:`
//! directives are comments and fall away; declarations it cannot parse
//! (generics, assembly stubs) are recorded as generic/opaque so the
//! classifier can skip them with a readable reason instead of failing the
//! whole package.

use crate::gotype::{GoParam, GoSignature, GoType};
use rugo_base::{Result, RugoError};

/// One scanned source file.
#[derive(Debug, Clone, Default)]
pub struct GoFile {
    pub package: String,
    pub imports: Vec<GoImport>,
    pub funcs: Vec<GoFunc>,
    pub types: Vec<GoTypeDecl>,
    pub consts: Vec<GoValue>,
    pub vars: Vec<GoValue>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoImport {
    pub alias: Option<String>,
    pub path: String,
}

#[derive(Debug, Clone)]
pub struct GoFunc {
    pub name: String,
    pub receiver: Option<GoReceiver>,
    pub sig: GoSignature,
    pub doc: String,
    /// Declared with type parameters — always blocked.
    pub generic: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoReceiver {
    pub type_name: String,
    pub pointer: bool,
}

#[derive(Debug, Clone)]
pub struct GoTypeDecl {
    pub name: String,
    pub kind: GoTypeKind,
    pub doc: String,
    pub generic: bool,
}

#[derive(Debug, Clone)]
pub enum GoTypeKind {
    Struct {
        fields: Vec<GoField>,
        embedded: Vec<GoType>,
    },
    /// `type X int`, `type X otherpkg.T`.
    Named(GoType),
    /// `type X = T`.
    Alias(GoType),
    Interface { methods: usize },
    Func(GoSignature),
    /// Anything the scanner could not digest.
    Opaque,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoField {
    pub name: String,
    pub ty: GoType,
    pub exported: bool,
}

#[derive(Debug, Clone)]
pub struct GoValue {
    pub name: String,
    pub ty: Option<GoType>,
    pub doc: String,
}

/// Returns `true` for Go-exported identifiers.
pub fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_uppercase())
}

// ── Tokenizer ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    /// String literal contents (interpreted and raw strings alike).
    Str(String),
    /// Number, rune or other literal the parser only skips over.
    Lit(String),
    Punct(&'static str),
    Newline,
}

struct Tokens {
    toks: Vec<Tok>,
    /// Comment text attached before the token at the same index.
    docs: Vec<Option<String>>,
    pos: usize,
}

fn tokenize(src: &str) -> Tokens {
    let bytes = src.as_bytes();
    let mut toks = Vec::new();
    let mut docs: Vec<Option<String>> = Vec::new();
    let mut pending_doc: Vec<String> = Vec::new();
    let mut newlines_after_comment = 0u32;
    let mut i = 0;

    macro_rules! push {
        ($tok:expr) => {{
            let tok = $tok;
            // Docs attach to the next real token, never to a newline; a
            // blank line between comment and declaration detaches them.
            if matches!(tok, Tok::Newline) {
                docs.push(None);
            } else if pending_doc.is_empty() || newlines_after_comment > 1 {
                docs.push(None);
                pending_doc.clear();
            } else {
                docs.push(Some(pending_doc.join("\n")));
                pending_doc.clear();
            }
            toks.push(tok);
        }};
    }

    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b' ' | b'\t' | b'\r' => i += 1,
            b'\n' => {
                newlines_after_comment += 1;
                if toks.last() != Some(&Tok::Newline) {
                    push!(Tok::Newline);
                }
                i += 1;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                let end = src[i..].find('\n').map(|p| i + p).unwrap_or(bytes.len());
                let text = src[i + 2..end].trim();
                if !text.starts_with("go:") {
                    pending_doc.push(text.to_string());
                }
                newlines_after_comment = 0;
                i = end;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let end = src[i + 2..]
                    .find("*/")
                    .map(|p| i + 4 + p)
                    .unwrap_or(bytes.len());
                i = end;
            }
            b'"' => {
                let mut j = i + 1;
                while j < bytes.len() && bytes[j] != b'"' {
                    if bytes[j] == b'\\' {
                        j += 1;
                    }
                    j += 1;
                }
                push!(Tok::Str(src[i + 1..j.min(bytes.len())].to_string()));
                i = j + 1;
            }
            b'`' => {
                let end = src[i + 1..]
                    .find('`')
                    .map(|p| i + 1 + p)
                    .unwrap_or(bytes.len());
                push!(Tok::Str(src[i + 1..end].to_string()));
                i = end + 1;
            }
            b'\'' => {
                let mut j = i + 1;
                while j < bytes.len() && bytes[j] != b'\'' {
                    if bytes[j] == b'\\' {
                        j += 1;
                    }
                    j += 1;
                }
                push!(Tok::Lit(src[i..=j.min(bytes.len() - 1)].to_string()));
                i = j + 1;
            }
            b'.' if src[i..].starts_with("...") => {
                push!(Tok::Punct("..."));
                i += 3;
            }
            b'<' if bytes.get(i + 1) == Some(&b'-') => {
                push!(Tok::Punct("<-"));
                i += 2;
            }
            b if b.is_ascii_digit() => {
                let start = i;
                while i < bytes.len()
                    && (bytes[i].is_ascii_alphanumeric()
                        || bytes[i] == b'.'
                        || bytes[i] == b'_'
                        || bytes[i] == b'x')
                {
                    i += 1;
                }
                push!(Tok::Lit(src[start..i].to_string()));
            }
            b if b.is_ascii_alphabetic() || b == b'_' => {
                let start = i;
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                push!(Tok::Ident(src[start..i].to_string()));
            }
            b'(' => {
                push!(Tok::Punct("("));
                i += 1;
            }
            b')' => {
                push!(Tok::Punct(")"));
                i += 1;
            }
            b'{' => {
                push!(Tok::Punct("{"));
                i += 1;
            }
            b'}' => {
                push!(Tok::Punct("}"));
                i += 1;
            }
            b'[' => {
                push!(Tok::Punct("["));
                i += 1;
            }
            b']' => {
                push!(Tok::Punct("]"));
                i += 1;
            }
            b'*' => {
                push!(Tok::Punct("*"));
                i += 1;
            }
            b',' => {
                push!(Tok::Punct(","));
                i += 1;
            }
            b';' => {
                push!(Tok::Punct(";"));
                i += 1;
            }
            b'=' => {
                push!(Tok::Punct("="));
                i += 1;
            }
            b'.' => {
                push!(Tok::Punct("."));
                i += 1;
            }
            _ => {
                // Operators inside skipped expressions; keep as opaque.
                let start = i;
                i += 1;
                push!(Tok::Lit(src[start..i].to_string()));
            }
        }
    }
    docs.truncate(toks.len());
    while docs.len() < toks.len() {
        docs.push(None);
    }
    Tokens {
        toks,
        docs,
        pos: 0,
    }
}

impl Tokens {
    fn peek(&self) -> Option<&Tok> {
        self.toks.get(self.pos)
    }

    fn next(&mut self) -> Option<Tok> {
        let t = self.toks.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek(), Some(Tok::Newline) | Some(Tok::Punct(";"))) {
            self.pos += 1;
        }
    }

    fn doc_here(&self) -> String {
        self.docs
            .get(self.pos)
            .and_then(|d| d.clone())
            .unwrap_or_default()
    }

    fn eat_punct(&mut self, p: &str) -> bool {
        if self.is_punct(p) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn is_punct(&self, p: &str) -> bool {
        matches!(self.peek(), Some(Tok::Punct(s)) if *s == p)
    }

    fn is_ident(&self, w: &str) -> bool {
        matches!(self.peek(), Some(Tok::Ident(s)) if s == w)
    }

    fn ident(&mut self) -> Option<String> {
        match self.peek() {
            Some(Tok::Ident(s)) => {
                let s = s.clone();
                self.pos += 1;
                Some(s)
            }
            _ => None,
        }
    }

    /// Skips a balanced `{...}` block (bodies, literals).
    fn skip_braces(&mut self) {
        if !self.is_punct("{") {
            return;
        }
        let mut depth = 0i32;
        while let Some(t) = self.next() {
            match t {
                Tok::Punct("{") => depth += 1,
                Tok::Punct("}") => {
                    depth -= 1;
                    if depth == 0 {
                        return;
                    }
                }
                _ => {}
            }
        }
    }

    /// Skips a balanced `[...]` block (generic parameter lists).
    fn skip_brackets(&mut self) {
        if !self.is_punct("[") {
            return;
        }
        let mut depth = 0i32;
        while let Some(t) = self.next() {
            match t {
                Tok::Punct("[") => depth += 1,
                Tok::Punct("]") => {
                    depth -= 1;
                    if depth == 0 {
                        return;
                    }
                }
                _ => {}
            }
        }
    }

    /// Skips an expression until a top-level `,`, newline or closer.
    fn skip_expr(&mut self) {
        let mut depth = 0i32;
        loop {
            match self.peek() {
                None => return,
                Some(Tok::Newline) if depth == 0 => return,
                Some(Tok::Punct(",")) | Some(Tok::Punct(";")) if depth == 0 => return,
                Some(Tok::Punct(")")) | Some(Tok::Punct("}")) | Some(Tok::Punct("]"))
                    if depth == 0 =>
                {
                    return;
                }
                Some(Tok::Punct("(")) | Some(Tok::Punct("{")) | Some(Tok::Punct("[")) => {
                    depth += 1;
                    self.pos += 1;
                }
                Some(Tok::Punct(")")) | Some(Tok::Punct("}")) | Some(Tok::Punct("]")) => {
                    depth -= 1;
                    self.pos += 1;
                }
                _ => {
                    self.pos += 1;
                }
            }
        }
    }
}

// ── File scanning ───────────────────────────────────────────────────────

/// Scans one Go source file into its declaration surface.
pub fn scan_file(path_for_errors: &str, src: &str) -> Result<GoFile> {
    let mut toks = tokenize(src);
    let mut file = GoFile::default();

    toks.skip_newlines();
    loop {
        toks.skip_newlines();
        let doc = toks.doc_here();
        let Some(tok) = toks.peek().cloned() else {
            break;
        };
        match tok {
            Tok::Ident(word) => match word.as_str() {
                "package" => {
                    toks.next();
                    file.package = toks.ident().unwrap_or_default();
                }
                "import" => {
                    toks.next();
                    scan_imports(&mut toks, &mut file);
                }
                "func" => {
                    toks.next();
                    if let Some(func) = scan_func(&mut toks, doc) {
                        file.funcs.push(func);
                    }
                }
                "type" => {
                    toks.next();
                    scan_types(&mut toks, &mut file, doc);
                }
                "const" => {
                    toks.next();
                    scan_values(&mut toks, doc, &mut file.consts);
                }
                "var" => {
                    toks.next();
                    scan_values(&mut toks, doc, &mut file.vars);
                }
                _ => {
                    toks.next();
                }
            },
            _ => {
                toks.next();
            }
        }
    }

    if file.package.is_empty() {
        return Err(RugoError::new(format!(
            "{}: missing package clause",
            path_for_errors
        )));
    }
    Ok(file)
}

fn scan_imports(toks: &mut Tokens, file: &mut GoFile) {
    if toks.eat_punct("(") {
        loop {
            toks.skip_newlines();
            match toks.peek().cloned() {
                Some(Tok::Punct(")")) => {
                    toks.next();
                    return;
                }
                Some(Tok::Str(path)) => {
                    toks.next();
                    file.imports.push(GoImport { alias: None, path });
                }
                Some(Tok::Ident(alias)) | Some(Tok::Lit(alias)) => {
                    toks.next();
                    if let Some(Tok::Str(path)) = toks.peek().cloned() {
                        toks.next();
                        let alias = if alias == "_" { None } else { Some(alias) };
                        file.imports.push(GoImport { alias, path });
                    }
                }
                Some(_) => {
                    toks.next();
                }
                None => return,
            }
        }
    }
    match toks.peek().cloned() {
        Some(Tok::Str(path)) => {
            toks.next();
            file.imports.push(GoImport { alias: None, path });
        }
        Some(Tok::Ident(alias)) => {
            toks.next();
            if let Some(Tok::Str(path)) = toks.peek().cloned() {
                toks.next();
                let alias = if alias == "_" { None } else { Some(alias) };
                file.imports.push(GoImport { alias, path });
            }
        }
        _ => {}
    }
}

fn scan_func(toks: &mut Tokens, doc: String) -> Option<GoFunc> {
    let mut receiver = None;
    if toks.is_punct("(") {
        // Method: (name *Type) or (name Type).
        toks.next();
        let _recv_name = toks.ident();
        let pointer = toks.eat_punct("*");
        let type_name = toks.ident()?;
        toks.skip_brackets(); // generic receiver like (t *List[T])
        toks.eat_punct(")");
        receiver = Some(GoReceiver { type_name, pointer });
    }
    let name = toks.ident()?;
    let mut generic = false;
    if toks.is_punct("[") {
        generic = true;
        toks.skip_brackets();
    }
    let sig = scan_signature(toks)?;
    toks.skip_braces();
    Some(GoFunc {
        name,
        receiver,
        sig,
        doc,
        generic,
    })
}

/// Parses `(params) [results]`.
fn scan_signature(toks: &mut Tokens) -> Option<GoSignature> {
    if !toks.eat_punct("(") {
        return None;
    }
    let (params, variadic) = scan_params(toks);
    let mut results = Vec::new();
    if toks.eat_punct("(") {
        let (rparams, _) = scan_params(toks);
        results = rparams.into_iter().map(|p| p.ty).collect();
    } else if !toks.is_punct("{")
        && !matches!(toks.peek(), Some(Tok::Newline) | None)
        && !toks.is_punct(")")
        && !toks.is_punct(",")
        && !toks.is_punct("}")
    {
        if let Some(ty) = parse_type(toks) {
            results.push(ty);
        }
    }
    Some(GoSignature {
        params,
        results,
        variadic,
    })
}

/// Parses a parameter list up to and including the closing `)`.
///
/// Go allows grouped parameters (`a, b string`) and unnamed ones
/// (`string, int`); this handles both by buffering names until a type is
/// seen.
fn scan_params(toks: &mut Tokens) -> (Vec<GoParam>, bool) {
    let mut params: Vec<GoParam> = Vec::new();
    let mut pending: Vec<String> = Vec::new();
    let mut variadic = false;
    loop {
        toks.skip_newlines();
        if toks.is_punct(")") {
            toks.next();
            // Only pending names with no type: they were actually types.
            for name in pending.drain(..) {
                params.push(GoParam {
                    name: String::new(),
                    ty: GoType::named(&name),
                });
            }
            return (params, variadic);
        }
        if toks.peek().is_none() {
            return (params, variadic);
        }

        // A lone identifier followed by `,` or `)` may be a name or a
        // type; buffer it and decide when a type shows up.
        if let Some(Tok::Ident(word)) = toks.peek().cloned() {
            let next = toks.toks.get(toks.pos + 1).cloned();
            let lone = matches!(next, Some(Tok::Punct(",")) | Some(Tok::Punct(")")));
            let selector = matches!(next, Some(Tok::Punct(".")));
            if lone && !selector {
                toks.next();
                pending.push(word);
                toks.eat_punct(",");
                continue;
            }
        }

        // Named parameter(s) with a type, or an unnamed complex type.
        let mut leading_name = None;
        if let Some(Tok::Ident(word)) = toks.peek().cloned() {
            let next = toks.toks.get(toks.pos + 1).cloned();
            let type_follows = !matches!(
                next,
                Some(Tok::Punct(".")) | Some(Tok::Punct(",")) | Some(Tok::Punct(")"))
            );
            if type_follows && !is_type_keyword(&word) {
                toks.next();
                leading_name = Some(word);
            }
        }
        if toks.is_punct("...") {
            toks.next();
            variadic = true;
        }
        let Some(ty) = parse_type(toks) else {
            toks.next();
            continue;
        };
        // Pending names (grouped declaration) take this type too.
        for name in pending.drain(..) {
            params.push(GoParam {
                name,
                ty: ty.clone(),
            });
        }
        params.push(GoParam {
            name: leading_name.unwrap_or_default(),
            ty,
        });
        toks.eat_punct(",");
    }
}

fn is_type_keyword(word: &str) -> bool {
    matches!(
        word,
        "map" | "chan" | "func" | "interface" | "struct" | "any" | "error"
    )
}

/// Parses one Go type.
pub(crate) fn parse_type(toks: &mut Tokens) -> Option<GoType> {
    match toks.peek().cloned()? {
        Tok::Punct("*") => {
            toks.next();
            Some(GoType::Pointer(Box::new(parse_type(toks)?)))
        }
        Tok::Punct("[") => {
            toks.next();
            if toks.eat_punct("]") {
                return Some(GoType::Slice(Box::new(parse_type(toks)?)));
            }
            // Array with a length expression.
            let mut len = String::new();
            while let Some(t) = toks.peek() {
                if matches!(t, Tok::Punct("]")) {
                    break;
                }
                if let Tok::Lit(l) | Tok::Ident(l) = t {
                    len.push_str(l);
                }
                toks.next();
            }
            toks.eat_punct("]");
            Some(GoType::Array {
                len,
                elem: Box::new(parse_type(toks)?),
            })
        }
        Tok::Punct("...") => {
            toks.next();
            Some(GoType::Ellipsis(Box::new(parse_type(toks)?)))
        }
        Tok::Punct("<-") => {
            toks.next();
            // <-chan T
            if toks.is_ident("chan") {
                toks.next();
            }
            Some(GoType::Chan(Box::new(parse_type(toks)?)))
        }
        Tok::Punct("(") => {
            toks.next();
            let inner = parse_type(toks);
            toks.eat_punct(")");
            inner
        }
        Tok::Ident(word) => match word.as_str() {
            "map" => {
                toks.next();
                toks.eat_punct("[");
                let key = parse_type(toks)?;
                toks.eat_punct("]");
                let value = parse_type(toks)?;
                Some(GoType::Map {
                    key: Box::new(key),
                    value: Box::new(value),
                })
            }
            "chan" => {
                toks.next();
                if toks.is_punct("<-") {
                    toks.next();
                }
                Some(GoType::Chan(Box::new(parse_type(toks)?)))
            }
            "func" => {
                toks.next();
                let sig = scan_signature(toks)?;
                Some(GoType::Func(Box::new(sig)))
            }
            "interface" => {
                toks.next();
                let methods = count_interface_methods(toks);
                Some(GoType::Interface { methods })
            }
            "struct" => {
                toks.next();
                toks.skip_braces();
                Some(GoType::AnonStruct)
            }
            _ => {
                toks.next();
                if toks.is_punct(".") {
                    toks.next();
                    let name = toks.ident()?;
                    let mut ty = GoType::qualified(&word, &name);
                    if toks.is_punct("[") {
                        toks.skip_brackets(); // generic instantiation
                        ty = GoType::AnonStruct; // opaque: blocked
                    }
                    Some(ty)
                } else if toks.is_punct("[") {
                    toks.skip_brackets();
                    Some(GoType::AnonStruct)
                } else {
                    Some(GoType::named(&word))
                }
            }
        },
        _ => None,
    }
}

fn count_interface_methods(toks: &mut Tokens) -> usize {
    let mut methods = 0;
    if !toks.is_punct("{") {
        return methods;
    }
    let mut depth = 0i32;
    let mut line_has_content = false;
    while let Some(t) = toks.next() {
        match t {
            Tok::Punct("{") => depth += 1,
            Tok::Punct("}") => {
                depth -= 1;
                if depth == 0 {
                    if line_has_content {
                        methods += 1;
                    }
                    return methods;
                }
            }
            Tok::Newline | Tok::Punct(";") if depth == 1 => {
                if line_has_content {
                    methods += 1;
                }
                line_has_content = false;
            }
            _ if depth == 1 => line_has_content = true,
            _ => {}
        }
    }
    methods
}

fn scan_types(toks: &mut Tokens, file: &mut GoFile, doc: String) {
    if toks.eat_punct("(") {
        loop {
            toks.skip_newlines();
            if toks.eat_punct(")") || toks.peek().is_none() {
                return;
            }
            let doc = toks.doc_here();
            if let Some(decl) = scan_one_type(toks, doc) {
                file.types.push(decl);
            } else {
                toks.next();
            }
        }
    }
    if let Some(decl) = scan_one_type(toks, doc) {
        file.types.push(decl);
    }
}

fn scan_one_type(toks: &mut Tokens, doc: String) -> Option<GoTypeDecl> {
    let name = toks.ident()?;
    let mut generic = false;
    if toks.is_punct("[") {
        generic = true;
        toks.skip_brackets();
    }
    if toks.eat_punct("=") {
        let ty = parse_type(toks)?;
        return Some(GoTypeDecl {
            name,
            kind: GoTypeKind::Alias(ty),
            doc,
            generic,
        });
    }
    let kind = match toks.peek().cloned() {
        Some(Tok::Ident(w)) if w == "struct" => {
            toks.next();
            scan_struct_body(toks)
        }
        Some(Tok::Ident(w)) if w == "interface" => {
            let methods = {
                toks.next();
                count_interface_methods(toks)
            };
            GoTypeKind::Interface { methods }
        }
        Some(Tok::Ident(w)) if w == "func" => {
            toks.next();
            match scan_signature(toks) {
                Some(sig) => GoTypeKind::Func(sig),
                None => GoTypeKind::Opaque,
            }
        }
        _ => match parse_type(toks) {
            Some(ty) => GoTypeKind::Named(ty),
            None => GoTypeKind::Opaque,
        },
    };
    Some(GoTypeDecl {
        name,
        kind,
        doc,
        generic,
    })
}

fn scan_struct_body(toks: &mut Tokens) -> GoTypeKind {
    let mut fields = Vec::new();
    let mut embedded = Vec::new();
    if !toks.eat_punct("{") {
        return GoTypeKind::Opaque;
    }
    loop {
        toks.skip_newlines();
        if toks.eat_punct("}") || toks.peek().is_none() {
            return GoTypeKind::Struct { fields, embedded };
        }

        // Embedded: `*Type`, `pkg.Type` or `Type` alone on the line.
        let embedded_start =
            toks.is_punct("*") || matches!(toks.peek(), Some(Tok::Ident(_)));
        if embedded_start {
            // Look ahead: `Name` followed by newline/tag → embedded;
            // `Name Type...` → named field(s).
            let save = toks.pos;
            let pointer = toks.eat_punct("*");
            if let Some(first) = toks.ident() {
                let qualified = toks.is_punct(".");
                if qualified {
                    toks.next();
                    if let Some(second) = toks.ident() {
                        let ty = GoType::qualified(&first, &second);
                        let ty = if pointer {
                            GoType::Pointer(Box::new(ty))
                        } else {
                            ty
                        };
                        embedded.push(ty);
                        skip_field_tail(toks);
                        continue;
                    }
                }
                let line_end = matches!(
                    toks.peek(),
                    Some(Tok::Newline) | Some(Tok::Str(_)) | Some(Tok::Punct(";"))
                        | Some(Tok::Punct("}"))
                );
                if pointer || line_end {
                    if line_end && !pointer {
                        embedded.push(GoType::named(&first));
                    } else if pointer && line_end {
                        embedded.push(GoType::Pointer(Box::new(GoType::named(&first))));
                    } else {
                        // `*Name Type` is invalid Go; treat as opaque line.
                        skip_field_tail(toks);
                        continue;
                    }
                    skip_field_tail(toks);
                    continue;
                }
            }
            toks.pos = save;
        }

        // Named field(s): Name[, Name2] Type [`tag`].
        let mut names = Vec::new();
        while let Some(Tok::Ident(n)) = toks.peek().cloned() {
            let next = toks.toks.get(toks.pos + 1).cloned();
            toks.next();
            names.push(n);
            if matches!(next, Some(Tok::Punct(","))) {
                toks.next();
                continue;
            }
            break;
        }
        if names.is_empty() {
            toks.next();
            continue;
        }
        let Some(ty) = parse_type(toks) else {
            skip_field_tail(toks);
            continue;
        };
        for name in names {
            let exported = is_exported(&name);
            fields.push(GoField {
                name,
                ty: ty.clone(),
                exported,
            });
        }
        skip_field_tail(toks);
    }
}

/// Skips a struct-field tag and the rest of the line.
fn skip_field_tail(toks: &mut Tokens) {
    loop {
        match toks.peek() {
            Some(Tok::Newline) | Some(Tok::Punct(";")) | Some(Tok::Punct("}")) | None => return,
            _ => {
                toks.next();
            }
        }
    }
}

fn scan_values(toks: &mut Tokens, doc: String, out: &mut Vec<GoValue>) {
    if toks.eat_punct("(") {
        let mut group_type: Option<GoType> = None;
        loop {
            toks.skip_newlines();
            if toks.eat_punct(")") || toks.peek().is_none() {
                return;
            }
            let doc = toks.doc_here();
            let Some(name) = toks.ident() else {
                toks.next();
                continue;
            };
            // Optional extra names in one spec: `A, B = ...`.
            let mut names = vec![name];
            while toks.eat_punct(",") {
                if let Some(n) = toks.ident() {
                    names.push(n);
                }
            }
            let mut ty = None;
            if !toks.is_punct("=") && !matches!(toks.peek(), Some(Tok::Newline) | None) {
                ty = parse_type(toks);
                if ty.is_some() {
                    group_type = ty.clone();
                }
            } else if toks.is_punct("=") || matches!(toks.peek(), Some(Tok::Newline)) {
                ty = group_type.clone();
            }
            if toks.eat_punct("=") {
                toks.skip_expr();
                while toks.is_punct(",") {
                    toks.next();
                    toks.skip_expr();
                }
            }
            for name in names {
                out.push(GoValue {
                    name,
                    ty: ty.clone(),
                    doc: doc.clone(),
                });
            }
        }
    }

    let Some(name) = toks.ident() else { return };
    let mut names = vec![name];
    while toks.eat_punct(",") {
        if let Some(n) = toks.ident() {
            names.push(n);
        }
    }
    let mut ty = None;
    if !toks.is_punct("=") && !matches!(toks.peek(), Some(Tok::Newline) | None) {
        ty = parse_type(toks);
    }
    if toks.eat_punct("=") {
        toks.skip_expr();
        while toks.is_punct(",") {
            toks.next();
            toks.skip_expr();
        }
    }
    for name in names {
        out.push(GoValue {
            name,
            ty: ty.clone(),
            doc: doc.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(src: &str) -> GoFile {
        scan_file("test.go", src).unwrap()
    }

    #[test]
    fn scans_package_and_imports() {
        let f = scan("package demo\n\nimport (\n\t\"fmt\"\n\tstr \"strings\"\n)\n");
        assert_eq!(f.package, "demo");
        assert_eq!(f.imports.len(), 2);
        assert_eq!(f.imports[1].alias.as_deref(), Some("str"));
        assert_eq!(f.imports[1].path, "strings");
    }

    #[test]
    fn scans_function_signature_and_skips_body() {
        let f = scan(
            "package p\n\n// Greet says hello.\nfunc Greet(name string, times int) string {\n\treturn name\n}\n",
        );
        assert_eq!(f.funcs.len(), 1);
        let func = &f.funcs[0];
        assert_eq!(func.name, "Greet");
        assert_eq!(func.doc, "Greet says hello.");
        assert_eq!(func.sig.params.len(), 2);
        assert_eq!(func.sig.params[0].ty, GoType::named("string"));
        assert_eq!(func.sig.results, vec![GoType::named("string")]);
    }

    #[test]
    fn grouped_params_share_type() {
        let f = scan("package p\nfunc Add(a, b int) int { return a + b }\n");
        let sig = &f.funcs[0].sig;
        assert_eq!(sig.params.len(), 2);
        assert_eq!(sig.params[0].ty, GoType::named("int"));
        assert_eq!(sig.params[1].ty, GoType::named("int"));
    }

    #[test]
    fn unnamed_params_parse_as_types() {
        let f = scan("package p\nfunc Cut(string, string) (string, string, bool) { panic(0) }\n");
        let sig = &f.funcs[0].sig;
        assert_eq!(sig.params.len(), 2);
        assert_eq!(sig.results.len(), 3);
        assert_eq!(sig.results[2], GoType::named("bool"));
    }

    #[test]
    fn variadic_and_slices() {
        let f = scan("package p\nfunc Join(parts []string, seps ...string) string { return \"\" }\n");
        let sig = &f.funcs[0].sig;
        assert!(sig.variadic);
        assert_eq!(
            sig.params[0].ty,
            GoType::Slice(Box::new(GoType::named("string")))
        );
    }

    #[test]
    fn methods_carry_receiver() {
        let f = scan("package p\nfunc (s *Server) Start(port int) error { return nil }\n");
        let func = &f.funcs[0];
        let recv = func.receiver.as_ref().unwrap();
        assert_eq!(recv.type_name, "Server");
        assert!(recv.pointer);
    }

    #[test]
    fn struct_fields_and_embedded() {
        let f = scan(
            "package p\ntype Server struct {\n\tHost string\n\tPort int `json:\"port\"`\n\thidden bool\n\t*Base\n}\n",
        );
        let decl = &f.types[0];
        let GoTypeKind::Struct { fields, embedded } = &decl.kind else {
            panic!("expected struct");
        };
        assert_eq!(fields.len(), 3);
        assert!(fields[0].exported);
        assert!(!fields[2].exported);
        assert_eq!(
            embedded[0],
            GoType::Pointer(Box::new(GoType::named("Base")))
        );
    }

    #[test]
    fn named_types_and_aliases() {
        let f = scan("package p\ntype Level int\ntype Alias = string\n");
        assert!(matches!(f.types[0].kind, GoTypeKind::Named(ref t) if *t == GoType::named("int")));
        assert!(matches!(f.types[1].kind, GoTypeKind::Alias(_)));
    }

    #[test]
    fn const_group_with_iota_inherits_type() {
        let f = scan(
            "package p\ntype Level int\nconst (\n\tDebug Level = iota\n\tInfo\n\tWarn\n)\n",
        );
        assert_eq!(f.consts.len(), 3);
        assert_eq!(f.consts[1].name, "Info");
        assert!(f.consts.iter().all(|c| c.ty == Some(GoType::named("Level"))));
    }

    #[test]
    fn vars_with_types() {
        let f = scan("package p\nvar Default *Server = &Server{}\nvar Count int\n");
        assert_eq!(f.vars.len(), 2);
        assert_eq!(
            f.vars[0].ty,
            Some(GoType::Pointer(Box::new(GoType::named("Server"))))
        );
        assert_eq!(f.vars[1].ty, Some(GoType::named("int")));
    }

    #[test]
    fn map_chan_func_types_parse() {
        let f = scan(
            "package p\nfunc F(m map[string]int, c chan int, cb func(int) bool) {}\n",
        );
        let sig = &f.funcs[0].sig;
        assert!(matches!(sig.params[0].ty, GoType::Map { .. }));
        assert!(matches!(sig.params[1].ty, GoType::Chan(_)));
        assert!(matches!(sig.params[2].ty, GoType::Func(_)));
    }

    #[test]
    fn generic_functions_flagged() {
        let f = scan("package p\nfunc Map[T any](xs []T) []T { return xs }\n");
        assert!(f.funcs[0].generic);
    }

    #[test]
    fn go_directives_do_not_become_docs() {
        let f = scan("package p\n//go:noinline\nfunc F() {}\n");
        assert_eq!(f.funcs[0].doc, "");
    }

    #[test]
    fn interface_method_count() {
        let f = scan("package p\ntype RW interface {\n\tRead(p []byte) (int, error)\n\tWrite(p []byte) (int, error)\n}\n");
        assert!(matches!(
            f.types[0].kind,
            GoTypeKind::Interface { methods: 2 }
        ));
    }
}
