//! Recursive-descent LL(1) parser for canonical rugo text.
//!
//! Precedence tower, loosest first: `||`, `&&`, comparison, additive,
//! multiplicative, unary, postfix (call / index / dot). Statements are
//! separated by newlines or the preprocessor's semicolons; newlines are
//! insignificant inside parentheses, brackets and braces.
//!
//! The parser is purely structural. It attaches the *original* source line
//! to every statement by resolving token lines through the preprocessor's
//! [`LineMap`]; nothing here knows about names, scopes or types.

use crate::ast::{
    AssignTarget, BinOp, Expr, FuncDef, IfArm, Program, Stmt, StrPart, UnOp,
};
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};
use rugo_base::{LineMap, Result, RugoError};

/// Parses preprocessed text into a [`Program`].
pub fn parse_program(path: &str, text: &str, line_map: &LineMap) -> Result<Program> {
    let tokens = Lexer::new(path, text).tokenize()?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        path,
        line_map,
    };
    parser.program()
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    path: &'a str,
    line_map: &'a LineMap,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn orig_line(&self) -> u32 {
        self.line_map.lookup(self.peek().line)
    }

    fn error(&self, message: impl Into<String>) -> RugoError {
        RugoError::at(message, self.path, self.orig_line())
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        if self.peek().kind == kind {
            Ok(self.advance())
        } else {
            Err(self.error(format!(
                "expected {} but found {}",
                Token {
                    kind,
                    line: 0
                }
                .describe(),
                self.peek().describe()
            )))
        }
    }

    fn expect_word(&mut self, word: &str) -> Result<()> {
        if self.peek().is_word(word) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!(
                "expected '{}' but found {}",
                word,
                self.peek().describe()
            )))
        }
    }

    fn skip_separators(&mut self) {
        while matches!(self.peek().kind, TokenKind::Newline | TokenKind::Semicolon) {
            self.advance();
        }
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek().kind, TokenKind::Newline) {
            self.advance();
        }
    }

    fn program(&mut self) -> Result<Program> {
        let mut stmts = Vec::new();
        self.skip_separators();
        while !self.at_eof() {
            stmts.push(self.statement()?);
            self.skip_separators();
        }
        Ok(Program {
            path: self.path.to_string(),
            stmts,
        })
    }

    /// Parses statements until one of `stops` appears as a bare word.
    fn block(&mut self, stops: &[&str]) -> Result<Vec<Stmt>> {
        let mut stmts = Vec::new();
        self.skip_separators();
        loop {
            if self.at_eof() {
                return Err(self.error(format!("missing '{}'", stops.last().unwrap_or(&"end"))));
            }
            if let TokenKind::Ident(word) = &self.peek().kind {
                if stops.contains(&word.as_str()) {
                    return Ok(stmts);
                }
            }
            stmts.push(self.statement()?);
            self.skip_separators();
        }
    }

    fn statement(&mut self) -> Result<Stmt> {
        let line = self.orig_line();
        if let TokenKind::Ident(word) = &self.peek().kind {
            match word.as_str() {
                "def" => return self.func_def(line),
                "if" => return self.if_stmt(line),
                "while" => return self.while_stmt(line),
                "for" => return self.for_stmt(line),
                "return" => {
                    self.advance();
                    let value = if matches!(
                        self.peek().kind,
                        TokenKind::Newline | TokenKind::Semicolon | TokenKind::Eof
                    ) {
                        None
                    } else {
                        Some(self.expression()?)
                    };
                    return Ok(Stmt::Return { value, line });
                }
                "break" => {
                    self.advance();
                    return Ok(Stmt::Break { line });
                }
                "continue" => {
                    self.advance();
                    return Ok(Stmt::Continue { line });
                }
                "use" => {
                    self.advance();
                    let name = self.string_literal("module name")?;
                    return Ok(Stmt::Use { name, line });
                }
                "import" => {
                    self.advance();
                    let path = self.string_literal("package path")?;
                    let alias = self.optional_alias()?;
                    return Ok(Stmt::Import { path, alias, line });
                }
                "require" => {
                    self.advance();
                    let path = self.string_literal("path")?;
                    let (alias, with) = self.require_tail()?;
                    return Ok(Stmt::Require {
                        path,
                        alias,
                        with,
                        line,
                    });
                }
                "rats" => return self.test_block(line, true),
                "bench" => return self.test_block(line, false),
                "sandbox" => return self.sandbox(line),
                _ => {}
            }
        }
        self.expr_or_assign(line)
    }

    fn expr_or_assign(&mut self, line: u32) -> Result<Stmt> {
        let expr = self.expression()?;
        if self.peek().kind != TokenKind::Assign {
            return Ok(Stmt::Expr { expr, line });
        }
        self.advance();
        let target = match expr {
            Expr::Ident(name) => AssignTarget::Name(name),
            Expr::Index { base, index } => AssignTarget::Index {
                base: *base,
                index: *index,
            },
            Expr::Field { recv, name } => AssignTarget::Field { recv: *recv, name },
            _ => return Err(self.error("invalid assignment target")),
        };
        let value = self.expression()?;
        Ok(Stmt::Assign {
            target,
            value,
            line,
        })
    }

    fn func_def(&mut self, line: u32) -> Result<Stmt> {
        self.advance(); // def
        let name = self.identifier("function name")?;
        self.expect(TokenKind::LParen)?;
        let params = self.param_list()?;
        let body = self.block(&["end"])?;
        self.expect_word("end")?;
        Ok(Stmt::FuncDef(FuncDef {
            name,
            params,
            body,
            line,
        }))
    }

    fn param_list(&mut self) -> Result<Vec<String>> {
        let mut params = Vec::new();
        self.skip_newlines();
        if self.peek().kind == TokenKind::RParen {
            self.advance();
            return Ok(params);
        }
        loop {
            params.push(self.identifier("parameter name")?);
            self.skip_newlines();
            match self.advance().kind {
                TokenKind::Comma => self.skip_newlines(),
                TokenKind::RParen => return Ok(params),
                _ => return Err(self.error("expected ',' or ')' in parameter list")),
            }
        }
    }

    fn if_stmt(&mut self, line: u32) -> Result<Stmt> {
        self.advance(); // if
        let mut arms = Vec::new();
        let cond = self.expression()?;
        let body = self.block(&["elsif", "else", "end"])?;
        arms.push(IfArm { cond, body });
        let mut else_body = Vec::new();
        loop {
            if self.peek().is_word("elsif") {
                self.advance();
                let cond = self.expression()?;
                let body = self.block(&["elsif", "else", "end"])?;
                arms.push(IfArm { cond, body });
                continue;
            }
            if self.peek().is_word("else") {
                self.advance();
                else_body = self.block(&["end"])?;
            }
            self.expect_word("end")?;
            return Ok(Stmt::If {
                arms,
                else_body,
                line,
            });
        }
    }

    fn while_stmt(&mut self, line: u32) -> Result<Stmt> {
        self.advance();
        let cond = self.expression()?;
        let body = self.block(&["end"])?;
        self.expect_word("end")?;
        Ok(Stmt::While { cond, body, line })
    }

    fn for_stmt(&mut self, line: u32) -> Result<Stmt> {
        self.advance();
        let mut vars = vec![self.identifier("loop variable")?];
        if self.peek().kind == TokenKind::Comma {
            self.advance();
            vars.push(self.identifier("loop variable")?);
        }
        self.expect_word("in")?;
        let iterable = self.expression()?;
        let body = self.block(&["end"])?;
        self.expect_word("end")?;
        Ok(Stmt::For {
            vars,
            iterable,
            body,
            line,
        })
    }

    fn test_block(&mut self, line: u32, is_test: bool) -> Result<Stmt> {
        self.advance(); // rats | bench
        let name = match &self.peek().kind {
            TokenKind::Str(_) | TokenKind::RawStr(_) => self.string_literal("name")?,
            _ => String::new(),
        };
        let body = self.block(&["end"])?;
        self.expect_word("end")?;
        Ok(if is_test {
            Stmt::Rats { name, body, line }
        } else {
            Stmt::Bench { name, body, line }
        })
    }

    fn sandbox(&mut self, line: u32) -> Result<Stmt> {
        self.advance(); // sandbox
        let mut words = Vec::new();
        loop {
            match &self.peek().kind {
                TokenKind::Newline | TokenKind::Semicolon | TokenKind::Eof => break,
                TokenKind::Ident(w) => {
                    words.push(w.clone());
                    self.advance();
                }
                TokenKind::Colon | TokenKind::Comma => {
                    self.advance();
                }
                _ => return Err(self.error("invalid sandbox directive")),
            }
        }
        Ok(Stmt::Sandbox {
            directive: words.join(" "),
            line,
        })
    }

    fn optional_alias(&mut self) -> Result<Option<String>> {
        if self.peek().is_word("as") {
            self.advance();
            Ok(Some(self.identifier("alias")?))
        } else {
            Ok(None)
        }
    }

    fn require_tail(&mut self) -> Result<(Option<String>, Vec<String>)> {
        if self.peek().is_word("with") {
            self.advance();
            let mut names = vec![self.identifier("name")?];
            while self.peek().kind == TokenKind::Comma {
                self.advance();
                names.push(self.identifier("name")?);
            }
            return Ok((None, names));
        }
        Ok((self.optional_alias()?, Vec::new()))
    }

    fn identifier(&mut self, what: &str) -> Result<String> {
        match &self.peek().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.error(format!(
                "expected {} but found {}",
                what,
                self.peek().describe()
            ))),
        }
    }

    fn string_literal(&mut self, what: &str) -> Result<String> {
        match &self.peek().kind {
            TokenKind::Str(raw) => {
                if raw.contains("#{") {
                    return Err(self.error(format!("{} cannot be interpolated", what)));
                }
                let raw = raw.clone();
                self.advance();
                Ok(raw)
            }
            TokenKind::RawStr(raw) => {
                let raw = raw.clone();
                self.advance();
                Ok(raw)
            }
            _ => Err(self.error(format!(
                "expected {} string but found {}",
                what,
                self.peek().describe()
            ))),
        }
    }

    // ── Expressions ─────────────────────────────────────────────────────

    fn expression(&mut self) -> Result<Expr> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.and_expr()?;
        while self.peek().kind == TokenKind::OrOr {
            self.advance();
            self.skip_newlines();
            let rhs = self.and_expr()?;
            lhs = Expr::Binary {
                op: BinOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.comparison()?;
        while self.peek().kind == TokenKind::AndAnd {
            self.advance();
            self.skip_newlines();
            let rhs = self.comparison()?;
            lhs = Expr::Binary {
                op: BinOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn comparison(&mut self) -> Result<Expr> {
        let mut lhs = self.additive()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::EqEq => BinOp::Eq,
                TokenKind::NotEq => BinOp::NotEq,
                TokenKind::Lt => BinOp::Lt,
                TokenKind::LtEq => BinOp::LtEq,
                TokenKind::Gt => BinOp::Gt,
                TokenKind::GtEq => BinOp::GtEq,
                _ => return Ok(lhs),
            };
            self.advance();
            self.skip_newlines();
            let rhs = self.additive()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn additive(&mut self) -> Result<Expr> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            self.skip_newlines();
            let rhs = self.multiplicative()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn multiplicative(&mut self) -> Result<Expr> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => return Ok(lhs),
            };
            self.advance();
            self.skip_newlines();
            let rhs = self.unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn unary(&mut self) -> Result<Expr> {
        match self.peek().kind {
            TokenKind::Minus => {
                self.advance();
                let operand = self.unary()?;
                Ok(Expr::Unary {
                    op: UnOp::Neg,
                    operand: Box::new(operand),
                })
            }
            TokenKind::Bang => {
                self.advance();
                let operand = self.unary()?;
                Ok(Expr::Unary {
                    op: UnOp::Not,
                    operand: Box::new(operand),
                })
            }
            _ => self.postfix(),
        }
    }

    fn postfix(&mut self) -> Result<Expr> {
        let mut expr = self.primary()?;
        loop {
            match self.peek().kind {
                TokenKind::LParen => {
                    self.advance();
                    let args = self.call_args()?;
                    expr = match expr {
                        Expr::Ident(name) => Expr::Call { name, args },
                        Expr::Field { recv, name } => Expr::MethodCall { recv, name, args },
                        _ => return Err(self.error("this expression cannot be called")),
                    };
                }
                TokenKind::LBracket => {
                    self.advance();
                    expr = self.index_or_slice(expr)?;
                }
                TokenKind::Dot => {
                    self.advance();
                    let name = self.identifier("field or method name")?;
                    expr = Expr::Field {
                        recv: Box::new(expr),
                        name,
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn call_args(&mut self) -> Result<Vec<Expr>> {
        let mut args = Vec::new();
        self.skip_newlines();
        if self.peek().kind == TokenKind::RParen {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            self.skip_newlines();
            match self.advance().kind {
                TokenKind::Comma => self.skip_newlines(),
                TokenKind::RParen => return Ok(args),
                _ => return Err(self.error("expected ',' or ')' in argument list")),
            }
        }
    }

    fn index_or_slice(&mut self, base: Expr) -> Result<Expr> {
        self.skip_newlines();
        let start = if self.peek().kind == TokenKind::Colon {
            None
        } else {
            Some(Box::new(self.expression()?))
        };
        if self.peek().kind == TokenKind::Colon {
            self.advance();
            let end = if self.peek().kind == TokenKind::RBracket {
                None
            } else {
                Some(Box::new(self.expression()?))
            };
            self.expect(TokenKind::RBracket)?;
            return Ok(Expr::Slice {
                base: Box::new(base),
                start,
                end,
            });
        }
        self.expect(TokenKind::RBracket)?;
        let index = start.ok_or_else(|| self.error("expected index expression"))?;
        Ok(Expr::Index {
            base: Box::new(base),
            index,
        })
    }

    fn primary(&mut self) -> Result<Expr> {
        let token = self.peek().clone();
        match &token.kind {
            TokenKind::Int(n) => {
                self.advance();
                Ok(Expr::Int(*n))
            }
            TokenKind::Float(f) => {
                self.advance();
                Ok(Expr::Float(*f))
            }
            TokenKind::Str(raw) => {
                let raw = raw.clone();
                self.advance();
                let parts = self.string_parts(&raw, token.line)?;
                Ok(Expr::Str(parts))
            }
            TokenKind::RawStr(raw) => {
                let lit = raw.replace("\\'", "'").replace("\\\\", "\\");
                self.advance();
                Ok(Expr::Str(vec![StrPart::Lit(lit)]))
            }
            TokenKind::LParen => {
                self.advance();
                self.skip_newlines();
                let expr = self.expression()?;
                self.skip_newlines();
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::LBracket => self.array_literal(),
            TokenKind::LBrace => self.hash_literal(),
            TokenKind::Ident(word) => match word.as_str() {
                "true" => {
                    self.advance();
                    Ok(Expr::Bool(true))
                }
                "false" => {
                    self.advance();
                    Ok(Expr::Bool(false))
                }
                "nil" => {
                    self.advance();
                    Ok(Expr::Nil)
                }
                "fn" => self.lambda(),
                "try" => self.try_expr(),
                "spawn" => self.spawn_expr(),
                "parallel" => self.parallel_expr(),
                _ => {
                    let name = word.clone();
                    self.advance();
                    Ok(Expr::Ident(name))
                }
            },
            _ => Err(self.error(format!("unexpected {}", token.describe()))),
        }
    }

    fn array_literal(&mut self) -> Result<Expr> {
        self.advance(); // [
        let mut elems = Vec::new();
        self.skip_newlines();
        if self.peek().kind == TokenKind::RBracket {
            self.advance();
            return Ok(Expr::Array(elems));
        }
        loop {
            elems.push(self.expression()?);
            self.skip_newlines();
            match self.advance().kind {
                TokenKind::Comma => self.skip_newlines(),
                TokenKind::RBracket => return Ok(Expr::Array(elems)),
                _ => return Err(self.error("expected ',' or ']' in array literal")),
            }
        }
    }

    fn hash_literal(&mut self) -> Result<Expr> {
        self.advance(); // {
        let mut pairs = Vec::new();
        self.skip_newlines();
        if self.peek().kind == TokenKind::RBrace {
            self.advance();
            return Ok(Expr::Hash(pairs));
        }
        loop {
            let key = self.expression()?;
            self.skip_newlines();
            self.expect(TokenKind::Arrow)?;
            self.skip_newlines();
            let value = self.expression()?;
            pairs.push((key, value));
            self.skip_newlines();
            match self.advance().kind {
                TokenKind::Comma => self.skip_newlines(),
                TokenKind::RBrace => return Ok(Expr::Hash(pairs)),
                _ => return Err(self.error("expected ',' or '}' in hash literal")),
            }
        }
    }

    fn lambda(&mut self) -> Result<Expr> {
        self.advance(); // fn
        self.expect(TokenKind::LParen)?;
        let params = self.param_list()?;
        let body = self.block(&["end"])?;
        self.expect_word("end")?;
        Ok(Expr::Lambda { params, body })
    }

    fn try_expr(&mut self) -> Result<Expr> {
        self.advance(); // try
        let body = self.block(&["or", "end"])?;
        let mut err_name = None;
        let mut handler = Vec::new();
        if self.peek().is_word("or") {
            self.advance();
            if let TokenKind::Ident(name) = &self.peek().kind {
                err_name = Some(name.clone());
                self.advance();
            }
            handler = self.block(&["end"])?;
        }
        self.expect_word("end")?;
        Ok(Expr::Try {
            body,
            err_name,
            handler,
        })
    }

    fn spawn_expr(&mut self) -> Result<Expr> {
        self.advance();
        let body = self.block(&["end"])?;
        self.expect_word("end")?;
        Ok(Expr::Spawn { body })
    }

    fn parallel_expr(&mut self) -> Result<Expr> {
        self.advance();
        let stmts = self.block(&["end"])?;
        self.expect_word("end")?;
        Ok(Expr::Parallel { stmts })
    }

    /// Splits a raw double-quoted body into literal and `#{...}` parts.
    fn string_parts(&mut self, raw: &str, token_line: usize) -> Result<Vec<StrPart>> {
        let mut parts = Vec::new();
        let mut lit = String::new();
        let mut chars = raw.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\\' => {
                    let escaped = chars.next().unwrap_or('\\');
                    lit.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        '0' => '\0',
                        'e' => '\x1b',
                        other => other,
                    });
                }
                '#' if chars.peek() == Some(&'{') => {
                    chars.next();
                    let mut depth = 1u32;
                    let mut inner = String::new();
                    let mut quote: Option<char> = None;
                    for ic in chars.by_ref() {
                        match quote {
                            Some(q) => {
                                if ic == q {
                                    quote = None;
                                }
                            }
                            None => match ic {
                                '"' | '\'' => quote = Some(ic),
                                '{' => depth += 1,
                                '}' => {
                                    depth -= 1;
                                    if depth == 0 {
                                        break;
                                    }
                                }
                                _ => {}
                            },
                        }
                        inner.push(ic);
                    }
                    if depth != 0 {
                        return Err(self.error("unterminated interpolation"));
                    }
                    if !lit.is_empty() {
                        parts.push(StrPart::Lit(std::mem::take(&mut lit)));
                    }
                    let expr = self.parse_interpolation(&inner, token_line)?;
                    parts.push(StrPart::Interp(Box::new(expr)));
                }
                other => lit.push(other),
            }
        }
        if !lit.is_empty() || parts.is_empty() {
            parts.push(StrPart::Lit(lit));
        }
        Ok(parts)
    }

    /// Parses one interpolated expression with a fresh sub-lexer; every
    /// token inherits the enclosing string's line.
    fn parse_interpolation(&mut self, src: &str, token_line: usize) -> Result<Expr> {
        let mut tokens = Lexer::new(self.path, src).tokenize()?;
        for token in &mut tokens {
            token.line = token_line;
        }
        let mut sub = Parser {
            tokens,
            pos: 0,
            path: self.path,
            line_map: self.line_map,
        };
        let expr = sub.expression()?;
        if !sub.at_eof() {
            return Err(sub.error("unexpected trailing tokens in interpolation"));
        }
        Ok(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Program {
        let map = LineMap::identity(src.lines().count());
        parse_program("t.rugo", src, &map).unwrap()
    }

    fn parse_err(src: &str) -> RugoError {
        let map = LineMap::identity(src.lines().count());
        parse_program("t.rugo", src, &map).unwrap_err()
    }

    #[test]
    fn assignment_and_expression_statements() {
        let prog = parse("x = 1\nputs(x)\n");
        assert_eq!(prog.stmts.len(), 2);
        assert!(matches!(
            &prog.stmts[0],
            Stmt::Assign {
                target: AssignTarget::Name(n),
                ..
            } if n == "x"
        ));
        assert!(matches!(&prog.stmts[1], Stmt::Expr { .. }));
    }

    #[test]
    fn precedence_mul_binds_tighter() {
        let prog = parse("y = 2 + 3 * 4\n");
        let Stmt::Assign { value, .. } = &prog.stmts[0] else {
            panic!("expected assignment");
        };
        let Expr::Binary { op: BinOp::Add, rhs, .. } = value else {
            panic!("expected addition at top, got {:?}", value);
        };
        assert!(matches!(**rhs, Expr::Binary { op: BinOp::Mul, .. }));
    }

    #[test]
    fn postfix_chain_parses() {
        let prog = parse("v = h[\"k\"].map(f)[0]\n");
        let Stmt::Assign { value, .. } = &prog.stmts[0] else {
            panic!()
        };
        assert!(matches!(value, Expr::Index { .. }));
    }

    #[test]
    fn slice_forms() {
        let prog = parse("a = xs[1:2]\nb = xs[:2]\nc = xs[1:]\n");
        for stmt in &prog.stmts {
            let Stmt::Assign { value, .. } = stmt else { panic!() };
            assert!(matches!(value, Expr::Slice { .. }));
        }
    }

    #[test]
    fn if_elsif_else_chain() {
        let prog = parse("if a == 1\nputs(1)\nelsif a == 2\nputs(2)\nelse\nputs(3)\nend\n");
        let Stmt::If { arms, else_body, .. } = &prog.stmts[0] else {
            panic!()
        };
        assert_eq!(arms.len(), 2);
        assert_eq!(else_body.len(), 1);
    }

    #[test]
    fn for_two_variable_form() {
        let prog = parse("for k, v in h\nputs(k)\nend\n");
        let Stmt::For { vars, .. } = &prog.stmts[0] else {
            panic!()
        };
        assert_eq!(vars, &["k", "v"]);
    }

    #[test]
    fn def_with_body_and_lines() {
        let prog = parse("def add(a, b)\nreturn a + b\nend\n");
        let Stmt::FuncDef(def) = &prog.stmts[0] else {
            panic!()
        };
        assert_eq!(def.name, "add");
        assert_eq!(def.params, &["a", "b"]);
        assert_eq!(def.line, 1);
        assert_eq!(def.body[0].line(), 2);
    }

    #[test]
    fn try_with_handler() {
        let prog = parse("x = try\n  f()\nor err\n  0\nend\n");
        let Stmt::Assign { value, .. } = &prog.stmts[0] else {
            panic!()
        };
        let Expr::Try {
            body,
            err_name,
            handler,
        } = value
        else {
            panic!()
        };
        assert_eq!(body.len(), 1);
        assert_eq!(err_name.as_deref(), Some("err"));
        assert_eq!(handler.len(), 1);
    }

    #[test]
    fn try_without_handler() {
        let prog = parse("x = try\n  f()\nend\n");
        let Stmt::Assign { value, .. } = &prog.stmts[0] else {
            panic!()
        };
        assert!(matches!(value, Expr::Try { err_name: None, .. }));
    }

    #[test]
    fn spawn_and_parallel_blocks() {
        let prog = parse("t = spawn\n  work()\nend\nr = parallel\n  1\n  2\nend\n");
        let Stmt::Assign { value, .. } = &prog.stmts[0] else {
            panic!()
        };
        assert!(matches!(value, Expr::Spawn { .. }));
        let Stmt::Assign { value, .. } = &prog.stmts[1] else {
            panic!()
        };
        let Expr::Parallel { stmts } = value else {
            panic!()
        };
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn lambda_in_call_args() {
        let prog = parse("xs.map(fn(a)\na * 2\nend)\n");
        let Stmt::Expr { expr, .. } = &prog.stmts[0] else {
            panic!()
        };
        let Expr::MethodCall { name, args, .. } = expr else {
            panic!()
        };
        assert_eq!(name, "map");
        assert!(matches!(args[0], Expr::Lambda { .. }));
    }

    #[test]
    fn interpolated_string_splits() {
        let prog = parse("s = \"a #{n + 1} b\"\n");
        let Stmt::Assign { value, .. } = &prog.stmts[0] else {
            panic!()
        };
        let Expr::Str(parts) = value else { panic!() };
        assert_eq!(parts.len(), 3);
        assert!(matches!(&parts[1], StrPart::Interp(_)));
    }

    #[test]
    fn escapes_processed() {
        let prog = parse("s = \"a\\nb\"\n");
        let Stmt::Assign { value, .. } = &prog.stmts[0] else {
            panic!()
        };
        let Expr::Str(parts) = value else { panic!() };
        assert_eq!(parts, &vec![StrPart::Lit("a\nb".into())]);
    }

    #[test]
    fn require_with_names() {
        let prog = parse("require \"tools\" with fmt, net\n");
        let Stmt::Require { with, .. } = &prog.stmts[0] else {
            panic!()
        };
        assert_eq!(with, &["fmt", "net"]);
    }

    #[test]
    fn import_with_alias() {
        let prog = parse("import \"encoding/hex\" as h\n");
        let Stmt::Import { path, alias, .. } = &prog.stmts[0] else {
            panic!()
        };
        assert_eq!(path, "encoding/hex");
        assert_eq!(alias.as_deref(), Some("h"));
    }

    #[test]
    fn multiline_hash_and_array() {
        let prog = parse("h = {\n\"a\" => 1,\n\"b\" => 2\n}\nxs = [\n1,\n2\n]\n");
        assert_eq!(prog.stmts.len(), 2);
    }

    #[test]
    fn semicolon_separates_statements() {
        let prog = parse("sandbox net off;\n;[1, 2]\n");
        assert!(matches!(&prog.stmts[0], Stmt::Sandbox { .. }));
        assert!(matches!(&prog.stmts[1], Stmt::Expr { .. }));
    }

    #[test]
    fn missing_end_reports_line() {
        let err = parse_err("def f()\nputs(1)\n");
        assert!(err.to_string().contains("missing 'end'"));
    }

    #[test]
    fn statement_lines_resolve_through_map() {
        // Simulate a preprocessor expansion: three canonical lines all from
        // original line 2.
        let mut map = LineMap::new();
        map.push(1);
        map.push(2);
        map.push(2);
        map.push(2);
        let prog = parse_program("t.rugo", "x = 1\nif y\nputs(1)\nend\n", &map).unwrap();
        assert_eq!(prog.stmts[0].line(), 1);
        assert_eq!(prog.stmts[1].line(), 2);
    }
}
