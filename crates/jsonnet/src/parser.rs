//! Recursive-descent, precedence-climbing parser producing the sugared AST.
//!
//! The binding-power table mirrors the grammar confirmed against a real
//! Jsonnet implementation's PEG grammar (loosest to tightest):
//! `||`, `&&`, `|`, `^`, `&`, `==`/`!=`, relational (`< > <= >= in`),
//! `<<`/`>>`, `+`/`-`, `*`/`/`/`%`, unary `- ! ~`, then postfix
//! (`.field`, `[index]`, `[slice]`, `(args)`, `{ext}`) and atoms.

use std::rc::Rc;

use crate::ast::{
    Arg, ArrayComp, Assert, BinaryOp, CompClause, Expr, Field, FieldName, ForSpec, Local, Node,
    ObjectBody, ObjectComp, Param, UnaryOp,
};
use crate::lexer::{Keyword, Lexer, Token, TokenKind};
use crate::span::{FileName, Pos, Span};

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: parse error: {}", self.span, self.message)
    }
}

impl From<crate::lexer::LexError> for ParseError {
    fn from(e: crate::lexer::LexError) -> Self {
        Self { message: e.message, span: e.span }
    }
}

pub fn parse(source: &str, file: impl Into<FileName>) -> Result<Node, ParseError> {
    let file = file.into();
    let tokens = Lexer::new(source, file.clone()).tokenize()?;
    let mut parser = Parser { tokens, pos: 0, file };
    let node = parser.expr(0)?;
    parser.expect_eof()?;
    Ok(node)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    file: FileName,
}

/// Binding power pairs for each left-associative binary operator, loosest
/// first. A higher number binds tighter.
fn infix_binding_power(kind: &TokenKind) -> Option<(u8, BinaryOp)> {
    use TokenKind::*;
    Some(match kind {
        PipePipe => (1, BinaryOp::Or),
        AmpAmp => (2, BinaryOp::And),
        Pipe => (3, BinaryOp::BitOr),
        Caret => (4, BinaryOp::BitXor),
        Amp => (5, BinaryOp::BitAnd),
        EqEq => (6, BinaryOp::Eq),
        BangEq => (6, BinaryOp::Ne),
        Lt => (7, BinaryOp::Lt),
        Gt => (7, BinaryOp::Gt),
        Lte => (7, BinaryOp::Le),
        Gte => (7, BinaryOp::Ge),
        Keyword(Keyword::In) => (7, BinaryOp::In),
        Shl => (8, BinaryOp::Shl),
        Shr => (8, BinaryOp::Shr),
        Plus => (9, BinaryOp::Add),
        Minus => (9, BinaryOp::Sub),
        Star => (10, BinaryOp::Mul),
        Slash => (10, BinaryOp::Div),
        Percent => (10, BinaryOp::Mod),
        _ => return None,
    })
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn err(&self, message: impl Into<String>) -> ParseError {
        ParseError { message: message.into(), span: self.peek().span.clone() }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if *self.peek_kind() == kind {
            Ok(self.advance())
        } else {
            Err(self.err(format!("expected '{kind}', found '{}'", self.peek_kind())))
        }
    }

    fn expect_eof(&mut self) -> Result<(), ParseError> {
        if *self.peek_kind() == TokenKind::Eof {
            Ok(())
        } else {
            Err(self.err(format!("expected end of input, found '{}'", self.peek_kind())))
        }
    }

    fn expect_ident(&mut self) -> Result<(String, Span), ParseError> {
        match self.peek_kind().clone() {
            TokenKind::Ident(name) => {
                let span = self.peek().span.clone();
                self.advance();
                Ok((name, span))
            }
            other => Err(self.err(format!("expected identifier, found '{other}'"))),
        }
    }

    fn node(&self, expr: Expr, span: Span) -> Box<Node> {
        Box::new(Node { expr, span })
    }

    /// Precedence-climbing entry point; `min_bp` is the minimum binding
    /// power required to keep consuming infix operators.
    fn expr(&mut self, min_bp: u8) -> Result<Box<Node>, ParseError> {
        let mut lhs = self.unary()?;
        loop {
            let Some((bp, op)) = infix_binding_power(self.peek_kind()) else { break };
            if bp < min_bp {
                break;
            }
            self.advance();
            let rhs = self.expr(bp + 1)?;
            let span = lhs.span.merge(&rhs.span);
            lhs = self.node(Expr::Binary { op, lhs, rhs }, span);
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Box<Node>, ParseError> {
        let start = self.peek().span.start;
        let op = match self.peek_kind() {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Tilde => Some(UnaryOp::BitNot),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.unary()?;
            let span = self.span_from(start, &operand.span);
            return Ok(self.node(Expr::Unary { op, operand }, span));
        }
        self.postfix()
    }

    fn span_from(&self, start: Pos, last: &Span) -> Span {
        Span::new(self.file.clone(), start, last.end)
    }

    fn postfix(&mut self) -> Result<Box<Node>, ParseError> {
        let mut node = self.atom()?;
        loop {
            match self.peek_kind().clone() {
                TokenKind::Dot => {
                    self.advance();
                    let (name, name_span) = self.expect_ident()?;
                    let span = node.span.merge(&name_span);
                    node = self.node(Expr::Field { target: node, name }, span);
                }
                TokenKind::LBracket => {
                    self.advance();
                    node = self.parse_index_or_slice(node)?;
                }
                TokenKind::LParen => {
                    self.advance();
                    let args = self.parse_args()?;
                    self.expect(TokenKind::RParen)?;
                    let mut tailstrict = false;
                    if matches!(self.peek_kind(), TokenKind::Keyword(Keyword::TailStrict)) {
                        self.advance();
                        tailstrict = true;
                    }
                    let span = node.span.merge(&self.tokens[self.pos - 1].span);
                    node = self.node(Expr::Apply { target: node, args, tailstrict }, span);
                }
                TokenKind::LBrace => {
                    let body = match self.parse_braced()? {
                        Braced::Body(b) => b,
                        Braced::Comp(_) => return Err(self.err("object comprehension cannot be used as an extension")),
                    };
                    let end = self.tokens[self.pos - 1].span.clone();
                    let span = node.span.merge(&end);
                    node = self.node(Expr::ObjExtend { target: node, body }, span);
                }
                _ => break,
            }
        }
        Ok(node)
    }

    fn parse_index_or_slice(&mut self, target: Box<Node>) -> Result<Box<Node>, ParseError> {
        // Already consumed '['.
        if matches!(self.peek_kind(), TokenKind::Colon) {
            return self.finish_slice(target, None);
        }
        let first = self.expr(0)?;
        if matches!(self.peek_kind(), TokenKind::Colon) {
            return self.finish_slice(target, Some(first));
        }
        self.expect(TokenKind::RBracket)?;
        let span = target.span.merge(&self.tokens[self.pos - 1].span);
        Ok(self.node(Expr::Index { target, index: first }, span))
    }

    fn finish_slice(&mut self, target: Box<Node>, from: Option<Box<Node>>) -> Result<Box<Node>, ParseError> {
        self.expect(TokenKind::Colon)?;
        let to = if matches!(self.peek_kind(), TokenKind::Colon | TokenKind::RBracket) {
            None
        } else {
            Some(self.expr(0)?)
        };
        let step = if matches!(self.peek_kind(), TokenKind::Colon) {
            self.advance();
            if matches!(self.peek_kind(), TokenKind::RBracket) { None } else { Some(self.expr(0)?) }
        } else {
            None
        };
        self.expect(TokenKind::RBracket)?;
        let span = target.span.merge(&self.tokens[self.pos - 1].span);
        Ok(self.node(Expr::Slice { target, from, to, step }, span))
    }

    fn parse_args(&mut self) -> Result<Vec<Arg>, ParseError> {
        let mut args = Vec::new();
        let mut seen_named = false;
        while !matches!(self.peek_kind(), TokenKind::RParen) {
            if let TokenKind::Ident(name) = self.peek_kind().clone() {
                if matches!(self.tokens.get(self.pos + 1).map(|t| &t.kind), Some(TokenKind::Eq)) {
                    self.advance();
                    self.advance();
                    let value = self.expr(0)?;
                    args.push(Arg::Named(name, value));
                    seen_named = true;
                } else {
                    if seen_named {
                        return Err(self.err("positional argument after named argument"));
                    }
                    args.push(Arg::Positional(self.expr(0)?));
                }
            } else {
                if seen_named {
                    return Err(self.err("positional argument after named argument"));
                }
                args.push(Arg::Positional(self.expr(0)?));
            }
            if matches!(self.peek_kind(), TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        Ok(args)
    }

    fn parse_params(&mut self) -> Result<Vec<Param>, ParseError> {
        let mut params = Vec::new();
        while !matches!(self.peek_kind(), TokenKind::RParen) {
            let (name, span) = self.expect_ident()?;
            let default = if matches!(self.peek_kind(), TokenKind::Eq) {
                self.advance();
                Some(self.expr(0)?)
            } else {
                None
            };
            params.push(Param { name, default, span });
            if matches!(self.peek_kind(), TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        Ok(params)
    }

    fn parse_bind(&mut self) -> Result<Local, ParseError> {
        let (name, start_span) = self.expect_ident()?;
        let params = if matches!(self.peek_kind(), TokenKind::LParen) {
            self.advance();
            let params = self.parse_params()?;
            self.expect(TokenKind::RParen)?;
            Some(params)
        } else {
            None
        };
        self.expect(TokenKind::Eq)?;
        let value = self.expr(0)?;
        let span = start_span.merge(&value.span);
        Ok(Local { name, params, value, span })
    }

    fn parse_assert(&mut self) -> Result<Assert, ParseError> {
        let start = self.peek().span.start;
        self.expect(TokenKind::Keyword(Keyword::Assert))?;
        let cond = self.expr(0)?;
        let message = if matches!(self.peek_kind(), TokenKind::Colon) {
            self.advance();
            Some(self.expr(0)?)
        } else {
            None
        };
        let span = self.span_from(start, message.as_ref().map_or(&cond.span, |m| &m.span));
        Ok(Assert { cond, message, span })
    }

    fn at_field_start(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Ident(_) | TokenKind::String(_) | TokenKind::LBracket)
    }

    fn parse_field_name(&mut self) -> Result<FieldName, ParseError> {
        match self.peek_kind().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(FieldName::Ident(name))
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(FieldName::String(s))
            }
            TokenKind::LBracket => {
                self.advance();
                let e = self.expr(0)?;
                self.expect(TokenKind::RBracket)?;
                Ok(FieldName::Expr(e))
            }
            other => Err(self.err(format!("expected field name, found '{other}'"))),
        }
    }

    /// Parses `{ ... }` including both braces; assumes `{` has not yet been
    /// consumed. Handles the object-comprehension special case (a single
    /// `[key]: value` field followed directly by `for`) alongside the plain
    /// member-list form.
    fn parse_braced(&mut self) -> Result<Braced, ParseError> {
        self.expect(TokenKind::LBrace)?;

        // Leading locals common to both forms.
        let mut leading_locals = Vec::new();
        loop {
            if matches!(self.peek_kind(), TokenKind::Keyword(Keyword::Local)) {
                self.advance();
                leading_locals.push(self.parse_bind()?);
                if matches!(self.peek_kind(), TokenKind::Comma) {
                    self.advance();
                    continue;
                }
            }
            break;
        }

        if matches!(self.peek_kind(), TokenKind::LBracket) {
            // object comprehension: [key]: value <post-locals> for ... (if ...)*
            self.advance();
            let key = self.expr(0)?;
            self.expect(TokenKind::RBracket)?;
            self.expect(TokenKind::Colon)?;
            let value = self.expr(0)?;
            let mut locals = leading_locals;
            while matches!(self.peek_kind(), TokenKind::Comma) {
                self.advance();
                if matches!(self.peek_kind(), TokenKind::Keyword(Keyword::Local)) {
                    self.advance();
                    locals.push(self.parse_bind()?);
                } else {
                    break;
                }
            }
            let clauses = self.parse_comp_clauses()?;
            self.expect(TokenKind::RBrace)?;
            return Ok(Braced::Comp(ObjectComp { locals_before: locals, key, value, clauses }));
        }

        let mut locals = leading_locals;
        let mut asserts = Vec::new();
        let mut fields = Vec::new();
        loop {
            if matches!(self.peek_kind(), TokenKind::RBrace) {
                break;
            }
            if matches!(self.peek_kind(), TokenKind::Keyword(Keyword::Local)) {
                self.advance();
                locals.push(self.parse_bind()?);
            } else if matches!(self.peek_kind(), TokenKind::Keyword(Keyword::Assert)) {
                asserts.push(self.parse_assert()?);
            } else if self.at_field_start() {
                fields.push(self.parse_field()?);
            } else {
                return Err(self.err(format!("expected field, local or assert, found '{}'", self.peek_kind())));
            }
            if matches!(self.peek_kind(), TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(Braced::Body(ObjectBody { locals, asserts, fields }))
    }

    fn parse_field(&mut self) -> Result<Field, ParseError> {
        let start = self.peek().span.start;
        let name = self.parse_field_name()?;
        if matches!(self.peek_kind(), TokenKind::LParen) {
            self.advance();
            let params = self.parse_params()?;
            self.expect(TokenKind::RParen)?;
            let visibility = self.parse_visibility()?;
            let body = self.expr(0)?;
            let span = self.span_from(start, &body.span);
            let func_span = body.span.clone();
            let value = self.node(Expr::Function { params, body }, func_span);
            return Ok(Field { name, visibility, plus: false, value, span });
        }
        let plus = matches!(self.peek_kind(), TokenKind::Plus);
        if plus {
            self.advance();
        }
        let visibility = self.parse_visibility()?;
        let value = self.expr(0)?;
        let span = self.span_from(start, &value.span);
        Ok(Field { name, visibility, plus, value, span })
    }

    fn parse_visibility(&mut self) -> Result<crate::ast::Visibility, ParseError> {
        use crate::ast::Visibility::*;
        let v = match self.peek_kind() {
            TokenKind::ColonColonColon => ForceVisible,
            TokenKind::ColonColon => Hidden,
            TokenKind::Colon => Visible,
            TokenKind::PlusColon => Visible,
            other => return Err(self.err(format!("expected ':', '::' or ':::' , found '{other}'"))),
        };
        self.advance();
        Ok(v)
    }

    fn parse_comp_clauses(&mut self) -> Result<Vec<CompClause>, ParseError> {
        let mut clauses = Vec::new();
        clauses.push(self.parse_for_clause()?);
        loop {
            match self.peek_kind() {
                TokenKind::Keyword(Keyword::For) => clauses.push(self.parse_for_clause()?),
                TokenKind::Keyword(Keyword::If) => {
                    self.advance();
                    let cond = self.expr(0)?;
                    clauses.push(CompClause::If(cond));
                }
                _ => break,
            }
        }
        Ok(clauses)
    }

    fn parse_for_clause(&mut self) -> Result<CompClause, ParseError> {
        let start = self.peek().span.start;
        self.expect(TokenKind::Keyword(Keyword::For))?;
        let (var, _) = self.expect_ident()?;
        self.expect(TokenKind::Keyword(Keyword::In))?;
        let expr = self.expr(0)?;
        let span = self.span_from(start, &expr.span);
        Ok(CompClause::For(ForSpec { var, expr, span }))
    }

    fn atom(&mut self) -> Result<Box<Node>, ParseError> {
        let tok = self.peek().clone();
        let start = tok.span.start;
        match tok.kind {
            TokenKind::Keyword(Keyword::Null) => {
                self.advance();
                Ok(self.node(Expr::Null, tok.span))
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Ok(self.node(Expr::True, tok.span))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Ok(self.node(Expr::False, tok.span))
            }
            TokenKind::Keyword(Keyword::SelfKw) => {
                self.advance();
                Ok(self.node(Expr::SelfExpr, tok.span))
            }
            TokenKind::Keyword(Keyword::Super) => {
                self.advance();
                Ok(self.node(Expr::Super, tok.span))
            }
            TokenKind::Dollar => {
                self.advance();
                Ok(self.node(Expr::Dollar, tok.span))
            }
            TokenKind::Number(n) => {
                self.advance();
                Ok(self.node(Expr::Number(n), tok.span))
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(self.node(Expr::Str(Rc::from(s.as_str())), tok.span))
            }
            TokenKind::Ident(name) => {
                self.advance();
                Ok(self.node(Expr::Ident(name), tok.span))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.expr(0)?;
                let close = self.expect(TokenKind::RParen)?;
                let span = self.span_from(start, &close.span);
                Ok(self.node(inner.expr, span))
            }
            TokenKind::LBracket => self.parse_array(),
            TokenKind::LBrace => {
                let braced = self.parse_braced()?;
                let end = self.tokens[self.pos - 1].span.clone();
                let span = self.span_from(start, &end);
                match braced {
                    Braced::Body(body) => Ok(self.node(Expr::Object(body), span)),
                    Braced::Comp(comp) => Ok(self.node(Expr::ObjectComp(comp), span)),
                }
            }
            TokenKind::Keyword(Keyword::Local) => self.parse_local(),
            TokenKind::Keyword(Keyword::If) => self.parse_if(),
            TokenKind::Keyword(Keyword::Function) => self.parse_function(),
            TokenKind::Keyword(Keyword::Error) => {
                self.advance();
                let message = self.expr(0)?;
                let span = self.span_from(start, &message.span);
                Ok(self.node(Expr::Error { message }, span))
            }
            TokenKind::Keyword(Keyword::Assert) => {
                let assert = self.parse_assert()?;
                self.expect(TokenKind::Semi)?;
                let body = self.expr(0)?;
                let span = self.span_from(start, &body.span);
                Ok(self.node(Expr::Assert { assert, body }, span))
            }
            TokenKind::Keyword(Keyword::Import) => {
                self.advance();
                let path = self.parse_string_literal()?;
                let span = self.span_from(start, &self.tokens[self.pos - 1].span);
                Ok(self.node(Expr::Import(path), span))
            }
            TokenKind::Keyword(Keyword::ImportStr) => {
                self.advance();
                let path = self.parse_string_literal()?;
                let span = self.span_from(start, &self.tokens[self.pos - 1].span);
                Ok(self.node(Expr::ImportStr(path), span))
            }
            TokenKind::Keyword(Keyword::ImportBin) => {
                self.advance();
                let path = self.parse_string_literal()?;
                let span = self.span_from(start, &self.tokens[self.pos - 1].span);
                Ok(self.node(Expr::ImportBin(path), span))
            }
            other => Err(self.err(format!("unexpected token '{other}'"))),
        }
    }

    fn parse_string_literal(&mut self) -> Result<String, ParseError> {
        match self.peek_kind().clone() {
            TokenKind::String(s) => {
                self.advance();
                Ok(s)
            }
            other => Err(self.err(format!("expected string literal, found '{other}'"))),
        }
    }

    fn parse_array(&mut self) -> Result<Box<Node>, ParseError> {
        let start = self.peek().span.start;
        self.expect(TokenKind::LBracket)?;
        if matches!(self.peek_kind(), TokenKind::RBracket) {
            self.advance();
            let span = self.span_from(start, &self.tokens[self.pos - 1].span);
            return Ok(self.node(Expr::Array(Vec::new()), span));
        }
        let first = self.expr(0)?;
        if matches!(self.peek_kind(), TokenKind::Keyword(Keyword::For)) {
            let clauses = self.parse_comp_clauses()?;
            let close = self.expect(TokenKind::RBracket)?;
            let span = self.span_from(start, &close.span);
            return Ok(self.node(Expr::ArrayComp(ArrayComp { body: first, clauses }), span));
        }
        let mut elems = vec![first];
        while matches!(self.peek_kind(), TokenKind::Comma) {
            self.advance();
            if matches!(self.peek_kind(), TokenKind::RBracket) {
                break;
            }
            elems.push(self.expr(0)?);
        }
        let close = self.expect(TokenKind::RBracket)?;
        let span = self.span_from(start, &close.span);
        Ok(self.node(Expr::Array(elems), span))
    }

    fn parse_local(&mut self) -> Result<Box<Node>, ParseError> {
        let start = self.peek().span.start;
        self.expect(TokenKind::Keyword(Keyword::Local))?;
        let mut binds = vec![self.parse_bind()?];
        while matches!(self.peek_kind(), TokenKind::Comma) {
            self.advance();
            binds.push(self.parse_bind()?);
        }
        self.expect(TokenKind::Semi)?;
        let body = self.expr(0)?;
        let span = self.span_from(start, &body.span);
        Ok(self.node(Expr::Local { binds, body }, span))
    }

    fn parse_if(&mut self) -> Result<Box<Node>, ParseError> {
        let start = self.peek().span.start;
        self.expect(TokenKind::Keyword(Keyword::If))?;
        let cond = self.expr(0)?;
        self.expect(TokenKind::Keyword(Keyword::Then))?;
        let then_branch = self.expr(0)?;
        let else_branch = if matches!(self.peek_kind(), TokenKind::Keyword(Keyword::Else)) {
            self.advance();
            Some(self.expr(0)?)
        } else {
            None
        };
        let last_span = else_branch.as_ref().map_or(&then_branch.span, |e| &e.span);
        let span = self.span_from(start, last_span);
        Ok(self.node(Expr::If { cond, then_branch, else_branch }, span))
    }

    fn parse_function(&mut self) -> Result<Box<Node>, ParseError> {
        let start = self.peek().span.start;
        self.expect(TokenKind::Keyword(Keyword::Function))?;
        self.expect(TokenKind::LParen)?;
        let params = self.parse_params()?;
        self.expect(TokenKind::RParen)?;
        let body = self.expr(0)?;
        let span = self.span_from(start, &body.span);
        Ok(self.node(Expr::Function { params, body }, span))
    }
}

enum Braced {
    Body(ObjectBody),
    Comp(ObjectComp),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(src: &str) -> Node {
        parse(src, "test.jsonnet").unwrap()
    }

    #[test]
    fn precedence_of_arithmetic() {
        let n = parse_ok("1 + 2 * 3");
        match &n.expr {
            Expr::Binary { op: BinaryOp::Add, rhs, .. } => {
                assert!(matches!(rhs.expr, Expr::Binary { op: BinaryOp::Mul, .. }));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn object_literal() {
        let n = parse_ok("{ a: 1, b: 2 }");
        match n.expr {
            Expr::Object(body) => assert_eq!(body.fields.len(), 2),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn function_call_chain() {
        let n = parse_ok("f(1)(2).x[0]");
        assert!(matches!(n.expr, Expr::Index { .. }));
    }

    #[test]
    fn if_then_else() {
        let n = parse_ok("if true then 1 else 2");
        assert!(matches!(n.expr, Expr::If { .. }));
    }

    #[test]
    fn local_binding() {
        let n = parse_ok("local x = 1; x + 1");
        assert!(matches!(n.expr, Expr::Local { .. }));
    }

    #[test]
    fn object_extend_sugar() {
        let n = parse_ok("{a:1} {b:2}");
        assert!(matches!(n.expr, Expr::ObjExtend { .. }));
    }
}
