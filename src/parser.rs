//! Parser for the Sentrie policy language.
//!
//! A recursive descent statement parser over [`Lexer`] tokens, with a
//! Pratt expression parser driven by the binding powers in
//! [`crate::pratt`]. The parser enforces only syntactic structure: a
//! program is one namespace statement followed by policies, shapes, and
//! shape exports, and a policy body is any mix of facts, uses, lets,
//! rules, rule exports, and policy-local shapes. Statement ordering rules
//! (facts first, uses immediately after) belong to the index.
//!
//! # Error recovery
//!
//! On a syntax error the parser records it, skips ahead to the next
//! statement boundary (`;`, `}`, or a statement keyword), and keeps
//! going. [`Parser::parse`] returns the first recorded error;
//! [`Parser::errors`] exposes all of them.
//!
//! # Example
//!
//! ```rust
//! use sentrie::parser::Parser;
//!
//! let source = r#"
//! namespace com/example
//!
//! policy auth {
//!   fact user: string
//!   rule allow when true = true
//!   export allow
//! }
//! "#;
//!
//! let mut parser = Parser::new(source, "auth.sn");
//! let program = parser.parse();
//! assert!(program.is_ok());
//! ```

use crate::ast::*;
use crate::error::ParseError;
use crate::fqn::Fqn;
use crate::lexer::Lexer;
use crate::pratt::{infix_binding_power, postfix_binding_power, prefix_binding_power, PREFIX_BP};
use crate::token::{lookup_keyword, Range, Token, TokenKind};
use crate::trinary::Trinary;

/// The parser for one Sentrie source file.
pub struct Parser<'a> {
    /// The underlying lexer.
    lexer: Lexer<'a>,

    /// Current token.
    current: Token,

    /// One-token lookahead buffer.
    peeked: Option<Token>,

    /// Range of the most recently consumed token, for span closing.
    prev_range: Range,

    /// Comment tokens seen but not yet attached to a statement list.
    pending_comments: Vec<Token>,

    /// Collected errors, in source order of detection.
    errors: Vec<ParseError>,
}

impl<'a> Parser<'a> {
    /// Creates a parser over `source`; `file` is the program reference
    /// stamped into every range.
    pub fn new(source: &'a str, file: &str) -> Self {
        let mut parser = Parser {
            lexer: Lexer::new(source, file),
            current: Token::new(TokenKind::Eof, "", Range::default()),
            peeked: None,
            prev_range: Range::default(),
            pending_comments: Vec::new(),
            errors: Vec::new(),
        };
        parser.current = parser.next_noncomment();
        parser
    }

    /// All errors collected during the last `parse` call.
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    /// Parses a whole program.
    ///
    /// On syntax errors the parser recovers to statement boundaries and
    /// keeps collecting; the first error is returned.
    pub fn parse(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut stmts = Vec::new();
        self.drain_comments(&mut stmts);

        if self.current.kind == TokenKind::Namespace {
            match self.parse_namespace() {
                Ok(stmt) => stmts.push(stmt),
                Err(err) => {
                    self.errors.push(err);
                    self.synchronize();
                }
            }
        } else {
            self.errors.push(ParseError::MissingNamespace {
                found: self.describe_current(),
                range: self.current.range.clone(),
            });
        }

        loop {
            self.drain_comments(&mut stmts);
            let result = match self.current.kind {
                TokenKind::Eof => break,
                TokenKind::Policy => self.parse_policy(),
                TokenKind::Shape => self.parse_shape(),
                TokenKind::Export => self.parse_shape_export(),
                _ => Err(self.unexpected("'policy', 'shape', or 'export shape'")),
            };
            match result {
                Ok(stmt) => stmts.push(stmt),
                Err(err) => {
                    self.errors.push(err);
                    let before = self.current.range.from.offset;
                    self.synchronize();
                    // Recovery must consume something, or the offending
                    // token would error forever.
                    if self.current.kind != TokenKind::Eof
                        && self.current.range.from.offset == before
                    {
                        self.bump();
                    }
                }
            }
        }
        self.drain_comments(&mut stmts);

        // Lexer errors that never surfaced through a grammar rule still
        // fail the parse.
        if self.errors.is_empty() {
            if let Some(lex) = self.lexer.errors().first() {
                self.errors.push(ParseError::Lex(lex.clone()));
            }
        }

        match self.errors.first() {
            Some(err) => Err(err.clone()),
            None => Ok(stmts),
        }
    }

    // === Token plumbing ===

    fn next_noncomment(&mut self) -> Token {
        loop {
            let token = self.lexer.next_token();
            if token.kind.is_comment() {
                self.pending_comments.push(token);
            } else {
                return token;
            }
        }
    }

    fn bump(&mut self) {
        let next = match self.peeked.take() {
            Some(token) => token,
            None => self.next_noncomment(),
        };
        self.prev_range = std::mem::replace(&mut self.current, next).range;
    }

    fn peek_kind(&mut self) -> TokenKind {
        if self.peeked.is_none() {
            self.peeked = Some(self.next_noncomment());
        }
        match &self.peeked {
            Some(token) => token.kind,
            None => TokenKind::Eof,
        }
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.current.kind == kind {
            self.bump();
            true
        } else {
            false
        }
    }

    fn describe_current(&self) -> String {
        match self.current.kind {
            TokenKind::Ident => format!("identifier '{}'", self.current.literal),
            TokenKind::Eof => "end of file".to_string(),
            _ => format!("'{}'", self.current.literal),
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        if self.current.kind == TokenKind::Eof {
            return ParseError::UnexpectedEof {
                context: format!("expected {expected}"),
                range: self.current.range.clone(),
            };
        }
        if self.current.kind == TokenKind::Error {
            if let Some(lex) = self.lexer.errors().last() {
                return ParseError::Lex(lex.clone());
            }
        }
        ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found: self.describe_current(),
            range: self.current.range.clone(),
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<Token, ParseError> {
        if self.current.kind == kind {
            let token = self.current.clone();
            self.bump();
            Ok(token)
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_ident(&mut self, expected: &str) -> Result<Token, ParseError> {
        self.expect(TokenKind::Ident, expected)
    }

    /// Accepts an identifier or a keyword used as a plain name, e.g. a
    /// field called `count` or the `@in` constraint.
    fn take_name(&mut self, expected: &str) -> Result<Token, ParseError> {
        let is_name = self.current.kind == TokenKind::Ident
            || lookup_keyword(&self.current.literal) == Some(self.current.kind);
        if is_name {
            let token = self.current.clone();
            self.bump();
            Ok(token)
        } else {
            Err(self.unexpected(expected))
        }
    }

    /// Skips ahead to the next plausible statement boundary.
    fn synchronize(&mut self) {
        loop {
            match self.current.kind {
                TokenKind::Eof => return,
                TokenKind::Semicolon => {
                    self.bump();
                    return;
                }
                TokenKind::RBrace => {
                    self.bump();
                    return;
                }
                kind if kind.starts_statement() => return,
                _ => self.bump(),
            }
        }
    }

    fn drain_comments(&mut self, out: &mut Vec<Stmt>) {
        for token in self.pending_comments.drain(..) {
            out.push(Stmt::Comment(CommentStmt {
                text: token.literal,
                trailing: token.kind == TokenKind::TrailingComment,
                range: token.range,
            }));
        }
    }

    fn close_range(&self, start: &Range) -> Range {
        start.merge(&self.prev_range)
    }

    // === Statements ===

    fn parse_fqn(&mut self, expected: &str) -> Result<(Fqn, Range), ParseError> {
        let first = self.expect_ident(expected)?;
        let start = first.range.clone();
        let mut segments = vec![first.literal];
        while self.current.kind == TokenKind::Slash && self.peek_kind() == TokenKind::Ident {
            self.bump();
            let segment = self.expect_ident("identifier")?;
            segments.push(segment.literal);
        }
        let range = self.close_range(&start);
        match Fqn::new(segments) {
            Some(fqn) => Ok((fqn, range)),
            None => Err(ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: "empty path".to_string(),
                range,
            }),
        }
    }

    fn parse_namespace(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current.range.clone();
        self.expect(TokenKind::Namespace, "'namespace'")?;
        let (fqn, _) = self.parse_fqn("namespace path")?;
        self.eat(TokenKind::Semicolon);
        Ok(Stmt::Namespace(NamespaceStmt {
            fqn,
            range: self.close_range(&start),
        }))
    }

    fn parse_policy(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current.range.clone();
        self.expect(TokenKind::Policy, "'policy'")?;
        let name = self.expect_ident("policy name")?;
        self.expect(TokenKind::LBrace, "'{'")?;

        let mut body = Vec::new();
        loop {
            self.drain_comments(&mut body);
            let result = match self.current.kind {
                TokenKind::RBrace => break,
                TokenKind::Eof => return Err(self.unexpected("'}' closing policy body")),
                TokenKind::Fact => self.parse_fact(),
                TokenKind::Use => self.parse_use(),
                TokenKind::Let => self.parse_let(),
                TokenKind::Rule => self.parse_rule(),
                TokenKind::Export => self.parse_rule_export(),
                TokenKind::Shape => self.parse_shape(),
                _ => Err(self.unexpected("a policy body statement")),
            };
            match result {
                Ok(stmt) => body.push(stmt),
                Err(err) => {
                    self.errors.push(err);
                    let before = self.current.range.from.offset;
                    self.synchronize_body();
                    if self.current.kind != TokenKind::Eof
                        && self.current.kind != TokenKind::RBrace
                        && self.current.range.from.offset == before
                    {
                        self.bump();
                    }
                }
            }
        }
        self.expect(TokenKind::RBrace, "'}'")?;

        Ok(Stmt::Policy(PolicyStmt {
            name: name.literal,
            body,
            range: self.close_range(&start),
        }))
    }

    /// Recovery inside a policy body: stop before the closing brace so the
    /// policy statement itself survives.
    fn synchronize_body(&mut self) {
        loop {
            match self.current.kind {
                TokenKind::Eof | TokenKind::RBrace => return,
                TokenKind::Semicolon => {
                    self.bump();
                    return;
                }
                kind if kind.starts_statement() => return,
                _ => self.bump(),
            }
        }
    }

    fn parse_fact(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current.range.clone();
        self.expect(TokenKind::Fact, "'fact'")?;
        let name = self.expect_ident("fact name")?;
        let alias = if self.eat(TokenKind::As) {
            Some(self.expect_ident("fact alias")?.literal)
        } else {
            None
        };
        self.expect(TokenKind::Colon, "':'")?;
        let type_ref = self.parse_type_ref()?;
        let default = if self.eat(TokenKind::Assign) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.eat(TokenKind::Semicolon);
        Ok(Stmt::Fact(FactStmt {
            name: name.literal,
            alias,
            type_ref,
            default,
            range: self.close_range(&start),
        }))
    }

    fn parse_use(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current.range.clone();
        self.expect(TokenKind::Use, "'use'")?;
        let (target, _) = self.parse_fqn("policy path")?;
        let alias = if self.eat(TokenKind::As) {
            Some(self.expect_ident("alias")?.literal)
        } else {
            None
        };
        self.eat(TokenKind::Semicolon);
        Ok(Stmt::Use(UseStmt {
            target,
            alias,
            range: self.close_range(&start),
        }))
    }

    fn parse_let(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current.range.clone();
        self.expect(TokenKind::Let, "'let'")?;
        let name = self.expect_ident("binding name")?;
        self.expect(TokenKind::Assign, "'='")?;
        let value = self.parse_expr()?;
        self.eat(TokenKind::Semicolon);
        Ok(Stmt::VarDecl(VarDeclStmt {
            name: name.literal,
            value,
            range: self.close_range(&start),
        }))
    }

    fn parse_rule(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current.range.clone();
        self.expect(TokenKind::Rule, "'rule'")?;
        let name = self.expect_ident("rule name")?;

        let mut default = None;
        let mut when = None;
        loop {
            if self.current.kind == TokenKind::Default && default.is_none() {
                self.bump();
                default = Some(self.parse_expr()?);
            } else if self.current.kind == TokenKind::When && when.is_none() {
                self.bump();
                when = Some(self.parse_expr()?);
            } else {
                break;
            }
        }

        self.expect(TokenKind::Assign, "'='")?;
        let body = self.parse_expr()?;
        self.eat(TokenKind::Semicolon);
        Ok(Stmt::Rule(RuleStmt {
            name: name.literal,
            default,
            when,
            body,
            range: self.close_range(&start),
        }))
    }

    fn parse_rule_export(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current.range.clone();
        self.expect(TokenKind::Export, "'export'")?;
        let rule_name = self.expect_ident("rule name")?;

        let mut attachments = Vec::new();
        if self.eat(TokenKind::LBrace) {
            loop {
                if self.current.kind == TokenKind::RBrace {
                    break;
                }
                let what = self.take_name("attachment name")?;
                let clause_start = what.range.clone();
                self.expect(TokenKind::As, "'as'")?;
                let as_expr = self.parse_expr()?;
                attachments.push(AttachmentClause {
                    what: what.literal,
                    as_expr,
                    range: self.close_range(&clause_start),
                });
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RBrace, "'}'")?;
        }
        self.eat(TokenKind::Semicolon);
        Ok(Stmt::RuleExport(RuleExportStmt {
            rule_name: rule_name.literal,
            attachments,
            range: self.close_range(&start),
        }))
    }

    fn parse_shape(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current.range.clone();
        self.expect(TokenKind::Shape, "'shape'")?;
        let name = self.expect_ident("shape name")?;

        if self.eat(TokenKind::Assign) {
            let type_ref = self.parse_type_ref()?;
            self.eat(TokenKind::Semicolon);
            return Ok(Stmt::Shape(ShapeStmt {
                name: name.literal,
                def: ShapeDef::Alias(type_ref),
                range: self.close_range(&start),
            }));
        }

        let parent = if self.eat(TokenKind::With) {
            Some(self.parse_fqn("parent shape")?.0)
        } else {
            None
        };

        self.expect(TokenKind::LBrace, "'{'")?;
        let mut fields = Vec::new();
        while self.current.kind != TokenKind::RBrace {
            if self.current.kind == TokenKind::Eof {
                return Err(self.unexpected("'}' closing shape body"));
            }
            fields.push(self.parse_shape_field()?);
        }
        self.expect(TokenKind::RBrace, "'}'")?;

        Ok(Stmt::Shape(ShapeStmt {
            name: name.literal,
            def: ShapeDef::Cmplx { parent, fields },
            range: self.close_range(&start),
        }))
    }

    fn parse_shape_field(&mut self) -> Result<ShapeField, ParseError> {
        let name = self.take_name("field name")?;
        let start = name.range.clone();
        let mut required = true;
        let mut not_nullable = false;
        loop {
            if self.eat(TokenKind::Question) {
                required = false;
            } else if self.eat(TokenKind::Bang) {
                not_nullable = true;
            } else {
                break;
            }
        }
        self.expect(TokenKind::Colon, "':'")?;
        let type_ref = self.parse_type_ref()?;
        let default = if self.eat(TokenKind::Assign) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.eat(TokenKind::Semicolon);
        Ok(ShapeField {
            name: name.literal,
            type_ref,
            not_nullable,
            required,
            default,
            range: self.close_range(&start),
        })
    }

    fn parse_shape_export(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current.range.clone();
        self.expect(TokenKind::Export, "'export'")?;
        self.expect(TokenKind::Shape, "'shape'")?;
        let name = self.expect_ident("shape name")?;
        self.eat(TokenKind::Semicolon);
        Ok(Stmt::ShapeExport(ShapeExportStmt {
            name: name.literal,
            range: self.close_range(&start),
        }))
    }

    // === Types ===

    fn parse_type_ref(&mut self) -> Result<TypeRef, ParseError> {
        let start = self.current.range.clone();
        let kind = match self.current.kind {
            TokenKind::StringType => {
                self.bump();
                TypeRefKind::String
            }
            TokenKind::NumberType => {
                self.bump();
                TypeRefKind::Number
            }
            TokenKind::BooleanType => {
                self.bump();
                TypeRefKind::Boolean
            }
            TokenKind::TrinaryType => {
                self.bump();
                TypeRefKind::Trinary
            }
            TokenKind::List => {
                self.bump();
                self.expect(TokenKind::Lt, "'<'")?;
                let inner = self.parse_type_ref()?;
                self.expect(TokenKind::Gt, "'>'")?;
                TypeRefKind::List(Box::new(inner))
            }
            TokenKind::Map => {
                self.bump();
                self.expect(TokenKind::Lt, "'<'")?;
                let key = self.parse_type_ref()?;
                self.expect(TokenKind::Comma, "','")?;
                let value = self.parse_type_ref()?;
                self.expect(TokenKind::Gt, "'>'")?;
                TypeRefKind::Map(Box::new(key), Box::new(value))
            }
            TokenKind::Ident => {
                let (fqn, _) = self.parse_fqn("type name")?;
                TypeRefKind::Named(fqn)
            }
            _ => return Err(self.unexpected("a type")),
        };

        let mut constraints = Vec::new();
        while self.current.kind == TokenKind::At {
            let at_range = self.current.range.clone();
            self.bump();
            let name = self.take_name("constraint name")?;
            let mut args = Vec::new();
            if self.eat(TokenKind::LParen) {
                while self.current.kind != TokenKind::RParen {
                    args.push(self.parse_expr()?);
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::RParen, "')'")?;
            }
            constraints.push(ConstraintRef {
                name: name.literal,
                args,
                range: at_range.merge(&self.prev_range),
            });
        }

        Ok(TypeRef {
            kind,
            constraints,
            range: self.close_range(&start),
        })
    }

    // === Expressions ===

    /// Parses a full expression, including the loosest-binding ternary.
    pub fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.current.range.clone();
        let cond = self.parse_bp(0)?;
        if !self.eat(TokenKind::Question) {
            return Ok(cond);
        }
        let then = self.parse_expr()?;
        self.expect(TokenKind::Colon, "':'")?;
        let otherwise = self.parse_expr()?;
        Ok(Expr::Ternary {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
            range: self.close_range(&start),
        })
    }

    fn parse_bp(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        let start = self.current.range.clone();

        let mut lhs = if let Some(r_bp) = prefix_binding_power(self.current.kind) {
            let op = match self.current.kind {
                TokenKind::Not => UnaryOp::Not,
                _ => UnaryOp::Neg,
            };
            self.bump();
            let operand = self.parse_bp(r_bp)?;
            Expr::Unary {
                op,
                operand: Box::new(operand),
                range: self.close_range(&start),
            }
        } else {
            self.parse_atom()?
        };

        loop {
            let kind = self.current.kind;

            if let Some(p_bp) = postfix_binding_power(kind) {
                if p_bp < min_bp {
                    break;
                }
                lhs = self.parse_postfix(lhs, &start)?;
                continue;
            }

            if let Some((l_bp, r_bp)) = infix_binding_power(kind) {
                if l_bp < min_bp {
                    break;
                }
                let op = match kind {
                    TokenKind::Or => InfixOp::Or,
                    TokenKind::Xor => InfixOp::Xor,
                    TokenKind::And => InfixOp::And,
                    TokenKind::Eq => InfixOp::Eq,
                    TokenKind::NotEq => InfixOp::NotEq,
                    TokenKind::Lt => InfixOp::Lt,
                    TokenKind::LtEq => InfixOp::LtEq,
                    TokenKind::Gt => InfixOp::Gt,
                    TokenKind::GtEq => InfixOp::GtEq,
                    TokenKind::In => InfixOp::In,
                    TokenKind::Contains => InfixOp::Contains,
                    TokenKind::Matches => InfixOp::Matches,
                    TokenKind::Plus => InfixOp::Add,
                    TokenKind::Minus => InfixOp::Sub,
                    TokenKind::Star => InfixOp::Mul,
                    TokenKind::Slash => InfixOp::Div,
                    _ => InfixOp::Mod,
                };
                self.bump();
                let rhs = self.parse_bp(r_bp)?;
                lhs = Expr::Infix {
                    op,
                    left: Box::new(lhs),
                    right: Box::new(rhs),
                    range: self.close_range(&start),
                };
                continue;
            }

            break;
        }

        Ok(lhs)
    }

    fn parse_postfix(&mut self, lhs: Expr, start: &Range) -> Result<Expr, ParseError> {
        match self.current.kind {
            TokenKind::Dot => {
                self.bump();
                let field = self.take_name("field name")?;
                Ok(Expr::FieldAccess {
                    object: Box::new(lhs),
                    field: field.literal,
                    range: self.close_range(start),
                })
            }
            TokenKind::LParen => {
                self.bump();
                let mut args = Vec::new();
                while self.current.kind != TokenKind::RParen {
                    args.push(self.parse_expr()?);
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::RParen, "')'")?;
                Ok(Expr::Call {
                    callee: Box::new(lhs),
                    args,
                    range: self.close_range(start),
                })
            }
            TokenKind::LBracket => {
                self.bump();
                let index = self.parse_expr()?;
                self.expect(TokenKind::RBracket, "']'")?;
                Ok(Expr::IndexAccess {
                    object: Box::new(lhs),
                    index: Box::new(index),
                    range: self.close_range(start),
                })
            }
            _ => {
                // `is [not] defined` / `is [not] empty`
                self.expect(TokenKind::Is, "'is'")?;
                let negated = self.eat(TokenKind::Not);
                let test = if self.eat(TokenKind::Defined) {
                    PresenceTest::Defined
                } else if self.eat(TokenKind::Empty) {
                    PresenceTest::Empty
                } else {
                    return Err(self.unexpected("'defined' or 'empty'"));
                };
                Ok(Expr::Presence {
                    subject: Box::new(lhs),
                    test,
                    negated,
                    range: self.close_range(start),
                })
            }
        }
    }

    fn parse_atom(&mut self) -> Result<Expr, ParseError> {
        let token = self.current.clone();
        let start = token.range.clone();
        match token.kind {
            TokenKind::Int => {
                self.bump();
                match token.literal.parse::<i64>() {
                    Ok(n) => Ok(Expr::Int(n, start)),
                    Err(_) => Err(ParseError::InvalidLiteral {
                        text: token.literal,
                        range: start,
                    }),
                }
            }
            TokenKind::Float => {
                self.bump();
                match token.literal.parse::<f64>() {
                    Ok(f) => Ok(Expr::Float(f, start)),
                    Err(_) => Err(ParseError::InvalidLiteral {
                        text: token.literal,
                        range: start,
                    }),
                }
            }
            TokenKind::String => {
                self.bump();
                Ok(Expr::Str(token.literal, start))
            }
            TokenKind::True => {
                self.bump();
                Ok(Expr::Trinary(Trinary::True, start))
            }
            TokenKind::False => {
                self.bump();
                Ok(Expr::Trinary(Trinary::False, start))
            }
            TokenKind::Unknown => {
                self.bump();
                Ok(Expr::Trinary(Trinary::Unknown, start))
            }
            TokenKind::Ident => {
                self.bump();
                Ok(Expr::Ident(token.literal, start))
            }
            TokenKind::LParen => {
                self.bump();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            TokenKind::LBracket => {
                self.bump();
                let mut items = Vec::new();
                while self.current.kind != TokenKind::RBracket {
                    items.push(self.parse_expr()?);
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::RBracket, "']'")?;
                Ok(Expr::ListLit(items, self.close_range(&start)))
            }
            TokenKind::LBrace => self.parse_map_or_block(start),
            TokenKind::From => {
                self.bump();
                let (policy, _) = self.parse_fqn("policy path")?;
                self.expect(TokenKind::Use, "'use'")?;
                let rule = self.expect_ident("rule name")?;
                Ok(Expr::ImportClause {
                    policy,
                    rule: rule.literal,
                    range: self.close_range(&start),
                })
            }
            TokenKind::Any | TokenKind::All => {
                let kind = if token.kind == TokenKind::Any {
                    QuantKind::Any
                } else {
                    QuantKind::All
                };
                self.bump();
                let var = self.expect_ident("binding name")?;
                self.expect(TokenKind::In, "'in'")?;
                let iter = self.parse_expr()?;
                self.expect(TokenKind::Colon, "':'")?;
                let pred = self.parse_expr()?;
                Ok(Expr::Quantifier {
                    kind,
                    var: var.literal,
                    iter: Box::new(iter),
                    pred: Box::new(pred),
                    range: self.close_range(&start),
                })
            }
            TokenKind::Filter | TokenKind::Map => {
                let kind = if token.kind == TokenKind::Filter {
                    CollectKind::Filter
                } else {
                    CollectKind::MapEach
                };
                self.bump();
                let var = self.expect_ident("binding name")?;
                self.expect(TokenKind::In, "'in'")?;
                let iter = self.parse_expr()?;
                self.expect(TokenKind::Colon, "':'")?;
                let body = self.parse_expr()?;
                Ok(Expr::Collect {
                    kind,
                    var: var.literal,
                    iter: Box::new(iter),
                    body: Box::new(body),
                    range: self.close_range(&start),
                })
            }
            TokenKind::Distinct => {
                self.bump();
                let inner = self.parse_bp(PREFIX_BP)?;
                Ok(Expr::Distinct(Box::new(inner), self.close_range(&start)))
            }
            TokenKind::Count => {
                self.bump();
                let inner = self.parse_bp(PREFIX_BP)?;
                Ok(Expr::Count(Box::new(inner), self.close_range(&start)))
            }
            TokenKind::Reduce => {
                self.bump();
                let acc = self.expect_ident("accumulator name")?;
                self.expect(TokenKind::Comma, "','")?;
                let var = self.expect_ident("binding name")?;
                self.expect(TokenKind::In, "'in'")?;
                let iter = self.parse_expr()?;
                self.expect(TokenKind::From, "'from'")?;
                let init = self.parse_expr()?;
                self.expect(TokenKind::Colon, "':'")?;
                let body = self.parse_expr()?;
                Ok(Expr::Reduce {
                    acc: acc.literal,
                    var: var.literal,
                    iter: Box::new(iter),
                    init: Box::new(init),
                    body: Box::new(body),
                    range: self.close_range(&start),
                })
            }
            _ => Err(self.unexpected("an expression")),
        }
    }

    /// Disambiguates `{`: empty braces and string-keyed entries are map
    /// literals, anything else is a block.
    fn parse_map_or_block(&mut self, start: Range) -> Result<Expr, ParseError> {
        self.expect(TokenKind::LBrace, "'{'")?;

        if self.eat(TokenKind::RBrace) {
            return Ok(Expr::MapLit(Vec::new(), self.close_range(&start)));
        }

        if self.current.kind == TokenKind::String && self.peek_kind() == TokenKind::Colon {
            let mut entries = Vec::new();
            loop {
                let key = self.expect(TokenKind::String, "map key")?;
                self.expect(TokenKind::Colon, "':'")?;
                let value = self.parse_expr()?;
                entries.push((key.literal, value));
                if !self.eat(TokenKind::Comma) {
                    break;
                }
                if self.current.kind == TokenKind::RBrace {
                    break;
                }
            }
            self.expect(TokenKind::RBrace, "'}'")?;
            return Ok(Expr::MapLit(entries, self.close_range(&start)));
        }

        let mut stmts = Vec::new();
        while self.current.kind == TokenKind::Let {
            stmts.push(self.parse_let()?);
        }
        let yield_expr = self.parse_expr()?;
        self.eat(TokenKind::Semicolon);
        self.expect(TokenKind::RBrace, "'}'")?;
        Ok(Expr::Block {
            stmts,
            yield_expr: Box::new(yield_expr),
            range: self.close_range(&start),
        })
    }
}
