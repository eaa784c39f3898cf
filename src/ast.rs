//! Abstract syntax tree for the Sentrie policy language.
//!
//! One parsed source file is a sequence of [`Stmt`]s: a leading namespace
//! statement followed by policies, shapes, and shape exports. Policy
//! bodies reuse the same statement sum for facts, uses, lets, rules, rule
//! exports, and policy-local shapes. Every node carries a [`Range`] back
//! into its source file.
//!
//! AST nodes outlive parsing: the index holds onto the statements it was
//! built from for the lifetime of the pack.

use crate::fqn::Fqn;
use crate::token::Range;
use crate::trinary::Trinary;

/// A statement, either top-level or inside a policy body.
///
/// The parser accepts any body statement order; the index enforces the
/// ordering rules (facts first, uses immediately after).
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `namespace com/example`
    Namespace(NamespaceStmt),
    /// `policy name { ... }`
    Policy(PolicyStmt),
    /// `shape Name = type` or `shape Name [with Parent] { fields }`
    Shape(ShapeStmt),
    /// `export shape Name`
    ShapeExport(ShapeExportStmt),
    /// `fact name [as alias]: type [@constraint...] [= default]`
    Fact(FactStmt),
    /// `use some/policy [as alias]`
    Use(UseStmt),
    /// `let name = expr`
    VarDecl(VarDeclStmt),
    /// `rule name [default expr] [when expr] = body`
    Rule(RuleStmt),
    /// `export rule_name [{ what as expr, ... }]`
    RuleExport(RuleExportStmt),
    /// A `--` comment kept as leading/trailing metadata.
    Comment(CommentStmt),
}

impl Stmt {
    /// The source range of this statement.
    pub fn range(&self) -> &Range {
        match self {
            Stmt::Namespace(s) => &s.range,
            Stmt::Policy(s) => &s.range,
            Stmt::Shape(s) => &s.range,
            Stmt::ShapeExport(s) => &s.range,
            Stmt::Fact(s) => &s.range,
            Stmt::Use(s) => &s.range,
            Stmt::VarDecl(s) => &s.range,
            Stmt::Rule(s) => &s.range,
            Stmt::RuleExport(s) => &s.range,
            Stmt::Comment(s) => &s.range,
        }
    }

    /// True for comment statements, which ordering checks skip over.
    pub fn is_comment(&self) -> bool {
        matches!(self, Stmt::Comment(_))
    }
}

/// The mandatory first statement of every program.
#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceStmt {
    /// The namespace FQN.
    pub fqn: Fqn,
    /// Source location.
    pub range: Range,
}

/// A policy declaration with its body statements in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyStmt {
    /// The policy name.
    pub name: String,
    /// Body statements in source order.
    pub body: Vec<Stmt>,
    /// Source location.
    pub range: Range,
}

/// A shape declaration, simple alias or complex record.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeStmt {
    /// The shape name.
    pub name: String,
    /// Alias or complex definition.
    pub def: ShapeDef,
    /// Source location.
    pub range: Range,
}

/// The two kinds of shape definition.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeDef {
    /// `shape Id = string @uuid` — a named alias for a type reference.
    Alias(TypeRef),
    /// `shape User with Base { ... }` — a record with optional composition
    /// parent and ordered fields.
    Cmplx {
        /// Parent shape FQN from a `with` clause.
        parent: Option<Fqn>,
        /// Fields in declaration order.
        fields: Vec<ShapeField>,
    },
}

/// One field of a complex shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeField {
    /// The field name.
    pub name: String,
    /// The field type.
    pub type_ref: TypeRef,
    /// `!` — a present value must not be null.
    pub not_nullable: bool,
    /// Absent `?` — the key must be present in the input.
    pub required: bool,
    /// Default expression used when the key is absent.
    pub default: Option<Expr>,
    /// Source location.
    pub range: Range,
}

/// `export shape Name` at namespace level.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeExportStmt {
    /// The exported shape name.
    pub name: String,
    /// Source location.
    pub range: Range,
}

/// A declared policy input.
#[derive(Debug, Clone, PartialEq)]
pub struct FactStmt {
    /// The declared name.
    pub name: String,
    /// Optional alias; the input map is read at the alias and the value is
    /// bound at the alias. Defaults to the name.
    pub alias: Option<String>,
    /// The declared type, including any constraints.
    pub type_ref: TypeRef,
    /// Default expression used when the input key is absent.
    pub default: Option<Expr>,
    /// Source location.
    pub range: Range,
}

impl FactStmt {
    /// The alias the fact is read and bound at.
    pub fn binding(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// A policy-level import of another policy's exported rules.
#[derive(Debug, Clone, PartialEq)]
pub struct UseStmt {
    /// The target policy FQN; a single segment refers to a policy in the
    /// importing namespace.
    pub target: Fqn,
    /// Optional alias; defaults to the target's simple name.
    pub alias: Option<String>,
    /// Source location.
    pub range: Range,
}

impl UseStmt {
    /// The name the imported policy is bound to inside the policy body.
    pub fn binding(&self) -> &str {
        self.alias.as_deref().unwrap_or_else(|| self.target.last())
    }
}

/// A `let` binding. Lets evaluate lazily and memoize per rule execution.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDeclStmt {
    /// The binding name.
    pub name: String,
    /// The bound expression.
    pub value: Expr,
    /// Source location.
    pub range: Range,
}

/// A rule declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleStmt {
    /// The rule name.
    pub name: String,
    /// Fallback expression used when the `when` guard is false.
    pub default: Option<Expr>,
    /// Guard expression gating the body.
    pub when: Option<Expr>,
    /// The rule body.
    pub body: Expr,
    /// Source location.
    pub range: Range,
}

/// A rule export with its attachment clauses in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleExportStmt {
    /// The exported rule name; must be declared in the same policy.
    pub rule_name: String,
    /// Attachments computed alongside the rule's decision.
    pub attachments: Vec<AttachmentClause>,
    /// Source location.
    pub range: Range,
}

/// One `what as expr` clause of a rule export.
#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentClause {
    /// The attachment name in the output.
    pub what: String,
    /// The expression evaluated in the rule's environment.
    pub as_expr: Expr,
    /// Source location.
    pub range: Range,
}

/// A kept comment.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentStmt {
    /// The text after `--`.
    pub text: String,
    /// True when code precedes the comment on its line.
    pub trailing: bool,
    /// Source location.
    pub range: Range,
}

/// A type reference with optional constraint applications.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeRef {
    /// The base type.
    pub kind: TypeRefKind,
    /// `@name(args...)` constraints applied to values of this type.
    pub constraints: Vec<ConstraintRef>,
    /// Source location.
    pub range: Range,
}

/// The base of a type reference.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeRefKind {
    /// `string`
    String,
    /// `number` — integers and floats share one declared type.
    Number,
    /// `boolean`
    Boolean,
    /// `trinary`
    Trinary,
    /// `list<T>`
    List(Box<TypeRef>),
    /// `map<K, V>`
    Map(Box<TypeRef>, Box<TypeRef>),
    /// A named shape, resolved against the referring scope.
    Named(Fqn),
}

/// One `@name(args...)` constraint application.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintRef {
    /// The constraint name, looked up in the type's constraint table.
    pub name: String,
    /// Argument expressions; evaluated as constants.
    pub args: Vec<Expr>,
    /// Source location.
    pub range: Range,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixOp {
    /// `or`
    Or,
    /// `xor`
    Xor,
    /// `and`
    And,
    /// `==`
    Eq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `in`
    In,
    /// `contains`
    Contains,
    /// `matches`
    Matches,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
}

impl InfixOp {
    /// The operator's source text, used in error messages.
    pub fn symbol(self) -> &'static str {
        match self {
            InfixOp::Or => "or",
            InfixOp::Xor => "xor",
            InfixOp::And => "and",
            InfixOp::Eq => "==",
            InfixOp::NotEq => "!=",
            InfixOp::Lt => "<",
            InfixOp::LtEq => "<=",
            InfixOp::Gt => ">",
            InfixOp::GtEq => ">=",
            InfixOp::In => "in",
            InfixOp::Contains => "contains",
            InfixOp::Matches => "matches",
            InfixOp::Add => "+",
            InfixOp::Sub => "-",
            InfixOp::Mul => "*",
            InfixOp::Div => "/",
            InfixOp::Mod => "%",
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `not`
    Not,
    /// `-`
    Neg,
}

/// Quantifier kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantKind {
    /// `any x in xs : p` — true if any element satisfies `p`.
    Any,
    /// `all x in xs : p` — true if every element satisfies `p`.
    All,
}

/// Element-wise collection operations that bind a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectKind {
    /// `filter x in xs : p` — elements where `p` is true.
    Filter,
    /// `map x in xs : e` — transform each element.
    MapEach,
}

/// Presence tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceTest {
    /// `is defined`
    Defined,
    /// `is empty`
    Empty,
}

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Integer literal.
    Int(i64, Range),
    /// Float literal.
    Float(f64, Range),
    /// String literal (quoted or heredoc).
    Str(String, Range),
    /// `true`, `false`, or `unknown`.
    Trinary(Trinary, Range),
    /// An identifier resolved against the evaluation scope.
    Ident(String, Range),
    /// `object.field`
    FieldAccess {
        /// The accessed value.
        object: Box<Expr>,
        /// The field name.
        field: String,
        /// Source location.
        range: Range,
    },
    /// `callee(args...)`
    Call {
        /// The callable; builtins are named by identifier.
        callee: Box<Expr>,
        /// Arguments in order.
        args: Vec<Expr>,
        /// Source location.
        range: Range,
    },
    /// `object[index]`
    IndexAccess {
        /// The indexed value.
        object: Box<Expr>,
        /// The index expression.
        index: Box<Expr>,
        /// Source location.
        range: Range,
    },
    /// A binary operation.
    Infix {
        /// The operator.
        op: InfixOp,
        /// Left operand.
        left: Box<Expr>,
        /// Right operand.
        right: Box<Expr>,
        /// Source location.
        range: Range,
    },
    /// A prefix operation.
    Unary {
        /// The operator.
        op: UnaryOp,
        /// The operand.
        operand: Box<Expr>,
        /// Source location.
        range: Range,
    },
    /// `cond ? then : else`
    Ternary {
        /// The condition; `Unknown` short-circuits to `Unknown`.
        cond: Box<Expr>,
        /// Value when true.
        then: Box<Expr>,
        /// Value when false.
        otherwise: Box<Expr>,
        /// Source location.
        range: Range,
    },
    /// `{ let a = ...; expr }` — statements then a yield expression.
    Block {
        /// Let bindings in order.
        stmts: Vec<Stmt>,
        /// The yielded expression.
        yield_expr: Box<Expr>,
        /// Source location.
        range: Range,
    },
    /// `[a, b, c]`
    ListLit(Vec<Expr>, Range),
    /// `{ "key": value, ... }`
    MapLit(Vec<(String, Expr)>, Range),
    /// `from some/policy use rule_name` — re-export of another policy's
    /// rule; as a whole rule body it delegates decision, value, and
    /// attachments.
    ImportClause {
        /// The target policy FQN.
        policy: Fqn,
        /// The target rule name.
        rule: String,
        /// Source location.
        range: Range,
    },
    /// `any/all x in xs : p`
    Quantifier {
        /// Any or all.
        kind: QuantKind,
        /// The bound element name.
        var: String,
        /// The iterated collection.
        iter: Box<Expr>,
        /// The predicate.
        pred: Box<Expr>,
        /// Source location.
        range: Range,
    },
    /// `filter/map x in xs : e`
    Collect {
        /// Filter or map.
        kind: CollectKind,
        /// The bound element name.
        var: String,
        /// The iterated collection.
        iter: Box<Expr>,
        /// The per-element expression.
        body: Box<Expr>,
        /// Source location.
        range: Range,
    },
    /// `distinct xs`
    Distinct(Box<Expr>, Range),
    /// `count xs`
    Count(Box<Expr>, Range),
    /// `reduce acc, x in xs from init : e`
    Reduce {
        /// The accumulator name.
        acc: String,
        /// The bound element name.
        var: String,
        /// The iterated collection.
        iter: Box<Expr>,
        /// The initial accumulator value.
        init: Box<Expr>,
        /// The folding expression.
        body: Box<Expr>,
        /// Source location.
        range: Range,
    },
    /// `x is [not] defined` / `x is [not] empty`
    Presence {
        /// The tested value.
        subject: Box<Expr>,
        /// Defined or empty.
        test: PresenceTest,
        /// True for the `is not` forms.
        negated: bool,
        /// Source location.
        range: Range,
    },
}

impl Expr {
    /// The source range of this expression.
    pub fn range(&self) -> &Range {
        match self {
            Expr::Int(_, r)
            | Expr::Float(_, r)
            | Expr::Str(_, r)
            | Expr::Trinary(_, r)
            | Expr::Ident(_, r)
            | Expr::ListLit(_, r)
            | Expr::MapLit(_, r)
            | Expr::Distinct(_, r)
            | Expr::Count(_, r) => r,
            Expr::FieldAccess { range, .. }
            | Expr::Call { range, .. }
            | Expr::IndexAccess { range, .. }
            | Expr::Infix { range, .. }
            | Expr::Unary { range, .. }
            | Expr::Ternary { range, .. }
            | Expr::Block { range, .. }
            | Expr::ImportClause { range, .. }
            | Expr::Quantifier { range, .. }
            | Expr::Collect { range, .. }
            | Expr::Reduce { range, .. }
            | Expr::Presence { range, .. } => range,
        }
    }

    /// Collects free identifier references, skipping names bound by
    /// quantifiers, collection operations, and block lets. Used to build
    /// the intra-policy dependency graph.
    pub fn free_idents(&self, out: &mut Vec<String>) {
        self.free_idents_bound(&mut Vec::new(), out);
    }

    fn free_idents_bound(&self, bound: &mut Vec<String>, out: &mut Vec<String>) {
        match self {
            Expr::Int(..) | Expr::Float(..) | Expr::Str(..) | Expr::Trinary(..) => {}
            Expr::Ident(name, _) => {
                if !bound.iter().any(|b| b == name) {
                    out.push(name.clone());
                }
            }
            Expr::FieldAccess { object, .. } => object.free_idents_bound(bound, out),
            Expr::Call { callee, args, .. } => {
                callee.free_idents_bound(bound, out);
                for arg in args {
                    arg.free_idents_bound(bound, out);
                }
            }
            Expr::IndexAccess { object, index, .. } => {
                object.free_idents_bound(bound, out);
                index.free_idents_bound(bound, out);
            }
            Expr::Infix { left, right, .. } => {
                left.free_idents_bound(bound, out);
                right.free_idents_bound(bound, out);
            }
            Expr::Unary { operand, .. } => operand.free_idents_bound(bound, out),
            Expr::Ternary {
                cond,
                then,
                otherwise,
                ..
            } => {
                cond.free_idents_bound(bound, out);
                then.free_idents_bound(bound, out);
                otherwise.free_idents_bound(bound, out);
            }
            Expr::Block {
                stmts, yield_expr, ..
            } => {
                let depth = bound.len();
                for stmt in stmts {
                    if let Stmt::VarDecl(decl) = stmt {
                        decl.value.free_idents_bound(bound, out);
                        bound.push(decl.name.clone());
                    }
                }
                yield_expr.free_idents_bound(bound, out);
                bound.truncate(depth);
            }
            Expr::ListLit(items, _) => {
                for item in items {
                    item.free_idents_bound(bound, out);
                }
            }
            Expr::MapLit(entries, _) => {
                for (_, value) in entries {
                    value.free_idents_bound(bound, out);
                }
            }
            Expr::ImportClause { .. } => {}
            Expr::Quantifier {
                var, iter, pred, ..
            } => {
                iter.free_idents_bound(bound, out);
                bound.push(var.clone());
                pred.free_idents_bound(bound, out);
                bound.pop();
            }
            Expr::Collect {
                var, iter, body, ..
            } => {
                iter.free_idents_bound(bound, out);
                bound.push(var.clone());
                body.free_idents_bound(bound, out);
                bound.pop();
            }
            Expr::Distinct(inner, _) | Expr::Count(inner, _) => {
                inner.free_idents_bound(bound, out)
            }
            Expr::Reduce {
                acc,
                var,
                iter,
                init,
                body,
                ..
            } => {
                iter.free_idents_bound(bound, out);
                init.free_idents_bound(bound, out);
                bound.push(acc.clone());
                bound.push(var.clone());
                body.free_idents_bound(bound, out);
                bound.pop();
                bound.pop();
            }
            Expr::Presence { subject, .. } => subject.free_idents_bound(bound, out),
        }
    }
}
