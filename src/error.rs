//! Error types for the Sentrie toolchain.
//!
//! Each phase has its own error enum: [`LexError`] for tokenization,
//! [`ParseError`] for syntax, [`IndexError`] for semantic model
//! construction and validation, and [`EvalError`] for rule execution.
//! Compile-time errors carry a source [`Range`]; evaluation errors carry
//! the rule FQN or constraint name where that is meaningful.
//!
//! The core never logs and never terminates the process; every failure is
//! a value propagated to the caller.

use crate::cancel::Cancelled;
use crate::token::Range;
use thiserror::Error;

/// Errors produced during lexical analysis.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexError {
    /// A character outside the language's alphabet.
    #[error("unexpected character '{ch}' at {range}")]
    UnexpectedChar {
        /// The offending character.
        ch: char,
        /// Where it was read.
        range: Range,
    },

    /// A string literal without a closing quote.
    #[error("unterminated string literal starting at {range}")]
    UnterminatedString {
        /// Location of the opening quote.
        range: Range,
    },

    /// A heredoc whose terminator tag never appears on its own line.
    #[error("unterminated heredoc '{tag}' starting at {range}")]
    UnterminatedHeredoc {
        /// The heredoc tag.
        tag: String,
        /// Location of the `<<<` introducer.
        range: Range,
    },

    /// A heredoc introducer without a tag identifier.
    #[error("heredoc introducer without a tag at {range}")]
    MissingHeredocTag {
        /// Location of the `<<<` introducer.
        range: Range,
    },
}

impl LexError {
    /// The source range where the error occurred.
    pub fn range(&self) -> &Range {
        match self {
            LexError::UnexpectedChar { range, .. } => range,
            LexError::UnterminatedString { range } => range,
            LexError::UnterminatedHeredoc { range, .. } => range,
            LexError::MissingHeredocTag { range } => range,
        }
    }
}

/// Errors produced during parsing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// The token stream did not match the grammar.
    #[error("expected {expected}, found {found} at {range}")]
    UnexpectedToken {
        /// Description of what was expected.
        expected: String,
        /// Description of what was found.
        found: String,
        /// Location of the unexpected token.
        range: Range,
    },

    /// The input ended in the middle of a construct.
    #[error("unexpected end of file at {range}: {context}")]
    UnexpectedEof {
        /// What was being parsed.
        context: String,
        /// Position at end of file.
        range: Range,
    },

    /// A numeric literal that does not fit its type.
    #[error("invalid numeric literal '{text}' at {range}")]
    InvalidLiteral {
        /// The literal text.
        text: String,
        /// Where it appears.
        range: Range,
    },

    /// A program whose first non-comment statement is not `namespace`.
    #[error("a program must begin with a namespace statement, found {found} at {range}")]
    MissingNamespace {
        /// Description of what was found instead.
        found: String,
        /// Location of the first statement.
        range: Range,
    },

    /// A lexer error surfaced through the parser.
    #[error(transparent)]
    Lex(#[from] LexError),
}

impl ParseError {
    /// The source range where the error occurred.
    pub fn range(&self) -> &Range {
        match self {
            ParseError::UnexpectedToken { range, .. } => range,
            ParseError::UnexpectedEof { range, .. } => range,
            ParseError::InvalidLiteral { range, .. } => range,
            ParseError::MissingNamespace { range, .. } => range,
            ParseError::Lex(err) => err.range(),
        }
    }
}

/// Errors produced while building, validating, or querying the index.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndexError {
    /// A name is already taken within its scope.
    #[error("name conflict: {kind} '{name}' already declared as {existing} in {scope} at {range}")]
    Conflict {
        /// What is being declared.
        kind: &'static str,
        /// The conflicting name.
        name: String,
        /// What the name already refers to.
        existing: &'static str,
        /// The scope (namespace or policy FQN).
        scope: String,
        /// Location of the duplicate declaration.
        range: Range,
    },

    /// A policy body statement out of the mandated order.
    #[error("{message} at {range}")]
    StatementOrder {
        /// What was out of order.
        message: String,
        /// Location of the misplaced statement.
        range: Range,
    },

    /// A policy with no exported rule.
    #[error("policy '{policy}' must export at least one rule")]
    NoExportedRules {
        /// The policy FQN.
        policy: String,
    },

    /// A rule export naming a rule the policy does not declare.
    #[error("export of unknown rule '{rule}' in policy '{policy}' at {range}")]
    UnknownRuleExport {
        /// The exported name.
        rule: String,
        /// The policy FQN.
        policy: String,
        /// Location of the export statement.
        range: Range,
    },

    /// A reference that does not resolve.
    #[error("unresolved {kind} '{name}' referenced from '{scope}'")]
    MissingReference {
        /// What kind of entity was referenced.
        kind: &'static str,
        /// The referenced name.
        name: String,
        /// The referring scope.
        scope: String,
    },

    /// A cross-namespace reference to an entity that is not exported.
    #[error("{kind} '{name}' is not exported by '{scope}'")]
    NotExported {
        /// What kind of entity was referenced.
        kind: &'static str,
        /// The referenced name.
        name: String,
        /// The owning namespace or policy.
        scope: String,
    },

    /// A cycle in a dependency graph.
    #[error("dependency cycle: {}", path.join(" -> "))]
    Cycle {
        /// The node keys on the cycle, in traversal order.
        path: Vec<String>,
    },

    /// No namespace matches the given path.
    #[error("namespace not found for '{path}'")]
    NamespaceNotFound {
        /// The path as given.
        path: String,
    },

    /// The namespace exists but the policy does not.
    #[error("policy not found for '{path}'")]
    PolicyNotFound {
        /// The path as given.
        path: String,
    },

    /// The policy exists but the rule does not.
    #[error("rule '{rule}' not found in policy '{policy}'")]
    RuleNotFound {
        /// The rule name.
        rule: String,
        /// The policy FQN.
        policy: String,
    },

    /// The shape does not exist in the namespace.
    #[error("shape '{name}' not found in '{namespace}'")]
    ShapeNotFound {
        /// The shape name.
        name: String,
        /// The namespace FQN.
        namespace: String,
    },

    /// Shape composition against a simple alias.
    #[error("shape '{shape}' composes alias '{parent}'; only complex shapes can be composed")]
    AliasComposition {
        /// The composing shape FQN.
        shape: String,
        /// The alias FQN.
        parent: String,
    },

    /// Hydration found the same field in parent and child.
    #[error("shape '{shape}' inherits duplicate field '{field}' from '{parent}'")]
    DuplicateField {
        /// The composing shape FQN.
        shape: String,
        /// The duplicated field name.
        field: String,
        /// The parent shape FQN.
        parent: String,
    },

    /// `add_program` after validation has run.
    #[error("index is sealed: programs cannot be added after validation")]
    Sealed,

    /// The operation was cancelled through its token.
    #[error(transparent)]
    Cancelled(#[from] Cancelled),

    /// An internal invariant was broken; indicates a bug.
    #[error("internal index error: {0}")]
    Internal(String),
}

/// Errors produced by the evaluator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    /// Decision query against a rule the policy does not export.
    #[error("rule '{rule}' is not exported by policy '{policy}'")]
    RuleNotExported {
        /// The rule name.
        rule: String,
        /// The policy FQN.
        policy: String,
    },

    /// A fact is missing or its value cannot be coerced to its type.
    #[error("invalid facts for '{fact}': {reason}")]
    InvalidFacts {
        /// The fact alias.
        fact: String,
        /// What went wrong.
        reason: String,
    },

    /// A fact value failed a declared constraint.
    #[error("fact '{fact}' violates constraint '{constraint}': {value}")]
    FactConstraintViolated {
        /// The fact alias (or shape field path).
        fact: String,
        /// The constraint name.
        constraint: String,
        /// Display form of the offending value.
        value: String,
    },

    /// An operation applied to a value of the wrong type.
    #[error("type mismatch in '{rule}': expected {expected}, found {found}")]
    TypeMismatch {
        /// What the operation required.
        expected: String,
        /// What it got.
        found: String,
        /// The rule FQN being evaluated.
        rule: String,
    },

    /// An identifier that resolves to nothing in scope.
    #[error("undefined identifier '{name}' in '{rule}'")]
    UndefinedIdentifier {
        /// The identifier.
        name: String,
        /// The rule FQN being evaluated.
        rule: String,
    },

    /// Evaluation depth exceeded; validation should have rejected the pack.
    #[error("infinite recursion evaluating '{rule}'")]
    InfiniteRecursion {
        /// The rule FQN at the point of detection.
        rule: String,
    },

    /// A callable invoked with the wrong number of arguments.
    #[error("'{callable}' expects {expected} argument(s), found {found}")]
    ArityMismatch {
        /// The callable name.
        callable: String,
        /// The declared arity.
        expected: usize,
        /// The number of arguments supplied.
        found: usize,
    },

    /// Integer arithmetic overflowed. Sentrie uses checked 64-bit integers
    /// and never wraps silently.
    #[error("integer overflow in '{rule}' during {op}")]
    Overflow {
        /// The operation that overflowed.
        op: &'static str,
        /// The rule FQN being evaluated.
        rule: String,
    },

    /// A resolution failure surfaced through the evaluator.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// The evaluation was cancelled through its token.
    #[error(transparent)]
    Cancelled(#[from] Cancelled),

    /// An internal invariant was broken; indicates a bug.
    #[error("internal evaluator error: {0}")]
    Internal(String),
}

/// Errors produced by the filesystem-facing program loader.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The file could not be read.
    #[error("cannot read program: {0}")]
    Io(#[from] std::io::Error),

    /// The file content failed to parse.
    #[error(transparent)]
    Parse(#[from] ParseError),
}
