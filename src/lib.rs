//! # Sentrie - a deterministic policy-decision engine
//!
//! Sentrie answers decision queries of the form "given these facts,
//! evaluate this rule" with a three-valued verdict plus named auxiliary
//! values. Policies are written in a small, statically-checked,
//! declarative language; this crate is the language toolchain:
//!
//! - [`lexer`]: character stream to typed tokens with source ranges
//! - [`parser`]: tokens to an AST for one source file
//! - [`index`]: the semantic model over many files - namespaces,
//!   policies, rules, facts, shapes, exports, and dependency graphs
//! - [`eval`]: the three-valued evaluator behind decision queries
//! - [`trinary`]: the Kleene algebra underneath it all
//!
//! ## Quick start
//!
//! ```rust
//! use sentrie::cancel::Cancellation;
//! use sentrie::eval::Executor;
//! use sentrie::index::Index;
//! use sentrie::loader::parse_program;
//! use sentrie::trinary::Trinary;
//!
//! let source = r#"
//! namespace com/example
//!
//! policy auth {
//!   fact user: string
//!   rule allow when user is defined = true
//!   export allow
//! }
//! "#;
//!
//! let ctx = Cancellation::new();
//! let mut index = Index::new();
//! index.add_program(&ctx, &parse_program(source, "auth.sn")?)?;
//! index.validate(&ctx)?;
//! index.commit(&ctx)?;
//!
//! let executor = Executor::new(&index);
//! let facts = serde_json::json!({ "user": "alice" });
//! let output = executor.exec_rule(&ctx, "com/example", "auth", "allow", facts.as_object().unwrap())?;
//! assert_eq!(output.decision, Trinary::True);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Lifecycle
//!
//! Programs are parsed independently and added to an [`index::Index`];
//! `validate` checks cross-references and rejects cycles, `commit`
//! hydrates shape composition, and from then on the index is read-only.
//! An [`eval::Executor`] shares the committed index across request
//! threads; each evaluation carries its own binding state.
//!
//! The crate never logs, never writes to standard streams, and never
//! panics on ill-typed runtime data; every failure is a typed error.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod ast;
pub mod cancel;
pub mod constraint;
pub mod dag;
pub mod error;
pub mod eval;
pub mod fqn;
pub mod index;
pub mod lexer;
pub mod loader;
pub mod parser;
pub mod pratt;
pub mod token;
pub mod trinary;

// Re-exports for convenience
pub use cancel::Cancellation;
pub use error::{EvalError, IndexError, LexError, LoadError, ParseError};
pub use eval::{Executor, ExecutorOutput, Value};
pub use fqn::Fqn;
pub use index::Index;
pub use lexer::Lexer;
pub use loader::{load_program, merge_facts, parse_program, Program};
pub use parser::Parser;
pub use token::{Pos, Range, Token, TokenKind};
pub use trinary::Trinary;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_policy() {
        let source = r#"
namespace com/example

policy auth {
  fact user: string
  rule allow when true = true
  export allow
}
"#;
        assert!(parse_program(source, "auth.sn").is_ok());
    }

    #[test]
    fn test_parse_missing_namespace() {
        let source = "policy auth { rule allow = true\nexport allow }";
        assert!(parse_program(source, "auth.sn").is_err());
    }
}
