//! Rule evaluation.
//!
//! The evaluator turns a committed [`crate::index::Index`], a rule
//! address, and a JSON-shaped fact map into an [`ExecutorOutput`]: a
//! three-valued decision, the rule's value, and its attachments. It is
//! synchronous, cancellation-aware, and never panics on ill-typed
//! runtime data.
//!
//! # Example
//!
//! ```rust
//! use sentrie::cancel::Cancellation;
//! use sentrie::eval::Executor;
//! use sentrie::index::Index;
//! use sentrie::loader::parse_program;
//! use sentrie::trinary::Trinary;
//!
//! let ctx = Cancellation::new();
//! let mut index = Index::new();
//! let program = parse_program(
//!     "namespace com/example\npolicy auth {\n  fact user: string\n  rule allow when true = true\n  export allow\n}",
//!     "auth.sn",
//! )
//! .unwrap();
//! index.add_program(&ctx, &program).unwrap();
//! index.commit(&ctx).unwrap();
//!
//! let executor = Executor::new(&index);
//! let facts = serde_json::json!({ "user": "alice" });
//! let output = executor
//!     .exec_rule(&ctx, "com/example", "auth", "allow", facts.as_object().unwrap())
//!     .unwrap();
//! assert_eq!(output.decision, Trinary::True);
//! ```

pub(crate) mod builtins;
pub(crate) mod coerce;
mod executor;
mod interpreter;
pub mod value;

pub use executor::{Executor, ExecutorOutput, FactMap};
pub use value::Value;
