//! Evaluator tests through the full stack: parse, index, commit, run.

use pretty_assertions::assert_eq;
use serde_json::json;

use sentrie::cancel::Cancellation;
use sentrie::error::EvalError;
use sentrie::eval::{Executor, ExecutorOutput, Value};
use sentrie::index::Index;
use sentrie::loader::parse_program;
use sentrie::trinary::Trinary;

/// Builds a committed index from one source file.
fn committed(source: &str) -> Index {
    let ctx = Cancellation::new();
    let mut index = Index::new();
    let program = parse_program(source, "test.sn").expect("parse");
    index.add_program(&ctx, &program).expect("add program");
    index.validate(&ctx).expect("validate");
    index.commit(&ctx).expect("commit");
    index
}

/// Runs one rule of policy `p` in namespace `ns`.
fn run(source: &str, rule: &str, facts: serde_json::Value) -> Result<ExecutorOutput, EvalError> {
    let index = committed(source);
    let executor = Executor::new(&index);
    let ctx = Cancellation::new();
    let map = facts.as_object().cloned().unwrap_or_default();
    executor.exec_rule(&ctx, "ns", "p", rule, &map)
}

/// Wraps a rule body into a one-policy program and evaluates it with no
/// facts.
fn eval_body(body: &str) -> Result<ExecutorOutput, EvalError> {
    let source = format!("namespace ns\npolicy p {{\n rule r = {body}\n export r\n}}");
    run(&source, "r", json!({}))
}

fn value_of(body: &str) -> Value {
    eval_body(body).expect("evaluation").value
}

fn decision_of(body: &str) -> Trinary {
    eval_body(body).expect("evaluation").decision
}

// ============================================
// Literals, arithmetic, and trinary coercion
// ============================================

#[test]
fn test_literal_bodies() {
    assert_eq!(value_of("true"), Value::Trinary(Trinary::True));
    assert_eq!(value_of("42"), Value::Int(42));
    assert_eq!(value_of("2.5"), Value::Float(2.5));
    assert_eq!(value_of("\"hi\""), Value::Str("hi".into()));
}

#[test]
fn test_decision_is_trinary_coercion_of_value() {
    assert_eq!(decision_of("true"), Trinary::True);
    assert_eq!(decision_of("false"), Trinary::False);
    assert_eq!(decision_of("unknown"), Trinary::Unknown);
    assert_eq!(decision_of("1"), Trinary::True);
    assert_eq!(decision_of("0"), Trinary::False);
    assert_eq!(decision_of("42"), Trinary::Unknown);
    assert_eq!(decision_of("\"text\""), Trinary::Unknown);
}

#[test]
fn test_arithmetic() {
    assert_eq!(value_of("1 + 2 * 3"), Value::Int(7));
    assert_eq!(value_of("(1 + 2) * 3"), Value::Int(9));
    assert_eq!(value_of("7 % 3"), Value::Int(1));
    assert_eq!(value_of("10 / 4"), Value::Int(2));
    assert_eq!(value_of("10.0 / 4"), Value::Float(2.5));
    assert_eq!(value_of("-3 + 1"), Value::Int(-2));
}

#[test]
fn test_division_by_zero_yields_unknown_decision_and_null_value() {
    let output = eval_body("1 / 0").unwrap();
    assert_eq!(output.decision, Trinary::Unknown);
    assert_eq!(output.value, Value::Null);

    let output = eval_body("1 % 0").unwrap();
    assert_eq!(output.value, Value::Null);

    let output = eval_body("1.5 / 0").unwrap();
    assert_eq!(output.value, Value::Null);
}

#[test]
fn test_integer_overflow_is_an_error() {
    let err = eval_body("9223372036854775807 + 1").unwrap_err();
    assert!(matches!(err, EvalError::Overflow { op: "addition", .. }));
}

#[test]
fn test_string_and_list_concatenation() {
    assert_eq!(value_of(r#""a" + "b""#), Value::Str("ab".into()));
    assert_eq!(
        value_of("[1] + [2, 3]"),
        Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
    );
}

#[test]
fn test_type_mismatch_is_an_error_not_a_panic() {
    let err = eval_body(r#""a" * 3"#).unwrap_err();
    assert!(matches!(err, EvalError::TypeMismatch { .. }));
}

// ============================================
// Kleene logic
// ============================================

#[test]
fn test_kleene_operators() {
    assert_eq!(decision_of("true and unknown"), Trinary::Unknown);
    assert_eq!(decision_of("false and unknown"), Trinary::False);
    assert_eq!(decision_of("true or unknown"), Trinary::True);
    assert_eq!(decision_of("false or unknown"), Trinary::Unknown);
    assert_eq!(decision_of("true xor unknown"), Trinary::Unknown);
    assert_eq!(decision_of("true xor false"), Trinary::True);
    assert_eq!(decision_of("not unknown"), Trinary::Unknown);
    assert_eq!(decision_of("not false"), Trinary::True);
}

#[test]
fn test_trinary_propagation_through_facts() {
    let source = r#"
namespace ns
policy p {
  fact a: trinary
  fact b: trinary
  rule r = a and b
  export r
}
"#;
    let output = run(source, "r", json!({ "a": true, "b": null })).unwrap();
    assert_eq!(output.decision, Trinary::Unknown);

    let output = run(source, "r", json!({ "a": false, "b": null })).unwrap();
    assert_eq!(output.decision, Trinary::False);
}

#[test]
fn test_comparisons_propagate_unknown() {
    assert_eq!(decision_of("1 < 2"), Trinary::True);
    assert_eq!(decision_of("2 <= 1"), Trinary::False);
    assert_eq!(decision_of("unknown == 1"), Trinary::Unknown);
    assert_eq!(decision_of("unknown != unknown"), Trinary::Unknown);
    assert_eq!(decision_of(r#""a" < "b""#), Trinary::True);
    assert_eq!(decision_of("1 == 1.0"), Trinary::True);
}

#[test]
fn test_ternary() {
    assert_eq!(value_of("true ? 1 : 2"), Value::Int(1));
    assert_eq!(value_of("false ? 1 : 2"), Value::Int(2));
    assert_eq!(
        value_of("unknown ? 1 : 2"),
        Value::Trinary(Trinary::Unknown)
    );
}

// ============================================
// Guards and defaults
// ============================================

#[test]
fn test_false_guard_takes_default() {
    let source = r#"
namespace ns
policy p {
  fact ok: trinary
  rule r default false when ok = 42
  export r
}
"#;
    let output = run(source, "r", json!({ "ok": false })).unwrap();
    assert_eq!(output.decision, Trinary::False);
    assert_eq!(output.value, Value::Trinary(Trinary::False));
}

#[test]
fn test_false_guard_without_default_is_unknown() {
    let source = r#"
namespace ns
policy p {
  fact ok: trinary
  rule r when ok = 42
  export r
}
"#;
    let output = run(source, "r", json!({ "ok": false })).unwrap();
    assert_eq!(output.decision, Trinary::Unknown);
    assert_eq!(output.value, Value::Null);
}

#[test]
fn test_unknown_guard_is_unknown() {
    let source = r#"
namespace ns
policy p {
  fact ok: trinary
  rule r default false when ok = 42
  export r
}
"#;
    let output = run(source, "r", json!({ "ok": null })).unwrap();
    assert_eq!(output.decision, Trinary::Unknown);
}

#[test]
fn test_true_guard_runs_body() {
    let source = r#"
namespace ns
policy p {
  fact ok: trinary
  rule r default false when ok = 42
  export r
}
"#;
    let output = run(source, "r", json!({ "ok": true })).unwrap();
    assert_eq!(output.value, Value::Int(42));
    assert_eq!(output.decision, Trinary::Unknown);
}

// ============================================
// Collections
// ============================================

#[test]
fn test_quantifiers() {
    assert_eq!(decision_of("any x in [1, 2, 3] : x > 2"), Trinary::True);
    assert_eq!(decision_of("any x in [1, 2, 3] : x > 5"), Trinary::False);
    assert_eq!(decision_of("any x in [] : x > 5"), Trinary::False);
    assert_eq!(
        decision_of("any x in [1, unknown] : x == 2"),
        Trinary::Unknown
    );
    assert_eq!(decision_of("all x in [1, 2, 3] : x > 0"), Trinary::True);
    assert_eq!(decision_of("all x in [1, 2, 3] : x > 1"), Trinary::False);
    assert_eq!(decision_of("all x in [] : x > 5"), Trinary::True);
    assert_eq!(
        decision_of("all x in [1, unknown] : x == 1"),
        Trinary::Unknown
    );
}

#[test]
fn test_filter_map_reduce() {
    assert_eq!(
        value_of("filter x in [1, 2, 3, 4] : x % 2 == 0"),
        Value::List(vec![Value::Int(2), Value::Int(4)])
    );
    assert_eq!(
        value_of("map x in [1, 2, 3] : x * 10"),
        Value::List(vec![Value::Int(10), Value::Int(20), Value::Int(30)])
    );
    assert_eq!(value_of("reduce acc, x in [1, 2, 3] from 0 : acc + x"), Value::Int(6));
}

#[test]
fn test_distinct_and_count() {
    assert_eq!(
        value_of("distinct [1, 2, 1, 3, 2]"),
        Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
    );
    assert_eq!(value_of("count [1, 2, 3]"), Value::Int(3));
    assert_eq!(value_of(r#"count "héllo""#), Value::Int(5));
    assert_eq!(value_of(r#"count { "a": 1 }"#), Value::Int(1));
}

#[test]
fn test_membership_operators() {
    assert_eq!(decision_of("2 in [1, 2, 3]"), Trinary::True);
    assert_eq!(decision_of("5 in [1, 2, 3]"), Trinary::False);
    assert_eq!(decision_of(r#""ell" in "hello""#), Trinary::True);
    assert_eq!(decision_of(r#"[1, 2] contains 2"#), Trinary::True);
    assert_eq!(decision_of(r#""a" in { "a": 1 }"#), Trinary::True);
    assert_eq!(decision_of("unknown in [1]"), Trinary::Unknown);
}

#[test]
fn test_matches() {
    assert_eq!(decision_of(r#""abc123" matches "^[a-z]+[0-9]+$""#), Trinary::True);
    assert_eq!(decision_of(r#""abc" matches "^[0-9]+$""#), Trinary::False);
    let err = eval_body(r#""abc" matches "((("#).unwrap_err();
    assert!(matches!(err, EvalError::TypeMismatch { .. }));
}

// ============================================
// Field and index access
// ============================================

#[test]
fn test_missing_field_is_unknown_not_error() {
    let source = r#"
namespace ns
shape User { name: string
  age?: number }
policy p {
  fact user: User
  rule r = user.age
  export r
}
"#;
    let output = run(source, "r", json!({ "user": { "name": "alice" } })).unwrap();
    assert_eq!(output.decision, Trinary::Unknown);
    assert_eq!(output.value, Value::Trinary(Trinary::Unknown));
}

#[test]
fn test_field_access_on_non_record_is_error() {
    let err = eval_body("42.field").unwrap_err();
    assert!(matches!(err, EvalError::TypeMismatch { .. }));
}

#[test]
fn test_index_access() {
    assert_eq!(value_of("[10, 20, 30][1]"), Value::Int(20));
    assert_eq!(
        value_of("[10][5]"),
        Value::Trinary(Trinary::Unknown)
    );
    assert_eq!(value_of(r#"{ "k": 7 }["k"]"#), Value::Int(7));
    assert_eq!(value_of(r#""abc"[0]"#), Value::Str("a".into()));
}

// ============================================
// Presence tests and blocks
// ============================================

#[test]
fn test_is_defined() {
    let source = r#"
namespace ns
policy p {
  fact flag: trinary
  rule r = flag is defined
  rule s = flag is not defined
  export r
  export s
}
"#;
    let output = run(source, "r", json!({ "flag": true })).unwrap();
    assert_eq!(output.decision, Trinary::True);
    let output = run(source, "r", json!({ "flag": null })).unwrap();
    assert_eq!(output.decision, Trinary::False);
    let output = run(source, "s", json!({ "flag": null })).unwrap();
    assert_eq!(output.decision, Trinary::True);
}

#[test]
fn test_is_empty() {
    assert_eq!(decision_of(r#""" is empty"#), Trinary::True);
    assert_eq!(decision_of("[1] is empty"), Trinary::False);
    assert_eq!(decision_of("[] is not empty"), Trinary::False);
    assert_eq!(decision_of(r#"{} is empty"#), Trinary::True);
}

#[test]
fn test_block_expression() {
    assert_eq!(
        value_of("{ let a = 2; let b = a * 3; a + b }"),
        Value::Int(8)
    );
}

// ============================================
// Lets, rules, and recursion defense
// ============================================

#[test]
fn test_let_bindings_and_rule_references() {
    let source = r#"
namespace ns
policy p {
  fact base: number
  let doubled = base * 2
  rule over_ten = doubled > 10
  rule verdict = over_ten and doubled < 100
  export verdict
}
"#;
    let output = run(source, "verdict", json!({ "base": 6 })).unwrap();
    assert_eq!(output.decision, Trinary::True);
    let output = run(source, "verdict", json!({ "base": 2 })).unwrap();
    assert_eq!(output.decision, Trinary::False);
}

#[test]
fn test_let_memoization_is_consistent() {
    // The let is referenced three times; memoization must hand back the
    // same value each time, so the comparison chain holds.
    let source = r#"
namespace ns
policy p {
  fact base: number
  let x = base * 3
  rule r = x == x and x == x
  export r
}
"#;
    let output = run(source, "r", json!({ "base": 7 })).unwrap();
    assert_eq!(output.decision, Trinary::True);
}

#[test]
fn test_undefined_identifier() {
    let err = eval_body("nonexistent + 1").unwrap_err();
    let EvalError::UndefinedIdentifier { name, .. } = err else {
        panic!("expected undefined identifier");
    };
    assert_eq!(name, "nonexistent");
}

// ============================================
// Builtins
// ============================================

#[test]
fn test_builtin_calls() {
    assert_eq!(value_of("len([1, 2])"), Value::Int(2));
    assert_eq!(value_of(r#"upper("ab")"#), Value::Str("AB".into()));
    assert_eq!(value_of(r#"typeof(1)"#), Value::Str("integer".into()));
    assert_eq!(
        value_of(r#"join(split("a,b", ","), "-")"#),
        Value::Str("a-b".into())
    );
    assert_eq!(value_of("min(3, 1 + 1)"), Value::Int(2));
}

#[test]
fn test_builtin_arity_mismatch() {
    let err = eval_body("len(1, 2)").unwrap_err();
    assert!(matches!(
        err,
        EvalError::ArityMismatch {
            expected: 1,
            found: 2,
            ..
        }
    ));
}

#[test]
fn test_local_binding_shadows_builtin() {
    let source = r#"
namespace ns
policy p {
  let len = 3
  rule r = len(1)
  export r
}
"#;
    let err = run(source, "r", json!({})).unwrap_err();
    assert!(matches!(err, EvalError::TypeMismatch { .. }));
}

// ============================================
// Attachments
// ============================================

#[test]
fn test_attachments_see_the_rule_value() {
    let source = r#"
namespace ns
policy p {
  fact score: number
  rule pass = score >= 60
  export pass {
    reason as pass ? "passed" : "failed",
    margin as score - 60,
  }
}
"#;
    let output = run(source, "pass", json!({ "score": 72 })).unwrap();
    assert_eq!(output.decision, Trinary::True);
    assert_eq!(
        output.attachments["reason"],
        Value::Str("passed".into())
    );
    assert_eq!(output.attachments["margin"], Value::Int(12));
}

#[test]
fn test_attachment_failure_is_fatal() {
    let source = r#"
namespace ns
policy p {
  rule r = true
  export r { broken as missing_name }
}
"#;
    let err = run(source, "r", json!({})).unwrap_err();
    assert!(matches!(err, EvalError::UndefinedIdentifier { .. }));
}

// ============================================
// Cross-policy access
// ============================================

#[test]
fn test_use_alias_reads_exported_rule() {
    let source = r#"
namespace ns
policy scores {
  fact score: number
  rule high = score > 80
  export high
}
policy p {
  fact score: number
  use scores
  rule r = scores.high
  export r
}
"#;
    let output = run(source, "r", json!({ "score": 90 })).unwrap();
    assert_eq!(output.decision, Trinary::True);
}

#[test]
fn test_rule_not_exported_for_direct_query() {
    let source = r#"
namespace ns
policy p {
  rule hidden = true
  rule shown = true
  export shown
}
"#;
    let err = run(source, "hidden", json!({})).unwrap_err();
    assert!(matches!(err, EvalError::RuleNotExported { .. }));
}

#[test]
fn test_rule_not_found() {
    let err = run(
        "namespace ns\npolicy p { rule r = true\nexport r }",
        "ghost",
        json!({}),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        EvalError::Index(sentrie::error::IndexError::RuleNotFound { .. })
    ));
}

// ============================================
// Determinism and cancellation
// ============================================

#[test]
fn test_same_facts_same_output() {
    let source = r#"
namespace ns
policy p {
  fact items: list<number>
  rule r = reduce acc, x in items from 0 : acc + x
  export r {
    total as r,
  }
}
"#;
    let facts = json!({ "items": [3, 1, 4, 1, 5] });
    let a = run(source, "r", facts.clone()).unwrap();
    let b = run(source, "r", facts).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_cancelled_evaluation() {
    let index = committed("namespace ns\npolicy p { rule r = 1 + 2\nexport r }");
    let executor = Executor::new(&index);
    let ctx = Cancellation::new();
    ctx.cancel();
    let err = executor
        .exec_rule(&ctx, "ns", "p", "r", &serde_json::Map::new())
        .unwrap_err();
    assert!(matches!(err, EvalError::Cancelled(_)));
}

#[test]
fn test_executor_requires_committed_index() {
    let ctx = Cancellation::new();
    let mut index = Index::new();
    let program = parse_program(
        "namespace ns\npolicy p { rule r = true\nexport r }",
        "test.sn",
    )
    .unwrap();
    index.add_program(&ctx, &program).unwrap();
    // No commit.
    let executor = Executor::new(&index);
    let err = executor
        .exec_rule(&ctx, "ns", "p", "r", &serde_json::Map::new())
        .unwrap_err();
    assert!(matches!(err, EvalError::Internal(_)));
}
