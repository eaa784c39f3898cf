//! Built-in functions.
//!
//! A small standard library callable from policy expressions. Builtins
//! are resolved by identifier at the call site; a local binding with the
//! same name shadows the builtin. Any unknownish argument makes the call
//! yield `unknown` rather than an error, with the exception of `typeof`
//! and `to_string`, which describe their argument as-is.

use crate::error::EvalError;
use crate::eval::value::Value;
use crate::trinary::Trinary;

/// True when the name refers to a builtin.
pub(crate) fn is_builtin(name: &str) -> bool {
    arity(name).is_some()
}

fn arity(name: &str) -> Option<usize> {
    Some(match name {
        "len" | "typeof" | "keys" | "values" | "upper" | "lower" | "trim" | "abs" | "floor"
        | "ceil" | "round" | "to_string" | "to_number" => 1,
        "starts_with" | "ends_with" | "split" | "join" | "min" | "max" => 2,
        _ => return None,
    })
}

/// Calls a builtin by name. The caller has already resolved shadowing.
pub(crate) fn call(name: &str, args: &[Value], rule_fqn: &str) -> Result<Value, EvalError> {
    let Some(expected) = arity(name) else {
        return Err(EvalError::UndefinedIdentifier {
            name: name.to_string(),
            rule: rule_fqn.to_string(),
        });
    };
    if args.len() != expected {
        return Err(EvalError::ArityMismatch {
            callable: name.to_string(),
            expected,
            found: args.len(),
        });
    }

    // Unknown propagates through everything that inspects its argument.
    if !matches!(name, "typeof" | "to_string") && args.iter().any(Value::is_unknownish) {
        return Ok(Value::Trinary(Trinary::Unknown));
    }

    let mismatch = |expected: &str, found: &Value| EvalError::TypeMismatch {
        expected: expected.to_string(),
        found: found.type_name().to_string(),
        rule: rule_fqn.to_string(),
    };

    match (name, args) {
        ("len", [v]) => match v {
            Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
            Value::List(items) => Ok(Value::Int(items.len() as i64)),
            Value::Map(map) => Ok(Value::Int(map.len() as i64)),
            other => Err(mismatch("a string, list, or map", other)),
        },
        ("typeof", [v]) => Ok(Value::Str(v.type_name().to_string())),
        ("keys", [Value::Map(map)]) => Ok(Value::List(
            map.keys().cloned().map(Value::Str).collect(),
        )),
        ("keys", [other]) => Err(mismatch("a map", other)),
        ("values", [Value::Map(map)]) => Ok(Value::List(map.values().cloned().collect())),
        ("values", [other]) => Err(mismatch("a map", other)),
        ("upper", [Value::Str(s)]) => Ok(Value::Str(s.to_uppercase())),
        ("lower", [Value::Str(s)]) => Ok(Value::Str(s.to_lowercase())),
        ("trim", [Value::Str(s)]) => Ok(Value::Str(s.trim().to_string())),
        ("upper" | "lower" | "trim", [other]) => Err(mismatch("a string", other)),
        ("abs", [Value::Int(n)]) => match n.checked_abs() {
            Some(v) => Ok(Value::Int(v)),
            None => Err(EvalError::Overflow {
                op: "abs",
                rule: rule_fqn.to_string(),
            }),
        },
        ("abs", [Value::Float(f)]) => Ok(Value::Float(f.abs())),
        ("floor", [Value::Float(f)]) => Ok(Value::Int(f.floor() as i64)),
        ("ceil", [Value::Float(f)]) => Ok(Value::Int(f.ceil() as i64)),
        ("round", [Value::Float(f)]) => Ok(Value::Int(f.round() as i64)),
        ("floor" | "ceil" | "round", [Value::Int(n)]) => Ok(Value::Int(*n)),
        ("abs" | "floor" | "ceil" | "round", [other]) => Err(mismatch("a number", other)),
        ("to_string", [v]) => Ok(Value::Str(match v {
            Value::Str(s) => s.clone(),
            other => other.to_string(),
        })),
        ("to_number", [Value::Int(n)]) => Ok(Value::Int(*n)),
        ("to_number", [Value::Float(f)]) => Ok(Value::Float(*f)),
        ("to_number", [Value::Str(s)]) => {
            if let Ok(n) = s.trim().parse::<i64>() {
                Ok(Value::Int(n))
            } else if let Ok(f) = s.trim().parse::<f64>() {
                Ok(Value::Float(f))
            } else {
                Ok(Value::Null)
            }
        }
        ("to_number", [other]) => Err(mismatch("a number or numeric string", other)),
        ("starts_with", [Value::Str(s), Value::Str(prefix)]) => {
            Ok(Value::Trinary(Trinary::from(s.starts_with(prefix.as_str()))))
        }
        ("ends_with", [Value::Str(s), Value::Str(suffix)]) => {
            Ok(Value::Trinary(Trinary::from(s.ends_with(suffix.as_str()))))
        }
        ("starts_with" | "ends_with", [_, _]) => Err(EvalError::TypeMismatch {
            expected: "two strings".to_string(),
            found: "other".to_string(),
            rule: rule_fqn.to_string(),
        }),
        ("split", [Value::Str(s), Value::Str(sep)]) => Ok(Value::List(
            s.split(sep.as_str())
                .map(|part| Value::Str(part.to_string()))
                .collect(),
        )),
        ("split", [_, _]) => Err(EvalError::TypeMismatch {
            expected: "two strings".to_string(),
            found: "other".to_string(),
            rule: rule_fqn.to_string(),
        }),
        ("join", [Value::List(items), Value::Str(sep)]) => {
            let mut parts = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::Str(s) => parts.push(s.clone()),
                    other => parts.push(other.to_string()),
                }
            }
            Ok(Value::Str(parts.join(sep.as_str())))
        }
        ("join", [_, _]) => Err(EvalError::TypeMismatch {
            expected: "a list and a string".to_string(),
            found: "other".to_string(),
            rule: rule_fqn.to_string(),
        }),
        ("min", [a, b]) => numeric_pick(a, b, true, rule_fqn),
        ("max", [a, b]) => numeric_pick(a, b, false, rule_fqn),
        _ => Err(EvalError::Internal(format!("builtin '{name}' dispatch"))),
    }
}

fn numeric_pick(a: &Value, b: &Value, smaller: bool, rule_fqn: &str) -> Result<Value, EvalError> {
    let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) else {
        return Err(EvalError::TypeMismatch {
            expected: "two numbers".to_string(),
            found: format!("{} and {}", a.type_name(), b.type_name()),
            rule: rule_fqn.to_string(),
        });
    };
    let first = if smaller { x <= y } else { x >= y };
    Ok(if first { a.clone() } else { b.clone() })
}
