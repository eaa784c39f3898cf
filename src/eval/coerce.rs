//! Fact coercion.
//!
//! Before a rule runs, every fact the policy declares is read from the
//! input map at its alias, converted from JSON into a [`Value`] against
//! the declared type reference, and checked against its constraints.
//! Shape types coerce field-by-field against the hydrated field map;
//! extra keys, missing required fields, and nulls in not-nullable fields
//! all reject the input.

use std::collections::BTreeMap;

use crate::ast::{ConstraintRef, Expr, TypeRef, TypeRefKind, UnaryOp};
use crate::constraint::{self, CheckContext, ConstraintError, RegexCache};
use crate::error::EvalError;
use crate::eval::value::Value;
use crate::index::{Index, Policy, Shape, ShapeKind};

/// Everything coercion needs to know about where it runs.
pub(crate) struct CoerceCx<'a> {
    /// The committed index, for shape resolution.
    pub index: &'a Index,
    /// The policy whose facts are being coerced.
    pub policy: &'a Policy,
    /// Shared compiled-pattern cache.
    pub regex: &'a RegexCache,
}

/// Coerces the declared facts of a policy from a raw JSON map, in
/// declaration order.
pub(crate) fn coerce_facts(
    cx: &CoerceCx<'_>,
    raw: &serde_json::Map<String, serde_json::Value>,
) -> Result<BTreeMap<String, Value>, EvalError> {
    let mut out = BTreeMap::new();
    for binding in &cx.policy.fact_order {
        let fact = cx.policy.facts.get(binding).ok_or_else(|| {
            EvalError::Internal(format!("fact '{binding}' vanished from policy"))
        })?;
        let value = match raw.get(binding) {
            Some(json) => {
                let raw_value = Value::from_json(json);
                coerce_value(cx, binding, &raw_value, &fact.type_ref)?
            }
            None => match &fact.default {
                Some(default) => {
                    let value = const_value(default, binding)?;
                    coerce_value(cx, binding, &value, &fact.type_ref)?
                }
                None => {
                    return Err(EvalError::InvalidFacts {
                        fact: binding.clone(),
                        reason: "required fact is missing".to_string(),
                    });
                }
            },
        };
        out.insert(binding.clone(), value);
    }
    Ok(out)
}

/// Coerces one value against a type reference and runs its constraints.
pub(crate) fn coerce_value(
    cx: &CoerceCx<'_>,
    path: &str,
    value: &Value,
    type_ref: &TypeRef,
) -> Result<Value, EvalError> {
    let coerced = match &type_ref.kind {
        TypeRefKind::String => match value {
            Value::Str(_) => value.clone(),
            other => return Err(bad_type(path, "string", other)),
        },
        TypeRefKind::Number => match value {
            Value::Int(_) | Value::Float(_) => value.clone(),
            other => return Err(bad_type(path, "number", other)),
        },
        TypeRefKind::Boolean => match value {
            Value::Bool(_) => value.clone(),
            other => return Err(bad_type(path, "boolean", other)),
        },
        // Trinary coercion never fails: null and foreign sentinels are
        // unknown.
        TypeRefKind::Trinary => Value::Trinary(value.to_trinary()),
        TypeRefKind::List(element) => match value {
            Value::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    out.push(coerce_value(cx, &format!("{path}[{i}]"), item, element)?);
                }
                Value::List(out)
            }
            other => return Err(bad_type(path, "list", other)),
        },
        TypeRefKind::Map(key, element) => {
            if !matches!(key.kind, TypeRefKind::String) {
                return Err(EvalError::InvalidFacts {
                    fact: path.to_string(),
                    reason: "map keys must be strings".to_string(),
                });
            }
            match value {
                Value::Map(map) => {
                    let mut out = BTreeMap::new();
                    for (k, v) in map {
                        out.insert(k.clone(), coerce_value(cx, &format!("{path}.{k}"), v, element)?);
                    }
                    Value::Map(out)
                }
                other => return Err(bad_type(path, "map", other)),
            }
        }
        TypeRefKind::Named(target) => {
            let shape = cx
                .index
                .resolve_shape_in_scope(&cx.policy.namespace, Some(&cx.policy.name), target)?;
            coerce_shape(cx, path, value, shape)?
        }
    };

    apply_constraints(cx, path, &coerced, &type_ref.constraints)?;
    Ok(coerced)
}

fn coerce_shape(
    cx: &CoerceCx<'_>,
    path: &str,
    value: &Value,
    shape: &Shape,
) -> Result<Value, EvalError> {
    match &shape.kind {
        ShapeKind::AliasOf(type_ref) => coerce_value(cx, path, value, type_ref),
        ShapeKind::Model(model) => {
            if !shape.hydrated {
                return Err(EvalError::Internal(format!(
                    "shape '{}' was not hydrated; commit the index first",
                    shape.fqn
                )));
            }
            let Value::Map(map) = value else {
                return Err(bad_type(path, "map", value));
            };

            for key in map.keys() {
                if model.field(key).is_none() {
                    return Err(EvalError::InvalidFacts {
                        fact: format!("{path}.{key}"),
                        reason: format!("shape '{}' has no field '{key}'", shape.name),
                    });
                }
            }

            let mut out = BTreeMap::new();
            for field in &model.fields {
                let field_path = format!("{path}.{}", field.name);
                match map.get(&field.name) {
                    Some(Value::Null) => {
                        if field.not_nullable {
                            return Err(EvalError::InvalidFacts {
                                fact: field_path,
                                reason: "must not be null".to_string(),
                            });
                        }
                        out.insert(field.name.clone(), Value::Null);
                    }
                    Some(v) => {
                        let coerced = coerce_value(cx, &field_path, v, &field.type_ref)?;
                        out.insert(field.name.clone(), coerced);
                    }
                    None => match &field.default {
                        Some(default) => {
                            let v = const_value(default, &field_path)?;
                            let coerced = coerce_value(cx, &field_path, &v, &field.type_ref)?;
                            out.insert(field.name.clone(), coerced);
                        }
                        None if field.required => {
                            return Err(EvalError::InvalidFacts {
                                fact: field_path,
                                reason: "required field is missing".to_string(),
                            });
                        }
                        None => {}
                    },
                }
            }
            Ok(Value::Map(out))
        }
    }
}

fn apply_constraints(
    cx: &CoerceCx<'_>,
    path: &str,
    value: &Value,
    constraints: &[ConstraintRef],
) -> Result<(), EvalError> {
    if constraints.is_empty() || matches!(value, Value::Null) {
        return Ok(());
    }
    let check_cx = CheckContext {
        policy: cx.policy.fqn.to_string(),
        regex: cx.regex,
    };
    for constraint in constraints {
        let Some(def) = lookup_for(value, &constraint.name) else {
            return Err(EvalError::InvalidFacts {
                fact: path.to_string(),
                reason: format!(
                    "unknown constraint '{}' for {}",
                    constraint.name,
                    value.type_name()
                ),
            });
        };
        let mut args = Vec::with_capacity(constraint.args.len());
        for arg in &constraint.args {
            args.push(const_value(arg, path)?);
        }
        match constraint::run(def, &check_cx, value, &args) {
            Ok(()) => {}
            Err(ConstraintError::Arity { expected, found }) => {
                return Err(EvalError::ArityMismatch {
                    callable: constraint.name.clone(),
                    expected,
                    found,
                });
            }
            Err(ConstraintError::Violated { .. }) => {
                return Err(EvalError::FactConstraintViolated {
                    fact: path.to_string(),
                    constraint: constraint.name.clone(),
                    value: value.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Picks the constraint table for a value. `number` facts carry one
/// declared type but two runtime shapes, so integer values fall back to
/// the float table and vice versa; `@min`/`@max` apply to both.
fn lookup_for(value: &Value, name: &str) -> Option<&'static constraint::ConstraintDef> {
    match value {
        Value::Str(_) => constraint::string_constraint(name),
        Value::Int(_) => {
            constraint::integer_constraint(name).or_else(|| constraint::float_constraint(name))
        }
        Value::Float(_) => {
            constraint::float_constraint(name).or_else(|| constraint::integer_constraint(name))
        }
        Value::Bool(_) | Value::Trinary(_) => constraint::trinary_constraint(name),
        Value::List(_) => constraint::list_constraint(name),
        Value::Null | Value::Map(_) => None,
    }
}

fn bad_type(path: &str, expected: &str, value: &Value) -> EvalError {
    EvalError::InvalidFacts {
        fact: path.to_string(),
        reason: format!("expected {expected}, got {}", value.type_name()),
    }
}

/// Evaluates a constant expression: defaults and constraint arguments
/// are literals, optionally negated, or list/map literals of constants.
pub(crate) fn const_value(expr: &Expr, what: &str) -> Result<Value, EvalError> {
    match expr {
        Expr::Int(n, _) => Ok(Value::Int(*n)),
        Expr::Float(f, _) => Ok(Value::Float(*f)),
        Expr::Str(s, _) => Ok(Value::Str(s.clone())),
        Expr::Trinary(t, _) => Ok(Value::Trinary(*t)),
        Expr::Unary {
            op: UnaryOp::Neg,
            operand,
            ..
        } => match const_value(operand, what)? {
            Value::Int(n) => n.checked_neg().map(Value::Int).ok_or(EvalError::Overflow {
                op: "negation",
                rule: what.to_string(),
            }),
            Value::Float(f) => Ok(Value::Float(-f)),
            other => Err(EvalError::InvalidFacts {
                fact: what.to_string(),
                reason: format!("cannot negate {}", other.type_name()),
            }),
        },
        Expr::Unary {
            op: UnaryOp::Not,
            operand,
            ..
        } => Ok(Value::Trinary(const_value(operand, what)?.to_trinary().not())),
        Expr::ListLit(items, _) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(const_value(item, what)?);
            }
            Ok(Value::List(out))
        }
        Expr::MapLit(entries, _) => {
            let mut out = BTreeMap::new();
            for (key, value) in entries {
                out.insert(key.clone(), const_value(value, what)?);
            }
            Ok(Value::Map(out))
        }
        _ => Err(EvalError::InvalidFacts {
            fact: what.to_string(),
            reason: "defaults and constraint arguments must be constant expressions".to_string(),
        }),
    }
}
