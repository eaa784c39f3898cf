//! Typed constraint validators.
//!
//! Facts and shape fields may carry `@constraint(args...)` applications;
//! each primitive type has its own table mapping constraint name to a
//! checker. Checkers run during fact coercion, and the first failure
//! aborts the evaluation with the constraint name and offending value.
//!
//! Arity `-1` marks varargs constraints, which require at least one
//! argument. Numeric checkers compare through `f64` so integer arguments
//! apply to float facts and vice versa.

use std::collections::HashMap;
use std::sync::Mutex;

use regex::Regex;

use crate::eval::value::Value;
use crate::trinary::Trinary;

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";
const URL_PATTERN: &str = r"^[a-zA-Z][a-zA-Z0-9+.-]*://\S+$";
const UUID_PATTERN: &str =
    r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$";

/// Tolerance for `multiple_of` on floats.
const MULTIPLE_OF_EPSILON: f64 = 1e-10;

/// A cache of compiled regex patterns, shared across one executor.
///
/// Bounded: once the cache holds 256 patterns it is dropped wholesale
/// before inserting the next one, which keeps pathological packs from
/// growing it without bound.
#[derive(Debug, Default)]
pub struct RegexCache {
    inner: Mutex<HashMap<String, Regex>>,
}

const REGEX_CACHE_CAP: usize = 256;

impl RegexCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles or retrieves a pattern.
    pub fn get(&self, pattern: &str) -> Result<Regex, regex::Error> {
        let mut map = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(re) = map.get(pattern) {
            return Ok(re.clone());
        }
        let re = Regex::new(pattern)?;
        if map.len() >= REGEX_CACHE_CAP {
            map.clear();
        }
        map.insert(pattern.to_string(), re.clone());
        Ok(re)
    }
}

/// Context handed to every checker.
pub struct CheckContext<'a> {
    /// FQN of the policy whose fact is being checked.
    pub policy: String,
    /// Shared compiled-pattern cache.
    pub regex: &'a RegexCache,
}

/// Why a constraint application failed.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintError {
    /// Wrong number of arguments in the `@constraint(...)` application.
    Arity {
        /// Declared arity (minimum for varargs).
        expected: usize,
        /// Arguments supplied.
        found: usize,
    },
    /// The value failed the check.
    Violated {
        /// Human-readable reason.
        message: String,
    },
}

fn violated(message: impl Into<String>) -> ConstraintError {
    ConstraintError::Violated {
        message: message.into(),
    }
}

/// Signature of a constraint checker.
pub type CheckFn = fn(&CheckContext, &Value, &[Value]) -> Result<(), ConstraintError>;

/// One entry of a constraint table.
pub struct ConstraintDef {
    /// The constraint name as written after `@`.
    pub name: &'static str,
    /// Argument count; `-1` means varargs with a minimum of one.
    pub arity: i8,
    /// The checker.
    pub check: CheckFn,
}

/// Runs a constraint, enforcing its arity first.
pub fn run(
    def: &ConstraintDef,
    cx: &CheckContext,
    value: &Value,
    args: &[Value],
) -> Result<(), ConstraintError> {
    if def.arity < 0 {
        if args.is_empty() {
            return Err(ConstraintError::Arity {
                expected: 1,
                found: 0,
            });
        }
    } else if args.len() != def.arity as usize {
        return Err(ConstraintError::Arity {
            expected: def.arity as usize,
            found: args.len(),
        });
    }
    (def.check)(cx, value, args)
}

fn find(table: &'static [ConstraintDef], name: &str) -> Option<&'static ConstraintDef> {
    table.iter().find(|def| def.name == name)
}

/// Looks up a string constraint.
pub fn string_constraint(name: &str) -> Option<&'static ConstraintDef> {
    find(STRING_TABLE, name)
}

/// Looks up an integer constraint.
pub fn integer_constraint(name: &str) -> Option<&'static ConstraintDef> {
    find(INTEGER_TABLE, name)
}

/// Looks up a float constraint.
pub fn float_constraint(name: &str) -> Option<&'static ConstraintDef> {
    find(FLOAT_TABLE, name)
}

/// Looks up a trinary/boolean constraint.
pub fn trinary_constraint(name: &str) -> Option<&'static ConstraintDef> {
    find(TRINARY_TABLE, name)
}

/// Looks up a list constraint.
pub fn list_constraint(name: &str) -> Option<&'static ConstraintDef> {
    find(LIST_TABLE, name)
}

// === Argument helpers ===

fn arg_str(args: &[Value], i: usize) -> Result<&str, ConstraintError> {
    match args.get(i) {
        Some(Value::Str(s)) => Ok(s),
        Some(other) => Err(violated(format!(
            "argument {} must be a string, got {}",
            i + 1,
            other.type_name()
        ))),
        None => Err(violated(format!("argument {} is missing", i + 1))),
    }
}

fn arg_f64(args: &[Value], i: usize) -> Result<f64, ConstraintError> {
    match args.get(i).and_then(Value::as_f64) {
        Some(f) => Ok(f),
        None => Err(violated(format!("argument {} must be a number", i + 1))),
    }
}

fn arg_i64(args: &[Value], i: usize) -> Result<i64, ConstraintError> {
    match args.get(i) {
        Some(Value::Int(n)) => Ok(*n),
        _ => Err(violated(format!("argument {} must be an integer", i + 1))),
    }
}

fn str_value(value: &Value) -> Result<&str, ConstraintError> {
    match value {
        Value::Str(s) => Ok(s),
        other => Err(violated(format!("expected a string, got {}", other.type_name()))),
    }
}

fn int_value(value: &Value) -> Result<i64, ConstraintError> {
    match value {
        Value::Int(n) => Ok(*n),
        other => Err(violated(format!(
            "expected an integer, got {}",
            other.type_name()
        ))),
    }
}

fn float_value(value: &Value) -> Result<f64, ConstraintError> {
    match value.as_f64() {
        Some(f) => Ok(f),
        None => Err(violated(format!(
            "expected a number, got {}",
            value.type_name()
        ))),
    }
}

fn trinary_value(value: &Value) -> Result<Trinary, ConstraintError> {
    match value {
        Value::Trinary(t) => Ok(*t),
        Value::Bool(b) => Ok(Trinary::from(*b)),
        other => Err(violated(format!(
            "expected a trinary, got {}",
            other.type_name()
        ))),
    }
}

// === String checkers ===

static STRING_TABLE: &[ConstraintDef] = &[
    ConstraintDef { name: "length", arity: 1, check: str_length },
    ConstraintDef { name: "minlength", arity: 1, check: str_minlength },
    ConstraintDef { name: "maxlength", arity: 1, check: str_maxlength },
    ConstraintDef { name: "regexp", arity: 1, check: str_regexp },
    ConstraintDef { name: "starts_with", arity: 1, check: str_starts_with },
    ConstraintDef { name: "ends_with", arity: 1, check: str_ends_with },
    ConstraintDef { name: "has_substring", arity: 1, check: str_has_substring },
    ConstraintDef { name: "not_has_substring", arity: 1, check: str_not_has_substring },
    ConstraintDef { name: "email", arity: 0, check: str_email },
    ConstraintDef { name: "url", arity: 0, check: str_url },
    ConstraintDef { name: "uuid", arity: 0, check: str_uuid },
    ConstraintDef { name: "alphanumeric", arity: 0, check: str_alphanumeric },
    ConstraintDef { name: "alpha", arity: 0, check: str_alpha },
    ConstraintDef { name: "numeric", arity: 0, check: str_numeric },
    ConstraintDef { name: "lowercase", arity: 0, check: str_lowercase },
    ConstraintDef { name: "uppercase", arity: 0, check: str_uppercase },
    ConstraintDef { name: "trimmed", arity: 0, check: str_trimmed },
    ConstraintDef { name: "not_empty", arity: 0, check: str_not_empty },
    ConstraintDef { name: "one_of", arity: -1, check: str_one_of },
    ConstraintDef { name: "not_one_of", arity: -1, check: str_not_one_of },
];

fn str_length(_: &CheckContext, value: &Value, args: &[Value]) -> Result<(), ConstraintError> {
    let s = str_value(value)?;
    let want = arg_i64(args, 0)?;
    if s.chars().count() as i64 == want {
        Ok(())
    } else {
        Err(violated(format!("length must be exactly {want}")))
    }
}

fn str_minlength(_: &CheckContext, value: &Value, args: &[Value]) -> Result<(), ConstraintError> {
    let s = str_value(value)?;
    let want = arg_i64(args, 0)?;
    if s.chars().count() as i64 >= want {
        Ok(())
    } else {
        Err(violated(format!("length must be at least {want}")))
    }
}

fn str_maxlength(_: &CheckContext, value: &Value, args: &[Value]) -> Result<(), ConstraintError> {
    let s = str_value(value)?;
    let want = arg_i64(args, 0)?;
    if s.chars().count() as i64 <= want {
        Ok(())
    } else {
        Err(violated(format!("length must be at most {want}")))
    }
}

fn str_regexp(cx: &CheckContext, value: &Value, args: &[Value]) -> Result<(), ConstraintError> {
    let s = str_value(value)?;
    let pattern = arg_str(args, 0)?;
    let re = cx
        .regex
        .get(pattern)
        .map_err(|err| violated(format!("invalid pattern: {err}")))?;
    if re.is_match(s) {
        Ok(())
    } else {
        Err(violated(format!("must match /{pattern}/")))
    }
}

fn str_starts_with(_: &CheckContext, value: &Value, args: &[Value]) -> Result<(), ConstraintError> {
    let s = str_value(value)?;
    let prefix = arg_str(args, 0)?;
    if s.starts_with(prefix) {
        Ok(())
    } else {
        Err(violated(format!("must start with '{prefix}'")))
    }
}

fn str_ends_with(_: &CheckContext, value: &Value, args: &[Value]) -> Result<(), ConstraintError> {
    let s = str_value(value)?;
    let suffix = arg_str(args, 0)?;
    if s.ends_with(suffix) {
        Ok(())
    } else {
        Err(violated(format!("must end with '{suffix}'")))
    }
}

fn str_has_substring(
    _: &CheckContext,
    value: &Value,
    args: &[Value],
) -> Result<(), ConstraintError> {
    let s = str_value(value)?;
    let needle = arg_str(args, 0)?;
    if s.contains(needle) {
        Ok(())
    } else {
        Err(violated(format!("must contain '{needle}'")))
    }
}

fn str_not_has_substring(
    _: &CheckContext,
    value: &Value,
    args: &[Value],
) -> Result<(), ConstraintError> {
    let s = str_value(value)?;
    let needle = arg_str(args, 0)?;
    if s.contains(needle) {
        Err(violated(format!("must not contain '{needle}'")))
    } else {
        Ok(())
    }
}

fn str_email(cx: &CheckContext, value: &Value, _: &[Value]) -> Result<(), ConstraintError> {
    let s = str_value(value)?;
    let re = cx
        .regex
        .get(EMAIL_PATTERN)
        .map_err(|err| violated(err.to_string()))?;
    if re.is_match(s) {
        Ok(())
    } else {
        Err(violated("must be an email address"))
    }
}

fn str_url(cx: &CheckContext, value: &Value, _: &[Value]) -> Result<(), ConstraintError> {
    let s = str_value(value)?;
    let re = cx
        .regex
        .get(URL_PATTERN)
        .map_err(|err| violated(err.to_string()))?;
    if re.is_match(s) {
        Ok(())
    } else {
        Err(violated("must be a URL"))
    }
}

fn str_uuid(cx: &CheckContext, value: &Value, _: &[Value]) -> Result<(), ConstraintError> {
    let s = str_value(value)?;
    let re = cx
        .regex
        .get(UUID_PATTERN)
        .map_err(|err| violated(err.to_string()))?;
    if re.is_match(s) {
        Ok(())
    } else {
        Err(violated("must be a UUID"))
    }
}

fn str_alphanumeric(_: &CheckContext, value: &Value, _: &[Value]) -> Result<(), ConstraintError> {
    let s = str_value(value)?;
    if !s.is_empty() && s.chars().all(char::is_alphanumeric) {
        Ok(())
    } else {
        Err(violated("must be alphanumeric"))
    }
}

fn str_alpha(_: &CheckContext, value: &Value, _: &[Value]) -> Result<(), ConstraintError> {
    let s = str_value(value)?;
    if !s.is_empty() && s.chars().all(char::is_alphabetic) {
        Ok(())
    } else {
        Err(violated("must be alphabetic"))
    }
}

fn str_numeric(_: &CheckContext, value: &Value, _: &[Value]) -> Result<(), ConstraintError> {
    let s = str_value(value)?;
    if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(violated("must be numeric"))
    }
}

fn str_lowercase(_: &CheckContext, value: &Value, _: &[Value]) -> Result<(), ConstraintError> {
    let s = str_value(value)?;
    if s == s.to_lowercase() {
        Ok(())
    } else {
        Err(violated("must be lowercase"))
    }
}

fn str_uppercase(_: &CheckContext, value: &Value, _: &[Value]) -> Result<(), ConstraintError> {
    let s = str_value(value)?;
    if s == s.to_uppercase() {
        Ok(())
    } else {
        Err(violated("must be uppercase"))
    }
}

fn str_trimmed(_: &CheckContext, value: &Value, _: &[Value]) -> Result<(), ConstraintError> {
    let s = str_value(value)?;
    if s == s.trim() {
        Ok(())
    } else {
        Err(violated("must not have leading or trailing whitespace"))
    }
}

fn str_not_empty(_: &CheckContext, value: &Value, _: &[Value]) -> Result<(), ConstraintError> {
    let s = str_value(value)?;
    if s.is_empty() {
        Err(violated("must not be empty"))
    } else {
        Ok(())
    }
}

fn str_one_of(_: &CheckContext, value: &Value, args: &[Value]) -> Result<(), ConstraintError> {
    if args.iter().any(|arg| arg.loose_eq(value)) {
        Ok(())
    } else {
        Err(violated("must be one of the allowed values"))
    }
}

fn str_not_one_of(_: &CheckContext, value: &Value, args: &[Value]) -> Result<(), ConstraintError> {
    if args.iter().any(|arg| arg.loose_eq(value)) {
        Err(violated("must not be one of the forbidden values"))
    } else {
        Ok(())
    }
}

// === Integer checkers ===

static INTEGER_TABLE: &[ConstraintDef] = &[
    ConstraintDef { name: "gte", arity: 1, check: int_gte },
    ConstraintDef { name: "lte", arity: 1, check: int_lte },
    ConstraintDef { name: "eq", arity: 1, check: int_eq },
    ConstraintDef { name: "neq", arity: 1, check: int_neq },
    ConstraintDef { name: "gt", arity: 1, check: int_gt },
    ConstraintDef { name: "lt", arity: 1, check: int_lt },
    ConstraintDef { name: "in", arity: -1, check: num_in },
    ConstraintDef { name: "not_in", arity: -1, check: num_not_in },
    ConstraintDef { name: "range", arity: 2, check: int_range },
    ConstraintDef { name: "multiple_of", arity: 1, check: int_multiple_of },
    ConstraintDef { name: "even", arity: 0, check: int_even },
    ConstraintDef { name: "odd", arity: 0, check: int_odd },
    ConstraintDef { name: "positive", arity: 0, check: int_positive },
    ConstraintDef { name: "negative", arity: 0, check: int_negative },
    ConstraintDef { name: "non_negative", arity: 0, check: int_non_negative },
    ConstraintDef { name: "non_positive", arity: 0, check: int_non_positive },
];

fn int_gte(_: &CheckContext, value: &Value, args: &[Value]) -> Result<(), ConstraintError> {
    let (v, bound) = (float_value(value)?, arg_f64(args, 0)?);
    if v >= bound {
        Ok(())
    } else {
        Err(violated(format!("must be >= {bound}")))
    }
}

fn int_lte(_: &CheckContext, value: &Value, args: &[Value]) -> Result<(), ConstraintError> {
    let (v, bound) = (float_value(value)?, arg_f64(args, 0)?);
    if v <= bound {
        Ok(())
    } else {
        Err(violated(format!("must be <= {bound}")))
    }
}

fn int_eq(_: &CheckContext, value: &Value, args: &[Value]) -> Result<(), ConstraintError> {
    let (v, want) = (float_value(value)?, arg_f64(args, 0)?);
    if v == want {
        Ok(())
    } else {
        Err(violated(format!("must equal {want}")))
    }
}

fn int_neq(_: &CheckContext, value: &Value, args: &[Value]) -> Result<(), ConstraintError> {
    let (v, bad) = (float_value(value)?, arg_f64(args, 0)?);
    if v == bad {
        Err(violated(format!("must not equal {bad}")))
    } else {
        Ok(())
    }
}

fn int_gt(_: &CheckContext, value: &Value, args: &[Value]) -> Result<(), ConstraintError> {
    let (v, bound) = (float_value(value)?, arg_f64(args, 0)?);
    if v > bound {
        Ok(())
    } else {
        Err(violated(format!("must be > {bound}")))
    }
}

fn int_lt(_: &CheckContext, value: &Value, args: &[Value]) -> Result<(), ConstraintError> {
    let (v, bound) = (float_value(value)?, arg_f64(args, 0)?);
    if v < bound {
        Ok(())
    } else {
        Err(violated(format!("must be < {bound}")))
    }
}

fn num_in(_: &CheckContext, value: &Value, args: &[Value]) -> Result<(), ConstraintError> {
    if args.iter().any(|arg| arg.loose_eq(value)) {
        Ok(())
    } else {
        Err(violated("must be one of the allowed values"))
    }
}

fn num_not_in(_: &CheckContext, value: &Value, args: &[Value]) -> Result<(), ConstraintError> {
    if args.iter().any(|arg| arg.loose_eq(value)) {
        Err(violated("must not be one of the forbidden values"))
    } else {
        Ok(())
    }
}

fn int_range(_: &CheckContext, value: &Value, args: &[Value]) -> Result<(), ConstraintError> {
    let v = float_value(value)?;
    let (lo, hi) = (arg_f64(args, 0)?, arg_f64(args, 1)?);
    if v >= lo && v <= hi {
        Ok(())
    } else {
        Err(violated(format!("must be within [{lo}, {hi}]")))
    }
}

fn int_multiple_of(_: &CheckContext, value: &Value, args: &[Value]) -> Result<(), ConstraintError> {
    let v = int_value(value)?;
    let m = arg_i64(args, 0)?;
    if m == 0 {
        return Err(violated("multiple_of divisor must not be zero"));
    }
    if v % m == 0 {
        Ok(())
    } else {
        Err(violated(format!("must be a multiple of {m}")))
    }
}

fn int_even(_: &CheckContext, value: &Value, _: &[Value]) -> Result<(), ConstraintError> {
    if int_value(value)? % 2 == 0 {
        Ok(())
    } else {
        Err(violated("must be even"))
    }
}

fn int_odd(_: &CheckContext, value: &Value, _: &[Value]) -> Result<(), ConstraintError> {
    if int_value(value)? % 2 != 0 {
        Ok(())
    } else {
        Err(violated("must be odd"))
    }
}

fn int_positive(_: &CheckContext, value: &Value, _: &[Value]) -> Result<(), ConstraintError> {
    if float_value(value)? > 0.0 {
        Ok(())
    } else {
        Err(violated("must be positive"))
    }
}

fn int_negative(_: &CheckContext, value: &Value, _: &[Value]) -> Result<(), ConstraintError> {
    if float_value(value)? < 0.0 {
        Ok(())
    } else {
        Err(violated("must be negative"))
    }
}

fn int_non_negative(_: &CheckContext, value: &Value, _: &[Value]) -> Result<(), ConstraintError> {
    if float_value(value)? >= 0.0 {
        Ok(())
    } else {
        Err(violated("must be non-negative"))
    }
}

fn int_non_positive(_: &CheckContext, value: &Value, _: &[Value]) -> Result<(), ConstraintError> {
    if float_value(value)? <= 0.0 {
        Ok(())
    } else {
        Err(violated("must be non-positive"))
    }
}

// === Float checkers ===

static FLOAT_TABLE: &[ConstraintDef] = &[
    ConstraintDef { name: "min", arity: 1, check: int_gte },
    ConstraintDef { name: "max", arity: 1, check: int_lte },
    ConstraintDef { name: "eq", arity: 1, check: int_eq },
    ConstraintDef { name: "neq", arity: 1, check: int_neq },
    ConstraintDef { name: "gt", arity: 1, check: int_gt },
    ConstraintDef { name: "lt", arity: 1, check: int_lt },
    ConstraintDef { name: "in", arity: -1, check: num_in },
    ConstraintDef { name: "not_in", arity: -1, check: num_not_in },
    ConstraintDef { name: "range", arity: 2, check: int_range },
    ConstraintDef { name: "even", arity: 0, check: float_even },
    ConstraintDef { name: "odd", arity: 0, check: float_odd },
    ConstraintDef { name: "multiple_of", arity: 1, check: float_multiple_of },
    ConstraintDef { name: "positive", arity: 0, check: int_positive },
    ConstraintDef { name: "negative", arity: 0, check: int_negative },
    ConstraintDef { name: "non_negative", arity: 0, check: int_non_negative },
    ConstraintDef { name: "non_positive", arity: 0, check: int_non_positive },
    ConstraintDef { name: "finite", arity: 0, check: float_finite },
    ConstraintDef { name: "infinite", arity: 0, check: float_infinite },
    ConstraintDef { name: "nan", arity: 0, check: float_nan },
];

fn float_even(_: &CheckContext, value: &Value, _: &[Value]) -> Result<(), ConstraintError> {
    let v = float_value(value)?;
    if v.fract() == 0.0 && (v as i64) % 2 == 0 {
        Ok(())
    } else {
        Err(violated("must be an even integer"))
    }
}

fn float_odd(_: &CheckContext, value: &Value, _: &[Value]) -> Result<(), ConstraintError> {
    let v = float_value(value)?;
    if v.fract() == 0.0 && (v as i64) % 2 != 0 {
        Ok(())
    } else {
        Err(violated("must be an odd integer"))
    }
}

fn float_multiple_of(
    _: &CheckContext,
    value: &Value,
    args: &[Value],
) -> Result<(), ConstraintError> {
    let v = float_value(value)?;
    let m = arg_f64(args, 0)?;
    if m == 0.0 {
        return Err(violated("multiple_of divisor must not be zero"));
    }
    let remainder = (v % m).abs();
    if remainder < MULTIPLE_OF_EPSILON || (m.abs() - remainder).abs() < MULTIPLE_OF_EPSILON {
        Ok(())
    } else {
        Err(violated(format!("must be a multiple of {m}")))
    }
}

fn float_finite(_: &CheckContext, value: &Value, _: &[Value]) -> Result<(), ConstraintError> {
    if float_value(value)?.is_finite() {
        Ok(())
    } else {
        Err(violated("must be finite"))
    }
}

fn float_infinite(_: &CheckContext, value: &Value, _: &[Value]) -> Result<(), ConstraintError> {
    if float_value(value)?.is_infinite() {
        Ok(())
    } else {
        Err(violated("must be infinite"))
    }
}

fn float_nan(_: &CheckContext, value: &Value, _: &[Value]) -> Result<(), ConstraintError> {
    if float_value(value)?.is_nan() {
        Ok(())
    } else {
        Err(violated("must be NaN"))
    }
}

// === Trinary / boolean checkers ===

static TRINARY_TABLE: &[ConstraintDef] = &[
    ConstraintDef { name: "not_unknown", arity: 0, check: tri_not_unknown },
    ConstraintDef { name: "eq", arity: 1, check: tri_eq },
    ConstraintDef { name: "neq", arity: 1, check: tri_neq },
    ConstraintDef { name: "is_true", arity: 0, check: tri_is_true },
    ConstraintDef { name: "is_false", arity: 0, check: tri_is_false },
];

fn tri_not_unknown(_: &CheckContext, value: &Value, _: &[Value]) -> Result<(), ConstraintError> {
    if trinary_value(value)?.is_unknown() {
        Err(violated("must not be unknown"))
    } else {
        Ok(())
    }
}

fn tri_eq(_: &CheckContext, value: &Value, args: &[Value]) -> Result<(), ConstraintError> {
    let v = trinary_value(value)?;
    let want = trinary_value(args.first().unwrap_or(&Value::Null))?;
    if v == want {
        Ok(())
    } else {
        Err(violated(format!("must equal {want}")))
    }
}

fn tri_neq(_: &CheckContext, value: &Value, args: &[Value]) -> Result<(), ConstraintError> {
    let v = trinary_value(value)?;
    let bad = trinary_value(args.first().unwrap_or(&Value::Null))?;
    if v == bad {
        Err(violated(format!("must not equal {bad}")))
    } else {
        Ok(())
    }
}

fn tri_is_true(_: &CheckContext, value: &Value, _: &[Value]) -> Result<(), ConstraintError> {
    if trinary_value(value)?.is_true() {
        Ok(())
    } else {
        Err(violated("must be true"))
    }
}

fn tri_is_false(_: &CheckContext, value: &Value, _: &[Value]) -> Result<(), ConstraintError> {
    if trinary_value(value)?.is_false() {
        Ok(())
    } else {
        Err(violated("must be false"))
    }
}

// === List checkers ===

static LIST_TABLE: &[ConstraintDef] = &[ConstraintDef {
    name: "not_empty",
    arity: 0,
    check: list_not_empty,
}];

fn list_not_empty(_: &CheckContext, value: &Value, _: &[Value]) -> Result<(), ConstraintError> {
    match value {
        Value::List(items) if !items.is_empty() => Ok(()),
        Value::List(_) => Err(violated("must not be empty")),
        other => Err(violated(format!("expected a list, got {}", other.type_name()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cx(cache: &RegexCache) -> CheckContext<'_> {
        CheckContext {
            policy: "ns/p".to_string(),
            regex: cache,
        }
    }

    fn check(
        lookup: fn(&str) -> Option<&'static ConstraintDef>,
        name: &str,
        value: Value,
        args: &[Value],
    ) -> Result<(), ConstraintError> {
        let cache = RegexCache::new();
        let def = lookup(name).expect("constraint exists");
        run(def, &cx(&cache), &value, args)
    }

    #[test]
    fn test_string_lengths() {
        assert!(check(string_constraint, "minlength", Value::Str("abc".into()), &[Value::Int(2)]).is_ok());
        assert!(check(string_constraint, "maxlength", Value::Str("abc".into()), &[Value::Int(2)]).is_err());
        assert!(check(string_constraint, "length", Value::Str("abc".into()), &[Value::Int(3)]).is_ok());
    }

    #[test]
    fn test_string_patterns() {
        assert!(check(string_constraint, "email", Value::Str("a@b.io".into()), &[]).is_ok());
        assert!(check(string_constraint, "email", Value::Str("nope".into()), &[]).is_err());
        assert!(check(string_constraint, "url", Value::Str("https://x.io/p".into()), &[]).is_ok());
        assert!(check(string_constraint, "url", Value::Str("x.io".into()), &[]).is_err());
        assert!(check(
            string_constraint,
            "uuid",
            Value::Str("123e4567-e89b-12d3-a456-426614174000".into()),
            &[]
        )
        .is_ok());
        assert!(check(
            string_constraint,
            "regexp",
            Value::Str("abc123".into()),
            &[Value::Str("^[a-z]+[0-9]+$".into())]
        )
        .is_ok());
    }

    #[test]
    fn test_string_classes() {
        assert!(check(string_constraint, "alphanumeric", Value::Str("ab12".into()), &[]).is_ok());
        assert!(check(string_constraint, "alpha", Value::Str("ab12".into()), &[]).is_err());
        assert!(check(string_constraint, "numeric", Value::Str("042".into()), &[]).is_ok());
        assert!(check(string_constraint, "lowercase", Value::Str("abc".into()), &[]).is_ok());
        assert!(check(string_constraint, "uppercase", Value::Str("Abc".into()), &[]).is_err());
        assert!(check(string_constraint, "trimmed", Value::Str(" x".into()), &[]).is_err());
        assert!(check(string_constraint, "not_empty", Value::Str("".into()), &[]).is_err());
    }

    #[test]
    fn test_one_of_varargs() {
        let allowed = [Value::Str("a".into()), Value::Str("b".into())];
        assert!(check(string_constraint, "one_of", Value::Str("a".into()), &allowed).is_ok());
        assert!(check(string_constraint, "one_of", Value::Str("c".into()), &allowed).is_err());
        // Varargs require at least one argument.
        let err = check(string_constraint, "one_of", Value::Str("a".into()), &[]).unwrap_err();
        assert!(matches!(err, ConstraintError::Arity { .. }));
    }

    #[test]
    fn test_integer_bounds() {
        assert!(check(integer_constraint, "gte", Value::Int(5), &[Value::Int(5)]).is_ok());
        assert!(check(integer_constraint, "lt", Value::Int(5), &[Value::Int(5)]).is_err());
        assert!(check(
            integer_constraint,
            "range",
            Value::Int(5),
            &[Value::Int(0), Value::Int(10)]
        )
        .is_ok());
        assert!(check(integer_constraint, "multiple_of", Value::Int(9), &[Value::Int(3)]).is_ok());
        assert!(check(integer_constraint, "even", Value::Int(3), &[]).is_err());
        assert!(check(integer_constraint, "odd", Value::Int(3), &[]).is_ok());
        assert!(check(integer_constraint, "non_negative", Value::Int(0), &[]).is_ok());
    }

    #[test]
    fn test_float_checks() {
        assert!(check(float_constraint, "min", Value::Float(2.5), &[Value::Int(2)]).is_ok());
        assert!(check(float_constraint, "max", Value::Float(2.5), &[Value::Int(2)]).is_err());
        assert!(check(
            float_constraint,
            "multiple_of",
            Value::Float(0.3),
            &[Value::Float(0.1)]
        )
        .is_ok());
        assert!(check(float_constraint, "finite", Value::Float(1.0), &[]).is_ok());
        assert!(check(float_constraint, "nan", Value::Float(f64::NAN), &[]).is_ok());
        assert!(check(float_constraint, "infinite", Value::Float(f64::INFINITY), &[]).is_ok());
    }

    #[test]
    fn test_trinary_checks() {
        assert!(check(
            trinary_constraint,
            "not_unknown",
            Value::Trinary(Trinary::Unknown),
            &[]
        )
        .is_err());
        assert!(check(trinary_constraint, "is_true", Value::Bool(true), &[]).is_ok());
        assert!(check(
            trinary_constraint,
            "eq",
            Value::Trinary(Trinary::False),
            &[Value::Bool(false)]
        )
        .is_ok());
    }

    #[test]
    fn test_list_not_empty() {
        assert!(check(list_constraint, "not_empty", Value::List(vec![Value::Int(1)]), &[]).is_ok());
        assert!(check(list_constraint, "not_empty", Value::List(vec![]), &[]).is_err());
    }

    #[test]
    fn test_regex_cache_reuses_compilations() {
        let cache = RegexCache::new();
        let a = cache.get("^a+$").unwrap();
        let b = cache.get("^a+$").unwrap();
        assert_eq!(a.as_str(), b.as_str());
        assert!(cache.get("(((").is_err());
    }
}
