//! Expression evaluation.
//!
//! One [`Interp`] exists per rule execution. It holds the coerced facts,
//! the per-execution let cache (each let expression evaluates at most
//! once), a frame stack for comprehension and block bindings, and the
//! set of in-progress rule references that guards against recursion the
//! validator should already have rejected.
//!
//! Three-valued logic runs through everything: `Null` and the unknown
//! trinary propagate through arithmetic, comparisons, and guards instead
//! of erroring, while genuinely ill-typed operations surface as
//! `TypeMismatch`.

use std::collections::{BTreeMap, HashMap};

use crate::ast::{CollectKind, Expr, InfixOp, PresenceTest, QuantKind, Stmt, UnaryOp};
use crate::cancel::Cancellation;
use crate::error::EvalError;
use crate::eval::builtins;
use crate::eval::executor::Executor;
use crate::eval::value::Value;
use crate::index::{Policy, Rule};
use crate::trinary::Trinary;

enum LetSlot {
    Evaluating,
    Done(Value),
}

/// Per-execution evaluation state.
pub(crate) struct Interp<'a> {
    exec: &'a Executor<'a>,
    policy: &'a Policy,
    rule_fqn: String,
    ctx: &'a Cancellation,
    raw_facts: &'a serde_json::Map<String, serde_json::Value>,
    facts: BTreeMap<String, Value>,
    lets: HashMap<String, LetSlot>,
    frames: Vec<Vec<(String, Value)>>,
    active_rules: Vec<String>,
    depth: usize,
}

impl<'a> Interp<'a> {
    pub(crate) fn new(
        exec: &'a Executor<'a>,
        policy: &'a Policy,
        rule_fqn: String,
        ctx: &'a Cancellation,
        raw_facts: &'a serde_json::Map<String, serde_json::Value>,
        facts: BTreeMap<String, Value>,
        depth: usize,
    ) -> Self {
        Interp {
            exec,
            policy,
            rule_fqn,
            ctx,
            raw_facts,
            facts,
            lets: HashMap::new(),
            frames: Vec::new(),
            active_rules: Vec::new(),
            depth,
        }
    }

    pub(crate) fn push_frame(&mut self, bindings: Vec<(String, Value)>) {
        self.frames.push(bindings);
    }

    pub(crate) fn pop_frame(&mut self) {
        self.frames.pop();
    }

    fn type_mismatch(&self, expected: &str, found: &str) -> EvalError {
        EvalError::TypeMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
            rule: self.rule_fqn.clone(),
        }
    }

    fn undefined(&self, name: &str) -> EvalError {
        EvalError::UndefinedIdentifier {
            name: name.to_string(),
            rule: self.rule_fqn.clone(),
        }
    }

    /// Runs the target rule of this execution through its guard protocol,
    /// with the recursion guard armed for its name.
    pub(crate) fn exec_main_rule(&mut self, rule: &Rule) -> Result<(Trinary, Value), EvalError> {
        self.active_rules.push(rule.name.clone());
        let result = self.eval_gated_rule(rule);
        self.active_rules.pop();
        result
    }

    /// The guard protocol: a false guard falls back to the default, an
    /// unknown guard yields an unknown decision, a true guard runs the
    /// body. The decision is always the trinary coercion of the produced
    /// value.
    fn eval_gated_rule(&mut self, rule: &Rule) -> Result<(Trinary, Value), EvalError> {
        if let Some(when) = &rule.when {
            match self.eval(when)?.to_trinary() {
                Trinary::False => match &rule.default {
                    Some(default) => {
                        let value = self.eval(default)?;
                        Ok((value.to_trinary(), value))
                    }
                    None => Ok((Trinary::Unknown, Value::Null)),
                },
                Trinary::Unknown => Ok((Trinary::Unknown, Value::Null)),
                Trinary::True => {
                    let value = self.eval(&rule.body)?;
                    Ok((value.to_trinary(), value))
                }
            }
        } else {
            let value = self.eval(&rule.body)?;
            Ok((value.to_trinary(), value))
        }
    }

    /// Evaluates one expression.
    pub(crate) fn eval(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        self.ctx.check()?;
        match expr {
            Expr::Int(n, _) => Ok(Value::Int(*n)),
            Expr::Float(f, _) => Ok(Value::Float(*f)),
            Expr::Str(s, _) => Ok(Value::Str(s.clone())),
            Expr::Trinary(t, _) => Ok(Value::Trinary(*t)),
            Expr::Ident(name, _) => match self.lookup_local(name)? {
                Some(value) => Ok(value),
                None => Err(self.undefined(name)),
            },
            Expr::FieldAccess { object, field, .. } => self.eval_field_access(object, field),
            Expr::Call { callee, args, .. } => self.eval_call(callee, args),
            Expr::IndexAccess { object, index, .. } => self.eval_index(object, index),
            Expr::Infix {
                op, left, right, ..
            } => self.eval_infix(*op, left, right),
            Expr::Unary { op, operand, .. } => self.eval_unary(*op, operand),
            Expr::Ternary {
                cond,
                then,
                otherwise,
                ..
            } => match self.eval(cond)?.to_trinary() {
                Trinary::True => self.eval(then),
                Trinary::False => self.eval(otherwise),
                Trinary::Unknown => Ok(Value::Trinary(Trinary::Unknown)),
            },
            Expr::Block {
                stmts, yield_expr, ..
            } => {
                self.frames.push(Vec::new());
                let result = self.eval_block(stmts, yield_expr);
                self.frames.pop();
                result
            }
            Expr::ListLit(items, _) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.eval(item)?);
                }
                Ok(Value::List(out))
            }
            Expr::MapLit(entries, _) => {
                let mut out = BTreeMap::new();
                for (key, value) in entries {
                    out.insert(key.clone(), self.eval(value)?);
                }
                Ok(Value::Map(out))
            }
            Expr::ImportClause { policy, rule, .. } => {
                let target = policy.clone();
                self.eval_cross_policy_rule(&target, rule)
            }
            Expr::Quantifier {
                kind,
                var,
                iter,
                pred,
                ..
            } => self.eval_quantifier(*kind, var, iter, pred),
            Expr::Collect {
                kind,
                var,
                iter,
                body,
                ..
            } => self.eval_collect(*kind, var, iter, body),
            Expr::Distinct(inner, _) => {
                let value = self.eval(inner)?;
                if value.is_unknownish() {
                    return Ok(Value::Trinary(Trinary::Unknown));
                }
                let Value::List(items) = value else {
                    return Err(self.type_mismatch("a list", value.type_name()));
                };
                let mut out: Vec<Value> = Vec::new();
                for item in items {
                    if !out.iter().any(|seen| seen.loose_eq(&item)) {
                        out.push(item);
                    }
                }
                Ok(Value::List(out))
            }
            Expr::Count(inner, _) => {
                let value = self.eval(inner)?;
                match &value {
                    Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
                    Value::List(items) => Ok(Value::Int(items.len() as i64)),
                    Value::Map(map) => Ok(Value::Int(map.len() as i64)),
                    v if v.is_unknownish() => Ok(Value::Trinary(Trinary::Unknown)),
                    other => Err(self.type_mismatch("a string, list, or map", other.type_name())),
                }
            }
            Expr::Reduce {
                acc,
                var,
                iter,
                init,
                body,
                ..
            } => self.eval_reduce(acc, var, iter, init, body),
            Expr::Presence {
                subject,
                test,
                negated,
                ..
            } => self.eval_presence(subject, *test, *negated),
        }
    }

    fn eval_block(&mut self, stmts: &[Stmt], yield_expr: &Expr) -> Result<Value, EvalError> {
        for stmt in stmts {
            if let Stmt::VarDecl(decl) = stmt {
                let value = self.eval(&decl.value)?;
                if let Some(frame) = self.frames.last_mut() {
                    frame.push((decl.name.clone(), value));
                }
            }
        }
        self.eval(yield_expr)
    }

    // === Names ===

    fn is_local_name(&self, name: &str) -> bool {
        self.frames
            .iter()
            .any(|frame| frame.iter().any(|(n, _)| n == name))
            || self.facts.contains_key(name)
            || self.policy.lets.contains_key(name)
            || self.policy.rules.contains_key(name)
    }

    /// Resolves an identifier against frames, facts, lets, and rules, in
    /// that order. Returns `None` for names foreign to the policy.
    fn lookup_local(&mut self, name: &str) -> Result<Option<Value>, EvalError> {
        for frame in self.frames.iter().rev() {
            for (bound, value) in frame.iter().rev() {
                if bound == name {
                    return Ok(Some(value.clone()));
                }
            }
        }
        if let Some(value) = self.facts.get(name) {
            return Ok(Some(value.clone()));
        }
        if self.policy.lets.contains_key(name) {
            return self.eval_let(name).map(Some);
        }
        if self.policy.rules.contains_key(name) {
            return self.eval_rule_ref(name).map(Some);
        }
        Ok(None)
    }

    /// Evaluates a let binding, memoized for this execution. A let whose
    /// expression re-enters itself is infinite recursion.
    fn eval_let(&mut self, name: &str) -> Result<Value, EvalError> {
        match self.lets.get(name) {
            Some(LetSlot::Done(value)) => return Ok(value.clone()),
            Some(LetSlot::Evaluating) => {
                return Err(EvalError::InfiniteRecursion {
                    rule: format!("{}/{name}", self.policy.fqn),
                });
            }
            None => {}
        }
        self.lets.insert(name.to_string(), LetSlot::Evaluating);
        let policy = self.policy;
        let decl = policy
            .lets
            .get(name)
            .ok_or_else(|| EvalError::Internal(format!("let '{name}' vanished")))?;
        let value = self.eval(&decl.value)?;
        self.lets
            .insert(name.to_string(), LetSlot::Done(value.clone()));
        Ok(value)
    }

    /// Evaluates a same-policy rule reference through its guard protocol
    /// and yields its value.
    fn eval_rule_ref(&mut self, name: &str) -> Result<Value, EvalError> {
        if self.active_rules.iter().any(|r| r == name) {
            return Err(EvalError::InfiniteRecursion {
                rule: format!("{}/{name}", self.policy.fqn),
            });
        }
        self.active_rules.push(name.to_string());
        let policy = self.policy;
        let result = match policy.rules.get(name) {
            Some(rule) => self.eval_gated_rule(rule).map(|(_, value)| value),
            None => Err(EvalError::Internal(format!("rule '{name}' vanished"))),
        };
        self.active_rules.pop();
        result
    }

    /// Evaluates an exported rule of another policy with the same raw
    /// fact map, yielding its value.
    fn eval_cross_policy_rule(
        &mut self,
        target: &crate::fqn::Fqn,
        rule: &str,
    ) -> Result<Value, EvalError> {
        self.exec.eval_target_value(
            self.ctx,
            &self.policy.namespace,
            target,
            rule,
            self.raw_facts,
            self.depth + 1,
        )
    }

    fn eval_field_access(&mut self, object: &Expr, field: &str) -> Result<Value, EvalError> {
        // `alias.rule` where alias names a `use` import reads the other
        // policy's exported rule, unless a local binding shadows it.
        if let Expr::Ident(name, _) = object {
            if !self.is_local_name(name) {
                if let Some(use_stmt) = self.policy.uses.get(name) {
                    let target = use_stmt.target.clone();
                    return self.eval_cross_policy_rule(&target, field);
                }
            }
        }

        let value = self.eval(object)?;
        match value {
            Value::Map(map) => Ok(map
                .get(field)
                .cloned()
                .unwrap_or(Value::Trinary(Trinary::Unknown))),
            v if v.is_unknownish() => Ok(Value::Trinary(Trinary::Unknown)),
            other => Err(self.type_mismatch("a record", other.type_name())),
        }
    }

    fn eval_call(&mut self, callee: &Expr, args: &[Expr]) -> Result<Value, EvalError> {
        let Expr::Ident(name, _) = callee else {
            return Err(self.type_mismatch("a callable name", "expression"));
        };
        if self.is_local_name(name) {
            return Err(self.type_mismatch("a callable name", "a bound value"));
        }
        if !builtins::is_builtin(name) {
            return Err(self.undefined(name));
        }
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval(arg)?);
        }
        builtins::call(name, &values, &self.rule_fqn)
    }

    fn eval_index(&mut self, object: &Expr, index: &Expr) -> Result<Value, EvalError> {
        let obj = self.eval(object)?;
        let idx = self.eval(index)?;
        if obj.is_unknownish() || idx.is_unknownish() {
            return Ok(Value::Trinary(Trinary::Unknown));
        }
        match (&obj, &idx) {
            (Value::List(items), Value::Int(i)) => Ok(usize::try_from(*i)
                .ok()
                .and_then(|i| items.get(i))
                .cloned()
                .unwrap_or(Value::Trinary(Trinary::Unknown))),
            (Value::Map(map), Value::Str(key)) => Ok(map
                .get(key)
                .cloned()
                .unwrap_or(Value::Trinary(Trinary::Unknown))),
            (Value::Str(s), Value::Int(i)) => Ok(usize::try_from(*i)
                .ok()
                .and_then(|i| s.chars().nth(i))
                .map(|c| Value::Str(c.to_string()))
                .unwrap_or(Value::Trinary(Trinary::Unknown))),
            _ => Err(self.type_mismatch(
                "an indexable value",
                &format!("{}[{}]", obj.type_name(), idx.type_name()),
            )),
        }
    }

    // === Operators ===

    fn eval_infix(&mut self, op: InfixOp, left: &Expr, right: &Expr) -> Result<Value, EvalError> {
        match op {
            InfixOp::And => {
                let l = self.eval(left)?.to_trinary();
                if l.is_false() {
                    return Ok(Value::Trinary(Trinary::False));
                }
                let r = self.eval(right)?.to_trinary();
                Ok(Value::Trinary(l.and(r)))
            }
            InfixOp::Or => {
                let l = self.eval(left)?.to_trinary();
                if l.is_true() {
                    return Ok(Value::Trinary(Trinary::True));
                }
                let r = self.eval(right)?.to_trinary();
                Ok(Value::Trinary(l.or(r)))
            }
            InfixOp::Xor => {
                let l = self.eval(left)?.to_trinary();
                let r = self.eval(right)?.to_trinary();
                Ok(Value::Trinary(l.xor(r)))
            }
            InfixOp::Eq | InfixOp::NotEq => {
                let l = self.eval(left)?;
                let r = self.eval(right)?;
                if l.is_unknownish() || r.is_unknownish() {
                    return Ok(Value::Trinary(Trinary::Unknown));
                }
                let mut t = Trinary::from(l.loose_eq(&r));
                if op == InfixOp::NotEq {
                    t = t.not();
                }
                Ok(Value::Trinary(t))
            }
            InfixOp::Lt | InfixOp::LtEq | InfixOp::Gt | InfixOp::GtEq => {
                let l = self.eval(left)?;
                let r = self.eval(right)?;
                self.compare(op, &l, &r)
            }
            InfixOp::In => {
                let l = self.eval(left)?;
                let r = self.eval(right)?;
                self.membership(&l, &r)
            }
            InfixOp::Contains => {
                let l = self.eval(left)?;
                let r = self.eval(right)?;
                self.membership(&r, &l)
            }
            InfixOp::Matches => {
                let l = self.eval(left)?;
                let r = self.eval(right)?;
                if l.is_unknownish() || r.is_unknownish() {
                    return Ok(Value::Trinary(Trinary::Unknown));
                }
                let (Value::Str(s), Value::Str(pattern)) = (&l, &r) else {
                    return Err(self.type_mismatch(
                        "a string and a pattern",
                        &format!("{} matches {}", l.type_name(), r.type_name()),
                    ));
                };
                let re = self
                    .exec
                    .regex()
                    .get(pattern)
                    .map_err(|_| self.type_mismatch("a valid regular expression", pattern))?;
                Ok(Value::Trinary(Trinary::from(re.is_match(s))))
            }
            InfixOp::Add | InfixOp::Sub | InfixOp::Mul | InfixOp::Div | InfixOp::Mod => {
                let l = self.eval(left)?;
                let r = self.eval(right)?;
                self.arithmetic(op, &l, &r)
            }
        }
    }

    fn compare(&self, op: InfixOp, l: &Value, r: &Value) -> Result<Value, EvalError> {
        if l.is_unknownish() || r.is_unknownish() {
            return Ok(Value::Trinary(Trinary::Unknown));
        }
        let ordering = if l.is_number() && r.is_number() {
            let (Some(a), Some(b)) = (l.as_f64(), r.as_f64()) else {
                return Ok(Value::Trinary(Trinary::Unknown));
            };
            match a.partial_cmp(&b) {
                Some(ordering) => ordering,
                None => return Ok(Value::Trinary(Trinary::Unknown)),
            }
        } else if let (Value::Str(a), Value::Str(b)) = (l, r) {
            a.cmp(b)
        } else {
            return Err(self.type_mismatch(
                "comparable operands",
                &format!("{} and {}", l.type_name(), r.type_name()),
            ));
        };
        let holds = match op {
            InfixOp::Lt => ordering.is_lt(),
            InfixOp::LtEq => ordering.is_le(),
            InfixOp::Gt => ordering.is_gt(),
            _ => ordering.is_ge(),
        };
        Ok(Value::Trinary(Trinary::from(holds)))
    }

    fn membership(&self, needle: &Value, haystack: &Value) -> Result<Value, EvalError> {
        if needle.is_unknownish() || haystack.is_unknownish() {
            return Ok(Value::Trinary(Trinary::Unknown));
        }
        match haystack {
            Value::List(items) => Ok(Value::Trinary(Trinary::from(
                items.iter().any(|item| item.loose_eq(needle)),
            ))),
            Value::Str(s) => match needle {
                Value::Str(sub) => Ok(Value::Trinary(Trinary::from(s.contains(sub.as_str())))),
                other => Err(self.type_mismatch("a substring", other.type_name())),
            },
            Value::Map(map) => match needle {
                Value::Str(key) => Ok(Value::Trinary(Trinary::from(map.contains_key(key)))),
                other => Err(self.type_mismatch("a string key", other.type_name())),
            },
            other => Err(self.type_mismatch("a list, string, or map", other.type_name())),
        }
    }

    fn arithmetic(&self, op: InfixOp, l: &Value, r: &Value) -> Result<Value, EvalError> {
        if l.is_unknownish() || r.is_unknownish() {
            return Ok(Value::Trinary(Trinary::Unknown));
        }

        // String and list concatenation ride on `+`.
        if op == InfixOp::Add {
            if let (Value::Str(a), Value::Str(b)) = (l, r) {
                return Ok(Value::Str(format!("{a}{b}")));
            }
            if let (Value::List(a), Value::List(b)) = (l, r) {
                let mut out = a.clone();
                out.extend(b.iter().cloned());
                return Ok(Value::List(out));
            }
        }

        if !(l.is_number() && r.is_number()) {
            return Err(self.type_mismatch(
                "numeric operands",
                &format!("{} {} {}", l.type_name(), op.symbol(), r.type_name()),
            ));
        }

        if let (Value::Int(a), Value::Int(b)) = (l, r) {
            let (a, b) = (*a, *b);
            return match op {
                InfixOp::Add => self.checked(a.checked_add(b), "addition"),
                InfixOp::Sub => self.checked(a.checked_sub(b), "subtraction"),
                InfixOp::Mul => self.checked(a.checked_mul(b), "multiplication"),
                // Division and modulus by zero yield unknown, not errors.
                InfixOp::Div => {
                    if b == 0 {
                        Ok(Value::Null)
                    } else {
                        self.checked(a.checked_div(b), "division")
                    }
                }
                _ => {
                    if b == 0 {
                        Ok(Value::Null)
                    } else {
                        self.checked(a.checked_rem(b), "modulus")
                    }
                }
            };
        }

        let (Some(a), Some(b)) = (l.as_f64(), r.as_f64()) else {
            return Ok(Value::Trinary(Trinary::Unknown));
        };
        match op {
            InfixOp::Add => Ok(Value::Float(a + b)),
            InfixOp::Sub => Ok(Value::Float(a - b)),
            InfixOp::Mul => Ok(Value::Float(a * b)),
            InfixOp::Div => {
                if b == 0.0 {
                    Ok(Value::Null)
                } else {
                    Ok(Value::Float(a / b))
                }
            }
            _ => {
                if b == 0.0 {
                    Ok(Value::Null)
                } else {
                    Ok(Value::Float(a % b))
                }
            }
        }
    }

    fn checked(&self, result: Option<i64>, op: &'static str) -> Result<Value, EvalError> {
        result.map(Value::Int).ok_or(EvalError::Overflow {
            op,
            rule: self.rule_fqn.clone(),
        })
    }

    fn eval_unary(&mut self, op: UnaryOp, operand: &Expr) -> Result<Value, EvalError> {
        let value = self.eval(operand)?;
        match op {
            UnaryOp::Not => Ok(Value::Trinary(value.to_trinary().not())),
            UnaryOp::Neg => match value {
                Value::Int(n) => self.checked(n.checked_neg(), "negation"),
                Value::Float(f) => Ok(Value::Float(-f)),
                v if v.is_unknownish() => Ok(Value::Trinary(Trinary::Unknown)),
                other => Err(self.type_mismatch("a number", other.type_name())),
            },
        }
    }

    // === Comprehensions ===

    fn eval_quantifier(
        &mut self,
        kind: QuantKind,
        var: &str,
        iter: &Expr,
        pred: &Expr,
    ) -> Result<Value, EvalError> {
        let collection = self.eval(iter)?;
        if collection.is_unknownish() {
            return Ok(Value::Trinary(Trinary::Unknown));
        }
        let Value::List(items) = collection else {
            return Err(self.type_mismatch("a list", collection.type_name()));
        };

        let mut saw_unknown = false;
        for item in items {
            self.frames.push(vec![(var.to_string(), item)]);
            let result = self.eval(pred);
            self.frames.pop();
            match (kind, result?.to_trinary()) {
                (QuantKind::Any, Trinary::True) => return Ok(Value::Trinary(Trinary::True)),
                (QuantKind::All, Trinary::False) => return Ok(Value::Trinary(Trinary::False)),
                (_, Trinary::Unknown) => saw_unknown = true,
                _ => {}
            }
        }
        let result = match (kind, saw_unknown) {
            (_, true) => Trinary::Unknown,
            (QuantKind::Any, false) => Trinary::False,
            (QuantKind::All, false) => Trinary::True,
        };
        Ok(Value::Trinary(result))
    }

    fn eval_collect(
        &mut self,
        kind: CollectKind,
        var: &str,
        iter: &Expr,
        body: &Expr,
    ) -> Result<Value, EvalError> {
        let collection = self.eval(iter)?;
        if collection.is_unknownish() {
            return Ok(Value::Trinary(Trinary::Unknown));
        }
        let Value::List(items) = collection else {
            return Err(self.type_mismatch("a list", collection.type_name()));
        };

        let mut out = Vec::new();
        for item in items {
            self.frames.push(vec![(var.to_string(), item.clone())]);
            let result = self.eval(body);
            self.frames.pop();
            let value = result?;
            match kind {
                CollectKind::Filter => {
                    if value.to_trinary().is_true() {
                        out.push(item);
                    }
                }
                CollectKind::MapEach => out.push(value),
            }
        }
        Ok(Value::List(out))
    }

    fn eval_reduce(
        &mut self,
        acc: &str,
        var: &str,
        iter: &Expr,
        init: &Expr,
        body: &Expr,
    ) -> Result<Value, EvalError> {
        let collection = self.eval(iter)?;
        if collection.is_unknownish() {
            return Ok(Value::Trinary(Trinary::Unknown));
        }
        let Value::List(items) = collection else {
            return Err(self.type_mismatch("a list", collection.type_name()));
        };

        let mut accumulated = self.eval(init)?;
        for item in items {
            self.frames
                .push(vec![(acc.to_string(), accumulated), (var.to_string(), item)]);
            let result = self.eval(body);
            self.frames.pop();
            accumulated = result?;
        }
        Ok(accumulated)
    }

    fn eval_presence(
        &mut self,
        subject: &Expr,
        test: PresenceTest,
        negated: bool,
    ) -> Result<Value, EvalError> {
        let result = match test {
            PresenceTest::Defined => {
                let defined = match self.eval(subject) {
                    Ok(value) => !value.is_unknownish(),
                    Err(EvalError::UndefinedIdentifier { .. }) => false,
                    Err(err) => return Err(err),
                };
                Trinary::from(defined)
            }
            PresenceTest::Empty => {
                let value = self.eval(subject)?;
                match &value {
                    Value::Str(s) => Trinary::from(s.is_empty()),
                    Value::List(items) => Trinary::from(items.is_empty()),
                    Value::Map(map) => Trinary::from(map.is_empty()),
                    v if v.is_unknownish() => Trinary::Unknown,
                    other => {
                        return Err(
                            self.type_mismatch("a string, list, or map", other.type_name())
                        );
                    }
                }
            }
        };
        Ok(Value::Trinary(if negated { result.not() } else { result }))
    }
}
