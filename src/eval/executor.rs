//! The decision-intake facade.
//!
//! An [`Executor`] borrows a committed index and answers decision
//! queries: one rule, a whole policy's exported rules, or a slash path.
//! It owns the regex cache shared by the `matches` operator and the
//! string constraints, and it is the recursion boundary for cross-policy
//! rule imports.
//!
//! Arithmetic inside rules is checked 64-bit integer arithmetic;
//! overflow surfaces as an error rather than wrapping.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::cancel::Cancellation;
use crate::constraint::RegexCache;
use crate::error::{EvalError, IndexError};
use crate::eval::coerce::{coerce_facts, CoerceCx};
use crate::eval::interpreter::Interp;
use crate::eval::value::Value;
use crate::fqn::Fqn;
use crate::index::{Index, Policy};
use crate::trinary::Trinary;

/// JSON-shaped facts, keyed by fact alias.
pub type FactMap = serde_json::Map<String, serde_json::Value>;

/// Cross-policy evaluation depth bound. Validation rejects import
/// cycles, so this only trips on packs that bypassed it.
const MAX_DEPTH: usize = 64;

/// The result of evaluating one rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutorOutput {
    /// The namespace FQN the rule lives in.
    pub namespace: String,
    /// The policy name.
    pub policy_name: String,
    /// The rule name.
    pub rule_name: String,
    /// The three-valued decision.
    pub decision: Trinary,
    /// The rule's evaluated value.
    pub value: Value,
    /// Attachment values, keyed by clause name.
    pub attachments: BTreeMap<String, Value>,
}

/// Evaluates rules against a committed [`Index`].
pub struct Executor<'a> {
    index: &'a Index,
    regex: RegexCache,
}

impl<'a> Executor<'a> {
    /// Creates an executor over a committed index.
    pub fn new(index: &'a Index) -> Self {
        Executor {
            index,
            regex: RegexCache::new(),
        }
    }

    /// The underlying index.
    pub fn index(&self) -> &Index {
        self.index
    }

    pub(crate) fn regex(&self) -> &RegexCache {
        &self.regex
    }

    fn ensure_committed(&self) -> Result<(), EvalError> {
        if self.index.is_committed() {
            Ok(())
        } else {
            Err(EvalError::Internal(
                "index must be committed before evaluation".to_string(),
            ))
        }
    }

    /// Evaluates one exported rule with the given facts.
    pub fn exec_rule(
        &self,
        ctx: &Cancellation,
        namespace: &str,
        policy: &str,
        rule: &str,
        facts: &FactMap,
    ) -> Result<ExecutorOutput, EvalError> {
        self.ensure_committed()?;
        let ns_fqn = parse_namespace(namespace)?;
        let policy = self.index.resolve_policy(&ns_fqn, policy)?;
        self.run_rule(ctx, policy, rule, facts, 0)
    }

    /// Evaluates every exported rule of a policy, in export declaration
    /// order.
    pub fn exec_policy(
        &self,
        ctx: &Cancellation,
        namespace: &str,
        policy: &str,
        facts: &FactMap,
    ) -> Result<Vec<ExecutorOutput>, EvalError> {
        self.ensure_committed()?;
        let ns_fqn = parse_namespace(namespace)?;
        let policy = self.index.resolve_policy(&ns_fqn, policy)?;
        self.run_policy(ctx, policy, facts)
    }

    /// Resolves a slash path and evaluates the addressed rule, or every
    /// exported rule when the path stops at the policy.
    pub fn exec_path(
        &self,
        ctx: &Cancellation,
        path: &str,
        facts: &FactMap,
    ) -> Result<Vec<ExecutorOutput>, EvalError> {
        self.ensure_committed()?;
        let (_, policy, rule) = self.index.resolve_segments(path)?;
        match rule {
            Some(rule) => Ok(vec![self.run_rule(ctx, policy, &rule, facts, 0)?]),
            None => self.run_policy(ctx, policy, facts),
        }
    }

    fn run_policy(
        &self,
        ctx: &Cancellation,
        policy: &Policy,
        facts: &FactMap,
    ) -> Result<Vec<ExecutorOutput>, EvalError> {
        let mut outputs = Vec::with_capacity(policy.export_order.len());
        for rule_name in &policy.export_order {
            ctx.check()?;
            outputs.push(self.run_rule(ctx, policy, rule_name, facts, 0)?);
        }
        Ok(outputs)
    }

    /// The full evaluation protocol for one exported rule.
    fn run_rule(
        &self,
        ctx: &Cancellation,
        policy: &Policy,
        rule_name: &str,
        facts: &FactMap,
        depth: usize,
    ) -> Result<ExecutorOutput, EvalError> {
        ctx.check()?;
        if depth > MAX_DEPTH {
            return Err(EvalError::InfiniteRecursion {
                rule: format!("{}/{rule_name}", policy.fqn),
            });
        }

        let rule = policy
            .rules
            .get(rule_name)
            .ok_or_else(|| IndexError::RuleNotFound {
                rule: rule_name.to_string(),
                policy: policy.fqn.to_string(),
            })?;
        if !policy.is_exported(rule_name) {
            return Err(EvalError::RuleNotExported {
                rule: rule_name.to_string(),
                policy: policy.fqn.to_string(),
            });
        }

        // An import body delegates wholesale: the target's decision,
        // value, and attachments are returned as if it had been invoked
        // directly, with the same fact map.
        if let Some((target_policy_fqn, target_rule)) = rule.import_target() {
            let target_policy = self
                .index
                .resolve_policy_target(&policy.namespace, target_policy_fqn)?;
            return self.run_rule(ctx, target_policy, target_rule, facts, depth + 1);
        }

        let coerce_cx = CoerceCx {
            index: self.index,
            policy,
            regex: &self.regex,
        };
        let coerced = coerce_facts(&coerce_cx, facts)?;
        let mut interp = Interp::new(
            self,
            policy,
            rule.fqn.to_string(),
            ctx,
            facts,
            coerced,
            depth,
        );
        let (decision, value) = interp.exec_main_rule(rule)?;

        let export = policy.export(rule_name).ok_or_else(|| {
            EvalError::Internal(format!("export of '{rule_name}' vanished"))
        })?;
        let mut attachments = BTreeMap::new();
        if !export.attachments.is_empty() {
            // The rule's own value is visible to attachments under the
            // rule's name; clauses run in source order.
            interp.push_frame(vec![(rule_name.to_string(), value.clone())]);
            for clause in &export.attachments {
                let attached = interp.eval(&clause.as_expr)?;
                attachments.insert(clause.what.clone(), attached);
            }
            interp.pop_frame();
        }

        Ok(ExecutorOutput {
            namespace: policy.namespace.to_string(),
            policy_name: policy.name.clone(),
            rule_name: rule_name.to_string(),
            decision,
            value,
            attachments,
        })
    }

    /// Evaluates an exported rule of a target policy and yields only its
    /// value; used by `use`-alias access and nested import clauses.
    pub(crate) fn eval_target_value(
        &self,
        ctx: &Cancellation,
        from_ns: &Fqn,
        target: &Fqn,
        rule: &str,
        facts: &FactMap,
        depth: usize,
    ) -> Result<Value, EvalError> {
        let target_policy = self.index.resolve_policy_target(from_ns, target)?;
        let output = self.run_rule(ctx, target_policy, rule, facts, depth)?;
        Ok(output.value)
    }
}

fn parse_namespace(namespace: &str) -> Result<Fqn, EvalError> {
    Fqn::parse(namespace).ok_or_else(|| {
        EvalError::Index(IndexError::NamespaceNotFound {
            path: namespace.to_string(),
        })
    })
}
