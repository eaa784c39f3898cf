//! Rule entities.

use crate::ast::{Expr, RuleStmt};
use crate::fqn::Fqn;
use crate::token::Range;

/// A rule registered in the index.
///
/// Exported rules are the only entry points visible to decision queries;
/// non-exported rules can still be referenced by name from the same
/// policy's lets, rules, and attachments.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    /// The simple name.
    pub name: String,
    /// The fully qualified name: `namespace/policy/name`.
    pub fqn: Fqn,
    /// The owning policy's FQN.
    pub policy: Fqn,
    /// Fallback expression used when the `when` guard is false.
    pub default: Option<Expr>,
    /// Guard expression gating the body.
    pub when: Option<Expr>,
    /// The rule body.
    pub body: Expr,
    /// Source location of the declaration.
    pub range: Range,
}

impl Rule {
    /// Builds a rule entity from its statement.
    pub fn from_stmt(stmt: &RuleStmt, policy: &Fqn) -> Rule {
        Rule {
            name: stmt.name.clone(),
            fqn: policy.join(&stmt.name),
            policy: policy.clone(),
            default: stmt.default.clone(),
            when: stmt.when.clone(),
            body: stmt.body.clone(),
            range: stmt.range.clone(),
        }
    }

    /// Returns the `(policy, rule)` target when the body is an import
    /// clause, i.e. this rule re-exports another policy's rule.
    pub fn import_target(&self) -> Option<(&Fqn, &str)> {
        match &self.body {
            Expr::ImportClause { policy, rule, .. } => Some((policy, rule.as_str())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expr;
    use crate::trinary::Trinary;

    #[test]
    fn test_from_stmt() {
        let policy = Fqn::parse("com/example/auth").unwrap();
        let stmt = RuleStmt {
            name: "allow".to_string(),
            default: None,
            when: None,
            body: Expr::Trinary(Trinary::True, Range::default()),
            range: Range::default(),
        };
        let rule = Rule::from_stmt(&stmt, &policy);
        assert_eq!(rule.fqn.to_string(), "com/example/auth/allow");
        assert!(rule.import_target().is_none());
    }

    #[test]
    fn test_import_target() {
        let policy = Fqn::parse("ns/p1").unwrap();
        let stmt = RuleStmt {
            name: "r1".to_string(),
            default: None,
            when: None,
            body: Expr::ImportClause {
                policy: Fqn::single("other"),
                rule: "rx".to_string(),
                range: Range::default(),
            },
            range: Range::default(),
        };
        let rule = Rule::from_stmt(&stmt, &policy);
        let (target_policy, target_rule) = rule.import_target().unwrap();
        assert_eq!(target_policy.to_string(), "other");
        assert_eq!(target_rule, "rx");
    }
}
