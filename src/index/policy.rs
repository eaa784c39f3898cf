//! Policy entities.
//!
//! Building a policy from its statement walks the body in source order
//! and enforces the structural rules the parser deliberately leaves
//! alone: facts precede everything else, any `use` statements immediately
//! follow the fact block, names are unique across lets, facts, rules, and
//! policy-local shapes, and at least one rule is exported.

use std::collections::BTreeMap;

use crate::ast::{FactStmt, PolicyStmt, RuleExportStmt, Stmt, UseStmt, VarDeclStmt};
use crate::error::IndexError;
use crate::fqn::Fqn;
use crate::index::rule::Rule;
use crate::index::shape::Shape;
use crate::token::Range;

/// Where the body walk currently is. Facts open the body; uses may only
/// follow facts; everything else closes both windows.
#[derive(PartialEq, Clone, Copy)]
enum Phase {
    Facts,
    Uses,
    Rest,
}

/// A policy registered in the index.
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    /// The simple name.
    pub name: String,
    /// The fully qualified name: `namespace/name`.
    pub fqn: Fqn,
    /// The owning namespace.
    pub namespace: Fqn,
    /// Let bindings by name.
    pub lets: BTreeMap<String, VarDeclStmt>,
    /// Facts keyed by their binding alias.
    pub facts: BTreeMap<String, FactStmt>,
    /// Fact binding aliases in declaration order; coercion runs in this
    /// order.
    pub fact_order: Vec<String>,
    /// Rules by name.
    pub rules: BTreeMap<String, Rule>,
    /// Rule exports by rule name.
    pub rule_exports: BTreeMap<String, RuleExportStmt>,
    /// Exported rule names in declaration order; `exec_policy` runs in
    /// this order.
    pub export_order: Vec<String>,
    /// Use statements keyed by their binding alias.
    pub uses: BTreeMap<String, UseStmt>,
    /// Policy-local shapes by name.
    pub shapes: BTreeMap<String, Shape>,
    /// Names already claimed in this policy, with what claimed them.
    seen: BTreeMap<String, &'static str>,
    /// Source location of the declaration.
    pub range: Range,
}

impl Policy {
    /// Builds a policy entity from its statement, enforcing body ordering
    /// and name uniqueness.
    pub fn build(stmt: &PolicyStmt, namespace: &Fqn) -> Result<Policy, IndexError> {
        let fqn = namespace.join(&stmt.name);
        let mut policy = Policy {
            name: stmt.name.clone(),
            fqn: fqn.clone(),
            namespace: namespace.clone(),
            lets: BTreeMap::new(),
            facts: BTreeMap::new(),
            fact_order: Vec::new(),
            rules: BTreeMap::new(),
            rule_exports: BTreeMap::new(),
            export_order: Vec::new(),
            uses: BTreeMap::new(),
            shapes: BTreeMap::new(),
            seen: BTreeMap::new(),
            range: stmt.range.clone(),
        };

        let mut phase = Phase::Facts;
        for body_stmt in &stmt.body {
            match body_stmt {
                Stmt::Comment(_) => {}
                Stmt::Fact(fact) => {
                    if phase != Phase::Facts {
                        return Err(IndexError::StatementOrder {
                            message: format!(
                                "fact '{}' must precede all other statements in policy '{}'",
                                fact.name, fqn
                            ),
                            range: fact.range.clone(),
                        });
                    }
                    policy.claim(&fact.name, "fact", &fact.range)?;
                    if fact.binding() != fact.name {
                        policy.claim(fact.binding(), "fact", &fact.range)?;
                    }
                    policy.fact_order.push(fact.binding().to_string());
                    policy.facts.insert(fact.binding().to_string(), fact.clone());
                }
                Stmt::Use(use_stmt) => {
                    if phase == Phase::Rest {
                        return Err(IndexError::StatementOrder {
                            message: format!(
                                "use of '{}' must immediately follow the fact block in policy '{}'",
                                use_stmt.target, fqn
                            ),
                            range: use_stmt.range.clone(),
                        });
                    }
                    phase = Phase::Uses;
                    policy.claim(use_stmt.binding(), "use", &use_stmt.range)?;
                    policy
                        .uses
                        .insert(use_stmt.binding().to_string(), use_stmt.clone());
                }
                Stmt::VarDecl(decl) => {
                    phase = Phase::Rest;
                    policy.claim(&decl.name, "let", &decl.range)?;
                    policy.lets.insert(decl.name.clone(), decl.clone());
                }
                Stmt::Rule(rule_stmt) => {
                    phase = Phase::Rest;
                    policy.claim(&rule_stmt.name, "rule", &rule_stmt.range)?;
                    policy
                        .rules
                        .insert(rule_stmt.name.clone(), Rule::from_stmt(rule_stmt, &fqn));
                }
                Stmt::RuleExport(export) => {
                    phase = Phase::Rest;
                    if policy.rule_exports.contains_key(&export.rule_name) {
                        return Err(IndexError::Conflict {
                            kind: "export",
                            name: export.rule_name.clone(),
                            existing: "export",
                            scope: fqn.to_string(),
                            range: export.range.clone(),
                        });
                    }
                    policy.export_order.push(export.rule_name.clone());
                    policy
                        .rule_exports
                        .insert(export.rule_name.clone(), export.clone());
                }
                Stmt::Shape(shape_stmt) => {
                    phase = Phase::Rest;
                    policy.claim(&shape_stmt.name, "shape", &shape_stmt.range)?;
                    let shape = Shape::from_stmt(shape_stmt, namespace, Some(&stmt.name));
                    policy.shapes.insert(shape_stmt.name.clone(), shape);
                }
                Stmt::Namespace(_) | Stmt::Policy(_) | Stmt::ShapeExport(_) => {
                    return Err(IndexError::Internal(format!(
                        "statement not allowed in policy body at {}",
                        body_stmt.range()
                    )));
                }
            }
        }

        // Every export must name a declared rule, and at least one rule
        // must be exported.
        for export in policy.rule_exports.values() {
            if !policy.rules.contains_key(&export.rule_name) {
                return Err(IndexError::UnknownRuleExport {
                    rule: export.rule_name.clone(),
                    policy: fqn.to_string(),
                    range: export.range.clone(),
                });
            }
        }
        if policy.rule_exports.is_empty() {
            return Err(IndexError::NoExportedRules {
                policy: fqn.to_string(),
            });
        }

        Ok(policy)
    }

    fn claim(
        &mut self,
        name: &str,
        kind: &'static str,
        range: &Range,
    ) -> Result<(), IndexError> {
        if let Some(existing) = self.seen.get(name) {
            return Err(IndexError::Conflict {
                kind,
                name: name.to_string(),
                existing,
                scope: self.fqn.to_string(),
                range: range.clone(),
            });
        }
        self.seen.insert(name.to_string(), kind);
        Ok(())
    }

    /// The export statement for a rule, if it is exported.
    pub fn export(&self, rule: &str) -> Option<&RuleExportStmt> {
        self.rule_exports.get(rule)
    }

    /// True when the rule is exported by this policy.
    pub fn is_exported(&self, rule: &str) -> bool {
        self.rule_exports.contains_key(rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn build_policy(body: &str) -> Result<Policy, IndexError> {
        let source = format!("namespace com/example\npolicy test {{\n{body}\n}}\n");
        let stmts = Parser::new(&source, "test.sn").parse().expect("parse");
        let Stmt::Policy(policy_stmt) = &stmts[1] else {
            panic!("expected policy");
        };
        Policy::build(policy_stmt, &Fqn::parse("com/example").unwrap())
    }

    #[test]
    fn test_minimal_policy() {
        let policy = build_policy("rule allow = true\nexport allow").unwrap();
        assert_eq!(policy.fqn.to_string(), "com/example/test");
        assert_eq!(policy.rules.len(), 1);
        assert_eq!(policy.export_order, vec!["allow"]);
    }

    #[test]
    fn test_fact_after_rule_rejected() {
        let err = build_policy("rule allow = true\nfact user: string\nexport allow").unwrap_err();
        assert!(matches!(err, IndexError::StatementOrder { .. }));
    }

    #[test]
    fn test_use_must_follow_facts() {
        let err = build_policy(
            "fact user: string\nlet x = 1\nuse other\nrule r = x\nexport r",
        )
        .unwrap_err();
        assert!(matches!(err, IndexError::StatementOrder { .. }));

        // Directly after facts is fine.
        let policy = build_policy(
            "fact user: string\nuse other\nrule r = user\nexport r",
        )
        .unwrap();
        assert_eq!(policy.uses.len(), 1);
    }

    #[test]
    fn test_use_without_facts_is_allowed() {
        let policy = build_policy("use other\nrule r = true\nexport r").unwrap();
        assert!(policy.uses.contains_key("other"));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = build_policy("let x = 1\nrule x = true\nexport x").unwrap_err();
        let IndexError::Conflict { name, existing, .. } = err else {
            panic!("expected conflict");
        };
        assert_eq!(name, "x");
        assert_eq!(existing, "let");
    }

    #[test]
    fn test_missing_export_rejected() {
        let err = build_policy("rule allow = true").unwrap_err();
        assert!(matches!(err, IndexError::NoExportedRules { .. }));
    }

    #[test]
    fn test_unknown_export_rejected() {
        let err = build_policy("rule allow = true\nexport nonexistent").unwrap_err();
        let IndexError::UnknownRuleExport { rule, .. } = err else {
            panic!("expected unknown rule export");
        };
        assert_eq!(rule, "nonexistent");
    }

    #[test]
    fn test_fact_alias_is_binding() {
        let policy = build_policy(
            "fact age as years: number\nrule r = years\nexport r",
        )
        .unwrap();
        assert!(policy.facts.contains_key("years"));
        assert_eq!(policy.fact_order, vec!["years"]);
    }

    #[test]
    fn test_export_order_preserved() {
        let policy = build_policy(
            "rule b = true\nrule a = true\nexport b\nexport a",
        )
        .unwrap();
        assert_eq!(policy.export_order, vec!["b", "a"]);
    }
}
