//! The semantic model built from parsed programs.
//!
//! The [`Index`] registers namespaces, policies, rules, and shapes from
//! any number of programs, then validates cross-references and dependency
//! graphs, and finally commits, which hydrates shape composition. After
//! commit the index is read-only and shared with the evaluator.
//!
//! # Lifecycle
//!
//! ```text
//! Open --add_program*--> Open --validate--> Validated --commit--> Committed
//! ```
//!
//! `validate` and `commit` are once-latched: the first call runs the
//! work, later calls replay the cached outcome. A cancelled run does not
//! arm the latch.
//!
//! # Failure windows
//!
//! Name conflicts, statement-ordering violations, and unknown rule
//! exports surface at `add_program` time. Missing references, unexported
//! cross-namespace access, and cycles in the identifier, rule-import,
//! and shape-composition graphs surface at `validate` time. Duplicate
//! fields and alias composition surface at `commit` time.

mod namespace;
mod path;
mod policy;
mod rule;
mod shape;

pub use namespace::Namespace;
pub use policy::Policy;
pub use rule::Rule;
pub use shape::{Shape, ShapeKind, ShapeModel};

use std::collections::BTreeMap;

use crate::ast::{Expr, Stmt};
use crate::cancel::Cancellation;
use crate::dag::{Dag, DagError};
use crate::error::IndexError;
use crate::fqn::Fqn;
use crate::loader::Program;
use crate::token::Range;

fn dag_error(err: DagError) -> IndexError {
    match err {
        DagError::SelfLoop(key) => IndexError::Cycle {
            path: vec![key.clone(), key],
        },
        DagError::Cycle { path } => IndexError::Cycle { path },
        DagError::NodeMissing(key) => {
            IndexError::Internal(format!("dependency graph node '{key}' missing"))
        }
    }
}

/// The registry of everything a pack declares.
#[derive(Debug, Default)]
pub struct Index {
    namespaces: BTreeMap<String, Namespace>,
    validated: Option<Result<(), IndexError>>,
    committed: Option<Result<(), IndexError>>,
}

impl Index {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Iterates registered namespaces in FQN order.
    pub fn namespaces(&self) -> impl Iterator<Item = &Namespace> {
        self.namespaces.values()
    }

    /// True once `commit` has succeeded.
    pub fn is_committed(&self) -> bool {
        matches!(self.committed, Some(Ok(())))
    }

    // === Build phase ===

    /// Registers one parsed program.
    ///
    /// Idempotently creates the program's namespace and relinks
    /// parent/child adjacency, then adds shapes, policies, and shape
    /// exports. Rejected once `validate` has run.
    pub fn add_program(
        &mut self,
        ctx: &Cancellation,
        program: &Program,
    ) -> Result<(), IndexError> {
        if self.validated.is_some() {
            return Err(IndexError::Sealed);
        }
        ctx.check()?;

        let mut stmts = program.statements.iter().filter(|s| !s.is_comment());
        let ns_fqn = match stmts.next() {
            Some(Stmt::Namespace(ns)) => {
                self.ensure_namespace(&ns.fqn, &ns.range)?;
                ns.fqn.clone()
            }
            Some(other) => {
                return Err(IndexError::StatementOrder {
                    message: format!(
                        "program '{}' must begin with a namespace statement",
                        program.reference
                    ),
                    range: other.range().clone(),
                });
            }
            None => return Ok(()),
        };
        let ns_key = ns_fqn.to_string();

        for stmt in stmts {
            ctx.check()?;
            match stmt {
                Stmt::Shape(shape_stmt) => {
                    let shape = Shape::from_stmt(shape_stmt, &ns_fqn, None);
                    let ns = self.namespace_mut(&ns_key)?;
                    ns.check_name_free(&shape_stmt.name, "shape", &shape_stmt.range)?;
                    ns.shapes.insert(shape_stmt.name.clone(), shape);
                }
                Stmt::Policy(policy_stmt) => {
                    let policy = Policy::build(policy_stmt, &ns_fqn)?;
                    let ns = self.namespace_mut(&ns_key)?;
                    ns.check_name_free(&policy_stmt.name, "policy", &policy_stmt.range)?;
                    ns.policies.insert(policy_stmt.name.clone(), policy);
                }
                Stmt::ShapeExport(export) => {
                    let ns = self.namespace_mut(&ns_key)?;
                    ns.shape_exports
                        .entry(export.name.clone())
                        .or_insert_with(|| export.range.clone());
                }
                Stmt::Namespace(ns_stmt) => {
                    return Err(IndexError::StatementOrder {
                        message: format!(
                            "program '{}' declares a second namespace '{}'",
                            program.reference, ns_stmt.fqn
                        ),
                        range: ns_stmt.range.clone(),
                    });
                }
                _ => {
                    return Err(IndexError::Internal(format!(
                        "statement not allowed at top level at {}",
                        stmt.range()
                    )));
                }
            }
        }
        Ok(())
    }

    fn namespace_mut(&mut self, key: &str) -> Result<&mut Namespace, IndexError> {
        self.namespaces
            .get_mut(key)
            .ok_or_else(|| IndexError::Internal(format!("namespace '{key}' vanished")))
    }

    /// Creates a namespace if absent and rebuilds adjacency links by
    /// scanning the registered namespaces.
    fn ensure_namespace(&mut self, fqn: &Fqn, range: &Range) -> Result<(), IndexError> {
        let key = fqn.to_string();
        if self.namespaces.contains_key(&key) {
            return Ok(());
        }

        let mut parent_key: Option<String> = None;
        let mut child_keys: Vec<String> = Vec::new();
        for (other_key, other) in &self.namespaces {
            if fqn.is_child_of(&other.fqn) {
                parent_key = Some(other_key.clone());
            } else if other.fqn.is_child_of(fqn) {
                child_keys.push(other_key.clone());
            }
        }

        let mut ns = Namespace::new(fqn.clone(), range.clone());
        if let Some(pk) = &parent_key {
            if let Some(parent) = self.namespaces.get(pk) {
                parent.check_name_free(fqn.last(), "namespace", range)?;
                ns.parent = Some(parent.fqn.clone());
            }
        }
        for child_key in &child_keys {
            ns.children.insert(child_key.clone());
            if let Some(child) = self.namespaces.get_mut(child_key) {
                child.parent = Some(fqn.clone());
            }
        }
        if let Some(pk) = &parent_key {
            if let Some(parent) = self.namespaces.get_mut(pk) {
                parent.children.insert(key.clone());
            }
        }
        self.namespaces.insert(key, ns);
        Ok(())
    }

    // === Validation ===

    /// Validates the index: intra-policy identifier cycles, use and
    /// import resolution, rule-import cycles, shape-export references,
    /// and shape-composition cycles.
    ///
    /// Once-latched: the first outcome is cached and replayed, except
    /// when the run was cancelled.
    pub fn validate(&mut self, ctx: &Cancellation) -> Result<(), IndexError> {
        if let Some(cached) = &self.validated {
            return cached.clone();
        }
        let result = self.run_validate(ctx);
        if !matches!(result, Err(IndexError::Cancelled(_))) {
            self.validated = Some(result.clone());
        }
        result
    }

    fn run_validate(&self, ctx: &Cancellation) -> Result<(), IndexError> {
        for ns in self.namespaces.values() {
            ctx.check()?;
            for policy in ns.policies.values() {
                ctx.check()?;
                self.check_identifier_cycles(policy)?;
            }
        }

        self.check_rule_imports(ctx)?;

        for ns in self.namespaces.values() {
            ctx.check()?;
            for name in ns.shape_exports.keys() {
                if !ns.shapes.contains_key(name) {
                    return Err(IndexError::MissingReference {
                        kind: "shape",
                        name: name.clone(),
                        scope: ns.fqn.to_string(),
                    });
                }
            }
        }

        let shape_dag = self.build_shape_dag(ctx)?;
        let cycle = shape_dag.detect_first_cycle();
        if !cycle.is_empty() {
            return Err(IndexError::Cycle { path: cycle });
        }
        Ok(())
    }

    /// Builds the per-policy identifier graph (lets and rules) and
    /// rejects the first cycle, including direct self-references.
    fn check_identifier_cycles(&self, policy: &Policy) -> Result<(), IndexError> {
        let mut dag: Dag<String> = Dag::new();
        for name in policy.lets.keys() {
            dag.add_node(name.clone());
        }
        for name in policy.rules.keys() {
            dag.add_node(name.clone());
        }

        let add_edges = |dag: &mut Dag<String>, from: &str, expr: &Expr| {
            let mut idents = Vec::new();
            expr.free_idents(&mut idents);
            for ident in idents {
                if dag.contains(&ident) {
                    dag.add_edge(&from.to_string(), &ident).map_err(|err| {
                        qualify_cycle(dag_error(err), &policy.fqn)
                    })?;
                }
            }
            Ok::<(), IndexError>(())
        };

        for (name, decl) in &policy.lets {
            add_edges(&mut dag, name, &decl.value)?;
        }
        for (name, rule) in &policy.rules {
            add_edges(&mut dag, name, &rule.body)?;
            if let Some(when) = &rule.when {
                add_edges(&mut dag, name, when)?;
            }
            if let Some(default) = &rule.default {
                add_edges(&mut dag, name, default)?;
            }
        }

        let cycle = dag.detect_first_cycle();
        if !cycle.is_empty() {
            return Err(qualify_cycle(IndexError::Cycle { path: cycle }, &policy.fqn));
        }
        Ok(())
    }

    /// Resolves use statements and import clauses, builds the rule-import
    /// graph, and rejects the first cycle.
    fn check_rule_imports(&self, ctx: &Cancellation) -> Result<(), IndexError> {
        let mut dag: Dag<Fqn> = Dag::new();
        for ns in self.namespaces.values() {
            ctx.check()?;
            for policy in ns.policies.values() {
                for rule in policy.rules.values() {
                    dag.add_node(rule.fqn.clone());
                }
            }
        }

        for ns in self.namespaces.values() {
            ctx.check()?;
            for policy in ns.policies.values() {
                for use_stmt in policy.uses.values() {
                    if self.resolve_policy_target(&ns.fqn, &use_stmt.target).is_err() {
                        return Err(IndexError::MissingReference {
                            kind: "policy",
                            name: use_stmt.target.to_string(),
                            scope: policy.fqn.to_string(),
                        });
                    }
                }

                for rule in policy.rules.values() {
                    let Some((target_policy_fqn, target_rule)) = rule.import_target() else {
                        continue;
                    };
                    let target_policy = self
                        .resolve_policy_target(&ns.fqn, target_policy_fqn)
                        .map_err(|_| IndexError::MissingReference {
                            kind: "policy",
                            name: target_policy_fqn.to_string(),
                            scope: rule.fqn.to_string(),
                        })?;
                    let target =
                        target_policy.rules.get(target_rule).ok_or_else(|| {
                            IndexError::MissingReference {
                                kind: "rule",
                                name: format!("{}/{target_rule}", target_policy.fqn),
                                scope: rule.fqn.to_string(),
                            }
                        })?;
                    if !target_policy.is_exported(target_rule) {
                        return Err(IndexError::NotExported {
                            kind: "rule",
                            name: target_rule.to_string(),
                            scope: target_policy.fqn.to_string(),
                        });
                    }
                    dag.add_edge(&rule.fqn, &target.fqn).map_err(dag_error)?;
                }
            }
        }

        let cycle = dag.detect_first_cycle();
        if !cycle.is_empty() {
            return Err(IndexError::Cycle { path: cycle });
        }
        Ok(())
    }

    /// One node per namespace-level and policy-local shape, one edge per
    /// `with` clause.
    fn build_shape_dag(&self, ctx: &Cancellation) -> Result<Dag<Fqn>, IndexError> {
        let mut dag: Dag<Fqn> = Dag::new();
        for ns in self.namespaces.values() {
            ctx.check()?;
            for shape in ns.shapes.values() {
                dag.add_node(shape.fqn.clone());
            }
            for policy in ns.policies.values() {
                for shape in policy.shapes.values() {
                    dag.add_node(shape.fqn.clone());
                }
            }
        }

        for ns in self.namespaces.values() {
            ctx.check()?;
            let ns_shapes = ns.shapes.values();
            let policy_shapes = ns.policies.values().flat_map(|p| p.shapes.values());
            for shape in ns_shapes.chain(policy_shapes) {
                let Some(parent_fqn) = shape.parent_fqn() else {
                    continue;
                };
                let parent = self.resolve_shape_in_scope(
                    &shape.namespace,
                    shape.policy.as_deref(),
                    parent_fqn,
                )?;
                dag.add_edge(&shape.fqn, &parent.fqn).map_err(dag_error)?;
            }
        }
        Ok(dag)
    }

    // === Commit ===

    /// Hydrates shape composition in dependency order.
    ///
    /// Once-latched like `validate`; runs `validate` first if it has not
    /// run yet.
    pub fn commit(&mut self, ctx: &Cancellation) -> Result<(), IndexError> {
        if let Some(cached) = &self.committed {
            return cached.clone();
        }
        let result = self.run_commit(ctx);
        if !matches!(result, Err(IndexError::Cancelled(_))) {
            self.committed = Some(result.clone());
        }
        result
    }

    fn run_commit(&mut self, ctx: &Cancellation) -> Result<(), IndexError> {
        self.validate(ctx)?;
        let dag = self.build_shape_dag(ctx)?;
        let order = dag.topo_sort().map_err(dag_error)?;
        // Topological order puts dependents first; hydrate parents first
        // by walking it backwards.
        for key in order.iter().rev() {
            ctx.check()?;
            self.hydrate_shape(key)?;
        }
        Ok(())
    }

    fn locate_shape(&self, key: &str) -> Option<(String, Option<String>, String)> {
        for (ns_key, ns) in &self.namespaces {
            for (name, shape) in &ns.shapes {
                if shape.fqn.to_string() == key {
                    return Some((ns_key.clone(), None, name.clone()));
                }
            }
            for (policy_name, policy) in &ns.policies {
                for (name, shape) in &policy.shapes {
                    if shape.fqn.to_string() == key {
                        return Some((ns_key.clone(), Some(policy_name.clone()), name.clone()));
                    }
                }
            }
        }
        None
    }

    fn get_shape(
        &self,
        ns_key: &str,
        policy: Option<&str>,
        name: &str,
    ) -> Result<&Shape, IndexError> {
        let ns = self
            .namespaces
            .get(ns_key)
            .ok_or_else(|| IndexError::Internal(format!("namespace '{ns_key}' vanished")))?;
        let shape = match policy {
            Some(policy) => ns.policies.get(policy).and_then(|p| p.shapes.get(name)),
            None => ns.shapes.get(name),
        };
        shape.ok_or_else(|| IndexError::Internal(format!("shape '{name}' vanished")))
    }

    fn get_shape_mut(
        &mut self,
        ns_key: &str,
        policy: Option<&str>,
        name: &str,
    ) -> Result<&mut Shape, IndexError> {
        let ns = self
            .namespaces
            .get_mut(ns_key)
            .ok_or_else(|| IndexError::Internal(format!("namespace '{ns_key}' vanished")))?;
        let shape = match policy {
            Some(policy) => ns
                .policies
                .get_mut(policy)
                .and_then(|p| p.shapes.get_mut(name)),
            None => ns.shapes.get_mut(name),
        };
        shape.ok_or_else(|| IndexError::Internal(format!("shape '{name}' vanished")))
    }

    /// Merges the parent's hydrated fields into one shape's field map.
    fn hydrate_shape(&mut self, key: &str) -> Result<(), IndexError> {
        let Some((ns_key, policy_name, shape_name)) = self.locate_shape(key) else {
            return Err(IndexError::Internal(format!("shape '{key}' vanished")));
        };

        let parent_merge = {
            let shape = self.get_shape(&ns_key, policy_name.as_deref(), &shape_name)?;
            match shape.parent_fqn() {
                None => None,
                Some(parent_fqn) => {
                    let parent = self.resolve_shape_in_scope(
                        &shape.namespace,
                        shape.policy.as_deref(),
                        parent_fqn,
                    )?;
                    let Some(model) = parent.model() else {
                        return Err(IndexError::AliasComposition {
                            shape: shape.fqn.to_string(),
                            parent: parent.fqn.to_string(),
                        });
                    };
                    Some((parent.fqn.to_string(), model.fields.clone()))
                }
            }
        };

        let shape = self.get_shape_mut(&ns_key, policy_name.as_deref(), &shape_name)?;
        if let Some((parent_fqn, parent_fields)) = parent_merge {
            let ShapeKind::Model(model) = &mut shape.kind else {
                return Err(IndexError::Internal(format!(
                    "alias shape '{key}' has a composition parent"
                )));
            };
            for field in &parent_fields {
                if model.field(&field.name).is_some() {
                    return Err(IndexError::DuplicateField {
                        shape: key.to_string(),
                        field: field.name.clone(),
                        parent: parent_fqn,
                    });
                }
            }
            let own = std::mem::take(&mut model.fields);
            let mut merged = parent_fields;
            merged.extend(own);
            model.fields = merged;
        }
        shape.hydrated = true;
        Ok(())
    }

    // === Resolution ===

    /// Looks up a namespace by exact FQN.
    pub fn resolve_namespace(&self, fqn: &Fqn) -> Result<&Namespace, IndexError> {
        self.namespaces
            .get(&fqn.to_string())
            .ok_or_else(|| IndexError::NamespaceNotFound {
                path: fqn.to_string(),
            })
    }

    /// Looks up a policy in exactly the given namespace; no parent
    /// traversal.
    pub fn resolve_policy(&self, ns: &Fqn, name: &str) -> Result<&Policy, IndexError> {
        let namespace = self.resolve_namespace(ns)?;
        namespace
            .policies
            .get(name)
            .ok_or_else(|| IndexError::PolicyNotFound {
                path: format!("{ns}/{name}"),
            })
    }

    /// Looks up a namespace-level shape. Callers resolving across
    /// namespaces must additionally call
    /// [`Namespace::verify_shape_exported`].
    pub fn resolve_shape(&self, ns: &Fqn, name: &str) -> Result<&Shape, IndexError> {
        let namespace = self.resolve_namespace(ns)?;
        namespace
            .shapes
            .get(name)
            .ok_or_else(|| IndexError::ShapeNotFound {
                name: name.to_string(),
                namespace: ns.to_string(),
            })
    }

    /// Resolves a policy reference from `from_ns`: a single-segment
    /// target names a policy in `from_ns`, a longer one is
    /// namespace-qualified.
    pub fn resolve_policy_target(
        &self,
        from_ns: &Fqn,
        target: &Fqn,
    ) -> Result<&Policy, IndexError> {
        if target.len() == 1 {
            self.resolve_policy(from_ns, target.last())
        } else {
            let ns = target.parent().ok_or_else(|| {
                IndexError::Internal("policy target without namespace".to_string())
            })?;
            self.resolve_policy(&ns, target.last())
        }
    }

    /// Resolves a shape reference from a scope: policy-local shapes
    /// first, then the scope's namespace, then another namespace if the
    /// shape is exported there.
    pub fn resolve_shape_in_scope(
        &self,
        ns: &Fqn,
        policy: Option<&str>,
        target: &Fqn,
    ) -> Result<&Shape, IndexError> {
        if target.len() == 1 {
            let name = target.last();
            if let Some(policy_name) = policy {
                let local = self
                    .namespaces
                    .get(&ns.to_string())
                    .and_then(|n| n.policies.get(policy_name))
                    .and_then(|p| p.shapes.get(name));
                if let Some(shape) = local {
                    return Ok(shape);
                }
            }
            return self.resolve_shape(ns, name);
        }

        let target_ns_fqn = target
            .parent()
            .ok_or_else(|| IndexError::Internal("shape target without namespace".to_string()))?;
        let name = target.last();
        let target_ns = self.resolve_namespace(&target_ns_fqn)?;
        let shape = target_ns
            .shapes
            .get(name)
            .ok_or_else(|| IndexError::ShapeNotFound {
                name: name.to_string(),
                namespace: target_ns_fqn.to_string(),
            })?;
        if target_ns.fqn != *ns {
            target_ns.verify_shape_exported(name)?;
        }
        Ok(shape)
    }
}

/// Prefixes an identifier-cycle path with the policy FQN so the error
/// names full paths.
fn qualify_cycle(err: IndexError, policy: &Fqn) -> IndexError {
    match err {
        IndexError::Cycle { path } => IndexError::Cycle {
            path: path.iter().map(|n| format!("{policy}/{n}")).collect(),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::parse_program;

    fn program(source: &str) -> Program {
        parse_program(source, "test.sn").expect("parse")
    }

    fn index_of(sources: &[&str]) -> Result<Index, IndexError> {
        let ctx = Cancellation::new();
        let mut index = Index::new();
        for source in sources {
            index.add_program(&ctx, &program(source))?;
        }
        Ok(index)
    }

    #[test]
    fn test_add_program_registers_entities() {
        let index = index_of(&[r#"
namespace com/example

shape User { name: string }

policy auth {
  fact user: string
  rule allow = true
  export allow
}
"#])
        .unwrap();
        let ns = index
            .resolve_namespace(&Fqn::parse("com/example").unwrap())
            .unwrap();
        assert!(ns.shapes.contains_key("User"));
        assert!(ns.policies.contains_key("auth"));
    }

    #[test]
    fn test_namespace_adjacency_relinks_in_any_order() {
        // Child registered before parent.
        let index = index_of(&[
            "namespace com/example/sub\npolicy admin { rule check = true\nexport check }",
            "namespace com/example\npolicy auth { rule allow = true\nexport allow }",
        ])
        .unwrap();
        let parent = index
            .resolve_namespace(&Fqn::parse("com/example").unwrap())
            .unwrap();
        assert!(parent.children.contains("com/example/sub"));
        let child = index
            .resolve_namespace(&Fqn::parse("com/example/sub").unwrap())
            .unwrap();
        assert_eq!(child.parent.as_ref().unwrap().to_string(), "com/example");
    }

    #[test]
    fn test_policy_name_conflicts_with_child_namespace() {
        let err = index_of(&[
            "namespace com/example\npolicy sub { rule r = true\nexport r }",
            "namespace com/example/sub\npolicy p { rule r = true\nexport r }",
        ])
        .unwrap_err();
        assert!(matches!(err, IndexError::Conflict { .. }));
    }

    #[test]
    fn test_duplicate_policy_rejected() {
        let err = index_of(&[
            "namespace ns\npolicy p { rule r = true\nexport r }",
            "namespace ns\npolicy p { rule r = true\nexport r }",
        ])
        .unwrap_err();
        assert!(matches!(err, IndexError::Conflict { .. }));
    }

    #[test]
    fn test_sealed_after_validate() {
        let ctx = Cancellation::new();
        let mut index =
            index_of(&["namespace ns\npolicy p { rule r = true\nexport r }"]).unwrap();
        index.validate(&ctx).unwrap();
        let err = index
            .add_program(&ctx, &program("namespace other\npolicy q { rule r = true\nexport r }"))
            .unwrap_err();
        assert_eq!(err, IndexError::Sealed);
    }

    #[test]
    fn test_validate_is_idempotent() {
        let ctx = Cancellation::new();
        let mut index = index_of(&[
            "namespace ns\nshape A with B { a: string }\nshape B with A { b: string }\npolicy p { rule r = true\nexport r }",
        ])
        .unwrap();
        let first = index.validate(&ctx).unwrap_err();
        let second = index.validate(&ctx).unwrap_err();
        assert_eq!(first, second);
    }

    #[test]
    fn test_shape_cycle_detected() {
        let ctx = Cancellation::new();
        let mut index = index_of(&[
            "namespace ns\nshape A with B { a: string }\nshape B with A { b: string }\npolicy p { rule r = true\nexport r }",
        ])
        .unwrap();
        let err = index.validate(&ctx).unwrap_err();
        let IndexError::Cycle { path } = err else {
            panic!("expected cycle, got {err:?}");
        };
        assert!(path.iter().any(|p| p.ends_with("/A")));
        assert!(path.iter().any(|p| p.ends_with("/B")));
    }

    #[test]
    fn test_rule_import_cycle_detected() {
        let ctx = Cancellation::new();
        let mut index = index_of(&[r#"
namespace ns
policy p1 {
  rule r1 = from p2 use r2
  export r1
}
policy p2 {
  rule r2 = from p1 use r1
  export r2
}
"#])
        .unwrap();
        let err = index.validate(&ctx).unwrap_err();
        assert!(matches!(err, IndexError::Cycle { .. }));
    }

    #[test]
    fn test_import_of_unexported_rule_rejected() {
        let ctx = Cancellation::new();
        let mut index = index_of(&[r#"
namespace ns
policy p1 {
  rule r1 = from p2 use hidden
  export r1
}
policy p2 {
  rule hidden = true
  rule visible = true
  export visible
}
"#])
        .unwrap();
        let err = index.validate(&ctx).unwrap_err();
        let IndexError::NotExported { name, .. } = err else {
            panic!("expected not-exported, got {err:?}");
        };
        assert_eq!(name, "hidden");
    }

    #[test]
    fn test_let_cycle_detected() {
        let ctx = Cancellation::new();
        let mut index = index_of(&[r#"
namespace ns
policy p {
  let a = b + 1
  let b = a + 1
  rule r = a
  export r
}
"#])
        .unwrap();
        let err = index.validate(&ctx).unwrap_err();
        let IndexError::Cycle { path } = err else {
            panic!("expected cycle, got {err:?}");
        };
        assert!(path.iter().all(|p| p.starts_with("ns/p/")));
    }

    #[test]
    fn test_let_self_reference_detected() {
        let ctx = Cancellation::new();
        let mut index = index_of(&[
            "namespace ns\npolicy p {\n let a = a + 1\n rule r = a\n export r\n}",
        ])
        .unwrap();
        let err = index.validate(&ctx).unwrap_err();
        assert!(matches!(err, IndexError::Cycle { .. }));
    }

    #[test]
    fn test_commit_hydrates_composition() {
        let ctx = Cancellation::new();
        let mut index = index_of(&[r#"
namespace ns

shape Base { id: string }
shape User with Base { name: string }

policy p { rule r = true
export r }
"#])
        .unwrap();
        index.commit(&ctx).unwrap();

        let ns = index.resolve_namespace(&Fqn::single("ns")).unwrap();
        let user = &ns.shapes["User"];
        assert!(user.hydrated);
        let model = user.model().unwrap();
        assert_eq!(model.fields.len(), 2);
        // Parent fields come first.
        assert_eq!(model.fields[0].name, "id");
        assert_eq!(model.fields[1].name, "name");
    }

    #[test]
    fn test_commit_rejects_duplicate_field() {
        let ctx = Cancellation::new();
        let mut index = index_of(&[r#"
namespace ns
shape Base { id: string }
shape User with Base { id: string }
policy p { rule r = true
export r }
"#])
        .unwrap();
        let err = index.commit(&ctx).unwrap_err();
        let IndexError::DuplicateField { field, .. } = err else {
            panic!("expected duplicate field, got {err:?}");
        };
        assert_eq!(field, "id");
    }

    #[test]
    fn test_commit_rejects_alias_composition() {
        let ctx = Cancellation::new();
        let mut index = index_of(&[r#"
namespace ns
shape Id = string
shape User with Id { name: string }
policy p { rule r = true
export r }
"#])
        .unwrap();
        let err = index.commit(&ctx).unwrap_err();
        assert!(matches!(err, IndexError::AliasComposition { .. }));
    }

    #[test]
    fn test_commit_is_idempotent() {
        let ctx = Cancellation::new();
        let mut index =
            index_of(&["namespace ns\npolicy p { rule r = true\nexport r }"]).unwrap();
        assert_eq!(index.commit(&ctx), Ok(()));
        assert_eq!(index.commit(&ctx), Ok(()));
        assert!(index.is_committed());
    }

    #[test]
    fn test_cross_namespace_shape_requires_export() {
        let ctx = Cancellation::new();
        let mut index = index_of(&[
            "namespace a\nshape Hidden { x: string }\npolicy p { rule r = true\nexport r }",
            "namespace b\nshape Mine with a/Hidden { y: string }\npolicy p { rule r = true\nexport r }",
        ])
        .unwrap();
        let err = index.validate(&ctx).unwrap_err();
        assert!(matches!(err, IndexError::NotExported { .. }));
    }

    #[test]
    fn test_cross_namespace_shape_with_export() {
        let ctx = Cancellation::new();
        let mut index = index_of(&[
            "namespace a\nshape Shared { x: string }\nexport shape Shared\npolicy p { rule r = true\nexport r }",
            "namespace b\nshape Mine with a/Shared { y: string }\npolicy p { rule r = true\nexport r }",
        ])
        .unwrap();
        index.commit(&ctx).unwrap();
        let ns = index.resolve_namespace(&Fqn::single("b")).unwrap();
        let model = ns.shapes["Mine"].model().unwrap();
        assert_eq!(model.fields.len(), 2);
    }

    #[test]
    fn test_validate_on_empty_index_succeeds() {
        let ctx = Cancellation::new();
        let mut index = Index::new();
        assert_eq!(index.validate(&ctx), Ok(()));
    }

    #[test]
    fn test_cancellation_does_not_arm_latch() {
        let mut index =
            index_of(&["namespace ns\npolicy p { rule r = true\nexport r }"]).unwrap();
        let cancelled = Cancellation::new();
        cancelled.cancel();
        let err = index.validate(&cancelled).unwrap_err();
        assert!(matches!(err, IndexError::Cancelled(_)));
        // A fresh token succeeds because the latch was not armed.
        assert_eq!(index.validate(&Cancellation::new()), Ok(()));
    }

    #[test]
    fn test_shape_export_must_reference_existing_shape() {
        let ctx = Cancellation::new();
        let mut index = index_of(&[
            "namespace ns\nexport shape Ghost\npolicy p { rule r = true\nexport r }",
        ])
        .unwrap();
        let err = index.validate(&ctx).unwrap_err();
        assert!(matches!(err, IndexError::MissingReference { kind: "shape", .. }));
    }
}
