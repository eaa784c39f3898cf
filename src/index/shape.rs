//! Shape entities.
//!
//! A shape is a named type: either a simple alias for a type reference or
//! a complex record with ordered fields and an optional composition
//! parent. Complex shapes are hydrated at commit time, which merges the
//! parent's fields into the child.

use crate::ast::{ShapeDef, ShapeField, ShapeStmt, TypeRef};
use crate::fqn::Fqn;
use crate::token::Range;

/// A shape registered in the index.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    /// The simple name.
    pub name: String,
    /// The fully qualified name: `namespace[/policy]/name`.
    pub fqn: Fqn,
    /// The owning namespace.
    pub namespace: Fqn,
    /// The owning policy for policy-local shapes.
    pub policy: Option<String>,
    /// Alias or model.
    pub kind: ShapeKind,
    /// Set at commit time once parent fields have been merged in.
    pub hydrated: bool,
    /// Source location of the declaration.
    pub range: Range,
}

/// The two kinds of shape.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeKind {
    /// A simple alias for another type reference.
    AliasOf(TypeRef),
    /// A complex record.
    Model(ShapeModel),
}

/// The record form of a complex shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeModel {
    /// Composition parent from a `with` clause, if any.
    pub parent: Option<Fqn>,
    /// Fields in declaration order; after hydration, parent fields come
    /// first.
    pub fields: Vec<ShapeField>,
}

impl ShapeModel {
    /// Looks up a field by name.
    pub fn field(&self, name: &str) -> Option<&ShapeField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

impl Shape {
    /// Builds a shape entity from its statement.
    pub fn from_stmt(stmt: &ShapeStmt, namespace: &Fqn, policy: Option<&str>) -> Shape {
        let fqn = match policy {
            Some(policy) => namespace.join(policy).join(&stmt.name),
            None => namespace.join(&stmt.name),
        };
        let kind = match &stmt.def {
            ShapeDef::Alias(type_ref) => ShapeKind::AliasOf(type_ref.clone()),
            ShapeDef::Cmplx { parent, fields } => ShapeKind::Model(ShapeModel {
                parent: parent.clone(),
                fields: fields.clone(),
            }),
        };
        Shape {
            name: stmt.name.clone(),
            fqn,
            namespace: namespace.clone(),
            policy: policy.map(str::to_string),
            kind,
            hydrated: false,
            range: stmt.range.clone(),
        }
    }

    /// True for simple aliases.
    pub fn is_alias(&self) -> bool {
        matches!(self.kind, ShapeKind::AliasOf(_))
    }

    /// The record model, or `None` for aliases.
    pub fn model(&self) -> Option<&ShapeModel> {
        match &self.kind {
            ShapeKind::Model(model) => Some(model),
            ShapeKind::AliasOf(_) => None,
        }
    }

    /// The composition parent FQN, if this is a complex shape with one.
    pub fn parent_fqn(&self) -> Option<&Fqn> {
        self.model().and_then(|m| m.parent.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{TypeRef, TypeRefKind};

    fn string_type() -> TypeRef {
        TypeRef {
            kind: TypeRefKind::String,
            constraints: vec![],
            range: Range::default(),
        }
    }

    #[test]
    fn test_namespace_level_fqn() {
        let ns = Fqn::parse("com/example").unwrap();
        let stmt = ShapeStmt {
            name: "User".to_string(),
            def: ShapeDef::Cmplx {
                parent: None,
                fields: vec![],
            },
            range: Range::default(),
        };
        let shape = Shape::from_stmt(&stmt, &ns, None);
        assert_eq!(shape.fqn.to_string(), "com/example/User");
        assert!(!shape.is_alias());
        assert!(!shape.hydrated);
    }

    #[test]
    fn test_policy_local_fqn() {
        let ns = Fqn::parse("com/example").unwrap();
        let stmt = ShapeStmt {
            name: "Id".to_string(),
            def: ShapeDef::Alias(string_type()),
            range: Range::default(),
        };
        let shape = Shape::from_stmt(&stmt, &ns, Some("auth"));
        assert_eq!(shape.fqn.to_string(), "com/example/auth/Id");
        assert!(shape.is_alias());
        assert_eq!(shape.policy.as_deref(), Some("auth"));
    }

    #[test]
    fn test_model_field_lookup() {
        let model = ShapeModel {
            parent: None,
            fields: vec![ShapeField {
                name: "age".to_string(),
                type_ref: string_type(),
                not_nullable: false,
                required: true,
                default: None,
                range: Range::default(),
            }],
        };
        assert!(model.field("age").is_some());
        assert!(model.field("name").is_none());
    }
}
