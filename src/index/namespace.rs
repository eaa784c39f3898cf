//! Namespace entities.
//!
//! Namespaces are stored in a flat map on the index, keyed by FQN;
//! `parent` and `children` are lookup keys into that map, not owning
//! references. Adjacency is rebuilt by scanning existing namespaces
//! whenever one is inserted.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::IndexError;
use crate::fqn::Fqn;
use crate::index::policy::Policy;
use crate::index::shape::Shape;
use crate::token::Range;

/// A namespace registered in the index.
#[derive(Debug, Clone, PartialEq)]
pub struct Namespace {
    /// The namespace FQN.
    pub fqn: Fqn,
    /// The direct parent namespace's FQN, when it is registered.
    pub parent: Option<Fqn>,
    /// FQN keys of registered direct children.
    pub children: BTreeSet<String>,
    /// Policies by name.
    pub policies: BTreeMap<String, Policy>,
    /// Namespace-level shapes by name.
    pub shapes: BTreeMap<String, Shape>,
    /// Exported shape names with the export statement's location.
    pub shape_exports: BTreeMap<String, Range>,
    /// Location of the namespace statement that created this entry.
    pub range: Range,
}

impl Namespace {
    /// Creates an empty namespace.
    pub fn new(fqn: Fqn, range: Range) -> Self {
        Namespace {
            fqn,
            parent: None,
            children: BTreeSet::new(),
            policies: BTreeMap::new(),
            shapes: BTreeMap::new(),
            shape_exports: BTreeMap::new(),
            range,
        }
    }

    /// Checks that `name` is free across policies, namespace-level
    /// shapes, and direct child namespaces.
    pub fn check_name_free(
        &self,
        name: &str,
        kind: &'static str,
        range: &Range,
    ) -> Result<(), IndexError> {
        let existing = if self.policies.contains_key(name) {
            Some("policy")
        } else if self.shapes.contains_key(name) {
            Some("shape")
        } else if self
            .children
            .iter()
            .any(|child| child.rsplit('/').next() == Some(name))
        {
            Some("namespace")
        } else {
            None
        };
        match existing {
            Some(existing) => Err(IndexError::Conflict {
                kind,
                name: name.to_string(),
                existing,
                scope: self.fqn.to_string(),
                range: range.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Verifies that a shape is exported from this namespace, for
    /// cross-namespace references.
    pub fn verify_shape_exported(&self, name: &str) -> Result<(), IndexError> {
        if self.shape_exports.contains_key(name) {
            Ok(())
        } else {
            Err(IndexError::NotExported {
                kind: "shape",
                name: name.to_string(),
                scope: self.fqn.to_string(),
            })
        }
    }

    /// Iterates policies in name order.
    pub fn policies(&self) -> impl Iterator<Item = &Policy> {
        self.policies.values()
    }
}
