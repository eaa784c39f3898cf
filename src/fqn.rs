//! Fully qualified names.
//!
//! An [`Fqn`] is an ordered, non-empty sequence of identifier segments
//! joined by `/`. Namespaces, policies, rules, and shapes are all addressed
//! by FQN, and namespace nesting is expressed through segment prefixes:
//! `com/example/auth` is a child of `com/example`.

use std::fmt;

use serde::Serialize;

/// A slash-separated fully qualified name.
///
/// Two FQNs compare by segment-wise equality. The last segment is the
/// simple name of the entity.
///
/// # Example
///
/// ```rust
/// use sentrie::fqn::Fqn;
///
/// let ns = Fqn::parse("com/example").unwrap();
/// let child = ns.join("auth");
/// assert!(child.is_child_of(&ns));
/// assert_eq!(child.last(), "auth");
/// assert_eq!(child.to_string(), "com/example/auth");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fqn {
    segments: Vec<String>,
}

impl Fqn {
    /// Builds an FQN from pre-validated segments.
    ///
    /// Returns `None` if `segments` is empty or any segment is empty.
    pub fn new(segments: Vec<String>) -> Option<Self> {
        if segments.is_empty() || segments.iter().any(String::is_empty) {
            return None;
        }
        Some(Self { segments })
    }

    /// Parses a slash-separated path, skipping empty segments.
    ///
    /// Returns `None` when no non-empty segment remains.
    pub fn parse(path: &str) -> Option<Self> {
        let segments: Vec<String> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self::new(segments)
    }

    /// Builds a single-segment FQN.
    pub fn single(name: impl Into<String>) -> Self {
        Self {
            segments: vec![name.into()],
        }
    }

    /// The segments of this name, in order.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// FQNs are never empty; this exists for clippy symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The last segment, i.e. the simple name.
    pub fn last(&self) -> &str {
        // Construction guarantees at least one segment.
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Returns a new FQN with `name` appended.
    pub fn join(&self, name: impl Into<String>) -> Fqn {
        let mut segments = self.segments.clone();
        segments.push(name.into());
        Fqn { segments }
    }

    /// The parent of this name, or `None` for a single-segment FQN.
    pub fn parent(&self) -> Option<Fqn> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(Fqn {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// True iff `self` strictly extends `other` by exactly one segment.
    pub fn is_child_of(&self, other: &Fqn) -> bool {
        self.segments.len() == other.segments.len() + 1
            && self.segments[..other.segments.len()] == other.segments[..]
    }

    /// True iff `other` strictly extends `self` by exactly one segment.
    pub fn is_parent_of(&self, other: &Fqn) -> bool {
        other.is_child_of(self)
    }

    /// True iff `other` is a (non-strict) prefix of `self`.
    pub fn starts_with(&self, other: &Fqn) -> bool {
        self.segments.len() >= other.segments.len()
            && self.segments[..other.segments.len()] == other.segments[..]
    }
}

impl fmt::Display for Fqn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

impl Serialize for Fqn {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let fqn = Fqn::parse("com/example/auth").unwrap();
        assert_eq!(fqn.segments(), &["com", "example", "auth"]);
        assert_eq!(fqn.to_string(), "com/example/auth");
        assert_eq!(fqn.last(), "auth");
    }

    #[test]
    fn test_parse_skips_empty_segments() {
        let fqn = Fqn::parse("/com//example/").unwrap();
        assert_eq!(fqn.to_string(), "com/example");
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert_eq!(Fqn::parse(""), None);
        assert_eq!(Fqn::parse("///"), None);
    }

    #[test]
    fn test_child_parent_relationship() {
        let parent = Fqn::parse("com/example").unwrap();
        let child = Fqn::parse("com/example/sub").unwrap();
        let grandchild = Fqn::parse("com/example/sub/deep").unwrap();

        assert!(child.is_child_of(&parent));
        assert!(parent.is_parent_of(&child));
        assert!(!grandchild.is_child_of(&parent));
        assert!(!parent.is_child_of(&child));
        assert!(!parent.is_child_of(&parent));
    }

    #[test]
    fn test_join_and_parent() {
        let ns = Fqn::parse("com/example").unwrap();
        let policy = ns.join("auth");
        assert_eq!(policy.to_string(), "com/example/auth");
        assert_eq!(policy.parent(), Some(ns));
        assert_eq!(Fqn::single("root").parent(), None);
    }

    #[test]
    fn test_starts_with() {
        let long = Fqn::parse("com/example/sub/admin").unwrap();
        let prefix = Fqn::parse("com/example").unwrap();
        assert!(long.starts_with(&prefix));
        assert!(long.starts_with(&long));
        assert!(!prefix.starts_with(&long));
    }
}
