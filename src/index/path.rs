//! Slash-path resolution to (namespace, policy, rule).
//!
//! A decision query addresses a rule by a single slash-separated string,
//! e.g. `com/example/auth/allow`. The namespace portion is found by the
//! longest registered prefix; the next segment names the policy, the one
//! after (if present) the rule, and anything beyond is ignored.

use crate::error::IndexError;
use crate::index::{Index, Namespace, Policy};

impl Index {
    /// Decomposes a slash-separated path against the registered
    /// namespaces.
    ///
    /// Empty segments are skipped. Returns the matched namespace, the
    /// policy, and the rule name when one follows the policy segment.
    pub fn resolve_segments(
        &self,
        path: &str,
    ) -> Result<(&Namespace, &Policy, Option<String>), IndexError> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        // Longest prefix that names a registered namespace.
        let mut matched: Option<(usize, &Namespace)> = None;
        let mut prefix = String::new();
        for (i, segment) in segments.iter().enumerate() {
            if i > 0 {
                prefix.push('/');
            }
            prefix.push_str(segment);
            if let Some(ns) = self.namespaces().find(|n| n.fqn.to_string() == prefix) {
                matched = Some((i + 1, ns));
            }
        }
        let Some((consumed, namespace)) = matched else {
            return Err(IndexError::NamespaceNotFound {
                path: path.to_string(),
            });
        };

        let Some(policy_name) = segments.get(consumed) else {
            return Err(IndexError::PolicyNotFound {
                path: path.to_string(),
            });
        };
        let Some(policy) = namespace.policies.get(*policy_name) else {
            return Err(IndexError::PolicyNotFound {
                path: path.to_string(),
            });
        };

        let rule = segments.get(consumed + 1).map(|s| (*s).to_string());
        Ok((namespace, policy, rule))
    }
}

#[cfg(test)]
mod tests {
    use crate::cancel::Cancellation;
    use crate::error::IndexError;
    use crate::index::Index;
    use crate::loader::parse_program;

    fn index() -> Index {
        let ctx = Cancellation::new();
        let mut index = Index::new();
        let sources = [
            "namespace com/example\npolicy auth { rule allow = true\nexport allow }",
            "namespace com/example/sub\npolicy admin { rule check = true\nexport check }",
        ];
        for source in sources {
            let program = parse_program(source, "test.sn").unwrap();
            index.add_program(&ctx, &program).unwrap();
        }
        index
    }

    #[test]
    fn test_longest_prefix_wins() {
        let index = index();
        let (ns, policy, rule) = index.resolve_segments("com/example/sub/admin/check").unwrap();
        assert_eq!(ns.fqn.to_string(), "com/example/sub");
        assert_eq!(policy.name, "admin");
        assert_eq!(rule.as_deref(), Some("check"));
    }

    #[test]
    fn test_shorter_prefix_still_resolves() {
        let index = index();
        let (ns, policy, rule) = index.resolve_segments("com/example/auth/allow").unwrap();
        assert_eq!(ns.fqn.to_string(), "com/example");
        assert_eq!(policy.name, "auth");
        assert_eq!(rule.as_deref(), Some("allow"));
    }

    #[test]
    fn test_extra_segments_ignored() {
        let index = index();
        let (_, policy, rule) = index
            .resolve_segments("com/example/auth/allow/extra/ignored")
            .unwrap();
        assert_eq!(policy.name, "auth");
        assert_eq!(rule.as_deref(), Some("allow"));
    }

    #[test]
    fn test_empty_segments_skipped() {
        let index = index();
        let (_, policy, _) = index.resolve_segments("//com//example/auth//allow").unwrap();
        assert_eq!(policy.name, "auth");
    }

    #[test]
    fn test_missing_rule_segment() {
        let index = index();
        let (_, policy, rule) = index.resolve_segments("com/example/auth").unwrap();
        assert_eq!(policy.name, "auth");
        assert_eq!(rule, None);
    }

    #[test]
    fn test_namespace_not_found() {
        let index = index();
        let err = index.resolve_segments("org/unknown/policy").unwrap_err();
        assert!(matches!(err, IndexError::NamespaceNotFound { .. }));
    }

    #[test]
    fn test_policy_not_found() {
        let index = index();
        // The namespace resolves but no policy segment follows.
        let err = index.resolve_segments("com/example").unwrap_err();
        assert!(matches!(err, IndexError::PolicyNotFound { .. }));

        let err = index.resolve_segments("com/example/nonexistent").unwrap_err();
        assert!(matches!(err, IndexError::PolicyNotFound { .. }));
    }
}
