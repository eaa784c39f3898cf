//! Three-valued logic.
//!
//! Every rule decision in Sentrie is a [`Trinary`]: `True`, `False`, or
//! `Unknown`. The operators follow Kleene's strong logic of indeterminacy:
//! `False` dominates `and`, `True` dominates `or`, and `Unknown` absorbs
//! everything it touches in `xor`.
//!
//! # Example
//!
//! ```rust
//! use sentrie::trinary::Trinary;
//!
//! assert_eq!(Trinary::True.and(Trinary::Unknown), Trinary::Unknown);
//! assert_eq!(Trinary::False.and(Trinary::Unknown), Trinary::False);
//! assert_eq!(Trinary::Unknown.or(Trinary::True), Trinary::True);
//! assert_eq!(Trinary::Unknown.not(), Trinary::Unknown);
//! ```

use std::fmt;

use serde::Serialize;

/// A three-valued truth value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trinary {
    /// Definitely true.
    True,
    /// Definitely false.
    False,
    /// Indeterminate: missing data, a failed guard, or a null result.
    Unknown,
}

impl Trinary {
    /// Kleene negation. `Unknown` stays `Unknown`.
    pub fn not(self) -> Trinary {
        match self {
            Trinary::True => Trinary::False,
            Trinary::False => Trinary::True,
            Trinary::Unknown => Trinary::Unknown,
        }
    }

    /// Kleene conjunction: any `False` makes the result `False`, otherwise
    /// any `Unknown` makes it `Unknown`.
    pub fn and(self, other: Trinary) -> Trinary {
        match (self, other) {
            (Trinary::False, _) | (_, Trinary::False) => Trinary::False,
            (Trinary::Unknown, _) | (_, Trinary::Unknown) => Trinary::Unknown,
            (Trinary::True, Trinary::True) => Trinary::True,
        }
    }

    /// Kleene disjunction: any `True` makes the result `True`, otherwise
    /// any `Unknown` makes it `Unknown`.
    pub fn or(self, other: Trinary) -> Trinary {
        match (self, other) {
            (Trinary::True, _) | (_, Trinary::True) => Trinary::True,
            (Trinary::Unknown, _) | (_, Trinary::Unknown) => Trinary::Unknown,
            (Trinary::False, Trinary::False) => Trinary::False,
        }
    }

    /// Exclusive or. Any `Unknown` operand makes the result `Unknown`.
    pub fn xor(self, other: Trinary) -> Trinary {
        match (self, other) {
            (Trinary::Unknown, _) | (_, Trinary::Unknown) => Trinary::Unknown,
            (a, b) => {
                if a != b {
                    Trinary::True
                } else {
                    Trinary::False
                }
            }
        }
    }

    /// True iff the value is `Trinary::True`.
    pub fn is_true(self) -> bool {
        self == Trinary::True
    }

    /// True iff the value is `Trinary::False`.
    pub fn is_false(self) -> bool {
        self == Trinary::False
    }

    /// True iff the value is `Trinary::Unknown`.
    pub fn is_unknown(self) -> bool {
        self == Trinary::Unknown
    }

    /// Coerces a signed integer: `1` is `True`, `0` is `False`, anything
    /// else is `Unknown`.
    pub fn from_i64(n: i64) -> Trinary {
        match n {
            1 => Trinary::True,
            0 => Trinary::False,
            _ => Trinary::Unknown,
        }
    }

    /// Coerces a JSON-shaped value: booleans and the integers 0/1 map to
    /// their truth value, null and every other sentinel map to `Unknown`.
    pub fn from_json(value: &serde_json::Value) -> Trinary {
        match value {
            serde_json::Value::Bool(b) => Trinary::from(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Trinary::from_i64(i),
                None => Trinary::Unknown,
            },
            _ => Trinary::Unknown,
        }
    }
}

impl From<bool> for Trinary {
    fn from(b: bool) -> Self {
        if b {
            Trinary::True
        } else {
            Trinary::False
        }
    }
}

impl fmt::Display for Trinary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trinary::True => write!(f, "true"),
            Trinary::False => write!(f, "false"),
            Trinary::Unknown => write!(f, "unknown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Trinary; 3] = [Trinary::True, Trinary::False, Trinary::Unknown];

    #[test]
    fn test_not_involution() {
        for t in ALL {
            assert_eq!(t.not().not(), t);
        }
    }

    #[test]
    fn test_and_false_dominates() {
        for t in ALL {
            assert_eq!(t.and(Trinary::False), Trinary::False);
            assert_eq!(Trinary::False.and(t), Trinary::False);
        }
        assert_eq!(Trinary::True.and(Trinary::Unknown), Trinary::Unknown);
        assert_eq!(Trinary::True.and(Trinary::True), Trinary::True);
    }

    #[test]
    fn test_or_true_dominates() {
        for t in ALL {
            assert_eq!(t.or(Trinary::True), Trinary::True);
            assert_eq!(Trinary::True.or(t), Trinary::True);
        }
        assert_eq!(Trinary::False.or(Trinary::Unknown), Trinary::Unknown);
        assert_eq!(Trinary::False.or(Trinary::False), Trinary::False);
    }

    #[test]
    fn test_commutativity_and_associativity() {
        for a in ALL {
            for b in ALL {
                assert_eq!(a.and(b), b.and(a));
                assert_eq!(a.or(b), b.or(a));
                assert_eq!(a.xor(b), b.xor(a));
                for c in ALL {
                    assert_eq!(a.and(b).and(c), a.and(b.and(c)));
                    assert_eq!(a.or(b).or(c), a.or(b.or(c)));
                }
            }
        }
    }

    #[test]
    fn test_de_morgan() {
        for a in ALL {
            for b in ALL {
                assert_eq!(a.and(b).not(), a.not().or(b.not()));
                assert_eq!(a.or(b).not(), a.not().and(b.not()));
            }
        }
    }

    #[test]
    fn test_xor_identity() {
        // a xor b = (a or b) and not (a and b)
        for a in ALL {
            for b in ALL {
                assert_eq!(a.xor(b), a.or(b).and(a.and(b).not()));
            }
        }
    }

    #[test]
    fn test_from_i64() {
        assert_eq!(Trinary::from_i64(1), Trinary::True);
        assert_eq!(Trinary::from_i64(0), Trinary::False);
        assert_eq!(Trinary::from_i64(42), Trinary::Unknown);
        assert_eq!(Trinary::from_i64(-1), Trinary::Unknown);
    }

    #[test]
    fn test_from_json() {
        use serde_json::json;
        assert_eq!(Trinary::from_json(&json!(true)), Trinary::True);
        assert_eq!(Trinary::from_json(&json!(false)), Trinary::False);
        assert_eq!(Trinary::from_json(&json!(1)), Trinary::True);
        assert_eq!(Trinary::from_json(&json!(0)), Trinary::False);
        assert_eq!(Trinary::from_json(&json!(null)), Trinary::Unknown);
        assert_eq!(Trinary::from_json(&json!("yes")), Trinary::Unknown);
        assert_eq!(Trinary::from_json(&json!(2.5)), Trinary::Unknown);
    }
}
