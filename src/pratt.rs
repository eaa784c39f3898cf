//! Binding powers for Pratt expression parsing.
//!
//! Operators are assigned binding-power pairs that determine precedence
//! and associativity: higher power binds tighter, and for an infix pair
//! `(left, right)`, `left < right` makes the operator left-associative
//! under the standard `min_bp` loop.
//!
//! # Precedence ladder
//!
//! From loosest to tightest:
//! 1. Ternary `?:` (handled outside the loop)
//! 2. `or`
//! 3. `xor`
//! 4. `and`
//! 5. Equality `==` `!=`
//! 6. Comparison `<` `<=` `>` `>=`
//! 7. Membership `in` `contains` `matches`
//! 8. Additive `+` `-`
//! 9. Multiplicative `*` `/` `%`
//! 10. Unary `not` `-`
//! 11. Postfix `.` `(` `[` `is`

use crate::token::TokenKind;

/// Binding power of unary prefix operators (`not`, `-`).
pub const PREFIX_BP: u8 = 19;

/// Binding power of postfix operators (call, field access, index, `is`).
pub const POSTFIX_BP: u8 = 21;

/// Returns `(left, right)` binding powers for infix operators, or `None`
/// when the token is not an infix operator.
pub fn infix_binding_power(op: TokenKind) -> Option<(u8, u8)> {
    Some(match op {
        TokenKind::Or => (3, 4),
        TokenKind::Xor => (5, 6),
        TokenKind::And => (7, 8),
        TokenKind::Eq | TokenKind::NotEq => (9, 10),
        TokenKind::Lt | TokenKind::LtEq | TokenKind::Gt | TokenKind::GtEq => (11, 12),
        TokenKind::In | TokenKind::Contains | TokenKind::Matches => (13, 14),
        TokenKind::Plus | TokenKind::Minus => (15, 16),
        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => (17, 18),
        _ => return None,
    })
}

/// Returns the binding power for prefix operators, or `None`.
pub fn prefix_binding_power(op: TokenKind) -> Option<u8> {
    match op {
        TokenKind::Not | TokenKind::Minus => Some(PREFIX_BP),
        _ => None,
    }
}

/// Returns the binding power for postfix operators, or `None`.
pub fn postfix_binding_power(op: TokenKind) -> Option<u8> {
    match op {
        TokenKind::Dot | TokenKind::LParen | TokenKind::LBracket | TokenKind::Is => {
            Some(POSTFIX_BP)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infix_operators_are_left_associative() {
        for kind in [
            TokenKind::Or,
            TokenKind::And,
            TokenKind::Plus,
            TokenKind::Star,
        ] {
            let (left, right) = infix_binding_power(kind).unwrap();
            assert!(left < right, "{kind} should be left associative");
        }
    }

    #[test]
    fn test_precedence_order() {
        let or = infix_binding_power(TokenKind::Or).unwrap().0;
        let xor = infix_binding_power(TokenKind::Xor).unwrap().0;
        let and = infix_binding_power(TokenKind::And).unwrap().0;
        let eq = infix_binding_power(TokenKind::Eq).unwrap().0;
        let cmp = infix_binding_power(TokenKind::Lt).unwrap().0;
        let mem = infix_binding_power(TokenKind::In).unwrap().0;
        let add = infix_binding_power(TokenKind::Plus).unwrap().0;
        let mul = infix_binding_power(TokenKind::Star).unwrap().0;

        assert!(or < xor && xor < and && and < eq);
        assert!(eq < cmp && cmp < mem && mem < add && add < mul);
        assert!(mul < PREFIX_BP && PREFIX_BP < POSTFIX_BP);
    }

    #[test]
    fn test_prefix_and_postfix() {
        assert_eq!(prefix_binding_power(TokenKind::Not), Some(PREFIX_BP));
        assert_eq!(prefix_binding_power(TokenKind::Minus), Some(PREFIX_BP));
        assert_eq!(prefix_binding_power(TokenKind::Plus), None);
        assert_eq!(postfix_binding_power(TokenKind::Dot), Some(POSTFIX_BP));
        assert_eq!(postfix_binding_power(TokenKind::Is), Some(POSTFIX_BP));
        assert_eq!(postfix_binding_power(TokenKind::Comma), None);
    }

    #[test]
    fn test_non_operators() {
        assert_eq!(infix_binding_power(TokenKind::Policy), None);
        assert_eq!(infix_binding_power(TokenKind::Question), None);
    }
}
