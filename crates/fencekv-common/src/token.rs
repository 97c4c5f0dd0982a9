//! Fencing token type

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Fencing token issued on every successful lock acquisition.
///
/// Tokens come from one shared counter, so they are strictly increasing across
/// all resources. A token only ever compares meaningfully against other tokens
/// from the same counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FencingToken(i64);

impl FencingToken {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> i64 {
        self.0
    }

    /// True if this token was issued strictly after `other`
    pub fn is_newer_than(self, other: FencingToken) -> bool {
        self.0 > other.0
    }
}

impl From<i64> for FencingToken {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<FencingToken> for i64 {
    fn from(token: FencingToken) -> Self {
        token.0
    }
}

impl Display for FencingToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_token_ordering() {
        let older = FencingToken::new(5);
        let newer = FencingToken::new(6);

        assert!(newer.is_newer_than(older));
        assert!(!older.is_newer_than(newer));
        assert!(!older.is_newer_than(older));
        assert!(older < newer);
    }

    #[test]
    fn test_token_serializes_as_plain_integer() {
        let token = FencingToken::new(42);
        assert_eq!(serde_json::to_string(&token).unwrap(), "42");
        let parsed: FencingToken = serde_json::from_str("42").unwrap();
        assert_eq!(parsed, token);
    }

    proptest! {
        #[test]
        fn newer_than_matches_integer_order(a in any::<i64>(), b in any::<i64>()) {
            prop_assert_eq!(FencingToken::new(a).is_newer_than(FencingToken::new(b)), a > b);
        }
    }
}
