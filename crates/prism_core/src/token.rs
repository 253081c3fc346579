//! Change tokens.
//!
//! A [`ChangeToken`] marks one version of some content. Sources take a fresh
//! token whenever their content is replaced or mutated; a consumer that cached
//! a derived resource alongside the token it was built from compares tokens by
//! value to decide whether a rebuild is needed.

use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide token counter. Zero is never handed out.
static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Explicit, monotonically increasing content version.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChangeToken(u64);

impl ChangeToken {
    /// Draws a fresh token, distinct from every token issued before it.
    #[inline]
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw token value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ChangeToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_unique_and_increasing() {
        let a = ChangeToken::next();
        let b = ChangeToken::next();
        assert_ne!(a, b);
        assert!(b > a);
        assert_ne!(a.get(), 0);
    }

    #[test]
    fn test_copies_compare_equal() {
        let a = ChangeToken::next();
        let cached = a;
        assert_eq!(a, cached);
    }
}
