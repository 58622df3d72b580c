//! # Reconnect attempt ceiling.
//!
//! [`AttemptLimit`] decides when the supervisor stops retrying and parks the
//! connection in `ClosedTerminal`.
//!
//! ```text
//! AttemptLimit::Unbounded  → retry forever (backoff still applies)
//! AttemptLimit::Max(n)     → give up once n consecutive attempts failed
//! ```
//!
//! The counter it is checked against resets on every successful open.

/// Ceiling on consecutive failed connection attempts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttemptLimit {
    /// Never give up.
    Unbounded,
    /// Give up once this many consecutive attempts failed.
    Max(u32),
}

impl Default for AttemptLimit {
    /// Returns `AttemptLimit::Max(10)`.
    fn default() -> Self {
        AttemptLimit::Max(10)
    }
}

impl AttemptLimit {
    /// Returns `true` if another attempt may start after `failed` consecutive failures.
    #[inline]
    pub fn allows(&self, failed: u32) -> bool {
        match self {
            AttemptLimit::Unbounded => true,
            AttemptLimit::Max(max) => failed < *max,
        }
    }

    /// Returns the ceiling as an `Option` (`None` = unbounded).
    #[inline]
    pub fn as_option(&self) -> Option<u32> {
        match self {
            AttemptLimit::Unbounded => None,
            AttemptLimit::Max(max) => Some(*max),
        }
    }
}

impl From<Option<u32>> for AttemptLimit {
    fn from(value: Option<u32>) -> Self {
        value.map_or(AttemptLimit::Unbounded, AttemptLimit::Max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_allows_until_reached() {
        let limit = AttemptLimit::Max(3);
        assert!(limit.allows(0));
        assert!(limit.allows(2));
        assert!(!limit.allows(3));
        assert!(!limit.allows(4));
    }

    #[test]
    fn zero_max_never_retries() {
        assert!(!AttemptLimit::Max(0).allows(0));
    }

    #[test]
    fn unbounded_always_allows() {
        assert!(AttemptLimit::Unbounded.allows(u32::MAX));
        assert_eq!(AttemptLimit::from(None), AttemptLimit::Unbounded);
        assert_eq!(AttemptLimit::from(Some(4)).as_option(), Some(4));
    }
}
