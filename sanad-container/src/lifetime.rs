//! Instance lifetimes.
//!
//! - [`Lifetime::Singleton`]: one instance per implementation type, shared
//!   for as long as the resolver lives
//! - [`Lifetime::PerRequest`]: a fresh instance on every resolution
use std::fmt;

use serde::{Deserialize, Serialize};

/// How long a resolved instance is reused.
///
/// ```
/// use sanad_container::lifetime::Lifetime;
///
/// assert!(Lifetime::Singleton > Lifetime::PerRequest);
/// assert!(Lifetime::Singleton.is_cached());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lifetime {
    /// Built on first resolution, then shared.
    ///
    /// The cache is keyed by implementation type, so two singleton
    /// registrations of the same implementation hand out one instance.
    Singleton,

    /// Never cached; every resolution constructs again.
    PerRequest,
}

impl Lifetime {
    /// Returns `true` if instances are cached by the resolver.
    #[inline]
    pub fn is_cached(&self) -> bool {
        matches!(self, Lifetime::Singleton)
    }

    #[inline]
    fn ordering(&self) -> u8 {
        match self {
            Lifetime::Singleton => 1,
            Lifetime::PerRequest => 0,
        }
    }
}

impl PartialOrd for Lifetime {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

// Longer-lived sorts higher.
impl Ord for Lifetime {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.ordering().cmp(&other.ordering())
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifetime::Singleton => write!(f, "Singleton"),
            Lifetime::PerRequest => write!(f, "PerRequest"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singleton_outlives_per_request() {
        assert!(Lifetime::Singleton > Lifetime::PerRequest);
    }

    #[test]
    fn only_singleton_is_cached() {
        assert!(Lifetime::Singleton.is_cached());
        assert!(!Lifetime::PerRequest.is_cached());
    }

    #[test]
    fn lifetime_display() {
        assert_eq!(Lifetime::Singleton.to_string(), "Singleton");
        assert_eq!(Lifetime::PerRequest.to_string(), "PerRequest");
    }
}
