use serde::{Deserialize, Serialize};
use std::fmt;

/// Whole seconds since the Unix epoch.
///
/// The epoch itself doubles as the "not clocked in" sentinel, see [`Timestamp::UNSET`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const UNSET: Self = Self(0);

    pub fn from_secs(secs: i64) -> Self {
        Self(secs)
    }

    pub fn as_secs(&self) -> i64 {
        self.0
    }

    pub fn is_set(&self) -> bool {
        *self != Self::UNSET
    }

    /// Seconds from `earlier` to `self`; negative when the clock went backwards.
    pub fn seconds_since(&self, earlier: Timestamp) -> i64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
