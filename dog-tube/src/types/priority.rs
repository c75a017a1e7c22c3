use serde::{Deserialize, Serialize};

/// Job priority as understood by the tube server.
///
/// Lower values are more urgent: `0` is reserved before `1`, and so on up to
/// `u32::MAX`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Priority(pub u32);

impl Priority {
    /// Most urgent priority, also the default
    pub const URGENT: Priority = Priority(0);
    pub const HIGH: Priority = Priority(256);
    pub const NORMAL: Priority = Priority(1024);
    pub const LOW: Priority = Priority(4096);
    /// Least urgent priority
    pub const LOWEST: Priority = Priority(u32::MAX);

    /// Get the numeric value sent to the broker
    pub fn value(self) -> u32 {
        self.0
    }

    /// True when `self` would be reserved before `other`
    pub fn is_more_urgent_than(self, other: Priority) -> bool {
        self.0 < other.0
    }
}

impl From<u32> for Priority {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_most_urgent() {
        assert_eq!(Priority::default(), Priority::URGENT);
        assert!(Priority::URGENT.is_more_urgent_than(Priority::NORMAL));
        assert!(!Priority::LOWEST.is_more_urgent_than(Priority::LOW));
    }
}
