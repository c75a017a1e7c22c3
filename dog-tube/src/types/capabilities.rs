use serde::{Deserialize, Serialize};

/// Queue capabilities - explicit feature detection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCapabilities {
    /// Support for delayed delivery (`publish_delayed`)
    pub delayed: bool,

    /// Support for priority ordering
    pub priority: bool,

    /// Support for atomic multi-job publish (`transaction`)
    pub transactions: bool,

    /// Support for returning a reserved job to the pool (`reject(true)`)
    pub requeue: bool,
}

impl QueueCapabilities {
    /// Check if a specific feature is supported
    pub fn supports(&self, feature: &str) -> bool {
        match feature {
            "delayed" => self.delayed,
            "priority" => self.priority,
            "transactions" => self.transactions,
            "requeue" => self.requeue,
            _ => false,
        }
    }
}
