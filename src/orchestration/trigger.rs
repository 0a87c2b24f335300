use serde::{Deserialize, Serialize};
use std::fmt;

/// External triggers the orchestrator responds to, one per demo button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Trigger {
    /// Observed failure, then await the resource length
    Start,
    /// Await Task1, then issue and await Task2
    Sequential,
    /// Run both tasks as plain blocking calls
    Synchronous,
    /// Block the foreground on an operation that resumes on the foreground
    Deadlock,
    /// Block the foreground on an operation routed off the foreground
    DeadlockFree,
    /// Issue both tasks, then await them jointly
    JoinAll,
    /// Issue the failing operation and detach it
    FireAndForget,
}

impl Trigger {
    pub const ALL: [Trigger; 7] = [
        Trigger::Start,
        Trigger::Sequential,
        Trigger::Synchronous,
        Trigger::Deadlock,
        Trigger::DeadlockFree,
        Trigger::JoinAll,
        Trigger::FireAndForget,
    ];

    /// Whether the handler runs synchronously and holds the foreground until it returns
    pub fn blocks_foreground(&self) -> bool {
        matches!(
            self,
            Self::Synchronous | Self::Deadlock | Self::DeadlockFree | Self::FireAndForget
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Sequential => "sequential",
            Self::Synchronous => "synchronous",
            Self::Deadlock => "deadlock",
            Self::DeadlockFree => "deadlock-free",
            Self::JoinAll => "join-all",
            Self::FireAndForget => "fire-and-forget",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Trigger {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|trigger| trigger.as_str() == normalized)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(Trigger::as_str).collect();
                format!("Unknown trigger '{s}' (expected one of: {})", known.join(", "))
            })
    }
}
