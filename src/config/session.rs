//! Session store configuration.

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Session store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Idle time after which a session is garbage-collected.
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,

    /// How often the eviction sweep runs.
    #[serde(default = "default_eviction_interval")]
    pub eviction_interval_secs: u64,
}

impl SessionConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn eviction_interval(&self) -> Duration {
        Duration::from_secs(self.eviction_interval_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.ttl_secs == 0 {
            return Err(ValidationError::invalid("session.ttl_secs", "must be positive"));
        }
        if self.eviction_interval_secs == 0 {
            return Err(ValidationError::invalid(
                "session.eviction_interval_secs",
                "must be positive",
            ));
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl(),
            eviction_interval_secs: default_eviction_interval(),
        }
    }
}

fn default_ttl() -> u64 {
    1800
}

fn default_eviction_interval() -> u64 {
    300
}
