//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables for one [`EntityEngine`](crate::EntityEngine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Delay between spawning a shoulder decoration and linking it to its
    /// player. Clients that have not yet rendered the player drop links that
    /// arrive earlier.
    pub link_delay_ms: u64,
    /// Delay before an unlisted player's roster entry is withdrawn.
    pub roster_removal_delay_ms: u64,
    /// Upper bound of the synthetic absorption attribute. Higher than the
    /// target protocol's own ceiling because source-side modifiers exceed it.
    pub absorption_max: f32,
}

impl EngineConfig {
    pub const DEFAULT_LINK_DELAY_MS: u64 = 500;
    pub const DEFAULT_ABSORPTION_MAX: f32 = 1024.0;

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the shoulder link delay.
    #[must_use]
    pub fn with_link_delay(mut self, delay: Duration) -> Self {
        self.link_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Override the roster removal delay.
    #[must_use]
    pub fn with_roster_removal_delay(mut self, delay: Duration) -> Self {
        self.roster_removal_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Override the absorption attribute ceiling.
    #[must_use]
    pub fn with_absorption_max(mut self, max: f32) -> Self {
        self.absorption_max = max;
        self
    }

    #[must_use]
    pub fn link_delay(&self) -> Duration {
        Duration::from_millis(self.link_delay_ms)
    }

    #[must_use]
    pub fn roster_removal_delay(&self) -> Duration {
        Duration::from_millis(self.roster_removal_delay_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            link_delay_ms: Self::DEFAULT_LINK_DELAY_MS,
            roster_removal_delay_ms: 0,
            absorption_max: Self::DEFAULT_ABSORPTION_MAX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.link_delay(), Duration::from_millis(500));
        assert_eq!(config.roster_removal_delay(), Duration::ZERO);
        assert_eq!(config.absorption_max, 1024.0);
    }

    #[test]
    fn test_builder_overrides() {
        let config = EngineConfig::new()
            .with_link_delay(Duration::from_millis(250))
            .with_absorption_max(40.0);
        assert_eq!(config.link_delay_ms, 250);
        assert_eq!(config.absorption_max, 40.0);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"link_delay_ms": 100}"#).unwrap();
        assert_eq!(config.link_delay_ms, 100);
        assert_eq!(config.absorption_max, 1024.0);
    }
}
