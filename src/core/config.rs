//! # Registry runtime configuration.
//!
//! Provides [`Config`] centralized settings for the coordinator.
//!
//! ## Sentinel values
//! - `warning_interval = 0s` → no still-busy warnings
//! - `timeout = 0s` → no hard timeout (the wait lasts until all-idle)

use std::time::Duration;

/// Configuration for the idle registry runtime.
///
/// ## Field semantics
/// - `warning_interval`: delay of the first still-busy warning, measured from wait
///   installation, and the interval between subsequent warnings (`0s` = disabled)
/// - `timeout`: hard bound after which the wait ends with the timed-out outcome,
///   measured from wait installation (`0s` = disabled)
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
///
/// ## Notes
/// All fields are public for flexibility. Prefer the helper accessors to avoid
/// sprinkling sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Still-busy warning period.
    pub warning_interval: Duration,

    /// Hard wait timeout.
    pub timeout: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Receivers lagging behind more than `bus_capacity` messages skip older items.
    pub bus_capacity: usize,
}

impl Config {
    /// Returns the warning period as an `Option`.
    ///
    /// - `None` → warnings disabled
    /// - `Some(d)` → first warning after `d`, then every `d`
    #[inline]
    pub fn warning_interval(&self) -> Option<Duration> {
        if self.warning_interval == Duration::ZERO {
            None
        } else {
            Some(self.warning_interval)
        }
    }

    /// Returns the hard timeout as an `Option`.
    #[inline]
    pub fn hard_timeout(&self) -> Option<Duration> {
        if self.timeout == Duration::ZERO {
            None
        } else {
            Some(self.timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `warning_interval = 5s`
    /// - `timeout = 26s`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            warning_interval: Duration::from_secs(5),
            timeout: Duration::from_secs(26),
            bus_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.warning_interval(), Some(Duration::from_secs(5)));
        assert_eq!(cfg.hard_timeout(), Some(Duration::from_secs(26)));
        assert_eq!(cfg.bus_capacity_clamped(), 1024);
    }

    #[test]
    fn test_zero_sentinels() {
        let cfg = Config {
            warning_interval: Duration::ZERO,
            timeout: Duration::ZERO,
            bus_capacity: 0,
        };
        assert_eq!(cfg.warning_interval(), None);
        assert_eq!(cfg.hard_timeout(), None);
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }
}
