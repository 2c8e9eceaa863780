//! Error types used by the idlevisor runtime and its built-in resources.
//!
//! A single enum, [`RegistryError`], covers three very different situations:
//!
//! - **usage errors** ([`AlreadyWaiting`](RegistryError::AlreadyWaiting),
//!   [`CounterUnderflow`](RegistryError::CounterUnderflow)) returned at the call site;
//! - the **fatal protocol violation** raised when a resource went idle without
//!   ever delivering its transition callback;
//! - **operational** outcomes surfaced by the async helpers
//!   ([`TimedOut`](RegistryError::TimedOut), [`Closed`](RegistryError::Closed)).
//!
//! Helper methods (`as_label`, `as_message`) mirror each other for logs/metrics.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the idle registry.
///
/// The enum is `Clone` so that a fatal error raised on the coordinator task can be
/// replayed to every [`IdleRegistry`](crate::IdleRegistry) handle afterwards.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A wait subscription is already active; only one may be pending at a time.
    #[error("idle notification already registered (active wait #{wait})")]
    AlreadyWaiting {
        /// Id of the wait that is still pending.
        wait: u64,
    },

    /// A resource reports idle but never delivered its busy -> idle transition.
    #[error(
        "resource {resource:?} is_idle_now() is returning true, but a message indicating \
         that the resource has transitioned from busy to idle was never sent"
    )]
    ProtocolViolation {
        /// Name of the offending resource.
        resource: String,
        /// Registration index of the offending resource.
        index: usize,
    },

    /// Resources were still busy when the hard timeout elapsed.
    #[error("timed out after {timeout:?}; still busy: {busy:?}")]
    TimedOut {
        /// The configured hard timeout.
        timeout: Duration,
        /// Names of the busy resources, in registration order.
        busy: Vec<String>,
    },

    /// A counting resource was decremented below zero.
    #[error("counter of resource {resource:?} decremented below zero")]
    CounterUnderflow {
        /// Name of the counting resource.
        resource: String,
    },

    /// The coordinator task is not running (shut down or never started).
    #[error("coordinator is not running")]
    Closed,
}

impl RegistryError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use idlevisor::RegistryError;
    ///
    /// let err = RegistryError::AlreadyWaiting { wait: 3 };
    /// assert_eq!(err.as_label(), "registry_already_waiting");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RegistryError::AlreadyWaiting { .. } => "registry_already_waiting",
            RegistryError::ProtocolViolation { .. } => "resource_protocol_violation",
            RegistryError::TimedOut { .. } => "idle_timed_out",
            RegistryError::CounterUnderflow { .. } => "counter_underflow",
            RegistryError::Closed => "registry_closed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RegistryError::AlreadyWaiting { wait } => format!("wait #{wait} still pending"),
            RegistryError::ProtocolViolation { resource, index } => {
                format!("resource {resource:?} (#{index}) idled without a transition callback")
            }
            RegistryError::TimedOut { timeout, busy } => {
                format!("timeout {timeout:?}; busy={busy:?}")
            }
            RegistryError::CounterUnderflow { resource } => {
                format!("counter underflow: {resource}")
            }
            RegistryError::Closed => "coordinator closed".to_string(),
        }
    }

    /// Indicates whether the error means idle detection can no longer be trusted.
    ///
    /// Only [`RegistryError::ProtocolViolation`] is fatal.
    ///
    /// # Example
    /// ```
    /// use idlevisor::RegistryError;
    ///
    /// let bug = RegistryError::ProtocolViolation { resource: "net".into(), index: 0 };
    /// assert!(bug.is_fatal());
    /// assert!(!RegistryError::Closed.is_fatal());
    /// ```
    pub fn is_fatal(&self) -> bool {
        matches!(self, RegistryError::ProtocolViolation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_stable() {
        let cases = [
            (RegistryError::AlreadyWaiting { wait: 1 }, "registry_already_waiting"),
            (
                RegistryError::ProtocolViolation {
                    resource: "r".into(),
                    index: 0,
                },
                "resource_protocol_violation",
            ),
            (
                RegistryError::TimedOut {
                    timeout: Duration::from_secs(26),
                    busy: vec![],
                },
                "idle_timed_out",
            ),
            (
                RegistryError::CounterUnderflow {
                    resource: "c".into(),
                },
                "counter_underflow",
            ),
            (RegistryError::Closed, "registry_closed"),
        ];
        for (err, label) in cases {
            assert_eq!(err.as_label(), label);
        }
    }

    #[test]
    fn test_protocol_violation_names_resource() {
        let err = RegistryError::ProtocolViolation {
            resource: "image-loader".into(),
            index: 2,
        };
        let text = err.to_string();
        assert!(text.contains("\"image-loader\""), "{text}");
        assert!(text.contains("was never sent"), "{text}");
        assert!(err.as_message().contains("#2"));
    }

    #[test]
    fn test_only_protocol_violation_is_fatal() {
        assert!(!RegistryError::AlreadyWaiting { wait: 0 }.is_fatal());
        assert!(
            !RegistryError::TimedOut {
                timeout: Duration::ZERO,
                busy: vec!["a".into()],
            }
            .is_fatal()
        );
        assert!(
            RegistryError::ProtocolViolation {
                resource: "a".into(),
                index: 0,
            }
            .is_fatal()
        );
    }
}
