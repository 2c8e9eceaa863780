//! # Runtime events emitted by the coordinator.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Registry events**: resource registration and busy -> idle transitions
//! - **Wait events**: wait installed, warning, terminal outcomes
//! - **Race events**: suspected race, resolution, protocol violation
//! - **Subscriber events**: overflow and panics of observers
//!
//! The [`Event`] struct carries additional metadata such as timestamps, resource
//! name and index, wait id and busy resource lists.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use idlevisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::StillBusy)
//!     .with_wait(7)
//!     .with_busy(vec!["network".to_string()]);
//!
//! assert_eq!(ev.kind, EventKind::StillBusy);
//! assert_eq!(ev.wait, Some(7));
//! assert_eq!(ev.busy.as_deref(), Some(&["network".to_string()][..]));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `resource`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `resource`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Registry events ===
    /// Resource appended to the registry.
    ///
    /// Sets:
    /// - `resource`: resource name
    /// - `index`: registration index
    /// - `idle`: status polled at registration
    ResourceRegistered,

    /// Busy -> idle transition message processed.
    ///
    /// Sets:
    /// - `resource`: resource name
    /// - `index`: registration index
    ResourceIdled,

    // === Wait events ===
    /// Wait subscription installed, timers armed.
    ///
    /// Sets:
    /// - `wait`: wait id
    /// - `busy`: busy resources at installation
    /// - `delay_ms`: hard timeout (ms), if any
    WaitInstalled,

    /// All resources idle; the all-idle callback fired.
    ///
    /// Sets:
    /// - `wait`: wait id (absent when idle at installation)
    AllIdle,

    /// Warning tick delivered while resources are still busy.
    ///
    /// Sets:
    /// - `wait`: wait id
    /// - `busy`: busy resources in registration order
    /// - `delay_ms`: time since the wait was installed (ms)
    StillBusy,

    /// Hard timeout reached; the wait ended without all-idle.
    ///
    /// Sets:
    /// - `wait`: wait id
    /// - `busy`: busy resources in registration order
    /// - `delay_ms`: configured timeout (ms)
    WaitTimedOut,

    /// Notification callback panicked on the coordinator task.
    ///
    /// Sets:
    /// - `wait`: wait id (if any)
    /// - `reason`: panic info/message
    CallbackPanicked,

    // === Race events ===
    /// A resource reports idle while its bit is still busy; check deferred.
    ///
    /// Sets:
    /// - `wait`: wait id
    /// - `busy`: names of the racy resources
    RaceSuspected,

    /// The transition message arrived before the deferred check.
    ///
    /// Sets:
    /// - `wait`: wait id
    /// - `resource`, `index`: the resource that raced
    RaceResolved,

    /// A resource idled without delivering its transition callback (fatal).
    ///
    /// Sets:
    /// - `resource`, `index`: the offending resource
    /// - `reason`: error message
    ProtocolViolation,

    // === Shutdown events ===
    /// Coordinator task exited.
    ///
    /// Sets:
    /// - `reason`: error label when stopped by a fatal error
    CoordinatorStopped,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Resource (or subscriber) name, if applicable.
    pub resource: Option<Arc<str>>,
    /// Registration index of the resource.
    pub index: Option<usize>,
    /// Wait subscription id.
    pub wait: Option<u64>,
    /// Resource names carried by warnings, timeouts and race events.
    pub busy: Option<Arc<[String]>>,
    /// Idle status observed at registration.
    pub idle: Option<bool>,
    /// Delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            resource: None,
            index: None,
            wait: None,
            busy: None,
            idle: None,
            delay_ms: None,
            reason: None,
        }
    }

    /// Attaches a resource name.
    #[inline]
    pub fn with_resource(mut self, name: impl Into<Arc<str>>) -> Self {
        self.resource = Some(name.into());
        self
    }

    /// Attaches a registration index.
    #[inline]
    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Attaches a wait id.
    #[inline]
    pub fn with_wait(mut self, wait: u64) -> Self {
        self.wait = Some(wait);
        self
    }

    /// Attaches a list of resource names.
    #[inline]
    pub fn with_busy(mut self, names: impl Into<Arc<[String]>>) -> Self {
        self.busy = Some(names.into());
        self
    }

    /// Attaches an idle status.
    #[inline]
    pub fn with_idle(mut self, idle: bool) -> Self {
        self.idle = Some(idle);
        self
    }

    /// Attaches a delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Returns the attached delay as a [`Duration`].
    #[inline]
    pub fn delay(&self) -> Option<Duration> {
        self.delay_ms.map(|ms| Duration::from_millis(u64::from(ms)))
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_resource(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_resource(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }

    #[inline]
    pub fn is_subscriber_panic(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberPanicked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::AllIdle);
        let b = Event::new(EventKind::AllIdle);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_delay_is_clamped_to_u32_millis() {
        let ev = Event::new(EventKind::WaitTimedOut).with_delay(Duration::from_secs(u64::MAX));
        assert_eq!(ev.delay_ms, Some(u32::MAX));

        let ev = Event::new(EventKind::StillBusy).with_delay(Duration::from_secs(5));
        assert_eq!(ev.delay(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_subscriber_helpers() {
        let ev = Event::subscriber_overflow("audit", "full");
        assert!(ev.is_subscriber_overflow());
        assert_eq!(ev.resource.as_deref(), Some("audit"));
        assert_eq!(ev.reason.as_deref(), Some("subscriber=audit reason=full"));

        let ev = Event::subscriber_panicked("audit", "boom".into());
        assert!(ev.is_subscriber_panic());
        assert!(!ev.is_subscriber_overflow());
    }
}
