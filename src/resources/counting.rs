//! # Counter-backed idling resource (`CountingResource`)
//!
//! [`CountingResource`] is idle while its counter is zero. Wrap every unit of
//! background work in `increment()` / `decrement()`; the registry waits for the
//! work that is in flight when the resource is registered busy.
//!
//! ## Semantics
//! - The transition callback fires on every `1 -> 0` edge of the counter.
//! - The registry only tracks busy -> idle. Work started after the resource is
//!   known idle (registered at zero, or after a processed `1 -> 0` edge) is not
//!   waited for: increment before registering.
//! - Register each resource at most once; later callbacks are ignored and keep
//!   the first binding.
//! - Decrementing at zero is a usage error ([`RegistryError::CounterUnderflow`]);
//!   the counter stays at zero.
//!
//! ## Example
//! ```rust
//! use idlevisor::{CountingResource, IdlingResource};
//!
//! let downloads = CountingResource::arc("downloads");
//! downloads.increment();
//! assert!(!downloads.is_idle_now());
//! downloads.decrement().unwrap();
//! assert!(downloads.is_idle_now());
//! assert!(downloads.decrement().is_err());
//! ```

use std::borrow::Cow;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use crate::error::RegistryError;
use crate::resources::resource::{IdlingResource, ResourceCallback};

/// Counter-backed idling resource.
#[derive(Debug)]
pub struct CountingResource {
    name: Cow<'static, str>,
    counter: AtomicUsize,
    callback: OnceLock<ResourceCallback>,
}

impl CountingResource {
    /// Creates a new, idle counting resource.
    ///
    /// Prefer [`CountingResource::arc`] when the resource is registered right away.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            counter: AtomicUsize::new(0),
            callback: OnceLock::new(),
        }
    }

    /// Creates the resource and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>) -> Arc<Self> {
        Arc::new(Self::new(name))
    }

    /// Marks one more unit of work as in flight.
    pub fn increment(&self) {
        self.counter.fetch_add(1, Ordering::AcqRel);
    }

    /// Marks one unit of work as finished.
    ///
    /// Fires the transition callback when the counter reaches zero.
    pub fn decrement(&self) -> Result<(), RegistryError> {
        let prev = self
            .counter
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .map_err(|_| RegistryError::CounterUnderflow {
                resource: self.name.to_string(),
            })?;

        if prev == 1 {
            if let Some(cb) = self.callback.get() {
                cb.on_transition_to_idle();
            }
        }
        Ok(())
    }

    /// Returns the number of units currently in flight.
    pub fn count(&self) -> usize {
        self.counter.load(Ordering::Acquire)
    }
}

impl IdlingResource for CountingResource {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_idle_now(&self) -> bool {
        self.counter.load(Ordering::Acquire) == 0
    }

    fn register_idle_transition_callback(&self, callback: ResourceCallback) {
        // first binding wins
        let _ = self.callback.set(callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Message;
    use tokio::sync::mpsc;

    fn bound(
        resource: &CountingResource,
    ) -> (mpsc::UnboundedSender<Message>, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        resource.register_idle_transition_callback(ResourceCallback::new(4, tx.downgrade()));
        (tx, rx)
    }

    #[test]
    fn test_idle_only_at_zero() {
        let r = CountingResource::new("jobs");
        assert!(r.is_idle_now());
        r.increment();
        r.increment();
        assert_eq!(r.count(), 2);
        assert!(!r.is_idle_now());
        r.decrement().unwrap();
        assert!(!r.is_idle_now());
        r.decrement().unwrap();
        assert!(r.is_idle_now());
    }

    #[test]
    fn test_callback_fires_on_edge_to_zero_only() {
        let r = CountingResource::new("jobs");
        let (_tx, mut rx) = bound(&r);

        r.increment();
        r.increment();
        r.decrement().unwrap();
        assert!(rx.try_recv().is_err());

        r.decrement().unwrap();
        match rx.try_recv() {
            Ok(Message::ResourceIdled { index }) => assert_eq!(index, 4),
            other => panic!("unexpected message: {other:?}"),
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_underflow_is_rejected() {
        let r = CountingResource::new("jobs");
        let (_tx, mut rx) = bound(&r);

        let err = r.decrement().unwrap_err();
        assert_eq!(
            err,
            RegistryError::CounterUnderflow {
                resource: "jobs".into()
            }
        );
        assert_eq!(r.count(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_second_binding_keeps_first_index() {
        let r = CountingResource::new("jobs");
        let (tx, mut rx) = bound(&r);
        r.register_idle_transition_callback(ResourceCallback::new(9, tx.downgrade()));
        assert_eq!(r.callback.get().map(ResourceCallback::index), Some(4));

        r.increment();
        r.decrement().unwrap();
        match rx.try_recv() {
            Ok(Message::ResourceIdled { index }) => assert_eq!(index, 4),
            other => panic!("unexpected message: {other:?}"),
        }
    }
}
