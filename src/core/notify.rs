//! # Wait subscription: callbacks and the single notification slot.
//!
//! [`IdleNotification`] is the caller-side contract of a wait (all-idle, still-busy
//! warning, timed-out). [`IdleCallbacks`] is a closure-backed implementation.
//! [`NotificationSlot`] holds at most one active wait together with its timers.
//!
//! ## Rules
//! - At most one wait is active; installing another is `RegistryError::AlreadyWaiting`.
//! - Exactly one terminal callback per wait: `all_resources_idle` **or**
//!   `resources_timed_out`.
//! - `resources_still_busy` may fire zero or more times before the terminal one.
//! - Taking the wait out of the slot drops its timer handles, cancelling them.

use tokio::time::Instant;

use crate::core::timer::TimerHandle;
use crate::error::RegistryError;

/// # Receiver of wait outcomes.
///
/// All methods run on the coordinator task; keep them short and non-blocking.
///
/// # Example
/// ```
/// use idlevisor::IdleNotification;
///
/// struct Report;
///
/// impl IdleNotification for Report {
///     fn all_resources_idle(&mut self) {
///         println!("idle");
///     }
///
///     fn resources_timed_out(&mut self, busy: Vec<String>) {
///         println!("gave up waiting for {busy:?}");
///     }
/// }
/// ```
pub trait IdleNotification: Send + 'static {
    /// Every registered resource is idle. Terminal.
    fn all_resources_idle(&mut self);

    /// Warning period elapsed while `busy` (registration order) are still busy.
    fn resources_still_busy(&mut self, busy: &[String]) {
        let _ = busy;
    }

    /// Hard timeout elapsed while `busy` (registration order) are still busy. Terminal.
    fn resources_timed_out(&mut self, busy: Vec<String>);
}

type OnIdle = Box<dyn FnOnce() + Send>;
type OnWarning = Box<dyn FnMut(&[String]) + Send>;
type OnTimeout = Box<dyn FnOnce(Vec<String>) + Send>;

/// Closure-backed [`IdleNotification`].
///
/// ## Example
/// ```rust
/// use idlevisor::IdleCallbacks;
///
/// let callbacks = IdleCallbacks::new(|| println!("all idle"))
///     .on_warning(|busy| println!("still busy: {busy:?}"))
///     .on_timeout(|busy| println!("timed out: {busy:?}"));
/// # drop(callbacks);
/// ```
pub struct IdleCallbacks {
    on_idle: Option<OnIdle>,
    on_warning: Option<OnWarning>,
    on_timeout: Option<OnTimeout>,
}

impl IdleCallbacks {
    /// Creates callbacks with the all-idle handler; warning and timeout default to no-ops.
    pub fn new(on_idle: impl FnOnce() + Send + 'static) -> Self {
        Self {
            on_idle: Some(Box::new(on_idle)),
            on_warning: None,
            on_timeout: None,
        }
    }

    /// Sets the still-busy warning handler.
    pub fn on_warning(mut self, f: impl FnMut(&[String]) + Send + 'static) -> Self {
        self.on_warning = Some(Box::new(f));
        self
    }

    /// Sets the timed-out handler.
    pub fn on_timeout(mut self, f: impl FnOnce(Vec<String>) + Send + 'static) -> Self {
        self.on_timeout = Some(Box::new(f));
        self
    }
}

impl IdleNotification for IdleCallbacks {
    fn all_resources_idle(&mut self) {
        if let Some(f) = self.on_idle.take() {
            f();
        }
        self.on_timeout = None;
    }

    fn resources_still_busy(&mut self, busy: &[String]) {
        if let Some(f) = self.on_warning.as_mut() {
            f(busy);
        }
    }

    fn resources_timed_out(&mut self, busy: Vec<String>) {
        if let Some(f) = self.on_timeout.take() {
            f(busy);
        }
        self.on_idle = None;
    }
}

/// A pending wait and its armed timers.
pub struct ActiveWait {
    pub(crate) id: u64,
    pub(crate) notification: Box<dyn IdleNotification>,
    pub(crate) warning: Option<TimerHandle>,
    pub(crate) timeout: Option<TimerHandle>,
    pub(crate) started: Instant,
}

impl ActiveWait {
    /// Cancels both timers; the wait can no longer escalate.
    pub fn cancel_timers(&mut self) {
        for timer in [self.warning.as_mut(), self.timeout.as_mut()]
            .into_iter()
            .flatten()
        {
            timer.cancel();
        }
    }
}

/// Holds at most one [`ActiveWait`].
#[derive(Default)]
pub struct NotificationSlot {
    active: Option<ActiveWait>,
    last_id: u64,
}

impl NotificationSlot {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` while a wait is pending.
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Id of the pending wait, if any.
    pub fn active_id(&self) -> Option<u64> {
        self.active.as_ref().map(|w| w.id)
    }

    /// Returns `true` if `wait` is the pending wait.
    pub fn is_current(&self, wait: u64) -> bool {
        self.active_id() == Some(wait)
    }

    /// Fails with `AlreadyWaiting` while a wait is pending.
    pub fn ensure_vacant(&self) -> Result<(), RegistryError> {
        match self.active_id() {
            Some(wait) => Err(RegistryError::AlreadyWaiting { wait }),
            None => Ok(()),
        }
    }

    /// Allocates the id of the next wait.
    pub fn next_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }

    /// Installs `wait`; fails if another wait is pending.
    pub fn install(&mut self, wait: ActiveWait) -> Result<(), RegistryError> {
        self.ensure_vacant()?;
        self.active = Some(wait);
        Ok(())
    }

    /// Mutable access to the pending wait.
    pub fn active_mut(&mut self) -> Option<&mut ActiveWait> {
        self.active.as_mut()
    }

    /// Removes the pending wait; dropping it cancels its timers.
    pub fn take(&mut self) -> Option<ActiveWait> {
        self.active.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn wait(id: u64) -> ActiveWait {
        ActiveWait {
            id,
            notification: Box::new(IdleCallbacks::new(|| {})),
            warning: None,
            timeout: None,
            started: Instant::now(),
        }
    }

    #[test]
    fn test_slot_holds_one_wait() {
        let mut slot = NotificationSlot::new();
        assert!(!slot.is_active());
        assert!(slot.ensure_vacant().is_ok());

        let id = slot.next_id();
        slot.install(wait(id)).unwrap();
        assert!(slot.is_current(id));

        let next = slot.next_id();
        let err = slot.install(wait(next)).unwrap_err();
        assert_eq!(err, RegistryError::AlreadyWaiting { wait: id });

        assert_eq!(slot.take().map(|w| w.id), Some(id));
        assert!(!slot.is_active());
        assert!(!slot.is_current(id));
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut slot = NotificationSlot::new();
        let a = slot.next_id();
        let b = slot.next_id();
        assert!(b > a);
    }

    #[test]
    fn test_callbacks_fire_single_terminal_outcome() {
        let log = Arc::new(Mutex::new(Vec::<String>::new()));
        let (l1, l2, l3) = (log.clone(), log.clone(), log.clone());
        let mut cb = IdleCallbacks::new(move || l1.lock().unwrap().push("idle".into()))
            .on_warning(move |busy| l2.lock().unwrap().push(format!("warn {busy:?}")))
            .on_timeout(move |busy| l3.lock().unwrap().push(format!("timeout {busy:?}")));

        cb.resources_still_busy(&["a".to_string()]);
        cb.resources_still_busy(&["a".to_string()]);
        cb.resources_timed_out(vec!["a".to_string()]);
        cb.all_resources_idle();
        cb.resources_timed_out(vec![]);

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "warn [\"a\"]".to_string(),
                "warn [\"a\"]".to_string(),
                "timeout [\"a\"]".to_string(),
            ]
        );
    }

    #[test]
    fn test_missing_handlers_are_no_ops() {
        let mut cb = IdleCallbacks::new(|| {});
        cb.resources_still_busy(&[]);
        cb.resources_timed_out(vec!["x".to_string()]);
    }
}
