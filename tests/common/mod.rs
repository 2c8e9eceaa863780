//! Fake resources and outcome recording shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use idlevisor::{Event, EventKind, IdleCallbacks, IdlingResource, ResourceCallback};
use tokio::sync::broadcast;

/// Manually driven resource.
pub struct FakeResource {
    name: &'static str,
    idle: AtomicBool,
    lagging: AtomicBool,
    callback: OnceLock<ResourceCallback>,
}

impl FakeResource {
    fn new(name: &'static str, idle: bool) -> Arc<Self> {
        Arc::new(Self {
            name,
            idle: AtomicBool::new(idle),
            lagging: AtomicBool::new(false),
            callback: OnceLock::new(),
        })
    }

    pub fn busy(name: &'static str) -> Arc<Self> {
        Self::new(name, false)
    }

    pub fn idle(name: &'static str) -> Arc<Self> {
        Self::new(name, true)
    }

    /// Busy -> idle with the transition callback.
    pub fn go_idle(&self) {
        self.idle.store(true, Ordering::SeqCst);
        self.fire();
    }

    /// Busy -> idle without ever calling back (defective resource).
    pub fn go_idle_silently(&self) {
        self.idle.store(true, Ordering::SeqCst);
    }

    pub fn go_busy(&self) {
        self.idle.store(false, Ordering::SeqCst);
    }

    /// The next poll finds the resource idle while its transition message is still
    /// in flight.
    pub fn go_idle_on_next_poll(&self) {
        self.lagging.store(true, Ordering::SeqCst);
    }

    /// Registration index the resource's callback is bound to.
    pub fn bound_index(&self) -> Option<usize> {
        self.callback.get().map(ResourceCallback::index)
    }

    fn fire(&self) {
        if let Some(cb) = self.callback.get() {
            cb.on_transition_to_idle();
        }
    }
}

impl IdlingResource for FakeResource {
    fn name(&self) -> &str {
        self.name
    }

    fn is_idle_now(&self) -> bool {
        if self.lagging.swap(false, Ordering::SeqCst) {
            self.go_idle();
            return true;
        }
        self.idle.load(Ordering::SeqCst)
    }

    fn register_idle_transition_callback(&self, callback: ResourceCallback) {
        let _ = self.callback.set(callback);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Idle,
    StillBusy(Vec<String>),
    TimedOut(Vec<String>),
}

/// Records every callback a wait receives, in order.
#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<Outcome>>>);

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn callbacks(&self) -> IdleCallbacks {
        let (idle, warn, timeout) = (self.0.clone(), self.0.clone(), self.0.clone());
        IdleCallbacks::new(move || idle.lock().unwrap().push(Outcome::Idle))
            .on_warning(move |busy| warn.lock().unwrap().push(Outcome::StillBusy(busy.to_vec())))
            .on_timeout(move |busy| timeout.lock().unwrap().push(Outcome::TimedOut(busy)))
    }

    pub fn outcomes(&self) -> Vec<Outcome> {
        self.0.lock().unwrap().clone()
    }
}

pub fn names(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

pub fn still_busy(busy: &[&str]) -> Outcome {
    Outcome::StillBusy(names(busy))
}

/// Sleeps on virtual time a little past `secs`.
pub async fn advance_past(secs: u64) {
    tokio::time::sleep(Duration::from_secs(secs) + Duration::from_millis(100)).await;
}

/// Everything published so far, without waiting.
pub fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut out = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        out.push(ev);
    }
    out
}

pub fn kinds(events: &[Event]) -> Vec<EventKind> {
    events.iter().map(|e| e.kind).collect()
}
