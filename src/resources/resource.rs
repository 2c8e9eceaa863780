//! # Idling resource abstraction.
//!
//! This module defines the [`IdlingResource`] trait (pollable, announces busy -> idle
//! transitions) and the [`ResourceCallback`] handed to each resource at registration.
//! The common handle type is [`ResourceRef`], an `Arc<dyn IdlingResource>` shared
//! between the caller and the registry.
//!
//! ## Contract
//! - `is_idle_now()` must be cheap and callable at any time from any thread.
//! - When the resource moves from busy to idle it must call
//!   [`ResourceCallback::on_transition_to_idle`]. Being idle at registration or at
//!   a poll does not require a callback for that state.
//! - A resource that reports idle but never calls back is a protocol violation and
//!   stops the coordinator.
//! - Only busy -> idle is tracked. Once a resource is known idle (idle at
//!   registration, a processed transition, or caught up by a poll) it is never
//!   polled for busy again; going busy afterwards is not observed.
//! - Register a resource at most once. A second registration gets a new index but
//!   the resource keeps only its first callback, so the new index never idles.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::core::Message;

/// # Independently-monitored unit of asynchronous work.
///
/// # Example
/// ```
/// use std::sync::OnceLock;
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use idlevisor::{IdlingResource, ResourceCallback};
///
/// #[derive(Default)]
/// struct Upload {
///     busy: AtomicBool,
///     callback: OnceLock<ResourceCallback>,
/// }
///
/// impl Upload {
///     fn finish(&self) {
///         self.busy.store(false, Ordering::SeqCst);
///         if let Some(cb) = self.callback.get() {
///             cb.on_transition_to_idle();
///         }
///     }
/// }
///
/// impl IdlingResource for Upload {
///     fn name(&self) -> &str { "upload" }
///
///     fn is_idle_now(&self) -> bool {
///         !self.busy.load(Ordering::SeqCst)
///     }
///
///     fn register_idle_transition_callback(&self, callback: ResourceCallback) {
///         // registered at most once; the first binding wins
///         let _ = self.callback.set(callback);
///     }
/// }
/// ```
pub trait IdlingResource: Send + Sync + 'static {
    /// Returns a human-readable name, used only in diagnostics.
    fn name(&self) -> &str;

    /// Returns `true` if the resource is idle right now.
    fn is_idle_now(&self) -> bool;

    /// Stores the callback to invoke on every busy -> idle transition.
    ///
    /// Called once per registration, on the coordinator task. Implementations
    /// keep the first callback they receive.
    fn register_idle_transition_callback(&self, callback: ResourceCallback);
}

/// Shared handle to an idling resource.
pub type ResourceRef = Arc<dyn IdlingResource>;

/// Transition notifier bound to one registered resource.
///
/// Cheap to clone and safe to call from any thread, including threads outside the
/// tokio runtime. It never touches registry state: it only enqueues a message for
/// the coordinator task.
///
/// Holds a weak sender: resources never keep the coordinator queue open on their
/// own, only [`IdleRegistry`](crate::IdleRegistry) handles do.
#[derive(Clone, Debug)]
pub struct ResourceCallback {
    index: usize,
    tx: mpsc::WeakUnboundedSender<Message>,
}

impl ResourceCallback {
    pub(crate) fn new(index: usize, tx: mpsc::WeakUnboundedSender<Message>) -> Self {
        Self { index, tx }
    }

    /// Registration index of the resource this callback is bound to.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Announces that the resource just transitioned from busy to idle.
    ///
    /// Silently does nothing once the coordinator has stopped or every handle is
    /// gone.
    pub fn on_transition_to_idle(&self) {
        if let Some(tx) = self.tx.upgrade() {
            let _ = tx.send(Message::ResourceIdled { index: self.index });
        }
    }
}
