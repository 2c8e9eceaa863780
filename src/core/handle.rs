//! # IdleRegistry: the caller-facing handle.
//!
//! [`IdleRegistry`] is a cheap, cloneable handle usable from any task or thread.
//! Every call is marshalled onto the coordinator task as a [`Message`]; calls that
//! need an answer await a `oneshot` reply.
//!
//! ## Architecture
//! ```text
//! test thread ── register(r) ──────────────┐
//! test task   ── notify_when_all_idle() ───┼──► [queue] ──► Coordinator (single task)
//! any thread  ── ResourceCallback ─────────┘                    │
//!                                                                ▼
//!                           callbacks: all_resources_idle / resources_still_busy /
//!                                      resources_timed_out (on the coordinator task)
//! ```
//!
//! ## Example
//! ```rust
//! use idlevisor::{Config, CountingResource, IdleRegistry};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), idlevisor::RegistryError> {
//!     let (registry, coordinator) = IdleRegistry::spawn(Config::default());
//!
//!     let uploads = CountingResource::arc("uploads");
//!     uploads.increment();
//!     registry.register(uploads.clone())?;
//!
//!     let worker = uploads.clone();
//!     tokio::spawn(async move {
//!         tokio::time::sleep(std::time::Duration::from_millis(10)).await;
//!         worker.decrement()
//!     });
//!
//!     registry.wait_for_idle().await?;
//!     assert!(registry.is_everything_idle().await?);
//!
//!     registry.shutdown();
//!     assert_eq!(coordinator.await.ok(), Some(Ok(())));
//!     Ok(())
//! }
//! ```

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::builder::RegistryBuilder;
use crate::core::config::Config;
use crate::core::message::Message;
use crate::core::notify::IdleNotification;
use crate::error::RegistryError;
use crate::events::{Bus, Event};
use crate::resources::ResourceRef;

/// Handle to a running idle registry.
///
/// Handles are the only owners of the coordinator queue: once every clone is
/// dropped, the coordinator drains its queue and stops as if
/// [`shutdown`](IdleRegistry::shutdown) was called.
#[derive(Clone)]
pub struct IdleRegistry {
    tx: mpsc::UnboundedSender<Message>,
    bus: Bus,
    runtime_token: CancellationToken,
    fatal: Arc<OnceLock<RegistryError>>,
    timeout: Duration,
}

impl IdleRegistry {
    pub(crate) fn new(
        tx: mpsc::UnboundedSender<Message>,
        bus: Bus,
        runtime_token: CancellationToken,
        fatal: Arc<OnceLock<RegistryError>>,
        timeout: Duration,
    ) -> Self {
        Self {
            tx,
            bus,
            runtime_token,
            fatal,
            timeout,
        }
    }

    /// Returns a builder for a registry with custom subscribers.
    pub fn builder(cfg: Config) -> RegistryBuilder {
        RegistryBuilder::new(cfg)
    }

    /// Builds a registry and spawns its coordinator on the current runtime.
    ///
    /// The returned `JoinHandle` resolves with the coordinator's exit status; a
    /// protocol violation surfaces there as `Err(RegistryError::ProtocolViolation)`.
    pub fn spawn(cfg: Config) -> (Self, JoinHandle<Result<(), RegistryError>>) {
        let (registry, coordinator) = RegistryBuilder::new(cfg).build();
        (registry, tokio::spawn(coordinator.run()))
    }

    /// Registers a resource.
    ///
    /// Callable from any thread; the registration is queued and applied on the
    /// coordinator task in call order. The resource is polled and bound to its
    /// transition callback there.
    pub fn register(&self, resource: ResourceRef) -> Result<(), RegistryError> {
        self.send(Message::Register(resource))
    }

    /// Re-polls every resource last known busy and returns whether all are idle.
    ///
    /// Resources already known idle are not polled again; a resource that went
    /// busy after that still counts as idle.
    ///
    /// If a wait is pending and everything turns out idle, the wait completes with
    /// the all-idle outcome before this returns.
    pub async fn is_everything_idle(&self) -> Result<bool, RegistryError> {
        let (reply, rx) = oneshot::channel();
        self.send(Message::IsIdle { reply })?;
        rx.await.map_err(|_| self.closed())
    }

    /// Installs the single wait subscription.
    ///
    /// ### Outcomes
    /// - already idle → `all_resources_idle` runs before this returns, no timers
    /// - otherwise → the wait is armed; outcomes arrive later on the coordinator task
    /// - another wait pending → `Err(RegistryError::AlreadyWaiting)`
    pub async fn notify_when_all_idle(
        &self,
        notification: impl IdleNotification,
    ) -> Result<(), RegistryError> {
        let (reply, rx) = oneshot::channel();
        self.send(Message::Notify {
            notification: Box::new(notification),
            reply,
        })?;
        rx.await.map_err(|_| self.closed())?
    }

    /// Waits until every registered resource is idle.
    ///
    /// Returns `Err(RegistryError::TimedOut)` with the busy resources when the hard
    /// timeout elapses first. Warnings are only visible as `StillBusy` events.
    pub async fn wait_for_idle(&self) -> Result<(), RegistryError> {
        let (done, rx) = oneshot::channel();
        self.notify_when_all_idle(Waiter {
            done: Some(done),
            timeout: self.timeout,
        })
        .await?;
        rx.await.unwrap_or_else(|_| Err(self.closed()))
    }

    /// Registered resource names, in registration order.
    pub async fn list(&self) -> Result<Vec<String>, RegistryError> {
        let (reply, rx) = oneshot::channel();
        self.send(Message::List { reply })?;
        rx.await.map_err(|_| self.closed())
    }

    /// Creates a receiver for subsequent runtime events.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Stops the coordinator; a pending wait is dropped without callbacks.
    pub fn shutdown(&self) {
        self.runtime_token.cancel();
    }

    /// Returns `true` until the coordinator stopped (shutdown or fatal error).
    pub fn is_running(&self) -> bool {
        !self.runtime_token.is_cancelled()
    }

    fn send(&self, msg: Message) -> Result<(), RegistryError> {
        if self.runtime_token.is_cancelled() {
            return Err(self.closed());
        }
        self.tx.send(msg).map_err(|_| self.closed())
    }

    /// The fatal error that stopped the coordinator, or `Closed`.
    fn closed(&self) -> RegistryError {
        self.fatal.get().cloned().unwrap_or(RegistryError::Closed)
    }
}

/// Bridges the callback protocol to a `oneshot` for [`IdleRegistry::wait_for_idle`].
struct Waiter {
    done: Option<oneshot::Sender<Result<(), RegistryError>>>,
    timeout: Duration,
}

impl IdleNotification for Waiter {
    fn all_resources_idle(&mut self) {
        if let Some(done) = self.done.take() {
            let _ = done.send(Ok(()));
        }
    }

    fn resources_timed_out(&mut self, busy: Vec<String>) {
        if let Some(done) = self.done.take() {
            let _ = done.send(Err(RegistryError::TimedOut {
                timeout: self.timeout,
                busy,
            }));
        }
    }
}
