//! # idlevisor
//!
//! **Idlevisor** is an idle-state coordinator for asynchronous test synchronization.
//!
//! Independently-monitored units of background work ("idling resources") are
//! registered with a single [`IdleRegistry`]. A test waits until every resource is
//! idle at the same time before it touches shared state, with periodic still-busy
//! warnings and a hard timeout naming the resources that never settled.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ IdlingRes #1 │   │ IdlingRes #2 │   │ IdlingRes #3 │
//!     │  (network)   │   │  (db-pool)   │   │ (animations) │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            │ on_transition_to_idle() from any thread
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                  coordinator queue (unbounded FIFO)               │
//! │  ◄── IdleRegistry: register / is_everything_idle / notify / list  │
//! │  ◄── TimerService: warning and timeout ticks                      │
//! │  ◄── Coordinator:  race re-checks                                 │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Coordinator (single task)                                        │
//! │  - Registry (resources + idle bitmap)                             │
//! │  - NotificationSlot (at most one pending wait)                    │
//! │  - race reconciliation, escalation                                │
//! └──────┬─────────────────────────────────────────────────┬──────────┘
//!        │ IdleNotification callbacks                      │ publish(Event)
//!        ▼                                                 ▼
//!  all_resources_idle / resources_still_busy /      Bus (broadcast) ──► SubscriberSet
//!  resources_timed_out                                                 (per-sub queues)
//! ```
//!
//! ### Wait lifecycle
//! ```text
//! notify_when_all_idle(cb)
//!   ├─ another wait pending ─► Err(AlreadyWaiting)
//!   ├─ everything idle      ─► cb.all_resources_idle(), no timers
//!   └─ otherwise            ─► arm warning + timeout ticks
//!        │
//!        ├─ last busy resource transitions ─► cb.all_resources_idle()
//!        ├─ warning tick ─► cb.resources_still_busy(names), re-arm
//!        ├─ timeout tick ─► cb.resources_timed_out(names)
//!        └─ tick finds a busy bit reporting idle ─► RaceCheck, tick again
//!             ├─ transition arrived in between ─► resolved
//!             └─ no transition ─► ProtocolViolation (coordinator stops)
//! ```
//!
//! ## Features
//! | Area               | Description                                              | Key types / traits                          |
//! |--------------------|----------------------------------------------------------|---------------------------------------------|
//! | **Resources**      | Pollable units that announce busy -> idle transitions.  | [`IdlingResource`], [`CountingResource`]    |
//! | **Coordination**   | Registration, idle queries, the single wait.             | [`IdleRegistry`], [`Coordinator`]           |
//! | **Callbacks**      | All-idle, still-busy and timed-out outcomes.             | [`IdleNotification`], [`IdleCallbacks`]     |
//! | **Subscriber API** | Observe registrations, warnings, races and outcomes.     | [`Subscribe`], [`Event`], [`EventKind`]     |
//! | **Errors**         | Typed usage, fatal and operational errors.               | [`RegistryError`]                           |
//! | **Configuration**  | Warning interval, hard timeout, bus capacity.            | [`Config`]                                  |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use idlevisor::{Config, CountingResource, IdleCallbacks, IdleRegistry};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = Config::default();
//!     cfg.timeout = Duration::from_secs(10);
//!
//!     // Build subscribers (optional)
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn idlevisor::Subscribe>> = vec![Arc::new(idlevisor::LogWriter::default())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn idlevisor::Subscribe>> = Vec::new();
//!
//!     let (registry, coordinator) = IdleRegistry::builder(cfg).with_subscribers(subs).build();
//!     let coordinator = tokio::spawn(coordinator.run());
//!
//!     let jobs = CountingResource::arc("jobs");
//!     jobs.increment();
//!     registry.register(jobs.clone())?;
//!
//!     let (done_tx, done_rx) = tokio::sync::oneshot::channel();
//!     registry
//!         .notify_when_all_idle(
//!             IdleCallbacks::new(move || {
//!                 let _ = done_tx.send(());
//!             })
//!             .on_warning(|busy| println!("still waiting for {busy:?}")),
//!         )
//!         .await?;
//!
//!     jobs.decrement()?;
//!     done_rx.await?;
//!
//!     registry.shutdown();
//!     coordinator.await??;
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod resources;
mod subscribers;

// ---- Public re-exports ----

pub use crate::core::{
    Config, Coordinator, IdleCallbacks, IdleNotification, IdleRegistry, RegistryBuilder,
};
pub use error::RegistryError;
pub use events::{Bus, Event, EventKind};
pub use resources::{CountingResource, IdlingResource, ResourceCallback, ResourceRef};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
