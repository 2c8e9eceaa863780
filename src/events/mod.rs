//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to runtime events emitted by the coordinator and the
//! subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Coordinator` (registry, wait, race events), `SubscriberSet`
//!   workers (overflow/panic).
//! - **Consumers**: the subscriber listener spawned by `RegistryBuilder::build`
//!   (fans out to `SubscriberSet`) and any receiver from `IdleRegistry::events()`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
