//! # Event subscribers for the idlevisor runtime.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out and
//! built-in implementations for observing runtime events broadcast through the
//! [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Coordinator ── publish(Event) ──► Bus ──► subscriber_listener ──► SubscriberSet
//!                                                                      │
//!                                                         ┌────────────┼──────────┐
//!                                                         ▼            ▼          ▼
//!                                                     LogWriter     Metrics    Custom
//! ```
//!
//! Subscribers are the hook point for everything around the wait protocol
//! (logging, usage tracking, test reports); they never influence it.

#[cfg(feature = "logging")]
mod embedded;
mod set;
mod subscribe;

pub(crate) use set::panic_message;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
