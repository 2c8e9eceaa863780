//! Runtime core: the coordinator and its caller-facing handle.
//!
//! The public API from this module is [`IdleRegistry`] (the handle),
//! [`Coordinator`] (the task owning all idle state), [`RegistryBuilder`] and
//! [`Config`], plus the wait callback contract.
//!
//! Internal modules:
//! - [`coordinator`]: single-task state machine, escalation and race reconciliation;
//! - [`registry`]: resource arena with the idle bitmap;
//! - [`notify`]: wait callbacks and the single notification slot;
//! - [`timer`]: cancellable delayed ticks;
//! - [`message`]: everything that crosses into the coordinator queue.

mod builder;
mod config;
mod coordinator;
mod handle;
mod message;
mod notify;
mod registry;
mod timer;

pub use builder::RegistryBuilder;
pub use config::Config;
pub use coordinator::Coordinator;
pub use handle::IdleRegistry;
pub use notify::{IdleCallbacks, IdleNotification};

pub(crate) use message::Message;
