//! # Messages processed by the coordinator task.
//!
//! Every state change goes through this queue. Producers on other tasks or threads
//! (resource callbacks, timer tasks, [`IdleRegistry`](crate::IdleRegistry) handles)
//! only ever enqueue; the coordinator is the single consumer.
//!
//! ```text
//! ResourceCallback ──► ResourceIdled{index} ──┐
//! TimerService     ──► Tick{wait, tick}  ─────┤
//! IdleRegistry     ──► Register / IsIdle /  ──┼──► [unbounded FIFO] ──► Coordinator::dispatch
//!                      Notify / List          │
//! Coordinator      ──► RaceCheck, Tick  ──────┘   (re-injection after a suspected race)
//! ```

use std::fmt;

use tokio::sync::oneshot;

use crate::core::notify::IdleNotification;
use crate::error::RegistryError;
use crate::resources::ResourceRef;

/// Delayed escalation step of a wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Still-busy warning; re-armed after every delivery.
    Warning,
    /// Hard timeout; terminal.
    Timeout,
}

/// Coordinator queue entry.
pub enum Message {
    /// Append a resource to the registry.
    Register(ResourceRef),
    /// Busy -> idle transition of the resource at `index`.
    ResourceIdled { index: usize },
    /// Re-poll busy resources and report whether everything is idle.
    IsIdle { reply: oneshot::Sender<bool> },
    /// Install a wait subscription.
    Notify {
        notification: Box<dyn IdleNotification>,
        reply: oneshot::Sender<Result<(), RegistryError>>,
    },
    /// Registered resource names, in registration order.
    List { reply: oneshot::Sender<Vec<String>> },
    /// Escalation tick for wait `wait`.
    Tick { wait: u64, tick: Tick },
    /// Deferred re-check of resources that reported idle with a busy bit.
    RaceCheck { wait: u64, racy: Vec<usize> },
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Register(r) => f.debug_tuple("Register").field(&r.name()).finish(),
            Message::ResourceIdled { index } => f
                .debug_struct("ResourceIdled")
                .field("index", index)
                .finish(),
            Message::IsIdle { .. } => f.write_str("IsIdle"),
            Message::Notify { .. } => f.write_str("Notify"),
            Message::List { .. } => f.write_str("List"),
            Message::Tick { wait, tick } => f
                .debug_struct("Tick")
                .field("wait", wait)
                .field("tick", tick)
                .finish(),
            Message::RaceCheck { wait, racy } => f
                .debug_struct("RaceCheck")
                .field("wait", wait)
                .field("racy", racy)
                .finish(),
        }
    }
}
