//! # LogWriter: simple event printer
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout.
//! Use it for test or demo.
//!
//! ## Example output
//! ```text
//! [registered] resource="network" index=0 idle=false
//! [wait-installed] wait=1 busy=["network"] timeout=26000ms
//! [still-busy] wait=1 busy=["network"] after=5000ms
//! [race-suspected] wait=1 resources=["network"]
//! [race-resolved] wait=1 resource="network"
//! [idled] resource="network" index=0
//! [all-idle] wait=1
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let resource = e.resource.as_deref().unwrap_or("unknown");
        match e.kind {
            EventKind::ResourceRegistered => {
                println!(
                    "[registered] resource={resource:?} index={:?} idle={:?}",
                    e.index, e.idle
                );
            }
            EventKind::ResourceIdled => {
                println!("[idled] resource={resource:?} index={:?}", e.index);
            }
            EventKind::WaitInstalled => {
                println!(
                    "[wait-installed] wait={:?} busy={:?} timeout={:?}ms",
                    e.wait, e.busy, e.delay_ms
                );
            }
            EventKind::AllIdle => {
                println!("[all-idle] wait={:?}", e.wait);
            }
            EventKind::StillBusy => {
                println!(
                    "[still-busy] wait={:?} busy={:?} after={:?}ms",
                    e.wait, e.busy, e.delay_ms
                );
            }
            EventKind::WaitTimedOut => {
                println!(
                    "[timed-out] wait={:?} busy={:?} timeout={:?}ms",
                    e.wait, e.busy, e.delay_ms
                );
            }
            EventKind::CallbackPanicked => {
                println!("[callback-panicked] wait={:?} info={:?}", e.wait, e.reason);
            }
            EventKind::RaceSuspected => {
                println!("[race-suspected] wait={:?} resources={:?}", e.wait, e.busy);
            }
            EventKind::RaceResolved => {
                println!("[race-resolved] wait={:?} resource={resource:?}", e.wait);
            }
            EventKind::ProtocolViolation => {
                println!(
                    "[protocol-violation] resource={resource:?} index={:?} err={:?}",
                    e.index, e.reason
                );
            }
            EventKind::CoordinatorStopped => {
                println!("[coordinator-stopped] reason={:?}", e.reason);
            }
            EventKind::SubscriberOverflow => {
                println!(
                    "[subscriber-overflow] subscriber={resource} reason={:?}",
                    e.reason
                );
            }
            EventKind::SubscriberPanicked => {
                println!(
                    "[subscriber-panicked] subscriber={resource} info={}",
                    e.reason.as_deref().unwrap_or("unknown"),
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
