//! # Delayed delivery of escalation ticks.
//!
//! [`TimerService`] schedules a [`Tick`] for delivery into the coordinator queue after
//! a delay. Each scheduled tick is a tiny tokio task racing `time::sleep` against its
//! own cancellation token; the returned [`TimerHandle`] cancels it.
//!
//! ## Rules
//! - Dropping a [`TimerHandle`] cancels the timer (RAII).
//! - Timer tokens are children of the runtime token: shutdown cancels every timer.
//! - A tick that already reached the queue cannot be recalled; the coordinator
//!   discards it by wait id.
//! - Timers hold a weak sender; a pending timer never keeps the queue open.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::core::message::{Message, Tick};

/// Schedules ticks onto the coordinator queue.
#[derive(Clone)]
pub struct TimerService {
    tx: mpsc::WeakUnboundedSender<Message>,
    runtime_token: CancellationToken,
}

impl TimerService {
    /// Creates a timer service delivering into `tx`.
    pub fn new(tx: mpsc::WeakUnboundedSender<Message>, runtime_token: CancellationToken) -> Self {
        Self { tx, runtime_token }
    }

    /// Delivers `Message::Tick { wait, tick }` after `delay`, unless cancelled first.
    pub fn schedule(&self, delay: Duration, wait: u64, tick: Tick) -> TimerHandle {
        let token = self.runtime_token.child_token();
        let cancelled = token.clone();
        let tx = self.tx.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {}
                _ = time::sleep(delay) => {
                    if let Some(tx) = tx.upgrade() {
                        let _ = tx.send(Message::Tick { wait, tick });
                    }
                }
            }
        });

        TimerHandle {
            guard: Some(token.drop_guard()),
        }
    }
}

/// Cancelable handle to a scheduled tick.
pub struct TimerHandle {
    guard: Option<DropGuard>,
}

impl TimerHandle {
    /// Cancels the timer if it has not fired yet.
    pub fn cancel(&mut self) {
        if let Some(guard) = self.guard.take() {
            drop(guard);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_tick_delivered_after_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let timers = TimerService::new(tx.downgrade(), CancellationToken::new());

        let start = time::Instant::now();
        let _handle = timers.schedule(Duration::from_secs(5), 3, Tick::Warning);

        match rx.recv().await {
            Some(Message::Tick { wait, tick }) => {
                assert_eq!(wait, 3);
                assert_eq!(tick, Tick::Warning);
            }
            other => panic!("unexpected message: {other:?}"),
        }
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(5), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(6), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_handle_cancels_tick() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let timers = TimerService::new(tx.downgrade(), CancellationToken::new());

        let mut handle = timers.schedule(Duration::from_secs(1), 1, Tick::Timeout);
        handle.cancel();
        drop(timers.schedule(Duration::from_secs(1), 2, Tick::Timeout));

        time::sleep(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_runtime_token_cancels_timers() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();
        let timers = TimerService::new(tx.downgrade(), token.clone());

        let _handle = timers.schedule(Duration::from_secs(1), 1, Tick::Warning);
        token.cancel();

        time::sleep(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_timer_does_not_keep_queue_open() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let timers = TimerService::new(tx.downgrade(), CancellationToken::new());

        let _handle = timers.schedule(Duration::from_secs(1), 1, Tick::Warning);
        drop(tx);

        assert!(rx.recv().await.is_none());
    }
}
