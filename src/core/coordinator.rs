//! # Coordinator: the single task that owns all idle state.
//!
//! The [`Coordinator`] owns the [`Registry`] (resources + idle bitmap) and the
//! [`NotificationSlot`] (at most one pending wait) and processes one [`Message`] at a
//! time from its queue. Nothing else ever touches that state, so there are no locks.
//!
//! ## State machine
//! ```text
//!                 notify_when_all_idle (not idle)
//!   ┌──────────┐ ───────────────────────────────► ┌──────────┐ ◄─┐ warning tick (re-arm)
//!   │Idle-loop │                                  │ Watching │ ──┘ race deferred (re-inject)
//!   └──────────┘ ◄─────────────────────────────── └──────────┘
//!        ▲         all-idle │ timed-out
//!        └── notify_when_all_idle (already idle): all-idle fires at once, no timers
//! ```
//!
//! ## Race reconciliation
//! ```text
//! tick ──► scan busy bits
//!            ├─ all busy confirmed ──► warning / timeout
//!            └─ some report idle   ──► enqueue RaceCheck{racy}, enqueue tick again
//!                                        │ (FIFO: RaceCheck is processed first)
//!                                        ▼
//!                               bit now set ──► resolved, tick re-runs
//!                               bit still unset ──► ProtocolViolation (fatal)
//! ```
//!
//! ## Rules
//! - Exactly one terminal callback per wait; timers are cancelled before it runs.
//! - Ticks and race checks of a finished wait are discarded by wait id.
//! - A protocol violation stops the task; [`Coordinator::run`] returns the error and
//!   every [`IdleRegistry`](crate::IdleRegistry) handle replays it.
//! - Callback panics are caught and published as `CallbackPanicked`.
//! - Only handles hold the queue open; the coordinator, timers and resource
//!   callbacks use weak senders, so dropping every handle ends [`Coordinator::run`].

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, OnceLock};

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::core::config::Config;
use crate::core::message::{Message, Tick};
use crate::core::notify::{ActiveWait, IdleNotification, NotificationSlot};
use crate::core::registry::{Registry, Scan};
use crate::core::timer::TimerService;
use crate::error::RegistryError;
use crate::events::{Bus, Event, EventKind};
use crate::resources::{ResourceCallback, ResourceRef};
use crate::subscribers::panic_message;

/// Single-task state machine over the idle bitmap and the pending wait.
///
/// Built by [`RegistryBuilder::build`](crate::RegistryBuilder::build); drive it with
/// [`Coordinator::run`] (usually via `tokio::spawn`).
pub struct Coordinator {
    cfg: Config,
    registry: Registry,
    slot: NotificationSlot,
    rx: mpsc::UnboundedReceiver<Message>,
    tx: mpsc::WeakUnboundedSender<Message>,
    timers: TimerService,
    bus: Bus,
    runtime_token: CancellationToken,
    fatal: Arc<OnceLock<RegistryError>>,
}

impl Coordinator {
    pub(crate) fn new(
        cfg: Config,
        rx: mpsc::UnboundedReceiver<Message>,
        tx: mpsc::WeakUnboundedSender<Message>,
        bus: Bus,
        runtime_token: CancellationToken,
        fatal: Arc<OnceLock<RegistryError>>,
    ) -> Self {
        let timers = TimerService::new(tx.clone(), runtime_token.clone());
        Self {
            cfg,
            registry: Registry::new(),
            slot: NotificationSlot::new(),
            rx,
            tx,
            timers,
            bus,
            runtime_token,
            fatal,
        }
    }

    /// Processes messages until shutdown or a protocol violation.
    ///
    /// ### Exit conditions
    /// - `IdleRegistry::shutdown()` → `Ok(())`, the pending wait is dropped silently
    /// - every `IdleRegistry` handle dropped → `Ok(())`, same as shutdown
    /// - a resource idled without its transition callback → `Err(ProtocolViolation)`
    pub async fn run(mut self) -> Result<(), RegistryError> {
        let result = loop {
            let msg = tokio::select! {
                biased;
                _ = self.runtime_token.cancelled() => break Ok(()),
                msg = self.rx.recv() => match msg {
                    Some(msg) => msg,
                    None => break Ok(()),
                },
            };
            if let Err(err) = self.dispatch(msg) {
                break Err(err);
            }
        };

        let mut stopped = Event::new(EventKind::CoordinatorStopped);
        if let Err(err) = &result {
            let _ = self.fatal.set(err.clone());
            stopped = stopped.with_reason(err.as_label());
        }
        self.deregister();
        self.bus.publish(stopped);
        self.runtime_token.cancel();
        result
    }

    fn dispatch(&mut self, msg: Message) -> Result<(), RegistryError> {
        match msg {
            Message::Register(resource) => self.register(resource),
            Message::ResourceIdled { index } => self.on_resource_idled(index),
            Message::IsIdle { reply } => {
                let idle = self.is_everything_idle();
                let _ = reply.send(idle);
            }
            Message::Notify {
                notification,
                reply,
            } => {
                let res = self.notify_when_all_idle(notification);
                let _ = reply.send(res);
            }
            Message::List { reply } => {
                let _ = reply.send(self.registry.names());
            }
            Message::Tick { wait, tick } => self.on_tick(wait, tick),
            Message::RaceCheck { wait, racy } => return self.on_race_check(wait, &racy),
        }
        Ok(())
    }

    /// Appends the resource, binds its transition callback to the new index, then
    /// seeds the bit from a live poll.
    fn register(&mut self, resource: ResourceRef) {
        let index = self.registry.len();
        resource.register_idle_transition_callback(ResourceCallback::new(index, self.tx.clone()));
        let idle = resource.is_idle_now();
        let name = resource.name().to_string();
        self.registry.push(resource, idle);

        self.bus.publish(
            Event::new(EventKind::ResourceRegistered)
                .with_resource(name)
                .with_index(index)
                .with_idle(idle),
        );
    }

    fn is_everything_idle(&mut self) -> bool {
        let idle = self.registry.all_idle();
        if idle && self.slot.is_active() {
            self.fire_all_idle();
        }
        idle
    }

    fn notify_when_all_idle(
        &mut self,
        mut notification: Box<dyn IdleNotification>,
    ) -> Result<(), RegistryError> {
        self.slot.ensure_vacant()?;

        if self.registry.all_idle() {
            deliver(&self.bus, None, || notification.all_resources_idle());
            self.bus.publish(Event::new(EventKind::AllIdle));
            return Ok(());
        }

        let id = self.slot.next_id();
        let warning = self
            .cfg
            .warning_interval()
            .map(|d| self.timers.schedule(d, id, Tick::Warning));
        let timeout = self
            .cfg
            .hard_timeout()
            .map(|d| self.timers.schedule(d, id, Tick::Timeout));
        self.slot.install(ActiveWait {
            id,
            notification,
            warning,
            timeout,
            started: Instant::now(),
        })?;

        let mut ev = Event::new(EventKind::WaitInstalled)
            .with_wait(id)
            .with_busy(self.registry.busy_names());
        if let Some(d) = self.cfg.hard_timeout() {
            ev = ev.with_delay(d);
        }
        self.bus.publish(ev);
        Ok(())
    }

    fn on_resource_idled(&mut self, index: usize) {
        if !self.registry.mark_idle(index) {
            return;
        }
        let name = self.registry.name(index).unwrap_or_default().to_string();
        self.bus.publish(
            Event::new(EventKind::ResourceIdled)
                .with_resource(name)
                .with_index(index),
        );

        if self.slot.is_active() && self.registry.all_marked_idle() {
            self.fire_all_idle();
        }
    }

    fn on_tick(&mut self, wait: u64, tick: Tick) {
        if !self.slot.is_current(wait) {
            return;
        }

        match self.registry.scan() {
            Scan::Racy(racy) => {
                let names: Vec<String> = racy
                    .iter()
                    .filter_map(|&i| self.registry.name(i))
                    .map(str::to_string)
                    .collect();
                self.bus.publish(
                    Event::new(EventKind::RaceSuspected)
                        .with_wait(wait)
                        .with_busy(names),
                );
                self.enqueue(Message::RaceCheck { wait, racy });
                self.enqueue(Message::Tick { wait, tick });
            }
            Scan::Busy(busy) if busy.is_empty() => self.fire_all_idle(),
            Scan::Busy(busy) => match tick {
                Tick::Warning => self.fire_still_busy(busy),
                Tick::Timeout => self.fire_timed_out(busy),
            },
        }
    }

    fn on_race_check(&mut self, wait: u64, racy: &[usize]) -> Result<(), RegistryError> {
        if !self.slot.is_current(wait) {
            return Ok(());
        }

        for &index in racy {
            let name = self.registry.name(index).unwrap_or_default().to_string();
            if self.registry.is_marked_idle(index) {
                self.bus.publish(
                    Event::new(EventKind::RaceResolved)
                        .with_wait(wait)
                        .with_resource(name)
                        .with_index(index),
                );
                continue;
            }

            let err = RegistryError::ProtocolViolation {
                resource: name.clone(),
                index,
            };
            self.bus.publish(
                Event::new(EventKind::ProtocolViolation)
                    .with_wait(wait)
                    .with_resource(name)
                    .with_index(index)
                    .with_reason(err.to_string()),
            );
            return Err(err);
        }
        Ok(())
    }

    fn fire_all_idle(&mut self) {
        if let Some(mut wait) = self.slot.take() {
            wait.cancel_timers();
            let id = wait.id;
            deliver(&self.bus, Some(id), || wait.notification.all_resources_idle());
            self.bus
                .publish(Event::new(EventKind::AllIdle).with_wait(id));
        }
    }

    fn fire_still_busy(&mut self, busy: Vec<String>) {
        let Some(wait) = self.slot.active_mut() else {
            return;
        };
        let id = wait.id;
        deliver(&self.bus, Some(id), || {
            wait.notification.resources_still_busy(&busy)
        });
        wait.warning = self
            .cfg
            .warning_interval()
            .map(|d| self.timers.schedule(d, id, Tick::Warning));

        self.bus.publish(
            Event::new(EventKind::StillBusy)
                .with_wait(id)
                .with_delay(wait.started.elapsed())
                .with_busy(busy),
        );
    }

    fn fire_timed_out(&mut self, busy: Vec<String>) {
        if let Some(mut wait) = self.slot.take() {
            wait.cancel_timers();
            let id = wait.id;
            let names: Arc<[String]> = busy.clone().into();
            deliver(&self.bus, Some(id), || {
                wait.notification.resources_timed_out(busy)
            });

            let mut ev = Event::new(EventKind::WaitTimedOut)
                .with_wait(id)
                .with_busy(names);
            if let Some(d) = self.cfg.hard_timeout() {
                ev = ev.with_delay(d);
            }
            self.bus.publish(ev);
        }
    }

    /// Drops the pending wait without any callback; its timers are cancelled.
    fn deregister(&mut self) {
        if let Some(mut wait) = self.slot.take() {
            wait.cancel_timers();
        }
    }

    fn enqueue(&self, msg: Message) {
        if let Some(tx) = self.tx.upgrade() {
            let _ = tx.send(msg);
        }
    }
}

/// Runs a notification callback, isolating panics from the coordinator task.
fn deliver(bus: &Bus, wait: Option<u64>, f: impl FnOnce()) {
    if let Err(panic_err) = std::panic::catch_unwind(AssertUnwindSafe(f)) {
        let mut ev = Event::new(EventKind::CallbackPanicked)
            .with_reason(panic_message(panic_err.as_ref()));
        if let Some(id) = wait {
            ev = ev.with_wait(id);
        }
        bus.publish(ev);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RegistryBuilder;
    use crate::core::notify::IdleCallbacks;
    use crate::resources::CountingResource;
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    fn coordinator() -> Coordinator {
        RegistryBuilder::new(Config::default()).build().1
    }

    fn install(coord: &mut Coordinator, log: &Arc<Mutex<Vec<&'static str>>>) {
        let (idle, timeout) = (log.clone(), log.clone());
        let callbacks = IdleCallbacks::new(move || idle.lock().unwrap().push("idle"))
            .on_timeout(move |_| timeout.lock().unwrap().push("timeout"));
        let (reply, _rx) = oneshot::channel();
        coord
            .dispatch(Message::Notify {
                notification: Box::new(callbacks),
                reply,
            })
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_messages_are_ignored() {
        let mut coord = coordinator();
        let jobs = CountingResource::arc("jobs");
        jobs.increment();
        coord.dispatch(Message::Register(jobs.clone())).unwrap();

        let log = Arc::new(Mutex::new(Vec::new()));
        install(&mut coord, &log);
        assert!(coord.slot.is_current(1));

        coord
            .dispatch(Message::Tick {
                wait: 7,
                tick: Tick::Timeout,
            })
            .unwrap();
        coord
            .dispatch(Message::RaceCheck {
                wait: 7,
                racy: vec![0],
            })
            .unwrap();
        assert!(coord.slot.is_current(1));
        assert!(log.lock().unwrap().is_empty());

        coord
            .dispatch(Message::Tick {
                wait: 1,
                tick: Tick::Timeout,
            })
            .unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["timeout"]);
        assert!(!coord.slot.is_active());

        coord
            .dispatch(Message::Tick {
                wait: 1,
                tick: Tick::Timeout,
            })
            .unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["timeout"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transition_for_unknown_index_is_ignored() {
        let mut coord = coordinator();
        let jobs = CountingResource::arc("jobs");
        jobs.increment();
        coord.dispatch(Message::Register(jobs)).unwrap();

        let log = Arc::new(Mutex::new(Vec::new()));
        install(&mut coord, &log);

        coord.dispatch(Message::ResourceIdled { index: 3 }).unwrap();
        assert!(coord.slot.is_active());

        coord.dispatch(Message::ResourceIdled { index: 0 }).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["idle"]);
        assert!(!coord.slot.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_race_check_without_transition_is_violation() {
        let mut coord = coordinator();
        let jobs = CountingResource::arc("jobs");
        jobs.increment();
        coord.dispatch(Message::Register(jobs)).unwrap();

        let log = Arc::new(Mutex::new(Vec::new()));
        install(&mut coord, &log);

        let err = coord
            .dispatch(Message::RaceCheck {
                wait: 1,
                racy: vec![0],
            })
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::ProtocolViolation {
                resource: "jobs".to_string(),
                index: 0,
            }
        );
        assert!(log.lock().unwrap().is_empty());
    }
}
