use std::sync::{Arc, OnceLock};

use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use crate::{
    core::Config,
    events::{Bus, Event},
    subscribers::{Subscribe, SubscriberSet},
};

use super::{coordinator::Coordinator, handle::IdleRegistry};

/// Builder for an [`IdleRegistry`] and its [`Coordinator`].
pub struct RegistryBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl RegistryBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (registrations, warnings, races, outcomes)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the handle and the coordinator.
    ///
    /// This consumes the builder and wires the runtime components:
    /// - event bus for broadcasting
    /// - coordinator queue: the handle holds the only strong sender; resource
    ///   callbacks, timers and the coordinator hold weak ones
    /// - subscriber workers (only when subscribers were given)
    ///
    /// The coordinator does nothing until [`Coordinator::run`] is polled. Must be
    /// called within a tokio runtime when subscribers are set.
    pub fn build(self) -> (IdleRegistry, Coordinator) {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let runtime_token = CancellationToken::new();
        let fatal = Arc::new(OnceLock::new());
        let (tx, rx) = mpsc::unbounded_channel();

        let subs = SubscriberSet::new(self.subscribers, bus.clone());
        if !subs.is_empty() {
            subscriber_listener(subs, &bus, runtime_token.clone());
        }

        let weak_tx = tx.downgrade();
        let registry = IdleRegistry::new(
            tx,
            bus.clone(),
            runtime_token.clone(),
            Arc::clone(&fatal),
            self.cfg.timeout,
        );
        let coordinator = Coordinator::new(self.cfg, rx, weak_tx, bus, runtime_token, fatal);
        (registry, coordinator)
    }
}

/// Forwards bus events to the subscriber set until the runtime stops, then drains
/// the subscriber queues.
fn subscriber_listener(subs: SubscriberSet, bus: &Bus, token: CancellationToken) {
    let mut rx = bus.subscribe();
    let bus = bus.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                ev = rx.recv() => match ev {
                    Ok(ev) => subs.emit(&ev),
                    Err(broadcast::error::RecvError::Lagged(_)) => {
                        bus.publish(Event::subscriber_overflow("listener", "lagged"));
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = token.cancelled() => {
                    while let Ok(ev) = rx.try_recv() {
                        subs.emit(&ev);
                    }
                    break;
                }
            }
        }
        subs.shutdown().await;
    });
}
