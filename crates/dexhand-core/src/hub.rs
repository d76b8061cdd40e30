//! The periodic state broadcaster.
//!
//! [`BroadcastHub`] owns the single "sample state, push to all
//! subscribers, advance physics" loop. The loop starts lazily when the
//! first subscriber registers and is never restarted for the process
//! lifetime; requesting a start while running is a no-op. A duplicate
//! loop would double the physics step rate, so the start-once guard is
//! an atomic check-and-set rather than a flag re-checked from
//! arbitrary callers.
//!
//! Every tick executes inside one
//! [`ActionSerializer`](crate::serializer::ActionSerializer) turn:
//! one snapshot is read, delivered to every registered channel, and
//! the simulation advances one step. All subscribers active at the
//! start of a tick therefore see the same snapshot.
//!
//! Delivery is best-effort. A channel whose send fails -- closed by a
//! disconnected client, or full because a slow consumer fell behind --
//! is removed from the registry without retry and without affecting
//! the other channels. Slow or dead consumers must never stall the
//! simulation; that is a deliberate backpressure policy, not a defect.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};
use uuid::Uuid;

use crate::handle::StateSnapshot;
use crate::serializer::ActionSerializer;

/// Default broadcast period: 20 Hz.
pub const DEFAULT_BROADCAST_INTERVAL: Duration = Duration::from_millis(50);

/// Snapshots buffered per subscriber before it counts as fallen
/// behind and is dropped.
const SUBSCRIBER_BUFFER: usize = 32;

/// One registered output channel.
#[derive(Debug)]
struct Subscriber {
    id: Uuid,
    sender: mpsc::Sender<StateSnapshot>,
}

/// A live subscription to the state stream.
///
/// Dropping the subscription closes the channel; the hub removes the
/// dead entry on its next delivery attempt.
#[derive(Debug)]
pub struct StateSubscription {
    id: Uuid,
    receiver: mpsc::Receiver<StateSnapshot>,
}

impl StateSubscription {
    /// Identity of this subscription within the hub registry.
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Receive the next snapshot, or `None` once the hub has dropped
    /// this subscriber.
    pub async fn recv(&mut self) -> Option<StateSnapshot> {
        self.receiver.recv().await
    }
}

/// Registry plus the lazily started delivery loop.
#[derive(Debug)]
pub struct BroadcastHub {
    serializer: Arc<ActionSerializer>,
    subscribers: Mutex<Vec<Subscriber>>,
    interval: Duration,
    started: AtomicBool,
    stopped: AtomicBool,
}

impl BroadcastHub {
    /// Create a hub in the Stopped state with the given tick period.
    pub fn new(serializer: Arc<ActionSerializer>, interval: Duration) -> Self {
        Self {
            serializer,
            subscribers: Mutex::new(Vec::new()),
            interval,
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        }
    }

    /// Register a new output channel and start the delivery loop if it
    /// is not running yet.
    pub async fn subscribe(self: &Arc<Self>) -> StateSubscription {
        let (sender, receiver) = mpsc::channel(SUBSCRIBER_BUFFER);
        let id = Uuid::new_v4();
        self.subscribers.lock().await.push(Subscriber { id, sender });
        debug!(subscriber = %id, "state subscriber registered");
        self.ensure_started();
        StateSubscription { id, receiver }
    }

    /// Remove a subscriber from the registry.
    ///
    /// Safe to call for ids already dropped by a failed delivery.
    pub async fn unsubscribe(&self, id: Uuid) {
        self.subscribers.lock().await.retain(|sub| sub.id != id);
        debug!(subscriber = %id, "state subscriber removed");
    }

    /// Number of currently registered subscribers.
    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.lock().await.len()
    }

    /// Whether the delivery loop has been started.
    pub fn is_running(&self) -> bool {
        self.started.load(Ordering::Acquire) && !self.stopped.load(Ordering::Acquire)
    }

    /// Stop the delivery loop at its next tick boundary.
    ///
    /// Once stopped the hub stays stopped; it is not restartable.
    pub fn shutdown(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    /// Start the delivery loop exactly once per process lifetime.
    ///
    /// Many callers may race here; the compare-and-swap admits one.
    fn ensure_started(self: &Arc<Self>) {
        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let hub = Arc::clone(self);
            drop(tokio::spawn(async move { hub.run_loop().await }));
        }
    }

    /// The delivery loop body. Runs until [`shutdown`](Self::shutdown),
    /// including through intervals with zero subscribers.
    async fn run_loop(&self) {
        info!(
            interval_ms = u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX),
            "state broadcast loop started"
        );
        let period = self.interval.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if self.stopped.load(Ordering::Acquire) {
                break;
            }

            let mut subscribers = self.subscribers.lock().await;
            self.serializer
                .run(|sim| {
                    let snapshot = sim.read_state();
                    subscribers.retain(|sub| match sub.sender.try_send(snapshot.clone()) {
                        Ok(()) => true,
                        Err(_failed) => {
                            debug!(subscriber = %sub.id, "delivery failed, dropping subscriber");
                            false
                        }
                    });
                    sim.step();
                })
                .await;
        }

        info!("state broadcast loop stopped");
    }
}
