//! Total ordering of all mutate/step operations against the handle.
//!
//! The physics collaborator is only safe when called from one logical
//! sequence at a time. [`ActionSerializer`] is the sole gate: every
//! component -- command handlers, motion runs, the broadcast loop --
//! performs its physics calls inside [`run`](ActionSerializer::run).
//!
//! # Guarantees
//!
//! - No two `run` invocations overlap in time.
//! - Invocations are serviced in submission order. The backing
//!   [`tokio::sync::Mutex`] queues waiters FIFO, so there is no
//!   priority and no starvation beyond FIFO fairness.
//! - A task that panics unwinds to its own caller only; the serializer
//!   is not poisoned for subsequent callers.
//!
//! Tasks are synchronous closures over the handle: a bounded number of
//! physics calls, no sleeping, no awaiting. A task that blocks stalls
//! the whole simulation -- that contract is by construction (the
//! closure cannot await) rather than runtime-enforced.

use tokio::sync::Mutex;

use crate::handle::SimulationHandle;

/// FIFO gate admitting one mutate/step task at a time.
#[derive(Debug)]
pub struct ActionSerializer {
    sim: Mutex<SimulationHandle>,
}

impl ActionSerializer {
    /// Wrap a simulation handle. The serializer takes sole ownership;
    /// all access from here on goes through [`run`](Self::run).
    pub fn new(sim: SimulationHandle) -> Self {
        Self {
            sim: Mutex::new(sim),
        }
    }

    /// Wait for the caller's turn, then execute `task` against the
    /// handle and return its result.
    pub async fn run<T>(&self, task: impl FnOnce(&mut SimulationHandle) -> T) -> T {
        let mut guard = self.sim.lock().await;
        task(&mut guard)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    use dexhand_physics::StubEngine;

    use super::*;
    use crate::handle::SimulationHandle;

    fn make_serializer() -> Arc<ActionSerializer> {
        let engine = StubEngine::with_joints(&["j1"]);
        let handle = SimulationHandle::new(Box::new(engine), "stub model").unwrap();
        Arc::new(ActionSerializer::new(handle))
    }

    #[tokio::test]
    async fn tasks_run_in_submission_order() {
        let serializer = make_serializer();
        let order = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for i in 0..8_u32 {
            let serializer = Arc::clone(&serializer);
            let order = Arc::clone(&order);
            handles.push(tokio::spawn(async move {
                serializer.run(|_sim| ()).await;
                order.lock().await.push(i);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let seen = order.lock().await.clone();
        assert_eq!(seen, vec![0, 1, 2, 3, 4, 5, 6, 7]);
    }

    #[tokio::test]
    async fn tasks_never_overlap() {
        let serializer = make_serializer();
        let in_flight = Arc::new(AtomicU64::new(0));
        let max_seen = Arc::new(AtomicU64::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let serializer = Arc::clone(&serializer);
            let in_flight = Arc::clone(&in_flight);
            let max_seen = Arc::clone(&max_seen);
            handles.push(tokio::spawn(async move {
                serializer
                    .run(|sim| {
                        let now = in_flight.fetch_add(1, Ordering::SeqCst).saturating_add(1);
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        sim.step();
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn panicking_task_does_not_poison_later_callers() {
        let serializer = make_serializer();

        let failing = {
            let serializer = Arc::clone(&serializer);
            tokio::spawn(async move {
                serializer
                    .run(|_sim| {
                        #[allow(clippy::panic)]
                        {
                            panic!("task blew up");
                        }
                    })
                    .await;
            })
        };
        assert!(failing.await.is_err());

        // The next caller gets a clean turn.
        let positions = serializer.run(|sim| sim.read_state()).await;
        assert_eq!(positions.len(), 1);
    }
}
