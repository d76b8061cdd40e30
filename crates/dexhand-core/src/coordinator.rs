//! Top-level coordinator consumed by the HTTP/WebSocket layer.
//!
//! [`Coordinator`] owns the lifecycle of the single
//! [`BroadcastHub`](crate::hub::BroadcastHub) loop and of
//! zero-or-more concurrent motion playback runs. The simulation handle
//! is passed in at construction and wrapped into the
//! [`ActionSerializer`](crate::serializer::ActionSerializer) -- the
//! sole gate to mutation; there is no ambient global simulation state.
//!
//! Every operation is non-blocking from the caller's perspective
//! except [`snapshot`](Coordinator::snapshot), which waits for one
//! serializer turn.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::handle::{JointCommand, SimulationHandle, StateSnapshot};
use crate::hub::{BroadcastHub, StateSubscription};
use crate::limits::JointLimits;
use crate::motion::{MotionError, MotionLibrary};
use crate::player::{self, CancelFlag};
use crate::serializer::ActionSerializer;

/// Errors raised while validating a one-shot joint command.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The command payload violates an invariant. Nothing reached the
    /// simulation.
    #[error("invalid command: {reason}")]
    Invalid {
        /// What is wrong with the payload.
        reason: String,
    },
}

/// One tracked playback run.
#[derive(Debug)]
struct MotionRun {
    id: Uuid,
    name: String,
    cancel: CancelFlag,
    task: JoinHandle<()>,
}

/// Owner of the serializer, the hub, and all playback runs.
#[derive(Debug)]
pub struct Coordinator {
    serializer: Arc<ActionSerializer>,
    hub: Arc<BroadcastHub>,
    motions: MotionLibrary,
    limits: JointLimits,
    runs: Mutex<Vec<MotionRun>>,
    joint_count: usize,
    started_at: DateTime<Utc>,
}

impl Coordinator {
    /// Take ownership of a freshly constructed simulation handle and
    /// assemble the coordination machinery around it.
    pub fn new(
        sim: SimulationHandle,
        limits: JointLimits,
        motions: MotionLibrary,
        broadcast_interval: Duration,
    ) -> Self {
        let joint_count = sim.joint_count();
        let serializer = Arc::new(ActionSerializer::new(sim));
        let hub = Arc::new(BroadcastHub::new(
            Arc::clone(&serializer),
            broadcast_interval,
        ));
        Self {
            serializer,
            hub,
            motions,
            limits,
            runs: Mutex::new(Vec::new()),
            joint_count,
            started_at: Utc::now(),
        }
    }

    /// Read a fresh snapshot of every joint position.
    ///
    /// Waits for one serializer turn.
    pub async fn snapshot(&self) -> StateSnapshot {
        self.serializer.run(|sim| sim.read_state()).await
    }

    /// The joint-limit table loaded at startup.
    pub const fn limits(&self) -> &JointLimits {
        &self.limits
    }

    /// Number of driveable joints in the loaded model.
    pub const fn joint_count(&self) -> usize {
        self.joint_count
    }

    /// Wall-clock time the coordinator was constructed.
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Apply a one-shot command, then advance the simulation one step
    /// on a background task.
    ///
    /// The caller observes the apply (it holds one serializer turn)
    /// but does not block on the step.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Invalid`] for a malformed payload; the
    /// simulation is untouched in that case.
    pub async fn submit_command(&self, command: JointCommand) -> Result<(), CommandError> {
        validate_command(&command)?;

        self.serializer.run(|sim| sim.apply_targets(&command)).await;

        let serializer = Arc::clone(&self.serializer);
        drop(tokio::spawn(async move {
            serializer.run(SimulationHandle::step).await;
        }));
        Ok(())
    }

    /// List the motion names available to [`start_motion`](Self::start_motion).
    pub fn motion_names(&self) -> Result<Vec<String>, MotionError> {
        self.motions.names()
    }

    /// Validate and launch an independent playback run.
    ///
    /// The sequence is loaded and validated -- and an unknown name
    /// rejected -- before any task is scheduled. On success the run
    /// plays on its own task; the returned id can cancel it via
    /// [`stop_motion`](Self::stop_motion).
    ///
    /// # Errors
    ///
    /// [`MotionError::NotFound`] for an unknown name,
    /// [`MotionError::Invalid`] for a bad definition or a
    /// non-positive scale.
    pub async fn start_motion(&self, name: &str, scale: f64) -> Result<Uuid, MotionError> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(MotionError::Invalid {
                reason: format!("scale must be positive, got {scale}"),
            });
        }
        let sequence = self.motions.load(name)?;

        let id = Uuid::new_v4();
        let cancel = CancelFlag::new();
        let task = {
            let serializer = Arc::clone(&self.serializer);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                player::play_motion(&serializer, &sequence, scale, &cancel).await;
            })
        };

        let mut runs = self.runs.lock().await;
        runs.retain(|run| !run.task.is_finished());
        runs.push(MotionRun {
            id,
            name: name.to_owned(),
            cancel,
            task,
        });
        info!(motion = %name, run = %id, scale, "motion playback started");
        Ok(id)
    }

    /// Cancel a live playback run.
    ///
    /// Returns `false` if the run is unknown or already finished.
    pub async fn stop_motion(&self, id: Uuid) -> bool {
        let mut runs = self.runs.lock().await;
        let Some(at) = runs
            .iter()
            .position(|run| run.id == id && !run.task.is_finished())
        else {
            return false;
        };
        let run = runs.swap_remove(at);
        run.cancel.cancel();
        debug!(motion = %run.name, run = %id, "motion playback cancelled");
        true
    }

    /// Number of playback runs still in flight.
    pub async fn active_runs(&self) -> usize {
        let mut runs = self.runs.lock().await;
        runs.retain(|run| !run.task.is_finished());
        runs.len()
    }

    /// Open a streaming channel that receives periodic snapshots.
    ///
    /// The first subscription starts the broadcast loop.
    pub async fn subscribe(&self) -> StateSubscription {
        self.hub.subscribe().await
    }

    /// Close a streaming channel by id.
    pub async fn unsubscribe(&self, id: Uuid) {
        self.hub.unsubscribe(id).await;
    }

    /// Number of currently registered streaming channels.
    pub async fn subscriber_count(&self) -> usize {
        self.hub.subscriber_count().await
    }

    /// Cancel every live run and stop the broadcast loop.
    pub async fn shutdown(&self) {
        let mut runs = self.runs.lock().await;
        for run in runs.drain(..) {
            run.cancel.cancel();
        }
        drop(runs);
        self.hub.shutdown();
        info!("coordinator shut down");
    }
}

/// Reject payloads that could corrupt motor state: every target and
/// the shared max force must be finite, and the force positive.
fn validate_command(command: &JointCommand) -> Result<(), CommandError> {
    if !command.max_force.is_finite() || command.max_force <= 0.0 {
        return Err(CommandError::Invalid {
            reason: format!("max_force must be positive, got {}", command.max_force),
        });
    }
    for (name, value) in &command.targets {
        if !value.is_finite() {
            return Err(CommandError::Invalid {
                reason: format!("target for joint '{name}' is not finite"),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use std::path::PathBuf;

    use dexhand_physics::{StubEngine, StubProbe};

    use super::*;
    use crate::hub::DEFAULT_BROADCAST_INTERVAL;

    fn motions_dir(files: &[(&str, &str)]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("dexhand-coord-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        for (name, contents) in files {
            std::fs::write(dir.join(format!("{name}.yaml")), contents).unwrap();
        }
        dir
    }

    fn make_coordinator(files: &[(&str, &str)]) -> (Arc<Coordinator>, StubProbe) {
        let engine = StubEngine::with_joints(&["j1", "j2"]);
        let probe = engine.probe();
        let handle = SimulationHandle::new(Box::new(engine), "stub model").unwrap();
        let coordinator = Coordinator::new(
            handle,
            JointLimits::new(),
            MotionLibrary::new(motions_dir(files)),
            DEFAULT_BROADCAST_INTERVAL,
        );
        (Arc::new(coordinator), probe)
    }

    const WAVE: &str = r#"
name: wave
frequency: 10
keyframes:
  - time: 0.0
    joints:
      j1: 0.0
  - time: 1.0
    joints:
      j1: 1.57
"#;

    fn command(entries: &[(&str, f64)], max_force: f64) -> JointCommand {
        JointCommand {
            targets: entries
                .iter()
                .map(|&(name, value)| (name.to_owned(), value))
                .collect(),
            max_force,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn submit_command_applies_then_steps_once() {
        let (coordinator, probe) = make_coordinator(&[]);

        coordinator
            .submit_command(command(&[("j1", 0.9)], 5.0))
            .await
            .unwrap();

        // The apply happened synchronously; the step runs on a
        // background task.
        assert_eq!(probe.applied().len(), 1);
        tokio::task::yield_now().await;
        assert_eq!(probe.steps(), 1);

        let snapshot = coordinator.snapshot().await;
        assert_eq!(snapshot.get("j1"), Some(&0.9));
    }

    #[tokio::test]
    async fn invalid_command_has_no_side_effect() {
        let (coordinator, probe) = make_coordinator(&[]);

        let bad_force = coordinator
            .submit_command(command(&[("j1", 0.5)], 0.0))
            .await;
        assert!(matches!(bad_force, Err(CommandError::Invalid { .. })));

        let bad_target = coordinator
            .submit_command(command(&[("j1", f64::NAN)], 5.0))
            .await;
        assert!(matches!(bad_target, Err(CommandError::Invalid { .. })));

        assert!(probe.applied().is_empty());
        assert_eq!(probe.steps(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn start_motion_runs_to_completion() {
        let (coordinator, probe) = make_coordinator(&[("wave", WAVE)]);

        let id = coordinator.start_motion("wave", 1.0).await.unwrap();
        assert_eq!(coordinator.active_runs().await, 1);

        tokio::time::sleep(std::time::Duration::from_millis(1200)).await;
        assert_eq!(coordinator.active_runs().await, 0);
        assert_eq!(probe.applied().len(), 2);
        assert!(!coordinator.stop_motion(id).await);
    }

    #[tokio::test]
    async fn unknown_motion_fails_before_any_task() {
        let (coordinator, probe) = make_coordinator(&[("wave", WAVE)]);

        let result = coordinator.start_motion("shrug", 1.0).await;
        assert!(matches!(result, Err(MotionError::NotFound(_))));
        assert_eq!(coordinator.active_runs().await, 0);
        assert_eq!(probe.steps(), 0);
        assert!(probe.applied().is_empty());
    }

    #[tokio::test]
    async fn non_positive_scale_is_rejected() {
        let (coordinator, _probe) = make_coordinator(&[("wave", WAVE)]);
        for scale in [0.0, -1.0, f64::NAN] {
            let result = coordinator.start_motion("wave", scale).await;
            assert!(matches!(result, Err(MotionError::Invalid { .. })));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stop_motion_cancels_a_live_run() {
        let (coordinator, probe) = make_coordinator(&[("wave", WAVE)]);

        let id = coordinator.start_motion("wave", 1.0).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(250)).await;

        assert!(coordinator.stop_motion(id).await);
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        assert_eq!(coordinator.active_runs().await, 0);

        // Only the first keyframe fired before the cancel.
        assert_eq!(probe.applied().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_runs_are_not_mutually_exclusive() {
        let (coordinator, _probe) = make_coordinator(&[("wave", WAVE), ("wave2", WAVE)]);

        let first = coordinator.start_motion("wave", 1.0).await.unwrap();
        let second = coordinator.start_motion("wave2", 1.0).await.unwrap();
        assert_ne!(first, second);
        assert_eq!(coordinator.active_runs().await, 2);
    }

    #[tokio::test]
    async fn motion_names_are_sorted() {
        let (coordinator, _probe) = make_coordinator(&[("wave", WAVE), ("clench", WAVE)]);
        assert_eq!(
            coordinator.motion_names().unwrap(),
            vec!["clench", "wave"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_runs_and_hub() {
        let (coordinator, _probe) = make_coordinator(&[("wave", WAVE)]);

        let _sub = coordinator.subscribe().await;
        let _id = coordinator.start_motion("wave", 1.0).await.unwrap();

        coordinator.shutdown().await;
        tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        assert_eq!(coordinator.active_runs().await, 0);
    }
}
