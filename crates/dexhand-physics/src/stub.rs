//! A recording stub engine for tests.
//!
//! [`StubEngine`] is seeded with a fixed list of revolute joints,
//! ignores the loaded document, jumps joints to their targets on the
//! next step, and records every motor command it receives. The record
//! lives behind a cloneable [`StubProbe`] so tests can keep observing
//! after the engine has been boxed into the simulation handle.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::engine::{BodyId, JointIndex, JointInfo, JointKind, PhysicsEngine};
use crate::error::PhysicsError;

/// One recorded [`set_joint_target`] call.
///
/// [`set_joint_target`]: PhysicsEngine::set_joint_target
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedTarget {
    /// Name of the commanded joint.
    pub joint: String,
    /// Commanded target position in radians.
    pub position: f64,
    /// Commanded maximum force.
    pub max_force: f64,
}

/// Shared view into a [`StubEngine`]'s call record.
///
/// Clones observe the same underlying counters.
#[derive(Debug, Clone, Default)]
pub struct StubProbe {
    steps: Arc<AtomicU64>,
    applied: Arc<Mutex<Vec<AppliedTarget>>>,
}

impl StubProbe {
    /// Number of timesteps executed so far.
    pub fn steps(&self) -> u64 {
        self.steps.load(Ordering::SeqCst)
    }

    /// Every motor command recorded so far, in arrival order.
    pub fn applied(&self) -> Vec<AppliedTarget> {
        self.applied
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, entry: AppliedTarget) {
        self.applied
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }

    fn count_step(&self) {
        self.steps.fetch_add(1, Ordering::SeqCst);
    }
}

/// Deterministic recording engine with instant joint response.
#[derive(Debug, Default)]
pub struct StubEngine {
    names: Vec<String>,
    positions: Vec<f64>,
    targets: Vec<f64>,
    connected: bool,
    loaded: bool,
    probe: StubProbe,
}

impl StubEngine {
    /// Create a stub seeded with the given revolute joint names.
    pub fn with_joints(names: &[&str]) -> Self {
        let count = names.len();
        Self {
            names: names.iter().map(|&n| n.to_owned()).collect(),
            positions: vec![0.0; count],
            targets: vec![0.0; count],
            connected: false,
            loaded: false,
            probe: StubProbe::default(),
        }
    }

    /// A shared handle to this engine's call record.
    pub fn probe(&self) -> StubProbe {
        self.probe.clone()
    }

    /// Current position of a joint by name, if it exists.
    pub fn position(&self, name: &str) -> Option<f64> {
        let idx = self.names.iter().position(|n| n == name)?;
        self.positions.get(idx).copied()
    }
}

impl PhysicsEngine for StubEngine {
    fn connect(&mut self) -> Result<(), PhysicsError> {
        self.connected = true;
        Ok(())
    }

    fn set_gravity(&mut self, _x: f64, _y: f64, _z: f64) {}

    fn load_ground_plane(&mut self) -> Result<(), PhysicsError> {
        if self.connected {
            Ok(())
        } else {
            Err(PhysicsError::NotConnected)
        }
    }

    fn load_model(&mut self, _document: &str) -> Result<BodyId, PhysicsError> {
        if !self.connected {
            return Err(PhysicsError::NotConnected);
        }
        self.loaded = true;
        Ok(BodyId(0))
    }

    fn list_joints(&self, body: BodyId) -> Result<Vec<JointInfo>, PhysicsError> {
        if !self.loaded {
            return Err(PhysicsError::UnknownBody { body });
        }
        Ok(self
            .names
            .iter()
            .enumerate()
            .filter_map(|(idx, name)| {
                u32::try_from(idx).ok().map(|index| JointInfo {
                    index: JointIndex(index),
                    name: name.clone(),
                    kind: JointKind::Revolute,
                })
            })
            .collect())
    }

    fn joint_position(&self, body: BodyId, joint: JointIndex) -> Result<f64, PhysicsError> {
        usize::try_from(joint.0)
            .ok()
            .and_then(|idx| self.positions.get(idx))
            .copied()
            .ok_or(PhysicsError::UnknownJoint { body, joint })
    }

    fn set_joint_target(
        &mut self,
        body: BodyId,
        joint: JointIndex,
        position: f64,
        max_force: f64,
    ) -> Result<(), PhysicsError> {
        let idx = usize::try_from(joint.0)
            .ok()
            .filter(|&idx| idx < self.names.len())
            .ok_or(PhysicsError::UnknownJoint { body, joint })?;
        if let (Some(target), Some(name)) = (self.targets.get_mut(idx), self.names.get(idx)) {
            *target = position;
            self.probe.record(AppliedTarget {
                joint: name.clone(),
                position,
                max_force,
            });
        }
        Ok(())
    }

    fn step_simulation(&mut self) {
        self.positions.clone_from(&self.targets);
        self.probe.count_step();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn ready_stub() -> StubEngine {
        let mut stub = StubEngine::with_joints(&["a", "b"]);
        stub.connect().unwrap();
        let _ = stub.load_model("ignored").unwrap();
        stub
    }

    #[test]
    fn records_targets() {
        let mut stub = ready_stub();
        let probe = stub.probe();
        stub.set_joint_target(BodyId(0), JointIndex(0), 0.5, 5.0)
            .unwrap();
        let applied = probe.applied();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].joint, "a");
        assert_eq!(applied[0].position, 0.5);
    }

    #[test]
    fn step_jumps_to_target() {
        let mut stub = ready_stub();
        let probe = stub.probe();
        stub.set_joint_target(BodyId(0), JointIndex(1), 1.57, 5.0)
            .unwrap();
        assert_eq!(stub.position("b"), Some(0.0));
        stub.step_simulation();
        assert_eq!(stub.position("b"), Some(1.57));
        assert_eq!(probe.steps(), 1);
    }

    #[test]
    fn probe_outlives_boxed_engine() {
        let stub = ready_stub();
        let probe = stub.probe();
        let mut boxed: Box<dyn PhysicsEngine> = Box::new(stub);
        boxed.step_simulation();
        boxed.step_simulation();
        assert_eq!(probe.steps(), 2);
    }

    #[test]
    fn out_of_range_joint_is_error() {
        let mut stub = ready_stub();
        let result = stub.set_joint_target(BodyId(0), JointIndex(9), 0.0, 1.0);
        assert!(matches!(result, Err(PhysicsError::UnknownJoint { .. })));
    }
}
