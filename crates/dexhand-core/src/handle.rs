//! The shared simulation handle: one loaded model, one joint map.
//!
//! [`SimulationHandle`] owns the physics collaborator and the
//! name-to-index map built once at construction. It performs no
//! internal locking -- callers must hold an
//! [`ActionSerializer`](crate::serializer::ActionSerializer) turn.
//!
//! Unknown joint names in a command are skipped without error. Clients
//! send permissive, forward-compatible payloads; a target for a joint
//! the loaded model does not have is not a fault.

use std::collections::BTreeMap;

use dexhand_physics::{BodyId, JointIndex, JointKind, PhysicsEngine, PhysicsError};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// World gravity along z, in m/s^2.
const GRAVITY_Z: f64 = -9.81;

/// Point-in-time mapping of joint name to position in radians.
///
/// Produced fresh on every read; a snapshot is stale the instant the
/// simulation steps again.
pub type StateSnapshot = BTreeMap<String, f64>;

/// A batch of joint position targets with one shared max force.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointCommand {
    /// Target angle in radians per joint name.
    pub targets: BTreeMap<String, f64>,

    /// Maximum motor force applied to every target in the batch.
    #[serde(default = "default_max_force")]
    pub max_force: f64,
}

/// Default motor force when a command omits it.
pub const fn default_max_force() -> f64 {
    5.0
}

/// Errors raised while constructing the simulation.
///
/// Any failure here is a configuration error: the process refuses to
/// start rather than retrying.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// The physics collaborator rejected an operation during setup.
    #[error("physics setup failed: {source}")]
    Physics {
        /// The underlying engine error.
        #[from]
        source: PhysicsError,
    },
}

/// The single shared handle to the loaded kinematic model.
pub struct SimulationHandle {
    engine: Box<dyn PhysicsEngine>,
    body: BodyId,
    joints: BTreeMap<String, JointIndex>,
}

impl SimulationHandle {
    /// Connect the engine, load the ground plane and the model, and
    /// build the revolute-joint name map.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError`] if the engine rejects any setup
    /// call. Failure is fatal at startup and never retried.
    pub fn new(
        mut engine: Box<dyn PhysicsEngine>,
        document: &str,
    ) -> Result<Self, SimulationError> {
        engine.connect()?;
        engine.set_gravity(0.0, 0.0, GRAVITY_Z);
        engine.load_ground_plane()?;
        let body = engine.load_model(document)?;

        let joints: BTreeMap<String, JointIndex> = engine
            .list_joints(body)?
            .into_iter()
            .filter(|info| info.kind == JointKind::Revolute)
            .map(|info| (info.name, info.index))
            .collect();

        info!(joints = joints.len(), "kinematic model loaded");

        Ok(Self {
            engine,
            body,
            joints,
        })
    }

    /// Forward a position-control command for every target whose joint
    /// name resolves in the loaded model.
    ///
    /// Non-resolving names are skipped silently. A rejection from the
    /// engine for a mapped joint is logged and skipped; it never aborts
    /// the rest of the batch.
    pub fn apply_targets(&mut self, command: &JointCommand) {
        for (name, &position) in &command.targets {
            let Some(&index) = self.joints.get(name) else {
                continue;
            };
            if let Err(error) =
                self.engine
                    .set_joint_target(self.body, index, position, command.max_force)
            {
                warn!(joint = %name, error = %error, "motor command rejected");
            }
        }
    }

    /// Read the current position of every mapped joint.
    pub fn read_state(&self) -> StateSnapshot {
        self.joints
            .iter()
            .filter_map(|(name, &index)| {
                self.engine
                    .joint_position(self.body, index)
                    .ok()
                    .map(|position| (name.clone(), position))
            })
            .collect()
    }

    /// Advance the simulation by one fixed timestep.
    pub fn step(&mut self) {
        self.engine.step_simulation();
    }

    /// Number of mapped (revolute) joints.
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Mapped joint names in sorted order.
    pub fn joint_names(&self) -> Vec<String> {
        self.joints.keys().cloned().collect()
    }
}

impl std::fmt::Debug for SimulationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationHandle")
            .field("body", &self.body)
            .field("joints", &self.joints.len())
            .finish_non_exhaustive()
    }
}
