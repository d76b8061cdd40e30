//! The [`PhysicsEngine`] trait and the identifier types it hands out.
//!
//! The trait mirrors the operations the simulator actually consumes
//! from an external rigid-body engine: connect, configure gravity,
//! load a ground plane and a kinematic model, enumerate joints, query
//! joint positions, command joint motors, and advance one timestep.
//!
//! Implementations are *not* required to be internally thread-safe.
//! The coordinator core guarantees that all calls arrive from one
//! logical sequence at a time.

use std::fmt;

use crate::error::PhysicsError;

/// Handle to a body loaded into the engine.
///
/// Returned by [`PhysicsEngine::load_model`] and passed back into every
/// joint-level operation. Only meaningful to the engine that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub(crate) u32);

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "body#{}", self.0)
    }
}

/// Index of a joint within a loaded body.
///
/// Stable for the lifetime of the body. The coordinator core builds a
/// name-to-index map once at startup and addresses joints by index from
/// then on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JointIndex(pub(crate) u32);

impl fmt::Display for JointIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "joint#{}", self.0)
    }
}

/// Kinematic joint categories the simulator distinguishes.
///
/// Only revolute joints carry positions the simulator reads back;
/// everything else is opaque structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointKind {
    /// A rotational joint (the only kind the simulator drives).
    Revolute,
    /// A linear sliding joint.
    Prismatic,
    /// A rigid connection.
    Fixed,
}

/// Descriptor for one joint of a loaded body.
#[derive(Debug, Clone)]
pub struct JointInfo {
    /// Index of the joint within its body.
    pub index: JointIndex,
    /// The joint's name as declared in the model document.
    pub name: String,
    /// The joint's kinematic category.
    pub kind: JointKind,
}

/// The external rigid-body engine, reduced to the operations the
/// simulator consumes.
///
/// # Contract
///
/// - [`connect`](Self::connect) must be called before any other
///   operation; implementations return [`PhysicsError::NotConnected`]
///   otherwise.
/// - Callers must serialize access. Implementations may assume all
///   calls arrive from one logical sequence at a time.
pub trait PhysicsEngine: Send {
    /// Establish the engine session.
    fn connect(&mut self) -> Result<(), PhysicsError>;

    /// Set the world gravity vector in m/s^2.
    fn set_gravity(&mut self, x: f64, y: f64, z: f64);

    /// Load the static ground plane into the world.
    fn load_ground_plane(&mut self) -> Result<(), PhysicsError>;

    /// Load a kinematic model from its document text and return a
    /// handle to the created body.
    fn load_model(&mut self, document: &str) -> Result<BodyId, PhysicsError>;

    /// Enumerate the joints of a loaded body in index order.
    fn list_joints(&self, body: BodyId) -> Result<Vec<JointInfo>, PhysicsError>;

    /// Read the current position (radians) of one joint.
    fn joint_position(&self, body: BodyId, joint: JointIndex) -> Result<f64, PhysicsError>;

    /// Command one joint's motor toward a target position with the
    /// given maximum force.
    fn set_joint_target(
        &mut self,
        body: BodyId,
        joint: JointIndex,
        position: f64,
        max_force: f64,
    ) -> Result<(), PhysicsError>;

    /// Advance the world by one fixed timestep.
    fn step_simulation(&mut self);
}
