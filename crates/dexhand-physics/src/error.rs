//! Error types for the physics collaborator layer.

use crate::engine::{BodyId, JointIndex};

/// Errors surfaced by [`PhysicsEngine`](crate::engine::PhysicsEngine)
/// implementations.
#[derive(Debug, thiserror::Error)]
pub enum PhysicsError {
    /// An operation was attempted before [`connect`] was called.
    ///
    /// [`connect`]: crate::engine::PhysicsEngine::connect
    #[error("engine not connected")]
    NotConnected,

    /// The model document could not be interpreted by the engine.
    #[error("invalid model document: {reason}")]
    InvalidModel {
        /// Why the engine rejected the document.
        reason: String,
    },

    /// A body handle does not refer to a loaded body.
    #[error("unknown {body}")]
    UnknownBody {
        /// The offending handle.
        body: BodyId,
    },

    /// A joint index is out of range for the given body.
    #[error("unknown {joint} on {body}")]
    UnknownJoint {
        /// The body the joint was addressed on.
        body: BodyId,
        /// The offending joint index.
        joint: JointIndex,
    },
}
