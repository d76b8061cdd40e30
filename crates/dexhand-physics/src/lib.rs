//! Physics collaborator abstraction for the dexhand simulator.
//!
//! The simulator treats rigid-body physics as an opaque collaborator
//! behind the [`PhysicsEngine`] trait: load a kinematic model, query
//! joint positions, set joint motor targets, advance one timestep.
//! Physics correctness is explicitly not this crate's concern -- the
//! trait exists so the coordinator core can be driven against any
//! engine, including the deterministic test doubles shipped here.
//!
//! Two implementations are provided:
//!
//! - [`ServoEngine`] -- the default runtime collaborator. A first-order
//!   position-control model: each step moves every joint toward its
//!   motor target at a rate bounded by the commanded max force.
//! - [`StubEngine`] -- a recording collaborator for tests. Joints jump
//!   to their targets instantly and every motor command is recorded.
//!
//! Neither implementation performs internal locking. Callers must
//! serialize access; see the coordinator core crate.

pub mod engine;
pub mod error;
pub mod servo;
pub mod stub;

pub use engine::{BodyId, JointIndex, JointInfo, JointKind, PhysicsEngine};
pub use error::PhysicsError;
pub use servo::ServoEngine;
pub use stub::{AppliedTarget, StubEngine, StubProbe};
