//! Concurrency coordinator for the dexhand simulator.
//!
//! This crate is the part of the system with real ordering, lifecycle,
//! and failure-handling concerns. Multiple independent asynchronous
//! actors -- HTTP command requests, timed motion-playback runs, and the
//! periodic state broadcaster -- all read and mutate one shared
//! [`SimulationHandle`]. The physics collaborator underneath is only
//! safe when called from one logical sequence at a time, so every
//! mutation routes through the [`ActionSerializer`].
//!
//! # Architecture
//!
//! ```text
//! HTTP / WS layer --> Coordinator --> ActionSerializer --> SimulationHandle
//!                                          ^    ^
//!                       MotionPlayer runs -+    |
//!                       BroadcastHub loop ------+
//! ```
//!
//! State flows the opposite direction: [`SimulationHandle`] snapshots
//! move through the [`BroadcastHub`] to every subscribed channel at a
//! fixed cadence.
//!
//! # Guarantees
//!
//! - At most one mutate/step sequence is in flight at any instant,
//!   serviced in FIFO submission order ([`ActionSerializer`]).
//! - At most one broadcast delivery loop exists process-wide, started
//!   lazily by the first subscriber ([`BroadcastHub`]).
//! - Motion runs are independent and may interleave; each individual
//!   apply/step call is serialized, and each run carries an explicit
//!   cancellation flag ([`player`]).

pub mod config;
pub mod coordinator;
pub mod handle;
pub mod hub;
pub mod limits;
pub mod model;
pub mod motion;
pub mod player;
pub mod serializer;

pub use config::{ConfigError, SimConfig};
pub use coordinator::{CommandError, Coordinator};
pub use handle::{JointCommand, SimulationError, SimulationHandle, StateSnapshot};
pub use hub::{BroadcastHub, StateSubscription, DEFAULT_BROADCAST_INTERVAL};
pub use limits::{load_limits, parse_limits, JointLimit, JointLimits};
pub use model::{render_model, ModelError, ModelPaths, ModelSourceKind};
pub use motion::{Keyframe, MotionError, MotionLibrary, MotionSequence};
pub use player::{play_motion, CancelFlag, PLAYBACK_MAX_FORCE};
pub use serializer::ActionSerializer;
