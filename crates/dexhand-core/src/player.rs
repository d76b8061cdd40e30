//! Timed playback of one motion sequence.
//!
//! [`play_motion`] drives a single sequence over wall-clock time. Each
//! player tick, any keyframe whose scaled offset has elapsed is
//! applied through the serializer, then the simulation advances one
//! step and the player sleeps for one tick period. Keyframe processing
//! usually finishes well before the declared total duration, so the
//! player sleeps out the remainder -- a run's wall-clock length
//! matches `last_keyframe.time * scale` regardless of tick count.
//!
//! Runs are independent: several may play concurrently with each other
//! and with the broadcast loop. Each individual apply/step is
//! serialized, but two simultaneous motions can interleave and fight
//! over the same joints -- last writer wins. That is accepted behavior
//! preserved for compatibility, not a defect to fix with run-level
//! exclusivity.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::handle::{JointCommand, SimulationHandle};
use crate::motion::MotionSequence;
use crate::serializer::ActionSerializer;

/// Motor force used for every playback target.
pub const PLAYBACK_MAX_FORCE: f64 = 5.0;

/// Cooperative cancellation flag for one playback run.
///
/// The player checks the flag at every tick, so cancellation takes
/// effect within one tick period.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create an unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Play one sequence to completion (or cancellation).
///
/// A sequence with zero keyframes returns immediately without a single
/// apply or step.
pub async fn play_motion(
    serializer: &ActionSerializer,
    sequence: &MotionSequence,
    scale: f64,
    cancel: &CancelFlag,
) {
    let Some(_last) = sequence.keyframes.last() else {
        debug!(motion = %sequence.name, "empty sequence, nothing to play");
        return;
    };

    let total = duration_secs(sequence.total_time(scale));
    let period = sequence.tick_period();
    let start = Instant::now();

    let mut frames = sequence.keyframes.iter();
    let mut pending = frames.next();

    while let Some(frame) = pending {
        if cancel.is_cancelled() {
            debug!(motion = %sequence.name, "playback cancelled");
            return;
        }

        if start.elapsed() >= duration_secs(frame.time * scale) {
            let command = JointCommand {
                targets: frame.joints.clone(),
                max_force: PLAYBACK_MAX_FORCE,
            };
            serializer.run(|sim| sim.apply_targets(&command)).await;
            pending = frames.next();
        }

        serializer.run(SimulationHandle::step).await;
        sleep(period).await;
    }

    // Hold the declared duration even when the keyframes were consumed
    // early.
    let remaining = total.saturating_sub(start.elapsed());
    if !remaining.is_zero() {
        sleep(remaining).await;
    }
    debug!(motion = %sequence.name, scale, "playback finished");
}

/// Seconds to [`Duration`], clamping negatives and NaN to zero.
fn duration_secs(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds).unwrap_or_default()
}
