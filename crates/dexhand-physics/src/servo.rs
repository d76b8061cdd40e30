//! First-order servo engine: the default runtime collaborator.
//!
//! [`ServoEngine`] models position-controlled joints without any real
//! dynamics: each timestep, every joint moves toward its motor target
//! at a rate bounded by the commanded max force. That is enough for
//! clients to observe plausible, continuous joint trajectories, and it
//! is fully deterministic, which the timing tests rely on.
//!
//! Joint discovery scans the loaded document for `<joint name=...
//! type=...>` attributes. This stands in for the external engine's own
//! model loading; it is deliberately not a URDF parser.

use tracing::debug;

use crate::engine::{BodyId, JointIndex, JointInfo, JointKind, PhysicsEngine};
use crate::error::PhysicsError;

/// Radians-per-second of joint travel granted per unit of max force.
///
/// With the default playback force of 5.0 a joint covers 5 rad/s,
/// comfortably faster than any bundled motion sequence demands.
const FORCE_RESPONSE_GAIN: f64 = 1.0;

/// Default fixed timestep, matching the conventional 240 Hz stepping
/// rate of desktop rigid-body engines.
pub const DEFAULT_TIMESTEP: f64 = 1.0 / 240.0;

/// One joint of a loaded servo body.
#[derive(Debug, Clone)]
struct ServoJoint {
    name: String,
    kind: JointKind,
    position: f64,
    target: f64,
    max_force: f64,
}

/// One loaded body: an ordered joint list addressed by index.
#[derive(Debug, Clone, Default)]
struct ServoBody {
    joints: Vec<ServoJoint>,
}

/// Deterministic first-order position-control engine.
#[derive(Debug)]
pub struct ServoEngine {
    timestep: f64,
    connected: bool,
    gravity: [f64; 3],
    ground_loaded: bool,
    bodies: Vec<ServoBody>,
}

impl ServoEngine {
    /// Create an engine with the given fixed timestep in seconds.
    pub const fn new(timestep: f64) -> Self {
        Self {
            timestep,
            connected: false,
            gravity: [0.0, 0.0, 0.0],
            ground_loaded: false,
            bodies: Vec::new(),
        }
    }

    /// The engine's fixed timestep in seconds.
    pub const fn timestep(&self) -> f64 {
        self.timestep
    }

    /// The current gravity vector.
    pub const fn gravity(&self) -> [f64; 3] {
        self.gravity
    }

    /// Whether the ground plane has been loaded.
    pub const fn ground_loaded(&self) -> bool {
        self.ground_loaded
    }

    fn ensure_connected(&self) -> Result<(), PhysicsError> {
        if self.connected {
            Ok(())
        } else {
            Err(PhysicsError::NotConnected)
        }
    }

    fn body(&self, id: BodyId) -> Result<&ServoBody, PhysicsError> {
        usize::try_from(id.0)
            .ok()
            .and_then(|idx| self.bodies.get(idx))
            .ok_or(PhysicsError::UnknownBody { body: id })
    }

    fn joint_mut(
        &mut self,
        body: BodyId,
        joint: JointIndex,
    ) -> Result<&mut ServoJoint, PhysicsError> {
        let slot = usize::try_from(body.0)
            .ok()
            .and_then(|idx| self.bodies.get_mut(idx))
            .ok_or(PhysicsError::UnknownBody { body })?;
        usize::try_from(joint.0)
            .ok()
            .and_then(|idx| slot.joints.get_mut(idx))
            .ok_or(PhysicsError::UnknownJoint { body, joint })
    }
}

impl Default for ServoEngine {
    fn default() -> Self {
        Self::new(DEFAULT_TIMESTEP)
    }
}

impl PhysicsEngine for ServoEngine {
    fn connect(&mut self) -> Result<(), PhysicsError> {
        self.connected = true;
        Ok(())
    }

    fn set_gravity(&mut self, x: f64, y: f64, z: f64) {
        self.gravity = [x, y, z];
    }

    fn load_ground_plane(&mut self) -> Result<(), PhysicsError> {
        self.ensure_connected()?;
        self.ground_loaded = true;
        Ok(())
    }

    fn load_model(&mut self, document: &str) -> Result<BodyId, PhysicsError> {
        self.ensure_connected()?;
        let joints = scan_joints(document);
        if joints.is_empty() {
            return Err(PhysicsError::InvalidModel {
                reason: "no joints declared".to_owned(),
            });
        }

        let id = u32::try_from(self.bodies.len()).map_err(|_err| PhysicsError::InvalidModel {
            reason: "body table full".to_owned(),
        })?;

        debug!(body = id, joints = joints.len(), "servo body loaded");
        self.bodies.push(ServoBody {
            joints: joints
                .into_iter()
                .map(|(name, kind)| ServoJoint {
                    name,
                    kind,
                    position: 0.0,
                    target: 0.0,
                    max_force: 0.0,
                })
                .collect(),
        });
        Ok(BodyId(id))
    }

    fn list_joints(&self, body: BodyId) -> Result<Vec<JointInfo>, PhysicsError> {
        let slot = self.body(body)?;
        Ok(slot
            .joints
            .iter()
            .enumerate()
            .filter_map(|(idx, joint)| {
                u32::try_from(idx).ok().map(|index| JointInfo {
                    index: JointIndex(index),
                    name: joint.name.clone(),
                    kind: joint.kind,
                })
            })
            .collect())
    }

    fn joint_position(&self, body: BodyId, joint: JointIndex) -> Result<f64, PhysicsError> {
        let slot = self.body(body)?;
        usize::try_from(joint.0)
            .ok()
            .and_then(|idx| slot.joints.get(idx))
            .map(|j| j.position)
            .ok_or(PhysicsError::UnknownJoint { body, joint })
    }

    fn set_joint_target(
        &mut self,
        body: BodyId,
        joint: JointIndex,
        position: f64,
        max_force: f64,
    ) -> Result<(), PhysicsError> {
        let slot = self.joint_mut(body, joint)?;
        slot.target = position;
        slot.max_force = max_force;
        Ok(())
    }

    fn step_simulation(&mut self) {
        let timestep = self.timestep;
        for body in &mut self.bodies {
            for joint in &mut body.joints {
                let reach = joint.max_force * FORCE_RESPONSE_GAIN * timestep;
                let delta = (joint.target - joint.position).clamp(-reach, reach);
                joint.position += delta;
            }
        }
    }
}

/// Scan a model document for `<joint ...>` tags and return the declared
/// `(name, type)` pairs in document order.
fn scan_joints(document: &str) -> Vec<(String, JointKind)> {
    let mut joints = Vec::new();
    let mut rest = document;
    while let Some(open) = rest.find("<joint") {
        let Some(tail) = open.checked_add(6).and_then(|at| rest.get(at..)) else {
            break;
        };
        let tag_end = tail.find('>').unwrap_or(tail.len());
        if let Some(tag) = tail.get(..tag_end) {
            if let Some(name) = attr_value(tag, "name") {
                let kind = match attr_value(tag, "type") {
                    Some("revolute" | "continuous") => JointKind::Revolute,
                    Some("prismatic") => JointKind::Prismatic,
                    _ => JointKind::Fixed,
                };
                joints.push((name.to_owned(), kind));
            }
        }
        let Some(next) = tag_end.checked_add(6).and_then(|skip| open.checked_add(skip)) else {
            break;
        };
        match rest.get(next..) {
            Some(remaining) => rest = remaining,
            None => break,
        }
    }
    joints
}

/// Extract the value of `attr="..."` from a single tag's text.
fn attr_value<'a>(tag: &'a str, attr: &str) -> Option<&'a str> {
    let needle = format!("{attr}=\"");
    let start = tag.find(&needle)?;
    let value_at = start.checked_add(needle.len())?;
    let value = tag.get(value_at..)?;
    let end = value.find('"')?;
    value.get(..end)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const MODEL: &str = r#"
<robot name="test_hand">
  <joint name="thumb_mcp" type="revolute"/>
  <joint name="wrist_mount" type="fixed"/>
  <joint name="index_mcp" type="revolute"/>
</robot>
"#;

    fn loaded_engine() -> (ServoEngine, BodyId) {
        let mut engine = ServoEngine::default();
        engine.connect().unwrap();
        engine.load_ground_plane().unwrap();
        let body = engine.load_model(MODEL).unwrap();
        (engine, body)
    }

    #[test]
    fn operations_require_connect() {
        let mut engine = ServoEngine::default();
        assert!(matches!(
            engine.load_ground_plane(),
            Err(PhysicsError::NotConnected)
        ));
        assert!(matches!(
            engine.load_model(MODEL),
            Err(PhysicsError::NotConnected)
        ));
    }

    #[test]
    fn scan_finds_joints_in_order() {
        let joints = scan_joints(MODEL);
        assert_eq!(joints.len(), 3);
        assert_eq!(joints[0], ("thumb_mcp".to_owned(), JointKind::Revolute));
        assert_eq!(joints[1], ("wrist_mount".to_owned(), JointKind::Fixed));
        assert_eq!(joints[2], ("index_mcp".to_owned(), JointKind::Revolute));
    }

    #[test]
    fn model_without_joints_is_rejected() {
        let mut engine = ServoEngine::default();
        engine.connect().unwrap();
        let result = engine.load_model("<robot name=\"empty\"/>");
        assert!(matches!(result, Err(PhysicsError::InvalidModel { .. })));
    }

    #[test]
    fn list_joints_reports_kinds() {
        let (engine, body) = loaded_engine();
        let joints = engine.list_joints(body).unwrap();
        assert_eq!(joints.len(), 3);
        assert_eq!(joints[0].name, "thumb_mcp");
        assert_eq!(joints[0].kind, JointKind::Revolute);
        assert_eq!(joints[1].kind, JointKind::Fixed);
    }

    #[test]
    fn joints_start_at_zero() {
        let (engine, body) = loaded_engine();
        assert_eq!(engine.joint_position(body, JointIndex(0)).unwrap(), 0.0);
    }

    #[test]
    fn step_moves_joint_toward_target() {
        let (mut engine, body) = loaded_engine();
        engine
            .set_joint_target(body, JointIndex(0), 1.0, 5.0)
            .unwrap();

        engine.step_simulation();
        let after_one = engine.joint_position(body, JointIndex(0)).unwrap();
        assert!(after_one > 0.0);
        assert!(after_one < 1.0);

        // Enough steps to converge: 1.0 rad at 5 rad/s needs 0.2s = 48 steps.
        for _ in 0..60 {
            engine.step_simulation();
        }
        let settled = engine.joint_position(body, JointIndex(0)).unwrap();
        assert!((settled - 1.0).abs() < 1e-9);
    }

    #[test]
    fn step_rate_is_bounded_by_force() {
        let (mut engine, body) = loaded_engine();
        engine
            .set_joint_target(body, JointIndex(0), 1.0, 2.0)
            .unwrap();
        engine.step_simulation();
        let travelled = engine.joint_position(body, JointIndex(0)).unwrap();
        let bound = 2.0 * FORCE_RESPONSE_GAIN * engine.timestep();
        assert!((travelled - bound).abs() < 1e-12);
    }

    #[test]
    fn unknown_body_and_joint_are_errors() {
        let (mut engine, body) = loaded_engine();
        assert!(matches!(
            engine.joint_position(BodyId(99), JointIndex(0)),
            Err(PhysicsError::UnknownBody { .. })
        ));
        assert!(matches!(
            engine.set_joint_target(body, JointIndex(99), 0.0, 1.0),
            Err(PhysicsError::UnknownJoint { .. })
        ));
    }
}
