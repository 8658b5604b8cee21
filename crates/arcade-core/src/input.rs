//! Device-independent movement intents and the adapter that maps raw
//! keyboard, pointer, and touch state onto them.

use std::f32::consts::PI;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::error::TransientInputError;

/// Largest accepted `Steer::Delta` magnitude.
pub const MAX_STEER_DELTA: f32 = 1.0;

/// Steering component of an intent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Steer {
    #[default]
    None,
    /// Normalized rate in `[-1, 1]`; positive is counter-clockwise / downward.
    Delta(f32),
    /// Absolute target angle, radians.
    TargetAngle(f32),
    /// Absolute target offset along a linear axis.
    TargetOffset(f32),
}

/// Per-tick movement intent for one entity.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MovementIntent {
    pub steer: Steer,
    /// Rising edge only; held keys do not re-trigger.
    pub jump: bool,
    /// Level-triggered.
    pub crouch: bool,
}

impl MovementIntent {
    pub const IDLE: MovementIntent = MovementIntent {
        steer: Steer::None,
        jump: false,
        crouch: false,
    };

    pub fn steer(steer: Steer) -> Self {
        Self {
            steer,
            ..Self::IDLE
        }
    }

    pub fn validate(&self) -> Result<(), TransientInputError> {
        match self.steer {
            Steer::None => Ok(()),
            Steer::Delta(d) if !d.is_finite() => Err(TransientInputError::NonFinite("steer delta")),
            Steer::Delta(d) if d.abs() > MAX_STEER_DELTA => Err(TransientInputError::OutOfRange {
                field: "steer delta",
                value: d,
            }),
            Steer::TargetAngle(a) if !a.is_finite() => {
                Err(TransientInputError::NonFinite("target angle"))
            },
            Steer::TargetOffset(o) if !o.is_finite() => {
                Err(TransientInputError::NonFinite("target offset"))
            },
            _ => Ok(()),
        }
    }

    /// Validate and recover: out-of-range deltas clamp, non-finite steering
    /// is dropped. Jump and crouch pass through.
    pub fn sanitize(self, entity: EntityId) -> MovementIntent {
        match self.validate() {
            Ok(()) => self,
            Err(error) => {
                tracing::debug!(entity, %error, "Recovering malformed intent");
                let steer = match self.steer {
                    Steer::Delta(d) if d.is_finite() => {
                        Steer::Delta(d.clamp(-MAX_STEER_DELTA, MAX_STEER_DELTA))
                    },
                    _ => Steer::None,
                };
                MovementIntent { steer, ..self }
            },
        }
    }
}

/// Discrete directional and action keys held this frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyState {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub crouch: bool,
}

/// On-screen touch regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TouchRegion {
    Left,
    Right,
    Jump,
    Crouch,
}

/// What the pointer did since the previous frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum PointerSample {
    /// No event; the last known position still holds.
    #[default]
    Unchanged,
    Moved(Vec2),
    /// The pointer left the play area.
    Left,
}

/// Raw device state for one frame, in play-area coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RawInput {
    pub keys: KeyState,
    pub pointer: PointerSample,
    pub touch: Option<TouchRegion>,
}

/// How a pointer position becomes a steering target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum PointerMapping {
    #[default]
    Ignore,
    /// Angle of the pointer around `pivot`.
    Angular { pivot: Vec2 },
    /// Vertical pointer coordinate clamped into `[min, max]`.
    Linear { min: f32, max: f32 },
}

/// Stateful mapper from [`RawInput`] to [`MovementIntent`].
#[derive(Debug, Clone, Default)]
pub struct InputAdapter {
    mapping: PointerMapping,
    pointer: Option<Vec2>,
    prev_jump: bool,
}

impl InputAdapter {
    pub fn new(mapping: PointerMapping) -> Self {
        Self {
            mapping,
            pointer: None,
            prev_jump: false,
        }
    }

    /// Map one frame of raw input. Pointer steering wins over keys when
    /// the pointer is inside the play area.
    pub fn collect(&mut self, raw: &RawInput) -> MovementIntent {
        match raw.pointer {
            PointerSample::Moved(p) if p.is_finite() => self.pointer = Some(p),
            PointerSample::Moved(_) => {},
            PointerSample::Left => self.pointer = None,
            PointerSample::Unchanged => {},
        }

        let steer = self
            .pointer_steer()
            .unwrap_or_else(|| key_steer(raw.keys, raw.touch));

        let jump_held = raw.keys.jump || raw.touch == Some(TouchRegion::Jump);
        let jump = jump_held && !self.prev_jump;
        self.prev_jump = jump_held;

        MovementIntent {
            steer,
            jump,
            crouch: raw.keys.crouch || raw.touch == Some(TouchRegion::Crouch),
        }
    }

    fn pointer_steer(&self) -> Option<Steer> {
        let p = self.pointer?;
        match self.mapping {
            PointerMapping::Ignore => None,
            PointerMapping::Angular { pivot } => {
                let d = p - pivot;
                if d.length_squared() < 1e-6 {
                    return None;
                }
                Some(Steer::TargetAngle(d.y.atan2(d.x).clamp(-PI, PI)))
            },
            PointerMapping::Linear { min, max } => Some(Steer::TargetOffset(p.y.clamp(min, max))),
        }
    }
}

fn key_steer(keys: KeyState, touch: Option<TouchRegion>) -> Steer {
    let left = keys.left || touch == Some(TouchRegion::Left);
    let right = keys.right || touch == Some(TouchRegion::Right);
    match (left, right) {
        (true, false) => Steer::Delta(-1.0),
        (false, true) => Steer::Delta(1.0),
        _ => Steer::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(left: bool, right: bool, jump: bool) -> RawInput {
        RawInput {
            keys: KeyState {
                left,
                right,
                jump,
                crouch: false,
            },
            ..RawInput::default()
        }
    }

    #[test]
    fn keys_map_to_delta() {
        let mut adapter = InputAdapter::new(PointerMapping::Ignore);
        assert_eq!(adapter.collect(&keys(true, false, false)).steer, Steer::Delta(-1.0));
        assert_eq!(adapter.collect(&keys(false, true, false)).steer, Steer::Delta(1.0));
        assert_eq!(adapter.collect(&keys(true, true, false)).steer, Steer::None);
    }

    #[test]
    fn jump_is_edge_triggered() {
        let mut adapter = InputAdapter::default();
        assert!(adapter.collect(&keys(false, false, true)).jump);
        assert!(!adapter.collect(&keys(false, false, true)).jump, "held key must not re-trigger");
        assert!(!adapter.collect(&keys(false, false, false)).jump);
        assert!(adapter.collect(&keys(false, false, true)).jump);
    }

    #[test]
    fn pointer_takes_precedence_and_persists() {
        let mut adapter = InputAdapter::new(PointerMapping::Angular { pivot: Vec2::ZERO });
        let mut raw = keys(true, false, false);
        raw.pointer = PointerSample::Moved(Vec2::new(0.0, 10.0));
        let intent = adapter.collect(&raw);
        match intent.steer {
            Steer::TargetAngle(a) => assert!((a - PI / 2.0).abs() < 1e-5),
            other => panic!("expected angular target, got {other:?}"),
        }
        // No pointer event next frame: last position still wins over keys.
        let intent = adapter.collect(&keys(true, false, false));
        assert!(matches!(intent.steer, Steer::TargetAngle(_)));

        let mut raw = keys(true, false, false);
        raw.pointer = PointerSample::Left;
        assert_eq!(adapter.collect(&raw).steer, Steer::Delta(-1.0));
    }

    #[test]
    fn linear_pointer_clamps() {
        let mut adapter = InputAdapter::new(PointerMapping::Linear { min: 0.0, max: 2.0 });
        let raw = RawInput {
            pointer: PointerSample::Moved(Vec2::new(0.0, 9.0)),
            ..RawInput::default()
        };
        assert_eq!(adapter.collect(&raw).steer, Steer::TargetOffset(2.0));
    }

    #[test]
    fn touch_regions() {
        let mut adapter = InputAdapter::default();
        let raw = RawInput {
            touch: Some(TouchRegion::Crouch),
            ..RawInput::default()
        };
        assert!(adapter.collect(&raw).crouch);
        let raw = RawInput {
            touch: Some(TouchRegion::Right),
            ..RawInput::default()
        };
        assert_eq!(adapter.collect(&raw).steer, Steer::Delta(1.0));
    }

    #[test]
    fn sanitize_recovers() {
        let i = MovementIntent::steer(Steer::Delta(5.0)).sanitize(0);
        assert_eq!(i.steer, Steer::Delta(1.0));
        let i = MovementIntent::steer(Steer::TargetAngle(f32::NAN)).sanitize(0);
        assert_eq!(i.steer, Steer::None);
        let i = MovementIntent {
            steer: Steer::Delta(f32::INFINITY),
            jump: true,
            crouch: false,
        }
        .sanitize(0);
        assert_eq!(i.steer, Steer::None);
        assert!(i.jump);
    }

    #[test]
    fn validate_reports_field() {
        let err = MovementIntent::steer(Steer::Delta(-2.0)).validate().unwrap_err();
        assert_eq!(
            err,
            TransientInputError::OutOfRange {
                field: "steer delta",
                value: -2.0
            }
        );
    }
}
