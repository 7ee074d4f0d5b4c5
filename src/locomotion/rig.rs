//! Locally controlled rig: two hand devices driving turning and the solver

use super::input::{Button, InputDevice, TurnController};
use super::query::{EnvironmentQuery, LayerMask};
use super::solver::{ClimbState, RigPose, StepOutcome, StepParams};
use crate::config::LocomotionConfig;

/// Haptic pulse sent when a hand first touches a surface
pub const CONTACT_PULSE_AMPLITUDE: f32 = 0.3;
pub const CONTACT_PULSE_SECS: f32 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Hand {
    Left,
    #[default]
    Right,
}

pub struct LocalRig<D: InputDevice> {
    pub left: D,
    pub right: D,
    /// Hand whose stick turns the body
    pub dominant: Hand,
    pub turn: TurnController,
}

impl<D: InputDevice> LocalRig<D> {
    pub fn new(left: D, right: D, turn: TurnController) -> Self {
        Self {
            left,
            right,
            dominant: Hand::Right,
            turn,
        }
    }

    fn dominant_device(&self) -> &D {
        match self.dominant {
            Hand::Left => &self.left,
            Hand::Right => &self.right,
        }
    }

    pub fn primary_pressed(&self) -> bool {
        self.right.is_button_pressed(Button::Primary)
    }

    /// Turn from the dominant stick, run one solver step, and pulse any hand
    /// that started touching this tick
    pub fn drive<W: EnvironmentQuery + ?Sized>(
        &mut self,
        state: &mut ClimbState,
        world: &W,
        mask: LayerMask,
        pose: &RigPose,
        cfg: &LocomotionConfig,
        params: StepParams,
    ) -> StepOutcome {
        let stick = self.dominant_device().read_axis_2d();
        let degrees = self.turn.update(stick, params.dt);
        state.yaw += degrees.to_radians();

        let was_left = state.was_left_touching;
        let was_right = state.was_right_touching;
        let outcome = state.step(world, mask, pose, cfg, params);

        if outcome.left_colliding && !was_left {
            self.left
                .send_haptic_impulse(CONTACT_PULSE_AMPLITUDE, CONTACT_PULSE_SECS);
        }
        if outcome.right_colliding && !was_right {
            self.right
                .send_haptic_impulse(CONTACT_PULSE_AMPLITUDE, CONTACT_PULSE_SECS);
        }
        outcome
    }
}
