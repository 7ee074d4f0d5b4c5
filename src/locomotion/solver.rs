//! Per-tick contact locomotion step
//!
//! The body never moves itself: each hand that touches geometry pushes the
//! body opposite to the hand's attempted motion, and releasing a surface fast
//! enough launches the body with the recent average velocity.

use glam::{Quat, Vec3};

use super::cast::ContactCaster;
use super::query::{EnvironmentQuery, LayerMask};
use super::velocity::VelocityHistory;
use crate::config::LocomotionConfig;

/// Tracked rig pose in the body's local frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigPose {
    pub head: Vec3,
    pub left_hand: Vec3,
    pub right_hand: Vec3,
}

impl Default for RigPose {
    fn default() -> Self {
        Self {
            head: Vec3::new(0.0, 1.6, 0.0),
            left_hand: Vec3::new(-0.3, 1.1, 0.3),
            right_hand: Vec3::new(0.3, 1.1, 0.3),
        }
    }
}

/// Per-step inputs that come from outside the solver
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepParams {
    /// Stunned bodies still climb but never launch
    pub movement_disabled: bool,
    /// Only the simulating peer writes the physical velocity
    pub locally_simulated: bool,
    /// Multiplier on velocity limit and jump multiplier (slow/buff)
    pub movement_scale: f32,
    pub dt: f32,
}

impl StepParams {
    pub fn new(dt: f32) -> Self {
        Self {
            movement_disabled: false,
            locally_simulated: true,
            movement_scale: 1.0,
            dt,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepOutcome {
    /// Displacement applied to the body this step
    pub displacement: Vec3,
    pub left_colliding: bool,
    pub right_colliding: bool,
    pub launched: bool,
}

/// Solver state owned by a body
#[derive(Debug, Clone, PartialEq)]
pub struct ClimbState {
    pub position: Vec3,
    /// Body yaw in radians
    pub yaw: f32,
    /// Physical velocity handed to the external integrator
    pub velocity: Vec3,
    pub last_head: Vec3,
    pub last_left: Vec3,
    pub last_right: Vec3,
    pub was_left_touching: bool,
    pub was_right_touching: bool,
    last_position: Vec3,
    history: VelocityHistory,
}

impl ClimbState {
    pub fn new(position: Vec3, yaw: f32, pose: &RigPose, cfg: &LocomotionConfig) -> Self {
        let mut state = Self {
            position,
            yaw,
            velocity: Vec3::ZERO,
            last_head: Vec3::ZERO,
            last_left: Vec3::ZERO,
            last_right: Vec3::ZERO,
            was_left_touching: false,
            was_right_touching: false,
            last_position: position,
            history: VelocityHistory::new(cfg.velocity_history_size),
        };
        state.teleport(position, pose, cfg);
        state
    }

    /// Move the body without climbing; hands follow and history resets
    pub fn teleport(&mut self, position: Vec3, pose: &RigPose, cfg: &LocomotionConfig) {
        self.position = position;
        self.last_position = position;
        self.velocity = Vec3::ZERO;
        self.last_head = self.head_position(pose);
        let (left, right) = self.hand_targets(pose, cfg);
        self.last_left = left;
        self.last_right = right;
        self.was_left_touching = false;
        self.was_right_touching = false;
        self.history.clear();
    }

    pub fn average_velocity(&self) -> Vec3 {
        self.history.average()
    }

    fn to_world(&self, local: Vec3) -> Vec3 {
        self.position + Quat::from_rotation_y(self.yaw) * local
    }

    pub fn head_position(&self, pose: &RigPose) -> Vec3 {
        self.to_world(pose.head)
    }

    /// World-space hand targets, clamped to arm length from the head
    pub fn hand_targets(&self, pose: &RigPose, cfg: &LocomotionConfig) -> (Vec3, Vec3) {
        let head = self.head_position(pose);
        let clamp = |local: Vec3| {
            let hand = self.to_world(local);
            let reach = hand - head;
            if reach.length() < cfg.max_arm_length {
                hand
            } else {
                head + reach.normalize_or_zero() * cfg.max_arm_length
            }
        };
        (clamp(pose.left_hand), clamp(pose.right_hand))
    }

    /// Advance one presentation tick
    pub fn step<W: EnvironmentQuery + ?Sized>(
        &mut self,
        world: &W,
        mask: LayerMask,
        pose: &RigPose,
        cfg: &LocomotionConfig,
        params: StepParams,
    ) -> StepOutcome {
        if params.dt <= 0.0 {
            return StepOutcome::default();
        }
        let dt = params.dt;
        let caster = ContactCaster::new(world, mask, cfg.single_hand_slip, cfg.dual_hand_slip);
        let precision = cfg.precision;
        let gravity_bias = Vec3::NEG_Y * 2.0 * cfg.gravity * dt * dt;

        let head = self.head_position(pose);
        let (left_target, right_target) = self.hand_targets(pose, cfg);

        let mut left_colliding = false;
        let mut right_colliding = false;
        let mut first_left = Vec3::ZERO;
        let mut first_right = Vec3::ZERO;

        let left = caster.resolve(
            self.last_left,
            cfg.probe_radius,
            left_target - self.last_left + gravity_bias,
            precision,
            true,
        );
        if left.collided {
            first_left = if self.was_left_touching {
                self.last_left - left_target
            } else {
                left.position - left_target
            };
            if params.locally_simulated {
                self.velocity = Vec3::ZERO;
            }
            left_colliding = true;
        }

        let right = caster.resolve(
            self.last_right,
            cfg.probe_radius,
            right_target - self.last_right + gravity_bias,
            precision,
            true,
        );
        if right.collided {
            first_right = if self.was_right_touching {
                self.last_right - right_target
            } else {
                right.position - right_target
            };
            if params.locally_simulated {
                self.velocity = Vec3::ZERO;
            }
            right_colliding = true;
        }

        let two_handed = (left_colliding || self.was_left_touching)
            && (right_colliding || self.was_right_touching);
        let mut displacement = if two_handed {
            (first_left + first_right) / 2.0
        } else {
            first_left + first_right
        };

        // Keep the head out of geometry
        let head_check = caster.resolve(
            self.last_head,
            cfg.head_radius,
            head + displacement - self.last_head,
            precision,
            false,
        );
        if head_check.collided {
            displacement = head_check.position - self.last_head;
            let span = head - self.last_head + displacement;
            let reach = span.length() + cfg.head_radius * precision * 0.999;
            if world.raycast(self.last_head, span, reach, mask).is_some() {
                displacement = self.last_head - head;
            }
        }

        let applied = if displacement.length() > cfg.movement_epsilon {
            self.position += displacement;
            displacement
        } else {
            Vec3::ZERO
        };
        self.last_head = self.head_position(pose);

        // Settle both hands against the moved body
        let (left_target, right_target) = self.hand_targets(pose, cfg);
        let left = caster.resolve(
            self.last_left,
            cfg.probe_radius,
            left_target - self.last_left,
            precision,
            !two_handed,
        );
        if left.collided {
            self.last_left = left.position;
            left_colliding = true;
        } else {
            self.last_left = left_target;
        }

        let right = caster.resolve(
            self.last_right,
            cfg.probe_radius,
            right_target - self.last_right,
            precision,
            !two_handed,
        );
        if right.collided {
            self.last_right = right.position;
            right_colliding = true;
        } else {
            self.last_right = right_target;
        }

        self.history.push((self.position - self.last_position) / dt);
        self.last_position = self.position;

        let mut launched = false;
        if (left_colliding || right_colliding) && !params.movement_disabled {
            let average = self.history.average();
            let speed = average.length();
            let jump_multiplier = cfg.jump_multiplier * params.movement_scale;
            if speed > cfg.velocity_limit * params.movement_scale && params.locally_simulated {
                self.velocity = if speed * jump_multiplier > cfg.max_jump_speed {
                    average.normalize_or_zero() * cfg.max_jump_speed
                } else {
                    average * jump_multiplier
                };
                launched = true;
            }
        }

        let head = self.head_position(pose);
        if left_colliding && self.should_unstick(world, mask, cfg, head, self.last_left, left_target) {
            self.last_left = left_target;
            left_colliding = false;
        }
        if right_colliding && self.should_unstick(world, mask, cfg, head, self.last_right, right_target)
        {
            self.last_right = right_target;
            right_colliding = false;
        }

        self.was_left_touching = left_colliding;
        self.was_right_touching = right_colliding;

        StepOutcome {
            displacement: applied,
            left_colliding,
            right_colliding,
            launched,
        }
    }

    /// A hand far from its target with a clear line from the head is released
    fn should_unstick<W: EnvironmentQuery + ?Sized>(
        &self,
        world: &W,
        mask: LayerMask,
        cfg: &LocomotionConfig,
        head: Vec3,
        resolved: Vec3,
        target: Vec3,
    ) -> bool {
        if (target - resolved).length() <= cfg.unstick_distance {
            return false;
        }
        let span = target - head;
        world
            .sphere_cast(
                head,
                cfg.probe_radius * cfg.precision,
                span,
                span.length() - cfg.probe_radius,
                mask,
            )
            .is_none()
    }
}
