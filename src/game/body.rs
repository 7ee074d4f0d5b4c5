//! Body entity: one per participant, solver state plus replicated status

use glam::Vec3;

use super::status::{StatusFlags, StatusKind};
use crate::config::LocomotionConfig;
use crate::locomotion::{ClimbState, RigPose, StepParams};
use crate::net::protocol::{CryptidKind, ParticipantId};
use crate::net::snapshot::BodySnapshot;

/// Authoritative body state (owned by the session context)
#[derive(Debug, Clone)]
pub struct BodyEntity {
    pub participant: ParticipantId,
    pub display_name: String,
    pub kind: CryptidKind,
    pub climb: ClimbState,
    /// Latest tracked rig pose
    pub pose: RigPose,
    pub status: StatusFlags,
    /// Whether this peer holds input authority (runs the solver)
    pub locally_controlled: bool,
}

impl BodyEntity {
    pub fn new(
        participant: ParticipantId,
        kind: CryptidKind,
        position: Vec3,
        yaw: f32,
        cfg: &LocomotionConfig,
    ) -> Self {
        let pose = RigPose::default();
        Self {
            participant,
            display_name: format!("Cryptid_{}", &participant.simple().to_string()[..8]),
            kind,
            climb: ClimbState::new(position, yaw, &pose, cfg),
            pose,
            status: StatusFlags::new(),
            locally_controlled: true,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.climb.position
    }

    pub fn is_infected(&self) -> bool {
        self.status.is_set(StatusKind::Infected)
    }

    pub fn is_eliminated(&self) -> bool {
        self.status.is_set(StatusKind::Eliminated)
    }

    pub fn is_invulnerable(&self) -> bool {
        self.status.is_set(StatusKind::Invulnerable)
    }

    /// Stunned bodies can still climb but never launch
    pub fn movement_disabled(&self) -> bool {
        self.status.is_set(StatusKind::Stunned)
    }

    /// Slow wins over buff while both are set
    pub fn movement_scale(&self, cfg: &LocomotionConfig) -> f32 {
        if self.status.is_set(StatusKind::Slowed) {
            cfg.slow_multiplier
        } else if self.status.is_set(StatusKind::Buffed) {
            cfg.buff_multiplier
        } else {
            1.0
        }
    }

    pub fn step_params(&self, cfg: &LocomotionConfig, dt: f32) -> StepParams {
        StepParams {
            movement_disabled: self.movement_disabled(),
            locally_simulated: self.locally_controlled,
            movement_scale: self.movement_scale(cfg),
            dt,
        }
    }

    /// Move the whole rig without climbing
    pub fn teleport(&mut self, position: Vec3, cfg: &LocomotionConfig) {
        self.climb.teleport(position, &self.pose, cfg);
    }

    /// Count timed statuses down; returns the ones that cleared
    pub fn tick_status(&mut self, dt: f32) -> Vec<StatusKind> {
        self.status.tick(dt)
    }

    /// Non-lethal hit: stun plus an invulnerability window
    pub fn take_hit(&mut self, stun_secs: f32, invulnerable_secs: f32) {
        self.status.set(StatusKind::Stunned, Some(stun_secs));
        self.status.set(StatusKind::Invulnerable, Some(invulnerable_secs));
    }

    /// Eliminated bodies lose stun and buff
    pub fn eliminate(&mut self) -> bool {
        self.status.clear(StatusKind::Stunned);
        self.status.clear(StatusKind::Buffed);
        self.status.set(StatusKind::Eliminated, None)
    }

    pub fn apply_slow(&mut self, secs: f32) {
        self.status.set(StatusKind::Slowed, Some(secs));
    }

    pub fn apply_magic_effect(&mut self, secs: f32) {
        self.status.set(StatusKind::Afflicted, Some(secs));
    }

    /// Nameplate text, e.g. `[Stunned] Cryptid_1a2b3c4d`
    pub fn nameplate(&self) -> String {
        let prefix = self.status.display_prefix();
        if prefix.is_empty() {
            self.display_name.clone()
        } else {
            format!("{} {}", prefix, self.display_name)
        }
    }

    pub fn snapshot(&self) -> BodySnapshot {
        BodySnapshot {
            participant: self.participant,
            kind: self.kind,
            position: self.climb.position,
            yaw: self.climb.yaw,
            status_bits: self.status.bits(),
        }
    }
}
