//! Headless bot participants
//!
//! Bots drive a real rig through scripted controllers: they glance around with
//! the stick, wander a step every few seconds and, in battle, pull the primary
//! button to fire darts.

use glam::{Vec2, Vec3};
use rand::seq::SliceRandom;
use rand::Rng;

use super::r#match::MatchEvent;
use super::session::SessionContext;
use crate::locomotion::{Button, InputDevice, LocalRig, TurnController};
use crate::net::protocol::ParticipantId;

/// Seconds between wander steps
const WANDER_INTERVAL_SECS: f32 = 1.5;
const WANDER_DISTANCE: f32 = 1.0;
/// Seconds between dart volleys
const FIRE_INTERVAL_SECS: f32 = 2.0;

/// Scripted controller
#[derive(Debug, Default)]
pub struct BotController {
    stick: Option<Vec2>,
    pressed: Vec<Button>,
    pub haptic_pulses: u32,
}

impl InputDevice for BotController {
    fn read_axis_2d(&self) -> Option<Vec2> {
        self.stick
    }

    fn is_button_pressed(&self, button: Button) -> bool {
        self.pressed.contains(&button)
    }

    fn send_haptic_impulse(&mut self, _amplitude: f32, _duration: f32) {
        self.haptic_pulses += 1;
    }
}

pub struct Bot {
    pub participant: ParticipantId,
    rig: LocalRig<BotController>,
    wander_elapsed: f32,
    fire_elapsed: f32,
    fires_darts: bool,
}

impl Bot {
    pub fn new(participant: ParticipantId, fires_darts: bool) -> Self {
        Self {
            participant,
            rig: LocalRig::new(
                BotController::default(),
                BotController::default(),
                TurnController::default(),
            ),
            wander_elapsed: 0.0,
            fire_elapsed: 0.0,
            fires_darts,
        }
    }

    pub fn rig(&self) -> &LocalRig<BotController> {
        &self.rig
    }

    /// Presentation-phase update; returns a dart hit when the bot fired
    pub fn update(
        &mut self,
        ctx: &mut SessionContext,
        others: &[ParticipantId],
        dt: f32,
    ) -> Option<MatchEvent> {
        // Draw all randomness before borrowing the body
        let glance = ctx.rng.gen_range(-1.0..=1.0f32);
        let heading = ctx.rng.gen_range(0.0..std::f32::consts::TAU);
        let victim = others
            .iter()
            .filter(|p| **p != self.participant)
            .copied()
            .collect::<Vec<_>>()
            .choose(&mut ctx.rng)
            .copied();

        self.rig.right.stick = Some(Vec2::new(glance, 0.0));
        self.wander_elapsed += dt;
        self.fire_elapsed += dt;

        let trigger = self.fires_darts && self.fire_elapsed >= FIRE_INTERVAL_SECS;
        self.rig.right.pressed.clear();
        if trigger {
            self.fire_elapsed = 0.0;
            self.rig.right.pressed.push(Button::Primary);
        }

        let (body, world, cfg, mask) = ctx.body_in_world(&self.participant)?;

        if self.wander_elapsed >= WANDER_INTERVAL_SECS {
            self.wander_elapsed = 0.0;
            let step = Vec3::new(heading.cos(), 0.0, heading.sin()) * WANDER_DISTANCE;
            let target = body.position() + step;
            body.teleport(target, cfg);
        }

        let params = body.step_params(cfg, dt);
        self.rig
            .drive(&mut body.climb, world, mask, &body.pose, cfg, params);

        if self.rig.primary_pressed() && !body.movement_disabled() {
            return victim.map(|victim| MatchEvent::DartHit {
                victim,
                attacker: self.participant,
            });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::game::session::RecordingLobby;

    #[test]
    fn bot_wanders_one_unit_every_interval() {
        let mut ctx = SessionContext::new(3, Box::new(RecordingLobby::new()));
        let id = Uuid::new_v4();
        let start = ctx.spawn_body(id, 0).unwrap().position();
        let mut bot = Bot::new(id, false);

        let dt = 0.5;
        bot.update(&mut ctx, &[id], dt);
        bot.update(&mut ctx, &[id], dt);
        assert_eq!(ctx.body(&id).unwrap().position(), start);

        bot.update(&mut ctx, &[id], dt);
        let moved = ctx.body(&id).unwrap().position() - start;
        assert!((moved.length() - 1.0).abs() < 1e-4);
        assert!(moved.y.abs() < 1e-6);
    }

    #[test]
    fn battle_bot_fires_at_someone_else() {
        let mut ctx = SessionContext::new(3, Box::new(RecordingLobby::new()));
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        ctx.spawn_body(me, 2).unwrap();
        let mut bot = Bot::new(me, true);

        let event = bot.update(&mut ctx, &[me, other], FIRE_INTERVAL_SECS);
        assert_eq!(
            event,
            Some(MatchEvent::DartHit {
                victim: other,
                attacker: me
            })
        );
        assert_eq!(bot.update(&mut ctx, &[me, other], 0.1), None);
    }
}
