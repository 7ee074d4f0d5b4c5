//! Controller input seam and stick turning

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Controller buttons the game reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Primary,
    Secondary,
    Trigger,
}

/// One tracked hand controller
pub trait InputDevice {
    /// Primary 2-axis stick; None when the device cannot report it
    fn read_axis_2d(&self) -> Option<Vec2>;

    fn is_button_pressed(&self, button: Button) -> bool;

    fn send_haptic_impulse(&mut self, amplitude: f32, duration: f32);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnMode {
    #[default]
    Smooth,
    Snap,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurnSettings {
    pub mode: TurnMode,
    /// Degrees per second at full smooth turn
    pub smooth_speed: f32,
    pub snap_angle: f32,
    pub snap_cooldown: f32,
}

impl Default for TurnSettings {
    fn default() -> Self {
        Self {
            mode: TurnMode::Smooth,
            smooth_speed: 45.0,
            snap_angle: 45.0,
            snap_cooldown: 0.3,
        }
    }
}

const INPUT_SMOOTHING_SECS: f32 = 0.1;
const SMOOTH_DEAD_ZONE: f32 = 0.1;
const SPEED_SMOOTH_SECS: f32 = 0.2;
const SNAP_THRESHOLD: f32 = 0.5;

/// Turns stick deflection into body yaw
#[derive(Debug, Clone, PartialEq)]
pub struct TurnController {
    settings: TurnSettings,
    smoothed_input: f32,
    turn_speed: f32,
    speed_velocity: f32,
    since_snap: f32,
}

impl TurnController {
    pub fn new(settings: TurnSettings) -> Self {
        Self {
            settings,
            smoothed_input: 0.0,
            turn_speed: 0.0,
            speed_velocity: 0.0,
            since_snap: settings.snap_cooldown,
        }
    }

    /// Yaw change in degrees for this tick
    pub fn update(&mut self, stick: Option<Vec2>, dt: f32) -> f32 {
        match self.settings.mode {
            TurnMode::Off => 0.0,
            TurnMode::Smooth => {
                let Some(value) = stick else {
                    return 0.0;
                };
                let blend = (dt / INPUT_SMOOTHING_SECS).clamp(0.0, 1.0);
                self.smoothed_input += (value.x - self.smoothed_input) * blend;

                if self.smoothed_input.abs() > SMOOTH_DEAD_ZONE {
                    self.turn_speed = smooth_damp(
                        self.turn_speed,
                        self.settings.smooth_speed,
                        &mut self.speed_velocity,
                        SPEED_SMOOTH_SECS,
                        dt,
                    );
                    value.x * self.turn_speed * dt
                } else {
                    self.turn_speed = smooth_damp(
                        self.turn_speed,
                        0.0,
                        &mut self.speed_velocity,
                        SPEED_SMOOTH_SECS,
                        dt,
                    );
                    0.0
                }
            }
            TurnMode::Snap => {
                self.since_snap += dt;
                if self.since_snap < self.settings.snap_cooldown {
                    return 0.0;
                }
                let x = stick.map(|v| v.x).unwrap_or(0.0);
                let turn = if x > SNAP_THRESHOLD {
                    self.settings.snap_angle
                } else if x < -SNAP_THRESHOLD {
                    -self.settings.snap_angle
                } else {
                    return 0.0;
                };
                self.since_snap = 0.0;
                turn
            }
        }
    }
}

impl Default for TurnController {
    fn default() -> Self {
        Self::new(TurnSettings::default())
    }
}

/// Critically damped spring toward `target`
fn smooth_damp(current: f32, target: f32, velocity: &mut f32, smooth_time: f32, dt: f32) -> f32 {
    if dt <= 0.0 {
        return current;
    }
    let smooth_time = smooth_time.max(1e-4);
    let omega = 2.0 / smooth_time;
    let x = omega * dt;
    let decay = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);
    let change = current - target;
    let temp = (*velocity + omega * change) * dt;
    *velocity = (*velocity - omega * temp) * decay;
    let output = target + (change + temp) * decay;

    // Never overshoot
    if (target > current) == (output > target) {
        *velocity = 0.0;
        return target;
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn smooth_turn_ramps_up_and_follows_stick_direction() {
        let mut turn = TurnController::default();
        let mut total = 0.0;
        let mut last = 0.0;
        for _ in 0..60 {
            last = turn.update(Some(Vec2::new(1.0, 0.0)), DT);
            total += last;
        }
        assert!(total > 0.0);
        assert!(last <= 45.0 * DT + 1e-4);

        let left = turn.update(Some(Vec2::new(-1.0, 0.0)), DT);
        assert!(left <= 0.0);
    }

    #[test]
    fn smooth_turn_ignores_dead_zone() {
        let mut turn = TurnController::default();
        for _ in 0..30 {
            assert_eq!(turn.update(Some(Vec2::new(0.05, 0.0)), DT), 0.0);
        }
    }

    #[test]
    fn snap_turn_is_rate_limited() {
        let mut turn = TurnController::new(TurnSettings {
            mode: TurnMode::Snap,
            ..TurnSettings::default()
        });
        let stick = Some(Vec2::new(0.9, 0.0));

        assert_eq!(turn.update(stick, DT), 45.0);
        assert_eq!(turn.update(stick, DT), 0.0);

        let mut snapped = 0.0;
        for _ in 0..20 {
            snapped += turn.update(stick, DT);
        }
        assert_eq!(snapped, 45.0);
        assert_eq!(turn.update(Some(Vec2::new(-0.9, 0.0)), 0.3), -45.0);
    }

    #[test]
    fn turning_off_never_rotates() {
        let mut turn = TurnController::new(TurnSettings {
            mode: TurnMode::Off,
            ..TurnSettings::default()
        });
        assert_eq!(turn.update(Some(Vec2::X), DT), 0.0);
    }
}
