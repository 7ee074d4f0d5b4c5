//! Time utilities for the tick-driven simulation

use serde::{Deserialize, Serialize};

/// Tick rate configuration
pub const SIMULATION_TPS: u32 = 60; // 60 network ticks per second
pub const SNAPSHOT_TPS: u32 = 20; // 20 replication snapshots per second
pub const TICK_DURATION_MICROS: u64 = 1_000_000 / SIMULATION_TPS as u64;

/// Monotonic tick counter shared by every component of a session.
///
/// All replicated timers are expressed in ticks so that every peer derives the
/// same expiry from the same ordered tick stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickClock {
    tick: u64,
    tick_rate: u32,
}

impl TickClock {
    pub fn new(tick_rate: u32) -> Self {
        Self {
            tick: 0,
            tick_rate: tick_rate.max(1),
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn tick_rate(&self) -> u32 {
        self.tick_rate
    }

    /// Seconds per tick
    pub fn delta(&self) -> f32 {
        1.0 / self.tick_rate as f32
    }

    pub fn advance(&mut self) {
        self.tick += 1;
    }

    /// Number of whole ticks covering `seconds` (rounded up)
    pub fn ticks_for(&self, seconds: f32) -> u64 {
        if seconds <= 0.0 {
            return 0;
        }
        (seconds * self.tick_rate as f32).ceil() as u64
    }

    pub fn seconds_for(&self, ticks: u64) -> f32 {
        ticks as f32 / self.tick_rate as f32
    }
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new(SIMULATION_TPS)
    }
}

/// Tick-based expiry timer.
///
/// A default timer is not running: it never expires and has no remaining time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickTimer {
    target_tick: Option<u64>,
}

impl TickTimer {
    pub fn from_seconds(clock: &TickClock, seconds: f32) -> Self {
        Self {
            target_tick: Some(clock.tick() + clock.ticks_for(seconds)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.target_tick.is_some()
    }

    pub fn expired(&self, clock: &TickClock) -> bool {
        self.target_tick
            .map(|target| clock.tick() >= target)
            .unwrap_or(false)
    }

    /// Remaining seconds, or None when the timer is not running
    pub fn remaining(&self, clock: &TickClock) -> Option<f32> {
        self.target_tick
            .map(|target| clock.seconds_for(target.saturating_sub(clock.tick())))
    }

    pub fn stop(&mut self) {
        self.target_tick = None;
    }
}
