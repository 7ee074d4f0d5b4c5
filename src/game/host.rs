//! Headless authoritative host
//!
//! Owns one session and one match and drives them from a fixed-rate tick
//! loop: bot presentation first, then status timers, match rules, routines
//! and the replication snapshot.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use super::bot::Bot;
use super::modes::build_match;
use super::r#match::{MatchDriver, MatchEvent, MatchOutcome, MatchPhase, MatchSummary};
use super::session::{LobbyService, SessionContext, SessionError};
use crate::config::{Config, ModeSettings};
use crate::net::protocol::{Broadcast, GamePlayMode, ParticipantId};
use crate::net::snapshot::{Change, ChangeDispatcher, SnapshotBuilder};
use crate::util::time::{SIMULATION_TPS, SNAPSHOT_TPS, TICK_DURATION_MICROS};

pub const TIME_LIMIT_TEXT: &str = "Match time limit reached";

/// Ids come from the session RNG so a seed replays the same match
fn random_uuid(ctx: &mut SessionContext) -> Uuid {
    uuid::Builder::from_random_bytes(ctx.rng.gen()).into_uuid()
}

pub struct MatchHost {
    ctx: SessionContext,
    driver: Box<dyn MatchDriver>,
    mode: GamePlayMode,
    countdown_secs: f32,
    bots: Vec<Bot>,
    snapshots: SnapshotBuilder,
    dispatcher: ChangeDispatcher,
    max_ticks: u64,
}

impl MatchHost {
    pub fn new(config: &Config, seed: u64, lobby: Box<dyn LobbyService>) -> Self {
        let ctx = SessionContext::new(seed, lobby);
        let max_ticks = ctx.clock.ticks_for(config.max_match_secs as f32);
        Self::from_parts(ctx, config.game_mode, config.mode_settings(), max_ticks)
    }

    pub fn from_parts(
        mut ctx: SessionContext,
        mode: GamePlayMode,
        settings: ModeSettings,
        max_ticks: u64,
    ) -> Self {
        let match_id = random_uuid(&mut ctx);
        let countdown_secs = settings.countdown_secs;
        let driver = build_match(match_id, mode, settings);

        let mut dispatcher = ChangeDispatcher::new();
        dispatcher.register("status_log", move |event| {
            if let Change::StatusChanged { status, active } = event.change {
                debug!(
                    match_id = %match_id,
                    participant = %event.participant,
                    status = status.label(),
                    active,
                    "Status changed"
                );
            }
        });

        Self {
            ctx,
            driver,
            mode,
            countdown_secs,
            bots: Vec::new(),
            snapshots: SnapshotBuilder::new(SIMULATION_TPS / SNAPSHOT_TPS),
            dispatcher,
            max_ticks,
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut SessionContext {
        &mut self.ctx
    }

    pub fn driver(&self) -> &dyn MatchDriver {
        self.driver.as_ref()
    }

    pub fn phase(&self) -> MatchPhase {
        self.driver.phase()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Broadcast> {
        self.ctx.subscribe()
    }

    pub fn dispatcher_mut(&mut self) -> &mut ChangeDispatcher {
        &mut self.dispatcher
    }

    /// Spawn a bot body and register it with the match
    pub fn add_bot(&mut self, character_index: i32) -> Result<ParticipantId, SessionError> {
        let participant = random_uuid(&mut self.ctx);
        self.ctx.spawn_body(participant, character_index)?;
        if !self.driver.register_participant(&mut self.ctx, participant) {
            self.ctx.despawn_body(participant);
            return Err(SessionError::Refused(participant));
        }
        self.bots
            .push(Bot::new(participant, self.mode == GamePlayMode::Battle));
        Ok(participant)
    }

    /// Forward a gameplay event to the match
    pub fn report(&mut self, event: MatchEvent) {
        self.driver.report_event(&mut self.ctx, event);
    }

    /// Run one tick; returns false once the host should stop
    pub fn step(&mut self) -> bool {
        let dt = self.ctx.clock.delta();

        // Presentation phase
        let mut events = Vec::new();
        if self.phase() == MatchPhase::Active {
            let roster = self.driver.core().participants().to_vec();
            for bot in &mut self.bots {
                if let Some(event) = bot.update(&mut self.ctx, &roster, dt) {
                    events.push(event);
                }
            }
        }

        // Network phase
        for body in self.ctx.bodies_mut() {
            body.tick_status(dt);
        }
        if self.phase() == MatchPhase::WaitingForPlayers {
            self.driver
                .start_countdown(&mut self.ctx, self.countdown_secs);
        }
        for event in events {
            self.driver.report_event(&mut self.ctx, event);
        }
        self.driver.tick(&mut self.ctx);

        if self.phase() == MatchPhase::Ended {
            self.snapshots.force_next();
        }
        if self.snapshots.should_send() {
            let (snapshot, changes) = self
                .snapshots
                .build(self.ctx.clock.tick(), self.ctx.bodies().map(|b| b.snapshot()));
            debug!(tick = snapshot.tick, bodies = snapshot.bodies.len(), changes = changes.len(), "Snapshot");
            self.dispatcher.dispatch(&changes);
        }

        self.ctx.clock.advance();
        self.phase() != MatchPhase::Ended && self.ctx.clock.tick() < self.max_ticks
    }

    /// Run until the match ends, the time limit passes, or `shutdown` resolves
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) -> MatchSummary {
        let match_id = self.driver.core().id;
        info!(match_id = %match_id, mode = %self.mode, bots = self.bots.len(), "Host started");

        let mut tick_interval = interval(Duration::from_micros(TICK_DURATION_MICROS));
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = tick_interval.tick() => {
                    if !self.step() {
                        break;
                    }
                }
                _ = &mut shutdown => {
                    info!(match_id = %match_id, "Shutdown requested");
                    break;
                }
            }
        }

        if self.phase() != MatchPhase::Ended {
            self.driver.end_match(
                &mut self.ctx,
                MatchOutcome {
                    winner: None,
                    text: TIME_LIMIT_TEXT.to_string(),
                },
            );
        }

        let summary = self.driver.summary(&self.ctx.clock);
        info!(match_id = %match_id, phase = ?summary.phase, tick = summary.ended_tick, "Host stopped");
        summary
    }
}
