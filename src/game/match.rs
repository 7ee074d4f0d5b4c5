//! Match lifecycle shared by every game mode
//!
//! `ModeManager` owns the countdown, start and end transitions and delegates
//! the rules to a [`GameMode`]. Every public operation is authoritative-only:
//! a peer without state authority gets a logged no-op.

use serde::Serialize;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use super::session::SessionContext;
use crate::config::ModeSettings;
use crate::net::protocol::{Broadcast, GamePlayMode, ParticipantId};
use crate::util::routine::{Resume, Routine, Scheduler};
use crate::util::time::{TickClock, TickTimer};

/// Match phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    WaitingForPlayers,
    CountdownRunning,
    Active,
    /// Terminal
    Ended,
}

/// Gameplay events reported to the authoritative manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchEvent {
    /// Battle: a direct hit costs the victim a life
    PlayerHit {
        victim: ParticipantId,
        attacker: ParticipantId,
    },
    /// Battle: tranquilizer dart impact
    DartHit {
        victim: ParticipantId,
        attacker: ParticipantId,
    },
    /// Battle: a magic projectile afflicts the victim for a while
    MagicHit {
        victim: ParticipantId,
        attacker: ParticipantId,
    },
    /// Tag: infect a participant
    TagPlayer { participant: ParticipantId },
    /// Decryptid: give a hunter a new random target
    AssignTarget { hunter: ParticipantId },
    /// Decryptid: a hunter photographed its target
    Capture {
        hunter: ParticipantId,
        target: ParticipantId,
    },
    /// Free play: a participant wants to go back to the lobby
    ReturnToLobbyRequest { participant: ParticipantId },
}

/// How a match ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchOutcome {
    pub winner: Option<ParticipantId>,
    pub text: String,
}

/// Output of match routines, applied by the manager after each run
#[derive(Debug, Clone, PartialEq)]
pub enum MatchEffect {
    Broadcast(Broadcast),
    /// Sent when the countdown runs out; dropped unless the match started
    AnnounceStart,
    ReturnParticipant(ParticipantId),
}

/// Lifecycle state shared by all modes
pub struct MatchCore {
    pub id: Uuid,
    pub mode: GamePlayMode,
    pub settings: ModeSettings,
    participants: Vec<ParticipantId>,
    start_timer: TickTimer,
    countdown_announced: bool,
    started: bool,
    ended: bool,
    started_tick: Option<u64>,
    outcome: Option<MatchOutcome>,
    pub routines: Scheduler<MatchEffect>,
}

impl MatchCore {
    fn new(id: Uuid, mode: GamePlayMode, settings: ModeSettings) -> Self {
        Self {
            id,
            mode,
            settings,
            participants: Vec::new(),
            start_timer: TickTimer::default(),
            countdown_announced: false,
            started: false,
            ended: false,
            started_tick: None,
            outcome: None,
            routines: Scheduler::new(),
        }
    }

    /// Active participants in registration order
    pub fn participants(&self) -> &[ParticipantId] {
        &self.participants
    }

    pub fn contains(&self, participant: &ParticipantId) -> bool {
        self.participants.contains(participant)
    }

    pub fn is_full(&self) -> bool {
        self.participants.len() >= self.settings.player_cap
    }

    pub fn remove_participant(&mut self, participant: &ParticipantId) -> bool {
        let before = self.participants.len();
        self.participants.retain(|p| p != participant);
        before != self.participants.len()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn start_timer(&self) -> &TickTimer {
        &self.start_timer
    }

    pub fn outcome(&self) -> Option<&MatchOutcome> {
        self.outcome.as_ref()
    }

    pub fn phase(&self) -> MatchPhase {
        if self.ended {
            MatchPhase::Ended
        } else if self.started {
            MatchPhase::Active
        } else if self.start_timer.is_running() {
            MatchPhase::CountdownRunning
        } else {
            MatchPhase::WaitingForPlayers
        }
    }

    /// Shorten the countdown once the session is full; repeat calls are no-ops
    fn compress_if_full(&mut self, clock: &TickClock) {
        if self.started || !self.is_full() {
            return;
        }
        let Some(remaining) = self.start_timer.remaining(clock) else {
            return;
        };
        if remaining > self.settings.final_countdown_secs {
            self.start_timer = TickTimer::from_seconds(clock, self.settings.final_countdown_secs);
            info!(
                match_id = %self.id,
                seconds = self.settings.final_countdown_secs,
                "Session full, countdown compressed"
            );
        }
    }
}

/// Mode-specific rules plugged into a [`ModeManager`]
pub trait GameMode: Send {
    fn mode(&self) -> GamePlayMode;

    /// Whether the pre-match countdown is shown to players
    fn announces_countdown(&self) -> bool {
        true
    }

    fn on_register(&mut self, _core: &MatchCore, _ctx: &mut SessionContext, _participant: ParticipantId) {}

    fn on_start(&mut self, core: &mut MatchCore, ctx: &mut SessionContext);

    /// Per-tick rules while the match is active
    fn tick_active(&mut self, _core: &mut MatchCore, _ctx: &mut SessionContext) -> Option<MatchOutcome> {
        None
    }

    /// Returns an outcome when the event ends the match
    fn handle_event(
        &mut self,
        core: &mut MatchCore,
        ctx: &mut SessionContext,
        event: MatchEvent,
    ) -> Option<MatchOutcome>;

    /// A participant was handed back to the lobby by a routine
    fn participant_returned(&mut self, _core: &mut MatchCore, _participant: ParticipantId) {}

    /// Called after the core has decided whether the leaver stays counted
    fn participant_left(
        &mut self,
        _core: &mut MatchCore,
        _ctx: &mut SessionContext,
        _participant: ParticipantId,
    ) -> Option<MatchOutcome> {
        None
    }

    /// Drop every mode collection at teardown
    fn clear(&mut self);
}

/// End-of-match report logged by the host
#[derive(Debug, Clone, Serialize)]
pub struct MatchSummary {
    pub match_id: Uuid,
    pub mode: GamePlayMode,
    pub phase: MatchPhase,
    pub started_tick: Option<u64>,
    pub ended_tick: u64,
    pub outcome: Option<MatchOutcome>,
}

/// Object-safe view of a running match, used by the host loop
pub trait MatchDriver: Send {
    fn core(&self) -> &MatchCore;
    fn phase(&self) -> MatchPhase;
    fn register_participant(&mut self, ctx: &mut SessionContext, participant: ParticipantId) -> bool;
    fn start_countdown(&mut self, ctx: &mut SessionContext, seconds: f32);
    fn tick(&mut self, ctx: &mut SessionContext);
    fn report_event(&mut self, ctx: &mut SessionContext, event: MatchEvent);
    fn participant_left(&mut self, ctx: &mut SessionContext, participant: ParticipantId);
    fn end_match(&mut self, ctx: &mut SessionContext, outcome: MatchOutcome) -> bool;
    fn summary(&self, clock: &TickClock) -> MatchSummary;
}

/// Authoritative manager for one mode instance
pub struct ModeManager<M: GameMode> {
    core: MatchCore,
    rules: M,
}

impl<M: GameMode> ModeManager<M> {
    pub fn new(id: Uuid, settings: ModeSettings, rules: M) -> Self {
        let mode = rules.mode();
        Self {
            core: MatchCore::new(id, mode, settings),
            rules,
        }
    }

    pub fn core(&self) -> &MatchCore {
        &self.core
    }

    pub fn rules(&self) -> &M {
        &self.rules
    }

    fn authorized(&self, ctx: &SessionContext, operation: &'static str) -> bool {
        if ctx.has_state_authority() {
            return true;
        }
        warn!(match_id = %self.core.id, operation, "Ignoring call without state authority");
        false
    }

    fn start(&mut self, ctx: &mut SessionContext) {
        self.core.started = true;
        self.core.started_tick = Some(ctx.clock.tick());
        self.rules.on_start(&mut self.core, ctx);
        ctx.broadcast(Broadcast::MatchStarted {
            mode: self.core.mode,
            tick: ctx.clock.tick(),
        });
        info!(
            match_id = %self.core.id,
            mode = %self.core.mode,
            participants = self.core.participants.len(),
            "Match started"
        );
    }

    fn run_routines(&mut self, ctx: &mut SessionContext) {
        let mut effects = Vec::new();
        self.core.routines.run(&ctx.clock, &mut effects);
        for effect in effects {
            match effect {
                MatchEffect::Broadcast(msg) => ctx.broadcast(msg),
                MatchEffect::AnnounceStart if self.core.started => ctx.broadcast(Broadcast::Message {
                    text: MATCH_STARTED_TEXT.to_string(),
                }),
                MatchEffect::AnnounceStart => {
                    debug!(match_id = %self.core.id, "Countdown ended without a start");
                }
                MatchEffect::ReturnParticipant(participant) => {
                    self.core.remove_participant(&participant);
                    self.rules.participant_returned(&mut self.core, participant);
                    ctx.despawn_body(participant);
                    ctx.return_to_lobby(participant);
                    info!(match_id = %self.core.id, participant = %participant, "Participant returned to lobby");
                }
            }
        }
    }

    fn finish(&mut self, ctx: &mut SessionContext, outcome: Option<MatchOutcome>) {
        if let Some(outcome) = outcome {
            self.end_match(ctx, outcome);
        }
    }

    /// Add a participant; returns false when already registered or refused
    pub fn register_participant(&mut self, ctx: &mut SessionContext, participant: ParticipantId) -> bool {
        if !self.authorized(ctx, "register_participant") || self.core.ended {
            return false;
        }
        if self.core.contains(&participant) {
            return false;
        }
        if self.core.is_full() {
            warn!(match_id = %self.core.id, participant = %participant, "Match is full");
            return false;
        }

        self.core.participants.push(participant);
        self.rules.on_register(&self.core, ctx, participant);
        info!(
            match_id = %self.core.id,
            participant = %participant,
            player_count = self.core.participants.len(),
            "Registered participant"
        );

        self.core.compress_if_full(&ctx.clock);
        true
    }

    /// Arm the start timer. Only meaningful before the match starts.
    pub fn start_countdown(&mut self, ctx: &mut SessionContext, seconds: f32) {
        if !self.authorized(ctx, "start_countdown") || self.core.started || self.core.ended {
            return;
        }
        self.core.start_timer = TickTimer::from_seconds(&ctx.clock, seconds.max(0.0));
        self.core.countdown_announced = false;
        info!(match_id = %self.core.id, seconds, "Countdown started");
        self.core.compress_if_full(&ctx.clock);
    }

    /// Advance the match by one network tick
    pub fn tick(&mut self, ctx: &mut SessionContext) {
        if !ctx.has_state_authority() {
            trace!(match_id = %self.core.id, "Skipping tick without state authority");
            return;
        }
        if self.core.ended {
            return;
        }

        if !self.core.started {
            if self.core.start_timer.is_running() {
                self.core.compress_if_full(&ctx.clock);

                let remaining = self.core.start_timer.remaining(&ctx.clock).unwrap_or(0.0);
                if !self.core.countdown_announced
                    && self.rules.announces_countdown()
                    && remaining <= self.core.settings.final_countdown_secs
                {
                    self.core.countdown_announced = true;
                    let routine = CountdownRoutine::new(self.core.start_timer);
                    self.core.routines.start(&ctx.clock, Box::new(routine));
                }

                if self.core.start_timer.expired(&ctx.clock) {
                    if self.core.participants.len() >= self.core.settings.min_participants {
                        self.start(ctx);
                    } else {
                        debug!(
                            match_id = %self.core.id,
                            participants = self.core.participants.len(),
                            "Countdown expired without enough participants"
                        );
                    }
                }
            }
        } else if self.core.started_tick != Some(ctx.clock.tick()) {
            // Rules run from the tick after the start so spawn proximity is not a tag
            let outcome = self.rules.tick_active(&mut self.core, ctx);
            self.finish(ctx, outcome);
        }

        if !self.core.ended {
            self.run_routines(ctx);
        }
    }

    pub fn report_event(&mut self, ctx: &mut SessionContext, event: MatchEvent) {
        if !self.authorized(ctx, "report_event") {
            return;
        }
        if self.core.phase() != MatchPhase::Active {
            debug!(match_id = %self.core.id, event = ?event, "Ignoring event outside an active match");
            return;
        }
        let outcome = self.rules.handle_event(&mut self.core, ctx, event);
        self.finish(ctx, outcome);
    }

    /// A participant disconnected or left the session
    pub fn participant_left(&mut self, ctx: &mut SessionContext, participant: ParticipantId) {
        if !self.authorized(ctx, "participant_left") || self.core.ended {
            return;
        }
        if !self.core.contains(&participant) {
            return;
        }
        if !self.core.started {
            self.core.remove_participant(&participant);
        }
        ctx.despawn_body(participant);
        info!(match_id = %self.core.id, participant = %participant, "Participant left");

        let outcome = self.rules.participant_left(&mut self.core, ctx, participant);
        self.finish(ctx, outcome);
    }

    /// Tear the match down; runs at most once and returns whether it ran
    pub fn end_match(&mut self, ctx: &mut SessionContext, outcome: MatchOutcome) -> bool {
        if !self.authorized(ctx, "end_match") || self.core.ended {
            return false;
        }
        self.core.ended = true;
        self.core.routines.cancel_all();
        self.core.start_timer.stop();

        info!(
            match_id = %self.core.id,
            winner = ?outcome.winner,
            "{}", outcome.text
        );
        ctx.broadcast(Broadcast::MatchEnded {
            mode: self.core.mode,
            winner: outcome.winner,
            text: outcome.text.clone(),
        });
        self.core.outcome = Some(outcome);

        self.rules.clear();
        self.core.participants.clear();
        ctx.despawn_all();
        ctx.end_session();
        true
    }
}

impl<M: GameMode> MatchDriver for ModeManager<M> {
    fn core(&self) -> &MatchCore {
        &self.core
    }

    fn phase(&self) -> MatchPhase {
        self.core.phase()
    }

    fn register_participant(&mut self, ctx: &mut SessionContext, participant: ParticipantId) -> bool {
        ModeManager::register_participant(self, ctx, participant)
    }

    fn start_countdown(&mut self, ctx: &mut SessionContext, seconds: f32) {
        ModeManager::start_countdown(self, ctx, seconds)
    }

    fn tick(&mut self, ctx: &mut SessionContext) {
        ModeManager::tick(self, ctx)
    }

    fn report_event(&mut self, ctx: &mut SessionContext, event: MatchEvent) {
        ModeManager::report_event(self, ctx, event)
    }

    fn participant_left(&mut self, ctx: &mut SessionContext, participant: ParticipantId) {
        ModeManager::participant_left(self, ctx, participant)
    }

    fn end_match(&mut self, ctx: &mut SessionContext, outcome: MatchOutcome) -> bool {
        ModeManager::end_match(self, ctx, outcome)
    }

    fn summary(&self, clock: &TickClock) -> MatchSummary {
        MatchSummary {
            match_id: self.core.id,
            mode: self.core.mode,
            phase: self.core.phase(),
            started_tick: self.core.started_tick,
            ended_tick: clock.tick(),
            outcome: self.core.outcome.clone(),
        }
    }
}

/// Countdown values above this are sent once per second
const COUNTDOWN_STEP_THRESHOLD_SECS: f32 = 10.0;

pub const MATCH_STARTED_TEXT: &str = "Match has started! Go!";

/// Broadcasts the remaining countdown, then asks for the start message
struct CountdownRoutine {
    timer: TickTimer,
    final_sent: bool,
}

impl CountdownRoutine {
    fn new(timer: TickTimer) -> Self {
        Self {
            timer,
            final_sent: false,
        }
    }
}

impl Routine<MatchEffect> for CountdownRoutine {
    fn resume(&mut self, clock: &TickClock, out: &mut Vec<MatchEffect>) -> Resume {
        if self.final_sent {
            out.push(MatchEffect::AnnounceStart);
            return Resume::Finished;
        }

        let remaining = self.timer.remaining(clock).unwrap_or(0.0);
        out.push(MatchEffect::Broadcast(Broadcast::Countdown {
            seconds_remaining: remaining,
        }));
        if remaining > COUNTDOWN_STEP_THRESHOLD_SECS {
            Resume::WaitSeconds(1.0)
        } else {
            self.final_sent = true;
            Resume::WaitSeconds(remaining)
        }
    }

    fn name(&self) -> &'static str {
        "countdown"
    }
}
