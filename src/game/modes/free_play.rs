//! Free play: a hang-out session with no win condition

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::game::r#match::{GameMode, MatchCore, MatchEffect, MatchEvent, MatchOutcome};
use crate::game::session::SessionContext;
use crate::net::protocol::{Broadcast, GamePlayMode, ParticipantId};
use crate::util::routine::{Resume, Routine, RoutineId};
use crate::util::time::TickClock;

#[derive(Debug, Default)]
pub struct FreePlayMode {
    /// Pending exits and the routine that will hand each one to the lobby
    leaving: HashMap<ParticipantId, RoutineId>,
}

impl FreePlayMode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_leaving(&self, participant: &ParticipantId) -> bool {
        self.leaving.contains_key(participant)
    }
}

impl GameMode for FreePlayMode {
    fn mode(&self) -> GamePlayMode {
        GamePlayMode::FreePlay
    }

    fn announces_countdown(&self) -> bool {
        false
    }

    fn on_start(&mut self, core: &mut MatchCore, _ctx: &mut SessionContext) {
        info!(match_id = %core.id, "Free play session open");
    }

    fn handle_event(
        &mut self,
        core: &mut MatchCore,
        ctx: &mut SessionContext,
        event: MatchEvent,
    ) -> Option<MatchOutcome> {
        match event {
            MatchEvent::ReturnToLobbyRequest { participant } => {
                if !core.contains(&participant) || self.leaving.contains_key(&participant) {
                    return None;
                }
                info!(match_id = %core.id, participant = %participant, "Participant requested to return to the lobby");
                ctx.broadcast(Broadcast::ReturnToLobby { participant });
                let routine = core.routines.start(
                    &ctx.clock,
                    Box::new(ExitRoutine::new(participant, core.settings.exit_delay_secs)),
                );
                self.leaving.insert(participant, routine);
            }
            other => {
                warn!(match_id = %core.id, event = ?other, "Event not used by free play mode");
            }
        }
        None
    }

    fn participant_left(
        &mut self,
        core: &mut MatchCore,
        _ctx: &mut SessionContext,
        participant: ParticipantId,
    ) -> Option<MatchOutcome> {
        core.remove_participant(&participant);
        if let Some(routine) = self.leaving.remove(&participant) {
            core.routines.cancel(routine);
            debug!(match_id = %core.id, participant = %participant, "Pending exit cancelled");
        }
        None
    }

    fn participant_returned(&mut self, _core: &mut MatchCore, participant: ParticipantId) {
        self.leaving.remove(&participant);
    }

    fn clear(&mut self) {
        self.leaving.clear();
    }
}

/// Waits out the exit delay, then hands the participant to the lobby
struct ExitRoutine {
    participant: ParticipantId,
    delay_secs: f32,
    waited: bool,
}

impl ExitRoutine {
    fn new(participant: ParticipantId, delay_secs: f32) -> Self {
        Self {
            participant,
            delay_secs,
            waited: false,
        }
    }
}

impl Routine<MatchEffect> for ExitRoutine {
    fn resume(&mut self, _clock: &TickClock, out: &mut Vec<MatchEffect>) -> Resume {
        if !self.waited {
            self.waited = true;
            return Resume::WaitSeconds(self.delay_secs);
        }
        out.push(MatchEffect::ReturnParticipant(self.participant));
        Resume::Finished
    }

    fn name(&self) -> &'static str {
        "free_play_exit"
    }
}
