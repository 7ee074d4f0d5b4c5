//! Tag: one random cryptid starts rabid and the infection spreads by touch

use rand::Rng;
use tracing::{info, warn};

use crate::game::r#match::{GameMode, MatchCore, MatchEvent, MatchOutcome};
use crate::game::session::SessionContext;
use crate::game::status::StatusKind;
use crate::net::protocol::{Broadcast, GamePlayMode, ParticipantId};

#[derive(Debug, Default)]
pub struct TagMode {
    /// Infected participants in infection order
    infected: Vec<ParticipantId>,
}

impl TagMode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn infected(&self) -> &[ParticipantId] {
        &self.infected
    }

    pub fn is_infected(&self, participant: &ParticipantId) -> bool {
        self.infected.contains(participant)
    }

    fn tag(&mut self, core: &MatchCore, ctx: &mut SessionContext, participant: ParticipantId) -> Option<MatchOutcome> {
        if !core.contains(&participant) {
            warn!(match_id = %core.id, participant = %participant, "Tagged participant is not in the match");
            return None;
        }
        self.infect(core, ctx, participant);
        self.check_all_infected(core, ctx)
    }

    fn infect(&mut self, core: &MatchCore, ctx: &mut SessionContext, participant: ParticipantId) {
        if !self.infected.contains(&participant) {
            self.infected.push(participant);
            if let Some(body) = ctx.body_mut(&participant) {
                body.status.set(StatusKind::Infected, None);
            }
            ctx.broadcast(Broadcast::Infected { participant });
            info!(
                match_id = %core.id,
                participant = %participant,
                infected = self.infected.len(),
                "Participant infected"
            );
        }
    }

    fn check_all_infected(&self, core: &MatchCore, ctx: &SessionContext) -> Option<MatchOutcome> {
        let everyone = !core.participants().is_empty()
            && core.participants().iter().all(|p| self.infected.contains(p));
        if !everyone {
            return None;
        }
        let last = *self.infected.iter().rev().find(|p| core.contains(p))?;
        Some(MatchOutcome {
            winner: Some(last),
            text: format!(
                "Match is over! We all became rabid! {} was the last Cryptid! Congratulations!",
                ctx.display_name(&last)
            ),
        })
    }
}

impl GameMode for TagMode {
    fn mode(&self) -> GamePlayMode {
        GamePlayMode::Tag
    }

    fn on_start(&mut self, core: &mut MatchCore, ctx: &mut SessionContext) {
        let participants = core.participants();
        if participants.is_empty() {
            return;
        }
        let first = participants[ctx.rng.gen_range(0..participants.len())];
        for participant in participants {
            if let Some(body) = ctx.body_mut(participant) {
                body.status.clear(StatusKind::Infected);
            }
        }
        info!(match_id = %core.id, participant = %first, "First rabid cryptid chosen");
        self.infect(core, ctx, first);
    }

    fn tick_active(&mut self, core: &mut MatchCore, ctx: &mut SessionContext) -> Option<MatchOutcome> {
        if let Some(outcome) = self.check_all_infected(core, ctx) {
            return Some(outcome);
        }

        let range = core.settings.tag_range;
        let carriers: Vec<_> = self
            .infected
            .iter()
            .filter(|p| core.contains(p))
            .filter_map(|p| ctx.body(p).map(|b| b.position()))
            .collect();
        if carriers.is_empty() {
            return None;
        }

        let caught: Vec<ParticipantId> = core
            .participants()
            .iter()
            .filter(|p| !self.infected.contains(p))
            .filter(|p| {
                ctx.body(p)
                    .map(|b| carriers.iter().any(|c| c.distance(b.position()) <= range))
                    .unwrap_or(false)
            })
            .copied()
            .collect();

        for participant in caught {
            if let Some(outcome) = self.tag(core, ctx, participant) {
                return Some(outcome);
            }
        }
        None
    }

    fn handle_event(
        &mut self,
        core: &mut MatchCore,
        ctx: &mut SessionContext,
        event: MatchEvent,
    ) -> Option<MatchOutcome> {
        match event {
            MatchEvent::TagPlayer { participant } => self.tag(core, ctx, participant),
            other => {
                warn!(match_id = %core.id, event = ?other, "Event not used by tag mode");
                None
            }
        }
    }

    fn participant_left(
        &mut self,
        core: &mut MatchCore,
        ctx: &mut SessionContext,
        participant: ParticipantId,
    ) -> Option<MatchOutcome> {
        if !core.is_started() {
            return None;
        }
        core.remove_participant(&participant);
        self.check_all_infected(core, ctx)
    }

    fn clear(&mut self) {
        self.infected.clear();
    }
}
