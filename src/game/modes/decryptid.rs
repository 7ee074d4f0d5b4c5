//! Decryptid: every cryptid hunts an assigned target with a camera

use std::collections::HashMap;

use rand::seq::SliceRandom;
use tracing::{debug, info, warn};

use crate::game::r#match::{GameMode, MatchCore, MatchEvent, MatchOutcome};
use crate::game::session::SessionContext;
use crate::net::protocol::{Broadcast, GamePlayMode, ParticipantId};

#[derive(Debug, Default)]
pub struct DecryptidMode {
    /// hunter -> target
    targets: HashMap<ParticipantId, ParticipantId>,
    /// Captured participants in capture order
    captured: Vec<ParticipantId>,
}

impl DecryptidMode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target_for(&self, hunter: &ParticipantId) -> Option<ParticipantId> {
        self.targets.get(hunter).copied()
    }

    pub fn captured(&self) -> &[ParticipantId] {
        &self.captured
    }

    fn remaining<'a>(&'a self, core: &'a MatchCore) -> impl Iterator<Item = &'a ParticipantId> + 'a {
        core.participants()
            .iter()
            .filter(|p| !self.captured.contains(p))
    }

    /// Pick a random uncaptured participant other than the hunter
    fn assign_target(
        &mut self,
        core: &MatchCore,
        ctx: &mut SessionContext,
        hunter: ParticipantId,
    ) -> Option<ParticipantId> {
        let candidates: Vec<ParticipantId> = self
            .remaining(core)
            .filter(|p| **p != hunter)
            .copied()
            .collect();
        let Some(target) = candidates.choose(&mut ctx.rng).copied() else {
            self.targets.remove(&hunter);
            debug!(match_id = %core.id, hunter = %hunter, "No target left to assign");
            return None;
        };

        self.targets.insert(hunter, target);
        ctx.broadcast(Broadcast::TargetAssigned { hunter, target });
        debug!(match_id = %core.id, hunter = %hunter, target = %target, "Target assigned");
        Some(target)
    }

    /// Remove a participant from the hunt and re-target everyone chasing them
    fn retire(&mut self, core: &MatchCore, ctx: &mut SessionContext, participant: ParticipantId) {
        if !self.captured.contains(&participant) {
            self.captured.push(participant);
        }
        self.targets.remove(&participant);

        let mut chasing: Vec<ParticipantId> = self
            .targets
            .iter()
            .filter(|(_, target)| **target == participant)
            .map(|(hunter, _)| *hunter)
            .collect();
        chasing.sort();
        for hunter in chasing {
            self.assign_target(core, ctx, hunter);
        }
    }

    fn capture(
        &mut self,
        core: &MatchCore,
        ctx: &mut SessionContext,
        hunter: ParticipantId,
        target: ParticipantId,
    ) -> Option<MatchOutcome> {
        if self.captured.contains(&hunter) || self.target_for(&hunter) != Some(target) {
            warn!(match_id = %core.id, hunter = %hunter, target = %target, "Capture of a target the hunter was not assigned");
            return None;
        }

        if let Some(body) = ctx.body_mut(&target) {
            body.eliminate();
        }
        ctx.broadcast(Broadcast::Message {
            text: format!(
                "{} captured {} on camera!",
                ctx.display_name(&hunter),
                ctx.display_name(&target)
            ),
        });
        info!(match_id = %core.id, hunter = %hunter, target = %target, "Target captured");

        self.retire(core, ctx, target);
        self.check_winner(core, ctx)
    }

    fn check_winner(&self, core: &MatchCore, ctx: &SessionContext) -> Option<MatchOutcome> {
        let mut remaining = self.remaining(core);
        let winner = *remaining.next()?;
        if remaining.next().is_some() {
            return None;
        }
        Some(MatchOutcome {
            winner: Some(winner),
            text: format!(
                "{} stayed hidden and is the last Cryptid standing!",
                ctx.display_name(&winner)
            ),
        })
    }
}

impl GameMode for DecryptidMode {
    fn mode(&self) -> GamePlayMode {
        GamePlayMode::Decryptid
    }

    fn on_start(&mut self, core: &mut MatchCore, ctx: &mut SessionContext) {
        let hunters = core.participants().to_vec();
        for hunter in hunters {
            self.assign_target(core, ctx, hunter);
        }
        info!(match_id = %core.id, hunters = self.targets.len(), "Targets assigned");
    }

    fn handle_event(
        &mut self,
        core: &mut MatchCore,
        ctx: &mut SessionContext,
        event: MatchEvent,
    ) -> Option<MatchOutcome> {
        match event {
            MatchEvent::AssignTarget { hunter } => {
                if core.contains(&hunter) && !self.captured.contains(&hunter) {
                    self.assign_target(core, ctx, hunter);
                }
                None
            }
            MatchEvent::Capture { hunter, target } => self.capture(core, ctx, hunter, target),
            other => {
                warn!(match_id = %core.id, event = ?other, "Event not used by decryptid mode");
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
        self.retire(core, ctx, participant);
        self.check_winner(core, ctx)
    }

    fn clear(&mut self) {
        self.targets.clear();
        self.captured.clear();
    }
}
