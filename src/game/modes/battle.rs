//! Battle: lives, tranquilizer darts, and a buff for the last of each kind

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::game::r#match::{GameMode, MatchCore, MatchEvent, MatchOutcome};
use crate::game::session::SessionContext;
use crate::game::status::StatusKind;
use crate::net::protocol::{CryptidKind, GamePlayMode, ParticipantId};

#[derive(Debug, Default)]
pub struct BattleMode {
    lives: HashMap<ParticipantId, u32>,
    kinds: HashMap<ParticipantId, CryptidKind>,
    /// Eliminated participants in elimination order
    eliminated: Vec<ParticipantId>,
}

impl BattleMode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lives(&self, participant: &ParticipantId) -> Option<u32> {
        self.lives.get(participant).copied()
    }

    pub fn eliminated(&self) -> &[ParticipantId] {
        &self.eliminated
    }

    pub fn is_eliminated(&self, participant: &ParticipantId) -> bool {
        self.eliminated.contains(participant)
    }

    fn alive(&self) -> impl Iterator<Item = &ParticipantId> + '_ {
        self.lives.keys().filter(|p| !self.eliminated.contains(p))
    }

    fn player_hit(
        &mut self,
        core: &MatchCore,
        ctx: &mut SessionContext,
        victim: ParticipantId,
        attacker: ParticipantId,
    ) -> Option<MatchOutcome> {
        if self.eliminated.contains(&victim) {
            return None;
        }
        let lives = self.lives.get_mut(&victim)?;
        *lives = lives.saturating_sub(1);
        let remaining = *lives;

        if remaining == 0 {
            self.eliminated.push(victim);
            if let Some(body) = ctx.body_mut(&victim) {
                body.eliminate();
            }
            info!(match_id = %core.id, victim = %victim, attacker = %attacker, "Participant eliminated");
        } else {
            let settings = &core.settings;
            if let Some(body) = ctx.body_mut(&victim) {
                body.take_hit(settings.stun_secs, settings.invulnerable_secs);
            }
            debug!(match_id = %core.id, victim = %victim, lives = remaining, "Participant hit");
        }

        self.refresh_buffs(ctx);
        self.check_winner(ctx)
    }

    fn dart_hit(
        &mut self,
        core: &MatchCore,
        ctx: &mut SessionContext,
        victim: ParticipantId,
        attacker: ParticipantId,
    ) -> Option<MatchOutcome> {
        let invulnerable = ctx.body(&victim).map(|b| b.is_invulnerable()).unwrap_or(false);
        if invulnerable || self.eliminated.contains(&victim) {
            return None;
        }

        // Ghosts can still slow the living
        if self.eliminated.contains(&attacker) {
            if let Some(body) = ctx.body_mut(&victim) {
                body.apply_slow(core.settings.slow_secs);
            }
            debug!(match_id = %core.id, victim = %victim, attacker = %attacker, "Ghost dart slowed participant");
            return None;
        }

        self.player_hit(core, ctx, victim, attacker)
    }

    /// Magic never costs a life; it only afflicts living targets
    fn magic_hit(&self, core: &MatchCore, ctx: &mut SessionContext, victim: ParticipantId, attacker: ParticipantId) {
        if victim == attacker || self.eliminated.contains(&victim) {
            return;
        }
        if let Some(body) = ctx.body_mut(&victim) {
            body.apply_magic_effect(core.settings.magic_secs);
            debug!(match_id = %core.id, victim = %victim, attacker = %attacker, "Participant afflicted");
        }
    }

    /// A living body is buffed exactly when it is the last of its kind
    fn refresh_buffs(&self, ctx: &mut SessionContext) {
        let mut alive_per_kind: HashMap<CryptidKind, usize> = HashMap::new();
        for participant in self.alive() {
            let kind = self.kinds.get(participant).copied().unwrap_or_default();
            *alive_per_kind.entry(kind).or_default() += 1;
        }

        for participant in self.alive() {
            let kind = self.kinds.get(participant).copied().unwrap_or_default();
            let last_of_kind = alive_per_kind.get(&kind) == Some(&1);
            if let Some(body) = ctx.body_mut(participant) {
                if last_of_kind {
                    body.status.set(StatusKind::Buffed, None);
                } else {
                    body.status.clear(StatusKind::Buffed);
                }
            }
        }
    }

    fn check_winner(&self, ctx: &SessionContext) -> Option<MatchOutcome> {
        let mut alive = self.alive();
        let winner = *alive.next()?;
        if alive.next().is_some() {
            return None;
        }
        Some(MatchOutcome {
            winner: Some(winner),
            text: format!(
                "{} wins the game and is the last Cryptid standing!",
                ctx.display_name(&winner)
            ),
        })
    }
}

impl GameMode for BattleMode {
    fn mode(&self) -> GamePlayMode {
        GamePlayMode::Battle
    }

    fn on_register(&mut self, core: &MatchCore, ctx: &mut SessionContext, participant: ParticipantId) {
        let kind = ctx.body(&participant).map(|b| b.kind).unwrap_or_default();
        self.lives.entry(participant).or_insert(core.settings.starting_lives);
        self.kinds.insert(participant, kind);
    }

    fn on_start(&mut self, core: &mut MatchCore, _ctx: &mut SessionContext) {
        info!(
            match_id = %core.id,
            participants = self.lives.len(),
            lives = core.settings.starting_lives,
            "Battle started"
        );
    }

    fn handle_event(
        &mut self,
        core: &mut MatchCore,
        ctx: &mut SessionContext,
        event: MatchEvent,
    ) -> Option<MatchOutcome> {
        match event {
            MatchEvent::PlayerHit { victim, attacker } => self.player_hit(core, ctx, victim, attacker),
            MatchEvent::DartHit { victim, attacker } => self.dart_hit(core, ctx, victim, attacker),
            MatchEvent::MagicHit { victim, attacker } => {
                self.magic_hit(core, ctx, victim, attacker);
                None
            }
            other => {
                warn!(match_id = %core.id, event = ?other, "Event not used by battle mode");
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
            self.lives.remove(&participant);
            self.kinds.remove(&participant);
            return None;
        }
        if self.lives.contains_key(&participant) && !self.eliminated.contains(&participant) {
            self.eliminated.push(participant);
        }
        self.refresh_buffs(ctx);
        self.check_winner(ctx)
    }

    fn clear(&mut self) {
        self.lives.clear();
        self.kinds.clear();
        self.eliminated.clear();
    }
}
