//! Session context: everything a match needs, passed by reference
//!
//! One context exists per hosted session. It owns the tick clock, the body
//! registry, the ordered broadcast channel, the seeded RNG and the handle to
//! the lobby service.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::sync::broadcast;
use tracing::{error, info};

use super::body::BodyEntity;
use crate::config::LocomotionConfig;
use crate::locomotion::{LayerMask, StaticWorld};
use crate::net::protocol::{Broadcast, CryptidKind, ParticipantId};
use crate::util::time::TickClock;

/// Broadcast channel depth; slow receivers lag rather than block the tick
const BROADCAST_CAPACITY: usize = 256;

/// Spawn ring around the origin
const SPAWN_MIN_RADIUS: f32 = 0.5;
const SPAWN_MAX_RADIUS: f32 = 4.0;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Invalid character index {0}")]
    InvalidCharacterIndex(i32),
    #[error("Participant {0} already has a body")]
    AlreadySpawned(ParticipantId),
    #[error("Match refused participant {0}")]
    Refused(ParticipantId),
}

/// Session and lobby lifecycle collaborator
pub trait LobbyService: Send {
    fn despawn(&mut self, participant: ParticipantId);

    fn return_to_lobby(&mut self, participant: ParticipantId);

    fn end_session_and_return_to_lobby(&mut self);
}

/// What a [`RecordingLobby`] has been asked to do
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LobbyLog {
    pub despawned: Vec<ParticipantId>,
    pub returned: Vec<ParticipantId>,
    pub sessions_ended: u32,
}

/// Lobby service that logs and records every hand-off
#[derive(Clone, Default)]
pub struct RecordingLobby {
    log: Arc<Mutex<LobbyLog>>,
}

impl RecordingLobby {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> LobbyLog {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, LobbyLog> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LobbyService for RecordingLobby {
    fn despawn(&mut self, participant: ParticipantId) {
        info!(participant = %participant, "Despawning participant");
        self.lock().despawned.push(participant);
    }

    fn return_to_lobby(&mut self, participant: ParticipantId) {
        info!(participant = %participant, "Returning participant to lobby");
        self.lock().returned.push(participant);
    }

    fn end_session_and_return_to_lobby(&mut self) {
        info!("Ending session and returning everyone to lobby");
        self.lock().sessions_ended += 1;
    }
}

pub struct SessionContext {
    pub clock: TickClock,
    state_authority: bool,
    bodies: HashMap<ParticipantId, BodyEntity>,
    broadcast_tx: broadcast::Sender<Broadcast>,
    lobby: Box<dyn LobbyService>,
    pub rng: ChaCha8Rng,
    pub world: StaticWorld,
    pub locomotion_mask: LayerMask,
    pub locomotion: LocomotionConfig,
}

impl SessionContext {
    /// Authoritative context over a flat floor
    pub fn new(seed: u64, lobby: Box<dyn LobbyService>) -> Self {
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            clock: TickClock::default(),
            state_authority: true,
            bodies: HashMap::new(),
            broadcast_tx,
            lobby,
            rng: ChaCha8Rng::seed_from_u64(seed),
            world: StaticWorld::with_floor(0.0),
            locomotion_mask: LayerMask::ALL,
            locomotion: LocomotionConfig::default(),
        }
    }

    pub fn has_state_authority(&self) -> bool {
        self.state_authority
    }

    pub fn set_state_authority(&mut self, authority: bool) {
        self.state_authority = authority;
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Broadcast> {
        self.broadcast_tx.subscribe()
    }

    /// Send to every peer; having no receivers is not an error
    pub fn broadcast(&self, msg: Broadcast) {
        let _ = self.broadcast_tx.send(msg);
    }

    /// Spawn a body for `participant` using a roster index.
    ///
    /// An invalid index is a configuration error: it is logged and nothing spawns.
    pub fn spawn_body(
        &mut self,
        participant: ParticipantId,
        character_index: i32,
    ) -> Result<&mut BodyEntity, SessionError> {
        let Some(kind) = CryptidKind::from_index(character_index) else {
            error!(participant = %participant, character_index, "Invalid character index, skipping spawn");
            return Err(SessionError::InvalidCharacterIndex(character_index));
        };
        if self.bodies.contains_key(&participant) {
            return Err(SessionError::AlreadySpawned(participant));
        }

        let position = self.spawn_position();
        let yaw = self.rng.gen_range(0.0..std::f32::consts::TAU);
        let body = BodyEntity::new(participant, kind, position, yaw, &self.locomotion);

        info!(participant = %participant, kind = ?kind, x = position.x, z = position.z, "Spawned body");
        Ok(self.bodies.entry(participant).or_insert(body))
    }

    fn spawn_position(&mut self) -> Vec3 {
        let angle = self.rng.gen_range(0.0..std::f32::consts::TAU);
        let distance = self.rng.gen_range(SPAWN_MIN_RADIUS..SPAWN_MAX_RADIUS);
        Vec3::new(angle.cos() * distance, 0.0, angle.sin() * distance)
    }

    /// Remove a body and tell the lobby service
    pub fn despawn_body(&mut self, participant: ParticipantId) -> Option<BodyEntity> {
        let body = self.bodies.remove(&participant)?;
        self.lobby.despawn(participant);
        Some(body)
    }

    pub fn despawn_all(&mut self) {
        let mut ids: Vec<ParticipantId> = self.bodies.keys().copied().collect();
        ids.sort();
        for id in ids {
            self.despawn_body(id);
        }
    }

    pub fn body(&self, participant: &ParticipantId) -> Option<&BodyEntity> {
        self.bodies.get(participant)
    }

    pub fn body_mut(&mut self, participant: &ParticipantId) -> Option<&mut BodyEntity> {
        self.bodies.get_mut(participant)
    }

    /// A body together with the geometry and tuning its solver needs
    pub fn body_in_world(
        &mut self,
        participant: &ParticipantId,
    ) -> Option<(&mut BodyEntity, &StaticWorld, &LocomotionConfig, LayerMask)> {
        let body = self.bodies.get_mut(participant)?;
        Some((body, &self.world, &self.locomotion, self.locomotion_mask))
    }

    pub fn bodies(&self) -> impl Iterator<Item = &BodyEntity> {
        self.bodies.values()
    }

    pub fn bodies_mut(&mut self) -> impl Iterator<Item = &mut BodyEntity> {
        self.bodies.values_mut()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Nameplate name, falling back to the id for participants without a body
    pub fn display_name(&self, participant: &ParticipantId) -> String {
        match self.bodies.get(participant) {
            Some(body) => body.display_name.clone(),
            None => participant.to_string(),
        }
    }

    pub fn return_to_lobby(&mut self, participant: ParticipantId) {
        self.lobby.return_to_lobby(participant);
    }

    pub fn end_session(&mut self) {
        self.lobby.end_session_and_return_to_lobby();
    }
}
