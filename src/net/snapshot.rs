//! Replication snapshots and change detection
//!
//! Each network tick the authoritative peer snapshots every body. Diffing two
//! snapshots yields the field changes that receiving peers react to; named
//! handlers on a [`ChangeDispatcher`] consume them.

use std::collections::BTreeMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::protocol::{CryptidKind, ParticipantId};
use crate::game::status::{StatusFlags, StatusKind};

/// Replicated state of one body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodySnapshot {
    pub participant: ParticipantId,
    pub kind: CryptidKind,
    pub position: Vec3,
    pub yaw: f32,
    pub status_bits: u8,
}

/// Every body at one tick, keyed by participant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub tick: u64,
    pub bodies: BTreeMap<ParticipantId, BodySnapshot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Change {
    Spawned,
    Despawned,
    StatusChanged { status: StatusKind, active: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub participant: ParticipantId,
    pub change: Change,
}

/// Builds snapshots at the replication rate and diffs them against the last one sent
pub struct SnapshotBuilder {
    /// Tick counter since last snapshot
    ticks_since_snapshot: u32,
    /// Snapshot interval in ticks
    snapshot_interval: u32,
    last: WorldSnapshot,
}

impl SnapshotBuilder {
    pub fn new(snapshot_interval: u32) -> Self {
        Self {
            ticks_since_snapshot: 0,
            snapshot_interval: snapshot_interval.max(1),
            last: WorldSnapshot::default(),
        }
    }

    /// Check if it's time to send a snapshot
    pub fn should_send(&mut self) -> bool {
        self.ticks_since_snapshot += 1;
        if self.ticks_since_snapshot >= self.snapshot_interval {
            self.ticks_since_snapshot = 0;
            true
        } else {
            false
        }
    }

    /// Force snapshot on next check (used for important events)
    pub fn force_next(&mut self) {
        self.ticks_since_snapshot = self.snapshot_interval;
    }

    /// Build a snapshot and return it with the changes since the previous one
    pub fn build(
        &mut self,
        tick: u64,
        bodies: impl IntoIterator<Item = BodySnapshot>,
    ) -> (WorldSnapshot, Vec<ChangeEvent>) {
        let snapshot = WorldSnapshot {
            tick,
            bodies: bodies.into_iter().map(|b| (b.participant, b)).collect(),
        };
        let changes = Self::diff(&self.last, &snapshot);
        self.last = snapshot.clone();
        (snapshot, changes)
    }

    /// Field changes between two snapshots, ordered by participant
    pub fn diff(previous: &WorldSnapshot, next: &WorldSnapshot) -> Vec<ChangeEvent> {
        let mut changes = Vec::new();

        for (id, body) in &next.bodies {
            let before = match previous.bodies.get(id) {
                Some(before) => before.status_bits,
                None => {
                    changes.push(ChangeEvent {
                        participant: *id,
                        change: Change::Spawned,
                    });
                    0
                }
            };
            let flipped = before ^ body.status_bits;
            for status in StatusFlags::from_bits(flipped) {
                changes.push(ChangeEvent {
                    participant: *id,
                    change: Change::StatusChanged {
                        status,
                        active: StatusFlags::from_bits(body.status_bits).contains(&status),
                    },
                });
            }
        }

        for id in previous.bodies.keys() {
            if !next.bodies.contains_key(id) {
                changes.push(ChangeEvent {
                    participant: *id,
                    change: Change::Despawned,
                });
            }
        }

        changes
    }
}

type ChangeHandler = Box<dyn FnMut(&ChangeEvent) + Send>;

/// Named handlers invoked for every change event, in registration order
#[derive(Default)]
pub struct ChangeDispatcher {
    handlers: Vec<(&'static str, ChangeHandler)>,
}

impl ChangeDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &'static str, handler: impl FnMut(&ChangeEvent) + Send + 'static) {
        self.handlers.push((name, Box::new(handler)));
    }

    pub fn handler_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.iter().map(|(name, _)| *name)
    }

    pub fn dispatch(&mut self, events: &[ChangeEvent]) {
        for event in events {
            for (name, handler) in &mut self.handlers {
                debug!(handler = *name, participant = %event.participant, change = ?event.change, "Dispatching change");
                handler(event);
            }
        }
    }
}
