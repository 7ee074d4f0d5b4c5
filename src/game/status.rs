//! Status flag bookkeeping for body entities

use serde::{Deserialize, Serialize};

/// Replicated status flags a body can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Infected,
    Eliminated,
    Invulnerable,
    Stunned,
    Slowed,
    Buffed,
    Afflicted,
}

impl StatusKind {
    pub const ALL: [StatusKind; 7] = [
        StatusKind::Infected,
        StatusKind::Eliminated,
        StatusKind::Invulnerable,
        StatusKind::Stunned,
        StatusKind::Slowed,
        StatusKind::Buffed,
        StatusKind::Afflicted,
    ];

    /// Nameplate label
    pub fn label(self) -> &'static str {
        match self {
            Self::Infected => "Rabid",
            Self::Eliminated => "Eliminated",
            Self::Invulnerable => "Invulnerable",
            Self::Stunned => "Stunned",
            Self::Slowed => "Slowed",
            Self::Buffed => "Buffed",
            Self::Afflicted => "Afflicted",
        }
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct StatusEntry {
    kind: StatusKind,
    /// Remaining seconds; None lasts until cleared
    remaining: Option<f32>,
}

/// Active statuses in the order they were applied
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusFlags {
    entries: Vec<StatusEntry>,
}

impl StatusFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self, kind: StatusKind) -> bool {
        self.entries.iter().any(|e| e.kind == kind)
    }

    pub fn remaining(&self, kind: StatusKind) -> Option<f32> {
        self.entries
            .iter()
            .find(|e| e.kind == kind)
            .and_then(|e| e.remaining)
    }

    /// Set a status. Re-setting a timed status refreshes its duration.
    /// Returns true when the status was not previously active.
    pub fn set(&mut self, kind: StatusKind, duration: Option<f32>) -> bool {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.kind == kind) {
            entry.remaining = duration;
            return false;
        }
        self.entries.push(StatusEntry {
            kind,
            remaining: duration,
        });
        true
    }

    /// Returns true when the status was active
    pub fn clear(&mut self, kind: StatusKind) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.kind != kind);
        before != self.entries.len()
    }

    /// Count timed statuses down by `dt`; returns the statuses that expired
    pub fn tick(&mut self, dt: f32) -> Vec<StatusKind> {
        let mut expired = Vec::new();
        for entry in &mut self.entries {
            if let Some(remaining) = entry.remaining.as_mut() {
                *remaining -= dt;
                if *remaining <= 0.0 {
                    expired.push(entry.kind);
                }
            }
        }
        self.entries.retain(|e| !expired.contains(&e.kind));
        expired
    }

    /// Compact bitset used by replication snapshots
    pub fn bits(&self) -> u8 {
        self.entries.iter().fold(0, |bits, e| bits | e.kind.bit())
    }

    pub fn from_bits(bits: u8) -> Vec<StatusKind> {
        StatusKind::ALL
            .into_iter()
            .filter(|kind| bits & kind.bit() != 0)
            .collect()
    }

    /// Nameplate prefix such as `[Rabid, Stunned]`; empty with no statuses
    pub fn display_prefix(&self) -> String {
        if self.entries.is_empty() {
            return String::new();
        }
        let labels: Vec<&str> = self.entries.iter().map(|e| e.kind.label()).collect();
        format!("[{}]", labels.join(", "))
    }
}
