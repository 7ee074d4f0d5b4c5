//! Replication protocol message definitions
//! These are the one-way broadcasts the authoritative peer sends to every peer

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Participant identifier (one per connected player)
pub type ParticipantId = Uuid;

/// Game modes a session can host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePlayMode {
    /// Hunt-and-be-hunted photography mode
    Decryptid,
    /// Free-for-all with tranquilizer darts and lives
    Battle,
    /// Hang-out session with no win condition
    FreePlay,
    /// Infection tag
    Tag,
}

impl fmt::Display for GamePlayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Decryptid => "decryptid",
            Self::Battle => "battle",
            Self::FreePlay => "free_play",
            Self::Tag => "tag",
        };
        f.write_str(name)
    }
}

impl FromStr for GamePlayMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "decryptid" => Ok(Self::Decryptid),
            "battle" => Ok(Self::Battle),
            "free_play" | "freeplay" => Ok(Self::FreePlay),
            "tag" => Ok(Self::Tag),
            _ => Err(UnknownMode(s.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown game mode: {0}")]
pub struct UnknownMode(pub String);

/// Playable cryptid characters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CryptidKind {
    #[default]
    Bigfoot,
    Mothman,
    Alien,
    Frogman,
}

impl CryptidKind {
    /// Character roster in prefab order
    pub const ROSTER: [CryptidKind; 4] = [
        CryptidKind::Bigfoot,
        CryptidKind::Mothman,
        CryptidKind::Alien,
        CryptidKind::Frogman,
    ];

    pub fn from_index(index: i32) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ROSTER.get(i).copied())
    }
}

/// Messages broadcast from the authoritative peer to every peer, in order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Broadcast {
    /// Pre-match countdown tick
    Countdown { seconds_remaining: f32 },

    /// Free-form message shown to everyone
    Message { text: String },

    /// A participant became infected (Tag)
    Infected { participant: ParticipantId },

    /// A hunter received a target (Decryptid)
    TargetAssigned {
        hunter: ParticipantId,
        target: ParticipantId,
    },

    /// The match moved to the active state
    MatchStarted { mode: GamePlayMode, tick: u64 },

    /// The match ended; everyone returns to the lobby
    MatchEnded {
        mode: GamePlayMode,
        /// Winner (Battle, Decryptid) or last infected (Tag)
        winner: Option<ParticipantId>,
        text: String,
    },

    /// A single participant is leaving for the lobby (Free Play)
    ReturnToLobby { participant: ParticipantId },
}

/// Countdown values at or below this are shown as the emphasized final countdown
pub const FINAL_COUNTDOWN_DISPLAY_SECS: f32 = 10.0;

/// What a receiving peer shows on its HUD for a broadcast
#[derive(Debug, Clone, PartialEq)]
pub enum HudLine {
    Countdown { seconds: f32 },
    FinalCountdown { seconds: f32 },
    Message { text: String, duration_secs: f32 },
}

impl Broadcast {
    /// Render this broadcast for the peer whose local participant is `local`.
    ///
    /// Returns None for broadcasts the local peer does not display.
    pub fn render_for(
        &self,
        local: ParticipantId,
        name_of: impl Fn(ParticipantId) -> String,
    ) -> Option<HudLine> {
        match self {
            Self::Countdown { seconds_remaining } => {
                if *seconds_remaining > FINAL_COUNTDOWN_DISPLAY_SECS {
                    Some(HudLine::Countdown {
                        seconds: *seconds_remaining,
                    })
                } else {
                    Some(HudLine::FinalCountdown {
                        seconds: *seconds_remaining,
                    })
                }
            }
            Self::Message { text } => Some(HudLine::Message {
                text: text.clone(),
                duration_secs: 2.0,
            }),
            Self::Infected { participant } => {
                let text = if *participant == local {
                    "You've been infected!".to_string()
                } else {
                    format!("{} has been infected!", name_of(*participant))
                };
                Some(HudLine::Message {
                    text,
                    duration_secs: 2.0,
                })
            }
            Self::TargetAssigned { hunter, target } if *hunter == local => Some(HudLine::Message {
                text: format!("Your target is {}!", name_of(*target)),
                duration_secs: 3.0,
            }),
            Self::TargetAssigned { .. } => None,
            Self::MatchStarted { .. } => None,
            Self::MatchEnded { text, .. } => Some(HudLine::Message {
                text: text.clone(),
                duration_secs: 5.0,
            }),
            Self::ReturnToLobby { .. } => None,
        }
    }
}
