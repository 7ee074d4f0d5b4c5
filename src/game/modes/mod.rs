//! Game mode rules

pub mod battle;
pub mod decryptid;
pub mod free_play;
pub mod tag;

pub use battle::BattleMode;
pub use decryptid::DecryptidMode;
pub use free_play::FreePlayMode;
pub use tag::TagMode;

use uuid::Uuid;

use super::r#match::{MatchDriver, ModeManager};
use crate::config::ModeSettings;
use crate::net::protocol::GamePlayMode;

/// Build the manager for a mode
pub fn build_match(id: Uuid, mode: GamePlayMode, settings: ModeSettings) -> Box<dyn MatchDriver> {
    match mode {
        GamePlayMode::Tag => Box::new(ModeManager::new(id, settings, TagMode::new())),
        GamePlayMode::Battle => Box::new(ModeManager::new(id, settings, BattleMode::new())),
        GamePlayMode::Decryptid => Box::new(ModeManager::new(id, settings, DecryptidMode::new())),
        GamePlayMode::FreePlay => Box::new(ModeManager::new(id, settings, FreePlayMode::new())),
    }
}
