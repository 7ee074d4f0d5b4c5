//! Configuration module - environment variable parsing and static tuning

use std::env;
use std::str::FromStr;

use crate::net::protocol::GamePlayMode;

/// Host configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit JSON log lines instead of the human readable format
    pub log_json: bool,

    /// Game mode hosted by this process
    pub game_mode: GamePlayMode,
    /// Number of bot participants spawned into the session
    pub bot_count: usize,
    /// Seed for all match randomness; random when unset
    pub match_seed: Option<u64>,
    /// Override for the mode's pre-match countdown
    pub countdown_secs: Option<f32>,
    /// Hard cap on how long the host runs a match
    pub max_match_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let log_format = env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
        let log_json = match log_format.as_str() {
            "pretty" => false,
            "json" => true,
            _ => return Err(ConfigError::Invalid("LOG_FORMAT", log_format)),
        };

        let game_mode = match env::var("GAME_MODE") {
            Ok(raw) => raw
                .parse::<GamePlayMode>()
                .map_err(|_| ConfigError::Invalid("GAME_MODE", raw))?,
            Err(_) => GamePlayMode::Tag,
        };

        Ok(Self {
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_json,
            game_mode,
            bot_count: parse_or("BOT_COUNT", 4)?,
            match_seed: parse_optional("MATCH_SEED")?,
            countdown_secs: parse_optional("COUNTDOWN_SECS")?,
            max_match_secs: parse_or("MAX_MATCH_SECS", 600)?,
        })
    }

    /// Mode settings with the countdown override applied
    pub fn mode_settings(&self) -> ModeSettings {
        let mut settings = ModeSettings::for_mode(self.game_mode);
        if let Some(countdown) = self.countdown_secs {
            settings.countdown_secs = countdown.max(0.0);
        }
        settings
    }
}

fn parse_optional<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(key, raw)),
        Err(_) => Ok(None),
    }
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    Ok(parse_optional(key)?.unwrap_or(default))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1:?}")]
    Invalid(&'static str, String),
}

/// Per-mode match rules
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeSettings {
    /// Maximum participants in a session
    pub player_cap: usize,
    /// Minimum participants for the match to start
    pub min_participants: usize,
    /// Countdown before the match starts (seconds)
    pub countdown_secs: f32,
    /// Threshold the countdown is compressed to once the session is full
    pub final_countdown_secs: f32,
    /// Battle: lives per participant
    pub starting_lives: u32,
    /// Battle: stun applied on a non-lethal hit (seconds)
    pub stun_secs: f32,
    /// Battle: invulnerability window after a hit (seconds)
    pub invulnerable_secs: f32,
    /// Battle: slow applied by a ghost's dart (seconds)
    pub slow_secs: f32,
    /// Battle: affliction from a magic projectile (seconds)
    pub magic_secs: f32,
    /// Tag: infection radius around an infected body
    pub tag_range: f32,
    /// Free play: delay before a leaving participant is handed to the lobby
    pub exit_delay_secs: f32,
}

impl ModeSettings {
    pub fn for_mode(mode: GamePlayMode) -> Self {
        let base = Self {
            player_cap: 1,
            min_participants: 2,
            countdown_secs: 180.0,
            final_countdown_secs: 60.0,
            starting_lives: 3,
            stun_secs: 2.0,
            invulnerable_secs: 3.0,
            slow_secs: 1.5,
            magic_secs: 2.0,
            tag_range: 1.5,
            exit_delay_secs: 0.25,
        };

        match mode {
            GamePlayMode::Decryptid => Self {
                player_cap: 15,
                ..base
            },
            GamePlayMode::Battle => Self {
                player_cap: 10,
                ..base
            },
            GamePlayMode::FreePlay => Self {
                player_cap: 20,
                min_participants: 1,
                countdown_secs: 0.0,
                ..base
            },
            GamePlayMode::Tag => Self {
                player_cap: 20,
                ..base
            },
        }
    }
}

/// Tuning for the contact locomotion solver
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocomotionConfig {
    /// Ring buffer length for the launch velocity average
    pub velocity_history_size: usize,
    /// Hand targets are clamped to this distance from the head
    pub max_arm_length: f32,
    /// A stuck hand this far from its target is released
    pub unstick_distance: f32,
    /// Hand probe sphere radius
    pub probe_radius: f32,
    /// Head probe sphere radius
    pub head_radius: f32,
    /// Precision fraction for contact casts (< 1)
    pub precision: f32,
    /// Slip applied when a single hand holds a surface without its own slip value
    pub single_hand_slip: f32,
    /// Slip applied while both hands hold; lower so two-handed grips stick
    pub dual_hand_slip: f32,
    /// Average speed above which releasing a surface launches the body
    pub velocity_limit: f32,
    /// Launch speed cap
    pub max_jump_speed: f32,
    /// Launch velocity multiplier
    pub jump_multiplier: f32,
    /// Gravity magnitude used for the hand travel bias
    pub gravity: f32,
    /// Displacements shorter than this do not move the body
    pub movement_epsilon: f32,
    /// Slowed status multiplier on velocity limit and jump multiplier
    pub slow_multiplier: f32,
    /// Buffed status multiplier on velocity limit and jump multiplier
    pub buff_multiplier: f32,
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        Self {
            velocity_history_size: 8,
            max_arm_length: 1.5,
            unstick_distance: 1.0,
            probe_radius: 0.05,
            head_radius: 0.15,
            precision: 0.995,
            single_hand_slip: 0.03,
            dual_hand_slip: 0.001,
            velocity_limit: 0.4,
            max_jump_speed: 6.5,
            jump_multiplier: 1.1,
            gravity: 9.8,
            movement_epsilon: 1e-6,
            slow_multiplier: 0.6,
            buff_multiplier: 1.25,
        }
    }
}
