//! Authoritative match simulation: bodies, session context, game modes and the host loop

pub mod body;
pub mod bot;
pub mod host;
pub mod r#match;
pub mod modes;
pub mod session;
pub mod status;

pub use body::BodyEntity;
pub use host::MatchHost;
pub use r#match::{
    GameMode, MatchCore, MatchDriver, MatchEvent, MatchOutcome, MatchPhase, MatchSummary, ModeManager,
};
pub use session::{LobbyService, RecordingLobby, SessionContext, SessionError};
pub use status::{StatusFlags, StatusKind};
