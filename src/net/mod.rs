//! Replication surface: broadcast protocol and snapshot change detection

pub mod protocol;
pub mod snapshot;

pub use protocol::{Broadcast, CryptidKind, GamePlayMode, ParticipantId};
pub use snapshot::{ChangeDispatcher, ChangeEvent, SnapshotBuilder};
