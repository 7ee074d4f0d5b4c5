//! VRChaos core
//!
//! Contact locomotion for hand-driven cryptid bodies and the replicated match
//! state machine behind Tag, Battle, Decryptid and Free Play.

pub mod config;
pub mod game;
pub mod locomotion;
pub mod net;
pub mod util;
