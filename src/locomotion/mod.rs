//! Contact locomotion: hands push the body around by touching geometry

pub mod cast;
pub mod input;
pub mod query;
pub mod rig;
pub mod solver;
pub mod velocity;

pub use cast::{ContactCaster, ContactResult};
pub use input::{Button, InputDevice, TurnController, TurnMode, TurnSettings};
pub use query::{ColliderId, EnvironmentQuery, LayerMask, StaticWorld, SurfaceHit};
pub use rig::{Hand, LocalRig};
pub use solver::{ClimbState, RigPose, StepOutcome, StepParams};
