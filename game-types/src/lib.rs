pub mod errors;
pub mod messages;
pub mod participant;
pub mod room;

// Re-export all types
pub use errors::*;
pub use messages::*;
pub use participant::*;
pub use room::*;

/// Opaque short room token, e.g. `"K3Z9QA"`.
pub type RoomId = String;
pub type ParticipantId = String;
/// One-based round counter.
pub type RoundNumber = u32;
