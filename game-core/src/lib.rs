pub mod cleanup;
pub mod env;
pub mod registry;
pub mod room;
pub mod room_events;
pub mod scoring;
pub mod sweeper;
pub mod word_source;

// Re-export main components
pub use cleanup::*;
pub use env::*;
pub use registry::*;
pub use room::*;
pub use room_events::*;
pub use scoring::*;
pub use sweeper::*;
pub use word_source::*;
