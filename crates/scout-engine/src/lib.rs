//! Core of the ambient research engine: drive dynamics, topic admission,
//! and the research trigger dispatcher, organized as one actor per user.

pub mod actor;
pub mod drives;
pub mod engine;
pub mod error;
pub mod findings;
pub mod researcher;
pub mod topics;

pub use actor::ActorHandle;
pub use drives::{DriveConfig, DriveState};
pub use engine::{EngineConfig, ResearchEngine};
pub use error::EngineError;
pub use findings::FindingStore;
pub use researcher::{CycleOutput, Researcher};
pub use topics::{TopicSet, DEFAULT_ACTIVE_CAP};
