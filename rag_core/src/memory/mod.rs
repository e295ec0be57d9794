mod consolidation;
mod repository;
mod types;

pub use consolidation::{ConsolidationAction, ConsolidationResult};
pub use repository::MemoryRepo;
pub use types::{Memory, MemoryCategory, SourceType, DEFAULT_TEMPORAL_TTL};
