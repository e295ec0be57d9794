use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The verdict `MemoryConsolidator::consolidate` reaches for a candidate
/// memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsolidationAction {
    /// Insert the new memory.
    Store,
    /// Drop the new memory; it duplicates an existing one.
    Skip,
    /// Insert the new memory and mark the existing one superseded by it.
    Supersede,
}

/// Outcome of a consolidation pass, returned to the caller (who owns the
/// `MemoryRepo` write for `Store`/`Supersede`, and the `boost_access` call
/// for `Skip`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidationResult {
    pub action: ConsolidationAction,
    pub existing_id: Option<Uuid>,
    pub reason: String,
}
