use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a consolidated user fact is classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryCategory {
    Factual,
    Preference,
    Relationship,
    Temporal,
}

impl std::fmt::Display for MemoryCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Factual => write!(f, "factual"),
            Self::Preference => write!(f, "preference"),
            Self::Relationship => write!(f, "relationship"),
            Self::Temporal => write!(f, "temporal"),
        }
    }
}

impl std::str::FromStr for MemoryCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "factual" => Ok(Self::Factual),
            "preference" => Ok(Self::Preference),
            "relationship" => Ok(Self::Relationship),
            "temporal" => Ok(Self::Temporal),
            other => Err(anyhow::anyhow!("unknown memory category: {other}")),
        }
    }
}

/// Which surface produced the memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Spotlight,
    MainChat,
}

/// Default lifetime for a `temporal` memory when the caller does not
/// specify `expires_at` explicitly; see `DESIGN.md` for the reasoning.
pub const DEFAULT_TEMPORAL_TTL: Duration = Duration::days(7);

/// A consolidated user fact.
///
/// Invariants: a memory with `superseded_by.is_some()` is not returned by
/// active-list queries; `superseded_by` edges form a DAG (trivially, since
/// a freshly-created memory has no predecessors to cycle back to);
/// `expires_at.is_some()` implies `category == Temporal`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    pub id: Uuid,
    pub content: String,
    pub category: MemoryCategory,
    /// `[0, 1]`.
    pub importance: f64,
    pub source_type: SourceType,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_accessed: DateTime<Utc>,
    pub access_count: u32,
    pub superseded_by: Option<Uuid>,
}

impl Memory {
    /// Construct a new, not-yet-superseded memory. Sets `expires_at` to
    /// `created_at + DEFAULT_TEMPORAL_TTL` when `category == Temporal`,
    /// `None` otherwise — enforcing the invariant at the single
    /// construction point rather than at every call site.
    #[must_use]
    pub fn new(
        content: impl Into<String>,
        category: MemoryCategory,
        importance: f64,
        source_type: SourceType,
        now: DateTime<Utc>,
    ) -> Self {
        let expires_at = matches!(category, MemoryCategory::Temporal).then(|| now + DEFAULT_TEMPORAL_TTL);
        Self {
            id: Uuid::now_v7(),
            content: content.into(),
            category,
            importance: importance.clamp(0.0, 1.0),
            source_type,
            created_at: now,
            expires_at,
            last_accessed: now,
            access_count: 0,
            superseded_by: None,
        }
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.superseded_by.is_none()
    }
}
