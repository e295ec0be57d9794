//! `MemoryRepo`: the persistence seam the consolidator drives but never
//! implements. Relational storage of memories is a collaborator's
//! responsibility; this crate only describes the contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::types::Memory;
use crate::error::CoreResult;

#[async_trait]
pub trait MemoryRepo: Send + Sync {
    async fn insert(&self, memory: &Memory) -> CoreResult<()>;

    /// Marks `existing_id.superseded_by = new_id`. Never unset once set.
    async fn supersede(&self, existing_id: Uuid, new_id: Uuid) -> CoreResult<()>;

    /// Increments `access_count` and sets `last_accessed = now` on a
    /// retrieval hit.
    async fn boost_access(&self, id: Uuid, now: DateTime<Utc>) -> CoreResult<()>;

    /// Active memories only (`superseded_by.is_none()`), for a given
    /// scope/user.
    async fn list_active(&self, scope: &str) -> CoreResult<Vec<Memory>>;
}
