//! A JSON-file-backed `MemoryRepo` for the CLI demo commands. The real
//! relational store is a collaborator's responsibility; this is just
//! enough persistence for `ragcore memory` to be runnable end to end.

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rag_core::{CoreError, CoreResult, Memory, MemoryRepo};
use uuid::Uuid;

pub struct JsonFileMemoryRepo {
    path: PathBuf,
    memories: Mutex<Vec<Memory>>,
}

impl JsonFileMemoryRepo {
    pub fn open(path: PathBuf) -> anyhow::Result<Self> {
        let memories = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            Vec::new()
        };

        Ok(Self {
            path,
            memories: Mutex::new(memories),
        })
    }

    fn persist(&self, memories: &[Memory]) -> CoreResult<()> {
        let content = serde_json::to_string_pretty(memories)
            .map_err(|err| CoreError::Parse(err.to_string()))?;
        std::fs::write(&self.path, content).map_err(|err| CoreError::Unavailable(err.to_string()))
    }
}

fn poisoned() -> CoreError {
    CoreError::Unavailable("memory repo lock poisoned".to_string())
}

#[async_trait]
impl MemoryRepo for JsonFileMemoryRepo {
    async fn insert(&self, memory: &Memory) -> CoreResult<()> {
        let mut memories = self.memories.lock().map_err(|_| poisoned())?;
        memories.push(memory.clone());
        self.persist(&memories)
    }

    async fn supersede(&self, existing_id: Uuid, new_id: Uuid) -> CoreResult<()> {
        let mut memories = self.memories.lock().map_err(|_| poisoned())?;
        if let Some(existing) = memories.iter_mut().find(|m| m.id == existing_id) {
            existing.superseded_by = Some(new_id);
        }
        self.persist(&memories)
    }

    async fn boost_access(&self, id: Uuid, now: DateTime<Utc>) -> CoreResult<()> {
        let mut memories = self.memories.lock().map_err(|_| poisoned())?;
        if let Some(memory) = memories.iter_mut().find(|m| m.id == id) {
            memory.last_accessed = now;
            memory.access_count += 1;
        }
        self.persist(&memories)
    }

    async fn list_active(&self, scope: &str) -> CoreResult<Vec<Memory>> {
        let _ = scope;
        let memories = self.memories.lock().map_err(|_| poisoned())?;
        Ok(memories.iter().filter(|m| m.is_active()).cloned().collect())
    }
}
