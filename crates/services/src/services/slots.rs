use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use db::models::session_slot::{SessionSlot, SlotError};
use sqlx::SqlitePool;
use tokio::sync::Mutex;

/// Persistent key-value slot holding the serialized active draft
#[async_trait]
pub trait SlotStore: Send + Sync {
    async fn read(&self, key: &str) -> Result<Option<String>, SlotError>;
    async fn write(&self, key: &str, payload: &str) -> Result<(), SlotError>;
    async fn clear(&self, key: &str) -> Result<(), SlotError>;
}

/// Slots in the local SQLite database
pub struct SqliteSlots {
    pool: SqlitePool,
}

impl SqliteSlots {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SlotStore for SqliteSlots {
    async fn read(&self, key: &str) -> Result<Option<String>, SlotError> {
        Ok(SessionSlot::find(&self.pool, key).await?.map(|s| s.payload))
    }

    async fn write(&self, key: &str, payload: &str) -> Result<(), SlotError> {
        SessionSlot::upsert(&self.pool, key, payload).await?;
        Ok(())
    }

    async fn clear(&self, key: &str) -> Result<(), SlotError> {
        SessionSlot::delete(&self.pool, key).await?;
        Ok(())
    }
}

/// Slots kept in process memory
#[derive(Default)]
pub struct MemorySlotStore {
    slots: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemorySlotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make writes fail as if the disk were full.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SlotStore for MemorySlotStore {
    async fn read(&self, key: &str) -> Result<Option<String>, SlotError> {
        Ok(self.slots.lock().await.get(key).cloned())
    }

    async fn write(&self, key: &str, payload: &str) -> Result<(), SlotError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SlotError::Database(sqlx::Error::Io(std::io::Error::other(
                "slot storage is full",
            ))));
        }
        self.slots
            .lock()
            .await
            .insert(key.to_string(), payload.to_string());
        Ok(())
    }

    async fn clear(&self, key: &str) -> Result<(), SlotError> {
        self.slots.lock().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use db::DBService;

    use super::*;

    #[tokio::test]
    async fn test_sqlite_slots_round_trip() {
        let db = DBService::new_in_memory().await.unwrap();
        let slots = SqliteSlots::new(db.pool.clone());

        assert_eq!(slots.read("current_project").await.unwrap(), None);
        slots.write("current_project", "{}").await.unwrap();
        slots.write("current_project", "{\"a\":1}").await.unwrap();
        assert_eq!(
            slots.read("current_project").await.unwrap().as_deref(),
            Some("{\"a\":1}")
        );
        slots.clear("current_project").await.unwrap();
        assert_eq!(slots.read("current_project").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_slots_can_fail_writes() {
        let slots = MemorySlotStore::new();
        slots.set_fail_writes(true);
        assert!(slots.write("k", "v").await.is_err());
        slots.set_fail_writes(false);
        slots.write("k", "v").await.unwrap();
        assert_eq!(slots.read("k").await.unwrap().as_deref(), Some("v"));
    }
}
