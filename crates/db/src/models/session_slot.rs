use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use thiserror::Error;
use ts_rs::TS;

use super::draft::EpisodeDraft;

pub const SLOT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SlotError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("Slot record is malformed: {0}")]
    Malformed(String),
    #[error("Unsupported slot format version {0}")]
    UnsupportedVersion(u32),
    #[error("Failed to encode slot record: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Raw row of the local key-value store
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SessionSlot {
    pub slot_key: String,
    pub payload: String,
    pub updated_at: DateTime<Utc>,
}

/// What gets serialized into a slot's payload
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[ts(export)]
pub struct SlotRecord {
    pub format_version: u32,
    pub revision: u64,
    pub draft: EpisodeDraft,
}

impl SlotRecord {
    pub fn new(revision: u64, draft: EpisodeDraft) -> Self {
        Self {
            format_version: SLOT_FORMAT_VERSION,
            revision,
            draft,
        }
    }

    pub fn encode(&self) -> Result<String, SlotError> {
        serde_json::to_string(self).map_err(SlotError::Encode)
    }

    pub fn decode(payload: &str) -> Result<Self, SlotError> {
        let value: serde_json::Value =
            serde_json::from_str(payload).map_err(|e| SlotError::Malformed(e.to_string()))?;
        let version = value
            .get("format_version")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| SlotError::Malformed("missing format_version".to_string()))?;
        if version != SLOT_FORMAT_VERSION as u64 {
            return Err(SlotError::UnsupportedVersion(
                u32::try_from(version).unwrap_or(u32::MAX),
            ));
        }
        serde_json::from_value(value).map_err(|e| SlotError::Malformed(e.to_string()))
    }
}

impl SessionSlot {
    pub async fn find(pool: &SqlitePool, slot_key: &str) -> Result<Option<Self>, SlotError> {
        let slot = sqlx::query_as::<_, SessionSlot>(
            r#"SELECT slot_key, payload, updated_at FROM session_slots WHERE slot_key = ?1"#,
        )
        .bind(slot_key)
        .fetch_optional(pool)
        .await?;

        Ok(slot)
    }

    /// Last write wins; there is no merge with the existing payload.
    pub async fn upsert(pool: &SqlitePool, slot_key: &str, payload: &str) -> Result<Self, SlotError> {
        let slot = sqlx::query_as::<_, SessionSlot>(
            r#"
            INSERT INTO session_slots (slot_key, payload, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(slot_key) DO UPDATE SET
                payload = excluded.payload,
                updated_at = excluded.updated_at
            RETURNING slot_key, payload, updated_at
            "#,
        )
        .bind(slot_key)
        .bind(payload)
        .bind(Utc::now())
        .fetch_one(pool)
        .await?;

        Ok(slot)
    }

    pub async fn delete(pool: &SqlitePool, slot_key: &str) -> Result<bool, SlotError> {
        let result = sqlx::query(r#"DELETE FROM session_slots WHERE slot_key = ?1"#)
            .bind(slot_key)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
