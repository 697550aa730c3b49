//! Advisory notices for the stage surface.
//!
//! Background failures (remote sync, enhancement) never interrupt the user.
//! They land here as dismissible notices and expire on their own.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq, Eq)]
#[ts(export)]
pub struct Notice {
    pub id: u64,
    pub level: NoticeLevel,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct BoardState {
    next_id: u64,
    notices: Vec<Notice>,
}

impl BoardState {
    fn prune(&mut self, now: DateTime<Utc>, ttl: Duration) -> usize {
        let before = self.notices.len();
        self.notices.retain(|n| now - n.created_at < ttl);
        before - self.notices.len()
    }
}

/// Shared, cloneable notice queue
#[derive(Debug, Clone)]
pub struct NoticeBoard {
    state: Arc<Mutex<BoardState>>,
    ttl: Duration,
}

impl Default for NoticeBoard {
    fn default() -> Self {
        Self::new(Duration::seconds(5))
    }
}

impl NoticeBoard {
    pub fn new(ttl: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(BoardState::default())),
            ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BoardState> {
        // every mutation leaves the queue valid, so poisoning is ignored
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn push(&self, level: NoticeLevel, message: impl Into<String>) -> u64 {
        let message = message.into();
        match level {
            NoticeLevel::Warning => tracing::warn!("{}", message),
            NoticeLevel::Error => tracing::error!("{}", message),
            _ => tracing::debug!("notice: {}", message),
        }

        let now = Utc::now();
        let mut state = self.lock();
        state.prune(now, self.ttl);
        state.next_id += 1;
        let id = state.next_id;
        state.notices.push(Notice {
            id,
            level,
            message,
            created_at: now,
        });
        id
    }

    pub fn info(&self, message: impl Into<String>) -> u64 {
        self.push(NoticeLevel::Info, message)
    }

    pub fn success(&self, message: impl Into<String>) -> u64 {
        self.push(NoticeLevel::Success, message)
    }

    pub fn warning(&self, message: impl Into<String>) -> u64 {
        self.push(NoticeLevel::Warning, message)
    }

    pub fn error(&self, message: impl Into<String>) -> u64 {
        self.push(NoticeLevel::Error, message)
    }

    /// Returns whether a notice with that id was still showing.
    pub fn dismiss(&self, id: u64) -> bool {
        let mut state = self.lock();
        let before = state.notices.len();
        state.notices.retain(|n| n.id != id);
        state.notices.len() != before
    }

    /// Notices still within their display window at `now`, oldest first.
    /// Expired ones are dropped on the way.
    pub fn active_at(&self, now: DateTime<Utc>) -> Vec<Notice> {
        let mut state = self.lock();
        state.prune(now, self.ttl);
        state.notices.clone()
    }

    pub fn active(&self) -> Vec<Notice> {
        self.active_at(Utc::now())
    }

    /// Every notice not yet dismissed or expired, regardless of age.
    pub fn all(&self) -> Vec<Notice> {
        self.lock().notices.clone()
    }

    /// Drop notices older than the display window. Returns how many went.
    pub fn expire(&self, now: DateTime<Utc>) -> usize {
        self.lock().prune(now, self.ttl)
    }

    pub fn clear(&self) {
        self.lock().notices.clear();
    }
}
