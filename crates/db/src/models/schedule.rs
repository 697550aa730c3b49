use std::collections::BTreeSet;

use chrono::{Days, Months, NaiveDate, NaiveDateTime, NaiveTime};
use rand::{Rng, distributions::Alphanumeric};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::platform::PublishTarget;

const ID_PREFIX: &str = "sch_";
const ID_SUFFIX_LEN: usize = 9;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, TS, PartialEq, Eq)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Recurrence {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
}

impl std::fmt::Display for Recurrence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Recurrence::None => "none",
            Recurrence::Daily => "daily",
            Recurrence::Weekly => "weekly",
            Recurrence::Monthly => "monthly",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for Recurrence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" | "once" => Ok(Recurrence::None),
            "daily" => Ok(Recurrence::Daily),
            "weekly" => Ok(Recurrence::Weekly),
            "monthly" => Ok(Recurrence::Monthly),
            _ => Err(format!("Unknown recurrence: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, TS, PartialEq, Eq)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    #[default]
    Scheduled,
    Published,
}

/// One publish slot for the finished episode
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq, Eq)]
#[ts(export)]
pub struct ScheduledItem {
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub targets: BTreeSet<PublishTarget>,
    #[serde(default)]
    pub recurrence: Recurrence,
    #[serde(default)]
    pub status: ScheduleStatus,
}

impl ScheduledItem {
    /// `sch_` followed by nine lowercase alphanumerics.
    pub fn generate_id() -> String {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(ID_SUFFIX_LEN)
            .map(|b| char::from(b).to_ascii_lowercase())
            .collect();
        format!("{ID_PREFIX}{suffix}")
    }

    pub fn due_at(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }

    /// The first `n` publish times, starting with the item's own.
    /// Non-recurring items yield a single occurrence. Monthly steps that
    /// land past the end of a month clamp to its last day.
    pub fn occurrences(&self, n: usize) -> Vec<NaiveDateTime> {
        if n == 0 {
            return Vec::new();
        }
        if self.recurrence == Recurrence::None {
            return vec![self.due_at()];
        }

        let mut out = Vec::with_capacity(n);
        for step in 0..n as u32 {
            let date = match self.recurrence {
                Recurrence::Daily => self.date.checked_add_days(Days::new(step as u64)),
                Recurrence::Weekly => self.date.checked_add_days(Days::new(step as u64 * 7)),
                Recurrence::Monthly => self.date.checked_add_months(Months::new(step)),
                Recurrence::None => None,
            };
            match date {
                Some(date) => out.push(date.and_time(self.time)),
                None => break,
            }
        }
        out
    }
}
