use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use db::models::{
    draft::ValidationError,
    platform::PublishTarget,
    schedule::{Recurrence, ScheduleStatus, ScheduledItem},
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// What the publish form submits
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ScheduleRequest {
    pub title: String,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub targets: BTreeSet<PublishTarget>,
    #[serde(default)]
    pub recurrence: Recurrence,
}

/// Validate a request and turn it into a scheduled item with a fresh id.
pub fn schedule(request: ScheduleRequest) -> Result<ScheduledItem, ValidationError> {
    let title = request.title.trim();
    let (Some(date), Some(time)) = (request.date, request.time) else {
        return Err(ValidationError::IncompleteSchedule);
    };
    if title.is_empty() || request.targets.is_empty() {
        return Err(ValidationError::IncompleteSchedule);
    }

    Ok(ScheduledItem {
        id: ScheduledItem::generate_id(),
        title: title.to_string(),
        date,
        time,
        targets: request.targets,
        recurrence: request.recurrence,
        status: ScheduleStatus::Scheduled,
    })
}

// Bounds the walk through recurrences that started long ago
const MAX_OCCURRENCE_STEPS: usize = 10_000;

/// First publish time at or after `now`.
pub fn next_occurrence(item: &ScheduledItem, now: NaiveDateTime) -> Option<NaiveDateTime> {
    if item.recurrence == Recurrence::None {
        let due = item.due_at();
        return (due >= now).then_some(due);
    }
    item.occurrences(MAX_OCCURRENCE_STEPS)
        .into_iter()
        .find(|at| *at >= now)
}

/// Scheduled (not yet published) items due within `days` of `now`, soonest
/// first, paired with the occurrence that falls in the window.
pub fn upcoming(
    items: &[ScheduledItem],
    now: NaiveDateTime,
    days: i64,
) -> Vec<(NaiveDateTime, &ScheduledItem)> {
    let horizon = now + Duration::days(days.max(0));
    let mut due: Vec<_> = items
        .iter()
        .filter(|item| item.status == ScheduleStatus::Scheduled)
        .filter_map(|item| next_occurrence(item, now).map(|at| (at, item)))
        .filter(|(at, _)| *at <= horizon)
        .collect();
    due.sort_by_key(|(at, _)| *at);
    due
}

pub fn mark_published(items: &mut [ScheduledItem], id: &str) -> bool {
    match items.iter_mut().find(|item| item.id == id) {
        Some(item) => {
            item.status = ScheduleStatus::Published;
            true
        }
        None => false,
    }
}

pub fn unschedule(items: &mut Vec<ScheduledItem>, id: &str) -> Option<ScheduledItem> {
    let idx = items.iter().position(|item| item.id == id)?;
    Some(items.remove(idx))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ScheduleRequest {
        ScheduleRequest {
            title: "Episode 12 launch".into(),
            date: NaiveDate::from_ymd_opt(2026, 3, 2),
            time: NaiveTime::from_hms_opt(9, 0, 0),
            targets: BTreeSet::from([PublishTarget::Spotify, PublishTarget::Apple]),
            recurrence: Recurrence::None,
        }
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_schedule_requires_every_field() {
        let item = schedule(request()).unwrap();
        assert!(item.id.starts_with("sch_"));
        assert_eq!(item.status, ScheduleStatus::Scheduled);

        let incomplete = [
            ScheduleRequest {
                title: "  ".into(),
                ..request()
            },
            ScheduleRequest {
                date: None,
                ..request()
            },
            ScheduleRequest {
                time: None,
                ..request()
            },
            ScheduleRequest {
                targets: BTreeSet::new(),
                ..request()
            },
        ];
        for req in incomplete {
            let err = schedule(req).unwrap_err();
            assert_eq!(
                err.to_string(),
                "Please complete all fields and select at least one platform"
            );
        }
    }

    #[test]
    fn test_upcoming_filters_and_sorts() {
        let later = schedule(ScheduleRequest {
            date: NaiveDate::from_ymd_opt(2026, 3, 5),
            ..request()
        })
        .unwrap();
        let sooner = schedule(request()).unwrap();
        let far = schedule(ScheduleRequest {
            date: NaiveDate::from_ymd_opt(2026, 6, 1),
            ..request()
        })
        .unwrap();
        let mut published = schedule(request()).unwrap();
        published.status = ScheduleStatus::Published;

        let items = vec![later.clone(), sooner.clone(), far, published];
        let due = upcoming(&items, at(2026, 3, 1, 12), 7);
        let ids: Vec<_> = due.iter().map(|(_, item)| item.id.as_str()).collect();
        assert_eq!(ids, vec![sooner.id.as_str(), later.id.as_str()]);
    }

    #[test]
    fn test_recurring_item_uses_next_occurrence() {
        let weekly = schedule(ScheduleRequest {
            date: NaiveDate::from_ymd_opt(2026, 1, 5),
            recurrence: Recurrence::Weekly,
            ..request()
        })
        .unwrap();
        let next = next_occurrence(&weekly, at(2026, 3, 1, 12)).unwrap();
        assert_eq!(next, at(2026, 3, 2, 9));

        let past = schedule(ScheduleRequest {
            date: NaiveDate::from_ymd_opt(2026, 1, 5),
            ..request()
        })
        .unwrap();
        assert!(next_occurrence(&past, at(2026, 3, 1, 12)).is_none());
    }

    #[test]
    fn test_mark_published_and_unschedule() {
        let mut items = vec![schedule(request()).unwrap()];
        let id = items[0].id.clone();
        assert!(mark_published(&mut items, &id));
        assert!(upcoming(&items, at(2026, 3, 1, 0), 30).is_empty());
        assert!(unschedule(&mut items, &id).is_some());
        assert!(!mark_published(&mut items, &id));
    }
}
