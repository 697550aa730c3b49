use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Lifecycle of a long-running remote operation such as enhancement
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, PartialEq, Eq)]
#[ts(export)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum OperationProgress {
    #[default]
    Idle,
    InFlight {
        polls: u32,
        max_polls: u32,
    },
    Succeeded,
    Failed {
        reason: String,
    },
}

impl OperationProgress {
    pub fn started(max_polls: u32) -> Self {
        OperationProgress::InFlight {
            polls: 0,
            max_polls,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, OperationProgress::InFlight { .. })
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            OperationProgress::Succeeded | OperationProgress::Failed { .. }
        )
    }

    /// Count one more poll. Only meaningful while in flight.
    pub fn record_poll(&mut self) {
        if let OperationProgress::InFlight { polls, max_polls } = self {
            *polls = (*polls + 1).min(*max_polls);
        }
    }

    /// Share of the poll budget used, for progress bars. Finished states
    /// report 1.0, idle reports 0.0.
    pub fn fraction(&self) -> f64 {
        match self {
            OperationProgress::Idle => 0.0,
            OperationProgress::InFlight { polls, max_polls } if *max_polls > 0 => {
                f64::from(*polls) / f64::from(*max_polls)
            }
            OperationProgress::InFlight { .. } => 0.0,
            OperationProgress::Succeeded | OperationProgress::Failed { .. } => 1.0,
        }
    }
}

impl std::fmt::Display for OperationProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationProgress::Idle => write!(f, "idle"),
            OperationProgress::InFlight { polls, max_polls } => {
                write!(f, "in flight ({}/{})", polls, max_polls)
            }
            OperationProgress::Succeeded => write!(f, "succeeded"),
            OperationProgress::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_counting_saturates() {
        let mut progress = OperationProgress::started(2);
        assert!(progress.is_in_flight());
        progress.record_poll();
        assert_eq!(progress.fraction(), 0.5);
        progress.record_poll();
        progress.record_poll();
        assert_eq!(
            progress,
            OperationProgress::InFlight {
                polls: 2,
                max_polls: 2
            }
        );
    }

    #[test]
    fn test_idle_ignores_polls() {
        let mut progress = OperationProgress::Idle;
        progress.record_poll();
        assert_eq!(progress, OperationProgress::Idle);
        assert!(!progress.is_finished());
        assert!(
            OperationProgress::Failed {
                reason: "x".into()
            }
            .is_finished()
        );
    }
}
