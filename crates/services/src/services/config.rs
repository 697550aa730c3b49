use std::time::Duration;

/// Slot key used when nothing else is configured
pub const DEFAULT_SLOT_KEY: &str = "current_project";
/// The clip timeline assumes a five minute episode unless told otherwise
pub const DEFAULT_TIMELINE_SECONDS: f64 = 300.0;

/// Runtime configuration for the workbench engine
#[derive(Debug, Clone)]
pub struct WorkbenchConfig {
    /// Base URL of the episode API (`GET /episode/{id}`)
    pub api_url: Option<String>,
    /// Base URL of the remote document store
    pub docs_url: Option<String>,
    pub api_key: Option<String>,
    /// Key of the local slot holding the active draft
    pub slot_key: String,
    pub enhance_poll_interval: Duration,
    pub enhance_max_polls: u32,
    pub timeline_seconds: f64,
}

impl Default for WorkbenchConfig {
    fn default() -> Self {
        Self {
            api_url: non_empty_env("PODFLOW_API_URL"),
            docs_url: non_empty_env("PODFLOW_DOCS_URL"),
            api_key: non_empty_env("PODFLOW_API_KEY"),
            slot_key: non_empty_env("PODFLOW_SLOT_KEY")
                .unwrap_or_else(|| DEFAULT_SLOT_KEY.to_string()),
            enhance_poll_interval: Duration::from_millis(
                std::env::var("PODFLOW_ENHANCE_POLL_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(2000),
            ),
            enhance_max_polls: std::env::var("PODFLOW_ENHANCE_MAX_POLLS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            timeline_seconds: std::env::var("PODFLOW_TIMELINE_SECONDS")
                .ok()
                .and_then(|v| v.parse::<f64>().ok())
                .filter(|v| v.is_finite() && *v > 0.0)
                .unwrap_or(DEFAULT_TIMELINE_SECONDS),
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl WorkbenchConfig {
    /// Fixed values with no remote endpoints, independent of the environment.
    pub fn offline() -> Self {
        Self {
            api_url: None,
            docs_url: None,
            api_key: None,
            slot_key: DEFAULT_SLOT_KEY.to_string(),
            enhance_poll_interval: Duration::from_millis(2000),
            enhance_max_polls: 30,
            timeline_seconds: DEFAULT_TIMELINE_SECONDS,
        }
    }

    pub fn with_slot_key(mut self, slot_key: impl Into<String>) -> Self {
        self.slot_key = slot_key.into();
        self
    }

    pub fn with_polling(mut self, interval: Duration, max_polls: u32) -> Self {
        self.enhance_poll_interval = interval;
        self.enhance_max_polls = max_polls;
        self
    }
}
