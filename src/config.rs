use std::time::Duration;

/// Tuning for the interactive dashboard session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Period between timer-driven refresh renders.
    pub refresh_interval: Duration,
    /// How long a non-fatal action error stays on screen.
    pub error_display: Duration,
    /// Rows jumped by page-up/page-down. A client-side guess only; the
    /// server clamps the cursor against the real list on the next fetch.
    pub page_step: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(3),
            error_display: Duration::from_secs(2),
            page_step: 20,
        }
    }
}

impl SessionConfig {
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn with_error_display(mut self, duration: Duration) -> Self {
        self.error_display = duration;
        self
    }

    pub fn with_page_step(mut self, step: u32) -> Self {
        self.page_step = step;
        self
    }
}
