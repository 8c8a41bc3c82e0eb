use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::client::Fetched;

/// Load phase of a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ViewPhase {
    /// Not yet mounted.
    Idle,
    /// A fetch is in flight.
    Loading,
    /// Last fetch succeeded.
    Loaded,
    /// Last fetch failed; data may be stale.
    Errored,
}

/// Per-view data with its load phase.
///
/// Refreshing keeps the previous data until a newer result replaces it, so
/// a view never flickers back to empty while reloading.
#[derive(Debug, Clone, Serialize)]
pub struct ViewState<T> {
    phase: ViewPhase,
    data: Option<T>,
    error: Option<String>,
    last_updated: Option<DateTime<Utc>>,
    loads: u64,
}

impl<T> Default for ViewState<T> {
    fn default() -> Self {
        Self {
            phase: ViewPhase::Idle,
            data: None,
            error: None,
            last_updated: None,
            loads: 0,
        }
    }
}

impl<T> ViewState<T> {
    /// Idle state with no data.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enters Loading, keeping current data and banner.
    pub fn begin_load(&mut self) {
        self.phase = ViewPhase::Loading;
        self.loads += 1;
    }

    /// Stores fresh data and clears the banner.
    pub fn succeed(&mut self, data: T) {
        self.phase = ViewPhase::Loaded;
        self.data = Some(data);
        self.error = None;
        self.last_updated = Some(Utc::now());
    }

    /// Records a failure, keeping stale data.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.phase = ViewPhase::Errored;
        self.error = Some(message.into());
    }

    /// Replaces data without changing phase, banner, or timestamp.
    pub fn set_data(&mut self, data: T) {
        self.data = Some(data);
    }

    /// Applies a degrading fetch. A fallback only replaces data when there was none.
    pub fn apply(&mut self, fetched: Fetched<T>) {
        match fetched.error {
            None => self.succeed(fetched.value),
            Some(err) => {
                if self.data.is_none() {
                    self.data = Some(fetched.value);
                }
                self.fail(err.message());
            }
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> ViewPhase {
        self.phase
    }

    /// Current data, possibly stale.
    #[must_use]
    pub const fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// Banner text of the last failure.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Time of the last successful load.
    #[must_use]
    pub const fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    /// Number of loads started.
    #[must_use]
    pub const fn loads(&self) -> u64 {
        self.loads
    }

    /// Whether a fetch is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.phase == ViewPhase::Loading
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;

    #[test]
    fn refresh_keeps_previous_data() {
        let mut state = ViewState::new();
        state.begin_load();
        state.succeed(vec![1, 2, 3]);
        state.begin_load();
        assert!(state.is_loading());
        assert_eq!(state.data(), Some(&vec![1, 2, 3]));
        state.fail("HTTP 500");
        assert_eq!(state.phase(), ViewPhase::Errored);
        assert_eq!(state.data(), Some(&vec![1, 2, 3]));
        state.succeed(vec![4]);
        assert_eq!(state.error(), None);
        assert_eq!(state.loads(), 2);
    }

    #[test]
    fn degraded_fetch_without_prior_data_shows_fallback() {
        let mut state: ViewState<Vec<u8>> = ViewState::new();
        state.begin_load();
        state.apply(Fetched {
            value: Vec::new(),
            error: Some(ApiError::Network {
                message: "connection refused".into(),
            }),
        });
        assert_eq!(state.phase(), ViewPhase::Errored);
        assert_eq!(state.data(), Some(&Vec::new()));
        assert_eq!(state.error(), Some("network error: connection refused"));
        assert!(state.last_updated().is_none());
    }
}
