//! Load state for a fetched screen.
//!
//! The first fetch goes `Idle -> Loading -> Loaded`; later fetches go
//! `Loaded -> Refreshing -> Loaded` so the previous data stays on screen. A
//! failed fetch falls back to the state it started from.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Loaded,
    Refreshing,
}

impl LoadState {
    /// State entered when a fetch starts. `None` while one is in flight.
    pub fn begin(self) -> Option<LoadState> {
        match self {
            LoadState::Idle => Some(LoadState::Loading),
            LoadState::Loaded => Some(LoadState::Refreshing),
            LoadState::Loading | LoadState::Refreshing => None,
        }
    }

    /// Settled state after a fetch ends.
    pub fn finish(self, succeeded: bool) -> LoadState {
        match (self, succeeded) {
            (LoadState::Loading | LoadState::Refreshing, true) => LoadState::Loaded,
            (LoadState::Loading, false) => LoadState::Idle,
            (LoadState::Refreshing, false) => LoadState::Loaded,
            (settled, _) => settled,
        }
    }

    pub fn is_busy(self) -> bool {
        matches!(self, LoadState::Loading | LoadState::Refreshing)
    }

    /// Only the very first load blocks the screen.
    pub fn shows_spinner(self) -> bool {
        self == LoadState::Loading
    }
}

/// Data for one screen with its load state and last error.
#[derive(Debug, Clone)]
pub struct Resource<T> {
    state: LoadState,
    data: Option<T>,
    error: Option<String>,
}

impl<T> Default for Resource<T> {
    fn default() -> Self {
        Self {
            state: LoadState::Idle,
            data: None,
            error: None,
        }
    }
}

impl<T> Resource<T> {
    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Marks a fetch as started. Returns false when one is already running.
    pub fn start(&mut self) -> bool {
        match self.state.begin() {
            Some(next) => {
                self.state = next;
                true
            }
            None => false,
        }
    }

    /// Records a fetch outcome. Failures keep whatever data was shown.
    pub fn complete<E: std::fmt::Display>(&mut self, result: Result<T, E>) {
        match result {
            Ok(data) => {
                self.state = self.state.finish(true);
                self.data = Some(data);
                self.error = None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "fetch failed");
                self.state = self.state.finish(false);
                self.error = Some(e.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_load_then_refresh() {
        let s = LoadState::Idle;
        let s = s.begin().unwrap();
        assert_eq!(s, LoadState::Loading);
        assert!(s.shows_spinner());

        let s = s.finish(true);
        assert_eq!(s, LoadState::Loaded);

        let s = s.begin().unwrap();
        assert_eq!(s, LoadState::Refreshing);
        assert!(!s.shows_spinner());
        assert!(s.is_busy());
        assert_eq!(s.finish(true), LoadState::Loaded);
    }

    #[test]
    fn failures_return_to_previous_settled_state() {
        assert_eq!(LoadState::Loading.finish(false), LoadState::Idle);
        assert_eq!(LoadState::Refreshing.finish(false), LoadState::Loaded);
    }

    #[test]
    fn no_second_fetch_while_busy() {
        assert_eq!(LoadState::Loading.begin(), None);
        assert_eq!(LoadState::Refreshing.begin(), None);
    }

    #[test]
    fn resource_keeps_data_across_failed_refresh() {
        let mut projects: Resource<Vec<&str>> = Resource::default();
        assert!(projects.start());
        assert!(!projects.start());
        projects.complete::<String>(Ok(vec!["Residencial Aurora"]));
        assert_eq!(projects.state(), LoadState::Loaded);

        assert!(projects.start());
        projects.complete(Err("500: Database error"));
        assert_eq!(projects.state(), LoadState::Loaded);
        assert_eq!(projects.data().map(Vec::len), Some(1));
        assert_eq!(projects.error(), Some("500: Database error"));
    }
}
