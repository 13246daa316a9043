pub mod analytics;
pub mod geom;
pub mod store;
pub mod timer;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use std::sync::{Arc, Mutex};

    use crate::analytics::{AnalyticsEvent, AnalyticsEventKind, AnalyticsSink};
    use crate::store::{KeyValueStore, StoreError};

    /// Analytics sink that keeps every event in a shared buffer, so a test can
    /// hand the sink to a session and still inspect what was recorded.
    #[derive(Debug, Default, Clone)]
    pub struct RecordingAnalytics {
        events: Arc<Mutex<Vec<AnalyticsEvent>>>,
    }

    impl RecordingAnalytics {
        pub fn new() -> Self {
            Self::default()
        }

        /// Snapshot of all recorded events, oldest first.
        pub fn events(&self) -> Vec<AnalyticsEvent> {
            self.events.lock().map(|e| e.clone()).unwrap_or_default()
        }

        /// Recorded events of one kind.
        pub fn of_kind(&self, kind: AnalyticsEventKind) -> Vec<AnalyticsEvent> {
            self.events()
                .into_iter()
                .filter(|e| e.kind == kind)
                .collect()
        }

        pub fn count(&self, kind: AnalyticsEventKind) -> usize {
            self.of_kind(kind).len()
        }
    }

    impl AnalyticsSink for RecordingAnalytics {
        fn record(&mut self, event: &AnalyticsEvent) {
            if let Ok(mut events) = self.events.lock() {
                events.push(event.clone());
            }
        }
    }

    /// A store whose every read and write fails.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Unavailable("test store always fails".to_string()))
        }

        fn set(&mut self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("test store always fails".to_string()))
        }
    }

    /// Assert two floats are within `eps` of each other.
    pub fn assert_close(actual: f32, expected: f32, eps: f32) {
        assert!(
            (actual - expected).abs() <= eps,
            "expected {expected} (±{eps}), got {actual}"
        );
    }
}
