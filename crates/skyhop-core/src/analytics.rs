use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Analytics event names emitted by the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyticsEventKind {
    LevelStart,
    GemCollected,
    CheckpointActivated,
    PlayerDeath,
    LevelComplete,
    LevelFail,
    RewardedUnlockOffered,
    RewardedUnlockGranted,
    RewardedUnlockDeclined,
}

impl AnalyticsEventKind {
    /// Wire name of the event, identical to its serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LevelStart => "level_start",
            Self::GemCollected => "gem_collected",
            Self::CheckpointActivated => "checkpoint_activated",
            Self::PlayerDeath => "player_death",
            Self::LevelComplete => "level_complete",
            Self::LevelFail => "level_fail",
            Self::RewardedUnlockOffered => "rewarded_unlock_offered",
            Self::RewardedUnlockGranted => "rewarded_unlock_granted",
            Self::RewardedUnlockDeclined => "rewarded_unlock_declined",
        }
    }
}

/// A structured analytics event: a name plus key/value parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub kind: AnalyticsEventKind,
    #[serde(default)]
    pub params: BTreeMap<String, serde_json::Value>,
}

impl AnalyticsEvent {
    pub fn new(kind: AnalyticsEventKind) -> Self {
        Self {
            kind,
            params: BTreeMap::new(),
        }
    }

    /// Builder-style parameter insertion.
    pub fn with(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    pub fn name(&self) -> &'static str {
        self.kind.as_str()
    }

    pub fn param(&self, key: &str) -> Option<&serde_json::Value> {
        self.params.get(key)
    }
}

/// Fire-and-forget destination for analytics events.
///
/// Implementations must not block and must swallow their own failures; the
/// simulation never retries or buffers a send.
pub trait AnalyticsSink: Send {
    fn record(&mut self, event: &AnalyticsEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAnalytics;

impl AnalyticsSink for NullAnalytics {
    fn record(&mut self, _event: &AnalyticsEvent) {}
}

/// Forwards events to the `tracing` subscriber at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAnalytics;

impl AnalyticsSink for TracingAnalytics {
    fn record(&mut self, event: &AnalyticsEvent) {
        let params = serde_json::to_string(&event.params).unwrap_or_default();
        tracing::info!(target: "skyhop::analytics", event = event.name(), %params);
    }
}
