use std::collections::BTreeSet;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use skyhop_core::store::KeyValueStore;

pub const KEY_TOTAL_GEMS: &str = "totalGems";
pub const KEY_HIGHEST_LEVEL: &str = "highestLevel";
pub const KEY_TOTAL_SCORE: &str = "totalScore";
pub const KEY_UNLOCKED_LEVELS: &str = "unlockedLevels";

/// Persisted player progress.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveData {
    pub total_gems: u32,
    pub highest_level: u32,
    pub total_score: u64,
    pub unlocked_levels: BTreeSet<u32>,
}

/// Cross-level progress and unlock gating, backed by a key/value store.
///
/// Store failures never reach the caller: reads fall back to defaults and
/// writes are logged and dropped.
pub struct Progression {
    store: Box<dyn KeyValueStore>,
    data: SaveData,
    free_level_threshold: u32,
}

impl Progression {
    /// Read saved progress from `store`.
    pub fn load(store: Box<dyn KeyValueStore>, free_level_threshold: u32) -> Self {
        let data = SaveData {
            total_gems: read_field(store.as_ref(), KEY_TOTAL_GEMS),
            highest_level: read_field(store.as_ref(), KEY_HIGHEST_LEVEL),
            total_score: read_field(store.as_ref(), KEY_TOTAL_SCORE),
            unlocked_levels: read_field(store.as_ref(), KEY_UNLOCKED_LEVELS),
        };
        Self {
            store,
            data,
            free_level_threshold,
        }
    }

    pub fn data(&self) -> &SaveData {
        &self.data
    }

    pub fn free_level_threshold(&self) -> u32 {
        self.free_level_threshold
    }

    /// Levels at or below the free threshold are always playable; later
    /// ones must have been unlocked.
    pub fn is_unlocked(&self, level: u32) -> bool {
        level <= self.free_level_threshold || self.data.unlocked_levels.contains(&level)
    }

    /// Record an unlock granted by the reward flow. Returns false if the level
    /// was already playable, in which case nothing is written.
    pub fn unlock(&mut self, level: u32) -> bool {
        if self.is_unlocked(level) {
            return false;
        }
        self.data.unlocked_levels.insert(level);
        self.write_field(KEY_UNLOCKED_LEVELS, &self.data.unlocked_levels.clone());
        true
    }

    /// Fold a finished level into lifetime totals and save.
    pub fn record_completion(&mut self, level: u32, score: u32, gems: u32) {
        self.data.total_gems = self.data.total_gems.saturating_add(gems);
        self.data.total_score = self.data.total_score.saturating_add(u64::from(score));
        self.data.highest_level = self.data.highest_level.max(level);
        self.save();
    }

    /// Write every field.
    pub fn save(&mut self) {
        let data = self.data.clone();
        self.write_field(KEY_TOTAL_GEMS, &data.total_gems);
        self.write_field(KEY_HIGHEST_LEVEL, &data.highest_level);
        self.write_field(KEY_TOTAL_SCORE, &data.total_score);
        self.write_field(KEY_UNLOCKED_LEVELS, &data.unlocked_levels);
    }

    fn write_field<T: Serialize>(&mut self, key: &str, value: &T) {
        let encoded = match serde_json::to_string(value) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("Failed to encode {key}: {e}");
                return;
            },
        };
        if let Err(e) = self.store.set(key, &encoded) {
            tracing::warn!("Failed to save {key}: {e}");
        }
    }
}

fn read_field<T: DeserializeOwned + Default>(store: &dyn KeyValueStore, key: &str) -> T {
    match store.get(key) {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!("Ignoring malformed saved {key}: {e}");
            T::default()
        }),
        Ok(None) => T::default(),
        Err(e) => {
            tracing::warn!("Failed to load {key}: {e}, using default");
            T::default()
        },
    }
}
