use serde::{Deserialize, Serialize};

/// A simulated countdown, ticked by the caller with the frame's `dt`.
///
/// Inactive when `remaining <= 0`. Used for invulnerability windows and any
/// other effect that lasts a fixed amount of simulated time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Countdown {
    pub remaining: f32,
}

impl Countdown {
    pub fn start(&mut self, duration: f32) {
        self.remaining = duration.max(0.0);
    }

    pub fn clear(&mut self) {
        self.remaining = 0.0;
    }

    /// Advance by `dt`. Returns true on the tick the countdown expires.
    pub fn tick(&mut self, dt: f32) -> bool {
        if !self.is_active() {
            return false;
        }
        self.remaining -= dt;
        if self.remaining <= 0.0 {
            self.remaining = 0.0;
            return true;
        }
        false
    }

    pub fn is_active(&self) -> bool {
        self.remaining > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_inactive() {
        let c = Countdown::default();
        assert!(!c.is_active());
    }

    #[test]
    fn expires_after_duration() {
        let mut c = Countdown::default();
        c.start(1.0);
        assert!(c.is_active());
        assert!(!c.tick(0.5));
        assert!(c.is_active());
        assert!(c.tick(0.5));
        assert!(!c.is_active());
        assert_eq!(c.remaining, 0.0);
    }

    #[test]
    fn tick_when_inactive_is_noop() {
        let mut c = Countdown::default();
        assert!(!c.tick(10.0));
        assert_eq!(c.remaining, 0.0);
    }

    #[test]
    fn negative_duration_is_inactive() {
        let mut c = Countdown::default();
        c.start(-3.0);
        assert!(!c.is_active());
    }

    #[test]
    fn clear_stops_countdown() {
        let mut c = Countdown::default();
        c.start(5.0);
        c.clear();
        assert!(!c.is_active());
    }
}
