//! Redraw debouncing
//!
//! Rules:
//! - an update with nothing pending and no hold-off active redraws at once
//! - an update during the hold-off is deferred to the hold-off end
//! - a user selection pushes the scheduled redraw to at least one window
//!   after it
//! - every redraw opens a new hold-off window

use std::time::Duration;
use tokio::time::Instant;

/// Decides when the display may redraw
#[derive(Debug, Clone)]
pub struct RedrawDebouncer {
    window: Duration,
    hold_until: Option<Instant>,
    pending: Option<Instant>,
}

impl RedrawDebouncer {
    /// Create a debouncer with the given window
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            hold_until: None,
            pending: None,
        }
    }

    /// Debounce window
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Content changed; returns `true` when the redraw should happen now
    pub fn on_update(&mut self, now: Instant) -> bool {
        if self.pending.is_some() {
            return false;
        }
        match self.hold_until {
            Some(until) if now < until => {
                self.pending = Some(until);
                false
            }
            _ => true,
        }
    }

    /// The user interacted with the display
    pub fn on_selection(&mut self, now: Instant) {
        let deadline = now + self.window;
        self.pending = Some(self.pending.map_or(deadline, |at| at.max(deadline)));
    }

    /// When the scheduled redraw is due
    pub fn deadline(&self) -> Option<Instant> {
        self.pending
    }

    /// Whether the scheduled redraw is due at `now`
    pub fn is_due(&self, now: Instant) -> bool {
        self.pending.map_or(false, |at| now >= at)
    }

    /// A redraw happened at `now`
    pub fn redrawn(&mut self, now: Instant) {
        self.pending = None;
        self.hold_until = Some(now + self.window);
    }

    /// Forget any scheduled redraw
    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(2);

    #[test]
    fn test_first_update_redraws_immediately() {
        let t0 = Instant::now();
        let mut debouncer = RedrawDebouncer::new(WINDOW);
        assert!(debouncer.on_update(t0));
        debouncer.redrawn(t0);

        assert!(!debouncer.on_update(t0 + Duration::from_millis(500)));
        assert_eq!(debouncer.deadline(), Some(t0 + WINDOW));
        assert!(!debouncer.is_due(t0 + Duration::from_millis(1999)));
        assert!(debouncer.is_due(t0 + WINDOW));
    }

    #[test]
    fn test_updates_during_hold_off_coalesce() {
        let t0 = Instant::now();
        let mut debouncer = RedrawDebouncer::new(WINDOW);
        debouncer.redrawn(t0);

        assert!(!debouncer.on_update(t0 + Duration::from_millis(100)));
        assert!(!debouncer.on_update(t0 + Duration::from_millis(900)));
        assert_eq!(debouncer.deadline(), Some(t0 + WINDOW));
    }

    #[test]
    fn test_update_after_hold_off_redraws() {
        let t0 = Instant::now();
        let mut debouncer = RedrawDebouncer::new(WINDOW);
        debouncer.redrawn(t0);
        assert!(debouncer.on_update(t0 + Duration::from_secs(3)));
        assert_eq!(debouncer.deadline(), None);
    }

    #[test]
    fn test_two_selections_one_redraw() {
        let t0 = Instant::now();
        let mut debouncer = RedrawDebouncer::new(WINDOW);

        debouncer.on_selection(t0);
        debouncer.on_selection(t0 + Duration::from_millis(800));
        assert!(!debouncer.on_update(t0 + Duration::from_millis(900)));

        let due = t0 + Duration::from_millis(800) + WINDOW;
        assert_eq!(debouncer.deadline(), Some(due));
        debouncer.redrawn(due);
        assert_eq!(debouncer.deadline(), None);
    }

    #[test]
    fn test_selection_defers_held_update() {
        let t0 = Instant::now();
        let mut debouncer = RedrawDebouncer::new(WINDOW);
        debouncer.redrawn(t0);

        assert!(!debouncer.on_update(t0 + Duration::from_millis(1900)));
        assert_eq!(debouncer.deadline(), Some(t0 + WINDOW));

        debouncer.on_selection(t0 + Duration::from_millis(1950));
        assert_eq!(debouncer.deadline(), Some(t0 + Duration::from_millis(1950) + WINDOW));
        assert!(!debouncer.is_due(t0 + Duration::from_secs(3)));
    }

    #[test]
    fn test_cancel_drops_pending() {
        let t0 = Instant::now();
        let mut debouncer = RedrawDebouncer::new(WINDOW);
        debouncer.on_selection(t0);
        debouncer.cancel();
        assert!(!debouncer.is_due(t0 + WINDOW * 2));
    }
}
