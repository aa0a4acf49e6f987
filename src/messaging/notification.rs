// Change notifications - what the timeline tells its observers after an edit

use std::time::{SystemTime, UNIX_EPOCH};

/// A single mutation of the timeline, described by position
///
/// Indices refer to the state *after* the change (except for
/// `SequencerRemoved`, which carries the index the track had).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineChange {
    BlockAdded { track: usize, bar: usize },
    BlockRemoved { track: usize, bar: usize },
    SequencerAdded { index: usize },
    SequencerRemoved { index: usize },
    SequencerMoved { from: usize, to: usize },
    SequencerUpdated { index: usize },
    SequencerRescheduled { index: usize },
    LengthChanged { old: usize, new: usize },
    SequencerLoopChanged { enabled: bool },
}

impl TimelineChange {
    /// Whether the track layout (count or order) changed, so index-based
    /// selections held by observers must be re-derived
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            TimelineChange::SequencerAdded { .. }
                | TimelineChange::SequencerRemoved { .. }
                | TimelineChange::SequencerMoved { .. }
        )
    }
}

/// Change notification with timestamp
#[derive(Debug, Clone)]
pub struct Notification {
    pub change: TimelineChange,
    pub timestamp: u64, // Unix timestamp in milliseconds
}

impl Notification {
    /// Creates a notification stamped with the current time
    pub fn new(change: TimelineChange) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        Self { change, timestamp }
    }

    /// Check if the notification is newer than `max_age_ms`
    pub fn is_recent(&self, max_age_ms: u64) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        now.saturating_sub(self.timestamp) < max_age_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_creation() {
        let notif = Notification::new(TimelineChange::BlockAdded { track: 0, bar: 2 });

        assert_eq!(notif.change, TimelineChange::BlockAdded { track: 0, bar: 2 });
        assert!(notif.timestamp > 0);
        assert!(notif.is_recent(10_000));
    }

    #[test]
    fn test_structural_changes() {
        assert!(TimelineChange::SequencerRemoved { index: 1 }.is_structural());
        assert!(TimelineChange::SequencerMoved { from: 1, to: 0 }.is_structural());
        assert!(!TimelineChange::BlockRemoved { track: 0, bar: 0 }.is_structural());
        assert!(!TimelineChange::LengthChanged { old: 4, new: 6 }.is_structural());
    }
}
