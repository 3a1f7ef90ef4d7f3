//! UI control state
//!
//! The page's four controls (join, leave, mute, camera switch) follow the
//! session state machine. A snapshot is broadcast on the event bus whenever
//! any of them changes, so the front end renders from state instead of
//! mutating buttons ad hoc.

use serde::{Deserialize, Serialize};

/// Control state for the four page buttons
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiControls {
    /// Join is disabled when no room name is configured or a join is in flight
    pub join_enabled: bool,
    /// Join is hidden while connected
    pub join_visible: bool,
    /// "Join Room" before the first connect, "Rejoin Room" afterwards
    pub join_label: String,
    /// Leave is shown only while connected
    pub leave_visible: bool,
    /// Mute is usable only while connected
    pub mute_enabled: bool,
    /// Current mute state of the local audio tracks
    pub muted: bool,
    /// Camera switch is shown only when more than one camera exists
    pub camera_visible: bool,
}

impl UiControls {
    /// Pre-join state at startup
    pub fn startup(join_enabled: bool) -> Self {
        Self {
            join_enabled,
            join_visible: true,
            join_label: "Join Room".to_string(),
            leave_visible: false,
            mute_enabled: false,
            muted: false,
            camera_visible: false,
        }
    }

    /// Apply the Joined state: hide join, show leave, enable mute
    pub fn mark_joined(&mut self) {
        self.join_visible = false;
        self.join_label = "Rejoin Room".to_string();
        self.leave_visible = true;
        self.mute_enabled = true;
    }

    /// Return to the pre-join state after a disconnect
    ///
    /// The join label stays "Rejoin Room" and camera visibility is
    /// unchanged: both reflect page-level facts, not room membership.
    pub fn reset_after_disconnect(&mut self) {
        self.join_visible = true;
        self.leave_visible = false;
        self.mute_enabled = false;
        self.muted = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disconnect_restores_pre_join_state() {
        let mut controls = UiControls::startup(true);
        controls.camera_visible = true;
        controls.mark_joined();
        controls.muted = true;

        controls.reset_after_disconnect();

        assert!(controls.join_visible);
        assert!(!controls.leave_visible);
        assert!(!controls.mute_enabled);
        assert!(!controls.muted);
        // Page-level facts survive the room
        assert_eq!(controls.join_label, "Rejoin Room");
        assert!(controls.camera_visible);
    }
}
