//! Session event types
//!
//! Defines the events broadcast through the event bus. Serialized with
//! `serde(tag = "event", content = "data")`, producing JSON like:
//!
//! ```json
//! {"event": "activity", "data": {"message": "Joined as 'alice'", ...}}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::controls::UiControls;
use crate::room::SessionPhase;

/// Session event enumeration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Human-readable activity log entry
    Activity {
        message: String,
        timestamp: DateTime<Utc>,
    },
    /// Session state machine transition
    PhaseChanged { phase: SessionPhase },
    /// UI control state snapshot
    ControlsChanged { controls: UiControls },
}

impl SessionEvent {
    /// New activity entry stamped with the current time
    pub fn activity(message: impl Into<String>) -> Self {
        SessionEvent::Activity {
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}
