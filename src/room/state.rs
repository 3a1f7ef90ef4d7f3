//! Reconciler state

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::render::Container;
use crate::service::TrackKind;

/// Session state machine
///
/// `Idle` → `Joining` on the join action, `Joining` → `Joined` on connect
/// success, back to `Idle` on connect failure or disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Idle,
    Joining,
    Joined,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionPhase::Idle => write!(f, "idle"),
            SessionPhase::Joining => write!(f, "joining"),
            SessionPhase::Joined => write!(f, "joined"),
        }
    }
}

/// Who a rendered track belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Owner {
    Local,
    Remote(String),
}

/// Bookkeeping for one rendered track
#[derive(Debug, Clone)]
pub struct RenderedTrack {
    pub owner: Owner,
    pub container: Container,
    pub kind: TrackKind,
}

/// The reconciler's record of what is currently rendered
///
/// Invariant: a track id appears here exactly while its node exists on the
/// surface, so attaches are deduplicated and detaches happen exactly once.
#[derive(Default)]
pub struct RoomState {
    /// Rendered tracks by track id
    pub rendered: HashMap<String, RenderedTrack>,
    /// Remote identities currently known to be present
    pub participants: HashSet<String>,
}

impl RoomState {
    /// Whether a local video track is already rendered
    pub fn has_local_video(&self) -> bool {
        self.rendered
            .values()
            .any(|r| r.owner == Owner::Local && r.kind == TrackKind::Video)
    }

    /// Rendered track ids belonging to one remote participant
    pub fn rendered_for(&self, identity: &str) -> Vec<String> {
        let mut ids: Vec<String> = self
            .rendered
            .iter()
            .filter(|(_, r)| matches!(&r.owner, Owner::Remote(id) if id == identity))
            .map(|(track_id, _)| track_id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Rendered local track ids
    pub fn rendered_local(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .rendered
            .iter()
            .filter(|(_, r)| r.owner == Owner::Local)
            .map(|(track_id, _)| track_id.clone())
            .collect();
        ids.sort();
        ids
    }
}
