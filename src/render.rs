//! Render surface abstraction
//!
//! Rendered media lives under two named containers, "local-media" and
//! "remote-media". The room driver is the only caller: it creates one node
//! per attached track and removes that node exactly once on detach.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::service::{TrackHandle, TrackKind};

/// Identifier of one rendered node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(uuid::Uuid);

impl NodeId {
    fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two render containers of the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Container {
    LocalMedia,
    RemoteMedia,
}

impl Container {
    pub fn as_str(&self) -> &'static str {
        match self {
            Container::LocalMedia => "local-media",
            Container::RemoteMedia => "remote-media",
        }
    }
}

impl std::fmt::Display for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Concrete render target
pub trait RenderSurface: Send + Sync {
    /// Create a node rendering `track` under `container`
    fn attach(&self, container: Container, track: &dyn TrackHandle) -> NodeId;

    /// Remove a node; returns false if it was already gone
    fn remove(&self, node: NodeId) -> bool;
}

/// One node of the in-memory surface
#[derive(Debug, Clone)]
pub struct RenderNode {
    pub container: Container,
    pub track_id: String,
    pub kind: TrackKind,
}

/// In-memory render surface
///
/// Stands in for the DOM in the demo binary and the test suite; counts
/// double-removals so tests can assert the exactly-once detach invariant.
#[derive(Default)]
pub struct MemorySurface {
    nodes: Mutex<HashMap<NodeId, RenderNode>>,
    double_removals: Mutex<usize>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current nodes in a container
    pub fn nodes_in(&self, container: Container) -> Vec<RenderNode> {
        self.nodes
            .lock()
            .values()
            .filter(|n| n.container == container)
            .cloned()
            .collect()
    }

    /// Node count in a container
    pub fn count_in(&self, container: Container) -> usize {
        self.nodes
            .lock()
            .values()
            .filter(|n| n.container == container)
            .count()
    }

    /// Total node count
    pub fn count(&self) -> usize {
        self.nodes.lock().len()
    }

    /// Number of remove calls that hit an already-removed node
    pub fn double_removals(&self) -> usize {
        *self.double_removals.lock()
    }
}

impl RenderSurface for MemorySurface {
    fn attach(&self, container: Container, track: &dyn TrackHandle) -> NodeId {
        let id = NodeId::new();
        self.nodes.lock().insert(
            id,
            RenderNode {
                container,
                track_id: track.id().to_string(),
                kind: track.kind(),
            },
        );
        id
    }

    fn remove(&self, node: NodeId) -> bool {
        let removed = self.nodes.lock().remove(&node).is_some();
        if !removed {
            *self.double_removals.lock() += 1;
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::LoopbackTrack;

    #[test]
    fn attach_and_remove() {
        let surface = MemorySurface::new();
        let track = LoopbackTrack::new(TrackKind::Video);
        let node = surface.attach(Container::LocalMedia, track.as_ref());

        assert_eq!(surface.count_in(Container::LocalMedia), 1);
        assert!(surface.remove(node));
        assert_eq!(surface.count(), 0);
        assert_eq!(surface.double_removals(), 0);
    }

    #[test]
    fn removing_twice_is_counted() {
        let surface = MemorySurface::new();
        let track = LoopbackTrack::new(TrackKind::Audio);
        let node = surface.attach(Container::RemoteMedia, track.as_ref());

        assert!(surface.remove(node));
        assert!(!surface.remove(node));
        assert_eq!(surface.double_removals(), 1);
    }
}
