//! Video service boundary
//!
//! The media transport, codec negotiation and room synchronization all live
//! in an external video service. This module defines the trait seam the rest
//! of the crate programs against: a [`VideoService`] that mints local tracks
//! and connects to rooms, a [`RoomHandle`] that exposes room membership and
//! an ordered event stream, and [`TrackHandle`] for individual media tracks.

pub mod loopback;

pub use loopback::{LoopbackRoom, LoopbackService, LoopbackTrack};

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::Result;

/// Media track kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackKind::Audio => write!(f, "audio"),
            TrackKind::Video => write!(f, "video"),
        }
    }
}

/// Media device kind, named after the platform enumeration strings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    #[serde(rename = "audioinput")]
    AudioInput,
    #[serde(rename = "audiooutput")]
    AudioOutput,
    #[serde(rename = "videoinput")]
    VideoInput,
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceKind::AudioInput => write!(f, "audioinput"),
            DeviceKind::AudioOutput => write!(f, "audiooutput"),
            DeviceKind::VideoInput => write!(f, "videoinput"),
        }
    }
}

/// Immutable snapshot of one enumerated media device
///
/// Device lists can change at any time (hot-plugged webcam), so descriptors
/// are re-fetched per query and never cached across calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Platform device identifier
    pub id: String,
    /// Device kind
    pub kind: DeviceKind,
    /// Human-readable label from the platform
    pub label: String,
}

impl DeviceDescriptor {
    pub fn new(id: impl Into<String>, kind: DeviceKind, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            label: label.into(),
        }
    }
}

/// Room-level lifecycle events, delivered in the order the service emits them
#[derive(Clone)]
pub enum RoomEvent {
    /// A remote participant joined; its tracks arrive separately
    ParticipantConnected { identity: String },
    /// A remote participant published a track
    TrackAdded {
        identity: String,
        track: Arc<dyn TrackHandle>,
    },
    /// A remote participant unpublished a track
    TrackRemoved {
        identity: String,
        track_id: String,
        kind: TrackKind,
    },
    /// A remote participant left the room
    ParticipantDisconnected { identity: String },
    /// The local participant left or was dropped by the service
    Disconnected { reason: Option<String> },
}

/// Remote participant snapshot: identity plus its currently published tracks
#[derive(Clone)]
pub struct RemoteParticipant {
    pub identity: String,
    pub tracks: Vec<Arc<dyn TrackHandle>>,
}

/// Options for a room connect call
#[derive(Clone)]
pub struct ConnectOptions {
    /// Room name to join
    pub room_name: String,
    /// Local tracks to publish on join; the service acquires defaults when empty
    pub tracks: Vec<Arc<dyn TrackHandle>>,
}

/// One local or remote media track
///
/// Attach/detach to render targets is not part of the track API: the render
/// driver owns node bookkeeping and talks to the `RenderSurface` directly.
pub trait TrackHandle: Send + Sync {
    /// Stable track identifier
    fn id(&self) -> &str;

    /// Audio or video
    fn kind(&self) -> TrackKind;

    /// Whether the track is currently enabled (unmuted)
    fn is_enabled(&self) -> bool;

    /// Enable or disable the track (mute toggle)
    fn set_enabled(&self, enabled: bool);

    /// Whether `stop` has been called
    fn is_stopped(&self) -> bool;

    /// Release the underlying capture resource
    fn stop(&self);
}

/// Platform media device enumeration
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Query the current device list
    ///
    /// Fails with `AppError::DeviceQuery` when the platform denies
    /// enumeration access.
    async fn enumerate_devices(&self) -> Result<Vec<DeviceDescriptor>>;
}

/// A connected room
#[async_trait]
pub trait RoomHandle: Send + Sync {
    /// Room name
    fn name(&self) -> &str;

    /// Local participant identity as the service sees it
    fn local_identity(&self) -> String;

    /// Currently published local tracks
    async fn local_tracks(&self) -> Vec<Arc<dyn TrackHandle>>;

    /// Snapshot of the room's current remote membership
    async fn remote_participants(&self) -> Vec<RemoteParticipant>;

    /// Publish a local track to the room
    async fn publish_track(&self, track: Arc<dyn TrackHandle>) -> Result<()>;

    /// Unpublish a local track by id; unknown ids are a no-op
    async fn unpublish_track(&self, track_id: &str) -> Result<()>;

    /// Subscribe to the room's event stream
    fn subscribe(&self) -> broadcast::Receiver<RoomEvent>;

    /// Leave the room; emits `RoomEvent::Disconnected`
    async fn disconnect(&self);
}

/// The external video service
#[async_trait]
pub trait VideoService: MediaDevices {
    /// Acquire default audio+video capture tracks
    async fn create_local_tracks(&self) -> Result<Vec<Arc<dyn TrackHandle>>>;

    /// Acquire a video capture track bound to a specific device
    async fn create_local_video_track(&self, device_id: &str) -> Result<Arc<dyn TrackHandle>>;

    /// Connect to a named room using a token from the token endpoint
    async fn connect(&self, token: &str, options: ConnectOptions) -> Result<Arc<dyn RoomHandle>>;
}
