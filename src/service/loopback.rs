//! In-process video service
//!
//! A local implementation of the service traits with no transport behind it.
//! The demo binary and the test suite drive it directly: tests flip the
//! failure switches to exercise error paths and call the `simulate_*` hooks
//! on [`LoopbackRoom`] to emit room events in a chosen order.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, info};

use super::{
    ConnectOptions, DeviceDescriptor, DeviceKind, MediaDevices, RemoteParticipant, RoomEvent,
    RoomHandle, TrackHandle, TrackKind, VideoService,
};
use crate::error::{AppError, Result};

/// Room event channel capacity (ring buffer size)
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Local media track backed by nothing but state flags
pub struct LoopbackTrack {
    id: String,
    kind: TrackKind,
    device_id: Option<String>,
    enabled: AtomicBool,
    stopped: AtomicBool,
}

impl LoopbackTrack {
    pub fn new(kind: TrackKind) -> Arc<Self> {
        Arc::new(Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            device_id: None,
            enabled: AtomicBool::new(true),
            stopped: AtomicBool::new(false),
        })
    }

    /// Track bound to a specific capture device
    pub fn for_device(kind: TrackKind, device_id: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            device_id: Some(device_id.into()),
            enabled: AtomicBool::new(true),
            stopped: AtomicBool::new(false),
        })
    }

    /// Capture device this track was created from, if any
    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }
}

impl TrackHandle for LoopbackTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

/// In-process room
///
/// Remote membership only changes through the `simulate_*` hooks, which emit
/// the corresponding [`RoomEvent`] on the room's broadcast channel.
pub struct LoopbackRoom {
    name: String,
    local_identity: String,
    local_tracks: RwLock<Vec<Arc<dyn TrackHandle>>>,
    remote: RwLock<Vec<(String, Vec<Arc<dyn TrackHandle>>)>>,
    events_tx: broadcast::Sender<RoomEvent>,
    connected: AtomicBool,
}

impl LoopbackRoom {
    fn new(name: String, local_identity: String, tracks: Vec<Arc<dyn TrackHandle>>) -> Arc<Self> {
        let (events_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            name,
            local_identity,
            local_tracks: RwLock::new(tracks),
            remote: RwLock::new(Vec::new()),
            events_tx,
            connected: AtomicBool::new(true),
        })
    }

    fn emit(&self, event: RoomEvent) {
        // No subscribers is fine: events are fire-and-forget
        let _ = self.events_tx.send(event);
    }

    /// A remote participant joins with no tracks yet
    pub fn simulate_participant_connected(&self, identity: impl Into<String>) {
        let identity = identity.into();
        self.remote.write().push((identity.clone(), Vec::new()));
        self.emit(RoomEvent::ParticipantConnected { identity });
    }

    /// A remote participant publishes a track
    pub fn simulate_track_added(
        &self,
        identity: impl Into<String>,
        kind: TrackKind,
    ) -> Arc<dyn TrackHandle> {
        let identity = identity.into();
        let track: Arc<dyn TrackHandle> = LoopbackTrack::new(kind);
        {
            let mut remote = self.remote.write();
            match remote.iter_mut().find(|(id, _)| *id == identity) {
                Some((_, tracks)) => tracks.push(track.clone()),
                None => remote.push((identity.clone(), vec![track.clone()])),
            }
        }
        self.emit(RoomEvent::TrackAdded {
            identity,
            track: track.clone(),
        });
        track
    }

    /// A remote participant unpublishes a track
    pub fn simulate_track_removed(&self, identity: impl Into<String>, track_id: &str) {
        let identity = identity.into();
        let removed = {
            let mut remote = self.remote.write();
            remote
                .iter_mut()
                .find(|(id, _)| *id == identity)
                .and_then(|(_, tracks)| {
                    let pos = tracks.iter().position(|t| t.id() == track_id)?;
                    Some(tracks.remove(pos))
                })
        };
        if let Some(track) = removed {
            self.emit(RoomEvent::TrackRemoved {
                identity,
                track_id: track.id().to_string(),
                kind: track.kind(),
            });
        }
    }

    /// A remote participant leaves the room
    pub fn simulate_participant_disconnected(&self, identity: impl Into<String>) {
        let identity = identity.into();
        self.remote.write().retain(|(id, _)| *id != identity);
        self.emit(RoomEvent::ParticipantDisconnected { identity });
    }

    /// Drop the local participant from the service side
    pub fn simulate_service_disconnect(&self, reason: impl Into<String>) {
        if self.connected.swap(false, Ordering::SeqCst) {
            self.emit(RoomEvent::Disconnected {
                reason: Some(reason.into()),
            });
        }
    }

    /// Whether the room is still connected
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Currently published local video tracks
    pub fn published_video_tracks(&self) -> Vec<Arc<dyn TrackHandle>> {
        self.local_tracks
            .read()
            .iter()
            .filter(|t| t.kind() == TrackKind::Video)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl RoomHandle for LoopbackRoom {
    fn name(&self) -> &str {
        &self.name
    }

    fn local_identity(&self) -> String {
        self.local_identity.clone()
    }

    async fn local_tracks(&self) -> Vec<Arc<dyn TrackHandle>> {
        self.local_tracks.read().clone()
    }

    async fn remote_participants(&self) -> Vec<RemoteParticipant> {
        self.remote
            .read()
            .iter()
            .map(|(identity, tracks)| RemoteParticipant {
                identity: identity.clone(),
                tracks: tracks.clone(),
            })
            .collect()
    }

    async fn publish_track(&self, track: Arc<dyn TrackHandle>) -> Result<()> {
        let mut local = self.local_tracks.write();
        if !local.iter().any(|t| t.id() == track.id()) {
            debug!(track = %track.id(), kind = %track.kind(), "track published");
            local.push(track);
        }
        Ok(())
    }

    async fn unpublish_track(&self, track_id: &str) -> Result<()> {
        self.local_tracks.write().retain(|t| t.id() != track_id);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.events_tx.subscribe()
    }

    async fn disconnect(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            info!(room = %self.name, "leaving room");
            self.emit(RoomEvent::Disconnected { reason: None });
        }
    }
}

/// In-process video service with failure injection
pub struct LoopbackService {
    devices: RwLock<Vec<DeviceDescriptor>>,
    deny_enumeration: AtomicBool,
    deny_media: AtomicBool,
    fail_connect: AtomicBool,
    acquisitions: AtomicUsize,
    last_room: RwLock<Option<Arc<LoopbackRoom>>>,
}

impl LoopbackService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            devices: RwLock::new(Vec::new()),
            deny_enumeration: AtomicBool::new(false),
            deny_media: AtomicBool::new(false),
            fail_connect: AtomicBool::new(false),
            acquisitions: AtomicUsize::new(0),
            last_room: RwLock::new(None),
        })
    }

    pub fn with_devices(devices: Vec<DeviceDescriptor>) -> Arc<Self> {
        let service = Self::new();
        *service.devices.write() = devices;
        service
    }

    /// Replace the enumerated device list (hot-plug simulation)
    pub fn set_devices(&self, devices: Vec<DeviceDescriptor>) {
        *self.devices.write() = devices;
    }

    /// Make `enumerate_devices` fail as if the platform denied access
    pub fn deny_enumeration(&self, deny: bool) {
        self.deny_enumeration.store(deny, Ordering::SeqCst);
    }

    /// Make track acquisition fail as if camera/microphone were denied
    pub fn deny_media(&self, deny: bool) {
        self.deny_media.store(deny, Ordering::SeqCst);
    }

    /// Make the next connect call fail
    pub fn fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    /// Number of `create_local_tracks` calls that reached the hardware
    pub fn acquisition_count(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }

    /// The most recently connected room, if any
    pub fn last_room(&self) -> Option<Arc<LoopbackRoom>> {
        self.last_room.read().clone()
    }

    fn has_video_device(&self, device_id: &str) -> bool {
        self.devices
            .read()
            .iter()
            .any(|d| d.kind == DeviceKind::VideoInput && d.id == device_id)
    }
}

#[async_trait]
impl MediaDevices for LoopbackService {
    async fn enumerate_devices(&self) -> Result<Vec<DeviceDescriptor>> {
        if self.deny_enumeration.load(Ordering::SeqCst) {
            return Err(AppError::DeviceQuery(
                "device enumeration denied".to_string(),
            ));
        }
        Ok(self.devices.read().clone())
    }
}

#[async_trait]
impl VideoService for LoopbackService {
    async fn create_local_tracks(&self) -> Result<Vec<Arc<dyn TrackHandle>>> {
        if self.deny_media.load(Ordering::SeqCst) {
            return Err(AppError::MediaAcquisition(
                "camera/microphone access denied".to_string(),
            ));
        }
        self.acquisitions.fetch_add(1, Ordering::SeqCst);
        Ok(vec![
            LoopbackTrack::new(TrackKind::Audio),
            LoopbackTrack::new(TrackKind::Video),
        ])
    }

    async fn create_local_video_track(&self, device_id: &str) -> Result<Arc<dyn TrackHandle>> {
        if self.deny_media.load(Ordering::SeqCst) {
            return Err(AppError::MediaAcquisition(
                "camera access denied".to_string(),
            ));
        }
        if !self.has_video_device(device_id) {
            return Err(AppError::MediaAcquisition(format!(
                "no such video device: {device_id}"
            )));
        }
        Ok(LoopbackTrack::for_device(TrackKind::Video, device_id))
    }

    async fn connect(&self, _token: &str, options: ConnectOptions) -> Result<Arc<dyn RoomHandle>> {
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(AppError::RoomConnect(
                "service rejected the connect call".to_string(),
            ));
        }
        // The real service acquires default tracks when none are supplied
        let tracks = if options.tracks.is_empty() {
            vec![
                LoopbackTrack::new(TrackKind::Audio) as Arc<dyn TrackHandle>,
                LoopbackTrack::new(TrackKind::Video) as Arc<dyn TrackHandle>,
            ]
        } else {
            options.tracks
        };
        let room = LoopbackRoom::new(options.room_name, "local".to_string(), tracks);
        info!(room = %room.name(), "connected to room");
        *self.last_room.write() = Some(room.clone());
        Ok(room)
    }
}
