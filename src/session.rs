//! Session context and manager
//!
//! One [`SessionManager`] per page. It owns the explicit session context
//! (no ambient globals), drives the join/leave state machine, the track
//! lifecycle operations, and the per-room event pump that feeds the
//! reconciler.

use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use crate::controls::UiControls;
use crate::devices;
use crate::error::Result;
use crate::events::{EventBus, SessionEvent};
use crate::room::{reduce, RoomDriver, RoomState, SessionPhase, Update};
use crate::render::RenderSurface;
use crate::service::{
    ConnectOptions, RoomEvent, RoomHandle, TrackHandle, TrackKind, VideoService,
};
use crate::token::TokenProvider;

/// The session context
///
/// Created empty at startup, populated on join, cleared on disconnect.
pub struct Session {
    /// Owned exclusively while connected
    pub active_room: Option<Arc<dyn RoomHandle>>,
    /// Local tracks owned until stopped
    pub preview_tracks: Vec<Arc<dyn TrackHandle>>,
    /// Camera ids from the last device refresh
    pub available_video_devices: Vec<String>,
    /// Currently selected camera
    pub selected_video_device: Option<String>,
    /// Display name assigned by the token service
    pub identity: Option<String>,
    /// State machine position
    pub phase: SessionPhase,
}

impl Session {
    fn new() -> Self {
        Self {
            active_room: None,
            preview_tracks: Vec::new(),
            available_video_devices: Vec::new(),
            selected_video_device: None,
            identity: None,
            phase: SessionPhase::Idle,
        }
    }

    /// Clear room-scoped state after a disconnect
    ///
    /// Device knowledge survives: the camera list and selection describe the
    /// machine, not the room.
    pub fn reset(&mut self) {
        self.active_room = None;
        self.preview_tracks.clear();
        self.identity = None;
        self.phase = SessionPhase::Idle;
    }
}

/// Session manager
pub struct SessionManager {
    service: Arc<dyn VideoService>,
    tokens: Arc<dyn TokenProvider>,
    events: Arc<EventBus>,
    session: Arc<RwLock<Session>>,
    controls: Arc<RwLock<UiControls>>,
    state: Arc<RwLock<RoomState>>,
    driver: Arc<RoomDriver>,
    room_name: Option<String>,
}

impl SessionManager {
    /// Wire up a manager for one page
    ///
    /// `room_name` comes from the page URL's `room` parameter; `None` keeps
    /// the join control disabled.
    pub fn new(
        service: Arc<dyn VideoService>,
        tokens: Arc<dyn TokenProvider>,
        surface: Arc<dyn RenderSurface>,
        events: Arc<EventBus>,
        room_name: Option<String>,
    ) -> Arc<Self> {
        let session = Arc::new(RwLock::new(Session::new()));
        let controls = Arc::new(RwLock::new(UiControls::startup(room_name.is_some())));
        let driver = Arc::new(RoomDriver::new(
            surface,
            session.clone(),
            controls.clone(),
            events.clone(),
        ));
        if room_name.is_none() {
            warn!("no room name configured; join stays disabled");
            events.publish(SessionEvent::activity(
                "No room name specified in URL! Add \"?room=<room-name>\" to the URL",
            ));
        }
        Arc::new(Self {
            service,
            tokens,
            events,
            session,
            controls,
            state: Arc::new(RwLock::new(RoomState::default())),
            driver,
            room_name,
        })
    }

    /// The event bus carrying activity, phase and control updates
    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Current state machine position
    pub async fn phase(&self) -> SessionPhase {
        self.session.read().await.phase
    }

    /// Identity assigned by the token service, while joined
    pub async fn identity(&self) -> Option<String> {
        self.session.read().await.identity.clone()
    }

    /// Snapshot of the UI control state
    pub async fn controls(&self) -> UiControls {
        self.controls.read().await.clone()
    }

    /// Camera ids from the last device refresh
    pub async fn available_cameras(&self) -> Vec<String> {
        self.session.read().await.available_video_devices.clone()
    }

    /// Currently selected camera
    pub async fn selected_camera(&self) -> Option<String> {
        self.session.read().await.selected_video_device.clone()
    }

    fn activity(&self, message: impl Into<String>) {
        let message = message.into();
        info!("{message}");
        self.events.publish(SessionEvent::activity(message));
    }

    async fn publish_controls(&self) {
        let controls = self.controls.read().await.clone();
        self.events
            .publish(SessionEvent::ControlsChanged { controls });
    }

    /// Re-query the camera list and update the selection state
    ///
    /// The camera switch control is only shown when more than one camera
    /// exists.
    pub async fn refresh_video_devices(&self) -> Result<Vec<String>> {
        let selection = match devices::list_devices_by_kind(self.service.as_ref()).await {
            Ok(selection) => selection,
            Err(e) => {
                self.activity("Unable to list media devices");
                return Err(e);
            }
        };
        let ids = selection.video_input_ids();
        {
            let mut session = self.session.write().await;
            session.available_video_devices = ids.clone();
            let selected_still_present = session
                .selected_video_device
                .as_ref()
                .map(|id| ids.contains(id))
                .unwrap_or(false);
            if !selected_still_present {
                session.selected_video_device = ids.first().cloned();
            }
        }
        {
            let mut controls = self.controls.write().await;
            controls.camera_visible = ids.len() > 1;
        }
        self.publish_controls().await;
        Ok(ids)
    }

    /// Acquire and render the local preview tracks
    ///
    /// Idempotent: if preview tracks already exist they are returned
    /// unchanged, so repeated clicks never double-lock the camera. On denial
    /// the session is left unmodified.
    pub async fn preview(&self) -> Result<Vec<Arc<dyn TrackHandle>>> {
        // The write lock is held across acquisition so a concurrent call
        // cannot slip past the idempotence check
        let tracks = {
            let mut session = self.session.write().await;
            if !session.preview_tracks.is_empty() {
                debug!("preview tracks already acquired");
                return Ok(session.preview_tracks.clone());
            }
            let tracks = match self.service.create_local_tracks().await {
                Ok(tracks) => tracks,
                Err(e) => {
                    self.activity("Unable to access Camera and Microphone");
                    return Err(e);
                }
            };
            session.preview_tracks = tracks.clone();
            tracks
        };
        let commands = {
            let mut state = self.state.write().await;
            reduce(
                &mut state,
                Update::PreviewReady {
                    tracks: tracks.clone(),
                },
            )
        };
        self.driver.execute(commands).await;
        Ok(tracks)
    }

    /// Join the configured room
    ///
    /// Re-entrant requests while joining or joined are ignored and logged.
    /// Any failure returns the session to `Idle` with the join control
    /// re-enabled.
    pub async fn join(&self) -> Result<()> {
        let Some(room_name) = self.room_name.clone() else {
            self.activity("Cannot join: no room name configured");
            return Ok(());
        };
        {
            let mut session = self.session.write().await;
            if session.phase != SessionPhase::Idle {
                self.activity(format!(
                    "Join ignored: session is already {}",
                    session.phase
                ));
                return Ok(());
            }
            session.phase = SessionPhase::Joining;
        }
        self.events.publish(SessionEvent::PhaseChanged {
            phase: SessionPhase::Joining,
        });
        {
            let mut controls = self.controls.write().await;
            controls.join_enabled = false;
        }
        self.publish_controls().await;
        self.activity(format!("Joining room '{room_name}'..."));

        let grant = match self.tokens.fetch_token().await {
            Ok(grant) => grant,
            Err(e) => {
                self.fail_join(format!("Could not fetch token: {e}")).await;
                return Err(e);
            }
        };

        let tracks = self.session.read().await.preview_tracks.clone();
        let options = ConnectOptions {
            room_name: room_name.clone(),
            tracks,
        };
        let room = match self.service.connect(&grant.token, options).await {
            Ok(room) => room,
            Err(e) => {
                self.fail_join(format!("Could not connect to room: {e}"))
                    .await;
                return Err(e);
            }
        };

        {
            let mut session = self.session.write().await;
            session.active_room = Some(room.clone());
            session.identity = Some(grant.identity.clone());
            session.phase = SessionPhase::Joined;
        }
        self.events.publish(SessionEvent::PhaseChanged {
            phase: SessionPhase::Joined,
        });
        {
            let mut controls = self.controls.write().await;
            controls.mark_joined();
            controls.join_enabled = true;
        }
        self.publish_controls().await;
        self.activity(format!("Joined as '{}'", grant.identity));

        // Subscribe before reading the snapshot: an event that races the
        // snapshot is deduplicated by the reducer, one that follows it is
        // picked up by the pump
        let events_rx = room.subscribe();
        let local = room.local_tracks().await;
        let remote = room.remote_participants().await;
        let commands = {
            let mut state = self.state.write().await;
            reduce(&mut state, Update::Joined { local, remote })
        };
        self.driver.execute(commands).await;
        self.spawn_event_pump(events_rx);
        Ok(())
    }

    async fn fail_join(&self, message: String) {
        warn!("{message}");
        self.events.publish(SessionEvent::activity(message));
        {
            let mut session = self.session.write().await;
            session.phase = SessionPhase::Idle;
        }
        {
            let mut controls = self.controls.write().await;
            controls.join_enabled = true;
        }
        self.publish_controls().await;
        self.events.publish(SessionEvent::PhaseChanged {
            phase: SessionPhase::Idle,
        });
    }

    /// Per-room event pump
    ///
    /// Processes room events strictly in emission order; exits once the
    /// disconnect teardown has fully cleared the session, so a new join
    /// never observes half-cleared state.
    fn spawn_event_pump(&self, mut events_rx: broadcast::Receiver<RoomEvent>) {
        let state = self.state.clone();
        let driver = self.driver.clone();
        tokio::spawn(async move {
            loop {
                match events_rx.recv().await {
                    Ok(event) => {
                        let disconnected = matches!(event, RoomEvent::Disconnected { .. });
                        let commands = {
                            let mut state = state.write().await;
                            reduce(&mut state, Update::Room(event))
                        };
                        driver.execute(commands).await;
                        if disconnected {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "room event stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            debug!("room event pump stopped");
        });
    }

    /// Leave the room if joined
    ///
    /// Teardown itself happens in the event pump when the service's
    /// `Disconnected` event arrives.
    pub async fn leave(&self) {
        let room = self.session.read().await.active_room.clone();
        match room {
            Some(room) => {
                self.activity("Leaving room...");
                room.disconnect().await;
            }
            None => debug!("leave with no active room"),
        }
    }

    /// Toggle the local audio tracks (microphone mute)
    pub async fn toggle_mute(&self) {
        let room = self.session.read().await.active_room.clone();
        let Some(room) = room else {
            debug!("mute toggle with no active room");
            return;
        };
        let muted = {
            let mut controls = self.controls.write().await;
            controls.muted = !controls.muted;
            controls.muted
        };
        for track in room.local_tracks().await {
            if track.kind() == TrackKind::Audio {
                track.set_enabled(!muted);
            }
        }
        debug!(muted, "microphone toggled");
        self.publish_controls().await;
    }

    /// Toggle between the first two cameras
    ///
    /// Binary toggle, not general selection; see
    /// [`devices::select_next_video_device`]. For arbitrary cameras use
    /// [`set_camera`](Self::set_camera).
    pub async fn switch_camera(&self) -> Result<()> {
        let (current, available) = {
            let session = self.session.read().await;
            (
                session.selected_video_device.clone(),
                session.available_video_devices.clone(),
            )
        };
        if available.len() < 2 {
            debug!("camera switch with fewer than two cameras");
            return Ok(());
        }
        let current = current.unwrap_or_else(|| available[0].clone());
        match devices::select_next_video_device(&current, &available) {
            Some(next) => {
                let next = next.to_string();
                self.set_camera(&next).await
            }
            None => Ok(()),
        }
    }

    /// Select a camera by id and make it the published video track
    ///
    /// While joined this replaces the published track atomically: the new
    /// track is acquired and published before any old one is retired, so
    /// there is never a window with zero published video tracks, and at most
    /// one remains afterwards. Without a room only the selection is
    /// recorded; it takes effect on the next publish.
    pub async fn set_camera(&self, device_id: &str) -> Result<()> {
        let room = self.session.read().await.active_room.clone();
        match room {
            Some(room) => self.set_active_video_track(&room, device_id).await,
            None => {
                debug!(device = device_id, "camera selected before join");
                self.session.write().await.selected_video_device = Some(device_id.to_string());
                Ok(())
            }
        }
    }

    async fn set_active_video_track(
        &self,
        room: &Arc<dyn RoomHandle>,
        device_id: &str,
    ) -> Result<()> {
        // Acquire first: on failure the published state is untouched
        let new_track = match self.service.create_local_video_track(device_id).await {
            Ok(track) => track,
            Err(e) => {
                self.activity(format!("Unable to switch camera: {e}"));
                return Err(e);
            }
        };

        // Swap the local preview rendering to the new track
        let commands = {
            let mut state = self.state.write().await;
            reduce(
                &mut state,
                Update::LocalVideoReplaced {
                    track: new_track.clone(),
                },
            )
        };
        self.driver.execute(commands).await;

        // Publish the replacement before retiring the old tracks
        let old_tracks: Vec<Arc<dyn TrackHandle>> = room
            .local_tracks()
            .await
            .into_iter()
            .filter(|t| t.kind() == TrackKind::Video && t.id() != new_track.id())
            .collect();
        room.publish_track(new_track.clone()).await?;
        for old in old_tracks {
            room.unpublish_track(old.id()).await?;
            old.stop();
        }

        {
            let mut session = self.session.write().await;
            session.selected_video_device = Some(device_id.to_string());
            // Keep the preview set pointing at live tracks
            session
                .preview_tracks
                .retain(|t| t.kind() != TrackKind::Video);
            session.preview_tracks.push(new_track);
        }
        self.activity(format!("Switched camera to {device_id}"));
        Ok(())
    }

    /// Stop every preview track and clear the set
    ///
    /// Runs on every exit path so camera and microphone hardware is always
    /// released.
    pub async fn stop_all_preview_tracks(&self) {
        let mut session = self.session.write().await;
        for track in session.preview_tracks.drain(..) {
            track.stop();
        }
    }

    /// Page-unload hook: leave if joined, always release capture hardware
    pub async fn shutdown(&self) {
        let room = self.session.read().await.active_room.clone();
        match room {
            Some(room) => {
                self.activity("Leaving room...");
                room.disconnect().await;
            }
            None => self.stop_all_preview_tracks().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{Container, MemorySurface};
    use crate::service::{DeviceDescriptor, DeviceKind, LoopbackService};
    use crate::token::{FailingTokenProvider, StaticTokenProvider};
    use std::time::Duration;

    struct Fixture {
        service: Arc<LoopbackService>,
        surface: Arc<MemorySurface>,
        manager: Arc<SessionManager>,
    }

    fn fixture_with_room(room: Option<&str>) -> Fixture {
        let service = LoopbackService::with_devices(vec![
            DeviceDescriptor::new("cam-a", DeviceKind::VideoInput, "Default Camera"),
            DeviceDescriptor::new("cam-b", DeviceKind::VideoInput, "Back Camera"),
            DeviceDescriptor::new("mic-0", DeviceKind::AudioInput, "Microphone"),
        ]);
        let surface = Arc::new(MemorySurface::new());
        let manager = SessionManager::new(
            service.clone(),
            Arc::new(StaticTokenProvider::new("T", "alice")),
            surface.clone(),
            Arc::new(EventBus::new()),
            room.map(String::from),
        );
        Fixture {
            service,
            surface,
            manager,
        }
    }

    fn fixture() -> Fixture {
        fixture_with_room(Some("demo"))
    }

    async fn wait_for_phase(manager: &Arc<SessionManager>, phase: SessionPhase) {
        for _ in 0..200 {
            if manager.phase().await == phase {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("session did not reach phase {phase}");
    }

    async fn eventually(mut condition: impl FnMut() -> bool) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not met in time");
    }

    #[tokio::test]
    async fn preview_acquires_media_exactly_once() {
        let f = fixture();

        let first = f.manager.preview().await.unwrap();
        let second = f.manager.preview().await.unwrap();

        assert_eq!(f.service.acquisition_count(), 1);
        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 2);
        // audio + video rendered once
        assert_eq!(f.surface.count_in(Container::LocalMedia), 2);
    }

    #[tokio::test]
    async fn denied_preview_leaves_session_unmodified() {
        let f = fixture();
        f.service.deny_media(true);

        assert!(f.manager.preview().await.is_err());
        assert_eq!(f.surface.count(), 0);
        assert_eq!(f.manager.phase().await, SessionPhase::Idle);

        // A later grant works from a clean slate
        f.service.deny_media(false);
        f.manager.preview().await.unwrap();
        assert_eq!(f.service.acquisition_count(), 1);
    }

    #[tokio::test]
    async fn join_connects_with_room_name_and_identity() {
        let f = fixture();

        f.manager.join().await.unwrap();

        let room = f.service.last_room().unwrap();
        assert_eq!(room.name(), "demo");
        assert_eq!(f.manager.identity().await.as_deref(), Some("alice"));
        assert_eq!(f.manager.phase().await, SessionPhase::Joined);

        let controls = f.manager.controls().await;
        assert!(!controls.join_visible);
        assert!(controls.leave_visible);
        assert!(controls.mute_enabled);
        assert_eq!(controls.join_label, "Rejoin Room");
    }

    #[tokio::test]
    async fn join_passes_preview_tracks_to_connect() {
        let f = fixture();
        let previews = f.manager.preview().await.unwrap();

        f.manager.join().await.unwrap();

        let room = f.service.last_room().unwrap();
        let published = room.local_tracks().await;
        assert_eq!(published.len(), 2);
        assert!(previews
            .iter()
            .all(|p| published.iter().any(|t| t.id() == p.id())));
        // Preview was rendered before the join; the snapshot must not
        // duplicate it
        assert_eq!(f.surface.count_in(Container::LocalMedia), 2);
    }

    #[tokio::test]
    async fn reentrant_join_is_ignored() {
        let f = fixture();

        f.manager.join().await.unwrap();
        let room = f.service.last_room().unwrap();
        f.manager.join().await.unwrap();

        assert_eq!(f.manager.phase().await, SessionPhase::Joined);
        // Still the same room: no second connect happened
        assert!(Arc::ptr_eq(&room, &f.service.last_room().unwrap()));
    }

    #[tokio::test]
    async fn connect_failure_returns_to_idle() {
        let f = fixture();
        f.service.fail_connect(true);

        assert!(f.manager.join().await.is_err());
        assert_eq!(f.manager.phase().await, SessionPhase::Idle);
        assert!(f.manager.controls().await.join_enabled);
    }

    #[tokio::test]
    async fn token_failure_returns_to_idle() {
        let service = LoopbackService::new();
        let manager = SessionManager::new(
            service,
            Arc::new(FailingTokenProvider),
            Arc::new(MemorySurface::new()),
            Arc::new(EventBus::new()),
            Some("demo".to_string()),
        );

        assert!(manager.join().await.is_err());
        assert_eq!(manager.phase().await, SessionPhase::Idle);
        assert!(manager.controls().await.join_enabled);
    }

    #[tokio::test]
    async fn missing_room_name_disables_join() {
        let f = fixture_with_room(None);

        assert!(!f.manager.controls().await.join_enabled);
        f.manager.join().await.unwrap();
        assert_eq!(f.manager.phase().await, SessionPhase::Idle);
        assert!(f.service.last_room().is_none());
    }

    #[tokio::test]
    async fn at_most_one_video_track_is_published() {
        let f = fixture();
        f.manager.refresh_video_devices().await.unwrap();
        f.manager.preview().await.unwrap();
        f.manager.join().await.unwrap();
        let room = f.service.last_room().unwrap();

        f.manager.set_camera("cam-b").await.unwrap();
        f.manager.set_camera("cam-a").await.unwrap();
        f.manager.set_camera("cam-b").await.unwrap();

        assert_eq!(room.published_video_tracks().len(), 1);
        // Exactly one local video node as well
        let video_nodes = f
            .surface
            .nodes_in(Container::LocalMedia)
            .into_iter()
            .filter(|n| n.kind == TrackKind::Video)
            .count();
        assert_eq!(video_nodes, 1);
    }

    #[tokio::test]
    async fn failed_camera_switch_leaves_published_state_unchanged() {
        let f = fixture();
        f.manager.refresh_video_devices().await.unwrap();
        f.manager.preview().await.unwrap();
        f.manager.join().await.unwrap();
        let room = f.service.last_room().unwrap();
        let before: Vec<String> = room
            .published_video_tracks()
            .iter()
            .map(|t| t.id().to_string())
            .collect();

        assert!(f.manager.set_camera("bogus").await.is_err());

        let after: Vec<String> = room
            .published_video_tracks()
            .iter()
            .map(|t| t.id().to_string())
            .collect();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn camera_toggle_bounces_between_two_devices() {
        let f = fixture();
        f.manager.refresh_video_devices().await.unwrap();
        assert_eq!(f.manager.selected_camera().await.as_deref(), Some("cam-a"));
        assert!(f.manager.controls().await.camera_visible);
        f.manager.join().await.unwrap();

        f.manager.switch_camera().await.unwrap();
        assert_eq!(f.manager.selected_camera().await.as_deref(), Some("cam-b"));

        f.manager.switch_camera().await.unwrap();
        assert_eq!(f.manager.selected_camera().await.as_deref(), Some("cam-a"));
    }

    #[tokio::test]
    async fn mute_toggle_flips_published_audio_tracks() {
        let f = fixture();
        f.manager.preview().await.unwrap();
        f.manager.join().await.unwrap();
        let room = f.service.last_room().unwrap();

        f.manager.toggle_mute().await;
        assert!(f.manager.controls().await.muted);
        for track in room.local_tracks().await {
            if track.kind() == TrackKind::Audio {
                assert!(!track.is_enabled());
            }
        }

        f.manager.toggle_mute().await;
        assert!(!f.manager.controls().await.muted);
        for track in room.local_tracks().await {
            if track.kind() == TrackKind::Audio {
                assert!(track.is_enabled());
            }
        }
    }

    #[tokio::test]
    async fn remote_participant_lifecycle_ends_with_empty_container() {
        let f = fixture();
        f.manager.join().await.unwrap();
        let room = f.service.last_room().unwrap();

        room.simulate_participant_connected("A");
        room.simulate_track_added("A", TrackKind::Audio);
        room.simulate_track_added("A", TrackKind::Video);
        let surface = f.surface.clone();
        eventually(move || surface.count_in(Container::RemoteMedia) == 2).await;

        room.simulate_participant_disconnected("A");
        let surface = f.surface.clone();
        eventually(move || surface.count_in(Container::RemoteMedia) == 0).await;
        assert_eq!(f.surface.double_removals(), 0);
    }

    #[tokio::test]
    async fn track_added_right_after_join_is_rendered() {
        let f = fixture();
        f.manager.join().await.unwrap();
        let room = f.service.last_room().unwrap();
        room.simulate_track_added("early-bird", TrackKind::Video);
        let surface = f.surface.clone();
        eventually(move || surface.count_in(Container::RemoteMedia) == 1).await;
    }

    #[tokio::test]
    async fn disconnect_resets_the_session_completely() {
        let f = fixture();
        let previews = f.manager.preview().await.unwrap();
        f.manager.join().await.unwrap();
        let room = f.service.last_room().unwrap();
        room.simulate_track_added("A", TrackKind::Video);
        let surface = f.surface.clone();
        eventually(move || surface.count_in(Container::RemoteMedia) == 1).await;

        f.manager.leave().await;
        wait_for_phase(&f.manager, SessionPhase::Idle).await;

        let session = f.manager.session.read().await;
        assert!(session.active_room.is_none());
        assert!(session.preview_tracks.is_empty());
        assert!(session.identity.is_none());
        drop(session);

        assert_eq!(f.surface.count(), 0);
        assert_eq!(f.surface.double_removals(), 0);
        assert!(previews.iter().all(|t| t.is_stopped()));

        let controls = f.manager.controls().await;
        assert!(controls.join_visible);
        assert!(!controls.leave_visible);
        assert!(!controls.mute_enabled);
    }

    #[tokio::test]
    async fn disconnect_with_no_participants_still_resets() {
        let f = fixture();
        f.manager.join().await.unwrap();

        f.manager.leave().await;
        wait_for_phase(&f.manager, SessionPhase::Idle).await;

        assert!(f.manager.identity().await.is_none());
        assert_eq!(f.surface.count(), 0);
        assert!(f.manager.controls().await.join_visible);
    }

    #[tokio::test]
    async fn service_side_disconnect_tears_down_too() {
        let f = fixture();
        f.manager.preview().await.unwrap();
        f.manager.join().await.unwrap();
        let room = f.service.last_room().unwrap();

        room.simulate_service_disconnect("server closed the room");
        wait_for_phase(&f.manager, SessionPhase::Idle).await;

        assert_eq!(f.surface.count(), 0);
        assert!(f.manager.controls().await.join_visible);
    }

    #[tokio::test]
    async fn rejoin_after_disconnect_works() {
        let f = fixture();
        f.manager.join().await.unwrap();
        f.manager.leave().await;
        wait_for_phase(&f.manager, SessionPhase::Idle).await;

        f.manager.join().await.unwrap();
        assert_eq!(f.manager.phase().await, SessionPhase::Joined);
        assert_eq!(f.manager.identity().await.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn shutdown_without_room_releases_previews() {
        let f = fixture();
        let previews = f.manager.preview().await.unwrap();

        f.manager.shutdown().await;

        assert!(previews.iter().all(|t| t.is_stopped()));
    }

    #[tokio::test]
    async fn stopping_previews_allows_reacquisition() {
        let f = fixture();
        let previews = f.manager.preview().await.unwrap();

        f.manager.stop_all_preview_tracks().await;
        assert!(previews.iter().all(|t| t.is_stopped()));

        f.manager.preview().await.unwrap();
        assert_eq!(f.service.acquisition_count(), 2);
    }
}
