//! Render command execution
//!
//! The driver is the adapter between the pure reducer and the world: it owns
//! the track-id → node-id map, mutates the render surface, stops preview
//! tracks, clears the session context and resets the controls. Nothing else
//! in the crate touches the surface.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::reducer::RenderCommand;
use super::state::SessionPhase;
use crate::controls::UiControls;
use crate::events::{EventBus, SessionEvent};
use crate::render::{NodeId, RenderSurface};
use crate::session::Session;

pub struct RoomDriver {
    surface: Arc<dyn RenderSurface>,
    session: Arc<RwLock<Session>>,
    controls: Arc<RwLock<UiControls>>,
    events: Arc<EventBus>,
    nodes: Mutex<HashMap<String, NodeId>>,
}

impl RoomDriver {
    pub fn new(
        surface: Arc<dyn RenderSurface>,
        session: Arc<RwLock<Session>>,
        controls: Arc<RwLock<UiControls>>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            surface,
            session,
            controls,
            events,
            nodes: Mutex::new(HashMap::new()),
        }
    }

    /// Execute reducer commands in order
    pub async fn execute(&self, commands: Vec<RenderCommand>) {
        for command in commands {
            match command {
                RenderCommand::Attach { container, track } => {
                    let node = self.surface.attach(container, track.as_ref());
                    debug!(track = %track.id(), %container, %node, "attached track");
                    if let Some(stale) = self.nodes.lock().insert(track.id().to_string(), node) {
                        // The reducer deduplicates attaches, so a stale node
                        // here means bookkeeping drifted
                        warn!(track = %track.id(), node = %stale, "replaced stale render node");
                        self.surface.remove(stale);
                    }
                }
                RenderCommand::Detach { track_id } => {
                    match self.nodes.lock().remove(&track_id) {
                        Some(node) => {
                            if !self.surface.remove(node) {
                                warn!(track = %track_id, %node, "render node already removed");
                            } else {
                                debug!(track = %track_id, %node, "detached track");
                            }
                        }
                        None => debug!(track = %track_id, "no rendered node to detach"),
                    }
                }
                RenderCommand::StopPreviews => {
                    let mut session = self.session.write().await;
                    for track in session.preview_tracks.drain(..) {
                        track.stop();
                    }
                    debug!("preview tracks stopped");
                }
                RenderCommand::ClearSession => {
                    self.session.write().await.reset();
                    self.events.publish(SessionEvent::PhaseChanged {
                        phase: SessionPhase::Idle,
                    });
                }
                RenderCommand::ResetControls => {
                    let controls = {
                        let mut controls = self.controls.write().await;
                        controls.reset_after_disconnect();
                        controls.clone()
                    };
                    self.events
                        .publish(SessionEvent::ControlsChanged { controls });
                }
                RenderCommand::Log { message } => {
                    info!("{message}");
                    self.events.publish(SessionEvent::activity(message));
                }
            }
        }
    }
}
