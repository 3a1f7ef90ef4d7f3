//! Pure reconciliation reducer
//!
//! `reduce` maps one update onto the current [`RoomState`] and returns the
//! render commands that make the surface match. No IO happens here; the
//! [`RoomDriver`](super::RoomDriver) executes the commands. That split keeps
//! the reconciliation logic testable without a service or a real surface.
//!
//! Updates must be applied in the order the service emits them.

use std::sync::Arc;

use super::state::{Owner, RenderedTrack, RoomState};
use crate::render::Container;
use crate::service::{RemoteParticipant, RoomEvent, TrackHandle, TrackKind};

/// Inputs to the reducer
pub enum Update {
    /// Local preview tracks were acquired
    PreviewReady { tracks: Vec<Arc<dyn TrackHandle>> },
    /// The local video track was swapped for a different camera
    LocalVideoReplaced { track: Arc<dyn TrackHandle> },
    /// Connect completed: local tracks plus the room's membership snapshot
    Joined {
        local: Vec<Arc<dyn TrackHandle>>,
        remote: Vec<RemoteParticipant>,
    },
    /// A room lifecycle event
    Room(RoomEvent),
}

/// Effects for the driver to execute, in order
pub enum RenderCommand {
    /// Create a node rendering `track` under `container`
    Attach {
        container: Container,
        track: Arc<dyn TrackHandle>,
    },
    /// Remove the node rendering this track
    Detach { track_id: String },
    /// Stop every preview track and clear the preview set
    StopPreviews,
    /// Clear the session context back to its startup state
    ClearSession,
    /// Return the UI controls to their pre-join state
    ResetControls,
    /// Append to the activity log
    Log { message: String },
}

/// Apply one update, returning the commands that reconcile the surface
pub fn reduce(state: &mut RoomState, update: Update) -> Vec<RenderCommand> {
    let mut commands = Vec::new();
    match update {
        Update::PreviewReady { tracks } => {
            attach_local(state, tracks, &mut commands);
        }
        Update::LocalVideoReplaced { track } => {
            // Drop the rendered local video, keep local audio untouched
            let old: Vec<String> = state
                .rendered
                .iter()
                .filter(|(_, r)| r.owner == Owner::Local && r.kind == TrackKind::Video)
                .map(|(id, _)| id.clone())
                .collect();
            for track_id in old {
                state.rendered.remove(&track_id);
                commands.push(RenderCommand::Detach { track_id });
            }
            attach(
                state,
                Owner::Local,
                Container::LocalMedia,
                track,
                &mut commands,
            );
        }
        Update::Joined { local, remote } => {
            attach_local(state, local, &mut commands);
            for participant in remote {
                commands.push(RenderCommand::Log {
                    message: format!("Already in Room: '{}'", participant.identity),
                });
                state.participants.insert(participant.identity.clone());
                for track in participant.tracks {
                    attach(
                        state,
                        Owner::Remote(participant.identity.clone()),
                        Container::RemoteMedia,
                        track,
                        &mut commands,
                    );
                }
            }
        }
        Update::Room(event) => reduce_room_event(state, event, &mut commands),
    }
    commands
}

fn reduce_room_event(state: &mut RoomState, event: RoomEvent, commands: &mut Vec<RenderCommand>) {
    match event {
        RoomEvent::ParticipantConnected { identity } => {
            // Tracks arrive separately; nothing to render yet
            commands.push(RenderCommand::Log {
                message: format!("Joining: '{identity}'"),
            });
            state.participants.insert(identity);
        }
        RoomEvent::TrackAdded { identity, track } => {
            commands.push(RenderCommand::Log {
                message: format!("{} added track: {}", identity, track.kind()),
            });
            state.participants.insert(identity.clone());
            attach(
                state,
                Owner::Remote(identity),
                Container::RemoteMedia,
                track,
                commands,
            );
        }
        RoomEvent::TrackRemoved {
            identity,
            track_id,
            kind,
        } => {
            commands.push(RenderCommand::Log {
                message: format!("{identity} removed track: {kind}"),
            });
            if state.rendered.remove(&track_id).is_some() {
                commands.push(RenderCommand::Detach { track_id });
            }
        }
        RoomEvent::ParticipantDisconnected { identity } => {
            commands.push(RenderCommand::Log {
                message: format!("Participant '{identity}' left the room"),
            });
            for track_id in state.rendered_for(&identity) {
                state.rendered.remove(&track_id);
                commands.push(RenderCommand::Detach { track_id });
            }
            state.participants.remove(&identity);
        }
        RoomEvent::Disconnected { reason } => {
            commands.push(RenderCommand::Log {
                message: match reason {
                    Some(reason) => format!("Left ({reason})"),
                    None => "Left".to_string(),
                },
            });
            commands.push(RenderCommand::StopPreviews);
            // Local nodes first, then every remote participant's
            for track_id in state.rendered_local() {
                state.rendered.remove(&track_id);
                commands.push(RenderCommand::Detach { track_id });
            }
            let mut remaining: Vec<String> = state.rendered.keys().cloned().collect();
            remaining.sort();
            for track_id in remaining {
                state.rendered.remove(&track_id);
                commands.push(RenderCommand::Detach { track_id });
            }
            state.participants.clear();
            // The session clears last: once the phase reads idle again,
            // surface and controls are already back to their pre-join state
            commands.push(RenderCommand::ResetControls);
            commands.push(RenderCommand::ClearSession);
        }
    }
}

/// Attach local tracks unless a local video is already rendered
///
/// The guard is all-or-nothing on purpose: a rendered local video means the
/// preview is already on screen, and re-attaching on a repeated preview or
/// rejoin would duplicate it.
fn attach_local(
    state: &mut RoomState,
    tracks: Vec<Arc<dyn TrackHandle>>,
    commands: &mut Vec<RenderCommand>,
) {
    if state.has_local_video() {
        return;
    }
    for track in tracks {
        attach(
            state,
            Owner::Local,
            Container::LocalMedia,
            track,
            commands,
        );
    }
}

fn attach(
    state: &mut RoomState,
    owner: Owner,
    container: Container,
    track: Arc<dyn TrackHandle>,
    commands: &mut Vec<RenderCommand>,
) {
    // Never attach a track already rendered somewhere
    if state.rendered.contains_key(track.id()) {
        return;
    }
    state.rendered.insert(
        track.id().to_string(),
        RenderedTrack {
            owner,
            container,
            kind: track.kind(),
        },
    );
    commands.push(RenderCommand::Attach { container, track });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::LoopbackTrack;

    fn track(kind: TrackKind) -> Arc<dyn TrackHandle> {
        LoopbackTrack::new(kind)
    }

    fn attach_count(commands: &[RenderCommand]) -> usize {
        commands
            .iter()
            .filter(|c| matches!(c, RenderCommand::Attach { .. }))
            .count()
    }

    fn detach_count(commands: &[RenderCommand]) -> usize {
        commands
            .iter()
            .filter(|c| matches!(c, RenderCommand::Detach { .. }))
            .count()
    }

    #[test]
    fn participant_lifecycle_leaves_nothing_rendered() {
        let mut state = RoomState::default();
        let t1 = track(TrackKind::Audio);
        let t2 = track(TrackKind::Video);

        reduce(
            &mut state,
            Update::Room(RoomEvent::ParticipantConnected {
                identity: "A".to_string(),
            }),
        );
        reduce(
            &mut state,
            Update::Room(RoomEvent::TrackAdded {
                identity: "A".to_string(),
                track: t1,
            }),
        );
        reduce(
            &mut state,
            Update::Room(RoomEvent::TrackAdded {
                identity: "A".to_string(),
                track: t2,
            }),
        );
        assert_eq!(state.rendered_for("A").len(), 2);

        let commands = reduce(
            &mut state,
            Update::Room(RoomEvent::ParticipantDisconnected {
                identity: "A".to_string(),
            }),
        );
        assert_eq!(detach_count(&commands), 2);
        assert!(state.rendered_for("A").is_empty());
        assert!(state.rendered.is_empty());
    }

    #[test]
    fn participant_connected_attaches_nothing() {
        let mut state = RoomState::default();
        let commands = reduce(
            &mut state,
            Update::Room(RoomEvent::ParticipantConnected {
                identity: "A".to_string(),
            }),
        );
        assert_eq!(attach_count(&commands), 0);
        assert!(state.participants.contains("A"));
    }

    #[test]
    fn duplicate_track_added_attaches_once() {
        let mut state = RoomState::default();
        let t = track(TrackKind::Video);

        let first = reduce(
            &mut state,
            Update::Room(RoomEvent::TrackAdded {
                identity: "A".to_string(),
                track: t.clone(),
            }),
        );
        let second = reduce(
            &mut state,
            Update::Room(RoomEvent::TrackAdded {
                identity: "A".to_string(),
                track: t,
            }),
        );
        assert_eq!(attach_count(&first), 1);
        assert_eq!(attach_count(&second), 0);
        assert_eq!(state.rendered.len(), 1);
    }

    #[test]
    fn removing_unknown_track_detaches_nothing() {
        let mut state = RoomState::default();
        let commands = reduce(
            &mut state,
            Update::Room(RoomEvent::TrackRemoved {
                identity: "A".to_string(),
                track_id: "missing".to_string(),
                kind: TrackKind::Video,
            }),
        );
        assert_eq!(detach_count(&commands), 0);
    }

    #[test]
    fn preview_skipped_when_local_video_already_rendered() {
        let mut state = RoomState::default();
        let first = vec![track(TrackKind::Audio), track(TrackKind::Video)];
        let second = vec![track(TrackKind::Audio), track(TrackKind::Video)];

        let commands = reduce(&mut state, Update::PreviewReady { tracks: first });
        assert_eq!(attach_count(&commands), 2);

        let commands = reduce(&mut state, Update::PreviewReady { tracks: second });
        assert_eq!(attach_count(&commands), 0);
    }

    #[test]
    fn joined_snapshot_renders_existing_participants() {
        let mut state = RoomState::default();
        let local = vec![track(TrackKind::Audio), track(TrackKind::Video)];
        let remote = vec![
            RemoteParticipant {
                identity: "A".to_string(),
                tracks: vec![track(TrackKind::Video)],
            },
            RemoteParticipant {
                identity: "B".to_string(),
                tracks: vec![track(TrackKind::Audio), track(TrackKind::Video)],
            },
        ];

        let commands = reduce(&mut state, Update::Joined { local, remote });

        // 2 local + 3 remote
        assert_eq!(attach_count(&commands), 5);
        assert_eq!(state.rendered_for("A").len(), 1);
        assert_eq!(state.rendered_for("B").len(), 2);
        assert_eq!(state.rendered_local().len(), 2);
    }

    #[test]
    fn local_video_replacement_swaps_exactly_one_track() {
        let mut state = RoomState::default();
        reduce(
            &mut state,
            Update::PreviewReady {
                tracks: vec![track(TrackKind::Audio), track(TrackKind::Video)],
            },
        );

        let replacement = track(TrackKind::Video);
        let commands = reduce(
            &mut state,
            Update::LocalVideoReplaced {
                track: replacement.clone(),
            },
        );

        assert_eq!(detach_count(&commands), 1);
        assert_eq!(attach_count(&commands), 1);
        assert!(state.rendered.contains_key(replacement.id()));
        assert_eq!(state.rendered_local().len(), 2);
    }

    #[test]
    fn disconnect_clears_everything() {
        let mut state = RoomState::default();
        reduce(
            &mut state,
            Update::PreviewReady {
                tracks: vec![track(TrackKind::Audio), track(TrackKind::Video)],
            },
        );
        reduce(
            &mut state,
            Update::Room(RoomEvent::TrackAdded {
                identity: "A".to_string(),
                track: track(TrackKind::Video),
            }),
        );

        let commands = reduce(
            &mut state,
            Update::Room(RoomEvent::Disconnected { reason: None }),
        );

        assert_eq!(detach_count(&commands), 3);
        assert!(commands
            .iter()
            .any(|c| matches!(c, RenderCommand::StopPreviews)));
        assert!(commands
            .iter()
            .any(|c| matches!(c, RenderCommand::ClearSession)));
        assert!(commands
            .iter()
            .any(|c| matches!(c, RenderCommand::ResetControls)));
        assert!(state.rendered.is_empty());
        assert!(state.participants.is_empty());
    }
}
