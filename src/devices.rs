//! Media device catalog
//!
//! Partitions the platform device list by kind and implements camera
//! selection. The list is queried once per call and never cached here:
//! devices hot-plug, so yesterday's answer is worthless.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::service::{DeviceDescriptor, DeviceKind, MediaDevices};

/// Device list partitioned by kind
///
/// Kinds with no devices are empty buckets, never an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceSelection {
    pub audioinput: Vec<DeviceDescriptor>,
    pub audiooutput: Vec<DeviceDescriptor>,
    pub videoinput: Vec<DeviceDescriptor>,
}

impl DeviceSelection {
    /// Ids of the available cameras, in enumeration order
    pub fn video_input_ids(&self) -> Vec<String> {
        self.videoinput.iter().map(|d| d.id.clone()).collect()
    }
}

/// Query the platform and partition the device list by kind
///
/// Fails with `AppError::DeviceQuery` when enumeration is denied; the caller
/// surfaces a user-facing message instead of crashing.
pub async fn list_devices_by_kind<D>(devices: &D) -> Result<DeviceSelection>
where
    D: MediaDevices + ?Sized,
{
    let all = devices.enumerate_devices().await?;
    debug!(count = all.len(), "enumerated media devices");

    let mut selection = DeviceSelection::default();
    for device in all {
        match device.kind {
            DeviceKind::AudioInput => selection.audioinput.push(device),
            DeviceKind::AudioOutput => selection.audiooutput.push(device),
            DeviceKind::VideoInput => selection.videoinput.push(device),
        }
    }
    Ok(selection)
}

/// Binary camera toggle, not general selection
///
/// With two cameras this flips between them: the first known id switches to
/// the second, anything else switches back to the first. With one camera or
/// none there is nothing to toggle. For three or more cameras use
/// `SessionManager::set_camera` with an id from the enumerated list; this
/// toggle still only bounces between the first two.
pub fn select_next_video_device<'a>(current_id: &str, available: &'a [String]) -> Option<&'a str> {
    if available.len() < 2 {
        return None;
    }
    if current_id == available[0] {
        available.get(1).map(String::as_str)
    } else {
        available.first().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::LoopbackService;

    fn descriptor(id: &str, kind: DeviceKind) -> DeviceDescriptor {
        DeviceDescriptor::new(id, kind, id)
    }

    #[tokio::test]
    async fn partitions_every_device_exactly_once() {
        let service = LoopbackService::with_devices(vec![
            descriptor("cam-front", DeviceKind::VideoInput),
            descriptor("mic-0", DeviceKind::AudioInput),
            descriptor("speaker-0", DeviceKind::AudioOutput),
            descriptor("cam-back", DeviceKind::VideoInput),
            descriptor("mic-1", DeviceKind::AudioInput),
        ]);

        let selection = list_devices_by_kind(service.as_ref()).await.unwrap();

        assert_eq!(selection.audioinput.len(), 2);
        assert_eq!(selection.audiooutput.len(), 1);
        assert_eq!(selection.videoinput.len(), 2);

        let total =
            selection.audioinput.len() + selection.audiooutput.len() + selection.videoinput.len();
        assert_eq!(total, 5);
        assert!(selection.videoinput.iter().all(|d| d.kind == DeviceKind::VideoInput));
    }

    #[tokio::test]
    async fn empty_kinds_are_empty_buckets() {
        let service =
            LoopbackService::with_devices(vec![descriptor("mic-0", DeviceKind::AudioInput)]);

        let selection = list_devices_by_kind(service.as_ref()).await.unwrap();

        assert_eq!(selection.audioinput.len(), 1);
        assert!(selection.audiooutput.is_empty());
        assert!(selection.videoinput.is_empty());
    }

    #[tokio::test]
    async fn denied_enumeration_is_an_error() {
        let service = LoopbackService::new();
        service.deny_enumeration(true);

        assert!(list_devices_by_kind(service.as_ref()).await.is_err());
    }

    #[test]
    fn toggles_between_two_cameras() {
        let available = vec!["a".to_string(), "b".to_string()];
        assert_eq!(select_next_video_device("a", &available), Some("b"));
        assert_eq!(select_next_video_device("b", &available), Some("a"));
    }

    #[test]
    fn single_camera_has_nothing_to_toggle() {
        let available = vec!["a".to_string()];
        assert_eq!(select_next_video_device("a", &available), None);
        assert_eq!(select_next_video_device("a", &[]), None);
    }

    #[test]
    fn unknown_current_falls_back_to_first() {
        let available = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(select_next_video_device("c", &available), Some("a"));
    }
}
