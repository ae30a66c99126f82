//! Events module for the recorder widget
//!
//! Inbound: user actions and recorder callbacks, delivered to the widget on a
//! single channel so they are processed one at a time, in arrival order.
//! Outbound: structured widget events broadcast to observers.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// User-initiated actions, one per affordance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UserAction {
    /// Request camera and microphone access
    StartCamera,
    /// Release the camera and microphone
    StopCamera,
    /// Begin recording the live stream
    StartRecording,
    /// Finish the current recording
    StopRecording,
    /// Save the recorded clip locally
    Download,
}

impl UserAction {
    /// Command name as typed by a user
    pub fn as_str(&self) -> &'static str {
        match self {
            UserAction::StartCamera => "start-camera",
            UserAction::StopCamera => "stop-camera",
            UserAction::StartRecording => "start-recording",
            UserAction::StopRecording => "stop-recording",
            UserAction::Download => "download",
        }
    }

    pub const ALL: [UserAction; 5] = [
        UserAction::StartCamera,
        UserAction::StopCamera,
        UserAction::StartRecording,
        UserAction::StopRecording,
        UserAction::Download,
    ];
}

impl std::fmt::Display for UserAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a command name is not a known action
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown action `{0}`")]
pub struct ParseActionError(pub String);

impl FromStr for UserAction {
    type Err = ParseActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        UserAction::ALL
            .into_iter()
            .find(|action| action.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| ParseActionError(name.to_string()))
    }
}

/// Callbacks emitted by a host recorder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderEvent {
    /// One chunk of encoded media; boundaries are chosen by the host
    DataAvailable(Vec<u8>),
    /// Recorder finished; no data follows
    Stopped,
}

/// Everything the widget reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// A click on one of the visible controls
    User(UserAction),
    /// A callback from the recorder started for `recording_id`
    Recorder {
        recording_id: u64,
        event: RecorderEvent,
    },
}

/// Events emitted by the widget after it changes state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WidgetEvent {
    /// A capture session was acquired and bound to the preview
    CameraStarted { stream_id: String, tracks: usize },

    /// The capture session was released
    CameraStopped { stream_id: String },

    /// Acquisition failed; `message` is what the user sees
    CameraFailed { message: String },

    /// Recorder started for a new recording
    RecordingStarted { recording_id: u64 },

    /// Stop was signalled; the artifact follows once finalized
    RecordingStopped { recording_id: u64 },

    /// Chunks were finalized into a playable artifact
    ArtifactReady {
        recording_id: u64,
        url: String,
        size_bytes: usize,
        chunks: usize,
    },

    /// An artifact URL was revoked
    ArtifactReleased { url: String },

    /// The artifact was saved to local storage
    Downloaded { path: PathBuf },
}

impl std::fmt::Display for WidgetEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WidgetEvent::CameraStarted { stream_id, tracks } => {
                write!(f, "CAMERA_STARTED ({stream_id}, {tracks} tracks)")
            }
            WidgetEvent::CameraStopped { stream_id } => write!(f, "CAMERA_STOPPED ({stream_id})"),
            WidgetEvent::CameraFailed { message } => write!(f, "CAMERA_FAILED ({message})"),
            WidgetEvent::RecordingStarted { recording_id } => {
                write!(f, "RECORDING_STARTED (#{recording_id})")
            }
            WidgetEvent::RecordingStopped { recording_id } => {
                write!(f, "RECORDING_STOPPED (#{recording_id})")
            }
            WidgetEvent::ArtifactReady {
                recording_id,
                size_bytes,
                chunks,
                ..
            } => write!(
                f,
                "ARTIFACT_READY (#{recording_id}, {size_bytes} bytes in {chunks} chunks)"
            ),
            WidgetEvent::ArtifactReleased { url } => write!(f, "ARTIFACT_RELEASED ({url})"),
            WidgetEvent::Downloaded { path } => write!(f, "DOWNLOADED ({})", path.display()),
        }
    }
}
