//! Host platform capability contract
//!
//! The widget never touches a concrete media API. It talks to these traits,
//! which a browser binding, a native capture backend, or the in-process
//! [`synthetic`] platform can implement.

pub mod synthetic;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use crate::events::{Input, RecorderEvent};

/// Which media kinds to request from the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaConstraints {
    pub video: bool,
    pub audio: bool,
}

impl MediaConstraints {
    /// Camera plus microphone
    pub const AUDIO_VIDEO: Self = Self {
        video: true,
        audio: true,
    };
}

/// Kind of a stream's constituent track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

/// Reasons the host refuses an input request
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AcquireError {
    #[error("permission to use the camera and microphone was denied")]
    PermissionDenied,

    #[error("no camera or microphone was found")]
    NotFound,

    #[error("the device is already in use: {0}")]
    Busy(String),

    #[error("capture is unavailable: {0}")]
    Unavailable(String),
}

/// Failures reported by a host recorder
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecorderError {
    #[error("recording as {0} is not supported")]
    UnsupportedMimeType(String),

    #[error("recorder is {0}")]
    InvalidState(&'static str),

    #[error("recorder failed: {0}")]
    Platform(String),
}

/// One audio or video track of a live stream
pub trait MediaTrack: Send + Sync {
    fn id(&self) -> &str;

    fn kind(&self) -> TrackKind;

    /// Permanently stop the track and release its device
    fn stop(&self);
}

/// A live audio+video input stream
pub trait MediaStream: Send + Sync {
    fn id(&self) -> &str;

    fn tracks(&self) -> Vec<Arc<dyn MediaTrack>>;
}

/// Input acquisition; may suspend on a user-mediated permission prompt
#[async_trait]
pub trait CaptureDevices: Send + Sync {
    async fn get_user_media(
        &self,
        constraints: MediaConstraints,
    ) -> Result<Arc<dyn MediaStream>, AcquireError>;
}

/// A recorder bound to one stream
///
/// Both calls return immediately. Data and completion arrive later through
/// the [`RecorderSink`] the recorder was created with.
pub trait MediaRecorder: Send + Sync {
    fn start(&mut self) -> Result<(), RecorderError>;

    /// Flush outstanding data, then report completion exactly once
    fn stop(&mut self) -> Result<(), RecorderError>;
}

/// Constructs recorders for live streams
pub trait RecorderFactory: Send + Sync {
    fn create(
        &self,
        stream: Arc<dyn MediaStream>,
        mime_type: &str,
        sink: RecorderSink,
    ) -> Result<Box<dyn MediaRecorder>, RecorderError>;
}

/// Immutable binary payload with a MIME type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    mime_type: String,
    data: Vec<u8>,
}

impl Blob {
    /// Concatenate `parts` in order
    pub fn from_parts<I>(parts: I, mime_type: &str) -> Self
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        let data = parts.into_iter().flatten().collect();
        Self {
            mime_type: mime_type.to_string(),
            data,
        }
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Blob-to-reference conversion
pub trait ObjectUrls: Send + Sync {
    /// Register `blob` and return a URL usable for playback and download
    fn create_object_url(&self, blob: Blob) -> String;

    /// Release the blob behind `url`; unknown URLs are ignored
    fn revoke_object_url(&self, url: &str);

    fn resolve(&self, url: &str) -> Option<Blob>;
}

/// Where the live preview is shown
pub trait PreviewSurface: Send + Sync {
    fn bind(&self, stream: &Arc<dyn MediaStream>);

    fn clear(&self);
}

/// The full set of host capabilities a widget needs
#[derive(Clone)]
pub struct MediaPlatform {
    pub devices: Arc<dyn CaptureDevices>,
    pub recorders: Arc<dyn RecorderFactory>,
    pub urls: Arc<dyn ObjectUrls>,
    pub preview: Arc<dyn PreviewSurface>,
}

/// Delivers a recorder's callbacks to the widget's input channel
///
/// Every event is tagged with the recording it belongs to, so callbacks from
/// a recorder the widget has moved past can be recognised and dropped.
#[derive(Debug, Clone)]
pub struct RecorderSink {
    recording_id: u64,
    tx: mpsc::UnboundedSender<Input>,
}

impl RecorderSink {
    pub fn new(recording_id: u64, tx: mpsc::UnboundedSender<Input>) -> Self {
        Self { recording_id, tx }
    }

    pub fn recording_id(&self) -> u64 {
        self.recording_id
    }

    pub fn data_available(&self, chunk: Vec<u8>) {
        self.send(RecorderEvent::DataAvailable(chunk));
    }

    pub fn stopped(&self) {
        self.send(RecorderEvent::Stopped);
    }

    fn send(&self, event: RecorderEvent) {
        let input = Input::Recorder {
            recording_id: self.recording_id,
            event,
        };
        if self.tx.send(input).is_err() {
            debug!(
                recording_id = self.recording_id,
                "recorder event dropped, widget is gone"
            );
        }
    }
}
