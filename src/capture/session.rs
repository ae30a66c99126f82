//! Capture session ownership
//!
//! Holds at most one live stream. Acquisition is the only awaiting operation
//! in the widget; release is synchronous and idempotent.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use crate::platform::{AcquireError, CaptureDevices, MediaConstraints, MediaStream, PreviewSurface};

/// A live audio+video input stream owned by the widget
pub struct CaptureSession {
    stream: Arc<dyn MediaStream>,
    acquired_at: Instant,
}

impl CaptureSession {
    pub fn id(&self) -> &str {
        self.stream.id()
    }

    pub fn stream(&self) -> &Arc<dyn MediaStream> {
        &self.stream
    }

    /// How long the session has been live
    pub fn age(&self) -> Duration {
        self.acquired_at.elapsed()
    }
}

impl std::fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("id", &self.id())
            .field("tracks", &self.stream.tracks().len())
            .finish()
    }
}

/// Outcome of a successful `acquire`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acquired {
    /// A new session was created
    Started { stream_id: String, tracks: usize },
    /// A session already existed; nothing was requested
    AlreadyActive,
}

/// Acquires and releases the widget's capture session
pub struct CaptureSessionManager {
    devices: Arc<dyn CaptureDevices>,
    preview: Arc<dyn PreviewSurface>,
    constraints: MediaConstraints,
    session: Option<CaptureSession>,
}

impl CaptureSessionManager {
    pub fn new(devices: Arc<dyn CaptureDevices>, preview: Arc<dyn PreviewSurface>) -> Self {
        Self {
            devices,
            preview,
            constraints: MediaConstraints::AUDIO_VIDEO,
            session: None,
        }
    }

    pub fn session(&self) -> Option<&CaptureSession> {
        self.session.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Request camera and microphone from the host
    ///
    /// On success the stream is stored and bound to the preview surface. On
    /// failure no session exists afterwards.
    pub async fn acquire(&mut self) -> Result<Acquired, AcquireError> {
        if let Some(session) = &self.session {
            debug!(stream_id = %session.id(), "acquire ignored: session already active");
            return Ok(Acquired::AlreadyActive);
        }

        info!(constraints = ?self.constraints, "requesting capture devices");
        let stream = self
            .devices
            .get_user_media(self.constraints)
            .await
            .inspect_err(|e| error!(?e, "failed to access camera"))?;

        self.preview.bind(&stream);
        let session = CaptureSession {
            stream,
            acquired_at: Instant::now(),
        };
        let acquired = Acquired::Started {
            stream_id: session.id().to_string(),
            tracks: session.stream.tracks().len(),
        };
        info!(?session, "capture session acquired");

        self.session = Some(session);
        Ok(acquired)
    }

    /// Stop every track and drop the session
    ///
    /// Returns the released stream id, or `None` if there was no session.
    pub fn release(&mut self) -> Option<String> {
        let session = self.session.take()?;

        for track in session.stream.tracks() {
            debug!(track_id = %track.id(), kind = ?track.kind(), "stopping track");
            track.stop();
        }
        self.preview.clear();

        info!(
            stream_id = %session.id(),
            age_ms = session.age().as_millis() as u64,
            "capture session released"
        );
        Some(session.id().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::synthetic::{Availability, SyntheticPlatform};

    fn create_manager() -> (CaptureSessionManager, SyntheticPlatform) {
        let platform = SyntheticPlatform::new();
        let media = platform.media();
        (CaptureSessionManager::new(media.devices, media.preview), platform)
    }

    #[tokio::test]
    async fn test_acquire_binds_preview() {
        let (mut manager, platform) = create_manager();

        let acquired = manager.acquire().await.unwrap();
        let Acquired::Started { stream_id, tracks } = acquired else {
            panic!("expected a new session");
        };

        assert!(manager.is_active());
        assert_eq!(tracks, 2);
        assert_eq!(platform.previewing(), Some(stream_id));
    }

    #[tokio::test]
    async fn test_acquire_failure_leaves_no_session() {
        let (mut manager, platform) = create_manager();
        platform.set_availability(Availability::Denied);

        let result = manager.acquire().await;
        assert_eq!(result, Err(AcquireError::PermissionDenied));
        assert!(!manager.is_active());
        assert_eq!(platform.previewing(), None);
    }

    #[tokio::test]
    async fn test_second_acquire_is_noop() {
        let (mut manager, platform) = create_manager();

        manager.acquire().await.unwrap();
        let again = manager.acquire().await.unwrap();

        assert_eq!(again, Acquired::AlreadyActive);
        assert_eq!(platform.acquisitions(), 1);
    }

    #[tokio::test]
    async fn test_release_stops_each_track_once() {
        let (mut manager, platform) = create_manager();
        manager.acquire().await.unwrap();

        assert!(manager.release().is_some());
        assert!(!manager.is_active());
        assert_eq!(platform.previewing(), None);

        assert!(manager.release().is_none());
        for track in platform.tracks() {
            assert_eq!(track.stop_count(), 1);
        }
    }

    #[test]
    fn test_release_without_session() {
        let (mut manager, platform) = create_manager();
        assert!(manager.release().is_none());
        assert!(platform.tracks().is_empty());
    }
}
