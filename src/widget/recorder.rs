//! The recorder widget
//!
//! One instance owns the capture session, the recording controller, the
//! user-facing error and the current artifact. Inputs are processed one at a
//! time; after each one the derived presentation is published.

use std::borrow::Cow;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, warn};

use crate::capture::{Acquired, CaptureSessionManager};
use crate::config::Config;
use crate::events::{Input, RecorderEvent, UserAction, WidgetEvent};
use crate::platform::{AcquireError, MediaPlatform, ObjectUrls, RecorderError};
use crate::presentation::{Presentation, ViewInputs};
use crate::recording::{Artifact, RecordingController, RecordingState};

/// Highest ` (n)` suffix tried before giving up on a free file name
const MAX_DOWNLOAD_SUFFIX: u32 = 1000;

/// Errors from saving the artifact locally
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("there is no recording to download")]
    NoArtifact,

    #[error("recording {0} is no longer available")]
    Expired(String),

    #[error("failed to save recording to {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no free file name for {0}")]
    NameExhausted(String),
}

/// Webcam recorder component
pub struct VideoRecorder {
    capture: CaptureSessionManager,
    recording: RecordingController,
    urls: Arc<dyn ObjectUrls>,
    /// Message shown to the user
    error: Option<String>,
    artifact: Option<Artifact>,
    download_dir: PathBuf,
    download_file_name: String,
    event_tx: broadcast::Sender<WidgetEvent>,
    view_tx: watch::Sender<Presentation>,
    disposed: bool,
}

impl VideoRecorder {
    /// Mount a widget on `platform`
    ///
    /// `inputs` is the sending half of the channel later passed to
    /// [`Self::run`]; recorder callbacks are delivered through it.
    pub fn new(platform: MediaPlatform, config: &Config, inputs: mpsc::UnboundedSender<Input>) -> Self {
        let MediaPlatform {
            devices,
            recorders,
            urls,
            preview,
        } = platform;
        let (event_tx, _) = broadcast::channel(64);
        let (view_tx, _) = watch::channel(Presentation::default());

        let widget = Self {
            capture: CaptureSessionManager::new(devices, preview),
            recording: RecordingController::new(recorders, Arc::clone(&urls), &config.mime_type, inputs),
            urls,
            error: None,
            artifact: None,
            download_dir: config.download_dir.clone(),
            download_file_name: config.download_file_name.clone(),
            event_tx,
            view_tx,
            disposed: false,
        };
        widget.publish();
        widget
    }

    /// Subscribe to widget events
    pub fn subscribe(&self) -> broadcast::Receiver<WidgetEvent> {
        self.event_tx.subscribe()
    }

    /// Watch the derived presentation
    pub fn watch(&self) -> watch::Receiver<Presentation> {
        self.view_tx.subscribe()
    }

    pub fn presentation(&self) -> Presentation {
        Presentation::derive(ViewInputs {
            session_present: self.capture.is_active(),
            recording_state: self.recording.state(),
            error: self.error.as_deref(),
            artifact: self.artifact.as_ref(),
            download_name: &self.download_file_name,
        })
    }

    pub fn has_session(&self) -> bool {
        self.capture.is_active()
    }

    pub fn recording_state(&self) -> RecordingState {
        self.recording.state()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        self.artifact.as_ref()
    }

    /// Acquire camera and microphone
    pub async fn start_camera(&mut self) {
        if self.disposed {
            debug!("start camera ignored: widget disposed");
            return;
        }

        match self.capture.acquire().await {
            Ok(Acquired::Started { stream_id, tracks }) => {
                self.error = None;
                self.emit(WidgetEvent::CameraStarted { stream_id, tracks });
            }
            Ok(Acquired::AlreadyActive) => {}
            Err(e) => {
                let message = acquisition_message(&e);
                self.error = Some(message.clone());
                self.emit(WidgetEvent::CameraFailed { message });
            }
        }
        self.publish();
    }

    /// Release camera and microphone
    ///
    /// A running recording is stopped first so it still finalizes.
    pub fn stop_camera(&mut self) {
        if !self.capture.is_active() {
            debug!("stop camera ignored: no capture session");
            return;
        }

        if let Some(recording_id) = self.recording.session_released() {
            self.emit(WidgetEvent::RecordingStopped { recording_id });
        }
        if let Some(stream_id) = self.capture.release() {
            self.emit(WidgetEvent::CameraStopped { stream_id });
        }
        self.publish();
    }

    pub fn start_recording(&mut self) {
        match self.recording.start(self.capture.session()) {
            Ok(Some(recording_id)) => {
                self.error = None;
                self.emit(WidgetEvent::RecordingStarted { recording_id });
            }
            Ok(None) => {}
            Err(e) => {
                warn!(?e, "failed to start recording");
                self.error = Some(recorder_message(&e));
            }
        }
        self.publish();
    }

    pub fn stop_recording(&mut self) {
        if let Some(recording_id) = self.recording.stop() {
            self.emit(WidgetEvent::RecordingStopped { recording_id });
        }
        self.publish();
    }

    /// Apply a recorder callback
    pub fn handle_recorder_event(&mut self, recording_id: u64, event: RecorderEvent) {
        match event {
            RecorderEvent::DataAvailable(chunk) => {
                self.recording.push_chunk(recording_id, chunk);
            }
            RecorderEvent::Stopped => {
                if let Some(artifact) = self.recording.finalize(recording_id) {
                    self.replace_artifact(artifact);
                    self.publish();
                }
            }
        }
    }

    /// Save the artifact into the download directory
    ///
    /// Existing files are kept; the name gets a ` (n)` suffix instead.
    pub async fn download(&self) -> Result<PathBuf, DownloadError> {
        let artifact = self.artifact.as_ref().ok_or(DownloadError::NoArtifact)?;
        let blob = self
            .urls
            .resolve(&artifact.url)
            .ok_or_else(|| DownloadError::Expired(artifact.url.clone()))?;

        let path = save_unique(&self.download_dir, &self.download_file_name, blob.data()).await?;
        info!(path = %path.display(), size_bytes = blob.len(), "recording downloaded");

        self.emit(WidgetEvent::Downloaded { path: path.clone() });
        Ok(path)
    }

    /// Process one input
    pub async fn handle(&mut self, input: Input) {
        if self.disposed {
            debug!("input ignored: widget disposed");
            return;
        }

        match input {
            Input::User(action) => {
                debug!(%action, "user action");
                match action {
                    UserAction::StartCamera => self.start_camera().await,
                    UserAction::StopCamera => self.stop_camera(),
                    UserAction::StartRecording => self.start_recording(),
                    UserAction::StopRecording => self.stop_recording(),
                    UserAction::Download => {
                        if let Err(e) = self.download().await {
                            warn!(%e, "download failed");
                        }
                    }
                }
            }
            Input::Recorder {
                recording_id,
                event,
            } => self.handle_recorder_event(recording_id, event),
        }
    }

    /// Run the widget, processing inputs until the channel closes
    ///
    /// Dropping this future abandons a pending acquisition without touching
    /// widget state.
    pub async fn run(&mut self, mut inputs: mpsc::UnboundedReceiver<Input>) {
        info!("recorder widget started");

        while let Some(input) = inputs.recv().await {
            self.handle(input).await;
        }

        info!("recorder widget input closed");
    }

    /// Tear down: stop recording, release the camera, free the artifact
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;

        self.recording.abort();
        if let Some(stream_id) = self.capture.release() {
            self.emit(WidgetEvent::CameraStopped { stream_id });
        }
        if let Some(artifact) = self.artifact.take() {
            self.revoke(&artifact);
        }
        self.publish();

        info!("recorder widget disposed");
    }

    fn replace_artifact(&mut self, artifact: Artifact) {
        if let Some(current) = &self.artifact {
            if current.recording_id > artifact.recording_id {
                debug!(
                    recording_id = artifact.recording_id,
                    current = current.recording_id,
                    "older recording finalized late, keeping newer artifact"
                );
                self.urls.revoke_object_url(&artifact.url);
                return;
            }
        }

        let ready = WidgetEvent::ArtifactReady {
            recording_id: artifact.recording_id,
            url: artifact.url.clone(),
            size_bytes: artifact.size_bytes,
            chunks: artifact.chunks,
        };
        if let Some(previous) = self.artifact.replace(artifact) {
            self.revoke(&previous);
        }
        self.emit(ready);
    }

    fn revoke(&self, artifact: &Artifact) {
        self.urls.revoke_object_url(&artifact.url);
        debug!(recording_id = artifact.recording_id, url = %artifact.url, "artifact revoked");
        self.emit(WidgetEvent::ArtifactReleased {
            url: artifact.url.clone(),
        });
    }

    fn emit(&self, event: WidgetEvent) {
        debug!(%event, "emitting widget event");
        let _ = self.event_tx.send(event);
    }

    fn publish(&self) {
        self.view_tx.send_replace(self.presentation());
    }
}

impl Drop for VideoRecorder {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn acquisition_message(error: &AcquireError) -> String {
    format!("Could not access the camera: {error}. Check your settings.")
}

fn recorder_message(error: &RecorderError) -> String {
    format!("Could not start recording: {error}.")
}

/// `recorded-video.webm`, then `recorded-video (1).webm`, ...
fn candidate_name(file_name: &str, attempt: u32) -> String {
    if attempt == 0 {
        return file_name.to_string();
    }

    let path = Path::new(file_name);
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy())
        .unwrap_or(Cow::Borrowed(file_name));
    match path.extension() {
        Some(ext) => format!("{stem} ({attempt}).{}", ext.to_string_lossy()),
        None => format!("{stem} ({attempt})"),
    }
}

async fn save_unique(dir: &Path, file_name: &str, data: &[u8]) -> Result<PathBuf, DownloadError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| DownloadError::Io {
            path: dir.to_owned(),
            source,
        })?;

    for attempt in 0..MAX_DOWNLOAD_SUFFIX {
        let path = dir.join(candidate_name(file_name, attempt));
        let opened = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await;

        let mut file = match opened {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(source) => return Err(DownloadError::Io { path, source }),
        };

        let written = async {
            file.write_all(data).await?;
            file.flush().await
        }
        .await;
        return match written {
            Ok(()) => Ok(path),
            Err(source) => Err(DownloadError::Io { path, source }),
        };
    }

    Err(DownloadError::NameExhausted(file_name.to_string()))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::platform::synthetic::{Availability, SyntheticPlatform};
    use crate::presentation::Control;

    struct Harness {
        platform: SyntheticPlatform,
        widget: VideoRecorder,
        inputs: mpsc::UnboundedReceiver<Input>,
        downloads: tempfile::TempDir,
    }

    impl Harness {
        /// Feed queued recorder callbacks to the widget
        async fn pump(&mut self) {
            while let Ok(input) = self.inputs.try_recv() {
                self.widget.handle(input).await;
            }
        }

        async fn record(&mut self, chunks: &[&str]) -> Artifact {
            self.widget.start_recording();
            for chunk in chunks {
                assert!(self.platform.emit(*chunk));
            }
            self.widget.stop_recording();
            self.pump().await;
            self.widget.artifact().cloned().unwrap()
        }

        fn content(&self, artifact: &Artifact) -> Vec<u8> {
            self.platform.resolve(&artifact.url).unwrap().data().to_vec()
        }
    }

    fn harness() -> Harness {
        let platform = SyntheticPlatform::new();
        let downloads = tempfile::tempdir().unwrap();
        let config = Config::with_download_dir(downloads.path());
        let (tx, inputs) = mpsc::unbounded_channel();
        Harness {
            widget: VideoRecorder::new(platform.media(), &config, tx),
            platform,
            inputs,
            downloads,
        }
    }

    fn drain(events: &mut broadcast::Receiver<WidgetEvent>) -> Vec<WidgetEvent> {
        std::iter::from_fn(|| events.try_recv().ok()).collect()
    }

    async fn wait_for<F>(view: &mut watch::Receiver<Presentation>, pred: F) -> Presentation
    where
        F: Fn(&Presentation) -> bool,
    {
        let wait = async {
            loop {
                let current = view.borrow_and_update().clone();
                if pred(&current) {
                    return current;
                }
                view.changed().await.unwrap();
            }
        };
        tokio::time::timeout(Duration::from_secs(5), wait).await.unwrap()
    }

    #[tokio::test]
    async fn test_initial_presentation() {
        let h = harness();
        let view = h.widget.watch().borrow().clone();

        assert_eq!(view.controls, vec![Control::StartCamera]);
        assert_eq!(view.recording_state, RecordingState::Idle);
        assert!(!h.widget.has_session());
    }

    #[tokio::test]
    async fn test_acquisition_failure_sets_error() {
        let mut h = harness();
        let mut events = h.widget.subscribe();
        h.platform.set_availability(Availability::Denied);

        h.widget.start_camera().await;

        assert!(!h.widget.has_session());
        let message = h.widget.error().unwrap();
        assert!(message.contains("permission"));
        assert!(h.widget.presentation().shows(Control::StartCamera));
        assert!(matches!(
            drain(&mut events).as_slice(),
            [WidgetEvent::CameraFailed { .. }]
        ));
    }

    #[tokio::test]
    async fn test_acquisition_success_clears_error() {
        let mut h = harness();
        h.platform.set_availability(Availability::Busy);
        h.widget.start_camera().await;
        assert!(h.widget.error().is_some());

        h.platform.set_availability(Availability::Granted);
        h.widget.start_camera().await;

        assert!(h.widget.has_session());
        assert!(h.widget.error().is_none());
        assert!(h.platform.previewing().is_some());
        assert_eq!(
            h.widget.presentation().controls,
            vec![Control::StartRecording, Control::StopCamera]
        );
    }

    #[tokio::test]
    async fn test_start_recording_without_session_is_noop() {
        let mut h = harness();
        h.widget.start_recording();

        assert_eq!(h.widget.recording_state(), RecordingState::Idle);
        assert!(h.widget.error().is_none());
        assert!(!h.platform.is_recording());
    }

    #[tokio::test]
    async fn test_start_recording_leaves_artifact_untouched() {
        let mut h = harness();
        h.widget.start_camera().await;
        let first = h.record(&["A"]).await;

        h.widget.stop_camera();
        h.widget.start_camera().await;
        h.widget.start_recording();

        assert_eq!(h.widget.recording_state(), RecordingState::Recording);
        assert_eq!(h.widget.artifact(), Some(&first));
        assert_eq!(h.widget.presentation().controls, vec![Control::StopRecording, Control::Download]);
    }

    #[tokio::test]
    async fn test_stop_is_synchronous_artifact_follows() {
        let mut h = harness();
        h.widget.start_camera().await;
        h.widget.start_recording();
        h.platform.emit("A");
        h.platform.emit("B");

        h.widget.stop_recording();
        assert_eq!(h.widget.recording_state(), RecordingState::Stopped);
        assert!(h.widget.artifact().is_none());

        h.pump().await;
        let artifact = h.widget.artifact().cloned().unwrap();
        assert_eq!(h.content(&artifact), b"AB");
        assert_eq!(artifact.chunks, 2);

        let view = h.widget.presentation();
        assert_eq!(view.controls, vec![Control::StopCamera, Control::Download]);
        assert_eq!(view.playback.unwrap().url, artifact.url);
    }

    #[tokio::test]
    async fn test_stop_recording_when_idle_is_noop() {
        let mut h = harness();
        h.widget.start_camera().await;
        let mut events = h.widget.subscribe();

        h.widget.stop_recording();

        assert_eq!(h.widget.recording_state(), RecordingState::Idle);
        assert!(drain(&mut events).is_empty());
    }

    #[tokio::test]
    async fn test_stop_camera_stops_tracks_once() {
        let mut h = harness();
        h.widget.start_camera().await;
        let mut events = h.widget.subscribe();

        h.widget.stop_camera();
        h.widget.stop_camera();

        assert!(!h.widget.has_session());
        assert_eq!(h.platform.tracks().len(), 2);
        for track in h.platform.tracks() {
            assert_eq!(track.stop_count(), 1);
        }
        assert!(matches!(
            drain(&mut events).as_slice(),
            [WidgetEvent::CameraStopped { .. }]
        ));
    }

    #[tokio::test]
    async fn test_end_to_end_recording() {
        let mut h = harness();
        h.widget.start_camera().await;

        let artifact = h.record(&["A", "B"]).await;

        assert_eq!(h.content(&artifact), b"AB");
        assert_eq!(artifact.mime_type, "video/webm");
        let blob = h.platform.resolve(&artifact.url).unwrap();
        assert_eq!(blob.mime_type(), "video/webm");
    }

    #[tokio::test]
    async fn test_run_loop_end_to_end() {
        let platform = SyntheticPlatform::new();
        let downloads = tempfile::tempdir().unwrap();
        let config = Config::with_download_dir(downloads.path());
        let (tx, rx) = mpsc::unbounded_channel();
        let mut widget = VideoRecorder::new(platform.media(), &config, tx.clone());
        let mut view = widget.watch();

        let task = tokio::spawn(async move { widget.run(rx).await });

        tx.send(Input::User(UserAction::StartCamera)).unwrap();
        tx.send(Input::User(UserAction::StartRecording)).unwrap();
        wait_for(&mut view, |p| p.recording_state == RecordingState::Recording).await;

        assert!(platform.emit("A"));
        assert!(platform.emit("B"));
        tx.send(Input::User(UserAction::StopRecording)).unwrap();
        let done = wait_for(&mut view, |p| p.playback.is_some()).await;

        let playback = done.playback.unwrap();
        assert_eq!(platform.resolve(&playback.url).unwrap().data(), b"AB");
        assert_eq!(playback.mime_type, "video/webm");

        tx.send(Input::User(UserAction::Download)).unwrap();
        tx.send(Input::User(UserAction::StopCamera)).unwrap();
        wait_for(&mut view, |p| !p.preview_live).await;
        assert!(downloads.path().join("recorded-video.webm").is_file());

        task.abort();
    }

    #[tokio::test]
    async fn test_new_artifact_revokes_previous() {
        let mut h = harness();
        h.widget.start_camera().await;
        let first = h.record(&["first"]).await;

        h.widget.stop_camera();
        h.widget.start_camera().await;
        let mut events = h.widget.subscribe();
        let second = h.record(&["second"]).await;

        assert!(h.platform.is_revoked(&first.url));
        assert!(!h.platform.is_revoked(&second.url));
        assert_eq!(h.content(&second), b"second");
        assert_eq!(h.platform.live_urls(), 1);
        assert!(drain(&mut events).contains(&WidgetEvent::ArtifactReleased {
            url: first.url.clone()
        }));
    }

    #[tokio::test]
    async fn test_stop_camera_while_recording_finalizes() {
        let mut h = harness();
        h.widget.start_camera().await;
        h.widget.start_recording();
        h.platform.emit("A");

        h.widget.stop_camera();
        assert_eq!(h.widget.recording_state(), RecordingState::Idle);
        h.pump().await;

        let artifact = h.widget.artifact().cloned().unwrap();
        assert_eq!(h.content(&artifact), b"A");
        assert_eq!(
            h.widget.presentation().controls,
            vec![Control::StartCamera, Control::Download]
        );
    }

    #[tokio::test]
    async fn test_restart_before_completion_keeps_clip() {
        let mut h = harness();
        h.widget.start_camera().await;
        h.widget.start_recording();
        h.platform.emit("A");

        // Completion of the first recording is still queued
        h.widget.stop_camera();
        h.widget.start_camera().await;
        h.widget.start_recording();
        assert_eq!(h.widget.recording_state(), RecordingState::Recording);

        h.pump().await;
        let first = h.widget.artifact().cloned().unwrap();
        assert_eq!(first.recording_id, 1);
        assert_eq!(h.content(&first), b"A");

        h.platform.emit("B");
        h.widget.stop_recording();
        h.pump().await;
        let second = h.widget.artifact().cloned().unwrap();
        assert_eq!(second.recording_id, 2);
        assert_eq!(h.content(&second), b"B");
        assert!(h.platform.is_revoked(&first.url));
    }

    #[tokio::test]
    async fn test_late_completion_keeps_newer_artifact() {
        let mut h = harness();
        h.widget.start_camera().await;
        h.widget.start_recording();
        h.platform.emit("old");
        h.widget.stop_camera();

        // Hold back the first recording's callbacks
        let held: Vec<Input> = std::iter::from_fn(|| h.inputs.try_recv().ok()).collect();
        h.widget.start_camera().await;
        let newer = h.record(&["new"]).await;

        for input in held {
            h.widget.handle(input).await;
        }

        assert_eq!(h.widget.artifact(), Some(&newer));
        assert_eq!(h.content(&newer), b"new");
        assert_eq!(h.platform.live_urls(), 1);
    }

    #[tokio::test]
    async fn test_recorder_failure_is_surfaced() {
        let mut h = harness();
        h.widget.start_camera().await;
        h.platform
            .fail_recorders(Some(RecorderError::UnsupportedMimeType("video/webm".to_string())));

        h.widget.start_recording();

        assert_eq!(h.widget.recording_state(), RecordingState::Idle);
        assert!(h.widget.error().unwrap().contains("Could not start recording"));
        assert!(h.widget.presentation().shows(Control::StartRecording));
    }

    #[tokio::test]
    async fn test_stale_recorder_events_are_ignored() {
        let mut h = harness();
        h.widget.start_camera().await;

        h.widget
            .handle(Input::Recorder {
                recording_id: 99,
                event: RecorderEvent::Stopped,
            })
            .await;

        assert!(h.widget.artifact().is_none());
        assert_eq!(h.platform.live_urls(), 0);
    }

    #[tokio::test]
    async fn test_dispose_releases_everything() {
        let mut h = harness();
        h.widget.start_camera().await;
        let artifact = h.record(&["A"]).await;

        h.widget.dispose();
        h.widget.dispose();

        assert!(!h.widget.has_session());
        assert!(h.widget.artifact().is_none());
        assert!(h.platform.is_revoked(&artifact.url));
        for track in h.platform.tracks() {
            assert_eq!(track.stop_count(), 1);
        }

        h.widget.handle(Input::User(UserAction::StartCamera)).await;
        assert_eq!(h.platform.acquisitions(), 1);
        assert!(!h.widget.has_session());
    }

    #[tokio::test]
    async fn test_dispose_while_recording_drops_recording() {
        let mut h = harness();
        h.widget.start_camera().await;
        h.widget.start_recording();
        h.platform.emit("A");

        h.widget.dispose();
        h.pump().await;

        assert!(!h.platform.is_recording());
        assert!(h.widget.artifact().is_none());
        assert_eq!(h.platform.live_urls(), 0);
    }

    #[tokio::test]
    async fn test_drop_releases_session() {
        let mut h = harness();
        h.widget.start_camera().await;
        let platform = h.platform.clone();

        drop(h);

        for track in platform.tracks() {
            assert_eq!(track.stop_count(), 1);
        }
        assert_eq!(platform.previewing(), None);
    }

    #[tokio::test]
    async fn test_pending_acquisition_is_abandoned() {
        let mut h = harness();
        h.platform.set_prompt_delay(Some(Duration::from_secs(60)));
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(Input::User(UserAction::StartCamera)).unwrap();

        let result = tokio::time::timeout(Duration::from_millis(50), h.widget.run(rx)).await;

        assert!(result.is_err());
        assert_eq!(h.platform.acquisitions(), 1);
        assert!(!h.widget.has_session());
        assert!(h.widget.error().is_none());
    }

    #[tokio::test]
    async fn test_download_without_artifact_fails() {
        let h = harness();
        let result = h.widget.download().await;
        assert!(matches!(assert_err!(result), DownloadError::NoArtifact));
    }

    #[tokio::test]
    async fn test_download_never_overwrites() {
        let mut h = harness();
        h.widget.start_camera().await;
        h.record(&["A", "B"]).await;

        let first = assert_ok!(h.widget.download().await);
        let second = assert_ok!(h.widget.download().await);

        assert_eq!(first, h.downloads.path().join("recorded-video.webm"));
        assert_eq!(second, h.downloads.path().join("recorded-video (1).webm"));
        assert_eq!(std::fs::read(&first).unwrap(), b"AB");
        assert_eq!(std::fs::read(&second).unwrap(), b"AB");
    }

    #[tokio::test]
    async fn test_download_after_revocation_fails() {
        let mut h = harness();
        h.widget.start_camera().await;
        let artifact = h.record(&["A"]).await;
        h.platform.revoke_object_url(&artifact.url);

        let result = h.widget.download().await;
        assert!(matches!(assert_err!(result), DownloadError::Expired(_)));
    }

    #[test]
    fn test_candidate_names() {
        assert_eq!(candidate_name("recorded-video.webm", 0), "recorded-video.webm");
        assert_eq!(candidate_name("recorded-video.webm", 2), "recorded-video (2).webm");
        assert_eq!(candidate_name("clip", 1), "clip (1)");
    }
}
