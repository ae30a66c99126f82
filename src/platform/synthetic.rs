//! In-process media platform
//!
//! Hands out fake streams whose recorders emit synthetic chunks, either on a
//! timer (console host) or on demand through [`SyntheticPlatform::emit`]
//! (tests). Object URLs are backed by an in-memory map.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    AcquireError, Blob, CaptureDevices, MediaConstraints, MediaPlatform, MediaRecorder,
    MediaStream, MediaTrack, ObjectUrls, PreviewSurface, RecorderError, RecorderFactory,
    RecorderSink, TrackKind,
};

/// How the fake devices answer an input request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Availability {
    #[default]
    Granted,
    Denied,
    NoDevice,
    Busy,
}

/// Shared state behind every capability handle
#[derive(Default)]
struct Shared {
    availability: Mutex<Availability>,
    prompt_delay: Mutex<Option<Duration>>,
    recorder_failure: Mutex<Option<RecorderError>>,
    stop_failure: Mutex<Option<RecorderError>>,
    timeslice: Option<Duration>,
    tracks: Mutex<Vec<Arc<SyntheticTrack>>>,
    /// Sink of the recorder currently running, if any
    active_sink: Mutex<Option<RecorderSink>>,
    blobs: Mutex<HashMap<String, Blob>>,
    revoked: Mutex<Vec<String>>,
    preview: Mutex<Option<String>>,
    acquisitions: AtomicUsize,
}

/// Fake media host; cheap to clone, all clones share state
#[derive(Clone, Default)]
pub struct SyntheticPlatform {
    shared: Arc<Shared>,
}

impl SyntheticPlatform {
    /// Platform whose recorders only emit data through [`Self::emit`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Platform whose recorders also emit one chunk every `timeslice`
    pub fn with_timeslice(timeslice: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                timeslice: Some(timeslice),
                ..Shared::default()
            }),
        }
    }

    /// Capability bundle backed by this platform
    pub fn media(&self) -> MediaPlatform {
        let this = Arc::new(self.clone());
        MediaPlatform {
            devices: this.clone(),
            recorders: this.clone(),
            urls: this.clone(),
            preview: this,
        }
    }

    pub fn set_availability(&self, availability: Availability) {
        *self.shared.availability.lock() = availability;
    }

    /// Make acquisition wait, like a permission prompt left open
    pub fn set_prompt_delay(&self, delay: Option<Duration>) {
        *self.shared.prompt_delay.lock() = delay;
    }

    /// Make recorder construction fail with `failure`
    pub fn fail_recorders(&self, failure: Option<RecorderError>) {
        *self.shared.recorder_failure.lock() = failure;
    }

    /// Make `stop()` on running recorders fail with `failure`; the recorder
    /// goes quiet without reporting completion
    pub fn fail_recorder_stop(&self, failure: Option<RecorderError>) {
        *self.shared.stop_failure.lock() = failure;
    }

    /// Emit a chunk from the running recorder; false if none is running
    pub fn emit(&self, chunk: impl Into<Vec<u8>>) -> bool {
        match self.shared.active_sink.lock().as_ref() {
            Some(sink) => {
                sink.data_available(chunk.into());
                true
            }
            None => false,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.shared.active_sink.lock().is_some()
    }

    /// Every track handed out so far, across all streams
    pub fn tracks(&self) -> Vec<Arc<SyntheticTrack>> {
        self.shared.tracks.lock().clone()
    }

    pub fn acquisitions(&self) -> usize {
        self.shared.acquisitions.load(Ordering::SeqCst)
    }

    /// Stream id currently bound to the preview
    pub fn previewing(&self) -> Option<String> {
        self.shared.preview.lock().clone()
    }

    pub fn live_urls(&self) -> usize {
        self.shared.blobs.lock().len()
    }

    pub fn is_revoked(&self, url: &str) -> bool {
        self.shared.revoked.lock().iter().any(|u| u == url)
    }
}

/// Fake track that counts how often it was stopped
#[derive(Debug)]
pub struct SyntheticTrack {
    id: String,
    kind: TrackKind,
    stops: AtomicUsize,
}

impl SyntheticTrack {
    fn new(kind: TrackKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            stops: AtomicUsize::new(0),
        }
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl MediaTrack for SyntheticTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

struct SyntheticStream {
    id: String,
    tracks: Vec<Arc<SyntheticTrack>>,
}

impl MediaStream for SyntheticStream {
    fn id(&self) -> &str {
        &self.id
    }

    fn tracks(&self) -> Vec<Arc<dyn MediaTrack>> {
        self.tracks
            .iter()
            .map(|track| Arc::clone(track) as Arc<dyn MediaTrack>)
            .collect()
    }
}

#[async_trait]
impl CaptureDevices for SyntheticPlatform {
    async fn get_user_media(
        &self,
        constraints: MediaConstraints,
    ) -> Result<Arc<dyn MediaStream>, AcquireError> {
        self.shared.acquisitions.fetch_add(1, Ordering::SeqCst);

        let delay = *self.shared.prompt_delay.lock();
        match delay {
            Some(delay) => tokio::time::sleep(delay).await,
            None => tokio::task::yield_now().await,
        }

        let availability = *self.shared.availability.lock();
        match availability {
            Availability::Granted => {}
            Availability::Denied => return Err(AcquireError::PermissionDenied),
            Availability::NoDevice => return Err(AcquireError::NotFound),
            Availability::Busy => {
                return Err(AcquireError::Busy("synthetic camera".to_string()))
            }
        }

        let mut tracks = Vec::new();
        if constraints.video {
            tracks.push(Arc::new(SyntheticTrack::new(TrackKind::Video)));
        }
        if constraints.audio {
            tracks.push(Arc::new(SyntheticTrack::new(TrackKind::Audio)));
        }
        if tracks.is_empty() {
            return Err(AcquireError::Unavailable(
                "no media kinds were requested".to_string(),
            ));
        }

        self.shared.tracks.lock().extend(tracks.iter().cloned());
        let stream = SyntheticStream {
            id: Uuid::new_v4().to_string(),
            tracks,
        };
        debug!(stream_id = %stream.id, "synthetic stream created");
        Ok(Arc::new(stream))
    }
}

impl RecorderFactory for SyntheticPlatform {
    fn create(
        &self,
        stream: Arc<dyn MediaStream>,
        mime_type: &str,
        sink: RecorderSink,
    ) -> Result<Box<dyn MediaRecorder>, RecorderError> {
        if let Some(failure) = self.shared.recorder_failure.lock().clone() {
            return Err(failure);
        }
        if !mime_type.starts_with("video/") {
            return Err(RecorderError::UnsupportedMimeType(mime_type.to_string()));
        }

        Ok(Box::new(SyntheticRecorder {
            shared: Arc::clone(&self.shared),
            stream_id: stream.id().to_string(),
            sink,
            phase: Phase::Inactive,
            ticker: None,
        }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Inactive,
    Recording,
    Finished,
}

struct SyntheticRecorder {
    shared: Arc<Shared>,
    stream_id: String,
    sink: RecorderSink,
    phase: Phase,
    ticker: Option<JoinHandle<()>>,
}

impl SyntheticRecorder {
    /// Stop being the platform's running recorder
    fn release_sink(&self) {
        let mut active = self.shared.active_sink.lock();
        if active
            .as_ref()
            .is_some_and(|sink| sink.recording_id() == self.sink.recording_id())
        {
            *active = None;
        }
    }

    /// Emit one frame per timeslice while this recorder is the active one
    fn spawn_ticker(&self, timeslice: Duration) -> Option<JoinHandle<()>> {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no async runtime, synthetic recorder emits on demand only");
            return None;
        };

        let shared = Arc::clone(&self.shared);
        let recording_id = self.sink.recording_id();
        let stream_id = self.stream_id.clone();

        Some(runtime.spawn(async move {
            let mut interval = tokio::time::interval(timeslice);
            // First tick completes immediately
            interval.tick().await;
            let mut frame = 0u64;
            loop {
                interval.tick().await;
                let active = shared.active_sink.lock();
                match active.as_ref() {
                    Some(sink) if sink.recording_id() == recording_id => {
                        frame += 1;
                        sink.data_available(format!("{stream_id}:frame-{frame};").into_bytes());
                    }
                    _ => break,
                }
            }
        }))
    }
}

impl MediaRecorder for SyntheticRecorder {
    fn start(&mut self) -> Result<(), RecorderError> {
        if self.phase != Phase::Inactive {
            return Err(RecorderError::InvalidState("already started"));
        }

        *self.shared.active_sink.lock() = Some(self.sink.clone());
        self.phase = Phase::Recording;
        if let Some(timeslice) = self.shared.timeslice {
            self.ticker = self.spawn_ticker(timeslice);
        }

        info!(
            recording_id = self.sink.recording_id(),
            stream_id = %self.stream_id,
            "synthetic recorder started"
        );
        Ok(())
    }

    fn stop(&mut self) -> Result<(), RecorderError> {
        if self.phase != Phase::Recording {
            return Err(RecorderError::InvalidState("not recording"));
        }
        self.phase = Phase::Finished;

        let failure = self.shared.stop_failure.lock().clone();
        if let Some(failure) = failure {
            self.release_sink();
            if let Some(ticker) = self.ticker.take() {
                ticker.abort();
            }
            return Err(failure);
        }

        // Completion is sent under the same lock the ticker emits under, so
        // no chunk can follow it.
        let mut active = self.shared.active_sink.lock();
        if active
            .as_ref()
            .is_some_and(|sink| sink.recording_id() == self.sink.recording_id())
        {
            *active = None;
        }
        self.sink.stopped();
        drop(active);

        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        Ok(())
    }
}

impl Drop for SyntheticRecorder {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        if self.phase == Phase::Recording {
            self.release_sink();
        }
    }
}

impl ObjectUrls for SyntheticPlatform {
    fn create_object_url(&self, blob: Blob) -> String {
        let url = format!("blob:clip-recorder/{}", Uuid::new_v4());
        self.shared.blobs.lock().insert(url.clone(), blob);
        url
    }

    fn revoke_object_url(&self, url: &str) {
        if self.shared.blobs.lock().remove(url).is_some() {
            self.shared.revoked.lock().push(url.to_string());
        }
    }

    fn resolve(&self, url: &str) -> Option<Blob> {
        self.shared.blobs.lock().get(url).cloned()
    }
}

impl PreviewSurface for SyntheticPlatform {
    fn bind(&self, stream: &Arc<dyn MediaStream>) {
        *self.shared.preview.lock() = Some(stream.id().to_string());
    }

    fn clear(&self) {
        *self.shared.preview.lock() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Input, RecorderEvent};
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_grants_audio_and_video_tracks() {
        let platform = SyntheticPlatform::new();
        let stream = platform
            .get_user_media(MediaConstraints::AUDIO_VIDEO)
            .await
            .unwrap();

        let kinds: Vec<TrackKind> = stream.tracks().iter().map(|t| t.kind()).collect();
        assert_eq!(kinds, vec![TrackKind::Video, TrackKind::Audio]);
        assert_eq!(platform.tracks().len(), 2);
        assert_eq!(platform.acquisitions(), 1);
    }

    #[tokio::test]
    async fn test_availability_maps_to_errors() {
        let platform = SyntheticPlatform::new();

        platform.set_availability(Availability::Denied);
        let result = platform.get_user_media(MediaConstraints::AUDIO_VIDEO).await;
        assert_eq!(result.err(), Some(AcquireError::PermissionDenied));

        platform.set_availability(Availability::NoDevice);
        let result = platform.get_user_media(MediaConstraints::AUDIO_VIDEO).await;
        assert_eq!(result.err(), Some(AcquireError::NotFound));

        platform.set_availability(Availability::Busy);
        let result = platform.get_user_media(MediaConstraints::AUDIO_VIDEO).await;
        assert!(matches!(result.err(), Some(AcquireError::Busy(_))));
    }

    #[tokio::test]
    async fn test_recorder_emits_then_stops() {
        let platform = SyntheticPlatform::new();
        let stream = platform
            .get_user_media(MediaConstraints::AUDIO_VIDEO)
            .await
            .unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut recorder = platform
            .create(stream, "video/webm", RecorderSink::new(1, tx))
            .unwrap();
        assert!(!platform.emit("early"));

        recorder.start().unwrap();
        assert!(platform.emit("A"));
        recorder.stop().unwrap();
        assert!(!platform.emit("late"));
        assert!(recorder.stop().is_err());

        let events: Vec<Input> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(
            events,
            vec![
                Input::Recorder {
                    recording_id: 1,
                    event: RecorderEvent::DataAvailable(b"A".to_vec()),
                },
                Input::Recorder {
                    recording_id: 1,
                    event: RecorderEvent::Stopped,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_timeslice_recorder_emits_frames() {
        let platform = SyntheticPlatform::with_timeslice(Duration::from_millis(5));
        let stream = platform
            .get_user_media(MediaConstraints::AUDIO_VIDEO)
            .await
            .unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut recorder = platform
            .create(stream, "video/webm", RecorderSink::new(9, tx))
            .unwrap();
        recorder.start().unwrap();

        let first = rx.recv().await.unwrap();
        assert!(matches!(
            first,
            Input::Recorder {
                recording_id: 9,
                event: RecorderEvent::DataAvailable(_),
            }
        ));

        recorder.stop().unwrap();
        let mut last = None;
        while let Ok(input) = rx.try_recv() {
            last = Some(input);
        }
        assert_eq!(
            last,
            Some(Input::Recorder {
                recording_id: 9,
                event: RecorderEvent::Stopped,
            })
        );
    }

    #[test]
    fn test_rejects_audio_only_mime_type() {
        let platform = SyntheticPlatform::new();
        let stream: Arc<dyn MediaStream> = Arc::new(SyntheticStream {
            id: "s".to_string(),
            tracks: Vec::new(),
        });
        let (tx, _rx) = mpsc::unbounded_channel();

        let result = platform.create(stream, "audio/ogg", RecorderSink::new(1, tx));
        assert!(matches!(
            result.err(),
            Some(RecorderError::UnsupportedMimeType(_))
        ));
    }

    #[test]
    fn test_object_urls_resolve_until_revoked() {
        let platform = SyntheticPlatform::new();
        let url = platform.create_object_url(Blob::from_parts(vec![b"AB".to_vec()], "video/webm"));

        assert!(url.starts_with("blob:"));
        assert_eq!(platform.resolve(&url).unwrap().data(), b"AB");

        platform.revoke_object_url(&url);
        assert!(platform.resolve(&url).is_none());
        assert!(platform.is_revoked(&url));
        assert_eq!(platform.live_urls(), 0);
    }
}
