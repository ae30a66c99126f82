//! Recording state machine
//!
//! Drives one host recorder at a time through Idle → Recording → Stopped and
//! turns its ordered chunks into an artifact once the recorder reports
//! completion.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::capture::CaptureSession;
use crate::events::{Input, RecorderEvent};
use crate::platform::{Blob, MediaRecorder, ObjectUrls, RecorderError, RecorderFactory, RecorderSink};

/// MIME type of finished recordings
pub const WEBM_MIME_TYPE: &str = "video/webm";

/// The three states of the recording controller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    /// Nothing recorded since the camera started
    #[default]
    Idle,
    /// Recorder is running
    Recording,
    /// Stop was signalled; finalization may still be pending
    Stopped,
}

impl std::fmt::Display for RecordingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordingState::Idle => write!(f, "Idle"),
            RecordingState::Recording => write!(f, "Recording"),
            RecordingState::Stopped => write!(f, "Stopped"),
        }
    }
}

/// A finished recording, referenced by an object URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub recording_id: u64,
    pub url: String,
    pub mime_type: String,
    pub size_bytes: usize,
    pub chunks: usize,
}

/// Recorder plus the chunks it has delivered so far
struct PendingRecording {
    id: u64,
    recorder: Box<dyn MediaRecorder>,
    chunks: Vec<Vec<u8>>,
    started_at: Instant,
}

/// Starts and stops recordings of the active capture session
pub struct RecordingController {
    recorders: Arc<dyn RecorderFactory>,
    urls: Arc<dyn ObjectUrls>,
    mime_type: String,
    state: RecordingState,
    /// Recordings awaiting finalization, oldest first. The running one, if
    /// any, is last; stopped ones stay until their recorder reports
    /// completion.
    pending: Vec<PendingRecording>,
    /// Id of the running recording
    active: Option<u64>,
    last_id: u64,
    inputs: mpsc::UnboundedSender<Input>,
}

impl RecordingController {
    pub fn new(
        recorders: Arc<dyn RecorderFactory>,
        urls: Arc<dyn ObjectUrls>,
        mime_type: &str,
        inputs: mpsc::UnboundedSender<Input>,
    ) -> Self {
        Self {
            recorders,
            urls,
            mime_type: mime_type.to_string(),
            state: RecordingState::Idle,
            pending: Vec::new(),
            active: None,
            last_id: 0,
            inputs,
        }
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    /// Id of the newest recording whose completion is still expected
    pub fn pending_id(&self) -> Option<u64> {
        self.pending.last().map(|p| p.id)
    }

    /// Ids of every recording whose completion is still expected
    pub fn pending_ids(&self) -> Vec<u64> {
        self.pending.iter().map(|p| p.id).collect()
    }

    fn pending_mut(&mut self, recording_id: u64) -> Option<&mut PendingRecording> {
        self.pending.iter_mut().find(|p| p.id == recording_id)
    }

    /// Start recording `session`
    ///
    /// Returns `Ok(None)` without side effects when there is no session or
    /// the controller is not Idle. Returns the new recording id on success.
    pub fn start(&mut self, session: Option<&CaptureSession>) -> Result<Option<u64>, RecorderError> {
        let Some(session) = session else {
            debug!("start ignored: no capture session");
            return Ok(None);
        };
        if self.state != RecordingState::Idle {
            debug!(state = %self.state, "start ignored: not idle");
            return Ok(None);
        }

        let id = self.last_id + 1;
        let sink = RecorderSink::new(id, self.inputs.clone());
        let mut recorder = self
            .recorders
            .create(Arc::clone(session.stream()), &self.mime_type, sink)?;
        recorder.start()?;
        self.last_id = id;

        if !self.pending.is_empty() {
            debug!(
                recording_id = id,
                awaiting = ?self.pending_ids(),
                "starting while earlier recordings finalize"
            );
        }

        self.pending.push(PendingRecording {
            id,
            recorder,
            chunks: Vec::new(),
            started_at: Instant::now(),
        });
        self.active = Some(id);
        self.state = RecordingState::Recording;
        info!(recording_id = id, stream_id = %session.id(), "recording started");
        Ok(Some(id))
    }

    /// Signal the recorder to finalize
    ///
    /// Moves to Stopped immediately; the artifact arrives later through
    /// [`Self::finalize`]. If the recorder refuses to stop, completion is
    /// queued here so the chunks gathered so far still finalize. Returns the
    /// stopped recording id, or `None` when not recording.
    pub fn stop(&mut self) -> Option<u64> {
        if self.state != RecordingState::Recording {
            debug!(state = %self.state, "stop ignored: not recording");
            return None;
        }
        let id = self.active.take()?;
        self.state = RecordingState::Stopped;
        let inputs = self.inputs.clone();
        let pending = self.pending_mut(id)?;

        if let Err(e) = pending.recorder.stop() {
            warn!(?e, recording_id = id, "recorder refused to stop, finalizing buffered chunks");
            let completion = Input::Recorder {
                recording_id: id,
                event: RecorderEvent::Stopped,
            };
            if inputs.send(completion).is_err() {
                debug!(recording_id = id, "input channel closed");
            }
        }

        info!(
            recording_id = id,
            chunks = pending.chunks.len(),
            elapsed_ms = pending.started_at.elapsed().as_millis() as u64,
            "recording stopped"
        );
        Some(id)
    }

    /// Append a chunk in arrival order; false if it belongs to no pending recording
    pub fn push_chunk(&mut self, recording_id: u64, chunk: Vec<u8>) -> bool {
        match self.pending_mut(recording_id) {
            Some(pending) => {
                pending.chunks.push(chunk);
                true
            }
            None => {
                debug!(recording_id, "dropping chunk for inactive recording");
                false
            }
        }
    }

    /// Concatenate a pending recording's chunks into an artifact
    pub fn finalize(&mut self, recording_id: u64) -> Option<Artifact> {
        let Some(index) = self.pending.iter().position(|p| p.id == recording_id) else {
            debug!(recording_id, "dropping completion for inactive recording");
            return None;
        };
        let pending = self.pending.remove(index);

        // Host recorders may finish on their own (track ended)
        if self.active == Some(recording_id) {
            self.active = None;
            self.state = RecordingState::Stopped;
        }

        let chunks = pending.chunks.len();
        let blob = Blob::from_parts(pending.chunks, &self.mime_type);
        let size_bytes = blob.len();
        let url = self.urls.create_object_url(blob);

        info!(recording_id, chunks, size_bytes, %url, "recording finalized");
        Some(Artifact {
            recording_id,
            url,
            mime_type: self.mime_type.clone(),
            size_bytes,
            chunks,
        })
    }

    /// React to the capture session going away
    ///
    /// A running recording is stopped so it still finalizes; Stopped returns
    /// to Idle so the next session can record. Returns the id stopped here.
    pub fn session_released(&mut self) -> Option<u64> {
        let stopped = self.stop();
        if self.state == RecordingState::Stopped {
            debug!("recording state reset after camera release");
            self.state = RecordingState::Idle;
        }
        stopped
    }

    /// Drop every recorder without producing an artifact
    pub fn abort(&mut self) {
        let active = self.active.take();
        for mut pending in self.pending.drain(..) {
            if active == Some(pending.id) {
                if let Err(e) = pending.recorder.stop() {
                    debug!(?e, recording_id = pending.id, "recorder stop failed during abort");
                }
            }
            info!(recording_id = pending.id, "recording aborted");
        }
        self.state = RecordingState::Idle;
    }
}
