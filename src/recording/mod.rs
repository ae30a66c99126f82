//! Recording controller module
//!
//! Provides an explicit state machine with three states:
//! - Idle: camera may be live, nothing is being recorded
//! - Recording: a host recorder is encoding the live stream
//! - Stopped: stop was signalled, the artifact follows on finalization

mod controller;

pub use controller::{Artifact, RecordingController, RecordingState, WEBM_MIME_TYPE};
