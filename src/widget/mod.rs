//! Recorder widget
//!
//! Coordinates capture, recording and presentation for one component
//! instance with an explicit mount/dispose lifecycle.

mod recorder;

pub use recorder::{DownloadError, VideoRecorder};
