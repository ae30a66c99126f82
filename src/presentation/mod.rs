//! Presentation state derived from the widget
//!
//! Nothing here is stored. The view is recomputed from the session, the
//! recording state, the error and the artifact every time one of them changes.

use serde::{Deserialize, Serialize};

use crate::events::UserAction;
use crate::recording::{Artifact, RecordingState};

/// An affordance the user can click
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Control {
    StartCamera,
    StartRecording,
    StopCamera,
    StopRecording,
    Download,
}

impl Control {
    /// Action fired when the control is clicked
    pub fn action(&self) -> UserAction {
        match self {
            Control::StartCamera => UserAction::StartCamera,
            Control::StartRecording => UserAction::StartRecording,
            Control::StopCamera => UserAction::StopCamera,
            Control::StopRecording => UserAction::StopRecording,
            Control::Download => UserAction::Download,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Control::StartCamera => "Start camera",
            Control::StartRecording => "Start recording",
            Control::StopCamera => "Stop camera",
            Control::StopRecording => "Stop recording",
            Control::Download => "Download video",
        }
    }
}

/// Playback element for the recorded clip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playback {
    pub url: String,
    pub mime_type: String,
    pub size_bytes: usize,
    pub download_name: String,
}

/// Everything a host needs to render the widget
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presentation {
    /// Live preview is bound to a capture session
    pub preview_live: bool,
    pub recording_state: RecordingState,
    /// Visible controls, in display order
    pub controls: Vec<Control>,
    pub error: Option<String>,
    pub playback: Option<Playback>,
}

/// Inputs the presentation is derived from
#[derive(Debug, Clone, Copy)]
pub struct ViewInputs<'a> {
    pub session_present: bool,
    pub recording_state: RecordingState,
    pub error: Option<&'a str>,
    pub artifact: Option<&'a Artifact>,
    pub download_name: &'a str,
}

impl Presentation {
    pub fn derive(inputs: ViewInputs<'_>) -> Self {
        let ViewInputs {
            session_present,
            recording_state,
            error,
            artifact,
            download_name,
        } = inputs;

        let mut controls = Vec::new();
        match (session_present, recording_state) {
            (false, _) => controls.push(Control::StartCamera),
            (true, RecordingState::Idle) => {
                controls.push(Control::StartRecording);
                controls.push(Control::StopCamera);
            }
            (true, RecordingState::Recording) => controls.push(Control::StopRecording),
            (true, RecordingState::Stopped) => controls.push(Control::StopCamera),
        }

        let playback = artifact.map(|artifact| Playback {
            url: artifact.url.clone(),
            mime_type: artifact.mime_type.clone(),
            size_bytes: artifact.size_bytes,
            download_name: download_name.to_string(),
        });
        if playback.is_some() {
            controls.push(Control::Download);
        }

        Self {
            preview_live: session_present,
            recording_state,
            controls,
            error: error.map(str::to_string),
            playback,
        }
    }

    pub fn shows(&self, control: Control) -> bool {
        self.controls.contains(&control)
    }
}
