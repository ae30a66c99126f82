//! Line-oriented console host
//!
//! Renders the widget's presentation as text on stdout, echoes widget events
//! as JSON lines and turns typed commands (one per line) into user actions.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, warn};

use crate::events::{Input, ParseActionError, UserAction, WidgetEvent};
use crate::presentation::Presentation;

/// A typed line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Action(UserAction),
    Quit,
}

/// Parse one input line; blank lines yield `None`
pub fn parse_command(line: &str) -> Result<Option<Command>, ParseActionError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
        return Ok(Some(Command::Quit));
    }
    line.parse().map(|action| Some(Command::Action(action)))
}

/// Text rendering of the presentation
pub fn render(view: &Presentation) -> String {
    let mut out = String::new();

    let preview = if view.preview_live { "live" } else { "off" };
    out.push_str(&format!("[preview: {preview}] [state: {}]\n", view.recording_state));

    if let Some(error) = &view.error {
        out.push_str(&format!("  ! {error}\n"));
    }

    if let Some(playback) = &view.playback {
        out.push_str(&format!(
            "  recorded video: {} ({}, {} bytes) -> {}\n",
            playback.url, playback.mime_type, playback.size_bytes, playback.download_name
        ));
    }

    for control in &view.controls {
        out.push_str(&format!("  {:<16} {}\n", control.action().as_str(), control.label()));
    }
    out
}

/// One JSON line per widget event, for hosts scripting the console
pub fn render_event(event: &WidgetEvent) -> Result<String> {
    let json = serde_json::to_string(event).context("failed to serialize widget event")?;
    Ok(format!("  > {json}\n"))
}

/// Console stand-in for the widget's DOM
pub struct ConsoleHost {
    inputs: mpsc::UnboundedSender<Input>,
    view: watch::Receiver<Presentation>,
    events: broadcast::Receiver<WidgetEvent>,
}

impl ConsoleHost {
    pub fn new(
        inputs: mpsc::UnboundedSender<Input>,
        view: watch::Receiver<Presentation>,
        events: broadcast::Receiver<WidgetEvent>,
    ) -> Self {
        Self {
            inputs,
            view,
            events,
        }
    }

    /// Run until stdin closes or the user quits
    pub async fn run(mut self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        let initial = self.view.borrow_and_update().clone();
        write_out(&mut stdout, &render(&initial)).await?;

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line.context("failed to read stdin")? else {
                        info!("stdin closed");
                        return Ok(());
                    };
                    match parse_command(&line) {
                        Ok(None) => {}
                        Ok(Some(Command::Quit)) => return Ok(()),
                        Ok(Some(Command::Action(action))) => {
                            debug!(%action, "console action");
                            self.inputs
                                .send(Input::User(action))
                                .context("recorder widget is gone")?;
                        }
                        Err(e) => write_out(&mut stdout, &format!("{e}\n")).await?,
                    }
                }

                changed = self.view.changed() => {
                    if changed.is_err() {
                        return Ok(());
                    }
                    let view = self.view.borrow_and_update().clone();
                    write_out(&mut stdout, &render(&view)).await?;
                }

                event = self.events.recv() => match event {
                    Ok(event) => {
                        debug!(%event, "widget event");
                        write_out(&mut stdout, &render_event(&event)?).await?;
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "widget event receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => return Ok(()),
                },
            }
        }
    }
}

async fn write_out(stdout: &mut tokio::io::Stdout, text: &str) -> Result<()> {
    stdout
        .write_all(text.as_bytes())
        .await
        .context("failed to write to stdout")?;
    stdout.flush().await.context("failed to flush stdout")?;
    Ok(())
}
