// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Append-only NDJSON recorder, one file per session, driven by the
//! session's own `tokio::sync::broadcast` subscription rather than polling.
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use court_types::{Event, EventPayload, SessionId};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::error::RecorderError;

fn event_is_terminal(payload: &EventPayload) -> bool {
    matches!(payload, EventPayload::SessionCompleted { .. } | EventPayload::SessionFailed { .. })
}

async fn write_line(file: &mut File, event: &Event) -> Result<(), RecorderError> {
    let mut line = serde_json::to_string(event)?;
    line.push('\n');
    file.write_all(line.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}

struct RecorderHandle {
    task: JoinHandle<()>,
}

/// Owns one recording task per active session. `dispose` is the
/// process-wide shutdown hook: flush and close everything still open.
pub struct RecorderManager {
    recordings_dir: PathBuf,
    handles: Mutex<HashMap<SessionId, RecorderHandle>>,
}

impl RecorderManager {
    pub fn new(recordings_dir: impl Into<PathBuf>) -> Self {
        Self { recordings_dir: recordings_dir.into(), handles: Mutex::new(HashMap::new()) }
    }

    fn path_for(&self, session_id: &SessionId) -> PathBuf {
        self.recordings_dir.join(format!("{}.ndjson", session_id.as_str()))
    }

    /// Open (or append to) the session's recording file, write any seed
    /// events, then spawn a task that drains `rx` until a terminal event or
    /// the channel closes.
    pub async fn start(
        &self,
        session_id: SessionId,
        initial_events: Vec<Event>,
        mut rx: broadcast::Receiver<Event>,
    ) -> Result<(), RecorderError> {
        let path = self.path_for(&session_id);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&path).await?;
        for event in &initial_events {
            write_line(&mut file, event).await?;
        }

        let recorder_session_id = session_id.clone();
        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        let terminal = event_is_terminal(&event.payload);
                        if let Err(e) = write_line(&mut file, &event).await {
                            warn!(session_id = %recorder_session_id, error = %e, "recorder write failed");
                        }
                        if terminal {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(session_id = %recorder_session_id, skipped, "recorder lagged behind event stream");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        self.handles.lock().unwrap().insert(session_id, RecorderHandle { task });
        Ok(())
    }

    /// Unsubscribe and stop recording this session. Idempotent.
    pub fn stop(&self, session_id: &SessionId) {
        if let Some(handle) = self.handles.lock().unwrap().remove(session_id) {
            handle.task.abort();
        }
    }

    /// Stop every active recorder. Called on process shutdown.
    pub fn dispose(&self) {
        let mut handles = self.handles.lock().unwrap();
        for (_, handle) in handles.drain() {
            handle.task.abort();
        }
    }
}
