// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::path::Path;

use court_types::{Event, EventPayload, SessionId};
use tracing::warn;

use crate::error::RecorderError;

/// One replayable event with its cumulative delay from stream start.
#[derive(Debug, Clone)]
pub struct ReplayFrame {
    pub event: Event,
    pub delay_ms: u64,
}

fn clamp_speed(speed: f64) -> f64 {
    if speed.is_finite() && speed > 0.0 {
        speed
    } else {
        1.0
    }
}

/// Read an NDJSON recording, skipping malformed lines, and compute each
/// frame's cumulative delay from the first event, scaled by `speed`.
pub fn load_replay_recording(file_path: &Path, speed: f64) -> Result<Vec<ReplayFrame>, RecorderError> {
    let speed = clamp_speed(speed);
    let text = std::fs::read_to_string(file_path)?;

    let mut events = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Event>(line) {
            Ok(event) => events.push(event),
            Err(e) => warn!(error = %e, "skipping malformed replay line"),
        }
    }

    let mut frames = Vec::with_capacity(events.len());
    let mut cumulative_ms: f64 = 0.0;
    for (i, event) in events.iter().enumerate() {
        if i > 0 {
            let delta_ms = (event.at - events[i - 1].at).num_milliseconds().max(0) as f64;
            cumulative_ms += delta_ms / speed;
        }
        frames.push(ReplayFrame { event: event.clone(), delay_ms: cumulative_ms.round() as u64 });
    }
    Ok(frames)
}

/// Clone `event`, substituting `new_id` at the top level and in any nested
/// `turn.sessionId` payload field. The source event is left untouched.
pub fn rewrite_replay_event_for_session(event: &Event, new_id: &SessionId) -> Event {
    let mut rewritten = event.clone();
    rewritten.session_id = new_id.clone();
    if let EventPayload::Turn { turn } = &mut rewritten.payload {
        turn.session_id = new_id.clone();
    }
    rewritten
}
