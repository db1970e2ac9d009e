// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Per-session orchestration coroutine.
mod error;
mod objections;
mod random_events;
mod ruling;
mod runtime;
mod speaker;
mod tts;
mod witness_cap;

pub use error::OrchestratorError;
pub use random_events::{roll_random_event, RandomEvent};
pub use ruling::argmax_over_legal_choices;
pub use runtime::{InstantSleeper, SessionRuntime, Sleeper, TokioSleeper};
pub use speaker::{select_first_speaker, select_next_speaker};
pub use tts::{build_tts_adapter, safely_speak, MockTts, NoopTts, TtsAdapter, TtsStats};
pub use witness_cap::{apply_witness_cap, WitnessCapResult};
