// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use court_types::CaseType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CaseTypeArg {
    Criminal,
    Civil,
}

impl From<CaseTypeArg> for CaseType {
    fn from(value: CaseTypeArg) -> Self {
        match value {
            CaseTypeArg::Criminal => CaseType::Criminal,
            CaseTypeArg::Civil => CaseType::Civil,
        }
    }
}

/// `court sessions` subcommands — the local demo surface for the session
/// runtime. This is dev tooling only; it does not implement the HTTP/SSE
/// gateway described in the external-interfaces section of the design.
#[derive(Subcommand, Debug)]
pub enum SessionsCommands {
    /// Create a session and drive it end to end on the in-memory store with
    /// the mock generation path, printing each emitted event as one JSON
    /// object per line.
    Run {
        /// The case topic. Must be at least 10 characters and pass the
        /// moderation screen. Omit to have one drawn from the static
        /// prompt bank (`court-catalog`).
        topic: Option<String>,

        /// Criminal (guilty/not_guilty) or civil (liable/not_liable).
        #[arg(long, value_enum, default_value = "criminal")]
        case_type: CaseTypeArg,

        /// Cast a fixed verdict vote partway through, to exercise the poll
        /// path without a human in the loop.
        #[arg(long)]
        auto_verdict: Option<String>,

        /// Cast a fixed sentence vote partway through.
        #[arg(long)]
        auto_sentence: Option<String>,

        /// Also write an NDJSON recording under RECORDINGS_DIR.
        #[arg(long)]
        record: bool,
    },

    /// Replay a previously recorded NDJSON session, printing each frame
    /// after its computed delay.
    Replay {
        /// Path to a `${sessionId}.ndjson` recording.
        #[arg(long)]
        file: PathBuf,

        /// Playback speed multiplier (>1 is faster). Non-positive or
        /// non-finite values are clamped to 1.
        #[arg(long, default_value_t = 1.0)]
        speed: f64,
    },
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create, run, and replay court sessions.
    Sessions {
        #[command(subcommand)]
        command: SessionsCommands,
    },
}

/// Local dev CLI for the court session runtime.
#[derive(Parser, Debug)]
#[command(name = "court", version, about = "Scripted multi-agent courtroom session runtime")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose tracing to stderr.
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}
