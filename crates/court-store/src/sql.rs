// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! SQLite-backed store. Durable, single-writer; the `DATABASE_URL` path
//! selects this backend over [`crate::InMemoryStore`].
//!
//! Schema evolution follows a numbered-migration table: each migration is
//! additive, runs once inside its own transaction, and is recorded by
//! version so an existing database on disk is upgraded in place instead of
//! rebuilt.
use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use court_types::{
    CourtError, CreateSessionParams, Event, EventPayload, NewTurn, Phase, RoleAssignments, Session,
    SessionId, SessionMetadata, SessionStatus, Turn, TurnId, VoteSnapshot, VoteSnapshots, VoteType,
    DEFAULT_SENTENCE_VOTE_WINDOW_MS, DEFAULT_VERDICT_VOTE_WINDOW_MS,
};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::broadcast;
use tracing::info;

use crate::error::StoreError;
use crate::store::CourtStore;

const DEFAULT_SENTENCE_OPTIONS: &[&str] = &["Fine", "Probation", "Community Service", "Incarceration"];
const CHANNEL_CAPACITY: usize = 512;

type Migration = (u32, &'static str);

const MIGRATIONS: &[Migration] = &[
    (
        1,
        "CREATE TABLE court_sessions (
            id          TEXT PRIMARY KEY,
            status      TEXT NOT NULL,
            phase       TEXT NOT NULL,
            created_at  TEXT NOT NULL,
            body        TEXT NOT NULL
        );
        CREATE TABLE court_turns (
            id           TEXT PRIMARY KEY,
            session_id   TEXT NOT NULL,
            turn_number  INTEGER NOT NULL,
            created_at   TEXT NOT NULL,
            body         TEXT NOT NULL
        );
        CREATE INDEX court_turns_session_idx ON court_turns(session_id, turn_number);",
    ),
];

fn vote_type_for_phase(phase: Phase) -> Option<VoteType> {
    match phase {
        Phase::VerdictVote => Some(VoteType::Verdict),
        Phase::SentenceVote => Some(VoteType::Sentence),
        _ => None,
    }
}

fn run_migrations(conn: &mut Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS court_schema_migrations (
            version     INTEGER PRIMARY KEY,
            applied_at  TEXT NOT NULL
        );",
    )?;
    let applied: u32 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM court_schema_migrations", [], |r| r.get(0))?;
    for (version, sql) in MIGRATIONS {
        if *version <= applied {
            continue;
        }
        let tx = conn.transaction()?;
        tx.execute_batch(sql)?;
        tx.execute(
            "INSERT INTO court_schema_migrations (version, applied_at) VALUES (?1, ?2)",
            params![version, Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;
        info!(version, "applied court-store migration");
    }
    Ok(())
}

fn session_from_row(row: &rusqlite::Row) -> rusqlite::Result<Session> {
    let body: String = row.get("body")?;
    serde_json::from_str(&body).map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))
}

/// Durable session store backed by a single SQLite file.
pub struct SqlStore {
    conn: Mutex<Connection>,
    channels: RwLock<HashMap<SessionId, broadcast::Sender<Event>>>,
}

impl SqlStore {
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let mut conn = Connection::open(path)?;
        run_migrations(&mut conn)?;
        Ok(Self { conn: Mutex::new(conn), channels: RwLock::new(HashMap::new()) })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let mut conn = Connection::open_in_memory()?;
        run_migrations(&mut conn)?;
        Ok(Self { conn: Mutex::new(conn), channels: RwLock::new(HashMap::new()) })
    }

    fn sender_for(&self, id: &SessionId) -> broadcast::Sender<Event> {
        if let Some(tx) = self.channels.read().unwrap().get(id) {
            return tx.clone();
        }
        let mut channels = self.channels.write().unwrap();
        channels.entry(id.clone()).or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0).clone()
    }

    fn emit(&self, session_id: &SessionId, payload: EventPayload) {
        let event = Event::new(session_id.clone(), Utc::now(), payload);
        let _ = self.sender_for(session_id).send(event);
    }

    fn load_session(conn: &Connection, id: &SessionId) -> Result<Session, StoreError> {
        conn.query_row("SELECT body FROM court_sessions WHERE id = ?1", params![id.as_str()], session_from_row)
            .optional()?
            .ok_or(StoreError::Validation(CourtError::SessionNotFound))
    }

    fn store_session(conn: &Connection, session: &Session) -> Result<(), StoreError> {
        let body = serde_json::to_string(session).map_err(|e| StoreError::Internal(e.to_string()))?;
        conn.execute(
            "INSERT INTO court_sessions (id, status, phase, created_at, body)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET status = excluded.status, phase = excluded.phase, body = excluded.body",
            params![
                session.id.as_str(),
                format!("{:?}", session.status),
                session.phase.as_str(),
                session.created_at.to_rfc3339(),
                body,
            ],
        )?;
        Ok(())
    }
}

#[async_trait]
impl CourtStore for SqlStore {
    async fn create_session(&self, params: CreateSessionParams) -> Result<Session, StoreError> {
        if params.topic.trim().len() < 10 {
            return Err(StoreError::Validation(CourtError::InvalidTopic));
        }
        let moderation = court_moderation::moderate(&params.topic);
        if moderation.flagged {
            return Err(StoreError::Validation(CourtError::TopicRejected { reasons: moderation.reasons }));
        }

        let roles = params.participants.unwrap_or_else(RoleAssignments::default_assignments);
        let sentence_options = params
            .sentence_options
            .unwrap_or_else(|| DEFAULT_SENTENCE_OPTIONS.iter().map(|s| s.to_string()).collect());

        let session = Session {
            id: SessionId::new(),
            topic: params.topic,
            status: SessionStatus::Pending,
            phase: Phase::CasePrompt,
            turn_ids: Vec::new(),
            roles,
            verdict_votes: HashMap::new(),
            sentence_votes: HashMap::new(),
            recap_turn_ids: Vec::new(),
            final_ruling: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            failure_reason: None,
            metadata: SessionMetadata {
                case_type: params.case_type,
                sentence_options,
                verdict_vote_window_ms: params.verdict_vote_window_ms.unwrap_or(DEFAULT_VERDICT_VOTE_WINDOW_MS),
                sentence_vote_window_ms: params.sentence_vote_window_ms.unwrap_or(DEFAULT_SENTENCE_VOTE_WINDOW_MS),
                vote_snapshots: VoteSnapshots::default(),
            },
        };

        {
            let mut conn = self.conn.lock().unwrap();
            let tx = conn.transaction()?;
            Self::store_session(&tx, &session)?;
            tx.commit()?;
        }
        self.emit(&session.id, EventPayload::SessionCreated { topic: session.topic.clone(), case_type: session.metadata.case_type });
        Ok(session)
    }

    async fn start_session(&self, id: &SessionId) -> Result<Session, StoreError> {
        let (session, started_at) = {
            let mut conn = self.conn.lock().unwrap();
            let tx = conn.transaction()?;
            let mut session = Self::load_session(&tx, id)?;
            if session.status != SessionStatus::Pending {
                tx.commit()?;
                return Ok(session);
            }
            session.status = SessionStatus::Running;
            let started_at = Utc::now();
            session.started_at = Some(started_at);
            Self::store_session(&tx, &session)?;
            tx.commit()?;
            (session, started_at)
        };
        self.emit(id, EventPayload::SessionStarted { started_at });
        Ok(session)
    }

    async fn set_phase(&self, id: &SessionId, target: Phase, phase_duration_ms: Option<u64>) -> Result<Session, StoreError> {
        enum Effect {
            None,
            Closed { vote_type: VoteType, closed_at: chrono::DateTime<Utc>, votes: HashMap<String, u32> },
        }

        let (session, from, effect) = {
            let mut conn = self.conn.lock().unwrap();
            let tx = conn.transaction()?;
            let mut session = Self::load_session(&tx, id)?;
            let from = session.phase;

            if !Phase::is_legal_transition(from, target) {
                return Err(StoreError::Validation(CourtError::InvalidPhaseTransition {
                    from: from.to_string(),
                    to: target.to_string(),
                }));
            }
            if from == target {
                tx.commit()?;
                return Ok(session);
            }

            let effect = if let Some(vote_type) = vote_type_for_phase(from) {
                let votes = session.tally_for(vote_type).clone();
                let closed_at = Utc::now();
                session.metadata.vote_snapshots.set(vote_type, VoteSnapshot { closed_at, votes: votes.clone() });
                Effect::Closed { vote_type, closed_at, votes }
            } else {
                Effect::None
            };

            session.phase = target;
            Self::store_session(&tx, &session)?;
            tx.commit()?;
            (session, from, effect)
        };

        if let Effect::Closed { vote_type, closed_at, votes } = effect {
            self.emit(id, EventPayload::VoteClosed { vote_type, closed_at, votes, next_phase: target });
            self.emit(
                id,
                EventPayload::AnalyticsEvent { name: "poll_closed".to_string(), poll_type: Some(vote_type), phase: Some(target), choice: None },
            );
        }
        self.emit(id, EventPayload::PhaseChanged { from, to: target, phase_duration_ms });
        if let Some(vote_type) = vote_type_for_phase(target) {
            self.emit(
                id,
                EventPayload::AnalyticsEvent { name: "poll_started".to_string(), poll_type: Some(vote_type), phase: Some(target), choice: None },
            );
        }

        Ok(session)
    }

    async fn add_turn(&self, new_turn: NewTurn) -> Result<Turn, StoreError> {
        let turn = {
            let mut conn = self.conn.lock().unwrap();
            let tx = conn.transaction()?;
            let mut session = Self::load_session(&tx, &new_turn.session_id)?;

            let turn = Turn {
                id: TurnId::new(),
                session_id: new_turn.session_id.clone(),
                turn_number: session.turn_count(),
                speaker: new_turn.speaker,
                role: new_turn.role,
                phase: new_turn.phase,
                dialogue: new_turn.dialogue,
                created_at: Utc::now(),
                moderation: new_turn.moderation,
            };
            session.turn_ids.push(turn.id.clone());
            Self::store_session(&tx, &session)?;

            let body = serde_json::to_string(&turn).map_err(|e| StoreError::Internal(e.to_string()))?;
            tx.execute(
                "INSERT INTO court_turns (id, session_id, turn_number, created_at, body) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![turn.id.as_str(), turn.session_id.as_str(), turn.turn_number as i64, turn.created_at.to_rfc3339(), body],
            )?;
            tx.commit()?;
            turn
        };

        self.emit(&turn.session_id, EventPayload::Turn { turn: turn.clone() });
        if let Some(annotation) = &turn.moderation {
            if !annotation.reasons.is_empty() {
                self.emit(
                    &turn.session_id,
                    EventPayload::ModerationAction {
                        turn_id: turn.id.clone(),
                        speaker: turn.speaker.clone(),
                        reasons: annotation.reasons.clone(),
                        phase: turn.phase,
                    },
                );
            }
        }
        Ok(turn)
    }

    async fn cast_vote(&self, session_id: &SessionId, vote_type: VoteType, choice: &str) -> Result<Session, StoreError> {
        let session = {
            let mut conn = self.conn.lock().unwrap();
            let tx = conn.transaction()?;
            let mut session = Self::load_session(&tx, session_id)?;

            if session.phase != vote_type.phase() {
                return Err(StoreError::Validation(CourtError::VoteRejected));
            }
            if !session.allowed_vote_choices(vote_type).iter().any(|c| c == choice) {
                return Err(StoreError::Validation(CourtError::VoteRejected));
            }
            *session.tally_for_mut(vote_type).entry(choice.to_string()).or_insert(0) += 1;
            Self::store_session(&tx, &session)?;
            tx.commit()?;
            session
        };

        self.emit(
            session_id,
            EventPayload::VoteUpdated {
                vote_type,
                choice: choice.to_string(),
                verdict_votes: session.verdict_votes.clone(),
                sentence_votes: session.sentence_votes.clone(),
            },
        );
        self.emit(
            session_id,
            EventPayload::AnalyticsEvent {
                name: "vote_completed".to_string(),
                poll_type: Some(vote_type),
                phase: None,
                choice: Some(choice.to_string()),
            },
        );
        Ok(session)
    }

    async fn record_recap(&self, session_id: &SessionId, turn_id: TurnId, cycle_number: u32) -> Result<(), StoreError> {
        {
            let mut conn = self.conn.lock().unwrap();
            let tx = conn.transaction()?;
            let mut session = Self::load_session(&tx, session_id)?;
            session.add_recap_turn(turn_id.clone());
            Self::store_session(&tx, &session)?;
            tx.commit()?;
        }
        self.emit(session_id, EventPayload::JudgeRecapEmitted { turn_id, cycle_number });
        Ok(())
    }

    async fn record_final_ruling(&self, session_id: &SessionId, verdict: String, sentence: String) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let mut session = Self::load_session(&tx, session_id)?;
        session.final_ruling = Some(court_types::FinalRuling { verdict, sentence, decided_at: Utc::now() });
        Self::store_session(&tx, &session)?;
        tx.commit()?;
        Ok(())
    }

    async fn complete_session(&self, id: &SessionId) -> Result<(), StoreError> {
        let completed_at = {
            let mut conn = self.conn.lock().unwrap();
            let tx = conn.transaction()?;
            let mut session = Self::load_session(&tx, id)?;
            if matches!(session.status, SessionStatus::Completed | SessionStatus::Failed) {
                tx.commit()?;
                return Ok(());
            }
            let completed_at = Utc::now();
            session.status = SessionStatus::Completed;
            session.completed_at = Some(completed_at);
            Self::store_session(&tx, &session)?;
            tx.commit()?;
            completed_at
        };
        self.emit(id, EventPayload::SessionCompleted { completed_at });
        Ok(())
    }

    async fn fail_session(&self, id: &SessionId, reason: String) -> Result<(), StoreError> {
        let failed_at = {
            let mut conn = self.conn.lock().unwrap();
            let tx = conn.transaction()?;
            let mut session = Self::load_session(&tx, id)?;
            if matches!(session.status, SessionStatus::Completed | SessionStatus::Failed) {
                tx.commit()?;
                return Ok(());
            }
            let failed_at = Utc::now();
            session.status = SessionStatus::Failed;
            session.failure_reason = Some(reason.clone());
            Self::store_session(&tx, &session)?;
            tx.commit()?;
            failed_at
        };
        self.emit(id, EventPayload::SessionFailed { reason, failed_at });
        Ok(())
    }

    async fn emit_event(&self, session_id: &SessionId, payload: EventPayload) -> Result<(), StoreError> {
        // Confirm the session exists before fanning the event out.
        let conn = self.conn.lock().unwrap();
        Self::load_session(&conn, session_id)?;
        drop(conn);
        self.emit(session_id, payload);
        Ok(())
    }

    fn subscribe(&self, session_id: &SessionId) -> Option<broadcast::Receiver<Event>> {
        let conn = self.conn.lock().unwrap();
        if Self::load_session(&conn, session_id).is_err() {
            return None;
        }
        drop(conn);
        Some(self.sender_for(session_id).subscribe())
    }

    async fn list_sessions(&self) -> Result<Vec<Session>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT body FROM court_sessions ORDER BY created_at ASC")?;
        let rows = stmt.query_map([], session_from_row)?;
        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row?);
        }
        Ok(sessions)
    }

    async fn get_session(&self, id: &SessionId) -> Result<Option<Session>, StoreError> {
        let conn = self.conn.lock().unwrap();
        Ok(conn.query_row("SELECT body FROM court_sessions WHERE id = ?1", params![id.as_str()], session_from_row).optional()?)
    }

    async fn recover_interrupted_sessions(&self) -> Result<Vec<SessionId>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT id FROM court_sessions WHERE status = ?1")?;
        let rows = stmt.query_map(params![format!("{:?}", SessionStatus::Running)], |row| {
            let id: String = row.get(0)?;
            Ok(SessionId::from(id))
        })?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }
}
