/// Athletics Live — Logger
/// JSONL audit event stream for the live-stats engine.

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

pub struct EventLogger {
    log_dir: PathBuf,
}

impl EventLogger {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        let dir = log_dir.into();
        fs::create_dir_all(&dir).ok();
        Self { log_dir: dir }
    }

    pub fn log<T: Serialize>(&self, event: &T) -> Result<()> {
        let date  = Utc::now().format("%Y-%m-%d").to_string();
        let path  = self.log_dir.join(format!("{date}.jsonl"));
        let line  = serde_json::to_string(event)?;
        let mut f = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(f, "{line}")?;
        Ok(())
    }

    /// Like `log`, but a failed write is only reported through tracing.
    pub fn record<T: Serialize>(&self, event: &T) {
        if let Err(e) = self.log(event) {
            tracing::warn!("Audit log write failed: {}", e);
        }
    }
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

// ── Event types ───────────────────────────────────────────────────────────────

#[derive(Serialize, Debug)]
pub struct SourceStatusEvent {
    pub ts:       String,
    pub event:    &'static str,   // "SOURCE_STATUS"
    pub game_id:  String,
    pub sport:    String,
    pub source:   String,         // "xml_feed" | "sidearm"
    pub ok:       bool,
    pub message:  Option<String>,
}

#[derive(Serialize, Debug)]
pub struct GameChangedEvent {
    pub ts:             String,
    pub event:          &'static str,   // "GAME_CHANGED"
    pub game_id:        String,
    pub sport:          String,
    pub phase:          String,
    pub home_score:     i64,
    pub visiting_score: i64,
}

#[derive(Serialize, Debug)]
pub struct GameStateChangedEvent {
    pub ts:      String,
    pub event:   &'static str,   // "GAME_STATE_CHANGED"
    pub game_id: String,
    pub sport:   String,
    pub state:   &'static str,   // "start" | "end"
}

#[derive(Serialize, Debug)]
pub struct ScheduleRefreshedEvent {
    pub ts:            String,
    pub event:         &'static str,   // "SCHEDULE_REFRESHED"
    pub total_games:   usize,
    pub next_game_id:  Option<String>,
    pub started_games: usize,
}

#[derive(Serialize, Debug)]
pub struct PollHeartbeatEvent {
    pub ts:            String,
    pub event:         &'static str,   // "POLL_HEARTBEAT"
    pub mode:          &'static str,   // "idle" | "waiting" | "pregame" | "live"
    pub interval_secs: u64,
    pub polled_games:  usize,
    pub loaded_games:  usize,
    pub live_games:    usize,
}
