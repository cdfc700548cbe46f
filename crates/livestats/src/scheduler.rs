/// Adaptive polling cadence for the live-stats loop.

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::schedule::PollingWindow;

pub const LIVE_INTERVAL:    Duration = Duration::from_secs(3);
pub const PREGAME_INTERVAL: Duration = Duration::from_secs(5);
/// Tight retry while no schedule data is available yet.
pub const IDLE_INTERVAL:    Duration = Duration::from_secs(5);
pub const MAX_WAIT:         Duration = Duration::from_secs(60 * 60);
pub const PREGAME_LEAD_MINUTES: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Idle,
    Waiting,
    PreGame,
    Live,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Idle => "idle",
            Mode::Waiting => "waiting",
            Mode::PreGame => "pregame",
            Mode::Live => "live",
        }
    }
}

pub fn mode(any_live: bool, window: &PollingWindow, now: DateTime<Utc>) -> Mode {
    if any_live {
        return Mode::Live;
    }
    let Some(next) = &window.next_game else {
        return Mode::Idle;
    };
    match next.scheduled_start {
        Some(start) if now < start - chrono::Duration::minutes(PREGAME_LEAD_MINUTES) => Mode::Waiting,
        _ => Mode::PreGame,
    }
}

/// Current mode and how long to wait before the next tick.
pub fn poll_interval(any_live: bool, window: &PollingWindow, now: DateTime<Utc>) -> (Mode, Duration) {
    let mode = mode(any_live, window, now);
    let interval = match mode {
        Mode::Live => LIVE_INTERVAL,
        Mode::PreGame => PREGAME_INTERVAL,
        Mode::Idle => IDLE_INTERVAL,
        Mode::Waiting => window
            .next_game
            .as_ref()
            .and_then(|g| g.scheduled_start)
            .and_then(|start| (start - chrono::Duration::minutes(PREGAME_LEAD_MINUTES) - now).to_std().ok())
            .filter(|d| !d.is_zero())
            .map(|d| d.min(MAX_WAIT))
            .unwrap_or(PREGAME_INTERVAL),
    };
    (mode, interval)
}
