/// Authoritative table of tracked live games and change detection.
///
/// Entries are overwritten on every reconcile and never removed while a game
/// is live. Only games that are no longer live, no longer polled and untouched
/// for a day are evicted.

use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};

use crate::model::LiveGameSnapshot;
use crate::parser::common::COMPLETE_AFTER_HOURS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChange {
    Started,
    Finished,
}

impl StateChange {
    /// Topic suffix used by notifications.
    pub fn as_str(&self) -> &'static str {
        match self {
            StateChange::Started => "start",
            StateChange::Finished => "end",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Reconciliation {
    pub game_changed: bool,
    pub state_change: Option<StateChange>,
}

#[derive(Debug)]
struct TrackedGame {
    snapshot:   LiveGameSnapshot,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct GameTracker {
    games: HashMap<String, TrackedGame>,
}

impl GameTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compares against the stored snapshot, then stores `snapshot` unconditionally.
    pub fn reconcile(&mut self, snapshot: LiveGameSnapshot, now: DateTime<Utc>) -> Reconciliation {
        let prior = self.games.get(&snapshot.game_id).map(|t| &t.snapshot);

        let game_changed = match prior {
            None => true,
            Some(prev) => !prev.same_as(&snapshot),
        };

        let state_change = match prior {
            None if snapshot.has_started => Some(StateChange::Started),
            None => None,
            Some(prev) => transition(prev, &snapshot),
        };

        self.games.insert(snapshot.game_id.clone(), TrackedGame { snapshot, updated_at: now });
        Reconciliation { game_changed, state_change }
    }

    /// Tracked games ordered by game id.
    pub fn current_live_games(&self) -> Vec<LiveGameSnapshot> {
        let mut games: Vec<LiveGameSnapshot> = self.games.values().map(|t| t.snapshot.clone()).collect();
        games.sort_by(|a, b| a.game_id.cmp(&b.game_id));
        games
    }

    pub fn is_any_game_live(&self) -> bool {
        self.games.values().any(|t| t.snapshot.is_live())
    }

    pub fn live_count(&self) -> usize {
        self.games.values().filter(|t| t.snapshot.is_live()).count()
    }

    /// Drops games outside `polled` that are not live and were last updated a
    /// day or more before `now`. Returns how many were removed.
    pub fn evict_finished(&mut self, polled: &HashSet<String>, now: DateTime<Utc>) -> usize {
        let before = self.games.len();
        let cutoff = now - Duration::hours(COMPLETE_AFTER_HOURS);
        self.games.retain(|id, t| {
            polled.contains(id) || t.snapshot.is_live() || t.updated_at > cutoff
        });
        before - self.games.len()
    }

    pub fn get(&self, game_id: &str) -> Option<&LiveGameSnapshot> {
        self.games.get(game_id).map(|t| &t.snapshot)
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}

fn transition(prev: &LiveGameSnapshot, next: &LiveGameSnapshot) -> Option<StateChange> {
    match (prev.has_started, prev.is_complete, next.has_started, next.is_complete) {
        (false, false, true, false) => Some(StateChange::Started),
        (true, false, true, true) => Some(StateChange::Finished),
        _ => None,
    }
}
