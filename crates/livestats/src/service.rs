/// Live stats engine: owns the shared polling state and runs the background loops.

use chrono::{DateTime, Utc};
use logger::{
    now_iso, EventLogger, GameChangedEvent, GameStateChangedEvent, PollHeartbeatEvent,
    ScheduleRefreshedEvent,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ConfigStore;
use crate::error::Result;
use crate::model::{GameRef, LiveGameSnapshot};
use crate::notify::{self, Message, NotificationDispatcher};
use crate::router::SourceRouter;
use crate::schedule::{self, PollingWindow, ScheduleClient, ScheduledGame};
use crate::scheduler::{self, Mode};
use crate::tracker::{GameTracker, Reconciliation, StateChange};

pub const SCHEDULE_REFRESH: Duration = Duration::from_secs(60 * 60);

/// Everything the loops share. Guarded by one lock, never held across an await.
#[derive(Default)]
struct SharedState {
    window:   PollingWindow,
    tracker:  GameTracker,
    schedule: Vec<ScheduledGame>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    pub polled:        usize,
    pub loaded:        usize,
    pub notifications: usize,
}

pub struct LiveStatsService {
    router:     SourceRouter,
    dispatcher: Arc<dyn NotificationDispatcher>,
    config:     Arc<ConfigStore>,
    team_name:  String,
    audit:      Option<Arc<EventLogger>>,
    state:      Mutex<SharedState>,
}

impl LiveStatsService {
    pub fn new(
        router: SourceRouter,
        dispatcher: Arc<dyn NotificationDispatcher>,
        config: Arc<ConfigStore>,
        team_name: impl Into<String>,
    ) -> Self {
        Self {
            router,
            dispatcher,
            config,
            team_name: team_name.into(),
            audit: None,
            state: Mutex::new(SharedState::default()),
        }
    }

    pub fn with_audit(mut self, audit: Arc<EventLogger>) -> Self {
        self.audit = Some(audit);
        self
    }

    // ── Read side ─────────────────────────────────────────────────────────────

    pub fn live_games(&self) -> Vec<LiveGameSnapshot> {
        self.state.lock().tracker.current_live_games()
    }

    /// Tracked games in the flat wire form.
    pub fn live_games_wire(&self) -> Vec<HashMap<String, String>> {
        self.live_games().iter().map(LiveGameSnapshot::encode).collect()
    }

    pub fn is_any_game_live(&self) -> bool {
        self.state.lock().tracker.is_any_game_live()
    }

    pub fn polling_window(&self) -> PollingWindow {
        self.state.lock().window.clone()
    }

    pub fn cached_schedule(&self) -> Vec<ScheduledGame> {
        self.state.lock().schedule.clone()
    }

    pub fn next_interval(&self, now: DateTime<Utc>) -> (Mode, Duration) {
        let state = self.state.lock();
        scheduler::poll_interval(state.tracker.is_any_game_live(), &state.window, now)
    }

    // ── Config ────────────────────────────────────────────────────────────────

    pub fn update_config(&self, raw: &[u8]) -> Result<()> {
        self.config.update(raw)
    }

    pub fn config_json(&self) -> Result<String> {
        self.config.to_json()
    }

    // ── Schedule ──────────────────────────────────────────────────────────────

    /// Replaces the cached schedule and polling window in one step.
    ///
    /// An empty schedule keeps the previous window. Games still live in the
    /// tracker stay in `started_games` even when the new schedule no longer
    /// lists them (a game running past local midnight).
    pub fn apply_schedule(&self, games: Vec<ScheduledGame>, now: DateTime<Utc>) -> PollingWindow {
        if games.is_empty() {
            warn!("Schedule refresh returned no games, keeping the previous polling window");
            return self.state.lock().window.clone();
        }
        let mut window = schedule::resolve(&games, now);

        let (carried, evicted, total) = {
            let mut state = self.state.lock();
            let scheduled: HashSet<String> = window.games_to_poll().into_iter().map(|g| g.game_id).collect();
            let carried: Vec<GameRef> = state
                .window
                .games_to_poll()
                .into_iter()
                .filter(|g| !scheduled.contains(&g.game_id))
                .filter(|g| state.tracker.get(&g.game_id).map(LiveGameSnapshot::is_live).unwrap_or(false))
                .collect();
            window.started_games.extend(carried.iter().cloned());

            let polled: HashSet<String> = window.games_to_poll().into_iter().map(|g| g.game_id).collect();
            let evicted = state.tracker.evict_finished(&polled, now);
            state.schedule = games;
            state.window = window.clone();
            (carried.len(), evicted, state.schedule.len())
        };
        if carried > 0 {
            info!("Still polling {} live games missing from the refreshed schedule", carried);
        }
        if evicted > 0 {
            debug!("Evicted {} finished games from the tracker", evicted);
        }

        info!(
            "Schedule refreshed: {} games, next={:?}, started={}",
            total,
            window.next_game.as_ref().map(|g| &g.game_id),
            window.started_games.len()
        );
        self.audit(&ScheduleRefreshedEvent {
            ts:            now_iso(),
            event:         "SCHEDULE_REFRESHED",
            total_games:   total,
            next_game_id:  window.next_game.as_ref().map(|g| g.game_id.clone()),
            started_games: window.started_games.len(),
        });
        window
    }

    pub async fn refresh_schedule(&self, client: &ScheduleClient, now: DateTime<Utc>) -> Result<PollingWindow> {
        let tz = self.config.current().venue_tz()?;
        let games = client.fetch_upcoming(now, tz).await?;
        Ok(self.apply_schedule(games, now))
    }

    // ── Live poll ─────────────────────────────────────────────────────────────

    /// Loads every game in the window once, reconciles and notifies.
    pub async fn poll_once(&self, now: DateTime<Utc>) -> TickReport {
        let games = self.state.lock().window.games_to_poll();
        let config = self.config.current();
        let mut report = TickReport { polled: games.len(), ..TickReport::default() };

        for game in &games {
            let snapshot = match self.router.load(game, &config, now).await {
                Ok(s) => s,
                Err(e) => {
                    warn!("Skipping game {} this tick: {}", game.game_id, e);
                    continue;
                }
            };
            report.loaded += 1;

            let outcome = self.state.lock().tracker.reconcile(snapshot.clone(), now);
            let messages = self.messages_for(&snapshot, game, outcome, &config.notification_config);
            for message in messages {
                if let Err(e) = self.dispatcher.dispatch(&message).await {
                    warn!("Notification to {} failed: {}", message.topic, e);
                }
                report.notifications += 1;
            }
        }
        report
    }

    fn messages_for(
        &self,
        snapshot: &LiveGameSnapshot,
        game: &GameRef,
        outcome: Reconciliation,
        templates: &crate::config::NotificationConfig,
    ) -> Vec<Message> {
        let mut messages = Vec::new();
        if outcome.game_changed {
            debug!("Game {} changed", snapshot.game_id);
            self.audit(&GameChangedEvent {
                ts:             now_iso(),
                event:          "GAME_CHANGED",
                game_id:        snapshot.game_id.clone(),
                sport:          snapshot.sport.clone(),
                phase:          snapshot.phase.code(),
                home_score:     snapshot.home_score,
                visiting_score: snapshot.visiting_score,
            });
            messages.push(notify::game_changed_message(snapshot));
        }
        if let Some(change) = outcome.state_change {
            info!(
                "Game {} ({}) {}",
                snapshot.game_id,
                snapshot.sport,
                match change {
                    StateChange::Started => "started",
                    StateChange::Finished => "finished",
                }
            );
            self.audit(&GameStateChangedEvent {
                ts:      now_iso(),
                event:   "GAME_STATE_CHANGED",
                game_id: snapshot.game_id.clone(),
                sport:   snapshot.sport.clone(),
                state:   change.as_str(),
            });
            messages.push(notify::state_change_message(snapshot, game, change, &self.team_name, templates));
        }
        messages
    }

    // ── Background loops ──────────────────────────────────────────────────────

    /// Adaptive live-stats loop. Ticks run one after another, never overlapping.
    pub async fn run_live_loop(self: Arc<Self>, cancel: CancellationToken) {
        info!("Live stats loop started");
        while !cancel.is_cancelled() {
            let has_data = self.state.lock().window.has_data();
            let report = if has_data {
                self.poll_once(Utc::now()).await
            } else {
                debug!("No schedule data yet, nothing to poll");
                TickReport::default()
            };

            let (mode, interval) = self.next_interval(Utc::now());
            let live = self.state.lock().tracker.live_count();
            self.audit(&PollHeartbeatEvent {
                ts:            now_iso(),
                event:         "POLL_HEARTBEAT",
                mode:          mode.as_str(),
                interval_secs: interval.as_secs(),
                polled_games:  report.polled,
                loaded_games:  report.loaded,
                live_games:    live,
            });
            debug!("Mode {} - next poll in {:?}", mode.as_str(), interval);

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }
        info!("Live stats loop stopped");
    }

    /// Hourly schedule refresh.
    pub async fn run_schedule_loop(self: Arc<Self>, client: ScheduleClient, cancel: CancellationToken) {
        info!("Schedule refresh loop started");
        while !cancel.is_cancelled() {
            if let Err(e) = self.refresh_schedule(&client, Utc::now()).await {
                warn!("Schedule refresh failed: {}", e);
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(SCHEDULE_REFRESH) => {}
            }
        }
        info!("Schedule refresh loop stopped");
    }

    fn audit<T: serde::Serialize>(&self, event: &T) {
        if let Some(audit) = &self.audit {
            audit.record(event);
        }
    }
}
