/// Schedule source client and the next-game resolver.

use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer};
use tracing::{debug, warn};

use crate::error::{LiveStatsError, Result};
use crate::fetch::http;
use crate::model::GameRef;

const SCHEDULE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Schedule {
    #[serde(rename = "schedule", default)]
    pub games: Vec<ScheduledGame>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduledGame {
    #[serde(deserialize_with = "string_or_number")]
    pub id:           String,
    #[serde(default)]
    pub datetime_utc: String,
    #[serde(default)]
    pub sport:        Option<ScheduledSport>,
    #[serde(default)]
    pub location:     Option<ScheduledLocation>,
    #[serde(default)]
    pub opponent:     Option<ScheduledOpponent>,
    #[serde(default)]
    pub links:        Option<ScheduledLinks>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduledSport {
    #[serde(default)]
    pub shortname: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduledLocation {
    #[serde(rename = "HAN", default)]
    pub han: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduledOpponent {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduledLinks {
    #[serde(default)]
    pub livestats: String,
}

fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    let value = serde_json::Value::deserialize(d)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

impl ScheduledGame {
    pub fn has_livestats(&self) -> bool {
        self.links.as_ref().map(|l| !l.livestats.is_empty()).unwrap_or(false)
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        NaiveDateTime::parse_from_str(&self.datetime_utc, SCHEDULE_TIME_FORMAT)
            .map(|t| t.and_utc())
            .ok()
    }

    pub fn to_game_ref(&self, start: DateTime<Utc>) -> GameRef {
        GameRef {
            game_id:         self.id.clone(),
            sport:           self.sport.as_ref().map(|s| s.shortname.clone()).unwrap_or_default(),
            scheduled_start: Some(start),
            is_home:         self.location.as_ref().map(|l| l.han == "H").unwrap_or(false),
            opponent_name:   self.opponent.as_ref().map(|o| o.name.clone()).unwrap_or_default(),
        }
    }
}

// ── Resolver ──────────────────────────────────────────────────────────────────

/// Games the live poller should look at until the next schedule refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollingWindow {
    pub next_game:     Option<GameRef>,
    pub started_games: Vec<GameRef>,
}

impl PollingWindow {
    pub fn has_data(&self) -> bool {
        self.next_game.is_some() || !self.started_games.is_empty()
    }

    /// Started games plus the next game.
    pub fn games_to_poll(&self) -> Vec<GameRef> {
        let mut games = self.started_games.clone();
        if let Some(next) = &self.next_game {
            games.push(next.clone());
        }
        games
    }
}

/// Walks the schedule in order. The first live-stats game in the future becomes
/// `next_game`; every live-stats game already past its start goes to `started_games`.
pub fn resolve(schedule: &[ScheduledGame], now: DateTime<Utc>) -> PollingWindow {
    let mut window = PollingWindow::default();
    for game in schedule.iter().filter(|g| g.has_livestats()) {
        let Some(start) = game.start() else {
            warn!("Schedule game {} has unreadable datetime_utc '{}'", game.id, game.datetime_utc);
            continue;
        };
        if start > now {
            if window.next_game.is_none() {
                window.next_game = Some(game.to_game_ref(start));
            }
        } else {
            window.started_games.push(game.to_game_ref(start));
        }
    }
    debug!(
        "Resolved next={:?} started={}",
        window.next_game.as_ref().map(|g| &g.game_id),
        window.started_games.len()
    );
    window
}

// ── Client ────────────────────────────────────────────────────────────────────

pub struct ScheduleClient {
    client: reqwest::Client,
    host:   String,
}

impl ScheduleClient {
    pub fn new(host: impl Into<String>, timeout: std::time::Duration) -> Result<Self> {
        Ok(Self { client: http::build_client(timeout)?, host: host.into() })
    }

    pub fn url_for(&self, now: DateTime<Utc>, tz: Tz) -> String {
        let local_day = now.with_timezone(&tz).format("%m/%d/%Y");
        format!(
            "{}/services/schedule_xml_2.aspx?format=json&starting={}",
            self.host.trim_end_matches('/'),
            local_day
        )
    }

    /// Schedule starting at today's venue-local date.
    pub async fn fetch_upcoming(&self, now: DateTime<Utc>, tz: Tz) -> Result<Vec<ScheduledGame>> {
        let body = http::get_bytes(&self.client, &self.url_for(now, tz)).await?;
        let schedule: Schedule = serde_json::from_slice(&body)
            .map_err(|e| LiveStatsError::ParseFailure(format!("schedule: {e}")))?;
        Ok(schedule.games)
    }
}
