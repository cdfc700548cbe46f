/// Vendor "current live games" JSON, used for every sport without an XML feed
/// and as the fallback for those that have one.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::common;
use crate::error::{LiveStatsError, Result};
use crate::model::{CustomData, GameRef, LiveGameSnapshot, Phase};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct VendorGames {
    #[serde(default)]
    games: Vec<VendorGame>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct VendorGame {
    game_id:            i64,
    #[serde(default)]
    has_started:        bool,
    #[serde(default)]
    is_complete:        bool,
    #[serde(default)]
    clock_seconds:      i64,
    #[serde(default)]
    periods_regulation: i64,
    #[serde(default)]
    period:             i64,
    #[serde(default)]
    home_team:          VendorTeam,
    #[serde(default)]
    visiting_team:      VendorTeam,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct VendorTeam {
    #[serde(default)]
    score: i64,
}

pub fn parse(raw: &[u8], game: &GameRef, now: DateTime<Utc>) -> Result<LiveGameSnapshot> {
    let feed: VendorGames = serde_json::from_slice(raw)?;
    if feed.games.is_empty() {
        return Err(LiveStatsError::ParseFailure("vendor feed lists no games".to_string()));
    }
    let entry = feed
        .games
        .iter()
        .find(|g| g.game_id.to_string() == game.game_id)
        .ok_or_else(|| {
            LiveStatsError::ParseFailure(format!("game {} not in vendor feed", game.game_id))
        })?;

    let has_started = entry.has_started;
    let is_complete = common::is_complete(entry.is_complete, game, now);

    Ok(LiveGameSnapshot {
        game_id: game.game_id.clone(),
        sport: game.sport.clone(),
        has_started,
        is_complete,
        phase: phase(entry, has_started, is_complete),
        clock_seconds: entry.clock_seconds,
        period: entry.period,
        home_score: entry.home_team.score,
        visiting_score: entry.visiting_team.score,
        custom: CustomData::None,
    })
}

fn phase(entry: &VendorGame, has_started: bool, is_complete: bool) -> Phase {
    if !has_started {
        return Phase::Pre;
    }
    if is_complete {
        return Phase::Final;
    }
    if entry.periods_regulation > 0 && entry.period > entry.periods_regulation {
        return Phase::Overtime;
    }
    Phase::Period(entry.period.max(1) as u32)
}
