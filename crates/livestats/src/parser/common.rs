use chrono::{DateTime, Datelike, Duration, Utc};
use chrono_tz::Tz;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{LiveStatsError, Result};
use crate::model::GameRef;

/// Upstream feeds sometimes never set their completion flag.
pub const COMPLETE_AFTER_HOURS: i64 = 24;

pub fn has_started(game: &GameRef, now: DateTime<Utc>) -> bool {
    game.has_started_at(now)
}

pub fn is_complete(flag: bool, game: &GameRef, now: DateTime<Utc>) -> bool {
    if flag {
        return true;
    }
    match game.scheduled_start {
        Some(start) if now >= start + Duration::hours(COMPLETE_AFTER_HOURS) => {
            debug!("Game {} marked complete a day after its start", game.game_id);
            true
        }
        _ => false,
    }
}

/// Deserializes a feed document after checking its root element.
pub fn decode_xml<T: DeserializeOwned>(raw: &[u8], root: &str) -> Result<T> {
    let text = String::from_utf8_lossy(raw);
    let found = root_element(&text)?;
    if found != root {
        return Err(LiveStatsError::ParseFailure(format!("expected <{root}>, found <{found}>")));
    }
    Ok(quick_xml::de::from_str(&text)?)
}

fn root_element(text: &str) -> Result<String> {
    let mut reader = Reader::from_str(text);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Ok(String::from_utf8_lossy(e.name().as_ref()).into_owned());
            }
            Ok(Event::Eof) => return Err(LiveStatsError::ParseFailure("empty feed".to_string())),
            Err(e) => return Err(LiveStatsError::ParseFailure(e.to_string())),
            Ok(_) => {}
        }
    }
}

/// Parses a feed date such as `9/21/2019` into (month, day, year).
pub fn parse_feed_date(date: &str) -> Result<(u32, u32, i32)> {
    let parts: Vec<&str> = date.trim().split('/').collect();
    if parts.len() != 3 {
        return Err(LiveStatsError::ParseFailure(format!("bad feed date '{date}'")));
    }
    let bad = |_| LiveStatsError::ParseFailure(format!("bad feed date '{date}'"));
    let month = parts[0].trim().parse::<u32>().map_err(bad)?;
    let day = parts[1].trim().parse::<u32>().map_err(bad)?;
    let year = parts[2].trim().parse::<i32>().map_err(bad)?;
    Ok((month, day, year))
}

/// Fails with `DateMismatch` when the feed's local date is not the game's local date.
/// Games without a scheduled start are not checked.
pub fn check_feed_date(feed_date: &str, game: &GameRef, tz: Tz) -> Result<()> {
    let Some(start) = game.scheduled_start else {
        return Ok(());
    };
    let local = start.with_timezone(&tz);
    let expected = (local.month(), local.day(), local.year());
    let mismatch = || LiveStatsError::DateMismatch {
        feed:     feed_date.to_string(),
        expected: local.format("%m/%d/%Y").to_string(),
    };
    match parse_feed_date(feed_date) {
        Ok(found) if found == expected => Ok(()),
        _ => Err(mismatch()),
    }
}

pub fn ordinal(n: u32) -> String {
    match n {
        1 => "1st".to_string(),
        2 => "2nd".to_string(),
        3 => "3rd".to_string(),
        n => format!("{n}th"),
    }
}

/// Display form of a game clock: `00:00` literally, otherwise `MM:SS remaining`.
pub fn format_clock(clock: &str) -> String {
    match clock {
        "" => String::new(),
        "00:00" => clock.to_string(),
        _ => format!("{clock} remaining"),
    }
}

/// Seconds from an `MM:SS` clock, -1 when it cannot be read.
pub fn clock_seconds(clock: &str) -> i64 {
    let mut parts = clock.trim().split(':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(m), Some(s), None) => match (m.parse::<i64>(), s.parse::<i64>()) {
            (Ok(m), Ok(s)) => m * 60 + s,
            _ => -1,
        },
        _ => -1,
    }
}

pub fn score(raw: &str) -> i64 {
    raw.trim().parse::<i64>().unwrap_or(0)
}
