/// Football XML feed (`<fbgame>`).

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::common;
use crate::config::{SourcePriorityConfig, SportFeedConfig};
use crate::error::Result;
use crate::model::{CustomData, FootballCustom, GameRef, LiveGameSnapshot, Phase};

/// Shown before the first play of the game has been logged.
const OPENING_CLOCK: &str = "15:00";
const OVERTIME_QUARTER: u32 = 5;

#[derive(Debug, Default, Deserialize)]
struct FbGame {
    #[serde(default)]
    venue:  Venue,
    #[serde(default)]
    plays:  FbPlays,
    #[serde(default)]
    scores: FbScores,
}

#[derive(Debug, Default, Deserialize)]
struct Venue {
    #[serde(rename = "@date", default)]
    date: String,
}

#[derive(Debug, Default, Deserialize)]
struct FbPlays {
    #[serde(rename = "qtr", default)]
    quarters: Vec<FbQuarter>,
    #[serde(default)]
    downtogo: Downtogo,
}

#[derive(Debug, Default, Deserialize)]
struct FbQuarter {
    #[serde(rename = "score", default)]
    scores: Vec<FbQuarterScore>,
}

#[derive(Debug, Default, Deserialize)]
struct FbQuarterScore {
    #[serde(rename = "@final", default)]
    final_flag: String,
}

#[derive(Debug, Default, Deserialize)]
struct Downtogo {
    #[serde(rename = "@hasball", default)]
    hasball:  String,
    #[serde(rename = "@qtr", default)]
    qtr:      String,
    #[serde(rename = "@clock", default)]
    clock:    String,
    #[serde(rename = "@lastplay", default)]
    lastplay: String,
}

#[derive(Debug, Default, Deserialize)]
struct FbScores {
    #[serde(rename = "score", default)]
    scores: Vec<FbScore>,
}

#[derive(Debug, Default, Deserialize)]
struct FbScore {
    #[serde(rename = "@vscore", default)]
    vscore: String,
    #[serde(rename = "@hscore", default)]
    hscore: String,
}

pub fn parse(
    raw: &[u8],
    game: &GameRef,
    config: &SourcePriorityConfig,
    now: DateTime<Utc>,
) -> Result<LiveGameSnapshot> {
    let feed: FbGame = common::decode_xml(raw, "fbgame")?;
    let settings = &config.football_config;

    if settings.xml_date_check {
        common::check_feed_date(&feed.venue.date, game, config.venue_tz()?)?;
    }

    let has_started = common::has_started(game, now);
    let is_complete = common::is_complete(final_flag_set(&feed), game, now);
    let downtogo = &feed.plays.downtogo;
    let phase = phase(downtogo, has_started, is_complete);

    let (home_score, visiting_score) = feed
        .scores
        .scores
        .last()
        .map(|s| (common::score(&s.hscore), common::score(&s.vscore)))
        .unwrap_or((0, 0));

    let clock = clock_value(phase, downtogo);
    let clock_seconds = clock.map(common::clock_seconds).unwrap_or(-1);

    Ok(LiveGameSnapshot {
        game_id: game.game_id.clone(),
        sport: game.sport.clone(),
        has_started,
        is_complete,
        phase,
        clock_seconds,
        period: legacy_period(phase),
        home_score,
        visiting_score,
        custom: CustomData::Football(custom(phase, downtogo, clock, settings)),
    })
}

/// The last score entry of the last quarter carries the final marker.
fn final_flag_set(feed: &FbGame) -> bool {
    feed.plays
        .quarters
        .last()
        .and_then(|q| q.scores.last())
        .map(|s| s.final_flag == "Y")
        .unwrap_or(false)
}

fn phase(downtogo: &Downtogo, has_started: bool, is_complete: bool) -> Phase {
    if !has_started {
        return Phase::Pre;
    }
    if is_complete {
        return Phase::Final;
    }
    let qtr = downtogo.qtr.trim();
    if qtr.is_empty() {
        return Phase::Period(1);
    }
    if qtr == "2" && downtogo.clock == "00:00" {
        return Phase::Halftime;
    }
    // Overtime shows up as "5", "ot", "OT", ...
    match qtr.parse::<u32>() {
        Ok(n) if n >= OVERTIME_QUARTER => Phase::Overtime,
        Ok(n) => Phase::Period(n),
        Err(_) => Phase::Overtime,
    }
}

fn clock_value(phase: Phase, downtogo: &Downtogo) -> Option<&str> {
    match phase {
        Phase::Pre | Phase::Halftime | Phase::Final => None,
        _ if downtogo.clock.is_empty() => (phase == Phase::Period(1)).then_some(OPENING_CLOCK),
        _ => Some(downtogo.clock.as_str()),
    }
}

fn custom(phase: Phase, downtogo: &Downtogo, clock: Option<&str>, settings: &SportFeedConfig) -> FootballCustom {
    let active = !matches!(phase, Phase::Pre | Phase::Halftime | Phase::Final);
    let last_play = if active && settings.last_play_enabled {
        downtogo.lastplay.clone()
    } else {
        String::new()
    };
    FootballCustom {
        possession: if active { downtogo.hasball.clone() } else { String::new() },
        last_play,
        clock: clock.map(common::format_clock).unwrap_or_default(),
        phase: settings.label(&phase.code()),
    }
}

fn legacy_period(phase: Phase) -> i64 {
    match phase {
        Phase::Pre => 1,
        Phase::Period(n) => n as i64,
        Phase::Halftime => 2,
        Phase::Overtime => 5,
        Phase::Final => 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn game(start: DateTime<Utc>) -> GameRef {
        GameRef {
            game_id:         "4410".to_string(),
            sport:           "football".to_string(),
            scheduled_start: Some(start),
            is_home:         true,
            opponent_name:   "Nebraska".to_string(),
        }
    }

    fn kickoff() -> DateTime<Utc> {
        // 11:00 in Chicago on 9/21/2019
        Utc.with_ymd_and_hms(2019, 9, 21, 16, 0, 0).unwrap()
    }

    fn feed(qtr: &str, clock: &str, final_flag: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<fbgame source="TAS" generated="9/21/2019">
  <venue gameid="4410" date="9/21/2019" location="Champaign, Ill."/>
  <plays>
    <qtr number="1" text="1st">
      <play context="V,1,10,V25" text="kickoff"/>
      <score type="TD" V="0" H="7" final=""/>
      <play context="H,1,10,H25" text="run"/>
    </qtr>
    <qtr number="2" text="2nd">
      <score type="FG" V="3" H="7" final="{final_flag}"/>
    </qtr>
    <downtogo hasball="H" qtr="{qtr}" clock="{clock}" lastplay="Brown rush for 4 yards"/>
  </plays>
  <scores>
    <score qtr="1" vscore="0" hscore="7"/>
    <score qtr="2" vscore="3" hscore="7"/>
  </scores>
</fbgame>"#
        )
    }

    fn run(qtr: &str, clock: &str, final_flag: &str, now: DateTime<Utc>) -> LiveGameSnapshot {
        let cfg = SourcePriorityConfig::default();
        parse(feed(qtr, clock, final_flag).as_bytes(), &game(kickoff()), &cfg, now).unwrap()
    }

    #[test]
    fn test_halftime_when_second_quarter_clock_expires() {
        let snap = run("2", "00:00", "", kickoff() + Duration::minutes(90));
        assert_eq!(snap.phase, Phase::Halftime);
        assert_eq!(snap.period, 2);
        assert!(snap.has_started);
        assert!(!snap.is_complete);
        assert_eq!(snap.home_score, 7);
        assert_eq!(snap.visiting_score, 3);
        match snap.custom {
            CustomData::Football(c) => {
                assert_eq!(c.phase, "Half Time");
                assert_eq!(c.clock, "");
                assert_eq!(c.last_play, "");
                assert_eq!(c.possession, "");
            }
            other => panic!("unexpected custom data {other:?}"),
        }
    }

    #[test]
    fn test_live_quarter_reports_clock_possession_and_last_play() {
        let snap = run("3", "02:52", "", kickoff() + Duration::minutes(120));
        assert_eq!(snap.phase, Phase::Period(3));
        assert_eq!(snap.clock_seconds, 172);
        match snap.custom {
            CustomData::Football(c) => {
                assert_eq!(c.clock, "02:52 remaining");
                assert_eq!(c.possession, "H");
                assert_eq!(c.last_play, "Brown rush for 4 yards");
                assert_eq!(c.phase, "3rd Quarter");
            }
            other => panic!("unexpected custom data {other:?}"),
        }
    }

    #[test]
    fn test_overtime_detection() {
        let now = kickoff() + Duration::hours(4);
        assert_eq!(run("5", "10:00", "", now).phase, Phase::Overtime);
        assert_eq!(run("OT", "10:00", "", now).phase, Phase::Overtime);
        assert_eq!(run("5", "10:00", "", now).period, 5);
    }

    #[test]
    fn test_before_kickoff_is_pregame() {
        let snap = run("", "", "", kickoff() - Duration::minutes(10));
        assert_eq!(snap.phase, Phase::Pre);
        assert!(!snap.has_started);
        assert_eq!(snap.period, 1);
        assert_eq!(snap.clock_seconds, -1);
    }

    #[test]
    fn test_started_without_quarter_uses_opening_clock() {
        let snap = run("", "", "", kickoff() + Duration::minutes(1));
        assert_eq!(snap.phase, Phase::Period(1));
        assert_eq!(snap.clock_seconds, 900);
        match snap.custom {
            CustomData::Football(c) => assert_eq!(c.clock, "15:00 remaining"),
            other => panic!("unexpected custom data {other:?}"),
        }
    }

    #[test]
    fn test_final_flag_completes_game() {
        let snap = run("4", "00:00", "Y", kickoff() + Duration::hours(3));
        assert!(snap.is_complete);
        assert_eq!(snap.phase, Phase::Final);
        assert_eq!(snap.period, 4);
    }

    #[test]
    fn test_phase_sequence_over_a_game() {
        let steps = [
            ("", "", "", -10),
            ("1", "12:00", "", 10),
            ("2", "05:00", "", 40),
            ("2", "00:00", "", 70),
            ("3", "14:00", "", 90),
            ("4", "03:00", "", 140),
            ("5", "10:00", "", 190),
            ("5", "00:00", "Y", 200),
        ];
        let codes: Vec<String> = steps
            .iter()
            .map(|(q, c, f, mins)| run(q, c, f, kickoff() + Duration::minutes(*mins)).phase.code())
            .collect();
        assert_eq!(codes, vec!["pre", "1", "2", "ht", "3", "4", "ot", "final"]);
    }

    #[test]
    fn test_stale_feed_date_is_rejected() {
        let cfg = SourcePriorityConfig::default();
        let next_week = game(kickoff() + Duration::days(7));
        let err = parse(feed("1", "10:00", "").as_bytes(), &next_week, &cfg, kickoff()).unwrap_err();
        assert!(matches!(err, crate::error::LiveStatsError::DateMismatch { .. }));

        let mut lenient = SourcePriorityConfig::default();
        lenient.football_config.xml_date_check = false;
        assert!(parse(feed("1", "10:00", "").as_bytes(), &next_week, &lenient, kickoff()).is_ok());
    }

    #[test]
    fn test_last_play_flag_is_respected() {
        let mut cfg = SourcePriorityConfig::default();
        cfg.football_config.last_play_enabled = false;
        let snap = parse(
            feed("3", "02:52", "").as_bytes(),
            &game(kickoff()),
            &cfg,
            kickoff() + Duration::minutes(100),
        )
        .unwrap();
        match snap.custom {
            CustomData::Football(c) => {
                assert_eq!(c.last_play, "");
                assert_eq!(c.possession, "H");
            }
            other => panic!("unexpected custom data {other:?}"),
        }
    }

    #[test]
    fn test_malformed_feed_is_parse_failure() {
        let cfg = SourcePriorityConfig::default();
        let err = parse(b"<fbgame><plays>", &game(kickoff()), &cfg, kickoff()).unwrap_err();
        assert!(matches!(err, crate::error::LiveStatsError::ParseFailure(_)));
    }
}
