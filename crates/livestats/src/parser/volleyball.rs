/// Volleyball XML feed (`<vbgame>`). The current set number is the phase.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::common;
use crate::config::{SourcePriorityConfig, SportFeedConfig};
use crate::error::Result;
use crate::model::{CustomData, GameRef, LiveGameSnapshot, Phase, VolleyballCustom};

#[derive(Debug, Default, Deserialize)]
struct VbGame {
    #[serde(default)]
    venue:  Venue,
    status: Option<Status>,
}

#[derive(Debug, Default, Deserialize)]
struct Venue {
    #[serde(rename = "@date", default)]
    date: String,
}

#[derive(Debug, Default, Deserialize)]
struct Status {
    #[serde(rename = "@complete", default)]
    complete: String,
    #[serde(rename = "@vscore", default)]
    vscore:   String,
    #[serde(rename = "@hscore", default)]
    hscore:   String,
    #[serde(rename = "@game", default)]
    game:     String,
    #[serde(rename = "@serving", default)]
    serving:  String,
    #[serde(rename = "@vpoints", default)]
    vpoints:  String,
    #[serde(rename = "@hpoints", default)]
    hpoints:  String,
}

pub fn parse(
    raw: &[u8],
    game: &GameRef,
    config: &SourcePriorityConfig,
    now: DateTime<Utc>,
) -> Result<LiveGameSnapshot> {
    let feed: VbGame = common::decode_xml(raw, "vbgame")?;
    let settings = &config.wvball_config;

    if settings.xml_date_check {
        common::check_feed_date(&feed.venue.date, game, config.venue_tz()?)?;
    }

    let status = feed.status.as_ref();
    let has_started = common::has_started(game, now);
    let complete_flag = status.map(|s| s.complete == "Y").unwrap_or(false);
    let is_complete = common::is_complete(complete_flag, game, now);
    let phase = phase(status, has_started, is_complete);

    let (home_score, visiting_score) = status
        .map(|s| (common::score(&s.hscore), common::score(&s.vscore)))
        .unwrap_or((0, 0));
    let period = status
        .and_then(|s| s.game.trim().parse::<i64>().ok())
        .unwrap_or(1);

    Ok(LiveGameSnapshot {
        game_id: game.game_id.clone(),
        sport: game.sport.clone(),
        has_started,
        is_complete,
        phase,
        clock_seconds: -1,
        period,
        home_score,
        visiting_score,
        custom: CustomData::Volleyball(custom(status, phase, settings)),
    })
}

fn phase(status: Option<&Status>, has_started: bool, is_complete: bool) -> Phase {
    if !has_started {
        return Phase::Pre;
    }
    if is_complete {
        return Phase::Final;
    }
    match status.and_then(|s| s.game.trim().parse::<u32>().ok()) {
        Some(set) => Phase::Period(set),
        None => Phase::Pre,
    }
}

fn phase_label(phase: Phase, settings: &SportFeedConfig) -> String {
    match phase {
        Phase::Period(set) => format!("{} {}", common::ordinal(set), settings.label("game_name")),
        other => settings.label(&other.code()),
    }
}

fn custom(status: Option<&Status>, phase: Phase, settings: &SportFeedConfig) -> VolleyballCustom {
    let Some(status) = status else {
        return VolleyballCustom {
            has_extra_data: false,
            phase:          String::new(),
            phase_label:    String::new(),
            h_score:        String::new(),
            v_score:        String::new(),
            h_points:       String::new(),
            v_points:       String::new(),
            serving:        String::new(),
        };
    };
    let live = |value: &str| if phase.is_live() { value.to_string() } else { String::new() };
    VolleyballCustom {
        has_extra_data: true,
        phase:          phase.code(),
        phase_label:    phase_label(phase, settings),
        h_score:        status.hscore.clone(),
        v_score:        status.vscore.clone(),
        h_points:       live(&status.hpoints),
        v_points:       live(&status.vpoints),
        serving:        live(&status.serving),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn first_serve() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2019, 11, 2, 0, 0, 0).unwrap() // 19:00 11/1 in Chicago
    }

    fn game() -> GameRef {
        GameRef {
            game_id:         "31".to_string(),
            sport:           "wvball".to_string(),
            scheduled_start: Some(first_serve()),
            is_home:         false,
            opponent_name:   "Wisconsin".to_string(),
        }
    }

    fn feed(complete: &str, set: &str) -> String {
        format!(
            r#"<vbgame source="TAS" generated="11/01/2019">
  <venue gameid="31" date="11/01/2019"/>
  <status complete="{complete}" vscore="2" hscore="1" game="{set}" serving="V" vpoints="17" hpoints="21"/>
</vbgame>"#
        )
    }

    fn run(xml: &str, now: DateTime<Utc>) -> LiveGameSnapshot {
        parse(xml.as_bytes(), &game(), &SourcePriorityConfig::default(), now).unwrap()
    }

    #[test]
    fn test_set_number_is_the_phase() {
        let snap = run(&feed("N", "4"), first_serve() + Duration::minutes(75));
        assert_eq!(snap.phase, Phase::Period(4));
        assert_eq!(snap.period, 4);
        assert_eq!(snap.home_score, 1);
        assert_eq!(snap.visiting_score, 2);
        assert_eq!(snap.clock_seconds, -1);
        match snap.custom {
            CustomData::Volleyball(c) => {
                assert!(c.has_extra_data);
                assert_eq!(c.phase, "4");
                assert_eq!(c.phase_label, "4th Set");
                assert_eq!(c.h_points, "21");
                assert_eq!(c.v_points, "17");
                assert_eq!(c.serving, "V");
            }
            other => panic!("unexpected custom data {other:?}"),
        }
    }

    #[test]
    fn test_completion_flag_wins_regardless_of_time() {
        let snap = run(&feed("Y", "5"), first_serve() + Duration::minutes(30));
        assert!(snap.is_complete);
        assert_eq!(snap.phase, Phase::Final);
        match snap.custom {
            CustomData::Volleyball(c) => {
                assert_eq!(c.phase_label, "Final Score");
                assert_eq!(c.serving, "");
                assert_eq!(c.h_points, "");
                assert_eq!(c.h_score, "1");
            }
            other => panic!("unexpected custom data {other:?}"),
        }
    }

    #[test]
    fn test_day_old_match_completes_without_flag() {
        let snap = run(&feed("N", "3"), first_serve() + Duration::hours(25));
        assert!(snap.is_complete);
    }

    #[test]
    fn test_non_numeric_set_reads_as_pregame() {
        let snap = run(&feed("N", ""), first_serve() + Duration::minutes(5));
        assert_eq!(snap.phase, Phase::Pre);
        assert_eq!(snap.period, 1);
        match snap.custom {
            CustomData::Volleyball(c) => {
                assert_eq!(c.phase_label, "Pregame");
                assert_eq!(c.serving, "");
            }
            other => panic!("unexpected custom data {other:?}"),
        }
    }

    #[test]
    fn test_missing_status_has_no_extra_data() {
        let xml = r#"<vbgame><venue date="11/01/2019"/></vbgame>"#;
        let snap = run(xml, first_serve() + Duration::minutes(5));
        assert_eq!(snap.phase, Phase::Pre);
        match snap.custom {
            CustomData::Volleyball(c) => assert!(!c.has_extra_data),
            other => panic!("unexpected custom data {other:?}"),
        }
    }
}
