/// Men's and women's basketball XML feed (`<bbgame>`).

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::common;
use crate::config::{SourcePriorityConfig, SportFeedConfig};
use crate::error::{LiveStatsError, Result};
use crate::model::{BasketballCustom, CustomData, GameRef, LiveGameSnapshot, Phase};

#[derive(Debug, Default, Deserialize)]
struct BbGame {
    #[serde(default)]
    venue:  Venue,
    #[serde(default)]
    status: Status,
    #[serde(rename = "team", default)]
    teams:  Vec<Team>,
    #[serde(default)]
    plays:  Plays,
}

#[derive(Debug, Default, Deserialize)]
struct Venue {
    #[serde(rename = "@date", default)]
    date:  String,
    #[serde(default)]
    rules: Rules,
}

#[derive(Debug, Default, Deserialize)]
struct Rules {
    #[serde(rename = "@prds", default)]
    prds: String,
}

#[derive(Debug, Default, Deserialize)]
struct Status {
    #[serde(rename = "@complete", default)]
    complete: String,
    #[serde(rename = "@period", default)]
    period:   String,
    #[serde(rename = "@clock", default)]
    clock:    String,
}

#[derive(Debug, Default, Deserialize)]
struct Team {
    #[serde(rename = "@vh", default)]
    vh:        String,
    #[serde(default)]
    linescore: Linescore,
    #[serde(rename = "player", default)]
    players:   Vec<Player>,
}

#[derive(Debug, Default, Deserialize)]
struct Linescore {
    #[serde(rename = "@score", default)]
    score: String,
}

#[derive(Debug, Default, Deserialize)]
struct Player {
    #[serde(rename = "@name", default)]
    name:      String,
    #[serde(rename = "@checkname", default)]
    checkname: String,
}

#[derive(Debug, Default, Deserialize)]
struct Plays {
    #[serde(rename = "period", default)]
    periods: Vec<PlayPeriod>,
}

#[derive(Debug, Default, Deserialize)]
struct PlayPeriod {
    #[serde(rename = "play", default)]
    plays: Vec<Play>,
}

#[derive(Debug, Default, Deserialize)]
struct Play {
    #[serde(rename = "@vh", default)]
    vh:        String,
    #[serde(rename = "@team", default)]
    team:      String,
    #[serde(rename = "@checkname", default)]
    checkname: String,
    #[serde(rename = "@action", default)]
    action:    String,
    #[serde(rename = "@type", default)]
    kind:      String,
    #[serde(rename = "@side", default)]
    side:      String,
}

pub fn parse(
    raw: &[u8],
    game: &GameRef,
    config: &SourcePriorityConfig,
    now: DateTime<Utc>,
) -> Result<LiveGameSnapshot> {
    let settings = config
        .feed_config(&game.sport)
        .ok_or_else(|| LiveStatsError::UnsupportedSport(game.sport.clone()))?;
    let feed: BbGame = common::decode_xml(raw, "bbgame")?;

    if settings.xml_date_check {
        common::check_feed_date(&feed.venue.date, game, config.venue_tz()?)?;
    }

    let has_started = common::has_started(game, now);
    let is_complete = common::is_complete(feed.status.complete == "Y", game, now);
    let phase = phase(&feed, settings, has_started, is_complete);

    let clock = match phase {
        Phase::Pre | Phase::Final => "",
        _ => feed.status.clock.as_str(),
    };
    let custom = BasketballCustom {
        clock:     common::format_clock(clock),
        phase:     settings.label(&phase.code()),
        last_play: last_play(&feed, phase, settings),
    };

    Ok(LiveGameSnapshot {
        game_id: game.game_id.clone(),
        sport: game.sport.clone(),
        has_started,
        is_complete,
        phase,
        clock_seconds: common::clock_seconds(&feed.status.clock),
        period: feed.status.period.trim().parse::<i64>().unwrap_or(1),
        home_score: team_score(&feed, "H"),
        visiting_score: team_score(&feed, "V"),
        custom: CustomData::Basketball(custom),
    })
}

fn phase(feed: &BbGame, settings: &SportFeedConfig, has_started: bool, is_complete: bool) -> Phase {
    if !has_started {
        return Phase::Pre;
    }
    if is_complete {
        return Phase::Final;
    }
    let period = feed.status.period.trim().parse::<u32>().unwrap_or(1).max(1);
    let regulation = feed
        .venue
        .rules
        .prds
        .trim()
        .parse::<u32>()
        .ok()
        .or(settings.regulation_periods);
    match regulation {
        Some(prds) if period > prds => Phase::Overtime,
        _ => Phase::Period(period),
    }
}

fn find_team<'a>(feed: &'a BbGame, vh: &str) -> Option<&'a Team> {
    feed.teams.iter().find(|t| t.vh == vh)
}

fn team_score(feed: &BbGame, vh: &str) -> i64 {
    find_team(feed, vh)
        .map(|t| common::score(&t.linescore.score))
        .unwrap_or(0)
}

fn last_play(feed: &BbGame, phase: Phase, settings: &SportFeedConfig) -> String {
    if !settings.last_play_enabled || !phase.is_live() {
        return String::new();
    }
    let latest = feed.plays.periods.last().and_then(|p| p.plays.last());
    match latest {
        Some(play) => describe_play(feed, play),
        None => String::new(),
    }
}

/// e.g. `ILLINOIS team, Ayo Dosunmu, action - GOOD, type - 3PTR`
fn describe_play(feed: &BbGame, play: &Play) -> String {
    let mut parts = Vec::new();
    if !play.team.is_empty() {
        parts.push(format!("{} team", play.team));
    }
    if !play.checkname.is_empty() && play.checkname != "TEAM" {
        let player = find_team(feed, &play.vh)
            .and_then(|t| t.players.iter().find(|p| p.checkname == play.checkname))
            .map(|p| p.name.clone())
            .unwrap_or_else(|| play.checkname.clone());
        parts.push(player);
    }
    if !play.action.is_empty() {
        parts.push(format!("action - {}", play.action));
    }
    if !play.kind.is_empty() {
        parts.push(format!("type - {}", play.kind));
    }
    if !play.side.is_empty() {
        parts.push(format!("side - {}", play.side));
    }
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn tipoff() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 1, 14, 1, 0, 0).unwrap() // 19:00 1/13 in Chicago
    }

    fn game(sport: &str) -> GameRef {
        GameRef {
            game_id:         "777".to_string(),
            sport:           sport.to_string(),
            scheduled_start: Some(tipoff()),
            is_home:         true,
            opponent_name:   "Purdue".to_string(),
        }
    }

    fn feed(period: &str, clock: &str, complete: &str, last_play: &str) -> String {
        format!(
            r#"<bbgame source="TAS" generated="1/13/2020">
  <venue gameid="777" date="1/13/2020" start="7:00 PM">
    <rules prds="2" minutes="20"/>
  </venue>
  <status complete="{complete}" period="{period}" clock="{clock}" running="T"/>
  <team vh="V" id="PUR" name="Purdue">
    <linescore score="58"/>
    <player uni="3" checkname="EDEY,ZACH" name="Zach Edey"/>
  </team>
  <team vh="H" id="ILL" name="Illinois">
    <linescore score="61"/>
    <player uni="11" checkname="DOSUNMU,AYO" name="Ayo Dosunmu"/>
    <player uni="21" checkname="COCKBURN,KOFI" name="Kofi Cockburn"/>
  </team>
  <plays>
    <period number="1">
      <play vh="V" time="19:40" uni="3" team="PUR" checkname="EDEY,ZACH" action="MISS" type="LAYUP"/>
    </period>
    <period number="2">
      {last_play}
    </period>
  </plays>
</bbgame>"#
        )
    }

    fn run(sport: &str, cfg: &SourcePriorityConfig, xml: &str, now: DateTime<Utc>) -> LiveGameSnapshot {
        parse(xml.as_bytes(), &game(sport), cfg, now).unwrap()
    }

    fn enabled() -> SourcePriorityConfig {
        let mut cfg = SourcePriorityConfig::default();
        cfg.mbball_config.last_play_enabled = true;
        cfg
    }

    #[test]
    fn test_second_half_with_scores_and_clock() {
        let xml = feed("2", "04:12", "N", "");
        let snap = run("mbball", &SourcePriorityConfig::default(), &xml, tipoff() + Duration::minutes(80));
        assert_eq!(snap.phase, Phase::Period(2));
        assert_eq!(snap.period, 2);
        assert_eq!(snap.clock_seconds, 252);
        assert_eq!(snap.home_score, 61);
        assert_eq!(snap.visiting_score, 58);
        match snap.custom {
            CustomData::Basketball(c) => {
                assert_eq!(c.clock, "04:12 remaining");
                assert_eq!(c.phase, "2nd Half");
                assert_eq!(c.last_play, "");
            }
            other => panic!("unexpected custom data {other:?}"),
        }
    }

    #[test]
    fn test_period_past_regulation_is_overtime() {
        let xml = feed("3", "02:00", "N", "");
        let snap = run("mbball", &SourcePriorityConfig::default(), &xml, tipoff() + Duration::hours(2));
        assert_eq!(snap.phase, Phase::Overtime);
        assert_eq!(snap.period, 3);
    }

    #[test]
    fn test_configured_regulation_periods_without_feed_rules() {
        let without_rules = |period: &str| {
            feed(period, "05:00", "N", "").replace(r#"<rules prds="2" minutes="20"/>"#, "")
        };
        let cfg = SourcePriorityConfig::default();
        let now = tipoff() + Duration::hours(2);

        assert_eq!(run("mbball", &cfg, &without_rules("3"), now).phase, Phase::Overtime);
        assert_eq!(run("mbball", &cfg, &without_rules("2"), now).phase, Phase::Period(2));
        assert_eq!(run("wbball", &cfg, &without_rules("3"), now).phase, Phase::Period(3));
        assert_eq!(run("wbball", &cfg, &without_rules("4"), now).phase, Phase::Period(4));
        assert_eq!(run("wbball", &cfg, &without_rules("5"), now).phase, Phase::Overtime);
    }

    #[test]
    fn test_last_play_resolves_player_name() {
        let play = r#"<play vh="H" time="04:12" uni="11" team="ILL" checkname="DOSUNMU,AYO" action="GOOD" type="3PTR"/>"#;
        let snap = run("mbball", &enabled(), &feed("2", "04:12", "N", play), tipoff() + Duration::minutes(80));
        match snap.custom {
            CustomData::Basketball(c) => assert_eq!(c.last_play, "ILL team, Ayo Dosunmu, action - GOOD, type - 3PTR"),
            other => panic!("unexpected custom data {other:?}"),
        }
    }

    #[test]
    fn test_last_play_falls_back_to_checkname_and_skips_team_entries() {
        let unknown = r#"<play vh="H" team="ILL" checkname="SMITH,JOE" action="REBOUND" type="DEF" side="L"/>"#;
        let snap = run("mbball", &enabled(), &feed("2", "03:00", "N", unknown), tipoff() + Duration::minutes(80));
        match snap.custom {
            CustomData::Basketball(c) => assert_eq!(c.last_play, "ILL team, SMITH,JOE, action - REBOUND, type - DEF, side - L"),
            other => panic!("unexpected custom data {other:?}"),
        }

        let team = r#"<play vh="V" team="PUR" checkname="TEAM" action="TIMEOUT" type="30SEC"/>"#;
        let snap = run("mbball", &enabled(), &feed("2", "03:00", "N", team), tipoff() + Duration::minutes(80));
        match snap.custom {
            CustomData::Basketball(c) => assert_eq!(c.last_play, "PUR team, action - TIMEOUT, type - 30SEC"),
            other => panic!("unexpected custom data {other:?}"),
        }
    }

    #[test]
    fn test_completion_flag_and_day_fallback() {
        let done = run("mbball", &enabled(), &feed("2", "00:00", "Y", ""), tipoff() + Duration::hours(2));
        assert!(done.is_complete);
        assert_eq!(done.phase, Phase::Final);
        match done.custom {
            CustomData::Basketball(c) => {
                assert_eq!(c.clock, "");
                assert_eq!(c.last_play, "");
                assert_eq!(c.phase, "Final Score");
            }
            other => panic!("unexpected custom data {other:?}"),
        }

        let stuck = run("mbball", &enabled(), &feed("2", "00:00", "N", ""), tipoff() + Duration::hours(25));
        assert!(stuck.is_complete);
    }

    #[test]
    fn test_womens_game_uses_its_own_labels() {
        let xml = feed("2", "08:00", "N", "");
        let snap = run("wbball", &SourcePriorityConfig::default(), &xml, tipoff() + Duration::minutes(30));
        match snap.custom {
            CustomData::Basketball(c) => assert_eq!(c.phase, "2nd Quarter"),
            other => panic!("unexpected custom data {other:?}"),
        }
    }

    #[test]
    fn test_unknown_period_defaults_to_first() {
        let xml = feed("", "", "N", "");
        let snap = run("mbball", &SourcePriorityConfig::default(), &xml, tipoff() + Duration::minutes(1));
        assert_eq!(snap.phase, Phase::Period(1));
        assert_eq!(snap.period, 1);
        assert_eq!(snap.clock_seconds, -1);
    }
}
