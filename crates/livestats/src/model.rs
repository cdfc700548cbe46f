/// Normalized game identity, snapshots and the flat wire form consumed by read APIs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::{LiveStatsError, Result};

/// One schedule entry that may be polled for live stats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameRef {
    pub game_id:         String,
    pub sport:           String,   // short code, e.g. "football", "mbball"
    pub scheduled_start: Option<DateTime<Utc>>,
    pub is_home:         bool,
    pub opponent_name:   String,
}

impl GameRef {
    pub fn has_started_at(&self, now: DateTime<Utc>) -> bool {
        match self.scheduled_start {
            Some(start) => now >= start,
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Pre,
    Period(u32),
    Halftime,
    Overtime,
    Final,
}

impl Phase {
    pub fn code(&self) -> String {
        match self {
            Phase::Pre => "pre".to_string(),
            Phase::Period(n) => n.to_string(),
            Phase::Halftime => "ht".to_string(),
            Phase::Overtime => "ot".to_string(),
            Phase::Final => "final".to_string(),
        }
    }

    pub fn from_code(code: &str) -> Option<Phase> {
        match code {
            "pre" => Some(Phase::Pre),
            "ht" => Some(Phase::Halftime),
            "ot" => Some(Phase::Overtime),
            "final" => Some(Phase::Final),
            other => other.parse::<u32>().ok().map(Phase::Period),
        }
    }

    pub fn is_live(&self) -> bool {
        !matches!(self, Phase::Pre | Phase::Final)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}

// ── Custom data ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FootballCustom {
    pub possession: String,
    pub last_play:  String,
    pub clock:      String,
    pub phase:      String,   // display label
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BasketballCustom {
    pub clock:     String,
    pub phase:     String,   // display label
    pub last_play: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VolleyballCustom {
    pub has_extra_data: bool,
    pub phase:          String,   // phase code
    pub phase_label:    String,
    pub h_score:        String,
    pub v_score:        String,
    pub h_points:       String,
    pub v_points:       String,
    pub serving:        String,
}

/// Sport-specific extras carried alongside the normalized fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomData {
    None,
    Football(FootballCustom),
    Basketball(BasketballCustom),
    Volleyball(VolleyballCustom),
}

impl CustomData {
    /// JSON text as carried in the `Custom` wire field. Empty for `None`.
    pub fn to_wire(&self) -> String {
        let encoded = match self {
            CustomData::None => return String::new(),
            CustomData::Football(c) => serde_json::to_string(c),
            CustomData::Basketball(c) => serde_json::to_string(c),
            CustomData::Volleyball(c) => serde_json::to_string(c),
        };
        encoded.unwrap_or_default()
    }
}

// ── Snapshot ──────────────────────────────────────────────────────────────────

/// Normalized live state for one game at one instant. Never mutated after parsing.
#[derive(Debug, Clone)]
pub struct LiveGameSnapshot {
    pub game_id:        String,
    pub sport:          String,
    pub has_started:    bool,
    pub is_complete:    bool,
    pub phase:          Phase,
    pub clock_seconds:  i64,   // -1 when unknown
    pub period:         i64,   // legacy integer period
    pub home_score:     i64,
    pub visiting_score: i64,
    pub custom:         CustomData,
}

impl LiveGameSnapshot {
    pub fn is_live(&self) -> bool {
        self.has_started && !self.is_complete
    }

    /// Names of the fields that differ from `other`. Empty means no change.
    pub fn changed_fields(&self, other: &LiveGameSnapshot) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.game_id != other.game_id { changed.push("game_id"); }
        if self.sport != other.sport { changed.push("sport"); }
        if self.has_started != other.has_started { changed.push("has_started"); }
        if self.is_complete != other.is_complete { changed.push("is_complete"); }
        if self.phase != other.phase { changed.push("phase"); }
        if self.clock_seconds != other.clock_seconds { changed.push("clock_seconds"); }
        if self.period != other.period { changed.push("period"); }
        if self.home_score != other.home_score { changed.push("home_score"); }
        if self.visiting_score != other.visiting_score { changed.push("visiting_score"); }
        if self.custom != other.custom { changed.push("custom"); }
        changed
    }

    pub fn same_as(&self, other: &LiveGameSnapshot) -> bool {
        self.changed_fields(other).is_empty()
    }

    /// Flat string map sent to read API consumers and in data notifications.
    pub fn encode(&self) -> HashMap<String, String> {
        let mut data = HashMap::new();
        data.insert("Type".to_string(), self.sport.clone());
        data.insert("GameId".to_string(), self.game_id.clone());
        data.insert("Path".to_string(), self.sport.clone());
        data.insert("HasStarted".to_string(), self.has_started.to_string());
        data.insert("IsComplete".to_string(), self.is_complete.to_string());
        data.insert("ClockSeconds".to_string(), self.clock_seconds.to_string());
        data.insert("Period".to_string(), self.period.to_string());
        data.insert("HomeScore".to_string(), self.home_score.to_string());
        data.insert("VisitingScore".to_string(), self.visiting_score.to_string());
        data.insert("Custom".to_string(), self.custom.to_wire());
        data
    }
}

/// Decoded form of the flat wire map, for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireGame {
    pub kind:           String,
    pub game_id:        String,
    pub path:           String,
    pub has_started:    bool,
    pub is_complete:    bool,
    pub clock_seconds:  i64,
    pub period:         i64,
    pub home_score:     i64,
    pub visiting_score: i64,
    pub custom:         String,
}

impl WireGame {
    pub fn decode(data: &HashMap<String, String>) -> Result<WireGame> {
        fn field<'a>(data: &'a HashMap<String, String>, key: &str) -> Result<&'a str> {
            data.get(key)
                .map(String::as_str)
                .ok_or_else(|| LiveStatsError::ParseFailure(format!("missing wire field {key}")))
        }
        fn int(data: &HashMap<String, String>, key: &str) -> Result<i64> {
            let raw = field(data, key)?;
            raw.parse::<i64>()
                .map_err(|e| LiveStatsError::ParseFailure(format!("{key}={raw}: {e}")))
        }
        fn flag(data: &HashMap<String, String>, key: &str) -> Result<bool> {
            let raw = field(data, key)?;
            raw.parse::<bool>()
                .map_err(|e| LiveStatsError::ParseFailure(format!("{key}={raw}: {e}")))
        }

        Ok(WireGame {
            kind:           field(data, "Type")?.to_string(),
            game_id:        field(data, "GameId")?.to_string(),
            path:           field(data, "Path")?.to_string(),
            has_started:    flag(data, "HasStarted")?,
            is_complete:    flag(data, "IsComplete")?,
            clock_seconds:  int(data, "ClockSeconds")?,
            period:         int(data, "Period")?,
            home_score:     int(data, "HomeScore")?,
            visiting_score: int(data, "VisitingScore")?,
            custom:         data.get("Custom").cloned().unwrap_or_default(),
        })
    }

    pub fn custom_json(&self) -> Option<serde_json::Value> {
        if self.custom.is_empty() {
            return None;
        }
        serde_json::from_str(&self.custom).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> LiveGameSnapshot {
        LiveGameSnapshot {
            game_id:        "1234".to_string(),
            sport:          "football".to_string(),
            has_started:    true,
            is_complete:    false,
            phase:          Phase::Halftime,
            clock_seconds:  0,
            period:         2,
            home_score:     14,
            visiting_score: 7,
            custom: CustomData::Football(FootballCustom {
                possession: String::new(),
                last_play:  String::new(),
                clock:      String::new(),
                phase:      "Half Time".to_string(),
            }),
        }
    }

    #[test]
    fn test_phase_codes() {
        assert_eq!(Phase::Pre.code(), "pre");
        assert_eq!(Phase::Period(3).code(), "3");
        assert_eq!(Phase::Halftime.code(), "ht");
        assert_eq!(Phase::from_code("ot"), Some(Phase::Overtime));
        assert_eq!(Phase::from_code("4"), Some(Phase::Period(4)));
        assert_eq!(Phase::from_code("half"), None);
    }

    #[test]
    fn test_wire_decode_keeps_identity_scores_and_period() {
        let snap = snapshot();
        let wire = WireGame::decode(&snap.encode()).unwrap();
        assert_eq!(wire.game_id, "1234");
        assert_eq!(wire.home_score, 14);
        assert_eq!(wire.visiting_score, 7);
        assert_eq!(wire.period, 2);
        assert_eq!(wire.path, "football");
        let custom = wire.custom_json().unwrap();
        assert_eq!(custom["Phase"], "Half Time");
    }

    #[test]
    fn test_decode_rejects_missing_field() {
        let mut data = snapshot().encode();
        data.remove("HomeScore");
        assert!(matches!(WireGame::decode(&data), Err(LiveStatsError::ParseFailure(_))));
    }

    #[test]
    fn test_changed_fields_is_field_by_field() {
        let a = snapshot();
        let mut b = a.clone();
        assert!(a.same_as(&b));
        b.clock_seconds = 12;
        b.custom = CustomData::None;
        assert_eq!(a.changed_fields(&b), vec!["clock_seconds", "custom"]);
    }

    #[test]
    fn test_vendor_custom_is_empty_on_wire() {
        let mut snap = snapshot();
        snap.custom = CustomData::None;
        assert_eq!(snap.encode()["Custom"], "");
    }
}
