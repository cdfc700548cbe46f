/// Source priority table, per-sport feed settings and notification templates.
///
/// The document keeps the JSON keys the config service already stores
/// (`livestats_source`, `football_config`, ...). Missing keys fall back to the
/// built-in defaults so a partial document is still usable.

use chrono_tz::Tz;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::error::{LiveStatsError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    #[serde(rename = "xml_feed")]
    XmlFeed,
    #[serde(rename = "sidearm", alias = "vendor_api")]
    Sidearm,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::XmlFeed => "xml_feed",
            SourceKind::Sidearm => "sidearm",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SportSources {
    #[serde(default)]
    pub home: Vec<SourceKind>,
    #[serde(default)]
    pub away: Vec<SourceKind>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SportFeedConfig {
    #[serde(default)]
    pub phases:             HashMap<String, String>,
    #[serde(default)]
    pub last_play_enabled:  bool,
    #[serde(default)]
    pub xml_date_check:     bool,
    /// Used when the feed itself does not say how many regulation periods there are.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regulation_periods: Option<u32>,
}

impl SportFeedConfig {
    pub fn label(&self, phase: &str) -> String {
        self.phases.get(phase).cloned().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub messages: HashMap<String, String>,
}

impl NotificationConfig {
    pub fn message(&self, key: &str) -> &str {
        self.messages.get(key).map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcePriorityConfig {
    pub livestats_source:    HashMap<String, SportSources>,
    pub football_config:     SportFeedConfig,
    pub mbball_config:       SportFeedConfig,
    pub wbball_config:       SportFeedConfig,
    pub wvball_config:       SportFeedConfig,
    pub notification_config: NotificationConfig,
    pub venue_timezone:      String,
    pub xml_feed_root:       String,
}

fn phases(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

impl Default for SourcePriorityConfig {
    fn default() -> Self {
        use SourceKind::*;

        let mut livestats_source = HashMap::new();
        for sport in ["football", "mbball", "wbball", "wvball"] {
            livestats_source.insert(
                sport.to_string(),
                SportSources { home: vec![XmlFeed, Sidearm], away: vec![Sidearm] },
            );
        }
        for sport in ["mten", "wten", "baseball", "softball", "wsoc"] {
            livestats_source.insert(
                sport.to_string(),
                SportSources { home: vec![Sidearm], away: vec![Sidearm] },
            );
        }

        let football_config = SportFeedConfig {
            phases: phases(&[
                ("pre", "Pregame"),
                ("1", "1st Quarter"),
                ("2", "2nd Quarter"),
                ("ht", "Half Time"),
                ("3", "3rd Quarter"),
                ("4", "4th Quarter"),
                ("ot", "Over Time"),
                ("final", "Final Score"),
            ]),
            last_play_enabled: true,
            xml_date_check: true,
            regulation_periods: Some(4),
        };
        let mbball_config = SportFeedConfig {
            phases: phases(&[
                ("pre", "Pregame"),
                ("1", "1st Half"),
                ("2", "2nd Half"),
                ("ot", "Over Time"),
                ("final", "Final Score"),
            ]),
            last_play_enabled: false,
            xml_date_check: true,
            regulation_periods: Some(2),
        };
        let wbball_config = SportFeedConfig {
            phases: phases(&[
                ("pre", "Pregame"),
                ("1", "1st Quarter"),
                ("2", "2nd Quarter"),
                ("3", "3rd Quarter"),
                ("4", "4th Quarter"),
                ("ot", "Over Time"),
                ("final", "Final Score"),
            ]),
            last_play_enabled: false,
            xml_date_check: true,
            regulation_periods: Some(4),
        };
        let wvball_config = SportFeedConfig {
            phases: phases(&[("pre", "Pregame"), ("game_name", "Set"), ("final", "Final Score")]),
            last_play_enabled: false,
            xml_date_check: true,
            regulation_periods: None,
        };
        let notification_config = NotificationConfig {
            messages: phases(&[
                ("game_title_format", "{home} vs {away}"),
                ("game_started_msg", "The Game has started"),
                ("game_ended_msg", "The Game had ended."),
                ("game_ended_score_format", "Score {home} {home_score} : {away} {away_score}"),
            ]),
        };

        Self {
            livestats_source,
            football_config,
            mbball_config,
            wbball_config,
            wvball_config,
            notification_config,
            venue_timezone: "America/Chicago".to_string(),
            xml_feed_root: "/Rokwire_FTP".to_string(),
        }
    }
}

impl SourcePriorityConfig {
    /// Parses and validates a full replacement document.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let config: SourcePriorityConfig = serde_json::from_slice(raw)
            .map_err(|e| LiveStatsError::ConfigInvalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.venue_tz()?;
        if self.xml_feed_root.is_empty() {
            return Err(LiveStatsError::ConfigInvalid("xml_feed_root is empty".to_string()));
        }
        Ok(())
    }

    pub fn venue_tz(&self) -> Result<Tz> {
        self.venue_timezone
            .parse::<Tz>()
            .map_err(|e| LiveStatsError::ConfigInvalid(format!("venue_timezone: {e}")))
    }

    /// Ordered source list for a sport. Empty when the sport is not configured.
    pub fn sources(&self, sport: &str, home: bool) -> &[SourceKind] {
        match self.livestats_source.get(sport) {
            Some(s) if home => &s.home,
            Some(s) => &s.away,
            None => &[],
        }
    }

    pub fn feed_config(&self, sport: &str) -> Option<&SportFeedConfig> {
        match sport {
            "football" => Some(&self.football_config),
            "mbball" => Some(&self.mbball_config),
            "wbball" => Some(&self.wbball_config),
            "wvball" => Some(&self.wvball_config),
            _ => None,
        }
    }

    /// FTP directory holding the sport's feed file.
    pub fn xml_feed_dir(&self, sport: &str) -> String {
        format!("{}/{}", self.xml_feed_root.trim_end_matches('/'), sport)
    }
}

/// Holds the active config; readers get an `Arc` so a swap never tears a read.
pub struct ConfigStore {
    current: RwLock<Arc<SourcePriorityConfig>>,
}

impl ConfigStore {
    pub fn new(config: SourcePriorityConfig) -> Self {
        Self { current: RwLock::new(Arc::new(config)) }
    }

    pub fn current(&self) -> Arc<SourcePriorityConfig> {
        self.current.read().clone()
    }

    /// Replaces the whole document. On error the previous config stays active.
    pub fn update(&self, raw: &[u8]) -> Result<()> {
        let parsed = SourcePriorityConfig::parse(raw)?;
        *self.current.write() = Arc::new(parsed);
        info!("Live stats config replaced");
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&*self.current())
            .map_err(|e| LiveStatsError::ConfigInvalid(e.to_string()))
    }
}
