/// Per-sport feed parsers. Each turns raw feed bytes plus the schedule entry
/// into a normalized `LiveGameSnapshot`.

pub mod basketball;
pub mod common;
pub mod football;
pub mod vendor;
pub mod volleyball;

use chrono::{DateTime, Utc};

use crate::config::{SourcePriorityConfig, SourceKind};
use crate::error::{LiveStatsError, Result};
use crate::model::{GameRef, LiveGameSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SportParser {
    Football,
    Basketball,
    Volleyball,
    GenericVendor,
}

impl SportParser {
    /// XML parser for a sport code, if the sport has an XML feed.
    pub fn for_xml_sport(sport: &str) -> Option<SportParser> {
        match sport {
            "football" => Some(SportParser::Football),
            "mbball" | "wbball" => Some(SportParser::Basketball),
            "wvball" => Some(SportParser::Volleyball),
            _ => None,
        }
    }

    pub fn for_source(source: SourceKind, sport: &str) -> Result<SportParser> {
        match source {
            SourceKind::Sidearm => Ok(SportParser::GenericVendor),
            SourceKind::XmlFeed => Self::for_xml_sport(sport)
                .ok_or_else(|| LiveStatsError::UnsupportedSport(sport.to_string())),
        }
    }

    pub fn parse(
        &self,
        raw: &[u8],
        game: &GameRef,
        config: &SourcePriorityConfig,
        now: DateTime<Utc>,
    ) -> Result<LiveGameSnapshot> {
        match self {
            SportParser::Football => football::parse(raw, game, config, now),
            SportParser::Basketball => basketball::parse(raw, game, config, now),
            SportParser::Volleyball => volleyball::parse(raw, game, config, now),
            SportParser::GenericVendor => vendor::parse(raw, game, now),
        }
    }
}
