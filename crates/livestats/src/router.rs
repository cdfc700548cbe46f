/// Tries each configured source for a game in priority order; first success wins.

use chrono::{DateTime, Utc};
use logger::{now_iso, EventLogger, SourceStatusEvent};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::config::{SourceKind, SourcePriorityConfig};
use crate::error::{LiveStatsError, Result};
use crate::fetch::FeedFetcher;
use crate::model::{GameRef, LiveGameSnapshot};
use crate::parser::SportParser;

pub struct SourceRouter {
    fetcher:    Arc<dyn FeedFetcher>,
    vendor_url: String,
    audit:      Option<Arc<EventLogger>>,
}

impl SourceRouter {
    pub fn new(fetcher: Arc<dyn FeedFetcher>, vendor_url: impl Into<String>) -> Self {
        Self { fetcher, vendor_url: vendor_url.into(), audit: None }
    }

    pub fn with_audit(mut self, audit: Arc<EventLogger>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub async fn load(
        &self,
        game: &GameRef,
        config: &SourcePriorityConfig,
        now: DateTime<Utc>,
    ) -> Result<LiveGameSnapshot> {
        let sources = config.sources(&game.sport, game.is_home);
        if sources.is_empty() {
            return Err(LiveStatsError::NoSourceAvailable {
                game_id:  game.game_id.clone(),
                attempts: format!("no sources configured for {}", game.sport),
            });
        }

        let mut attempts = Vec::with_capacity(sources.len());
        for &source in sources {
            match self.load_from(source, game, config, now).await {
                Ok(snapshot) => {
                    debug!("Game {} loaded from {}", game.game_id, source.as_str());
                    self.record(game, source, None);
                    return Ok(snapshot);
                }
                Err(e) => {
                    if e.is_source_local() {
                        warn!("Source {} failed for game {}: {}", source.as_str(), game.game_id, e);
                    } else {
                        error!("Source {} misconfigured for game {}: {}", source.as_str(), game.game_id, e);
                    }
                    self.record(game, source, Some(e.to_string()));
                    attempts.push(format!("{}: {}", source.as_str(), e));
                }
            }
        }

        Err(LiveStatsError::NoSourceAvailable {
            game_id:  game.game_id.clone(),
            attempts: attempts.join("; "),
        })
    }

    async fn load_from(
        &self,
        source: SourceKind,
        game: &GameRef,
        config: &SourcePriorityConfig,
        now: DateTime<Utc>,
    ) -> Result<LiveGameSnapshot> {
        let parser = SportParser::for_source(source, &game.sport)?;
        let raw = match source {
            SourceKind::XmlFeed => self.fetcher.fetch_xml(&config.xml_feed_dir(&game.sport)).await?,
            SourceKind::Sidearm => self.fetcher.fetch_json(&self.vendor_url).await?,
        };
        parser.parse(&raw, game, config, now)
    }

    fn record(&self, game: &GameRef, source: SourceKind, failure: Option<String>) {
        if let Some(audit) = &self.audit {
            audit.record(&SourceStatusEvent {
                ts:      now_iso(),
                event:   "SOURCE_STATUS",
                game_id: game.game_id.clone(),
                sport:   game.sport.clone(),
                source:  source.as_str().to_string(),
                ok:      failure.is_none(),
                message: failure,
            });
        }
    }
}
