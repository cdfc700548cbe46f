/// Athletics Live — live-stats reconciliation engine
///
/// Pulls live game state from the XML feeds and the vendor API, normalizes it per
/// sport, detects changes against the tracked table and hands start/end and
/// data-changed notifications to the dispatcher.

pub mod config;
pub mod error;
pub mod fetch;
pub mod model;
pub mod notify;
pub mod parser;
pub mod router;
pub mod schedule;
pub mod scheduler;
pub mod service;
pub mod tracker;

pub use config::{ConfigStore, SourceKind, SourcePriorityConfig};
pub use error::{FetchError, LiveStatsError, Result};
pub use fetch::{FeedClient, FeedFetcher, FtpCredentials};
pub use model::{CustomData, GameRef, LiveGameSnapshot, Phase, WireGame};
pub use notify::{HttpDispatcher, NotificationDispatcher, RecordingDispatcher};
pub use router::SourceRouter;
pub use schedule::{PollingWindow, ScheduleClient, ScheduledGame};
pub use scheduler::Mode;
pub use service::LiveStatsService;
pub use tracker::{GameTracker, Reconciliation, StateChange};

/// Vendor live-games endpoint relative to the athletics site host.
pub fn vendor_livestats_url(host: &str) -> String {
    format!("{}/services/livestats.ashx", host.trim_end_matches('/'))
}
