use thiserror::Error;

/// Transport-level failures from the feed fetcher.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("ftp session error: {0}")]
    Session(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout(e.to_string())
        } else {
            FetchError::Network(e.to_string())
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LiveStatsError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("parse failure: {0}")]
    ParseFailure(String),

    #[error("feed date {feed} does not match game date {expected}")]
    DateMismatch { feed: String, expected: String },

    #[error("unsupported sport: {0}")]
    UnsupportedSport(String),

    #[error("no source available for game {game_id}: {attempts}")]
    NoSourceAvailable { game_id: String, attempts: String },

    #[error("invalid config: {0}")]
    ConfigInvalid(String),
}

impl LiveStatsError {
    /// Errors the source router recovers from by moving to the next source.
    pub fn is_source_local(&self) -> bool {
        matches!(
            self,
            LiveStatsError::Fetch(_) | LiveStatsError::ParseFailure(_) | LiveStatsError::DateMismatch { .. }
        )
    }
}

impl From<quick_xml::DeError> for LiveStatsError {
    fn from(e: quick_xml::DeError) -> Self {
        LiveStatsError::ParseFailure(e.to_string())
    }
}

impl From<serde_json::Error> for LiveStatsError {
    fn from(e: serde_json::Error) -> Self {
        LiveStatsError::ParseFailure(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LiveStatsError>;
