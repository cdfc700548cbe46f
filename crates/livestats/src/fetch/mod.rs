/// Feed fetcher: raw bytes for a feed resource, no caching.

pub mod ftp;
pub mod http;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::error::FetchError;
use ftp::{FtpConnector, FtpFeed, SuppaFtpConnector};

#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Feed file from an FTP directory, e.g. `/Rokwire_FTP/football`.
    async fn fetch_xml(&self, path: &str) -> Result<Vec<u8>, FetchError>;

    /// Body of a vendor HTTP endpoint.
    async fn fetch_json(&self, endpoint: &str) -> Result<Vec<u8>, FetchError>;
}

pub struct FtpCredentials {
    pub host:     String,
    pub user:     String,
    pub password: String,
}

/// Production fetcher: FTP for XML feeds, reqwest for JSON.
pub struct FeedClient<C: FtpConnector = SuppaFtpConnector> {
    ftp:  Option<Arc<FtpFeed<C>>>,
    http: reqwest::Client,
}

impl FeedClient<SuppaFtpConnector> {
    pub fn new(ftp: Option<FtpCredentials>, timeout: Duration) -> Result<Self, FetchError> {
        let ftp = ftp.map(|c| {
            let connector = SuppaFtpConnector::new(c.host, c.user, c.password, timeout);
            Arc::new(FtpFeed::new(connector, timeout))
        });
        Ok(Self { ftp, http: http::build_client(timeout)? })
    }
}

#[async_trait]
impl<C: FtpConnector> FeedFetcher for FeedClient<C> {
    async fn fetch_xml(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        match &self.ftp {
            Some(feed) => feed.download(path).await,
            None => Err(FetchError::Session("xml feed ftp host not configured".to_string())),
        }
    }

    async fn fetch_json(&self, endpoint: &str) -> Result<Vec<u8>, FetchError> {
        http::get_bytes(&self.http, endpoint).await
    }
}
