/// Stateless HTTP fetch for the vendor JSON endpoints.

use std::time::Duration;
use tracing::debug;

use crate::error::FetchError;

/// Some vendor endpoints answer 404 to default client agents.
pub const CLIENT_AGENT: &str = "athletics-live-stats";

/// Every client carries the agent and a bounded timeout.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, FetchError> {
    Ok(reqwest::Client::builder()
        .user_agent(CLIENT_AGENT)
        .timeout(timeout)
        .build()?)
}

pub async fn get_bytes(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, FetchError> {
    let resp = client.get(url).send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Network(format!("GET {url} -> http_{status}")));
    }
    let body = resp.bytes().await?;
    debug!("GET {} ({} bytes)", url, body.len());
    Ok(body.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_client_with_bounded_timeout() {
        assert!(build_client(Duration::from_secs(10)).is_ok());
    }
}
