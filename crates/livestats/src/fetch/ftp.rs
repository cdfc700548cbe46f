/// FTP-hosted XML feeds. One lazily opened session per feed directory; a failed
/// download gets exactly one reconnect-and-retry before the error surfaces.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::ToSocketAddrs;
use std::sync::Arc;
use std::time::Duration;
use suppaftp::FtpStream;
use tracing::{debug, info, warn};

use crate::error::FetchError;

pub const FEED_FILE: &str = "1.xml";
const FTP_PORT: u16 = 21;

pub trait FtpSession: Send + 'static {
    fn download(&mut self, dir: &str, file: &str) -> Result<Vec<u8>, FetchError>;
    /// Best-effort logout and disconnect.
    fn close(&mut self);
}

pub trait FtpConnector: Send + Sync + 'static {
    type Session: FtpSession;

    /// Opens and authenticates a new session.
    fn connect(&self) -> Result<Self::Session, FetchError>;
}

pub enum SessionState<S> {
    Disconnected,
    Connected(S),
}

impl<S: FtpSession> SessionState<S> {
    fn ensure<C>(&mut self, connector: &C) -> Result<&mut S, FetchError>
    where
        C: FtpConnector<Session = S>,
    {
        if let SessionState::Disconnected = self {
            *self = SessionState::Connected(connector.connect()?);
        }
        match self {
            SessionState::Connected(session) => Ok(session),
            SessionState::Disconnected => Err(FetchError::Session("not connected".to_string())),
        }
    }

    fn disconnect(&mut self) {
        if let SessionState::Connected(mut session) = std::mem::replace(self, SessionState::Disconnected) {
            session.close();
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, SessionState::Connected(_))
    }

    /// Runs `op` on the session. On failure: disconnect, reconnect, run `op` once more.
    pub fn with_retry<C, T>(
        &mut self,
        connector: &C,
        mut op: impl FnMut(&mut S) -> Result<T, FetchError>,
    ) -> Result<T, FetchError>
    where
        C: FtpConnector<Session = S>,
    {
        let first = match self.ensure(connector) {
            Ok(session) => op(session),
            Err(e) => Err(e),
        };
        let err = match first {
            Ok(v) => return Ok(v),
            Err(e) => e,
        };

        warn!("FTP download failed, reconnecting: {}", err);
        self.disconnect();
        let session = self.ensure(connector)?;
        let retried = op(session);
        if retried.is_err() {
            self.disconnect();
        }
        retried
    }
}

/// Per-directory session pool over any connector.
pub struct FtpFeed<C: FtpConnector> {
    connector: Arc<C>,
    sessions:  Mutex<HashMap<String, Arc<Mutex<SessionState<C::Session>>>>>,
    timeout:   Duration,
}

impl<C: FtpConnector> FtpFeed<C> {
    pub fn new(connector: C, timeout: Duration) -> Self {
        Self {
            connector: Arc::new(connector),
            sessions:  Mutex::new(HashMap::new()),
            timeout,
        }
    }

    fn session_for(&self, dir: &str) -> Arc<Mutex<SessionState<C::Session>>> {
        self.sessions
            .lock()
            .entry(dir.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(SessionState::Disconnected)))
            .clone()
    }

    /// Blocking download of the feed file in `dir`.
    pub fn download_blocking(&self, dir: &str) -> Result<Vec<u8>, FetchError> {
        let slot = self.session_for(dir);
        let mut state = slot.lock();
        state.with_retry(self.connector.as_ref(), |s| s.download(dir, FEED_FILE))
    }

    pub async fn download(self: &Arc<Self>, dir: &str) -> Result<Vec<u8>, FetchError> {
        let feed = Arc::clone(self);
        let owned_dir = dir.to_string();
        let task = tokio::task::spawn_blocking(move || feed.download_blocking(&owned_dir));

        // Worst case covers the first attempt plus the single retry.
        match tokio::time::timeout(self.timeout * 3, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(FetchError::Session(format!("ftp task failed: {join}"))),
            Err(_) => Err(FetchError::Timeout(format!("ftp download of {dir}"))),
        }
    }
}

// ── suppaftp backend ──────────────────────────────────────────────────────────

pub struct SuppaFtpConnector {
    host:     String,
    user:     String,
    password: String,
    timeout:  Duration,
}

impl SuppaFtpConnector {
    pub fn new(host: impl Into<String>, user: impl Into<String>, password: impl Into<String>, timeout: Duration) -> Self {
        Self {
            host:     host.into(),
            user:     user.into(),
            password: password.into(),
            timeout,
        }
    }
}

fn session_err(e: suppaftp::FtpError) -> FetchError {
    FetchError::Session(e.to_string())
}

impl FtpConnector for SuppaFtpConnector {
    type Session = FtpStream;

    fn connect(&self) -> Result<FtpStream, FetchError> {
        let addr = (self.host.as_str(), FTP_PORT)
            .to_socket_addrs()
            .map_err(|e| FetchError::Network(format!("resolve {}: {e}", self.host)))?
            .next()
            .ok_or_else(|| FetchError::Network(format!("no address for {}", self.host)))?;

        let mut stream = FtpStream::connect_timeout(addr, self.timeout).map_err(|e| match e {
            suppaftp::FtpError::ConnectionError(io) if io.kind() == std::io::ErrorKind::TimedOut => {
                FetchError::Timeout(format!("connect {}: {io}", self.host))
            }
            other => FetchError::Network(other.to_string()),
        })?;
        stream
            .get_ref()
            .set_read_timeout(Some(self.timeout))
            .map_err(|e| FetchError::Network(e.to_string()))?;
        stream.login(&self.user, &self.password).map_err(session_err)?;
        info!("FTP session opened to {}", self.host);
        Ok(stream)
    }
}

impl FtpSession for FtpStream {
    fn download(&mut self, dir: &str, file: &str) -> Result<Vec<u8>, FetchError> {
        self.cwd(dir).map_err(session_err)?;
        let buf = self.retr_as_buffer(file).map_err(session_err)?;
        debug!("FTP fetched {}/{} ({} bytes)", dir, file, buf.get_ref().len());
        Ok(buf.into_inner())
    }

    fn close(&mut self) {
        if let Err(e) = self.quit() {
            debug!("FTP quit failed: {}", e);
        }
    }
}
