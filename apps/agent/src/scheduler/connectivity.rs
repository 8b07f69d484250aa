use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use tokio::net::TcpStream;
use tracing::debug;

/// Network precondition checked before every scheduled run.
#[async_trait]
pub trait Connectivity: Send + Sync {
    async fn is_online(&self) -> bool;
}

/// Online when a TCP connection to the backend host can be opened.
pub struct HostReachability {
    host: String,
    port: u16,
    timeout: Duration,
}

impl HostReachability {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
        }
    }

    /// Reachability check for the host of `base_url`, or `None` if it has no host.
    pub fn for_base_url(base_url: &str, timeout: Duration) -> Option<Self> {
        let url = Url::parse(base_url).ok()?;
        let host = url.host_str()?.to_string();
        let port = url.port_or_known_default()?;
        Some(Self::new(host, port, timeout))
    }
}

#[async_trait]
impl Connectivity for HostReachability {
    async fn is_online(&self) -> bool {
        let addr = (self.host.as_str(), self.port);
        match tokio::time::timeout(self.timeout, TcpStream::connect(addr)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!("{}:{} unreachable: {e}", self.host, self.port);
                false
            }
            Err(_) => {
                debug!("{}:{} connect timed out", self.host, self.port);
                false
            }
        }
    }
}

/// No precondition.
pub struct AlwaysOnline;

#[async_trait]
impl Connectivity for AlwaysOnline {
    async fn is_online(&self) -> bool {
        true
    }
}
