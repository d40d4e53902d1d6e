// Connectivity precheck for the active scan path.
//
// Decoding is local, but the capture flow refuses to scan while the device is offline so a
// decoded value is never entered into a record that cannot be submitted.

use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use url::Url;

#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn is_online(&self) -> bool;
}

/// Reachability check: a TCP connect to the submission endpoint within `timeout`.
#[derive(Debug, Clone)]
pub struct TcpConnectivityProbe {
    target: String,
    timeout: Duration,
}

impl TcpConnectivityProbe {
    pub fn new(target: impl Into<String>, timeout: Duration) -> Self {
        Self {
            target: target.into(),
            timeout,
        }
    }

    /// Probe the host/port of `endpoint` (scheme default port when none is given).
    pub fn for_endpoint(endpoint: &Url, timeout: Duration) -> Option<Self> {
        let host = endpoint.host_str()?;
        let port = endpoint.port_or_known_default()?;
        let host = if host.contains(':') && !host.starts_with('[') {
            format!("[{}]", host)
        } else {
            host.to_string()
        };
        Some(Self::new(format!("{}:{}", host, port), timeout))
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

#[async_trait]
impl ConnectivityProbe for TcpConnectivityProbe {
    async fn is_online(&self) -> bool {
        matches!(
            timeout(self.timeout, TcpStream::connect(self.target.as_str())).await,
            Ok(Ok(_))
        )
    }
}

/// Used when the precheck is disabled in settings.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeOnline;

#[async_trait]
impl ConnectivityProbe for AssumeOnline {
    async fn is_online(&self) -> bool {
        true
    }
}
