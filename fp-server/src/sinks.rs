//! Position sink implementations
//!
//! Sinks forward GPS position reports to external destinations (HTTP, UDP, file).
//! Delivery is fire-and-forget: failures are logged and never retried.

use anyhow::{Context, Result};
use fp_core::PositionReport;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const HTTP_SINK_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for an external position sink
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SinkConfig {
    #[serde(default)]
    pub id: String,
    pub sink_type: SinkType,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkType {
    Http { url: String },
    Udp { host: String, port: u16 },
    File { path: String },
}

/// Trait for position sinks
pub trait Sink: Send {
    fn send(&mut self, report: &PositionReport) -> Result<()>;
}

/// HTTP POST sink
pub struct HttpSink {
    url: String,
    client: reqwest::Client,
}

impl HttpSink {
    pub fn new(url: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_SINK_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { url, client })
    }
}

impl Sink for HttpSink {
    fn send(&mut self, report: &PositionReport) -> Result<()> {
        let url = self.url.clone();
        let request = self.client.post(&url).json(report);
        // Fire and forget; the frame loop never waits on the network
        tokio::spawn(async move {
            match request.send().await.and_then(|r| r.error_for_status()) {
                Ok(_) => tracing::trace!("Position delivered to {}", url),
                Err(e) => tracing::warn!("HTTP sink {} error: {}", url, e),
            }
        });
        Ok(())
    }
}

/// UDP sink, one JSON datagram per report
pub struct UdpSink {
    socket: std::net::UdpSocket,
    addr: std::net::SocketAddr,
}

impl UdpSink {
    /// Resolves `host` on the tokio resolver so the dispatcher never blocks on DNS
    pub async fn new(host: String, port: u16) -> Result<Self> {
        let addrs: Vec<std::net::SocketAddr> = tokio::net::lookup_host((host.as_str(), port))
            .await
            .with_context(|| format!("failed to resolve {}:{}", host, port))?
            .collect();
        // IPv4 first; not every host can bind an IPv6 socket
        let addr = addrs
            .iter()
            .find(|a| a.is_ipv4())
            .or_else(|| addrs.first())
            .copied()
            .with_context(|| format!("no address for {}:{}", host, port))?;
        let bind = if addr.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = std::net::UdpSocket::bind(bind)?;
        socket.set_nonblocking(true)?;
        Ok(Self { socket, addr })
    }
}

impl Sink for UdpSink {
    fn send(&mut self, report: &PositionReport) -> Result<()> {
        let json = serde_json::to_vec(report)?;
        self.socket.send_to(&json, self.addr)?;
        Ok(())
    }
}

/// File sink (NDJSON)
pub struct FileSink {
    file: std::fs::File,
}

impl FileSink {
    pub fn new(path: String) -> Result<Self> {
        use std::fs::OpenOptions;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open {}", path))?;
        Ok(Self { file })
    }
}

impl Sink for FileSink {
    fn send(&mut self, report: &PositionReport) -> Result<()> {
        use std::io::Write;
        let json = serde_json::to_string(report)?;
        writeln!(self.file, "{}", json)?;
        Ok(())
    }
}

/// Create a sink from configuration
pub async fn create_sink(config: &SinkConfig) -> Result<Box<dyn Sink>> {
    match &config.sink_type {
        SinkType::Http { url } => Ok(Box::new(HttpSink::new(url.clone())?)),
        SinkType::Udp { host, port } => Ok(Box::new(UdpSink::new(host.clone(), *port).await?)),
        SinkType::File { path } => Ok(Box::new(FileSink::new(path.clone())?)),
    }
}
