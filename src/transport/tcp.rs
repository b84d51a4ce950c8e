use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::time::{timeout, Duration};

use crate::config::MAX_FRAME_SIZE;
use crate::protocol::Envelope;
use crate::transport::frame::{decode_envelope, read_frame, write_frame};
use crate::transport::Transport;

/// Default timeout for network operations (30 seconds).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client side of a server connection: one framed TCP stream.
pub struct TcpTransport {
    stream: TcpStream,
    timeout_duration: Duration,
    max_frame_size: u32,
}

impl TcpTransport {
    pub fn new(stream: TcpStream) -> Self {
        Self::with_config(stream, DEFAULT_TIMEOUT, MAX_FRAME_SIZE)
    }

    pub fn with_config(stream: TcpStream, timeout_duration: Duration, max_frame_size: u32) -> Self {
        Self {
            stream,
            timeout_duration,
            max_frame_size,
        }
    }

    pub async fn connect<A: ToSocketAddrs>(addr: A) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self::new(stream))
    }
}

#[async_trait::async_trait]
impl Transport for TcpTransport {
    async fn send(&mut self, envelope: Envelope) -> anyhow::Result<()> {
        timeout(
            self.timeout_duration,
            write_frame(&mut self.stream, &envelope, self.max_frame_size),
        )
        .await
        .map_err(|_| anyhow::anyhow!("Send timeout after {:?}", self.timeout_duration))?
    }

    async fn recv(&mut self) -> anyhow::Result<Envelope> {
        let body = timeout(
            self.timeout_duration,
            read_frame(&mut self.stream, self.max_frame_size),
        )
        .await
        .map_err(|_| anyhow::anyhow!("Receive timeout after {:?}", self.timeout_duration))??;
        match body {
            Some(body) => decode_envelope(&body),
            None => Err(anyhow::anyhow!("Connection closed by peer")),
        }
    }
}
