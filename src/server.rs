//! TCP front end: accepts connections, feeds their frames to the
//! [`Dispatcher`] and writes the resulting deliveries back out.
//!
//! Each connection gets a reader task and a writer task. The reader
//! dispatches under the [`Hub`] lock and enqueues every delivery onto the
//! target connection's outbox before releasing it, so frames reach each
//! client in the order they were produced. Writers drain their outbox
//! outside the lock.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, error, info, warn};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::time::{timeout, Duration};

use crate::common::ConnectionId;
use crate::config::ServerConfig;
use crate::dispatcher::{Delivery, Dispatcher};
use crate::protocol::Envelope;
use crate::registry::Registry;
use crate::transport::frame::{decode_envelope, read_frame, write_frame};

struct HubState {
    dispatcher: Dispatcher,
    outboxes: HashMap<ConnectionId, UnboundedSender<Envelope>>,
    next_connection: u64,
}

impl HubState {
    fn enqueue(&self, deliveries: Vec<Delivery>) {
        for Delivery { connection, message } in deliveries {
            let Some(outbox) = self.outboxes.get(&connection) else {
                debug!("{}: gone, dropping {}", connection, message.kind());
                continue;
            };
            let envelope = match message.to_envelope() {
                Ok(envelope) => envelope,
                Err(e) => {
                    error!("{}: failed to encode {}: {}", connection, message.kind(), e);
                    continue;
                }
            };
            if outbox.send(envelope).is_err() {
                debug!("{}: writer closed, dropping {}", connection, message.kind());
            }
        }
    }
}

/// Shared server state: the dispatcher plus one outbox per live
/// connection, all behind a single lock.
#[derive(Clone)]
pub struct Hub {
    state: Arc<Mutex<HubState>>,
}

impl Hub {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            state: Arc::new(Mutex::new(HubState {
                dispatcher,
                outboxes: HashMap::new(),
                next_connection: 0,
            })),
        }
    }

    fn lock(&self) -> anyhow::Result<MutexGuard<'_, HubState>> {
        self.state
            .lock()
            .map_err(|_| anyhow::anyhow!("server state lock poisoned"))
    }

    /// Allocates a connection id and its outbox.
    pub fn connect(&self) -> anyhow::Result<(ConnectionId, UnboundedReceiver<Envelope>)> {
        let mut state = self.lock()?;
        let id = ConnectionId(state.next_connection);
        state.next_connection += 1;
        let (tx, rx) = unbounded_channel();
        state.outboxes.insert(id, tx);
        Ok((id, rx))
    }

    /// Handles one inbound envelope and enqueues what it produced. A failed
    /// command is logged and produces nothing.
    pub fn dispatch(&self, origin: ConnectionId, envelope: &Envelope) -> anyhow::Result<()> {
        let mut state = self.lock()?;
        match state.dispatcher.dispatch(origin, envelope) {
            Ok(deliveries) => state.enqueue(deliveries),
            Err(e) => error!("{}: {} failed: {:#}", origin, envelope.kind, e),
        }
        Ok(())
    }

    /// Forgets the connection's outbox and tells the registry it is gone.
    pub fn disconnect(&self, connection: ConnectionId) -> anyhow::Result<()> {
        let mut state = self.lock()?;
        state.outboxes.remove(&connection);
        let deliveries = state.dispatcher.disconnect(connection);
        state.enqueue(deliveries);
        Ok(())
    }

    /// Number of connections with a live outbox.
    pub fn connection_count(&self) -> usize {
        self.lock().map(|s| s.outboxes.len()).unwrap_or(0)
    }
}

pub struct Server {
    listener: TcpListener,
    hub: Hub,
    config: Arc<ServerConfig>,
}

impl Server {
    pub async fn bind(config: ServerConfig) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(&config.bind).await?;
        let registry = match config.seed {
            Some(seed) => Registry::with_seed(seed),
            None => {
                let mut seed_rng = rand::rng();
                Registry::new(SmallRng::from_rng(&mut seed_rng))
            }
        };
        Ok(Self {
            listener,
            hub: Hub::new(Dispatcher::new(registry)),
            config: Arc::new(config),
        })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn hub(&self) -> Hub {
        self.hub.clone()
    }

    /// Accepts connections until the listener fails.
    pub async fn run(self) -> anyhow::Result<()> {
        info!("listening on {}", self.local_addr()?);
        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("accept failed: {}", e);
                    continue;
                }
            };
            if let Err(e) = stream.set_nodelay(true) {
                debug!("{}: set_nodelay failed: {}", peer, e);
            }
            let hub = self.hub.clone();
            let config = Arc::clone(&self.config);
            tokio::spawn(async move {
                if let Err(e) = serve_connection(hub, stream, config).await {
                    error!("{}: {:#}", peer, e);
                }
            });
        }
    }
}

/// Runs one client connection to completion.
pub async fn serve_connection<S>(hub: Hub, stream: S, config: Arc<ServerConfig>) -> anyhow::Result<()>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (id, outbox) = hub.connect()?;
    info!("{} connected", id);
    let (mut reader, writer) = tokio::io::split(stream);

    let mut writer_task = tokio::spawn(write_loop(
        writer,
        outbox,
        config.max_frame_size,
        config.write_timeout,
    ));

    let read = read_loop(&hub, id, &mut reader, config.max_frame_size);
    tokio::pin!(read);
    let writer_done = tokio::select! {
        res = &mut read => {
            if let Err(e) = res {
                warn!("{}: {:#}", id, e);
            }
            false
        }
        res = &mut writer_task => {
            log_writer_exit(id, res);
            true
        }
    };

    // Dropping the outbox sender lets the writer drain and stop.
    hub.disconnect(id)?;
    if !writer_done {
        log_writer_exit(id, writer_task.await);
    }
    info!("{} disconnected", id);
    Ok(())
}

async fn read_loop<R>(
    hub: &Hub,
    id: ConnectionId,
    reader: &mut R,
    max_frame_size: u32,
) -> anyhow::Result<()>
where
    R: AsyncRead + Unpin,
{
    while let Some(body) = read_frame(reader, max_frame_size).await? {
        match decode_envelope(&body) {
            Ok(envelope) => hub.dispatch(id, &envelope)?,
            Err(e) => warn!("{}: {}", id, e),
        }
    }
    Ok(())
}

async fn write_loop<W>(
    mut writer: W,
    mut outbox: UnboundedReceiver<Envelope>,
    max_frame_size: u32,
    write_timeout: Duration,
) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(envelope) = outbox.recv().await {
        timeout(write_timeout, write_frame(&mut writer, &envelope, max_frame_size))
            .await
            .map_err(|_| anyhow::anyhow!("Send timeout after {:?}", write_timeout))??;
    }
    // Peer may already be gone.
    let _ = writer.shutdown().await;
    Ok(())
}

fn log_writer_exit(
    id: ConnectionId,
    res: Result<anyhow::Result<()>, tokio::task::JoinError>,
) {
    match res {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("{}: write failed: {:#}", id, e),
        Err(e) => error!("{}: writer task failed: {}", id, e),
    }
}
