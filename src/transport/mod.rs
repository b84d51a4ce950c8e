use crate::protocol::Envelope;

/// A bidirectional stream of framed envelopes.
#[async_trait::async_trait]
pub trait Transport: Send {
    async fn send(&mut self, envelope: Envelope) -> anyhow::Result<()>;
    async fn recv(&mut self) -> anyhow::Result<Envelope>;
}

pub mod frame;
pub mod tcp;
