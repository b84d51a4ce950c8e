//! Length-prefixed JSON framing.
//!
//! Each frame is a 4-byte big-endian body length followed by the
//! JSON-encoded [`Envelope`].

use std::io::ErrorKind;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::protocol::Envelope;

fn io_error(e: std::io::Error, what: &str) -> anyhow::Error {
    match e.kind() {
        ErrorKind::UnexpectedEof => anyhow::anyhow!("Connection closed by peer"),
        ErrorKind::ConnectionReset | ErrorKind::BrokenPipe => {
            anyhow::anyhow!("Connection reset by peer")
        }
        _ => anyhow::anyhow!("{} error: {}", what, e),
    }
}

/// Reads one frame body. Returns `Ok(None)` when the peer closed the stream
/// between frames.
pub async fn read_frame<R>(reader: &mut R, max_frame_size: u32) -> anyhow::Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(io_error(e, "Read")),
    }

    let len = u32::from_be_bytes(len_buf);
    if len == 0 {
        return Err(anyhow::anyhow!("Invalid frame length: 0"));
    }
    if len > max_frame_size {
        return Err(anyhow::anyhow!(
            "Frame too large: {} bytes (max: {})",
            len,
            max_frame_size
        ));
    }

    let mut buf = vec![0u8; len as usize];
    reader
        .read_exact(&mut buf)
        .await
        .map_err(|e| io_error(e, "Read"))?;
    Ok(Some(buf))
}

pub fn decode_envelope(body: &[u8]) -> anyhow::Result<Envelope> {
    serde_json::from_slice(body).map_err(|e| anyhow::anyhow!("Deserialization error: {}", e))
}

/// Writes `envelope` as one complete frame.
pub async fn write_frame<W>(
    writer: &mut W,
    envelope: &Envelope,
    max_frame_size: u32,
) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let data = serde_json::to_vec(envelope)
        .map_err(|e| anyhow::anyhow!("Serialization error: {}", e))?;
    if data.len() as u64 > max_frame_size as u64 {
        return Err(anyhow::anyhow!(
            "Frame too large: {} bytes (max: {})",
            data.len(),
            max_frame_size
        ));
    }

    let mut frame = Vec::with_capacity(4 + data.len());
    frame.extend_from_slice(&(data.len() as u32).to_be_bytes());
    frame.extend_from_slice(&data);
    writer
        .write_all(&frame)
        .await
        .map_err(|e| io_error(e, "Write"))?;
    writer.flush().await.map_err(|e| io_error(e, "Write"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn frame_round_trip_and_clean_eof() {
        let (mut a, mut b) = tokio::io::duplex(1024);
        let env = Envelope::new("turn", json!({"currentPlayer": 1}));
        write_frame(&mut a, &env, 1024).await.unwrap();
        drop(a);

        let body = read_frame(&mut b, 1024).await.unwrap().unwrap();
        assert_eq!(decode_envelope(&body).unwrap(), env);
        assert!(read_frame(&mut b, 1024).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn oversized_and_empty_frames_are_rejected() {
        let (mut a, mut b) = tokio::io::duplex(1024);
        a.write_all(&100u32.to_be_bytes()).await.unwrap();
        let err = read_frame(&mut b, 10).await.unwrap_err();
        assert!(err.to_string().contains("Frame too large"));

        let (mut a, mut b) = tokio::io::duplex(1024);
        a.write_all(&0u32.to_be_bytes()).await.unwrap();
        assert!(read_frame(&mut b, 10).await.is_err());
    }

    #[tokio::test]
    async fn truncated_body_is_an_error() {
        let (mut a, mut b) = tokio::io::duplex(1024);
        a.write_all(&8u32.to_be_bytes()).await.unwrap();
        a.write_all(b"{\"k").await.unwrap();
        drop(a);
        let err = read_frame(&mut b, 1024).await.unwrap_err();
        assert_eq!(err.to_string(), "Connection closed by peer");
    }
}
