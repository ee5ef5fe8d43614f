use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::{event::StreamEvent, orchestrator::EventStream};

/// Reconnect hint written once at the top of every stream.
const RETRY_HINT: &str = "retry: 2000\n\n";

/// Frame one event as an SSE unit: `event: <tag>` plus a single
/// `data:` line carrying the JSON payload.
pub fn encode_event(event: &StreamEvent) -> serde_json::Result<String> {
    let data = serde_json::to_string(event)?;
    Ok(format!("event: {}\ndata: {}\n\n", event.tag(), data))
}

/// Pushes the whole event stream onto `writer`, one flushed frame per
/// event, in exactly the order produced. A failed write or flush drops
/// the stream, which the orchestrator observes as client disconnect.
pub async fn stream_events<W>(mut stream: EventStream, writer: &mut W) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(RETRY_HINT.as_bytes()).await?;
    writer.flush().await?;

    while let Some(event) = stream.next().await {
        let frame = encode_event(&event).map_err(std::io::Error::other)?;
        writer.write_all(frame.as_bytes()).await?;
        writer.flush().await?;
    }

    Ok(())
}
