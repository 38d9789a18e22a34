//! WebSocket transport: accepts clients and pumps frames in and out of sessions.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use futures::{Sink, SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::error::BoxflowError;
use crate::events::ChannelSink;
use crate::protocol::Outbound;
use crate::session::{Session, WorkflowSettings};

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(addr: SocketAddr, settings: WorkflowSettings) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Backend running on {}", listener.local_addr()?);

    tokio::select! {
        result = serve_listener(listener, settings) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
            Ok(())
        }
    }
}

/// Accept connections on an already bound listener, one task per client.
pub async fn serve_listener(listener: TcpListener, settings: WorkflowSettings) -> Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        let settings = settings.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer, settings).await {
                warn!(%peer, error = %e, "connection ended with error");
            }
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    settings: WorkflowSettings,
) -> Result<(), BoxflowError> {
    let ws = tokio_tungstenite::accept_async(stream).await?;
    debug!(%peer, "websocket handshake complete");
    let (mut ws_tx, mut ws_rx) = ws.split();

    let (tx, rx) = mpsc::unbounded_channel::<Outbound>();
    let mut writer = tokio::spawn(write_frames(rx, ws_tx));

    let mut session = Session::open(ChannelSink::new(tx), settings);
    debug!(%peer, session_id = session.id(), "session opened");
    let result = loop {
        match ws_rx.next().await {
            Some(Ok(Message::Text(text))) => session.handle_text(&text),
            Some(Ok(Message::Close(_))) | None => break Ok(()),
            Some(Ok(_)) => {}
            Some(Err(e)) => break Err(e.into()),
        }
    };

    // Closing drops the last sender; the writer drains what is queued and exits.
    session.close();
    if tokio::time::timeout(WRITER_DRAIN, &mut writer).await.is_err() {
        debug!(%peer, "writer did not drain in time");
        writer.abort();
    }
    result
}

const WRITER_DRAIN: Duration = Duration::from_secs(1);

/// Forward queued messages as JSON text frames, in order, until every sender
/// is gone or the socket fails.
async fn write_frames<W>(mut rx: UnboundedReceiver<Outbound>, mut ws_tx: W)
where
    W: Sink<Message> + Unpin,
{
    while let Some(message) = rx.recv().await {
        let text = match serde_json::to_string(&message) {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, "failed to encode outbound message");
                continue;
            }
        };
        if ws_tx.send(Message::Text(text)).await.is_err() {
            break;
        }
    }
    let _ = ws_tx.close().await;
}
