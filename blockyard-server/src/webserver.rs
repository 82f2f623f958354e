//! HTTP and WebSocket endpoints.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context as _;
use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::{Json, Response};
use axum::routing::get;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt as _, StreamExt as _};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use blockyard::session::{World, run_connection};
use blockyard::sync::{ErrorKind, ErrorReport, ServerMessage};

use crate::config::Args;

/// Capacity of the queue of messages from a client not yet processed by its session.
const INBOUND_QUEUE: usize = 64;
/// Capacity of the queue of messages to a client not yet written to its socket.
const OUTBOUND_QUEUE: usize = 64;

/// Builds the world described by `args`, listens, and serves until Ctrl-C.
///
/// The listening URL is printed to stdout as soon as it is known.
pub async fn server_main(args: Args) -> Result<(), anyhow::Error> {
    let config = args.server_config()?;
    let world =
        Arc::new(World::new(config.world, &config.terrain).context("failed to create world")?);

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;
    let local_addr: SocketAddr = listener.local_addr()?;

    // Tests read this line to learn the port.
    println!("http://{local_addr}/");
    log::info!("listening on {local_addr}");

    axum::serve(listener, router(world))
        .with_graceful_shutdown(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => log::info!("shutting down"),
                Err(e) => log::error!("failed to listen for Ctrl-C: {e}"),
            }
        })
        .await
        .context("server failed")?;
    Ok(())
}

/// Routes of the server, serving `world`.
pub fn router(world: Arc<World>) -> Router {
    Router::new()
        .route("/ws", get(connect))
        .route("/status", get(status))
        .with_state(world)
}

/// Response body of `GET /status`.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[non_exhaustive]
pub struct Status {
    /// Number of blocks in the world.
    pub blocks: usize,
    /// Number of clients that have completed `hello`.
    pub connections: usize,
    #[allow(missing_docs)]
    pub world_size: i32,
    #[allow(missing_docs)]
    pub world_height: i32,
}

async fn status(State(world): State<Arc<World>>) -> Json<Status> {
    let config = world.config();
    Json(Status {
        blocks: world.block_count(),
        connections: world.entity_count(),
        world_size: config.world_size,
        world_height: config.world_height,
    })
}

async fn connect(ws: WebSocketUpgrade, State(world): State<Arc<World>>) -> Response {
    let max_bytes = world.config().max_message_bytes;
    ws.max_message_size(max_bytes)
        .on_upgrade(move |socket| serve_socket(world, socket))
}

/// Bridges one WebSocket to a session task.
async fn serve_socket(world: Arc<World>, socket: WebSocket) {
    let (sink, stream) = socket.split();
    let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE);
    let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE);

    let reader = tokio::spawn(read_frames(stream, inbound_tx, outbound_tx.clone()));
    let writer = tokio::spawn(write_messages(sink, outbound_rx));

    match run_connection(world, inbound_rx, outbound_tx).await {
        Ok(()) => log::debug!("connection ended"),
        Err(e) => log::warn!("connection closed: {:#}", anyhow::Error::from(e)),
    }

    // The reader holds the last other sender; once it is gone the writer drains the
    // remaining messages and closes the socket.
    reader.abort();
    if let Err(e) = writer.await {
        log::error!("WebSocket writer task failed: {e}");
    }
}

/// Forwards text frames to the session. Binary frames are answered directly.
async fn read_frames(
    mut stream: SplitStream<WebSocket>,
    inbound: mpsc::Sender<String>,
    rejections: mpsc::Sender<ServerMessage>,
) {
    while let Some(frame) = stream.next().await {
        let delivered = match frame {
            Ok(Message::Text(text)) => inbound.send(text.as_str().to_owned()).await.is_ok(),
            Ok(Message::Binary(_)) => rejections
                .send(ServerMessage::error(
                    None,
                    ErrorReport::new(ErrorKind::InvalidRequest, "binary messages are not supported"),
                ))
                .await
                .is_ok(),
            Ok(Message::Close(_)) => false,
            Ok(Message::Ping(_) | Message::Pong(_)) => true,
            Err(e) => {
                log::debug!("WebSocket read failed: {e}");
                false
            }
        };
        if !delivered {
            break;
        }
    }
}

async fn write_messages(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<ServerMessage>,
) {
    while let Some(message) = outbound.recv().await {
        let text = match serde_json::to_string(&message) {
            Ok(text) => text,
            Err(e) => {
                log::error!("failed to serialize {}: {e}", message.type_name());
                continue;
            }
        };
        if let Err(e) = sink.send(Message::Text(text.into())).await {
            log::debug!("WebSocket write failed: {e}");
            return;
        }
    }
    let _ = sink.close().await;
}
