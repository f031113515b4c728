//! WebSocket handler
//!
//! One task pair per connection: the reader decodes frames and runs handlers
//! synchronously (request order == read order == response order), the writer
//! drains the outbound queue into the socket. Every disconnect cause - read
//! error, write error, client close, sweep eviction - converges on the same
//! cleanup path so the registry never keeps a stale entry.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        ConnectInfo, State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::connection::{Connection, OUTBOUND_QUEUE_CAPACITY};
use crate::handlers;
use crate::protocol::{ResponseFrame, StatusCode};
use crate::server::GatewayState;
use crate::unix_now;

/// WebSocket gateway handler
pub async fn ws_handler(
    State(state): State<GatewayState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket, addr))
}

/// Handle an upgraded WebSocket connection
async fn handle_socket(state: GatewayState, socket: WebSocket, addr: SocketAddr) {
    let (tx, mut rx) = mpsc::channel::<String>(OUTBOUND_QUEUE_CAPACITY);
    let conn = Connection::new(addr.to_string(), tx, unix_now());

    state.registry().register(conn.clone()).await;
    tracing::info!(conn_id = %conn.id(), addr = %addr, "WebSocket connection established");

    let (mut ws_sink, mut ws_stream) = socket.split();

    // Reader: socket frames in, handlers run here, responses enqueued.
    let state_recv = state.clone();
    let conn_recv = conn.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(msg) = ws_stream.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    let response = handlers::dispatch(&state_recv, &conn_recv, &text).await;
                    enqueue_response(&conn_recv, &response);
                }
                Ok(Message::Binary(_)) => {
                    tracing::debug!(conn_id = %conn_recv.id(), "Binary frames not supported");
                    let response = ResponseFrame::status("", "", StatusCode::ParameterIllegal);
                    enqueue_response(&conn_recv, &response);
                }
                Ok(Message::Ping(_) | Message::Pong(_)) => {
                    tracing::trace!(conn_id = %conn_recv.id(), "WebSocket ping/pong");
                }
                Ok(Message::Close(_)) => {
                    tracing::info!(conn_id = %conn_recv.id(), "Client closed connection");
                    return;
                }
                Err(err) => {
                    tracing::warn!(conn_id = %conn_recv.id(), error = %err, "WebSocket read error");
                    return;
                }
            }
        }
    });

    // Writer: outbound queue to socket, stopped by close() or a write error.
    let conn_send = conn.clone();
    let send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                maybe = rx.recv() => match maybe {
                    Some(frame) => {
                        if ws_sink.send(Message::Text(frame)).await.is_err() {
                            tracing::warn!(conn_id = %conn_send.id(), "WebSocket write error");
                            break;
                        }
                    }
                    None => break,
                },
                () = conn_send.closed() => break,
            }
        }
        let _ = ws_sink.close().await;
    });

    tokio::select! {
        _ = recv_task => {}
        _ = send_task => {}
    }

    // Single exit path for every disconnect cause.
    conn.close();
    state.registry().unregister(conn.clone()).await;
    tracing::info!(conn_id = %conn.id(), addr = %addr, "Connection cleaned up");
}

/// Enqueue a response frame, dropping (with a log) rather than blocking.
fn enqueue_response(conn: &Arc<Connection>, response: &ResponseFrame) {
    match response.to_json() {
        Ok(json) => {
            if let Err(err) = conn.enqueue(json) {
                tracing::warn!(
                    conn_id = %conn.id(),
                    seq = %response.seq,
                    error = %err,
                    "Response dropped"
                );
            }
        }
        Err(err) => {
            tracing::error!(conn_id = %conn.id(), error = %err, "Response failed to serialize");
        }
    }
}
