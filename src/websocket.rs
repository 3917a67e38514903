use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::{Json, Response},
};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::dispatcher::Dispatcher;
use crate::registry::ClientChannel;
use crate::signaling::generate_client_id;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    status: &'static str,
}

pub async fn health_check() -> Json<HealthStatus> {
    Json(HealthStatus { status: "ok" })
}

/// WebSocket upgrade handler for `GET /socket`.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(dispatcher): State<Dispatcher>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, dispatcher))
}

/// Drive one client connection.
///
/// The socket is split into a reader loop owned by this task and a writer
/// task draining the connection's outbound channel. The writer task is the
/// only writer to the socket, so frames from concurrent broadcasts never
/// interleave.
async fn handle_socket(socket: WebSocket, dispatcher: Dispatcher) {
    let client_id = generate_client_id();
    let (mut sender, mut receiver) = socket.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let writer_id = client_id.clone();
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sender.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
        debug!("writer task ended for client {writer_id}");
    });

    let channel = ClientChannel::new(tx);
    dispatcher.client_connected(&client_id, channel.clone()).await;
    debug!("WebSocket connected: client={client_id}");

    while let Some(frame) = receiver.next().await {
        let msg = match frame {
            Ok(msg) => msg,
            Err(err) => {
                error!("WebSocket error from client {client_id}: {err}");
                break;
            }
        };

        match msg {
            Message::Text(text) => {
                dispatcher.message_received(&client_id, &channel, &text).await;
            }
            Message::Binary(data) => {
                // Some clients put JSON in binary frames; treat it the same.
                match String::from_utf8(data) {
                    Ok(text) => dispatcher.message_received(&client_id, &channel, &text).await,
                    Err(_) => debug!("ignoring non-UTF8 binary frame from client {client_id}"),
                }
            }
            Message::Close(_) => {
                debug!("received Close frame from client {client_id}");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    dispatcher.client_disconnected(&client_id).await;
    debug!("WebSocket disconnected: client={client_id}");
}
