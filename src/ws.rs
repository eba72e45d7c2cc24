use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt, Sink};
use tokio::sync::broadcast::{self, error::RecvError};

use crate::protocol::{into_patch, ClientMessage, ServerMessage};
use crate::store::DocumentStore;
use crate::sync::Snapshot;

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(store): State<DocumentStore>,
) -> impl IntoResponse {
    tracing::info!("WebSocket connection request");
    ws.on_upgrade(move |socket| handle_socket(socket, store))
}

/// Active subscription of one connection
struct Subscription {
    document: String,
    rx: broadcast::Receiver<Snapshot>,
}

/// Handle individual WebSocket connection. A connection follows at most one
/// document; subscribing again switches to the new one.
async fn handle_socket(socket: WebSocket, store: DocumentStore) {
    let (mut sender, mut receiver) = socket.split();
    let mut subscription: Option<Subscription> = None;

    loop {
        tokio::select! {
            incoming = receiver.next() => {
                let Some(msg) = incoming else { break };
                match msg {
                    Ok(Message::Text(text)) => {
                        tracing::debug!("Received frame: {}", text);
                        let responses = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                handle_client_message(client_msg, &store, &mut subscription).await
                            }
                            Err(e) => {
                                tracing::warn!("Failed to parse client frame: {}", e);
                                vec![ServerMessage::error(
                                    "PARSE_ERROR",
                                    format!("Invalid message format: {}", e),
                                )]
                            }
                        };
                        if send_all(&mut sender, responses).await.is_err() {
                            tracing::error!("Failed to send response");
                            break;
                        }
                    }
                    Ok(Message::Close(_)) => {
                        tracing::info!("WebSocket closed");
                        break;
                    }
                    Ok(Message::Ping(data)) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                }
            }

            update = async {
                match &mut subscription {
                    Some(sub) => Some(next_snapshot(sub, &store).await),
                    // Not subscribed: wait forever
                    None => std::future::pending::<Option<Option<Snapshot>>>().await,
                }
            } => {
                match update.flatten() {
                    Some(snapshot) => {
                        let frame = vec![ServerMessage::Snapshot(snapshot)];
                        if send_all(&mut sender, frame).await.is_err() {
                            break;
                        }
                    }
                    None => {
                        tracing::warn!("Document channel closed, dropping subscription");
                        subscription = None;
                    }
                }
            }
        }
    }

    tracing::info!("WebSocket connection closed");
}

/// Next snapshot for a subscriber. A lagging subscriber jumps straight to
/// the current state; snapshots are complete so nothing is lost.
async fn next_snapshot(sub: &mut Subscription, store: &DocumentStore) -> Option<Snapshot> {
    match sub.rx.recv().await {
        Ok(snapshot) => Some(snapshot),
        Err(RecvError::Lagged(skipped)) => {
            tracing::debug!("Subscriber of {} lagged by {}", sub.document, skipped);
            sub.rx = sub.rx.resubscribe();
            Some(store.snapshot(&sub.document).await)
        }
        Err(RecvError::Closed) => None,
    }
}

async fn send_all<S>(sender: &mut S, messages: Vec<ServerMessage>) -> Result<(), axum::Error>
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    for msg in messages {
        match serde_json::to_string(&msg) {
            Ok(json) => sender.send(Message::Text(json.into())).await?,
            Err(e) => tracing::error!("Failed to encode frame: {}", e),
        }
    }
    Ok(())
}

async fn handle_client_message(
    msg: ClientMessage,
    store: &DocumentStore,
    subscription: &mut Option<Subscription>,
) -> Vec<ServerMessage> {
    match msg {
        ClientMessage::Subscribe { document } => {
            tracing::info!("Subscribing to {}", document);
            let (snapshot, rx) = store.subscribe(&document).await;
            *subscription = Some(Subscription { document, rx });
            vec![ServerMessage::Snapshot(snapshot)]
        }

        ClientMessage::Write {
            document,
            write_id,
            ops,
        } => {
            if ops.is_empty() {
                return vec![ServerMessage::error("EMPTY_WRITE", "write carries no ops")];
            }
            let snapshot = store.apply(&document, &into_patch(ops)).await;
            vec![ServerMessage::Ack {
                write_id,
                version: snapshot.version,
            }]
        }

        ClientMessage::Ping => vec![ServerMessage::Pong],
    }
}
