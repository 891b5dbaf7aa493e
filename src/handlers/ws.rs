use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

use crate::auth::jwt::verify_token;
use crate::models::recognition::Recognition;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    token: Option<String>,
}

/// Push event. `user_id` is the only recipient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GardenEvent {
    RecognitionReceived {
        user_id: Uuid,
        recognition_id: Uuid,
        sender_id: Uuid,
        category_id: i32,
    },
}

impl GardenEvent {
    pub fn recognition_received(recognition: &Recognition) -> Self {
        GardenEvent::RecognitionReceived {
            user_id: recognition.receiver_id,
            recognition_id: recognition.id,
            sender_id: recognition.sender_id,
            category_id: recognition.category_id,
        }
    }

    pub fn recipient(&self) -> Uuid {
        match self {
            GardenEvent::RecognitionReceived { user_id, .. } => *user_id,
        }
    }
}

/// Fans an event out to connected sockets. No subscribers is not an error.
pub fn publish(state: &AppState, event: &GardenEvent) {
    match serde_json::to_string(event) {
        Ok(payload) => {
            let receivers = state.ws_tx.send(payload).unwrap_or(0);
            tracing::debug!(user_id = %event.recipient(), receivers, "Event published");
        }
        Err(e) => tracing::error!(error = %e, "Failed to encode event"),
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
) -> Response {
    let user_id = match authenticate_ws(&state, query.token.as_deref()) {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!("WebSocket auth failed: {}", e);
            return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, user_id))
}

fn authenticate_ws(state: &AppState, token: Option<&str>) -> Result<Uuid, &'static str> {
    let token = token.ok_or("Missing token query parameter")?;
    let token_data =
        verify_token(token, &state.config.jwt_secret).map_err(|_| "Invalid or expired token")?;
    Ok(token_data.claims.sub)
}

fn is_for(payload: &str, user_id: Uuid) -> bool {
    serde_json::from_str::<GardenEvent>(payload)
        .map(|event| event.recipient() == user_id)
        .unwrap_or(false)
}

/// Next payload addressed to `user_id`. A lagging receiver skips what it
/// missed and keeps going; `None` only once the channel is closed.
async fn next_event_for(rx: &mut broadcast::Receiver<String>, user_id: Uuid) -> Option<String> {
    loop {
        match rx.recv().await {
            Ok(payload) if is_for(&payload, user_id) => return Some(payload),
            Ok(_) => continue,
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(user_id = %user_id, skipped, "WebSocket receiver lagged");
            }
            Err(RecvError::Closed) => return None,
        }
    }
}

async fn handle_socket(socket: WebSocket, state: AppState, user_id: Uuid) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = state.ws_tx.subscribe();

    tracing::debug!(user_id = %user_id, "WebSocket connection established");

    let mut send_task = tokio::spawn(async move {
        while let Some(payload) = next_event_for(&mut rx, user_id).await {
            if sender.send(Message::Text(payload)).await.is_err() {
                break;
            }
        }
    });

    // Clients only listen; drain until they close.
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    tracing::debug!(user_id = %user_id, "WebSocket connection closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_reach_only_their_recipient() {
        let (receiver, other) = (Uuid::new_v4(), Uuid::new_v4());
        let event = GardenEvent::RecognitionReceived {
            user_id: receiver,
            recognition_id: Uuid::new_v4(),
            sender_id: other,
            category_id: 2,
        };
        let payload = serde_json::to_string(&event).unwrap();
        assert!(payload.contains(r#""type":"recognition_received""#));
        assert!(is_for(&payload, receiver));
        assert!(!is_for(&payload, other));
        assert!(!is_for("not json", receiver));
    }

    fn event_for(user_id: Uuid) -> String {
        serde_json::to_string(&GardenEvent::RecognitionReceived {
            user_id,
            recognition_id: Uuid::new_v4(),
            sender_id: Uuid::new_v4(),
            category_id: 1,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn lagging_subscriber_keeps_receiving() {
        let (tx, mut rx) = broadcast::channel(2);
        let (user, other) = (Uuid::new_v4(), Uuid::new_v4());
        for _ in 0..5 {
            tx.send(event_for(user)).unwrap();
        }
        tx.send(event_for(other)).unwrap();
        let last = event_for(user);
        tx.send(last.clone()).unwrap();

        // the oldest five are gone; the newest one for this user survives
        assert_eq!(next_event_for(&mut rx, user).await, Some(last));

        drop(tx);
        assert_eq!(next_event_for(&mut rx, user).await, None);
    }
}
