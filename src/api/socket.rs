// ==================== WEBSOCKET SESSIONS ====================
// One task per socket. The client joins its own room, then the task
// forwards hub events until either side goes away or the hub stops.
// Idle clients are pinged and dropped once they miss CLIENT_TIMEOUT.

use actix_web::{web, HttpRequest, HttpResponse};
use actix_ws::{Message, MessageStream, Session};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

use crate::middleware::auth::AuthenticatedUser;
use crate::services::{FanoutEvent, FanoutHub, Subscription};
use crate::state::AppState;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(15);

/// Tracks the last frame seen from the client
#[derive(Debug, Clone, Copy)]
struct Heartbeat {
    last_seen: Instant,
}

impl Heartbeat {
    fn new(now: Instant) -> Self {
        Self { last_seen: now }
    }

    fn seen(&mut self, now: Instant) {
        self.last_seen = now;
    }

    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_seen) > CLIENT_TIMEOUT
    }
}

/// Messages a client may send
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    Join {
        #[serde(rename = "userId")]
        user_id: String,
    },
    Leave,
}

/// Control replies; room events are forwarded as `FanoutEvent`
#[derive(Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    Joined {
        #[serde(rename = "userId")]
        user_id: String,
    },
    Left,
    Error {
        message: String,
    },
}

impl ServerMessage {
    fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}

/// Applies one client frame to the session's room membership
pub fn handle_client_text(
    hub: &FanoutHub,
    caller: &AuthenticatedUser,
    subscription: &mut Option<Subscription>,
    text: &str,
) -> ServerMessage {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => return ServerMessage::error(format!("Unrecognised message: {}", e)),
    };

    match message {
        ClientMessage::Join { user_id } if user_id != caller.user_id() => {
            log::warn!("⚠️  {} tried to join room {}", caller.user_id(), user_id);
            ServerMessage::error("You can only join your own room")
        }
        ClientMessage::Join { user_id } => {
            if subscription.is_some() {
                return ServerMessage::Joined { user_id };
            }
            match hub.join(&user_id) {
                Ok(sub) => {
                    *subscription = Some(sub);
                    ServerMessage::Joined { user_id }
                }
                Err(e) => ServerMessage::error(e.public_message()),
            }
        }
        ClientMessage::Leave => {
            *subscription = None;
            ServerMessage::Left
        }
    }
}

async fn next_event(subscription: &mut Option<Subscription>) -> Option<FanoutEvent> {
    match subscription {
        Some(sub) => sub.recv().await,
        None => std::future::pending().await,
    }
}

async fn send_json<T: Serialize>(session: &mut Session, message: &T) -> bool {
    match serde_json::to_string(message) {
        Ok(text) => session.text(text).await.is_ok(),
        Err(e) => {
            log::error!("❌ Failed to encode socket message: {}", e);
            true
        }
    }
}

async fn run_session(hub: FanoutHub, caller: AuthenticatedUser, mut session: Session, mut stream: MessageStream) {
    let mut subscription: Option<Subscription> = None;
    let mut heartbeat = Heartbeat::new(Instant::now());
    let mut ticker = tokio::time::interval_at(Instant::now() + HEARTBEAT_INTERVAL, HEARTBEAT_INTERVAL);
    log::info!("🔌 Socket opened for {}", caller.user_id());

    loop {
        tokio::select! {
            msg = stream.next() => {
                if let Some(Ok(_)) = &msg {
                    heartbeat.seen(Instant::now());
                }
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = handle_client_text(&hub, &caller, &mut subscription, &text);
                        if !send_json(&mut session, &reply).await {
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(bytes))) => {
                        if session.pong(&bytes).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(reason))) => {
                        log::info!("🔌 Socket closed by {}", caller.user_id());
                        let _ = session.close(reason).await;
                        return;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        log::warn!("⚠️  Socket protocol error for {}: {}", caller.user_id(), e);
                        break;
                    }
                    None => break,
                }
            },
            event = next_event(&mut subscription) => match event {
                Some(event) => {
                    if !send_json(&mut session, &event).await {
                        break;
                    }
                }
                None => {
                    // Hub stopped
                    break;
                }
            },
            now = ticker.tick() => {
                if heartbeat.is_expired(now) {
                    log::warn!("⏱️  Socket for {} timed out", caller.user_id());
                    break;
                }
                if session.ping(b"").await.is_err() {
                    break;
                }
            },
        }
    }

    drop(subscription);
    let _ = session.close(None).await;
    log::info!("🔌 Socket ended for {}", caller.user_id());
}

/// GET /socket - upgrade to a WebSocket carrying connection events
pub async fn socket(
    req: HttpRequest,
    body: web::Payload,
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
) -> Result<HttpResponse, actix_web::Error> {
    let (response, session, stream) = actix_ws::handle(&req, body)?;

    actix_rt::spawn(run_session(state.hub.clone(), caller, session, stream));

    Ok(response)
}
