// ==================== REAL-TIME FAN-OUT ====================
// In-process pub/sub keyed by user id. Each open socket holds one
// Subscription in its owner's room. Delivery is best-effort and
// at-most-once: offline users catch up through the regular endpoints.

use crate::utils::AppError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Events pushed to live sessions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum FanoutEvent {
    /// Something about the recipient's connections changed, refetch
    ConnectionUpdate {
        #[serde(rename = "connectionId")]
        connection_id: String,
    },
    /// `user_id` accepted the recipient's request
    ConnectionAccepted {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "connectionId")]
        connection_id: String,
    },
}

impl FanoutEvent {
    pub fn connection_update(connection_id: &str) -> Self {
        FanoutEvent::ConnectionUpdate {
            connection_id: connection_id.to_string(),
        }
    }

    pub fn connection_accepted(accepted_by: &str, connection_id: &str) -> Self {
        FanoutEvent::ConnectionAccepted {
            user_id: accepted_by.to_string(),
            connection_id: connection_id.to_string(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FanoutEvent::ConnectionUpdate { .. } => "connection_update",
            FanoutEvent::ConnectionAccepted { .. } => "connection_accepted",
        }
    }
}

type SessionId = u64;

#[derive(Default)]
struct HubState {
    running: bool,
    next_session: SessionId,
    rooms: HashMap<String, HashMap<SessionId, UnboundedSender<FanoutEvent>>>,
}

/// Room registry shared by every worker. Cloning shares the same rooms.
#[derive(Clone, Default)]
pub struct FanoutHub {
    inner: Arc<RwLock<HubState>>,
}

impl FanoutHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HubState> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HubState> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn start(&self) {
        self.write().running = true;
        log::info!("📡 Fan-out hub started");
    }

    /// Drops every session sender, which ends all attached sockets
    pub fn stop(&self) {
        let mut state = self.write();
        state.running = false;
        let sessions: usize = state.rooms.values().map(HashMap::len).sum();
        state.rooms.clear();
        log::info!("📡 Fan-out hub stopped ({} sessions closed)", sessions);
    }

    pub fn is_running(&self) -> bool {
        self.read().running
    }

    pub fn join(&self, user_id: &str) -> Result<Subscription, AppError> {
        let mut state = self.write();
        if !state.running {
            return Err(AppError::Internal("fan-out hub is not running".to_string()));
        }

        state.next_session += 1;
        let session_id = state.next_session;
        let (sender, receiver) = unbounded_channel();
        state
            .rooms
            .entry(user_id.to_string())
            .or_default()
            .insert(session_id, sender);

        log::debug!("📡 Session {} joined room {}", session_id, user_id);

        Ok(Subscription {
            hub: self.clone(),
            user_id: user_id.to_string(),
            session_id,
            receiver,
        })
    }

    fn leave(&self, user_id: &str, session_id: SessionId) {
        let mut state = self.write();
        if let Some(room) = state.rooms.get_mut(user_id) {
            room.remove(&session_id);
            if room.is_empty() {
                state.rooms.remove(user_id);
            }
        }
    }

    /// Sends `event` to every live session in `user_id`'s room.
    /// Returns how many sessions it reached.
    pub fn publish(&self, user_id: &str, event: FanoutEvent) -> usize {
        let mut state = self.write();
        if !state.running {
            return 0;
        }

        let Some(room) = state.rooms.get_mut(user_id) else {
            return 0;
        };

        room.retain(|_, sender| sender.send(event.clone()).is_ok());
        let delivered = room.len();
        if room.is_empty() {
            state.rooms.remove(user_id);
        }

        log::debug!("📡 {} → {} ({} sessions)", event.name(), user_id, delivered);
        delivered
    }

    #[cfg(test)]
    pub fn room_size(&self, user_id: &str) -> usize {
        self.read().rooms.get(user_id).map_or(0, HashMap::len)
    }

    pub fn session_count(&self) -> usize {
        self.read().rooms.values().map(HashMap::len).sum()
    }
}

/// Membership of one session in one room; dropping it leaves the room
pub struct Subscription {
    hub: FanoutHub,
    user_id: String,
    session_id: SessionId,
    receiver: UnboundedReceiver<FanoutEvent>,
}

impl Subscription {
    /// `None` once the hub has stopped
    pub async fn recv(&mut self) -> Option<FanoutEvent> {
        self.receiver.recv().await
    }

    #[cfg(test)]
    pub fn try_recv(&mut self) -> Option<FanoutEvent> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.leave(&self.user_id, self.session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running_hub() -> FanoutHub {
        let hub = FanoutHub::new();
        hub.start();
        hub
    }

    #[test]
    fn test_publish_reaches_only_the_room() {
        let hub = running_hub();
        let mut alice_tab1 = hub.join("alice").unwrap();
        let mut alice_tab2 = hub.join("alice").unwrap();
        let mut bob = hub.join("bob").unwrap();

        let delivered = hub.publish("alice", FanoutEvent::connection_update("c1"));
        assert_eq!(delivered, 2);
        assert_eq!(alice_tab1.try_recv(), Some(FanoutEvent::connection_update("c1")));
        assert_eq!(alice_tab2.try_recv(), Some(FanoutEvent::connection_update("c1")));
        assert_eq!(bob.try_recv(), None);
    }

    #[test]
    fn test_dropped_subscription_leaves_room() {
        let hub = running_hub();
        let sub = hub.join("alice").unwrap();
        assert_eq!(hub.room_size("alice"), 1);
        drop(sub);
        assert_eq!(hub.room_size("alice"), 0);
        assert_eq!(hub.publish("alice", FanoutEvent::connection_update("c1")), 0);
    }

    #[test]
    fn test_offline_user_never_receives_past_events() {
        let hub = running_hub();
        assert_eq!(hub.publish("carol", FanoutEvent::connection_accepted("dave", "c9")), 0);
        let mut carol = hub.join("carol").unwrap();
        assert_eq!(carol.try_recv(), None);
    }

    #[tokio::test]
    async fn test_stop_closes_sessions_and_refuses_joins() {
        let hub = running_hub();
        let mut sub = hub.join("alice").unwrap();
        hub.stop();

        assert_eq!(sub.recv().await, None);
        assert!(!hub.is_running());
        assert!(hub.join("alice").is_err());
        assert_eq!(hub.publish("alice", FanoutEvent::connection_update("c1")), 0);
        assert_eq!(hub.session_count(), 0);
    }

    #[test]
    fn test_wire_format() {
        let event = FanoutEvent::connection_accepted("bob", "c1");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "event": "connection_accepted",
                "data": { "userId": "bob", "connectionId": "c1" }
            })
        );
        assert_eq!(
            serde_json::to_value(FanoutEvent::connection_update("c2")).unwrap()["event"],
            "connection_update"
        );
    }
}
