use super::{ConnectionStore, NotificationStore, UserStore};
use crate::models::{Connection, ConnectionStatus, Notification, NotificationKind, ProfileChanges, Role, User};
use crate::utils::AppError;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Mutex, MutexGuard};

/// Process-local store used by the test suite and by `STORAGE_BACKEND=memory`.
///
/// Every operation runs under one lock, so the multi-row operations
/// (`create_connection`) are atomic here.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    users: Vec<User>,
    connections: Vec<Connection>,
    notifications: Vec<Notification>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, AppError> {
        self.state
            .lock()
            .map_err(|_| AppError::Internal("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        let mut state = self.lock()?;
        if state.users.iter().any(|u| u.email == user.email) {
            return Err(AppError::ValidationError("Email already exists".to_string()));
        }
        state.users.push(user.clone());
        Ok(())
    }

    async fn find_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        Ok(self.lock()?.users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.lock()?.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_users(&self, user_ids: &[String]) -> Result<Vec<User>, AppError> {
        Ok(self
            .lock()?
            .users
            .iter()
            .filter(|u| user_ids.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn list_users_except(&self, user_id: &str) -> Result<Vec<User>, AppError> {
        Ok(self.lock()?.users.iter().filter(|u| u.id != user_id).cloned().collect())
    }

    async fn list_users_by_role(&self, role: Role) -> Result<Vec<User>, AppError> {
        Ok(self.lock()?.users.iter().filter(|u| u.role == role).cloned().collect())
    }

    async fn update_profile(&self, user_id: &str, changes: &ProfileChanges) -> Result<Option<User>, AppError> {
        let mut state = self.lock()?;
        Ok(state.users.iter_mut().find(|u| u.id == user_id).map(|user| {
            changes.apply_to(user);
            user.clone()
        }))
    }
}

#[async_trait]
impl ConnectionStore for MemoryStore {
    async fn create_connection(&self, connection: &Connection, notification: &Notification) -> Result<(), AppError> {
        let mut state = self.lock()?;
        if let Some(existing) = state
            .connections
            .iter()
            .find(|c| c.status.is_active() && c.joins(&connection.from_user_id, &connection.to_user_id))
        {
            return Err(AppError::Conflict(format!(
                "A {} connection already exists between these users",
                existing.status.as_str()
            )));
        }
        state.connections.push(connection.clone());
        state.notifications.push(notification.clone());
        Ok(())
    }

    async fn find_connection(&self, connection_id: &str) -> Result<Option<Connection>, AppError> {
        Ok(self.lock()?.connections.iter().find(|c| c.id == connection_id).cloned())
    }

    async fn find_active_between(&self, a: &str, b: &str) -> Result<Option<Connection>, AppError> {
        Ok(self
            .lock()?
            .connections
            .iter()
            .find(|c| c.status.is_active() && c.joins(a, b))
            .cloned())
    }

    async fn list_connections_for(
        &self,
        user_id: &str,
        statuses: &[ConnectionStatus],
    ) -> Result<Vec<Connection>, AppError> {
        Ok(self
            .lock()?
            .connections
            .iter()
            .filter(|c| c.involves(user_id) && statuses.contains(&c.status))
            .cloned()
            .collect())
    }

    async fn transition_connection(
        &self,
        connection_id: &str,
        from: ConnectionStatus,
        to: ConnectionStatus,
    ) -> Result<Option<Connection>, AppError> {
        let mut state = self.lock()?;
        Ok(state
            .connections
            .iter_mut()
            .find(|c| c.id == connection_id && c.status == from)
            .map(|c| {
                c.status = to;
                c.updated_at = Utc::now();
                c.clone()
            }))
    }

    async fn delete_connection(&self, connection_id: &str, participant: &str) -> Result<bool, AppError> {
        let mut state = self.lock()?;
        let before = state.connections.len();
        state
            .connections
            .retain(|c| !(c.id == connection_id && c.involves(participant)));
        Ok(state.connections.len() < before)
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn insert_notification(&self, notification: &Notification) -> Result<(), AppError> {
        self.lock()?.notifications.push(notification.clone());
        Ok(())
    }

    async fn list_unread_notifications(&self, user_id: &str) -> Result<Vec<Notification>, AppError> {
        let mut unread: Vec<Notification> = self
            .lock()?
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && !n.read)
            .cloned()
            .collect();
        // Insertion order breaks timestamp ties, newest first
        unread.reverse();
        unread.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(unread)
    }

    async fn set_notification_read(
        &self,
        notification_id: &str,
        user_id: &str,
        read: bool,
    ) -> Result<Option<Notification>, AppError> {
        let mut state = self.lock()?;
        Ok(state
            .notifications
            .iter_mut()
            .find(|n| n.id == notification_id && n.user_id == user_id)
            .map(|n| {
                n.read = read;
                n.clone()
            }))
    }

    async fn mark_notifications_read(&self, notification_ids: &[String]) -> Result<u64, AppError> {
        let mut state = self.lock()?;
        let mut modified = 0;
        for n in state.notifications.iter_mut() {
            if !n.read && notification_ids.contains(&n.id) {
                n.read = true;
                modified += 1;
            }
        }
        Ok(modified)
    }

    async fn mark_connection_notifications_read(
        &self,
        connection_id: &str,
        user_id: &str,
        kind: NotificationKind,
    ) -> Result<u64, AppError> {
        let mut state = self.lock()?;
        let mut modified = 0;
        for n in state.notifications.iter_mut() {
            if !n.read
                && n.user_id == user_id
                && n.kind == kind
                && n.connection_id.as_deref() == Some(connection_id)
            {
                n.read = true;
                modified += 1;
            }
        }
        Ok(modified)
    }
}
