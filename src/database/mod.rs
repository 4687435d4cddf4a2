// ==================== PERSISTENCE ====================
// Store traits shared by the MongoDB backend and the in-memory backend.
// Services only ever see `dyn Store`.

pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoDB;

use crate::models::{Connection, ConnectionStatus, Notification, NotificationKind, ProfileChanges, Role, User};
use crate::utils::AppError;
use async_trait::async_trait;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `ValidationError` when the email is already registered
    async fn insert_user(&self, user: &User) -> Result<(), AppError>;

    async fn find_user(&self, user_id: &str) -> Result<Option<User>, AppError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_users(&self, user_ids: &[String]) -> Result<Vec<User>, AppError>;

    async fn list_users_except(&self, user_id: &str) -> Result<Vec<User>, AppError>;

    async fn list_users_by_role(&self, role: Role) -> Result<Vec<User>, AppError>;

    async fn update_profile(&self, user_id: &str, changes: &ProfileChanges) -> Result<Option<User>, AppError>;
}

#[async_trait]
pub trait ConnectionStore: Send + Sync {
    /// Inserts a PENDING edge together with the recipient's request notification.
    ///
    /// Fails with `Conflict` if the pair already has a PENDING or ACCEPTED edge in
    /// either direction. Either both rows exist afterwards or neither does.
    async fn create_connection(&self, connection: &Connection, notification: &Notification) -> Result<(), AppError>;

    async fn find_connection(&self, connection_id: &str) -> Result<Option<Connection>, AppError>;

    async fn find_active_between(&self, a: &str, b: &str) -> Result<Option<Connection>, AppError>;

    /// Edges where `user_id` is either side and the status is one of `statuses`, oldest first
    async fn list_connections_for(
        &self,
        user_id: &str,
        statuses: &[ConnectionStatus],
    ) -> Result<Vec<Connection>, AppError>;

    /// Conditional single-row update: returns `None` when the row is gone or not in `from`
    async fn transition_connection(
        &self,
        connection_id: &str,
        from: ConnectionStatus,
        to: ConnectionStatus,
    ) -> Result<Option<Connection>, AppError>;

    /// Deletes the edge only if `participant` is one of its two users
    async fn delete_connection(&self, connection_id: &str, participant: &str) -> Result<bool, AppError>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert_notification(&self, notification: &Notification) -> Result<(), AppError>;

    /// Unread notifications for the recipient, newest first
    async fn list_unread_notifications(&self, user_id: &str) -> Result<Vec<Notification>, AppError>;

    /// Only touches the row if it belongs to `user_id`
    async fn set_notification_read(
        &self,
        notification_id: &str,
        user_id: &str,
        read: bool,
    ) -> Result<Option<Notification>, AppError>;

    async fn mark_notifications_read(&self, notification_ids: &[String]) -> Result<u64, AppError>;

    async fn mark_connection_notifications_read(
        &self,
        connection_id: &str,
        user_id: &str,
        kind: NotificationKind,
    ) -> Result<u64, AppError>;
}

pub trait Store: UserStore + ConnectionStore + NotificationStore {}

impl<T: UserStore + ConnectionStore + NotificationStore> Store for T {}
