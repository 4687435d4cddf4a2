use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    ConnectionRequest,
    ConnectionAccepted,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::ConnectionRequest => "CONNECTION_REQUEST",
            NotificationKind::ConnectionAccepted => "CONNECTION_ACCEPTED",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    /// Recipient
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub message: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub connection_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        user_id: &str,
        kind: NotificationKind,
        message: String,
        connection_id: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            kind,
            message,
            read: false,
            connection_id,
            created_at: Utc::now(),
        }
    }

    pub fn connection_request(to_user_id: &str, sender_name: &str, connection_id: &str) -> Self {
        Self::new(
            to_user_id,
            NotificationKind::ConnectionRequest,
            format!("{} sent you a connection request", sender_name),
            Some(connection_id.to_string()),
        )
    }

    pub fn connection_accepted(from_user_id: &str, accepter_name: &str, connection_id: &str) -> Self {
        Self::new(
            from_user_id,
            NotificationKind::ConnectionAccepted,
            format!("{} accepted your connection request", accepter_name),
            Some(connection_id.to_string()),
        )
    }
}
