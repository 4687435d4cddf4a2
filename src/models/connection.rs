use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ConnectionStatus {
    /// PENDING and ACCEPTED edges block new requests and hide candidates from matching
    pub fn is_active(self) -> bool {
        matches!(self, ConnectionStatus::Pending | ConnectionStatus::Accepted)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionStatus::Pending => "PENDING",
            ConnectionStatus::Accepted => "ACCEPTED",
            ConnectionStatus::Rejected => "REJECTED",
        }
    }
}

/// Directed request between two users
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: String,
    pub from_user_id: String,
    pub to_user_id: String,
    pub status: ConnectionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Connection {
    pub fn pending(from_user_id: &str, to_user_id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            from_user_id: from_user_id.to_string(),
            to_user_id: to_user_id.to_string(),
            status: ConnectionStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn involves(&self, user_id: &str) -> bool {
        self.from_user_id == user_id || self.to_user_id == user_id
    }

    /// Same unordered pair, regardless of direction
    pub fn joins(&self, a: &str, b: &str) -> bool {
        (self.from_user_id == a && self.to_user_id == b)
            || (self.from_user_id == b && self.to_user_id == a)
    }

    /// The participant that is not `user_id`
    pub fn other_party(&self, user_id: &str) -> &str {
        if self.from_user_id == user_id {
            &self.to_user_id
        } else {
            &self.from_user_id
        }
    }
}

/// Returned by GET /connections
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionEdge {
    pub user_id: String,
    pub status: ConnectionStatus,
}

/// Returned by GET /connections/accepted
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedConnection {
    pub id: String,
    pub user: UserSummary,
    pub created_at: DateTime<Utc>,
}

/// Connection with both parties resolved, returned by PATCH /connections/{id}
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDetails {
    #[serde(flatten)]
    pub connection: Connection,
    pub from_user: Option<UserSummary>,
    pub to_user: Option<UserSummary>,
}
