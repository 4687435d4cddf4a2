// ==================== CONNECTION WORKFLOW ====================
// PENDING → ACCEPTED | REJECTED, driven by the recipient. Either party
// may remove the edge. Rows are the source of truth; hub events are
// only a hint for live sessions to refetch.

use crate::{
    database::Store,
    middleware::auth::AuthenticatedUser,
    models::{
        AcceptedConnection, Connection, ConnectionDetails, ConnectionEdge, ConnectionStatus, Notification,
        NotificationKind, UserSummary,
    },
    services::fanout_service::{FanoutEvent, FanoutHub},
    utils::AppError,
};
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRequest {
    pub to_user_id: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdateConnectionRequest {
    pub status: ConnectionStatus,
}

/// What the recipient decided about a pending request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Reject,
}

impl Decision {
    pub fn from_status(status: ConnectionStatus) -> Result<Self, AppError> {
        match status {
            ConnectionStatus::Accepted => Ok(Decision::Accept),
            ConnectionStatus::Rejected => Ok(Decision::Reject),
            ConnectionStatus::Pending => Err(AppError::ValidationError(
                "status must be ACCEPTED or REJECTED".to_string(),
            )),
        }
    }

    fn target(self) -> ConnectionStatus {
        match self {
            Decision::Accept => ConnectionStatus::Accepted,
            Decision::Reject => ConnectionStatus::Rejected,
        }
    }
}

fn connection_not_found() -> AppError {
    AppError::NotFound("Connection not found".to_string())
}

/// POST /connections/request
pub async fn request_connection(
    store: &dyn Store,
    hub: &FanoutHub,
    caller: &AuthenticatedUser,
    to_user_id: &str,
) -> Result<Connection, AppError> {
    let from_user_id = caller.user_id();
    let to_user_id = to_user_id.trim();

    if to_user_id.is_empty() {
        return Err(AppError::ValidationError("toUserId is required".to_string()));
    }
    if to_user_id == from_user_id {
        return Err(AppError::ValidationError("You cannot connect with yourself".to_string()));
    }

    // A valid token for a user that no longer exists
    let sender = store.find_user(from_user_id).await?.ok_or(AppError::Unauthorized)?;

    if store.find_user(to_user_id).await?.is_none() {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let connection = Connection::pending(from_user_id, to_user_id);
    let notification = Notification::connection_request(to_user_id, &sender.name, &connection.id);

    store.create_connection(&connection, &notification).await?;

    hub.publish(to_user_id, FanoutEvent::connection_update(&connection.id));

    log::info!("🤝 Connection {} requested: {} → {}", connection.id, from_user_id, to_user_id);

    Ok(connection)
}

/// PATCH /connections/{id} - only the recipient may decide, and only once
pub async fn respond_to_request(
    store: &dyn Store,
    hub: &FanoutHub,
    caller: &AuthenticatedUser,
    connection_id: &str,
    decision: Decision,
) -> Result<ConnectionDetails, AppError> {
    let existing = store
        .find_connection(connection_id)
        .await?
        .ok_or_else(connection_not_found)?;

    if existing.to_user_id != caller.user_id() {
        log::warn!(
            "⚠️  {} tried to {:?} connection {} addressed to {}",
            caller.user_id(),
            decision,
            connection_id,
            existing.to_user_id
        );
        return Err(connection_not_found());
    }

    let updated = store
        .transition_connection(connection_id, ConnectionStatus::Pending, decision.target())
        .await?
        .ok_or_else(|| AppError::Conflict("Connection is no longer pending".to_string()))?;

    store
        .mark_connection_notifications_read(connection_id, caller.user_id(), NotificationKind::ConnectionRequest)
        .await?;

    let from_user = store.find_user(&updated.from_user_id).await?;
    let to_user = store.find_user(&updated.to_user_id).await?;

    if decision == Decision::Accept {
        let accepter_name = to_user.as_ref().map_or("Someone", |u| u.name.as_str());
        let notification = Notification::connection_accepted(&updated.from_user_id, accepter_name, &updated.id);
        store.insert_notification(&notification).await?;

        hub.publish(
            &updated.from_user_id,
            FanoutEvent::connection_accepted(caller.user_id(), &updated.id),
        );
        hub.publish(&updated.from_user_id, FanoutEvent::connection_update(&updated.id));
        hub.publish(&updated.to_user_id, FanoutEvent::connection_update(&updated.id));
    }

    log::info!("✅ Connection {} is now {}", updated.id, updated.status.as_str());

    Ok(ConnectionDetails {
        from_user: from_user.as_ref().map(UserSummary::from),
        to_user: to_user.as_ref().map(UserSummary::from),
        connection: updated,
    })
}

/// DELETE /connections/{id} - either participant; anyone else gets NotFound
pub async fn remove_connection(
    store: &dyn Store,
    hub: &FanoutHub,
    caller: &AuthenticatedUser,
    connection_id: &str,
) -> Result<(), AppError> {
    let existing = store
        .find_connection(connection_id)
        .await?
        .ok_or_else(connection_not_found)?;

    if !existing.involves(caller.user_id()) {
        return Err(connection_not_found());
    }

    if !store.delete_connection(connection_id, caller.user_id()).await? {
        // Removed concurrently by the other party
        return Err(connection_not_found());
    }

    hub.publish(&existing.from_user_id, FanoutEvent::connection_update(connection_id));
    hub.publish(&existing.to_user_id, FanoutEvent::connection_update(connection_id));

    log::info!("🗑️  Connection {} removed by {}", connection_id, caller.user_id());

    Ok(())
}

/// GET /connections - PENDING and ACCEPTED edges seen from the caller's side
pub async fn list_connections(store: &dyn Store, caller: &AuthenticatedUser) -> Result<Vec<ConnectionEdge>, AppError> {
    let me = caller.user_id();
    let connections = store
        .list_connections_for(me, &[ConnectionStatus::Pending, ConnectionStatus::Accepted])
        .await?;

    Ok(connections
        .iter()
        .map(|c| ConnectionEdge {
            user_id: c.other_party(me).to_string(),
            status: c.status,
        })
        .collect())
}

/// GET /connections/accepted - the other party of every ACCEPTED edge
pub async fn list_accepted(store: &dyn Store, caller: &AuthenticatedUser) -> Result<Vec<AcceptedConnection>, AppError> {
    let me = caller.user_id();
    let connections = store
        .list_connections_for(me, &[ConnectionStatus::Accepted])
        .await?;

    let peer_ids: Vec<String> = connections.iter().map(|c| c.other_party(me).to_string()).collect();
    let peers: HashMap<String, UserSummary> = store
        .find_users(&peer_ids)
        .await?
        .iter()
        .map(|u| (u.id.clone(), UserSummary::from(u)))
        .collect();

    Ok(connections
        .into_iter()
        .filter_map(|c| {
            let peer = peers.get(c.other_party(me)).cloned();
            if peer.is_none() {
                log::warn!("⚠️  Connection {} points at a missing user", c.id);
            }
            peer.map(|user| AcceptedConnection {
                id: c.id,
                user,
                created_at: c.created_at,
            })
        })
        .collect())
}
