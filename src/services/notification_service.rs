use crate::{
    database::Store,
    middleware::auth::AuthenticatedUser,
    models::{Notification, NotificationKind},
    utils::AppError,
};
use serde::Deserialize;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotificationRequest {
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub message: String,
    pub connection_id: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct MarkReadRequest {
    #[serde(default = "default_read")]
    pub read: bool,
}

fn default_read() -> bool {
    true
}

/// Unread notifications for the caller, newest first.
///
/// CONNECTION_ACCEPTED entries are informational: they are returned once and
/// then marked read. Pending requests stay unread until answered.
pub async fn list_unread(store: &dyn Store, caller: &AuthenticatedUser) -> Result<Vec<Notification>, AppError> {
    let notifications = store.list_unread_notifications(caller.user_id()).await?;

    let seen: Vec<String> = notifications
        .iter()
        .filter(|n| n.kind == NotificationKind::ConnectionAccepted)
        .map(|n| n.id.clone())
        .collect();

    if !seen.is_empty() {
        let marked = store.mark_notifications_read(&seen).await?;
        log::debug!("🔔 Marked {} acceptance notifications read for {}", marked, caller.user_id());
    }

    Ok(notifications)
}

/// Manual notifications must ride on a connection the caller belongs to, and
/// their type must match the direction of that connection: requests go from
/// sender to recipient, acceptances go back the other way.
pub async fn create(
    store: &dyn Store,
    caller: &AuthenticatedUser,
    request: CreateNotificationRequest,
) -> Result<Notification, AppError> {
    let message = request.message.trim().to_string();
    if message.is_empty() {
        return Err(AppError::ValidationError("message is required".to_string()));
    }

    let Some(connection_id) = request.connection_id.as_deref() else {
        return Err(AppError::ValidationError("connectionId is required".to_string()));
    };

    if store.find_user(&request.user_id).await?.is_none() {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let connection = store
        .find_connection(connection_id)
        .await?
        .filter(|c| c.involves(caller.user_id()))
        .ok_or_else(|| AppError::NotFound("Connection not found".to_string()))?;

    let (sender, recipient) = match request.kind {
        NotificationKind::ConnectionRequest => (&connection.from_user_id, &connection.to_user_id),
        NotificationKind::ConnectionAccepted => (&connection.to_user_id, &connection.from_user_id),
    };
    if sender != caller.user_id() || *recipient != request.user_id {
        log::warn!(
            "⚠️  {} tried to send {} to {} on connection {}",
            caller.user_id(),
            request.kind.as_str(),
            request.user_id,
            connection.id
        );
        return Err(AppError::ValidationError(format!(
            "{} does not match the direction of this connection",
            request.kind.as_str()
        )));
    }

    let notification = Notification::new(&request.user_id, request.kind, message, request.connection_id);
    store.insert_notification(&notification).await?;

    log::info!(
        "🔔 {} notification created for {} by {}",
        notification.kind.as_str(),
        notification.user_id,
        caller.user_id()
    );

    Ok(notification)
}

/// PATCH /notifications/{id} - only the recipient may flip the flag
pub async fn set_read(
    store: &dyn Store,
    caller: &AuthenticatedUser,
    notification_id: &str,
    read: bool,
) -> Result<Notification, AppError> {
    store
        .set_notification_read(notification_id, caller.user_id(), read)
        .await?
        .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{ConnectionStore, MemoryStore, NotificationStore, UserStore};
    use crate::models::{Connection, Role, User};

    async fn seed(store: &MemoryStore, name: &str) -> AuthenticatedUser {
        let user = User::new(
            name.into(),
            format!("{}@example.com", name.to_lowercase()),
            "hash".into(),
            Role::Mentor,
            vec![],
            vec![],
            None,
        );
        store.insert_user(&user).await.unwrap();
        AuthenticatedUser::new(user.id)
    }

    #[tokio::test]
    async fn test_acceptances_are_shown_once_requests_persist() {
        let store = MemoryStore::new();
        let alice = seed(&store, "Alice").await;

        let conn = Connection::pending("someone", alice.user_id());
        store
            .create_connection(&conn, &Notification::connection_request(alice.user_id(), "Someone", &conn.id))
            .await
            .unwrap();
        store
            .insert_notification(&Notification::connection_accepted(alice.user_id(), "Bob", "c2"))
            .await
            .unwrap();

        let first = list_unread(&store, &alice).await.unwrap();
        assert_eq!(first.len(), 2);
        // Newest first
        assert_eq!(first[0].kind, NotificationKind::ConnectionAccepted);

        let second = list_unread(&store, &alice).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].kind, NotificationKind::ConnectionRequest);
    }

    #[tokio::test]
    async fn test_set_read_is_scoped_to_recipient() {
        let store = MemoryStore::new();
        let alice = seed(&store, "Alice").await;
        let bob = seed(&store, "Bob").await;

        let note = Notification::connection_accepted(alice.user_id(), "Bob", "c1");
        store.insert_notification(&note).await.unwrap();

        let res = set_read(&store, &bob, &note.id, true).await;
        assert!(matches!(res, Err(AppError::NotFound(_))));

        let updated = set_read(&store, &alice, &note.id, true).await.unwrap();
        assert!(updated.read);

        let unread = set_read(&store, &alice, &note.id, false).await.unwrap();
        assert!(!unread.read);
    }

    #[tokio::test]
    async fn test_create_validates_recipient_and_connection() {
        let store = MemoryStore::new();
        let alice = seed(&store, "Alice").await;
        let bob = seed(&store, "Bob").await;

        let request = |user_id: &str, message: &str, connection_id: Option<&str>| CreateNotificationRequest {
            user_id: user_id.to_string(),
            kind: NotificationKind::ConnectionRequest,
            message: message.to_string(),
            connection_id: connection_id.map(str::to_string),
        };

        let blank = create(&store, &alice, request(bob.user_id(), "  ", None)).await;
        assert!(matches!(blank, Err(AppError::ValidationError(_))));

        let unattached = create(&store, &alice, request(bob.user_id(), "hi", None)).await;
        assert!(matches!(unattached, Err(AppError::ValidationError(_))));

        let ghost = create(&store, &alice, request("ghost", "hi", Some("nope"))).await;
        assert!(matches!(ghost, Err(AppError::NotFound(_))));

        let unrelated = create(&store, &alice, request(bob.user_id(), "hi", Some("nope"))).await;
        assert!(matches!(unrelated, Err(AppError::NotFound(_))));

        let conn = Connection::pending(alice.user_id(), bob.user_id());
        store
            .create_connection(&conn, &Notification::connection_request(bob.user_id(), "Alice", &conn.id))
            .await
            .unwrap();

        let created = create(&store, &alice, request(bob.user_id(), "hi", Some(&conn.id))).await.unwrap();
        assert_eq!(created.user_id, bob.user_id());
        assert_eq!(created.connection_id.as_deref(), Some(conn.id.as_str()));
        assert!(!created.read);
    }

    async fn send(
        store: &MemoryStore,
        connection: &Connection,
        caller: &AuthenticatedUser,
        to: &AuthenticatedUser,
        kind: NotificationKind,
    ) -> Result<Notification, AppError> {
        let request = CreateNotificationRequest {
            user_id: to.user_id().to_string(),
            kind,
            message: "hello".to_string(),
            connection_id: Some(connection.id.clone()),
        };
        create(store, caller, request).await
    }

    #[tokio::test]
    async fn test_create_cannot_reach_arbitrary_inboxes() {
        let store = MemoryStore::new();
        let alice = seed(&store, "Alice").await;
        let bob = seed(&store, "Bob").await;
        let carol = seed(&store, "Carol").await;

        let conn = Connection::pending(alice.user_id(), bob.user_id());
        store
            .create_connection(&conn, &Notification::connection_request(bob.user_id(), "Alice", &conn.id))
            .await
            .unwrap();

        // Outsiders cannot use someone else's connection
        let outsider = send(&store, &conn, &carol, &bob, NotificationKind::ConnectionRequest).await;
        assert!(matches!(outsider, Err(AppError::NotFound(_))));

        // The sender cannot fake an acceptance, and nobody can target a third inbox
        let forged = send(&store, &conn, &alice, &bob, NotificationKind::ConnectionAccepted).await;
        assert!(matches!(forged, Err(AppError::ValidationError(_))));
        let misrouted = send(&store, &conn, &alice, &carol, NotificationKind::ConnectionRequest).await;
        assert!(matches!(misrouted, Err(AppError::ValidationError(_))));
        let to_self = send(&store, &conn, &bob, &bob, NotificationKind::ConnectionAccepted).await;
        assert!(matches!(to_self, Err(AppError::ValidationError(_))));

        // The recipient may acknowledge back to the sender
        let ack = send(&store, &conn, &bob, &alice, NotificationKind::ConnectionAccepted).await.unwrap();
        assert_eq!(ack.user_id, alice.user_id());

        assert!(store.list_unread_notifications(carol.user_id()).await.unwrap().is_empty());
    }

    #[test]
    fn test_mark_read_defaults_to_true() {
        let body: MarkReadRequest = serde_json::from_str("{}").unwrap();
        assert!(body.read);
    }
}
