use super::{ConnectionStore, NotificationStore, UserStore};
use crate::models::{Connection, ConnectionStatus, Notification, NotificationKind, ProfileChanges, Role, User};
use crate::utils::AppError;
use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, Database, IndexModel};
use serde::de::DeserializeOwned;

const USERS: &str = "users";
const CONNECTIONS: &str = "connections";
const NOTIFICATIONS: &str = "notifications";

const DUPLICATE_KEY: i32 = 11000;

#[derive(Clone)]
pub struct MongoDB {
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str) -> Result<Self, AppError> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        // Connection pool
        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(5);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));

        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let client = Client::with_options(client_options)?;

        // Extract database name from URI or use default
        let db_name = uri
            .rsplit('/')
            .next()
            .and_then(|s| s.split('?').next())
            .filter(|s| !s.is_empty() && !s.contains(':'))
            .unwrap_or("MentorMatch");

        let db = client.database(db_name);

        // Test connection
        db.list_collection_names().await?;

        let mongodb = Self { db };
        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Creates the indexes the store queries rely on
    async fn ensure_indexes(&self) -> Result<(), AppError> {
        log::info!("🔧 Creating database indexes...");

        let unique = IndexOptions::builder().unique(true).build();

        let users = self.collection::<Document>(USERS);
        for (keys, opts, label) in [
            (doc! { "id": 1 }, Some(unique.clone()), "users(id)"),
            (doc! { "email": 1 }, Some(unique.clone()), "users(email)"),
            (doc! { "role": 1 }, None, "users(role)"),
        ] {
            let index = IndexModel::builder().keys(keys).options(opts).build();
            match users.create_index(index).await {
                Ok(_) => log::info!("   ✅ Index created: {}", label),
                Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
            }
        }

        let connections = self.collection::<Document>(CONNECTIONS);
        for (keys, opts, label) in [
            (doc! { "id": 1 }, Some(unique.clone()), "connections(id)"),
            (doc! { "fromUserId": 1, "status": 1 }, None, "connections(fromUserId, status)"),
            (doc! { "toUserId": 1, "status": 1 }, None, "connections(toUserId, status)"),
        ] {
            let index = IndexModel::builder().keys(keys).options(opts).build();
            match connections.create_index(index).await {
                Ok(_) => log::info!("   ✅ Index created: {}", label),
                Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
            }
        }

        let notifications = self.collection::<Document>(NOTIFICATIONS);
        for (keys, opts, label) in [
            (doc! { "id": 1 }, Some(unique), "notifications(id)"),
            (doc! { "userId": 1, "read": 1 }, None, "notifications(userId, read)"),
            (doc! { "connectionId": 1 }, None, "notifications(connectionId)"),
        ] {
            let index = IndexModel::builder().keys(keys).options(opts).build();
            match notifications.create_index(index).await {
                Ok(_) => log::info!("   ✅ Index created: {}", label),
                Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
            }
        }

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    fn users(&self) -> Collection<User> {
        self.collection(USERS)
    }

    fn connections(&self) -> Collection<Connection> {
        self.collection(CONNECTIONS)
    }

    fn notifications(&self) -> Collection<Notification> {
        self.collection(NOTIFICATIONS)
    }
}

async fn find_all<T>(collection: &Collection<T>, filter: Document) -> Result<Vec<T>, AppError>
where
    T: DeserializeOwned + Send + Sync + Unpin,
{
    let cursor = collection.find(filter).await?;
    Ok(cursor.try_collect().await?)
}

fn is_duplicate_key(e: &mongodb::error::Error) -> bool {
    matches!(
        e.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(we)) if we.code == DUPLICATE_KEY
    )
}

fn now_bson() -> Result<Bson, AppError> {
    Ok(mongodb::bson::to_bson(&Utc::now())?)
}

fn statuses_bson(statuses: &[ConnectionStatus]) -> Vec<&'static str> {
    statuses.iter().map(|s| s.as_str()).collect()
}

#[async_trait]
impl UserStore for MongoDB {
    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        if self.users().find_one(doc! { "email": &user.email }).await?.is_some() {
            return Err(AppError::ValidationError("Email already exists".to_string()));
        }

        match self.users().insert_one(user).await {
            Ok(_) => Ok(()),
            // Lost the race against a concurrent registration
            Err(e) if is_duplicate_key(&e) => Err(AppError::ValidationError("Email already exists".to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        Ok(self.users().find_one(doc! { "id": user_id }).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.users().find_one(doc! { "email": email }).await?)
    }

    async fn find_users(&self, user_ids: &[String]) -> Result<Vec<User>, AppError> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        find_all(&self.users(), doc! { "id": { "$in": user_ids.to_vec() } }).await
    }

    async fn list_users_except(&self, user_id: &str) -> Result<Vec<User>, AppError> {
        find_all(&self.users(), doc! { "id": { "$ne": user_id } }).await
    }

    async fn list_users_by_role(&self, role: Role) -> Result<Vec<User>, AppError> {
        find_all(&self.users(), doc! { "role": role.as_str() }).await
    }

    async fn update_profile(&self, user_id: &str, changes: &ProfileChanges) -> Result<Option<User>, AppError> {
        let mut set = doc! { "updatedAt": now_bson()? };
        if let Some(name) = &changes.name {
            set.insert("name", name.as_str());
        }
        if let Some(skills) = &changes.skills {
            set.insert("skills", skills.clone());
        }
        if let Some(interests) = &changes.interests {
            set.insert("interests", interests.clone());
        }
        if let Some(bio) = &changes.bio {
            set.insert("bio", bio.as_str());
        }

        Ok(self
            .users()
            .find_one_and_update(doc! { "id": user_id }, doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await?)
    }
}

#[async_trait]
impl ConnectionStore for MongoDB {
    async fn create_connection(&self, connection: &Connection, notification: &Notification) -> Result<(), AppError> {
        // Check-then-insert: two simultaneous requests for the same pair can both pass
        if let Some(existing) = self
            .find_active_between(&connection.from_user_id, &connection.to_user_id)
            .await?
        {
            return Err(AppError::Conflict(format!(
                "A {} connection already exists between these users",
                existing.status.as_str()
            )));
        }

        self.connections().insert_one(connection).await?;

        if let Err(e) = self.notifications().insert_one(notification).await {
            log::error!(
                "❌ Notification insert failed for connection {}, rolling back: {}",
                connection.id,
                e
            );
            if let Err(cleanup) = self.connections().delete_one(doc! { "id": &connection.id }).await {
                log::error!("❌ Failed to roll back connection {}: {}", connection.id, cleanup);
            }
            return Err(e.into());
        }

        Ok(())
    }

    async fn find_connection(&self, connection_id: &str) -> Result<Option<Connection>, AppError> {
        Ok(self.connections().find_one(doc! { "id": connection_id }).await?)
    }

    async fn find_active_between(&self, a: &str, b: &str) -> Result<Option<Connection>, AppError> {
        let filter = doc! {
            "$or": [
                { "fromUserId": a, "toUserId": b },
                { "fromUserId": b, "toUserId": a }
            ],
            "status": { "$in": ["PENDING", "ACCEPTED"] }
        };
        Ok(self.connections().find_one(filter).await?)
    }

    async fn list_connections_for(
        &self,
        user_id: &str,
        statuses: &[ConnectionStatus],
    ) -> Result<Vec<Connection>, AppError> {
        let filter = doc! {
            "$or": [
                { "fromUserId": user_id },
                { "toUserId": user_id }
            ],
            "status": { "$in": statuses_bson(statuses) }
        };
        let mut connections = find_all(&self.connections(), filter).await?;
        connections.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(connections)
    }

    async fn transition_connection(
        &self,
        connection_id: &str,
        from: ConnectionStatus,
        to: ConnectionStatus,
    ) -> Result<Option<Connection>, AppError> {
        let update = doc! {
            "$set": { "status": to.as_str(), "updatedAt": now_bson()? }
        };
        Ok(self
            .connections()
            .find_one_and_update(doc! { "id": connection_id, "status": from.as_str() }, update)
            .return_document(ReturnDocument::After)
            .await?)
    }

    async fn delete_connection(&self, connection_id: &str, participant: &str) -> Result<bool, AppError> {
        let filter = doc! {
            "id": connection_id,
            "$or": [
                { "fromUserId": participant },
                { "toUserId": participant }
            ]
        };
        let result = self.connections().delete_one(filter).await?;
        Ok(result.deleted_count > 0)
    }
}

#[async_trait]
impl NotificationStore for MongoDB {
    async fn insert_notification(&self, notification: &Notification) -> Result<(), AppError> {
        self.notifications().insert_one(notification).await?;
        Ok(())
    }

    async fn list_unread_notifications(&self, user_id: &str) -> Result<Vec<Notification>, AppError> {
        let mut notifications =
            find_all(&self.notifications(), doc! { "userId": user_id, "read": false }).await?;
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    async fn set_notification_read(
        &self,
        notification_id: &str,
        user_id: &str,
        read: bool,
    ) -> Result<Option<Notification>, AppError> {
        Ok(self
            .notifications()
            .find_one_and_update(
                doc! { "id": notification_id, "userId": user_id },
                doc! { "$set": { "read": read } },
            )
            .return_document(ReturnDocument::After)
            .await?)
    }

    async fn mark_notifications_read(&self, notification_ids: &[String]) -> Result<u64, AppError> {
        if notification_ids.is_empty() {
            return Ok(0);
        }
        let result = self
            .notifications()
            .update_many(
                doc! { "id": { "$in": notification_ids.to_vec() } },
                doc! { "$set": { "read": true } },
            )
            .await?;
        Ok(result.modified_count)
    }

    async fn mark_connection_notifications_read(
        &self,
        connection_id: &str,
        user_id: &str,
        kind: NotificationKind,
    ) -> Result<u64, AppError> {
        let result = self
            .notifications()
            .update_many(
                doc! {
                    "connectionId": connection_id,
                    "userId": user_id,
                    "type": kind.as_str(),
                    "read": false
                },
                doc! { "$set": { "read": true } },
            )
            .await?;
        Ok(result.modified_count)
    }
}
