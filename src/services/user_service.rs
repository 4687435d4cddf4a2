use crate::{
    database::Store,
    middleware::auth::AuthenticatedUser,
    models::{ProfileChanges, PublicProfile, UserListItem},
    utils::{tags::TagInput, AppError},
};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub skills: Option<TagInput>,
    pub interests: Option<TagInput>,
    pub bio: Option<String>,
}

impl UpdateProfileRequest {
    fn into_changes(self) -> Result<ProfileChanges, AppError> {
        let name = match self.name.map(|n| n.trim().to_string()) {
            Some(name) if name.chars().count() < 2 => {
                return Err(AppError::ValidationError("Name must be at least 2 characters".to_string()));
            }
            other => other,
        };

        Ok(ProfileChanges {
            name,
            skills: self.skills.map(TagInput::into_tags),
            interests: self.interests.map(TagInput::into_tags),
            bio: self.bio.map(|b| b.trim().to_string()),
        })
    }
}

/// GET /users - everyone but the caller
pub async fn list_other_users(store: &dyn Store, caller: &AuthenticatedUser) -> Result<Vec<UserListItem>, AppError> {
    let users = store.list_users_except(caller.user_id()).await?;
    Ok(users.iter().map(UserListItem::from).collect())
}

pub async fn get_profile(store: &dyn Store, user_id: &str) -> Result<PublicProfile, AppError> {
    store
        .find_user(user_id)
        .await?
        .map(|u| PublicProfile::from(&u))
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

/// PUT /profile/{userId} - a user may only edit their own profile
pub async fn update_profile(
    store: &dyn Store,
    caller: &AuthenticatedUser,
    user_id: &str,
    request: UpdateProfileRequest,
) -> Result<PublicProfile, AppError> {
    if caller.user_id() != user_id {
        log::warn!("⚠️  {} tried to edit the profile of {}", caller.user_id(), user_id);
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let changes = request.into_changes()?;
    if changes.is_empty() {
        return Err(AppError::ValidationError("Nothing to update".to_string()));
    }

    let user = store
        .update_profile(user_id, &changes)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    log::info!("✅ Profile updated for {}", user.id);

    Ok(PublicProfile::from(&user))
}
