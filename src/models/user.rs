use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Mentor,
    Mentee,
}

impl Role {
    /// Matches are always drawn from the other side
    pub fn opposite(self) -> Role {
        match self {
            Role::Mentor => Role::Mentee,
            Role::Mentee => Role::Mentor,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Mentor => "MENTOR",
            Role::Mentee => "MENTEE",
        }
    }
}

/// Stored user document. `id` is the primary identifier (MongoDB keeps its own `_id`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        name: String,
        email: String,
        password_hash: String,
        role: Role,
        skills: Vec<String>,
        interests: Vec<String>,
        bio: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            email,
            password_hash,
            role,
            skills,
            interests,
            bio,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Fields a user may change on their own profile
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub skills: Option<Vec<String>>,
    pub interests: Option<Vec<String>>,
    pub bio: Option<String>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.skills.is_none() && self.interests.is_none() && self.bio.is_none()
    }

    pub fn apply_to(&self, user: &mut User) {
        if let Some(name) = &self.name {
            user.name = name.clone();
        }
        if let Some(skills) = &self.skills {
            user.skills = skills.clone();
        }
        if let Some(interests) = &self.interests {
            user.interests = interests.clone();
        }
        if let Some(bio) = &self.bio {
            user.bio = Some(bio.clone());
        }
        user.updated_at = Utc::now();
    }
}

// ==================== RESPONSE VIEWS ====================

/// Returned by register/login
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct UserInfo {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub role: Role,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct UserListItem {
    pub id: String,
    pub name: String,
    pub role: Role,
    pub skills: Vec<String>,
    pub interests: Vec<String>,
}

impl From<&User> for UserListItem {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            role: user.role,
            skills: user.skills.clone(),
            interests: user.interests.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct PublicProfile {
    pub id: String,
    pub name: String,
    pub role: Role,
    pub skills: Vec<String>,
    pub interests: Vec<String>,
    pub bio: Option<String>,
}

impl From<&User> for PublicProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            role: user.role,
            skills: user.skills.clone(),
            interests: user.interests.clone(),
            bio: user.bio.clone(),
        }
    }
}
