use crate::{
    config::AppConfig,
    database::Store,
    middleware::auth::AuthenticatedUser,
    models::{Role, User, UserInfo},
    utils::{tags::TagInput, AppError},
};
use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user id
    pub iat: usize,
    pub exp: usize,
}

/// Outcome of checking a session token. The user id is only reachable
/// through the `Authenticated` variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    Authenticated(AuthenticatedUser),
    Unauthenticated,
}

impl Session {
    pub fn into_user(self) -> Option<AuthenticatedUser> {
        match self {
            Session::Authenticated(user) => Some(user),
            Session::Unauthenticated => None,
        }
    }
}

/// Password hashing and session token signing
#[derive(Clone)]
pub struct Credentials {
    secret: String,
    token_ttl: Duration,
    cost: u32,
}

impl Credentials {
    pub fn new(secret: impl Into<String>, token_ttl_hours: i64, cost: u32) -> Self {
        Self {
            secret: secret.into(),
            token_ttl: Duration::hours(token_ttl_hours),
            cost,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.jwt_secret.clone(), config.token_ttl_hours, config.bcrypt_cost)
    }

    pub fn hash_password(&self, password: &str) -> Result<String, AppError> {
        Ok(hash(password, self.cost)?)
    }

    /// A malformed stored hash counts as a mismatch
    pub fn verify_password(&self, password: &str, password_hash: &str) -> bool {
        match verify(password, password_hash) {
            Ok(valid) => valid,
            Err(e) => {
                log::warn!("⚠️  Password verification error: {}", e);
                false
            }
        }
    }

    pub fn issue_token(&self, user_id: &str) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp() as usize,
            exp: (now + self.token_ttl).timestamp() as usize,
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?)
    }

    /// Any signature, decoding or expiry failure yields `Unauthenticated`
    pub fn verify_token(&self, token: &str) -> Session {
        let validation = Validation::new(Algorithm::HS256);

        match decode::<Claims>(token, &DecodingKey::from_secret(self.secret.as_bytes()), &validation) {
            Ok(data) if !data.claims.sub.is_empty() => {
                Session::Authenticated(AuthenticatedUser::new(data.claims.sub))
            }
            Ok(_) => Session::Unauthenticated,
            Err(e) => {
                log::debug!("Rejected session token: {}", e);
                Session::Unauthenticated
            }
        }
    }
}

// ==================== REGISTER / LOGIN ====================

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub skills: TagInput,
    #[serde(default)]
    pub interests: TagInput,
    pub bio: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AuthResponse {
    pub user: UserInfo,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn is_valid_email(email: &str) -> bool {
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        _ => false,
    }
}

// User registration
pub async fn register(
    store: &dyn Store,
    credentials: &Credentials,
    request: RegisterRequest,
) -> Result<UserInfo, AppError> {
    let name = request.name.trim().to_string();
    if name.chars().count() < 2 {
        return Err(AppError::ValidationError("Name must be at least 2 characters".to_string()));
    }

    let email = normalize_email(&request.email);
    if !is_valid_email(&email) {
        return Err(AppError::ValidationError("Invalid email address".to_string()));
    }

    if request.password.chars().count() < 6 {
        return Err(AppError::ValidationError("Password must be at least 6 characters".to_string()));
    }

    let bio = request.bio.map(|b| b.trim().to_string()).filter(|b| !b.is_empty());

    let user = User::new(
        name,
        email,
        credentials.hash_password(&request.password)?,
        request.role,
        request.skills.into_tags(),
        request.interests.into_tags(),
        bio,
    );

    store.insert_user(&user).await?;

    log::info!("✅ User registered successfully: {} ({})", user.email, user.role.as_str());

    Ok(UserInfo::from(&user))
}

// User login: returns the user and a freshly signed session token
pub async fn login(
    store: &dyn Store,
    credentials: &Credentials,
    request: &LoginRequest,
) -> Result<(UserInfo, String), AppError> {
    let email = normalize_email(&request.email);

    let user = store
        .find_user_by_email(&email)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !credentials.verify_password(&request.password, &user.password_hash) {
        return Err(AppError::Unauthorized);
    }

    let token = credentials.issue_token(&user.id)?;

    Ok((UserInfo::from(&user), token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MIN_BCRYPT_COST;
    use crate::database::{MemoryStore, UserStore};
    use crate::utils::tags::TagInput;

    fn credentials() -> Credentials {
        Credentials::new("test-secret", 1, MIN_BCRYPT_COST)
    }

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            name: "Alice".into(),
            email: email.into(),
            password: "hunter22".into(),
            role: Role::Mentor,
            skills: TagInput::Csv("Go, Rust".into()),
            interests: TagInput::Csv("ML".into()),
            bio: None,
        }
    }

    #[test]
    fn test_password_hash_round_trip() {
        let creds = credentials();
        let hashed = creds.hash_password("s3cret!").unwrap();
        assert_ne!(hashed, "s3cret!");
        assert!(creds.verify_password("s3cret!", &hashed));
        assert!(!creds.verify_password("wrong", &hashed));
        assert!(!creds.verify_password("s3cret!", "not-a-bcrypt-hash"));
    }

    #[test]
    fn test_token_round_trip() {
        let creds = credentials();
        let token = creds.issue_token("user-1").unwrap();
        let user = creds.verify_token(&token).into_user().unwrap();
        assert_eq!(user.user_id(), "user-1");
    }

    #[test]
    fn test_tampered_token_is_unauthenticated() {
        let creds = credentials();
        let token = creds.issue_token("user-1").unwrap();

        // Flip the first character of the signature segment
        let (head, signature) = token.rsplit_once('.').unwrap();
        let first = signature.chars().next().unwrap();
        let replacement = if first == 'a' { 'b' } else { 'a' };
        let tampered = format!("{}.{}{}", head, replacement, &signature[1..]);
        assert_eq!(creds.verify_token(&tampered), Session::Unauthenticated);

        // Forged payload under the original signature
        let forged_payload = format!(
            "{}.{}.{}",
            head.split('.').next().unwrap(),
            "eyJzdWIiOiJhZG1pbiIsImlhdCI6MCwiZXhwIjo5OTk5OTk5OTk5fQ",
            signature
        );
        assert_eq!(creds.verify_token(&forged_payload), Session::Unauthenticated);

        let other_secret = Credentials::new("another-secret", 1, MIN_BCRYPT_COST);
        assert_eq!(other_secret.verify_token(&token), Session::Unauthenticated);

        assert_eq!(creds.verify_token("garbage"), Session::Unauthenticated);
    }

    #[test]
    fn test_expired_token_is_unauthenticated() {
        let creds = credentials();
        let claims = Claims {
            sub: "user-1".into(),
            iat: (Utc::now() - Duration::hours(3)).timestamp() as usize,
            exp: (Utc::now() - Duration::hours(2)).timestamp() as usize,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();
        assert_eq!(creds.verify_token(&token), Session::Unauthenticated);
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("@b.co"));
        assert!(!is_valid_email("a b@c.io"));
        assert!(!is_valid_email("a@@c.io"));
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let store = MemoryStore::new();
        let creds = credentials();

        let info = register(&store, &creds, register_request(" Alice@Example.com "))
            .await
            .unwrap();
        assert_eq!(info.email, "alice@example.com");

        let stored = store.find_user(&info.id).await.unwrap().unwrap();
        assert_eq!(stored.skills, vec!["Go", "Rust"]);
        assert_ne!(stored.password_hash, "hunter22");

        let (user, token) = login(
            &store,
            &creds,
            &LoginRequest { email: "alice@example.com".into(), password: "hunter22".into() },
        )
        .await
        .unwrap();
        assert_eq!(user.id, info.id);
        assert_eq!(creds.verify_token(&token).into_user().unwrap().user_id(), info.id);

        let bad = login(
            &store,
            &creds,
            &LoginRequest { email: "alice@example.com".into(), password: "nope".into() },
        )
        .await;
        assert_eq!(bad.unwrap_err(), AppError::Unauthorized);
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates_and_bad_input() {
        let store = MemoryStore::new();
        let creds = credentials();
        register(&store, &creds, register_request("alice@example.com")).await.unwrap();

        let dup = register(&store, &creds, register_request("ALICE@example.com")).await;
        assert!(matches!(dup, Err(AppError::ValidationError(_))));

        let mut short = register_request("bob@example.com");
        short.password = "123".into();
        assert!(matches!(register(&store, &creds, short).await, Err(AppError::ValidationError(_))));
    }
}
