//! User service
//!
//! Account registration, login, and session management. The first account
//! ever registered becomes the admin; everyone after that starts as a
//! customer until an admin promotes them.

use crate::db::repositories::{BannedEmailRepository, SessionRepository, UserRepository};
use crate::models::{CreateUserInput, Session, UpdateUserInput, User, UserRole, UserStatus};
use crate::services::password::{hash_password, verify_password};
use crate::services::rate_limiter::LoginRateLimiter;
use anyhow::Result;
use chrono::{Duration, Utc};
use std::net::IpAddr;
use std::sync::Arc;
use uuid::Uuid;

/// Session lifetime in days
const SESSION_DAYS: i64 = 7;

/// User service errors
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Too many login attempts, try again later")]
    RateLimited,

    #[error("This account has been banned")]
    Banned,

    #[error("Username is already taken")]
    UsernameTaken,

    #[error("Email is already registered")]
    EmailTaken,

    #[error("This email address cannot be used")]
    EmailBanned,

    #[error("User not found")]
    NotFound,

    #[error("Invalid or expired session")]
    InvalidSession,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// User and session management service
pub struct UserService {
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionRepository>,
    banned_emails: Arc<dyn BannedEmailRepository>,
    rate_limiter: Arc<LoginRateLimiter>,
}

impl UserService {
    /// Create a new user service
    pub fn new(
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionRepository>,
        banned_emails: Arc<dyn BannedEmailRepository>,
        rate_limiter: Arc<LoginRateLimiter>,
    ) -> Self {
        Self {
            users,
            sessions,
            banned_emails,
            rate_limiter,
        }
    }

    /// Register a new account.
    ///
    /// The very first account becomes the admin. The requested role in the
    /// input is ignored for self-registration.
    pub async fn register(&self, input: CreateUserInput) -> Result<User, UserServiceError> {
        validate_username(&input.username)?;
        validate_email(&input.email)?;
        validate_password(&input.password)?;

        let email = input.email.trim().to_lowercase();

        if self.banned_emails.is_banned(&email).await? {
            return Err(UserServiceError::EmailBanned);
        }
        if self.users.get_by_username(&input.username).await?.is_some() {
            return Err(UserServiceError::UsernameTaken);
        }
        if self.users.get_by_email(&email).await?.is_some() {
            return Err(UserServiceError::EmailTaken);
        }

        let role = if self.users.count().await? == 0 {
            UserRole::Admin
        } else {
            UserRole::Customer
        };

        let password_hash = hash_password(&input.password)?;
        let user = User::new(input.username.trim().to_string(), email, password_hash, role);

        let created = self.users.create(&user).await?;
        tracing::info!(user_id = created.id, role = %created.role, "Registered new user");
        Ok(created)
    }

    /// Create a user with an explicit role (admin API).
    pub async fn create_user(&self, input: CreateUserInput) -> Result<User, UserServiceError> {
        validate_username(&input.username)?;
        validate_email(&input.email)?;
        validate_password(&input.password)?;

        let email = input.email.trim().to_lowercase();

        if self.users.get_by_username(&input.username).await?.is_some() {
            return Err(UserServiceError::UsernameTaken);
        }
        if self.users.get_by_email(&email).await?.is_some() {
            return Err(UserServiceError::EmailTaken);
        }

        let password_hash = hash_password(&input.password)?;
        let user = User::new(
            input.username.trim().to_string(),
            email,
            password_hash,
            input.role.unwrap_or(UserRole::Customer),
        );

        Ok(self.users.create(&user).await?)
    }

    /// Authenticate and open a session. Returns the user and session token.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        ip: Option<IpAddr>,
    ) -> Result<(User, String), UserServiceError> {
        if let Some(ip) = ip {
            if self.rate_limiter.is_ip_limited(ip).await {
                return Err(UserServiceError::RateLimited);
            }
            self.rate_limiter.record_ip_request(ip).await;
        }
        if self.rate_limiter.is_username_limited(username).await {
            return Err(UserServiceError::RateLimited);
        }

        let user = match self.users.get_by_username(username).await? {
            Some(user) => user,
            None => {
                self.rate_limiter.record_failed_attempt(username).await;
                return Err(UserServiceError::InvalidCredentials);
            }
        };

        if !verify_password(password, &user.password_hash)? {
            self.rate_limiter.record_failed_attempt(username).await;
            return Err(UserServiceError::InvalidCredentials);
        }

        if user.is_banned() {
            return Err(UserServiceError::Banned);
        }

        self.rate_limiter.clear_username_attempts(username).await;

        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id: user.id,
            expires_at: now + Duration::days(SESSION_DAYS),
            created_at: now,
        };
        self.sessions.create(&session).await?;

        tracing::info!(user_id = user.id, "User logged in");
        Ok((user, session.id))
    }

    /// Close a session. Unknown tokens are ignored.
    pub async fn logout(&self, token: &str) -> Result<(), UserServiceError> {
        self.sessions.delete(token).await?;
        Ok(())
    }

    /// Resolve a session token to its user.
    ///
    /// Expired sessions are deleted on sight; banned users are rejected even
    /// with a live session.
    pub async fn validate_session(&self, token: &str) -> Result<User, UserServiceError> {
        let session = self
            .sessions
            .get_by_token(token)
            .await?
            .ok_or(UserServiceError::InvalidSession)?;

        if session.is_expired() {
            self.sessions.delete(token).await?;
            return Err(UserServiceError::InvalidSession);
        }

        let user = self
            .users
            .get_by_id(session.user_id)
            .await?
            .ok_or(UserServiceError::InvalidSession)?;

        if user.is_banned() {
            return Err(UserServiceError::Banned);
        }

        Ok(user)
    }

    /// Get a user by id
    pub async fn get_user(&self, id: i64) -> Result<User, UserServiceError> {
        self.users
            .get_by_id(id)
            .await?
            .ok_or(UserServiceError::NotFound)
    }

    /// List all users (admin API)
    pub async fn list_users(&self) -> Result<Vec<User>, UserServiceError> {
        Ok(self.users.list().await?)
    }

    /// Update a user (admin API). Banning a user drops all their sessions.
    pub async fn update_user(
        &self,
        id: i64,
        input: UpdateUserInput,
    ) -> Result<User, UserServiceError> {
        let mut user = self
            .users
            .get_by_id(id)
            .await?
            .ok_or(UserServiceError::NotFound)?;

        if let Some(username) = input.username {
            validate_username(&username)?;
            if let Some(existing) = self.users.get_by_username(&username).await? {
                if existing.id != id {
                    return Err(UserServiceError::UsernameTaken);
                }
            }
            user.username = username.trim().to_string();
        }
        if let Some(email) = input.email {
            validate_email(&email)?;
            let email = email.trim().to_lowercase();
            if let Some(existing) = self.users.get_by_email(&email).await? {
                if existing.id != id {
                    return Err(UserServiceError::EmailTaken);
                }
            }
            user.email = email;
        }
        if let Some(password) = input.password {
            validate_password(&password)?;
            user.password_hash = hash_password(&password)?;
        }
        if let Some(role) = input.role {
            user.role = role;
        }
        if let Some(status) = input.status {
            user.status = status;
        }

        self.users.update(&user).await?;

        if user.status == UserStatus::Banned {
            self.sessions.delete_by_user(user.id).await?;
        }

        Ok(user)
    }

    /// Delete a user (admin API)
    pub async fn delete_user(&self, id: i64) -> Result<(), UserServiceError> {
        if self.users.get_by_id(id).await?.is_none() {
            return Err(UserServiceError::NotFound);
        }
        self.users.delete(id).await?;
        Ok(())
    }

    /// Sweep expired sessions. Called from the periodic cleanup task.
    pub async fn cleanup_expired_sessions(&self) -> Result<i64> {
        self.sessions.delete_expired().await
    }
}

fn validate_username(username: &str) -> Result<(), UserServiceError> {
    let username = username.trim();
    if username.len() < 3 || username.len() > 50 {
        return Err(UserServiceError::Validation(
            "Username must be 3-50 characters".to_string(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(UserServiceError::Validation(
            "Username may only contain letters, digits, '_' and '-'".to_string(),
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), UserServiceError> {
    let email = email.trim();
    if email.len() > 255 || !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        return Err(UserServiceError::Validation(
            "Invalid email address".to_string(),
        ));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), UserServiceError> {
    if password.len() < 8 {
        return Err(UserServiceError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxBannedEmailRepository, SqlxSessionRepository, SqlxUserRepository,
    };
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> (UserService, Arc<dyn BannedEmailRepository>) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let banned = SqlxBannedEmailRepository::boxed(pool.clone());
        let service = UserService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool.clone()),
            banned.clone(),
            Arc::new(LoginRateLimiter::new()),
        );
        (service, banned)
    }

    fn input(username: &str, email: &str) -> CreateUserInput {
        CreateUserInput {
            username: username.to_string(),
            email: email.to_string(),
            password: "password123".to_string(),
            role: None,
        }
    }

    #[tokio::test]
    async fn test_first_user_becomes_admin() {
        let (service, _) = setup().await;

        let first = service.register(input("founder", "f@x.test")).await.unwrap();
        assert_eq!(first.role, UserRole::Admin);

        let second = service.register(input("second", "s@x.test")).await.unwrap();
        assert_eq!(second.role, UserRole::Customer);
    }

    #[tokio::test]
    async fn test_register_rejects_banned_email() {
        let (service, banned) = setup().await;
        banned.ban("Spam@Bad.Test", None).await.unwrap();

        let err = service
            .register(input("spammer", "spam@bad.test"))
            .await
            .unwrap_err();
        assert!(matches!(err, UserServiceError::EmailBanned));
    }

    #[tokio::test]
    async fn test_register_validation() {
        let (service, _) = setup().await;

        assert!(matches!(
            service.register(input("ab", "a@x.test")).await.unwrap_err(),
            UserServiceError::Validation(_)
        ));
        assert!(matches!(
            service.register(input("okname", "bademail")).await.unwrap_err(),
            UserServiceError::Validation(_)
        ));

        let mut short_pw = input("okname", "ok@x.test");
        short_pw.password = "short".to_string();
        assert!(matches!(
            service.register(short_pw).await.unwrap_err(),
            UserServiceError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_register_duplicates() {
        let (service, _) = setup().await;
        service.register(input("taken", "taken@x.test")).await.unwrap();

        assert!(matches!(
            service
                .register(input("taken", "other@x.test"))
                .await
                .unwrap_err(),
            UserServiceError::UsernameTaken
        ));
        assert!(matches!(
            service
                .register(input("other", "Taken@x.test"))
                .await
                .unwrap_err(),
            UserServiceError::EmailTaken
        ));
    }

    #[tokio::test]
    async fn test_login_and_validate_session() {
        let (service, _) = setup().await;
        service.register(input("alice", "alice@x.test")).await.unwrap();

        let (user, token) = service.login("alice", "password123", None).await.unwrap();
        assert_eq!(user.username, "alice");

        let resolved = service.validate_session(&token).await.unwrap();
        assert_eq!(resolved.id, user.id);

        service.logout(&token).await.unwrap();
        assert!(matches!(
            service.validate_session(&token).await.unwrap_err(),
            UserServiceError::InvalidSession
        ));
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let (service, _) = setup().await;
        service.register(input("bob", "bob@x.test")).await.unwrap();

        assert!(matches!(
            service.login("bob", "wrongpass", None).await.unwrap_err(),
            UserServiceError::InvalidCredentials
        ));
        assert!(matches!(
            service.login("ghost", "password123", None).await.unwrap_err(),
            UserServiceError::InvalidCredentials
        ));
    }

    #[tokio::test]
    async fn test_login_rate_limits_username() {
        let (service, _) = setup().await;
        service.register(input("carol", "carol@x.test")).await.unwrap();

        for _ in 0..5 {
            let _ = service.login("carol", "wrongpass", None).await;
        }
        assert!(matches!(
            service.login("carol", "password123", None).await.unwrap_err(),
            UserServiceError::RateLimited
        ));
    }

    #[tokio::test]
    async fn test_ban_drops_sessions() {
        let (service, _) = setup().await;
        service.register(input("root", "root@x.test")).await.unwrap();
        let dave = service.register(input("dave", "dave@x.test")).await.unwrap();

        let (_, token) = service.login("dave", "password123", None).await.unwrap();

        service
            .update_user(
                dave.id,
                UpdateUserInput {
                    status: Some(UserStatus::Banned),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(matches!(
            service.validate_session(&token).await.unwrap_err(),
            UserServiceError::InvalidSession
        ));
        assert!(matches!(
            service.login("dave", "password123", None).await.unwrap_err(),
            UserServiceError::Banned
        ));
    }
}
