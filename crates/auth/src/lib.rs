use std::time::Duration as StdDuration;

use backstage_config::AuthConfig;
use backstage_database::{
    DatabaseError, NewUser, Session, SessionRepository, SqlitePool, User, UserRepository,
    UserRole,
};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use rand::RngCore;
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod jwt;
pub mod password;
pub mod rate_limit;

pub use jwt::{Claims, JwtManager};
pub use password::{hash_password, validate_password, verify_password};
pub use rate_limit::LoginRateLimiter;

#[derive(Clone)]
pub struct Authenticator {
    users: UserRepository,
    sessions: SessionRepository,
    jwt: JwtManager,
    session_ttl: Duration,
    secure_word_hash: Option<String>,
    /// Checked on unknown usernames so both failure paths cost one argon2 verify.
    dummy_hash: String,
    limiter: LoginRateLimiter,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("too many login attempts, retry in {retry_after} seconds")]
    TooManyAttempts { retry_after: u64 },
    #[error("account is disabled")]
    AccountDisabled,
    #[error("session not found")]
    SessionNotFound,
    #[error("session expired")]
    SessionExpired,
    #[error("invalid session token")]
    InvalidToken,
    #[error("user already exists")]
    UserExists,
    #[error("user not found")]
    UserNotFound,
    #[error("{0}")]
    Validation(String),
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("password hashing failed: {0}")]
    PasswordHash(#[from] argon2::password_hash::Error),
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

/// A freshly issued login.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub session_id: String,
    pub user: User,
    pub expires_at: DateTime<Utc>,
}

/// Input for creating a staff account.
#[derive(Debug, Clone)]
pub struct RegisterUser {
    pub username: String,
    pub password: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub role: UserRole,
    pub azuracast_streamer_id: Option<i64>,
}

impl Authenticator {
    pub fn new(pool: SqlitePool, config: AuthConfig) -> Result<Self, AuthError> {
        if config.uses_development_secret() {
            warn!("auth.jwt_secret is the development default; set a real secret in production");
        }

        let secure_word_hash = match config.secure_word.as_deref().map(str::trim) {
            Some(word) if !word.is_empty() => Some(hash_password(word)?),
            _ => None,
        };

        let ttl_seconds = i64::try_from(config.session_ttl_seconds).unwrap_or(i64::MAX);

        Ok(Self {
            users: UserRepository::new(pool.clone()),
            sessions: SessionRepository::new(pool),
            jwt: JwtManager::new(&config.jwt_secret, config.jwt_issuer.clone()),
            session_ttl: Duration::seconds(ttl_seconds.min(i64::from(i32::MAX))),
            secure_word_hash,
            dummy_hash: hash_password(&generate_session_id())?,
            limiter: LoginRateLimiter::new(
                config.login_max_attempts,
                StdDuration::from_secs(config.login_window_seconds),
            ),
        })
    }

    pub fn users(&self) -> &UserRepository {
        &self.users
    }

    pub fn secure_word_required(&self) -> bool {
        self.secure_word_hash.is_some()
    }

    /// Verify credentials and issue a session token.
    ///
    /// Failures count against the lower-cased username; once the limit is
    /// reached the caller gets `TooManyAttempts` until the window passes.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        secure_word: Option<&str>,
    ) -> Result<AuthSession, AuthError> {
        let key = username.trim().to_lowercase();

        if let Err(retry_after) = self.limiter.check(&key).await {
            warn!(username = %key, "login rejected by rate limiter");
            return Err(AuthError::TooManyAttempts {
                retry_after: retry_after.as_secs().max(1),
            });
        }

        let user = match self.verify_credentials(&key, password, secure_word).await {
            Ok(user) => user,
            Err(AuthError::InvalidCredentials) => {
                self.limiter.record_failure(&key).await;
                debug!(username = %key, "login failed");
                return Err(AuthError::InvalidCredentials);
            }
            Err(other) => return Err(other),
        };

        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }

        self.limiter.reset(&key).await;
        self.users.touch_last_login(user.id).await?;

        let session = self.issue_session(user).await?;
        info!(user = %session.user.public_id, role = %session.user.role, "user logged in");
        Ok(session)
    }

    async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
        secure_word: Option<&str>,
    ) -> Result<User, AuthError> {
        let Some(user) = self.users.find_by_username(username).await? else {
            let _ = verify_password(password, &self.dummy_hash);
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        if let Some(expected) = &self.secure_word_hash {
            let provided = secure_word.map(str::trim).unwrap_or_default();
            if provided.is_empty() || !verify_password(provided, expected)? {
                return Err(AuthError::InvalidCredentials);
            }
        }

        Ok(user)
    }

    async fn issue_session(&self, user: User) -> Result<AuthSession, AuthError> {
        let session_id = generate_session_id();
        let now = Utc::now();
        let expires_at = now + self.session_ttl;

        self.sessions.create(&session_id, user.id, expires_at).await?;
        let token = self.jwt.generate_token(
            &user.public_id,
            &session_id,
            user.role.as_str(),
            now,
            expires_at,
        )?;

        Ok(AuthSession {
            token,
            session_id,
            user,
            expires_at,
        })
    }

    /// Resolve a bearer token to its user and backing session row.
    pub async fn authenticate_token(&self, token: &str) -> Result<(User, Session), AuthError> {
        let claims = self.jwt.validate_token(token).map_err(|err| match err.kind() {
            ErrorKind::ExpiredSignature => AuthError::SessionExpired,
            _ => AuthError::InvalidToken,
        })?;

        let session = self
            .sessions
            .find(&claims.sid)
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        if session.revoked_at.is_some() {
            return Err(AuthError::SessionNotFound);
        }
        if !session.is_valid_at(Utc::now()) {
            return Err(AuthError::SessionExpired);
        }

        let user = self
            .users
            .find_by_id(session.user_id)
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        if user.public_id != claims.sub {
            return Err(AuthError::InvalidToken);
        }
        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }

        Ok((user, session))
    }

    pub async fn logout(&self, session_id: &str) -> Result<(), AuthError> {
        match self.sessions.revoke(session_id).await {
            Ok(()) => Ok(()),
            Err(DatabaseError::NotFound(_)) => Err(AuthError::SessionNotFound),
            Err(other) => Err(other.into()),
        }
    }

    pub async fn logout_all(&self, user_id: i64) -> Result<u64, AuthError> {
        let revoked = self.sessions.revoke_all_for_user(user_id).await?;
        info!(user_id, revoked, "revoked all sessions");
        Ok(revoked)
    }

    /// Create a staff account. Admin-only at the HTTP layer.
    pub async fn register_user(&self, request: RegisterUser) -> Result<User, AuthError> {
        let username = request.username.trim().to_string();
        password::validate_username(&username).map_err(AuthError::Validation)?;
        validate_password(&request.password).map_err(AuthError::Validation)?;

        let email = request
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string);
        if let Some(email) = &email {
            password::validate_email(email).map_err(AuthError::Validation)?;
        }

        let display_name = request
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(&username)
            .to_string();

        let password_hash = hash_password(&request.password)?;

        let user = self
            .users
            .create(&NewUser {
                username,
                email,
                display_name,
                password_hash,
                role: request.role,
                azuracast_streamer_id: request.azuracast_streamer_id,
            })
            .await
            .map_err(|err| match err {
                DatabaseError::Conflict(_) => AuthError::UserExists,
                other => AuthError::Database(other),
            })?;

        info!(user = %user.public_id, role = %user.role, "registered user");
        Ok(user)
    }

    pub async fn change_password(
        &self,
        user: &User,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        if !verify_password(current_password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }
        if current_password == new_password {
            return Err(AuthError::Validation(
                "new password must differ from the current one".to_string(),
            ));
        }
        validate_password(new_password).map_err(AuthError::Validation)?;

        self.users
            .update_password(user.id, &hash_password(new_password)?)
            .await?;
        info!(user = %user.public_id, "password changed");
        Ok(())
    }

    /// Set a new password without the old one and sign the user out everywhere.
    pub async fn reset_password(&self, user_id: i64, new_password: &str) -> Result<(), AuthError> {
        validate_password(new_password).map_err(AuthError::Validation)?;

        match self
            .users
            .update_password(user_id, &hash_password(new_password)?)
            .await
        {
            Ok(()) => {}
            Err(DatabaseError::NotFound(_)) => return Err(AuthError::UserNotFound),
            Err(other) => return Err(other.into()),
        }

        self.logout_all(user_id).await?;
        Ok(())
    }

    pub async fn purge_expired_sessions(&self) -> Result<u64, AuthError> {
        let purged = self.sessions.purge_expired(Utc::now()).await?;
        if purged > 0 {
            debug!(purged, "purged expired sessions");
        }
        Ok(purged)
    }
}

fn generate_session_id() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
