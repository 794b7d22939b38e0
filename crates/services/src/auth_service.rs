use std::sync::Arc;

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::Serialize;

use club_core::model::{Email, Registration, User};
use club_core::{Actor, Role};
use storage::repository::{
    NewSessionRecord, NewUserRecord, SessionRepository, StorageError, UserRepository,
};

use crate::Clock;
use crate::error::AuthError;

/// Default session lifetime: one week.
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 168;

/// A freshly issued bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

/// Registration, login, and bearer-token resolution.
#[derive(Clone)]
pub struct AuthService {
    clock: Clock,
    session_ttl: Duration,
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionRepository>,
}

impl AuthService {
    #[must_use]
    pub fn new(
        clock: Clock,
        session_ttl: Duration,
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionRepository>,
    ) -> Self {
        Self {
            clock,
            session_ttl,
            users,
            sessions,
        }
    }

    /// Create a `public` account and sign it in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Invalid` for bad input, `AuthError::EmailTaken` if
    /// the email is registered, and `AuthError::Storage` on persistence
    /// failures.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        year: Option<u8>,
    ) -> Result<IssuedSession, AuthError> {
        let registration = Registration::validate(name, email, password, year)?;
        let user = self.create_user(registration, password, Role::Public).await?;
        tracing::info!(user_id = %user.id, "user registered");
        self.issue(user).await
    }

    /// Create an account with `role` unless the email is already taken.
    /// Returns the account and whether it was created by this call.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Invalid` for bad input and `AuthError::Storage` on
    /// persistence failures.
    pub async fn provision(
        &self,
        name: &str,
        email: &str,
        password: &str,
        year: Option<u8>,
        role: Role,
    ) -> Result<(User, bool), AuthError> {
        let registration = Registration::validate(name, email, password, year)?;
        let email = registration.email.clone();
        match self.create_user(registration, password, role).await {
            Ok(user) => Ok((user, true)),
            Err(AuthError::EmailTaken) => {
                let existing = self
                    .users
                    .credentials_by_email(&email)
                    .await?
                    .ok_or(StorageError::NotFound)?;
                Ok((existing.user, false))
            }
            Err(e) => Err(e),
        }
    }

    /// Verify credentials and issue a session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for an unknown email or a
    /// wrong password alike.
    pub async fn login(&self, email: &str, password: &str) -> Result<IssuedSession, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;
        let creds = self
            .users
            .credentials_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        if !verify_off_thread(password, creds.password_hash.clone()).await? {
            tracing::debug!(user_id = %creds.user.id, "password mismatch");
            return Err(AuthError::InvalidCredentials);
        }
        self.issue(creds.user).await
    }

    /// End a session. Unknown tokens are ignored.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the delete fails.
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        self.sessions.delete_session(token).await?;
        Ok(())
    }

    /// Resolve a bearer token to the caller. The role comes from the user
    /// row, so role changes apply on the next request.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidSession` for unknown or expired tokens.
    pub async fn resolve(&self, token: &str) -> Result<Actor, AuthError> {
        let user_id = self
            .sessions
            .session_user(token, self.clock.now())
            .await?
            .ok_or(AuthError::InvalidSession)?;
        let user = self
            .users
            .get_user(user_id)
            .await?
            .ok_or(AuthError::InvalidSession)?;
        Ok(Actor::user(user.id, user.role))
    }

    /// Drop expired sessions.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the delete fails.
    pub async fn purge_expired(&self) -> Result<u64, AuthError> {
        let purged = self.sessions.purge_expired(self.clock.now()).await?;
        if purged > 0 {
            tracing::debug!(purged, "expired sessions removed");
        }
        Ok(purged)
    }

    async fn create_user(
        &self,
        registration: Registration,
        password: &str,
        role: Role,
    ) -> Result<User, AuthError> {
        let password_hash = hash_off_thread(password).await?;
        self.users
            .insert_user(NewUserRecord {
                name: registration.name,
                email: registration.email,
                password_hash,
                role,
                year: registration.year,
                created_at: self.clock.now(),
            })
            .await
            .map_err(|e| match e {
                StorageError::Conflict => AuthError::EmailTaken,
                other => AuthError::Storage(other),
            })
    }

    async fn issue(&self, user: User) -> Result<IssuedSession, AuthError> {
        let now = self.clock.now();
        let session = NewSessionRecord {
            token: uuid::Uuid::new_v4().simple().to_string(),
            user_id: user.id,
            created_at: now,
            expires_at: now + self.session_ttl,
        };
        let (token, expires_at) = (session.token.clone(), session.expires_at);
        self.sessions.insert_session(session).await?;
        Ok(IssuedSession {
            token,
            expires_at,
            user,
        })
    }
}

/// Argon2 is CPU-bound; run it on the blocking pool.
async fn hash_off_thread(password: &str) -> Result<String, AuthError> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AuthError::Hash(e.to_string()))?
}

async fn verify_off_thread(password: &str, stored: String) -> Result<bool, AuthError> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .map_err(|e| AuthError::Hash(e.to_string()))
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let mut salt = [0u8; 16];
    rand::rng().fill_bytes(&mut salt);
    let salt = SaltString::encode_b64(&salt).map_err(|e| AuthError::Hash(e.to_string()))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored)
        .is_ok_and(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
}
