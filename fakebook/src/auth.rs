//! Password authentication and the process-local session.
//!
//! Credentials live in their own table, keyed by the same id as the user's
//! profile. Domain operations never read the session: callers pass the acting
//! user id explicitly and only the CLI and the admin gate consult it.

use std::sync::Mutex;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use chrono::Utc;
use log::{debug, info};

use crate::{
    errors::AuthError,
    id::generate_user_id,
    models::Credential,
    repository::Repo,
    store::DataStore,
    validators::normalize_email,
};

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
}

/// Session lookups the rest of the crate depends on.
#[allow(async_fn_in_trait)]
pub trait AuthProvider {
    /// The user of the current session, if any.
    async fn current_user(&self) -> Option<SessionUser>;

    async fn sign_out(&self);
}

/// Store-backed authenticator holding one session at a time.
pub struct Authenticator<'s, S> {
    credentials: Repo<'s, S, Credential>,
    session: Mutex<Option<SessionUser>>,
}

async fn hash_password(password: String) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(rand::thread_rng());
        let argon2 = Argon2::default();

        argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| AuthError::Hashing { message: err.to_string() })
    })
    .await
    .map_err(|err| AuthError::Hashing { message: err.to_string() })?
}

async fn verify_password(password: String, stored: String) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || {
        let password_hash =
            PasswordHash::new(&stored).map_err(|err| AuthError::Hashing { message: err.to_string() })?;
        Ok(Argon2::default().verify_password(password.as_bytes(), &password_hash).is_ok())
    })
    .await
    .map_err(|err| AuthError::Hashing { message: err.to_string() })?
}

impl<'s, S: DataStore> Authenticator<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self {
            credentials: Repo::new(store),
            session: Mutex::new(None),
        }
    }

    /// Create an account and sign it in.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SessionUser, AuthError> {
        let email = normalize_email(email);
        let existing = self.credentials.fetch_optional(self.credentials.query().eq("email", email.as_str())).await?;
        if existing.is_some() {
            return Err(AuthError::EmailTaken { email });
        }

        let credential = Credential {
            id: generate_user_id(),
            email: email.clone(),
            password_hash: hash_password(password.to_string()).await?,
            created_at: Utc::now(),
        };
        let stored = match self.credentials.insert(&credential).await {
            Ok(stored) => stored,
            Err(err) if err.is_unique_violation() => return Err(AuthError::EmailTaken { email }),
            Err(err) => return Err(err.into()),
        };

        info!("signed up {}", stored.email);
        Ok(self.open_session(stored))
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SessionUser, AuthError> {
        let email = normalize_email(email);
        let credential = self
            .credentials
            .fetch_optional(self.credentials.query().eq("email", email.as_str()))
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password.to_string(), credential.password_hash.clone()).await? {
            debug!("password mismatch for {email}");
            return Err(AuthError::InvalidCredentials);
        }
        Ok(self.open_session(credential))
    }

    /// Drop the stored credential of a user. Used when an account is removed.
    pub async fn forget(&self, user_id: &str) -> Result<u64, AuthError> {
        let removed = self.credentials.delete_where(self.credentials.query().eq("id", user_id)).await?;
        if let Ok(mut session) = self.session.lock()
            && session.as_ref().is_some_and(|user| user.id == user_id)
        {
            *session = None;
        }
        Ok(removed)
    }

    /// The session user or `AuthError::NoSession`.
    pub fn require_user(&self) -> Result<SessionUser, AuthError> {
        self.session_user().ok_or(AuthError::NoSession)
    }

    fn session_user(&self) -> Option<SessionUser> {
        self.session.lock().ok().and_then(|session| session.clone())
    }

    fn open_session(&self, credential: Credential) -> SessionUser {
        let user = SessionUser {
            id: credential.id,
            email: credential.email,
        };
        if let Ok(mut session) = self.session.lock() {
            *session = Some(user.clone());
        }
        user
    }
}

impl<S: DataStore> AuthProvider for Authenticator<'_, S> {
    async fn current_user(&self) -> Option<SessionUser> {
        self.session_user()
    }

    async fn sign_out(&self) {
        if let Ok(mut session) = self.session.lock() {
            *session = None;
        }
    }
}
