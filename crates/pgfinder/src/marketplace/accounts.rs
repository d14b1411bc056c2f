use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use super::access::Identity;
use super::domain::{Role, User};
use super::store::{StoreError, UserStore};
use super::validate::{self, ValidationError};

/// Hashing port. The concrete algorithm lives with the binary; domain code
/// only ever sees opaque hashes.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, HasherError>;
    fn verify(&self, password: &str, hash: &str) -> Result<bool, HasherError>;
}

/// Hashing backend failure.
#[derive(Debug, thiserror::Error)]
#[error("password hashing failed: {0}")]
pub struct HasherError(pub String);

/// Signup payload, pre-validation.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Signup {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// Registration and credential checks. Roles are fixed at signup; there is
/// no promotion path.
pub struct AccountService<U, H> {
    users: Arc<U>,
    hasher: Arc<H>,
}

impl<U, H> Clone for AccountService<U, H> {
    fn clone(&self) -> Self {
        Self {
            users: self.users.clone(),
            hasher: self.hasher.clone(),
        }
    }
}

impl<U, H> AccountService<U, H>
where
    U: UserStore + 'static,
    H: PasswordHasher + 'static,
{
    pub fn new(users: Arc<U>, hasher: Arc<H>) -> Self {
        Self { users, hasher }
    }

    /// Register a new account. Emails are unique case-insensitively; the
    /// check and insert are one atomic store step. Signup only mints
    /// student and owner accounts; admins are provisioned out of band.
    pub fn register(&self, signup: Signup) -> Result<User, AccountError> {
        let name = validate::validate_name(&signup.name)?;
        let email = validate::normalize_email(&signup.email)?;
        validate::validate_password(&signup.password)?;
        if signup.role == Role::Admin {
            return Err(ValidationError::new(
                "role",
                "admin accounts are provisioned, not registered",
            )
            .into());
        }

        let password_hash = self.hasher.hash(&signup.password)?;
        let user = User::new(name, email, password_hash, signup.role, Utc::now());
        let stored = self
            .users
            .insert_unique_email(user)
            .map_err(|err| match err {
                StoreError::Conflict => AccountError::AlreadyRegistered,
                other => AccountError::Store(other),
            })?;
        info!(user = %stored.id, role = stored.role.label(), "user registered");
        Ok(stored)
    }

    /// Check credentials. Unknown email and wrong password are deliberately
    /// indistinguishable to the caller.
    pub fn authenticate(&self, email: &str, password: &str) -> Result<User, AccountError> {
        let email = email.trim().to_lowercase();
        let user = self
            .users
            .fetch_by_email(&email)?
            .ok_or(AccountError::InvalidCredentials)?;
        if self.hasher.verify(password, &user.password_hash)? {
            Ok(user)
        } else {
            Err(AccountError::InvalidCredentials)
        }
    }

    /// The identity handed to the session layer after a successful login.
    pub fn identity_of(user: &User) -> Identity {
        Identity {
            user_id: user.id,
            role: user.role,
        }
    }
}

/// Error raised by the account service.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("email already registered")]
    AlreadyRegistered,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error(transparent)]
    Hasher(#[from] HasherError),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for AccountError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}
