//! Accounts: registration, login, bearer-token resolution and the
//! configuration-driven administrator bootstrap.

use crate::environment::Clock;
use crate::error::{ServiceError, ServiceResult, Validator, is_valid_email};
use crate::store::{StoreError, UserRepository};
use crate::types::{Actor, Role, User, UserId, UserSummary};
use std::str::FromStr;
use std::sync::Arc;
use ticketbooth_auth::{AuthError, TokenSigner, hash_password, verify_password};
use uuid::Uuid;

/// Longest accepted display name
pub const MAX_NAME_LEN: usize = 50;
/// Shortest accepted password
pub const MIN_PASSWORD_LEN: usize = 6;

/// Registration input
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Registration {
    /// Display name
    pub name: String,
    /// E-mail
    pub email: String,
    /// Plaintext password
    pub password: String,
    /// Role the client asked for, if any. Only `user` is accepted.
    pub requested_role: Option<String>,
}

/// Login input
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Login {
    /// E-mail
    pub email: String,
    /// Plaintext password
    pub password: String,
}

/// A signed-in user
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    /// Bearer token
    pub token: String,
    /// Who it belongs to
    pub user: UserSummary,
}

/// Administrator account to ensure at startup
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdminBootstrap {
    /// Login e-mail
    pub email: String,
    /// Display name
    pub name: String,
    /// Password; reset on every start when set
    pub password: Option<String>,
}

/// Account operations
#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    signer: TokenSigner,
    clock: Arc<dyn Clock>,
    reserved_email: Option<String>,
}

impl AccountService {
    /// Create the service
    #[must_use]
    pub fn new(
        users: Arc<dyn UserRepository>,
        signer: TokenSigner,
        clock: Arc<dyn Clock>,
        reserved_email: Option<String>,
    ) -> Self {
        Self {
            users,
            signer,
            clock,
            reserved_email: reserved_email.map(|email| normalize_email(&email)),
        }
    }

    /// Register a regular user and sign them in
    ///
    /// # Errors
    ///
    /// - `Forbidden` when asking for the admin role or using the reserved e-mail
    /// - `ValidationFailed` for bad fields or an e-mail already registered
    #[tracing::instrument(skip(self, input))]
    pub async fn register(&self, input: Registration) -> ServiceResult<Session> {
        if input
            .requested_role
            .as_deref()
            .is_some_and(|role| role.trim().eq_ignore_ascii_case(Role::Admin.as_str()))
        {
            tracing::warn!("Registration attempted with admin role");
            return Err(ServiceError::Forbidden("Cannot register as admin".to_string()));
        }

        let name = input.name.trim().to_owned();
        let email = normalize_email(&input.email);
        Validator::new()
            .check(!name.is_empty(), "name", "Please add a name")
            .check(name.chars().count() <= MAX_NAME_LEN, "name", "Name cannot be more than 50 characters")
            .check(is_valid_email(&email), "email", "Please add a valid email")
            .check(
                input.password.chars().count() >= MIN_PASSWORD_LEN,
                "password",
                "Password must be at least 6 characters",
            )
            .finish()?;

        if self.reserved_email.as_deref() == Some(email.as_str()) {
            tracing::warn!("Registration attempted with reserved administrator e-mail");
            return Err(ServiceError::Forbidden("This email is reserved".to_string()));
        }
        if self.users.find_user_by_email(&email).await?.is_some() {
            return Err(ServiceError::invalid("email", "User already exists"));
        }

        let user = User {
            id: UserId::new(),
            name,
            email,
            password_hash: hash(input.password).await?,
            role: Role::User,
            created_at: self.clock.now(),
        };
        match self.users.insert_user(&user).await {
            Ok(()) => {}
            Err(StoreError::Duplicate { .. }) => return Err(ServiceError::invalid("email", "User already exists")),
            Err(other) => return Err(other.into()),
        }
        tracing::info!(user_id = %user.id, "User registered");
        self.session_for(&user)
    }

    /// Sign in with e-mail and password
    ///
    /// # Errors
    ///
    /// `Unauthorized("Invalid credentials")` for an unknown e-mail or a wrong password.
    #[tracing::instrument(skip(self, input))]
    pub async fn login(&self, input: Login) -> ServiceResult<Session> {
        let email = normalize_email(&input.email);
        Validator::new()
            .check(!email.is_empty(), "email", "Please provide an email")
            .check(!input.password.is_empty(), "password", "Please provide a password")
            .finish()?;
        let Some(user) = self.users.find_user_by_email(&email).await? else {
            return Err(invalid_credentials());
        };
        match verify(input.password, user.password_hash.clone()).await {
            Ok(()) => {
                tracing::info!(user_id = %user.id, "User logged in");
                self.session_for(&user)
            }
            Err(AuthError::InvalidCredentials) => Err(invalid_credentials()),
            Err(other) => Err(other.into()),
        }
    }

    /// Resolve a bearer token to the acting user. The role comes from the
    /// stored account, so a promotion takes effect without a new token.
    ///
    /// # Errors
    ///
    /// `Unauthorized` for bad, expired or orphaned tokens.
    pub async fn authenticate(&self, token: &str) -> ServiceResult<(Actor, UserSummary)> {
        let claims = self.signer.verify(token, self.clock.now()).map_err(|error| {
            tracing::debug!(%error, "Bearer token rejected");
            ServiceError::Unauthorized("Not authorized, token failed".to_string())
        })?;
        let user_id = Uuid::from_str(&claims.sub)
            .map(UserId::from_uuid)
            .map_err(|_| ServiceError::Unauthorized("Not authorized, token failed".to_string()))?;
        let user = self
            .users
            .find_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("Not authorized, user not found".to_string()))?;
        Ok((Actor::new(user.id, user.role), user.summary()))
    }

    /// The actor's own summary
    ///
    /// # Errors
    ///
    /// `NotFound` if the account was removed.
    pub async fn me(&self, actor: &Actor) -> ServiceResult<UserSummary> {
        self.users
            .find_user(actor.user_id)
            .await?
            .map(|user| user.summary())
            .ok_or_else(|| ServiceError::not_found("User", actor.user_id))
    }

    /// Ensure the configured administrator exists with the admin role.
    ///
    /// Creates the account, or promotes an existing one. When a password is
    /// configured it replaces the stored one.
    ///
    /// # Errors
    ///
    /// `ValidationFailed` if creating the account without a password or with
    /// a malformed e-mail; store failures.
    pub async fn ensure_admin(&self, bootstrap: AdminBootstrap) -> ServiceResult<User> {
        let email = normalize_email(&bootstrap.email);
        if !is_valid_email(&email) {
            return Err(ServiceError::invalid("ADMIN_EMAIL", "Administrator e-mail is not valid"));
        }

        if let Some(mut user) = self.users.find_user_by_email(&email).await? {
            let mut changed = false;
            if user.role != Role::Admin {
                user.role = Role::Admin;
                changed = true;
            }
            if let Some(password) = bootstrap.password {
                user.password_hash = hash(password).await?;
                changed = true;
            }
            if changed {
                self.users.update_user(&user).await?;
                tracing::info!(user_id = %user.id, "Administrator account updated");
            } else {
                tracing::info!(user_id = %user.id, "Administrator account already present");
            }
            return Ok(user);
        }

        let Some(password) = bootstrap.password else {
            return Err(ServiceError::invalid(
                "ADMIN_PASSWORD",
                "Administrator password is required to create the account",
            ));
        };
        let user = User {
            id: UserId::new(),
            name: bootstrap.name,
            email,
            password_hash: hash(password).await?,
            role: Role::Admin,
            created_at: self.clock.now(),
        };
        self.users.insert_user(&user).await?;
        tracing::info!(user_id = %user.id, "Administrator account created");
        Ok(user)
    }

    fn session_for(&self, user: &User) -> ServiceResult<Session> {
        let token = self
            .signer
            .issue(&user.id.to_string(), user.role.as_str(), self.clock.now())?;
        Ok(Session {
            token,
            user: user.summary(),
        })
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn invalid_credentials() -> ServiceError {
    ServiceError::Unauthorized("Invalid credentials".to_string())
}

async fn hash(password: String) -> ServiceResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AuthError::Crypto(e.to_string()))?
        .map_err(ServiceError::from)
}

async fn verify(password: String, stored: String) -> Result<(), AuthError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .map_err(|e| AuthError::Crypto(e.to_string()))?
}
