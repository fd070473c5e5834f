use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Duration;

use crate::domain::user::models::Credential;
use crate::domain::user::models::LoginCommand;
use crate::domain::user::models::RegisterCommand;
use crate::domain::user::models::Session;
use crate::domain::user::models::TokenClaims;
use crate::domain::user::models::UpdateProfileCommand;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::user::errors::PasswordError;
use crate::user::errors::TokenError;
use crate::user::errors::UserError;

/// Port for user domain service operations.
#[async_trait]
pub trait UserServicePort: Send + Sync + 'static {
    /// Register a new account and store its password hash.
    ///
    /// No token is issued; the client logs in afterwards.
    ///
    /// # Arguments
    /// * `command` - Validated command containing display name, email, and password
    ///
    /// # Returns
    /// Created user entity
    ///
    /// # Errors
    /// * `EmailAlreadyUsed` - Email is already registered
    /// * `Password` - Password hashing failed
    /// * `DatabaseError` - Database operation failed
    async fn register(&self, command: RegisterCommand) -> Result<User, UserError>;

    /// Verify credentials and issue a session token.
    ///
    /// # Arguments
    /// * `command` - Normalized email and plaintext password
    ///
    /// # Returns
    /// Signed token with its expiry
    ///
    /// # Errors
    /// * `InvalidCredentials` - Unknown email, missing credential or wrong password
    /// * `Token` - Token signing failed
    /// * `DatabaseError` - Database operation failed
    async fn login(&self, command: LoginCommand) -> Result<Session, UserError>;

    /// End a session.
    ///
    /// Sessions are stateless, so this only records the event; the client is
    /// responsible for discarding its token.
    async fn logout(&self, user_id: &UserId) -> Result<(), UserError>;

    /// Retrieve the profile of an authenticated user.
    ///
    /// # Errors
    /// * `NotFound` - User does not exist
    /// * `DatabaseError` - Database operation failed
    async fn get_profile(&self, id: &UserId) -> Result<User, UserError>;

    /// Update display name and/or avatar of an authenticated user.
    ///
    /// # Errors
    /// * `NotFound` - User does not exist
    /// * `DatabaseError` - Database operation failed
    async fn update_profile(
        &self,
        id: &UserId,
        command: UpdateProfileCommand,
    ) -> Result<User, UserError>;
}

/// Persistence operations for the user directory.
///
/// Implementations own the authoritative email uniqueness guarantee.
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Persist new user to storage.
    ///
    /// # Errors
    /// * `EmailAlreadyUsed` - Email is already registered
    /// * `DatabaseError` - Database operation failed
    async fn create(&self, user: User) -> Result<User, UserError>;

    /// Retrieve user by identifier, `None` if absent.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserError>;

    /// Retrieve user by normalized email, `None` if absent.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserError>;

    /// Check whether a normalized email is already registered.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn exists_by_email(&self, email: &str) -> Result<bool, UserError>;

    /// Touch and persist an existing user.
    ///
    /// # Returns
    /// The user as stored, with its new update timestamp
    ///
    /// # Errors
    /// * `NotFound` - User does not exist
    /// * `EmailAlreadyUsed` - New email is already registered
    /// * `DatabaseError` - Database operation failed
    async fn update(&self, user: User) -> Result<User, UserError>;

    /// Remove user from storage.
    ///
    /// # Errors
    /// * `NotFound` - User does not exist
    /// * `DatabaseError` - Database operation failed
    async fn delete(&self, id: &UserId) -> Result<(), UserError>;
}

/// Persistence operations for password credentials, keyed by user id.
#[async_trait]
pub trait CredentialRepository: Send + Sync + 'static {
    /// # Errors
    /// * `CredentialAlreadyExists` - User already has a credential
    /// * `DatabaseError` - Database operation failed
    async fn create(&self, credential: Credential) -> Result<Credential, UserError>;

    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn find_by_user_id(&self, user_id: &UserId) -> Result<Option<Credential>, UserError>;

    /// # Errors
    /// * `NotFound` - No credential for this user
    /// * `DatabaseError` - Database operation failed
    async fn update(&self, credential: Credential) -> Result<Credential, UserError>;

    /// # Errors
    /// * `NotFound` - No credential for this user
    /// * `DatabaseError` - Database operation failed
    async fn delete(&self, user_id: &UserId) -> Result<(), UserError>;
}

/// Password hashing strategy.
pub trait PasswordHasher: Send + Sync + 'static {
    /// Produce a self-describing hash of a plaintext password.
    ///
    /// # Errors
    /// * `HashingFailed` - Hashing operation failed
    fn hash(&self, password: &str) -> Result<String, PasswordError>;

    /// Check a plaintext password against a stored hash. Never fails: any
    /// malformed hash is a mismatch.
    fn compare(&self, stored_hash: &str, password: &str) -> bool;

    /// Spend the work of one `compare` without a stored hash. Used when no
    /// account matches, so that path costs as much as a wrong password.
    fn compare_dummy(&self, password: &str);
}

/// Session token issuance and verification.
pub trait TokenIssuer: Send + Sync + 'static {
    /// Sign a token for `subject`, valid for `ttl`.
    ///
    /// # Errors
    /// * `SigningFailed` - Signing key unusable
    fn issue(
        &self,
        subject: &str,
        ttl: Duration,
        custom: HashMap<String, serde_json::Value>,
    ) -> Result<Session, TokenError>;

    /// Verify signature, algorithm and validity window of a token.
    ///
    /// # Errors
    /// * `Expired` - Token past its expiry
    /// * `Rejected` - Any other verification failure
    fn parse_and_verify(&self, token: &str) -> Result<TokenClaims, TokenError>;
}
