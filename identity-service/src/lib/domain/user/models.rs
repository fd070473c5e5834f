use std::collections::HashMap;
use std::fmt;

use chrono::DateTime;
use chrono::Utc;
use uuid::Uuid;

use crate::user::errors::DisplayNameError;
use crate::user::errors::EmailError;
use crate::user::errors::UserError;
use crate::user::errors::UserIdError;

/// User aggregate entity.
///
/// Represents a registered account. Secret material lives in [`Credential`].
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    pub display_name: DisplayName,
    pub email: Option<EmailAddress>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with a fresh identifier.
    pub fn new(display_name: DisplayName, email: Option<EmailAddress>) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            display_name,
            email,
            avatar_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Re-stamp the last update time. Called before every persisted change.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Email as stored, empty when the user has none on file.
    pub fn email_str(&self) -> &str {
        self.email.as_ref().map_or("", EmailAddress::as_str)
    }
}

/// User unique identifier type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Generate a new random user ID.
    ///
    /// # Returns
    /// UserId with random UUID v4
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a user ID from string.
    ///
    /// # Arguments
    /// * `s` - UUID string to parse
    ///
    /// # Returns
    /// Parsed UserId
    ///
    /// # Errors
    /// * `InvalidFormat` - String is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self, UserIdError> {
        Uuid::parse_str(s)
            .map(UserId)
            .map_err(|e| UserIdError::InvalidFormat(e.to_string()))
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Display name value type
///
/// Surrounding whitespace is trimmed; the remainder must be 1-50 characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayName(String);

impl DisplayName {
    const MIN_LENGTH: usize = 1;
    const MAX_LENGTH: usize = 50;

    /// Create a new valid display name.
    ///
    /// # Errors
    /// * `TooShort` - Empty after trimming
    /// * `TooLong` - Longer than 50 characters after trimming
    pub fn new(display_name: String) -> Result<Self, DisplayNameError> {
        let trimmed = display_name.trim();
        let length = trimmed.chars().count();

        if length < Self::MIN_LENGTH {
            Err(DisplayNameError::TooShort {
                min: Self::MIN_LENGTH,
                actual: length,
            })
        } else if length > Self::MAX_LENGTH {
            Err(DisplayNameError::TooLong {
                max: Self::MAX_LENGTH,
                actual: length,
            })
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    /// Get display name as string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Normalized email address type
///
/// Always trimmed and lower-cased. Shape check only: exactly one `@`, a
/// non-empty local part, and a domain of at least three characters containing
/// a dot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmailAddress(String);

impl EmailAddress {
    const MIN_DOMAIN_LENGTH: usize = 3;

    /// Canonical form used for storage and lookup.
    pub fn normalize(raw: &str) -> String {
        raw.trim().to_lowercase()
    }

    /// Create a new validated email address.
    ///
    /// # Errors
    /// * `InvalidFormat` - Normalized value does not look like an email
    pub fn new(email: &str) -> Result<Self, EmailError> {
        let email = Self::normalize(email);

        if Self::looks_like_email(&email) {
            Ok(Self(email))
        } else {
            Err(EmailError::InvalidFormat(email))
        }
    }

    /// Parse an optional email: blank input means "no email on file".
    pub fn parse_optional(email: &str) -> Result<Option<Self>, EmailError> {
        if email.trim().is_empty() {
            Ok(None)
        } else {
            Self::new(email).map(Some)
        }
    }

    fn looks_like_email(email: &str) -> bool {
        let mut parts = email.split('@');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(local), Some(domain), None) => {
                !local.is_empty()
                    && domain.chars().count() >= Self::MIN_DOMAIN_LENGTH
                    && domain.contains('.')
            }
            _ => false,
        }
    }

    /// Get email as string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Secret material authenticating one user.
#[derive(Clone, PartialEq)]
pub struct Credential {
    pub user_id: UserId,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(user_id: UserId, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            password_hash,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("user_id", &self.user_id)
            .field("password_hash", &"<redacted>")
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Bearer token handed out on login.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Verified contents of a session token.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenClaims {
    pub subject: String,
    pub issuer: String,
    pub audience: Vec<String>,
    pub issued_at: DateTime<Utc>,
    pub not_before: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub token_id: String,
    pub custom: HashMap<String, serde_json::Value>,
}

/// Command to register a new account with domain types
pub struct RegisterCommand {
    pub display_name: DisplayName,
    pub email: Option<EmailAddress>,
    pub password: String,
}

impl RegisterCommand {
    /// Normalize and validate raw registration input.
    ///
    /// # Arguments
    /// * `display_name` - Raw display name, trimmed before validation
    /// * `email` - Raw email, may be blank
    /// * `password` - Plain text password (will be hashed by service)
    ///
    /// # Errors
    /// * `InvalidDisplayName` - Display name not 1-50 characters
    /// * `InvalidEmail` - Non-blank email with an invalid shape
    pub fn new(display_name: String, email: &str, password: String) -> Result<Self, UserError> {
        Ok(Self {
            display_name: DisplayName::new(display_name)?,
            email: EmailAddress::parse_optional(email)?,
            password,
        })
    }
}

impl fmt::Debug for RegisterCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterCommand")
            .field("display_name", &self.display_name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Command to log in. The email is normalized but not validated: a malformed
/// address simply matches no account.
pub struct LoginCommand {
    pub email: String,
    pub password: String,
}

impl LoginCommand {
    pub fn new(email: &str, password: String) -> Self {
        Self {
            email: EmailAddress::normalize(email),
            password,
        }
    }
}

impl fmt::Debug for LoginCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCommand")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Command to update profile fields. Only provided fields are changed.
#[derive(Debug, Default)]
pub struct UpdateProfileCommand {
    pub display_name: Option<DisplayName>,
    pub avatar_url: Option<String>,
}
