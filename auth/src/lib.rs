//! Authentication utilities library
//!
//! Provides the credential and session primitives used by the identity service:
//! - Password hashing (Argon2id) with verification of bcrypt and legacy digest hashes
//! - Session token issuance and verification (HMAC-signed JWT)
//!
//! Services define their own ports around these types and adapt them, so the
//! domain never depends on this crate directly.
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::new();
//! let hash = hasher.hash("my_password").unwrap();
//! assert!(hasher.compare(&hash, "my_password"));
//!
//! // Hashes written before the switch to Argon2 still verify.
//! let legacy = auth::password::legacy::digest("old_password");
//! assert!(hasher.compare(&legacy, "old_password"));
//! ```
//!
//! ## Session Tokens
//! ```
//! use std::collections::HashMap;
//!
//! use auth::JwtIssuer;
//! use chrono::Duration;
//!
//! let issuer = JwtIssuer::new(
//!     b"secret_key_at_least_32_bytes_long!",
//!     "my-app",
//!     vec!["my-app".to_string()],
//! );
//! let issued = issuer.issue("user123", Duration::hours(24), HashMap::new()).unwrap();
//! let claims = issuer.parse_and_verify(&issued.token).unwrap();
//! assert_eq!(claims.sub, "user123");
//! ```

pub mod jwt;
pub mod password;

// Re-export commonly used items
pub use jwt::Claims;
pub use jwt::IssuedToken;
pub use jwt::JwtError;
pub use jwt::JwtIssuer;
pub use password::HashCost;
pub use password::HashFormat;
pub use password::PasswordError;
pub use password::PasswordHasher;
