use auth::HashCost;

use crate::domain::user::ports::PasswordHasher;
use crate::user::errors::PasswordError;

/// Password hasher backed by the auth library.
///
/// New hashes are Argon2id; stored bcrypt and legacy SHA-256 hashes are still
/// accepted by `compare`.
pub struct Argon2PasswordHasher {
    hasher: auth::PasswordHasher,
    /// Hash at the configured cost, compared against when no account matches
    dummy_hash: Option<String>,
}

impl Argon2PasswordHasher {
    pub fn new(cost: HashCost) -> Self {
        let hasher = auth::PasswordHasher::with_cost(cost);
        let dummy_hash = hasher
            .hash(&uuid::Uuid::new_v4().to_string())
            .map_err(|e| tracing::warn!(error = %e, "Dummy password hash unavailable"))
            .ok();

        Self { hasher, dummy_hash }
    }
}

impl Default for Argon2PasswordHasher {
    fn default() -> Self {
        Self::new(HashCost::default())
    }
}

impl PasswordHasher for Argon2PasswordHasher {
    fn hash(&self, password: &str) -> Result<String, PasswordError> {
        self.hasher.hash(password).map_err(|e| {
            tracing::error!(error = %e, "Password hashing failed");
            PasswordError::HashingFailed(e.to_string())
        })
    }

    fn compare(&self, stored_hash: &str, password: &str) -> bool {
        self.hasher.compare(stored_hash, password)
    }

    fn compare_dummy(&self, password: &str) {
        if let Some(dummy_hash) = &self.dummy_hash {
            self.hasher.compare(dummy_hash, password);
        }
    }
}
