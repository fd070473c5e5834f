use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::PasswordHash;
use argon2::password_hash::PasswordHasher as Argon2PasswordHasher;
use argon2::password_hash::PasswordVerifier;
use argon2::password_hash::SaltString;
use argon2::Algorithm;
use argon2::Argon2;
use argon2::Params;
use argon2::Version;

use super::errors::PasswordError;
use super::legacy;

const ARGON2_PREFIX: &str = "$argon2";
const BCRYPT_PREFIXES: [&str; 4] = ["$2a$", "$2b$", "$2x$", "$2y$"];

/// Argon2 work factor used for newly produced hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashCost {
    /// Memory size in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for HashCost {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

/// Storage format of a password hash, recognised from its prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashFormat {
    /// PHC string produced by Argon2 (`$argon2id$...`)
    Argon2,
    /// Modular crypt string produced by bcrypt (`$2b$...`)
    Bcrypt,
    /// Anything else: hex SHA-256 digest of the plaintext
    LegacySha256,
}

impl HashFormat {
    /// Classify a stored hash by its prefix.
    pub fn detect(stored_hash: &str) -> Self {
        if stored_hash.starts_with(ARGON2_PREFIX) {
            Self::Argon2
        } else if BCRYPT_PREFIXES
            .iter()
            .any(|prefix| stored_hash.starts_with(prefix))
        {
            Self::Bcrypt
        } else {
            Self::LegacySha256
        }
    }
}

/// Password hashing implementation.
///
/// New hashes are always Argon2id. Verification negotiates the format of the
/// stored hash, so bcrypt and legacy digest hashes keep authenticating.
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    /// Create a hasher with Argon2's recommended parameters.
    pub fn new() -> Self {
        Self::with_cost(HashCost::default())
    }

    /// Create a hasher with a custom work factor.
    ///
    /// A cost outside Argon2's valid range is replaced by the recommended
    /// defaults instead of failing.
    pub fn with_cost(cost: HashCost) -> Self {
        let params = Params::new(cost.memory_kib, cost.iterations, cost.parallelism, None)
            .unwrap_or_else(|e| {
                tracing::warn!(
                    error = %e,
                    memory_kib = cost.memory_kib,
                    iterations = cost.iterations,
                    parallelism = cost.parallelism,
                    "Invalid Argon2 cost, using recommended defaults"
                );
                Params::default()
            });

        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }

    /// Hash a plaintext password securely.
    ///
    /// Uses Argon2id with random salt generation.
    ///
    /// # Arguments
    /// * `password` - Plaintext password to hash
    ///
    /// # Returns
    /// PHC string format hash (includes algorithm, parameters, salt, and hash)
    ///
    /// # Errors
    /// * `HashingFailed` - Password hashing operation failed
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))
    }

    /// Check a plaintext password against a stored hash of any supported format.
    ///
    /// Returns false on mismatch and on any hash that fails to parse.
    pub fn compare(&self, stored_hash: &str, password: &str) -> bool {
        match HashFormat::detect(stored_hash) {
            HashFormat::Argon2 => self.verify_argon2(stored_hash, password),
            HashFormat::Bcrypt => bcrypt::verify(password, stored_hash).unwrap_or(false),
            HashFormat::LegacySha256 => legacy::matches(stored_hash, password),
        }
    }

    fn verify_argon2(&self, stored_hash: &str, password: &str) -> bool {
        // Parameters are taken from the PHC string, not from this hasher's cost.
        PasswordHash::new(stored_hash)
            .map(|parsed| {
                self.argon2
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}
