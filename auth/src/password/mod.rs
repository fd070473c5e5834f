pub mod errors;
pub mod hasher;
pub mod legacy;

pub use errors::PasswordError;
pub use hasher::HashCost;
pub use hasher::HashFormat;
pub use hasher::PasswordHasher;
