pub mod hashing;
pub mod repositories;
pub mod tokens;
