pub mod claims;
pub mod errors;
pub mod issuer;

pub use claims::Claims;
pub use errors::JwtError;
pub use issuer::IssuedToken;
pub use issuer::JwtIssuer;
