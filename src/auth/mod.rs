//! Bearer-token identity. Tokens are issued elsewhere; this service only
//! verifies them.

mod claims;
mod extractors;
mod jwt;

pub use extractors::{authenticate, AuthUser};
pub use jwt::JwtKeys;
