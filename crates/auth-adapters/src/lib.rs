//! # auth-adapters
//!
//! Implementations of the `IdentityVerifier` port. The platform never sees
//! passwords: an external identity provider issues bearer tokens and these
//! adapters turn a token into verified [`domains::IdentityClaims`].

#[cfg(feature = "auth-jwt")]
pub mod jwt;

#[cfg(feature = "auth-jwt")]
pub use jwt::{JwtConfig, JwtIdentityVerifier};
