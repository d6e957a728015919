//! `bilio-auth`: bearer-token validation boundary.
//!
//! Turns an HS256 JWT into a typed caller identity. Registration, login and
//! credential storage live outside this workspace.

pub mod claims;
pub mod jwt;

pub use claims::{Claims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtValidator};
