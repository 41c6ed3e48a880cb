//! Authentication for the notes gateway.
//!
//! - [`token`] issues and verifies HS256 bearer tokens
//! - [`principal`] turns an `Authorization` header into an [`Identity`]
//! - [`password`] hashes and checks login passwords

pub mod identity;
pub mod password;
pub mod principal;
pub mod token;

pub use identity::{Identity, IdentityExt};
pub use password::{BcryptPasswordHasher, PasswordHasher};
pub use principal::{PrincipalResolver, BEARER_PREFIX};
pub use token::{IssuedToken, TokenCodec};
