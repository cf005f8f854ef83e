//! Identity: credential hashing, bearer tokens and the resolved caller.

pub mod password;
pub mod token;

pub use token::{AccessClaims, GrantClaims, TokenService};

/// A caller whose bearer token verified. Requests without one are
/// represented as `None` wherever a principal is optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
}

impl From<AccessClaims> for AuthUser {
    fn from(claims: AccessClaims) -> Self {
        Self {
            id: claims.sub,
            username: claims.username,
        }
    }
}
