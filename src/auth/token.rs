//! Signed bearer credentials: account access tokens and short-lived share grants.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const ACCESS_TOKEN: &str = "access";
const SHARE_GRANT: &str = "share";

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid token: {0}")]
    Invalid(String),
    #[error("token has the wrong type")]
    WrongType,
    #[error("token encoding failed: {0}")]
    Encode(String),
}

/// Claims carried by an account bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// User id.
    pub sub: String,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
    pub typ: String,
}

/// Claims of a grant minted after a share link was redeemed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantClaims {
    /// Share id.
    pub sid: String,
    /// File id the grant opens.
    pub fid: String,
    pub iat: i64,
    pub exp: i64,
    pub typ: String,
}

#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    grant_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, access_ttl: Duration, grant_ttl: Duration) -> Self {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            access_ttl,
            grant_ttl,
        }
    }

    pub fn issue_access(&self, user_id: &str, username: &str) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: user_id.to_string(),
            username: username.to_string(),
            iat: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
            typ: ACCESS_TOKEN.to_string(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encode(e.to_string()))
    }

    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let claims = decode::<AccessClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| TokenError::Invalid(e.to_string()))?
            .claims;
        if claims.typ != ACCESS_TOKEN {
            return Err(TokenError::WrongType);
        }
        Ok(claims)
    }

    pub fn issue_grant(&self, share_id: &str, file_id: &str) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = GrantClaims {
            sid: share_id.to_string(),
            fid: file_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.grant_ttl).timestamp(),
            typ: SHARE_GRANT.to_string(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encode(e.to_string()))
    }

    pub fn verify_grant(&self, token: &str) -> Result<GrantClaims, TokenError> {
        let claims = decode::<GrantClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| TokenError::Invalid(e.to_string()))?
            .claims;
        if claims.typ != SHARE_GRANT {
            return Err(TokenError::WrongType);
        }
        Ok(claims)
    }
}
