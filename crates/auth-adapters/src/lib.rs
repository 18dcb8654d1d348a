//! # auth-adapters
//!
//! Boundary of the (external) identity provider: turns bearer tokens into
//! typed [`Principal`]s and issues tokens for tooling and tests. Actual
//! credential verification against the institutional mailbox happens
//! upstream; by the time a request reaches this portal, identity is a
//! signed claim set.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use domains::{Principal, UserType};

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("invalid or expired token")]
    InvalidToken,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Claim set carried in portal tokens.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    roles: Vec<String>,
    user_type: UserType,
    exp: usize,
}

/// Issues and verifies the portal's HS256 bearer tokens.
pub struct TokenAuthority {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenAuthority {
    pub fn new(secret: &SecretString, ttl_secs: i64) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            ttl: Duration::seconds(ttl_secs),
        }
    }

    pub fn issue(&self, principal: &Principal) -> Result<String, AuthError> {
        let claims = Claims {
            sub: principal.id.clone(),
            roles: principal.roles.clone(),
            user_type: principal.user_type,
            exp: (Utc::now() + self.ttl).timestamp() as usize,
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|err| AuthError::Signing(err.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default()).map_err(
            |err| {
                debug!(error = %err, "token verification failed");
                AuthError::InvalidToken
            },
        )?;
        Ok(Principal {
            id: data.claims.sub,
            roles: data.claims.roles,
            user_type: data.claims.user_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authority(secret: &str) -> TokenAuthority {
        TokenAuthority::new(&SecretString::from(secret.to_string()), 3600)
    }

    fn principal() -> Principal {
        Principal {
            id: "stu150120001".into(),
            roles: vec!["student".into(), "admin".into()],
            user_type: UserType::Student,
        }
    }

    #[test]
    fn issue_then_verify_round_trips_the_principal() {
        let authority = authority("test-secret");
        let token = authority.issue(&principal()).unwrap();
        let verified = authority.verify(&token).unwrap();
        assert_eq!(verified, principal());
    }

    #[test]
    fn garbage_tokens_are_rejected() {
        let authority = authority("test-secret");
        assert!(matches!(
            authority.verify("not.a.token"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn tokens_from_another_secret_are_rejected() {
        let token = authority("secret-a").issue(&principal()).unwrap();
        assert!(matches!(
            authority("secret-b").verify(&token),
            Err(AuthError::InvalidToken)
        ));
    }
}
