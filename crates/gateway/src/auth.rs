//! Bearer token verification.
//!
//! Tokens are HS256 JWTs minted by the identity service; the gateway only checks the
//! signature and expiry and takes the subject as the caller's user id.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, GatewayResult};

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    #[serde(alias = "userId")]
    pub sub: String,
    /// Expiration time
    pub exp: usize,
    #[serde(default)]
    pub iat: Option<usize>,
}

/// Authenticated caller, inserted into request extensions by the auth middleware
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerId(pub String);

pub struct TokenVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Validate and decode a JWT token
    pub fn verify(&self, token: &str) -> GatewayResult<Claims> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|err| GatewayError::AuthenticationFailed(format!("Invalid token: {}", err)))?;

        if data.claims.sub.trim().is_empty() {
            return Err(GatewayError::AuthenticationFailed(
                "Token has no subject".to_string(),
            ));
        }

        Ok(data.claims)
    }

    /// Mint a token for `user_id`. Used by the CLI and tests.
    pub fn issue(&self, user_id: &str, ttl: Duration) -> GatewayResult<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| GatewayError::InternalError("System time error".to_string()))?;

        let claims = Claims {
            sub: user_id.to_string(),
            exp: (now + ttl).as_secs() as usize,
            iat: Some(now.as_secs() as usize),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|_| GatewayError::InternalError("Failed to encode token".to_string()))
    }
}
