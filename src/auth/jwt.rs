use std::str::FromStr;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration, OffsetDateTime};
use tracing::debug;

use crate::{
    auth::claims::{Claims, TokenData},
    config::JwtConfig,
    state::AppState,
};

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Invalid token")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),

    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// Signing and verification keys, built once at startup from [`JwtConfig`].
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

impl JwtKeys {
    pub fn from_config(cfg: &JwtConfig) -> anyhow::Result<Self> {
        let algorithm = Algorithm::from_str(&cfg.algorithm)
            .map_err(|_| anyhow::anyhow!("unknown JWT algorithm {}", cfg.algorithm))?;
        // Only shared-secret algorithms make sense for a single secret key.
        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            anyhow::bail!("JWT algorithm {} is not an HMAC algorithm", cfg.algorithm);
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            algorithm,
            ttl: Duration::hours(cfg.ttl_hours),
        })
    }

    pub fn sign(&self, email: &str, user_id: i64) -> Result<String, TokenError> {
        self.sign_expiring_at(email, user_id, OffsetDateTime::now_utc() + self.ttl)
    }

    fn sign_expiring_at(
        &self,
        email: &str,
        user_id: i64,
        exp: OffsetDateTime,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            sub: email.to_string(),
            user_id,
            exp: exp.unix_timestamp(),
        };
        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding)
            .map_err(TokenError::Signing)?;
        debug!(user_id, "jwt signed");
        Ok(token)
    }

    /// Checks signature and expiry; claims of the wrong shape fail to deserialize.
    pub fn verify(&self, token: &str) -> Result<TokenData, TokenError> {
        let validation = Validation::new(self.algorithm);
        let data =
            decode::<Claims>(token, &self.decoding, &validation).map_err(TokenError::InvalidToken)?;
        debug!(user_id = data.claims.user_id, "jwt verified");
        Ok(data.claims.into())
    }
}
