//! Development token issuance
//!
//! Signs HS256 tokens shaped like the ones the portal backend hands out, so
//! the client can be exercised without a backend. Never used against a real
//! deployment: the secret is whatever the developer passes in.

use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use careportal_session::{Identity, Role};

/// Payload of a development token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevClaims {
    pub sub: String,
    pub role: Role,
    pub name: String,
    pub jti: String,
    pub iat: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// Input for minting
#[derive(Debug, Clone)]
pub struct MintInput {
    pub role: Role,
    pub user_id: String,
    pub name: String,
    /// Seconds until expiry; `None` mints a token without `exp`
    pub ttl_seconds: Option<i64>,
}

pub fn mint_token(input: &MintInput, secret: &str) -> anyhow::Result<String> {
    let now = Utc::now().timestamp();

    let claims = DevClaims {
        sub: input.user_id.clone(),
        role: input.role,
        name: input.name.clone(),
        jti: Uuid::new_v4().to_string(),
        iat: now,
        exp: input.ttl_seconds.map(|ttl| now + ttl),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| anyhow::anyhow!("Failed to generate token: {}", e))?;

    Ok(token)
}

/// Identity record carrying a freshly minted token
pub fn mint_identity(input: &MintInput, secret: &str) -> anyhow::Result<Identity> {
    let token = mint_token(input, secret)?;
    Ok(Identity::new(
        input.role,
        input.name.clone(),
        input.user_id.clone(),
        token,
    ))
}
