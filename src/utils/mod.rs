use axum::Json;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::Config;
use crate::models::{Role, Session};
use crate::result::ApiResponse;

/// Prefix of provider API keys.
pub const API_KEY_PREFIX: &str = "lc_";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // users.id
    pub exp: i64,
    pub iat: i64,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school_id: Option<Uuid>,
}

pub fn generate_token(
    session: &Session,
    config: &Config,
) -> Result<(String, i64), jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let expiration = (now + Duration::seconds(config.jwt_expiration().as_secs() as i64)).timestamp();

    let claims = Claims {
        sub: session.user_id.to_string(),
        exp: expiration,
        iat: now.timestamp(),
        role: session.role,
        school_id: session.school_id,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )?;

    Ok((token, expiration))
}

pub fn verify_token(token: &str, config: &Config) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

/// A fresh provider API key: `lc_` followed by 32 lowercase hex characters.
pub fn generate_api_key() -> String {
    format!("{}{}", API_KEY_PREFIX, Uuid::new_v4().simple())
}

/// Only the digest of an API key is stored.
pub fn hash_api_key(api_key: &str) -> String {
    format!("{:x}", Sha256::digest(api_key.as_bytes()))
}

pub fn is_well_formed_api_key(api_key: &str) -> bool {
    api_key
        .strip_prefix(API_KEY_PREFIX)
        .is_some_and(|rest| rest.len() == 32 && rest.chars().all(|c| c.is_ascii_alphanumeric()))
}

/// Signature handed to content providers alongside an SSO redirect.
pub fn sso_signature(secret: &str, license_id: &str, user: &str, timestamp: i64) -> String {
    let payload = format!("{}:{}:{}:{}", secret, license_id, user, timestamp);
    format!("{:x}", Sha256::digest(payload.as_bytes()))
}

pub fn verify_sso_signature(
    secret: &str,
    license_id: &str,
    user: &str,
    timestamp: i64,
    signature: &str,
) -> bool {
    sso_signature(secret, license_id, user, timestamp).eq_ignore_ascii_case(signature)
}

pub fn success_to_api_response<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        code: error_codes::SUCCESS,
        msg: "success".into(),
        resp_data: Some(data),
    })
}

pub fn error_to_api_response<T>(code: i32, msg: String) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        code,
        msg,
        resp_data: None,
    })
}

pub mod error_codes {
    pub const SUCCESS: i32 = 0;
    pub const VALIDATION_ERROR: i32 = 1000;
    pub const ALREADY_EXISTS: i32 = 1001;
    pub const AUTH_FAILED: i32 = 1002;
    pub const PERMISSION_DENIED: i32 = 1003;
    pub const NOT_FOUND: i32 = 1004;
    pub const RATE_LIMIT: i32 = 1005;
    pub const INSUFFICIENT_SEATS: i32 = 1006;
    pub const NO_DATA: i32 = 1007;
    pub const INVALID_STATE: i32 = 1008;
    pub const IDENTITY_PROVIDER: i32 = 1009;
    pub const INTERNAL_ERROR: i32 = 5000;
}
