use std::sync::Arc;

use anyhow::anyhow;
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::IntoResponse,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::{info, warn};

use gamex_db::ProductStore;
use gamex_types::Profile;
use gamex_types::api::{Claims, LoginRequest, LoginResponse};

use crate::error::ApiError;

/// The only subject a token is ever issued for.
pub const ADMIN_SUBJECT: &str = "admin";

const TOKEN_TTL_HOURS: i64 = 12;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub store: Arc<dyn ProductStore>,
    pub jwt_secret: String,
    /// Argon2 PHC string of the shared admin PIN.
    pub admin_pin_hash: String,
    pub profile: Profile,
}

/// Hash a PIN so the plain value does not have to stay in memory.
pub fn hash_pin(pin: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(pin.trim().as_bytes(), &salt)
        .map_err(|e| anyhow!("failed to hash admin PIN: {}", e))?
        .to_string();
    Ok(hash)
}

/// Reject a configured hash that argon2 cannot parse before the server starts.
pub fn check_pin_hash(hash: &str) -> anyhow::Result<()> {
    PasswordHash::new(hash).map_err(|e| anyhow!("invalid admin PIN hash: {}", e))?;
    Ok(())
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let parsed_hash = PasswordHash::new(&state.admin_pin_hash)
        .map_err(|e| ApiError::Internal(format!("admin PIN hash unreadable: {}", e)))?;

    if Argon2::default()
        .verify_password(req.pin.trim().as_bytes(), &parsed_hash)
        .is_err()
    {
        warn!("Rejected admin login: wrong PIN");
        return Err(ApiError::Unauthorized("Wrong PIN".into()));
    }

    let token =
        create_token(&state.jwt_secret).map_err(|e| ApiError::Internal(e.to_string()))?;

    info!("Admin logged in");
    Ok(Json(LoginResponse { token }))
}

fn create_token(secret: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: ADMIN_SUBJECT.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::hours(TOKEN_TTL_HOURS)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Decode and check a bearer token. Expired tokens and foreign subjects fail.
pub fn verify_token(secret: &str, token: &str) -> Option<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()?;

    (data.claims.sub == ADMIN_SUBJECT).then_some(data.claims)
}
