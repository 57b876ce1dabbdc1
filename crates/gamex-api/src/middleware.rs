use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};

use crate::auth::{AppState, verify_token};
use crate::error::ApiError;

/// Gate mutating routes on a valid admin token from the Authorization header.
pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let bearer = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or_else(|| ApiError::Unauthorized("Not authorized".into()))?;

    let claims = verify_token(&state.jwt_secret, bearer.token())
        .ok_or_else(|| ApiError::Unauthorized("Not authorized".into()))?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
