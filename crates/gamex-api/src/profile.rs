use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;

use gamex_types::Category;
use gamex_types::api::HomeResponse;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::products::with_store;

/// How many products the landing page previews.
const HOME_PREVIEW: usize = 9;

pub async fn home(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let mut products = with_store(&state, |store| store.list_products()).await?;
    products.truncate(HOME_PREVIEW);

    Ok(Json(HomeResponse {
        profile: state.profile.clone(),
        products,
        categories: Category::ALL.to_vec(),
    }))
}

pub async fn categories() -> impl IntoResponse {
    Json(Category::ALL)
}

pub async fn ping() -> impl IntoResponse {
    Json(json!({ "status": "ok", "message": "GameX API running" }))
}
