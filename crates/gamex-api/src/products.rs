use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{error, info};

use gamex_db::{ProductStore, StoreError};
use gamex_types::api::{
    CreateProductResponse, DeleteProductResponse, ProductQuery, UpdateProductResponse,
};
use gamex_types::{Category, ProductInput};

use crate::auth::AppState;
use crate::error::ApiError;

/// Run a store call off the async runtime; both backends do blocking I/O.
pub(crate) async fn with_store<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&dyn ProductStore) -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    let store = state.store.clone();
    let value = tokio::task::spawn_blocking(move || f(store.as_ref()))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal("store task failed".into())
        })??;
    Ok(value)
}

/// An unknown category filter is ignored rather than rejected.
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let selected = query.category.as_deref().map(str::trim).and_then(Category::parse);

    let mut products = with_store(&state, |store| store.list_products()).await?;
    if let Some(category) = selected {
        products.retain(|p| p.category == category.as_str());
    }

    Ok(Json(products))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let product = with_store(&state, move |store| store.get_product(id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".into()))?;

    Ok(Json(product))
}

pub async fn create_product(
    State(state): State<AppState>,
    payload: Result<Json<ProductInput>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(input) = payload?;
    require_title(&input)?;

    let written = with_store(&state, move |store| store.create_product(&input)).await?;
    info!(
        "Product {} added (persisted: {})",
        written.value.id,
        written.durability.is_persisted()
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateProductResponse {
            product: written.value,
            persisted: written.durability.is_persisted(),
        }),
    ))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<ProductInput>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(input) = payload?;
    require_title(&input)?;

    let written = with_store(&state, move |store| store.update_product(id, &input)).await?;
    if !written.value {
        return Err(ApiError::NotFound("Product not found".into()));
    }

    info!("Product {} updated", id);
    Ok(Json(UpdateProductResponse {
        updated: true,
        persisted: written.durability.is_persisted(),
    }))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let written = with_store(&state, move |store| store.delete_product(id)).await?;
    if !written.value {
        return Err(ApiError::NotFound("Product not found".into()));
    }

    info!("Product {} deleted", id);
    Ok(Json(DeleteProductResponse {
        deleted: true,
        persisted: written.durability.is_persisted(),
    }))
}

fn require_title(input: &ProductInput) -> Result<(), ApiError> {
    if input.has_title() {
        Ok(())
    } else {
        Err(ApiError::BadRequest("Title is required".into()))
    }
}
