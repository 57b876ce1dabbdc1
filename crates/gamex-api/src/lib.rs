pub mod auth;
pub mod error;
pub mod middleware;
pub mod products;
pub mod profile;

use axum::{
    Router,
    routing::{get, post, put},
};

pub use auth::{AppState, AppStateInner};
pub use error::ApiError;

/// All routes. Writes sit behind the admin token check.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(profile::home))
        .route("/ping", get(profile::ping))
        .route("/categories", get(profile::categories))
        .route("/products", get(products::list_products))
        .route("/products/{id}", get(products::get_product))
        .route("/auth/login", post(auth::login));

    let admin_routes = Router::new()
        .route("/products", post(products::create_product))
        .route(
            "/products/{id}",
            put(products::update_product).delete(products::delete_product),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_admin,
        ));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .with_state(state)
}
