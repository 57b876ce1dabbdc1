use serde::{Deserialize, Serialize};

use crate::models::{Category, Product, Profile};

// -- JWT Claims --

/// Admin session claims. There is a single shared admin identity, so `sub`
/// is always `"admin"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub pin: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

// -- Products --

#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateProductResponse {
    pub product: Product,
    pub persisted: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateProductResponse {
    pub updated: bool,
    pub persisted: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteProductResponse {
    pub deleted: bool,
    pub persisted: bool,
}

// -- Landing page --

#[derive(Debug, Serialize, Deserialize)]
pub struct HomeResponse {
    pub profile: Profile,
    pub products: Vec<Product>,
    pub categories: Vec<Category>,
}
