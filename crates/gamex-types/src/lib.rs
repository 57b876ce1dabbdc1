pub mod api;
pub mod models;

pub use models::{Category, NormalizedInput, Product, ProductInput, Profile};
