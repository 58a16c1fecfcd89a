//! Product route handlers.

use axum::{Json, extract::State, http::StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use super::ApiJson;
use crate::error::Result;
use crate::models::{NewProduct, Product};
use crate::state::AppState;

/// Body of `POST /products`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub image: Option<String>,
}

/// List every product.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    Ok(Json(state.catalog().list_products().await?))
}

/// Create a product.
#[instrument(skip(state, request), fields(name = %request.name))]
pub async fn create(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>)> {
    let product = NewProduct::parse(
        &request.name,
        &request.description,
        request.price,
        request.image.as_deref(),
    )?;
    let product = state.catalog().create_product(product).await?;
    Ok((StatusCode::CREATED, Json(product)))
}
