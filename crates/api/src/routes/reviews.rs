//! Review route handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use tracing::instrument;

use bazaar_core::ProductId;

use super::{ApiJson, MessageResponse};
use crate::error::Result;
use crate::models::{NewReview, Review};
use crate::state::AppState;

/// Body of `POST /add-review`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddReviewRequest {
    pub product_id: ProductId,
    pub name: String,
    pub rating: i64,
    pub review: String,
}

/// Append a review to a product.
#[instrument(skip(state, request), fields(product_id = %request.product_id))]
pub async fn create(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<AddReviewRequest>,
) -> Result<Json<MessageResponse>> {
    let review = NewReview::parse(&request.name, request.rating, &request.review)?;
    state
        .catalog()
        .add_review(request.product_id, review)
        .await?;
    Ok(Json(MessageResponse::new("Review added successfully")))
}

/// List a product's reviews in submission order.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Review>>> {
    let id: ProductId = id.parse()?;
    Ok(Json(state.catalog().list_reviews(id).await?))
}
