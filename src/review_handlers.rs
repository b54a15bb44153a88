//! HTTP adaptation of the review aggregation routines.
//!
//! Each operation is a single read-modify-write round trip on the product
//! document with no concurrency token: two concurrent submissions for the
//! same product race and the last write wins, which can drop the other
//! submission. This is the documented contract, not an oversight.

use axum::Json;
use axum::extract::{Query, State};
use bson::doc;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::authentication::AuthenticatedUser;
use crate::error::{ApiError, parse_uuid};
use crate::product::{self, query_product};
use crate::state::ServiceState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertReviewRequest {
    pub product_id: String,
    pub rating: f64,
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct ReviewListQuery {
    /// UUID of the product whose reviews are listed.
    pub id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteReviewQuery {
    pub product_id: String,
    /// UUID of the review to delete.
    pub id: String,
}

/// PUT /api/v1/review
///
/// Inserts or updates the calling user's review on a product and persists
/// the full product document, so a malformed legacy review cannot block the
/// write.
pub async fn upsert_review(
    State(state): State<ServiceState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(body): Json<UpsertReviewRequest>,
) -> Result<Json<Value>, ApiError> {
    product::validate_rating(body.rating)?;
    product::validate_comment(&body.comment)?;
    let product_id = parse_uuid(&body.product_id)?;

    let mut product = query_product(&state.product_collection, product_id).await?;
    product.upsert_review(user._id, &user.name, body.rating, &body.comment);
    state
        .product_collection
        .replace_one(doc! {"_id": product.id}, &product, None)
        .await?;
    Ok(Json(json!({"success": true, "product": product})))
}

/// GET /api/v1/reviews?id=
///
/// Returns the review collection of a product unmodified, in stored order.
pub async fn list_reviews(
    State(state): State<ServiceState>,
    Query(query): Query<ReviewListQuery>,
) -> Result<Json<Value>, ApiError> {
    let product_id = parse_uuid(&query.id)?;
    let product = query_product(&state.product_collection, product_id).await?;
    Ok(Json(json!({"success": true, "reviews": product.reviews})))
}

/// DELETE /api/v1/reviews?productId=&id=
///
/// Filters the review out of the collection and persists only the three
/// derived fields. Removing the last review leaves a mean rating of `0.0`.
pub async fn delete_review(
    State(state): State<ServiceState>,
    AuthenticatedUser(_): AuthenticatedUser,
    Query(query): Query<DeleteReviewQuery>,
) -> Result<Json<Value>, ApiError> {
    let product_id = parse_uuid(&query.product_id)?;
    let review_id = parse_uuid(&query.id)?;

    let mut product = query_product(&state.product_collection, product_id).await?;
    product.remove_review(review_id);
    state
        .product_collection
        .update_one(
            doc! {"_id": product.id},
            doc! {"$set": {
                "reviews": bson::to_bson(&product.reviews)?,
                "ratings": product.ratings,
                "numOfReviews": i64::from(product.num_of_reviews),
            }},
            None,
        )
        .await?;
    Ok(Json(json!({"success": true})))
}
