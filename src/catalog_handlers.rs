use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use futures::TryStreamExt;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::authentication::AdminUser;
use crate::error::{ApiError, parse_uuid};
use crate::product::{Product, query_product};
use crate::state::ServiceState;

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category: String,
}

impl CreateProductRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::Validation("Please enter a product name".to_string()));
        }
        // Negated comparison so NaN fails the check as well.
        if !(self.price >= 0.0) {
            return Err(ApiError::Validation("Price cannot be negative".to_string()));
        }
        Ok(())
    }
}

/// POST /api/v1/admin/product
pub async fn create_product(
    State(state): State<ServiceState>,
    AdminUser(_): AdminUser,
    Json(body): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    body.validate()?;
    let product = Product::new(body.name, body.description, body.price, body.category);
    state.product_collection.insert_one(&product, None).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({"success": true, "product": product})),
    ))
}

/// GET /api/v1/products
pub async fn list_products(
    State(state): State<ServiceState>,
) -> Result<Json<Value>, ApiError> {
    let cursor = state.product_collection.find(None, None).await?;
    let products: Vec<Product> = cursor.try_collect().await?;
    Ok(Json(json!({"success": true, "products": products})))
}

/// GET /api/v1/product/{id}
pub async fn get_product(
    State(state): State<ServiceState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let product_id = parse_uuid(&id)?;
    let product = query_product(&state.product_collection, product_id).await?;
    Ok(Json(json!({"success": true, "product": product})))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, price: f64) -> CreateProductRequest {
        CreateProductRequest {
            name: name.to_string(),
            description: "A product".to_string(),
            price,
            category: "misc".to_string(),
        }
    }

    #[test]
    fn product_validation_accepts_a_zero_price() {
        assert!(request("Keyboard", 0.0).validate().is_ok());
    }

    #[test]
    fn product_validation_rejects_negative_and_nan_prices() {
        assert!(request("Keyboard", -1.0).validate().is_err());
        assert!(request("Keyboard", f64::NAN).validate().is_err());
    }

    #[test]
    fn product_validation_rejects_a_blank_name() {
        assert!(request("  ", 10.0).validate().is_err());
    }
}
