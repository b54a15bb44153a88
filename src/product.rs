use bson::{Uuid, doc};
use mongodb::Collection;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// A review embedded in a product.
///
/// At most one review exists per (product, user) pair; the uniqueness is
/// enforced by the scan-and-replace logic in [`Product::upsert_review`], not
/// by the store.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Review {
    /// Review UUID.
    #[serde(rename = "_id")]
    pub id: Uuid,
    /// UUID of the owning user.
    pub user: Uuid,
    /// Display name of the reviewer, snapshotted at submission time.
    pub name: String,
    /// Rating in 1-5 stars.
    pub rating: f64,
    pub comment: String,
}

/// A product of the shop, owning its review collection.
///
/// `ratings` and `num_of_reviews` are derived fields that always equal the
/// aggregate of the current review collection.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Product UUID.
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    /// Mean rating over all reviews, `0.0` when there are none.
    pub ratings: f64,
    pub num_of_reviews: u32,
    pub reviews: Vec<Review>,
}

impl Product {
    pub fn new(name: String, description: String, price: f64, category: String) -> Self {
        Product {
            id: Uuid::new(),
            name,
            description,
            price,
            category,
            ratings: 0.0,
            num_of_reviews: 0,
            reviews: Vec::new(),
        }
    }

    /// Inserts or updates the review of a user.
    ///
    /// Scans the review collection for an entry owned by `user_id`; if found,
    /// replaces its rating and comment in place, otherwise appends a new
    /// review. Recomputes the derived fields in both branches.
    ///
    /// * `user_id` - UUID of the reviewing user.
    /// * `user_name` - Display name snapshot stored with the review.
    pub fn upsert_review(&mut self, user_id: Uuid, user_name: &str, rating: f64, comment: &str) {
        match self.reviews.iter_mut().find(|review| review.user == user_id) {
            Some(existing) => {
                existing.rating = rating;
                existing.comment = comment.to_string();
            }
            None => {
                self.reviews.push(Review {
                    id: Uuid::new(),
                    user: user_id,
                    name: user_name.to_string(),
                    rating,
                    comment: comment.to_string(),
                });
            }
        }
        self.recompute_rating_summary();
    }

    /// Removes the review of the given id, if present, and recomputes the
    /// derived fields from the remainder.
    pub fn remove_review(&mut self, review_id: Uuid) {
        self.reviews.retain(|review| review.id != review_id);
        self.recompute_rating_summary();
    }

    fn recompute_rating_summary(&mut self) {
        self.ratings = mean_rating(&self.reviews);
        self.num_of_reviews = self.reviews.len() as u32;
    }
}

/// Arithmetic mean of all ratings, defined as `0.0` for an empty collection.
pub fn mean_rating(reviews: &[Review]) -> f64 {
    if reviews.is_empty() {
        return 0.0;
    }
    let sum: f64 = reviews.iter().map(|review| review.rating).sum();
    sum / reviews.len() as f64
}

pub fn validate_rating(rating: f64) -> Result<(), ApiError> {
    if !(1.0..=5.0).contains(&rating) {
        return Err(ApiError::Validation("Rating must be between 1 and 5".to_string()));
    }
    Ok(())
}

pub fn validate_comment(comment: &str) -> Result<(), ApiError> {
    if comment.trim().is_empty() {
        return Err(ApiError::Validation("Please enter a review comment".to_string()));
    }
    Ok(())
}

/// Shared function to query a product from the MongoDB collection of products.
///
/// * `collection` - MongoDB collection of products.
/// * `id` - UUID of the product.
pub async fn query_product(collection: &Collection<Product>, id: Uuid) -> Result<Product, ApiError> {
    match collection.find_one(doc! {"_id": id}, None).await {
        Ok(Some(product)) => Ok(product),
        Ok(None) => Err(ApiError::NotFound("Product not found".to_string())),
        Err(error) => Err(error.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_product() -> Product {
        Product::new(
            "Keyboard".to_string(),
            "A mechanical keyboard".to_string(),
            79.99,
            "peripherals".to_string(),
        )
    }

    #[test]
    fn new_product_has_zeroed_summary() {
        let product = sample_product();
        assert_eq!(product.ratings, 0.0);
        assert_eq!(product.num_of_reviews, 0);
        assert!(product.reviews.is_empty());
    }

    #[test]
    fn upsert_appends_and_recomputes_the_mean() {
        let mut product = sample_product();
        product.upsert_review(Uuid::new(), "Alice", 5.0, "good");
        product.upsert_review(Uuid::new(), "Bob", 3.0, "okay");
        assert_eq!(product.num_of_reviews, 2);
        assert_eq!(product.reviews.len(), 2);
        assert_eq!(product.ratings, 4.0);
    }

    #[test]
    fn second_submission_of_a_user_replaces_in_place() {
        let mut product = sample_product();
        let alice = Uuid::new();
        product.upsert_review(alice, "Alice", 5.0, "good");
        product.upsert_review(alice, "Alice", 3.0, "changed mind");
        assert_eq!(product.reviews.len(), 1);
        assert_eq!(product.num_of_reviews, 1);
        assert_eq!(product.ratings, 3.0);
        assert_eq!(product.reviews[0].rating, 3.0);
        assert_eq!(product.reviews[0].comment, "changed mind");
    }

    #[test]
    fn summary_always_matches_the_collection() {
        let mut product = sample_product();
        for rating in [1.0, 2.0, 3.0, 4.0, 5.0] {
            product.upsert_review(Uuid::new(), "someone", rating, "text");
            assert_eq!(product.num_of_reviews as usize, product.reviews.len());
            assert_eq!(product.ratings, mean_rating(&product.reviews));
        }
    }

    #[test]
    fn removing_a_review_recomputes_the_remainder() {
        let mut product = sample_product();
        product.upsert_review(Uuid::new(), "Alice", 5.0, "good");
        product.upsert_review(Uuid::new(), "Bob", 1.0, "bad");
        let removed = product.reviews[1].id;
        product.remove_review(removed);
        assert_eq!(product.num_of_reviews, 1);
        assert_eq!(product.ratings, 5.0);
    }

    #[test]
    fn removing_the_last_review_yields_a_zero_mean() {
        let mut product = sample_product();
        let alice = Uuid::new();
        product.upsert_review(alice, "Alice", 4.0, "fine");
        let only = product.reviews[0].id;
        product.remove_review(only);
        assert_eq!(product.num_of_reviews, 0);
        assert_eq!(product.ratings, 0.0);
    }

    #[test]
    fn removing_an_unknown_review_leaves_the_product_unchanged() {
        let mut product = sample_product();
        product.upsert_review(Uuid::new(), "Alice", 4.0, "fine");
        product.remove_review(Uuid::new());
        assert_eq!(product.num_of_reviews, 1);
        assert_eq!(product.ratings, 4.0);
    }

    #[test]
    fn rating_validation_enforces_the_star_range() {
        assert!(validate_rating(1.0).is_ok());
        assert!(validate_rating(5.0).is_ok());
        assert!(validate_rating(0.5).is_err());
        assert!(validate_rating(5.5).is_err());
    }

    #[test]
    fn derived_fields_serialize_under_their_wire_names() {
        let product = sample_product();
        let value = serde_json::to_value(&product).unwrap();
        assert!(value.get("ratings").is_some());
        assert!(value.get("numOfReviews").is_some());
    }
}
