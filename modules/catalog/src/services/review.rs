use framework::processor::Processor;
use framework::sqlx::{is_unique_violation, DatabaseProcessor};
use tracing::instrument;
use uuid::Uuid;

use crate::entities::product::FindProductById;
use crate::entities::review::{AppendedReview, AppendReview, ListProductReviews, Review};

#[derive(Clone)]
pub struct ReviewService {
    pub db: DatabaseProcessor,
}

#[derive(Debug, Clone)]
pub struct SubmitReview {
    pub product_id: Uuid,
    pub reviewer_id: Uuid,
    pub reviewer_name: String,
    pub rating: i16,
    pub comment: String,
}

#[derive(Debug)]
pub enum SubmitReviewResult {
    Created(AppendedReview),
    /// Keyed by account id, so renaming an account does not allow a second
    /// review.
    AlreadyReviewed,
    ProductNotFound,
}

pub fn rating_in_range(rating: i16) -> bool {
    (1..=5).contains(&rating)
}

impl Processor<SubmitReview> for ReviewService {
    type Output = SubmitReviewResult;
    type Error = framework::Error;
    #[instrument(skip_all, err)]
    async fn process(&self, input: SubmitReview) -> Result<SubmitReviewResult, framework::Error> {
        if !rating_in_range(input.rating) {
            return Err(framework::Error::InvalidInput(
                "rating must be between 1 and 5".to_owned(),
            ));
        }
        if self
            .db
            .process(FindProductById {
                id: input.product_id,
            })
            .await?
            .is_none()
        {
            return Ok(SubmitReviewResult::ProductNotFound);
        }
        let appended = self
            .db
            .process(AppendReview {
                product_id: input.product_id,
                reviewer_id: input.reviewer_id,
                reviewer_name: input.reviewer_name,
                rating: input.rating,
                comment: input.comment,
            })
            .await;
        match appended {
            Ok(result) => Ok(SubmitReviewResult::Created(result)),
            Err(e) if is_unique_violation(&e) => Ok(SubmitReviewResult::AlreadyReviewed),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FetchProductReviews {
    pub product_id: Uuid,
}

impl Processor<FetchProductReviews> for ReviewService {
    type Output = Vec<Review>;
    type Error = framework::Error;
    async fn process(&self, input: FetchProductReviews) -> Result<Vec<Review>, framework::Error> {
        self.db
            .process(ListProductReviews {
                product_id: input.product_id,
            })
            .await
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratings_outside_one_to_five_are_rejected() {
        assert!(!rating_in_range(0));
        assert!(rating_in_range(1));
        assert!(rating_in_range(5));
        assert!(!rating_in_range(6));
        assert!(!rating_in_range(-3));
    }
}
