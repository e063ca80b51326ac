use framework::processor::Processor;
use framework::sqlx::DatabaseProcessor;
use rust_decimal::Decimal;
use time::PrimitiveDateTime;
use tracing::{info_span, instrument, Instrument};
use uuid::Uuid;

use crate::entities::product::Product;

const REVIEW_COLUMNS: &str =
    "id, product_id, reviewer_id, reviewer_name, rating, comment, created_at";

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(rename = "_id")]
    pub id: i64,
    #[serde(skip)]
    pub product_id: Uuid,
    #[serde(skip)]
    pub reviewer_id: Uuid,
    #[serde(rename = "name")]
    pub reviewer_name: String,
    pub rating: i16,
    pub comment: String,
    pub created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Copy)]
pub struct ListProductReviews {
    pub product_id: Uuid,
}

impl Processor<ListProductReviews> for DatabaseProcessor {
    type Output = Vec<Review>;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL:ListProductReviews", err)]
    async fn process(&self, input: ListProductReviews) -> Result<Vec<Review>, sqlx::Error> {
        sqlx::query_as::<_, Review>(&format!(
            r#"
            SELECT {REVIEW_COLUMNS} FROM "shop"."review"
            WHERE product_id = $1
            ORDER BY created_at ASC, id ASC
            "#
        ))
        .bind(input.product_id)
        .fetch_all(self.db())
        .await
    }
}

#[derive(Debug, Clone)]
pub struct AppendReview {
    pub product_id: Uuid,
    pub reviewer_id: Uuid,
    pub reviewer_name: String,
    pub rating: i16,
    pub comment: String,
}

#[derive(Debug, Clone)]
pub struct AppendedReview {
    pub review: Review,
    pub product: Product,
}

/// Inserts the review and refreshes the product's derived `rating` /
/// `num_reviews` in the same transaction, so the aggregate invariant holds
/// under concurrent submissions. The unique `(product_id, reviewer_id)` index
/// surfaces duplicates as a database error for the service to classify.
impl Processor<AppendReview> for DatabaseProcessor {
    type Output = AppendedReview;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL-Transaction:AppendReview", err)]
    async fn process(&self, input: AppendReview) -> Result<AppendedReview, sqlx::Error> {
        let mut tx = self
            .db()
            .begin()
            .instrument(info_span!("<Transaction Begin>"))
            .await?;
        let review = sqlx::query_as::<_, Review>(&format!(
            r#"
            INSERT INTO "shop"."review" (product_id, reviewer_id, reviewer_name, rating, comment)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {REVIEW_COLUMNS}
            "#
        ))
        .bind(input.product_id)
        .bind(input.reviewer_id)
        .bind(&input.reviewer_name)
        .bind(input.rating)
        .bind(&input.comment)
        .fetch_one(&mut *tx)
        .await?;
        let product = sqlx::query_as::<_, Product>(
            r#"
            UPDATE "shop"."product" AS p
            SET num_reviews = agg.num_reviews,
                rating = agg.rating,
                updated_at = NOW()
            FROM (
                SELECT COUNT(*)::INT AS num_reviews, AVG(rating) AS rating
                FROM "shop"."review"
                WHERE product_id = $1
            ) AS agg
            WHERE p.id = $1
            RETURNING p.id, p.name, p.slug, p.image, p.brand, p.price, p.count_in_stock,
                      p.description, p.category, p.rating, p.num_reviews,
                      p.created_at, p.updated_at
            "#,
        )
        .bind(input.product_id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit()
            .instrument(info_span!("<Transaction Commit>"))
            .await?;
        Ok(AppendedReview { review, product })
    }
}

/// Mean rating over the submitted scores, as persisted by the aggregate
/// refresh above.
pub fn mean_rating(ratings: &[i16]) -> Decimal {
    if ratings.is_empty() {
        return Decimal::ZERO;
    }
    let sum: Decimal = ratings.iter().map(|r| Decimal::from(*r)).sum();
    sum / Decimal::from(ratings.len() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_is_the_arithmetic_mean() {
        assert_eq!(mean_rating(&[4]), Decimal::from(4));
        assert_eq!(mean_rating(&[1, 2, 3, 4, 5]), Decimal::from(3));
        assert_eq!(
            mean_rating(&[5, 4]),
            Decimal::new(45, 1), // 4.5
        );
    }

    #[test]
    fn no_reviews_means_zero_rating() {
        assert_eq!(mean_rating(&[]), Decimal::ZERO);
    }
}
