use framework::processor::Processor;
use framework::sqlx::DatabaseProcessor;
use rust_decimal::Decimal;
use sqlx::{Postgres, QueryBuilder};
use time::PrimitiveDateTime;
use tracing::instrument;
use uuid::Uuid;

const PRODUCT_COLUMNS: &str = "id, name, slug, image, brand, price, count_in_stock, \
     description, category, rating, num_reviews, created_at, updated_at";

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub image: String,
    pub brand: String,
    pub price: Decimal,
    pub count_in_stock: i32,
    pub description: String,
    pub category: ProductCategory,
    pub rating: Decimal,
    pub num_reviews: i32,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    sqlx::Type,
    serde::Serialize,
    serde::Deserialize,
)]
#[sqlx(type_name = "shop.product_category", rename_all = "snake_case")]
#[serde(rename_all = "lowercase")]
pub enum ProductCategory {
    Electronics,
    Clothing,
    Books,
    Accessories,
    Beauty,
    Other,
}

impl std::str::FromStr for ProductCategory {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "electronics" => Ok(Self::Electronics),
            "clothing" => Ok(Self::Clothing),
            "books" => Ok(Self::Books),
            "accessories" => Ok(Self::Accessories),
            "beauty" => Ok(Self::Beauty),
            "other" => Ok(Self::Other),
            _ => Err(()),
        }
    }
}

/// Catalog ordering keys exposed by the search endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    Featured,
    Lowest,
    Highest,
    TopRated,
    Newest,
    #[default]
    Default,
}

impl SortKey {
    /// Any unknown key degrades to `Default` (reverse insertion order).
    pub fn parse_or_default(raw: &str) -> Self {
        match raw {
            "featured" => Self::Featured,
            "lowest" => Self::Lowest,
            "highest" => Self::Highest,
            "toprated" => Self::TopRated,
            "newest" => Self::Newest,
            _ => Self::Default,
        }
    }

    fn order_by_clause(self) -> &'static str {
        match self {
            // no featured flag exists on products; this key sorts by
            // insertion order
            Self::Featured => " ORDER BY created_at ASC, id ASC",
            Self::Lowest => " ORDER BY price ASC, id ASC",
            Self::Highest => " ORDER BY price DESC, id ASC",
            Self::TopRated => " ORDER BY rating DESC, id ASC",
            Self::Newest | Self::Default => " ORDER BY created_at DESC, id ASC",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ListProducts;

impl Processor<ListProducts> for DatabaseProcessor {
    type Output = Vec<Product>;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL:ListProducts", err)]
    async fn process(&self, _input: ListProducts) -> Result<Vec<Product>, sqlx::Error> {
        sqlx::query_as::<_, Product>(&format!(
            r#"SELECT {PRODUCT_COLUMNS} FROM "shop"."product" ORDER BY created_at DESC, id ASC"#
        ))
        .fetch_all(self.db())
        .await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FindProductById {
    pub id: Uuid,
}

impl Processor<FindProductById> for DatabaseProcessor {
    type Output = Option<Product>;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL:FindProductById", err)]
    async fn process(&self, input: FindProductById) -> Result<Option<Product>, sqlx::Error> {
        sqlx::query_as::<_, Product>(&format!(
            r#"SELECT {PRODUCT_COLUMNS} FROM "shop"."product" WHERE id = $1"#
        ))
        .bind(input.id)
        .fetch_optional(self.db())
        .await
    }
}

#[derive(Debug, Clone)]
pub struct FindProductBySlug {
    pub slug: String,
}

impl Processor<FindProductBySlug> for DatabaseProcessor {
    type Output = Option<Product>;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL:FindProductBySlug", err)]
    async fn process(&self, input: FindProductBySlug) -> Result<Option<Product>, sqlx::Error> {
        sqlx::query_as::<_, Product>(&format!(
            r#"SELECT {PRODUCT_COLUMNS} FROM "shop"."product" WHERE slug = $1"#
        ))
        .bind(&input.slug)
        .fetch_optional(self.db())
        .await
    }
}

#[derive(Debug, Clone)]
pub struct InsertProduct {
    pub name: String,
    pub slug: String,
    pub image: String,
    pub brand: String,
    pub price: Decimal,
    pub count_in_stock: i32,
    pub description: String,
    pub category: ProductCategory,
}

impl Processor<InsertProduct> for DatabaseProcessor {
    type Output = Product;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL:InsertProduct", err)]
    async fn process(&self, input: InsertProduct) -> Result<Product, sqlx::Error> {
        sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO "shop"."product"
                (name, slug, image, brand, price, count_in_stock, description, category)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(&input.name)
        .bind(&input.slug)
        .bind(&input.image)
        .bind(&input.brand)
        .bind(input.price)
        .bind(input.count_in_stock)
        .bind(&input.description)
        .bind(input.category)
        .fetch_one(self.db())
        .await
    }
}

/// Admin edit of the non-derived fields; `None` keeps the stored value.
#[derive(Debug, Clone)]
pub struct UpdateProductFields {
    pub id: Uuid,
    pub name: Option<String>,
    pub slug: Option<String>,
    pub image: Option<String>,
    pub brand: Option<String>,
    pub price: Option<Decimal>,
    pub count_in_stock: Option<i32>,
    pub description: Option<String>,
    pub category: Option<ProductCategory>,
}

impl Processor<UpdateProductFields> for DatabaseProcessor {
    type Output = Option<Product>;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL:UpdateProductFields", err)]
    async fn process(&self, input: UpdateProductFields) -> Result<Option<Product>, sqlx::Error> {
        sqlx::query_as::<_, Product>(&format!(
            r#"
            UPDATE "shop"."product"
            SET name = COALESCE($2, name),
                slug = COALESCE($3, slug),
                image = COALESCE($4, image),
                brand = COALESCE($5, brand),
                price = COALESCE($6, price),
                count_in_stock = COALESCE($7, count_in_stock),
                description = COALESCE($8, description),
                category = COALESCE($9, category),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(input.id)
        .bind(input.name)
        .bind(input.slug)
        .bind(input.image)
        .bind(input.brand)
        .bind(input.price)
        .bind(input.count_in_stock)
        .bind(input.description)
        .bind(input.category)
        .fetch_optional(self.db())
        .await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DeleteProduct {
    pub id: Uuid,
}

impl Processor<DeleteProduct> for DatabaseProcessor {
    type Output = bool;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL:DeleteProduct", err)]
    async fn process(&self, input: DeleteProduct) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(r#"DELETE FROM "shop"."product" WHERE id = $1"#)
            .bind(input.id)
            .execute(self.db())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ListCategoriesInUse;

impl Processor<ListCategoriesInUse> for DatabaseProcessor {
    type Output = Vec<ProductCategory>;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL:ListCategoriesInUse", err)]
    async fn process(&self, _input: ListCategoriesInUse) -> Result<Vec<ProductCategory>, sqlx::Error> {
        sqlx::query_scalar::<_, ProductCategory>(
            r#"SELECT DISTINCT category FROM "shop"."product" ORDER BY category"#,
        )
        .fetch_all(self.db())
        .await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CountProducts;

impl Processor<CountProducts> for DatabaseProcessor {
    type Output = i64;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL:CountProducts", err)]
    async fn process(&self, _input: CountProducts) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM "shop"."product""#)
            .fetch_one(self.db())
            .await
    }
}

/// Filtered, sorted, paginated catalog read. Every facet is optional; the
/// parsing of raw request parameters into this struct lives in the search
/// service.
#[derive(Debug, Clone)]
pub struct ProductSearch {
    pub name_query: Option<String>,
    pub category: Option<ProductCategory>,
    pub price: Option<(Decimal, Decimal)>,
    pub sort: SortKey,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total: i64,
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, search: &ProductSearch) {
    builder.push(" WHERE TRUE");
    if let Some(name_query) = &search.name_query {
        builder
            .push(" AND name ILIKE ")
            .push_bind(format!("%{}%", escape_like(name_query)));
    }
    if let Some(category) = search.category {
        builder.push(" AND category = ").push_bind(category);
    }
    if let Some((min, max)) = search.price {
        builder
            .push(" AND price BETWEEN ")
            .push_bind(min)
            .push(" AND ")
            .push_bind(max);
    }
}

/// Escapes LIKE metacharacters so the user's text only ever matches as a
/// literal substring.
pub fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl Processor<ProductSearch> for DatabaseProcessor {
    type Output = ProductPage;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL:ProductSearch", err)]
    async fn process(&self, input: ProductSearch) -> Result<ProductPage, sqlx::Error> {
        let mut query = QueryBuilder::new(format!(
            r#"SELECT {PRODUCT_COLUMNS} FROM "shop"."product""#
        ));
        push_filters(&mut query, &input);
        query.push(input.sort.order_by_clause());
        query
            .push(" LIMIT ")
            .push_bind(input.limit)
            .push(" OFFSET ")
            .push_bind(input.offset);
        let products = query
            .build_query_as::<Product>()
            .fetch_all(self.db())
            .await?;

        let mut count = QueryBuilder::new(r#"SELECT COUNT(*) FROM "shop"."product""#);
        push_filters(&mut count, &input);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(self.db())
            .await?;

        Ok(ProductPage { products, total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_sort_keys_fall_back_to_default() {
        assert_eq!(SortKey::parse_or_default("lowest"), SortKey::Lowest);
        assert_eq!(SortKey::parse_or_default("toprated"), SortKey::TopRated);
        assert_eq!(SortKey::parse_or_default("newest"), SortKey::Newest);
        assert_eq!(SortKey::parse_or_default(""), SortKey::Default);
        assert_eq!(SortKey::parse_or_default("sideways"), SortKey::Default);
    }

    #[test]
    fn like_escaping_neutralizes_wildcards() {
        assert_eq!(escape_like("plain"), "plain");
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
    }

    #[test]
    fn category_parsing_matches_the_wire_names() {
        use std::str::FromStr;
        assert_eq!(
            ProductCategory::from_str("electronics"),
            Ok(ProductCategory::Electronics)
        );
        assert_eq!(ProductCategory::from_str("beauty"), Ok(ProductCategory::Beauty));
        assert!(ProductCategory::from_str("Groceries").is_err());
        assert!(ProductCategory::from_str("all").is_err());
    }
}
