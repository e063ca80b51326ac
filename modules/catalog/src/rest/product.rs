use auth::rest::middleware::{AdminUser, CurrentUser};
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use framework::processor::Processor;
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use crate::entities::product::{Product, ProductCategory};
use crate::entities::review::Review;
use crate::services::media::UploadImage;
use crate::services::product::{
    CreateProduct, CreateProductResult, EditProduct, EditProductResult, FetchAllProducts,
    FetchCategories, FetchProductById, FetchProductBySlug, ProductService, RemoveProduct,
};
use crate::services::review::{
    FetchProductReviews, ReviewService, SubmitReview, SubmitReviewResult,
};
use crate::services::search::{SearchCatalog, SearchService};

#[derive(Clone)]
pub struct ProductRestState {
    pub products: ProductService,
    pub reviews: ReviewService,
    pub search: SearchService,
}

pub fn router(state: ProductRestState) -> Router {
    Router::new()
        .route("/getProduct", get(list_products))
        .route("/search", get(search_products))
        .route("/categories", get(list_categories))
        .route("/images", post(create_product))
        .route("/slug/{slug}", get(get_product_by_slug))
        .route(
            "/{id}",
            get(get_product_by_id)
                .put(update_product)
                .delete(delete_product),
        )
        .route("/{id}/reviews", post(submit_review))
        // image uploads exceed the default 2 MB body cap
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .with_state(state)
}

async fn list_products(
    State(state): State<ProductRestState>,
) -> Result<Json<Vec<Product>>, framework::Error> {
    let products = state.products.process(FetchAllProducts).await?;
    Ok(Json(products))
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchParams {
    query: Option<String>,
    category: Option<String>,
    price: Option<String>,
    order: Option<String>,
    page: Option<i64>,
    page_size: Option<i64>,
}

async fn search_products(
    State(state): State<ProductRestState>,
    Query(params): Query<SearchParams>,
) -> Result<Response, framework::Error> {
    let results = state
        .search
        .process(SearchCatalog {
            query: params.query,
            category: params.category,
            price: params.price,
            order: params.order,
            page: params.page,
            page_size: params.page_size,
        })
        .await?;
    Ok(Json(json!({
        "products": results.products,
        "countProducts": results.count,
        "page": results.page,
        "pages": results.pages,
    }))
    .into_response())
}

async fn list_categories(
    State(state): State<ProductRestState>,
) -> Result<Json<Vec<ProductCategory>>, framework::Error> {
    let categories = state.products.process(FetchCategories).await?;
    Ok(Json(categories))
}

/// The product document as the storefront client consumes it: the record
/// plus its embedded review list.
fn product_document(product: &Product, reviews: &[Review]) -> Result<serde_json::Value, framework::Error> {
    let mut value = serde_json::to_value(product)
        .map_err(|e| framework::Error::BusinessPanic(anyhow::anyhow!("serialize product: {e}")))?;
    value["reviews"] = json!(reviews);
    Ok(value)
}

async fn get_product_by_slug(
    State(state): State<ProductRestState>,
    Path(slug): Path<String>,
) -> Result<Json<serde_json::Value>, framework::Error> {
    let product = state.products.process(FetchProductBySlug { slug }).await?;
    let reviews = state
        .reviews
        .process(FetchProductReviews {
            product_id: product.id,
        })
        .await?;
    Ok(Json(product_document(&product, &reviews)?))
}

async fn get_product_by_id(
    State(state): State<ProductRestState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, framework::Error> {
    let product = state.products.process(FetchProductById { id }).await?;
    let reviews = state
        .reviews
        .process(FetchProductReviews { product_id: id })
        .await?;
    Ok(Json(product_document(&product, &reviews)?))
}

struct ProductForm {
    name: Option<String>,
    slug: Option<String>,
    brand: Option<String>,
    price: Option<Decimal>,
    count_in_stock: Option<i32>,
    description: Option<String>,
    category: Option<ProductCategory>,
    image: Option<UploadImage>,
}

impl ProductForm {
    async fn read(mut multipart: Multipart) -> Result<Self, framework::Error> {
        let invalid = |what: &str| framework::Error::InvalidInput(format!("invalid {what} field"));
        let mut form = Self {
            name: None,
            slug: None,
            brand: None,
            price: None,
            count_in_stock: None,
            description: None,
            category: None,
            image: None,
        };
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| framework::Error::InvalidInput(format!("malformed form data: {e}")))?
        {
            let Some(field_name) = field.name().map(str::to_owned) else {
                continue;
            };
            match field_name.as_str() {
                "my_file" => {
                    let file_name = field.file_name().unwrap_or("upload").to_owned();
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_owned();
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| {
                            framework::Error::InvalidInput(format!("reading image upload: {e}"))
                        })?
                        .to_vec();
                    form.image = Some(UploadImage {
                        file_name,
                        content_type,
                        bytes,
                    });
                }
                "name" => form.name = Some(Self::text(field).await?),
                "slug" => form.slug = Some(Self::text(field).await?),
                "brand" => form.brand = Some(Self::text(field).await?),
                "description" => form.description = Some(Self::text(field).await?),
                "price" => {
                    form.price = Some(Self::text(field).await?.parse().map_err(|_| invalid("price"))?)
                }
                "countInStock" => {
                    form.count_in_stock =
                        Some(Self::text(field).await?.parse().map_err(|_| invalid("countInStock"))?)
                }
                "category" => {
                    form.category =
                        Some(Self::text(field).await?.parse().map_err(|_| invalid("category"))?)
                }
                _ => {}
            }
        }
        Ok(form)
    }

    async fn text(field: axum::extract::multipart::Field<'_>) -> Result<String, framework::Error> {
        field
            .text()
            .await
            .map_err(|e| framework::Error::InvalidInput(format!("malformed form field: {e}")))
    }
}

async fn create_product(
    _admin: AdminUser,
    State(state): State<ProductRestState>,
    multipart: Multipart,
) -> Result<Response, framework::Error> {
    let form = ProductForm::read(multipart).await?;
    let missing =
        |what: &str| framework::Error::InvalidInput(format!("{what} is required"));
    let input = CreateProduct {
        name: form.name.ok_or_else(|| missing("name"))?,
        slug: form.slug.ok_or_else(|| missing("slug"))?,
        brand: form.brand.ok_or_else(|| missing("brand"))?,
        price: form.price.ok_or_else(|| missing("price"))?,
        count_in_stock: form.count_in_stock.ok_or_else(|| missing("countInStock"))?,
        description: form.description.ok_or_else(|| missing("description"))?,
        category: form.category.ok_or_else(|| missing("category"))?,
        image: form.image.ok_or_else(|| missing("my_file"))?,
    };
    match state.products.process(input).await? {
        CreateProductResult::Created(product) => {
            Ok((StatusCode::CREATED, Json(product)).into_response())
        }
        CreateProductResult::DuplicatedSlug => {
            Err(framework::Error::Conflict("slug already exists".to_owned()))
        }
    }
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProductRequest {
    name: Option<String>,
    slug: Option<String>,
    image: Option<String>,
    brand: Option<String>,
    price: Option<Decimal>,
    count_in_stock: Option<i32>,
    description: Option<String>,
    category: Option<ProductCategory>,
}

async fn update_product(
    _admin: AdminUser,
    State(state): State<ProductRestState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateProductRequest>,
) -> Result<Json<Product>, framework::Error> {
    let result = state
        .products
        .process(EditProduct {
            id,
            name: req.name,
            slug: req.slug,
            image: req.image,
            brand: req.brand,
            price: req.price,
            count_in_stock: req.count_in_stock,
            description: req.description,
            category: req.category,
        })
        .await?;
    match result {
        EditProductResult::Updated(product) => Ok(Json(product)),
        EditProductResult::NotFound => Err(framework::Error::NotFound),
        EditProductResult::DuplicatedSlug => {
            Err(framework::Error::Conflict("slug already exists".to_owned()))
        }
    }
}

async fn delete_product(
    _admin: AdminUser,
    State(state): State<ProductRestState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, framework::Error> {
    state.products.process(RemoveProduct { id }).await?;
    Ok(Json(json!({ "message": "Product Deleted Successfully" })))
}

#[derive(serde::Deserialize)]
struct SubmitReviewRequest {
    rating: i16,
    comment: String,
}

async fn submit_review(
    user: CurrentUser,
    State(state): State<ProductRestState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SubmitReviewRequest>,
) -> Result<Response, framework::Error> {
    let result = state
        .reviews
        .process(SubmitReview {
            product_id: id,
            reviewer_id: user.id,
            reviewer_name: user.name,
            rating: req.rating,
            comment: req.comment,
        })
        .await?;
    match result {
        SubmitReviewResult::Created(appended) => Ok((
            StatusCode::CREATED,
            Json(json!({
                "message": "Review Created Successfully",
                "review": appended.review,
                "numReviews": appended.product.num_reviews,
                "rating": appended.product.rating,
            })),
        )
            .into_response()),
        SubmitReviewResult::AlreadyReviewed => Err(framework::Error::Conflict(
            "you already submitted a review".to_owned(),
        )),
        SubmitReviewResult::ProductNotFound => Err(framework::Error::NotFound),
    }
}
