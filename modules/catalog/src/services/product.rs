use framework::processor::Processor;
use framework::sqlx::{is_unique_violation, DatabaseProcessor};
use rust_decimal::Decimal;
use tracing::instrument;
use uuid::Uuid;

use crate::entities::product::{
    DeleteProduct, FindProductById, FindProductBySlug, InsertProduct, ListCategoriesInUse,
    ListProducts, Product, ProductCategory, UpdateProductFields,
};
use crate::services::media::{MediaStore, UploadImage};

#[derive(Clone)]
pub struct ProductService {
    pub db: DatabaseProcessor,
    pub media: MediaStore,
}

/// Admin product creation: the image goes to the media host first, then the
/// record is inserted with the returned URL.
#[derive(Debug, Clone)]
pub struct CreateProduct {
    pub name: String,
    pub slug: String,
    pub brand: String,
    pub price: Decimal,
    pub count_in_stock: i32,
    pub description: String,
    pub category: ProductCategory,
    pub image: UploadImage,
}

#[derive(Debug)]
pub enum CreateProductResult {
    Created(Product),
    DuplicatedSlug,
}

impl Processor<CreateProduct> for ProductService {
    type Output = CreateProductResult;
    type Error = framework::Error;
    #[instrument(skip_all, err)]
    async fn process(&self, input: CreateProduct) -> Result<CreateProductResult, framework::Error> {
        if input.price < Decimal::ZERO {
            return Err(framework::Error::InvalidInput(
                "price must not be negative".to_owned(),
            ));
        }
        if input.count_in_stock < 0 {
            return Err(framework::Error::InvalidInput(
                "stock count must not be negative".to_owned(),
            ));
        }
        let image_url = self.media.upload(input.image).await?;
        let inserted = self
            .db
            .process(InsertProduct {
                name: input.name,
                slug: input.slug,
                image: image_url,
                brand: input.brand,
                price: input.price,
                count_in_stock: input.count_in_stock,
                description: input.description,
                category: input.category,
            })
            .await;
        match inserted {
            Ok(product) => Ok(CreateProductResult::Created(product)),
            Err(e) if is_unique_violation(&e) => Ok(CreateProductResult::DuplicatedSlug),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EditProduct {
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

#[derive(Debug)]
pub enum EditProductResult {
    Updated(Product),
    DuplicatedSlug,
    NotFound,
}

impl Processor<EditProduct> for ProductService {
    type Output = EditProductResult;
    type Error = framework::Error;
    #[instrument(skip_all, err)]
    async fn process(&self, input: EditProduct) -> Result<EditProductResult, framework::Error> {
        if input.price.is_some_and(|p| p < Decimal::ZERO) {
            return Err(framework::Error::InvalidInput(
                "price must not be negative".to_owned(),
            ));
        }
        if input.count_in_stock.is_some_and(|c| c < 0) {
            return Err(framework::Error::InvalidInput(
                "stock count must not be negative".to_owned(),
            ));
        }
        let updated = self
            .db
            .process(UpdateProductFields {
                id: input.id,
                name: input.name,
                slug: input.slug,
                image: input.image,
                brand: input.brand,
                price: input.price,
                count_in_stock: input.count_in_stock,
                description: input.description,
                category: input.category,
            })
            .await;
        match updated {
            Ok(Some(product)) => Ok(EditProductResult::Updated(product)),
            Ok(None) => Ok(EditProductResult::NotFound),
            Err(e) if is_unique_violation(&e) => Ok(EditProductResult::DuplicatedSlug),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FetchAllProducts;

impl Processor<FetchAllProducts> for ProductService {
    type Output = Vec<Product>;
    type Error = framework::Error;
    async fn process(&self, _input: FetchAllProducts) -> Result<Vec<Product>, framework::Error> {
        self.db.process(ListProducts).await.map_err(Into::into)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FetchProductById {
    pub id: Uuid,
}

impl Processor<FetchProductById> for ProductService {
    type Output = Product;
    type Error = framework::Error;
    async fn process(&self, input: FetchProductById) -> Result<Product, framework::Error> {
        self.db
            .process(FindProductById { id: input.id })
            .await?
            .ok_or(framework::Error::NotFound)
    }
}

#[derive(Debug, Clone)]
pub struct FetchProductBySlug {
    pub slug: String,
}

impl Processor<FetchProductBySlug> for ProductService {
    type Output = Product;
    type Error = framework::Error;
    async fn process(&self, input: FetchProductBySlug) -> Result<Product, framework::Error> {
        self.db
            .process(FindProductBySlug { slug: input.slug })
            .await?
            .ok_or(framework::Error::NotFound)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FetchCategories;

impl Processor<FetchCategories> for ProductService {
    type Output = Vec<ProductCategory>;
    type Error = framework::Error;
    async fn process(&self, _input: FetchCategories) -> Result<Vec<ProductCategory>, framework::Error> {
        self.db
            .process(ListCategoriesInUse)
            .await
            .map_err(Into::into)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RemoveProduct {
    pub id: Uuid,
}

impl Processor<RemoveProduct> for ProductService {
    type Output = ();
    type Error = framework::Error;
    #[instrument(skip_all, err)]
    async fn process(&self, input: RemoveProduct) -> Result<(), framework::Error> {
        let deleted = self.db.process(DeleteProduct { id: input.id }).await?;
        if deleted {
            Ok(())
        } else {
            Err(framework::Error::NotFound)
        }
    }
}
