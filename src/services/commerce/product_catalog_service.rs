use crate::{
    entities::{
        commerce::{category, Category, CategoryModel},
        product, ImageList, Product, ProductModel,
    },
    errors::ServiceError,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::{Expr, Func, LikeExpr, SimpleExpr},
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::{Validate, ValidationError};

const SUGGESTION_LIMIT: u64 = 10;
const FEATURED_LIMIT: u64 = 3;

/// Product catalog service: listing, search and product CRUD.
#[derive(Clone)]
pub struct ProductCatalogService {
    db: Arc<DatabaseConnection>,
    default_page_size: u64,
    max_page_size: u64,
}

impl ProductCatalogService {
    pub fn new(db: Arc<DatabaseConnection>, default_page_size: u64, max_page_size: u64) -> Self {
        Self {
            db,
            default_page_size,
            max_page_size,
        }
    }

    /// Paginated listing with optional category-name filter and title search.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        query: ProductListQuery,
    ) -> Result<ProductPage, ServiceError> {
        let (current_page, per_page) = self.page_window(&query);
        let offset = page_offset(current_page, per_page)?;

        let mut select = Product::find();

        if let Some(name) = query.category.as_deref().filter(|c| !c.is_empty()) {
            let found = Category::find()
                .filter(category::Column::Name.eq(name))
                .one(&*self.db)
                .await?
                .ok_or_else(|| ServiceError::not_found("Category not found"))?;
            select = select.filter(product::Column::CategoryId.eq(found.id));
        }

        if let Some(term) = query.search.as_deref().filter(|s| !s.is_empty()) {
            select = select.filter(title_contains(term));
        }

        let total_products = select.clone().count(&*self.db).await?;

        let products = select
            .order_by_asc(product::Column::CreatedAt)
            .order_by_asc(product::Column::Id)
            .offset(offset)
            .limit(per_page)
            .all(&*self.db)
            .await?;

        Ok(ProductPage {
            current_page,
            products_per_page: per_page,
            total_products,
            total_pages: total_pages(total_products, per_page),
            products: self.with_categories(products).await?,
        })
    }

    /// Up to ten `{id, title}` pairs whose title contains `search`.
    #[instrument(skip(self))]
    pub async fn suggestions(
        &self,
        search: Option<&str>,
    ) -> Result<Vec<ProductSuggestion>, ServiceError> {
        let term = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ServiceError::BadRequest("Search term is required".to_string()))?;

        Ok(Product::find()
            .select_only()
            .column(product::Column::Id)
            .column(product::Column::Title)
            .filter(title_contains(term))
            .order_by_asc(product::Column::Title)
            .limit(SUGGESTION_LIMIT)
            .into_model::<ProductSuggestion>()
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn featured(&self) -> Result<Vec<ProductView>, ServiceError> {
        let products = Product::find()
            .filter(product::Column::IsFeatured.eq(true))
            .order_by_asc(product::Column::CreatedAt)
            .limit(FEATURED_LIMIT)
            .all(&*self.db)
            .await?;
        self.with_categories(products).await
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, product_id: Uuid) -> Result<ProductView, ServiceError> {
        let product = self.find_product(product_id).await?;
        let category = Category::find_by_id(product.category_id)
            .one(&*self.db)
            .await?;
        Ok(ProductView { product, category })
    }

    #[instrument(skip(self))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<ProductModel, ServiceError> {
        input.validate()?;
        self.ensure_category_exists(input.category_id).await?;

        let now = Utc::now();
        let product = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(input.title),
            description: Set(input.description),
            images: Set(ImageList(input.images)),
            price: Set(input.price),
            stock: Set(input.stock),
            category_id: Set(input.category_id),
            rating_rate: Set(input.rating_rate),
            rating_count: Set(input.rating_count),
            is_featured: Set(input.is_featured),
            version: Set(1),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        info!("Created product {} ({})", product.id, product.title);
        Ok(product)
    }

    /// Applies the provided fields. A stock change bumps the version.
    #[instrument(skip(self))]
    pub async fn update_product(
        &self,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> Result<ProductModel, ServiceError> {
        input.validate()?;
        if let Some(category_id) = input.category_id {
            self.ensure_category_exists(category_id).await?;
        }

        let existing = self.find_product(product_id).await?;
        let version = existing.version;
        let mut active: product::ActiveModel = existing.into();

        if let Some(title) = input.title {
            active.title = Set(title);
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        if let Some(images) = input.images {
            active.images = Set(ImageList(images));
        }
        if let Some(price) = input.price {
            active.price = Set(price);
        }
        if let Some(stock) = input.stock {
            active.stock = Set(stock);
            active.version = Set(version + 1);
        }
        if let Some(category_id) = input.category_id {
            active.category_id = Set(category_id);
        }
        if let Some(rate) = input.rating_rate {
            active.rating_rate = Set(Some(rate));
        }
        if let Some(count) = input.rating_count {
            active.rating_count = Set(Some(count));
        }
        if let Some(is_featured) = input.is_featured {
            active.is_featured = Set(is_featured);
        }
        active.updated_at = Set(Utc::now());

        let product = active.update(&*self.db).await?;
        info!("Updated product {}", product_id);
        Ok(product)
    }

    #[instrument(skip(self))]
    pub async fn delete_product(&self, product_id: Uuid) -> Result<(), ServiceError> {
        let result = Product::delete_by_id(product_id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("Product not found"));
        }
        info!("Deleted product {}", product_id);
        Ok(())
    }

    async fn find_product(&self, product_id: Uuid) -> Result<ProductModel, ServiceError> {
        Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product not found"))
    }

    async fn ensure_category_exists(&self, category_id: Uuid) -> Result<(), ServiceError> {
        Category::find_by_id(category_id)
            .one(&*self.db)
            .await?
            .map(|_| ())
            .ok_or_else(|| ServiceError::BadRequest("Category not found".to_string()))
    }

    async fn with_categories(
        &self,
        products: Vec<ProductModel>,
    ) -> Result<Vec<ProductView>, ServiceError> {
        if products.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = products.iter().map(|p| p.category_id).collect();
        let categories: HashMap<Uuid, CategoryModel> = Category::find()
            .filter(category::Column::Id.is_in(ids))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        Ok(products
            .into_iter()
            .map(|product| ProductView {
                category: categories.get(&product.category_id).cloned(),
                product,
            })
            .collect())
    }

    fn page_window(&self, query: &ProductListQuery) -> (u64, u64) {
        let page = query.current_page.unwrap_or(1).max(1);
        let per_page = query
            .products_per_page
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size.max(1));
        (page, per_page)
    }
}

const LIKE_ESCAPE: char = '!';

/// Escapes LIKE wildcards (and the escape char itself) so `term` matches literally.
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, LIKE_ESCAPE | '%' | '_') {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

/// Case-insensitive substring match on the product title.
fn title_contains(term: &str) -> SimpleExpr {
    let pattern = format!("%{}%", escape_like(&term.to_lowercase()));
    Expr::expr(Func::lower(Expr::col(product::Column::Title)))
        .like(LikeExpr::new(pattern).escape(LIKE_ESCAPE))
}

/// Rows skipped before `page`; pages past what a SQL OFFSET can address are rejected.
pub fn page_offset(page: u64, per_page: u64) -> Result<u64, ServiceError> {
    page.saturating_sub(1)
        .checked_mul(per_page)
        .filter(|offset| i64::try_from(*offset).is_ok())
        .ok_or_else(|| ServiceError::ValidationError("Page number is too large".to_string()))
}

pub fn total_pages(total: u64, per_page: u64) -> u64 {
    if per_page == 0 {
        return 0;
    }
    total.div_ceil(per_page)
}

/// Largest price a `DECIMAL(16, 4)` column holds.
const MAX_PRICE: Decimal = rust_decimal_macros::dec!(999999999999.9999);

fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() {
        return Err(ValidationError::new("price_must_not_be_negative"));
    }
    if *price > MAX_PRICE {
        return Err(ValidationError::new("price_too_large"));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListQuery {
    pub current_page: Option<u64>,
    pub products_per_page: Option<u64>,
    /// Category name
    pub category: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    pub current_page: u64,
    pub products_per_page: u64,
    pub total_products: u64,
    pub total_pages: u64,
    pub products: Vec<ProductView>,
}

/// Product with its category expanded; `None` when the category was deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: ProductModel,
    pub category: Option<CategoryModel>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, FromQueryResult)]
pub struct ProductSuggestion {
    pub id: Uuid,
    pub title: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 255, message = "Title is required"))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[validate(custom = "validate_price")]
    pub price: Decimal,
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    #[serde(default)]
    pub stock: i32,
    #[serde(alias = "category")]
    pub category_id: Uuid,
    pub rating_rate: Option<f64>,
    pub rating_count: Option<i32>,
    #[serde(default)]
    pub is_featured: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductInput {
    #[validate(length(min = 1, max = 255, message = "Title cannot be empty"))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub images: Option<Vec<String>>,
    #[validate(custom = "validate_price")]
    pub price: Option<Decimal>,
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: Option<i32>,
    #[serde(alias = "category")]
    pub category_id: Option<Uuid>,
    pub rating_rate: Option<f64>,
    pub rating_count: Option<i32>,
    pub is_featured: Option<bool>,
}
