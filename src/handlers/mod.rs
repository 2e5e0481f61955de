pub mod commerce;
pub mod common;

use crate::auth::AuthService;
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::services::commerce::{
    CartService, CategoryService, CheckoutService, CustomerService, ProductCatalogService,
};
use crate::services::{order_status::OrderStatusService, orders::OrderService};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub customer: Arc<CustomerService>,
    pub product_catalog: Arc<ProductCatalogService>,
    pub category: Arc<CategoryService>,
    pub cart: Arc<CartService>,
    pub checkout: Arc<CheckoutService>,
    pub order: Arc<OrderService>,
    pub order_status: Arc<OrderStatusService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, auth: Arc<AuthService>, config: Arc<AppConfig>) -> Self {
        let product_catalog = Arc::new(ProductCatalogService::new(
            db_pool.clone(),
            config.default_page_size,
            config.max_page_size,
        ));

        Self {
            customer: Arc::new(CustomerService::new(db_pool.clone(), auth, config)),
            product_catalog,
            category: Arc::new(CategoryService::new(db_pool.clone())),
            cart: Arc::new(CartService::new(db_pool.clone())),
            checkout: Arc::new(CheckoutService::new(db_pool.clone())),
            order: Arc::new(OrderService::new(db_pool.clone())),
            order_status: Arc::new(OrderStatusService::new(db_pool)),
        }
    }
}
