/// Commerce services module - storefront business logic
pub mod cart_service;
pub mod category_service;
pub mod checkout_service;
pub mod customer_service;
pub mod product_catalog_service;

// Re-export services for convenience
pub use cart_service::{AddToCartInput, CartService, CartView, QuantityAdjustment};
pub use category_service::{CategoryInput, CategoryService};
pub use checkout_service::{CheckoutInput, CheckoutService};
pub use customer_service::{AuthResponse, CustomerService, LoginInput, RegisterInput};
pub use product_catalog_service::{
    CreateProductInput, ProductCatalogService, ProductListQuery, UpdateProductInput,
};
