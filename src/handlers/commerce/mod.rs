/// Commerce API handlers module
pub mod carts;
pub mod categories;
pub mod orders;
pub mod products;
pub mod users;

// Re-export route builders
pub use carts::carts_routes;
pub use categories::categories_routes;
pub use orders::orders_routes;
pub use products::products_routes;
pub use users::users_routes;
