/// Commerce entities module
pub mod cart;
pub mod cart_item;
pub mod category;

pub use cart::{Entity as Cart, Model as CartModel};
pub use cart_item::{Entity as CartItem, Model as CartItemModel};
pub use category::{Entity as Category, Model as CategoryModel};
