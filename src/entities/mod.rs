pub mod commerce;
pub mod order;
pub mod order_item;
pub mod product;
pub mod user;

pub use commerce::{Cart, CartItem, Category};
pub use order::{Entity as Order, Model as OrderModel, OrderStatus};
pub use order_item::{Entity as OrderItem, Model as OrderItemModel};
pub use product::{Entity as Product, ImageList, Model as ProductModel};
pub use user::{Entity as User, Model as UserModel};
