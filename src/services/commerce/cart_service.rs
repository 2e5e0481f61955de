use crate::{
    entities::{
        commerce::{cart, cart_item, Cart, CartItem, CartModel},
        product, Product,
    },
    errors::ServiceError,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, str::FromStr, sync::Arc};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Upper bound for a single cart line, kept in step with the `AddToCartInput` validator.
pub const MAX_LINE_QUANTITY: i32 = 10_000;

/// Shopping cart service.
///
/// Each user owns at most one cart, created lazily by the first
/// [`add_item`](CartService::add_item). Lines keep the title and price the
/// product had when it was first added, and the cart total is recomputed from
/// those snapshots inside the same transaction as every mutation.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Adds `quantity` of a product, merging into an existing line for the same product.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: Uuid,
        input: AddToCartInput,
    ) -> Result<CartView, ServiceError> {
        input.validate()?;

        let txn = self.db.begin().await?;

        let product = Product::find_by_id(input.product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product not found"))?;

        let cart = match find_user_cart(&txn, user_id).await? {
            Some(cart) => cart,
            None => {
                let now = Utc::now();
                cart::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(user_id),
                    cart_total: Set(Decimal::ZERO),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(&txn)
                .await?
            }
        };

        let items = cart.find_related(CartItem).all(&txn).await?;

        if let Some(existing) = items.iter().find(|i| i.product_id == input.product_id) {
            let quantity = raised_quantity(existing.quantity, input.quantity)?;
            let mut item: cart_item::ActiveModel = existing.clone().into();
            item.quantity = Set(quantity);
            item.update(&txn).await?;
        } else {
            let position = items.iter().map(|i| i.position).max().map_or(0, |p| p + 1);
            cart_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                cart_id: Set(cart.id),
                product_id: Set(product.id),
                title: Set(product.title.clone()),
                price: Set(product.price),
                quantity: Set(input.quantity),
                position: Set(position),
            }
            .insert(&txn)
            .await?;
        }

        let view = recalculate_cart_total(&txn, cart).await?;
        txn.commit().await?;

        info!(
            "Added product {} x{} to cart {}",
            input.product_id, input.quantity, view.id
        );
        Ok(view)
    }

    /// Returns the caller's lines with product references expanded.
    #[instrument(skip(self))]
    pub async fn get_cart(&self, user_id: Uuid) -> Result<Vec<ExpandedCartLine>, ServiceError> {
        let cart = find_user_cart(&*self.db, user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Cart not found"))?;

        let items = load_items(&*self.db, cart.id).await?;
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
        let products: HashMap<Uuid, ProductSummary> = Product::find()
            .filter(product::Column::Id.is_in(ids))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|p| (p.id, ProductSummary::from(p)))
            .collect();

        Ok(items
            .into_iter()
            .map(|item| ExpandedCartLine {
                product: products.get(&item.product_id).cloned(),
                title: item.title,
                price: item.price,
                quantity: item.quantity,
            })
            .collect())
    }

    /// Drops the line for `product_id`; a product that is not in the cart is a no-op.
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<CartView, ServiceError> {
        let txn = self.db.begin().await?;

        let cart = find_user_cart(&txn, user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Cart not found"))?;

        let removed = CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .exec(&txn)
            .await?
            .rows_affected;

        let view = recalculate_cart_total(&txn, cart).await?;
        txn.commit().await?;

        if removed > 0 {
            info!("Removed product {} from cart {}", product_id, view.id);
        }
        Ok(view)
    }

    /// Moves a line's quantity up or down by one. Decreasing a line at 1 removes it.
    #[instrument(skip(self))]
    pub async fn adjust_quantity(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        adjustment: QuantityAdjustment,
    ) -> Result<CartView, ServiceError> {
        let txn = self.db.begin().await?;

        let cart = find_user_cart(&txn, user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Cart not found"))?;

        let item = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product not found in cart"))?;

        match adjustment {
            QuantityAdjustment::Increase => {
                let quantity = raised_quantity(item.quantity, 1)?;
                let mut active: cart_item::ActiveModel = item.into();
                active.quantity = Set(quantity);
                active.update(&txn).await?;
            }
            QuantityAdjustment::Decrease if item.quantity > 1 => {
                let quantity = item.quantity - 1;
                let mut active: cart_item::ActiveModel = item.into();
                active.quantity = Set(quantity);
                active.update(&txn).await?;
            }
            QuantityAdjustment::Decrease => {
                item.delete(&txn).await?;
            }
        }

        let view = recalculate_cart_total(&txn, cart).await?;
        txn.commit().await?;

        info!(
            "Cart {}: {} quantity of product {}",
            view.id, adjustment, product_id
        );
        Ok(view)
    }

    pub async fn increase_quantity(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<CartView, ServiceError> {
        self.adjust_quantity(user_id, product_id, QuantityAdjustment::Increase)
            .await
    }

    pub async fn decrease_quantity(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<CartView, ServiceError> {
        self.adjust_quantity(user_id, product_id, QuantityAdjustment::Decrease)
            .await
    }
}

pub(crate) async fn find_user_cart<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> Result<Option<CartModel>, ServiceError> {
    Ok(Cart::find()
        .filter(cart::Column::UserId.eq(user_id))
        .one(conn)
        .await?)
}

pub(crate) async fn load_items<C: ConnectionTrait>(
    conn: &C,
    cart_id: Uuid,
) -> Result<Vec<cart_item::Model>, ServiceError> {
    Ok(CartItem::find()
        .filter(cart_item::Column::CartId.eq(cart_id))
        .order_by_asc(cart_item::Column::Position)
        .all(conn)
        .await?)
}

fn raised_quantity(current: i32, by: i32) -> Result<i32, ServiceError> {
    current
        .checked_add(by)
        .filter(|q| *q <= MAX_LINE_QUANTITY)
        .ok_or_else(|| {
            ServiceError::ValidationError(format!(
                "Quantity cannot exceed {}",
                MAX_LINE_QUANTITY
            ))
        })
}

/// Σ snapshot price × quantity.
pub fn cart_total(items: &[cart_item::Model]) -> Decimal {
    items
        .iter()
        .map(|i| i.price * Decimal::from(i.quantity))
        .sum()
}

async fn recalculate_cart_total(
    txn: &DatabaseTransaction,
    cart: CartModel,
) -> Result<CartView, ServiceError> {
    let items = load_items(txn, cart.id).await?;
    let total = cart_total(&items);

    let mut active: cart::ActiveModel = cart.into();
    active.cart_total = Set(total);
    active.updated_at = Set(Utc::now());
    let cart = active.update(txn).await?;

    Ok(CartView::new(cart, items))
}

/// Add-to-cart request body.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartInput {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 10000, message = "Quantity must be between 1 and 10000"))]
    pub quantity: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum QuantityAdjustment {
    Increase,
    Decrease,
}

impl QuantityAdjustment {
    pub fn parse(value: &str) -> Result<Self, ServiceError> {
        Self::from_str(value).map_err(|_| {
            ServiceError::ValidationError(
                "Invalid type. Use \"increase\" or \"decrease\".".to_string(),
            )
        })
    }
}

/// Stored cart line, product left as a reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product: Uuid,
    pub title: String,
    pub price: Decimal,
    pub quantity: i32,
}

impl From<cart_item::Model> for CartLine {
    fn from(item: cart_item::Model) -> Self {
        Self {
            product: item.product_id,
            title: item.title,
            price: item.price,
            quantity: item.quantity,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub id: Uuid,
    pub user: Uuid,
    pub products: Vec<CartLine>,
    pub cart_total: Decimal,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
}

impl CartView {
    pub fn new(cart: CartModel, items: Vec<cart_item::Model>) -> Self {
        Self {
            id: cart.id,
            user: cart.user_id,
            products: items.into_iter().map(CartLine::from).collect(),
            cart_total: cart.cart_total,
            created_at: cart.created_at,
            updated_at: cart.updated_at,
        }
    }
}

/// Product fields shown inside an expanded cart line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: Uuid,
    pub title: String,
    pub price: Decimal,
}

impl From<product::Model> for ProductSummary {
    fn from(p: product::Model) -> Self {
        Self {
            id: p.id,
            title: p.title,
            price: p.price,
        }
    }
}

/// Cart line whose product has been looked up; `None` once the product is deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExpandedCartLine {
    pub product: Option<ProductSummary>,
    pub title: String,
    pub price: Decimal,
    pub quantity: i32,
}
