use crate::{
    entities::{
        commerce::{cart_item, Cart, CartItem},
        order::{self, OrderStatus},
        order_item, product, Product,
    },
    errors::ServiceError,
    services::{
        commerce::cart_service::{cart_total, find_user_cart, load_items},
        orders::OrderView,
    },
};
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

const EMPTY_CART: &str = "Cart is empty. Cannot proceed to checkout.";

/// Checkout service for converting carts to orders
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
}

impl CheckoutService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Turns the caller's cart into a pending order.
    ///
    /// Runs as one transaction: stock is checked for every line, the order and
    /// its lines are written, stock is decremented with a version check per
    /// product, and the cart is deleted. Any failure rolls everything back.
    #[instrument(skip(self, input), fields(user_id = %user_id))]
    pub async fn checkout(
        &self,
        user_id: Uuid,
        input: CheckoutInput,
    ) -> Result<OrderView, ServiceError> {
        input.validate()?;

        let txn = self.db.begin().await?;

        let cart = find_user_cart(&txn, user_id)
            .await?
            .ok_or_else(|| ServiceError::InvalidOperation(EMPTY_CART.to_string()))?;

        let items = load_items(&txn, cart.id).await?;
        if items.is_empty() {
            return Err(ServiceError::InvalidOperation(EMPTY_CART.to_string()));
        }

        // Stock check for every line before anything is written.
        let mut reserved: Vec<(&cart_item::Model, product::Model)> = Vec::with_capacity(items.len());
        for item in &items {
            match Product::find_by_id(item.product_id).one(&txn).await? {
                Some(product) if product.stock >= item.quantity => reserved.push((item, product)),
                _ => {
                    warn!(
                        product_id = %item.product_id,
                        requested = item.quantity,
                        "checkout rejected for insufficient stock"
                    );
                    return Err(ServiceError::InsufficientStock(format!(
                        "Insufficient stock for product: {}",
                        item.title
                    )));
                }
            }
        }

        let now = Utc::now();
        let order = order::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            total: Set(cart_total(&items)),
            status: Set(OrderStatus::Pending),
            payment: Set(input.payment.clone()),
            transaction_id: Set(input.transaction_id.clone()),
            version: Set(1),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let mut order_items = Vec::with_capacity(items.len());
        for item in &items {
            let line = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order.id),
                product_id: Set(item.product_id),
                title: Set(item.title.clone()),
                price: Set(item.price),
                quantity: Set(item.quantity),
                position: Set(item.position),
            }
            .insert(&txn)
            .await?;
            order_items.push(line);
        }

        for (item, product) in &reserved {
            let result = Product::update_many()
                .col_expr(
                    product::Column::Stock,
                    Expr::col(product::Column::Stock).sub(item.quantity),
                )
                .col_expr(
                    product::Column::Version,
                    Expr::col(product::Column::Version).add(1),
                )
                .col_expr(product::Column::UpdatedAt, Expr::value(now))
                .filter(product::Column::Id.eq(product.id))
                .filter(product::Column::Version.eq(product.version))
                .filter(product::Column::Stock.gte(item.quantity))
                .exec(&txn)
                .await?;

            if result.rows_affected == 0 {
                error!(
                    product_id = %product.id,
                    "stock changed concurrently during checkout"
                );
                return Err(ServiceError::ConcurrentModification(product.id));
            }
        }

        CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .exec(&txn)
            .await?;
        Cart::delete_by_id(cart.id).exec(&txn).await?;

        txn.commit().await?;

        info!(
            "Checked out cart {} into order {} (total {})",
            cart.id, order.id, order.total
        );
        Ok(OrderView::new(order, order_items))
    }
}

/// Checkout request body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutInput {
    #[validate(length(min = 1, message = "Payment method is required"))]
    pub payment: String,
    #[validate(length(min = 1, message = "Transaction id is required"))]
    pub transaction_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkout_input_requires_payment_details() {
        let input: CheckoutInput =
            serde_json::from_str(r#"{"payment":"card","transactionId":"tx-1"}"#).unwrap();
        assert!(input.validate().is_ok());

        let blank = CheckoutInput {
            payment: String::new(),
            transaction_id: "tx-1".into(),
        };
        assert!(blank.validate().is_err());
    }
}
