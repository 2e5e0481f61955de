use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::Expr, ActiveEnum, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, TransactionTrait,
};
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    entities::{order, product, Order, OrderStatus, Product},
    errors::ServiceError,
    services::orders::{find_order, load_order_items, OrderView},
};

/// `pending → shipped → completed` and `pending → canceled`.
pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
    matches!(
        (from, to),
        (OrderStatus::Pending, OrderStatus::Shipped)
            | (OrderStatus::Shipped, OrderStatus::Completed)
            | (OrderStatus::Pending, OrderStatus::Canceled)
    )
}

pub fn ensure_transition(from: OrderStatus, to: OrderStatus) -> Result<(), ServiceError> {
    if is_valid_transition(from, to) {
        Ok(())
    } else {
        Err(ServiceError::InvalidStatus(format!(
            "Cannot change order status from '{}' to '{}'",
            from, to
        )))
    }
}

/// Applies validated status changes to orders.
#[derive(Clone)]
pub struct OrderStatusService {
    db: Arc<DatabaseConnection>,
}

impl OrderStatusService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn ship(&self, order_id: Uuid) -> Result<OrderView, ServiceError> {
        self.update_status(order_id, OrderStatus::Shipped, None).await
    }

    #[instrument(skip(self))]
    pub async fn complete(&self, order_id: Uuid) -> Result<OrderView, ServiceError> {
        self.update_status(order_id, OrderStatus::Completed, None)
            .await
    }

    /// Cancels a pending order and puts its quantities back into stock.
    #[instrument(skip(self, caller), fields(caller = %caller.user_id))]
    pub async fn cancel(
        &self,
        order_id: Uuid,
        caller: &AuthUser,
    ) -> Result<OrderView, ServiceError> {
        self.update_status(order_id, OrderStatus::Canceled, Some(caller))
            .await
    }

    /// Moves an order to `new_status` under a version check.
    /// When `caller` is given, only the owner or an admin may proceed.
    async fn update_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
        caller: Option<&AuthUser>,
    ) -> Result<OrderView, ServiceError> {
        let txn = self.db.begin().await?;

        let current = find_order(&txn, order_id).await?;

        if let Some(caller) = caller {
            if !caller.can_access(current.user_id) {
                return Err(ServiceError::Forbidden(
                    "You are not allowed to modify this order".to_string(),
                ));
            }
        }

        let old_status = current.status;
        ensure_transition(old_status, new_status)?;

        let now = Utc::now();
        write_status(&txn, &current, new_status, now).await?;

        let items = load_order_items(&txn, order_id).await?;

        if new_status == OrderStatus::Canceled {
            for item in &items {
                // Deleted products are skipped; there is nothing to restock.
                Product::update_many()
                    .col_expr(
                        product::Column::Stock,
                        Expr::col(product::Column::Stock).add(item.quantity),
                    )
                    .col_expr(
                        product::Column::Version,
                        Expr::col(product::Column::Version).add(1),
                    )
                    .col_expr(product::Column::UpdatedAt, Expr::value(now))
                    .filter(product::Column::Id.eq(item.product_id))
                    .exec(&txn)
                    .await?;
            }
        }

        let order = find_order(&txn, order_id).await?;
        txn.commit().await?;

        info!(
            "Order {} status updated from '{}' to '{}'",
            order_id, old_status, new_status
        );
        Ok(OrderView::new(order, items))
    }
}

/// Stores `new_status` only if the order still has the version `current` was read at.
pub(crate) async fn write_status<C: ConnectionTrait>(
    conn: &C,
    current: &order::Model,
    new_status: OrderStatus,
    now: DateTime<Utc>,
) -> Result<(), ServiceError> {
    let updated = Order::update_many()
        .col_expr(order::Column::Status, Expr::value(new_status.to_value()))
        .col_expr(
            order::Column::Version,
            Expr::col(order::Column::Version).add(1),
        )
        .col_expr(order::Column::UpdatedAt, Expr::value(now))
        .filter(order::Column::Id.eq(current.id))
        .filter(order::Column::Version.eq(current.version))
        .exec(conn)
        .await?;

    if updated.rows_affected == 0 {
        error!("Order {} was modified concurrently", current.id);
        return Err(ServiceError::ConcurrentModification(current.id));
    }
    Ok(())
}
