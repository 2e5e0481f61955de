use std::{collections::HashMap, sync::Arc};

use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    entities::{order, order_item, product, Order, OrderItem, Product},
    errors::ServiceError,
};

/// Line of a placed order. Title and price are copied from the cart at checkout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product: Uuid,
    pub title: String,
    pub price: Decimal,
    pub quantity: i32,
}

impl From<order_item::Model> for OrderLine {
    fn from(item: order_item::Model) -> Self {
        Self {
            product: item.product_id,
            title: item.title,
            price: item.price,
            quantity: item.quantity,
        }
    }
}

/// Order line with the full product record; `None` if the product was deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExpandedOrderLine {
    pub product: Option<product::Model>,
    pub title: String,
    pub price: Decimal,
    pub quantity: i32,
}

/// An order together with its lines.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderView<L = OrderLine> {
    #[serde(flatten)]
    pub order: order::Model,
    pub products: Vec<L>,
}

pub type OrderDetails = OrderView<ExpandedOrderLine>;

impl OrderView {
    pub fn new(order: order::Model, items: Vec<order_item::Model>) -> Self {
        Self {
            order,
            products: items.into_iter().map(OrderLine::from).collect(),
        }
    }
}

/// Read side of orders: listing and detail with product expansion.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Orders placed by `user_id`, newest first.
    #[instrument(skip(self))]
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<OrderDetails>, ServiceError> {
        let orders = Order::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.is_in(order_ids))
            .order_by_asc(order_item::Column::Position)
            .all(&*self.db)
            .await?;

        let products = load_products(&*self.db, items.iter().map(|i| i.product_id)).await?;

        let mut by_order: HashMap<Uuid, Vec<order_item::Model>> = HashMap::new();
        for item in items {
            by_order.entry(item.order_id).or_default().push(item);
        }

        Ok(orders
            .into_iter()
            .map(|o| {
                let lines = by_order.remove(&o.id).unwrap_or_default();
                expand(o, lines, &products)
            })
            .collect())
    }

    /// Fetches one order. Only its owner or an admin may see it.
    #[instrument(skip(self, caller), fields(caller = %caller.user_id))]
    pub async fn get_order(
        &self,
        order_id: Uuid,
        caller: &AuthUser,
    ) -> Result<OrderDetails, ServiceError> {
        let order = find_order(&*self.db, order_id).await?;

        if !caller.can_access(order.user_id) {
            warn!("User {} denied access to order {}", caller.user_id, order_id);
            return Err(ServiceError::Forbidden(
                "You are not allowed to view this order".to_string(),
            ));
        }

        let items = load_order_items(&*self.db, order.id).await?;
        let products = load_products(&*self.db, items.iter().map(|i| i.product_id)).await?;
        Ok(expand(order, items, &products))
    }
}

pub(crate) async fn find_order<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<order::Model, ServiceError> {
    Order::find_by_id(order_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Order not found"))
}

pub(crate) async fn load_order_items<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<Vec<order_item::Model>, ServiceError> {
    Ok(OrderItem::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .order_by_asc(order_item::Column::Position)
        .all(conn)
        .await?)
}

async fn load_products<C: ConnectionTrait>(
    conn: &C,
    ids: impl Iterator<Item = Uuid>,
) -> Result<HashMap<Uuid, product::Model>, ServiceError> {
    let ids: Vec<Uuid> = ids.collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    Ok(Product::find()
        .filter(product::Column::Id.is_in(ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect())
}

fn expand(
    order: order::Model,
    items: Vec<order_item::Model>,
    products: &HashMap<Uuid, product::Model>,
) -> OrderDetails {
    OrderView {
        order,
        products: items
            .into_iter()
            .map(|item| ExpandedOrderLine {
                product: products.get(&item.product_id).cloned(),
                title: item.title,
                price: item.price,
                quantity: item.quantity,
            })
            .collect(),
    }
}
