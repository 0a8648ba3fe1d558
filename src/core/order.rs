//! Order business logic - Placing and viewing orders.
//!
//! Any signed-in principal can place an order; the owner is always the requester,
//! never a value from the request body. Orders are visible to their owner and to
//! admins, and order lines are visible exactly when their parent order is.
//! Fulfilment (status changes, deletion) is admin-only and status transitions are
//! not constrained: any status may follow any other.

use crate::{
    core::access::{OrderItemRule, OrderRule, Operation, Requester, RowRule, Subject, visible},
    entities::{Order, OrderItem, OrderStatus, Product, order, order_item},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// One requested order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    /// Product to buy
    pub product_id: i64,
    /// Units, at least 1
    pub quantity: i32,
}

/// An order together with its lines.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderWithItems {
    /// The order row
    #[serde(flatten)]
    pub order: order::Model,
    /// Its lines
    pub items: Vec<order_item::Model>,
}

fn validate(lines: &[OrderLine]) -> Result<()> {
    if lines.is_empty() {
        return Err(Error::validation("An order needs at least one line"));
    }
    if let Some(line) = lines.iter().find(|line| line.quantity < 1) {
        return Err(Error::InvalidAmount {
            amount: f64::from(line.quantity),
        });
    }
    Ok(())
}

/// Places an order for the requester.
///
/// Unit prices are copied from the current product rows and the total is computed
/// here, so callers cannot choose their own price. Returns `Ok(None)` when the
/// requester is not signed in.
///
/// # Errors
/// Returns an error if:
/// - There are no lines or a quantity is below 1
/// - A referenced product does not exist
/// - The database transaction fails
#[instrument(skip(db, lines), fields(lines = lines.len()))]
pub async fn place_order(
    db: &DatabaseConnection,
    requester: &Requester,
    lines: &[OrderLine],
) -> Result<Option<OrderWithItems>> {
    validate(lines)?;

    let subject = Subject::resolve(db, requester).await?;
    let candidate = order::Model {
        id: 0,
        user_id: subject.id(),
        status: OrderStatus::Pending,
        total: 0.0,
        created_at: chrono::Utc::now(),
    };
    if !OrderRule::check(&subject, Operation::Insert, &candidate).is_allowed() {
        debug!("Order insert denied");
        return Ok(None);
    }

    let txn = db.begin().await?;

    let mut priced = Vec::with_capacity(lines.len());
    for line in lines {
        let product = Product::find_by_id(line.product_id)
            .one(&txn)
            .await?
            .ok_or(Error::ProductNotFound {
                id: line.product_id,
            })?;
        priced.push((*line, product.price));
    }
    let total: f64 = priced
        .iter()
        .map(|(line, unit_price)| f64::from(line.quantity) * unit_price)
        .sum();

    let order = order::ActiveModel {
        user_id: Set(candidate.user_id),
        status: Set(candidate.status),
        total: Set(total),
        created_at: Set(candidate.created_at),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    if !OrderItemRule::check(&subject, Operation::Insert, &order).is_allowed() {
        debug!("Order line insert denied");
        return Ok(None);
    }

    let mut items = Vec::with_capacity(priced.len());
    for (line, unit_price) in priced {
        let item = order_item::ActiveModel {
            order_id: Set(order.id),
            product_id: Set(Some(line.product_id)),
            quantity: Set(line.quantity),
            unit_price: Set(unit_price),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        items.push(item);
    }

    txn.commit().await?;
    info!("Placed order {} totalling {:.2}", order.id, order.total);
    Ok(Some(OrderWithItems { order, items }))
}

/// Lists the orders the requester may see, newest first.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn list_orders(
    db: &DatabaseConnection,
    requester: &Requester,
) -> Result<Vec<order::Model>> {
    let subject = Subject::resolve(db, requester).await?;
    let mut query = Order::find();
    // Narrow in SQL for customers; the rule below still decides
    if !subject.is_admin() {
        query = query.filter(order::Column::UserId.eq(subject.id()));
    }
    let rows = query
        .order_by_desc(order::Column::CreatedAt)
        .order_by_desc(order::Column::Id)
        .all(db)
        .await?;
    Ok(visible::<OrderRule>(&subject, rows))
}

/// Fetches an order if the requester may see it.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_order(
    db: &DatabaseConnection,
    requester: &Requester,
    order_id: i64,
) -> Result<Option<order::Model>> {
    let subject = Subject::resolve(db, requester).await?;
    let found = Order::find_by_id(order_id).one(db).await?;
    Ok(found.filter(|row| OrderRule::check(&subject, Operation::Select, row).is_allowed()))
}

/// Lists the lines of an order; empty unless the parent order is visible.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn list_order_items(
    db: &DatabaseConnection,
    requester: &Requester,
    order_id: i64,
) -> Result<Vec<order_item::Model>> {
    let subject = Subject::resolve(db, requester).await?;
    let Some(parent) = Order::find_by_id(order_id).one(db).await? else {
        return Ok(Vec::new());
    };
    if !OrderItemRule::check(&subject, Operation::Select, &parent).is_allowed() {
        return Ok(Vec::new());
    }
    OrderItem::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .order_by_asc(order_item::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Fetches an order and its lines if the requester may see it.
///
/// # Errors
/// Returns an error if either database query fails.
pub async fn get_order_with_items(
    db: &DatabaseConnection,
    requester: &Requester,
    order_id: i64,
) -> Result<Option<OrderWithItems>> {
    let Some(order) = get_order(db, requester, order_id).await? else {
        return Ok(None);
    };
    let items = list_order_items(db, requester, order_id).await?;
    Ok(Some(OrderWithItems { order, items }))
}

/// Sets the fulfilment status of an order (admin only).
///
/// # Errors
/// Returns an error if the lookup or the update fails.
#[instrument(skip(db))]
pub async fn update_order_status(
    db: &DatabaseConnection,
    requester: &Requester,
    order_id: i64,
    status: OrderStatus,
) -> Result<Option<order::Model>> {
    let subject = Subject::resolve(db, requester).await?;
    let Some(current) = Order::find_by_id(order_id).one(db).await? else {
        return Ok(None);
    };
    if !OrderRule::check(&subject, Operation::Update, &current).is_allowed() {
        debug!("Order status update denied");
        return Ok(None);
    }

    let mut active: order::ActiveModel = current.into();
    active.status = Set(status);
    Ok(Some(active.update(db).await?))
}

/// Deletes an order and its lines (admin only).
///
/// # Errors
/// Returns an error if the database transaction fails.
#[instrument(skip(db))]
pub async fn delete_order(
    db: &DatabaseConnection,
    requester: &Requester,
    order_id: i64,
) -> Result<Option<order::Model>> {
    let subject = Subject::resolve(db, requester).await?;
    let Some(current) = Order::find_by_id(order_id).one(db).await? else {
        return Ok(None);
    };
    if !OrderRule::check(&subject, Operation::Delete, &current).is_allowed() {
        debug!("Order delete denied");
        return Ok(None);
    }

    let txn = db.begin().await?;
    OrderItem::delete_many()
        .filter(order_item::Column::OrderId.eq(order_id))
        .exec(&txn)
        .await?;
    Order::delete_by_id(order_id).exec(&txn).await?;
    txn.commit().await?;
    Ok(Some(current))
}
