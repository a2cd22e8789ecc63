//! Authoritative order record set. All state transitions run here, guarded
//! by the per-order entry lock; a broadcast failure after a successful
//! mutation never unwinds the mutation.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::driver::DriverProfile;
use crate::models::order::{
    new_order_id, DeliveryAddress, DeliveryStatus, DriverRef, GeoPoint, Order, OrderItem,
    PaymentMode, PaymentStatus,
};
use crate::models::transaction::Transaction;
use crate::realtime::protocol::{DeliverySummary, Role, ServerMessage};
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub customer_name: String,
    pub customer_phone: String,
    pub items: Vec<OrderItem>,
    pub delivery_address: DeliveryAddress,
    pub total_amount: f64,
    pub payment_mode: PaymentMode,
    #[serde(default)]
    pub delivery_notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdate {
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub items: Option<Vec<OrderItem>>,
    #[serde(default)]
    pub delivery_address: Option<DeliveryAddress>,
    #[serde(default)]
    pub total_amount: Option<f64>,
    #[serde(default)]
    pub payment_mode: Option<PaymentMode>,
    #[serde(default)]
    pub delivery_notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionData {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_orders: usize,
    pub pending_orders: usize,
    pub delivered_orders: usize,
    pub total_revenue: f64,
    pub total_drivers: usize,
}

pub fn create_order(state: &AppState, input: NewOrder) -> Result<Order, AppError> {
    if input.customer_name.trim().is_empty() {
        return Err(AppError::Validation("customer name is required".into()));
    }
    if input.customer_phone.trim().is_empty() {
        return Err(AppError::Validation("customer phone is required".into()));
    }
    if input.items.is_empty() {
        return Err(AppError::Validation("order needs at least one item".into()));
    }
    if input.delivery_address.address_line.trim().is_empty() {
        return Err(AppError::Validation("delivery address is required".into()));
    }
    if !(input.total_amount > 0.0) {
        return Err(AppError::Validation("total amount must be > 0".into()));
    }

    let now = Utc::now();
    let order = Order {
        id: Uuid::new_v4(),
        order_id: new_order_id(),
        customer_name: input.customer_name,
        customer_phone: input.customer_phone,
        items: input.items,
        delivery_address: input.delivery_address,
        total_amount: input.total_amount,
        payment_mode: input.payment_mode,
        payment_status: input.payment_mode.initial_payment_status(),
        delivery_status: DeliveryStatus::Pending,
        assigned_driver: None,
        assigned_at: None,
        delivered_at: None,
        delivered_by: None,
        delivery_location: None,
        delivery_photo: None,
        delivery_notes: input.delivery_notes,
        created_at: now,
        updated_at: now,
    };

    state.orders.insert(order.id, order.clone());
    state.metrics.orders_created_total.inc();

    state.router.broadcast_to_role(
        &ServerMessage::OrderCreated {
            order: order.clone(),
        },
        Role::Driver,
    );

    info!(order_id = %order.order_id, "order created");
    Ok(order)
}

/// Self-service claim: first driver wins. The check-and-set runs under the
/// order's entry write guard, so concurrent claims on one order serialize
/// and exactly one succeeds.
pub fn claim_order(state: &AppState, order_key: Uuid, driver_id: Uuid) -> Result<Order, AppError> {
    let driver = fetch_driver(state, driver_id)?;

    let order = {
        let mut entry = state
            .orders
            .get_mut(&order_key)
            .ok_or_else(|| AppError::NotFound(format!("order {order_key} not found")))?;

        assign_under_guard(&mut entry, &driver).inspect_err(|_| {
            state.metrics.claims_total.with_label_values(&["lost"]).inc();
        })?;

        entry.clone()
    };

    state.metrics.claims_total.with_label_values(&["won"]).inc();

    state.router.broadcast_all(&ServerMessage::OrderTaken {
        order_id: order.order_id.clone(),
        driver_id: driver.id,
        driver_name: driver.name.clone(),
    });

    info!(order_id = %order.order_id, driver = %driver.name, "order claimed");
    Ok(order)
}

/// Admin-directed assignment. Same exclusivity rule as a claim, but the one
/// target driver is notified directly instead of broadcasting.
pub fn assign_order(state: &AppState, order_key: Uuid, driver_id: Uuid) -> Result<Order, AppError> {
    let driver = fetch_driver(state, driver_id)?;

    let order = {
        let mut entry = state
            .orders
            .get_mut(&order_key)
            .ok_or_else(|| AppError::NotFound(format!("order {order_key} not found")))?;

        assign_under_guard(&mut entry, &driver)?;
        entry.clone()
    };

    state.router.send_to_actor(
        &driver.id.to_string(),
        &ServerMessage::OrderAssigned {
            order: order.clone(),
        },
    );

    info!(order_id = %order.order_id, driver = %driver.name, "order assigned by admin");
    Ok(order)
}

/// Admin override: release an assigned order back to the pool. The order
/// becomes claimable again and is re-announced to drivers.
pub fn unassign_order(state: &AppState, order_key: Uuid) -> Result<Order, AppError> {
    let order = {
        let mut entry = state
            .orders
            .get_mut(&order_key)
            .ok_or_else(|| AppError::NotFound(format!("order {order_key} not found")))?;

        if entry.delivery_status != DeliveryStatus::Assigned {
            return Err(AppError::Validation(
                "only assigned orders can be unassigned".into(),
            ));
        }

        entry.assigned_driver = None;
        entry.assigned_at = None;
        entry.delivery_status = DeliveryStatus::Pending;
        entry.updated_at = Utc::now();
        entry.clone()
    };

    state.router.broadcast_to_role(
        &ServerMessage::OrderCreated {
            order: order.clone(),
        },
        Role::Driver,
    );

    info!(order_id = %order.order_id, "order released back to pool");
    Ok(order)
}

pub fn complete_order(
    state: &AppState,
    order_key: Uuid,
    driver_id: Uuid,
    completion: CompletionData,
) -> Result<Order, AppError> {
    let driver = fetch_driver(state, driver_id)?;

    let order = {
        let mut entry = state
            .orders
            .get_mut(&order_key)
            .ok_or_else(|| AppError::NotFound(format!("order {order_key} not found")))?;

        match &entry.assigned_driver {
            Some(assigned) if assigned.id == driver.id => {}
            _ => return Err(AppError::NotAssignedToCaller),
        }
        if !entry.delivery_status.is_open() {
            return Err(AppError::Validation("order is closed".into()));
        }

        let now = Utc::now();
        entry.delivery_status = DeliveryStatus::Delivered;
        entry.payment_status = PaymentStatus::Completed;
        entry.delivered_at = Some(now);
        entry.delivered_by = Some(driver.name.clone());
        entry.delivery_location = match (completion.latitude, completion.longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint {
                latitude,
                longitude,
            }),
            _ => None,
        };
        if completion.photo.is_some() {
            entry.delivery_photo = completion.photo;
        }
        if completion.notes.is_some() {
            entry.delivery_notes = completion.notes;
        }
        entry.updated_at = now;
        entry.clone()
    };

    if let Some(mut profile) = state.drivers.get_mut(&driver.id) {
        profile.total_deliveries += 1;
        profile.completed_deliveries += 1;
    }

    let transaction = Transaction {
        id: Uuid::new_v4(),
        order_id: order.order_id.clone(),
        amount: order.total_amount,
        payment_mode: order.payment_mode,
        payment_status: order.payment_status,
        driver_id: driver.id,
        customer_id: order.customer_name.clone(),
        created_at: Utc::now(),
    };
    state
        .transactions
        .lock()
        .expect("transaction log poisoned")
        .push(transaction);

    state.metrics.deliveries_total.inc();

    state.router.broadcast_to_role(
        &ServerMessage::OrderDelivered {
            order: DeliverySummary::from(&order),
        },
        Role::Admin,
    );

    info!(order_id = %order.order_id, driver = %driver.name, "delivery confirmed");
    Ok(order)
}

/// Admin edit of order fields. A payment-mode change recomputes the payment
/// status through the same mapping used at creation.
pub fn update_order(
    state: &AppState,
    order_key: Uuid,
    update: OrderUpdate,
) -> Result<Order, AppError> {
    let mut entry = state
        .orders
        .get_mut(&order_key)
        .ok_or_else(|| AppError::NotFound(format!("order {order_key} not found")))?;

    if !entry.delivery_status.is_open() {
        return Err(AppError::Validation("order is closed".into()));
    }

    if let Some(customer_name) = update.customer_name {
        entry.customer_name = customer_name;
    }
    if let Some(customer_phone) = update.customer_phone {
        entry.customer_phone = customer_phone;
    }
    if let Some(items) = update.items {
        if items.is_empty() {
            return Err(AppError::Validation("order needs at least one item".into()));
        }
        entry.items = items;
    }
    if let Some(delivery_address) = update.delivery_address {
        entry.delivery_address = delivery_address;
    }
    if let Some(total_amount) = update.total_amount {
        if !(total_amount > 0.0) {
            return Err(AppError::Validation("total amount must be > 0".into()));
        }
        entry.total_amount = total_amount;
    }
    if let Some(payment_mode) = update.payment_mode {
        if payment_mode != entry.payment_mode {
            entry.payment_mode = payment_mode;
            entry.payment_status = payment_mode.initial_payment_status();
        }
    }
    if update.delivery_notes.is_some() {
        entry.delivery_notes = update.delivery_notes;
    }
    entry.updated_at = Utc::now();

    Ok(entry.clone())
}

/// Pending -> Cancelled, or Assigned -> Cancelled. Delivered and Cancelled
/// orders are terminal; an illegal transition leaves the record untouched.
pub fn cancel_order(state: &AppState, order_key: Uuid) -> Result<Order, AppError> {
    let mut entry = state
        .orders
        .get_mut(&order_key)
        .ok_or_else(|| AppError::NotFound(format!("order {order_key} not found")))?;

    if !entry.delivery_status.is_open() {
        return Err(AppError::Validation("order is closed".into()));
    }

    entry.delivery_status = DeliveryStatus::Cancelled;
    entry.updated_at = Utc::now();

    info!(order_id = %entry.order_id, "order cancelled");
    Ok(entry.clone())
}

/// Explicit purge; the retention cleanup task is the only other deleter.
pub fn delete_order(state: &AppState, order_key: Uuid) -> Result<(), AppError> {
    state
        .orders
        .remove(&order_key)
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound(format!("order {order_key} not found")))
}

pub fn get_order(state: &AppState, order_key: Uuid) -> Result<Order, AppError> {
    state
        .orders
        .get(&order_key)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("order {order_key} not found")))
}

/// Orders drivers can still act on, newest first.
pub fn list_open_orders(state: &AppState) -> Vec<Order> {
    let mut orders: Vec<Order> = state
        .orders
        .iter()
        .filter(|entry| entry.delivery_status.is_open())
        .map(|entry| entry.value().clone())
        .collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    orders
}

/// Admin listing with optional status filter and 1-based pagination.
/// Returns the page plus the total match count.
pub fn list_orders(
    state: &AppState,
    status: Option<DeliveryStatus>,
    page: usize,
    limit: usize,
) -> (Vec<Order>, usize) {
    let mut orders: Vec<Order> = state
        .orders
        .iter()
        .filter(|entry| status.is_none_or(|s| entry.delivery_status == s))
        .map(|entry| entry.value().clone())
        .collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let total = orders.len();
    let page = page.max(1);
    let start = (page - 1).saturating_mul(limit).min(total);
    let end = start.saturating_add(limit).min(total);

    (orders[start..end].to_vec(), total)
}

/// Delivered orders for one driver, most recent delivery first.
pub fn driver_history(state: &AppState, driver_id: Uuid) -> Vec<Order> {
    let mut orders: Vec<Order> = state
        .orders
        .iter()
        .filter(|entry| {
            entry.delivery_status == DeliveryStatus::Delivered
                && entry
                    .assigned_driver
                    .as_ref()
                    .is_some_and(|assigned| assigned.id == driver_id)
        })
        .map(|entry| entry.value().clone())
        .collect();
    orders.sort_by(|a, b| b.delivered_at.cmp(&a.delivered_at));
    orders
}

pub fn dashboard_stats(state: &AppState) -> DashboardStats {
    let mut total_orders = 0usize;
    let mut pending_orders = 0usize;
    let mut delivered_orders = 0usize;
    let mut total_revenue = 0f64;

    for entry in state.orders.iter() {
        total_orders += 1;
        match entry.delivery_status {
            DeliveryStatus::Pending => pending_orders += 1,
            DeliveryStatus::Delivered => delivered_orders += 1,
            _ => {}
        }
        if entry.payment_status == PaymentStatus::Completed {
            total_revenue += entry.total_amount;
        }
    }

    DashboardStats {
        total_orders,
        pending_orders,
        delivered_orders,
        total_revenue,
        total_drivers: state.drivers.len(),
    }
}

fn fetch_driver(state: &AppState, driver_id: Uuid) -> Result<DriverProfile, AppError> {
    state
        .drivers
        .get(&driver_id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("driver {driver_id} not found")))
}

/// The atomic check-and-set: caller must hold the order's entry write guard.
fn assign_under_guard(order: &mut Order, driver: &DriverProfile) -> Result<(), AppError> {
    if !order.delivery_status.is_open() {
        return Err(AppError::Validation("order is closed".into()));
    }
    if order.assigned_driver.is_some() {
        return Err(AppError::AlreadyAssigned);
    }

    order.assigned_driver = Some(DriverRef {
        id: driver.id,
        name: driver.name.clone(),
        phone: driver.phone.clone(),
    });
    order.delivery_status = DeliveryStatus::Assigned;
    order.assigned_at = Some(Utc::now());
    order.updated_at = Utc::now();
    Ok(())
}
