use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentMode {
    Cash,
    Card,
    #[serde(rename = "UPI")]
    Upi,
    Paid,
}

impl PaymentMode {
    /// Payment status an order carries for this mode before delivery.
    /// `Paid` means the customer prepaid; everything else settles on delivery.
    pub fn initial_payment_status(self) -> PaymentStatus {
        match self {
            PaymentMode::Paid => PaymentStatus::Completed,
            _ => PaymentStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DeliveryStatus {
    Pending,
    Assigned,
    #[serde(rename = "In Transit")]
    InTransit,
    Delivered,
    Cancelled,
}

impl DeliveryStatus {
    /// Open orders are the ones drivers can still act on.
    pub fn is_open(self) -> bool {
        !matches!(self, DeliveryStatus::Delivered | DeliveryStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub name: String,
    pub quantity: u32,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryAddress {
    pub address_line: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub pincode: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Snapshot of the driver at assignment time, not a live join. Survives the
/// driver profile being deleted afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverRef {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    /// Human-readable identifier, unique, distinct from the storage key.
    pub order_id: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub items: Vec<OrderItem>,
    pub delivery_address: DeliveryAddress,
    pub total_amount: f64,
    pub payment_mode: PaymentMode,
    pub payment_status: PaymentStatus,
    pub delivery_status: DeliveryStatus,
    pub assigned_driver: Option<DriverRef>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub delivered_by: Option<String>,
    pub delivery_location: Option<GeoPoint>,
    pub delivery_photo: Option<String>,
    pub delivery_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `ORD-` + the last six digits of the epoch millis + a random hex suffix.
pub fn new_order_id() -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "ORD-{:06}{}",
        millis.rem_euclid(1_000_000),
        suffix[..4].to_uppercase()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paid_mode_starts_completed_everything_else_pending() {
        assert_eq!(
            PaymentMode::Paid.initial_payment_status(),
            PaymentStatus::Completed
        );
        for mode in [PaymentMode::Cash, PaymentMode::Card, PaymentMode::Upi] {
            assert_eq!(mode.initial_payment_status(), PaymentStatus::Pending);
        }
    }

    #[test]
    fn payment_mode_wire_names() {
        assert_eq!(serde_json::to_string(&PaymentMode::Upi).unwrap(), "\"UPI\"");
        assert_eq!(
            serde_json::from_str::<PaymentMode>("\"Cash\"").unwrap(),
            PaymentMode::Cash
        );
    }

    #[test]
    fn in_transit_serializes_with_space() {
        assert_eq!(
            serde_json::to_string(&DeliveryStatus::InTransit).unwrap(),
            "\"In Transit\""
        );
        assert_eq!(
            serde_json::from_str::<DeliveryStatus>("\"In Transit\"").unwrap(),
            DeliveryStatus::InTransit
        );
    }

    #[test]
    fn order_ids_are_prefixed_and_distinct() {
        let a = new_order_id();
        let b = new_order_id();
        assert!(a.starts_with("ORD-"));
        assert!(a.len() > 8);
        assert_ne!(a, b);
    }

    #[test]
    fn open_statuses() {
        assert!(DeliveryStatus::Pending.is_open());
        assert!(DeliveryStatus::Assigned.is_open());
        assert!(!DeliveryStatus::Delivered.is_open());
        assert!(!DeliveryStatus::Cancelled.is_open());
    }
}
