use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::order::{PaymentMode, PaymentStatus};

/// Append-only settlement record, written once per completed delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    pub order_id: String,
    pub amount: f64,
    pub payment_mode: PaymentMode,
    pub payment_status: PaymentStatus,
    pub driver_id: Uuid,
    pub customer_id: String,
    pub created_at: DateTime<Utc>,
}
