//! JSON wire envelopes for the bidirectional channel. Every frame carries a
//! `type` discriminator; payload field names follow the client's camelCase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::driver::DriverLocation;
use crate::models::order::{DeliveryStatus, GeoPoint, Order, PaymentStatus};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Driver,
    #[default]
    Unknown,
}

/// Position fields as reported by a driver device. Coordinates stay optional
/// so the ingest gate can reject incomplete fixes explicitly.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LocationReport {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub accuracy: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Bind this connection to an actor identity. Last registration wins.
    #[serde(rename = "register", rename_all = "camelCase")]
    Register {
        user_id: String,
        #[serde(default)]
        role: Role,
        #[serde(default)]
        name: Option<String>,
    },

    #[serde(rename = "START_TRACKING")]
    StartTracking,

    #[serde(rename = "STOP_TRACKING")]
    StopTracking,

    #[serde(rename = "REQUEST_ALL_LOCATIONS")]
    RequestAllLocations,

    /// Position report over the channel; same gate as the REST variant.
    #[serde(rename = "DRIVER_LOCATION_UPDATE")]
    DriverLocationUpdate { location: LocationReport },
}

/// Subset of an order broadcast on delivery confirmation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliverySummary {
    pub order_id: String,
    pub delivery_status: DeliveryStatus,
    pub payment_status: PaymentStatus,
    pub delivered_at: Option<DateTime<Utc>>,
    pub delivered_by: Option<String>,
    pub delivery_location: Option<GeoPoint>,
}

impl From<&Order> for DeliverySummary {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.order_id.clone(),
            delivery_status: order.delivery_status,
            payment_status: order.payment_status,
            delivered_at: order.delivered_at,
            delivered_by: order.delivered_by.clone(),
            delivery_location: order.delivery_location,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// New job available, fanned out to drivers.
    #[serde(rename = "ORDER_CREATED")]
    OrderCreated { order: Order },

    /// A claim succeeded; everyone refreshes their view of this order.
    #[serde(rename = "ORDER_TAKEN", rename_all = "camelCase")]
    OrderTaken {
        order_id: String,
        driver_id: Uuid,
        driver_name: String,
    },

    /// Admin-directed assignment, sent to the one target driver.
    #[serde(rename = "ORDER_ASSIGNED")]
    OrderAssigned { order: Order },

    #[serde(rename = "ORDER_DELIVERED")]
    OrderDelivered { order: DeliverySummary },

    #[serde(rename = "DRIVER_LOCATION_UPDATE", rename_all = "camelCase")]
    DriverLocationUpdate {
        driver_id: Uuid,
        driver_name: String,
        location: DriverLocation,
    },

    #[serde(rename = "START_TRACKING")]
    StartTracking,

    #[serde(rename = "STOP_TRACKING")]
    StopTracking,

    /// One-shot refresh request, independent of the tracking lifecycle.
    #[serde(rename = "REQUEST_LOCATION")]
    RequestLocation,

    #[serde(rename = "FORCE_LOGOUT")]
    ForceLogout { message: String },
}
