use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DriverStatus {
    Active,
    Inactive,
}

/// Last reported position. Overwritten on every accepted report; entries
/// older than the freshness window are cleared by the cleanup task and must
/// never be read as fresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverProfile {
    pub id: Uuid,
    /// Linked account identity, unique per driver.
    pub user_id: Uuid,
    pub name: String,
    pub phone: String,
    pub status: DriverStatus,
    pub total_deliveries: u64,
    pub completed_deliveries: u64,
    pub last_location: Option<DriverLocation>,
    /// Push-notification address for out-of-band wakes.
    pub fcm_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl DriverProfile {
    pub fn new(name: String, phone: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name,
            phone,
            status: DriverStatus::Active,
            total_deliveries: 0,
            completed_deliveries: 0,
            last_location: None,
            fcm_token: None,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_wire_names_are_lowercase() {
        assert_eq!(
            serde_json::to_string(&DriverStatus::Active).unwrap(),
            "\"active\""
        );
        assert_eq!(
            serde_json::from_str::<DriverStatus>("\"inactive\"").unwrap(),
            DriverStatus::Inactive
        );
    }

    #[test]
    fn new_driver_starts_active_with_zero_counters() {
        let driver = DriverProfile::new("Ravi".into(), "9876543210".into());
        assert_eq!(driver.status, DriverStatus::Active);
        assert_eq!(driver.total_deliveries, 0);
        assert_eq!(driver.completed_deliveries, 0);
        assert!(driver.last_location.is_none());
        assert!(driver.fcm_token.is_none());
    }
}
