use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A consultation request (the `consultation_bookings` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsultationBooking {
    pub id: String,
    pub org_id: String,
    pub name: String,
    pub email: String,
    pub preferred_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl ConsultationBooking {
    pub fn new(org_id: String, name: String, email: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            org_id,
            name,
            email,
            preferred_date: None,
            notes: None,
            status: "requested".to_string(),
            created_at: Utc::now(),
        }
    }
}
