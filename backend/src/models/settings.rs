use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-org preferences (the `organization_settings` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationSettings {
    pub org_id: String,
    /// Monthly price the org pays for one full Salesforce license.
    pub license_price: f64,
    pub updated_at: DateTime<Utc>,
}
