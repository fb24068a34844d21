use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored result of a connected-app consolidation analysis (the
/// `tool_analysis` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolAnalysis {
    pub id: String,
    pub org_id: String,
    pub analysis: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
