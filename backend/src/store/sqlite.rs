use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use saver_common::{Contract, Invoice};

use crate::models::{
    ConsultationBooking, OrganizationSettings, OrganizationSubscription, ReportAccess, ToolAnalysis,
};

/// SQLite-backed store for settings, billing state, bookings and contracts.
pub struct Store {
    conn: Mutex<Connection>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Corrupt row: {0}")]
    CorruptRow(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::DatabaseError(e.to_string())
    }
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS organization_settings (
    org_id TEXT PRIMARY KEY,
    license_price REAL NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS organization_subscriptions (
    org_id TEXT PRIMARY KEY,
    stripe_customer_id TEXT,
    stripe_subscription_id TEXT,
    status TEXT NOT NULL,
    price_id TEXT,
    current_period_end TEXT,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_subscriptions_stripe_id
    ON organization_subscriptions(stripe_subscription_id);
CREATE TABLE IF NOT EXISTS report_access (
    id TEXT PRIMARY KEY,
    org_id TEXT NOT NULL,
    stripe_session_id TEXT NOT NULL UNIQUE,
    granted_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_report_access_org ON report_access(org_id);
CREATE TABLE IF NOT EXISTS consultation_bookings (
    id TEXT PRIMARY KEY,
    org_id TEXT NOT NULL,
    name TEXT NOT NULL,
    email TEXT NOT NULL,
    preferred_date TEXT,
    notes TEXT,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS salesforce_contracts (
    id TEXT PRIMARY KEY,
    org_id TEXT NOT NULL,
    name TEXT NOT NULL,
    start_date TEXT NOT NULL,
    end_date TEXT NOT NULL,
    status TEXT NOT NULL,
    amount REAL NOT NULL,
    document_name TEXT
);
CREATE INDEX IF NOT EXISTS idx_contracts_org ON salesforce_contracts(org_id);
CREATE TABLE IF NOT EXISTS invoices (
    id TEXT PRIMARY KEY,
    org_id TEXT NOT NULL,
    contract_id TEXT,
    invoice_date TEXT NOT NULL,
    status TEXT NOT NULL,
    amount REAL NOT NULL,
    FOREIGN KEY (contract_id) REFERENCES salesforce_contracts(id)
);
CREATE INDEX IF NOT EXISTS idx_invoices_org ON invoices(org_id);
CREATE TABLE IF NOT EXISTS tool_analysis (
    id TEXT PRIMARY KEY,
    org_id TEXT NOT NULL,
    analysis TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_tool_analysis_org ON tool_analysis(org_id, created_at);
";

fn parse_time(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::CorruptRow(format!("timestamp {}: {}", raw, e)))
}

fn parse_day(raw: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| StoreError::CorruptRow(format!("date {}: {}", raw, e)))
}

impl Store {
    pub fn new(database_url: &str) -> Result<Self, StoreError> {
        // Parse sqlite: prefix if present
        let path = database_url.strip_prefix("sqlite:").unwrap_or(database_url);

        if path != ":memory:" {
            if let Some(parent) = Path::new(path).parent() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::IoError(e.to_string()))?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;

        tracing::info!("Store initialized with database: {}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))
    }

    // ------------------------------------------------------------------
    // organization_settings
    // ------------------------------------------------------------------

    pub fn get_settings(&self, org_id: &str) -> Result<Option<OrganizationSettings>, StoreError> {
        let conn = self.conn()?;
        let row: Option<(String, f64, String)> = conn
            .query_row(
                "SELECT org_id, license_price, updated_at FROM organization_settings WHERE org_id = ?1",
                params![org_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        row.map(|(org_id, license_price, updated_at)| {
            Ok(OrganizationSettings {
                org_id,
                license_price,
                updated_at: parse_time(&updated_at)?,
            })
        })
        .transpose()
    }

    pub fn upsert_settings(&self, org_id: &str, license_price: f64) -> Result<OrganizationSettings, StoreError> {
        let now = Utc::now();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO organization_settings (org_id, license_price, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(org_id) DO UPDATE SET license_price = excluded.license_price, updated_at = excluded.updated_at",
            params![org_id, license_price, now.to_rfc3339()],
        )?;

        tracing::info!(org_id = %org_id, license_price, "Updated organization settings");
        Ok(OrganizationSettings {
            org_id: org_id.to_string(),
            license_price,
            updated_at: now,
        })
    }

    // ------------------------------------------------------------------
    // organization_subscriptions / report_access
    // ------------------------------------------------------------------

    pub fn get_subscription(&self, org_id: &str) -> Result<Option<OrganizationSubscription>, StoreError> {
        let conn = self.conn()?;
        let row: Option<(String, Option<String>, Option<String>, String, Option<String>, Option<String>, String)> = conn
            .query_row(
                "SELECT org_id, stripe_customer_id, stripe_subscription_id, status, price_id, current_period_end, updated_at
                 FROM organization_subscriptions WHERE org_id = ?1",
                params![org_id],
                |row| Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                )),
            )
            .optional()?;

        row.map(|(org_id, customer, subscription, status, price_id, period_end, updated_at)| {
            Ok(OrganizationSubscription {
                org_id,
                stripe_customer_id: customer,
                stripe_subscription_id: subscription,
                status,
                price_id,
                current_period_end: period_end.as_deref().map(parse_time).transpose()?,
                updated_at: parse_time(&updated_at)?,
            })
        })
        .transpose()
    }

    /// Org that owns a Stripe subscription, for events without metadata.
    pub fn find_org_by_subscription(&self, subscription_id: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn()?;
        let org_id = conn
            .query_row(
                "SELECT org_id FROM organization_subscriptions WHERE stripe_subscription_id = ?1",
                params![subscription_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(org_id)
    }

    /// Insert or replace an org's subscription. Missing Stripe ids keep their
    /// stored values.
    pub fn upsert_subscription(&self, sub: &OrganizationSubscription) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO organization_subscriptions
                (org_id, stripe_customer_id, stripe_subscription_id, status, price_id, current_period_end, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(org_id) DO UPDATE SET
                stripe_customer_id = COALESCE(excluded.stripe_customer_id, stripe_customer_id),
                stripe_subscription_id = COALESCE(excluded.stripe_subscription_id, stripe_subscription_id),
                status = excluded.status,
                price_id = COALESCE(excluded.price_id, price_id),
                current_period_end = COALESCE(excluded.current_period_end, current_period_end),
                updated_at = excluded.updated_at",
            params![
                sub.org_id,
                sub.stripe_customer_id,
                sub.stripe_subscription_id,
                sub.status,
                sub.price_id,
                sub.current_period_end.map(|d| d.to_rfc3339()),
                sub.updated_at.to_rfc3339(),
            ],
        )?;

        tracing::info!(org_id = %sub.org_id, status = %sub.status, "Stored subscription");
        Ok(())
    }

    /// Update the status of a subscription by Stripe id. Returns rows changed.
    pub fn set_subscription_status(&self, subscription_id: &str, status: &str) -> Result<usize, StoreError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE organization_subscriptions SET status = ?1, updated_at = ?2 WHERE stripe_subscription_id = ?3",
            params![status, Utc::now().to_rfc3339(), subscription_id],
        )?;
        Ok(changed)
    }

    /// Record a one-time report purchase. Replayed webhooks are ignored.
    pub fn grant_report_access(&self, org_id: &str, stripe_session_id: &str) -> Result<ReportAccess, StoreError> {
        let access = ReportAccess {
            id: uuid::Uuid::new_v4().to_string(),
            org_id: org_id.to_string(),
            stripe_session_id: stripe_session_id.to_string(),
            granted_at: Utc::now(),
        };

        let conn = self.conn()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO report_access (id, org_id, stripe_session_id, granted_at) VALUES (?1, ?2, ?3, ?4)",
            params![access.id, access.org_id, access.stripe_session_id, access.granted_at.to_rfc3339()],
        )?;

        if inserted > 0 {
            tracing::info!(org_id = %org_id, session_id = %stripe_session_id, "Granted report access");
        } else {
            tracing::debug!(session_id = %stripe_session_id, "Report access already granted");
        }
        Ok(access)
    }

    pub fn has_report_access(&self, org_id: &str) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM report_access WHERE org_id = ?1",
            params![org_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Whether the org may see the full report.
    pub fn has_paid_access(&self, org_id: &str) -> Result<bool, StoreError> {
        let subscribed = self
            .get_subscription(org_id)?
            .map(|s| s.is_active())
            .unwrap_or(false);
        Ok(subscribed || self.has_report_access(org_id)?)
    }

    // ------------------------------------------------------------------
    // consultation_bookings
    // ------------------------------------------------------------------

    pub fn create_booking(&self, booking: &ConsultationBooking) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO consultation_bookings (id, org_id, name, email, preferred_date, notes, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                booking.id,
                booking.org_id,
                booking.name,
                booking.email,
                booking.preferred_date.map(|d| d.to_string()),
                booking.notes,
                booking.status,
                booking.created_at.to_rfc3339(),
            ],
        )?;

        tracing::info!(org_id = %booking.org_id, booking_id = %booking.id, "Consultation requested");
        Ok(())
    }

    pub fn list_bookings(&self, org_id: &str) -> Result<Vec<ConsultationBooking>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, org_id, name, email, preferred_date, notes, status, created_at
             FROM consultation_bookings WHERE org_id = ?1 ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map(params![org_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, Option<String>>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
            ))
        })?;

        let mut bookings = Vec::new();
        for row in rows {
            let (id, org_id, name, email, preferred_date, notes, status, created_at) = row?;
            bookings.push(ConsultationBooking {
                id,
                org_id,
                name,
                email,
                preferred_date: preferred_date.as_deref().map(parse_day).transpose()?,
                notes,
                status,
                created_at: parse_time(&created_at)?,
            });
        }
        Ok(bookings)
    }

    // ------------------------------------------------------------------
    // salesforce_contracts / invoices
    // ------------------------------------------------------------------

    pub fn insert_contract(&self, contract: &Contract) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO salesforce_contracts (id, org_id, name, start_date, end_date, status, amount, document_name)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                contract.id,
                contract.org_id,
                contract.name,
                contract.start_date.to_string(),
                contract.end_date.to_string(),
                contract.status,
                contract.amount,
                contract.document_name,
            ],
        )?;
        tracing::info!(org_id = %contract.org_id, contract_id = %contract.id, "Stored contract");
        Ok(())
    }

    pub fn list_contracts(&self, org_id: &str) -> Result<Vec<Contract>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, org_id, name, start_date, end_date, status, amount, document_name
             FROM salesforce_contracts WHERE org_id = ?1 ORDER BY end_date",
        )?;
        let rows = stmt.query_map(params![org_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, f64>(6)?,
                row.get::<_, Option<String>>(7)?,
            ))
        })?;

        let mut contracts = Vec::new();
        for row in rows {
            let (id, org_id, name, start, end, status, amount, document_name) = row?;
            contracts.push(Contract {
                id,
                org_id,
                name,
                start_date: parse_day(&start)?,
                end_date: parse_day(&end)?,
                status,
                amount,
                document_name,
            });
        }
        Ok(contracts)
    }

    pub fn insert_invoice(&self, invoice: &Invoice) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO invoices (id, org_id, contract_id, invoice_date, status, amount)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                invoice.id,
                invoice.org_id,
                invoice.contract_id,
                invoice.invoice_date.to_string(),
                invoice.status,
                invoice.amount,
            ],
        )?;
        tracing::debug!(org_id = %invoice.org_id, invoice_id = %invoice.id, "Stored invoice");
        Ok(())
    }

    pub fn list_invoices(&self, org_id: &str) -> Result<Vec<Invoice>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, org_id, contract_id, invoice_date, status, amount
             FROM invoices WHERE org_id = ?1 ORDER BY invoice_date",
        )?;
        let rows = stmt.query_map(params![org_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, f64>(5)?,
            ))
        })?;

        let mut invoices = Vec::new();
        for row in rows {
            let (id, org_id, contract_id, invoice_date, status, amount) = row?;
            invoices.push(Invoice {
                id,
                org_id,
                contract_id,
                invoice_date: parse_day(&invoice_date)?,
                status,
                amount,
            });
        }
        Ok(invoices)
    }

    // ------------------------------------------------------------------
    // tool_analysis
    // ------------------------------------------------------------------

    pub fn save_tool_analysis(&self, org_id: &str, analysis: &serde_json::Value) -> Result<ToolAnalysis, StoreError> {
        let record = ToolAnalysis {
            id: uuid::Uuid::new_v4().to_string(),
            org_id: org_id.to_string(),
            analysis: analysis.clone(),
            created_at: Utc::now(),
        };

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO tool_analysis (id, org_id, analysis, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![record.id, record.org_id, analysis.to_string(), record.created_at.to_rfc3339()],
        )?;
        Ok(record)
    }

    pub fn latest_tool_analysis(&self, org_id: &str) -> Result<Option<ToolAnalysis>, StoreError> {
        let conn = self.conn()?;
        let row: Option<(String, String, String, String)> = conn
            .query_row(
                "SELECT id, org_id, analysis, created_at FROM tool_analysis
                 WHERE org_id = ?1 ORDER BY created_at DESC LIMIT 1",
                params![org_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        row.map(|(id, org_id, analysis, created_at)| {
            Ok(ToolAnalysis {
                id,
                org_id,
                analysis: serde_json::from_str(&analysis)
                    .map_err(|e| StoreError::CorruptRow(e.to_string()))?,
                created_at: parse_time(&created_at)?,
            })
        })
        .transpose()
    }
}
