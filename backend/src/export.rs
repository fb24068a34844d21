//! CSV rendering of a savings report.

use saver_common::{LicenseRecommendation, SavingsEstimate, SavingsReport};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV buffer error: {0}")]
    Buffer(String),
}

#[derive(Debug, Serialize)]
struct Row<'a> {
    section: &'a str,
    item: String,
    count: i64,
    annual_savings: Option<f64>,
    priority: Option<String>,
    detail: String,
}

fn estimate_row<'a>(section: &'a str, item: &str, estimate: &SavingsEstimate) -> Row<'a> {
    Row {
        section,
        item: item.to_string(),
        count: estimate.count as i64,
        annual_savings: Some(estimate.annual_savings),
        priority: None,
        detail: estimate.user_ids.join(" "),
    }
}

fn recommendation_row<'a>(section: &'a str, rec: &LicenseRecommendation) -> Row<'a> {
    Row {
        section,
        item: rec.license_name.clone(),
        count: rec.unused,
        annual_savings: None,
        priority: Some(rec.priority.to_string()),
        detail: rec.action.clone(),
    }
}

/// One row per savings category and per recommendation, then a total row.
pub fn report_to_csv(report: &SavingsReport) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let estimates = [
        ("Inactive users", &report.inactive_users),
        ("Integration user conversion", &report.integration_conversion),
        ("Platform license conversion", &report.platform_conversion),
        ("Full sandboxes", &report.sandboxes),
        ("Storage", &report.storage),
    ];
    for (item, estimate) in estimates {
        writer.serialize(estimate_row("savings", item, estimate))?;
    }

    for rec in &report.license_recommendations {
        writer.serialize(recommendation_row("user_license", rec))?;
    }
    for rec in &report.package_recommendations {
        writer.serialize(recommendation_row("package_license", rec))?;
    }
    for rec in &report.permission_set_recommendations {
        writer.serialize(recommendation_row("permission_set_license", rec))?;
    }
    for rec in &report.contract_recommendations {
        writer.serialize(Row {
            section: "contract",
            item: rec.contract_name.clone(),
            count: rec.unused_licenses,
            annual_savings: Some(rec.potential_savings),
            priority: None,
            detail: rec.action.clone(),
        })?;
    }

    writer.serialize(Row {
        section: "total",
        item: "Total annual savings".to_string(),
        count: 0,
        annual_savings: Some(report.total_annual_savings),
        priority: None,
        detail: format!("generated {}", report.generated_at.to_rfc3339()),
    })?;

    writer
        .into_inner()
        .map_err(|e| ExportError::Buffer(e.to_string()))
}
