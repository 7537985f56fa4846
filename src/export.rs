use crate::errors::AppError;
use crate::models::Lead;

/// CSV column headers, in output order.
pub const CSV_HEADERS: [&str; 17] = [
    "id",
    "companyName",
    "domain",
    "websiteUrl",
    "industry",
    "location",
    "description",
    "numEmployees",
    "contactPhone",
    "linkedinUrl",
    "keywords",
    "icpScore",
    "keywordScore",
    "priorityScore",
    "outreachAngle",
    "createdAt",
    "updatedAt",
];

/// Renders leads as CSV, one row per lead in the given order.
///
/// Absent values become empty cells; keywords are joined with `", "`.
pub fn leads_to_csv(leads: &[Lead]) -> Result<Vec<u8>, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(CSV_HEADERS)
        .map_err(|e| AppError::InternalError(format!("Failed to write CSV header: {}", e)))?;

    for lead in leads {
        writer.write_record(lead_row(lead)).map_err(|e| {
            AppError::InternalError(format!("Failed to write CSV row for {}: {}", lead.id, e))
        })?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::InternalError(format!("Failed to flush CSV: {}", e)))
}

fn lead_row(lead: &Lead) -> [String; 17] {
    fn opt<T: ToString>(value: &Option<T>) -> String {
        value.as_ref().map(ToString::to_string).unwrap_or_default()
    }

    [
        lead.id.to_string(),
        opt(&lead.company_name),
        lead.domain.clone(),
        opt(&lead.website_url),
        opt(&lead.industry),
        opt(&lead.location),
        opt(&lead.description),
        opt(&lead.num_employees),
        opt(&lead.contact_phone),
        opt(&lead.linkedin_url),
        lead.keywords.join(", "),
        opt(&lead.icp_score),
        opt(&lead.keyword_score),
        opt(&lead.priority_score),
        opt(&lead.outreach_angle),
        lead.created_at.to_rfc3339(),
        lead.updated_at.to_rfc3339(),
    ]
}
