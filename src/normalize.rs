use serde_json::Value;
use tracing::warn;

use crate::models::{SalaryRecord, UnknownVariant};
use crate::store::RawEntry;

fn parse_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|number| number.is_finite())
}

/// Salary amount from a loosely-typed field. Anything non-numeric counts as 0.
pub fn coerce_amount(value: &Value) -> i64 {
    parse_number(value).map(|number| number.round() as i64).unwrap_or(0)
}

/// Years since graduation. Null, non-numeric and negative values become `None`.
pub fn coerce_years(value: &Value) -> Option<u32> {
    parse_number(value)
        .filter(|number| *number >= 0.0)
        .map(|number| number.trunc() as u32)
}

fn blank_to_none(text: Option<String>) -> Option<String> {
    text.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Builds a strongly-typed record from a fetched row. Numeric fields fall
/// back to safe defaults; labels outside their closed set reject the row.
pub fn normalize_entry(raw: RawEntry) -> Result<SalaryRecord, UnknownVariant> {
    let salary = coerce_amount(&raw.salary);
    if parse_number(&raw.salary).is_none() {
        warn!(id = %raw.id, value = %raw.salary, "non-numeric salary treated as 0");
    }

    let years_since_graduation = coerce_years(&raw.years_since_graduation);
    if years_since_graduation.is_none() && !raw.years_since_graduation.is_null() {
        warn!(
            id = %raw.id,
            value = %raw.years_since_graduation,
            "unreadable years since graduation dropped"
        );
    }

    Ok(SalaryRecord {
        id: raw.id,
        created_at: raw.created_at,
        formation: raw.formation.parse()?,
        specialty: raw.specialty.parse()?,
        contract_type: raw.contract_type.parse()?,
        salary,
        participant_type: raw.participant_type.parse()?,
        job_title: blank_to_none(raw.job_title),
        job_description: blank_to_none(raw.job_description),
        years_since_graduation,
        is_outlier: false,
        outlier_reason: None,
    })
}
