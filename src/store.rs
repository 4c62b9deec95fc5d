use std::future::Future;
use std::path::Path;
use std::str::FromStr;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::DataAccessError;
use crate::models::{
    ContractType, EntryFilters, Formation, NewSalaryRecord, ParticipantType, Specialty,
};
use crate::normalize::coerce_years;

/// A fetched row before normalization. Labels stay as text and numeric
/// fields may arrive as numbers, strings or null.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEntry {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub formation: String,
    pub specialty: String,
    pub contract_type: String,
    #[serde(default)]
    pub salary: Value,
    pub participant_type: String,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub job_description: Option<String>,
    #[serde(default)]
    pub years_since_graduation: Value,
}

/// Equality filters plus an optional membership set; rows come back newest
/// first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryQuery {
    pub formation: Option<Formation>,
    pub specialty: Option<Specialty>,
    pub contract_type: Option<ContractType>,
    pub participant_type: Option<ParticipantType>,
    pub years_in: Option<Vec<i32>>,
}

impl From<&EntryFilters> for EntryQuery {
    fn from(filters: &EntryFilters) -> Self {
        Self {
            formation: filters.formation,
            specialty: filters.specialty,
            contract_type: filters.contract_type,
            participant_type: filters.participant_type,
            years_in: (!filters.years_since_graduation.is_empty()).then(|| {
                filters
                    .years_since_graduation
                    .iter()
                    .filter_map(|year| i32::try_from(*year).ok())
                    .collect()
            }),
        }
    }
}

/// The remote collection the accessor reads from and submissions go to.
pub trait EntryStore {
    fn query(
        &self,
        query: &EntryQuery,
    ) -> impl Future<Output = Result<Vec<RawEntry>, DataAccessError>> + Send;

    fn insert(
        &self,
        entry: &NewSalaryRecord,
    ) -> impl Future<Output = Result<Uuid, DataAccessError>> + Send;
}

/// In-process store. Labels are parsed with the same lenient rules as
/// fetched rows before being compared, so a filtered query always returns a
/// subset of the unfiltered one.
#[derive(Debug, Default)]
pub struct MemoryEntryStore {
    rows: RwLock<Vec<RawEntry>>,
}

impl MemoryEntryStore {
    pub fn new(rows: Vec<RawEntry>) -> Self {
        Self {
            rows: RwLock::new(rows),
        }
    }

    /// Loads a snapshot exported as CSV. `id` and `created_at` columns are
    /// optional; missing ones are generated.
    pub fn from_csv(path: &Path) -> anyhow::Result<Self> {
        #[derive(Deserialize)]
        struct CsvRow {
            id: Option<Uuid>,
            created_at: Option<DateTime<Utc>>,
            formation: String,
            specialty: String,
            contract_type: String,
            salary: String,
            participant_type: String,
            job_title: Option<String>,
            job_description: Option<String>,
            years_since_graduation: Option<String>,
        }

        let mut reader = csv::Reader::from_path(path)?;
        let mut rows = Vec::new();

        for result in reader.deserialize::<CsvRow>() {
            let row = result?;
            rows.push(RawEntry {
                id: row.id.unwrap_or_else(Uuid::new_v4),
                created_at: row.created_at.unwrap_or_else(Utc::now),
                formation: row.formation,
                specialty: row.specialty,
                contract_type: row.contract_type,
                salary: Value::String(row.salary),
                participant_type: row.participant_type,
                job_title: row.job_title,
                job_description: row.job_description,
                years_since_graduation: row
                    .years_since_graduation
                    .map(Value::String)
                    .unwrap_or(Value::Null),
            });
        }

        Ok(Self::new(rows))
    }

    fn matches(query: &EntryQuery, row: &RawEntry) -> bool {
        fn label_eq<T: FromStr + PartialEq>(expected: Option<T>, actual: &str) -> bool {
            expected.map_or(true, |value| actual.parse::<T>().is_ok_and(|label| label == value))
        }

        label_eq(query.formation, &row.formation)
            && label_eq(query.specialty, &row.specialty)
            && label_eq(query.contract_type, &row.contract_type)
            && label_eq(query.participant_type, &row.participant_type)
            && query.years_in.as_ref().map_or(true, |years| {
                coerce_years(&row.years_since_graduation)
                    .and_then(|year| i32::try_from(year).ok())
                    .is_some_and(|year| years.contains(&year))
            })
    }
}

impl EntryStore for MemoryEntryStore {
    async fn query(&self, query: &EntryQuery) -> Result<Vec<RawEntry>, DataAccessError> {
        let rows = self
            .rows
            .read()
            .map_err(|_| DataAccessError::Unavailable("memory store lock poisoned".to_string()))?;

        let mut matching: Vec<RawEntry> = rows
            .iter()
            .filter(|row| Self::matches(query, row))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    async fn insert(&self, entry: &NewSalaryRecord) -> Result<Uuid, DataAccessError> {
        let id = Uuid::new_v4();
        let row = RawEntry {
            id,
            created_at: Utc::now(),
            formation: entry.formation.as_str().to_string(),
            specialty: entry.specialty.as_str().to_string(),
            contract_type: entry.contract_type.as_str().to_string(),
            salary: Value::from(entry.salary),
            participant_type: entry.participant_type.as_str().to_string(),
            job_title: entry.job_title.clone(),
            job_description: entry.job_description.clone(),
            years_since_graduation: entry
                .years_since_graduation
                .map(Value::from)
                .unwrap_or(Value::Null),
        };

        self.rows
            .write()
            .map_err(|_| DataAccessError::Unavailable("memory store lock poisoned".to_string()))?
            .push(row);
        Ok(id)
    }
}
