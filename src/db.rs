use anyhow::Context;
use serde_json::Value;
use sqlx::{PgPool, Row};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::accessor::EntryStoreAccessor;
use crate::error::{DataAccessError, SubmissionError};
use crate::models::{ContractType, Formation, NewSalaryRecord, ParticipantType, Specialty};
use crate::normalize::{coerce_amount, coerce_years};
use crate::store::{EntryQuery, EntryStore, RawEntry};

#[derive(Clone, Debug)]
pub struct PgEntryStore {
    pool: PgPool,
}

impl PgEntryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn init_db(&self) -> Result<(), DataAccessError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Builds the SELECT for `query`. Parameters are numbered in the order the
/// store binds them: labels first, then the years array.
fn select_sql(query: &EntryQuery) -> String {
    let mut sql = String::from(
        "SELECT to_jsonb(e) AS doc FROM salary_board.entries e WHERE TRUE",
    );
    let mut param = 0;
    let columns = [
        ("formation", query.formation.is_some()),
        ("specialty", query.specialty.is_some()),
        ("contract_type", query.contract_type.is_some()),
        ("participant_type", query.participant_type.is_some()),
    ];

    for (column, present) in columns {
        if present {
            param += 1;
            sql.push_str(&format!(" AND e.{column} = ${param}"));
        }
    }

    if query.years_in.is_some() {
        param += 1;
        sql.push_str(&format!(" AND e.years_since_graduation = ANY(${param})"));
    }

    sql.push_str(" ORDER BY e.created_at DESC");
    sql
}

impl EntryStore for PgEntryStore {
    async fn query(&self, query: &EntryQuery) -> Result<Vec<RawEntry>, DataAccessError> {
        let sql = select_sql(query);
        debug!(%sql, "querying salary entries");

        let mut rows = sqlx::query(&sql);
        for value in [
            query.formation.map(|value| value.as_str()),
            query.specialty.map(|value| value.as_str()),
            query.contract_type.map(|value| value.as_str()),
            query.participant_type.map(|value| value.as_str()),
        ]
        .into_iter()
        .flatten()
        {
            rows = rows.bind(value);
        }
        if let Some(years) = &query.years_in {
            rows = rows.bind(years.clone());
        }

        let records = rows.fetch_all(&self.pool).await?;
        let mut entries = Vec::with_capacity(records.len());

        for row in records {
            let doc: Value = row.try_get("doc")?;
            match serde_json::from_value::<RawEntry>(doc) {
                Ok(entry) => entries.push(entry),
                Err(err) => warn!(error = %err, "skipping undecodable salary entry row"),
            }
        }

        Ok(entries)
    }

    async fn insert(&self, entry: &NewSalaryRecord) -> Result<Uuid, DataAccessError> {
        let id: Uuid = sqlx::query(
            r#"
            INSERT INTO salary_board.entries
            (id, formation, specialty, contract_type, salary, participant_type,
             job_title, job_description, years_since_graduation)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(entry.formation.as_str())
        .bind(entry.specialty.as_str())
        .bind(entry.contract_type.as_str())
        .bind(entry.salary)
        .bind(entry.participant_type.as_str())
        .bind(entry.job_title.as_deref())
        .bind(entry.job_description.as_deref())
        .bind(entry.years_since_graduation.map(|years| years as i32))
        .fetch_one(&self.pool)
        .await?
        .get("id");

        Ok(id)
    }
}

fn sample(
    formation: Formation,
    specialty: Specialty,
    contract_type: ContractType,
    salary: i64,
    participant_type: ParticipantType,
    job_title: &str,
    years_since_graduation: Option<u32>,
) -> NewSalaryRecord {
    NewSalaryRecord {
        formation,
        specialty,
        contract_type,
        salary,
        participant_type,
        job_title: Some(job_title.to_string()),
        job_description: None,
        years_since_graduation,
    }
}

/// Submits a realistic sample cohort. Two of the salaries sit far from their
/// group median so the detector has something to flag.
pub async fn seed<S: EntryStore>(accessor: &EntryStoreAccessor<S>) -> anyhow::Result<usize> {
    use ContractType::*;
    use Formation::*;
    use ParticipantType::*;
    use Specialty::*;

    let entries = vec![
        sample(Master, Ssi, Cdi, 450_000, Alumni, "Security analyst", Some(2)),
        sample(Master, Ssi, Cdi, 480_000, Alumni, "SOC engineer", Some(3)),
        sample(Master, Ssi, Cdi, 520_000, Alumni, "Pentester", Some(4)),
        sample(Master, Ssi, Cdi, 1_900_000, Alumni, "Security lead", Some(1)),
        sample(Dic, Iabd, Cdd, 380_000, Alumni, "Data scientist", Some(1)),
        sample(Dic, Iabd, Cdd, 410_000, Alumni, "ML engineer", Some(2)),
        sample(Dic, Iabd, Cdd, 95_000, Alumni, "Data analyst", Some(1)),
        sample(Dit, Info, Stage, 150_000, Etudiant, "Backend intern", None),
        sample(Dit, Info, Alternance, 250_000, Etudiant, "Apprentice developer", None),
        sample(Telecom, Info, Prestation, 700_000, Alumni, "Freelance architect", Some(6)),
    ];

    let count = entries.len();
    for entry in entries {
        let label = entry.job_title.clone().unwrap_or_default();
        accessor
            .submit_entry(entry)
            .await
            .with_context(|| format!("failed to seed {label} entry"))?;
    }

    Ok(count)
}

/// Submits every CSV row. Numeric columns go through the same coercion as
/// fetched rows; rows with unknown labels or a non-positive salary are skipped.
pub async fn import_csv<S: EntryStore>(
    accessor: &EntryStoreAccessor<S>,
    csv_path: &std::path::Path,
) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        formation: String,
        specialty: String,
        contract_type: String,
        salary: String,
        participant_type: String,
        job_title: Option<String>,
        job_description: Option<String>,
        years_since_graduation: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result?;
        let labels = (
            row.formation.parse::<Formation>(),
            row.specialty.parse::<Specialty>(),
            row.contract_type.parse::<ContractType>(),
            row.participant_type.parse::<ParticipantType>(),
        );
        let (formation, specialty, contract_type, participant_type) = match labels {
            (Ok(f), Ok(s), Ok(c), Ok(p)) => (f, s, c, p),
            (f, s, c, p) => {
                let reason = [f.err(), s.err(), c.err(), p.err()]
                    .into_iter()
                    .flatten()
                    .map(|err| err.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                warn!(record = index + 1, %reason, "skipping csv row");
                continue;
            }
        };

        let entry = NewSalaryRecord {
            formation,
            specialty,
            contract_type,
            salary: coerce_amount(&Value::String(row.salary)),
            participant_type,
            job_title: row.job_title,
            job_description: row.job_description,
            years_since_graduation: row
                .years_since_graduation
                .and_then(|years| coerce_years(&Value::String(years))),
        };

        match accessor.submit_entry(entry).await {
            Ok(_) => inserted += 1,
            Err(SubmissionError::Invalid(reason)) => {
                warn!(record = index + 1, %reason, "skipping csv row");
            }
            Err(err) => return Err(err.into()),
        }
    }

    info!(inserted, path = %csv_path.display(), "csv import finished");
    Ok(inserted)
}
