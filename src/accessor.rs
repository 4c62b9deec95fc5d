use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{DataAccessError, SubmissionError};
use crate::models::{EntryFilters, NewSalaryRecord, ParticipantType, SalaryRecord};
use crate::normalize::normalize_entry;
use crate::outliers::{detect_outliers_with, OutlierRules};
use crate::store::{EntryQuery, EntryStore};

/// Reads annotated salary records from an [`EntryStore`] and forwards new
/// submissions to it.
#[derive(Debug)]
pub struct EntryStoreAccessor<S> {
    store: S,
    rules: OutlierRules,
}

impl<S: EntryStore> EntryStoreAccessor<S> {
    pub fn new(store: S) -> Self {
        Self::with_rules(store, OutlierRules::default())
    }

    pub fn with_rules(store: S, rules: OutlierRules) -> Self {
        Self { store, rules }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Matching records, newest first, with outlier annotations already set.
    /// Rows whose labels fall outside the closed sets are skipped.
    pub async fn fetch_entries(
        &self,
        filters: &EntryFilters,
    ) -> Result<Vec<SalaryRecord>, DataAccessError> {
        let raw = self.store.query(&EntryQuery::from(filters)).await?;
        let fetched = raw.len();

        let records: Vec<SalaryRecord> = raw
            .into_iter()
            .filter_map(|entry| {
                let id = entry.id;
                normalize_entry(entry)
                    .map_err(|err| warn!(%id, error = %err, "skipping salary entry"))
                    .ok()
            })
            .collect();

        let annotated = detect_outliers_with(&self.rules, &records);
        info!(
            fetched,
            kept = annotated.len(),
            flagged = annotated.iter().filter(|record| record.is_outlier).count(),
            "salary entries fetched"
        );
        Ok(annotated)
    }

    /// Validates and inserts a submission. Years since graduation only apply
    /// to alumni and are dropped for students.
    pub async fn submit_entry(&self, mut entry: NewSalaryRecord) -> Result<Uuid, SubmissionError> {
        if entry.salary <= 0 {
            return Err(SubmissionError::Invalid(format!(
                "salary must be positive, got {}",
                entry.salary
            )));
        }
        if entry.participant_type == ParticipantType::Etudiant {
            entry.years_since_graduation = None;
        }

        let id = self.store.insert(&entry).await?;
        info!(%id, contract = %entry.contract_type, "salary entry submitted");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use serde_json::{json, Value};

    use super::*;
    use crate::models::{ContractType, Formation, Specialty};
    use crate::store::{MemoryEntryStore, RawEntry};

    fn raw(salary: Value, formation: &str, minutes_ago: i64) -> RawEntry {
        RawEntry {
            id: Uuid::new_v4(),
            created_at: Utc::now() - Duration::minutes(minutes_ago),
            formation: formation.to_string(),
            specialty: "SSI".to_string(),
            contract_type: "CDI".to_string(),
            salary,
            participant_type: "Alumni".to_string(),
            job_title: None,
            job_description: None,
            years_since_graduation: json!(2),
        }
    }

    fn submission(salary: i64, participant_type: ParticipantType) -> NewSalaryRecord {
        NewSalaryRecord {
            formation: Formation::Master,
            specialty: Specialty::Ssi,
            contract_type: ContractType::Cdi,
            salary,
            participant_type,
            job_title: None,
            job_description: None,
            years_since_graduation: Some(3),
        }
    }

    struct FailingStore;

    impl EntryStore for FailingStore {
        async fn query(&self, _: &EntryQuery) -> Result<Vec<RawEntry>, DataAccessError> {
            Err(DataAccessError::Unavailable("offline".to_string()))
        }

        async fn insert(&self, _: &NewSalaryRecord) -> Result<Uuid, DataAccessError> {
            Err(DataAccessError::Unavailable("offline".to_string()))
        }
    }

    #[tokio::test]
    async fn fetch_annotates_and_orders() {
        let accessor = EntryStoreAccessor::new(MemoryEntryStore::new(vec![
            raw(json!(200000), "Master", 50),
            raw(json!("210000"), "Master", 40),
            raw(json!(190000), "Master", 30),
            raw(json!(205000), "Master", 20),
            raw(json!(1900000), "Master", 10),
            raw(json!("oops"), "Master", 5),
        ]));

        let entries = accessor.fetch_entries(&EntryFilters::default()).await.unwrap();
        assert_eq!(entries.len(), 6);
        assert_eq!(entries[0].salary, 0);
        assert!(entries[0].is_outlier);
        assert_eq!(entries[1].salary, 1_900_000);
        assert!(entries[1].is_outlier);
        assert!(entries[2..].iter().all(|entry| !entry.is_outlier));
    }

    #[tokio::test]
    async fn unknown_labels_are_skipped() {
        let accessor = EntryStoreAccessor::new(MemoryEntryStore::new(vec![
            raw(json!(200000), "Master", 2),
            raw(json!(200000), "MBA", 1),
        ]));
        let entries = accessor.fetch_entries(&EntryFilters::default()).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].formation, Formation::Master);
    }

    #[tokio::test]
    async fn alias_labels_survive_label_filters() {
        let mut student = raw(json!(250000), "master", 2);
        student.participant_type = "Etudiant".to_string();
        let accessor = EntryStoreAccessor::new(MemoryEntryStore::new(vec![
            student,
            raw(json!(200000), "Master", 1),
        ]));

        let entries = accessor
            .fetch_entries(&EntryFilters {
                formation: Some(Formation::Master),
                participant_type: Some(ParticipantType::Etudiant),
                ..EntryFilters::default()
            })
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].salary, 250_000);
        assert_eq!(entries[0].participant_type, ParticipantType::Etudiant);
    }

    #[tokio::test]
    async fn empty_store_returns_empty_list() {
        let accessor = EntryStoreAccessor::new(MemoryEntryStore::default());
        let entries = accessor.fetch_entries(&EntryFilters::default()).await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn store_failures_surface_unmodified() {
        let accessor = EntryStoreAccessor::new(FailingStore);
        let err = accessor
            .fetch_entries(&EntryFilters::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DataAccessError::Unavailable(ref reason) if reason == "offline"));

        let err = accessor
            .submit_entry(submission(300_000, ParticipantType::Alumni))
            .await
            .unwrap_err();
        assert!(matches!(err, SubmissionError::DataAccess(_)));
    }

    #[tokio::test]
    async fn submissions_are_validated() {
        let accessor = EntryStoreAccessor::new(MemoryEntryStore::default());
        let err = accessor
            .submit_entry(submission(0, ParticipantType::Alumni))
            .await
            .unwrap_err();
        assert!(matches!(err, SubmissionError::Invalid(_)));

        accessor
            .submit_entry(submission(300_000, ParticipantType::Etudiant))
            .await
            .unwrap();
        let entries = accessor.fetch_entries(&EntryFilters::default()).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].years_since_graduation, None);
    }

    #[tokio::test]
    async fn demo_snapshot_feeds_the_dashboard() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/entries.csv");
        let accessor = EntryStoreAccessor::new(MemoryEntryStore::from_csv(&path).unwrap());
        let entries = accessor.fetch_entries(&EntryFilters::default()).await.unwrap();
        assert_eq!(entries.len(), 8);
        assert_eq!(entries.iter().filter(|entry| entry.is_outlier).count(), 2);

        let snapshot = crate::compute_metrics(&entries, &crate::Preferences::default());
        assert_eq!(snapshot.total_participants, 6);
        assert_eq!(snapshot.average_by_formation[&Formation::Master], 201_250);
        assert!(!snapshot.average_by_formation.contains_key(&Formation::Dit));
        assert_eq!(crate::available_years(&entries), vec![1, 2, 3, 6]);

        let alumni = accessor
            .fetch_entries(&EntryFilters {
                years_since_graduation: [2].into_iter().collect(),
                ..EntryFilters::default()
            })
            .await
            .unwrap();
        assert_eq!(alumni.len(), 2);
    }
}
