use crate::models::{Preferences, SalaryRecord};

/// The subset used for every numeric aggregate: flagged entries are dropped
/// when `exclude_outliers` is set, and explicitly excluded ids always are.
pub fn filter_for_calculations(
    records: &[SalaryRecord],
    preferences: &Preferences,
) -> Vec<SalaryRecord> {
    records
        .iter()
        .filter(|record| !(preferences.exclude_outliers && record.is_outlier))
        .filter(|record| !preferences.excluded_ids.contains(&record.id))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use uuid::Uuid;

    use super::*;
    use crate::outliers::detect_outliers;
    use crate::stats::fixtures::cdi_ssi_master;

    fn ids(records: &[SalaryRecord]) -> HashSet<Uuid> {
        records.iter().map(|record| record.id).collect()
    }

    #[test]
    fn drops_flagged_entries_by_default() {
        let annotated =
            detect_outliers(&cdi_ssi_master(&[200_000, 210_000, 190_000, 205_000, 1_900_000]));
        let eligible = filter_for_calculations(&annotated, &Preferences::default());
        assert_eq!(eligible.len(), 4);
        assert!(eligible.iter().all(|r| !r.is_outlier));
    }

    #[test]
    fn keeps_flagged_entries_when_toggle_is_off() {
        let annotated = detect_outliers(&cdi_ssi_master(&[40_000, 200_000]));
        let prefs = Preferences {
            exclude_outliers: false,
            ..Preferences::default()
        };
        assert_eq!(filter_for_calculations(&annotated, &prefs).len(), 2);
    }

    #[test]
    fn explicit_exclusions_apply_regardless_of_flag() {
        let annotated = detect_outliers(&cdi_ssi_master(&[200_000, 210_000, 40_000]));
        let prefs = Preferences {
            exclude_outliers: false,
            excluded_ids: HashSet::from([annotated[0].id, annotated[2].id]),
        };
        let eligible = filter_for_calculations(&annotated, &prefs);
        assert_eq!(ids(&eligible), HashSet::from([annotated[1].id]));
    }

    #[test]
    fn both_filters_compose_as_intersection() {
        let annotated = detect_outliers(&cdi_ssi_master(&[
            200_000, 210_000, 190_000, 205_000, 1_900_000, 40_000,
        ]));
        let excluded = HashSet::from([annotated[1].id, annotated[4].id]);
        let prefs = Preferences {
            exclude_outliers: true,
            excluded_ids: excluded.clone(),
        };

        let expected: HashSet<Uuid> = annotated
            .iter()
            .filter(|r| !r.is_outlier && !excluded.contains(&r.id))
            .map(|r| r.id)
            .collect();
        assert_eq!(ids(&filter_for_calculations(&annotated, &prefs)), expected);
        assert_eq!(expected.len(), 3);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(filter_for_calculations(&[], &Preferences::default()).is_empty());
    }
}
