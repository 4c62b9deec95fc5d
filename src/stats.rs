use std::collections::BTreeSet;

use crate::models::SalaryRecord;

/// Integer division rounded half-up, so `rounded_div(5, 2) == 3`. Sums are
/// carried in `i128` so totals of large salaries cannot overflow.
pub fn rounded_div(sum: i128, count: i128) -> i64 {
    if count == 0 {
        return 0;
    }
    let rounded = (2 * sum + count).div_euclid(2 * count);
    i64::try_from(rounded).unwrap_or(if rounded < 0 { i64::MIN } else { i64::MAX })
}

/// Median of raw salary amounts. Even-length inputs average the two middle
/// values and round half-up.
pub fn median_of(amounts: &[i64]) -> i64 {
    if amounts.is_empty() {
        return 0;
    }

    let mut sorted = amounts.to_vec();
    sorted.sort_unstable();

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        rounded_div(i128::from(sorted[mid - 1]) + i128::from(sorted[mid]), 2)
    } else {
        sorted[mid]
    }
}

pub fn compute_median(records: &[SalaryRecord]) -> i64 {
    let amounts: Vec<i64> = records.iter().map(|record| record.salary).collect();
    median_of(&amounts)
}

pub fn compute_average(records: &[SalaryRecord]) -> i64 {
    let total: i128 = records.iter().map(|record| i128::from(record.salary)).sum();
    rounded_div(total, records.len() as i128)
}

/// Distinct years-since-graduation values, ascending.
pub fn available_years(records: &[SalaryRecord]) -> Vec<u32> {
    records
        .iter()
        .filter_map(|record| record.years_since_graduation)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    use crate::models::{ContractType, Formation, ParticipantType, SalaryRecord, Specialty};

    pub fn record(
        formation: Formation,
        specialty: Specialty,
        contract_type: ContractType,
        salary: i64,
    ) -> SalaryRecord {
        SalaryRecord {
            id: Uuid::new_v4(),
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
            formation,
            specialty,
            contract_type,
            salary,
            participant_type: ParticipantType::Alumni,
            job_title: None,
            job_description: None,
            years_since_graduation: None,
            is_outlier: false,
            outlier_reason: None,
        }
    }

    pub fn cdi_ssi_master(salaries: &[i64]) -> Vec<SalaryRecord> {
        salaries
            .iter()
            .enumerate()
            .map(|(index, salary)| {
                let mut entry =
                    record(Formation::Master, Specialty::Ssi, ContractType::Cdi, *salary);
                entry.created_at += Duration::hours(index as i64);
                entry
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::cdi_ssi_master;
    use super::*;

    #[test]
    fn median_of_empty_is_zero() {
        assert_eq!(compute_median(&[]), 0);
        assert_eq!(compute_average(&[]), 0);
    }

    #[test]
    fn median_takes_middle_for_odd_counts() {
        let records = cdi_ssi_master(&[200_000, 210_000, 190_000, 205_000, 1_900_000]);
        assert_eq!(compute_median(&records), 205_000);
    }

    #[test]
    fn median_rounds_half_up_for_even_counts() {
        assert_eq!(median_of(&[100_001, 100_000]), 100_001);
        assert_eq!(median_of(&[300_000, 100_000, 200_000, 400_000]), 250_000);
    }

    #[test]
    fn average_rounds_to_nearest_integer() {
        let records = cdi_ssi_master(&[100_000, 100_001]);
        assert_eq!(compute_average(&records), 100_001);
        let records = cdi_ssi_master(&[200_000, 210_000, 190_000, 205_000]);
        assert_eq!(compute_average(&records), 201_250);
    }

    #[test]
    fn rounded_div_matches_half_up() {
        assert_eq!(rounded_div(7, 2), 4);
        assert_eq!(rounded_div(10, 4), 3);
        assert_eq!(rounded_div(9, 4), 2);
        assert_eq!(rounded_div(1, 0), 0);
    }

    #[test]
    fn huge_salaries_do_not_overflow() {
        assert_eq!(
            median_of(&[4_000_000_000_000_000_000, 4_000_000_000_000_000_002]),
            4_000_000_000_000_000_001
        );
        assert_eq!(median_of(&[i64::MAX, i64::MAX]), i64::MAX);

        let records = cdi_ssi_master(&[i64::MAX, i64::MAX, i64::MAX]);
        assert_eq!(compute_average(&records), i64::MAX);
        assert_eq!(compute_median(&records), i64::MAX);
    }

    #[test]
    fn available_years_are_distinct_and_sorted() {
        let mut records = cdi_ssi_master(&[200_000, 210_000, 190_000, 205_000]);
        records[0].years_since_graduation = Some(3);
        records[1].years_since_graduation = Some(1);
        records[2].years_since_graduation = Some(3);
        assert_eq!(available_years(&records), vec![1, 3]);
        assert!(available_years(&[]).is_empty());
    }
}
