use std::collections::BTreeMap;

use crate::filter::filter_for_calculations;
use crate::models::{CrossTabRow, MetricsSnapshot, Preferences, SalaryBucket, SalaryRecord};
use crate::stats::{compute_average, compute_median, rounded_div};

/// Lower bounds of the histogram buckets after the first; the first bucket
/// covers everything below `HISTOGRAM_BOUNDS[0]` and the last is open-ended.
pub const HISTOGRAM_BOUNDS: [i64; 8] = [
    100_000, 200_000, 300_000, 400_000, 500_000, 600_000, 700_000, 800_000,
];

fn thousands(amount: i64) -> String {
    format!("{}k", amount / 1_000)
}

pub fn empty_histogram() -> Vec<SalaryBucket> {
    let mut buckets = Vec::with_capacity(HISTOGRAM_BOUNDS.len() + 1);
    buckets.push(SalaryBucket {
        label: format!("< {}", thousands(HISTOGRAM_BOUNDS[0])),
        min: 0,
        max: Some(HISTOGRAM_BOUNDS[0] - 1),
        count: 0,
    });

    for window in HISTOGRAM_BOUNDS.windows(2) {
        buckets.push(SalaryBucket {
            label: format!("{}-{}", thousands(window[0]), thousands(window[1])),
            min: window[0],
            max: Some(window[1] - 1),
            count: 0,
        });
    }

    let last = HISTOGRAM_BOUNDS[HISTOGRAM_BOUNDS.len() - 1];
    buckets.push(SalaryBucket {
        label: format!("{}+", thousands(last)),
        min: last,
        max: None,
        count: 0,
    });
    buckets
}

pub fn bucket_index(salary: i64) -> usize {
    HISTOGRAM_BOUNDS
        .iter()
        .take_while(|bound| salary >= **bound)
        .count()
}

pub fn salary_histogram(records: &[SalaryRecord]) -> Vec<SalaryBucket> {
    let mut buckets = empty_histogram();
    for record in records {
        buckets[bucket_index(record.salary)].count += 1;
    }
    buckets
}

fn tally<K: Ord>(
    records: &[SalaryRecord],
    key: impl Fn(&SalaryRecord) -> K,
) -> BTreeMap<K, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(key(record)).or_insert(0) += 1;
    }
    counts
}

fn sums<K: Ord>(
    records: &[SalaryRecord],
    key: impl Fn(&SalaryRecord) -> K,
) -> BTreeMap<K, (i128, usize)> {
    let mut totals: BTreeMap<K, (i128, usize)> = BTreeMap::new();
    for record in records {
        let entry = totals.entry(key(record)).or_insert((0, 0));
        entry.0 += i128::from(record.salary);
        entry.1 += 1;
    }
    totals
}

/// Rounded mean per group. Groups without eligible members never appear.
fn averages<K: Ord>(
    records: &[SalaryRecord],
    key: impl Fn(&SalaryRecord) -> K,
) -> BTreeMap<K, i64> {
    sums(records, key)
        .into_iter()
        .map(|(group, (total, count))| (group, rounded_div(total, count as i128)))
        .collect()
}

pub fn specialty_by_formation(records: &[SalaryRecord]) -> Vec<CrossTabRow> {
    sums(records, |record| (record.specialty, record.formation))
        .into_iter()
        .map(|((specialty, formation), (total, count))| CrossTabRow {
            specialty,
            formation,
            average_salary: rounded_div(total, count as i128),
            count,
        })
        .collect()
}

/// Full set newest first; ties fall back to id so the order is stable.
pub fn recent_entries(records: &[SalaryRecord]) -> Vec<SalaryRecord> {
    let mut recent = records.to_vec();
    recent.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
    recent
}

/// Builds the dashboard snapshot from the full annotated set. Numeric
/// aggregates use the eligible subset; `recent_entries` keeps every record.
pub fn compute_metrics(records: &[SalaryRecord], preferences: &Preferences) -> MetricsSnapshot {
    let eligible = filter_for_calculations(records, preferences);

    MetricsSnapshot {
        total_participants: eligible.len(),
        flagged_count: records.iter().filter(|record| record.is_outlier).count(),
        excluded_count: records.len() - eligible.len(),
        average_salary: compute_average(&eligible),
        median_salary: compute_median(&eligible),
        average_by_formation: averages(&eligible, |record| record.formation),
        average_by_specialty: averages(&eligible, |record| record.specialty),
        average_by_contract: averages(&eligible, |record| record.contract_type),
        count_by_formation: tally(&eligible, |record| record.formation),
        count_by_specialty: tally(&eligible, |record| record.specialty),
        count_by_participant: tally(&eligible, |record| record.participant_type),
        salary_histogram: salary_histogram(&eligible),
        specialty_by_formation: specialty_by_formation(&eligible),
        recent_entries: recent_entries(records),
    }
}
