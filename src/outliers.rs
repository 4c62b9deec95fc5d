use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use tracing::debug;

use crate::models::{ContractType, Formation, SalaryRecord, Specialty};
use crate::stats::median_of;

pub const SALARY_FLOOR: i64 = 50_000;
pub const SALARY_CEILING: i64 = 2_000_000;
pub const STAGE_CEILING: i64 = 500_000;
pub const ALTERNANCE_CEILING: i64 = 600_000;
pub const CDD_CEILING: i64 = 1_500_000;
pub const CDI_CEILING: i64 = 2_000_000;
pub const PRESTATION_CEILING: i64 = 2_000_000;
pub const MIN_GROUP_SIZE: usize = 3;
pub const LOW_RATIO_DIVISOR: f64 = 3.0;
pub const HIGH_RATIO_MULTIPLIER: f64 = 2.5;

/// Thresholds for both heuristics. Deserialises from a partial JSON object;
/// any key left out keeps its default.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutlierRules {
    pub floor: i64,
    pub ceiling: i64,
    pub contract_ceilings: BTreeMap<ContractType, i64>,
    pub min_group_size: usize,
    pub low_ratio_divisor: f64,
    pub high_ratio_multiplier: f64,
}

impl Default for OutlierRules {
    fn default() -> Self {
        Self {
            floor: SALARY_FLOOR,
            ceiling: SALARY_CEILING,
            contract_ceilings: BTreeMap::from([
                (ContractType::Stage, STAGE_CEILING),
                (ContractType::Alternance, ALTERNANCE_CEILING),
                (ContractType::Cdd, CDD_CEILING),
                (ContractType::Cdi, CDI_CEILING),
                (ContractType::Prestation, PRESTATION_CEILING),
            ]),
            min_group_size: MIN_GROUP_SIZE,
            low_ratio_divisor: LOW_RATIO_DIVISOR,
            high_ratio_multiplier: HIGH_RATIO_MULTIPLIER,
        }
    }
}

impl OutlierRules {
    /// Floor, then global ceiling, then contract ceiling. First violation wins.
    pub fn absolute_violation(&self, record: &SalaryRecord) -> Option<String> {
        if record.salary < self.floor {
            return Some(format!(
                "salary {} is below the minimum of {}",
                record.salary, self.floor
            ));
        }
        if record.salary > self.ceiling {
            return Some(format!(
                "salary {} is above the maximum of {}",
                record.salary, self.ceiling
            ));
        }
        match self.contract_ceilings.get(&record.contract_type) {
            Some(limit) if record.salary > *limit => Some(format!(
                "salary {} is above the {} maximum of {}",
                record.salary, record.contract_type, limit
            )),
            _ => None,
        }
    }

    pub fn relative_violation(&self, record: &SalaryRecord, group_median: i64) -> Option<String> {
        let median = group_median as f64;
        let salary = record.salary as f64;

        if salary < median / self.low_ratio_divisor {
            Some(format!(
                "salary {} is far below the group median of {}",
                record.salary, group_median
            ))
        } else if salary > median * self.high_ratio_multiplier {
            Some(format!(
                "salary {} is far above the group median of {}",
                record.salary, group_median
            ))
        } else {
            None
        }
    }
}

type GroupKey = (Formation, Specialty, ContractType);

fn group_key(record: &SalaryRecord) -> GroupKey {
    (record.formation, record.specialty, record.contract_type)
}

/// Medians of every (formation, specialty, contract) group with enough members.
pub fn group_medians(records: &[SalaryRecord], min_group_size: usize) -> HashMap<GroupKey, i64> {
    let mut groups: HashMap<GroupKey, Vec<i64>> = HashMap::new();
    for record in records {
        groups.entry(group_key(record)).or_default().push(record.salary);
    }

    groups
        .into_iter()
        .filter(|(_, amounts)| amounts.len() >= min_group_size)
        .map(|(key, amounts)| {
            let median = median_of(&amounts);
            debug!(
                formation = %key.0,
                specialty = %key.1,
                contract = %key.2,
                members = amounts.len(),
                median,
                "group median"
            );
            (key, median)
        })
        .collect()
}

pub fn detect_outliers(records: &[SalaryRecord]) -> Vec<SalaryRecord> {
    detect_outliers_with(&OutlierRules::default(), records)
}

/// Returns annotated copies of `records`. Prior annotations are ignored, so
/// running this twice yields the same result.
pub fn detect_outliers_with(rules: &OutlierRules, records: &[SalaryRecord]) -> Vec<SalaryRecord> {
    let medians = group_medians(records, rules.min_group_size);

    records
        .iter()
        .map(|record| {
            let reason = rules.absolute_violation(record).or_else(|| {
                medians
                    .get(&group_key(record))
                    .and_then(|median| rules.relative_violation(record, *median))
            });

            SalaryRecord {
                is_outlier: reason.is_some(),
                outlier_reason: reason,
                ..record.clone()
            }
        })
        .collect()
}
