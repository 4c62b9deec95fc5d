use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub field: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} value {:?}", self.field, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

/// Declares a closed label set with its canonical labels and a lenient parser.
macro_rules! label_enum {
    (
        $name:ident, $field:literal {
            $($variant:ident => $label:literal $(| $alias:literal)*),+ $(,)?
        }
    ) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                let trimmed = value.trim();
                $(
                    if trimmed.eq_ignore_ascii_case($label)
                        $(|| trimmed.eq_ignore_ascii_case($alias))*
                    {
                        return Ok($name::$variant);
                    }
                )+
                Err(UnknownVariant {
                    field: $field,
                    value: value.to_string(),
                })
            }
        }
    };
}

label_enum!(Formation, "formation" {
    Master => "Master",
    Dic => "DIC",
    Dit => "DIT",
    Telecom => "TELECOM",
});

label_enum!(Specialty, "specialty" {
    Ssi => "SSI",
    Iabd => "IABD",
    Info => "INFO",
});

label_enum!(ContractType, "contract type" {
    Stage => "Stage",
    Alternance => "Alternance",
    Cdd => "CDD",
    Cdi => "CDI",
    Prestation => "Prestation de service" | "Prestation",
});

label_enum!(ParticipantType, "participant type" {
    Etudiant => "Étudiant" | "Etudiant" | "étudiant",
    Alumni => "Alumni",
});

/// One anonymous salary submission, plus the transient outlier annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub formation: Formation,
    pub specialty: Specialty,
    pub contract_type: ContractType,
    pub salary: i64,
    pub participant_type: ParticipantType,
    pub job_title: Option<String>,
    pub job_description: Option<String>,
    pub years_since_graduation: Option<u32>,
    #[serde(default)]
    pub is_outlier: bool,
    #[serde(default)]
    pub outlier_reason: Option<String>,
}

/// Payload accepted by the insert side of the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSalaryRecord {
    pub formation: Formation,
    pub specialty: Specialty,
    pub contract_type: ContractType,
    pub salary: i64,
    pub participant_type: ParticipantType,
    pub job_title: Option<String>,
    pub job_description: Option<String>,
    pub years_since_graduation: Option<u32>,
}

/// Query-side filters pushed down to the entry store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFilters {
    pub formation: Option<Formation>,
    pub specialty: Option<Specialty>,
    pub contract_type: Option<ContractType>,
    pub participant_type: Option<ParticipantType>,
    pub years_since_graduation: BTreeSet<u32>,
}

/// Exclusion preferences for one dashboard session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preferences {
    pub exclude_outliers: bool,
    pub excluded_ids: HashSet<Uuid>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            exclude_outliers: true,
            excluded_ids: HashSet::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalaryBucket {
    pub label: String,
    pub min: i64,
    pub max: Option<i64>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrossTabRow {
    pub specialty: Specialty,
    pub formation: Formation,
    pub average_salary: i64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub total_participants: usize,
    pub flagged_count: usize,
    pub excluded_count: usize,
    pub average_salary: i64,
    pub median_salary: i64,
    pub average_by_formation: BTreeMap<Formation, i64>,
    pub average_by_specialty: BTreeMap<Specialty, i64>,
    pub average_by_contract: BTreeMap<ContractType, i64>,
    pub count_by_formation: BTreeMap<Formation, usize>,
    pub count_by_specialty: BTreeMap<Specialty, usize>,
    pub count_by_participant: BTreeMap<ParticipantType, usize>,
    pub salary_histogram: Vec<SalaryBucket>,
    pub specialty_by_formation: Vec<CrossTabRow>,
    pub recent_entries: Vec<SalaryRecord>,
}
