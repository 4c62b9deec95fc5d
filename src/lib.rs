//! Aggregate statistics over anonymous salary submissions: outlier
//! detection, exclusion filtering and grouped dashboard metrics.

pub mod accessor;
pub mod config;
pub mod db;
pub mod error;
pub mod filter;
pub mod metrics;
pub mod models;
pub mod normalize;
pub mod outliers;
pub mod report;
pub mod stats;
pub mod store;

pub use accessor::EntryStoreAccessor;
pub use error::{DataAccessError, SubmissionError};
pub use filter::filter_for_calculations;
pub use metrics::compute_metrics;
pub use models::{EntryFilters, MetricsSnapshot, NewSalaryRecord, Preferences, SalaryRecord};
pub use outliers::{detect_outliers, detect_outliers_with, OutlierRules};
pub use stats::{available_years, compute_average, compute_median};
