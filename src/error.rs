use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataAccessError {
    #[error("entry store query failed: {0}")]
    Query(#[from] sqlx::Error),
    #[error("schema migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("entry store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("invalid submission: {0}")]
    Invalid(String),
    #[error(transparent)]
    DataAccess(#[from] DataAccessError),
}
