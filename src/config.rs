use std::path::Path;

use anyhow::Context;

use crate::outliers::OutlierRules;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub rules: OutlierRules,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests can avoid the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let max_connections = match lookup("SALARY_BOARD_MAX_CONNECTIONS") {
            Some(value) => value
                .trim()
                .parse()
                .with_context(|| format!("SALARY_BOARD_MAX_CONNECTIONS is not a number: {value}"))?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let rules = match lookup("SALARY_BOARD_RULES") {
            Some(path) => load_rules(Path::new(&path))?,
            None => OutlierRules::default(),
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            max_connections,
            rules,
        })
    }

    pub fn require_database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL must be set to a production Postgres instance")
    }
}

pub fn load_rules(path: &Path) -> anyhow::Result<OutlierRules> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read outlier rules from {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("invalid outlier rules in {}", path.display()))
}
