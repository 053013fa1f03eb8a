use std::path::PathBuf;
use std::sync::Arc;

use crate::app::error::{PricelensError, Result};
use crate::config::Config;
use crate::store::SqliteSink;

pub struct AppContext {
    pub config: Config,
    pub store: Arc<SqliteSink>,
}

impl AppContext {
    /// Open the row database. `db_path` wins over the configured path, which
    /// wins over the platform data directory.
    pub fn new(config: Config, db_path: Option<PathBuf>) -> Result<Self> {
        let db_path = match db_path.or_else(|| config.sink.db_path.clone()) {
            Some(p) => p,
            None => Self::default_db_path()?,
        };

        let store = Arc::new(SqliteSink::new(&db_path)?);
        Ok(Self { config, store })
    }

    pub fn in_memory(config: Config) -> Result<Self> {
        let store = Arc::new(SqliteSink::in_memory()?);
        Ok(Self { config, store })
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| PricelensError::Config("Could not find data directory".into()))?;
        let pricelens_dir = data_dir.join("pricelens");
        std::fs::create_dir_all(&pricelens_dir)?;
        Ok(pricelens_dir.join("pricelens.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins_over_config() {
        let dir = tempfile::tempdir().unwrap();
        let configured = dir.path().join("configured.db");
        let explicit = dir.path().join("explicit.db");

        let mut config = Config::default();
        config.sink.db_path = Some(configured.clone());

        AppContext::new(config.clone(), Some(explicit.clone())).unwrap();
        assert!(explicit.exists());
        assert!(!configured.exists());

        AppContext::new(config, None).unwrap();
        assert!(configured.exists());
    }
}
