//! Init command implementation

use crate::config::Config;
use crate::error::{Error, Result};
use std::path::PathBuf;
use tracing::info;

/// Write a default config under `base_dir` and create the data directory.
///
/// Refuses to overwrite an existing config unless `force` is set.
pub fn cmd_init(base_dir: Option<PathBuf>, force: bool) -> Result<Config> {
    let mut config = Config::default();
    config.init_paths(base_dir);

    if config.paths.config_file.exists() && !force {
        return Err(Error::AlreadyInitialized(
            config.paths.config_file.display().to_string(),
        ));
    }

    config.save()?;
    std::fs::create_dir_all(config.data_dir())?;
    info!("Created data directory at {:?}", config.data_dir());

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_layout() {
        let tmp = TempDir::new().unwrap();
        let config = cmd_init(Some(tmp.path().to_path_buf()), false).unwrap();

        assert!(config.paths.config_file.exists());
        assert!(tmp.path().join("data").is_dir());

        let loaded = Config::load(&config.paths.config_file).unwrap();
        assert_eq!(loaded.retrieval.k, config.retrieval.k);
        assert_eq!(loaded.chunk.chunk_size, 800);
    }

    #[test]
    fn test_init_refuses_overwrite_without_force() {
        let tmp = TempDir::new().unwrap();
        cmd_init(Some(tmp.path().to_path_buf()), false).unwrap();

        let err = cmd_init(Some(tmp.path().to_path_buf()), false).unwrap_err();
        assert!(matches!(err, Error::AlreadyInitialized(_)));
        assert!(cmd_init(Some(tmp.path().to_path_buf()), true).is_ok());
    }
}
