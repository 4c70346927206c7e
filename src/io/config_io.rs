use std::fs;
use std::path::{Path, PathBuf};

use crate::model::config::EngineConfig;

/// Default config file name, looked up next to the task store
pub const CONFIG_FILE: &str = "taskboard.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Read and validate the config at `path`. A missing file yields the defaults.
pub fn read_config(path: &Path) -> Result<EngineConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file; using defaults");
        return Ok(EngineConfig::default());
    }
    let text = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let config: EngineConfig = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &EngineConfig) -> Result<(), ConfigError> {
    if config.drag.activation_distance < 0.0 {
        return Err(ConfigError::Invalid("drag.activation_distance must not be negative".into()));
    }
    if config.timeline.day_width <= 0.0 {
        return Err(ConfigError::Invalid("timeline.day_width must be positive".into()));
    }
    if config.viewport.row_height <= 0.0 {
        return Err(ConfigError::Invalid("viewport.row_height must be positive".into()));
    }
    if config.remote.page_size == 0 || config.remote.bulk_limit == 0 {
        return Err(ConfigError::Invalid("remote.page_size and remote.bulk_limit must be at least 1".into()));
    }
    if config.board.visible_columns().next().is_none() {
        return Err(ConfigError::Invalid("board needs at least one visible column".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::TaskStatus;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = read_config(&tmp.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        fs::write(
            &path,
            r#"[drag]
activation_distance = 4.0

[[board.columns]]
id = "doing"
title = "Doing"
status = "in_progress"
"#,
        )
        .unwrap();
        let config = read_config(&path).unwrap();
        assert_eq!(config.drag.activation_distance, 4.0);
        assert_eq!(config.timeline.day_width, 100.0);
        assert_eq!(config.board.columns.len(), 1);
        assert!(config.board.columns[0].visible);
        assert_eq!(config.board.columns[0].status, TaskStatus::InProgress);
    }

    #[test]
    fn rejects_all_hidden_columns() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        fs::write(
            &path,
            r#"[[board.columns]]
id = "todo"
title = "To Do"
status = "todo"
visible = false
"#,
        )
        .unwrap();
        assert!(matches!(read_config(&path), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn parse_error_names_the_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        fs::write(&path, "[timeline]\nday_width = \"wide\"\n").unwrap();
        let err = read_config(&path).unwrap_err();
        assert!(err.to_string().contains("taskboard.toml"));
    }
}
