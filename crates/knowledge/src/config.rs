//! Knowledge configuration management.

use crate::types::KnowledgeConfig;
use assistant_core::config::STATE_DIR;
use assistant_core::{AppError, AppResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Load knowledge configuration.
///
/// Loads from `.assistant/knowledge.yaml` if it exists, otherwise returns
/// the defaults.
pub fn load_config(workspace: &Path) -> AppResult<KnowledgeConfig> {
    let config_path = get_config_path(workspace);

    if !config_path.exists() {
        tracing::debug!("Using default knowledge config (no config file found)");
        return Ok(KnowledgeConfig::default());
    }

    let content = fs::read_to_string(&config_path).map_err(|e| {
        AppError::Config(format!("Failed to read config at {:?}: {}", config_path, e))
    })?;

    let config: KnowledgeConfig = serde_yaml::from_str(&content).map_err(|e| {
        AppError::Config(format!("Failed to parse config at {:?}: {}", config_path, e))
    })?;

    if config.top_k == 0 {
        return Err(AppError::Config(format!(
            "top_k in {:?} must be at least 1",
            config_path
        )));
    }

    tracing::debug!("Loaded knowledge config from {:?}", config_path);
    Ok(config)
}

/// Save knowledge configuration.
pub fn save_config(workspace: &Path, config: &KnowledgeConfig) -> AppResult<()> {
    let config_path = get_config_path(workspace);

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            AppError::Config(format!("Failed to create config directory: {}", e))
        })?;
    }

    let yaml = serde_yaml::to_string(config)?;

    fs::write(&config_path, yaml).map_err(|e| {
        AppError::Config(format!("Failed to write config to {:?}: {}", config_path, e))
    })?;

    tracing::debug!("Saved knowledge config to {:?}", config_path);
    Ok(())
}

/// Get the path to the knowledge config file.
pub fn get_config_path(workspace: &Path) -> PathBuf {
    workspace.join(STATE_DIR).join("knowledge.yaml")
}

/// Resolve a configured path against the workspace root.
pub fn resolve_path(workspace: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workspace.join(path)
    }
}

/// Absolute path of the record store database.
pub fn get_database_path(workspace: &Path, config: &KnowledgeConfig) -> PathBuf {
    resolve_path(workspace, &config.database)
}

/// Absolute path of the persisted index directory.
pub fn get_index_path(workspace: &Path, config: &KnowledgeConfig) -> PathBuf {
    resolve_path(workspace, &config.index_location)
}
