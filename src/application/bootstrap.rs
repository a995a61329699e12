use crate::infrastructure::config::{ensure_default_configs, load_configs, ConfigBundle};
use crate::infrastructure::error::InfraError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug)]
pub struct BootstrapResult {
    pub workspace_root: PathBuf,
    pub config_dir: PathBuf,
    pub config: ConfigBundle,
}

pub fn bootstrap_workspace(workspace_root: &Path) -> Result<BootstrapResult, InfraError> {
    let config_dir = workspace_root.join("config");
    fs::create_dir_all(&config_dir)?;

    ensure_default_configs(&config_dir)?;
    let config = load_configs(&config_dir)?;
    info!(config_dir = %config_dir.display(), "workspace ready");

    Ok(BootstrapResult {
        workspace_root: workspace_root.to_path_buf(),
        config_dir,
        config,
    })
}
