pub mod config;
pub mod info;
pub mod masters;
pub mod reduce;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use ganymede_core::io::discovery::latest_date_folder;
use ganymede_core::pipeline::ReductionConfig;

/// Options shared by the batch jobs.
#[derive(Args)]
pub struct RunArgs {
    /// Config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Date folder to process instead of the most recent one
    #[arg(long)]
    pub date: Option<String>,

    /// Master calibration directory
    #[arg(long)]
    pub masters_dir: Option<PathBuf>,

    /// Audit log file
    #[arg(long)]
    pub audit_log: Option<PathBuf>,
}

impl RunArgs {
    /// Config from `--config` (or defaults) with command-line overrides applied.
    pub fn load_config(&self) -> Result<ReductionConfig> {
        let mut config: ReductionConfig = if let Some(ref config_path) = self.config {
            let contents = std::fs::read_to_string(config_path)
                .with_context(|| format!("Failed to read config {}", config_path.display()))?;
            toml::from_str(&contents).context("Invalid reduction config")?
        } else {
            ReductionConfig::default()
        };

        if let Some(ref dir) = self.masters_dir {
            config.paths.masters_dir = dir.clone();
        }
        if let Some(ref log) = self.audit_log {
            config.paths.audit_log = log.clone();
        }
        Ok(config)
    }

    /// The date folder under `root` this run works on.
    pub fn date_folder(&self, root: &Path) -> Result<PathBuf> {
        match self.date {
            Some(ref date) => {
                let dir = root.join(date);
                anyhow::ensure!(dir.is_dir(), "Date folder {} does not exist", dir.display());
                Ok(dir)
            }
            None => latest_date_folder(root)
                .with_context(|| format!("No date folder found under {}", root.display())),
        }
    }
}
