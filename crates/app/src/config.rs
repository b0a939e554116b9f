use anyhow::{Context, Result};
use checkbook_core::SortOrder;
use checkbook_import::ProfileRegistry;
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "checkbook.toml";
pub const DB_FILE: &str = "ledger.db";
pub const MIRROR_FILE: &str = "ledger-mirror.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Where `ledger.db` and the mirror live. Defaults to the platform data
    /// directory.
    pub data_dir: Option<PathBuf>,
    /// TOML file with extra `[[profile]]` CSV layouts.
    pub profiles: Option<PathBuf>,
    /// Register order used until one is chosen on the command line.
    pub default_order: Option<SortOrder>,
}

/// On-disk locations inside the data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub dir: PathBuf,
    pub db: PathBuf,
    pub mirror: PathBuf,
}

impl DataPaths {
    pub fn new(dir: PathBuf) -> Self {
        DataPaths {
            db: dir.join(DB_FILE),
            mirror: dir.join(MIRROR_FILE),
            dir,
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "checkbook", "Checkbook")
}

impl AppConfig {
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse checkbook configuration")
    }

    /// Relative paths in the file are resolved against the file's directory.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config = Self::from_toml(&contents)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        let base_dir = path.parent().map(ToOwned::to_owned).unwrap_or_default();
        config.data_dir = config.data_dir.map(|p| base_dir.join(p));
        config.profiles = config.profiles.map(|p| base_dir.join(p));
        Ok(config)
    }

    /// Loads `explicit` if given, otherwise `checkbook.toml` from the platform
    /// config directory when it exists, otherwise the defaults.
    pub fn find_and_load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_file(path);
        }

        let Some(dirs) = project_dirs() else {
            return Ok(Self::default());
        };
        let path = dirs.config_dir().join(CONFIG_FILE);
        if path.exists() {
            Self::load_from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// `--data-dir` beats the config file, which beats the platform default.
    pub fn data_paths(&self, override_dir: Option<PathBuf>) -> Result<DataPaths> {
        let dir = match override_dir.or_else(|| self.data_dir.clone()) {
            Some(dir) => dir,
            None => project_dirs()
                .map(|d| d.data_dir().to_path_buf())
                .context("No home directory found; pass --data-dir")?,
        };
        Ok(DataPaths::new(dir))
    }

    pub fn load_profiles(&self) -> Result<ProfileRegistry> {
        let Some(path) = &self.profiles else {
            return Ok(ProfileRegistry::builtin());
        };
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read CSV profiles: {}", path.display()))?;
        ProfileRegistry::builtin_with_toml(&contents)
            .with_context(|| format!("Invalid CSV profiles: {}", path.display()))
    }
}
