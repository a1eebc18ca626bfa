use std::path::PathBuf;
use std::time::Duration;

use crate::error::TollError;

/// Login credentials for one toll portal.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub drive_ez_md: Credentials,
    pub ez_pass_ny: Credentials,
    /// Raw statement downloads land here.
    pub download_dir: PathBuf,
    /// Audit artifacts (statement + parsed transactions) land here.
    pub processed_dir: PathBuf,
    pub database_path: PathBuf,
    pub headless: bool,
    /// Upper bound for download completion and page waits.
    pub timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            drive_ez_md: Credentials::default(),
            ez_pass_ny: Credentials::default(),
            download_dir: PathBuf::from("./data/raw"),
            processed_dir: PathBuf::from("./data/processed"),
            database_path: PathBuf::from("./data/tolls.db"),
            headless: true,
            timeout: Duration::from_secs(60),
        }
    }
}

impl AppConfig {
    /// Build a config from environment variables, falling back to defaults
    /// for anything unset. Credentials are not validated here; that happens
    /// once per run via [`AppConfig::validate_credentials`].
    pub fn from_env() -> Self {
        let env = |key: &str| std::env::var(key).unwrap_or_default();

        let mut config = Self {
            drive_ez_md: Credentials::new(env("DRIVEEZMD_USERNAME"), env("DRIVEEZMD_PASSWORD")),
            ez_pass_ny: Credentials::new(env("EZPASSNY_USERNAME"), env("EZPASSNY_PASSWORD")),
            ..Default::default()
        };

        if let Ok(dir) = std::env::var("DOWNLOAD_DIR") {
            config.download_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("PROCESSED_DIR") {
            config.processed_dir = PathBuf::from(dir);
        }
        if let Ok(path) = std::env::var("DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }

        config
    }

    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    pub fn with_processed_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.processed_dir = dir.into();
        self
    }

    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = path.into();
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Precondition check run once before any provider is touched. Missing
    /// credentials abort the whole run, not a single provider.
    pub fn validate_credentials(&self) -> Result<(), TollError> {
        if !self.drive_ez_md.is_complete() {
            return Err(TollError::Configuration(
                "DriveEzMD credentials are not configured; set DRIVEEZMD_USERNAME and DRIVEEZMD_PASSWORD".into(),
            ));
        }
        if !self.ez_pass_ny.is_complete() {
            return Err(TollError::Configuration(
                "E-ZPass NY credentials are not configured; set EZPASSNY_USERNAME and EZPASSNY_PASSWORD".into(),
            ));
        }
        Ok(())
    }

    /// Make sure the download/processed directories exist.
    pub fn ensure_dirs(&self) -> Result<(), TollError> {
        std::fs::create_dir_all(&self.download_dir)?;
        std::fs::create_dir_all(&self.processed_dir)?;
        Ok(())
    }
}
