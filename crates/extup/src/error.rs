use extup_core::{ConfigError, UpdateErrorKind};
use extup_host::HostError;
use extup_platform::AppPathsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Paths(#[from] AppPathsError),

    #[error("Extension configuration is invalid: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Settings {action} failed: {source}")]
    Settings {
        action: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Settings file {} is malformed: {source}", path.display())]
    SettingsParse {
        path: std::path::PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Settings file already exists: {}", path.display())]
    SettingsExist { path: std::path::PathBuf },

    #[error("Update check failed: {kind}")]
    CheckFailed { kind: UpdateErrorKind },

    #[error("Update install failed: {kind}")]
    InstallFailed { kind: UpdateErrorKind },

    #[error("Update install failed: {0}")]
    HostInstall(#[source] HostError),
}

impl AppError {
    pub fn settings(action: &'static str, source: std::io::Error) -> Self {
        Self::Settings { action, source }
    }
}
