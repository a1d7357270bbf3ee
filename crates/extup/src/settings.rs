use std::path::{Path, PathBuf};
use std::time::Duration;

use extup_core::{CheckFailPolicy, PackageManifest, RemoteConfig, UpdateConfig};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

const MANIFEST_FILE: &str = "package.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostSettings {
    /// Directory holding the extension's `package.json`. Updates are
    /// downloaded below it. Defaults to the working directory.
    #[serde(default)]
    pub extension_dir: Option<PathBuf>,

    /// Name shown in prompts. Defaults to the manifest name.
    #[serde(default)]
    pub friendly_name: Option<String>,

    #[serde(default = "default_true")]
    pub require_user_confirmation: bool,

    #[serde(default)]
    pub force_update_on_tag: Option<String>,

    #[serde(default)]
    pub on_check_fail: CheckFailPolicy,

    #[serde(default = "default_check_interval_ms")]
    pub check_interval_ms: u64,

    #[serde(default)]
    pub registry_override: Option<String>,

    #[serde(default = "default_install_command")]
    pub install_command: Vec<String>,

    #[serde(default)]
    pub reload_command: Option<Vec<String>>,

    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    #[serde(default = "default_install_timeout")]
    pub install_timeout_secs: u64,

    #[serde(default)]
    pub debug_logging: bool,

    #[serde(default = "default_max_log_size_bytes")]
    pub max_log_size_bytes: u64,
}

fn default_true() -> bool {
    true
}

fn default_check_interval_ms() -> u64 {
    3_600_000
}

fn default_install_command() -> Vec<String> {
    vec![
        "code".to_string(),
        "--install-extension".to_string(),
        extup_platform::PATH_PLACEHOLDER.to_string(),
    ]
}

fn default_http_timeout() -> u64 {
    30
}

fn default_install_timeout() -> u64 {
    120
}

fn default_max_log_size_bytes() -> u64 {
    5 * 1024 * 1024
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            extension_dir: None,
            friendly_name: None,
            require_user_confirmation: true,
            force_update_on_tag: None,
            on_check_fail: CheckFailPolicy::default(),
            check_interval_ms: default_check_interval_ms(),
            registry_override: None,
            install_command: default_install_command(),
            reload_command: None,
            http_timeout_secs: default_http_timeout(),
            install_timeout_secs: default_install_timeout(),
            debug_logging: false,
            max_log_size_bytes: default_max_log_size_bytes(),
        }
    }
}

impl HostSettings {
    /// Read settings from `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, AppError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(error) => return Err(AppError::settings("read", error)),
        };
        serde_json::from_str(&content).map_err(|source| AppError::SettingsParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save_to(&self, path: &Path) -> Result<(), AppError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| AppError::settings("create", error))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|error| AppError::settings("serialize", std::io::Error::other(error)))?;
        std::fs::write(path, content).map_err(|error| AppError::settings("write", error))
    }

    pub fn extension_dir(&self) -> PathBuf {
        self.extension_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn install_timeout(&self) -> Duration {
        Duration::from_secs(self.install_timeout_secs)
    }

    /// Build the updater configuration from the extension's manifest.
    pub fn update_config(&self) -> Result<UpdateConfig, AppError> {
        let root = self.extension_dir();
        let manifest = PackageManifest::load(&root.join(MANIFEST_FILE))?;
        let friendly_name = self
            .friendly_name
            .clone()
            .unwrap_or_else(|| manifest.name.clone());

        let mut remote = RemoteConfig::new(manifest, root);
        if let Some(registry) = &self.registry_override {
            remote = remote.with_registry_override(registry.clone());
        }

        let mut config = UpdateConfig::new(friendly_name, remote)
            .require_user_confirmation(self.require_user_confirmation)
            .on_check_fail(self.on_check_fail)
            .check_interval(Duration::from_millis(self.check_interval_ms));
        if let Some(tag) = &self.force_update_on_tag {
            config = config.force_update_on_tag(tag.clone());
        }
        Ok(config)
    }
}
