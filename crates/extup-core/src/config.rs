use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::decision::UpdateCheck;
use crate::error::ConfigError;
use crate::version::{SemverComparator, VersionComparator};

/// One hour.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_millis(3_600_000);

const UPDATES_DIR: &str = "auto-updates";

/// The parts of the extension's own `package.json` the updater reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_config: Option<PublishConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishConfig {
    #[serde(default)]
    pub registry: String,
}

impl PackageManifest {
    /// Read a manifest from a `package.json` file.
    ///
    /// # Errors
    /// Returns an error when the file cannot be read or is not valid JSON.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ManifestRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::ManifestParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Where to look for updates and where to put them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub manifest: PackageManifest,
    /// Root directory of the installed extension. Downloads land under
    /// `auto-updates/` inside it.
    pub extension_root: PathBuf,
    /// Registry base URL used instead of `publishConfig.registry`.
    pub registry_override: Option<String>,
}

impl RemoteConfig {
    #[must_use]
    pub fn new(manifest: PackageManifest, extension_root: impl Into<PathBuf>) -> Self {
        Self {
            manifest,
            extension_root: extension_root.into(),
            registry_override: None,
        }
    }

    #[must_use]
    pub fn with_registry_override(mut self, registry: impl Into<String>) -> Self {
        self.registry_override = Some(registry.into());
        self
    }

    #[must_use]
    pub fn current_version(&self) -> &str {
        &self.manifest.version
    }

    /// Directory a given version is extracted into, e.g. `auto-updates/1-2-0`.
    ///
    /// The version comes from the registry, so it is reduced to a single
    /// path component that always stays below `auto-updates/`.
    #[must_use]
    pub fn update_dir(&self, version: &str) -> PathBuf {
        self.extension_root
            .join(UPDATES_DIR)
            .join(version_dir_name(version))
    }
}

/// Every character outside `[A-Za-z0-9_+-]`, dots and separators included,
/// becomes `-`.
fn version_dir_name(version: &str) -> String {
    let name: String = version
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect();
    if name.is_empty() { "-".to_string() } else { name }
}

/// Whether a failed check is shown to the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckFailPolicy {
    Notify,
    /// Being offline should not warrant a warning.
    #[default]
    Ignore,
}

/// Answer of an [`UpdateAvailableCallback`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CallbackDecision {
    /// Skip this update.
    Ignore,
    /// Install without asking the user.
    Update,
    /// Continue with the configured consent policy.
    #[default]
    DefaultBehavior,
}

pub type UpdateAvailableCallback = Arc<dyn Fn(&UpdateCheck) -> CallbackDecision + Send + Sync>;

/// Called right after the install command was issued. When set, the updater
/// does not prompt for a window reload.
pub type UpdateInstalledCallback = Arc<dyn Fn() + Send + Sync>;

#[derive(Clone)]
pub struct UpdateConfig {
    /// Shown to the user in every prompt.
    pub friendly_name: String,
    pub require_user_confirmation: bool,
    /// Install without asking when this dist-tag points at the latest version.
    pub force_update_on_tag: Option<String>,
    pub on_check_fail: CheckFailPolicy,
    pub on_update_available: Option<UpdateAvailableCallback>,
    pub on_update_installed: Option<UpdateInstalledCallback>,
    pub check_interval: Duration,
    pub remote: RemoteConfig,
    pub comparator: Arc<dyn VersionComparator>,
}

impl UpdateConfig {
    /// Configuration with confirmation required, failures ignored and the
    /// default one-hour interval.
    #[must_use]
    pub fn new(friendly_name: impl Into<String>, remote: RemoteConfig) -> Self {
        Self {
            friendly_name: friendly_name.into(),
            require_user_confirmation: true,
            force_update_on_tag: None,
            on_check_fail: CheckFailPolicy::default(),
            on_update_available: None,
            on_update_installed: None,
            check_interval: DEFAULT_CHECK_INTERVAL,
            remote,
            comparator: Arc::new(SemverComparator),
        }
    }

    #[must_use]
    pub fn require_user_confirmation(mut self, required: bool) -> Self {
        self.require_user_confirmation = required;
        self
    }

    #[must_use]
    pub fn force_update_on_tag(mut self, tag: impl Into<String>) -> Self {
        self.force_update_on_tag = Some(tag.into());
        self
    }

    #[must_use]
    pub fn on_check_fail(mut self, policy: CheckFailPolicy) -> Self {
        self.on_check_fail = policy;
        self
    }

    #[must_use]
    pub fn on_update_available<F>(mut self, callback: F) -> Self
    where
        F: Fn(&UpdateCheck) -> CallbackDecision + Send + Sync + 'static,
    {
        self.on_update_available = Some(Arc::new(callback));
        self
    }

    #[must_use]
    pub fn on_update_installed<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_update_installed = Some(Arc::new(callback));
        self
    }

    #[must_use]
    pub fn check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    #[must_use]
    pub fn comparator(mut self, comparator: Arc<dyn VersionComparator>) -> Self {
        self.comparator = comparator;
        self
    }
}

impl std::fmt::Debug for UpdateConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateConfig")
            .field("friendly_name", &self.friendly_name)
            .field("require_user_confirmation", &self.require_user_confirmation)
            .field("force_update_on_tag", &self.force_update_on_tag)
            .field("on_check_fail", &self.on_check_fail)
            .field("on_update_available", &self.on_update_available.is_some())
            .field("on_update_installed", &self.on_update_installed.is_some())
            .field("check_interval", &self.check_interval)
            .field("remote", &self.remote)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use serde_json::json;

    use super::{CheckFailPolicy, DEFAULT_CHECK_INTERVAL, PackageManifest, RemoteConfig, UpdateConfig};
    use crate::error::ConfigError;

    #[test]
    fn manifest_reads_publish_config_from_package_json() {
        let value = json!({
            "name": "demo-ext",
            "version": "1.0.0",
            "publishConfig": { "registry": "https://registry.example.com/" },
            "engines": { "vscode": "^1.80.0" }
        });

        let manifest: PackageManifest =
            serde_json::from_value(value).expect("manifest should deserialize");

        assert_eq!(manifest.name, "demo-ext");
        assert_eq!(manifest.version, "1.0.0");
        assert_eq!(
            manifest.publish_config.map(|config| config.registry).as_deref(),
            Some("https://registry.example.com/")
        );
    }

    #[test]
    fn manifest_load_reports_missing_and_malformed_files() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let missing = temp.path().join("package.json");
        assert!(matches!(
            PackageManifest::load(&missing),
            Err(ConfigError::ManifestRead { .. })
        ));

        std::fs::write(&missing, "{ not json").expect("manifest should be written");
        assert!(matches!(
            PackageManifest::load(&missing),
            Err(ConfigError::ManifestParse { .. })
        ));
    }

    #[test]
    fn update_dir_replaces_dots_in_version() {
        let remote = RemoteConfig::new(PackageManifest::default(), "/ext");

        assert_eq!(
            remote.update_dir("1.2.0-beta.1"),
            Path::new("/ext").join("auto-updates").join("1-2-0-beta-1")
        );
    }

    #[test]
    fn update_dir_never_leaves_the_updates_directory() {
        let remote = RemoteConfig::new(PackageManifest::default(), "/ext");
        let updates = Path::new("/ext").join("auto-updates");

        for version in ["/tmp/x/evil", "1.2.0/../../escape", "..\\evil", "..", ""] {
            let dir = remote.update_dir(version);
            assert_eq!(dir.parent(), Some(updates.as_path()), "{version:?} -> {}", dir.display());
            assert!(dir.starts_with("/ext"));
        }

        assert_eq!(remote.update_dir("/tmp/x/evil"), updates.join("-tmp-x-evil"));
        assert_eq!(remote.update_dir("1.2.0+build_7"), updates.join("1-2-0+build_7"));
    }

    #[test]
    fn update_config_defaults() {
        let config = UpdateConfig::new("Demo", RemoteConfig::new(PackageManifest::default(), "/ext"));

        assert!(config.require_user_confirmation);
        assert_eq!(config.check_interval, DEFAULT_CHECK_INTERVAL);
        assert_eq!(config.check_interval.as_millis(), 3_600_000);
        assert_eq!(config.on_check_fail, CheckFailPolicy::Ignore);
        assert!(config.force_update_on_tag.is_none());
        assert!(config.on_update_available.is_none());
    }

    #[test]
    fn check_fail_policy_uses_lowercase_names() {
        let policy: CheckFailPolicy =
            serde_json::from_value(json!("notify")).expect("policy should deserialize");
        assert_eq!(policy, CheckFailPolicy::Notify);
    }
}
