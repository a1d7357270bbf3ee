//! Self-update engine for editor extensions published to an npm-style
//! registry.
//!
//! This crate is independent of any concrete editor; the host is reached
//! only through [`extup_host::Host`]:
//! - Registry metadata model and fetch helper.
//! - Version comparison behind an injectable total order.
//! - The update policy (forced tag, interception callback, user consent).
//! - Artifact download, extraction and package discovery.
//! - The periodic checker that drives check, decide and install.

mod checker;
mod config;
mod decision;
mod error;
mod install;
mod registry;
mod version;

#[cfg(test)]
mod test_support;

/// Periodic checker and the results of one check cycle.
pub use checker::{AutoUpdateChecker, CheckResult, UpdateOutcome};
/// Update configuration and endpoint descriptor.
pub use config::{
    CallbackDecision, CheckFailPolicy, DEFAULT_CHECK_INTERVAL, PackageManifest, PublishConfig,
    RemoteConfig, UpdateAvailableCallback, UpdateConfig, UpdateInstalledCallback,
};
/// Update policy.
pub use decision::{Decision, InstallReason, UpdateCheck, decide, evaluate};
/// Error taxonomy.
pub use error::{ConfigError, UpdateError, UpdateErrorKind};
/// Download, extraction and installation of a new version.
pub use install::{
    ArchiveInstaller, InstallResult, PACKAGE_EXTENSION, RELOAD_WAIT_TIME, find_paths_recursively,
    locate_package,
};
/// Registry metadata model and fetch helper.
pub use registry::{Dist, RegistryClient, RegistryMetadata, VersionArtifact, registry_url};
/// Version ordering.
pub use version::{SemverComparator, VersionComparator};
