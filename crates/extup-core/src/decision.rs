use std::cmp::Ordering;

use log::debug;

use crate::config::{CallbackDecision, UpdateConfig};
use crate::error::UpdateError;
use crate::registry::RegistryMetadata;
use crate::version::VersionComparator;

/// A successful registry check.
///
/// `current_version` and `latest_version` are both read against `registry`,
/// the snapshot they were compared from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCheck {
    pub update_available: bool,
    pub current_version: String,
    pub latest_version: String,
    pub registry: RegistryMetadata,
}

/// Compare the running version against the registry's `latest` tag.
///
/// # Errors
/// Returns an error when the registry document has no `latest` dist-tag.
pub fn evaluate(
    current_version: &str,
    registry: RegistryMetadata,
    comparator: &dyn VersionComparator,
) -> Result<UpdateCheck, UpdateError> {
    let latest_version = registry
        .latest_version()
        .ok_or_else(|| UpdateError::missing("dist-tags.latest"))?
        .to_string();
    let update_available = comparator.compare(current_version, &latest_version) == Ordering::Less;
    debug!("Current {current_version}, latest {latest_version}, update available: {update_available}");

    Ok(UpdateCheck {
        update_available,
        current_version: current_version.to_string(),
        latest_version,
        registry,
    })
}

/// Why an update is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallReason {
    /// The forced dist-tag points at the latest version.
    ForcedTag,
    /// The interception callback answered [`CallbackDecision::Update`].
    Callback,
    /// No confirmation is required.
    Automatic,
    /// The user accepted the prompt.
    Confirmed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Already on the latest version or newer.
    UpToDate,
    /// The interception callback declined this update.
    Ignore,
    /// Ask the user before installing.
    Confirm,
    Install(InstallReason),
}

impl Decision {
    #[must_use]
    pub fn proceeds(self) -> bool {
        matches!(self, Self::Install(_))
    }
}

/// Apply the update policy to a check.
///
/// Precedence: forced tag, then the interception callback, then user
/// consent. Only one of them is consulted.
#[must_use]
pub fn decide(check: &UpdateCheck, config: &UpdateConfig) -> Decision {
    if !check.update_available {
        return Decision::UpToDate;
    }

    if let Some(tag) = config.force_update_on_tag.as_deref()
        && check.registry.version_for_tag(tag) == Some(check.latest_version.as_str())
    {
        debug!("Tag {tag} points at {}, forcing update", check.latest_version);
        return Decision::Install(InstallReason::ForcedTag);
    }

    let answer = config
        .on_update_available
        .as_ref()
        .map_or(CallbackDecision::DefaultBehavior, |callback| callback(check));

    match answer {
        CallbackDecision::Ignore => Decision::Ignore,
        CallbackDecision::Update => Decision::Install(InstallReason::Callback),
        CallbackDecision::DefaultBehavior if config.require_user_confirmation => Decision::Confirm,
        CallbackDecision::DefaultBehavior => Decision::Install(InstallReason::Automatic),
    }
}
