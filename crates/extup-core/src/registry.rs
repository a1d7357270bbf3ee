use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::RemoteConfig;
use crate::error::{ConfigError, UpdateError, UpdateErrorKind};

const LATEST_TAG: &str = "latest";

/// One fetch of a package document from the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryMetadata {
    pub name: String,
    pub versions: HashMap<String, VersionArtifact>,
    #[serde(rename = "dist-tags")]
    pub dist_tags: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionArtifact {
    pub name: String,
    pub version: String,
    pub dist: Dist,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dist {
    #[serde(default)]
    pub shasum: String,
    pub tarball: String,
}

impl RegistryMetadata {
    #[must_use]
    pub fn latest_version(&self) -> Option<&str> {
        self.version_for_tag(LATEST_TAG)
    }

    #[must_use]
    pub fn version_for_tag(&self, tag: &str) -> Option<&str> {
        self.dist_tags.get(tag).map(String::as_str)
    }

    #[must_use]
    pub fn artifact(&self, version: &str) -> Option<&VersionArtifact> {
        self.versions.get(version)
    }
}

impl VersionArtifact {
    #[must_use]
    pub fn checksum(&self) -> &str {
        &self.dist.shasum
    }

    #[must_use]
    pub fn artifact_url(&self) -> &str {
        &self.dist.tarball
    }
}

/// Registry document URL for the configured package: `{registry}/{name}`.
///
/// # Errors
/// Returns an error when the manifest has no name, or when neither an
/// override nor `publishConfig.registry` provides a registry.
pub fn registry_url(remote: &RemoteConfig) -> Result<String, ConfigError> {
    let manifest = &remote.manifest;
    if manifest.name.trim().is_empty() {
        return Err(ConfigError::MissingName);
    }

    let registry = match remote.registry_override.as_deref() {
        Some(registry) if !registry.trim().is_empty() => registry,
        _ => {
            let publish = manifest
                .publish_config
                .as_ref()
                .ok_or(ConfigError::MissingPublishConfig)?;
            if publish.registry.trim().is_empty() {
                return Err(ConfigError::MissingRegistry);
            }
            publish.registry.as_str()
        }
    };

    let registry = registry.strip_suffix('/').unwrap_or(registry);
    Ok(format!("{registry}/{}", manifest.name))
}

#[derive(Debug, Clone)]
pub struct RegistryClient {
    client: reqwest::Client,
}

impl RegistryClient {
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Fetch the package document for the configured extension.
    ///
    /// # Errors
    /// Returns a configuration error before any request when the endpoint
    /// cannot be derived, and a `CheckRequestFailed` error when the request
    /// fails, the status is not a success, or the body is not valid metadata.
    pub async fn fetch_latest(&self, remote: &RemoteConfig) -> Result<RegistryMetadata, UpdateError> {
        let url = registry_url(remote)?;
        debug!("Fetching registry metadata from {url}");

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .header("User-Agent", "extup")
            .send()
            .await
            .map_err(|error| UpdateError::check_request("failed to reach registry", error))?;

        if !response.status().is_success() {
            let status = response.status();
            let body_snippet = response
                .text()
                .await
                .ok()
                .map(|body| response_snippet(&body, 160))
                .unwrap_or_default();
            return Err(UpdateError::HttpStatus {
                kind: UpdateErrorKind::CheckRequestFailed,
                context: "registry request",
                status,
                body_snippet,
            });
        }

        let metadata: RegistryMetadata = response
            .json()
            .await
            .map_err(|error| UpdateError::check_request("failed to parse registry response", error))?;

        debug!(
            "Registry lists {} versions of {}",
            metadata.versions.len(),
            metadata.name
        );
        Ok(metadata)
    }
}

fn response_snippet(body: &str, max_chars: usize) -> String {
    let snippet: String = body.chars().take(max_chars).collect();
    if snippet.is_empty() {
        String::new()
    } else {
        format!(": {snippet}")
    }
}
