use std::path::PathBuf;

use thiserror::Error;

/// Classification of every failure an update cycle can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateErrorKind {
    /// Registry unreachable, non-success status, or unusable payload.
    CheckRequestFailed,
    /// The artifact request could not be issued.
    UpdateRequestFailed,
    /// Transport or extraction error while fetching the artifact.
    DownloadOrExtractFailed,
    /// The extracted artifact holds no installable package.
    NoInstallablePackage,
    /// The extracted artifact holds more than one installable package.
    MultipleInstallablePackages,
}

impl std::fmt::Display for UpdateErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::CheckRequestFailed => "check request failed",
            Self::UpdateRequestFailed => "update request failed",
            Self::DownloadOrExtractFailed => "download or extract failed",
            Self::NoInstallablePackage => "no installable package",
            Self::MultipleInstallablePackages => "multiple installable packages",
        };
        f.write_str(label)
    }
}

/// Setup problems with the host package. These never go away on retry.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("extension name not found in package manifest")]
    MissingName,
    #[error("extension publishConfig not found; supply it or set a registry override")]
    MissingPublishConfig,
    #[error("extension publishConfig.registry not found; supply it or set a registry override")]
    MissingRegistry,
    #[error("failed to read package manifest {}: {source}", path.display())]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse package manifest {}: {source}", path.display())]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{context}: {source}")]
    Http {
        kind: UpdateErrorKind,
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{context} failed with HTTP {status}{body_snippet}")]
    HttpStatus {
        kind: UpdateErrorKind,
        context: &'static str,
        status: reqwest::StatusCode,
        body_snippet: String,
    },
    #[error("registry response is missing {what}")]
    MissingMetadata { what: String },
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("no .{extension} package found in {}", dir.display())]
    NoInstallablePackage {
        dir: PathBuf,
        extension: &'static str,
    },
    #[error("found {count} .{extension} packages in {}, refusing to guess", dir.display())]
    MultipleInstallablePackages {
        dir: PathBuf,
        extension: &'static str,
        count: usize,
    },
}

impl UpdateError {
    pub(crate) fn check_request(context: &'static str, source: reqwest::Error) -> Self {
        Self::Http {
            kind: UpdateErrorKind::CheckRequestFailed,
            context,
            source,
        }
    }

    pub(crate) fn update_request(context: &'static str, source: reqwest::Error) -> Self {
        Self::Http {
            kind: UpdateErrorKind::UpdateRequestFailed,
            context,
            source,
        }
    }

    pub(crate) fn download(context: &'static str, source: reqwest::Error) -> Self {
        Self::Http {
            kind: UpdateErrorKind::DownloadOrExtractFailed,
            context,
            source,
        }
    }

    pub(crate) fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }

    pub(crate) fn missing(what: impl Into<String>) -> Self {
        Self::MissingMetadata { what: what.into() }
    }

    /// The error kind reported to callers in check and install results.
    #[must_use]
    pub fn kind(&self) -> UpdateErrorKind {
        match self {
            Self::Config(_) | Self::MissingMetadata { .. } => UpdateErrorKind::CheckRequestFailed,
            Self::Http { kind, .. } | Self::HttpStatus { kind, .. } => *kind,
            Self::Io { .. } => UpdateErrorKind::DownloadOrExtractFailed,
            Self::NoInstallablePackage { .. } => UpdateErrorKind::NoInstallablePackage,
            Self::MultipleInstallablePackages { .. } => {
                UpdateErrorKind::MultipleInstallablePackages
            }
        }
    }
}
