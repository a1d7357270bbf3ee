use std::ffi::OsString;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use extup_host::{ExtensionsChanged, Host};
use flate2::read::GzDecoder;
use futures_util::StreamExt;
use log::{debug, info, warn};
use tokio::io::AsyncWriteExt;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::config::{RemoteConfig, UpdateInstalledCallback};
use crate::error::{UpdateError, UpdateErrorKind};
use crate::registry::RegistryClient;

/// File extension of an installable extension package.
pub const PACKAGE_EXTENSION: &str = "vsix";

/// Upper bound on how long to wait for the host to report the install
/// before offering a reload.
pub const RELOAD_WAIT_TIME: Duration = Duration::from_secs(5);

const RELOAD_ACTION: &str = "Reload Window";
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallResult {
    Success { did_update: bool },
    /// Nothing was installed.
    Failure { error: UpdateErrorKind },
}

impl InstallResult {
    pub(crate) const SKIPPED: Self = Self::Success { did_update: false };

    #[must_use]
    pub fn did_update(self) -> bool {
        matches!(self, Self::Success { did_update: true })
    }

    #[must_use]
    pub fn error(self) -> Option<UpdateErrorKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error } => Some(error),
        }
    }
}

/// Downloads the latest published version and hands it to the host.
#[derive(Debug, Clone)]
pub struct ArchiveInstaller {
    registry: RegistryClient,
    client: reqwest::Client,
    host: Host,
    reload_wait: Duration,
}

impl ArchiveInstaller {
    #[must_use]
    pub fn new(client: reqwest::Client, host: Host) -> Self {
        Self {
            registry: RegistryClient::new(client.clone()),
            client,
            host,
            reload_wait: RELOAD_WAIT_TIME,
        }
    }

    #[must_use]
    pub fn with_reload_wait(mut self, wait: Duration) -> Self {
        self.reload_wait = wait;
        self
    }

    /// Fetch, extract and install the registry's latest version.
    ///
    /// The registry is queried again rather than trusting an earlier check.
    /// With `on_installed` the callback runs right after the install command
    /// is issued; otherwise a reload prompt is scheduled in the background.
    /// Either way the result does not wait on the user.
    pub async fn install(
        &self,
        friendly_name: &str,
        remote: &RemoteConfig,
        on_installed: Option<&UpdateInstalledCallback>,
    ) -> InstallResult {
        match self.try_install(friendly_name, remote, on_installed).await {
            Ok(package) => {
                info!("Update install issued for {}", package.display());
                InstallResult::Success { did_update: true }
            }
            Err(error) => {
                warn!("Update install failed: {error}");
                InstallResult::Failure {
                    error: error.kind(),
                }
            }
        }
    }

    async fn try_install(
        &self,
        friendly_name: &str,
        remote: &RemoteConfig,
        on_installed: Option<&UpdateInstalledCallback>,
    ) -> Result<PathBuf, UpdateError> {
        let registry = self.registry.fetch_latest(remote).await?;
        let version = registry
            .latest_version()
            .ok_or_else(|| UpdateError::missing("dist-tags.latest"))?;
        let artifact = registry
            .artifact(version)
            .ok_or_else(|| UpdateError::missing(format!("versions[\"{version}\"]")))?;

        let out_dir = remote.update_dir(version);
        download_and_extract(&self.client, artifact.artifact_url(), &out_dir).await?;
        let package = locate_package(&out_dir)?;

        // Subscribe first: the host may report the change before the
        // install command future resolves.
        let changes = self.host.extensions.subscribe_changes();

        let extensions = Arc::clone(&self.host.extensions);
        let install_path = package.clone();
        tokio::spawn(async move {
            if let Err(error) = extensions.install_extension(&install_path).await {
                warn!(
                    "Host failed to install {}: {error}",
                    install_path.display()
                );
            }
        });

        if let Some(callback) = on_installed {
            callback();
        } else {
            tokio::spawn(prompt_reload(
                self.host.clone(),
                friendly_name.to_string(),
                changes,
                self.reload_wait,
            ));
        }

        Ok(package)
    }
}

async fn prompt_reload(
    host: Host,
    friendly_name: String,
    mut changes: broadcast::Receiver<ExtensionsChanged>,
    wait: Duration,
) {
    let changed = async move {
        if let Err(RecvError::Closed) = changes.recv().await {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = tokio::time::sleep(wait) => debug!("No extension change reported within {wait:?}"),
        () = changed => debug!("Host reported extension change"),
    }

    let message = format!("{friendly_name}: extension was updated, please reload the window");
    if host.confirm(&message, RELOAD_ACTION).await {
        info!("Reloading window for update");
        if let Err(error) = host.reloader.reload_window().await {
            warn!("Window reload failed: {error}");
        }
    }
}

async fn download_and_extract(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
) -> Result<(), UpdateError> {
    tokio::fs::create_dir_all(dest)
        .await
        .map_err(|error| UpdateError::io("failed to create update directory", error))?;

    info!("Downloading update from {url}");
    let response = client
        .get(url)
        .header("User-Agent", "extup")
        .send()
        .await
        .map_err(|error| UpdateError::update_request("artifact request failed", error))?;

    if !response.status().is_success() {
        return Err(UpdateError::HttpStatus {
            kind: UpdateErrorKind::DownloadOrExtractFailed,
            context: "artifact download",
            status: response.status(),
            body_snippet: String::new(),
        });
    }

    let archive_path = archive_path_for(dest);
    let mut file = tokio::fs::File::create(&archive_path)
        .await
        .map_err(|error| UpdateError::io("failed to create archive file", error))?;
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|error| UpdateError::download("download stream error", error))?;
        file.write_all(&chunk)
            .await
            .map_err(|error| UpdateError::io("failed to write archive file", error))?;
        downloaded += chunk.len() as u64;
    }
    file.flush()
        .await
        .map_err(|error| UpdateError::io("failed to write archive file", error))?;
    drop(file);
    debug!("Downloaded {downloaded} bytes to {}", archive_path.display());

    let dest = dest.to_path_buf();
    tokio::task::spawn_blocking(move || {
        extract_archive(std::fs::File::open(&archive_path)?, &dest)?;
        debug!("Extraction complete to {}", dest.display());
        Ok::<(), std::io::Error>(())
    })
    .await
    .map_err(|error| UpdateError::io("extraction task failed", std::io::Error::other(error)))?
    .map_err(|error| UpdateError::io("failed to extract archive", error))
}

/// The downloaded archive sits next to its extraction directory, e.g.
/// `auto-updates/1-2-0.tgz`.
fn archive_path_for(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tgz");
    dest.with_file_name(name)
}

/// Unpack a tar archive, gzip-compressed or not, into `dest`.
///
/// Entries that would escape `dest` are skipped by `tar`.
fn extract_archive<R: Read + Seek>(mut reader: R, dest: &Path) -> std::io::Result<()> {
    let mut magic = Vec::with_capacity(GZIP_MAGIC.len());
    reader.by_ref().take(GZIP_MAGIC.len() as u64).read_to_end(&mut magic)?;
    reader.seek(SeekFrom::Start(0))?;

    if magic == GZIP_MAGIC {
        tar::Archive::new(GzDecoder::new(reader)).unpack(dest)
    } else {
        tar::Archive::new(reader).unpack(dest)
    }
}

/// Find the single installable package under `dir`.
///
/// # Errors
/// Returns an error when the directory cannot be searched, holds no package,
/// or holds more than one.
pub fn locate_package(dir: &Path) -> Result<PathBuf, UpdateError> {
    let mut matches = find_paths_recursively(dir, PACKAGE_EXTENSION)
        .map_err(|error| UpdateError::io("failed to search update directory", error))?;

    match matches.len() {
        0 => Err(UpdateError::NoInstallablePackage {
            dir: dir.to_path_buf(),
            extension: PACKAGE_EXTENSION,
        }),
        1 => Ok(matches.remove(0)),
        count => Err(UpdateError::MultipleInstallablePackages {
            dir: dir.to_path_buf(),
            extension: PACKAGE_EXTENSION,
            count,
        }),
    }
}

/// All files below `dir` whose extension is `extension`, sorted.
///
/// # Errors
/// Returns an error if any directory or entry under `dir` cannot be read.
pub fn find_paths_recursively(dir: &Path, extension: &str) -> std::io::Result<Vec<PathBuf>> {
    let mut matches = Vec::new();
    collect_matching(dir, extension, &mut matches)?;
    matches.sort();
    Ok(matches)
}

fn collect_matching(dir: &Path, extension: &str, matches: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let metadata = std::fs::metadata(&path)?;
        if metadata.is_dir() {
            collect_matching(&path, extension, matches)?;
        } else if metadata.is_file() && path.extension().is_some_and(|ext| ext == extension) {
            matches.push(path);
        }
    }
    Ok(())
}
