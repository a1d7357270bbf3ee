use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use extup_host::{ExtensionHost, ExtensionsChanged, Host, HostError, Notifier, WindowReloader};
use flate2::Compression;
use flate2::write::GzEncoder;
use serde_json::json;
use tokio::sync::broadcast;

use crate::config::{PackageManifest, PublishConfig, RemoteConfig};

pub(crate) const PACKAGE_NAME: &str = "demo-ext";

/// A host that answers prompts from a script and records everything.
pub(crate) struct MockHost {
    answers: HashMap<String, String>,
    emit_changes: bool,
    prompts: Mutex<Vec<String>>,
    warnings: Mutex<Vec<String>>,
    installed: Mutex<Vec<PathBuf>>,
    reloads: AtomicUsize,
    changes: broadcast::Sender<ExtensionsChanged>,
}

impl MockHost {
    pub(crate) fn new() -> Self {
        let (changes, _) = broadcast::channel(8);
        Self {
            answers: HashMap::new(),
            emit_changes: true,
            prompts: Mutex::new(Vec::new()),
            warnings: Mutex::new(Vec::new()),
            installed: Mutex::new(Vec::new()),
            reloads: AtomicUsize::new(0),
            changes,
        }
    }

    /// Reply `choice` whenever `action` is offered. Unscripted prompts are
    /// dismissed.
    pub(crate) fn answer(mut self, action: &str, choice: &str) -> Self {
        self.answers.insert(action.to_string(), choice.to_string());
        self
    }

    pub(crate) fn silent_installs(mut self) -> Self {
        self.emit_changes = false;
        self
    }

    pub(crate) fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub(crate) fn host(self: &Arc<Self>) -> Host {
        Host::new(self.clone(), self.clone(), self.clone())
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompt log lock").clone()
    }

    pub(crate) fn warnings(&self) -> Vec<String> {
        self.warnings.lock().expect("warning log lock").clone()
    }

    pub(crate) fn installed(&self) -> Vec<PathBuf> {
        self.installed.lock().expect("install log lock").clone()
    }

    pub(crate) fn reloads(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for MockHost {
    async fn show_information(&self, message: &str, action: &str) -> Option<String> {
        self.prompts
            .lock()
            .expect("prompt log lock")
            .push(message.to_string());
        self.answers.get(action).cloned()
    }

    fn show_warning(&self, message: &str) {
        self.warnings
            .lock()
            .expect("warning log lock")
            .push(message.to_string());
    }
}

#[async_trait]
impl ExtensionHost for MockHost {
    async fn install_extension(&self, package: &Path) -> Result<(), HostError> {
        self.installed
            .lock()
            .expect("install log lock")
            .push(package.to_path_buf());
        if self.emit_changes {
            let _ = self.changes.send(ExtensionsChanged);
        }
        Ok(())
    }

    fn subscribe_changes(&self) -> broadcast::Receiver<ExtensionsChanged> {
        self.changes.subscribe()
    }
}

#[async_trait]
impl WindowReloader for MockHost {
    async fn reload_window(&self) -> Result<(), HostError> {
        self.reloads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Poll `condition` for up to two seconds.
pub(crate) async fn wait_until(condition: impl Fn() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

pub(crate) fn remote_for(registry: &str, current_version: &str, root: &Path) -> RemoteConfig {
    RemoteConfig::new(
        PackageManifest {
            name: PACKAGE_NAME.to_string(),
            version: current_version.to_string(),
            publish_config: Some(PublishConfig {
                registry: format!("{registry}/"),
            }),
        },
        root,
    )
}

/// A registry document whose tarballs live at
/// `{base}/{name}/-/{name}-{version}.tgz`.
pub(crate) fn registry_json(
    name: &str,
    base: &str,
    versions: &[&str],
    tags: &[(&str, &str)],
) -> String {
    let versions: serde_json::Map<String, serde_json::Value> = versions
        .iter()
        .map(|version| {
            (
                (*version).to_string(),
                json!({
                    "name": name,
                    "version": version,
                    "dist": {
                        "shasum": format!("shasum-{version}"),
                        "tarball": format!("{base}/{name}/-/{name}-{version}.tgz"),
                    }
                }),
            )
        })
        .collect();
    let tags: serde_json::Map<String, serde_json::Value> = tags
        .iter()
        .map(|(tag, version)| ((*tag).to_string(), json!(version)))
        .collect();

    json!({ "name": name, "versions": versions, "dist-tags": tags }).to_string()
}

pub(crate) fn plain_tarball(files: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    append_files(&mut builder, files);
    builder.into_inner().expect("tar archive should be finalized")
}

pub(crate) fn tarball(files: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    append_files(&mut builder, files);
    builder
        .into_inner()
        .expect("tar archive should be finalized")
        .finish()
        .expect("gzip stream should be finalized")
}

fn append_files<W: std::io::Write>(builder: &mut tar::Builder<W>, files: &[(&str, &str)]) {
    for (path, contents) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        builder
            .append_data(&mut header, path, contents.as_bytes())
            .expect("tar entry should be appended");
    }
}
