use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use extup_host::{ExtensionHost, ExtensionsChanged, Host, HostError, Notifier, WindowReloader};
use log::{debug, info, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};
use tokio::sync::{Mutex, broadcast};

use crate::settings::HostSettings;

/// Prompts on the terminal and reads the answer from one shared input, so
/// lines typed ahead of a prompt are kept for it.
pub struct TerminalNotifier<R = BufReader<Stdin>> {
    assume_yes: bool,
    input: Mutex<R>,
}

impl TerminalNotifier {
    pub fn new(assume_yes: bool) -> Self {
        Self::with_input(assume_yes, BufReader::new(tokio::io::stdin()))
    }
}

impl<R> TerminalNotifier<R> {
    pub fn with_input(assume_yes: bool, input: R) -> Self {
        Self {
            assume_yes,
            input: Mutex::new(input),
        }
    }
}

/// Map a typed answer to the offered action. Anything else dismisses.
fn parse_answer(input: &str, action: &str) -> Option<String> {
    let input = input.trim();
    let accepted = input.eq_ignore_ascii_case(action)
        || input.eq_ignore_ascii_case("y")
        || input.eq_ignore_ascii_case("yes");
    accepted.then(|| action.to_string())
}

#[async_trait]
impl<R> Notifier for TerminalNotifier<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    async fn show_information(&self, message: &str, action: &str) -> Option<String> {
        let mut input = self.input.lock().await;
        if self.assume_yes {
            println!("{message} [{action}: yes]");
            return Some(action.to_string());
        }

        println!("{message} [{action}? y/N]");
        let mut line = String::new();
        match input.read_line(&mut line).await {
            Ok(0) | Err(_) => None,
            Ok(_) => parse_answer(&line, action),
        }
    }

    fn show_warning(&self, message: &str) {
        warn!("{message}");
        eprintln!("warning: {message}");
    }
}

async fn run_host_command(argv: &[String], path: Option<&Path>) -> Result<(), HostError> {
    let mut cmd = extup_platform::command_for_path(argv, path)
        .map_err(|error| HostError::host_specific("command", error.to_string()))?;
    let output = cmd.output().await?;

    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(HostError::CommandFailed {
            stderr: if stderr.is_empty() {
                output.status.to_string()
            } else {
                stderr
            },
        })
    }
}

/// Installs packages by running a configured command line.
pub struct CommandExtensionHost {
    install_command: Vec<String>,
    changes: broadcast::Sender<ExtensionsChanged>,
    failures: broadcast::Sender<HostError>,
}

impl CommandExtensionHost {
    pub fn new(install_command: Vec<String>) -> Self {
        let (changes, _) = broadcast::channel(8);
        let (failures, _) = broadcast::channel(8);
        Self {
            install_command,
            changes,
            failures,
        }
    }

    /// Start listening for the result of the next install. Subscribe before
    /// triggering it so neither outcome is missed.
    pub fn watch_install(&self) -> InstallWatch {
        InstallWatch {
            changes: self.changes.subscribe(),
            failures: self.failures.subscribe(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallWait {
    Installed,
    Failed(HostError),
    TimedOut,
}

pub struct InstallWatch {
    changes: broadcast::Receiver<ExtensionsChanged>,
    failures: broadcast::Receiver<HostError>,
}

impl InstallWatch {
    /// Wait until the install command succeeds, fails or `limit` elapses.
    pub async fn wait(mut self, limit: Duration) -> InstallWait {
        let outcome = tokio::time::timeout(limit, async {
            tokio::select! {
                Ok(error) = self.failures.recv() => InstallWait::Failed(error),
                Ok(ExtensionsChanged) = self.changes.recv() => InstallWait::Installed,
                else => std::future::pending().await,
            }
        })
        .await;
        outcome.unwrap_or(InstallWait::TimedOut)
    }
}

#[async_trait]
impl ExtensionHost for CommandExtensionHost {
    async fn install_extension(&self, package: &Path) -> Result<(), HostError> {
        info!("Installing {}", package.display());
        if let Err(error) = run_host_command(&self.install_command, Some(package)).await {
            let _ = self.failures.send(error.clone());
            return Err(error);
        }
        debug!("Install command finished for {}", package.display());
        let _ = self.changes.send(ExtensionsChanged);
        Ok(())
    }

    fn subscribe_changes(&self) -> broadcast::Receiver<ExtensionsChanged> {
        self.changes.subscribe()
    }
}

pub struct CommandReloader {
    command: Option<Vec<String>>,
}

impl CommandReloader {
    pub fn new(command: Option<Vec<String>>) -> Self {
        Self { command }
    }
}

#[async_trait]
impl WindowReloader for CommandReloader {
    async fn reload_window(&self) -> Result<(), HostError> {
        let Some(command) = &self.command else {
            return Err(HostError::NotConfigured { action: "reload" });
        };
        run_host_command(command, None).await
    }
}

/// Assemble the terminal host. The extension host is returned separately so
/// the caller can watch for completed installs.
pub fn build_host(settings: &HostSettings, assume_yes: bool) -> (Host, Arc<CommandExtensionHost>) {
    let extensions = Arc::new(CommandExtensionHost::new(settings.install_command.clone()));
    let host = Host::new(
        Arc::new(TerminalNotifier::new(assume_yes)),
        extensions.clone(),
        Arc::new(CommandReloader::new(settings.reload_command.clone())),
    );
    (host, extensions)
}
