use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::HostError;

/// Emitted by the host whenever its set of installed extensions changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtensionsChanged;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Show an information message offering exactly one action.
    ///
    /// Resolves to the chosen action, or `None` when the message was
    /// dismissed. There is no timeout.
    async fn show_information(&self, message: &str, action: &str) -> Option<String>;

    /// Show a warning. Fire-and-forget.
    fn show_warning(&self, message: &str);
}

#[async_trait]
pub trait ExtensionHost: Send + Sync {
    /// Install the extension package at `package`.
    async fn install_extension(&self, package: &Path) -> Result<(), HostError>;

    /// Subscribe to extension-set change notifications.
    fn subscribe_changes(&self) -> broadcast::Receiver<ExtensionsChanged>;
}

#[async_trait]
pub trait WindowReloader: Send + Sync {
    async fn reload_window(&self) -> Result<(), HostError>;
}

/// The full set of host capabilities handed to the updater.
#[derive(Clone)]
pub struct Host {
    pub notifier: Arc<dyn Notifier>,
    pub extensions: Arc<dyn ExtensionHost>,
    pub reloader: Arc<dyn WindowReloader>,
}

impl Host {
    #[must_use]
    pub fn new(
        notifier: Arc<dyn Notifier>,
        extensions: Arc<dyn ExtensionHost>,
        reloader: Arc<dyn WindowReloader>,
    ) -> Self {
        Self {
            notifier,
            extensions,
            reloader,
        }
    }

    /// Prompt with a single action and report whether that action was picked.
    ///
    /// Dismissal counts as a decline.
    pub async fn confirm(&self, message: &str, action: &str) -> bool {
        self.notifier
            .show_information(message, action)
            .await
            .is_some_and(|choice| choice == action)
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host").finish_non_exhaustive()
    }
}
