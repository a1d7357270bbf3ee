use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use extup_host::Host;
use log::{debug, info, warn};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::{CheckFailPolicy, UpdateConfig};
use crate::decision::{Decision, InstallReason, UpdateCheck, decide, evaluate};
use crate::error::{ConfigError, UpdateErrorKind};
use crate::install::{ArchiveInstaller, InstallResult};
use crate::registry::{RegistryClient, registry_url};

const UPDATE_ACTION: &str = "Update";

/// Result of querying the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckResult {
    Failure { error: UpdateErrorKind },
    Success(UpdateCheck),
}

/// Result of one full check, decide and install cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The registry could not be queried; nothing was installed.
    CheckFailed { error: UpdateErrorKind },
    Checked {
        check: UpdateCheck,
        install: InstallResult,
    },
}

impl UpdateOutcome {
    #[must_use]
    pub fn did_update(&self) -> bool {
        match self {
            Self::CheckFailed { .. } => false,
            Self::Checked { install, .. } => install.did_update(),
        }
    }

    #[must_use]
    pub fn check(&self) -> Option<&UpdateCheck> {
        match self {
            Self::CheckFailed { .. } => None,
            Self::Checked { check, .. } => Some(check),
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<UpdateErrorKind> {
        match self {
            Self::CheckFailed { error } => Some(*error),
            Self::Checked { install, .. } => install.error(),
        }
    }
}

struct CheckerCore {
    config: UpdateConfig,
    host: Host,
    registry: RegistryClient,
    installer: ArchiveInstaller,
    timer: Mutex<Option<JoinHandle<()>>>,
    disposed: AtomicBool,
}

impl CheckerCore {
    fn new(config: UpdateConfig, host: Host, client: reqwest::Client) -> Self {
        Self {
            registry: RegistryClient::new(client.clone()),
            installer: ArchiveInstaller::new(client, host.clone()),
            config,
            host,
            timer: Mutex::new(None),
            disposed: AtomicBool::new(false),
        }
    }

    async fn get_updates(&self) -> CheckResult {
        let remote = &self.config.remote;
        let checked = match self.registry.fetch_latest(remote).await {
            Ok(registry) => evaluate(
                remote.current_version(),
                registry,
                self.config.comparator.as_ref(),
            ),
            Err(error) => Err(error),
        };

        match checked {
            Ok(check) => CheckResult::Success(check),
            Err(error) => {
                warn!("Update check failed: {error}");
                CheckResult::Failure {
                    error: error.kind(),
                }
            }
        }
    }

    async fn force_check_updates(&self) -> UpdateOutcome {
        let check = match self.get_updates().await {
            CheckResult::Success(check) => check,
            CheckResult::Failure { error } => {
                if self.config.on_check_fail == CheckFailPolicy::Notify {
                    self.host.notifier.show_warning(&format!(
                        "{}: update check failed",
                        self.config.friendly_name
                    ));
                }
                return UpdateOutcome::CheckFailed { error };
            }
        };

        let decision = decide(&check, &self.config);
        debug!("Update decision for {}: {decision:?}", check.latest_version);

        let install = match decision {
            Decision::UpToDate | Decision::Ignore => InstallResult::SKIPPED,
            Decision::Confirm => {
                let message = format!("{}: update available", self.config.friendly_name);
                if self.host.confirm(&message, UPDATE_ACTION).await {
                    self.install(InstallReason::Confirmed).await
                } else {
                    info!("Update to {} declined, pausing automatic checks", check.latest_version);
                    self.dispose();
                    InstallResult::SKIPPED
                }
            }
            Decision::Install(reason) => self.install(reason).await,
        };

        UpdateOutcome::Checked { check, install }
    }

    async fn install(&self, reason: InstallReason) -> InstallResult {
        info!("Installing update ({reason:?})");
        self.installer
            .install(
                &self.config.friendly_name,
                &self.config.remote,
                self.config.on_update_installed.as_ref(),
            )
            .await
    }

    fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
        let timer = self
            .timer
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        if let Some(timer) = timer {
            debug!("Stopping automatic update checks");
            timer.abort();
        }
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

fn arm_timer(weak: Weak<CheckerCore>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period.max(Duration::from_millis(1)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            let Some(core) = weak.upgrade() else {
                break;
            };
            if core.is_disposed() {
                break;
            }
            tokio::spawn(async move {
                let outcome = core.force_check_updates().await;
                debug!("Scheduled update check finished: did_update={}", outcome.did_update());
            });
        }
    })
}

/// Checks for updates immediately and then every `check_interval`, until
/// disposed.
///
/// Each tick runs an independent cycle; cycles may overlap with each other
/// and with [`AutoUpdateChecker::force_check_updates`]. Disposal stops future
/// ticks but lets running cycles finish. Dropping the checker disposes it.
pub struct AutoUpdateChecker {
    core: Arc<CheckerCore>,
}

impl AutoUpdateChecker {
    /// Validate the endpoint and arm the timer. Must be called from within a
    /// Tokio runtime.
    ///
    /// # Errors
    /// Returns a configuration error when the registry endpoint cannot be
    /// derived from the package manifest.
    pub fn new(
        config: UpdateConfig,
        host: Host,
        client: reqwest::Client,
    ) -> Result<Self, ConfigError> {
        let url = registry_url(&config.remote)?;
        info!(
            "Checking {url} for updates every {:?}",
            config.check_interval
        );

        let period = config.check_interval;
        let core = Arc::new(CheckerCore::new(config, host, client));
        {
            let mut timer = core
                .timer
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            *timer = Some(arm_timer(Arc::downgrade(&core), period));
        }

        Ok(Self { core })
    }

    /// A checker that only runs when asked to. No timer is armed.
    ///
    /// # Errors
    /// Returns a configuration error when the registry endpoint cannot be
    /// derived from the package manifest.
    pub fn without_timer(
        config: UpdateConfig,
        host: Host,
        client: reqwest::Client,
    ) -> Result<Self, ConfigError> {
        registry_url(&config.remote)?;
        Ok(Self {
            core: Arc::new(CheckerCore::new(config, host, client)),
        })
    }

    /// Query the registry without deciding or installing.
    pub async fn get_updates(&self) -> CheckResult {
        self.core.get_updates().await
    }

    /// Run one full cycle now, whether or not the checker is disposed.
    pub async fn force_check_updates(&self) -> UpdateOutcome {
        self.core.force_check_updates().await
    }

    /// Stop automatic checks. Repeated calls are no-ops.
    pub fn dispose(&self) {
        self.core.dispose();
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.core.is_disposed()
    }

    #[must_use]
    pub fn config(&self) -> &UpdateConfig {
        &self.core.config
    }
}

impl Drop for AutoUpdateChecker {
    fn drop(&mut self) {
        self.core.dispose();
    }
}

impl std::fmt::Debug for AutoUpdateChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoUpdateChecker")
            .field("friendly_name", &self.core.config.friendly_name)
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}
