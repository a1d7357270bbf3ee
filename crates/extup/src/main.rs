//! `extup`: keep a privately published editor extension up to date from the
//! terminal.
//!
//! - `check` runs one update cycle and reports the outcome.
//! - `watch` checks immediately and then on every interval until Ctrl-C.
//! - `init` writes a settings file with the defaults.

mod error;
mod host;
mod logging;
mod settings;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use extup_core::{AutoUpdateChecker, RELOAD_WAIT_TIME, UpdateOutcome};
use extup_platform::AppPaths;
use log::{info, warn};

use crate::error::AppError;
use crate::host::{InstallWait, build_host};
use crate::settings::HostSettings;

const RELOAD_ACTION: &str = "Reload Window";

#[derive(Debug, Parser)]
#[command(name = "extup", version, about = "Self-update a privately published editor extension")]
struct Cli {
    /// Settings file to use instead of the per-user one
    #[arg(long, global = true, value_name = "PATH")]
    settings: Option<PathBuf>,

    /// Record the per-step trace in the debug log
    #[arg(long, global = true)]
    debug: bool,

    /// Answer every prompt with its action
    #[arg(long, short = 'y', global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check once, installing if the policy allows
    Check,
    /// Check now and then periodically until interrupted
    Watch,
    /// Write default settings
    Init {
        /// Overwrite an existing settings file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            log::error!("{error}");
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let paths = AppPaths::new()?;
    let settings_path = cli.settings.clone().unwrap_or_else(|| paths.settings_file());
    let (settings, load_error) = match HostSettings::load_from(&settings_path) {
        Ok(settings) => (settings, None),
        Err(error) => (HostSettings::default(), Some(error)),
    };
    logging::init_logging(
        &paths,
        cli.debug || settings.debug_logging,
        settings.max_log_size_bytes,
    );
    if let Some(error) = load_error {
        warn!("{error}, using defaults");
        eprintln!("warning: {error}, using defaults");
    }

    match cli.command {
        Command::Init { force } => init(&settings_path, force),
        Command::Check => check(&settings, cli.yes).await,
        Command::Watch => watch(&settings, cli.yes).await,
    }
}

fn init(path: &std::path::Path, force: bool) -> Result<(), AppError> {
    if path.exists() && !force {
        return Err(AppError::SettingsExist {
            path: path.to_path_buf(),
        });
    }
    HostSettings::default().save_to(path)?;
    println!("Wrote default settings to {}", path.display());
    Ok(())
}

fn http_client(settings: &HostSettings) -> Result<reqwest::Client, AppError> {
    reqwest::Client::builder()
        .timeout(settings.http_timeout())
        .user_agent(format!("extup/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(AppError::ClientBuild)
}

async fn check(settings: &HostSettings, assume_yes: bool) -> Result<(), AppError> {
    let (host, extensions) = build_host(settings, assume_yes);
    // The reload prompt is driven below so it finishes before we exit.
    let config = settings.update_config()?.on_update_installed(|| {});
    let friendly_name = config.friendly_name.clone();
    let install = extensions.watch_install();

    let checker = AutoUpdateChecker::without_timer(config, host.clone(), http_client(settings)?)?;
    let outcome = checker.force_check_updates().await;
    report(&friendly_name, &outcome);

    match outcome {
        UpdateOutcome::CheckFailed { error } => Err(AppError::CheckFailed { kind: error }),
        UpdateOutcome::Checked {
            install: result, ..
        } => {
            if let Some(kind) = result.error() {
                return Err(AppError::InstallFailed { kind });
            }
            if !result.did_update() {
                return Ok(());
            }

            let wait = settings.install_timeout().max(RELOAD_WAIT_TIME);
            match install.wait(wait).await {
                InstallWait::Installed => {}
                InstallWait::Failed(error) => return Err(AppError::HostInstall(error)),
                InstallWait::TimedOut => {
                    println!("No install confirmation after {wait:?}, see the debug log");
                    return Ok(());
                }
            }

            let message = format!("{friendly_name}: extension was updated, please reload the window");
            if host.confirm(&message, RELOAD_ACTION).await
                && let Err(error) = host.reloader.reload_window().await
            {
                println!("Reload the editor window to finish the update ({error})");
            }
            Ok(())
        }
    }
}

fn report(friendly_name: &str, outcome: &UpdateOutcome) {
    let Some(check) = outcome.check() else {
        return;
    };
    if !check.update_available {
        println!("{friendly_name} is up to date ({})", check.current_version);
    } else if outcome.did_update() {
        println!(
            "{friendly_name}: installing {} (was {})",
            check.latest_version, check.current_version
        );
    } else if outcome.error().is_none() {
        println!(
            "{friendly_name}: {} is available, skipped",
            check.latest_version
        );
    }
}

async fn watch(settings: &HostSettings, assume_yes: bool) -> Result<(), AppError> {
    let (host, _) = build_host(settings, assume_yes);
    let config = settings.update_config()?;
    let checker = AutoUpdateChecker::new(config, host, http_client(settings)?)?;
    println!(
        "Watching for updates to {} every {:?}. Press Ctrl+C to stop.",
        checker.config().friendly_name,
        checker.config().check_interval
    );

    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Received Ctrl+C, shutting down");
    }
    checker.dispose();
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command, init};
    use crate::error::AppError;
    use crate::settings::HostSettings;

    #[test]
    fn cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["extup", "check", "--debug", "-y", "--settings", "/tmp/s.json"])
            .expect("arguments should parse");

        assert!(matches!(cli.command, Command::Check));
        assert!(cli.debug);
        assert!(cli.yes);
        assert_eq!(cli.settings.as_deref(), Some(std::path::Path::new("/tmp/s.json")));
    }

    #[test]
    fn cli_requires_a_subcommand() {
        assert!(Cli::try_parse_from(["extup"]).is_err());
    }

    #[test]
    fn init_writes_defaults_once() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let path = temp.path().join("settings.json");

        init(&path, false).expect("first init should succeed");
        let written = HostSettings::load_from(&path).expect("written settings should load");
        assert_eq!(written.check_interval_ms, HostSettings::default().check_interval_ms);

        assert!(matches!(
            init(&path, false),
            Err(AppError::SettingsExist { .. })
        ));
        init(&path, true).expect("forced init should succeed");
    }
}
