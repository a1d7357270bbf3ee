//! Capabilities the editor host exposes to the updater.
//!
//! The updater never talks to a concrete editor. It is handed a [`Host`]
//! bundle of three narrow traits:
//! - [`Notifier`]: single-choice information prompts and warnings.
//! - [`ExtensionHost`]: install a package from a local path and announce
//!   extension-set changes.
//! - [`WindowReloader`]: reload the window so a new version takes effect.

mod error;
mod traits;

pub use error::HostError;
pub use traits::{ExtensionHost, ExtensionsChanged, Host, Notifier, WindowReloader};
