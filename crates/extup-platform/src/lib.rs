mod commands;
mod paths;

pub use commands::{CommandError, HideWindow, PATH_PLACEHOLDER, command_for_path};
pub use paths::{AppPaths, AppPathsError};
