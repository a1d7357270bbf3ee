use std::path::Path;

use thiserror::Error;

#[cfg(windows)]
use std::os::windows::process::CommandExt;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x08000000;

/// Placeholder substituted with the package path in configured host commands.
pub const PATH_PLACEHOLDER: &str = "{path}";

pub trait HideWindow {
    fn hide_window(&mut self) -> &mut Self;
}

impl HideWindow for tokio::process::Command {
    #[cfg(windows)]
    fn hide_window(&mut self) -> &mut Self {
        self.creation_flags(CREATE_NO_WINDOW)
    }

    #[cfg(not(windows))]
    fn hide_window(&mut self) -> &mut Self {
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Host command is empty")]
    Empty,
}

/// Build a host command from an argv template, replacing every
/// [`PATH_PLACEHOLDER`] with `path`.
///
/// When no argument contains the placeholder, `path` is appended as the last
/// argument.
///
/// # Errors
/// Returns [`CommandError::Empty`] when `argv` has no program.
pub fn command_for_path(
    argv: &[String],
    path: Option<&Path>,
) -> Result<tokio::process::Command, CommandError> {
    let (program, args) = argv.split_first().ok_or(CommandError::Empty)?;
    if program.trim().is_empty() {
        return Err(CommandError::Empty);
    }

    let mut cmd = tokio::process::Command::new(program);
    let mut substituted = false;
    for arg in args {
        match path {
            Some(path) if arg.contains(PATH_PLACEHOLDER) => {
                cmd.arg(arg.replace(PATH_PLACEHOLDER, &path.to_string_lossy()));
                substituted = true;
            }
            _ => {
                cmd.arg(arg);
            }
        }
    }
    if let Some(path) = path
        && !substituted
    {
        cmd.arg(path);
    }

    log::debug!("Prepared host command: {program} {}", args.join(" "));
    cmd.hide_window();
    Ok(cmd)
}

#[cfg(test)]
mod tests {
    use std::ffi::OsStr;
    use std::path::Path;

    use super::{CommandError, HideWindow, command_for_path};

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    fn args_of(cmd: &tokio::process::Command) -> Vec<String> {
        cmd.as_std()
            .get_args()
            .map(OsStr::to_string_lossy)
            .map(|arg| arg.into_owned())
            .collect()
    }

    #[test]
    fn tokio_command_hide_window_is_chainable() {
        let mut cmd = tokio::process::Command::new("echo");
        let before = &mut cmd as *mut tokio::process::Command;
        let after = cmd.hide_window() as *mut tokio::process::Command;
        assert_eq!(before, after);
    }

    #[test]
    fn placeholder_is_replaced_with_package_path() {
        let cmd = command_for_path(
            &argv(&["code", "--install-extension", "{path}", "--force"]),
            Some(Path::new("/tmp/ext.vsix")),
        )
        .expect("command should build");

        assert_eq!(cmd.as_std().get_program(), "code");
        assert_eq!(
            args_of(&cmd),
            vec!["--install-extension", "/tmp/ext.vsix", "--force"]
        );
    }

    #[test]
    fn path_is_appended_when_no_placeholder_is_present() {
        let cmd = command_for_path(
            &argv(&["code", "--install-extension"]),
            Some(Path::new("/tmp/ext.vsix")),
        )
        .expect("command should build");

        assert_eq!(args_of(&cmd), vec!["--install-extension", "/tmp/ext.vsix"]);
    }

    #[test]
    fn commands_without_path_keep_arguments_verbatim() {
        let cmd = command_for_path(&argv(&["code", "--reuse-window"]), None)
            .expect("command should build");

        assert_eq!(args_of(&cmd), vec!["--reuse-window"]);
    }

    #[test]
    fn empty_argv_is_rejected() {
        assert!(matches!(
            command_for_path(&[], None),
            Err(CommandError::Empty)
        ));
        assert!(matches!(
            command_for_path(&argv(&["  "]), None),
            Err(CommandError::Empty)
        ));
    }
}
