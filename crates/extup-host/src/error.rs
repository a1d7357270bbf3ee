use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("Host command failed: {stderr}")]
    CommandFailed { stderr: String },

    #[error("Host command is not configured: {action}")]
    NotConfigured { action: &'static str },

    #[error("IO error ({kind}): {message}")]
    IoError {
        kind: std::io::ErrorKind,
        message: String,
    },

    #[error("Host error in {context}: {details}")]
    HostSpecific {
        context: &'static str,
        details: String,
    },
}

impl HostError {
    pub fn host_specific(context: &'static str, details: impl Into<String>) -> Self {
        Self::HostSpecific {
            context,
            details: details.into(),
        }
    }
}

impl From<std::io::Error> for HostError {
    fn from(err: std::io::Error) -> Self {
        HostError::IoError {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::HostError;

    #[test]
    fn io_error_conversion_maps_to_io_variant() {
        let mapped = HostError::from(std::io::Error::other("permission denied"));
        assert!(
            matches!(mapped, HostError::IoError { kind, ref message } if kind == std::io::ErrorKind::Other && message.contains("permission denied"))
        );
    }

    #[test]
    fn command_failed_display_includes_stderr() {
        let error = HostError::CommandFailed {
            stderr: "code: command not found".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "Host command failed: code: command not found"
        );
    }

    #[test]
    fn host_specific_helper_keeps_context() {
        let error = HostError::host_specific("install", "extension host busy");
        assert_eq!(
            error.to_string(),
            "Host error in install: extension host busy"
        );
    }
}
