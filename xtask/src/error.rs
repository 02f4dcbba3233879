//! Task failures and their exit codes.

use std::process::ExitCode;

/// Why a target failed.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The target was invoked without a required argument.
    #[error("{0}")]
    Usage(String),

    /// The external tool could not be started.
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The external tool exited unsuccessfully. `code` is `None` when it was
    /// killed by a signal.
    #[error("`{command}` failed with {}", describe(.code))]
    Failed { command: String, code: Option<i32> },
}

fn describe(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "a signal".to_string(),
    }
}

impl TaskError {
    /// Process exit code for this failure: the tool's own code when it has
    /// one, 2 for usage errors, 1 otherwise.
    pub fn code(&self) -> u8 {
        match self {
            Self::Usage(_) => 2,
            Self::Failed {
                code: Some(code), ..
            } => u8::try_from(*code).ok().filter(|c| *c != 0).unwrap_or(1),
            Self::Failed { code: None, .. } | Self::Spawn { .. } => 1,
        }
    }

    /// Same as [`code`](Self::code), as an [`ExitCode`].
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }
}
