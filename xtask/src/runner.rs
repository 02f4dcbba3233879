//! Running external commands.

use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;

use crate::TaskError;

/// One external command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {:?}", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Executes invocations.
pub trait Runner {
    fn run(&mut self, invocation: &Invocation) -> Result<(), TaskError>;
}

/// Runs commands for real, inheriting stdio, from the workspace root.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    root: PathBuf,
}

impl SystemRunner {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl Runner for SystemRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<(), TaskError> {
        log::info!("$ {}", invocation);
        let status = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&self.root)
            .status()
            .map_err(|source| TaskError::Spawn {
                command: invocation.to_string(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(TaskError::Failed {
                command: invocation.to_string(),
                code: status.code(),
            })
        }
    }
}
