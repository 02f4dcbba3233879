//! The targets themselves.

use std::fs;
use std::io;
use std::path::Path;

use clap::Subcommand;

use crate::Invocation;
use crate::Runner;
use crate::TaskError;

/// Directories removed by `clean`, relative to the workspace root.
pub const CLEAN_DIRS: &[&str] = &["target", "coverage", ".quizbot-cache"];

const GIT_USAGE: &str = "usage: make git MSG=\"commit message\"";

/// A build or deployment target.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Task {
    /// Build and start the container, then follow its logs.
    Up,
    /// Stop and remove the container.
    Down,
    /// `down`, then `up` without following logs.
    Restart,
    /// Follow container logs.
    Logs,
    /// Run the bot locally in release mode.
    Run,
    /// Create the database schema.
    DbInit,
    /// Clippy with warnings as errors, then a formatting check.
    Lint,
    /// Apply clippy fixes, then format.
    Fmt,
    /// Remove build and cache directories.
    Clean,
    /// Stage everything, commit with the message and push.
    Git {
        /// Commit message.
        #[arg(long, short, env = "MSG", default_value = "")]
        message: String,
    },
}

impl Task {
    /// The commands this target runs, in order.
    ///
    /// `clean` touches the filesystem directly and has none.
    pub fn commands(&self) -> Result<Vec<Invocation>, TaskError> {
        let compose = |args: &[&str]| {
            let mut all = vec!["compose"];
            all.extend_from_slice(args);
            Invocation::new("docker", all)
        };
        let cargo = |args: &[&str]| Invocation::new("cargo", args.iter().copied());

        let commands = match self {
            // `fetch` writes Cargo.lock when missing; the image builds `--locked`.
            Task::Up => vec![
                cargo(&["fetch"]),
                compose(&["up", "-d", "--build"]),
                compose(&["logs", "-f"]),
            ],
            Task::Down => vec![compose(&["down"])],
            Task::Restart => vec![
                compose(&["down"]),
                cargo(&["fetch"]),
                compose(&["up", "-d", "--build"]),
            ],
            Task::Logs => vec![compose(&["logs", "-f"])],
            Task::Run => vec![cargo(&["run", "--release", "-p", "quizbot", "--", "run"])],
            Task::DbInit => vec![cargo(&["run", "-p", "quizbot", "--", "db-init"])],
            Task::Lint => vec![
                cargo(&["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"]),
                cargo(&["fmt", "--all", "--", "--check"]),
            ],
            Task::Fmt => vec![
                cargo(&[
                    "clippy",
                    "--workspace",
                    "--all-targets",
                    "--fix",
                    "--allow-dirty",
                    "--allow-staged",
                ]),
                cargo(&["fmt", "--all"]),
                // `--fix` exits 0 with warnings left over; this step fails on them.
                cargo(&["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"]),
            ],
            Task::Clean => Vec::new(),
            Task::Git { message } => {
                if message.trim().is_empty() {
                    return Err(TaskError::Usage(GIT_USAGE.to_string()));
                }
                vec![
                    Invocation::new("git", ["add", "-A"]),
                    Invocation::new("git", ["commit", "-m", message.as_str()]),
                    Invocation::new("git", ["push"]),
                ]
            }
        };
        Ok(commands)
    }

    /// Runs the target from `root`, stopping at the first failing command.
    pub fn execute(&self, root: &Path, runner: &mut dyn Runner) -> Result<(), TaskError> {
        if *self == Task::Clean {
            clean(root);
            return Ok(());
        }
        for invocation in self.commands()? {
            runner.run(&invocation)?;
        }
        Ok(())
    }
}

/// Removes [`CLEAN_DIRS`] under `root`. Missing directories are skipped and
/// other failures only logged.
pub fn clean(root: &Path) {
    for dir in CLEAN_DIRS {
        let path = root.join(dir);
        match fs::remove_dir_all(&path) {
            Ok(()) => log::info!("removed {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("could not remove {}: {}", path.display(), e),
        }
    }
}
