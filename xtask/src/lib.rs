//! Build and deployment targets for the workspace.
//!
//! `make <target>` forwards to `cargo xtask <target>`. Each target is a fixed
//! sequence of external commands run through a [`Runner`], stopping at the
//! first failure.

mod error;
mod runner;
mod tasks;

pub use error::TaskError;
pub use runner::Invocation;
pub use runner::Runner;
pub use runner::SystemRunner;
pub use tasks::CLEAN_DIRS;
pub use tasks::Task;
pub use tasks::clean;
