use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use simplelog::ColorChoice;
use simplelog::Config;
use simplelog::LevelFilter;
use simplelog::TermLogger;
use simplelog::TerminalMode;
use xtask::SystemRunner;
use xtask::Task;

#[derive(Debug, Parser)]
#[command(name = "xtask", about = "Workspace build targets")]
struct Cli {
    #[command(subcommand)]
    task: Task,
}

fn main() -> ExitCode {
    let _ = TermLogger::init(
        LevelFilter::Info,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );

    let cli = Cli::parse();
    let root = workspace_root();
    let mut runner = SystemRunner::new(&root);

    match cli.task.execute(&root, &mut runner) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{}", err);
            err.exit_code()
        }
    }
}

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}
