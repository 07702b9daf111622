mod cmd_hook;
mod cmd_log;
mod cmd_status;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "vigil", version, about = "Session-lifecycle coordinator for Claude Code")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Handle a hook event (reads JSON from stdin)
    Hook {
        /// Which hook role this invocation plays
        #[arg(value_enum)]
        role: RoleArg,
    },
    /// Show coordinator state for the current project
    Status,
    /// Print an audit log
    Log {
        #[arg(value_enum)]
        which: LogArg,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RoleArg {
    Sync,
    Inject,
    Guard,
    Cleanup,
}

impl From<RoleArg> for vigil_bridge::Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Sync => vigil_bridge::Role::Sync,
            RoleArg::Inject => vigil_bridge::Role::Inject,
            RoleArg::Guard => vigil_bridge::Role::Guard,
            RoleArg::Cleanup => vigil_bridge::Role::Cleanup,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogArg {
    /// Sync run records
    Runs,
    /// Token-usage estimations
    Estimates,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Hook { role } => cmd_hook::run(role.into()),
        Command::Status => cmd_status::run(),
        Command::Log { which } => cmd_log::run(which),
    }
}

/// Logs go to stderr: stdout belongs to the hook output contract.
/// Off by default; `VIGIL_LOG=debug` (etc.) turns it on.
fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_env("VIGIL_LOG").unwrap_or_else(|_| EnvFilter::new("off"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
