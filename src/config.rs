//! Process-wide configuration, resolved once at startup.

use crate::command::CommandRunner;
use crate::executor::Executor;
use crate::toolchain::ToolchainTable;
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Settings shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct Config {
    /// TOML file overriding or extending the built-in toolchains
    #[arg(long, global = true, env = "CODERUN_TOOLCHAINS")]
    pub toolchains: Option<PathBuf>,

    /// Directory for per-execution scratch directories (default: OS temp dir)
    #[arg(long, global = true, env = "CODERUN_TEMP_DIR")]
    pub temp_dir: Option<PathBuf>,

    /// Working directory for terminal commands (default: current directory)
    #[arg(long, global = true, env = "CODERUN_APP_ROOT")]
    pub app_root: Option<PathBuf>,

    /// Run step timeout in seconds
    #[arg(long, global = true, default_value = "10")]
    pub run_timeout: u64,

    /// Compile step timeout in seconds
    #[arg(long, global = true, default_value = "15")]
    pub compile_timeout: u64,

    /// Terminal command timeout in seconds
    #[arg(long, global = true, default_value = "60")]
    pub command_timeout: u64,
}

impl Config {
    pub fn executor(&self) -> Result<Executor, String> {
        let table = match &self.toolchains {
            Some(path) => {
                info!(path = ?path, "Loading toolchain table");
                ToolchainTable::load(path)?
            }
            None => ToolchainTable::default(),
        };
        let temp_root = self.temp_dir.clone().unwrap_or_else(std::env::temp_dir);
        Ok(Executor::new(table, temp_root)
            .with_run_timeout(Duration::from_secs(self.run_timeout))
            .with_compile_timeout(Duration::from_secs(self.compile_timeout)))
    }

    pub fn command_runner(&self) -> Result<CommandRunner, String> {
        let root = match &self.app_root {
            Some(root) => root.clone(),
            None => std::env::current_dir().map_err(|e| format!("current dir: {}", e))?,
        };
        if !root.is_dir() {
            return Err(format!("app root {} is not a directory", root.display()));
        }
        Ok(CommandRunner::new(root).with_timeout(Duration::from_secs(self.command_timeout)))
    }
}
