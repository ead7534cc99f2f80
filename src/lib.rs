//! Coderun - time-bounded execution of submitted code and terminal commands.

pub mod artifact;
pub mod command;
pub mod config;
pub mod error;
pub mod executor;
pub mod http_server;
pub mod process;
pub mod state;
pub mod toolchain;

pub use command::{CommandResult, CommandRunner};
pub use error::{ErrorKind, ExecError};
pub use executor::{ExecutionResult, Executor};
