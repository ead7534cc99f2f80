//! Shared application state.

use crate::command::CommandRunner;
use crate::executor::Executor;
use std::sync::Arc;

/// Built once from [`crate::config::Config`] and never mutated afterwards.
#[derive(Clone)]
pub struct AppState {
    pub executor: Arc<Executor>,
    pub runner: Arc<CommandRunner>,
}

impl AppState {
    pub fn new(executor: Executor, runner: CommandRunner) -> Self {
        Self {
            executor: Arc::new(executor),
            runner: Arc::new(runner),
        }
    }
}
