//! Tree-walking interpreter for AICL programs.
//!
//! The interpreter walks a parsed program's body, running `RUNSEQ` blocks
//! in source order and fanning `RUNCON` blocks out across scoped workers.
//! Each task invocation goes through the permission-checked executor.
//! Executor failures never abort the walk; they accumulate into one error
//! list and the run is successful iff that list is empty at the end.

use std::sync::Arc;

use aicl_agent::{AgentConnector, AgentRegistry, SimulatedConnector, StaticRegistry};
use aicl_ast::{AccessRight, Program, SmolStr};
use aicl_runtime::{CancelToken, DataStore, Logger, PermissionTable, TaskError, TaskIdGen};
use thiserror::Error;

mod executor;
mod scheduler;

pub use scheduler::Jitter;

/// Errors produced while executing a program. Aggregated by the scheduler;
/// nothing here short-circuits a run.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExecError {
    #[error("agent not found: {0}")]
    AgentNotFound(SmolStr),

    #[error("agent '{agent}' lacks {right} permission on '{variable}'")]
    PermissionDenied {
        agent: SmolStr,
        variable: SmolStr,
        right: AccessRight,
    },

    #[error("unknown variable: {0}")]
    UnknownVariable(SmolStr),

    #[error("parameter '{0}' must be a string naming a variable")]
    TypeError(SmolStr),

    #[error("template error: {0}")]
    Template(#[from] aicl_agent::TemplateError),

    #[error("agent invocation error: {0}")]
    Invocation(#[from] aicl_agent::InvokeError),

    #[error("task was cancelled")]
    Cancelled,

    #[error("worker panicked: {0}")]
    WorkerPanic(String),
}

impl From<TaskError> for ExecError {
    fn from(err: TaskError) -> Self {
        match err {
            TaskError::Cancelled => ExecError::Cancelled,
            TaskError::Panicked(msg) => ExecError::WorkerPanic(msg),
        }
    }
}

/// The result of running one program.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub errors: Vec<ExecError>,
    pub store: Arc<DataStore>,
}

impl RunOutcome {
    /// A run is successful iff no executor error was recorded.
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// The interpreter: an agent boundary plus scheduling policy.
///
/// The default configuration uses the built-in simulated agent fleet and
/// connector; embedders substitute their own registry and transport.
pub struct Interpreter {
    registry: Arc<dyn AgentRegistry>,
    connector: Arc<dyn AgentConnector>,
    ids: Arc<TaskIdGen>,
    jitter: Jitter,
    cancel: CancelToken,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_boundary(
            Arc::new(StaticRegistry::sample()),
            Arc::new(SimulatedConnector::new()),
        )
    }

    pub fn with_boundary(
        registry: Arc<dyn AgentRegistry>,
        connector: Arc<dyn AgentConnector>,
    ) -> Self {
        Self {
            registry,
            connector,
            ids: Arc::new(TaskIdGen::new()),
            jitter: Jitter::standard(),
            cancel: CancelToken::new(),
        }
    }

    /// Override the pre-task scheduling jitter. Tests use `Jitter::none()`.
    pub fn with_jitter(mut self, jitter: Jitter) -> Self {
        self.jitter = jitter;
        self
    }

    /// Token for cancelling runs in flight. Cancellation is cooperative:
    /// tasks already dispatched finish, blocks still join their children.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run a parsed program to completion.
    pub fn run(&self, program: &Program, logger: Arc<Logger>) -> RunOutcome {
        let ctx = scheduler::RunContext {
            store: Arc::new(DataStore::from_globals(&program.globals)),
            permissions: Arc::new(PermissionTable::from_grants(&program.permissions)),
            registry: Arc::clone(&self.registry),
            connector: Arc::clone(&self.connector),
            ids: Arc::clone(&self.ids),
            logger,
            jitter: self.jitter,
            cancel: self.cancel.clone(),
        };

        let mut errors = Vec::new();
        for node in &program.body {
            scheduler::run_node(&ctx, node, &mut errors);
        }

        if !errors.is_empty() {
            tracing::warn!(count = errors.len(), "run finished with errors");
        }

        RunOutcome {
            errors,
            store: ctx.store,
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}
