//! Scheduler.
//!
//! Walks the program body: tasks run through the executor, `RUNSEQ`
//! children run in order on the current worker, `RUNCON` children each get
//! a scoped worker and the block joins all of them before returning. Every
//! error lands in the caller's error list; nothing short-circuits, so one
//! run reports as much as possible.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use aicl_agent::{AgentConnector, AgentRegistry};
use aicl_ast::Node;
use aicl_runtime::{CancelToken, DataStore, Logger, PermissionTable, Scope, TaskIdGen};
use rand::Rng;

use crate::{executor, ExecError};

/// Pre-task scheduling jitter.
///
/// Each task dispatch sleeps a uniform random interval below the maximum.
/// The jitter deliberately randomizes interleavings inside `RUNCON` blocks
/// so schedule-dependent bugs surface under test rather than in the field.
#[derive(Debug, Clone, Copy)]
pub struct Jitter {
    max: Duration,
}

impl Jitter {
    /// The standard jitter: up to one second per task.
    pub fn standard() -> Self {
        Self {
            max: Duration::from_millis(1000),
        }
    }

    /// No jitter. For deterministic tests.
    pub fn none() -> Self {
        Self {
            max: Duration::ZERO,
        }
    }

    pub fn up_to(max: Duration) -> Self {
        Self { max }
    }

    fn sleep(&self) {
        if self.max.is_zero() {
            return;
        }
        let nanos = rand::thread_rng().gen_range(0..self.max.as_nanos());
        thread::sleep(Duration::from_nanos(nanos as u64));
    }
}

impl Default for Jitter {
    fn default() -> Self {
        Self::standard()
    }
}

/// Everything a scheduler worker needs, cheap to clone across threads.
#[derive(Clone)]
pub(crate) struct RunContext {
    pub store: Arc<DataStore>,
    pub permissions: Arc<PermissionTable>,
    pub registry: Arc<dyn AgentRegistry>,
    pub connector: Arc<dyn AgentConnector>,
    pub ids: Arc<TaskIdGen>,
    pub logger: Arc<Logger>,
    pub jitter: Jitter,
    pub cancel: CancelToken,
}

/// Execute one AST node, appending any failures to `errors`.
pub(crate) fn run_node(ctx: &RunContext, node: &Node, errors: &mut Vec<ExecError>) {
    match node {
        Node::Task(task) => {
            if ctx.cancel.is_cancelled() {
                ctx.logger
                    .append(format!("task '{}' skipped: run cancelled", task.name));
                errors.push(ExecError::Cancelled);
                return;
            }
            ctx.jitter.sleep();
            if let Err(e) = executor::execute_task(ctx, task) {
                errors.push(e);
            }
        }
        Node::Seq(block) => {
            for child in &block.children {
                run_node(ctx, child, errors);
            }
        }
        Node::Con(block) => {
            let mut scope = Scope::with_token(ctx.cancel.clone());
            let handles: Vec<_> = block
                .children
                .iter()
                .map(|child| {
                    let ctx = ctx.clone();
                    let node = child.node.clone();
                    let key = child.key.clone();
                    let handle = scope.spawn(move || {
                        tracing::debug!(child = %key, "running concurrent child");
                        let mut local = Vec::new();
                        run_node(&ctx, &node, &mut local);
                        local
                    });
                    (child.key.clone(), handle)
                })
                .collect();

            // The block returns only after every child has completed,
            // failures included.
            scope.join_all();
            for (key, handle) in handles {
                match handle.join() {
                    Ok(local) => errors.extend(local),
                    Err(task_err) => {
                        tracing::warn!(child = %key, error = %task_err, "concurrent child died");
                        errors.push(task_err.into());
                    }
                }
            }
        }
        Node::Wait(wait) => {
            // Parsed but not enforced: concurrent blocks already join all
            // of their children, and cross-block waits are undefined.
            tracing::debug!(tasks = ?wait.tasks, "WAIT statement ignored by the scheduler");
        }
    }
}
