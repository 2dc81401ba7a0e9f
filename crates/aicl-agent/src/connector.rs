//! Agent invocation boundary.

use std::thread;
use std::time::Duration;

use thiserror::Error;

use crate::AgentDescriptor;

/// Errors surfaced by an agent transport.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum InvokeError {
    #[error("agent '{agent}' invocation failed: {message}")]
    Transport { agent: String, message: String },
}

/// Delivers a request payload to an agent and returns its response.
///
/// Synchronous from the executor's point of view; implementations may
/// block the invoking worker on I/O.
pub trait AgentConnector: Send + Sync {
    fn invoke(&self, agent: &AgentDescriptor, payload: &str) -> Result<String, InvokeError>;
}

/// The reference connector: pretends to call the agent's endpoint and
/// returns a fixed response after a short delay.
#[derive(Debug, Clone)]
pub struct SimulatedConnector {
    delay: Duration,
}

impl SimulatedConnector {
    pub fn new() -> Self {
        Self {
            delay: Duration::from_millis(250),
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for SimulatedConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentConnector for SimulatedConnector {
    fn invoke(&self, agent: &AgentDescriptor, payload: &str) -> Result<String, InvokeError> {
        tracing::debug!(endpoint = %agent.endpoint, %payload, "simulating agent call");
        thread::sleep(self.delay);
        Ok("simulated response".to_string())
    }
}
