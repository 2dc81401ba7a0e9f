//! Agent boundary for AICL.
//!
//! Everything the interpreter knows about agents lives behind two traits:
//! a registry that resolves names to descriptors, and a connector that
//! delivers a request payload and returns the agent's response. The
//! shipped implementations are a static in-memory registry and a
//! simulated connector; real transports plug in behind the same traits.

mod connector;
mod descriptor;
mod registry;
mod template;

pub use connector::{AgentConnector, InvokeError, SimulatedConnector};
pub use descriptor::AgentDescriptor;
pub use registry::{AgentRegistry, StaticRegistry};
pub use template::{render, TemplateError};
