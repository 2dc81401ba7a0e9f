//! AICL abstract syntax tree.
//!
//! Defines the parsed form of an AICL script: global data declarations,
//! per-agent permission grants, and the tree of task invocations and
//! composition blocks the scheduler walks.

use std::collections::BTreeSet;
use std::fmt;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

// Re-export common types for use by other crates
pub use aicl_lexer::Span;
pub use smol_str::SmolStr;

/// A complete AICL program.
///
/// `globals` and `permissions` keep declaration order so snapshots and
/// diagnostics render deterministically. Top-level statements appear in
/// `body` in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub globals: IndexMap<SmolStr, DataDecl>,
    pub permissions: IndexMap<SmolStr, PermissionGrant>,
    pub body: Vec<Node>,
}

/// A global data declaration: `DATA name TYPE ty [VALUE literal] ;`
///
/// The type is a free-form tag ("String", "Int", "Map", ...); values are
/// propagated as text and semantic typing is deliberately not enforced.
#[derive(Debug, Clone, PartialEq)]
pub struct DataDecl {
    pub name: SmolStr,
    pub ty: SmolStr,
    pub initial: Option<SmolStr>,
}

/// An access right an agent can hold on a data variable.
///
/// `Add` is reserved: it parses and unions like the others but nothing in
/// the runtime consults it yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AccessRight {
    Read,
    Write,
    Add,
}

impl AccessRight {
    /// Parse an access tag. Tags are case-insensitive; unknown tags yield
    /// `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        if tag.eq_ignore_ascii_case("READ") {
            Some(AccessRight::Read)
        } else if tag.eq_ignore_ascii_case("WRITE") {
            Some(AccessRight::Write)
        } else if tag.eq_ignore_ascii_case("ADD") {
            Some(AccessRight::Add)
        } else {
            None
        }
    }
}

impl fmt::Display for AccessRight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessRight::Read => write!(f, "READ"),
            AccessRight::Write => write!(f, "WRITE"),
            AccessRight::Add => write!(f, "ADD"),
        }
    }
}

/// The rights one agent holds, keyed by variable name.
///
/// Repeated `PERM` clauses for the same `(agent, variable)` pair union
/// their rights.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PermissionGrant {
    pub agent: SmolStr,
    pub grants: FxHashMap<SmolStr, BTreeSet<AccessRight>>,
}

impl PermissionGrant {
    pub fn new(agent: SmolStr) -> Self {
        Self {
            agent,
            grants: FxHashMap::default(),
        }
    }

    /// Add a right on a variable, unioning with any existing grant.
    pub fn grant(&mut self, variable: SmolStr, right: AccessRight) {
        self.grants.entry(variable).or_default().insert(right);
    }

    /// Check whether this grant includes `right` on `variable`.
    pub fn allows(&self, variable: &str, right: AccessRight) -> bool {
        self.grants
            .get(variable)
            .is_some_and(|rights| rights.contains(&right))
    }
}

/// A statement in a program body or composition block.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Task(TaskCall),
    Seq(SeqBlock),
    Con(ConBlock),
    Wait(WaitStmt),
}

/// A task invocation: `TASK name AGENT agent PARAMETERS (k=v, ...) ;`
///
/// Parameter values are untyped literal text at this stage.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskCall {
    pub name: SmolStr,
    pub agent: SmolStr,
    pub parameters: IndexMap<SmolStr, SmolStr>,
}

/// A `RUNSEQ { ... }` block. Children run in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeqBlock {
    pub children: Vec<Node>,
}

/// A `RUNCON { ... }` block. Execution is order-independent; each child
/// carries a synthesized key (task name, or `RUNSEQ_<n>` / `RUNCON_<n>` /
/// `WAIT_<n>`) used only to name it in logs and diagnostics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConBlock {
    pub children: Vec<ConChild>,
}

/// One labelled child of a `RUNCON` block.
#[derive(Debug, Clone, PartialEq)]
pub struct ConChild {
    pub key: SmolStr,
    pub node: Node,
}

/// A `WAIT name, ... ;` statement. Recorded in the AST; the scheduler does
/// not enforce it because `RUNCON` already joins all of its children.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaitStmt {
    pub tasks: Vec<SmolStr>,
}
