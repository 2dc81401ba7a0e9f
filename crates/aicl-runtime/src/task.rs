//! Task records.
//!
//! A `TaskRecord` is created when the scheduler reaches a task invocation
//! and is owned by that scheduler frame. Status moves Pending ->
//! InProgress -> Finished; `Claimed` is reserved for a future claiming
//! step. Ids come from a generator owned by the interpreter instance, so
//! they are monotonic per run session and reset with the interpreter.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde_json::{Map as JsonMap, Value};
use smol_str::SmolStr;

/// Unique identifier for a task record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

impl TaskId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic, concurrency-safe id source. One per interpreter instance.
#[derive(Debug, Default)]
pub struct TaskIdGen {
    counter: AtomicU64,
}

impl TaskIdGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> TaskId {
        TaskId(self.counter.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

/// Lifecycle of a task record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Claimed,
    InProgress,
    Finished,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "Pending"),
            TaskStatus::Claimed => write!(f, "Claimed"),
            TaskStatus::InProgress => write!(f, "In Progress"),
            TaskStatus::Finished => write!(f, "Finished"),
        }
    }
}

#[derive(Debug)]
struct TaskState {
    owner: String,
    status: TaskStatus,
    results: Vec<String>,
}

/// A unit of work handed to an agent.
#[derive(Debug)]
pub struct TaskRecord {
    id: TaskId,
    description: SmolStr,
    parameters: JsonMap<String, Value>,
    state: Mutex<TaskState>,
}

impl TaskRecord {
    pub fn new(ids: &TaskIdGen, description: SmolStr, parameters: JsonMap<String, Value>) -> Self {
        Self {
            id: ids.next_id(),
            description,
            parameters,
            state: Mutex::new(TaskState {
                owner: "None".to_string(),
                status: TaskStatus::Pending,
                results: Vec::new(),
            }),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Parameters are fixed at creation time.
    pub fn parameters(&self) -> &JsonMap<String, Value> {
        &self.parameters
    }

    pub fn status(&self) -> TaskStatus {
        self.state.lock().status
    }

    pub fn owner(&self) -> String {
        self.state.lock().owner.clone()
    }

    pub fn set_status(&self, status: TaskStatus) {
        self.state.lock().status = status;
    }

    pub fn set_owner(&self, owner: &str) {
        self.state.lock().owner = owner.to_string();
    }

    pub fn push_result(&self, result: String) {
        self.state.lock().results.push(result);
    }

    pub fn results(&self) -> Vec<String> {
        self.state.lock().results.clone()
    }
}

impl fmt::Display for TaskRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        write!(
            f,
            "Task ID: {}\nDescription: {}\nStatus: {}\nOwner: {}\nParameters: {}\nResults: {:?}",
            self.id,
            self.description,
            state.status,
            state.owner,
            Value::Object(self.parameters.clone()),
            state.results,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_ids_are_monotonic() {
        let ids = TaskIdGen::new();
        let first = ids.next_id();
        let second = ids.next_id();
        assert!(second.as_u64() > first.as_u64());
        assert_eq!(first.as_u64(), 1);
    }

    #[test]
    fn test_ids_unique_across_threads() {
        let ids = Arc::new(TaskIdGen::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ids = Arc::clone(&ids);
                thread::spawn(move || (0..100).map(|_| ids.next_id().as_u64()).collect::<Vec<_>>())
            })
            .collect();

        let mut all: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 800);
    }

    #[test]
    fn test_lifecycle() {
        let ids = TaskIdGen::new();
        let record = TaskRecord::new(&ids, "FetchData".into(), JsonMap::new());

        assert_eq!(record.status(), TaskStatus::Pending);
        assert_eq!(record.owner(), "None");

        record.set_owner("AG123");
        record.set_status(TaskStatus::InProgress);
        record.push_result("simulated response".to_string());
        record.set_status(TaskStatus::Finished);

        assert_eq!(record.status(), TaskStatus::Finished);
        assert_eq!(record.owner(), "AG123");
        assert_eq!(record.results(), vec!["simulated response".to_string()]);
    }

    #[test]
    fn test_display_includes_fields() {
        let ids = TaskIdGen::new();
        let mut parameters = JsonMap::new();
        parameters.insert("input".to_string(), Value::String("data1".to_string()));
        let record = TaskRecord::new(&ids, "ProcessData".into(), parameters);
        record.set_status(TaskStatus::InProgress);

        let text = record.to_string();
        assert!(text.contains("Task ID: 1"));
        assert!(text.contains("Description: ProcessData"));
        assert!(text.contains("Status: In Progress"));
        assert!(text.contains("input"));
    }
}
