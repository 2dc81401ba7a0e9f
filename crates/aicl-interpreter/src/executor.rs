//! Task executor.
//!
//! One call per task invocation: resolve the agent, filter the globals
//! down to what the agent may read, fill the agent's request template,
//! invoke the boundary, and write the response back under WRITE
//! permission when the task names an `OUTPUT` variable. The full story of
//! an execution is appended to the run log as a single batch so its lines
//! stay contiguous under concurrency.

use aicl_ast::{AccessRight, TaskCall};
use aicl_runtime::{TaskRecord, TaskStatus};
use serde_json::{Map as JsonMap, Value};

use crate::scheduler::RunContext;
use crate::ExecError;

/// The parameter that routes an agent's response back into the store.
const OUTPUT_PARAM: &str = "OUTPUT";

/// Run one task to completion. On failure the accumulated log lines plus
/// a failure line are flushed before the error is returned, so no failure
/// is silent.
pub(crate) fn execute_task(ctx: &RunContext, task: &TaskCall) -> Result<(), ExecError> {
    let Some(agent) = ctx.registry.lookup(&task.agent) else {
        let err = ExecError::AgentNotFound(task.agent.clone());
        ctx.logger
            .append(format!("task '{}' failed: {}", task.name, err));
        return Err(err);
    };

    let parameters: JsonMap<String, Value> = task
        .parameters
        .iter()
        .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
        .collect();

    let record = TaskRecord::new(&ctx.ids, task.name.clone(), parameters);
    record.set_owner(&agent.id);
    record.set_status(TaskStatus::InProgress);

    let mut lines = vec![format!("starting task\n{record}")];

    let fail = |lines: &mut Vec<String>, err: ExecError| -> ExecError {
        lines.push(format!("task '{}' failed: {}", task.name, err));
        ctx.logger.append_batch(lines.drain(..));
        err
    };

    // Globals the agent is allowed to see.
    let readable = ctx
        .store
        .filtered_snapshot(|name| ctx.permissions.has(&task.agent, name, AccessRight::Read));
    lines.push(format!(
        "readable globals for agent '{}': {}",
        task.agent,
        Value::Object(readable.clone())
    ));

    let payload = match aicl_agent::render(&agent.request_template, record.parameters(), &readable)
    {
        Ok(payload) => payload,
        Err(e) => return Err(fail(&mut lines, e.into())),
    };
    lines.push(format!("payload for task '{}': {}", task.name, payload));

    let response = match ctx.connector.invoke(&agent, &payload) {
        Ok(response) => response,
        Err(e) => return Err(fail(&mut lines, e.into())),
    };
    lines.push(format!("response for task '{}': {}", task.name, response));

    if let Some(output) = record.parameters().get(OUTPUT_PARAM) {
        let Value::String(variable) = output else {
            return Err(fail(&mut lines, ExecError::TypeError(OUTPUT_PARAM.into())));
        };
        if !ctx
            .permissions
            .has(&task.agent, variable, AccessRight::Write)
        {
            return Err(fail(
                &mut lines,
                ExecError::PermissionDenied {
                    agent: task.agent.clone(),
                    variable: variable.as_str().into(),
                    right: AccessRight::Write,
                },
            ));
        }
        if !ctx.store.write(variable, response.clone()) {
            return Err(fail(
                &mut lines,
                ExecError::UnknownVariable(variable.as_str().into()),
            ));
        }
    }

    record.push_result(response);
    record.set_status(TaskStatus::Finished);

    lines.push(format!(
        "globals after task '{}': {}",
        task.name,
        Value::Object(ctx.store.snapshot())
    ));
    lines.push(format!("finished task\n{record}"));
    ctx.logger.append_batch(lines);

    Ok(())
}
