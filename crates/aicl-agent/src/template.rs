//! Request template engine.
//!
//! An agent's request template is a JSON value whose string leaves may be
//! placeholders of the exact form `[[name]]`. Filling a template replaces
//! each placeholder with the value bound to `name`, searching the task's
//! parameters first and then the globals the agent may read. Substitution
//! is all-or-nothing: one unresolved placeholder fails the whole request,
//! because a partially filled payload would silently misinform the agent.

use serde_json::{Map as JsonMap, Value};
use thiserror::Error;

/// Template failure.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TemplateError {
    #[error("unresolved placeholder '{0}'")]
    Unresolved(String),
}

/// Fill `template` and serialize the result to canonical JSON text.
pub fn render(
    template: &Value,
    parameters: &JsonMap<String, Value>,
    globals: &JsonMap<String, Value>,
) -> Result<String, TemplateError> {
    let mut filled = template.clone();
    fill(&mut filled, parameters, globals)?;
    Ok(filled.to_string())
}

fn fill(
    value: &mut Value,
    parameters: &JsonMap<String, Value>,
    globals: &JsonMap<String, Value>,
) -> Result<(), TemplateError> {
    match value {
        Value::String(text) => {
            if let Some(name) = placeholder_name(text) {
                let bound = parameters
                    .get(name)
                    .or_else(|| globals.get(name))
                    .ok_or_else(|| TemplateError::Unresolved(name.to_string()))?;
                *value = bound.clone();
            }
        }
        Value::Array(items) => {
            for item in items {
                fill(item, parameters, globals)?;
            }
        }
        Value::Object(map) => {
            for (_, item) in map.iter_mut() {
                fill(item, parameters, globals)?;
            }
        }
        // Non-string leaves pass through untouched.
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
    Ok(())
}

/// A string is a placeholder iff it has the exact shape `[[name]]` with a
/// non-empty inner token.
fn placeholder_name(text: &str) -> Option<&str> {
    let inner = text.strip_prefix("[[")?.strip_suffix("]]")?;
    (!inner.is_empty()).then_some(inner)
}
