//! End-to-end tests for the AICL interpreter: parse a script, run it
//! against stub agents, inspect the final data store and the execution
//! log.

use std::sync::Arc;

use aicl_agent::{AgentConnector, AgentDescriptor, InvokeError, StaticRegistry};
use aicl_ast::AccessRight;
use aicl_interpreter::{ExecError, Interpreter, Jitter, RunOutcome};
use aicl_parser::parse;
use aicl_runtime::Logger;
use serde_json::{json, Value};

/// Connector returning a fixed response for every invocation.
struct FixedResponse(&'static str);

impl AgentConnector for FixedResponse {
    fn invoke(&self, _agent: &AgentDescriptor, _payload: &str) -> Result<String, InvokeError> {
        Ok(self.0.to_string())
    }
}

/// Connector whose response names the invoked agent.
struct NamedResponse;

impl AgentConnector for NamedResponse {
    fn invoke(&self, agent: &AgentDescriptor, _payload: &str) -> Result<String, InvokeError> {
        Ok(format!("response from {}", agent.name))
    }
}

/// Connector that echoes the request payload back as the response.
struct PayloadEcho;

impl AgentConnector for PayloadEcho {
    fn invoke(&self, _agent: &AgentDescriptor, payload: &str) -> Result<String, InvokeError> {
        Ok(payload.to_string())
    }
}

fn stub_agent(name: &str, template: Value) -> AgentDescriptor {
    AgentDescriptor::new(
        format!("ID-{name}"),
        name,
        "Test",
        "https://agents.test",
        template,
        vec![],
    )
}

fn run_with(
    source: &str,
    agents: Vec<AgentDescriptor>,
    connector: Arc<dyn AgentConnector>,
) -> (RunOutcome, Arc<Logger>) {
    let (program, errors) = parse(source);
    assert!(errors.is_empty(), "parse errors: {errors:?}");

    let logger = Arc::new(Logger::new());
    let interpreter = Interpreter::with_boundary(Arc::new(StaticRegistry::new(agents)), connector)
        .with_jitter(Jitter::none());
    let outcome = interpreter.run(&program, Arc::clone(&logger));
    (outcome, logger)
}

#[test]
fn single_task_write() {
    let (outcome, _) = run_with(
        r#"START
           DATA x TYPE String ;
           PERM AGENT A DATA x ACCESS WRITE ;
           RUNSEQ { TASK T AGENT A PARAMETERS (OUTPUT=x) ; }
           END"#,
        vec![stub_agent("A", json!({"action": "run"}))],
        Arc::new(FixedResponse("R")),
    );

    assert!(outcome.success(), "errors: {:?}", outcome.errors);
    assert_eq!(outcome.store.read("x"), Some("R".to_string()));
}

#[test]
fn write_without_permission_is_denied() {
    let (outcome, _) = run_with(
        r#"START
           DATA x TYPE String ;
           PERM AGENT A DATA x ACCESS READ ;
           RUNSEQ { TASK T AGENT A PARAMETERS (OUTPUT=x) ; }
           END"#,
        vec![stub_agent("A", json!({"action": "run"}))],
        Arc::new(FixedResponse("R")),
    );

    assert_eq!(
        outcome.errors,
        vec![ExecError::PermissionDenied {
            agent: "A".into(),
            variable: "x".into(),
            right: AccessRight::Write,
        }]
    );
    assert_eq!(outcome.store.read("x"), Some(String::new()));
}

#[test]
fn unknown_agent() {
    let (outcome, _) = run_with(
        r#"START
           RUNSEQ { TASK T AGENT Ghost PARAMETERS () ; }
           END"#,
        vec![stub_agent("A", json!({}))],
        Arc::new(FixedResponse("R")),
    );

    assert_eq!(outcome.errors, vec![ExecError::AgentNotFound("Ghost".into())]);
}

#[test]
fn concurrent_independent_writes() {
    let (outcome, logger) = run_with(
        r#"START
           DATA t1 TYPE String ;
           DATA t2 TYPE String ;
           PERM AGENT Worker1 DATA t1 ACCESS WRITE ;
           PERM AGENT Worker2 DATA t2 ACCESS WRITE ;
           RUNCON {
               TASK T1 AGENT Worker1 PARAMETERS (OUTPUT=t1) ;
               TASK T2 AGENT Worker2 PARAMETERS (OUTPUT=t2) ;
           }
           END"#,
        vec![
            stub_agent("Worker1", json!({"action": "run"})),
            stub_agent("Worker2", json!({"action": "run"})),
        ],
        Arc::new(FixedResponse("R")),
    );

    assert!(outcome.success(), "errors: {:?}", outcome.errors);
    assert_eq!(outcome.store.read("t1"), Some("R".to_string()));
    assert_eq!(outcome.store.read("t2"), Some("R".to_string()));

    // Each task's batch must be one contiguous run in the log even though
    // the two tasks executed concurrently.
    let entries = logger.snapshot();
    for task in ["T1", "T2"] {
        let start = entries
            .iter()
            .position(|e| e.message == format!("payload for task '{task}': {{\"action\":\"run\"}}"))
            .expect("payload line missing");
        assert!(entries[start + 1]
            .message
            .starts_with(&format!("response for task '{task}'")));
        assert!(entries[start + 2]
            .message
            .starts_with(&format!("globals after task '{task}'")));
    }
}

#[test]
fn unresolved_template_placeholder() {
    let (outcome, _) = run_with(
        r#"START
           DATA x TYPE String ;
           PERM AGENT A DATA x ACCESS WRITE ;
           RUNSEQ { TASK T AGENT A PARAMETERS (OUTPUT=x) ; }
           END"#,
        vec![stub_agent("A", json!({"p": "[[missing]]"}))],
        Arc::new(FixedResponse("R")),
    );

    assert_eq!(
        outcome.errors,
        vec![ExecError::Template(aicl_agent::TemplateError::Unresolved(
            "missing".to_string()
        ))]
    );
    // The task never reached its write.
    assert_eq!(outcome.store.read("x"), Some(String::new()));
}

#[test]
fn sequential_block_continues_past_errors() {
    let (outcome, _) = run_with(
        r#"START
           DATA a TYPE String ;
           DATA b TYPE String ;
           PERM AGENT A DATA a ACCESS READ ;
           PERM AGENT B DATA b ACCESS WRITE ;
           RUNSEQ {
               TASK Denied AGENT A PARAMETERS (OUTPUT=a) ;
               TASK Allowed AGENT B PARAMETERS (OUTPUT=b) ;
           }
           END"#,
        vec![
            stub_agent("A", json!({"action": "run"})),
            stub_agent("B", json!({"action": "run"})),
        ],
        Arc::new(FixedResponse("R")),
    );

    assert_eq!(outcome.errors.len(), 1);
    assert!(matches!(
        &outcome.errors[0],
        ExecError::PermissionDenied { agent, .. } if agent == "A"
    ));
    // The failing task did not stop its successor.
    assert_eq!(outcome.store.read("a"), Some(String::new()));
    assert_eq!(outcome.store.read("b"), Some("R".to_string()));
}

#[test]
fn payload_carries_global_iff_readable() {
    let source = r#"START
        DATA origin TYPE String VALUE "Chicago" ;
        DATA out TYPE String ;
        PERM AGENT A DATA origin ACCESS READ ;
        PERM AGENT A DATA out ACCESS WRITE ;
        RUNSEQ { TASK T AGENT A PARAMETERS (OUTPUT=out) ; }
        END"#;

    // With READ: the template placeholder resolves from the globals and
    // the echoed payload lands in `out`.
    let (outcome, _) = run_with(
        source,
        vec![stub_agent("A", json!({"origin": "[[origin]]"}))],
        Arc::new(PayloadEcho),
    );
    assert!(outcome.success());
    assert_eq!(
        outcome.store.read("out"),
        Some(r#"{"origin":"Chicago"}"#.to_string())
    );

    // Without READ the same template cannot resolve: the global is
    // invisible, not merely empty.
    let source_no_read = source.replace("ACCESS READ", "ACCESS WRITE");
    let (outcome, _) = run_with(
        &source_no_read,
        vec![stub_agent("A", json!({"origin": "[[origin]]"}))],
        Arc::new(PayloadEcho),
    );
    assert_eq!(
        outcome.errors,
        vec![ExecError::Template(aicl_agent::TemplateError::Unresolved(
            "origin".to_string()
        ))]
    );
}

#[test]
fn sequential_tasks_observe_prior_writes() {
    let (outcome, _) = run_with(
        r#"START
           DATA x TYPE String ;
           DATA y TYPE String ;
           PERM AGENT Producer DATA x ACCESS WRITE ;
           PERM AGENT Consumer DATA x ACCESS READ ;
           PERM AGENT Consumer DATA y ACCESS WRITE ;
           RUNSEQ {
               TASK Produce AGENT Producer PARAMETERS (OUTPUT=x) ;
               TASK Consume AGENT Consumer PARAMETERS (OUTPUT=y) ;
           }
           END"#,
        vec![
            stub_agent("Producer", json!({"action": "produce"})),
            stub_agent("Consumer", json!({"seen": "[[x]]"})),
        ],
        Arc::new(PayloadEcho),
    );

    assert!(outcome.success(), "errors: {:?}", outcome.errors);
    // Consume's payload saw Produce's write, proving source order inside
    // RUNSEQ. (PayloadEcho makes the producer write its own payload.)
    assert_eq!(
        outcome.store.read("y"),
        Some(r#"{"seen":"{\"action\":\"produce\"}"}"#.to_string())
    );
}

#[test]
fn concurrent_writers_of_one_cell_never_tear() {
    let (outcome, _) = run_with(
        r#"START
           DATA shared TYPE String ;
           PERM AGENT W1 DATA shared ACCESS WRITE ;
           PERM AGENT W2 DATA shared ACCESS WRITE ;
           RUNCON {
               TASK A AGENT W1 PARAMETERS (OUTPUT=shared) ;
               TASK B AGENT W2 PARAMETERS (OUTPUT=shared) ;
           }
           END"#,
        vec![
            stub_agent("W1", json!({"action": "run"})),
            stub_agent("W2", json!({"action": "run"})),
        ],
        Arc::new(NamedResponse),
    );

    assert!(outcome.success());
    let last = outcome.store.read("shared").unwrap();
    assert!(
        last == "response from W1" || last == "response from W2",
        "torn value: {last}"
    );
}

#[test]
fn nested_blocks_run_to_completion() {
    let (outcome, _) = run_with(
        r#"START
           DATA a TYPE String ;
           DATA b TYPE String ;
           DATA c TYPE String ;
           PERM AGENT A DATA a ACCESS WRITE ;
           PERM AGENT B DATA b ACCESS WRITE ;
           PERM AGENT C DATA c ACCESS WRITE ;
           RUNSEQ {
               RUNCON {
                   RUNSEQ {
                       TASK First AGENT A PARAMETERS (OUTPUT=a) ;
                       TASK Second AGENT B PARAMETERS (OUTPUT=b) ;
                   }
                   TASK Third AGENT C PARAMETERS (OUTPUT=c) ;
               }
               WAIT First, Third ;
           }
           END"#,
        vec![
            stub_agent("A", json!({})),
            stub_agent("B", json!({})),
            stub_agent("C", json!({})),
        ],
        Arc::new(FixedResponse("done")),
    );

    assert!(outcome.success(), "errors: {:?}", outcome.errors);
    for variable in ["a", "b", "c"] {
        assert_eq!(outcome.store.read(variable), Some("done".to_string()));
    }
}

#[test]
fn output_must_name_an_existing_variable() {
    let (outcome, _) = run_with(
        r#"START
           PERM AGENT A DATA phantom ACCESS WRITE ;
           RUNSEQ { TASK T AGENT A PARAMETERS (OUTPUT=phantom) ; }
           END"#,
        vec![stub_agent("A", json!({}))],
        Arc::new(FixedResponse("R")),
    );

    assert_eq!(
        outcome.errors,
        vec![ExecError::UnknownVariable("phantom".into())]
    );
}

#[test]
fn cancelled_run_reports_cancelled_tasks() {
    let (program, errors) = parse(
        r#"START
           DATA x TYPE String ;
           PERM AGENT A DATA x ACCESS WRITE ;
           RUNSEQ { TASK T AGENT A PARAMETERS (OUTPUT=x) ; }
           END"#,
    );
    assert!(errors.is_empty());

    let interpreter = Interpreter::with_boundary(
        Arc::new(StaticRegistry::new(vec![stub_agent("A", json!({}))])),
        Arc::new(FixedResponse("R")),
    )
    .with_jitter(Jitter::none());
    interpreter.cancel_token().cancel();

    let outcome = interpreter.run(&program, Arc::new(Logger::new()));
    assert_eq!(outcome.errors, vec![ExecError::Cancelled]);
    assert_eq!(outcome.store.read("x"), Some(String::new()));
}

#[test]
fn every_failure_is_logged() {
    let (outcome, logger) = run_with(
        r#"START
           RUNSEQ { TASK T AGENT Ghost PARAMETERS () ; }
           END"#,
        vec![],
        Arc::new(FixedResponse("R")),
    );

    assert!(!outcome.success());
    assert!(logger
        .snapshot()
        .iter()
        .any(|e| e.message.contains("task 'T' failed") && e.message.contains("Ghost")));
}
