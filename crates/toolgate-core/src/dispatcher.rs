//! Tool execution dispatcher.
//!
//! Drives one model turn: accumulates streamed tool-call deltas into
//! complete invocations, raises asks, applies the approval policy, runs
//! approved side effects against the host, and budget-checks results
//! before they are pushed back into the conversation.
//!
//! Errors local to one tool call (bad arguments, host failures) surface
//! as error results inside the turn so the model can self-correct; only
//! user cancellation or a broken model stream terminates the turn.

use crate::approval::{ApprovalPolicy, Decision};
use crate::ask::{AskBroker, AskEvent, ASK_GUARD_TIMEOUT};
use crate::budget::{BudgetGuard, BudgetParams};
use crate::error::DispatchError;
use crate::host::Host;
use crate::invocation::{AskContext, ToolInvocation};
use futures::{Stream, StreamExt};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use toolgate_protocol::{AskKind, AskResponse, AskResponseKind, ModelDelta, Usage};
use toolgate_util::{wildcard, Identifier};
use tracing::{debug, warn};

/// Per-in-flight-call accumulation state.
///
/// Created on the first delta for a call index; every subsequent delta
/// appends to the buffer in arrival order. Once finished, the buffer is
/// immutable.
#[derive(Debug)]
pub struct ToolCallAccumulator {
    index: u32,
    id: Option<String>,
    name: Option<String>,
    buffer: String,
    partial: bool,
}

impl ToolCallAccumulator {
    /// Start accumulating the call at `index`.
    pub fn new(index: u32) -> Self {
        Self {
            index,
            id: None,
            name: None,
            buffer: String::new(),
            partial: true,
        }
    }

    /// The call index.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Tool name, once a delta has carried it.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The argument buffer accumulated so far.
    pub fn arguments(&self) -> &str {
        &self.buffer
    }

    /// Whether the call is still streaming.
    pub fn is_partial(&self) -> bool {
        self.partial
    }

    /// Apply one delta. The id and name stick on first arrival; argument
    /// fragments append.
    pub fn apply(&mut self, id: Option<String>, name: Option<String>, arguments: Option<String>) {
        if self.id.is_none() {
            self.id = id;
        }
        if self.name.is_none() {
            self.name = name;
        }
        if let Some(fragment) = arguments {
            self.buffer.push_str(&fragment);
        }
    }

    /// Flush into a final `(call_id, name, arguments)` triple. A call
    /// that never carried an id gets a fresh one.
    pub fn finish(mut self) -> (String, Option<String>, String) {
        self.partial = false;
        let call_id = self.id.unwrap_or_else(Identifier::call);
        (call_id, self.name, self.buffer)
    }
}

/// Terminal state of one dispatched call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    /// Denied by policy or human.
    Denied,
    /// Executed and its result pushed to the conversation.
    ResultPushed,
    /// Failed: unparseable arguments or a host error.
    Errored,
}

/// Outcome of one dispatched call.
#[derive(Debug, Clone)]
pub struct CallResult {
    /// Call ID.
    pub call_id: String,
    /// Tool name, empty if the stream never provided one.
    pub name: String,
    /// Terminal state.
    pub state: CallState,
    /// Result text pushed to the conversation.
    pub output: Option<String>,
    /// User-visible error or denial reason.
    pub error: Option<String>,
}

/// Aggregated outcome of one model turn.
#[derive(Debug, Clone, Default)]
pub struct TurnOutcome {
    /// Assistant text.
    pub text: String,
    /// Reasoning text.
    pub reasoning: String,
    /// Token usage reported by the stream.
    pub usage: Usage,
    /// Results of every tool call in the turn, in order.
    pub results: Vec<CallResult>,
}

/// Static dispatcher configuration for one task.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Workspace root for outside-workspace checks.
    pub workspace_root: PathBuf,
    /// Wildcard patterns for protected files.
    pub protected_patterns: Vec<String>,
    /// Model context window, in tokens.
    pub context_window: usize,
    /// Tokens consumed by the conversation before this task's turns.
    pub base_tokens_used: usize,
}

impl DispatcherConfig {
    /// Create a config rooted at `workspace_root`.
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            protected_patterns: Vec::new(),
            context_window: 200_000,
            base_tokens_used: 0,
        }
    }
}

/// How an ask was ultimately resolved.
enum Resolution {
    Approved,
    Denied(Option<String>),
    /// A follow-up question answered with text; the text is the result.
    Answered(String),
}

/// One task's dispatcher. Owns its accumulator and ask state; nothing is
/// shared across tasks.
pub struct Dispatcher {
    policy: ApprovalPolicy,
    host: Arc<dyn Host>,
    broker: Arc<AskBroker>,
    budget: BudgetGuard,
    config: DispatcherConfig,
    abort: CancellationToken,
    usage: Usage,
    consecutive_mistakes: u32,
}

impl Dispatcher {
    /// Create a dispatcher.
    pub fn new(
        policy: ApprovalPolicy,
        host: Arc<dyn Host>,
        broker: Arc<AskBroker>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            policy,
            host,
            broker,
            budget: BudgetGuard::new(),
            config,
            abort: CancellationToken::new(),
            usage: Usage::default(),
            consecutive_mistakes: 0,
        }
    }

    /// Replace the budget guard.
    pub fn with_budget(mut self, budget: BudgetGuard) -> Self {
        self.budget = budget;
        self
    }

    /// Token for cancelling this task from outside.
    pub fn abort_token(&self) -> CancellationToken {
        self.abort.clone()
    }

    /// Consecutive tool-call failures; upstream conversation logic uses
    /// this to decide whether to abort the task.
    pub fn consecutive_mistakes(&self) -> u32 {
        self.consecutive_mistakes
    }

    /// Drive one model turn to completion.
    pub async fn run_turn<S>(&mut self, mut stream: S) -> Result<TurnOutcome, DispatchError>
    where
        S: Stream<Item = ModelDelta> + Unpin,
    {
        let mut outcome = TurnOutcome::default();
        let mut active: Option<ToolCallAccumulator> = None;

        loop {
            let delta = tokio::select! {
                biased;
                _ = self.abort.cancelled() => return Err(DispatchError::Cancelled),
                delta = stream.next() => delta,
            };
            let Some(delta) = delta else { break };

            match delta {
                ModelDelta::Text { text } => outcome.text.push_str(&text),
                ModelDelta::Reasoning { text } => outcome.reasoning.push_str(&text),
                ModelDelta::Usage {
                    input_tokens,
                    output_tokens,
                } => self.usage.merge(&Usage::new(input_tokens, output_tokens)),
                ModelDelta::ToolCallPartial {
                    index,
                    id,
                    name,
                    arguments,
                } => {
                    // A delta for a different index means the active call
                    // is complete.
                    if active.as_ref().is_some_and(|a| a.index() != index) {
                        if let Some(done) = active.take() {
                            let result = self.finalize(done).await?;
                            outcome.results.push(result);
                        }
                    }
                    let acc = active.get_or_insert_with(|| ToolCallAccumulator::new(index));
                    acc.apply(id, name, arguments);
                    self.host
                        .show_partial(acc.name().unwrap_or(""), acc.arguments())
                        .await;
                }
            }
        }

        if let Some(done) = active.take() {
            let result = self.finalize(done).await?;
            outcome.results.push(result);
        }

        outcome.usage = self.usage;
        Ok(outcome)
    }

    /// Take a complete call through approval and execution.
    async fn finalize(&mut self, acc: ToolCallAccumulator) -> Result<CallResult, DispatchError> {
        let (call_id, name, buffer) = acc.finish();
        let Some(name) = name else {
            self.consecutive_mistakes += 1;
            return Ok(errored(call_id, String::new(), "tool call carried no tool name"));
        };

        let invocation = match ToolInvocation::parse(&name, &buffer) {
            Ok(invocation) => invocation,
            Err(err) => {
                self.consecutive_mistakes += 1;
                warn!(tool = %name, %err, "unparseable tool arguments");
                return Ok(errored(
                    call_id,
                    name.clone(),
                    format!("invalid arguments for {name}: {err}"),
                ));
            }
        };

        let ctx = self.ask_context(&invocation).await;
        let mut event = AskEvent::new(invocation.ask_kind(), invocation.ask_payload(&ctx));
        if ctx.is_protected {
            event = event.protected();
        }

        let resolution = match self.policy.decide(&event) {
            Decision::Approve => Resolution::Approved,
            Decision::Deny => Resolution::Denied(None),
            Decision::Ask => self.await_human(&event, ASK_GUARD_TIMEOUT, None).await?,
            Decision::ApproveAfter { timeout, response } => {
                self.await_human(&event, timeout, Some(response)).await?
            }
        };

        match resolution {
            Resolution::Approved => self.execute(call_id, name, invocation).await,
            Resolution::Denied(feedback) => {
                debug!(tool = %name, "tool call denied");
                let reason = match feedback {
                    Some(text) => format!("The user denied this operation: {text}"),
                    None => "The user denied this operation.".to_string(),
                };
                Ok(CallResult {
                    call_id,
                    name,
                    state: CallState::Denied,
                    output: None,
                    error: Some(reason),
                })
            }
            Resolution::Answered(text) => {
                self.consecutive_mistakes = 0;
                Ok(CallResult {
                    call_id,
                    name,
                    state: CallState::ResultPushed,
                    output: Some(text),
                    error: None,
                })
            }
        }
    }

    /// Wait for the human's response, racing an optional auto-approval
    /// timer. The human's real response always wins the race; the loser
    /// never resolves the ask a second time.
    async fn await_human(
        &self,
        event: &AskEvent,
        timeout: Duration,
        timeout_response: Option<AskResponse>,
    ) -> Result<Resolution, DispatchError> {
        let rx = self.broker.register(&event.id).await;
        self.host.notify_ask(event).await;

        let response = tokio::select! {
            biased;
            _ = self.abort.cancelled() => {
                self.broker.cancel(&event.id).await;
                return Err(DispatchError::Cancelled);
            }
            response = rx => response.ok(),
            _ = tokio::time::sleep(timeout) => {
                self.broker.cancel(&event.id).await;
                timeout_response
            }
        };

        let Some(response) = response else {
            return Ok(Resolution::Denied(Some(
                "No response was received in time.".to_string(),
            )));
        };

        Ok(match response.kind {
            AskResponseKind::YesButtonClicked => Resolution::Approved,
            AskResponseKind::NoButtonClicked => Resolution::Denied(response.text),
            AskResponseKind::MessageResponse => {
                if event.kind == AskKind::Followup {
                    Resolution::Answered(response.text.unwrap_or_default())
                } else {
                    Resolution::Denied(response.text)
                }
            }
        })
    }

    /// Run the side effect and budget-check its output.
    async fn execute(
        &mut self,
        call_id: String,
        name: String,
        invocation: ToolInvocation,
    ) -> Result<CallResult, DispatchError> {
        debug!(tool = %name, call_id = %call_id, "executing tool");
        let result = tokio::select! {
            biased;
            _ = self.abort.cancelled() => return Err(DispatchError::Cancelled),
            result = self.host.execute(&invocation, &self.abort) => result,
        };

        match result {
            Ok(output) => {
                self.consecutive_mistakes = 0;
                let text = self.apply_budget(output.output);
                Ok(CallResult {
                    call_id,
                    name,
                    state: CallState::ResultPushed,
                    output: Some(text),
                    error: None,
                })
            }
            Err(err) => {
                self.consecutive_mistakes += 1;
                warn!(tool = %name, %err, "tool execution failed");
                Ok(errored(call_id, name.clone(), format!("{name} failed: {err}")))
            }
        }
    }

    /// Truncate an oversized result before it reaches the conversation.
    fn apply_budget(&self, text: String) -> String {
        let params = BudgetParams {
            context_window: self.config.context_window,
            tokens_used: self.config.base_tokens_used + self.usage.total() as usize,
        };
        let check = self.budget.evaluate(text.len() as u64, &text, &params);
        if !check.should_truncate {
            return text;
        }

        let max_chars = check.max_chars.unwrap_or(0);
        let mut truncated: String = text.chars().take(max_chars).collect();
        if let Some(reason) = check.reason {
            truncated.push_str("\n\n[");
            truncated.push_str(&reason);
            truncated.push(']');
        }
        truncated
    }

    /// Resolve workspace facts about the invocation's target path.
    async fn ask_context(&self, invocation: &ToolInvocation) -> AskContext {
        let Some(path) = invocation.primary_path() else {
            return AskContext::default();
        };
        AskContext {
            is_outside_workspace: is_outside_workspace(&self.config.workspace_root, path),
            is_protected: wildcard::find_matching_pattern(
                self.config.protected_patterns.iter().map(String::as_str),
                path,
            )
            .is_some(),
            file_exists: self.host.file_exists(path).await,
        }
    }
}

fn errored(call_id: String, name: String, message: impl Into<String>) -> CallResult {
    CallResult {
        call_id,
        name,
        state: CallState::Errored,
        output: None,
        error: Some(message.into()),
    }
}

fn is_outside_workspace(root: &Path, path: &str) -> bool {
    let path = Path::new(path);
    if path.is_absolute() {
        !path.starts_with(root)
    } else {
        path.components()
            .any(|c| matches!(c, Component::ParentDir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ExecutionOutput;
    use async_trait::async_trait;
    use futures::stream;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use toolgate_protocol::AutoApprovalSettings;

    struct MockHost {
        broker: Arc<AskBroker>,
        /// Response the "human" sends as soon as an ask is surfaced.
        auto_response: Mutex<Option<AskResponse>>,
        asks: Mutex<Vec<AskEvent>>,
        executed: Mutex<Vec<String>>,
        output: Mutex<String>,
        fail_execute: AtomicBool,
        hang_execute: AtomicBool,
        target_exists: AtomicBool,
    }

    impl MockHost {
        fn new(broker: Arc<AskBroker>) -> Self {
            Self {
                broker,
                auto_response: Mutex::new(None),
                asks: Mutex::new(Vec::new()),
                executed: Mutex::new(Vec::new()),
                output: Mutex::new("ok".to_string()),
                fail_execute: AtomicBool::new(false),
                hang_execute: AtomicBool::new(false),
                target_exists: AtomicBool::new(false),
            }
        }

        fn respond_with(&self, response: AskResponse) {
            *self.auto_response.lock().unwrap() = Some(response);
        }

        fn set_output(&self, output: impl Into<String>) {
            *self.output.lock().unwrap() = output.into();
        }

        fn executed(&self) -> Vec<String> {
            self.executed.lock().unwrap().clone()
        }

        fn asks(&self) -> Vec<AskEvent> {
            self.asks.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Host for MockHost {
        async fn notify_ask(&self, event: &AskEvent) {
            self.asks.lock().unwrap().push(event.clone());
            let response = self.auto_response.lock().unwrap().clone();
            if let Some(response) = response {
                self.broker.respond(&event.id, response).await;
            }
        }

        async fn show_partial(&self, _name: &str, _arguments_fragment: &str) {}

        async fn execute(
            &self,
            invocation: &ToolInvocation,
            _abort: &CancellationToken,
        ) -> anyhow::Result<ExecutionOutput> {
            self.executed
                .lock()
                .unwrap()
                .push(invocation.name().to_string());
            if self.hang_execute.load(Ordering::SeqCst) {
                futures::future::pending::<()>().await;
            }
            if self.fail_execute.load(Ordering::SeqCst) {
                anyhow::bail!("disk full");
            }
            let output = self.output.lock().unwrap().clone();
            Ok(ExecutionOutput::new("done", output))
        }

        async fn file_exists(&self, _path: &str) -> bool {
            self.target_exists.load(Ordering::SeqCst)
        }
    }

    fn call_delta(index: u32, id: Option<&str>, name: Option<&str>, args: Option<&str>) -> ModelDelta {
        ModelDelta::ToolCallPartial {
            index,
            id: id.map(String::from),
            name: name.map(String::from),
            arguments: args.map(String::from),
        }
    }

    struct Fixture {
        broker: Arc<AskBroker>,
        host: Arc<MockHost>,
    }

    impl Fixture {
        fn new() -> Self {
            let broker = Arc::new(AskBroker::new());
            let host = Arc::new(MockHost::new(broker.clone()));
            Self { broker, host }
        }

        fn dispatcher(&self, settings: AutoApprovalSettings) -> Dispatcher {
            Dispatcher::new(
                ApprovalPolicy::new(settings),
                self.host.clone(),
                self.broker.clone(),
                DispatcherConfig::new("/workspace"),
            )
        }
    }

    fn read_only_settings() -> AutoApprovalSettings {
        AutoApprovalSettings {
            auto_approval_enabled: true,
            always_allow_read_only: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_accumulator_appends_in_order() {
        let mut acc = ToolCallAccumulator::new(0);
        acc.apply(Some("cal_1".into()), Some("read_file".into()), None);
        acc.apply(None, None, Some(r#"{"path":"#.into()));
        acc.apply(None, None, Some(r#""a.txt"}"#.into()));

        assert!(acc.is_partial());
        assert_eq!(acc.name(), Some("read_file"));
        let (id, name, buffer) = acc.finish();
        assert_eq!(id, "cal_1");
        assert_eq!(name.as_deref(), Some("read_file"));
        assert_eq!(buffer, r#"{"path":"a.txt"}"#);
    }

    #[test]
    fn test_accumulator_generates_missing_id() {
        let acc = ToolCallAccumulator::new(3);
        let (id, _, _) = acc.finish();
        assert!(id.starts_with("cal_"));
    }

    #[test]
    fn test_outside_workspace_detection() {
        let root = Path::new("/workspace");
        assert!(!is_outside_workspace(root, "src/main.rs"));
        assert!(!is_outside_workspace(root, "/workspace/src/main.rs"));
        assert!(is_outside_workspace(root, "../secrets.txt"));
        assert!(is_outside_workspace(root, "/etc/hosts"));
    }

    #[tokio::test]
    async fn test_text_and_usage_aggregation() {
        let fixture = Fixture::new();
        let mut dispatcher = fixture.dispatcher(AutoApprovalSettings::default());

        let deltas = vec![
            ModelDelta::text("Hello "),
            ModelDelta::reasoning("thinking"),
            ModelDelta::text("world"),
            ModelDelta::usage(100, 50),
        ];
        let outcome = dispatcher.run_turn(stream::iter(deltas)).await.unwrap();

        assert_eq!(outcome.text, "Hello world");
        assert_eq!(outcome.reasoning, "thinking");
        assert_eq!(outcome.usage.total(), 150);
        assert!(outcome.results.is_empty());
    }

    #[tokio::test]
    async fn test_auto_approved_read_executes() {
        let fixture = Fixture::new();
        let mut dispatcher = fixture.dispatcher(read_only_settings());

        let deltas = vec![
            call_delta(0, Some("cal_1"), Some("read_file"), Some(r#"{"path":"#)),
            call_delta(0, None, None, Some(r#""src/main.rs"}"#)),
        ];
        let outcome = dispatcher.run_turn(stream::iter(deltas)).await.unwrap();

        assert_eq!(outcome.results.len(), 1);
        let result = &outcome.results[0];
        assert_eq!(result.state, CallState::ResultPushed);
        assert_eq!(result.call_id, "cal_1");
        assert_eq!(result.output.as_deref(), Some("ok"));
        assert_eq!(fixture.host.executed(), vec!["read_file"]);
        assert!(fixture.host.asks().is_empty());
    }

    #[tokio::test]
    async fn test_parse_failure_errors_and_continues() {
        let fixture = Fixture::new();
        let mut dispatcher = fixture.dispatcher(read_only_settings());

        let deltas = vec![
            call_delta(0, Some("cal_1"), Some("read_file"), Some("{broken")),
            call_delta(1, Some("cal_2"), Some("read_file"), Some(r#"{"path":"a"}"#)),
        ];
        let outcome = dispatcher.run_turn(stream::iter(deltas)).await.unwrap();

        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.results[0].state, CallState::Errored);
        assert!(outcome.results[0].error.as_ref().unwrap().contains("read_file"));
        assert_eq!(outcome.results[1].state, CallState::ResultPushed);
        // The successful second call reset the mistake counter.
        assert_eq!(dispatcher.consecutive_mistakes(), 0);
    }

    #[tokio::test]
    async fn test_parse_failure_increments_mistakes() {
        let fixture = Fixture::new();
        let mut dispatcher = fixture.dispatcher(read_only_settings());

        let deltas = vec![call_delta(0, None, Some("read_file"), Some("{broken"))];
        dispatcher.run_turn(stream::iter(deltas)).await.unwrap();
        assert_eq!(dispatcher.consecutive_mistakes(), 1);
    }

    #[tokio::test]
    async fn test_denied_command_never_executes() {
        let fixture = Fixture::new();
        let settings = AutoApprovalSettings {
            auto_approval_enabled: true,
            always_allow_execute: true,
            denied_commands: vec!["rm".to_string()],
            ..Default::default()
        };
        let mut dispatcher = fixture.dispatcher(settings);

        let deltas = vec![call_delta(
            0,
            Some("cal_1"),
            Some("execute_command"),
            Some(r#"{"command":"rm -rf /"}"#),
        )];
        let outcome = dispatcher.run_turn(stream::iter(deltas)).await.unwrap();

        assert_eq!(outcome.results[0].state, CallState::Denied);
        assert!(fixture.host.executed().is_empty());
    }

    #[tokio::test]
    async fn test_escalated_ask_approved_by_human() {
        let fixture = Fixture::new();
        fixture.host.respond_with(AskResponse::yes());
        let mut dispatcher = fixture.dispatcher(AutoApprovalSettings {
            auto_approval_enabled: true,
            ..Default::default()
        });

        let deltas = vec![call_delta(
            0,
            Some("cal_1"),
            Some("execute_command"),
            Some(r#"{"command":"cargo build"}"#),
        )];
        let outcome = dispatcher.run_turn(stream::iter(deltas)).await.unwrap();

        assert_eq!(outcome.results[0].state, CallState::ResultPushed);
        assert_eq!(fixture.host.executed(), vec!["execute_command"]);
        assert_eq!(fixture.host.asks().len(), 1);
        assert_eq!(fixture.host.asks()[0].kind, AskKind::Command);
    }

    #[tokio::test]
    async fn test_escalated_ask_denied_with_feedback() {
        let fixture = Fixture::new();
        fixture.host.respond_with(AskResponse {
            kind: AskResponseKind::NoButtonClicked,
            text: Some("use the staging database".to_string()),
        });
        let mut dispatcher = fixture.dispatcher(AutoApprovalSettings {
            auto_approval_enabled: true,
            ..Default::default()
        });

        let deltas = vec![call_delta(
            0,
            None,
            Some("execute_command"),
            Some(r#"{"command":"psql prod"}"#),
        )];
        let outcome = dispatcher.run_turn(stream::iter(deltas)).await.unwrap();

        let result = &outcome.results[0];
        assert_eq!(result.state, CallState::Denied);
        assert!(result
            .error
            .as_ref()
            .unwrap()
            .contains("use the staging database"));
        assert!(fixture.host.executed().is_empty());
    }

    #[tokio::test]
    async fn test_followup_timer_fires_synthesized_answer() {
        let fixture = Fixture::new();
        let mut dispatcher = fixture.dispatcher(AutoApprovalSettings {
            auto_approval_enabled: true,
            always_allow_followup_questions: true,
            followup_auto_approve_timeout_ms: 10,
            ..Default::default()
        });

        let deltas = vec![call_delta(
            0,
            None,
            Some("ask_followup_question"),
            Some(r#"{"question":"proceed?","follow_up":["yes","no"]}"#),
        )];
        let outcome = dispatcher.run_turn(stream::iter(deltas)).await.unwrap();

        let result = &outcome.results[0];
        assert_eq!(result.state, CallState::ResultPushed);
        assert_eq!(result.output.as_deref(), Some("yes"));
        // The answer came from the suggestion, not from an execution.
        assert!(fixture.host.executed().is_empty());
    }

    #[tokio::test]
    async fn test_human_response_preempts_followup_timer() {
        let fixture = Fixture::new();
        fixture.host.respond_with(AskResponse::message("blue"));
        let mut dispatcher = fixture.dispatcher(AutoApprovalSettings {
            auto_approval_enabled: true,
            always_allow_followup_questions: true,
            followup_auto_approve_timeout_ms: 60_000,
            ..Default::default()
        });

        let deltas = vec![call_delta(
            0,
            None,
            Some("ask_followup_question"),
            Some(r#"{"question":"which color?","follow_up":["red"]}"#),
        )];
        let outcome = dispatcher.run_turn(stream::iter(deltas)).await.unwrap();

        // The human's answer won, not the suggested "red".
        assert_eq!(outcome.results[0].output.as_deref(), Some("blue"));
        assert_eq!(fixture.broker.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_host_failure_surfaces_as_error_result() {
        let fixture = Fixture::new();
        fixture.host.fail_execute.store(true, Ordering::SeqCst);
        let mut dispatcher = fixture.dispatcher(read_only_settings());

        let deltas = vec![call_delta(
            0,
            None,
            Some("read_file"),
            Some(r#"{"path":"a.txt"}"#),
        )];
        let outcome = dispatcher.run_turn(stream::iter(deltas)).await.unwrap();

        let result = &outcome.results[0];
        assert_eq!(result.state, CallState::Errored);
        assert!(result.error.as_ref().unwrap().contains("disk full"));
        assert_eq!(dispatcher.consecutive_mistakes(), 1);
    }

    #[tokio::test]
    async fn test_cancellation_terminates_turn() {
        let fixture = Fixture::new();
        let mut dispatcher = fixture.dispatcher(AutoApprovalSettings::default());
        dispatcher.abort_token().cancel();

        let result = dispatcher.run_turn(stream::pending::<ModelDelta>()).await;
        assert!(matches!(result, Err(DispatchError::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancel_while_awaiting_approval() {
        let fixture = Fixture::new();
        // No auto-response: the ask stays pending until cancelled.
        let mut dispatcher = fixture.dispatcher(AutoApprovalSettings {
            auto_approval_enabled: true,
            ..Default::default()
        });
        let abort = dispatcher.abort_token();
        let broker = fixture.broker.clone();

        let deltas = vec![call_delta(
            0,
            None,
            Some("execute_command"),
            Some(r#"{"command":"cargo build"}"#),
        )];
        let handle = tokio::spawn(async move { dispatcher.run_turn(stream::iter(deltas)).await });

        while broker.pending_count().await == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        abort.cancel();

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(DispatchError::Cancelled)));
        // The pending ask was dropped, not left dangling.
        assert_eq!(fixture.broker.pending_count().await, 0);
        assert!(fixture.host.executed().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_during_execution() {
        let fixture = Fixture::new();
        fixture.host.hang_execute.store(true, Ordering::SeqCst);
        let mut dispatcher = fixture.dispatcher(read_only_settings());
        let abort = dispatcher.abort_token();
        let host = fixture.host.clone();

        let deltas = vec![call_delta(
            0,
            None,
            Some("read_file"),
            Some(r#"{"path":"a.txt"}"#),
        )];
        let handle = tokio::spawn(async move { dispatcher.run_turn(stream::iter(deltas)).await });

        while host.executed().is_empty() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        abort.cancel();

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(DispatchError::Cancelled)));
    }

    #[tokio::test]
    async fn test_oversized_result_truncated() {
        let fixture = Fixture::new();
        fixture.host.set_output("x".repeat(200_000));
        let mut dispatcher = fixture.dispatcher(read_only_settings());
        dispatcher.config.context_window = 100_000;
        dispatcher.config.base_tokens_used = 20_000;

        let deltas = vec![call_delta(
            0,
            None,
            Some("read_file"),
            Some(r#"{"path":"big.txt"}"#),
        )];
        let outcome = dispatcher.run_turn(stream::iter(deltas)).await.unwrap();

        let output = outcome.results[0].output.as_ref().unwrap();
        assert!(output.len() < 200_000);
        assert!(output.starts_with(&"x".repeat(144_000)));
        assert!(output.contains("line-range read"));
    }

    #[tokio::test]
    async fn test_protected_write_escalates_and_flags_event() {
        let fixture = Fixture::new();
        fixture.host.respond_with(AskResponse::no());
        let settings = AutoApprovalSettings {
            auto_approval_enabled: true,
            always_allow_write: true,
            ..Default::default()
        };
        let mut dispatcher = fixture.dispatcher(settings);
        dispatcher.config.protected_patterns = vec![".env*".to_string()];

        let deltas = vec![call_delta(
            0,
            None,
            Some("write_to_file"),
            Some(r#"{"path":".env","content":"SECRET=1"}"#),
        )];
        let outcome = dispatcher.run_turn(stream::iter(deltas)).await.unwrap();

        assert_eq!(outcome.results[0].state, CallState::Denied);
        let asks = fixture.host.asks();
        assert_eq!(asks.len(), 1);
        assert!(asks[0].is_protected);
        assert!(fixture.host.executed().is_empty());
    }

    #[tokio::test]
    async fn test_interleaved_calls_finalize_by_index() {
        let fixture = Fixture::new();
        let mut dispatcher = fixture.dispatcher(read_only_settings());

        let deltas = vec![
            call_delta(0, Some("cal_1"), Some("read_file"), Some(r#"{"path":"a"}"#)),
            call_delta(1, Some("cal_2"), Some("read_file"), Some(r#"{"path":"b"}"#)),
        ];
        let outcome = dispatcher.run_turn(stream::iter(deltas)).await.unwrap();

        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.results[0].call_id, "cal_1");
        assert_eq!(outcome.results[1].call_id, "cal_2");
    }
}
