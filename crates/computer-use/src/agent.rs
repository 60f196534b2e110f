use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::errors::RunError;
use crate::models::message::{Conversation, Message};
use crate::models::tool::{ToolCall, ToolDefinition};
use crate::prompt_template::{perception_prompt, system_prompt};
use crate::providers::base::Provider;
use crate::sandbox::Sandbox;
use crate::tools::dispatcher::ToolDispatcher;

pub const STOP_TOOL: &str = "stop";

const ACTION_CUE: &str = "I will now use tool calls to take these actions, or use the stop command if the objective is complete.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Upper bound on perceive/decide/act cycles, `None` for no bound
    pub max_iterations: Option<u32>,
    /// Sandbox keep-alive refreshed before every cycle
    pub keep_alive_secs: u64,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: Some(50),
            keep_alive_secs: 60,
        }
    }
}

/// Why a run ended without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    /// The model called `stop`
    Stopped,
    /// The model asked for no action at all
    NoAction,
    IterationLimit,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub outcome: RunOutcome,
    /// Cycles started, including the last one
    pub iterations: u32,
    pub conversation: Conversation,
}

/// Progress of a run, for display
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    Thought { iteration: u32, text: String },
    Action { iteration: u32, call: ToolCall },
    Observation { iteration: u32, text: String },
}

/// Agent drives a desktop toward an objective: it looks at the screen with
/// a vision model, picks actions with an action model and runs them through
/// the dispatcher until the model calls `stop`.
pub struct Agent {
    vision: Box<dyn Provider>,
    action: Box<dyn Provider>,
    sandbox: Arc<dyn Sandbox>,
    dispatcher: ToolDispatcher,
    settings: AgentSettings,
    cancel: CancellationToken,
    events: Option<UnboundedSender<AgentEvent>>,
}

impl Agent {
    pub fn new(
        vision: Box<dyn Provider>,
        action: Box<dyn Provider>,
        sandbox: Arc<dyn Sandbox>,
        dispatcher: ToolDispatcher,
    ) -> Self {
        Self {
            vision,
            action,
            sandbox,
            dispatcher,
            settings: AgentSettings::default(),
            cancel: CancellationToken::new(),
            events: None,
        }
    }

    pub fn with_settings(mut self, settings: AgentSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Stop at the next cycle boundary once `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_events(mut self, events: UnboundedSender<AgentEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Every tool offered to the action model, `stop` last
    pub fn tools(&self) -> Vec<ToolDefinition> {
        let mut tools = self.dispatcher.tools();
        tools.push(ToolDefinition::new(
            STOP_TOOL,
            "Indicate that the task has been completed.",
        ));
        tools
    }

    fn emit(&self, event: AgentEvent) {
        if let Some(events) = &self.events {
            // the receiver going away must not end the run
            let _ = events.send(event);
        }
    }

    fn report(
        run_id: Uuid,
        outcome: RunOutcome,
        iterations: u32,
        conversation: Conversation,
    ) -> RunReport {
        tracing::info!(%run_id, ?outcome, iterations, "Run finished");
        RunReport {
            run_id,
            outcome,
            iterations,
            conversation,
        }
    }

    /// Work on `objective` until the model stops, asks for nothing, the
    /// iteration cap is hit or the run is cancelled. Provider and sandbox
    /// transport failures end the run with an error; tool failures do not.
    pub async fn run(&mut self, objective: &str) -> Result<RunReport, RunError> {
        let tools = self.tools();
        let mut conversation = Conversation::new();
        conversation.push(
            Message::system().with_text(system_prompt(&self.dispatcher.system_info(), &tools)?),
        );
        conversation.push(Message::user().with_text(format!("OBJECTIVE: {}", objective)));
        let run_id = Uuid::new_v4();
        tracing::info!(%run_id, objective = %objective, "Starting run");

        let mut iterations = 0;
        loop {
            if self.cancel.is_cancelled() {
                return Ok(Self::report(run_id, RunOutcome::Cancelled, iterations, conversation));
            }
            if self
                .settings
                .max_iterations
                .is_some_and(|max| iterations >= max)
            {
                return Ok(Self::report(run_id, RunOutcome::IterationLimit, iterations, conversation));
            }
            iterations += 1;

            self.sandbox
                .set_timeout(self.settings.keep_alive_secs)
                .await
                .map_err(RunError::Sandbox)?;

            // perceive
            let screenshot = self.sandbox.screenshot().await.map_err(RunError::Sandbox)?;
            let mut request = conversation.as_slice().to_vec();
            request.push(
                Message::user()
                    .with_image(screenshot)
                    .with_text(perception_prompt()),
            );
            let perception = self.vision.call(&request).await?;
            tracing::info!(iteration = iterations, "THOUGHT: {}", perception);
            self.emit(AgentEvent::Thought {
                iteration: iterations,
                text: perception.clone(),
            });
            conversation.push(Message::assistant().with_text(format!("THOUGHT: {}", perception)));

            if self.cancel.is_cancelled() {
                return Ok(Self::report(run_id, RunOutcome::Cancelled, iterations, conversation));
            }

            // decide
            let mut request = conversation.as_slice().to_vec();
            request.push(Message::assistant().with_text(ACTION_CUE));
            let (text, calls) = self.action.call_with_tools(&request, &tools).await?;

            // act
            if let Some(text) = text.filter(|text| !text.trim().is_empty()) {
                tracing::info!(iteration = iterations, "THOUGHT: {}", text);
                self.emit(AgentEvent::Thought {
                    iteration: iterations,
                    text: text.clone(),
                });
                conversation.push(Message::assistant().with_text(format!("THOUGHT: {}", text)));
            }

            if calls.is_empty() {
                return Ok(Self::report(run_id, RunOutcome::NoAction, iterations, conversation));
            }

            for call in calls {
                if call.name.eq_ignore_ascii_case(STOP_TOOL) {
                    return Ok(Self::report(run_id, RunOutcome::Stopped, iterations, conversation));
                }

                tracing::info!(
                    iteration = iterations,
                    tool = %call.name,
                    parameters = %call.parameters,
                    "ACTION"
                );
                self.emit(AgentEvent::Action {
                    iteration: iterations,
                    call: call.clone(),
                });
                conversation.push(Message::assistant().with_text(call.to_json().to_string()));

                let observation = self.dispatcher.dispatch(&call.name, call.parameters).await;
                tracing::info!(iteration = iterations, "OBSERVATION: {}", observation);
                self.emit(AgentEvent::Observation {
                    iteration: iterations,
                    text: observation.clone(),
                });
                conversation.push(Message::function().with_text(format!("OBSERVATION: {}", observation)));
            }
        }
    }
}
