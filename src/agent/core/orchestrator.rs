//! Drives one user message to a final answer
//!
//! Each round asks the model for a decision over the transcript and the
//! action catalog. A decision either ends the loop with a final answer or
//! requests actions, of which only the first is executed (single action per
//! round keeps the transcript interpretable and bounds blast radius). The
//! loop terminates on a final answer, an unrecoverable action failure, or
//! the round ceiling, whichever comes first.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tera::{Context, Tera};

use crate::adapters::metrics_handler::MetricsCollector;
use crate::agent::domain::{
    ActionCallRecord, ActionRequest, ChatOutcome, Message, ToolCall,
};
use crate::agent::error::{AgentError, AgentResult};
use crate::agent::llm::{CompletionRequest, LlmProvider};
use crate::agent::memory::Session;
use crate::agent::registry::ActionRegistry;
use crate::agent::truncate::truncate_payload;
use crate::config::AgentSettings;
use crate::domain::VenueSummary;

pub struct Orchestrator {
    llm: Arc<dyn LlmProvider>,
    registry: Arc<ActionRegistry>,
    settings: AgentSettings,
    metrics: Arc<MetricsCollector>,
}

impl Orchestrator {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        registry: Arc<ActionRegistry>,
        settings: AgentSettings,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            llm,
            registry,
            settings,
            metrics,
        }
    }

    /// Run the loop for one user message against the given session.
    ///
    /// `history` is replayed (bounded to the configured window) ahead of the
    /// new message; the returned outcome carries the final answer and every
    /// action call made along the way, in order.
    pub async fn run(
        &self,
        session: &Session,
        history: &[Message],
        user_message: &str,
    ) -> AgentResult<ChatOutcome> {
        self.metrics.chat_requests.inc();

        let mut transcript = Vec::with_capacity(history.len() + 2);
        transcript.push(Message::system(self.render_system_prompt(session).await));
        let window_start = history.len().saturating_sub(self.settings.history_window);
        transcript.extend(history[window_start..].iter().cloned());
        transcript.push(Message::user(user_message));

        let definitions = ActionRegistry::definitions();
        let mut executed: Vec<ActionCallRecord> = Vec::new();
        let mut final_text: Option<String> = None;

        for round in 0..self.settings.max_iterations {
            self.metrics.decision_rounds.inc();

            let response = self
                .llm
                .complete(CompletionRequest {
                    messages: transcript.clone(),
                    tools: Some(definitions.clone()),
                    ..Default::default()
                })
                .await?;

            let decision = response.message;
            let requested = decision.tool_calls.clone().unwrap_or_default();
            let Some(call) = requested.first().cloned() else {
                tracing::debug!(round, "model produced a final answer");
                final_text = Some(decision.content);
                break;
            };

            if requested.len() > 1 {
                tracing::debug!(
                    round,
                    dropped = requested.len() - 1,
                    "model requested multiple actions; keeping only the first"
                );
            }

            // The appended assistant message carries only the call we will
            // answer, so the transcript stays well-formed for replay.
            transcript.push(Message::assistant_with_tools(
                decision.content.clone(),
                vec![call.clone()],
            ));

            if !self.execute_round(session, &call, &mut transcript, &mut executed, round).await? {
                break;
            }
        }

        let message = match final_text {
            Some(text) if !text.trim().is_empty() => text,
            // Round ceiling or action failure: one last call over the full
            // transcript, with no tools offered, to explain where we ended up.
            _ => self.summarize(&transcript).await?,
        };

        Ok(ChatOutcome {
            message,
            function_calls: executed,
        })
    }

    /// Validate and execute one requested action. Returns whether the loop
    /// should continue.
    async fn execute_round(
        &self,
        session: &Session,
        call: &ToolCall,
        transcript: &mut Vec<Message>,
        executed: &mut Vec<ActionCallRecord>,
        round: u32,
    ) -> AgentResult<bool> {
        let request = match ActionRequest::parse(&call.name, &call.arguments) {
            Ok(request) => request,
            Err(err) if err.is_recoverable() => {
                // Malformed request from the model: feed the error back so
                // it can correct itself on the next round.
                tracing::warn!(round, action = %call.name, error = %err, "rejected action request");
                self.metrics
                    .action_executions
                    .with_label_values(&[call.name.as_str(), "rejected"])
                    .inc();
                transcript.push(Message::tool_result(
                    &call.id,
                    &json!({ "error": err.to_string() }),
                ));
                return Ok(true);
            }
            Err(err) => return Err(err),
        };

        let cacheable = request.is_cacheable();
        let cache_args = request.canonical_arguments();
        let mut from_cache = false;

        let outcome = if cacheable {
            match session.cache.get(request.name(), &cache_args).await {
                Some(hit) => {
                    tracing::debug!(round, action = request.name(), "result cache hit");
                    self.metrics.cache_hits.inc();
                    from_cache = true;
                    Ok(hit)
                }
                None => {
                    self.metrics.cache_misses.inc();
                    self.registry.execute(&request).await
                }
            }
        } else {
            self.registry.execute(&request).await
        };

        match outcome {
            Ok(result) => {
                if cacheable && !from_cache {
                    session
                        .cache
                        .put(request.name(), &cache_args, result.clone())
                        .await;
                }
                if matches!(request, ActionRequest::SearchRestaurants { .. }) {
                    self.record_entities(session, &result.value).await;
                }

                tracing::info!(round, action = request.name(), from_cache, "action executed");
                self.metrics
                    .action_executions
                    .with_label_values(&[request.name(), "ok"])
                    .inc();
                executed.push(ActionCallRecord::success(
                    &call.name,
                    call.arguments.clone(),
                    result.value.clone(),
                ));

                let mut embedded = result.value;
                if truncate_payload(
                    &mut embedded,
                    self.settings.truncate_keep,
                    self.settings.truncate_byte_budget,
                ) {
                    tracing::debug!(round, action = request.name(), "embedded result truncated");
                }
                transcript.push(Message::tool_result(&call.id, &embedded));
                Ok(true)
            }
            Err(err @ AgentError::ActionExecution { .. }) => {
                // Collaborator failure: record it, tell the model, and stop
                // looping rather than burning rounds on repeated failures.
                tracing::error!(round, action = request.name(), error = %err, "action failed");
                self.metrics
                    .action_executions
                    .with_label_values(&[request.name(), "error"])
                    .inc();
                executed.push(ActionCallRecord::failure(
                    &call.name,
                    call.arguments.clone(),
                    err.to_string(),
                ));
                transcript.push(Message::tool_result(
                    &call.id,
                    &json!({ "error": err.to_string() }),
                ));
                Ok(false)
            }
            Err(other) => Err(other),
        }
    }

    /// Record every venue a search returned into the session context, so
    /// later turns can resolve names to ids without searching again.
    async fn record_entities(&self, session: &Session, result: &serde_json::Value) {
        let Some(venues) = result.get("venues") else {
            return;
        };
        match serde_json::from_value::<Vec<VenueSummary>>(venues.clone()) {
            Ok(venues) => {
                for venue in &venues {
                    session.context.record(venue.into()).await;
                }
            }
            Err(e) => tracing::warn!(error = %e, "could not record venues into session context"),
        }
    }

    async fn summarize(&self, transcript: &[Message]) -> AgentResult<String> {
        let response = self
            .llm
            .complete(CompletionRequest {
                messages: transcript.to_vec(),
                ..Default::default()
            })
            .await?;
        Ok(response.message.content)
    }

    async fn render_system_prompt(&self, session: &Session) -> String {
        let mut context = Context::new();
        context.insert("today", &Utc::now().date_naive().to_string());
        context.insert(
            "context",
            &session.context.summary().await.unwrap_or_default(),
        );

        match Tera::one_off(&self.settings.system_prompt, &context, false) {
            Ok(rendered) => rendered,
            Err(e) => {
                tracing::warn!(error = %e, "failed to render system prompt template");
                self.settings.system_prompt.clone()
            }
        }
    }
}
