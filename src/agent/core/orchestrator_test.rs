use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use super::Orchestrator;
use crate::adapters::metrics_handler::MetricsCollector;
use crate::agent::domain::{Message, Role, ToolCall};
use crate::agent::error::{AgentError, LlmError, LlmResult};
use crate::agent::llm::{CompletionRequest, CompletionResponse, FinishReason, LlmProvider};
use crate::agent::memory::Session;
use crate::agent::registry::ActionRegistry;
use crate::config::AgentSettings;
use crate::domain::{ReservationPort, SearchPort, TimeSlot, VenueFilter, VenueSummary};

struct ScriptedProvider {
    script: Mutex<VecDeque<CompletionResponse>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<CompletionResponse>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    async fn request_count(&self) -> usize {
        self.requests.lock().await.len()
    }

    async fn request(&self, index: usize) -> CompletionRequest {
        self.requests.lock().await[index].clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionResponse> {
        self.requests.lock().await.push(request);
        self.script
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| LlmError::Api {
                status: 503,
                message: "script exhausted".to_string(),
            })
    }
}

fn decide_action(name: &str, arguments: Value) -> CompletionResponse {
    CompletionResponse {
        message: Message::assistant_with_tools(
            "",
            vec![ToolCall::new(ToolCall::generate_id(), name, arguments)],
        ),
        finish_reason: FinishReason::ToolCalls,
    }
}

fn decide_final(text: &str) -> CompletionResponse {
    CompletionResponse {
        message: Message::assistant(text),
        finish_reason: FinishReason::Stop,
    }
}

fn venue(id: &str, name: &str) -> VenueSummary {
    VenueSummary {
        resy_id: id.to_string(),
        name: name.to_string(),
        venue_type: Some("Italian".to_string()),
        description: Some("Handmade pasta in a converted garage space".to_string()),
        neighborhood: Some("Williamsburg".to_string()),
        locality: Some("New York".to_string()),
        address: None,
        rating: Some(4.8),
        price_range_id: Some(3),
        latitude: Some(40.717),
        longitude: Some(-73.952),
        distance_score: Some(0.12),
    }
}

#[derive(Default)]
struct FakeSearch {
    calls: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl SearchPort for FakeSearch {
    async fn search(
        &self,
        _query: &str,
        _limit: usize,
        _filter: Option<&VenueFilter>,
    ) -> anyhow::Result<Vec<VenueSummary>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("search index unavailable");
        }
        Ok(vec![venue("834", "Lilia"), venue("612", "Bernie's")])
    }
}

#[derive(Default)]
struct FakeReservations {
    availability_calls: AtomicUsize,
    slot_calls: AtomicUsize,
}

#[async_trait]
impl ReservationPort for FakeReservations {
    async fn list_reservations(&self, _only_open: bool) -> anyhow::Result<Vec<Value>> {
        Ok(vec![json!({ "venue": "Lilia", "status": { "finished": 0 } })])
    }

    async fn available_dates(
        &self,
        _venue_id: &str,
        _start_date: NaiveDate,
        _party_size: u32,
    ) -> anyhow::Result<Vec<String>> {
        self.availability_calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec!["2024-01-15".to_string(), "2024-01-16".to_string()])
    }

    async fn time_slots(
        &self,
        _venue_id: &str,
        _date: NaiveDate,
        _party_size: u32,
        _lat: f64,
        _long: f64,
    ) -> anyhow::Result<Vec<TimeSlot>> {
        self.slot_calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![TimeSlot {
            start: "2024-01-15 19:00:00".to_string(),
            booking_token: "tok-19".to_string(),
        }])
    }
}

struct Harness {
    orchestrator: Orchestrator,
    session: Session,
    provider: Arc<ScriptedProvider>,
    search: Arc<FakeSearch>,
    reservations: Arc<FakeReservations>,
    metrics: Arc<MetricsCollector>,
}

fn harness(responses: Vec<CompletionResponse>) -> Harness {
    harness_with(responses, FakeSearch::default(), AgentSettings::default())
}

fn harness_with(
    responses: Vec<CompletionResponse>,
    search: FakeSearch,
    settings: AgentSettings,
) -> Harness {
    let provider = ScriptedProvider::new(responses);
    let search = Arc::new(search);
    let reservations = Arc::new(FakeReservations::default());
    let metrics = Arc::new(MetricsCollector::new().unwrap());
    let registry = Arc::new(ActionRegistry::new(search.clone(), reservations.clone()));
    let orchestrator = Orchestrator::new(
        provider.clone(),
        registry,
        settings,
        metrics.clone(),
    );
    Harness {
        orchestrator,
        session: Session::new(Duration::from_secs(300)),
        provider,
        search,
        reservations,
        metrics,
    }
}

#[tokio::test]
async fn always_acting_model_stops_at_round_ceiling() {
    let mut responses: Vec<CompletionResponse> = (0..5)
        .map(|_| decide_action("search_restaurants", json!({ "query": "Italian" })))
        .collect();
    responses.push(decide_final("That's everything I could find."));
    let h = harness(responses);

    let outcome = h
        .orchestrator
        .run(&h.session, &[], "find me somewhere to eat")
        .await
        .unwrap();

    // Five decision rounds, one action each, then one summarization call
    // with no tools offered.
    assert_eq!(outcome.function_calls.len(), 5);
    assert_eq!(h.provider.request_count().await, 6);
    assert!(h.provider.request(5).await.tools.is_none());
    assert_eq!(outcome.message, "That's everything I could find.");
}

#[tokio::test]
async fn only_the_first_of_several_requested_actions_runs() {
    let multi = CompletionResponse {
        message: Message::assistant_with_tools(
            "",
            vec![
                ToolCall::new("call_1", "search_restaurants", json!({ "query": "Italian" })),
                ToolCall::new("call_2", "list_reservations", json!({})),
            ],
        ),
        finish_reason: FinishReason::ToolCalls,
    };
    let h = harness(vec![multi, decide_final("done")]);

    let outcome = h.orchestrator.run(&h.session, &[], "hello").await.unwrap();

    assert_eq!(outcome.function_calls.len(), 1);
    assert_eq!(outcome.function_calls[0].name, "search_restaurants");
    // The replayed assistant message carries only the call that was answered.
    let next = h.provider.request(1).await;
    let assistant = next
        .messages
        .iter()
        .find(|m| m.role == Role::Assistant)
        .unwrap();
    assert_eq!(assistant.tool_calls.as_ref().unwrap().len(), 1);
}

#[tokio::test]
async fn search_results_are_recorded_into_the_session_context() {
    let h = harness(vec![
        decide_action(
            "search_restaurants",
            json!({
                "query": "Italian restaurants",
                "filter": { "neighborhood": "Williamsburg" }
            }),
        ),
        decide_final("I found Lilia and Bernie's in Williamsburg."),
    ]);

    let outcome = h
        .orchestrator
        .run(&h.session, &[], "find me an Italian place in Williamsburg")
        .await
        .unwrap();

    assert_eq!(outcome.function_calls.len(), 1);
    assert!(outcome.message.contains("Lilia"));
    assert!(outcome.message.contains("Bernie's"));
    assert_eq!(h.search.calls.load(Ordering::SeqCst), 1);

    let lilia = h.session.context.lookup("lilia").await.unwrap();
    assert_eq!(lilia.venue_id, "834");
    assert_eq!(h.session.context.lookup("Bernie's").await.unwrap().venue_id, "612");
}

#[tokio::test]
async fn known_venue_is_resolved_without_a_new_search() {
    let h = harness(vec![
        decide_action("search_restaurants", json!({ "query": "Italian restaurants" })),
        decide_final("I found Lilia and Bernie's."),
    ]);

    h.orchestrator
        .run(&h.session, &[], "find me an Italian place")
        .await
        .unwrap();
    assert_eq!(h.search.calls.load(Ordering::SeqCst), 1);

    // Second turn: the model reads the venue id from the injected context
    // and goes straight to availability and slots.
    let second = vec![
        decide_action(
            "check_availability",
            json!({ "venue_id": "834", "start_date": "2024-01-10" }),
        ),
        decide_action(
            "get_time_slots",
            json!({ "venue_id": "834", "date": "2024-01-15" }),
        ),
        decide_final("Lilia has a table at 07:00 PM on January 15."),
    ];
    {
        let mut script = h.provider.script.lock().await;
        script.extend(second);
    }

    let history = vec![
        Message::user("find me an Italian place"),
        Message::assistant("I found Lilia and Bernie's."),
    ];
    let outcome = h
        .orchestrator
        .run(&h.session, &history, "what times are open at Lilia on 2024-01-15?")
        .await
        .unwrap();

    // The second turn's system prompt advertises the known venue ids.
    let seed = h.provider.request(2).await;
    assert_eq!(seed.messages[0].role, Role::System);
    assert!(seed.messages[0].content.contains("Lilia (venue_id: 834)"));

    assert_eq!(h.search.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.reservations.availability_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.reservations.slot_calls.load(Ordering::SeqCst), 1);
    assert_eq!(outcome.function_calls.len(), 2);
    assert!(outcome.function_calls[1].result["available_slots"]["07:00 PM"]["booking_token"]
        .is_string());
}

#[tokio::test]
async fn invalid_arguments_are_fed_back_for_self_correction() {
    let h = harness(vec![
        // Venue name where a numeric id belongs.
        decide_action(
            "check_availability",
            json!({ "venue_id": "Lilia", "start_date": "2024-01-10" }),
        ),
        decide_action(
            "check_availability",
            json!({ "venue_id": "834", "start_date": "2024-01-10" }),
        ),
        decide_final("Lilia has availability on January 15 and 16."),
    ]);

    let outcome = h
        .orchestrator
        .run(&h.session, &[], "when can I get into Lilia?")
        .await
        .unwrap();

    // No backend call was made for the rejected request.
    assert_eq!(h.reservations.availability_calls.load(Ordering::SeqCst), 1);
    // Only the successful execution shows up in the action-call list.
    assert_eq!(outcome.function_calls.len(), 1);

    // The corrective tool-result reached the model on the next round.
    let retry = h.provider.request(1).await;
    let last = retry.messages.last().unwrap();
    assert_eq!(last.role, Role::Tool);
    assert!(last.content.contains("numeric venue id"));
}

#[tokio::test]
async fn unknown_action_is_fed_back_for_self_correction() {
    let h = harness(vec![
        decide_action("book_table", json!({ "venue_id": "834" })),
        decide_final("I can't book directly, but I can show you open times."),
    ]);

    let outcome = h.orchestrator.run(&h.session, &[], "book Lilia").await.unwrap();

    assert!(outcome.function_calls.is_empty());
    let retry = h.provider.request(1).await;
    let last = retry.messages.last().unwrap();
    assert_eq!(last.role, Role::Tool);
    assert!(last.content.contains("Unknown action"));
}

#[tokio::test]
async fn collaborator_failure_stops_the_loop_and_still_answers() {
    let h = harness_with(
        vec![
            decide_action("search_restaurants", json!({ "query": "Italian" })),
            decide_final("The venue search is currently unavailable, please try again shortly."),
        ],
        FakeSearch {
            fail: true,
            ..Default::default()
        },
        AgentSettings::default(),
    );

    let outcome = h
        .orchestrator
        .run(&h.session, &[], "find me an Italian place")
        .await
        .unwrap();

    // The failure is surfaced in the action-call list, the loop did not
    // retry, and the final answer came from the no-tools summarization call.
    assert_eq!(outcome.function_calls.len(), 1);
    assert!(outcome.function_calls[0].result["error"]
        .as_str()
        .unwrap()
        .contains("search index unavailable"));
    assert_eq!(h.provider.request_count().await, 2);
    assert!(h.provider.request(1).await.tools.is_none());
    assert!(outcome.message.contains("unavailable"));
}

#[tokio::test]
async fn repeated_search_is_served_from_the_cache() {
    let h = harness(vec![
        decide_action("search_restaurants", json!({ "query": "Italian", "limit": 5 })),
        decide_final("found them"),
    ]);

    h.orchestrator.run(&h.session, &[], "italian?").await.unwrap();
    assert_eq!(h.search.calls.load(Ordering::SeqCst), 1);

    // Same arguments, different key order and spelled-out default.
    {
        let mut script = h.provider.script.lock().await;
        script.push_back(decide_action(
            "search_restaurants",
            json!({ "limit": 5, "query": "Italian" }),
        ));
        script.push_back(decide_final("same as before"));
    }
    let outcome = h.orchestrator.run(&h.session, &[], "italian again?").await.unwrap();

    assert_eq!(h.search.calls.load(Ordering::SeqCst), 1);
    assert_eq!(outcome.function_calls.len(), 1);
    assert_eq!(h.metrics.cache_hits.get() as u64, 1);
    assert_eq!(h.metrics.cache_misses.get() as u64, 1);
}

#[tokio::test]
async fn oversized_results_are_truncated_before_embedding() {
    let settings = AgentSettings {
        truncate_keep: 1,
        truncate_byte_budget: 64,
        ..Default::default()
    };
    let h = harness_with(
        vec![
            decide_action("search_restaurants", json!({ "query": "Italian" })),
            decide_final("found one"),
        ],
        FakeSearch::default(),
        settings,
    );

    let outcome = h.orchestrator.run(&h.session, &[], "italian?").await.unwrap();

    // The audit record keeps the full result; the transcript copy is cut.
    assert_eq!(outcome.function_calls[0].result["venues"].as_array().unwrap().len(), 2);
    let next = h.provider.request(1).await;
    let embedded = next.messages.last().unwrap();
    assert_eq!(embedded.role, Role::Tool);
    let payload: Value = serde_json::from_str(&embedded.content).unwrap();
    assert_eq!(payload["venues"].as_array().unwrap().len(), 1);
    assert_eq!(payload["count"], 1);
    assert_eq!(payload["truncated"], true);
}

#[tokio::test]
async fn decision_provider_failure_is_fatal() {
    let h = harness(Vec::new());

    let err = h.orchestrator.run(&h.session, &[], "hello").await.unwrap_err();
    assert!(matches!(err, AgentError::DecisionProvider(_)));
}

#[tokio::test]
async fn history_is_bounded_to_the_configured_window() {
    let settings = AgentSettings {
        history_window: 4,
        ..Default::default()
    };
    let h = harness_with(vec![decide_final("hi")], FakeSearch::default(), settings);

    let history: Vec<Message> = (0..20)
        .map(|i| {
            if i % 2 == 0 {
                Message::user(format!("turn {}", i))
            } else {
                Message::assistant(format!("turn {}", i))
            }
        })
        .collect();

    h.orchestrator.run(&h.session, &history, "latest").await.unwrap();

    let seed = h.provider.request(0).await;
    // system + bounded history + new user message
    assert_eq!(seed.messages.len(), 1 + 4 + 1);
    assert_eq!(seed.messages[1].content, "turn 16");
    assert_eq!(seed.messages.last().unwrap().content, "latest");
}
