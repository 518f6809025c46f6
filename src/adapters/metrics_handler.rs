use prometheus::{Counter, CounterVec, Encoder, Opts, Registry, TextEncoder};

pub struct MetricsCollector {
    registry: Registry,

    // Request metrics
    pub chat_requests: Counter,
    pub decision_rounds: Counter,

    // Action metrics
    pub action_executions: CounterVec,

    // Cache metrics
    pub cache_hits: Counter,
    pub cache_misses: Counter,
}

impl MetricsCollector {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let chat_requests = Counter::new(
            "hestia_chat_requests_total",
            "Total number of chat requests",
        )?;
        registry.register(Box::new(chat_requests.clone()))?;

        let decision_rounds = Counter::new(
            "hestia_decision_rounds_total",
            "Total number of LLM decision rounds",
        )?;
        registry.register(Box::new(decision_rounds.clone()))?;

        let action_executions = CounterVec::new(
            Opts::new(
                "hestia_action_executions_total",
                "Total action executions by action and outcome",
            ),
            &["action", "outcome"],
        )?;
        registry.register(Box::new(action_executions.clone()))?;

        let cache_hits = Counter::new("hestia_cache_hits_total", "Result cache hits")?;
        registry.register(Box::new(cache_hits.clone()))?;

        let cache_misses = Counter::new("hestia_cache_misses_total", "Result cache misses")?;
        registry.register(Box::new(cache_misses.clone()))?;

        Ok(Self {
            registry,
            chat_requests,
            decision_rounds,
            action_executions,
            cache_hits,
            cache_misses,
        })
    }

    /// Render all metrics in the Prometheus text exposition format
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
