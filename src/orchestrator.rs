//! Fan-out/fan-in over the configured AI providers.
//!
//! Every call is bounded by the configured timeout and guarded by the
//! provider's circuit breaker. Results are keyed by provider, never by
//! arrival order. Nothing here spawns: dropping the returned future drops
//! every in-flight request with it.

use crate::circuit_breaker::{create_provider_circuit_breaker, ProviderBreaker};
use crate::config::Config;
use crate::errors::AppError;
use crate::models::{ContentSection, ContentTask, ProviderId, ProviderRequest, ProviderResult};
use crate::providers::{ProviderClient, ProviderError, ProviderSettings};
use failsafe::futures::CircuitBreaker;
use futures::future::join_all;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// One provider call inside a [`TaskPlan`].
#[derive(Debug, Clone)]
pub struct PlanStep {
    pub request: ProviderRequest,
    /// Provider whose successful output is appended to this step's prompt.
    pub depends_on: Option<ProviderId>,
}

impl PlanStep {
    pub fn independent(request: ProviderRequest) -> Self {
        Self {
            request,
            depends_on: None,
        }
    }

    pub fn after(request: ProviderRequest, dependency: ProviderId) -> Self {
        Self {
            request,
            depends_on: Some(dependency),
        }
    }
}

/// Provider calls for one content task, at most one per provider.
#[derive(Debug, Clone)]
pub struct TaskPlan {
    pub task: ContentTask,
    steps: Vec<PlanStep>,
}

impl TaskPlan {
    pub fn new(task: ContentTask, steps: Vec<PlanStep>) -> Result<Self, AppError> {
        let mut seen = HashSet::new();
        for step in &steps {
            if !seen.insert(step.request.provider) {
                return Err(AppError::BadRequest(format!(
                    "Task {} has more than one step for provider {}",
                    task, step.request.provider
                )));
            }
        }
        Ok(Self { task, steps })
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }
}

#[derive(Clone)]
pub struct ProviderOrchestrator {
    clients: HashMap<ProviderId, ProviderClient>,
    breakers: HashMap<ProviderId, ProviderBreaker>,
    timeout: Duration,
}

impl ProviderOrchestrator {
    pub fn new(clients: Vec<ProviderClient>, timeout: Duration) -> Self {
        let mut by_id = HashMap::new();
        let mut breakers = HashMap::new();
        for client in clients {
            breakers.insert(client.provider(), create_provider_circuit_breaker());
            by_id.insert(client.provider(), client);
        }
        Self {
            clients: by_id,
            breakers,
            timeout,
        }
    }

    /// Builds a client for every provider that has an API key.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let mut clients = Vec::new();
        for provider in config.configured_providers() {
            if let Some(settings) = ProviderSettings::from_config(config, provider) {
                clients.push(ProviderClient::new(settings)?);
                tracing::info!("✓ {} provider client initialized", provider);
            }
        }
        Ok(Self::new(
            clients,
            Duration::from_secs(config.provider_timeout_secs),
        ))
    }

    pub fn configured_providers(&self) -> Vec<ProviderId> {
        let mut ids: Vec<_> = self.clients.keys().copied().collect();
        ids.sort();
        ids
    }

    fn limiter(&self) -> Semaphore {
        Semaphore::new(self.clients.len().max(1))
    }

    /// Runs independent requests concurrently. Exactly one entry per distinct
    /// provider; a repeated provider keeps its first request.
    pub async fn fan_out(
        &self,
        requests: Vec<ProviderRequest>,
    ) -> BTreeMap<ProviderId, ProviderResult> {
        let mut seen = HashSet::new();
        let mut unique = Vec::with_capacity(requests.len());
        for request in requests {
            if seen.insert(request.provider) {
                unique.push(request);
            } else {
                tracing::warn!(
                    "⚠️  Dropping duplicate request for provider {} in one batch",
                    request.provider
                );
            }
        }

        let limiter = self.limiter();
        let results = join_all(unique.iter().map(|r| self.call_one(r, &limiter))).await;
        results.into_iter().map(|r| (r.provider, r)).collect()
    }

    /// Runs a plan in dependency waves.
    pub async fn execute(&self, plan: &TaskPlan) -> BTreeMap<ProviderId, ProviderResult> {
        let limiter = self.limiter();
        self.execute_with(plan, &limiter).await
    }

    /// Runs every plan concurrently under one shared concurrency limit.
    pub async fn execute_all(&self, plans: &[TaskPlan]) -> Vec<ContentSection> {
        let limiter = self.limiter();
        tracing::info!(
            "Executing {} task plan(s) across {} provider(s)",
            plans.len(),
            self.clients.len()
        );
        join_all(plans.iter().map(|plan| {
            let limiter = &limiter;
            async move { ContentSection::new(plan.task, self.execute_with(plan, limiter).await) }
        }))
        .await
    }

    async fn execute_with(
        &self,
        plan: &TaskPlan,
        limiter: &Semaphore,
    ) -> BTreeMap<ProviderId, ProviderResult> {
        let mut results: BTreeMap<ProviderId, ProviderResult> = BTreeMap::new();
        let mut pending: Vec<&PlanStep> = plan.steps.iter().collect();

        while !pending.is_empty() {
            let (ready, waiting): (Vec<&PlanStep>, Vec<&PlanStep>) =
                pending.into_iter().partition(|step| match step.depends_on {
                    None => true,
                    Some(dep) => results.contains_key(&dep),
                });

            if ready.is_empty() {
                for step in waiting {
                    let provider = step.request.provider;
                    let dependency = step.depends_on.map(|d| d.to_string()).unwrap_or_default();
                    tracing::warn!(
                        "⚠️  {}: step for {} has unresolvable dependency on {}",
                        plan.task,
                        provider,
                        dependency
                    );
                    results.insert(
                        provider,
                        ProviderResult::failure(
                            provider,
                            self.model_label(&step.request),
                            format!("unresolvable dependency on {}", dependency),
                            0,
                        ),
                    );
                }
                break;
            }

            let requests: Vec<ProviderRequest> = ready
                .iter()
                .map(|step| with_dependency_context(step, &results))
                .collect();
            let outcomes = join_all(requests.iter().map(|r| self.call_one(r, limiter))).await;
            for result in outcomes {
                results.insert(result.provider, result);
            }

            pending = waiting;
        }

        let succeeded = results.values().filter(|r| r.is_success()).count();
        tracing::info!(
            "{}: {}/{} provider call(s) succeeded",
            plan.task,
            succeeded,
            results.len()
        );
        results
    }

    fn model_label(&self, request: &ProviderRequest) -> String {
        match self.clients.get(&request.provider) {
            Some(client) => client.model_for(request),
            None => request.model.clone().unwrap_or_default(),
        }
    }

    async fn call_one(&self, request: &ProviderRequest, limiter: &Semaphore) -> ProviderResult {
        let provider = request.provider;
        let (Some(client), Some(breaker)) =
            (self.clients.get(&provider), self.breakers.get(&provider))
        else {
            return ProviderResult::failure(
                provider,
                self.model_label(request),
                format!("provider {} not configured", provider),
                0,
            );
        };

        // The semaphore is never closed; a failed acquire just runs unthrottled.
        let _permit = limiter.acquire().await.ok();

        let started = Instant::now();
        let outcome = breaker
            .call_with(
                |e: &ProviderError| e.trips_breaker(),
                client.try_call(request, self.timeout),
            )
            .await;
        let latency_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(completion) => ProviderResult::success(
                provider,
                completion.model,
                completion.content,
                completion.structured,
                completion.usage,
                latency_ms,
            ),
            Err(failsafe::Error::Rejected) => {
                tracing::warn!("⚠️  Circuit open for {}, failing fast", provider);
                ProviderResult::failure(
                    provider,
                    client.model_for(request),
                    format!("circuit open: {} temporarily unavailable", provider),
                    latency_ms,
                )
            }
            Err(failsafe::Error::Inner(e)) => {
                ProviderResult::failure(provider, client.model_for(request), e.message, latency_ms)
                    .with_raw_response(e.raw)
            }
        }
    }
}

fn with_dependency_context(
    step: &PlanStep,
    results: &BTreeMap<ProviderId, ProviderResult>,
) -> ProviderRequest {
    let mut request = step.request.clone();
    let upstream = step
        .depends_on
        .and_then(|dep| results.get(&dep))
        .and_then(|r| r.content.as_deref().map(|c| (r.provider, c)));

    if let Some((dep, content)) = upstream {
        request.prompt = format!("{}\n\nContext from {}:\n{}", request.prompt, dep, content);
    }
    request
}
