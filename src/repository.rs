use crate::models::{CompositeArtifact, QualificationVerdict, Tier};
use moka::future::Cache;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Counters exposed on the dashboard endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub leads_qualified: u64,
    pub hot_leads: u64,
    pub warm_leads: u64,
    pub nurture_leads: u64,
    pub cold_leads: u64,
    pub proposals_generated: u64,
    pub licenses_issued: u64,
    /// Distinct artifact ids stored, not compose calls.
    pub artifacts_composed: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub pipeline_value: Decimal,
}

#[derive(Default)]
struct Counters {
    leads_qualified: AtomicU64,
    tiers: [AtomicU64; 4],
    proposals_generated: AtomicU64,
    licenses_issued: AtomicU64,
    artifacts_composed: AtomicU64,
    pipeline_value: Mutex<Decimal>,
}

/// In-memory store of recently composed artifacts plus pipeline counters.
///
/// Cheap to clone; clones share storage. Nothing here survives a restart.
#[derive(Clone)]
pub struct ArtifactRepository {
    artifacts: Cache<String, Arc<CompositeArtifact>>,
    counters: Arc<Counters>,
}

impl Default for ArtifactRepository {
    fn default() -> Self {
        Self::new(Duration::from_secs(3600), 10_000)
    }
}

fn tier_slot(tier: Tier) -> usize {
    match tier {
        Tier::Hot => 0,
        Tier::Warm => 1,
        Tier::Nurture => 2,
        Tier::Cold => 3,
    }
}

impl ArtifactRepository {
    pub fn new(ttl: Duration, max_capacity: u64) -> Self {
        Self {
            artifacts: Cache::builder()
                .time_to_live(ttl)
                .max_capacity(max_capacity)
                .build(),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn record_qualification(&self, verdict: &QualificationVerdict) {
        self.counters.leads_qualified.fetch_add(1, Ordering::Relaxed);
        self.counters.tiers[tier_slot(verdict.tier)].fetch_add(1, Ordering::Relaxed);
        let mut value = self
            .counters
            .pipeline_value
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *value = value.saturating_add(verdict.estimated_value);
    }

    pub fn record_proposal(&self) {
        self.counters
            .proposals_generated
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_license(&self) {
        self.counters.licenses_issued.fetch_add(1, Ordering::Relaxed);
    }

    /// Stores an artifact under its id. Re-storing the same id replaces the
    /// entry; only the first store of an id counts as a composed artifact.
    pub async fn store(&self, artifact: CompositeArtifact) -> Arc<CompositeArtifact> {
        let artifact = Arc::new(artifact);
        let entry = self
            .artifacts
            .entry(artifact.artifact_id.clone())
            .or_insert(artifact.clone())
            .await;

        if entry.is_fresh() {
            self.counters
                .artifacts_composed
                .fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Stored artifact {}", artifact.artifact_id);
        } else {
            self.artifacts
                .insert(artifact.artifact_id.clone(), artifact.clone())
                .await;
            tracing::debug!("Replaced artifact {}", artifact.artifact_id);
        }
        artifact
    }

    pub async fn get(&self, artifact_id: &str) -> Option<Arc<CompositeArtifact>> {
        self.artifacts.get(artifact_id).await
    }

    pub fn dashboard(&self) -> DashboardSnapshot {
        let c = &self.counters;
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        DashboardSnapshot {
            leads_qualified: load(&c.leads_qualified),
            hot_leads: load(&c.tiers[tier_slot(Tier::Hot)]),
            warm_leads: load(&c.tiers[tier_slot(Tier::Warm)]),
            nurture_leads: load(&c.tiers[tier_slot(Tier::Nurture)]),
            cold_leads: load(&c.tiers[tier_slot(Tier::Cold)]),
            proposals_generated: load(&c.proposals_generated),
            licenses_issued: load(&c.licenses_issued),
            artifacts_composed: load(&c.artifacts_composed),
            pipeline_value: *c
                .pipeline_value
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        }
    }
}
