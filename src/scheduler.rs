use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::cache::ClusterCache;
use crate::error::SchedulerError;
use crate::estimator::Estimator;
use crate::metrics::{LoggingMetricsSink, MetricsSink, ScheduleStep, StepTimer};
use crate::models::{Cluster, ClusterScore, ClusterScoreList, Placement, ResourceBindingSpec, TargetCluster, sort_cluster_score_list};
use crate::plugins::Registry;
use crate::{replica, spread, topology};

/// The outcome of a scheduling call: one entry per cluster the workload was
/// assigned to, in no particular order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScheduleResult {
    pub suggested_clusters: Vec<TargetCluster>,
}

/// The single scheduling entry point. Holds the cluster cache, the
/// constructed plugin registry, and whatever Replica Estimators are wired
/// in; stateless otherwise — every `schedule` call is independent.
pub struct Scheduler {
    cache: ClusterCache,
    registry: Registry,
    estimators: Vec<Arc<dyn Estimator>>,
    metrics: Arc<dyn MetricsSink>,
}

impl Scheduler {
    /// Builds a scheduler with the built-in plugin set and no estimators
    /// registered. Use `with_registry`/`with_estimators`/`with_metrics_sink`
    /// to customize before scheduling anything.
    pub fn new(cache: ClusterCache) -> Self {
        Self {
            cache,
            registry: Registry::with_defaults(),
            estimators: Vec::new(),
            metrics: Arc::new(LoggingMetricsSink),
        }
    }

    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_estimators(mut self, estimators: Vec<Arc<dyn Estimator>>) -> Self {
        self.estimators = estimators;
        self
    }

    pub fn with_metrics_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.metrics = sink;
        self
    }

    pub fn cache(&self) -> &ClusterCache {
        &self.cache
    }

    /// Runs the full pipeline: Snapshot → Filter → Score → Group → Select →
    /// Assign. Steps are strictly ordered; each timed step's duration is
    /// reported to the configured `MetricsSink` regardless of outcome.
    /// `cancel` is checked before every step; a trip at any point aborts the
    /// call with `SchedulerError::Cancelled` rather than running the
    /// remaining steps.
    pub async fn schedule(&self, placement: &Placement, spec: &ResourceBindingSpec, cancel: &CancellationToken) -> Result<ScheduleResult, SchedulerError> {
        let snapshot = self.cache.snapshot().await;
        if snapshot.num_of_clusters() == 0 {
            return Err(SchedulerError::NoClustersAvailable);
        }
        let ready_clusters = snapshot.get_ready_clusters();

        if cancel.is_cancelled() {
            return Err(SchedulerError::Cancelled);
        }
        let feasible = {
            let _timer = StepTimer::start(self.metrics.as_ref(), ScheduleStep::Filter);
            self.filter(placement, spec, &ready_clusters, cancel)?
        };
        if feasible.is_empty() {
            return Err(SchedulerError::NoFeasibleClusters);
        }

        if cancel.is_cancelled() {
            return Err(SchedulerError::Cancelled);
        }
        let scored = {
            let _timer = StepTimer::start(self.metrics.as_ref(), ScheduleStep::Score);
            self.score(placement, spec, feasible, cancel)?
        };

        if cancel.is_cancelled() {
            return Err(SchedulerError::Cancelled);
        }
        let selected = {
            let _timer = StepTimer::start(self.metrics.as_ref(), ScheduleStep::Select);
            self.select(placement, spec, scored, cancel).await?
        };

        if cancel.is_cancelled() {
            return Err(SchedulerError::Cancelled);
        }
        let suggested = {
            let _timer = StepTimer::start(self.metrics.as_ref(), ScheduleStep::AssignReplicas);
            replica::assign_replicas(&selected, placement.replica_scheduling.as_ref(), spec, &self.estimators, cancel).await?
        };

        Ok(ScheduleResult { suggested_clusters: suggested })
    }

    fn filter(
        &self,
        placement: &Placement,
        spec: &ResourceBindingSpec,
        ready_clusters: &[Cluster],
        cancel: &CancellationToken,
    ) -> Result<Vec<Cluster>, SchedulerError> {
        let mut feasible = Vec::with_capacity(ready_clusters.len());
        for cluster in ready_clusters {
            let status = self.registry.run_filter_plugins(placement, spec, cluster, cancel)?;
            if status.is_success() {
                feasible.push(cluster.clone());
            } else {
                log::debug!("cluster {} filtered out: {:?}", cluster.name, status.reasons);
            }
        }
        Ok(feasible)
    }

    fn score(
        &self,
        placement: &Placement,
        spec: &ResourceBindingSpec,
        feasible: Vec<Cluster>,
        cancel: &CancellationToken,
    ) -> Result<ClusterScoreList, SchedulerError> {
        let mut scored = Vec::with_capacity(feasible.len());
        for cluster in feasible {
            let score = self.registry.run_score_plugins(placement, spec, &cluster, cancel)?;
            scored.push(ClusterScore { cluster, score });
        }
        Ok(scored)
    }

    async fn select(
        &self,
        placement: &Placement,
        spec: &ResourceBindingSpec,
        mut scored: ClusterScoreList,
        cancel: &CancellationToken,
    ) -> Result<Vec<Cluster>, SchedulerError> {
        if placement.spread_constraints.is_empty() {
            sort_cluster_score_list(&mut scored);
            return Ok(scored.into_iter().map(|cs| cs.cluster).collect());
        }

        let group = topology::group_clusters_with_score(&scored, placement, spec, &self.estimators, cancel).await?;
        spread::select_best_clusters(placement, &group, spec.replicas)
    }
}
