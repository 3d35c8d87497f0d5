use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::SchedulerError;
use crate::models::{Cluster, ResourceBindingSpec, TargetCluster};

/// Sentinel meaning "this estimator could not determine an answer for this
/// cluster". Never treated as zero capacity; skipped during aggregation.
pub const UNAUTHENTIC_REPLICA: i32 = -1;

/// A collaborator that reports how many more replicas of a workload a
/// cluster could host. Arbitrary external I/O (a metrics API, a resource
/// quota service, ...), so failures stay `anyhow::Error` rather than
/// joining `SchedulerError`'s closed set of decision points. `cancel` must
/// be honored promptly — an implementation backed by a network call should
/// race it against the request.
#[async_trait]
pub trait Estimator: Send + Sync {
    async fn max_available_replicas(
        &self,
        clusters: &[Cluster],
        spec: &ResourceBindingSpec,
        cancel: &CancellationToken,
    ) -> anyhow::Result<Vec<TargetCluster>>;
}

/// Aggregates every estimator's opinion per cluster by taking the minimum
/// reported value, ignoring `UNAUTHENTIC_REPLICA` answers. A cluster no
/// estimator could speak to falls back to `spec.replicas`, matching the
/// "assume it can host everything" default of the system being modeled.
/// Estimator errors are logged and treated the same as an unauthentic
/// answer rather than failing the whole scheduling call. Checked against
/// `cancel` before and after every estimator call; a trip aborts the whole
/// aggregation with `SchedulerError::Cancelled` rather than returning a
/// partial answer.
pub async fn calc_available_replicas(
    estimators: &[Arc<dyn Estimator>],
    clusters: &[Cluster],
    spec: &ResourceBindingSpec,
    cancel: &CancellationToken,
) -> Result<Vec<TargetCluster>, SchedulerError> {
    let mut available: Vec<i32> = vec![i32::MAX; clusters.len()];

    for estimator in estimators {
        if cancel.is_cancelled() {
            return Err(SchedulerError::Cancelled);
        }
        match estimator.max_available_replicas(clusters, spec, cancel).await {
            Ok(reported) => {
                for (i, cluster) in clusters.iter().enumerate() {
                    let Some(target) = reported.iter().find(|t| t.name == cluster.name) else {
                        continue;
                    };
                    if target.replicas == UNAUTHENTIC_REPLICA {
                        continue;
                    }
                    if target.replicas < available[i] {
                        available[i] = target.replicas;
                    }
                }
            }
            Err(err) => {
                log::warn!("replica estimator failed, treating as unauthentic: {err}");
            }
        }
        if cancel.is_cancelled() {
            return Err(SchedulerError::Cancelled);
        }
    }

    Ok(clusters
        .iter()
        .zip(available)
        .map(|(cluster, replicas)| TargetCluster {
            name: cluster.name.clone(),
            replicas: if replicas == i32::MAX { spec.replicas } else { replicas },
        })
        .collect())
}
