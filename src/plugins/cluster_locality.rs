use tokio_util::sync::CancellationToken;

use crate::models::{Cluster, Placement, ResourceBindingSpec, MAX_CLUSTER_SCORE, MIN_CLUSTER_SCORE};
use crate::plugins::{Plugin, ScorePlugin, Status};

/// Favors clusters the workload is already scheduled on, proportionally to
/// how much of the current deployment sits there. A cluster with no
/// existing replicas, or a workload with no existing placement at all,
/// scores the floor.
pub struct ClusterLocality;

impl Plugin for ClusterLocality {
    fn name(&self) -> &str {
        "ClusterLocality"
    }
}

impl ScorePlugin for ClusterLocality {
    fn score(&self, _placement: &Placement, spec: &ResourceBindingSpec, cluster: &Cluster, _cancel: &CancellationToken) -> (i64, Status) {
        let total: i64 = spec.clusters.iter().map(|t| t.replicas as i64).sum();
        if total <= 0 {
            return (MIN_CLUSTER_SCORE, Status::success());
        }

        let already_on_cluster = spec
            .clusters
            .iter()
            .find(|t| t.name == cluster.name)
            .map(|t| t.replicas as i64)
            .unwrap_or(0);

        let score = if already_on_cluster > 0 {
            already_on_cluster * MAX_CLUSTER_SCORE / total
        } else {
            MIN_CLUSTER_SCORE
        };
        (score, Status::success())
    }
}
