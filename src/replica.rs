use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::SchedulerError;
use crate::estimator::{calc_available_replicas, Estimator};
use crate::models::{
    Cluster, ClusterPreferences, DynamicWeight, ReplicaDivisionPreference, ReplicaSchedulingStrategy, ReplicaSchedulingType,
    ResourceBindingSpec, TargetCluster,
};

/// Turns a chosen cluster list into a per-cluster replica count, following
/// the strategy's scheduling type and (for `Divided`) division preference.
pub async fn assign_replicas(
    clusters: &[Cluster],
    strategy: Option<&ReplicaSchedulingStrategy>,
    spec: &ResourceBindingSpec,
    estimators: &[Arc<dyn Estimator>],
    cancel: &CancellationToken,
) -> Result<Vec<TargetCluster>, SchedulerError> {
    if clusters.is_empty() {
        return Err(SchedulerError::NoClustersAvailable);
    }
    if cancel.is_cancelled() {
        return Err(SchedulerError::Cancelled);
    }

    let Some(strategy) = strategy else {
        return Ok(zero_replicas(clusters));
    };
    if spec.replicas == 0 {
        return Ok(zero_replicas(clusters));
    }

    match strategy.replica_scheduling_type {
        ReplicaSchedulingType::Duplicated => Ok(clusters
            .iter()
            .map(|c| TargetCluster { name: c.name.clone(), replicas: spec.replicas })
            .collect()),
        ReplicaSchedulingType::Divided => match strategy.replica_division_preference {
            Some(ReplicaDivisionPreference::Weighted) => {
                divide_weighted(clusters, strategy.weight_preference.as_ref(), spec, estimators, cancel).await
            }
            Some(ReplicaDivisionPreference::Aggregated) => divide_aggregated(clusters, spec, estimators, cancel).await,
            None => Err(SchedulerError::UndefinedStrategy(
                "Divided scheduling requires a division preference".to_string(),
            )),
        },
    }
}

fn zero_replicas(clusters: &[Cluster]) -> Vec<TargetCluster> {
    clusters.iter().map(|c| TargetCluster { name: c.name.clone(), replicas: 0 }).collect()
}

async fn divide_weighted(
    clusters: &[Cluster],
    weight_preference: Option<&ClusterPreferences>,
    spec: &ResourceBindingSpec,
    estimators: &[Arc<dyn Estimator>],
    cancel: &CancellationToken,
) -> Result<Vec<TargetCluster>, SchedulerError> {
    let weights = match weight_preference {
        None => vec![1i64; clusters.len()],
        Some(pref) => match pref.dynamic_weight {
            Some(DynamicWeight::AvailableReplicas) => {
                let available = calc_available_replicas(estimators, clusters, spec, cancel).await?;
                available.iter().map(|t| t.replicas.max(0) as i64).collect()
            }
            Some(DynamicWeight::Unknown) => {
                return Err(SchedulerError::UndefinedStrategy("unrecognized dynamic weight value".to_string()));
            }
            None if !pref.static_weight_list.is_empty() => clusters
                .iter()
                .map(|c| {
                    pref.static_weight_list
                        .iter()
                        .find(|w| w.target_cluster.matches(c))
                        .map(|w| w.weight)
                        .unwrap_or(0)
                })
                .collect(),
            None => vec![1i64; clusters.len()],
        },
    };

    divide_by_largest_remainder(clusters, &weights, spec.replicas)
}

fn divide_by_largest_remainder(clusters: &[Cluster], weights: &[i64], total: i32) -> Result<Vec<TargetCluster>, SchedulerError> {
    let sum: i64 = weights.iter().sum();
    if sum <= 0 || total <= 0 {
        return Ok(zero_replicas(clusters));
    }

    let mut result: Vec<TargetCluster> = Vec::with_capacity(clusters.len());
    let mut fractions: Vec<(usize, f64)> = Vec::with_capacity(clusters.len());
    let mut allocated = 0i32;

    for (i, (cluster, &weight)) in clusters.iter().zip(weights.iter()).enumerate() {
        let exact = total as f64 * weight as f64 / sum as f64;
        let floor = exact.floor() as i32;
        allocated += floor;
        fractions.push((i, exact - floor as f64));
        result.push(TargetCluster { name: cluster.name.clone(), replicas: floor });
    }

    let mut remainder = total - allocated;
    fractions.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| clusters[a.0].name.cmp(&clusters[b.0].name))
    });

    for (idx, _) in fractions {
        if remainder <= 0 {
            break;
        }
        result[idx].replicas += 1;
        remainder -= 1;
    }

    Ok(result)
}

async fn divide_aggregated(
    clusters: &[Cluster],
    spec: &ResourceBindingSpec,
    estimators: &[Arc<dyn Estimator>],
    cancel: &CancellationToken,
) -> Result<Vec<TargetCluster>, SchedulerError> {
    let mut available = calc_available_replicas(estimators, clusters, spec, cancel).await?;
    available.sort_by(|a, b| b.replicas.cmp(&a.replicas).then_with(|| a.name.cmp(&b.name)));

    let mut remaining = spec.replicas;
    let mut result = Vec::with_capacity(available.len());
    for target in &available {
        let take = if remaining <= 0 { 0 } else { remaining.min(target.replicas.max(0)) };
        result.push(TargetCluster { name: target.name.clone(), replicas: take });
        remaining -= take;
    }

    if remaining > 0 {
        let total_available: i64 = available.iter().map(|t| t.replicas.max(0) as i64).sum();
        return Err(SchedulerError::InsufficientCapacity {
            requested: spec.replicas,
            available: total_available,
        });
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClusterAffinity, ObjectReference, StaticClusterWeight};
    use async_trait::async_trait;

    fn cluster(name: &str) -> Cluster {
        Cluster { name: name.to_string(), ready: true, ..Default::default() }
    }

    fn spec(replicas: i32) -> ResourceBindingSpec {
        ResourceBindingSpec { resource: ObjectReference::default(), replicas, ..Default::default() }
    }

    struct FixedEstimator(Vec<TargetCluster>);

    #[async_trait]
    impl Estimator for FixedEstimator {
        async fn max_available_replicas(
            &self,
            _clusters: &[Cluster],
            _spec: &ResourceBindingSpec,
            _cancel: &CancellationToken,
        ) -> anyhow::Result<Vec<TargetCluster>> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn duplicated_gives_every_cluster_full_count() {
        let clusters = vec![cluster("member1"), cluster("member2")];
        let strategy = ReplicaSchedulingStrategy {
            replica_scheduling_type: ReplicaSchedulingType::Duplicated,
            replica_division_preference: None,
            weight_preference: None,
        };
        let cancel = CancellationToken::new();
        let result = assign_replicas(&clusters, Some(&strategy), &spec(5), &[], &cancel).await.unwrap();
        assert!(result.iter().all(|t| t.replicas == 5));
    }

    #[tokio::test]
    async fn weighted_static_uses_largest_remainder() {
        let clusters = vec![cluster("memberA"), cluster("memberB")];
        let strategy = ReplicaSchedulingStrategy {
            replica_scheduling_type: ReplicaSchedulingType::Divided,
            replica_division_preference: Some(ReplicaDivisionPreference::Weighted),
            weight_preference: Some(ClusterPreferences {
                static_weight_list: vec![
                    StaticClusterWeight {
                        target_cluster: ClusterAffinity { cluster_names: vec!["memberA".to_string()], ..Default::default() },
                        weight: 3,
                    },
                    StaticClusterWeight {
                        target_cluster: ClusterAffinity { cluster_names: vec!["memberB".to_string()], ..Default::default() },
                        weight: 1,
                    },
                ],
                dynamic_weight: None,
            }),
        };
        let cancel = CancellationToken::new();
        let result = assign_replicas(&clusters, Some(&strategy), &spec(10), &[], &cancel).await.unwrap();
        assert_eq!(result.iter().find(|t| t.name == "memberA").unwrap().replicas, 8);
        assert_eq!(result.iter().find(|t| t.name == "memberB").unwrap().replicas, 2);
    }

    #[tokio::test]
    async fn aggregated_fills_highest_capacity_first() {
        let clusters = vec![cluster("member1"), cluster("member2")];
        let estimators: Vec<Arc<dyn Estimator>> = vec![Arc::new(FixedEstimator(vec![
            TargetCluster { name: "member1".into(), replicas: 10 },
            TargetCluster { name: "member2".into(), replicas: 5 },
        ]))];
        let strategy = ReplicaSchedulingStrategy {
            replica_scheduling_type: ReplicaSchedulingType::Divided,
            replica_division_preference: Some(ReplicaDivisionPreference::Aggregated),
            weight_preference: None,
        };
        let cancel = CancellationToken::new();
        let result = assign_replicas(&clusters, Some(&strategy), &spec(12), &estimators, &cancel).await.unwrap();
        assert_eq!(result.iter().find(|t| t.name == "member1").unwrap().replicas, 10);
        assert_eq!(result.iter().find(|t| t.name == "member2").unwrap().replicas, 2);
    }

    #[tokio::test]
    async fn aggregated_errors_when_capacity_is_insufficient() {
        let clusters = vec![cluster("member1"), cluster("member2")];
        let estimators: Vec<Arc<dyn Estimator>> = vec![Arc::new(FixedEstimator(vec![
            TargetCluster { name: "member1".into(), replicas: 10 },
            TargetCluster { name: "member2".into(), replicas: 5 },
        ]))];
        let strategy = ReplicaSchedulingStrategy {
            replica_scheduling_type: ReplicaSchedulingType::Divided,
            replica_division_preference: Some(ReplicaDivisionPreference::Aggregated),
            weight_preference: None,
        };
        let cancel = CancellationToken::new();
        let err = assign_replicas(&clusters, Some(&strategy), &spec(20), &estimators, &cancel).await.unwrap_err();
        assert_eq!(err, SchedulerError::InsufficientCapacity { requested: 20, available: 15 });
    }
}
