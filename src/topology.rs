use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::SchedulerError;
use crate::estimator::{calc_available_replicas, Estimator};
use crate::models::{Cluster, ClusterScoreList, Placement, ResourceBindingSpec, SpreadFieldValue};

/// One cluster plus its total score and available-replica count, the leaf
/// node of the topology hierarchy.
#[derive(Clone, Debug)]
pub struct ClusterDetailInfo {
    pub cluster: Cluster,
    pub score: i64,
    pub available_replicas: i64,
}

#[derive(Clone, Debug)]
pub struct ZoneInfo {
    pub name: String,
    pub score: i64,
    pub available_replicas: i64,
    pub clusters: Vec<ClusterDetailInfo>,
}

#[derive(Clone, Debug)]
pub struct RegionInfo {
    pub name: String,
    pub score: i64,
    pub available_replicas: i64,
    pub zones: Vec<ZoneInfo>,
    /// Every cluster beneath this region, flattened, sorted the same way as
    /// the top-level `Clusters` list.
    pub clusters: Vec<ClusterDetailInfo>,
}

#[derive(Clone, Debug)]
pub struct ProviderInfo {
    pub name: String,
    pub score: i64,
    pub available_replicas: i64,
    pub regions: Vec<RegionInfo>,
    pub clusters: Vec<ClusterDetailInfo>,
}

/// Four parallel views of the same clusters. `zones`/`regions`/`providers`
/// are left empty when the placement is cluster-only concerned, in which
/// case only `clusters` is meaningful.
#[derive(Clone, Debug, Default)]
pub struct GroupClustersInfo {
    pub clusters: Vec<ClusterDetailInfo>,
    pub zones: Vec<ZoneInfo>,
    pub regions: Vec<RegionInfo>,
    pub providers: Vec<ProviderInfo>,
}

fn is_cluster_only_concerned(placement: &Placement) -> bool {
    placement
        .spread_constraints
        .iter()
        .all(|c| c.spread_by_field == SpreadFieldValue::Cluster)
}

fn sort_details(details: &mut [ClusterDetailInfo]) {
    details.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.cluster.name.cmp(&b.cluster.name)));
}

/// Builds the four-level topology view for a scored, feasible cluster list.
/// Queries the replica estimators once for the whole set; aborts with
/// `SchedulerError::Cancelled` if `cancel` trips during that call.
pub async fn group_clusters_with_score(
    scored: &ClusterScoreList,
    placement: &Placement,
    spec: &ResourceBindingSpec,
    estimators: &[Arc<dyn Estimator>],
    cancel: &CancellationToken,
) -> Result<GroupClustersInfo, SchedulerError> {
    let clusters: Vec<Cluster> = scored.iter().map(|cs| cs.cluster.clone()).collect();
    let available = calc_available_replicas(estimators, &clusters, spec, cancel).await?;

    let mut details: Vec<ClusterDetailInfo> = scored
        .iter()
        .zip(available.iter())
        .map(|(cs, avail)| ClusterDetailInfo {
            cluster: cs.cluster.clone(),
            score: cs.score,
            available_replicas: avail.replicas as i64,
        })
        .collect();
    sort_details(&mut details);

    if is_cluster_only_concerned(placement) {
        return Ok(GroupClustersInfo {
            clusters: details,
            ..Default::default()
        });
    }

    let zones = group_by_zone(&details);
    let regions = group_by_region(&zones);
    let providers = group_by_provider(&regions);

    Ok(GroupClustersInfo { clusters: details, zones, regions, providers })
}

fn group_by_zone(details: &[ClusterDetailInfo]) -> Vec<ZoneInfo> {
    let mut buckets: HashMap<String, Vec<ClusterDetailInfo>> = HashMap::new();
    for detail in details {
        let zone = detail.cluster.zone.clone().unwrap_or_default();
        buckets.entry(zone).or_default().push(detail.clone());
    }

    let mut zones: Vec<ZoneInfo> = buckets
        .into_iter()
        .map(|(name, mut clusters)| {
            sort_details(&mut clusters);
            let score = clusters.iter().map(|c| c.score).sum();
            let available_replicas = clusters.iter().map(|c| c.available_replicas).sum();
            ZoneInfo { name, score, available_replicas, clusters }
        })
        .collect();
    zones.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
    zones
}

fn group_by_region(zones: &[ZoneInfo]) -> Vec<RegionInfo> {
    let mut buckets: HashMap<String, Vec<ZoneInfo>> = HashMap::new();
    for zone in zones {
        let region = zone
            .clusters
            .first()
            .and_then(|c| c.cluster.region.clone())
            .unwrap_or_default();
        buckets.entry(region).or_default().push(zone.clone());
    }

    let mut regions: Vec<RegionInfo> = buckets
        .into_iter()
        .map(|(name, mut zones)| {
            zones.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
            let score = zones.iter().map(|z| z.score).sum();
            let available_replicas = zones.iter().map(|z| z.available_replicas).sum();
            let mut clusters: Vec<ClusterDetailInfo> = zones.iter().flat_map(|z| z.clusters.clone()).collect();
            sort_details(&mut clusters);
            RegionInfo { name, score, available_replicas, zones, clusters }
        })
        .collect();
    regions.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
    regions
}

fn group_by_provider(regions: &[RegionInfo]) -> Vec<ProviderInfo> {
    let mut buckets: HashMap<String, Vec<RegionInfo>> = HashMap::new();
    for region in regions {
        let provider = region
            .clusters
            .first()
            .and_then(|c| c.cluster.provider.clone())
            .unwrap_or_default();
        buckets.entry(provider).or_default().push(region.clone());
    }

    let mut providers: Vec<ProviderInfo> = buckets
        .into_iter()
        .map(|(name, mut regions)| {
            regions.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
            let score = regions.iter().map(|r| r.score).sum();
            let available_replicas = regions.iter().map(|r| r.available_replicas).sum();
            let mut clusters: Vec<ClusterDetailInfo> = regions.iter().flat_map(|r| r.clusters.clone()).collect();
            sort_details(&mut clusters);
            ProviderInfo { name, score, available_replicas, regions, clusters }
        })
        .collect();
    // Sorted unconditionally, unlike the Go source this was distilled from,
    // which omits this final sort for providers specifically — see DESIGN.md.
    providers.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
    providers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClusterScore, SpreadConstraint};

    fn cluster(name: &str, provider: &str, region: &str, zone: &str) -> Cluster {
        Cluster {
            name: name.to_string(),
            provider: Some(provider.to_string()),
            region: Some(region.to_string()),
            zone: Some(zone.to_string()),
            ready: true,
            ..Default::default()
        }
    }

    fn scores() -> ClusterScoreList {
        vec![
            ClusterScore { cluster: cluster("member1", "P1", "R1", "Z1"), score: 20 },
            ClusterScore { cluster: cluster("member2", "P1", "R1", "Z2"), score: 40 },
            ClusterScore { cluster: cluster("member3", "P2", "R1", "Z1"), score: 30 },
            ClusterScore { cluster: cluster("member4", "P2", "R2", "Z2"), score: 60 },
        ]
    }

    struct FlatEstimator;

    #[async_trait::async_trait]
    impl Estimator for FlatEstimator {
        async fn max_available_replicas(
            &self,
            clusters: &[Cluster],
            _spec: &ResourceBindingSpec,
            _cancel: &CancellationToken,
        ) -> anyhow::Result<Vec<crate::models::TargetCluster>> {
            Ok(clusters
                .iter()
                .map(|c| crate::models::TargetCluster { name: c.name.clone(), replicas: 100 })
                .collect())
        }
    }

    #[tokio::test]
    async fn flat_clusters_sorted_by_score_with_no_spread_constraints() {
        let estimators: Vec<Arc<dyn Estimator>> = vec![Arc::new(FlatEstimator)];
        let cancel = CancellationToken::new();
        let group = group_clusters_with_score(&scores(), &Placement::default(), &ResourceBindingSpec::default(), &estimators, &cancel)
            .await
            .unwrap();
        let names: Vec<&str> = group.clusters.iter().map(|c| c.cluster.name.as_str()).collect();
        assert_eq!(names, vec!["member4", "member2", "member3", "member1"]);
    }

    #[tokio::test]
    async fn cluster_only_constraint_skips_grouping() {
        let estimators: Vec<Arc<dyn Estimator>> = vec![Arc::new(FlatEstimator)];
        let placement = Placement {
            spread_constraints: vec![SpreadConstraint {
                spread_by_field: SpreadFieldValue::Cluster,
                min_groups: 1,
                max_groups: 1,
            }],
            ..Default::default()
        };
        let cancel = CancellationToken::new();
        let group = group_clusters_with_score(&scores(), &placement, &ResourceBindingSpec::default(), &estimators, &cancel)
            .await
            .unwrap();
        assert!(group.zones.is_empty());
        assert!(group.regions.is_empty());
        assert!(group.providers.is_empty());
    }

    #[tokio::test]
    async fn region_grouping_aggregates_and_sorts() {
        let estimators: Vec<Arc<dyn Estimator>> = vec![Arc::new(FlatEstimator)];
        let placement = Placement {
            spread_constraints: vec![SpreadConstraint {
                spread_by_field: SpreadFieldValue::Region,
                min_groups: 1,
                max_groups: 2,
            }],
            ..Default::default()
        };
        let cancel = CancellationToken::new();
        let group = group_clusters_with_score(&scores(), &placement, &ResourceBindingSpec::default(), &estimators, &cancel)
            .await
            .unwrap();
        // R1 = member1(20) + member2(40) + member3(30) = 90, R2 = member4(60)
        assert_eq!(group.regions.len(), 2);
        assert_eq!(group.regions[0].name, "R1");
        assert_eq!(group.regions[0].score, 90);
        assert_eq!(group.regions[1].name, "R2");
        assert_eq!(group.regions[1].score, 60);
        assert_eq!(group.providers.len(), 2);
    }
}
