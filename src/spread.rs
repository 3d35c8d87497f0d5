use crate::error::SchedulerError;
use crate::models::{Cluster, Placement, ReplicaDivisionPreference, ReplicaSchedulingType, SpreadFieldValue};
use crate::topology::{ClusterDetailInfo, GroupClustersInfo, RegionInfo};

/// `needReplicas == -1` means "don't filter on capacity at all".
pub const IGNORE_CAPACITY: i64 = -1;

/// True when `Divided + Weighted` with a static-only weight preference is in
/// effect: the static weights already dictate cluster membership, so spread
/// constraints would only fight them.
fn is_spread_ignored_by_weighted_static(placement: &Placement) -> bool {
    let Some(strategy) = &placement.replica_scheduling else {
        return false;
    };
    if strategy.replica_scheduling_type != ReplicaSchedulingType::Divided {
        return false;
    }
    if strategy.replica_division_preference != Some(ReplicaDivisionPreference::Weighted) {
        return false;
    }
    match &strategy.weight_preference {
        Some(pref) => pref.dynamic_weight.is_none() && !pref.static_weight_list.is_empty(),
        None => false,
    }
}

/// `Duplicated` scheduling ignores available resources entirely.
fn ignores_available_resources(placement: &Placement) -> bool {
    match &placement.replica_scheduling {
        None => true,
        Some(strategy) => strategy.replica_scheduling_type == ReplicaSchedulingType::Duplicated,
    }
}

/// Picks the best clusters for a workload out of a topology-grouped,
/// already-scored candidate set, honoring the placement's spread
/// constraints.
pub fn select_best_clusters(
    placement: &Placement,
    group: &GroupClustersInfo,
    spec_replicas: i32,
) -> Result<Vec<Cluster>, SchedulerError> {
    if placement.spread_constraints.is_empty() || is_spread_ignored_by_weighted_static(placement) {
        return Ok(group.clusters.iter().map(|c| c.cluster.clone()).collect());
    }

    let need_replicas = if ignores_available_resources(placement) {
        IGNORE_CAPACITY
    } else {
        spec_replicas as i64
    };

    match placement.spread_constraints.as_slice() {
        [only] if only.spread_by_field == SpreadFieldValue::Cluster => {
            select_best_clusters_by_cluster(only.min_groups, only.max_groups, &group.clusters, need_replicas)
        }
        [a, b] if is_region_cluster_pair(a, b) => {
            let region_constraint = if a.spread_by_field == SpreadFieldValue::Region { a } else { b };
            let cluster_constraint = if a.spread_by_field == SpreadFieldValue::Cluster { a } else { b };
            select_best_clusters_by_region(region_constraint.min_groups, cluster_constraint.min_groups, cluster_constraint.max_groups, group)
        }
        [only] => Err(SchedulerError::UnsupportedSpread(format!(
            "unsupported spread field {:?}",
            only.spread_by_field
        ))),
        _ => Err(SchedulerError::UnsupportedSpread(
            "only a single Cluster constraint, or a paired Region+Cluster constraint, is supported".to_string(),
        )),
    }
}

fn is_region_cluster_pair(a: &crate::models::SpreadConstraint, b: &crate::models::SpreadConstraint) -> bool {
    let fields = (a.spread_by_field, b.spread_by_field);
    matches!(
        fields,
        (SpreadFieldValue::Region, SpreadFieldValue::Cluster) | (SpreadFieldValue::Cluster, SpreadFieldValue::Region)
    )
}

fn check_available_resource(selected: &[ClusterDetailInfo], need_replicas: i64) -> bool {
    let total: i64 = selected.iter().map(|c| c.available_replicas).sum();
    total >= need_replicas
}

/// Returns the index of the first candidate whose `AvailableReplicas`
/// strictly exceeds `origin_replicas`, or `None`.
fn get_cluster_with_max_available_resource(candidates: &[ClusterDetailInfo], origin_replicas: i64) -> Option<usize> {
    candidates.iter().position(|c| c.available_replicas > origin_replicas)
}

fn get_region_with_max_clusters(candidates: &[RegionInfo], origin_cluster_count: usize) -> Option<usize> {
    candidates.iter().position(|r| r.clusters.len() > origin_cluster_count)
}

fn select_best_clusters_by_cluster(
    min_groups: usize,
    max_groups: usize,
    clusters: &[ClusterDetailInfo],
    need_replicas: i64,
) -> Result<Vec<Cluster>, SchedulerError> {
    let total = clusters.len();
    if min_groups > total {
        return Err(SchedulerError::InsufficientClusters { min_groups, available: total });
    }

    let need_count = max_groups.min(total);
    let mut selected: Vec<ClusterDetailInfo> = clusters[..need_count].to_vec();
    let mut candidates: Vec<ClusterDetailInfo> = clusters[need_count..].to_vec();

    if need_replicas != IGNORE_CAPACITY {
        let mut update_id: isize = selected.len() as isize - 1;
        while !check_available_resource(&selected, need_replicas) && update_id >= 0 && !candidates.is_empty() {
            let idx = update_id as usize;
            let origin = selected[idx].available_replicas;
            if let Some(found) = get_cluster_with_max_available_resource(&candidates, origin) {
                let removed = std::mem::replace(&mut selected[idx], candidates.remove(found));
                candidates.push(removed);
            }
            update_id -= 1;
        }

        if update_id < 0 && !check_available_resource(&selected, need_replicas) {
            let available: i64 = selected.iter().map(|c| c.available_replicas).sum();
            return Err(SchedulerError::InsufficientCapacity {
                requested: need_replicas as i32,
                available,
            });
        }
    }

    Ok(selected.into_iter().map(|c| c.cluster).collect())
}

fn select_regions(regions: &[RegionInfo], region_min_groups: usize, cluster_min_groups: usize) -> (Vec<RegionInfo>, bool) {
    let mut selected: Vec<RegionInfo> = regions[..region_min_groups].to_vec();
    let mut candidates: Vec<RegionInfo> = regions[region_min_groups..].to_vec();

    let check = |selected: &[RegionInfo]| -> bool { selected.iter().map(|r| r.clusters.len()).sum::<usize>() >= cluster_min_groups };

    let mut update_id: isize = selected.len() as isize - 1;
    while !check(&selected) && update_id >= 0 && !candidates.is_empty() {
        let idx = update_id as usize;
        let origin = selected[idx].clusters.len();
        if let Some(found) = get_region_with_max_clusters(&candidates, origin) {
            let removed = std::mem::replace(&mut selected[idx], candidates.remove(found));
            candidates.push(removed);
        }
        update_id -= 1;
    }

    let ok = update_id >= 0 || check(&selected);
    (selected, ok)
}

fn select_best_clusters_by_region(
    region_min_groups: usize,
    cluster_min_groups: usize,
    cluster_max_groups: usize,
    group: &GroupClustersInfo,
) -> Result<Vec<Cluster>, SchedulerError> {
    let regions = &group.regions;
    if regions.len() < region_min_groups {
        return Err(SchedulerError::InsufficientRegions {
            min_groups: region_min_groups,
            available: regions.len(),
        });
    }

    let (selected_regions, ok) = select_regions(regions, region_min_groups, cluster_min_groups);
    if !ok {
        let available: usize = selected_regions.iter().map(|r| r.clusters.len()).sum();
        return Err(SchedulerError::InsufficientClusters {
            min_groups: cluster_min_groups,
            available,
        });
    }

    let mut chosen: Vec<Cluster> = Vec::new();
    let mut runners_up: Vec<ClusterDetailInfo> = Vec::new();
    for region in &selected_regions {
        if let Some((first, rest)) = region.clusters.split_first() {
            chosen.push(first.cluster.clone());
            runners_up.extend(rest.iter().cloned());
        }
    }
    runners_up.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.cluster.name.cmp(&b.cluster.name)));

    let remaining = cluster_max_groups.saturating_sub(chosen.len());
    chosen.extend(runners_up.into_iter().take(remaining).map(|c| c.cluster));

    Ok(chosen)
}
