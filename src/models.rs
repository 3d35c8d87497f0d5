use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Floor of the range every score plugin must stay within.
pub const MIN_CLUSTER_SCORE: i64 = 0;
/// Ceiling of the range every score plugin must stay within; also the
/// normalization constant used by `ClusterLocality`.
pub const MAX_CLUSTER_SCORE: i64 = 100;

/// A member compute domain with topology labels and a readiness status.
///
/// Immutable for the lifetime of a single scheduling call: all downstream
/// structures (filtered lists, scores, groups) hold clones, never references
/// back into the cache.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub name: String,
    pub provider: Option<String>,
    pub region: Option<String>,
    pub zone: Option<String>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub taints: Vec<Taint>,
    pub ready: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaintEffect {
    NoSchedule,
    PreferNoSchedule,
    NoExecute,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Taint {
    pub key: String,
    pub value: String,
    pub effect: TaintEffect,
}

/// A toleration matches a taint when every field it sets agrees with the
/// taint; an unset field (`None`) matches anything in that position. An
/// unset key matches all taints regardless of key/value, the same as a
/// Kubernetes "tolerate everything" toleration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Toleration {
    pub key: Option<String>,
    pub value: Option<String>,
    pub effect: Option<TaintEffect>,
}

impl Toleration {
    pub fn tolerates(&self, taint: &Taint) -> bool {
        if let Some(effect) = self.effect {
            if effect != taint.effect {
                return false;
            }
        }
        match &self.key {
            None => true,
            Some(key) => {
                key == &taint.key
                    && match &self.value {
                        None => true,
                        Some(value) => value == &taint.value,
                    }
            }
        }
    }
}

/// Allow/deny lists plus a required-label selector, used both as a filter
/// plugin's input and to match static replica weights to clusters.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterAffinity {
    /// Allow-list. Empty means "no restriction by name".
    #[serde(default)]
    pub cluster_names: Vec<String>,
    /// Deny-list, checked before the allow-list.
    #[serde(default)]
    pub exclude_cluster_names: Vec<String>,
    /// All entries must be present on the cluster's labels (AND semantics).
    #[serde(default)]
    pub label_selector: HashMap<String, String>,
}

impl ClusterAffinity {
    pub fn matches(&self, cluster: &Cluster) -> bool {
        if self
            .exclude_cluster_names
            .iter()
            .any(|n| n == &cluster.name)
        {
            return false;
        }
        if !self.cluster_names.is_empty() && !self.cluster_names.iter().any(|n| n == &cluster.name) {
            return false;
        }
        self.label_selector
            .iter()
            .all(|(k, v)| cluster.labels.get(k) == Some(v))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpreadFieldValue {
    Cluster,
    Zone,
    Region,
    Provider,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpreadConstraint {
    pub spread_by_field: SpreadFieldValue,
    pub min_groups: usize,
    pub max_groups: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplicaSchedulingType {
    Duplicated,
    Divided,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplicaDivisionPreference {
    Weighted,
    Aggregated,
}

/// The only dynamic-weight marker this design recognizes. Modeled with a
/// catch-all variant so an unrecognized wire value can be told apart from
/// "not set" and rejected with `UndefinedStrategy` rather than silently
/// behaving like `AvailableReplicas`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DynamicWeight {
    AvailableReplicas,
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StaticClusterWeight {
    pub target_cluster: ClusterAffinity,
    pub weight: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterPreferences {
    #[serde(default)]
    pub static_weight_list: Vec<StaticClusterWeight>,
    pub dynamic_weight: Option<DynamicWeight>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplicaSchedulingStrategy {
    pub replica_scheduling_type: ReplicaSchedulingType,
    pub replica_division_preference: Option<ReplicaDivisionPreference>,
    pub weight_preference: Option<ClusterPreferences>,
}

/// The policy under which scheduling runs.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Placement {
    pub cluster_affinity: Option<ClusterAffinity>,
    #[serde(default)]
    pub cluster_tolerations: Vec<Toleration>,
    #[serde(default)]
    pub spread_constraints: Vec<SpreadConstraint>,
    pub replica_scheduling: Option<ReplicaSchedulingStrategy>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectReference {
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourcesRequirements {
    pub cpu: u64,
    pub memory: u64,
}

/// A (Name, Replicas) pair; doubles as a scheduling result entry and as the
/// wire shape returned by a Replica Estimator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetCluster {
    pub name: String,
    pub replicas: i32,
}

/// The workload view passed into a scheduling call.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ResourceBindingSpec {
    pub resource: ObjectReference,
    pub replicas: i32,
    #[serde(default)]
    pub replica_requirements: ResourcesRequirements,
    /// Clusters this workload is currently scheduled onto, consulted by the
    /// `ClusterLocality` score plugin.
    #[serde(default)]
    pub clusters: Vec<TargetCluster>,
}

/// A (Cluster, Score) pair; `score` is the sum of every score plugin's
/// contribution for that cluster.
#[derive(Clone, Debug)]
pub struct ClusterScore {
    pub cluster: Cluster,
    pub score: i64,
}

pub type ClusterScoreList = Vec<ClusterScore>;

/// Sorts descending by score, ties broken by name ascending — the tie-break
/// every sorted list in this crate uses for determinism.
pub fn sort_cluster_score_list(list: &mut [ClusterScore]) {
    list.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.cluster.name.cmp(&b.cluster.name)));
}
