use tokio_util::sync::CancellationToken;

use crate::models::{Cluster, Placement, ResourceBindingSpec};
use crate::plugins::{FilterPlugin, Plugin, Status};

/// Filters out clusters that don't match the placement's `cluster_affinity`,
/// if one is set. No affinity means every cluster passes.
pub struct ClusterAffinityPlugin;

impl Plugin for ClusterAffinityPlugin {
    fn name(&self) -> &str {
        "ClusterAffinity"
    }
}

impl FilterPlugin for ClusterAffinityPlugin {
    fn filter(&self, placement: &Placement, _spec: &ResourceBindingSpec, cluster: &Cluster, _cancel: &CancellationToken) -> Status {
        let Some(affinity) = &placement.cluster_affinity else {
            return Status::success();
        };

        if affinity.matches(cluster) {
            Status::success()
        } else {
            Status::unschedulable(format!("cluster {} didn't match cluster affinity", cluster.name))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClusterAffinity;

    fn cluster(name: &str) -> Cluster {
        Cluster {
            name: name.to_string(),
            ready: true,
            ..Default::default()
        }
    }

    #[test]
    fn no_affinity_passes_every_cluster() {
        let placement = Placement::default();
        let cancel = CancellationToken::new();
        let status = ClusterAffinityPlugin.filter(&placement, &ResourceBindingSpec::default(), &cluster("member1"), &cancel);
        assert!(status.is_success());
    }

    #[test]
    fn affinity_allow_list_rejects_unlisted_cluster() {
        let placement = Placement {
            cluster_affinity: Some(ClusterAffinity {
                cluster_names: vec!["member1".to_string()],
                ..Default::default()
            }),
            ..Default::default()
        };
        let cancel = CancellationToken::new();
        assert!(ClusterAffinityPlugin.filter(&placement, &ResourceBindingSpec::default(), &cluster("member1"), &cancel).is_success());
        assert!(!ClusterAffinityPlugin.filter(&placement, &ResourceBindingSpec::default(), &cluster("member2"), &cancel).is_success());
    }
}
