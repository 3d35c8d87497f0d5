use tokio_util::sync::CancellationToken;

use crate::models::{Cluster, Placement, ResourceBindingSpec, TaintEffect};
use crate::plugins::{FilterPlugin, Plugin, Status};

/// Filters out clusters carrying a `NoSchedule`/`NoExecute` taint the
/// placement doesn't tolerate. `PreferNoSchedule` taints never eliminate a
/// cluster — they're a scheduling hint, not a hard constraint.
pub struct ClusterTolerationsPlugin;

impl Plugin for ClusterTolerationsPlugin {
    fn name(&self) -> &str {
        "ClusterTolerations"
    }
}

impl FilterPlugin for ClusterTolerationsPlugin {
    fn filter(&self, placement: &Placement, _spec: &ResourceBindingSpec, cluster: &Cluster, _cancel: &CancellationToken) -> Status {
        let untolerated = cluster
            .taints
            .iter()
            .filter(|t| matches!(t.effect, TaintEffect::NoSchedule | TaintEffect::NoExecute))
            .find(|t| !placement.cluster_tolerations.iter().any(|toleration| toleration.tolerates(t)));

        match untolerated {
            Some(t) => Status::unschedulable(format!(
                "cluster {} has untolerated taint {}={} ({:?})",
                cluster.name, t.key, t.value, t.effect
            )),
            None => Status::success(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Taint, Toleration};

    fn cluster_with_taint(effect: TaintEffect) -> Cluster {
        Cluster {
            name: "member1".to_string(),
            ready: true,
            taints: vec![Taint {
                key: "dedicated".to_string(),
                value: "gpu".to_string(),
                effect,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn untolerated_no_schedule_taint_is_rejected() {
        let placement = Placement::default();
        let cancel = CancellationToken::new();
        let status = ClusterTolerationsPlugin.filter(
            &placement,
            &ResourceBindingSpec::default(),
            &cluster_with_taint(TaintEffect::NoSchedule),
            &cancel,
        );
        assert!(!status.is_success());
    }

    #[test]
    fn prefer_no_schedule_taint_never_rejects() {
        let placement = Placement::default();
        let cancel = CancellationToken::new();
        let status = ClusterTolerationsPlugin.filter(
            &placement,
            &ResourceBindingSpec::default(),
            &cluster_with_taint(TaintEffect::PreferNoSchedule),
            &cancel,
        );
        assert!(status.is_success());
    }

    #[test]
    fn matching_toleration_allows_taint() {
        let placement = Placement {
            cluster_tolerations: vec![Toleration {
                key: Some("dedicated".to_string()),
                value: Some("gpu".to_string()),
                effect: Some(TaintEffect::NoSchedule),
            }],
            ..Default::default()
        };
        let cancel = CancellationToken::new();
        let status = ClusterTolerationsPlugin.filter(
            &placement,
            &ResourceBindingSpec::default(),
            &cluster_with_taint(TaintEffect::NoSchedule),
            &cancel,
        );
        assert!(status.is_success());
    }
}
