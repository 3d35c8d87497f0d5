//! Filter and score plugins.
//!
//! Plugins are pure: a filter plugin returns a verdict for one cluster given
//! the placement and the workload, a score plugin returns a bounded score.
//! Neither kind carries state between clusters or between calls, so unlike a
//! full Kubernetes-style extension point list there's no scratch-state
//! channel threading pre-filter output into filter, or pre-score into score.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::SchedulerError;
use crate::models::{Cluster, Placement, ResourceBindingSpec, MAX_CLUSTER_SCORE};

pub mod cluster_affinity;
pub mod cluster_locality;
pub mod cluster_tolerations;

pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;
}

/// Evaluates whether a cluster may host a workload at all. `cancel` is
/// threaded through for uniformity with the rest of the pipeline; a filter
/// plugin does no I/O of its own, so it has nothing to check it against.
pub trait FilterPlugin: Plugin {
    fn filter(&self, placement: &Placement, spec: &ResourceBindingSpec, cluster: &Cluster, cancel: &CancellationToken) -> Status;
}

/// Ranks a cluster that already passed every filter. Must return `Success`;
/// `Unschedulable`/`Error` from a score plugin is treated as a plugin bug.
pub trait ScorePlugin: Plugin {
    fn score(&self, placement: &Placement, spec: &ResourceBindingSpec, cluster: &Cluster, cancel: &CancellationToken) -> (i64, Status);
}

/// The three verdicts a plugin can hand back. `Unschedulable` is the normal
/// filter-out mechanism and never becomes a `SchedulerError`; `Error` always
/// does (surfaced as `SchedulerError::PluginError`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Code {
    Success,
    Unschedulable,
    Error,
}

#[derive(Clone, Debug)]
pub struct Status {
    pub code: Code,
    pub reasons: Vec<String>,
}

impl Status {
    pub fn success() -> Self {
        Self {
            code: Code::Success,
            reasons: vec![],
        }
    }

    pub fn unschedulable(reason: impl Into<String>) -> Self {
        Self {
            code: Code::Unschedulable,
            reasons: vec![reason.into()],
        }
    }

    pub fn error(reason: impl Into<String>) -> Self {
        Self {
            code: Code::Error,
            reasons: vec![reason.into()],
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == Code::Success
    }
}

/// A constructed set of enabled plugins. Built once by name via
/// `Registry::new`, which is the only place an unknown plugin name can
/// surface — after construction, every call site trusts the registry.
#[derive(Clone)]
pub struct Registry {
    filters: Vec<Arc<dyn FilterPlugin>>,
    scores: Vec<Arc<dyn ScorePlugin>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("filters", &self.filters.len())
            .field("scores", &self.scores.len())
            .finish()
    }
}

impl Registry {
    /// Builds a registry from plugin names, resolving each against the
    /// crate's known plugins. Fails at construction time rather than at
    /// first use if a name isn't recognized.
    pub fn new(filter_names: &[String], score_names: &[String]) -> Result<Self, SchedulerError> {
        let mut filters: Vec<Arc<dyn FilterPlugin>> = Vec::with_capacity(filter_names.len());
        for name in filter_names {
            filters.push(resolve_filter_plugin(name)?);
        }

        let mut scores: Vec<Arc<dyn ScorePlugin>> = Vec::with_capacity(score_names.len());
        for name in score_names {
            scores.push(resolve_score_plugin(name)?);
        }

        Ok(Self { filters, scores })
    }

    /// The built-in plugin set: both filters, and the one score plugin.
    pub fn with_defaults() -> Self {
        Self {
            filters: vec![
                Arc::new(cluster_affinity::ClusterAffinityPlugin),
                Arc::new(cluster_tolerations::ClusterTolerationsPlugin),
            ],
            scores: vec![Arc::new(cluster_locality::ClusterLocality)],
        }
    }

    /// Runs every registered filter plugin against one cluster. Returns the
    /// first non-`Success` status, or a `Success` status if every plugin
    /// passed. An `Error` code from a plugin is reported as a
    /// `SchedulerError` by the caller, not absorbed here. Checked against
    /// `cancel` before each plugin call, per the abort-at-any-step contract.
    pub fn run_filter_plugins(
        &self,
        placement: &Placement,
        spec: &ResourceBindingSpec,
        cluster: &Cluster,
        cancel: &CancellationToken,
    ) -> Result<Status, SchedulerError> {
        for plugin in &self.filters {
            if cancel.is_cancelled() {
                return Err(SchedulerError::Cancelled);
            }
            let status = plugin.filter(placement, spec, cluster, cancel);
            match status.code {
                Code::Success => continue,
                Code::Unschedulable => return Ok(status),
                Code::Error => {
                    return Err(SchedulerError::PluginError {
                        plugin: plugin.name().to_string(),
                        reason: status.reasons.join("; "),
                    });
                }
            }
        }
        Ok(Status::success())
    }

    /// Runs every registered score plugin against one cluster and sums their
    /// contributions. Each plugin's own score is clamped to the documented
    /// [0, `MAX_CLUSTER_SCORE`] range before summing.
    pub fn run_score_plugins(
        &self,
        placement: &Placement,
        spec: &ResourceBindingSpec,
        cluster: &Cluster,
        cancel: &CancellationToken,
    ) -> Result<i64, SchedulerError> {
        let mut total = 0i64;
        for plugin in &self.scores {
            if cancel.is_cancelled() {
                return Err(SchedulerError::Cancelled);
            }
            let (score, status) = plugin.score(placement, spec, cluster, cancel);
            if status.code == Code::Error {
                return Err(SchedulerError::PluginError {
                    plugin: plugin.name().to_string(),
                    reason: status.reasons.join("; "),
                });
            }
            total += score.clamp(0, MAX_CLUSTER_SCORE);
        }
        Ok(total)
    }
}

fn resolve_filter_plugin(name: &str) -> Result<Arc<dyn FilterPlugin>, SchedulerError> {
    match name {
        "ClusterAffinity" => Ok(Arc::new(cluster_affinity::ClusterAffinityPlugin)),
        "ClusterTolerations" => Ok(Arc::new(cluster_tolerations::ClusterTolerationsPlugin)),
        other => Err(SchedulerError::UnknownPlugin(other.to_string())),
    }
}

fn resolve_score_plugin(name: &str) -> Result<Arc<dyn ScorePlugin>, SchedulerError> {
    match name {
        "ClusterLocality" => Ok(Arc::new(cluster_locality::ClusterLocality)),
        other => Err(SchedulerError::UnknownPlugin(other.to_string())),
    }
}
