use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::models::Cluster;

/// A point-in-time copy of the clusters known to a `ClusterCache`, taken
/// under a single read lock acquisition. A scheduling call operates
/// entirely against one snapshot so that a concurrent cache update can
/// never produce a partially-stale view mid-decision.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    clusters: Vec<Cluster>,
}

impl Snapshot {
    pub fn num_of_clusters(&self) -> usize {
        self.clusters.len()
    }

    pub fn get_ready_clusters(&self) -> Vec<Cluster> {
        self.clusters.iter().filter(|c| c.ready).cloned().collect()
    }

    pub fn get_all_clusters(&self) -> &[Cluster] {
        &self.clusters
    }
}

/// The scheduler's view of every member cluster, kept current by whatever
/// control-plane watcher feeds it `update_cluster`/`remove_cluster` calls.
/// That feed is out of scope here; this type only stores what it's given.
#[derive(Clone, Default)]
pub struct ClusterCache {
    inner: Arc<RwLock<HashMap<String, Cluster>>>,
}

impl ClusterCache {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn update_cluster(&self, cluster: Cluster) {
        self.inner.write().await.insert(cluster.name.clone(), cluster);
    }

    pub async fn remove_cluster(&self, name: &str) {
        self.inner.write().await.remove(name);
    }

    pub async fn get_cluster(&self, name: &str) -> Option<Cluster> {
        self.inner.read().await.get(name).cloned()
    }

    pub async fn snapshot(&self) -> Snapshot {
        let guard = self.inner.read().await;
        Snapshot {
            clusters: guard.values().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready_cluster(name: &str) -> Cluster {
        Cluster {
            name: name.to_string(),
            ready: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn snapshot_reflects_updates_and_removals() {
        let cache = ClusterCache::new();
        cache.update_cluster(ready_cluster("member1")).await;
        cache.update_cluster(ready_cluster("member2")).await;

        let snap = cache.snapshot().await;
        assert_eq!(snap.num_of_clusters(), 2);

        cache.remove_cluster("member1").await;
        let snap = cache.snapshot().await;
        assert_eq!(snap.num_of_clusters(), 1);
        assert_eq!(snap.get_all_clusters()[0].name, "member2");
    }

    #[tokio::test]
    async fn snapshot_filters_not_ready_clusters() {
        let cache = ClusterCache::new();
        cache.update_cluster(ready_cluster("member1")).await;
        cache
            .update_cluster(Cluster {
                name: "member2".to_string(),
                ready: false,
                ..Default::default()
            })
            .await;

        let snap = cache.snapshot().await;
        let ready = snap.get_ready_clusters();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].name, "member1");
    }
}
