use thiserror::Error;

/// Every way a scheduling call can fail. Distinct from a plugin's
/// `Unschedulable` verdict, which is not an error — it's the normal
/// filter-out mechanism and never reaches this type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("no clusters are registered in the cache")]
    NoClustersAvailable,

    #[error("no cluster satisfied every filter plugin")]
    NoFeasibleClusters,

    #[error("plugin {plugin} returned an error: {reason}")]
    PluginError { plugin: String, reason: String },

    #[error("only a single spread constraint is supported, or a paired region+cluster constraint: {0}")]
    UnsupportedSpread(String),

    #[error("need at least {min_groups} groups but only {available} are available")]
    InsufficientClusters { min_groups: usize, available: usize },

    #[error("need at least {min_groups} regions but only {available} are available")]
    InsufficientRegions { min_groups: usize, available: usize },

    #[error("requested {requested} replicas but only {available} are available across selected clusters")]
    InsufficientCapacity { requested: i32, available: i64 },

    #[error("replica scheduling strategy is undefined or unrecognized: {0}")]
    UndefinedStrategy(String),

    #[error("unknown plugin name in registry: {0}")]
    UnknownPlugin(String),

    #[error("scheduling was cancelled")]
    Cancelled,
}
