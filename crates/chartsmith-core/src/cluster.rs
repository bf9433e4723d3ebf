//! Cluster-wide constants injected into every generated workload

/// Env var appended to every container so workloads can resolve in-cluster
/// DNS names under a non-default cluster domain.
pub const DOMAIN_ENV: &str = "KUBERNETES_CLUSTER_DOMAIN";

/// Root values key holding the cluster domain.
pub const DOMAIN_KEY: &str = "kubernetesClusterDomain";

/// Default cluster domain registered in values.yaml.
pub const DEFAULT_DOMAIN: &str = "cluster.local";
