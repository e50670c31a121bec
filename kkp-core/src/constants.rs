// Well-known labels
pub const APP_LABEL_KEY: &str = "app";
pub const CLUSTER_LABEL_KEY: &str = "cluster";

// Cleanup finalizers, added once the user cluster is reachable
pub const NODE_DELETION_FINALIZER: &str = "kubermatic.io/delete-nodes";
pub const IMAGE_REGISTRY_CONFIG_CLEANUP_FINALIZER: &str = "kubermatic.io/cleanup-in-cluster-image-registry-config";
pub const CREDENTIALS_REQUESTS_CLEANUP_FINALIZER: &str = "kubermatic.io/cleanup-credentials-requests";

// Defaults
pub const CLUSTER_NAMESPACE_PREFIX: &str = "cluster-";
pub const DEFAULT_SERVICES_CIDR: &str = "10.240.16.0/20";
pub const DEFAULT_PODS_CIDR: &str = "172.25.0.0/16";
pub const DEFAULT_DNS_DOMAIN: &str = "cluster.local";

// Events
pub const RECONCILING_ERROR_REASON: &str = "ReconcilingError";

// Timing
pub const RETRY_DELAY_SECONDS: u64 = 5;
pub const ERROR_RETRY_DELAY_SECONDS: u64 = 30;
pub const CLUSTER_ERROR_RETRY_DELAY_SECONDS: u64 = 300;
pub const ADMISSION_RETRY_DELAY_SECONDS: u64 = 10;
pub const DELETION_RETRY_DELAY_SECONDS: u64 = 10;
pub const REACHABILITY_RETRY_DELAY_SECONDS: u64 = 10;
pub const INFRA_RETRY_DELAY_SECONDS: u64 = 1;

// Optimistic-concurrency retries for cluster updates
pub const CLUSTER_UPDATE_RETRIES: usize = 5;
