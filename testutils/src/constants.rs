pub const TEST_CLUSTER: &str = "test-cluster";
pub const TEST_CLUSTER_NAMESPACE: &str = "cluster-test-cluster";
pub const TEST_CLUSTER_UID: &str = "8d5b3f4e-1c9a-4b0e-9a77-2f3c1e6d0b11";
pub const TEST_SEED: &str = "europe-west3-c";
pub const TEST_SEED_NAMESPACE: &str = "kubermatic";
pub const TEST_DC: &str = "my-dc";
pub const TEST_EXTERNAL_URL: &str = "dev.kubermatic.io";
pub const TEST_VERSION: &str = "1.14.3";
pub const TEST_WORKER: &str = "alice";
pub const TEST_NODE_PORT: i32 = 30443;
