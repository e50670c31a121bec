use assertables::*;
use clockabilly::{
    Clockable,
    DateTime,
    Utc,
};
use kkp_api::v1::ClusterConditionType::*;
use tracing_test::traced_test;

use super::*;
use crate::flavor::{
    KubernetesFlavor,
    OpenshiftFlavor,
};
use crate::health::*;

fn insert_ready(client: &FakeObjectClient, component: &HealthComponent, ready: i32) {
    let metadata = metav1::ObjectMeta {
        name: Some(component.name.into()),
        namespace: Some(TEST_CLUSTER_NAMESPACE.into()),
        ..Default::default()
    };
    match component.kind {
        WorkloadKind::Deployment => client.insert(appsv1::Deployment {
            metadata,
            status: Some(appsv1::DeploymentStatus { ready_replicas: Some(ready), ..Default::default() }),
            ..Default::default()
        }),
        WorkloadKind::StatefulSet => client.insert(appsv1::StatefulSet {
            metadata,
            status: Some(appsv1::StatefulSetStatus { ready_replicas: Some(ready), ..Default::default() }),
            ..Default::default()
        }),
    }
}

fn insert_all_ready(client: &FakeObjectClient, flavor: &dyn ClusterFlavor) {
    for component in flavor.health_components() {
        insert_ready(client, &component, component.min_ready);
    }
}

fn condition_status(cluster: &Cluster, type_: ClusterConditionType) -> Option<ConditionStatus> {
    cluster.status.as_ref()?.condition(type_).map(|c| c.status)
}

#[fixture]
fn now() -> DateTime<Utc> {
    MockUtcClock::new(TEST_NOW).now()
}

#[rstest]
#[case::down_uninitialized(HealthStatus::Down, false, HealthStatus::Provisioning)]
#[case::down_initialized(HealthStatus::Down, true, HealthStatus::Down)]
#[case::up_uninitialized(HealthStatus::Up, false, HealthStatus::Up)]
#[case::up_initialized(HealthStatus::Up, true, HealthStatus::Up)]
fn test_provisioning_override(#[case] raw: HealthStatus, #[case] initialized: bool, #[case] expected: HealthStatus) {
    assert_eq!(apply_provisioning_override(raw, initialized), expected);
}

#[rstest]
fn test_is_cluster_initialized(resolved_cluster: Cluster, now: DateTime<Utc>) {
    let flavor = KubernetesFlavor;
    let mut cluster = resolved_cluster;
    assert!(!is_cluster_initialized(&cluster, &flavor));

    // Healthy but never reconciled successfully
    let status = cluster.status.get_or_insert_default();
    status.extended_health = all_up();
    assert!(!is_cluster_initialized(&cluster, &flavor));

    let status = cluster.status.get_or_insert_default();
    status.set_condition(ClusterCondition::new(ClusterControllerReconcilingSuccess, true, "", "", now));
    assert!(is_cluster_initialized(&cluster, &flavor));

    // The OpenShift flavor looks at its own reconciling condition
    assert!(!is_cluster_initialized(&cluster, &OpenshiftFlavor));
}

#[rstest]
#[tokio::test]
async fn test_cluster_health_uninitialized(resolved_cluster: Cluster) {
    let client = FakeObjectClient::new();
    insert_ready(&client, &APISERVER_HEALTH, 1);
    insert_ready(&client, &ETCD_HEALTH, 1);

    let health = cluster_health(&client, &resolved_cluster, &KubernetesFlavor).await.unwrap();
    assert_eq!(health.apiserver, HealthStatus::Up);
    assert_eq!(health.etcd, HealthStatus::Provisioning);
    assert_eq!(health.scheduler, HealthStatus::Provisioning);
    assert_eq!(health.machine_controller, HealthStatus::Provisioning);

    // Nothing reports on the infrastructure, so the stored value stays
    assert_eq!(health.cloud_provider_infrastructure, HealthStatus::Down);
}

#[rstest]
#[tokio::test]
async fn test_cluster_health_initialized(resolved_cluster: Cluster, now: DateTime<Utc>) {
    let mut cluster = with_infra_up(resolved_cluster);
    cluster
        .status
        .get_or_insert_default()
        .set_condition(ClusterCondition::new(ClusterInitialized, true, "", "", now));

    let client = FakeObjectClient::new();
    insert_all_ready(&client, &KubernetesFlavor);
    insert_ready(&client, &SCHEDULER_HEALTH, 0);

    let health = cluster_health(&client, &cluster, &KubernetesFlavor).await.unwrap();
    assert_eq!(health.scheduler, HealthStatus::Down);
    assert_eq!(health.apiserver, HealthStatus::Up);
    assert_eq!(health.cloud_provider_infrastructure, HealthStatus::Up);
    assert!(!health.all_healthy());
}

#[rstest]
#[tokio::test]
async fn test_cluster_health_openshift_scheduler(test_openshift_cluster: Cluster) {
    let client = FakeObjectClient::new();
    insert_ready(&client, &CONTROLLER_MANAGER_HEALTH, 1);

    let mut cluster = test_openshift_cluster;
    cluster.status.get_or_insert_default().namespace_name = TEST_CLUSTER_NAMESPACE.into();

    // There's no scheduler deployment; it follows the controller manager
    let health = cluster_health(&client, &cluster, &OpenshiftFlavor).await.unwrap();
    assert_eq!(health.controller, HealthStatus::Up);
    assert_eq!(health.scheduler, HealthStatus::Up);
}

#[rstest]
#[traced_test]
#[tokio::test]
async fn test_sync_health_latches_initialized(resolved_cluster: Cluster, now: DateTime<Utc>) {
    let client = FakeObjectClient::new().with_cluster(with_infra_up(resolved_cluster));
    insert_all_ready(&client, &KubernetesFlavor);

    let mut cluster = client.cluster(TEST_CLUSTER);
    sync_health(&client, &mut cluster, &KubernetesFlavor, now).await.unwrap();

    let stored = client.cluster(TEST_CLUSTER);
    assert!(stored.extended_health().all_healthy());
    assert_eq!(condition_status(&stored, ClusterInitialized), Some(ConditionStatus::True));
    assert_eq!(condition_status(&stored, EtcdClusterInitialized), Some(ConditionStatus::True));
    assert!(logs_contain("cluster initialized"));

    // A component going away afterwards is reported as down, and the condition stays
    insert_ready(&client, &APISERVER_HEALTH, 0);
    let mut cluster = client.cluster(TEST_CLUSTER);
    sync_health(&client, &mut cluster, &KubernetesFlavor, now).await.unwrap();

    let stored = client.cluster(TEST_CLUSTER);
    assert_eq!(stored.extended_health().apiserver, HealthStatus::Down);
    assert_eq!(condition_status(&stored, ClusterInitialized), Some(ConditionStatus::True));
}

#[rstest]
#[tokio::test]
async fn test_sync_health_etcd_quorum(resolved_cluster: Cluster, now: DateTime<Utc>) {
    let client = FakeObjectClient::new().with_cluster(resolved_cluster);
    insert_ready(&client, &ETCD_HEALTH, 1);

    let mut cluster = client.cluster(TEST_CLUSTER);
    sync_health(&client, &mut cluster, &KubernetesFlavor, now).await.unwrap();
    assert_eq!(cluster.extended_health().etcd, HealthStatus::Provisioning);
    assert_none!(condition_status(&cluster, EtcdClusterInitialized));

    insert_ready(&client, &ETCD_HEALTH, 2);
    sync_health(&client, &mut cluster, &KubernetesFlavor, now).await.unwrap();
    assert_eq!(cluster.extended_health().etcd, HealthStatus::Up);
    assert_eq!(condition_status(&cluster, EtcdClusterInitialized), Some(ConditionStatus::True));
    assert_none!(condition_status(&cluster, ClusterInitialized));
}

#[rstest]
#[tokio::test]
async fn test_sync_health_unchanged(resolved_cluster: Cluster, now: DateTime<Utc>) {
    let client = FakeObjectClient::new().with_cluster(resolved_cluster);

    let mut cluster = client.cluster(TEST_CLUSTER);
    sync_health(&client, &mut cluster, &KubernetesFlavor, now).await.unwrap();
    client.clear_writes();

    sync_health(&client, &mut cluster, &KubernetesFlavor, now).await.unwrap();
    assert_is_empty!(client.writes());
}
