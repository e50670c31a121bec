use clockabilly::{
    DateTime,
    Utc,
};
use k8s_openapi::api::apps::v1 as appsv1;
use kkp_api::v1::{
    ClusterCondition,
    ClusterConditionType,
    ConditionStatus,
    ExtendedClusterHealth,
    HealthStatus,
};
use kkp_core::cluster::{
    ClusterMutation,
    update_cluster,
};
use kkp_core::prelude::*;
use tracing::*;

use crate::flavor::ClusterFlavor;
use crate::resources::names::*;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WorkloadKind {
    Deployment,
    StatefulSet,
}

// One control plane component whose readiness feeds a field of the cluster's extended health
#[derive(Clone, Copy, Debug)]
pub struct HealthComponent {
    pub name: &'static str,
    pub kind: WorkloadKind,
    pub min_ready: i32,
    pub lookup: fn(&ExtendedClusterHealth) -> HealthStatus,
    pub assign: fn(&mut ExtendedClusterHealth, HealthStatus),
}

impl HealthComponent {
    const fn deployment(
        name: &'static str,
        lookup: fn(&ExtendedClusterHealth) -> HealthStatus,
        assign: fn(&mut ExtendedClusterHealth, HealthStatus),
    ) -> HealthComponent {
        HealthComponent { name, kind: WorkloadKind::Deployment, min_ready: 1, lookup, assign }
    }
}

pub const APISERVER_HEALTH: HealthComponent =
    HealthComponent::deployment(APISERVER_DEPLOYMENT_NAME, |h| h.apiserver, |h, s| h.apiserver = s);
pub const CONTROLLER_MANAGER_HEALTH: HealthComponent =
    HealthComponent::deployment(CONTROLLER_MANAGER_DEPLOYMENT_NAME, |h| h.controller, |h, s| h.controller = s);
pub const SCHEDULER_HEALTH: HealthComponent =
    HealthComponent::deployment(SCHEDULER_DEPLOYMENT_NAME, |h| h.scheduler, |h, s| h.scheduler = s);
pub const MACHINE_CONTROLLER_HEALTH: HealthComponent = HealthComponent::deployment(
    MACHINE_CONTROLLER_DEPLOYMENT_NAME,
    |h| h.machine_controller,
    |h, s| h.machine_controller = s,
);
pub const OPENVPN_HEALTH: HealthComponent =
    HealthComponent::deployment(OPENVPN_SERVER_DEPLOYMENT_NAME, |h| h.openvpn, |h, s| h.openvpn = s);
pub const USER_CLUSTER_CONTROLLER_HEALTH: HealthComponent = HealthComponent::deployment(
    USER_CLUSTER_CONTROLLER_DEPLOYMENT_NAME,
    |h| h.user_cluster_controller_manager,
    |h, s| h.user_cluster_controller_manager = s,
);

// etcd counts as up once it has quorum
pub const ETCD_HEALTH: HealthComponent = HealthComponent {
    name: ETCD_STATEFULSET_NAME,
    kind: WorkloadKind::StatefulSet,
    min_ready: 2,
    lookup: |h| h.etcd,
    assign: |h, s| h.etcd = s,
};

async fn ready_replicas<C: ObjectClient>(client: &C, ns: &str, component: &HealthComponent) -> anyhow::Result<i32> {
    let ready = match component.kind {
        WorkloadKind::Deployment => client
            .get::<appsv1::Deployment>(ns, component.name)
            .await?
            .and_then(|d| d.status)
            .and_then(|s| s.ready_replicas),
        WorkloadKind::StatefulSet => client
            .get::<appsv1::StatefulSet>(ns, component.name)
            .await?
            .and_then(|s| s.status)
            .and_then(|s| s.ready_replicas),
    };
    Ok(ready.unwrap_or(0))
}

// Once a cluster has been initialized it stays initialized; before that, anything that isn't up
// yet is reported as provisioning rather than down
pub fn is_cluster_initialized(cluster: &Cluster, flavor: &dyn ClusterFlavor) -> bool {
    cluster.has_condition_value(ClusterConditionType::ClusterInitialized, ConditionStatus::True)
        || (cluster.has_condition_value(flavor.reconciling_condition(), ConditionStatus::True)
            && cluster.extended_health().all_healthy())
}

pub fn apply_provisioning_override(raw: HealthStatus, initialized: bool) -> HealthStatus {
    if raw == HealthStatus::Down && !initialized { HealthStatus::Provisioning } else { raw }
}

// Fields that no component owns (like the cloud provider infrastructure) keep their stored value
pub async fn cluster_health<C: ObjectClient>(
    client: &C,
    cluster: &Cluster,
    flavor: &dyn ClusterFlavor,
) -> anyhow::Result<ExtendedClusterHealth> {
    let ns = cluster.namespace_name();
    let initialized = is_cluster_initialized(cluster, flavor);

    let mut health = cluster.extended_health();
    for component in flavor.health_components() {
        let raw = if ready_replicas(client, ns, &component).await? >= component.min_ready {
            HealthStatus::Up
        } else {
            HealthStatus::Down
        };
        (component.assign)(&mut health, apply_provisioning_override(raw, initialized));
    }
    flavor.finalize_health(&mut health);

    Ok(health)
}

// Persist the extended health if it changed, and latch the initialized conditions the first
// time they become true
pub async fn sync_health<C: ObjectClient>(
    client: &C,
    cluster: &mut Cluster,
    flavor: &dyn ClusterFlavor,
    now: DateTime<Utc>,
) -> EmptyResult {
    let health = cluster_health(client, cluster, flavor).await?;
    let mut mutations = vec![];

    if health != cluster.extended_health() {
        debug!("extended health changed: {health:?}");
        mutations.push(ClusterMutation::SetExtendedHealth(health.clone()));
    }

    if health.all_healthy() && !cluster.has_condition_value(ClusterConditionType::ClusterInitialized, ConditionStatus::True) {
        info!("cluster initialized");
        mutations.push(ClusterMutation::SetCondition(ClusterCondition::new(
            ClusterConditionType::ClusterInitialized,
            true,
            "",
            "Cluster has been initialized successfully",
            now,
        )));
    }

    if health.etcd == HealthStatus::Up
        && !cluster.has_condition_value(ClusterConditionType::EtcdClusterInitialized, ConditionStatus::True)
    {
        mutations.push(ClusterMutation::SetCondition(ClusterCondition::new(
            ClusterConditionType::EtcdClusterInitialized,
            true,
            "",
            "Etcd Cluster has been initialized successfully",
            now,
        )));
    }

    update_cluster(client, cluster, &mutations).await
}
