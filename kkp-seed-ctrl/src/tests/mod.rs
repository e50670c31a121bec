mod config_test;
mod health_test;

use std::net::IpAddr;
use std::sync::Arc;

use clockabilly::mock::MockUtcClock;
use k8s_openapi::api::apps::v1 as appsv1;
use kkp_api::v1::*;
use kkp_core::prelude::*;
use kkp_testutils::*;
use rstest::*;

use crate::address::MockResolver;
use crate::config::ControllerConfig;
use crate::context::SeedContext;
use crate::flavor::ClusterFlavor;
use crate::resources::names::*;
use crate::userclient::MockUserClusterConnectionProvider;

pub(crate) const TEST_ADMIN_TOKEN: &str = "abcdef.0123456789abcdef";
pub(crate) const TEST_NODE_IP: &str = "192.0.2.10";
pub(crate) const TEST_LB_IP: &str = "1.2.3.4";
pub(crate) const TEST_NOW: i64 = 1_700_000_000;

#[fixture]
pub(crate) fn test_config() -> ControllerConfig {
    ControllerConfig {
        seed_name: TEST_SEED.into(),
        namespace: TEST_SEED_NAMESPACE.into(),
        external_url: TEST_EXTERNAL_URL.into(),
        node_port_range: "30000-32767".into(),
        node_access_network: "10.254.0.0/16".into(),
        etcd_disk_size: "5Gi".into(),
        kubermatic_image: "quay.io/kubermatic/api".into(),
        dnat_controller_image: "quay.io/kubermatic/kubeletdnat-controller".into(),
        concurrent_cluster_updates: 5,
        ..Default::default()
    }
}

// A cluster that has made it past the address step
#[fixture]
pub(crate) fn resolved_cluster(test_cluster: Cluster) -> Cluster {
    let mut cluster = test_cluster;
    let external_name = format!("{TEST_CLUSTER}.{TEST_SEED}.{TEST_EXTERNAL_URL}");
    cluster.status = Some(ClusterStatus {
        namespace_name: TEST_CLUSTER_NAMESPACE.into(),
        address: ClusterAddress {
            url: format!("https://{external_name}:{TEST_NODE_PORT}"),
            external_name,
            internal_name: format!("{APISERVER_EXTERNAL_SERVICE_NAME}.{TEST_CLUSTER_NAMESPACE}.svc.cluster.local."),
            ip: TEST_NODE_IP.into(),
            port: TEST_NODE_PORT,
            admin_token: TEST_ADMIN_TOKEN.into(),
        },
        ..Default::default()
    });
    cluster
}

pub(crate) fn all_up() -> ExtendedClusterHealth {
    ExtendedClusterHealth {
        apiserver: HealthStatus::Up,
        scheduler: HealthStatus::Up,
        controller: HealthStatus::Up,
        machine_controller: HealthStatus::Up,
        etcd: HealthStatus::Up,
        openvpn: HealthStatus::Up,
        cloud_provider_infrastructure: HealthStatus::Up,
        user_cluster_controller_manager: HealthStatus::Up,
    }
}

pub(crate) fn with_infra_up(mut cluster: Cluster) -> Cluster {
    cluster.status.get_or_insert_default().extended_health.cloud_provider_infrastructure = HealthStatus::Up;
    cluster
}

// The apiserver allocates node ports; the fake doesn't, so the external service is pre-created
pub(crate) fn apiserver_external_service(node_port: i32) -> corev1::Service {
    corev1::Service {
        metadata: metav1::ObjectMeta {
            name: Some(APISERVER_EXTERNAL_SERVICE_NAME.into()),
            namespace: Some(TEST_CLUSTER_NAMESPACE.into()),
            ..Default::default()
        },
        spec: Some(corev1::ServiceSpec {
            type_: Some("NodePort".into()),
            ports: Some(vec![corev1::ServicePort {
                name: Some("secure".into()),
                port: 443,
                node_port: Some(node_port),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub(crate) fn front_loadbalancer_service(ip: &str) -> corev1::Service {
    corev1::Service {
        metadata: metav1::ObjectMeta {
            name: Some(FRONT_LOADBALANCER_SERVICE_NAME.into()),
            namespace: Some(TEST_CLUSTER_NAMESPACE.into()),
            ..Default::default()
        },
        spec: Some(corev1::ServiceSpec { type_: Some("LoadBalancer".into()), ..Default::default() }),
        status: Some(corev1::ServiceStatus {
            load_balancer: Some(corev1::LoadBalancerStatus {
                ingress: Some(vec![corev1::LoadBalancerIngress { ip: Some(ip.into()), ..Default::default() }]),
            }),
            ..Default::default()
        }),
    }
}

// Pretend the workload's pods came up
pub(crate) fn set_ready_replicas(client: &FakeObjectClient, name: &str, ready: i32) {
    if let Some(mut deployment) = client.object::<appsv1::Deployment>(TEST_CLUSTER_NAMESPACE, name) {
        deployment.status = Some(appsv1::DeploymentStatus { ready_replicas: Some(ready), ..Default::default() });
        client.insert(deployment);
    } else if let Some(mut sts) = client.object::<appsv1::StatefulSet>(TEST_CLUSTER_NAMESPACE, name) {
        sts.status = Some(appsv1::StatefulSetStatus { ready_replicas: Some(ready), ..Default::default() });
        client.insert(sts);
    }
}

pub(crate) fn fake_context(
    client: FakeObjectClient,
    config: ControllerConfig,
    flavor: Arc<dyn ClusterFlavor>,
    reachable: bool,
) -> SeedContext<FakeObjectClient> {
    let mut resolver = MockResolver::new();
    resolver
        .expect_lookup()
        .returning(|_| Ok(vec![TEST_NODE_IP.parse::<IpAddr>().unwrap()]));

    let mut user_clusters = MockUserClusterConnectionProvider::new();
    user_clusters.expect_ping().returning(move |_| {
        if reachable {
            Ok(())
        } else {
            Err(anyhow::anyhow!("connection refused"))
        }
    });

    SeedContext::new(client, Arc::new(config), flavor)
        .with_resolver(resolver)
        .with_user_clusters(user_clusters)
        .with_clock(MockUtcClock::new(TEST_NOW))
}
