use assertables::*;
use mockall::predicate::eq;

use super::*;

fn external_name() -> String {
    format!("{TEST_CLUSTER}.{TEST_SEED}.{TEST_EXTERNAL_URL}")
}

fn resolver_returning(ips: &[&str]) -> MockResolver {
    let ips: Vec<IpAddr> = ips.iter().map(|ip| ip.parse().unwrap()).collect();
    let mut resolver = MockResolver::new();
    resolver
        .expect_lookup()
        .with(eq(external_name()))
        .returning(move |_| Ok(ips.clone()));
    resolver
}

fn node_port_client() -> FakeObjectClient {
    let client = FakeObjectClient::new();
    client.insert(apiserver_external_service(TEST_NODE_PORT));
    client
}

fn new_cluster(mut cluster: Cluster, strategy: ExposeStrategy) -> Cluster {
    cluster.spec.expose_strategy = strategy;
    cluster.status.get_or_insert_default().namespace_name = TEST_CLUSTER_NAMESPACE.into();
    cluster
}

#[rstest]
#[tokio::test]
async fn test_sync_address_node_port(test_cluster: Cluster) {
    let cluster = new_cluster(test_cluster, ExposeStrategy::NodePort);
    let resolver = resolver_returning(&["2001:db8::1", "10.0.0.5", "10.0.0.2"]);

    let mutations = sync_cluster_address(&node_port_client(), &resolver, &cluster, &test_seed(), TEST_EXTERNAL_URL)
        .await
        .unwrap();

    assert_eq!(
        mutations[..5],
        [
            ClusterMutation::SetExternalName(external_name()),
            ClusterMutation::SetInternalName(format!(
                "{APISERVER_EXTERNAL_SERVICE_NAME}.{TEST_CLUSTER_NAMESPACE}.svc.cluster.local."
            )),
            ClusterMutation::SetIp("10.0.0.2".into()),
            ClusterMutation::SetPort(TEST_NODE_PORT),
            ClusterMutation::SetUrl(format!("https://{}:{TEST_NODE_PORT}", external_name())),
        ]
    );
    assert_len_eq_x!(&mutations, 6);
    let ClusterMutation::SetAdminToken(token) = &mutations[5] else {
        panic!("expected an admin token, got {:?}", mutations[5]);
    };
    assert_len_eq_x!(token, 23);
}

#[rstest]
#[tokio::test]
async fn test_sync_address_unchanged(resolved_cluster: Cluster) {
    let resolver = resolver_returning(&[TEST_NODE_IP]);

    let mutations =
        sync_cluster_address(&node_port_client(), &resolver, &resolved_cluster, &test_seed(), TEST_EXTERNAL_URL)
            .await
            .unwrap();
    assert_is_empty!(mutations);
    assert_eq!(resolved_cluster.address().admin_token, TEST_ADMIN_TOKEN);
}

#[rstest]
#[tokio::test]
async fn test_sync_address_ip_moved(resolved_cluster: Cluster) {
    let resolver = resolver_returning(&["192.0.2.99"]);

    let mutations =
        sync_cluster_address(&node_port_client(), &resolver, &resolved_cluster, &test_seed(), TEST_EXTERNAL_URL)
            .await
            .unwrap();
    assert_eq!(mutations, vec![ClusterMutation::SetIp("192.0.2.99".into())]);
}

#[rstest]
#[tokio::test]
async fn test_sync_address_ip_string_order(test_cluster: Cluster) {
    let cluster = new_cluster(test_cluster, ExposeStrategy::NodePort);
    let resolver = resolver_returning(&["10.0.0.9", "10.0.0.10"]);

    let mutations = sync_cluster_address(&node_port_client(), &resolver, &cluster, &test_seed(), TEST_EXTERNAL_URL)
        .await
        .unwrap();
    assert_eq!(mutations[2], ClusterMutation::SetIp("10.0.0.10".into()));
}

#[rstest]
#[tokio::test]
async fn test_sync_address_no_ipv4(test_cluster: Cluster) {
    let cluster = new_cluster(test_cluster, ExposeStrategy::NodePort);
    let resolver = resolver_returning(&["2001:db8::1"]);

    let err = sync_cluster_address(&node_port_client(), &resolver, &cluster, &test_seed(), TEST_EXTERNAL_URL)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), format!("no ipv4 address found for {}", external_name()));
}

#[rstest]
#[tokio::test]
async fn test_sync_address_resolver_error(test_cluster: Cluster) {
    let cluster = new_cluster(test_cluster, ExposeStrategy::NodePort);
    let mut resolver = MockResolver::new();
    resolver
        .expect_lookup()
        .returning(|host| Err(anyhow!("failed to resolve {host}: no such host")));

    let err = sync_cluster_address(&node_port_client(), &resolver, &cluster, &test_seed(), TEST_EXTERNAL_URL)
        .await
        .unwrap_err();
    assert_contains!(err.to_string(), "no such host");
}

#[rstest]
#[tokio::test]
async fn test_sync_address_load_balancer(test_cluster: Cluster) {
    let cluster = new_cluster(test_cluster, ExposeStrategy::LoadBalancer);
    let client = node_port_client();
    client.insert(front_loadbalancer_service(TEST_LB_IP));

    // The load balancer address is used as is, nothing gets resolved
    let mut resolver = MockResolver::new();
    resolver.expect_lookup().never();

    let mutations = sync_cluster_address(&client, &resolver, &cluster, &test_seed(), TEST_EXTERNAL_URL)
        .await
        .unwrap();
    assert_eq!(mutations[0], ClusterMutation::SetExternalName(TEST_LB_IP.into()));
    assert_eq!(mutations[2], ClusterMutation::SetIp(TEST_LB_IP.into()));
    assert_eq!(mutations[4], ClusterMutation::SetUrl(format!("https://{TEST_LB_IP}:{TEST_NODE_PORT}")));
}

#[rstest]
#[tokio::test]
async fn test_sync_address_load_balancer_spec_ip(test_cluster: Cluster) {
    let cluster = new_cluster(test_cluster, ExposeStrategy::LoadBalancer);
    let client = node_port_client();
    let mut lb = front_loadbalancer_service(TEST_LB_IP);
    lb.status = None;
    lb.spec.get_or_insert_default().load_balancer_ip = Some("2001:db8::5".into());
    client.insert(lb);

    let mutations = sync_cluster_address(&client, &MockResolver::new(), &cluster, &test_seed(), TEST_EXTERNAL_URL)
        .await
        .unwrap();
    assert_contains!(mutations, &ClusterMutation::SetUrl(format!("https://[2001:db8::5]:{TEST_NODE_PORT}")));
}

#[rstest]
#[tokio::test]
async fn test_sync_address_load_balancer_pending(test_cluster: Cluster) {
    let cluster = new_cluster(test_cluster, ExposeStrategy::LoadBalancer);
    let client = node_port_client();
    let mut lb = front_loadbalancer_service(TEST_LB_IP);
    lb.status = None;
    client.insert(lb);

    // Nothing to record yet besides what doesn't depend on the load balancer
    let mutations = sync_cluster_address(&client, &MockResolver::new(), &cluster, &test_seed(), TEST_EXTERNAL_URL)
        .await
        .unwrap();
    assert!(mutations.iter().all(|m| !matches!(
        m,
        ClusterMutation::SetExternalName(_) | ClusterMutation::SetIp(_) | ClusterMutation::SetUrl(_)
    )));
}

#[rstest]
#[case::missing(None)]
#[case::cluster_ip(Some("ClusterIP"))]
#[tokio::test]
async fn test_sync_address_bad_apiserver_service(test_cluster: Cluster, #[case] type_: Option<&str>) {
    let cluster = new_cluster(test_cluster, ExposeStrategy::NodePort);
    let client = FakeObjectClient::new();
    if let Some(t) = type_ {
        let mut svc = apiserver_external_service(TEST_NODE_PORT);
        svc.spec.get_or_insert_default().type_ = Some(t.into());
        client.insert(svc);
    }

    let resolver = resolver_returning(&[TEST_NODE_IP]);
    assert_err!(sync_cluster_address(&client, &resolver, &cluster, &test_seed(), TEST_EXTERNAL_URL).await);
}

#[rstest]
#[tokio::test]
async fn test_sync_address_no_node_port(test_cluster: Cluster) {
    let cluster = new_cluster(test_cluster, ExposeStrategy::NodePort);
    let client = FakeObjectClient::new();
    let mut svc = apiserver_external_service(TEST_NODE_PORT);
    if let Some(ports) = svc.spec.as_mut().and_then(|s| s.ports.as_mut()) {
        ports[0].node_port = None;
    }
    client.insert(svc);

    let resolver = resolver_returning(&[TEST_NODE_IP]);
    let err = sync_cluster_address(&client, &resolver, &cluster, &test_seed(), TEST_EXTERNAL_URL)
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        format!("service {TEST_CLUSTER_NAMESPACE}/{APISERVER_EXTERNAL_SERVICE_NAME} has no node port allocated")
    );
}
