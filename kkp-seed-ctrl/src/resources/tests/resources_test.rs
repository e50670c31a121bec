use std::net::Ipv4Addr;

use assertables::*;
use k8s_openapi::api::apps::v1 as appsv1;
use kkp_api::autoscaling::VerticalPodAutoscalerUpdateMode;

use super::*;
use crate::flavor::{
    ClusterFlavor,
    KubernetesFlavor,
};
use crate::resources::names::*;
use crate::resources::secrets::common_secrets;
use crate::resources::tokens::*;
use crate::resources::vpa::{
    VpaTarget,
    VpaTargetKind,
};

fn secret_names(data: &TemplateData) -> Vec<String> {
    common_secrets(data).iter().map(|c| c.name().to_string()).collect()
}

fn etcd_env(data: &TemplateData) -> Vec<String> {
    let sts = workloads::etcd(data).create(Default::default()).unwrap();
    sts.spec.unwrap().template.spec.unwrap().containers[0]
        .env
        .clone()
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect()
}

#[rstest]
#[case::aligned("10.240.16.0/20", "10.240.16.0", "255.255.240.0")]
#[case::host_bits("10.240.17.5/20", "10.240.16.0", "255.255.240.0")]
#[case::everything("0.0.0.0/0", "0.0.0.0", "0.0.0.0")]
#[case::single("192.168.1.1/32", "192.168.1.1", "255.255.255.255")]
fn test_parse_ipv4_cidr(#[case] cidr: &str, #[case] network: &str, #[case] mask: &str) {
    let (n, m) = parse_ipv4_cidr(cidr).unwrap();
    assert_eq!(n, network.parse::<Ipv4Addr>().unwrap());
    assert_eq!(m, mask.parse::<Ipv4Addr>().unwrap());
}

#[rstest]
#[case::no_prefix("10.0.0.0")]
#[case::short_address("10.0.0/8")]
#[case::long_prefix("10.0.0.0/33")]
#[case::not_an_address("foo/8")]
fn test_parse_ipv4_cidr_invalid(#[case] cidr: &str) {
    assert_err!(parse_ipv4_cidr(cidr));
}

#[rstest]
fn test_template_data_defaults(resolved_cluster: Cluster, test_config: ControllerConfig) {
    let seed = test_seed();
    let data = TemplateData::new(&resolved_cluster, &seed, &test_config).unwrap();

    assert_eq!(data.namespace(), TEST_CLUSTER_NAMESPACE);
    assert_eq!(data.minor_version(), 14);
    assert_eq!(data.services_cidr(), DEFAULT_SERVICES_CIDR);
    assert_eq!(data.pods_cidr(), DEFAULT_PODS_CIDR);
    assert_eq!(data.dns_domain(), DEFAULT_DNS_DOMAIN);
    assert_eq!(data.dns_resolver_ip().unwrap(), Ipv4Addr::new(10, 240, 16, 10));
    assert_eq!(data.internal_url(), format!("https://apiserver-external.{TEST_CLUSTER_NAMESPACE}.svc.cluster.local.:443"));
}

#[rstest]
fn test_template_data_cluster_network(resolved_cluster: Cluster, test_config: ControllerConfig) {
    let mut cluster = resolved_cluster;
    cluster.spec.cluster_network.services.cidr_blocks = vec!["10.10.0.0/16".into()];
    cluster.spec.cluster_network.dns_domain = "example.internal".into();
    let seed = test_seed();
    let data = TemplateData::new(&cluster, &seed, &test_config).unwrap();

    assert_eq!(data.dns_resolver_ip().unwrap(), Ipv4Addr::new(10, 10, 0, 10));
    assert_eq!(data.dns_domain(), "example.internal");
}

#[rstest]
fn test_template_data_version(resolved_cluster: Cluster, test_config: ControllerConfig) {
    let mut cluster = resolved_cluster;
    cluster.spec.version = "v1.15.2".into();
    let seed = test_seed();
    let data = TemplateData::new(&cluster, &seed, &test_config).unwrap();
    assert_eq!(data.version(), "1.15.2");
    assert_eq!(data.minor_version(), 15);

    cluster.spec.version = "latest".into();
    let err = TemplateData::new(&cluster, &seed, &test_config).unwrap_err();
    assert!(err.is::<ClusterControllerError>());
}

#[rstest]
fn test_template_data_unknown_datacenter(resolved_cluster: Cluster, test_config: ControllerConfig) {
    let mut cluster = resolved_cluster;
    cluster.spec.cloud.datacenter_name = "atlantis".into();
    let seed = test_seed();
    let err = TemplateData::new(&cluster, &seed, &test_config).unwrap_err();
    assert_eq!(err.to_string(), "couldn't find datacenter atlantis");
}

#[rstest]
#[case::default_registry("", "quay.io/kubermatic/openvpn:v2.5.2-r0")]
#[case::overwritten("registry.corp.local", "registry.corp.local/kubermatic/openvpn:v2.5.2-r0")]
fn test_image_registry(
    resolved_cluster: Cluster,
    mut test_config: ControllerConfig,
    #[case] overwrite: &str,
    #[case] expected: &str,
) {
    test_config.overwrite_registry = overwrite.into();
    let seed = test_seed();
    let data = TemplateData::new(&resolved_cluster, &seed, &test_config).unwrap();
    assert_eq!(data.image(DEFAULT_QUAY_REGISTRY, "kubermatic/openvpn:v2.5.2-r0"), expected);
}

#[rstest]
fn test_generate_token() {
    let token = generate_token();
    let (id, secret) = token.split_once('.').unwrap();
    assert_len_eq_x!(id, 6);
    assert_len_eq_x!(secret, 16);
    assert!(
        token
            .chars()
            .filter(|c| *c != '.')
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    );
    assert_ne!(generate_token(), token);
}

#[rstest]
fn test_tokens_csv() {
    assert_eq!(tokens_csv("abcdef.0123456789abcdef"), "abcdef.0123456789abcdef,admin,admin,system:masters\n");
}

#[rstest]
fn test_build_kubeconfig_insecure() {
    let kc = kubeconfig::build_kubeconfig(TEST_CLUSTER, "https://1.2.3.4:30443", "admin", "tok", None).unwrap();
    let kc: serde_yaml::Value = serde_yaml::from_str(&kc).unwrap();

    assert_eq!(kc["current-context"], serde_yaml::Value::from("default"));
    assert_eq!(kc["clusters"][0]["name"], serde_yaml::Value::from(TEST_CLUSTER));
    assert_eq!(kc["clusters"][0]["cluster"]["server"], serde_yaml::Value::from("https://1.2.3.4:30443"));
    assert_eq!(kc["clusters"][0]["cluster"]["insecure-skip-tls-verify"], serde_yaml::Value::from(true));
    assert_eq!(kc["users"][0]["name"], serde_yaml::Value::from("admin"));
    assert_eq!(kc["users"][0]["user"]["token"], serde_yaml::Value::from("tok"));
}

#[rstest]
fn test_build_kubeconfig_with_ca() {
    let kc =
        kubeconfig::build_kubeconfig(TEST_CLUSTER, "https://1.2.3.4:30443", "admin", "tok", Some(b"ca-data")).unwrap();
    let kc: serde_yaml::Value = serde_yaml::from_str(&kc).unwrap();

    let cluster = &kc["clusters"][0]["cluster"];
    assert_eq!(cluster["certificate-authority-data"], serde_yaml::Value::from("Y2EtZGF0YQ=="));
    assert_none!(cluster.get("insecure-skip-tls-verify"));
}

#[rstest]
fn test_common_secrets(resolved_cluster: Cluster, test_config: ControllerConfig) {
    let seed = test_seed();
    let data = TemplateData::new(&resolved_cluster, &seed, &test_config).unwrap();
    assert_eq!(
        secret_names(&data),
        vec![
            TOKENS_SECRET_NAME,
            ADMIN_KUBECONFIG_SECRET_NAME,
            INTERNAL_ADMIN_KUBECONFIG_SECRET_NAME,
            KUBELET_DNAT_CONTROLLER_KUBECONFIG_SECRET_NAME,
            MACHINE_CONTROLLER_KUBECONFIG_SECRET_NAME,
            CONTROLLER_MANAGER_KUBECONFIG_SECRET_NAME,
            KUBE_STATE_METRICS_KUBECONFIG_SECRET_NAME,
            METRICS_SERVER_KUBECONFIG_SECRET_NAME,
            CLUSTER_AUTOSCALER_KUBECONFIG_SECRET_NAME,
        ]
    );
}

#[rstest]
fn test_common_secrets_optional(resolved_cluster: Cluster, mut test_config: ControllerConfig) {
    let mut cluster = resolved_cluster;
    cluster.spec.version = "1.13.5".into();
    test_config.docker_pull_config_json = Some(b"{}".to_vec());
    test_config.oidc.ca = Some("-----BEGIN CERTIFICATE-----".into());
    let seed = test_seed();
    let data = TemplateData::new(&cluster, &seed, &test_config).unwrap();

    let names = secret_names(&data);
    assert_contains!(names, &IMAGE_PULL_SECRET_NAME.to_string());
    assert_contains!(names, &DEX_CA_SECRET_NAME.to_string());
    assert_not_contains!(names, &CLUSTER_AUTOSCALER_KUBECONFIG_SECRET_NAME.to_string());
    assert_not_contains!(names, &GCP_SERVICE_ACCOUNT_SECRET_NAME.to_string());
}

#[rstest]
fn test_admin_kubeconfig_secret(resolved_cluster: Cluster, test_config: ControllerConfig) {
    let seed = test_seed();
    let data = TemplateData::new(&resolved_cluster, &seed, &test_config).unwrap();

    let secret = secrets::admin_kubeconfig(&data).create(Default::default()).unwrap();
    let kc = String::from_utf8(secret.data.unwrap()[KUBECONFIG_SECRET_KEY].0.clone()).unwrap();
    assert_contains!(kc, &resolved_cluster.address().url);
    assert_contains!(kc, crate::tests::TEST_ADMIN_TOKEN);
    assert_eq!(secret.metadata.labels.unwrap()[CLUSTER_LABEL_KEY], TEST_CLUSTER);
}

#[rstest]
fn test_secret_keeps_foreign_keys(resolved_cluster: Cluster, test_config: ControllerConfig) {
    let seed = test_seed();
    let data = TemplateData::new(&resolved_cluster, &seed, &test_config).unwrap();

    let existing = corev1::Secret {
        data: Some(BTreeMap::from([("extra".into(), k8s_openapi::ByteString(b"keep me".to_vec()))])),
        ..Default::default()
    };
    let secret = secrets::tokens(&data).create(existing).unwrap();
    let keys: Vec<_> = secret.data.unwrap().into_keys().collect();
    assert_eq!(keys, vec!["extra".to_string(), TOKENS_FILE_NAME.to_string()]);
}

#[rstest]
fn test_creators_are_idempotent(resolved_cluster: Cluster, test_config: ControllerConfig) {
    let seed = test_seed();
    let data = TemplateData::new(&resolved_cluster, &seed, &test_config).unwrap();
    let flavor = KubernetesFlavor;

    for c in flavor.secrets(&data) {
        let first = c.create(Default::default()).unwrap();
        assert_eq!(c.create(first.clone()).unwrap(), first, "secret {}", c.name());
    }
    for c in flavor.config_maps(&data) {
        let first = c.create(Default::default()).unwrap();
        assert_eq!(c.create(first.clone()).unwrap(), first, "configmap {}", c.name());
    }
    for c in flavor.deployments(&data) {
        let first = c.create(Default::default()).unwrap();
        assert_eq!(c.create(first.clone()).unwrap(), first, "deployment {}", c.name());
    }
    for c in flavor.services(&data) {
        let first = c.create(Default::default()).unwrap();
        assert_eq!(c.create(first.clone()).unwrap(), first, "service {}", c.name());
    }
}

#[rstest]
fn test_audit_config_preserved(resolved_cluster: Cluster, test_config: ControllerConfig) {
    let seed = test_seed();
    let data = TemplateData::new(&resolved_cluster, &seed, &test_config).unwrap();
    let creator = configmaps::audit_config(&data);

    let fresh = creator.create(Default::default()).unwrap();
    assert_contains!(fresh.data.unwrap()[configmaps::AUDIT_POLICY_KEY], "level: Metadata");

    let custom = corev1::ConfigMap {
        data: Some(BTreeMap::from([(configmaps::AUDIT_POLICY_KEY.into(), "rules: []\n".into())])),
        ..Default::default()
    };
    let cm = creator.create(custom).unwrap();
    assert_eq!(cm.data.unwrap()[configmaps::AUDIT_POLICY_KEY], "rules: []\n");
}

#[rstest]
fn test_openvpn_client_config(resolved_cluster: Cluster, test_config: ControllerConfig) {
    let seed = test_seed();
    let data = TemplateData::new(&resolved_cluster, &seed, &test_config).unwrap();

    let cm = configmaps::openvpn_client_configs(&data).create(Default::default()).unwrap();
    assert_eq!(
        cm.data.unwrap()[configmaps::OPENVPN_CLIENT_CONFIG_KEY],
        "iroute 10.240.16.0 255.255.240.0\niroute 172.25.0.0 255.255.0.0\niroute 10.254.0.0 255.255.0.0\n"
    );
}

#[rstest]
fn test_dns_resolver_config(resolved_cluster: Cluster, test_config: ControllerConfig) {
    let seed = test_seed();
    let data = TemplateData::new(&resolved_cluster, &seed, &test_config).unwrap();

    let cm = configmaps::dns_resolver(&data).create(Default::default()).unwrap();
    let corefile = &cm.data.unwrap()[configmaps::COREFILE_KEY];
    assert_starts_with!(corefile, "cluster.local {");
    assert_contains!(corefile, "forward . 10.240.16.10");
}

#[rstest]
fn test_cloud_config_fake_provider(resolved_cluster: Cluster, test_config: ControllerConfig) {
    let seed = test_seed();
    let data = TemplateData::new(&resolved_cluster, &seed, &test_config).unwrap();
    assert_eq!(configmaps::cloud_config_contents(&data), "");
}

#[rstest]
fn test_openshift_apiserver_config_needs_address(test_openshift_cluster: Cluster, test_config: ControllerConfig) {
    let seed = test_seed();
    let data = TemplateData::new(&test_openshift_cluster, &seed, &test_config).unwrap();
    assert_err!(configmaps::openshift_apiserver_config(&data).create(Default::default()));
}

#[rstest]
fn test_keep_node_ports(resolved_cluster: Cluster, test_config: ControllerConfig) {
    let seed = test_seed();
    let data = TemplateData::new(&resolved_cluster, &seed, &test_config).unwrap();

    let existing = corev1::Service {
        spec: Some(corev1::ServiceSpec {
            cluster_ip: Some("10.240.16.42".into()),
            ports: Some(vec![corev1::ServicePort {
                name: Some("secure".into()),
                port: 443,
                node_port: Some(31000),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    };
    let svc = services::apiserver_external(&data).create(existing).unwrap();
    let spec = svc.spec.unwrap();
    assert_eq!(spec.type_.as_deref(), Some("NodePort"));
    assert_eq!(spec.cluster_ip.as_deref(), Some("10.240.16.42"));
    assert_eq!(spec.ports.unwrap()[0].node_port, Some(31000));
    assert_eq!(svc.metadata.annotations.unwrap()["nodeport-proxy.k8s.io/expose"], "true");
}

#[rstest]
#[case::disabled(false)]
#[case::enabled(true)]
fn test_etcd_corruption_checks(resolved_cluster: Cluster, mut test_config: ControllerConfig, #[case] enabled: bool) {
    test_config.feature_gates.etcd_data_corruption_checks = enabled;
    let seed = test_seed();
    let data = TemplateData::new(&resolved_cluster, &seed, &test_config).unwrap();

    let env = etcd_env(&data);
    assert_eq!(env.contains(&"ENABLE_CORRUPTION_CHECK".to_string()), enabled);
}

#[rstest]
fn test_etcd_disk_size(resolved_cluster: Cluster, mut test_config: ControllerConfig) {
    test_config.etcd_disk_size = "20Gi".into();
    let seed = test_seed();
    let data = TemplateData::new(&resolved_cluster, &seed, &test_config).unwrap();

    let sts = workloads::etcd(&data).create(Default::default()).unwrap();
    let claim = &sts.spec.unwrap().volume_claim_templates.unwrap()[0];
    let requests = claim.spec.as_ref().unwrap().resources.as_ref().unwrap().requests.as_ref().unwrap();
    assert_eq!(requests["storage"].0, "20Gi");
}

#[rstest]
#[case::recommend_only(false, VerticalPodAutoscalerUpdateMode::Off)]
#[case::auto(true, VerticalPodAutoscalerUpdateMode::Auto)]
fn test_vpa_update_mode(
    resolved_cluster: Cluster,
    mut test_config: ControllerConfig,
    #[case] gate: bool,
    #[case] expected: VerticalPodAutoscalerUpdateMode,
) {
    test_config.feature_gates.vpa = gate;
    let seed = test_seed();
    let data = TemplateData::new(&resolved_cluster, &seed, &test_config).unwrap();

    let target = VpaTarget { kind: VpaTargetKind::StatefulSet, name: ETCD_STATEFULSET_NAME.into() };
    let vpa = vpa::vertical_pod_autoscaler(&data, target).create(Default::default()).unwrap();
    assert_eq!(vpa.spec.target_ref.kind, "StatefulSet");
    assert_eq!(vpa.spec.target_ref.name, ETCD_STATEFULSET_NAME);
    assert_eq!(vpa.spec.update_policy.unwrap().update_mode, Some(expected));
}

#[rstest]
fn test_nodeport_proxy(resolved_cluster: Cluster, test_config: ControllerConfig) {
    let seed = test_seed();
    let data = TemplateData::new(&resolved_cluster, &seed, &test_config).unwrap();
    let proxy = nodeport_proxy::creators(&data);

    assert_eq!(proxy.service_accounts[0].name(), NODEPORT_PROXY_RBAC_NAME);
    assert_eq!(proxy.roles[0].name(), NODEPORT_PROXY_RBAC_NAME);
    assert_eq!(proxy.role_bindings[0].name(), NODEPORT_PROXY_RBAC_NAME);
    assert_eq!(proxy.pdbs[0].name(), NODEPORT_PROXY_PDB_NAME);

    let dep: appsv1::Deployment = proxy.deployments[0].create(Default::default()).unwrap();
    let spec = dep.spec.unwrap();
    assert_eq!(spec.replicas, Some(2));
    let pod = spec.template.spec.unwrap();
    assert_eq!(pod.service_account_name.as_deref(), Some(NODEPORT_PROXY_RBAC_NAME));
    assert_eq!(pod.containers[1].args.as_ref().unwrap(), &vec!["-namespace".to_string(), TEST_CLUSTER_NAMESPACE.into()]);
}

#[rstest]
fn test_role_binding_subject(resolved_cluster: Cluster, test_config: ControllerConfig) {
    let seed = test_seed();
    let data = TemplateData::new(&resolved_cluster, &seed, &test_config).unwrap();

    let rb = rbac::role_bindings(&data)[0].create(Default::default()).unwrap();
    assert_eq!(rb.role_ref.name, USER_CLUSTER_CONTROLLER_RBAC_NAME);
    let subject = &rb.subjects.unwrap()[0];
    assert_eq!(subject.kind, "ServiceAccount");
    assert_eq!(subject.namespace.as_deref(), Some(TEST_CLUSTER_NAMESPACE));
}
