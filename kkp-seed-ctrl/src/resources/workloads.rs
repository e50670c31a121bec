use k8s_openapi::api::apps::v1 as appsv1;
use k8s_openapi::api::batch::v1 as batchv1;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kkp_core::macros::*;
use kkp_core::prelude::*;
use kkp_core::reconciling::NamedCreator;

use super::names::*;
use super::services::{
    APISERVER_SECURE_PORT,
    ETCD_CLIENT_PORT,
    ETCD_PEER_PORT,
    MACHINE_CONTROLLER_WEBHOOK_PORT,
    NODEPORT_PROXY_ENVOY_PORT,
    OPENVPN_PORT,
};
use super::{
    DEFAULT_DOCKER_REGISTRY,
    DEFAULT_GCR_REGISTRY,
    DEFAULT_K8S_REGISTRY,
    DEFAULT_QUAY_REGISTRY,
    TemplateData,
    base_meta,
};

const ETCD_REPLICAS: i32 = 3;
const ETCD_IMAGE_TAG: &str = "v3.3.18";
const COREDNS_IMAGE_TAG: &str = "1.3.1";
const OPENVPN_IMAGE_TAG: &str = "v2.5.2-r0";
const MACHINE_CONTROLLER_IMAGE_TAG: &str = "v1.5.0";
const METRICS_SERVER_IMAGE_TAG: &str = "v0.3.3";
const CLUSTER_AUTOSCALER_IMAGE_TAG: &str = "v1.14.5";
const ENVOY_IMAGE_TAG: &str = "v1.11.1";

const KUBECONFIG_MOUNT_PATH: &str = "/etc/kubernetes/kubeconfig";
const ETCD_DATA_VOLUME: &str = "data";
const ETCD_DATA_MOUNT_PATH: &str = "/var/run/etcd";
const ETCD_DEFRAG_SCHEDULE: &str = "0 */3 * * *";

pub(super) fn kubeconfig_path() -> String {
    format!("{KUBECONFIG_MOUNT_PATH}/{KUBECONFIG_SECRET_KEY}")
}

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

fn env_var(name: &str, value: &str) -> corev1::EnvVar {
    corev1::EnvVar { name: name.into(), value: Some(value.into()), ..Default::default() }
}

fn field_env_var(name: &str, field_path: &str) -> corev1::EnvVar {
    corev1::EnvVar {
        name: name.into(),
        value_from: Some(corev1::EnvVarSource {
            field_ref: Some(corev1::ObjectFieldSelector {
                api_version: Some("v1".into()),
                field_path: field_path.into(),
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn container_port(name: &str, port: i32) -> corev1::ContainerPort {
    corev1::ContainerPort {
        name: Some(name.into()),
        container_port: port,
        protocol: Some("TCP".into()),
        ..Default::default()
    }
}

fn mount(name: &str, path: &str) -> corev1::VolumeMount {
    corev1::VolumeMount {
        name: name.into(),
        mount_path: path.into(),
        read_only: Some(true),
        ..Default::default()
    }
}

fn secret_volume(secret_name: &str) -> corev1::Volume {
    corev1::Volume {
        name: secret_name.into(),
        secret: Some(corev1::SecretVolumeSource {
            secret_name: Some(secret_name.into()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn configmap_volume(cm_name: &str) -> corev1::Volume {
    corev1::Volume {
        name: cm_name.into(),
        config_map: Some(corev1::ConfigMapVolumeSource { name: cm_name.into(), ..Default::default() }),
        ..Default::default()
    }
}

fn container(name: &str, image: String, command: Vec<String>, args: Vec<String>) -> corev1::Container {
    corev1::Container {
        name: name.into(),
        image: Some(image),
        image_pull_policy: Some("IfNotPresent".into()),
        command: Some(command),
        args: Some(args),
        ..Default::default()
    }
}

// A container that talks to the user cluster through one of the kubeconfig secrets
fn kubeconfig_container(name: &str, image: String, command: Vec<String>, args: Vec<String>, secret: &str) -> corev1::Container {
    corev1::Container {
        volume_mounts: Some(vec![mount(secret, KUBECONFIG_MOUNT_PATH)]),
        ..container(name, image, command, args)
    }
}

fn image_pull_secrets(data: &TemplateData) -> Option<Vec<corev1::LocalObjectReference>> {
    let mut secrets = vec![];
    if data.config().docker_pull_config_json.is_some() {
        secrets.push(IMAGE_PULL_SECRET_NAME);
    }
    if data.cluster().is_openshift() {
        secrets.push(OPENSHIFT_IMAGE_PULL_SECRET_NAME);
    }

    match secrets.len() {
        0 => None,
        _ => Some(
            secrets
                .into_iter()
                .map(|s| corev1::LocalObjectReference { name: s.into() })
                .collect(),
        ),
    }
}

fn pod_template(
    data: &TemplateData,
    app: &str,
    containers: Vec<corev1::Container>,
    volumes: Vec<corev1::Volume>,
) -> corev1::PodTemplateSpec {
    corev1::PodTemplateSpec {
        metadata: Some(metav1::ObjectMeta { labels: Some(data.labels(app)), ..Default::default() }),
        spec: Some(corev1::PodSpec {
            containers,
            volumes: (!volumes.is_empty()).then_some(volumes),
            image_pull_secrets: image_pull_secrets(data),
            ..Default::default()
        }),
    }
}

type PodContents = (Vec<corev1::Container>, Vec<corev1::Volume>);

// The desired spec is rebuilt from scratch on every pass; fields we leave empty get defaulted by
// the apiserver and are ignored when comparing against the existing object
pub fn deployment<'a, F>(
    data: &'a TemplateData<'a>,
    name: &'static str,
    replicas: i32,
    build: F,
) -> NamedCreator<'a, appsv1::Deployment>
where
    F: Fn(&TemplateData) -> anyhow::Result<PodContents> + Send + Sync + 'a,
{
    NamedCreator::new(name, move |mut dep: appsv1::Deployment| {
        let (containers, volumes) = build(data)?;
        base_meta(data, &mut dep.metadata, name);
        dep.spec = Some(appsv1::DeploymentSpec {
            replicas: Some(replicas),
            selector: metav1::LabelSelector {
                match_labels: Some(data.labels(name)),
                ..Default::default()
            },
            template: pod_template(data, name, containers, volumes),
            ..Default::default()
        });
        Ok(dep)
    })
}

pub fn openvpn_server<'a>(data: &'a TemplateData<'a>) -> NamedCreator<'a, appsv1::Deployment> {
    deployment(
        data,
        OPENVPN_SERVER_DEPLOYMENT_NAME,
        1,
        |data| {
            let mut c = container(
                "openvpn-server",
                data.image(DEFAULT_QUAY_REGISTRY, &format!("kubermatic/openvpn:{OPENVPN_IMAGE_TAG}")),
                strings(&["/usr/sbin/openvpn"]),
                vec![
                    "--proto".into(),
                    "tcp".into(),
                    "--port".into(),
                    OPENVPN_PORT.to_string(),
                    "--client-config-dir".into(),
                    "/etc/openvpn/clients".into(),
                    "--route".into(),
                    data.services_cidr(),
                    "--route".into(),
                    data.pods_cidr(),
                ],
            );
            c.ports = Some(vec![container_port("secure", OPENVPN_PORT)]);
            c.volume_mounts = Some(vec![mount(OPENVPN_CLIENT_CONFIGS_CONFIGMAP_NAME, "/etc/openvpn/clients")]);
            Ok((vec![c], vec![configmap_volume(OPENVPN_CLIENT_CONFIGS_CONFIGMAP_NAME)]))
        },
    )
}

pub fn dns_resolver<'a>(data: &'a TemplateData<'a>) -> NamedCreator<'a, appsv1::Deployment> {
    deployment(
        data,
        DNS_RESOLVER_DEPLOYMENT_NAME,
        2,
        |data| {
            let mut c = container(
                "dns",
                data.image(DEFAULT_K8S_REGISTRY, &format!("coredns:{COREDNS_IMAGE_TAG}")),
                strings(&["/coredns"]),
                strings(&["-conf", "/etc/coredns/Corefile"]),
            );
            c.volume_mounts = Some(vec![mount(DNS_RESOLVER_CONFIGMAP_NAME, "/etc/coredns")]);
            Ok((vec![c], vec![configmap_volume(DNS_RESOLVER_CONFIGMAP_NAME)]))
        },
    )
}

fn oidc_flags(data: &TemplateData) -> Vec<String> {
    let oidc = &data.config().oidc;
    let (issuer, client_id) = if data.config().feature_gates.kubernetes_oidc_authentication && !oidc.issuer_url.is_empty() {
        (oidc.issuer_url.clone(), oidc.client_id.clone())
    } else if let Some(cluster_oidc) = &data.cluster().spec.oidc {
        (cluster_oidc.issuer_url.clone(), cluster_oidc.client_id.clone())
    } else {
        return vec![];
    };

    let mut flags = vec![format!("--oidc-issuer-url={issuer}"), format!("--oidc-client-id={client_id}")];
    if oidc.ca.is_some() {
        flags.push(format!("--oidc-ca-file=/etc/kubernetes/dex/ca/{DEX_CA_FILE_NAME}"));
    }
    flags
}

// The dnat controller runs next to the apiserver so that traffic to node IPs gets routed through
// the VPN tunnel
fn dnat_controller_sidecar(data: &TemplateData) -> corev1::Container {
    let mut c = kubeconfig_container(
        "dnat-controller",
        data.config().dnat_controller_image.clone(),
        strings(&["/usr/local/bin/kubeletdnat-controller"]),
        vec![
            "-kubeconfig".into(),
            kubeconfig_path(),
            "-node-access-network".into(),
            data.config().node_access_network.clone(),
        ],
        KUBELET_DNAT_CONTROLLER_KUBECONFIG_SECRET_NAME,
    );
    c.security_context = Some(corev1::SecurityContext {
        capabilities: Some(corev1::Capabilities { add: Some(strings(&["NET_ADMIN"])), ..Default::default() }),
        ..Default::default()
    });
    c
}

pub fn apiserver<'a>(data: &'a TemplateData<'a>, image: String) -> NamedCreator<'a, appsv1::Deployment> {
    deployment(
        data,
        APISERVER_DEPLOYMENT_NAME,
        1,
        move |data| {
            let etcd_endpoints: Vec<String> = (0..ETCD_REPLICAS)
                .map(|i| format!("https://{ETCD_STATEFULSET_NAME}-{i}.{ETCD_SERVICE_NAME}.{}.svc.cluster.local.:{ETCD_CLIENT_PORT}", data.namespace()))
                .collect();

            let mut args = vec![
                format!("--etcd-servers={}", etcd_endpoints.join(",")),
                format!("--secure-port={APISERVER_SECURE_PORT}"),
                format!("--service-cluster-ip-range={}", data.services_cidr()),
                format!("--service-node-port-range={}", data.config().node_port_range),
                format!("--token-auth-file=/etc/kubernetes/tokens/{TOKENS_FILE_NAME}"),
                "--audit-policy-file=/etc/kubernetes/audit/policy.yaml".into(),
                "--allow-privileged".into(),
                "--authorization-mode=Node,RBAC".into(),
                "--kubelet-preferred-address-types=ExternalIP,InternalIP".into(),
            ];
            if !data.address().ip.is_empty() {
                args.push(format!("--advertise-address={}", data.address().ip));
            }
            args.extend(oidc_flags(data));

            let mut mounts = vec![
                mount(TOKENS_SECRET_NAME, "/etc/kubernetes/tokens"),
                mount(AUDIT_CONFIGMAP_NAME, "/etc/kubernetes/audit"),
            ];
            let mut volumes = vec![
                secret_volume(TOKENS_SECRET_NAME),
                configmap_volume(AUDIT_CONFIGMAP_NAME),
                secret_volume(KUBELET_DNAT_CONTROLLER_KUBECONFIG_SECRET_NAME),
            ];
            if data.config().oidc.ca.is_some() {
                mounts.push(mount(DEX_CA_SECRET_NAME, "/etc/kubernetes/dex/ca"));
                volumes.push(secret_volume(DEX_CA_SECRET_NAME));
            }

            let mut c = container("apiserver", image.clone(), strings(&["/hyperkube", "kube-apiserver"]), args);
            c.ports = Some(vec![container_port("https", APISERVER_SECURE_PORT)]);
            c.volume_mounts = Some(mounts);

            Ok((vec![c, dnat_controller_sidecar(data)], volumes))
        },
    )
}

pub fn scheduler<'a>(data: &'a TemplateData<'a>, image: String) -> NamedCreator<'a, appsv1::Deployment> {
    deployment(
        data,
        SCHEDULER_DEPLOYMENT_NAME,
        1,
        move |_| {
            let c = kubeconfig_container(
                "scheduler",
                image.clone(),
                strings(&["/hyperkube", "kube-scheduler"]),
                vec![format!("--kubeconfig={}", kubeconfig_path()), "--leader-elect".into()],
                SCHEDULER_KUBECONFIG_SECRET_NAME,
            );
            Ok((vec![c], vec![secret_volume(SCHEDULER_KUBECONFIG_SECRET_NAME)]))
        },
    )
}

pub fn controller_manager<'a>(data: &'a TemplateData<'a>, image: String) -> NamedCreator<'a, appsv1::Deployment> {
    deployment(
        data,
        CONTROLLER_MANAGER_DEPLOYMENT_NAME,
        1,
        move |data| {
            let mut args = vec![
                format!("--kubeconfig={}", kubeconfig_path()),
                format!("--service-cluster-ip-range={}", data.services_cidr()),
                format!("--cluster-cidr={}", data.pods_cidr()),
                "--cloud-config=/etc/kubernetes/cloud/config".into(),
                "--allocate-node-cidrs".into(),
                "--leader-elect".into(),
            ];
            let mut volumes =
                vec![secret_volume(CONTROLLER_MANAGER_KUBECONFIG_SECRET_NAME), configmap_volume(CLOUD_CONFIG_CONFIGMAP_NAME)];
            let mut mounts = vec![
                mount(CONTROLLER_MANAGER_KUBECONFIG_SECRET_NAME, KUBECONFIG_MOUNT_PATH),
                mount(CLOUD_CONFIG_CONFIGMAP_NAME, "/etc/kubernetes/cloud"),
            ];
            if data.cluster().spec.cloud.gcp.is_some() {
                args.push("--cloud-provider=gce".into());
                volumes.push(secret_volume(GCP_SERVICE_ACCOUNT_SECRET_NAME));
                mounts.push(mount(GCP_SERVICE_ACCOUNT_SECRET_NAME, "/etc/gcp"));
            } else if data.cluster().spec.cloud.aws.is_some() {
                args.push("--cloud-provider=aws".into());
            }

            let mut c = container("controller-manager", image.clone(), strings(&["/hyperkube", "kube-controller-manager"]), args);
            c.volume_mounts = Some(mounts);
            Ok((vec![c], volumes))
        },
    )
}

fn machine_controller_image(data: &TemplateData) -> String {
    data.image(DEFAULT_QUAY_REGISTRY, &format!("kubermatic/machine-controller:{MACHINE_CONTROLLER_IMAGE_TAG}"))
}

pub fn machine_controller<'a>(data: &'a TemplateData<'a>) -> NamedCreator<'a, appsv1::Deployment> {
    deployment(
        data,
        MACHINE_CONTROLLER_DEPLOYMENT_NAME,
        1,
        |data| {
            let c = kubeconfig_container(
                "machine-controller",
                machine_controller_image(data),
                strings(&["/usr/local/bin/machine-controller"]),
                vec![
                    "-kubeconfig".into(),
                    kubeconfig_path(),
                    "-cluster-dns".into(),
                    data.dns_resolver_ip()?.to_string(),
                    "-worker-count".into(),
                    "5".into(),
                ],
                MACHINE_CONTROLLER_KUBECONFIG_SECRET_NAME,
            );
            Ok((vec![c], vec![secret_volume(MACHINE_CONTROLLER_KUBECONFIG_SECRET_NAME)]))
        },
    )
}

pub fn machine_controller_webhook<'a>(data: &'a TemplateData<'a>) -> NamedCreator<'a, appsv1::Deployment> {
    deployment(
        data,
        MACHINE_CONTROLLER_WEBHOOK_DEPLOYMENT_NAME,
        1,
        |data| {
            let mut c = kubeconfig_container(
                "machine-controller-webhook",
                machine_controller_image(data),
                strings(&["/usr/local/bin/webhook"]),
                vec![
                    "-kubeconfig".into(),
                    kubeconfig_path(),
                    "-listen-address".into(),
                    format!("0.0.0.0:{MACHINE_CONTROLLER_WEBHOOK_PORT}"),
                ],
                MACHINE_CONTROLLER_KUBECONFIG_SECRET_NAME,
            );
            c.ports = Some(vec![container_port("https", MACHINE_CONTROLLER_WEBHOOK_PORT)]);
            Ok((vec![c], vec![secret_volume(MACHINE_CONTROLLER_KUBECONFIG_SECRET_NAME)]))
        },
    )
}

pub fn metrics_server<'a>(data: &'a TemplateData<'a>) -> NamedCreator<'a, appsv1::Deployment> {
    deployment(
        data,
        METRICS_SERVER_DEPLOYMENT_NAME,
        2,
        |data| {
            let c = kubeconfig_container(
                "metrics-server",
                data.image(DEFAULT_K8S_REGISTRY, &format!("metrics-server-amd64:{METRICS_SERVER_IMAGE_TAG}")),
                strings(&["/metrics-server"]),
                vec![
                    format!("--kubeconfig={}", kubeconfig_path()),
                    format!("--authentication-kubeconfig={}", kubeconfig_path()),
                    format!("--authorization-kubeconfig={}", kubeconfig_path()),
                    "--kubelet-insecure-tls".into(),
                ],
                METRICS_SERVER_KUBECONFIG_SECRET_NAME,
            );
            Ok((vec![c], vec![secret_volume(METRICS_SERVER_KUBECONFIG_SECRET_NAME)]))
        },
    )
}

pub fn usercluster_controller<'a>(data: &'a TemplateData<'a>) -> NamedCreator<'a, appsv1::Deployment> {
    deployment(
        data,
        USER_CLUSTER_CONTROLLER_DEPLOYMENT_NAME,
        1,
        |data| {
            let mut args = vec![
                "-kubeconfig".into(),
                kubeconfig_path(),
                "-namespace".into(),
                data.namespace().into(),
                "-cluster-url".into(),
                data.external_url(),
                "-openvpn-server-port".into(),
                OPENVPN_PORT.to_string(),
            ];
            if data.cluster().is_openshift() {
                args.push("-openshift".into());
            }

            let mut c = kubeconfig_container(
                "usercluster-controller",
                data.config().kubermatic_image.clone(),
                strings(&["/usr/local/bin/user-cluster-controller-manager"]),
                args,
                INTERNAL_ADMIN_KUBECONFIG_SECRET_NAME,
            );
            c.env = Some(vec![field_env_var("NAMESPACE", "metadata.namespace")]);

            Ok((vec![c], vec![secret_volume(INTERNAL_ADMIN_KUBECONFIG_SECRET_NAME)]))
        },
    )
}

pub fn cluster_autoscaler<'a>(data: &'a TemplateData<'a>) -> NamedCreator<'a, appsv1::Deployment> {
    deployment(
        data,
        CLUSTER_AUTOSCALER_DEPLOYMENT_NAME,
        1,
        |data| {
            let c = kubeconfig_container(
                "cluster-autoscaler",
                data.image(DEFAULT_K8S_REGISTRY, &format!("cluster-autoscaler:{CLUSTER_AUTOSCALER_IMAGE_TAG}")),
                strings(&["/cluster-autoscaler"]),
                vec![
                    format!("--kubeconfig={}", kubeconfig_path()),
                    "--cloud-provider=clusterapi".into(),
                    "--logtostderr".into(),
                ],
                CLUSTER_AUTOSCALER_KUBECONFIG_SECRET_NAME,
            );
            Ok((vec![c], vec![secret_volume(CLUSTER_AUTOSCALER_KUBECONFIG_SECRET_NAME)]))
        },
    )
}

pub fn nodeport_proxy_envoy<'a>(data: &'a TemplateData<'a>) -> NamedCreator<'a, appsv1::Deployment> {
    NamedCreator::new(NODEPORT_PROXY_DEPLOYMENT_NAME, move |dep: appsv1::Deployment| {
        let mut dep = deployment(
            data,
            NODEPORT_PROXY_DEPLOYMENT_NAME,
            2,
            |data| {
                let mut envoy = container(
                    "envoy",
                    data.image(DEFAULT_DOCKER_REGISTRY, &format!("envoyproxy/envoy-alpine:{ENVOY_IMAGE_TAG}")),
                    strings(&["/usr/local/bin/envoy"]),
                    strings(&["-c", "/etc/envoy/envoy.yaml"]),
                );
                envoy.ports = Some(vec![container_port("secure", NODEPORT_PROXY_ENVOY_PORT)]);

                let manager = container(
                    "envoy-manager",
                    data.config().kubermatic_image.clone(),
                    strings(&["/usr/local/bin/envoy-manager"]),
                    vec!["-namespace".into(), data.namespace().into()],
                );
                Ok((vec![envoy, manager], vec![]))
            },
        )
        .create(dep)?;

        if let Some(pod) = dep.spec.as_mut().and_then(|s| s.template.spec.as_mut()) {
            pod.service_account_name = Some(NODEPORT_PROXY_RBAC_NAME.into());
        }
        Ok(dep)
    })
}

pub fn etcd<'a>(data: &'a TemplateData<'a>) -> NamedCreator<'a, appsv1::StatefulSet> {
    NamedCreator::new(ETCD_STATEFULSET_NAME, move |mut sts: appsv1::StatefulSet| {
        let mut env = vec![
            field_env_var("POD_NAME", "metadata.name"),
            field_env_var("POD_IP", "status.podIP"),
            env_var("TOKEN", &data.cluster_name()),
            env_var("ETCD_CLUSTER_SIZE", &ETCD_REPLICAS.to_string()),
            env_var("ETCDCTL_API", "3"),
        ];
        if data.config().feature_gates.etcd_data_corruption_checks {
            env.push(env_var("ENABLE_CORRUPTION_CHECK", "true"));
        }

        let initial_cluster: Vec<String> = (0..ETCD_REPLICAS)
            .map(|i| {
                format!(
                    "{ETCD_STATEFULSET_NAME}-{i}=http://{ETCD_STATEFULSET_NAME}-{i}.{ETCD_SERVICE_NAME}.{}.svc.cluster.local:{ETCD_PEER_PORT}",
                    data.namespace()
                )
            })
            .collect();

        let mut c = container(
            "etcd",
            data.image(DEFAULT_GCR_REGISTRY, &format!("etcd-development/etcd:{ETCD_IMAGE_TAG}")),
            strings(&["/usr/local/bin/etcd"]),
            vec![
                "--name=$(POD_NAME)".into(),
                format!("--data-dir={ETCD_DATA_MOUNT_PATH}/pod_$(POD_NAME)"),
                format!("--initial-cluster={}", initial_cluster.join(",")),
                format!("--initial-cluster-token={}", data.cluster_name()),
                "--initial-cluster-state=new".into(),
                format!("--listen-client-urls=http://0.0.0.0:{ETCD_CLIENT_PORT}"),
                format!("--listen-peer-urls=http://0.0.0.0:{ETCD_PEER_PORT}"),
            ],
        );
        c.env = Some(env);
        c.ports = Some(vec![
            container_port("client", ETCD_CLIENT_PORT),
            container_port("peer", ETCD_PEER_PORT),
        ]);
        c.volume_mounts = Some(vec![corev1::VolumeMount {
            name: ETCD_DATA_VOLUME.into(),
            mount_path: ETCD_DATA_MOUNT_PATH.into(),
            ..Default::default()
        }]);

        base_meta(data, &mut sts.metadata, ETCD_STATEFULSET_NAME);
        sts.spec = Some(appsv1::StatefulSetSpec {
            replicas: Some(ETCD_REPLICAS),
            service_name: Some(ETCD_SERVICE_NAME.into()),
            pod_management_policy: Some("Parallel".into()),
            selector: metav1::LabelSelector {
                match_labels: Some(data.labels(ETCD_STATEFULSET_NAME)),
                ..Default::default()
            },
            template: pod_template(data, ETCD_STATEFULSET_NAME, vec![c], vec![]),
            volume_claim_templates: Some(vec![corev1::PersistentVolumeClaim {
                metadata: metav1::ObjectMeta { name: Some(ETCD_DATA_VOLUME.into()), ..Default::default() },
                spec: Some(corev1::PersistentVolumeClaimSpec {
                    access_modes: Some(strings(&["ReadWriteOnce"])),
                    resources: Some(corev1::VolumeResourceRequirements {
                        requests: Some(BTreeMap::from([(
                            "storage".into(),
                            Quantity(data.config().etcd_disk_size.clone()),
                        )])),
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            }]),
            ..Default::default()
        });
        Ok(sts)
    })
}

pub fn etcd_defragger<'a>(data: &'a TemplateData<'a>) -> NamedCreator<'a, batchv1::CronJob> {
    NamedCreator::new(ETCD_DEFRAG_CRONJOB_NAME, move |mut cj: batchv1::CronJob| {
        let endpoints: Vec<String> = (0..ETCD_REPLICAS)
            .map(|i| {
                format!(
                    "http://{ETCD_STATEFULSET_NAME}-{i}.{ETCD_SERVICE_NAME}.{}.svc.cluster.local:{ETCD_CLIENT_PORT}",
                    data.namespace()
                )
            })
            .collect();

        let mut c = container(
            "defragger",
            data.image(DEFAULT_GCR_REGISTRY, &format!("etcd-development/etcd:{ETCD_IMAGE_TAG}")),
            strings(&["/usr/local/bin/etcdctl"]),
            vec![format!("--endpoints={}", endpoints.join(",")), "defrag".into()],
        );
        c.env = Some(vec![env_var("ETCDCTL_API", "3")]);

        let mut template = pod_template(data, ETCD_DEFRAG_CRONJOB_NAME, vec![c], vec![]);
        if let Some(spec) = template.spec.as_mut() {
            spec.restart_policy = Some("OnFailure".into());
        }

        base_meta(data, &mut cj.metadata, ETCD_DEFRAG_CRONJOB_NAME);
        cj.spec = Some(batchv1::CronJobSpec {
            schedule: ETCD_DEFRAG_SCHEDULE.into(),
            concurrency_policy: Some("Forbid".into()),
            job_template: batchv1::JobTemplateSpec {
                spec: Some(batchv1::JobSpec { template, ..Default::default() }),
                ..Default::default()
            },
            ..Default::default()
        });
        Ok(cj)
    })
}
