use std::collections::BTreeMap;

use kkp_api::v1::CloudSpec;
use kkp_core::errors::*;
use kkp_core::prelude::*;
use kkp_core::reconciling::NamedCreator;
use serde_json::json;

use super::names::*;
use super::{
    TemplateData,
    base_meta,
    parse_ipv4_cidr,
};

pub const CLOUD_CONFIG_KEY: &str = "config";
pub const OPENVPN_CLIENT_CONFIG_KEY: &str = "user-cluster-client";
pub const COREFILE_KEY: &str = "Corefile";
pub const AUDIT_POLICY_KEY: &str = "policy.yaml";
pub const OPENSHIFT_MASTER_CONFIG_KEY: &str = "master-config.yaml";

fn set_configmap_data(cm: &mut corev1::ConfigMap, key: &str, value: String) {
    cm.data.get_or_insert_with(BTreeMap::new).insert(key.into(), value);
}

pub fn cloud_config_contents(data: &TemplateData) -> String {
    let CloudSpec { aws, gcp, .. } = &data.cluster().spec.cloud;
    let dc = &data.datacenter().spec;

    if let (Some(aws), Some(dc_aws)) = (aws, &dc.aws) {
        format!(
            "[global]\nZone = \"{}\"\nVPC = \"{}\"\nKubernetesClusterID = \"{}\"\nDisableSecurityGroupIngress = false\n",
            dc_aws.region,
            aws.vpc_id,
            data.cluster_name(),
        )
    } else if let (Some(gcp), Some(dc_gcp)) = (gcp, &dc.gcp) {
        let zone = dc_gcp
            .zone_suffixes
            .first()
            .map(|s| format!("{}-{s}", dc_gcp.region))
            .unwrap_or_else(|| dc_gcp.region.clone());
        format!(
            "[global]\nregional = true\nnetwork-name = \"{}\"\nsubnetwork-name = \"{}\"\nlocal-zone = \"{zone}\"\nmultizone = true\n",
            gcp.network, gcp.subnetwork,
        )
    } else {
        String::new()
    }
}

pub fn cloud_config<'a>(data: &'a TemplateData<'a>) -> NamedCreator<'a, corev1::ConfigMap> {
    NamedCreator::new(CLOUD_CONFIG_CONFIGMAP_NAME, move |mut cm: corev1::ConfigMap| {
        base_meta(data, &mut cm.metadata, CLOUD_CONFIG_CONFIGMAP_NAME);
        set_configmap_data(&mut cm, CLOUD_CONFIG_KEY, cloud_config_contents(data));
        Ok(cm)
    })
}

// Routes the user cluster's service and pod networks (and the node access network) back through
// the VPN client running in the user cluster
pub fn openvpn_client_configs<'a>(data: &'a TemplateData<'a>) -> NamedCreator<'a, corev1::ConfigMap> {
    NamedCreator::new(OPENVPN_CLIENT_CONFIGS_CONFIGMAP_NAME, move |mut cm: corev1::ConfigMap| {
        let mut networks = vec![data.services_cidr(), data.pods_cidr()];
        if !data.config().node_access_network.is_empty() {
            networks.push(data.config().node_access_network.clone());
        }

        let mut iroutes = String::new();
        for cidr in networks {
            let (network, mask) = parse_ipv4_cidr(&cidr)?;
            iroutes += &format!("iroute {network} {mask}\n");
        }

        base_meta(data, &mut cm.metadata, OPENVPN_SERVER_DEPLOYMENT_NAME);
        set_configmap_data(&mut cm, OPENVPN_CLIENT_CONFIG_KEY, iroutes);
        Ok(cm)
    })
}

pub fn dns_resolver<'a>(data: &'a TemplateData<'a>) -> NamedCreator<'a, corev1::ConfigMap> {
    NamedCreator::new(DNS_RESOLVER_CONFIGMAP_NAME, move |mut cm: corev1::ConfigMap| {
        let corefile = format!(
            "{domain} {{\n    forward . {resolver}\n    errors\n}}\n. {{\n    forward . /etc/resolv.conf\n    errors\n    health\n    prometheus 0.0.0.0:9253\n}}\n",
            domain = data.dns_domain(),
            resolver = data.dns_resolver_ip()?,
        );

        base_meta(data, &mut cm.metadata, DNS_RESOLVER_DEPLOYMENT_NAME);
        set_configmap_data(&mut cm, COREFILE_KEY, corefile);
        Ok(cm)
    })
}

pub fn audit_config<'a>(data: &'a TemplateData<'a>) -> NamedCreator<'a, corev1::ConfigMap> {
    NamedCreator::new(AUDIT_CONFIGMAP_NAME, move |mut cm: corev1::ConfigMap| {
        base_meta(data, &mut cm.metadata, APISERVER_DEPLOYMENT_NAME);

        // Users may tune the audit policy; only fill it in if nothing is there yet
        let existing = cm.data.as_ref().and_then(|d| d.get(AUDIT_POLICY_KEY)).is_some();
        if !existing {
            let policy = json!({
                "apiVersion": "audit.k8s.io/v1",
                "kind": "Policy",
                "rules": [{ "level": "Metadata" }],
            });
            set_configmap_data(&mut cm, AUDIT_POLICY_KEY, serde_yaml::to_string(&policy)?);
        }
        Ok(cm)
    })
}

pub fn openshift_apiserver_config<'a>(data: &'a TemplateData<'a>) -> NamedCreator<'a, corev1::ConfigMap> {
    NamedCreator::new(OPENSHIFT_APISERVER_CONFIGMAP_NAME, move |mut cm: corev1::ConfigMap| {
        let external_name = data.address().external_name;
        ensure!(!external_name.is_empty(), "cluster has no external name yet");

        let config = json!({
            "apiVersion": "openshiftcontrolplane.config.openshift.io/v1",
            "kind": "OpenShiftAPIServerConfig",
            "corsAllowedOrigins": [
                "//127\\.0\\.0\\.1(:|$)",
                "//localhost(:|$)",
                format!("//{}(:|$)", external_name.replace('.', "\\.")),
            ],
            "kubeClientConfig": { "kubeConfig": "/etc/origin/master/kubeconfig/kubeconfig" },
            "servingInfo": {
                "bindAddress": "0.0.0.0:8443",
                "certFile": "/var/run/secrets/serving-cert/tls.crt",
                "keyFile": "/var/run/secrets/serving-cert/tls.key",
            },
            "storageConfig": {
                "urls": [format!("https://{ETCD_SERVICE_NAME}.{}.svc.cluster.local.:2379", data.namespace())],
            },
        });

        base_meta(data, &mut cm.metadata, APISERVER_DEPLOYMENT_NAME);
        set_configmap_data(&mut cm, OPENSHIFT_MASTER_CONFIG_KEY, serde_yaml::to_string(&config)?);
        Ok(cm)
    })
}

pub fn common_configmaps<'a>(data: &'a TemplateData<'a>) -> Vec<NamedCreator<'a, corev1::ConfigMap>> {
    vec![cloud_config(data), openvpn_client_configs(data), dns_resolver(data), audit_config(data)]
}
