use std::fs;
use std::str::FromStr;

use anyhow::Context;
use kkp_core::errors::*;

use crate::Options;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FeatureGates {
    pub vpa: bool,
    pub etcd_data_corruption_checks: bool,
    pub kubernetes_oidc_authentication: bool,
}

// Parses "VPA=true,EtcdDataCorruptionChecks=false"; gates that aren't listed stay disabled
impl FromStr for FeatureGates {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<FeatureGates> {
        let mut gates = FeatureGates::default();
        for entry in s.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let Some((name, value)) = entry.split_once('=') else {
                bail!("malformed feature gate {entry:?}, expected Name=bool");
            };
            let enabled: bool = value
                .trim()
                .parse()
                .with_context(|| format!("invalid value for feature gate {name}: {value:?}"))?;
            match name.trim() {
                "VPA" => gates.vpa = enabled,
                "EtcdDataCorruptionChecks" => gates.etcd_data_corruption_checks = enabled,
                "KubernetesOIDCAuthentication" => gates.kubernetes_oidc_authentication = enabled,
                other => bail!("unknown feature gate {other}"),
            }
        }
        Ok(gates)
    }
}

#[derive(Clone, Debug, Default)]
pub struct OidcConfig {
    pub issuer_url: String,
    pub client_id: String,
    pub ca: Option<String>,
}

// Everything the reconciler needs to know about its environment, resolved once at startup
#[derive(Clone, Debug, Default)]
pub struct ControllerConfig {
    pub seed_name: String,
    pub namespace: String,
    pub worker_name: String,
    pub external_url: String,
    pub overwrite_registry: String,
    pub node_port_range: String,
    pub node_access_network: String,
    pub etcd_disk_size: String,
    pub docker_pull_config_json: Option<Vec<u8>>,
    pub ca_bundle: Option<Vec<u8>>,
    pub oidc: OidcConfig,
    pub kubermatic_image: String,
    pub dnat_controller_image: String,
    pub feature_gates: FeatureGates,
    pub concurrent_cluster_updates: usize,
}

impl ControllerConfig {
    pub fn from_options(opts: &Options) -> anyhow::Result<ControllerConfig> {
        ensure!(!opts.seed_name.is_empty(), "--seed-name is required");
        ensure!(!opts.external_url.is_empty(), "--external-url is required");
        ensure!(opts.concurrent_cluster_updates > 0, "--concurrent-cluster-updates must be positive");

        Ok(ControllerConfig {
            seed_name: opts.seed_name.clone(),
            namespace: opts.namespace.clone(),
            worker_name: opts.worker_name.clone(),
            external_url: opts.external_url.clone(),
            overwrite_registry: opts.overwrite_registry.clone(),
            node_port_range: opts.node_port_range.clone(),
            node_access_network: opts.node_access_network.clone(),
            etcd_disk_size: opts.etcd_disk_size.clone(),
            docker_pull_config_json: read_optional(opts.docker_pull_config_json_file.as_deref())?,
            ca_bundle: read_optional(opts.ca_bundle_file.as_deref())?,
            oidc: OidcConfig {
                issuer_url: opts.oidc_issuer_url.clone(),
                client_id: opts.oidc_issuer_client_id.clone(),
                ca: read_optional(opts.oidc_ca_file.as_deref())?
                    .map(String::from_utf8)
                    .transpose()?,
            },
            kubermatic_image: opts.kubermatic_image.clone(),
            dnat_controller_image: opts.dnat_controller_image.clone(),
            feature_gates: opts.feature_gates,
            concurrent_cluster_updates: opts.concurrent_cluster_updates,
        })
    }
}

fn read_optional(path: Option<&str>) -> anyhow::Result<Option<Vec<u8>>> {
    match path {
        None | Some("") => Ok(None),
        Some(p) => Ok(Some(fs::read(p).with_context(|| format!("could not read {p}"))?)),
    }
}
