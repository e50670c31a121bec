pub mod configmaps;
pub mod kubeconfig;
pub mod names;
pub mod nodeport_proxy;
pub mod pdb;
pub mod rbac;
pub mod secrets;
pub mod services;
pub mod tokens;
pub mod vpa;
pub mod workloads;

use std::net::Ipv4Addr;

use anyhow::Context;
use kkp_api::v1::{
    ClusterAddress,
    Datacenter,
};
use kkp_core::errors::*;
use kkp_core::macros::*;
use kkp_core::prelude::*;

use crate::config::ControllerConfig;
use crate::errors::*;

pub const DEFAULT_QUAY_REGISTRY: &str = "quay.io";
pub const DEFAULT_GCR_REGISTRY: &str = "gcr.io";
pub const DEFAULT_K8S_REGISTRY: &str = "k8s.gcr.io";
pub const DEFAULT_DOCKER_REGISTRY: &str = "docker.io";

// Everything a manifest creator is allowed to look at.  This is rebuilt from the current cluster
// snapshot before every convergence step, so creators never see stale address or status data.
#[derive(Clone, Copy, Debug)]
pub struct TemplateData<'a> {
    cluster: &'a Cluster,
    seed: &'a Seed,
    datacenter: &'a Datacenter,
    config: &'a ControllerConfig,
    minor: u64,
}

impl<'a> TemplateData<'a> {
    pub fn new(cluster: &'a Cluster, seed: &'a Seed, config: &'a ControllerConfig) -> anyhow::Result<TemplateData<'a>> {
        let dc_name = &cluster.spec.cloud.datacenter_name;
        let datacenter = seed
            .datacenter(dc_name)
            .ok_or_else(|| ClusterControllerError::datacenter_not_found(dc_name))?;
        let minor = cluster
            .spec
            .minor_version()
            .ok_or_else(|| ClusterControllerError::malformed_version(&cluster.spec.version))?;

        Ok(TemplateData { cluster, seed, datacenter, config, minor })
    }

    pub fn cluster(&self) -> &'a Cluster {
        self.cluster
    }

    pub fn seed(&self) -> &'a Seed {
        self.seed
    }

    pub fn datacenter(&self) -> &'a Datacenter {
        self.datacenter
    }

    pub fn config(&self) -> &'a ControllerConfig {
        self.config
    }

    pub fn minor_version(&self) -> u64 {
        self.minor
    }

    pub fn namespace(&self) -> &'a str {
        self.cluster.namespace_name()
    }

    pub fn cluster_name(&self) -> String {
        self.cluster.name_any()
    }

    pub fn address(&self) -> ClusterAddress {
        self.cluster.address()
    }

    pub fn version(&self) -> &'a str {
        self.cluster.spec.version.trim_start_matches('v')
    }

    pub fn labels(&self, app: &str) -> BTreeMap<String, String> {
        kmap!(APP_LABEL_KEY => app, CLUSTER_LABEL_KEY => self.cluster.name_any())
    }

    pub fn image(&self, default_registry: &str, path: &str) -> String {
        let registry = match self.config.overwrite_registry.as_str() {
            "" => default_registry,
            r => r,
        };
        format!("{registry}/{path}")
    }

    pub fn external_url(&self) -> String {
        self.cluster.address().url
    }

    pub fn internal_url(&self) -> String {
        format!("https://{}:443", self.cluster.address().internal_name)
    }

    pub fn services_cidr(&self) -> String {
        self.cluster
            .spec
            .cluster_network
            .services
            .cidr_blocks
            .first()
            .cloned()
            .unwrap_or_else(|| DEFAULT_SERVICES_CIDR.into())
    }

    pub fn pods_cidr(&self) -> String {
        self.cluster
            .spec
            .cluster_network
            .pods
            .cidr_blocks
            .first()
            .cloned()
            .unwrap_or_else(|| DEFAULT_PODS_CIDR.into())
    }

    // By convention the resolver takes the tenth address of the first service CIDR
    pub fn dns_resolver_ip(&self) -> anyhow::Result<Ipv4Addr> {
        let (network, _) = parse_ipv4_cidr(&self.services_cidr())?;
        Ok(Ipv4Addr::from(u32::from(network) + 10))
    }

    pub fn dns_domain(&self) -> &'a str {
        match self.cluster.spec.cluster_network.dns_domain.as_str() {
            "" => DEFAULT_DNS_DOMAIN,
            d => d,
        }
    }
}

// Returns the network address (host bits cleared) and the netmask
pub fn parse_ipv4_cidr(cidr: &str) -> anyhow::Result<(Ipv4Addr, Ipv4Addr)> {
    let (addr, prefix) = cidr.split_once('/').ok_or_else(|| anyhow!("malformed CIDR {cidr:?}"))?;
    let addr: Ipv4Addr = addr.parse().with_context(|| format!("malformed CIDR {cidr:?}"))?;
    let prefix: u32 = prefix.parse().with_context(|| format!("malformed CIDR {cidr:?}"))?;
    ensure!(prefix <= 32, "malformed CIDR {cidr:?}: prefix too long");

    let mask = u32::MAX.checked_shl(32 - prefix).unwrap_or(0);
    Ok((Ipv4Addr::from(u32::from(addr) & mask), Ipv4Addr::from(mask)))
}

// Selector and pod-template labels must match exactly, so everything derives them from here
pub fn base_meta(data: &TemplateData, meta: &mut metav1::ObjectMeta, app: &str) {
    kkp_core::k8s::merge_labels(meta, data.labels(app));
}

#[cfg(test)]
mod tests;
