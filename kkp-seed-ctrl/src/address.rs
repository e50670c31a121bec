use std::collections::BTreeSet;
use std::net::IpAddr;

use anyhow::Context;
use async_trait::async_trait;
use kkp_api::v1::ExposeStrategy;
use kkp_core::cluster::ClusterMutation;
use kkp_core::errors::*;
use kkp_core::prelude::*;
#[cfg(test)]
use mockall::automock;
use tracing::*;

use crate::resources::names::*;
use crate::resources::tokens::generate_token;

err_impl! {AddressError,
    #[error("service {0} not found")]
    ServiceNotFound(String),

    #[error("no ipv4 address found for {0}")]
    NoIpv4Address(String),

    #[error("service {0} has no ports")]
    NoPorts(String),

    #[error("service {0} has no node port allocated")]
    NoNodePort(String),

    #[error("service {0} is neither of type NodePort nor LoadBalancer")]
    UnexpectedServiceType(String),
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn lookup(&self, host: &str) -> anyhow::Result<Vec<IpAddr>>;
}

pub struct SystemResolver;

#[async_trait]
impl Resolver for SystemResolver {
    async fn lookup(&self, host: &str) -> anyhow::Result<Vec<IpAddr>> {
        let addrs = tokio::net::lookup_host((host, 0))
            .await
            .with_context(|| format!("failed to resolve {host}"))?;
        Ok(addrs.map(|a| a.ip()).collect())
    }
}

// The external IP of a NodePort cluster is whatever its DNS name resolves to.  If there are
// several IPv4 addresses, the lexicographically first one wins so that the choice is at least stable.
async fn external_ip(resolver: &dyn Resolver, host: &str) -> anyhow::Result<String> {
    let ips: BTreeSet<String> = resolver
        .lookup(host)
        .await?
        .into_iter()
        .filter_map(|ip| match ip {
            IpAddr::V4(v4) => Some(v4.to_string()),
            IpAddr::V6(_) => None,
        })
        .collect();

    ips.into_iter().next().ok_or_else(|| AddressError::no_ipv4_address(host))
}

// Empty until the cloud provider has assigned the load balancer an address
async fn load_balancer_ip<C: ObjectClient>(client: &C, ns: &str) -> anyhow::Result<String> {
    let svc = client
        .get::<corev1::Service>(ns, FRONT_LOADBALANCER_SERVICE_NAME)
        .await?
        .ok_or_else(|| AddressError::service_not_found(&format!("{ns}/{FRONT_LOADBALANCER_SERVICE_NAME}")))?;

    let ingress_ip = svc
        .status
        .as_ref()
        .and_then(|s| s.load_balancer.as_ref())
        .and_then(|lb| lb.ingress.as_ref())
        .and_then(|ingress| ingress.iter().find_map(|i| i.ip.clone().filter(|ip| !ip.is_empty())));
    let spec_ip = svc
        .spec
        .as_ref()
        .and_then(|s| s.load_balancer_ip.clone())
        .filter(|ip| !ip.is_empty());

    Ok(ingress_ip.or(spec_ip).unwrap_or_default())
}

async fn apiserver_port<C: ObjectClient>(client: &C, ns: &str) -> anyhow::Result<i32> {
    let svc_name = format!("{ns}/{APISERVER_EXTERNAL_SERVICE_NAME}");
    let svc = client
        .get::<corev1::Service>(ns, APISERVER_EXTERNAL_SERVICE_NAME)
        .await?
        .ok_or_else(|| AddressError::service_not_found(&svc_name))?;
    let spec = svc.spec.unwrap_or_default();

    match spec.type_.as_deref() {
        Some("NodePort" | "LoadBalancer") => (),
        _ => return Err(AddressError::unexpected_service_type(&svc_name)),
    }

    let port = spec
        .ports
        .unwrap_or_default()
        .into_iter()
        .next()
        .ok_or_else(|| AddressError::no_ports(&svc_name))?;
    port.node_port.ok_or_else(|| AddressError::no_node_port(&svc_name))
}

fn url_for(host: &str, port: i32) -> String {
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V6(_)) => format!("https://[{host}]:{port}"),
        _ => format!("https://{host}:{port}"),
    }
}

// Work out where the cluster's apiserver can be reached and return the mutations needed to record
// that on the cluster.  Only fields that actually changed produce a mutation.
pub async fn sync_cluster_address<C: ObjectClient>(
    client: &C,
    resolver: &dyn Resolver,
    cluster: &Cluster,
    seed: &Seed,
    external_url: &str,
) -> anyhow::Result<Vec<ClusterMutation>> {
    let ns = cluster.namespace_name();
    let current = cluster.address();
    let mut mutations = vec![];

    let (external_name, ip) = match cluster.spec.expose_strategy {
        ExposeStrategy::LoadBalancer => {
            let ip = load_balancer_ip(client, ns).await?;
            if ip.is_empty() {
                info!("front load balancer has no address yet");
            }
            (ip.clone(), ip)
        },
        ExposeStrategy::NodePort => {
            let name = format!("{}.{}.{external_url}", cluster.name_any(), seed.dns_subdomain());
            let ip = external_ip(resolver, &name).await?;
            (name, ip)
        },
    };

    if current.external_name != external_name {
        info!("external name changed from {:?} to {external_name:?}", current.external_name);
        mutations.push(ClusterMutation::SetExternalName(external_name.clone()));
    }

    let internal_name = format!("{APISERVER_EXTERNAL_SERVICE_NAME}.{ns}.svc.cluster.local.");
    if current.internal_name != internal_name {
        mutations.push(ClusterMutation::SetInternalName(internal_name));
    }

    if current.ip != ip {
        info!("external ip changed from {:?} to {ip:?}", current.ip);
        mutations.push(ClusterMutation::SetIp(ip));
    }

    let port = apiserver_port(client, ns).await?;
    if current.port != port {
        mutations.push(ClusterMutation::SetPort(port));
    }

    let url = if external_name.is_empty() { String::new() } else { url_for(&external_name, port) };
    if current.url != url {
        info!("apiserver url changed from {:?} to {url:?}", current.url);
        mutations.push(ClusterMutation::SetUrl(url));
    }

    if current.admin_token.is_empty() {
        info!("generating admin token");
        mutations.push(ClusterMutation::SetAdminToken(generate_token()));
    }

    Ok(mutations)
}

#[cfg(test)]
mod tests;
