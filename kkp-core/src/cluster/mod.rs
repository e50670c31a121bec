use kkp_api::v1::{
    ClusterCondition,
    ExtendedClusterHealth,
};
use serde_json::{
    self as json,
    json,
};
use tracing::*;

use crate::errors::*;
use crate::jsonutils::{
    is_empty_patch,
    merge_patch_diff,
};
use crate::k8s::{
    ClusterSubresource,
    KubernetesError,
    is_conflict,
};
use crate::prelude::*;

err_impl! {ClusterUpdateError,
    #[error("cluster {0} was modified concurrently too many times")]
    TooManyConflicts(String),
}

// A single change to a Cluster object.  Mutations are plain values so that they can be re-applied
// to a freshly-fetched copy of the cluster when a write conflicts.
#[derive(Clone, Debug, PartialEq)]
pub enum ClusterMutation {
    SetNamespaceName(String),
    SetExternalName(String),
    SetInternalName(String),
    SetIp(String),
    SetPort(i32),
    SetUrl(String),
    SetAdminToken(String),
    SetExtendedHealth(ExtendedClusterHealth),
    SetCondition(ClusterCondition),
    AddFinalizers(Vec<String>),
    RemoveFinalizers(Vec<String>),

    // Only fills in fields that are empty
    SetNetworkDefaults {
        services_cidr: String,
        pods_cidr: String,
        dns_domain: String,
    },
}

impl ClusterMutation {
    pub fn apply(&self, cluster: &mut Cluster) {
        match self {
            ClusterMutation::SetNamespaceName(ns) => status(cluster).namespace_name = ns.clone(),
            ClusterMutation::SetExternalName(n) => status(cluster).address.external_name = n.clone(),
            ClusterMutation::SetInternalName(n) => status(cluster).address.internal_name = n.clone(),
            ClusterMutation::SetIp(ip) => status(cluster).address.ip = ip.clone(),
            ClusterMutation::SetPort(port) => status(cluster).address.port = *port,
            ClusterMutation::SetUrl(url) => status(cluster).address.url = url.clone(),
            ClusterMutation::SetAdminToken(token) => status(cluster).address.admin_token = token.clone(),
            ClusterMutation::SetExtendedHealth(health) => status(cluster).extended_health = health.clone(),
            ClusterMutation::SetCondition(cond) => {
                status(cluster).set_condition(cond.clone());
            },
            ClusterMutation::AddFinalizers(finalizers) => {
                let existing = cluster.metadata.finalizers.get_or_insert_with(Vec::new);
                for f in finalizers {
                    if !existing.contains(f) {
                        existing.push(f.clone());
                    }
                }
            },
            ClusterMutation::RemoveFinalizers(finalizers) => {
                if let Some(existing) = cluster.metadata.finalizers.as_mut() {
                    existing.retain(|f| !finalizers.contains(f));
                }
            },
            ClusterMutation::SetNetworkDefaults { services_cidr, pods_cidr, dns_domain } => {
                let network = &mut cluster.spec.cluster_network;
                if network.services.cidr_blocks.is_empty() {
                    network.services.cidr_blocks = vec![services_cidr.clone()];
                }
                if network.pods.cidr_blocks.is_empty() {
                    network.pods.cidr_blocks = vec![pods_cidr.clone()];
                }
                if network.dns_domain.is_empty() {
                    network.dns_domain = dns_domain.clone();
                }
            },
        }
    }
}

fn status(cluster: &mut Cluster) -> &mut kkp_api::v1::ClusterStatus {
    cluster.status.get_or_insert_default()
}

// Apply the mutations to the cluster and write the result back as merge patches against the
// pre-mutation snapshot, pinned to the snapshot's resourceVersion.  On a conflict the cluster is
// re-read and the same mutations are applied again.  On success `cluster` holds the updated object.
pub async fn update_cluster<C: ObjectClient>(
    client: &C,
    cluster: &mut Cluster,
    mutations: &[ClusterMutation],
) -> EmptyResult {
    let name = cluster.name_any();
    for attempt in 1..=CLUSTER_UPDATE_RETRIES {
        match try_update_cluster(client, cluster, mutations).await {
            Ok(updated) => {
                *cluster = updated;
                return Ok(());
            },
            Err(err) if is_conflict(&err) => {
                debug!("conflict updating cluster {name} (attempt {attempt}/{CLUSTER_UPDATE_RETRIES}), refetching");
                *cluster = client
                    .get_cluster(&name)
                    .await?
                    .ok_or_else(|| KubernetesError::cluster_not_found(&name))?;
            },
            Err(err) => return Err(err),
        }
    }

    Err(ClusterUpdateError::too_many_conflicts(&name))
}

async fn try_update_cluster<C: ObjectClient>(
    client: &C,
    cluster: &Cluster,
    mutations: &[ClusterMutation],
) -> anyhow::Result<Cluster> {
    let mut updated = cluster.clone();
    for m in mutations {
        m.apply(&mut updated);
    }

    let mut patch = merge_patch_diff(&json::to_value(cluster)?, &json::to_value(&updated)?);
    if is_empty_patch(&patch) {
        return Ok(updated);
    }

    let name = cluster.name_any();
    let status_patch = patch.as_object_mut().and_then(|p| p.remove("status"));
    let mut current = cluster.clone();

    if !is_empty_patch(&patch) {
        pin_resource_version(&mut patch, &current);
        debug!("patching cluster {name}: {patch}");
        current = client.patch_cluster(&name, &patch, ClusterSubresource::Main).await?;
    }

    if let Some(status_patch) = status_patch {
        let mut patch = json!({ "status": status_patch });
        pin_resource_version(&mut patch, &current);
        debug!("patching cluster {name} status: {patch}");
        current = client.patch_cluster(&name, &patch, ClusterSubresource::Status).await?;
    }

    Ok(current)
}

fn pin_resource_version(patch: &mut json::Value, cluster: &Cluster) {
    if let (Some(p), Some(rv)) = (patch.as_object_mut(), cluster.resource_version()) {
        let meta = p.entry("metadata").or_insert_with(|| json!({}));
        if let Some(meta) = meta.as_object_mut() {
            meta.insert("resourceVersion".into(), json::Value::String(rv));
        }
    }
}

#[cfg(test)]
mod tests;
