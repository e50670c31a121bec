use async_trait::async_trait;
use kkp_core::errors::*;
use kkp_core::prelude::*;
use kube::api::ListParams;
use kube::config::{
    KubeConfigOptions,
    Kubeconfig,
};
#[cfg(test)]
use mockall::automock;
use tracing::*;

use crate::resources::names::*;

// Connects to a user cluster (not the seed) given its admin kubeconfig
#[cfg_attr(test, automock)]
#[async_trait]
pub trait UserClusterConnectionProvider: Send + Sync {
    async fn ping(&self, kubeconfig: &str) -> EmptyResult;
}

pub struct KubeconfigConnectionProvider;

#[async_trait]
impl UserClusterConnectionProvider for KubeconfigConnectionProvider {
    // Listing namespaces is about the cheapest call that proves the apiserver accepts traffic
    async fn ping(&self, kubeconfig: &str) -> EmptyResult {
        let kc = Kubeconfig::from_yaml(kubeconfig)?;
        let config = kube::Config::from_custom_kubeconfig(kc, &KubeConfigOptions::default()).await?;
        let client = kube::Client::try_from(config)?;
        let ns_api = kube::Api::<corev1::Namespace>::all(client);
        ns_api.list(&ListParams::default().limit(1)).await?;
        Ok(())
    }
}

async fn admin_kubeconfig<C: ObjectClient>(client: &C, cluster: &Cluster) -> anyhow::Result<String> {
    let ns = cluster.namespace_name();
    let secret = client
        .get::<corev1::Secret>(ns, ADMIN_KUBECONFIG_SECRET_NAME)
        .await?
        .ok_or_else(|| anyhow!("secret {ns}/{ADMIN_KUBECONFIG_SECRET_NAME} not found"))?;
    let data = secret
        .data
        .and_then(|mut d| d.remove(KUBECONFIG_SECRET_KEY))
        .ok_or_else(|| anyhow!("secret {ns}/{ADMIN_KUBECONFIG_SECRET_NAME} has no {KUBECONFIG_SECRET_KEY} key"))?;
    Ok(String::from_utf8(data.0)?)
}

// Any failure just means "not reachable yet"
pub async fn cluster_reachable<C: ObjectClient>(
    client: &C,
    provider: &dyn UserClusterConnectionProvider,
    cluster: &Cluster,
) -> bool {
    let res = match admin_kubeconfig(client, cluster).await {
        Ok(kc) => provider.ping(&kc).await,
        Err(err) => Err(err),
    };

    match res {
        Ok(()) => true,
        Err(err) => {
            debug!("user cluster not reachable yet: {err}");
            false
        },
    }
}
