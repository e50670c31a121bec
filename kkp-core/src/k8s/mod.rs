mod client;
mod util;

#[cfg(any(test, feature = "testutils"))]
pub mod testutils;

use std::fmt::Debug;

use async_trait::async_trait;
pub use client::KubeObjectClient;
use k8s_openapi::NamespaceResourceScope;
use kube::Resource;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json as json;
pub use util::*;

use crate::errors::*;
use crate::prelude::*;

err_impl! {KubernetesError,
    #[error("object has no uid: {0}")]
    MissingUid(String),

    #[error("cluster {0} not found")]
    ClusterNotFound(String),
}

// Everything the reconciler manages inside a cluster's control plane namespace
pub trait NamespacedObject:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + Default
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<T> NamespacedObject for T where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + Debug
        + Default
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ClusterSubresource {
    Main,
    Status,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EventKind {
    Normal,
    Warning,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClusterEvent {
    pub kind: EventKind,
    pub reason: String,
    pub note: String,
}

impl ClusterEvent {
    pub fn warning(reason: &str, note: impl Into<String>) -> ClusterEvent {
        ClusterEvent { kind: EventKind::Warning, reason: reason.into(), note: note.into() }
    }
}

// The set of seed-cluster API verbs the reconciler needs.  Errors from the API are passed through
// untouched so callers can inspect them with is_not_found/is_conflict.
#[async_trait]
pub trait ObjectClient: Send + Sync {
    async fn get<K: NamespacedObject>(&self, ns: &str, name: &str) -> anyhow::Result<Option<K>>;
    async fn create<K: NamespacedObject>(&self, ns: &str, obj: &K) -> anyhow::Result<K>;
    async fn replace<K: NamespacedObject>(&self, ns: &str, obj: &K) -> anyhow::Result<K>;
    async fn delete<K: NamespacedObject>(&self, ns: &str, name: &str) -> EmptyResult;

    async fn get_namespace(&self, name: &str) -> anyhow::Result<Option<corev1::Namespace>>;
    async fn create_namespace(&self, ns: &corev1::Namespace) -> EmptyResult;
    async fn delete_namespace(&self, name: &str) -> EmptyResult;

    async fn get_cluster(&self, name: &str) -> anyhow::Result<Option<Cluster>>;
    async fn list_clusters(&self) -> anyhow::Result<Vec<Cluster>>;
    async fn patch_cluster(
        &self,
        name: &str,
        patch: &json::Value,
        subresource: ClusterSubresource,
    ) -> anyhow::Result<Cluster>;

    async fn publish_event(&self, cluster: &Cluster, event: &ClusterEvent) -> EmptyResult;
}

#[cfg(test)]
mod tests;
