use std::collections::BTreeMap;

use kube::Resource;

use super::*;
use crate::errors::*;
use crate::prelude::*;

pub trait KubeResourceExt {
    fn namespaced_name(&self) -> String;
}

impl<T: Resource> KubeResourceExt for T {
    fn namespaced_name(&self) -> String {
        match self.namespace() {
            Some(ns) => format!("{}/{}", ns, self.name_any()),
            None => self.name_any().clone(),
        }
    }
}

pub fn api_error_code(err: &anyhow::Error) -> Option<u16> {
    match err.downcast_ref::<kube::Error>() {
        Some(kube::Error::Api(resp)) => Some(resp.code),
        _ => None,
    }
}

pub fn is_not_found(err: &anyhow::Error) -> bool {
    api_error_code(err) == Some(404)
}

pub fn is_conflict(err: &anyhow::Error) -> bool {
    api_error_code(err) == Some(409)
}

// Controller owner reference, so that the control plane objects are garbage collected with the
// cluster and so that watches on owned objects trigger a reconcile of the owning cluster
pub fn build_owner_reference<K>(owner: &K) -> anyhow::Result<metav1::OwnerReference>
where
    K: Resource<DynamicType = ()>,
{
    let uid = owner.uid().ok_or_else(|| KubernetesError::missing_uid(&owner.name_any()))?;
    Ok(metav1::OwnerReference {
        api_version: K::api_version(&()).into(),
        kind: K::kind(&()).into(),
        name: owner.name_any(),
        uid,
        controller: Some(true),
        block_owner_deletion: Some(true),
    })
}

// Idempotently attach an owner reference; an existing reference with the same uid is replaced
pub fn set_owner_reference(meta: &mut metav1::ObjectMeta, owner_ref: &metav1::OwnerReference) {
    let refs = meta.owner_references.get_or_insert_with(Vec::new);
    match refs.iter_mut().find(|r| r.uid == owner_ref.uid) {
        Some(r) => *r = owner_ref.clone(),
        None => refs.push(owner_ref.clone()),
    }
}

pub fn build_object_meta(namespace: &str, name: &str, labels: Option<BTreeMap<String, String>>) -> metav1::ObjectMeta {
    metav1::ObjectMeta {
        namespace: Some(namespace.into()),
        name: Some(name.into()),
        labels,
        ..Default::default()
    }
}

// Merge the given labels into the object's labels, keeping anything else that is already set
pub fn merge_labels(meta: &mut metav1::ObjectMeta, labels: BTreeMap<String, String>) {
    meta.labels.get_or_insert_with(BTreeMap::new).extend(labels);
}

pub fn cluster_namespace_name(cluster: &Cluster) -> String {
    format!("{CLUSTER_NAMESPACE_PREFIX}{}", cluster.name_any())
}
