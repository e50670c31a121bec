// In-memory implementation of the ObjectClient, with just enough apiserver semantics (resource
// versions, conflicts, merge patches, namespace garbage collection) to drive whole reconcile
// passes in tests.
use std::collections::{
    BTreeMap,
    BTreeSet,
};
use std::sync::Mutex;

use async_trait::async_trait;
use kube::Resource;
use kube::error::ErrorResponse;
use serde_json as json;

use super::*;
use crate::errors::*;
use crate::jsonutils::apply_merge_patch;
use crate::prelude::*;

type ObjectKey = (String, String, String);

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FakeWrite {
    Create(String, String, String),
    Replace(String, String, String),
    Delete(String, String, String),
    CreateNamespace(String),
    DeleteNamespace(String),
    PatchCluster(String, ClusterSubresource),
}

impl FakeWrite {
    pub fn kind(&self) -> &str {
        match self {
            FakeWrite::Create(k, ..) | FakeWrite::Replace(k, ..) | FakeWrite::Delete(k, ..) => k,
            FakeWrite::CreateNamespace(_) | FakeWrite::DeleteNamespace(_) => "Namespace",
            FakeWrite::PatchCluster(..) => "Cluster",
        }
    }
}

#[derive(Default)]
struct FakeState {
    objects: BTreeMap<ObjectKey, json::Value>,
    namespaces: BTreeMap<String, corev1::Namespace>,
    clusters: BTreeMap<String, Cluster>,
    writes: Vec<FakeWrite>,
    events: Vec<ClusterEvent>,
    next_rv: u64,
    pending_conflicts: usize,
    failing_kinds: BTreeSet<String>,
    cluster_list_error: bool,
}

impl FakeState {
    fn bump(&mut self) -> String {
        self.next_rv += 1;
        self.next_rv.to_string()
    }
}

#[derive(Default)]
pub struct FakeObjectClient {
    state: Mutex<FakeState>,
}

pub fn fake_api_error(code: u16, reason: &str, message: &str) -> anyhow::Error {
    anyhow::Error::new(kube::Error::Api(ErrorResponse {
        status: "Failure".into(),
        message: message.into(),
        reason: reason.into(),
        code,
    }))
}

fn key<K: NamespacedObject>(ns: &str, name: &str) -> ObjectKey {
    (K::kind(&()).to_string(), ns.into(), name.into())
}

fn stamp(meta: &mut metav1::ObjectMeta, rv: String) {
    if meta.uid.is_none() {
        meta.uid = Some(format!("uid-{rv}"));
    }
    meta.resource_version = Some(rv);
}

impl FakeObjectClient {
    pub fn new() -> FakeObjectClient {
        FakeObjectClient::default()
    }

    pub fn with_cluster(self, mut cluster: Cluster) -> FakeObjectClient {
        {
            let mut state = self.state.lock().unwrap();
            let rv = state.bump();
            stamp(&mut cluster.metadata, rv);
            state.clusters.insert(cluster.name_any(), cluster);
        }
        self
    }

    // Seed an object directly, bypassing the write log
    pub fn insert<K: NamespacedObject>(&self, mut obj: K) {
        let mut state = self.state.lock().unwrap();
        let rv = state.bump();
        stamp(obj.meta_mut(), rv);
        let ns = obj.namespace().unwrap_or_default();
        state
            .objects
            .insert(key::<K>(&ns, &obj.name_any()), json::to_value(&obj).unwrap());
    }

    pub fn insert_namespace(&self, name: &str) {
        let mut state = self.state.lock().unwrap();
        let ns = corev1::Namespace {
            metadata: metav1::ObjectMeta { name: Some(name.into()), ..Default::default() },
            ..Default::default()
        };
        state.namespaces.insert(name.into(), ns);
    }

    pub fn object<K: NamespacedObject>(&self, ns: &str, name: &str) -> Option<K> {
        let state = self.state.lock().unwrap();
        state
            .objects
            .get(&key::<K>(ns, name))
            .map(|v| json::from_value(v.clone()).unwrap())
    }

    pub fn objects<K: NamespacedObject>(&self, ns: &str) -> Vec<K> {
        let state = self.state.lock().unwrap();
        state
            .objects
            .iter()
            .filter(|((kind, obj_ns, _), _)| kind == K::kind(&()).as_ref() && obj_ns == ns)
            .map(|(_, v)| json::from_value(v.clone()).unwrap())
            .collect()
    }

    pub fn has_namespace(&self, name: &str) -> bool {
        self.state.lock().unwrap().namespaces.contains_key(name)
    }

    pub fn cluster(&self, name: &str) -> Cluster {
        self.state.lock().unwrap().clusters[name].clone()
    }

    pub fn set_cluster(&self, mut cluster: Cluster) {
        let mut state = self.state.lock().unwrap();
        let rv = state.bump();
        stamp(&mut cluster.metadata, rv);
        state.clusters.insert(cluster.name_any(), cluster);
    }

    pub fn writes(&self) -> Vec<FakeWrite> {
        self.state.lock().unwrap().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.state.lock().unwrap().writes.clear();
    }

    pub fn events(&self) -> Vec<ClusterEvent> {
        self.state.lock().unwrap().events.clone()
    }

    // The next n cluster patches fail with a conflict, as if someone else wrote the cluster first
    pub fn inject_conflicts(&self, n: usize) {
        self.state.lock().unwrap().pending_conflicts = n;
    }

    // Every write to an object of this kind fails with an internal error
    pub fn fail_writes_for(&self, kind: &str) {
        self.state.lock().unwrap().failing_kinds.insert(kind.into());
    }

    pub fn fail_cluster_list(&self) {
        self.state.lock().unwrap().cluster_list_error = true;
    }

    fn check_failing(&self, state: &FakeState, kind: &str) -> EmptyResult {
        if state.failing_kinds.contains(kind) {
            return Err(fake_api_error(500, "InternalError", &format!("injected failure for {kind}")));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectClient for FakeObjectClient {
    async fn get<K: NamespacedObject>(&self, ns: &str, name: &str) -> anyhow::Result<Option<K>> {
        Ok(self.object(ns, name))
    }

    async fn create<K: NamespacedObject>(&self, ns: &str, obj: &K) -> anyhow::Result<K> {
        let mut state = self.state.lock().unwrap();
        let kind = K::kind(&()).to_string();
        self.check_failing(&state, &kind)?;

        let name = obj.name_any();
        let k = key::<K>(ns, &name);
        if state.objects.contains_key(&k) {
            return Err(fake_api_error(409, "AlreadyExists", &format!("{kind} {ns}/{name} already exists")));
        }
        if obj.meta().resource_version.is_some() {
            return Err(fake_api_error(400, "BadRequest", "resourceVersion should not be set on objects to be created"));
        }

        let mut created = obj.clone();
        created.meta_mut().namespace = Some(ns.into());
        let rv = state.bump();
        stamp(created.meta_mut(), rv);
        state.objects.insert(k, json::to_value(&created)?);
        state.writes.push(FakeWrite::Create(kind, ns.into(), name));
        Ok(created)
    }

    async fn replace<K: NamespacedObject>(&self, ns: &str, obj: &K) -> anyhow::Result<K> {
        let mut state = self.state.lock().unwrap();
        let kind = K::kind(&()).to_string();
        self.check_failing(&state, &kind)?;

        let name = obj.name_any();
        let k = key::<K>(ns, &name);
        let Some(stored) = state.objects.get(&k) else {
            return Err(fake_api_error(404, "NotFound", &format!("{kind} {ns}/{name} not found")));
        };
        let stored_rv = stored["metadata"]["resourceVersion"].as_str().map(String::from);
        if obj.meta().resource_version.is_some() && obj.meta().resource_version != stored_rv {
            return Err(fake_api_error(409, "Conflict", "the object has been modified"));
        }

        let mut replaced = obj.clone();
        let rv = state.bump();
        stamp(replaced.meta_mut(), rv);
        state.objects.insert(k, json::to_value(&replaced)?);
        state.writes.push(FakeWrite::Replace(kind, ns.into(), name));
        Ok(replaced)
    }

    async fn delete<K: NamespacedObject>(&self, ns: &str, name: &str) -> EmptyResult {
        let mut state = self.state.lock().unwrap();
        let kind = K::kind(&()).to_string();
        self.check_failing(&state, &kind)?;

        if state.objects.remove(&key::<K>(ns, name)).is_none() {
            return Err(fake_api_error(404, "NotFound", &format!("{kind} {ns}/{name} not found")));
        }
        state.writes.push(FakeWrite::Delete(kind, ns.into(), name.into()));
        Ok(())
    }

    async fn get_namespace(&self, name: &str) -> anyhow::Result<Option<corev1::Namespace>> {
        Ok(self.state.lock().unwrap().namespaces.get(name).cloned())
    }

    async fn create_namespace(&self, ns: &corev1::Namespace) -> EmptyResult {
        let mut state = self.state.lock().unwrap();
        self.check_failing(&state, "Namespace")?;

        let name = ns.name_any();
        if state.namespaces.contains_key(&name) {
            return Err(fake_api_error(409, "AlreadyExists", &format!("namespace {name} already exists")));
        }
        state.namespaces.insert(name.clone(), ns.clone());
        state.writes.push(FakeWrite::CreateNamespace(name));
        Ok(())
    }

    async fn delete_namespace(&self, name: &str) -> EmptyResult {
        let mut state = self.state.lock().unwrap();
        if state.namespaces.remove(name).is_some() {
            // deleting a namespace takes everything in it along
            state.objects.retain(|(_, ns, _), _| ns != name);
            state.writes.push(FakeWrite::DeleteNamespace(name.into()));
        }
        Ok(())
    }

    async fn get_cluster(&self, name: &str) -> anyhow::Result<Option<Cluster>> {
        Ok(self.state.lock().unwrap().clusters.get(name).cloned())
    }

    async fn list_clusters(&self) -> anyhow::Result<Vec<Cluster>> {
        let state = self.state.lock().unwrap();
        if state.cluster_list_error {
            return Err(fake_api_error(500, "InternalError", "injected cluster list failure"));
        }
        Ok(state.clusters.values().cloned().collect())
    }

    async fn patch_cluster(
        &self,
        name: &str,
        patch: &json::Value,
        subresource: ClusterSubresource,
    ) -> anyhow::Result<Cluster> {
        let mut state = self.state.lock().unwrap();
        let Some(stored) = state.clusters.get(name).cloned() else {
            return Err(fake_api_error(404, "NotFound", &format!("cluster {name} not found")));
        };

        if state.pending_conflicts > 0 {
            state.pending_conflicts -= 1;
            let rv = state.bump();
            if let Some(c) = state.clusters.get_mut(name) {
                c.metadata.resource_version = Some(rv);
            }
            return Err(fake_api_error(409, "Conflict", "the object has been modified"));
        }

        let patch_rv = patch.pointer("/metadata/resourceVersion").and_then(|v| v.as_str());
        if patch_rv.is_some() && patch_rv != stored.metadata.resource_version.as_deref() {
            return Err(fake_api_error(409, "Conflict", "the object has been modified"));
        }

        // The main resource ignores status, and the status subresource ignores everything else
        let mut patch = patch.clone();
        if let Some(p) = patch.as_object_mut() {
            match subresource {
                ClusterSubresource::Main => {
                    p.remove("status");
                },
                ClusterSubresource::Status => p.retain(|k, _| k == "status"),
            }
        }

        let mut doc = json::to_value(&stored)?;
        apply_merge_patch(&mut doc, &patch);
        let mut patched: Cluster = json::from_value(doc)?;
        let rv = state.bump();
        patched.metadata.resource_version = Some(rv);
        state.clusters.insert(name.into(), patched.clone());
        state.writes.push(FakeWrite::PatchCluster(name.into(), subresource));
        Ok(patched)
    }

    async fn publish_event(&self, _cluster: &Cluster, event: &ClusterEvent) -> EmptyResult {
        self.state.lock().unwrap().events.push(event.clone());
        Ok(())
    }
}
