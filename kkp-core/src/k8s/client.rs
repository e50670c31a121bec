use async_trait::async_trait;
use kube::api::{
    DeleteParams,
    ListParams,
    Patch,
    PatchParams,
    PostParams,
};
use kube::runtime::events::{
    Event,
    EventType,
    Recorder,
    Reporter,
};
use kube::{
    Api,
    Resource,
};
use serde_json as json;

use super::*;
use crate::errors::*;
use crate::prelude::*;

const EVENT_ACTION: &str = "Reconcile";

pub struct KubeObjectClient {
    client: kube::Client,
    recorder: Recorder,
}

impl KubeObjectClient {
    pub fn new(client: kube::Client, controller_name: &str) -> KubeObjectClient {
        let reporter = Reporter { controller: controller_name.into(), instance: None };
        KubeObjectClient { recorder: Recorder::new(client.clone(), reporter), client }
    }

    pub fn client(&self) -> kube::Client {
        self.client.clone()
    }
}

#[async_trait]
impl ObjectClient for KubeObjectClient {
    async fn get<K: NamespacedObject>(&self, ns: &str, name: &str) -> anyhow::Result<Option<K>> {
        let api = Api::<K>::namespaced(self.client.clone(), ns);
        Ok(api.get_opt(name).await?)
    }

    async fn create<K: NamespacedObject>(&self, ns: &str, obj: &K) -> anyhow::Result<K> {
        let api = Api::<K>::namespaced(self.client.clone(), ns);
        Ok(api.create(&PostParams::default(), obj).await?)
    }

    async fn replace<K: NamespacedObject>(&self, ns: &str, obj: &K) -> anyhow::Result<K> {
        let api = Api::<K>::namespaced(self.client.clone(), ns);
        Ok(api.replace(&obj.name_any(), &PostParams::default(), obj).await?)
    }

    async fn delete<K: NamespacedObject>(&self, ns: &str, name: &str) -> EmptyResult {
        let api = Api::<K>::namespaced(self.client.clone(), ns);
        api.delete(name, &DeleteParams::default()).await?;
        Ok(())
    }

    async fn get_namespace(&self, name: &str) -> anyhow::Result<Option<corev1::Namespace>> {
        let api = Api::<corev1::Namespace>::all(self.client.clone());
        Ok(api.get_opt(name).await?)
    }

    async fn create_namespace(&self, ns: &corev1::Namespace) -> EmptyResult {
        let api = Api::<corev1::Namespace>::all(self.client.clone());
        api.create(&PostParams::default(), ns).await?;
        Ok(())
    }

    async fn delete_namespace(&self, name: &str) -> EmptyResult {
        let api = Api::<corev1::Namespace>::all(self.client.clone());
        match api.delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(resp)) if resp.code == 404 => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_cluster(&self, name: &str) -> anyhow::Result<Option<Cluster>> {
        let api = Api::<Cluster>::all(self.client.clone());
        Ok(api.get_opt(name).await?)
    }

    async fn list_clusters(&self) -> anyhow::Result<Vec<Cluster>> {
        let api = Api::<Cluster>::all(self.client.clone());
        Ok(api.list(&ListParams::default()).await?.items)
    }

    async fn patch_cluster(
        &self,
        name: &str,
        patch: &json::Value,
        subresource: ClusterSubresource,
    ) -> anyhow::Result<Cluster> {
        let api = Api::<Cluster>::all(self.client.clone());
        let patch = Patch::Merge(patch);
        let res = match subresource {
            ClusterSubresource::Main => api.patch(name, &PatchParams::default(), &patch).await?,
            ClusterSubresource::Status => api.patch_status(name, &PatchParams::default(), &patch).await?,
        };
        Ok(res)
    }

    async fn publish_event(&self, cluster: &Cluster, event: &ClusterEvent) -> EmptyResult {
        let type_ = match event.kind {
            EventKind::Normal => EventType::Normal,
            EventKind::Warning => EventType::Warning,
        };
        let ev = Event {
            type_,
            reason: event.reason.clone(),
            note: Some(event.note.clone()),
            action: EVENT_ACTION.into(),
            secondary: None,
        };
        self.recorder.publish(&ev, &cluster.object_ref(&())).await?;
        Ok(())
    }
}
