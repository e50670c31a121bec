// Partial definition of the upstream VerticalPodAutoscaler CRD, covering only the fields we set
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{
    Deserialize,
    Serialize,
};

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
pub enum VerticalPodAutoscalerUpdateMode {
    Off,
    Initial,
    Recreate,
    #[default]
    Auto,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossVersionObjectReference {
    pub api_version: String,
    pub kind: String,
    pub name: String,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerticalPodAutoscalerUpdatePolicy {
    pub update_mode: Option<VerticalPodAutoscalerUpdateMode>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerticalPodAutoscalerContainerPolicy {
    pub container_name: String,
    pub min_allowed: Option<std::collections::BTreeMap<String, String>>,
    pub max_allowed: Option<std::collections::BTreeMap<String, String>>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerticalPodAutoscalerResourcePolicy {
    pub container_policies: Vec<VerticalPodAutoscalerContainerPolicy>,
}

#[derive(Clone, CustomResource, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[kube(group = "autoscaling.k8s.io", version = "v1", kind = "VerticalPodAutoscaler", namespaced)]
#[kube(shortname = "vpa")]
#[serde(rename_all = "camelCase")]
pub struct VerticalPodAutoscalerSpec {
    pub target_ref: CrossVersionObjectReference,
    pub update_policy: Option<VerticalPodAutoscalerUpdatePolicy>,
    pub resource_policy: Option<VerticalPodAutoscalerResourcePolicy>,
}

impl Default for VerticalPodAutoscaler {
    fn default() -> Self {
        Self {
            metadata: Default::default(),
            spec: VerticalPodAutoscalerSpec::default(),
        }
    }
}
