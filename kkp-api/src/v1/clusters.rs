use clockabilly::{
    DateTime,
    Utc,
};
use kube::{
    CustomResource,
    ResourceExt,
};
use schemars::JsonSchema;
use serde::{
    Deserialize,
    Serialize,
};

pub const OPENSHIFT_ANNOTATION_KEY: &str = "kubermatic.io/openshift";
pub const CLUSTER_AUTOSCALER_ENABLED_ANNOTATION_KEY: &str = "kubermatic.io/cluster-autoscaler-enabled";
pub const WORKER_NAME_LABEL_KEY: &str = "worker-name";

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
pub enum ExposeStrategy {
    #[default]
    NodePort,
    LoadBalancer,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, JsonSchema, PartialEq, Serialize)]
pub enum HealthStatus {
    #[default]
    Down,
    Provisioning,
    Up,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl From<bool> for ConditionStatus {
    fn from(b: bool) -> ConditionStatus {
        if b { ConditionStatus::True } else { ConditionStatus::False }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
pub enum ClusterConditionType {
    #[serde(rename = "ClusterControllerReconciledSuccessfully")]
    ClusterControllerReconcilingSuccess,
    #[serde(rename = "OpenshiftControllerReconciledSuccessfully")]
    OpenshiftControllerReconcilingSuccess,
    ClusterInitialized,
    EtcdClusterInitialized,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRanges {
    #[serde(default)]
    pub cidr_blocks: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterNetworkingConfig {
    #[serde(default)]
    pub services: NetworkRanges,
    #[serde(default)]
    pub pods: NetworkRanges,
    #[serde(default)]
    pub dns_domain: String,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FakeCloudSpec {
    #[serde(default)]
    pub token: String,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsCloudSpec {
    pub access_key_id: String,
    pub secret_access_key: String,
    #[serde(default)]
    pub vpc_id: String,
    #[serde(default)]
    pub security_group_id: String,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GcpCloudSpec {
    pub service_account: String,
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub subnetwork: String,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudSpec {
    pub datacenter_name: String,
    pub fake: Option<FakeCloudSpec>,
    pub aws: Option<AwsCloudSpec>,
    pub gcp: Option<GcpCloudSpec>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenshiftSpec {
    #[serde(default)]
    pub image_pull_secret: String,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OidcSettings {
    #[serde(rename = "issuerURL")]
    pub issuer_url: String,
    #[serde(rename = "clientID")]
    pub client_id: String,
    #[serde(default)]
    pub username_claim: String,
    #[serde(default)]
    pub groups_claim: String,
}

#[derive(Clone, CustomResource, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[kube(group = "kubermatic.k8s.io", version = "v1", kind = "Cluster")]
#[kube(status = "ClusterStatus")]
#[kube(
    printcolumn = r#"{"name":"version", "type":"string", "description":"control plane version", "jsonPath":".spec.version"}"#,
    printcolumn = r#"{"name":"namespace", "type":"string", "description":"control plane namespace", "jsonPath":".status.namespaceName"}"#,
    printcolumn = r#"{"name":"url", "type":"string", "description":"external apiserver url", "jsonPath":".status.address.url"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    // Required fields
    pub cloud: CloudSpec,
    pub version: String,

    // Optional fields
    #[serde(default)]
    pub cluster_network: ClusterNetworkingConfig,
    #[serde(default)]
    pub expose_strategy: ExposeStrategy,
    #[serde(default)]
    pub human_readable_name: String,
    #[serde(default)]
    pub pause: bool,
    pub oidc: Option<OidcSettings>,
    pub openshift: Option<OpenshiftSpec>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterAddress {
    #[serde(default)]
    pub external_name: String,
    #[serde(default)]
    pub internal_name: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub port: i32,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub admin_token: String,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedClusterHealth {
    #[serde(default)]
    pub apiserver: HealthStatus,
    #[serde(default)]
    pub scheduler: HealthStatus,
    #[serde(default)]
    pub controller: HealthStatus,
    #[serde(default)]
    pub machine_controller: HealthStatus,
    #[serde(default)]
    pub etcd: HealthStatus,
    #[serde(default)]
    pub openvpn: HealthStatus,
    #[serde(default)]
    pub cloud_provider_infrastructure: HealthStatus,
    #[serde(default)]
    pub user_cluster_controller_manager: HealthStatus,
}

impl ExtendedClusterHealth {
    pub fn all_healthy(&self) -> bool {
        [
            self.apiserver,
            self.scheduler,
            self.controller,
            self.machine_controller,
            self.etcd,
            self.openvpn,
            self.cloud_provider_infrastructure,
            self.user_cluster_controller_manager,
        ]
        .iter()
        .all(|s| *s == HealthStatus::Up)
    }
}

#[derive(Clone, Debug, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterCondition {
    #[serde(rename = "type")]
    pub type_: ClusterConditionType,
    pub status: ConditionStatus,
    pub last_heartbeat_time: Option<DateTime<Utc>>,
    pub last_transition_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
}

impl ClusterCondition {
    pub fn new(
        type_: ClusterConditionType,
        status: impl Into<ConditionStatus>,
        reason: &str,
        message: &str,
        ts: DateTime<Utc>,
    ) -> ClusterCondition {
        ClusterCondition {
            type_,
            status: status.into(),
            last_heartbeat_time: Some(ts),
            last_transition_time: Some(ts),
            reason: reason.into(),
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    #[serde(default)]
    pub namespace_name: String,
    #[serde(default)]
    pub address: ClusterAddress,
    #[serde(default)]
    pub extended_health: ExtendedClusterHealth,
    #[serde(default)]
    pub conditions: Vec<ClusterCondition>,
}

impl Default for Cluster {
    fn default() -> Self {
        Self {
            metadata: Default::default(),
            spec: ClusterSpec::default(),
            status: None,
        }
    }
}

impl ClusterStatus {
    pub fn condition(&self, type_: ClusterConditionType) -> Option<&ClusterCondition> {
        self.conditions.iter().find(|c| c.type_ == type_)
    }

    pub fn has_condition_value(&self, type_: ClusterConditionType, status: ConditionStatus) -> bool {
        self.condition(type_).is_some_and(|c| c.status == status)
    }

    // Returns true if the stored conditions changed.  The heartbeat is only bumped when something
    // about the condition is different, so that re-asserting the same condition doesn't cause
    // extra writes; the transition time only moves when the status flips.
    pub fn set_condition(&mut self, cond: ClusterCondition) -> bool {
        match self.conditions.iter_mut().find(|c| c.type_ == cond.type_) {
            None => {
                self.conditions.push(cond);
                true
            },
            Some(existing) => {
                if existing.status == cond.status && existing.reason == cond.reason && existing.message == cond.message {
                    return false;
                }

                if existing.status != cond.status {
                    existing.last_transition_time = cond.last_transition_time;
                }
                existing.status = cond.status;
                existing.reason = cond.reason;
                existing.message = cond.message;
                existing.last_heartbeat_time = cond.last_heartbeat_time;
                true
            },
        }
    }
}

impl Cluster {
    pub fn is_openshift(&self) -> bool {
        self.annotations().get(OPENSHIFT_ANNOTATION_KEY).is_some_and(|v| !v.is_empty())
    }

    pub fn worker_name(&self) -> &str {
        self.labels().get(WORKER_NAME_LABEL_KEY).map(String::as_str).unwrap_or_default()
    }

    pub fn cluster_autoscaler_enabled(&self) -> bool {
        self.annotations()
            .get(CLUSTER_AUTOSCALER_ENABLED_ANNOTATION_KEY)
            .is_some_and(|v| !v.is_empty())
    }

    pub fn status_or_default(&self) -> ClusterStatus {
        self.status.clone().unwrap_or_default()
    }

    pub fn namespace_name(&self) -> &str {
        self.status.as_ref().map(|s| s.namespace_name.as_str()).unwrap_or_default()
    }

    pub fn address(&self) -> ClusterAddress {
        self.status.as_ref().map(|s| s.address.clone()).unwrap_or_default()
    }

    pub fn extended_health(&self) -> ExtendedClusterHealth {
        self.status.as_ref().map(|s| s.extended_health.clone()).unwrap_or_default()
    }

    pub fn has_condition_value(&self, type_: ClusterConditionType, status: ConditionStatus) -> bool {
        self.status.as_ref().is_some_and(|s| s.has_condition_value(type_, status))
    }
}

impl ClusterSpec {
    // Accepts "1.14", "1.14.3" and "v1.14.3"
    pub fn minor_version(&self) -> Option<u64> {
        let v = self.version.trim_start_matches('v');
        let mut parts = v.split('.');
        parts.next()?.parse::<u64>().ok()?;
        parts.next()?.parse().ok()
    }
}
