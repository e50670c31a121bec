use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{
    Deserialize,
    Serialize,
};

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatacenterSpecAws {
    pub region: String,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatacenterSpecGcp {
    pub region: String,
    #[serde(default)]
    pub zone_suffixes: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
pub struct DatacenterSpecFake {}

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatacenterSpec {
    pub aws: Option<DatacenterSpecAws>,
    pub gcp: Option<DatacenterSpecGcp>,
    pub fake: Option<DatacenterSpecFake>,
    #[serde(default)]
    pub enforce_audit_logging: bool,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Datacenter {
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub location: String,
    pub spec: DatacenterSpec,
}

#[derive(Clone, CustomResource, Debug, Default, Deserialize, JsonSchema, Serialize)]
#[kube(group = "kubermatic.k8s.io", version = "v1", kind = "Seed", namespaced)]
#[serde(rename_all = "camelCase")]
pub struct SeedSpec {
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub datacenters: BTreeMap<String, Datacenter>,

    // If set, replaces the seed name in the DNS names of NodePort-exposed clusters
    #[serde(rename = "seedDNSOverwrite")]
    pub seed_dns_overwrite: Option<String>,
}

impl Default for Seed {
    fn default() -> Self {
        Self {
            metadata: Default::default(),
            spec: SeedSpec::default(),
        }
    }
}

impl Seed {
    pub fn datacenter(&self, name: &str) -> Option<&Datacenter> {
        self.spec.datacenters.get(name)
    }

    pub fn dns_subdomain(&self) -> String {
        match &self.spec.seed_dns_overwrite {
            Some(o) if !o.is_empty() => o.clone(),
            _ => kube::ResourceExt::name_any(self),
        }
    }
}
