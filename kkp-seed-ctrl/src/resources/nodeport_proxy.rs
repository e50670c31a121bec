use k8s_openapi::api::apps::v1 as appsv1;
use k8s_openapi::api::policy::v1 as policyv1;
use k8s_openapi::api::rbac::v1 as rbacv1;
use kkp_core::prelude::*;
use kkp_core::reconciling::NamedCreator;

use super::TemplateData;
use super::names::*;
use super::pdb::pod_disruption_budget;
use super::rbac::{
    nodeport_proxy_rules,
    role,
    role_binding,
    service_account,
};
use super::workloads::nodeport_proxy_envoy;

// Everything behind the front load balancer: an envoy deployment that routes to the NodePort
// services of the cluster, plus what it needs to discover them
pub struct NodePortProxyCreators<'a> {
    pub service_accounts: Vec<NamedCreator<'a, corev1::ServiceAccount>>,
    pub roles: Vec<NamedCreator<'a, rbacv1::Role>>,
    pub role_bindings: Vec<NamedCreator<'a, rbacv1::RoleBinding>>,
    pub deployments: Vec<NamedCreator<'a, appsv1::Deployment>>,
    pub pdbs: Vec<NamedCreator<'a, policyv1::PodDisruptionBudget>>,
}

pub fn creators<'a>(data: &'a TemplateData<'a>) -> NodePortProxyCreators<'a> {
    NodePortProxyCreators {
        service_accounts: vec![service_account(data, NODEPORT_PROXY_RBAC_NAME)],
        roles: vec![role(data, NODEPORT_PROXY_RBAC_NAME, nodeport_proxy_rules())],
        role_bindings: vec![role_binding(data, NODEPORT_PROXY_RBAC_NAME)],
        deployments: vec![nodeport_proxy_envoy(data)],
        pdbs: vec![pod_disruption_budget(data, NODEPORT_PROXY_PDB_NAME, NODEPORT_PROXY_DEPLOYMENT_NAME, 1)],
    }
}
