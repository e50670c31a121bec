use k8s_openapi::api::policy::v1 as policyv1;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kkp_core::prelude::*;
use kkp_core::reconciling::NamedCreator;

use super::names::*;
use super::{
    TemplateData,
    base_meta,
};

pub fn pod_disruption_budget<'a>(
    data: &'a TemplateData<'a>,
    name: &'static str,
    app: &'static str,
    min_available: i32,
) -> NamedCreator<'a, policyv1::PodDisruptionBudget> {
    NamedCreator::new(name, move |mut pdb: policyv1::PodDisruptionBudget| {
        base_meta(data, &mut pdb.metadata, app);
        pdb.spec = Some(policyv1::PodDisruptionBudgetSpec {
            min_available: Some(IntOrString::Int(min_available)),
            selector: Some(metav1::LabelSelector {
                match_labels: Some(data.labels(app)),
                ..Default::default()
            }),
            ..Default::default()
        });
        Ok(pdb)
    })
}

// etcd needs a quorum of two out of three members
pub fn etcd<'a>(data: &'a TemplateData<'a>) -> NamedCreator<'a, policyv1::PodDisruptionBudget> {
    pod_disruption_budget(data, ETCD_PDB_NAME, ETCD_STATEFULSET_NAME, 2)
}

pub fn apiserver<'a>(data: &'a TemplateData<'a>) -> NamedCreator<'a, policyv1::PodDisruptionBudget> {
    pod_disruption_budget(data, APISERVER_PDB_NAME, APISERVER_DEPLOYMENT_NAME, 1)
}

pub fn metrics_server<'a>(data: &'a TemplateData<'a>) -> NamedCreator<'a, policyv1::PodDisruptionBudget> {
    pod_disruption_budget(data, METRICS_SERVER_PDB_NAME, METRICS_SERVER_DEPLOYMENT_NAME, 1)
}

pub fn dns_resolver<'a>(data: &'a TemplateData<'a>) -> NamedCreator<'a, policyv1::PodDisruptionBudget> {
    pod_disruption_budget(data, DNS_RESOLVER_PDB_NAME, DNS_RESOLVER_DEPLOYMENT_NAME, 1)
}

pub fn control_plane_pdbs<'a>(data: &'a TemplateData<'a>) -> Vec<NamedCreator<'a, policyv1::PodDisruptionBudget>> {
    vec![etcd(data), apiserver(data), metrics_server(data), dns_resolver(data)]
}
