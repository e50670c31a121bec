use k8s_openapi::api::rbac::v1 as rbacv1;
use kkp_core::prelude::*;
use kkp_core::reconciling::NamedCreator;

use super::names::*;
use super::{
    TemplateData,
    base_meta,
};

fn rule(api_groups: &[&str], resources: &[&str], verbs: &[&str]) -> rbacv1::PolicyRule {
    let strings = |xs: &[&str]| Some(xs.iter().map(|s| s.to_string()).collect());
    rbacv1::PolicyRule {
        api_groups: strings(api_groups),
        resources: strings(resources),
        verbs: verbs.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    }
}

pub fn service_account<'a>(data: &'a TemplateData<'a>, name: &'static str) -> NamedCreator<'a, corev1::ServiceAccount> {
    NamedCreator::new(name, move |mut sa: corev1::ServiceAccount| {
        base_meta(data, &mut sa.metadata, name);
        Ok(sa)
    })
}

pub fn role<'a>(
    data: &'a TemplateData<'a>,
    name: &'static str,
    rules: Vec<rbacv1::PolicyRule>,
) -> NamedCreator<'a, rbacv1::Role> {
    NamedCreator::new(name, move |mut role: rbacv1::Role| {
        base_meta(data, &mut role.metadata, name);
        role.rules = Some(rules.clone());
        Ok(role)
    })
}

// Binds the role of the same name to the service account of the same name
pub fn role_binding<'a>(data: &'a TemplateData<'a>, name: &'static str) -> NamedCreator<'a, rbacv1::RoleBinding> {
    NamedCreator::new(name, move |mut rb: rbacv1::RoleBinding| {
        base_meta(data, &mut rb.metadata, name);
        rb.role_ref = rbacv1::RoleRef {
            api_group: "rbac.authorization.k8s.io".into(),
            kind: "Role".into(),
            name: name.into(),
        };
        rb.subjects = Some(vec![rbacv1::Subject {
            kind: "ServiceAccount".into(),
            name: name.into(),
            namespace: Some(data.namespace().into()),
            ..Default::default()
        }]);
        Ok(rb)
    })
}

pub fn usercluster_controller_rules() -> Vec<rbacv1::PolicyRule> {
    vec![
        rule(&[""], &["secrets", "configmaps"], &["get", "list", "watch"]),
        rule(&[""], &["events"], &["create", "patch"]),
    ]
}

pub fn service_accounts<'a>(data: &'a TemplateData<'a>) -> Vec<NamedCreator<'a, corev1::ServiceAccount>> {
    vec![service_account(data, USER_CLUSTER_CONTROLLER_RBAC_NAME)]
}

pub fn roles<'a>(data: &'a TemplateData<'a>) -> Vec<NamedCreator<'a, rbacv1::Role>> {
    vec![role(data, USER_CLUSTER_CONTROLLER_RBAC_NAME, usercluster_controller_rules())]
}

pub fn role_bindings<'a>(data: &'a TemplateData<'a>) -> Vec<NamedCreator<'a, rbacv1::RoleBinding>> {
    vec![role_binding(data, USER_CLUSTER_CONTROLLER_RBAC_NAME)]
}

pub(super) fn nodeport_proxy_rules() -> Vec<rbacv1::PolicyRule> {
    vec![
        rule(&[""], &["services", "endpoints"], &["get", "list", "watch"]),
        rule(&[""], &["events"], &["create", "patch"]),
    ]
}
