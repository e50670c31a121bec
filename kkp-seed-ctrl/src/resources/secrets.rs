use std::collections::BTreeMap;

use k8s_openapi::ByteString;
use kkp_core::prelude::*;
use kkp_core::reconciling::NamedCreator;

use super::kubeconfig::build_kubeconfig;
use super::names::*;
use super::tokens::tokens_csv;
use super::{
    TemplateData,
    base_meta,
};

const SECRET_TYPE_OPAQUE: &str = "Opaque";
const SECRET_TYPE_DOCKER_CONFIG_JSON: &str = "kubernetes.io/dockerconfigjson";
const DOCKER_CONFIG_JSON_KEY: &str = ".dockerconfigjson";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ApiserverEndpoint {
    External,
    Internal,
}

// Other keys in the secret are left alone, so that anything a user or another controller has
// added survives reconciliation
fn set_secret_data(secret: &mut corev1::Secret, type_: &str, key: &str, value: Vec<u8>) {
    secret.type_ = Some(type_.into());
    secret.data.get_or_insert_with(BTreeMap::new).insert(key.into(), ByteString(value));
}

pub fn kubeconfig<'a>(
    data: &'a TemplateData<'a>,
    name: &'static str,
    username: &'static str,
    endpoint: ApiserverEndpoint,
) -> NamedCreator<'a, corev1::Secret> {
    NamedCreator::new(name, move |mut secret: corev1::Secret| {
        let server = match endpoint {
            ApiserverEndpoint::External => data.external_url(),
            ApiserverEndpoint::Internal => data.internal_url(),
        };
        let kc = build_kubeconfig(
            &data.cluster_name(),
            &server,
            username,
            &data.address().admin_token,
            data.config().ca_bundle.as_deref(),
        )?;

        base_meta(data, &mut secret.metadata, name);
        set_secret_data(&mut secret, SECRET_TYPE_OPAQUE, KUBECONFIG_SECRET_KEY, kc.into_bytes());
        Ok(secret)
    })
}

pub fn admin_kubeconfig<'a>(data: &'a TemplateData<'a>) -> NamedCreator<'a, corev1::Secret> {
    kubeconfig(data, ADMIN_KUBECONFIG_SECRET_NAME, ADMIN_USERNAME, ApiserverEndpoint::External)
}

pub fn tokens<'a>(data: &'a TemplateData<'a>) -> NamedCreator<'a, corev1::Secret> {
    NamedCreator::new(TOKENS_SECRET_NAME, move |mut secret: corev1::Secret| {
        base_meta(data, &mut secret.metadata, APISERVER_DEPLOYMENT_NAME);
        let csv = tokens_csv(&data.address().admin_token);
        set_secret_data(&mut secret, SECRET_TYPE_OPAQUE, TOKENS_FILE_NAME, csv.into_bytes());
        Ok(secret)
    })
}

pub fn image_pull_secret<'a>(data: &'a TemplateData<'a>, config_json: &'a [u8]) -> NamedCreator<'a, corev1::Secret> {
    NamedCreator::new(IMAGE_PULL_SECRET_NAME, move |mut secret: corev1::Secret| {
        base_meta(data, &mut secret.metadata, IMAGE_PULL_SECRET_NAME);
        set_secret_data(&mut secret, SECRET_TYPE_DOCKER_CONFIG_JSON, DOCKER_CONFIG_JSON_KEY, config_json.to_vec());
        Ok(secret)
    })
}

pub fn openshift_image_pull_secret<'a>(
    data: &'a TemplateData<'a>,
    config_json: &'a str,
) -> NamedCreator<'a, corev1::Secret> {
    NamedCreator::new(OPENSHIFT_IMAGE_PULL_SECRET_NAME, move |mut secret: corev1::Secret| {
        base_meta(data, &mut secret.metadata, OPENSHIFT_IMAGE_PULL_SECRET_NAME);
        set_secret_data(
            &mut secret,
            SECRET_TYPE_DOCKER_CONFIG_JSON,
            DOCKER_CONFIG_JSON_KEY,
            config_json.as_bytes().to_vec(),
        );
        Ok(secret)
    })
}

pub fn dex_ca<'a>(data: &'a TemplateData<'a>, ca: &'a str) -> NamedCreator<'a, corev1::Secret> {
    NamedCreator::new(DEX_CA_SECRET_NAME, move |mut secret: corev1::Secret| {
        base_meta(data, &mut secret.metadata, APISERVER_DEPLOYMENT_NAME);
        set_secret_data(&mut secret, SECRET_TYPE_OPAQUE, DEX_CA_FILE_NAME, ca.as_bytes().to_vec());
        Ok(secret)
    })
}

pub fn gcp_service_account<'a>(
    data: &'a TemplateData<'a>,
    service_account: &'a str,
) -> NamedCreator<'a, corev1::Secret> {
    NamedCreator::new(GCP_SERVICE_ACCOUNT_SECRET_NAME, move |mut secret: corev1::Secret| {
        base_meta(data, &mut secret.metadata, CONTROLLER_MANAGER_DEPLOYMENT_NAME);
        set_secret_data(
            &mut secret,
            SECRET_TYPE_OPAQUE,
            GCP_SERVICE_ACCOUNT_KEY,
            service_account.as_bytes().to_vec(),
        );
        Ok(secret)
    })
}

// The kubeconfig-backed secrets every flavor needs, in creation order
pub fn common_secrets<'a>(data: &'a TemplateData<'a>) -> Vec<NamedCreator<'a, corev1::Secret>> {
    use ApiserverEndpoint::Internal;

    let mut creators = vec![
        tokens(data),
        admin_kubeconfig(data),
        kubeconfig(data, INTERNAL_ADMIN_KUBECONFIG_SECRET_NAME, INTERNAL_ADMIN_USERNAME, Internal),
        kubeconfig(data, KUBELET_DNAT_CONTROLLER_KUBECONFIG_SECRET_NAME, KUBELET_DNAT_CONTROLLER_USERNAME, Internal),
        kubeconfig(data, MACHINE_CONTROLLER_KUBECONFIG_SECRET_NAME, MACHINE_CONTROLLER_USERNAME, Internal),
        kubeconfig(data, CONTROLLER_MANAGER_KUBECONFIG_SECRET_NAME, CONTROLLER_MANAGER_USERNAME, Internal),
        kubeconfig(data, KUBE_STATE_METRICS_KUBECONFIG_SECRET_NAME, KUBE_STATE_METRICS_USERNAME, Internal),
        kubeconfig(data, METRICS_SERVER_KUBECONFIG_SECRET_NAME, METRICS_SERVER_USERNAME, Internal),
    ];

    if let Some(config_json) = data.config().docker_pull_config_json.as_deref() {
        creators.push(image_pull_secret(data, config_json));
    }
    if data.minor_version() > 13 {
        creators.push(kubeconfig(
            data,
            CLUSTER_AUTOSCALER_KUBECONFIG_SECRET_NAME,
            CLUSTER_AUTOSCALER_USERNAME,
            Internal,
        ));
    }
    if let Some(ca) = data.config().oidc.ca.as_deref() {
        creators.push(dex_ca(data, ca));
    }
    if let Some(gcp) = data.cluster().spec.cloud.gcp.as_ref() {
        creators.push(gcp_service_account(data, &gcp.service_account));
    }

    creators
}
