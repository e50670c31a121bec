use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kkp_core::prelude::*;
use kkp_core::reconciling::NamedCreator;

use super::names::*;
use super::{
    TemplateData,
    base_meta,
};

const SERVICE_TYPE_CLUSTER_IP: &str = "ClusterIP";
const SERVICE_TYPE_NODE_PORT: &str = "NodePort";
const SERVICE_TYPE_LOAD_BALANCER: &str = "LoadBalancer";
const HEADLESS_CLUSTER_IP: &str = "None";

pub const APISERVER_SECURE_PORT: i32 = 6443;
pub const OPENVPN_PORT: i32 = 1194;
pub const ETCD_CLIENT_PORT: i32 = 2379;
pub const ETCD_PEER_PORT: i32 = 2380;
pub const MACHINE_CONTROLLER_WEBHOOK_PORT: i32 = 9876;
pub const NODEPORT_PROXY_ENVOY_PORT: i32 = 8080;

fn port(name: &str, port: i32, target: i32, protocol: &str) -> corev1::ServicePort {
    corev1::ServicePort {
        name: Some(name.into()),
        port,
        target_port: Some(IntOrString::Int(target)),
        protocol: Some(protocol.into()),
        ..Default::default()
    }
}

// NodePorts are allocated by the apiserver on creation; carry them over by port name so that an
// update never moves a cluster to a different port
fn keep_node_ports(existing: &corev1::Service, mut ports: Vec<corev1::ServicePort>) -> Vec<corev1::ServicePort> {
    let existing_ports = existing.spec.as_ref().and_then(|s| s.ports.as_ref());
    for p in ports.iter_mut().filter(|p| p.node_port.is_none()) {
        p.node_port = existing_ports
            .and_then(|eps| eps.iter().find(|ep| ep.name == p.name))
            .and_then(|ep| ep.node_port);
    }
    ports
}

// Only the fields we care about are touched, so the apiserver-assigned clusterIP survives updates
fn set_service_spec(
    svc: &mut corev1::Service,
    type_: &str,
    selector: BTreeMap<String, String>,
    ports: Vec<corev1::ServicePort>,
) {
    let ports = keep_node_ports(svc, ports);
    let spec = svc.spec.get_or_insert_with(Default::default);
    spec.type_ = Some(type_.into());
    spec.selector = Some(selector);
    spec.ports = Some(ports);
}

fn simple_service<'a>(
    data: &'a TemplateData<'a>,
    name: &'static str,
    app: &'static str,
    type_: &'static str,
    ports: Vec<corev1::ServicePort>,
) -> NamedCreator<'a, corev1::Service> {
    NamedCreator::new(name, move |mut svc: corev1::Service| {
        base_meta(data, &mut svc.metadata, app);
        set_service_spec(&mut svc, type_, data.labels(app), ports.clone());
        Ok(svc)
    })
}

pub fn apiserver_internal<'a>(data: &'a TemplateData<'a>) -> NamedCreator<'a, corev1::Service> {
    simple_service(
        data,
        APISERVER_INTERNAL_SERVICE_NAME,
        APISERVER_DEPLOYMENT_NAME,
        SERVICE_TYPE_CLUSTER_IP,
        vec![port("secure", 443, APISERVER_SECURE_PORT, "TCP")],
    )
}

pub fn apiserver_external<'a>(data: &'a TemplateData<'a>) -> NamedCreator<'a, corev1::Service> {
    NamedCreator::new(APISERVER_EXTERNAL_SERVICE_NAME, move |mut svc: corev1::Service| {
        base_meta(data, &mut svc.metadata, APISERVER_DEPLOYMENT_NAME);
        set_service_spec(
            &mut svc,
            SERVICE_TYPE_NODE_PORT,
            data.labels(APISERVER_DEPLOYMENT_NAME),
            vec![port("secure", 443, APISERVER_SECURE_PORT, "TCP")],
        );

        // The nodeport proxy discovers the services it should route to with this annotation
        svc.metadata
            .annotations
            .get_or_insert_with(BTreeMap::new)
            .insert("nodeport-proxy.k8s.io/expose".into(), "true".into());
        Ok(svc)
    })
}

pub fn openvpn_server<'a>(data: &'a TemplateData<'a>) -> NamedCreator<'a, corev1::Service> {
    simple_service(
        data,
        OPENVPN_SERVER_SERVICE_NAME,
        OPENVPN_SERVER_DEPLOYMENT_NAME,
        SERVICE_TYPE_NODE_PORT,
        vec![port("secure", OPENVPN_PORT, OPENVPN_PORT, "TCP")],
    )
}

pub fn etcd<'a>(data: &'a TemplateData<'a>) -> NamedCreator<'a, corev1::Service> {
    NamedCreator::new(ETCD_SERVICE_NAME, move |mut svc: corev1::Service| {
        base_meta(data, &mut svc.metadata, ETCD_STATEFULSET_NAME);
        set_service_spec(
            &mut svc,
            SERVICE_TYPE_CLUSTER_IP,
            data.labels(ETCD_STATEFULSET_NAME),
            vec![
                port("client", ETCD_CLIENT_PORT, ETCD_CLIENT_PORT, "TCP"),
                port("peer", ETCD_PEER_PORT, ETCD_PEER_PORT, "TCP"),
            ],
        );

        // Peers have to find each other before any of them is ready
        let spec = svc.spec.get_or_insert_with(Default::default);
        spec.cluster_ip = Some(HEADLESS_CLUSTER_IP.into());
        spec.publish_not_ready_addresses = Some(true);
        Ok(svc)
    })
}

pub fn dns_resolver<'a>(data: &'a TemplateData<'a>) -> NamedCreator<'a, corev1::Service> {
    simple_service(
        data,
        DNS_RESOLVER_SERVICE_NAME,
        DNS_RESOLVER_DEPLOYMENT_NAME,
        SERVICE_TYPE_CLUSTER_IP,
        vec![port("dns", 53, 53, "UDP"), port("dns-tcp", 53, 53, "TCP")],
    )
}

pub fn machine_controller_webhook<'a>(data: &'a TemplateData<'a>) -> NamedCreator<'a, corev1::Service> {
    simple_service(
        data,
        MACHINE_CONTROLLER_WEBHOOK_SERVICE_NAME,
        MACHINE_CONTROLLER_WEBHOOK_DEPLOYMENT_NAME,
        SERVICE_TYPE_CLUSTER_IP,
        vec![port("https", 443, MACHINE_CONTROLLER_WEBHOOK_PORT, "TCP")],
    )
}

pub fn metrics_server<'a>(data: &'a TemplateData<'a>) -> NamedCreator<'a, corev1::Service> {
    simple_service(
        data,
        METRICS_SERVER_SERVICE_NAME,
        METRICS_SERVER_DEPLOYMENT_NAME,
        SERVICE_TYPE_CLUSTER_IP,
        vec![port("https", 443, 443, "TCP")],
    )
}

pub fn front_loadbalancer<'a>(data: &'a TemplateData<'a>) -> NamedCreator<'a, corev1::Service> {
    simple_service(
        data,
        FRONT_LOADBALANCER_SERVICE_NAME,
        NODEPORT_PROXY_DEPLOYMENT_NAME,
        SERVICE_TYPE_LOAD_BALANCER,
        vec![port("secure", 443, NODEPORT_PROXY_ENVOY_PORT, "TCP")],
    )
}
