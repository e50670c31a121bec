use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt;

use anyhow::Context;
use k8s_openapi::api::apps::v1 as appsv1;
use kkp_api::v1::{
    ExposeStrategy,
    HealthStatus,
};
use kkp_core::cluster::{
    ClusterMutation,
    update_cluster,
};
use kkp_core::errors::*;
use kkp_core::k8s::{
    build_owner_reference,
    cluster_namespace_name,
    set_owner_reference,
};
use kkp_core::prelude::*;
use kkp_core::reconciling::{
    ManagedResource,
    NamedCreator,
    owner_ref_modifier,
    reconcile_objects,
};
use petgraph::Direction;
use petgraph::graph::{
    DiGraph,
    NodeIndex,
};
use tracing::*;

use crate::address::sync_cluster_address;
use crate::context::SeedContext;
use crate::resources::vpa::{
    VpaTargetKind,
    vertical_pod_autoscaler,
};
use crate::resources::{
    TemplateData,
    nodeport_proxy,
};

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum StepId {
    Namespace,
    Services,
    Address,
    Secrets,
    Rbac,
    StatefulSets,
    ConfigMaps,
    Deployments,
    NodePortProxy,
    CronJobs,
    PodDisruptionBudgets,
    VerticalPodAutoscalers,
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            StepId::Namespace => "namespace",
            StepId::Services => "services",
            StepId::Address => "cluster address",
            StepId::Secrets => "secrets",
            StepId::Rbac => "rbac",
            StepId::StatefulSets => "statefulsets",
            StepId::ConfigMaps => "configmaps",
            StepId::Deployments => "deployments",
            StepId::NodePortProxy => "nodeport proxy",
            StepId::CronJobs => "cronjobs",
            StepId::PodDisruptionBudgets => "pod disruption budgets",
            StepId::VerticalPodAutoscalers => "vertical pod autoscalers",
        };
        write!(f, "{name}")
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GateEffect {
    // Nothing after the gated step runs either
    Stop,
    // Only the gated step is left out
    Skip,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Gate {
    AddressResolved,
    CloudProviderInfrastructureUp,
    LoadBalancerExposed,
}

impl Gate {
    pub fn effect(&self) -> GateEffect {
        match self {
            Gate::AddressResolved | Gate::CloudProviderInfrastructureUp => GateEffect::Stop,
            Gate::LoadBalancerExposed => GateEffect::Skip,
        }
    }

    pub fn is_open(&self, cluster: &Cluster) -> bool {
        match self {
            Gate::AddressResolved => !cluster.address().ip.is_empty(),
            Gate::CloudProviderInfrastructureUp => {
                cluster.extended_health().cloud_provider_infrastructure == HealthStatus::Up
            },
            Gate::LoadBalancerExposed => cluster.spec.expose_strategy == ExposeStrategy::LoadBalancer,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ConvergenceStep {
    pub id: StepId,
    pub after: &'static [StepId],
    pub gates: &'static [Gate],
}

const fn step(id: StepId, after: &'static [StepId], gates: &'static [Gate]) -> ConvergenceStep {
    ConvergenceStep { id, after, gates }
}

// Generated kubeconfigs embed the server URL, so nothing past the address needs to run until the
// cluster has one.  Cloud config must not be rendered before the cloud provider has finished
// setting up the infrastructure, or the control plane starts with a stale config.
pub const CONVERGENCE_STEPS: &[ConvergenceStep] = &[
    step(StepId::Namespace, &[], &[]),
    step(StepId::Services, &[StepId::Namespace], &[]),
    step(StepId::Address, &[StepId::Services], &[]),
    step(StepId::Secrets, &[StepId::Address], &[Gate::AddressResolved]),
    step(StepId::Rbac, &[StepId::Secrets], &[Gate::AddressResolved]),
    step(StepId::StatefulSets, &[StepId::Rbac], &[Gate::AddressResolved]),
    step(StepId::ConfigMaps, &[StepId::StatefulSets], &[Gate::CloudProviderInfrastructureUp]),
    step(StepId::Deployments, &[StepId::ConfigMaps], &[Gate::CloudProviderInfrastructureUp]),
    step(
        StepId::NodePortProxy,
        &[StepId::Deployments],
        &[Gate::CloudProviderInfrastructureUp, Gate::LoadBalancerExposed],
    ),
    step(StepId::CronJobs, &[StepId::NodePortProxy], &[Gate::CloudProviderInfrastructureUp]),
    step(StepId::PodDisruptionBudgets, &[StepId::CronJobs], &[Gate::CloudProviderInfrastructureUp]),
    step(StepId::VerticalPodAutoscalers, &[StepId::PodDisruptionBudgets], &[Gate::CloudProviderInfrastructureUp]),
];

// Topologically sort the steps with Kahn's algorithm.  Among the steps that are ready at the same
// time, the one declared first goes first, so a linear chain comes out in declaration order.
pub fn plan(steps: &[ConvergenceStep]) -> anyhow::Result<Vec<ConvergenceStep>> {
    let mut graph = DiGraph::<usize, ()>::new();
    let nodes: Vec<NodeIndex> = (0..steps.len()).map(|i| graph.add_node(i)).collect();

    for (i, s) in steps.iter().enumerate() {
        for dep in s.after {
            let Some(j) = steps.iter().position(|other| other.id == *dep) else {
                bail!("step {} depends on unknown step {dep}", s.id);
            };
            graph.add_edge(nodes[j], nodes[i], ());
        }
    }

    let mut in_degree: Vec<usize> = nodes
        .iter()
        .map(|n| graph.neighbors_directed(*n, Direction::Incoming).count())
        .collect();
    let mut ready: BinaryHeap<Reverse<usize>> =
        in_degree.iter().enumerate().filter(|(_, d)| **d == 0).map(|(i, _)| Reverse(i)).collect();

    let mut order = Vec::with_capacity(steps.len());
    while let Some(Reverse(i)) = ready.pop() {
        order.push(steps[i]);
        for next in graph.neighbors_directed(nodes[i], Direction::Outgoing) {
            let j = graph[next];
            in_degree[j] -= 1;
            if in_degree[j] == 0 {
                ready.push(Reverse(j));
            }
        }
    }

    ensure!(order.len() == steps.len(), "convergence steps contain a dependency cycle");
    Ok(order)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Convergence {
    Complete,
    Gated(Gate),
}

// Bring every control plane object of the cluster to its desired state, in dependency order.
// A closed stop gate is not an error: the run ends early and waits for the cluster to change.
pub async fn converge<C: ObjectClient>(
    ctx: &SeedContext<C>,
    cluster: &mut Cluster,
    seed: &Seed,
) -> anyhow::Result<Convergence> {
    for s in plan(CONVERGENCE_STEPS)? {
        if let Some(gate) = s.gates.iter().find(|g| g.effect() == GateEffect::Stop && !g.is_open(cluster)) {
            info!("waiting for {gate:?} before ensuring {}", s.id);
            return Ok(Convergence::Gated(*gate));
        }
        if let Some(gate) = s.gates.iter().find(|g| g.effect() == GateEffect::Skip && !g.is_open(cluster)) {
            debug!("skipping {} ({gate:?} not satisfied)", s.id);
            continue;
        }

        run_step(ctx, cluster, seed, s.id)
            .await
            .with_context(|| format!("failed to ensure {}", s.id))?;
    }

    Ok(Convergence::Complete)
}

async fn run_step<C: ObjectClient>(
    ctx: &SeedContext<C>,
    cluster: &mut Cluster,
    seed: &Seed,
    id: StepId,
) -> EmptyResult {
    match id {
        StepId::Namespace => return ensure_namespace(&ctx.client, cluster).await,
        StepId::Address => {
            let mutations =
                sync_cluster_address(&ctx.client, ctx.resolver.as_ref(), cluster, seed, &ctx.config.external_url)
                    .await?;
            return update_cluster(&ctx.client, cluster, &mutations).await;
        },
        StepId::Services => {
            let defaults = ClusterMutation::SetNetworkDefaults {
                services_cidr: DEFAULT_SERVICES_CIDR.into(),
                pods_cidr: DEFAULT_PODS_CIDR.into(),
                dns_domain: DEFAULT_DNS_DOMAIN.into(),
            };
            update_cluster(&ctx.client, cluster, &[defaults]).await?;
        },
        _ => (),
    }

    // Built fresh for every step so that it sees what earlier steps wrote to the cluster
    let cluster: &Cluster = cluster;
    let data = TemplateData::new(cluster, seed, &ctx.config)?;
    let owner = build_owner_reference(cluster)?;
    let client = &ctx.client;
    let flavor = ctx.flavor.as_ref();
    let ns = data.namespace();

    match id {
        StepId::Namespace | StepId::Address => Ok(()),
        StepId::Services => ensure_owned(client, ns, &owner, flavor.services(&data), false).await,
        StepId::Secrets => ensure_owned(client, ns, &owner, flavor.secrets(&data), false).await,
        StepId::Rbac => {
            ensure_owned(client, ns, &owner, flavor.service_accounts(&data), false).await?;
            ensure_owned(client, ns, &owner, flavor.roles(&data), false).await?;
            ensure_owned(client, ns, &owner, flavor.role_bindings(&data), false).await
        },
        StepId::StatefulSets => ensure_owned(client, ns, &owner, flavor.stateful_sets(&data), true).await,
        StepId::ConfigMaps => ensure_owned(client, ns, &owner, flavor.config_maps(&data), false).await,
        StepId::Deployments => ensure_owned(client, ns, &owner, flavor.deployments(&data), false).await,
        StepId::NodePortProxy => {
            let proxy = nodeport_proxy::creators(&data);
            ensure_owned(client, ns, &owner, proxy.service_accounts, false).await?;
            ensure_owned(client, ns, &owner, proxy.roles, false).await?;
            ensure_owned(client, ns, &owner, proxy.role_bindings, false).await?;
            ensure_owned(client, ns, &owner, proxy.deployments, false).await?;
            ensure_owned(client, ns, &owner, proxy.pdbs, true).await
        },
        StepId::CronJobs => ensure_owned(client, ns, &owner, flavor.cron_jobs(&data), false).await,
        StepId::PodDisruptionBudgets => {
            ensure_owned(client, ns, &owner, flavor.pod_disruption_budgets(&data), true).await
        },
        StepId::VerticalPodAutoscalers => {
            let mut creators = vec![];
            for target in flavor.vpa_targets(&data) {
                let exists = match target.kind {
                    VpaTargetKind::Deployment => {
                        client.get::<appsv1::Deployment>(ns, &target.name).await?.is_some()
                    },
                    VpaTargetKind::StatefulSet => {
                        client.get::<appsv1::StatefulSet>(ns, &target.name).await?.is_some()
                    },
                };
                if exists {
                    creators.push(vertical_pod_autoscaler(&data, target));
                } else {
                    debug!("no {:?} {}, not creating a vpa for it", target.kind, target.name);
                }
            }
            ensure_owned(client, ns, &owner, creators, false).await
        },
    }
}

async fn ensure_owned<C, K>(
    client: &C,
    ns: &str,
    owner: &metav1::OwnerReference,
    creators: Vec<NamedCreator<'_, K>>,
    recreate_on_immutable_change: bool,
) -> EmptyResult
where
    C: ObjectClient,
    K: ManagedResource,
{
    let creators: Vec<_> = creators
        .into_iter()
        .map(|c| c.with_modifier(owner_ref_modifier(owner.clone())))
        .collect();
    reconcile_objects(client, ns, &creators, recreate_on_immutable_change).await
}

async fn ensure_namespace<C: ObjectClient>(client: &C, cluster: &mut Cluster) -> EmptyResult {
    if cluster.namespace_name().is_empty() {
        let ns = cluster_namespace_name(cluster);
        info!("assigning namespace {ns}");
        update_cluster(client, cluster, &[ClusterMutation::SetNamespaceName(ns)]).await?;
    }

    let name = cluster.namespace_name().to_string();
    if client.get_namespace(&name).await?.is_some() {
        return Ok(());
    }

    info!("creating namespace {name}");
    let mut ns = corev1::Namespace {
        metadata: metav1::ObjectMeta { name: Some(name), ..Default::default() },
        ..Default::default()
    };
    set_owner_reference(&mut ns.metadata, &build_owner_reference(cluster)?);
    client.create_namespace(&ns).await
}
