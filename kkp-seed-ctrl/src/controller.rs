use std::ops::Deref;
use std::sync::Arc;

use anyhow::Context;
use clockabilly::Clockable;
use kkp_api::v1::{
    ClusterCondition,
    HealthStatus,
};
use kkp_core::cluster::{
    ClusterMutation,
    update_cluster,
};
use kkp_core::errors::*;
use kkp_core::k8s::ClusterEvent;
use kkp_core::prelude::*;
use kube::runtime::controller::Action;
use tokio::time::Duration;
use tracing::*;

use crate::context::SeedContext;
use crate::convergence::{
    Convergence,
    Gate,
    converge,
};
use crate::errors::*;
use crate::health::sync_health;
use crate::userclient::cluster_reachable;

pub const REQUEUE_DURATION: Duration = Duration::from_secs(RETRY_DELAY_SECONDS);
pub const REQUEUE_ERROR_DURATION: Duration = Duration::from_secs(ERROR_RETRY_DELAY_SECONDS);
pub const REQUEUE_CLUSTER_ERROR_DURATION: Duration = Duration::from_secs(CLUSTER_ERROR_RETRY_DELAY_SECONDS);
pub const ADMISSION_REQUEUE_DURATION: Duration = Duration::from_secs(ADMISSION_RETRY_DELAY_SECONDS);
pub const DELETION_REQUEUE_DURATION: Duration = Duration::from_secs(DELETION_RETRY_DELAY_SECONDS);
pub const REACHABILITY_REQUEUE_DURATION: Duration = Duration::from_secs(REACHABILITY_RETRY_DELAY_SECONDS);

pub(crate) fn skip_reason<C: ObjectClient>(ctx: &SeedContext<C>, cluster: &Cluster) -> Option<String> {
    if !ctx.flavor.matches(cluster) {
        return Some(format!("cluster is not a {:?} cluster", ctx.flavor.cluster_type()));
    }
    if cluster.worker_name() != ctx.config.worker_name {
        return Some(format!("cluster belongs to worker {:?}", cluster.worker_name()));
    }
    if cluster.spec.pause {
        return Some("cluster is paused".into());
    }
    None
}

// A cluster that isn't fully healthy counts as "in flight".  Clusters that are already in flight
// may always continue; any other cluster has to wait until there is room.  Nothing stops two
// reconciles from both seeing room at the same time, so the limit can be overshot a little.
pub(crate) async fn cluster_admitted<C: ObjectClient>(ctx: &SeedContext<C>, cluster: &Cluster) -> anyhow::Result<bool> {
    if !cluster.extended_health().all_healthy() {
        return Ok(true);
    }

    let in_flight = ctx
        .client
        .list_clusters()
        .await?
        .iter()
        .filter(|c| !c.extended_health().all_healthy())
        .count();
    Ok(in_flight < ctx.config.concurrent_cluster_updates)
}

// Deleting the namespace takes every control plane object with it; once it's gone the cluster
// no longer needs our finalizers
pub(crate) async fn cleanup_cluster<C: ObjectClient>(
    ctx: &SeedContext<C>,
    cluster: &mut Cluster,
) -> anyhow::Result<Action> {
    let ns = cluster.namespace_name().to_string();
    if !ns.is_empty() && ctx.client.get_namespace(&ns).await?.is_some() {
        info!("deleting cluster namespace {ns}");
        ctx.client.delete_namespace(&ns).await?;
        return Ok(Action::requeue(DELETION_REQUEUE_DURATION));
    }

    let finalizers = ctx.flavor.finalizers().iter().map(|f| f.to_string()).collect();
    update_cluster(&ctx.client, cluster, &[ClusterMutation::RemoveFinalizers(finalizers)]).await?;
    Ok(Action::await_change())
}

pub(crate) async fn reconcile_cluster<C: ObjectClient>(
    ctx: &SeedContext<C>,
    cluster: &mut Cluster,
) -> anyhow::Result<Action> {
    let flavor = ctx.flavor.as_ref();
    flavor.validate(cluster)?;

    let seed = ctx
        .client
        .get::<Seed>(&ctx.config.namespace, &ctx.config.seed_name)
        .await?
        .ok_or_else(|| ClusterControllerError::seed_not_found(&ctx.config.seed_name))?;

    let convergence = converge(ctx, cluster, &seed).await?;
    sync_health(&ctx.client, cluster, flavor, ctx.clock.now())
        .await
        .context("failed to sync health")?;

    if let Convergence::Gated(gate) = convergence {
        return Ok(match gate {
            Gate::CloudProviderInfrastructureUp => flavor.infra_gate_requeue(),
            _ => Action::await_change(),
        });
    }

    if cluster.extended_health().apiserver != HealthStatus::Up {
        debug!("apiserver is not up yet");
        return Ok(Action::requeue(REQUEUE_DURATION));
    }

    if !cluster_reachable(&ctx.client, ctx.user_clusters.as_ref(), cluster).await {
        debug!("cluster is not reachable yet, retrying later");
        return Ok(Action::requeue(REACHABILITY_REQUEUE_DURATION));
    }

    // Only once the cluster is actually running, otherwise the cleanup can never succeed
    let existing = cluster.finalizers();
    if !flavor.finalizers().iter().all(|f| existing.iter().any(|e| e == f)) {
        info!("adding cleanup finalizers");
        let finalizers = flavor.finalizers().iter().map(|f| f.to_string()).collect();
        update_cluster(&ctx.client, cluster, &[ClusterMutation::AddFinalizers(finalizers)]).await?;
    }

    Ok(Action::await_change())
}

// Errors are recorded on the reconciling condition and as a warning event; failing to record them
// is only logged so that the original error still reaches the error policy
async fn record_outcome<C: ObjectClient>(ctx: &SeedContext<C>, cluster: &mut Cluster, res: &anyhow::Result<Action>) {
    let type_ = ctx.flavor.reconciling_condition();
    let now = ctx.clock.now();
    let cond = match res {
        Ok(_) => ClusterCondition::new(type_, true, "", "", now),
        Err(err) => ClusterCondition::new(type_, false, RECONCILING_ERROR_REASON, &format!("{err:#}"), now),
    };
    if let Err(err) = update_cluster(&ctx.client, cluster, &[ClusterMutation::SetCondition(cond)]).await {
        error!("could not update {type_:?} condition: {err:#}");
    }

    if let Err(err) = res {
        let event = ClusterEvent::warning(RECONCILING_ERROR_REASON, format!("{err:#}"));
        if let Err(e) = ctx.client.publish_event(cluster, &event).await {
            error!("could not publish event: {e:#}");
        }
    }
}

#[instrument(skip_all, fields(cluster=cluster.name_any()))]
pub async fn reconcile<C: ObjectClient>(cluster: Arc<Cluster>, ctx: Arc<SeedContext<C>>) -> Result<Action, AnyhowError> {
    let mut cluster = cluster.deref().clone();
    if let Some(reason) = skip_reason(&ctx, &cluster) {
        debug!("skipping: {reason}");
        return Ok(Action::await_change());
    }

    if cluster.metadata.deletion_timestamp.is_some() {
        debug!("cleaning up cluster");
        return Ok(cleanup_cluster(&ctx, &mut cluster).await?);
    }

    if !cluster_admitted(&ctx, &cluster).await? {
        info!(
            "concurrency limit of {} reached, checking again in {ADMISSION_RETRY_DELAY_SECONDS}s",
            ctx.config.concurrent_cluster_updates
        );
        return Ok(Action::requeue(ADMISSION_REQUEUE_DURATION));
    }

    let res = reconcile_cluster(&ctx, &mut cluster).await;
    record_outcome(&ctx, &mut cluster, &res).await;
    Ok(res?)
}

pub fn error_policy<C: ObjectClient>(cluster: Arc<Cluster>, err: &AnyhowError, _ctx: Arc<SeedContext<C>>) -> Action {
    if err.is::<ClusterControllerError>() {
        warn!(
            "cluster {} can't be reconciled until it is fixed, retrying in {CLUSTER_ERROR_RETRY_DELAY_SECONDS}s: {}",
            cluster.name_any(),
            err.deref()
        );
        return Action::requeue(REQUEUE_CLUSTER_ERROR_DURATION);
    }

    logerr!(err, "reconcile failed on cluster {}", cluster.name_any());
    Action::requeue(REQUEUE_ERROR_DURATION)
}
