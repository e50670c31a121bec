mod immutable;

use anyhow::Context;
pub use immutable::ManagedResource;
use kube::Resource;
use serde_json as json;
use tracing::*;

use crate::errors::*;
use crate::jsonutils::{
    is_derivative,
    strip_server_fields,
};
use crate::k8s::{
    NamespacedObject,
    set_owner_reference,
};
use crate::prelude::*;

pub type CreatorFn<'a, K> = Box<dyn Fn(K) -> anyhow::Result<K> + Send + Sync + 'a>;

// A creator takes either the existing object (if there is one) or an empty object and returns
// the desired state of the object.  Creators must be deterministic; they are re-run on every
// reconcile pass and anything they change on an existing object results in an update.
pub struct NamedCreator<'a, K> {
    name: String,
    create: CreatorFn<'a, K>,
}

impl<'a, K: NamespacedObject> NamedCreator<'a, K> {
    pub fn new<F>(name: &str, create: F) -> NamedCreator<'a, K>
    where
        F: Fn(K) -> anyhow::Result<K> + Send + Sync + 'a,
    {
        NamedCreator { name: name.into(), create: Box::new(create) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn create(&self, existing: K) -> anyhow::Result<K> {
        (self.create)(existing)
    }

    // Chain another function after the creator; this is how cross-cutting concerns like owner
    // references get applied to every object of a step
    pub fn with_modifier<F>(self, modifier: F) -> NamedCreator<'a, K>
    where
        F: Fn(K) -> anyhow::Result<K> + Send + Sync + 'a,
    {
        let NamedCreator { name, create } = self;
        NamedCreator {
            name,
            create: Box::new(move |obj| modifier(create(obj)?)),
        }
    }
}

pub fn owner_ref_modifier<K: NamespacedObject>(
    owner_ref: metav1::OwnerReference,
) -> impl Fn(K) -> anyhow::Result<K> + Send + Sync + 'static {
    move |mut obj: K| {
        set_owner_reference(obj.meta_mut(), &owner_ref);
        Ok(obj)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EnsureResult {
    Created,
    Updated,
    Recreated,
    Unchanged,
}

// Get-or-create-then-update-if-changed for a single object.  Performs at most one write (two for
// a recreate) and never retries; API errors are returned as-is.
pub async fn ensure_named_object<C, K>(
    client: &C,
    ns: &str,
    creator: &NamedCreator<'_, K>,
    recreate_on_immutable_change: bool,
) -> anyhow::Result<EnsureResult>
where
    C: ObjectClient,
    K: ManagedResource,
{
    let name = creator.name();
    let kind = K::kind(&());

    let Some(existing) = client.get::<K>(ns, name).await? else {
        let obj = with_identity(creator.create(K::default())?, ns, name);
        info!("creating {kind} {ns}/{name}");
        client.create(ns, &obj).await?;
        return Ok(EnsureResult::Created);
    };

    let mut desired = with_identity(creator.create(existing.clone())?, ns, name);
    if is_equivalent(&desired, &existing)? {
        debug!("{kind} {ns}/{name} is up to date");
        return Ok(EnsureResult::Unchanged);
    }

    if recreate_on_immutable_change && K::immutable_fields_changed(&existing, &desired) {
        info!("immutable fields of {kind} {ns}/{name} changed, recreating");
        client.delete::<K>(ns, name).await?;
        clear_server_metadata(desired.meta_mut());
        client.create(ns, &desired).await?;
        return Ok(EnsureResult::Recreated);
    }

    info!("updating {kind} {ns}/{name}");
    desired.meta_mut().resource_version = existing.meta().resource_version.clone();
    client.replace(ns, &desired).await?;
    Ok(EnsureResult::Updated)
}

// Ensure every object in the list, in order, stopping at the first failure
pub async fn reconcile_objects<C, K>(
    client: &C,
    ns: &str,
    creators: &[NamedCreator<'_, K>],
    recreate_on_immutable_change: bool,
) -> EmptyResult
where
    C: ObjectClient,
    K: ManagedResource,
{
    for creator in creators {
        ensure_named_object(client, ns, creator, recreate_on_immutable_change)
            .await
            .with_context(|| format!("failed to ensure {} {ns}/{}", K::kind(&()), creator.name()))?;
    }
    Ok(())
}

fn with_identity<K: NamespacedObject>(mut obj: K, ns: &str, name: &str) -> K {
    let meta = obj.meta_mut();
    meta.name = Some(name.into());
    meta.namespace = Some(ns.into());
    obj
}

fn clear_server_metadata(meta: &mut metav1::ObjectMeta) {
    meta.resource_version = None;
    meta.uid = None;
    meta.creation_timestamp = None;
    meta.generation = None;
    meta.managed_fields = None;
    meta.deletion_timestamp = None;
}

fn is_equivalent<K: NamespacedObject>(desired: &K, existing: &K) -> anyhow::Result<bool> {
    let mut desired = json::to_value(desired)?;
    let mut existing = json::to_value(existing)?;
    strip_server_fields(&mut desired);
    strip_server_fields(&mut existing);
    Ok(is_derivative(&desired, &existing))
}

#[cfg(test)]
mod tests;
