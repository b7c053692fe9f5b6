//! Kubernetes resource watchers.
//!
//! This module handles watching the managed CRDs for changes and triggering
//! reconciliation using kube_runtime::Controller.
//!
//! All watchers use a generic `watch_resource()` helper that properly handles
//! the reconcile loop with automatic reconnection and retry logic.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use kube::api::Api;
use kube::ResourceExt;
use kube_runtime::{
    controller::{Action, Config as ControllerConfig},
    watcher, Controller,
};
use tracing::{debug, error, info};

use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crds::{Device, SpotMarketRequest, VirtualNetwork};

fn resource_key<K: kube::Resource>(obj: &K) -> String {
    format!("{}/{}", obj.namespace().unwrap_or_default(), obj.name_any())
}

/// Generic watcher helper built on kube_runtime::Controller.
///
/// - Automatic reconnection on watch stream failures
/// - Fibonacci backoff per resource on reconcile errors, reset on success
/// - Debounce and bounded concurrency to keep provider API load in check
async fn watch_resource<K, F>(
    api: Api<K>,
    reconciler: Arc<Reconciler>,
    reconcile_fn: F,
    resource_name: &str,
) -> Result<(), ControllerError>
where
    K: kube::Resource
        + Clone
        + Send
        + Sync
        + 'static
        + std::fmt::Debug
        + serde::de::DeserializeOwned,
    K::DynamicType: Default + std::cmp::Eq + std::hash::Hash + Clone + std::fmt::Debug + Unpin,
    F: Fn(
            Arc<Reconciler>,
            Arc<K>,
        ) -> std::pin::Pin<
            Box<dyn std::future::Future<Output = Result<Action, ControllerError>> + Send>,
        > + Send
        + Sync
        + Clone
        + 'static,
{
    info!("Starting {} watcher", resource_name);

    // Error policy: requeue with per-resource Fibonacci backoff
    let policy_name = resource_name.to_string();
    let error_policy = move |obj: Arc<K>, err: &ControllerError, ctx: Arc<Reconciler>| {
        let key = resource_key(&*obj);
        let (backoff_seconds, error_count) = ctx.get_backoff_for_resource(&key);
        error!(
            "Reconciliation error for {} {} (attempt {}): {}, requeueing in {}s",
            policy_name, key, error_count, err, backoff_seconds
        );
        Action::requeue(Duration::from_secs(backoff_seconds))
    };

    // Reconcile wrapper: reset the backoff state once a pass succeeds
    let reconcile = move |obj: Arc<K>, ctx: Arc<Reconciler>| {
        let reconcile_fn = reconcile_fn.clone();
        let resource_name = resource_name.to_string();
        async move {
            let key = resource_key(&*obj);
            debug!("Reconciling {} {}", resource_name, key);

            match reconcile_fn(ctx.clone(), obj).await {
                Ok(action) => {
                    ctx.reset_error(&key);
                    Ok(action)
                }
                Err(e) => {
                    error!("Reconciliation failed for {} {}: {}", resource_name, key, e);
                    Err(e)
                }
            }
        }
    };

    // Debounce batches bursts of status updates; concurrency bounds the
    // number of in-flight provider calls per watcher
    let controller_config = ControllerConfig::default()
        .debounce(Duration::from_secs(5))
        .concurrency(3);

    Controller::new(api, watcher::Config::default())
        .with_config(controller_config)
        .run(reconcile, error_policy, reconciler)
        .for_each(|res| async move {
            if let Err(e) = res {
                error!("Controller error for {}: {}", resource_name, e);
            }
        })
        .await;

    Ok(())
}

/// Watches the managed CRDs for changes.
pub struct Watcher {
    reconciler: Arc<Reconciler>,
    device_api: Api<Device>,
    virtual_network_api: Api<VirtualNetwork>,
    spot_market_request_api: Api<SpotMarketRequest>,
}

impl Watcher {
    /// Creates a new watcher instance.
    pub fn new(
        reconciler: Arc<Reconciler>,
        device_api: Api<Device>,
        virtual_network_api: Api<VirtualNetwork>,
        spot_market_request_api: Api<SpotMarketRequest>,
    ) -> Self {
        Self {
            reconciler,
            device_api,
            virtual_network_api,
            spot_market_request_api,
        }
    }

    /// Starts watching Device resources.
    pub async fn watch_devices(&self) -> Result<(), ControllerError> {
        watch_resource(
            self.device_api.clone(),
            self.reconciler.clone(),
            |reconciler, resource| {
                Box::pin(async move { reconciler.reconcile_device(&resource).await })
            },
            "Device",
        )
        .await
    }

    /// Starts watching VirtualNetwork resources.
    pub async fn watch_virtual_networks(&self) -> Result<(), ControllerError> {
        watch_resource(
            self.virtual_network_api.clone(),
            self.reconciler.clone(),
            |reconciler, resource| {
                Box::pin(async move { reconciler.reconcile_virtual_network(&resource).await })
            },
            "VirtualNetwork",
        )
        .await
    }

    /// Starts watching SpotMarketRequest resources.
    pub async fn watch_spot_market_requests(&self) -> Result<(), ControllerError> {
        watch_resource(
            self.spot_market_request_api.clone(),
            self.reconciler.clone(),
            |reconciler, resource| {
                Box::pin(async move { reconciler.reconcile_spot_market_request(&resource).await })
            },
            "SpotMarketRequest",
        )
        .await
    }
}
