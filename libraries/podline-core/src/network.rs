//! Network validity checks shared by history sync and downloads

use crate::traits::ConnectivityProvider;
use crate::types::Connectivity;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Wait before re-probing when reachability is still unknown
pub const REACHABILITY_RECHECK_DELAY: Duration = Duration::from_millis(200);

/// Read connectivity, probing once more if reachability is unknown
///
/// A result that is still unknown after the recheck is reported unreachable.
pub async fn resolve_connectivity(provider: &dyn ConnectivityProvider) -> Connectivity {
    let first = provider.connectivity().await;
    if first.is_internet_reachable.is_some() {
        return first;
    }

    debug!("Reachability unknown, rechecking");
    tokio::time::sleep(REACHABILITY_RECHECK_DELAY).await;

    let mut second = provider.connectivity().await;
    if second.is_internet_reachable.is_none() {
        second.is_internet_reachable = Some(false);
    }
    second
}

/// Whether remote calls should be attempted at all
pub async fn has_valid_network_connection(
    provider: &dyn ConnectivityProvider,
    offline_mode: bool,
) -> bool {
    if offline_mode {
        return false;
    }
    resolve_connectivity(provider).await.is_valid()
}

/// Whether media downloads may run under the wifi-only policy
pub async fn has_valid_downloading_connection(
    provider: &dyn ConnectivityProvider,
    wifi_only: bool,
    offline_mode: bool,
) -> bool {
    if offline_mode {
        return false;
    }
    let connectivity = resolve_connectivity(provider).await;
    if wifi_only && !connectivity.is_wifi() {
        return false;
    }
    connectivity.is_valid()
}

/// Provider that always reports the same snapshot
///
/// Used by desktop hosts that do not expose link details.
#[derive(Debug, Clone, Copy)]
pub struct StaticConnectivity(pub Connectivity);

#[async_trait]
impl ConnectivityProvider for StaticConnectivity {
    async fn connectivity(&self) -> Connectivity {
        self.0
    }
}
