//! JSON helpers shared by the typed stores

use podline_core::{error::Result, KeyValueStore};
use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

/// Read and decode a document; malformed documents read back as `None`
pub(crate) async fn read_json<T: DeserializeOwned>(
    kv: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>> {
    let Some(raw) = kv.get(key).await? else {
        return Ok(None);
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!(key = %key, error = %e, "Discarding malformed stored value");
            Ok(None)
        }
    }
}

pub(crate) async fn write_json<T: Serialize + ?Sized>(
    kv: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    kv.set(key, &raw).await
}
