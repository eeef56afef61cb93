//! Storage health check

use nv_core::{NvError, NvResult};
use opendal::Operator;

/// Verify the storage backend is reachable by listing the root
pub async fn check_health(op: &Operator) -> NvResult<()> {
    op.list("/")
        .await
        .map(|_| ())
        .map_err(|e| NvError::Storage(format!("storage health check failed: {e}")))
}
