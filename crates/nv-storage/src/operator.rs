//! OpenDAL Operator factory for notevault storage backends

use opendal::layers::{LoggingLayer, RetryLayer};
use opendal::{Builder, Operator};
use std::path::Path;

use nv_core::config::{expand_tilde, StorageConfig};
use nv_core::{NvError, NvResult};

/// Build an operator from the `[storage]` config section.
pub fn build_operator(cfg: &StorageConfig) -> NvResult<Operator> {
    match cfg.backend.as_str() {
        "fs" => fs_operator(&expand_tilde(&cfg.root)),
        "memory" => {
            tracing::warn!("memory storage backend selected: nothing will persist past this process");
            memory_operator()
        }
        other => Err(NvError::Config(format!("unknown storage backend {other:?}"))),
    }
}

/// Local filesystem backend rooted at `root`.
///
/// Writes are staged in `<root>/.staging` and renamed into place, so a
/// reader never observes a half-written record.
pub fn fs_operator(root: &Path) -> NvResult<Operator> {
    let root_str = root.to_string_lossy();
    let staging = root.join(".staging");
    let builder = opendal::services::Fs::default()
        .root(&root_str)
        .atomic_write_dir(&staging.to_string_lossy());

    tracing::debug!(root = %root.display(), "opening fs store");
    finish(builder)
}

/// In-memory backend, for tests and throwaway sessions.
pub fn memory_operator() -> NvResult<Operator> {
    finish(opendal::services::Memory::default())
}

fn finish<B: Builder>(builder: B) -> NvResult<Operator> {
    let op = Operator::new(builder)
        .map_err(|e| NvError::Storage(format!("creating OpenDAL operator: {e}")))?
        .layer(LoggingLayer::default())
        .layer(RetryLayer::new().with_max_times(3).with_jitter())
        .finish();
    Ok(op)
}
