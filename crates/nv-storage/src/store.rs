//! Partitioned key-value record store
//!
//! Each record is one JSON document at `<partition>/<key>.json`. Operations
//! on a single record are atomic; there are no cross-partition transactions.

use opendal::{ErrorKind, Operator};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use nv_core::{NvError, NvResult};

const RECORD_EXT: &str = ".json";
const MAX_KEY_LEN: usize = 128;

/// Named group of records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    Vault,
    Notes,
}

impl Partition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::Vault => "vault",
            Partition::Notes => "notes",
        }
    }

    fn prefix(&self) -> String {
        format!("{}/", self.as_str())
    }
}

/// A record that knows its own primary key (upsert target for `put`)
pub trait Keyed {
    fn key(&self) -> &str;
}

#[derive(Debug, Clone)]
pub struct KvStore {
    op: Operator,
}

impl KvStore {
    pub fn new(op: Operator) -> Self {
        Self { op }
    }

    pub fn operator(&self) -> &Operator {
        &self.op
    }

    /// Fetch one record; `None` when absent.
    pub async fn get<T: DeserializeOwned>(
        &self,
        partition: Partition,
        key: &str,
    ) -> NvResult<Option<T>> {
        let path = record_path(partition, key)?;
        let buf = match self.op.read(&path).await {
            Ok(buf) => buf,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(storage_err("read", &path, e)),
        };
        Ok(Some(serde_json::from_slice(&buf.to_vec())?))
    }

    /// Every record in the partition. Fails on the first undecodable record.
    pub async fn get_all<T: DeserializeOwned>(&self, partition: Partition) -> NvResult<Vec<T>> {
        self.scan(partition)
            .await?
            .into_iter()
            .map(|(_, record)| record)
            .collect()
    }

    /// Every record in the partition with its key, decoding each one
    /// independently so one bad document does not hide the rest.
    /// Ordered by key.
    pub async fn scan<T: DeserializeOwned>(
        &self,
        partition: Partition,
    ) -> NvResult<Vec<(String, NvResult<T>)>> {
        let prefix = partition.prefix();
        let entries = match self.op.list(&prefix).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(storage_err("list", &prefix, e)),
        };

        let mut keys: Vec<String> = entries
            .iter()
            .filter(|entry| entry.metadata().is_file())
            .filter_map(|entry| entry.name().strip_suffix(RECORD_EXT))
            .filter(|key| valid_key(key))
            .map(str::to_string)
            .collect();
        keys.sort();

        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            let path = record_path(partition, &key)?;
            let buf = match self.op.read(&path).await {
                Ok(buf) => buf,
                // Deleted between list and read
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(storage_err("read", &path, e)),
            };
            let record = serde_json::from_slice(&buf.to_vec()).map_err(NvError::from);
            out.push((key, record));
        }

        debug!(partition = partition.as_str(), count = out.len(), "scanned partition");
        Ok(out)
    }

    /// Insert or replace the record under `value.key()`.
    pub async fn put<T: Serialize + Keyed>(&self, partition: Partition, value: &T) -> NvResult<()> {
        let path = record_path(partition, value.key())?;
        let bytes = serde_json::to_vec(value)?;
        self.op
            .write(&path, bytes)
            .await
            .map_err(|e| storage_err("write", &path, e))?;
        debug!(partition = partition.as_str(), key = value.key(), "record written");
        Ok(())
    }

    /// Remove a record. Removing an absent key is not an error.
    pub async fn delete(&self, partition: Partition, key: &str) -> NvResult<()> {
        let path = record_path(partition, key)?;
        match self.op.delete(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(storage_err("delete", &path, e)),
        }
        debug!(partition = partition.as_str(), key, "record deleted");
        Ok(())
    }
}

/// Whether `key` is acceptable as a record key.
pub fn valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= MAX_KEY_LEN
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn record_path(partition: Partition, key: &str) -> NvResult<String> {
    if !valid_key(key) {
        return Err(NvError::Storage(format!(
            "invalid record key {key:?}: expected 1-{MAX_KEY_LEN} characters of [A-Za-z0-9_-]"
        )));
    }
    Ok(format!("{}{key}{RECORD_EXT}", partition.prefix()))
}

fn storage_err(action: &str, path: &str, e: opendal::Error) -> NvError {
    NvError::Storage(format!("{action} {path}: {e}"))
}
