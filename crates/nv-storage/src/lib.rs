//! nv-storage: OpenDAL-backed record store for notevault
//!
//! Records are JSON documents laid out as `<partition>/<key>.json`. The
//! store knows nothing about encryption; callers hand it already-sealed
//! records.

pub mod health;
pub mod operator;
pub mod store;

pub use health::check_health;
pub use operator::{build_operator, memory_operator};
pub use store::{valid_key, Keyed, KvStore, Partition};
