//! Sync engine (§4.5): merge/symlink/copy materialization with bounded
//! parallelism, shared-path serialization, and manifest-backed pruning.

pub mod engine;
pub mod manifest;
pub mod target;

pub use engine::{Verb, sync, SyncItem, SyncOptions, SyncReport, SyncSkill};
pub use manifest::Manifest;
pub use target::Target;
