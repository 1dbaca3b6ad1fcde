//! Filesystem primitives shared across sync/install/backup.
//!
//! Two distinct hashing concerns live here deliberately kept apart:
//! `tree_hash` (the git tree object hash, read through the git adapter)
//! answers "did this subdir change upstream"; `checksum` (sha256 over
//! file contents) answers "did the materialized copy drift from the
//! source", and is what the copy-mode manifest records.

pub mod atomic;
pub mod checksum;
pub mod copy;
pub mod flatten;
pub mod mtime;
pub mod symlink;

pub use checksum::checksum_tree;
pub use flatten::flat_name;
pub use mtime::newest_mtime;
