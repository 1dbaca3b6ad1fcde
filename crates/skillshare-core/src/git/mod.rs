//! Git adapter — every git interaction in this crate funnels through the
//! host `git` binary via [`std::process::Command`]; there is no libgit2
//! dependency, since no subsystem here walks history graphs directly.

pub mod adapter;
pub mod auth;

pub use adapter::{CloneOptions, GitAdapter, GitOutput};

/// Classification of a git operation's failure, derived from stderr
/// pattern matching. Transient errors are retried once with backoff by
/// the adapter itself; all other kinds propagate to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    Auth,
    NotFound,
    Dirty,
    Unsupported,
    Other,
}

pub fn classify_stderr(stderr: &str) -> ErrorKind {
    let s = stderr.to_ascii_lowercase();
    if s.contains("could not resolve host")
        || s.contains("connection timed out")
        || s.contains("connection reset")
        || s.contains("the remote end hung up")
        || s.contains("temporary failure")
        || s.contains("early eof")
    {
        return ErrorKind::Transient;
    }
    if s.contains("authentication failed")
        || s.contains("permission denied (publickey")
        || s.contains("could not read username")
        || s.contains("403")
    {
        return ErrorKind::Auth;
    }
    if s.contains("repository not found")
        || s.contains("does not exist")
        || s.contains("not found")
        || s.contains("404")
    {
        return ErrorKind::NotFound;
    }
    if s.contains("uncommitted changes")
        || s.contains("local changes")
        || s.contains("your local changes")
        || s.contains("not clean")
    {
        return ErrorKind::Dirty;
    }
    if s.contains("unknown option")
        || s.contains("filter requires")
        || s.contains("not supported")
    {
        return ErrorKind::Unsupported;
    }
    ErrorKind::Other
}
