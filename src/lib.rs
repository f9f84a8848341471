//! merge-all: sequential, fail-stop merging of labelled pull requests
//!
//! Discovers open PRs carrying a label, then drives them one at a time
//! through readiness checks, CI polling, a squash merge, and a trunk
//! health check. The first condition that could leave trunk broken halts
//! the whole session.

pub mod auth;
pub mod config;
pub mod error;
pub mod merge;
pub mod platform;
pub mod repo;
pub mod types;
