//! Graph-model synthesis.
//!
//! Turns one stored report into either of two renderer-facing graph shapes:
//!
//! - **transaction graph**: one node per transaction, one directed link per
//!   declared successor relationship (parallel edges kept);
//! - **account graph**: one node per distinct account, links collapsed to
//!   one per ordered (src, target) pair carrying aggregate flow totals and
//!   the full underlying transaction list.
//!
//! Both builders are pure: the produced [`Graph`] fully replaces whatever
//! graph was displayed before, it is never merged into one.

pub mod builder;
pub mod types;

pub use builder::{build_account_graph, build_transaction_graph, GraphBuildError};
pub use types::{AccountTotals, Graph, GraphLink, GraphNode};
