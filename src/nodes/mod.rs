//! # Node Library
//!
//! The operators that can be wired into a document graph. Every node
//! implements the [`Node`](crate::node::Node) trait and shares documents by
//! `Arc`, so fan-out never copies payloads.
//!
//! ## Node Categories
//!
//! - **Endpoints**: [`source_node`] injects documents, [`collect_node`]
//!   records what reaches it.
//! - **Transforms** (one upstream): [`map_node`], [`filter_node`] and
//!   [`scan_node`]. Only events are transformed; `start`, `descriptor` and
//!   `stop` documents pass straight through.
//! - **Joins** (several upstreams): [`zip_node`], [`bundle_node`] and
//!   [`combine_latest_node`] synchronise documents by upstream, and
//!   [`union_node`] interleaves them without alignment.

pub mod bundle_node;
pub mod collect_node;
pub mod combine_latest_node;
pub mod common;
pub mod filter_node;
pub mod map_node;
pub mod scan_node;
pub mod source_node;
pub mod union_node;
pub mod zip_node;

#[cfg(test)]
mod filter_node_test;
#[cfg(test)]
mod map_node_test;
#[cfg(test)]
mod scan_node_test;
