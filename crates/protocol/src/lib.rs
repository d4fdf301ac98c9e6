//! Wire types for the arrivals service.
//!
//! This crate contains the serde-serializable types that cross a process
//! boundary: the persisted credential bundle, the guest records produced by an
//! acquisition, and the HTTP request/response bodies served to clients.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: No behavior beyond serialization/deserialization
//! * camelCase on the wire, matching what dashboard clients already consume
//! * Stable: Changes only when a client-visible shape changes
//!
//! Refresh orchestration built on top of these types lives in `arrivals-core`.

pub mod api;
pub mod cookie;
pub mod guest;
pub mod status;

pub use api::*;
pub use cookie::*;
pub use guest::*;
pub use status::*;
