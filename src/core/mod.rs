//! Core business logic - framework-agnostic catalog, order, profile and analytics
//! operations.
//!
//! Every function that touches a table takes the [`access::Requester`] explicitly and
//! applies that table's row rule. A denied read leaves the row out of the result; a
//! denied write returns `Ok(None)` ("no rows affected").

pub mod access;
pub mod analytics;
pub mod curriculum;
pub mod order;
pub mod product;
pub mod profile;
pub mod quiz;
pub mod snippet;

pub use access::{Decision, Operation, Requester, RowRule, Subject};
