//! # batchrow-client
//!
//! The outbound half of the proxy: a [`TableStore`] trait describing the five
//! row primitives every tool ultimately reduces to, and [`BaserowClient`], a
//! reqwest implementation against the Baserow table-rows REST API.
//!
//! The trait is the substitution seam: the executor and workflows take an
//! `Arc<dyn TableStore>`, so tests drive them with an in-memory fake and the
//! binary wires in the real client.

pub mod baserow;
pub mod store;

pub use baserow::BaserowClient;
pub use store::{FieldFilter, RowPage, RowQuery, StoreError, TableStore};
