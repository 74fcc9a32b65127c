//! Typed resource surfaces.
//!
//! Each module is a thin pass-through over the execution core in
//! [`Client`](crate::Client): serde models plus one accessor struct per
//! resource family. Anything clever (retries, classification, validation of
//! query shapes) lives below or beside these, not in them.

pub mod auth_meta;
pub mod boards;
pub mod burn_alerts;
pub mod columns;
pub mod datasets;
pub mod derived_columns;
pub mod markers;
pub mod queries;
pub mod recipients;
pub mod slos;
pub mod triggers;
