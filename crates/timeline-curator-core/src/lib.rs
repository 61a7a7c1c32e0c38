//! # Timeline Curator Core
//!
//! Runtime-free logic for Timeline Curator: the event data model, the
//! category taxonomy, fact normalization, year indexing, context
//! windowing, merge application, duplicate resolution, the oracle
//! contracts, and the store abstraction.
//!
//! This crate contains no tokio, sqlx, HTTP, or filesystem I/O. Everything
//! that talks to the outside world lives in the `timeline-curator` crate and
//! reaches this one through the [`oracle`] and [`store`] traits.

pub mod dedup;
pub mod merge;
pub mod models;
pub mod normalize;
pub mod oracle;
pub mod store;
pub mod taxonomy;
pub mod window;
pub mod years;
