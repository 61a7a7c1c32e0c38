//! # Timeline Curator
//!
//! Incremental, oracle-assisted curation of per-entity event timelines.
//!
//! Dated facts arrive grouped by source. Each fact becomes a single-point
//! candidate event, is classified into a two-level taxonomy, and is merged
//! into the curated events of its subcategory: either as a new event or as
//! an update to an existing one. A separate maintenance pass folds
//! duplicate timeline points inside an event.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────────────────────────┐   ┌──────────┐
//! │  import  │──▶│ normalize → classify → decide →  │──▶│  SQLite   │
//! │ (facts)  │   │ apply            (per entity)    │   │ documents │
//! └──────────┘   └───────────────┬──────────────────┘   └────┬─────┘
//!                                │ oracle calls               │
//!                                ▼                            ▼
//!                          ┌──────────┐                ┌──────────┐
//!                          │   LLM    │                │  dedupe  │
//!                          └──────────┘                └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! tlc init                       # create database
//! tlc import facts.json          # load sources and their facts
//! tlc curate all                 # classify and merge pending facts
//! tlc dedupe alice               # fold duplicate points
//! tlc show alice --category "Creative Works"
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite persistence gateway |
//! | [`llm`] | Chat-completion oracle client |
//! | [`prompts`] | Oracle prompt text |
//! | [`classify`] | Classification adapter |
//! | [`decide`] | Merge decision adapter with retry |
//! | [`curate`] | Curation pipeline and source completion tracking |
//! | [`locks`] | Per-entity single-writer locks |
//! | [`dedupe_cmd`] | Duplicate maintenance pass |
//! | [`import`] | Source import |
//! | [`show`] | Timeline retrieval |
//! | [`stats`] | Database statistics |
//! | [`progress`] | Progress reporting on stderr |
//! | [`logging`] | Tracing setup |
//!
//! The runtime-free pieces (data model, taxonomy, windowing, merge
//! application, duplicate resolution, `Store` trait) live in
//! `timeline-curator-core`.

pub mod classify;
pub mod config;
pub mod curate;
pub mod db;
pub mod decide;
pub mod dedupe_cmd;
pub mod import;
pub mod llm;
pub mod locks;
pub mod logging;
pub mod migrate;
pub mod progress;
pub mod prompts;
pub mod show;
pub mod sqlite_store;
pub mod stats;
