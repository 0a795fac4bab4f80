//! Pointshard - spatial partitioning and source ingestion for distributed
//! point-cloud indexing.
//!
//! Two coupled subsystems make up the crate:
//!
//! - **Partitioning** ([`subset`]): divide the indexing domain into `N`
//!   disjoint shards by recursive quartering, and compute for each shard the
//!   contiguous ranges of linear node addresses it owns at every hierarchy
//!   depth, so independent build processes can construct the index without
//!   coordination.
//! - **Source analysis** ([`scan`]): run a bounded-concurrency pass over the
//!   input files, executing a metadata pipeline per file behind the
//!   [`engine`] seam and harvesting bounds, point counts, scale/offset,
//!   spatial reference, and per-dimension statistics. Every per-file
//!   failure is isolated, so one bad file never aborts the batch.
//!
//! # Example
//!
//! ```ignore
//! use pointshard::config::ScanConfig;
//! use pointshard::engine::TextEngine;
//! use pointshard::storage::FsStorage;
//! use std::sync::Arc;
//!
//! let config = ScanConfig::for_inputs(vec!["clouds/".to_string()]);
//! let sources = pointshard::scan::scan(
//!     &config,
//!     Arc::new(TextEngine::new()),
//!     Arc::new(FsStorage::new()),
//! )?;
//!
//! for source in &sources {
//!     if source.failed() {
//!         eprintln!("{}: {:?}", source.path, source.info.errors);
//!     }
//! }
//! ```

pub mod config;
pub mod engine;
pub mod geom;
pub mod logging;
pub mod pipeline;
pub mod pool;
pub mod scan;
pub mod source;
pub mod storage;
pub mod subset;

/// Version of the pointshard library and CLI.
///
/// Synchronized across the workspace; injected from `Cargo.toml` at compile
/// time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
