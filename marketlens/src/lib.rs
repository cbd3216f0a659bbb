//! MarketLens - healthcare market geospatial engine
//!
//! Resolves the organizations within a radius of a chosen center into a
//! market, enriches them with external identifiers and per-user tags, and
//! keeps an interactive map's layers in step with the resolved market.
//!
//! # High-Level API
//!
//! ```ignore
//! use std::sync::Arc;
//! use marketlens::coord::Coordinate;
//! use marketlens::market::{MarketConfig, MarketRequest, MarketResolutionService};
//! use marketlens::model::TagScope;
//! use marketlens::store::{Fixture, InMemoryStore};
//!
//! let store = Arc::new(InMemoryStore::from_fixture(Fixture::from_json_file(path)?));
//! let service = MarketResolutionService::from_store(store, MarketConfig::default());
//!
//! let scope = TagScope::Session("analyst-1".to_string());
//! let request = MarketRequest::new(Coordinate::new(41.88, -87.63)?, 10.0, scope);
//! let outcome = service.resolve(request).await?;
//! ```

pub mod cache;
pub mod config;
pub mod coord;
pub mod logging;
pub mod map;
pub mod market;
pub mod model;
pub mod prefetch;
pub mod prefilter;
pub mod retry;
pub mod store;
pub mod tags;

/// Version of the MarketLens library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
