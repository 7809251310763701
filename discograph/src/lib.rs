//! Discograph - streaming music catalog search core
//!
//! This library provides the backend concurrency and resource-management
//! layer for a music-metadata search tool: many independent, rate-limited,
//! multi-call lookups against a public metadata catalog and a personal
//! media-management service are turned into a fair, bounded, incrementally
//! updating search experience for many simultaneous callers.
//!
//! # High-Level API
//!
//! For most use cases, the [`service`] module provides a simplified facade:
//!
//! ```ignore
//! use discograph::service::{Discograph, ServiceConfig};
//! use discograph::search::SearchRequest;
//!
//! let service = Discograph::new(ServiceConfig::default(), catalog, manager, cover);
//!
//! // Stream enriched releases for an artist
//! let mut events = service.search(SearchRequest::new("Boards of Canada"));
//! while let Some(event) = events.recv().await {
//!     // Start, ArtistStatus, Batch..., Complete
//! }
//! ```

pub mod adapters;
pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod queue;
pub mod search;
pub mod service;

/// Version of the discograph library.
///
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
