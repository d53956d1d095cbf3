//! Hubtrack - stage timeline tracking for community hub projects and opportunities
//!
//! This library provides:
//! - Stage catalogs for the delivery and sales processes
//! - Stage resolution and progress calculation
//! - A generic record store with a SQLite implementation
//! - Typed repositories and the stage mutator
//! - CLI command parsing and execution
//!
//! # Example
//!
//! ```
//! use hubtrack::catalog::delivery;
//! use hubtrack::timeline::progress;
//!
//! let progress = progress(delivery(), Some("uat"));
//! assert_eq!(progress.index, Some(10));
//! ```

pub mod catalog;
pub mod timeline;
pub mod models;
pub mod db;
pub mod repo;
pub mod cli;
