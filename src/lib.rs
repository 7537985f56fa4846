//! Lead Scout library.
//!
//! Finds companies in an online business directory, stores them as leads keyed
//! by domain, enriches them with firmographic data and scores them with a
//! generative model.
//!
//! # Modules
//!
//! - `api`: API definitions.
//! - `core`: Core business logic.
//! - `integrations`: External service integrations.
//! - `config`: Configuration management.
//! - `db`: Database connection and pool management.
//! - `db_storage`: Lead repository.
//! - `directory`: Directory scraper.
//! - `domain`: Domain normalization.
//! - `enrichment`: Apollo enrichment client.
//! - `errors`: Error handling types.
//! - `evaluation`: Lead scoring.
//! - `export`: CSV export.
//! - `handlers`: HTTP request handlers.
//! - `models`: Core data models.
//! - `pipeline`: Operation orchestration.

pub mod api;
pub mod core;
pub mod integrations;

// Re-export primary modules for shared use in tests and other binaries
pub mod config;
pub mod db;
pub mod db_storage;
pub mod directory;
pub mod domain;
pub mod enrichment;
pub mod errors;
pub mod evaluation;
pub mod export;
pub mod handlers;
pub mod models;
pub mod pipeline;
