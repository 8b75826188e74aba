//! cPanel account metrics collector.
//!
//! This crate reads per-account state that cPanel keeps on disk, aggregates it
//! into a handful of gauges and counters once per poll, and hands the values
//! to a pluggable dispatch sink. It never writes anything back and never
//! talks to the network itself.
//!
//! ## Modules
//!
//! * `config`: TOML configuration with source paths, the account blacklist
//!   and poll settings, checked with `validator` after parsing.
//!
//! * `core`: everything that runs during a poll:
//!   - Account, plan, bandwidth, domain and version collectors
//!   - Snapshot builder
//!   - Plugin callback interface and shared counters
//!   - Dispatch sinks
//!   - Standalone polling executor
//!
//! * `logger`: installs the global `tracing` subscriber with a stderr console
//!   layer and an optional journald layer.

pub mod config;
pub mod core;
pub mod logger;
