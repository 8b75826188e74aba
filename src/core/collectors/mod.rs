/// Active/suspended account classification.
pub mod accounts;

/// Per-account bandwidth usage from the bandwidth cache.
pub mod bandwidth;

/// Domain count from the domain registry file.
pub mod domains;

/// Error types shared by every collector.
pub mod error;

/// Per-plan account tally.
pub mod plans;

/// Marker matching and `KEY=value` extraction over record files.
pub mod records;

/// Regular-file listing for the per-account directories.
pub mod scanner;

/// Core trait implemented by every collector.
pub mod traits;

/// Common types and result definitions.
pub mod types;

/// Control panel version lookup through an external command.
pub mod version;

// ----------------------------------------------------------------------------
// Re-exports for public API
// ----------------------------------------------------------------------------

pub use accounts::{AccountClassification, AccountCollector};
pub use bandwidth::BandwidthCollector;
pub use domains::DomainCollector;
pub use error::CollectorError;
pub use plans::PlanCollector;
pub use traits::DataProducer;
pub use types::{BandwidthMap, CollectorResult, PlanTally};
pub use version::{VersionCollector, UNKNOWN_VERSION};
