use std::collections::BTreeMap;

use super::error::CollectorError;

/// A convenient type alias for results returned by collectors.
///
/// Every collector operation that touches the file system or spawns a process
/// returns this, so the snapshot builder can treat failures uniformly.
pub type CollectorResult<T> = std::result::Result<T, CollectorError>;

/// Number of accounts on each subscription plan, keyed by plan name.
pub type PlanTally = BTreeMap<String, u64>;

/// Bandwidth usage per account, keyed by account name.
pub type BandwidthMap = BTreeMap<String, i64>;
