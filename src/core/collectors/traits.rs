use super::types::CollectorResult;

/// A core trait that every account-state collector implements.
///
/// `DataProducer` is the contract for a component that derives one piece of
/// the metric snapshot from disk (or from an external command). Collectors hold
/// only their configuration, so a single instance is reused for every poll and
/// can be shared across tasks.
#[async_trait::async_trait]
pub trait DataProducer: Send + Sync + 'static {
    /// The value this producer contributes to a snapshot.
    ///
    /// `Default` is the contribution used when `produce` fails, so it must be
    /// the conservative "nothing seen" value (zero, empty map, ...).
    type Output: Default + Send + Sync + 'static;

    /// Short name used in log lines.
    fn name(&self) -> &'static str;

    /// Re-derives the value from its source. Nothing is cached between calls.
    async fn produce(&self) -> CollectorResult<Self::Output>;
}
