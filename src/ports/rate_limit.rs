use async_trait::async_trait;

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allow,
    Deny,
}

impl RateLimitDecision {
    pub fn is_allowed(self) -> bool {
        matches!(self, RateLimitDecision::Allow)
    }
}

/// RateLimitService defines the port for the per-client request gate
///
/// The algorithm behind it is the implementation's concern; callers only see
/// allow or deny for a given key.
#[async_trait]
pub trait RateLimitService: Send + Sync + 'static {
    /// Consume one unit of quota for `key`
    async fn limit(&self, key: &str) -> RateLimitDecision;
}
