//! Per-client rate limiting built atop `governor`.
//!
//! The edge router only needs a keyed allow/deny answer; this module maps the
//! configured quota (`requests` per humantime `period`) onto a GCRA keyed
//! limiter with an in-memory state store, keyed by client identifier string.
//!
//! The key comes from a request header, so the set of keys is caller-chosen.
//! Keys whose quota has fully refilled carry no state worth keeping and are
//! pruned by the task started with [`GovernorRateLimiter::spawn_cleanup`].
use std::{num::NonZeroU32, sync::Arc, time::Duration};

use async_trait::async_trait;
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use thiserror::Error;
use tokio::{task::JoinHandle, time::MissedTickBehavior};

use crate::{
    config::models::RateLimitConfig,
    ports::rate_limit::{RateLimitDecision, RateLimitService},
};

pub type KeyedRateLimiterImpl = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RateLimitSetupError {
    #[error("Invalid period string '{period}': {reason}")]
    InvalidPeriod { period: String, reason: String },

    #[error("Rate limit 'requests' must be between 1 and {}", u32::MAX)]
    InvalidRequests,
}

/// Lower bound on how often idle keys are pruned.
const MIN_CLEANUP_INTERVAL: Duration = Duration::from_secs(1);

/// In-process keyed limiter implementing [`RateLimitService`].
#[derive(Clone)]
pub struct GovernorRateLimiter {
    limiter: Arc<KeyedRateLimiterImpl>,
    cleanup_interval: Duration,
}

impl GovernorRateLimiter {
    /// Build a limiter from a `RateLimitConfig` definition.
    pub fn new(config: &RateLimitConfig) -> Result<Self, RateLimitSetupError> {
        let quota = quota_for(config)?;

        tracing::info!(
            requests = config.requests,
            period = %config.period,
            key_header = %config.client_ip_header,
            "Creating client rate limiter"
        );

        // Time for an exhausted key to refill completely.
        let full_refill = quota.replenish_interval() * quota.burst_size().get();

        Ok(Self {
            limiter: Arc::new(RateLimiter::keyed(quota)),
            cleanup_interval: full_refill.max(MIN_CLEANUP_INTERVAL),
        })
    }

    /// Number of client keys currently holding state.
    pub fn tracked_keys(&self) -> usize {
        self.limiter.len()
    }

    /// Forget keys whose quota has fully refilled; returns the keys left.
    pub fn retain_recent(&self) -> usize {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        self.limiter.len()
    }

    /// Prune idle keys once per full refill period until the task is aborted.
    pub fn spawn_cleanup(&self) -> JoinHandle<()> {
        self.spawn_cleanup_every(self.cleanup_interval)
    }

    pub fn spawn_cleanup_every(&self, every: Duration) -> JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let remaining = limiter.retain_recent();
                tracing::debug!(remaining, "Pruned idle rate-limit keys");
            }
        })
    }

    pub fn check(&self, key: &str) -> RateLimitDecision {
        match self.limiter.check_key(&key.to_string()) {
            Ok(()) => RateLimitDecision::Allow,
            Err(_) => RateLimitDecision::Deny,
        }
    }
}

/// Translate the configured quota: a burst of `requests`, replenished evenly
/// across `period`.
pub fn quota_for(config: &RateLimitConfig) -> Result<Quota, RateLimitSetupError> {
    let period = humantime::parse_duration(&config.period).map_err(|e| {
        RateLimitSetupError::InvalidPeriod {
            period: config.period.clone(),
            reason: e.to_string(),
        }
    })?;

    let requests = u32::try_from(config.requests)
        .ok()
        .and_then(NonZeroU32::new)
        .ok_or(RateLimitSetupError::InvalidRequests)?;

    let replenish = period / requests.get();
    Quota::with_period(replenish)
        .map(|quota| quota.allow_burst(requests))
        .ok_or_else(|| RateLimitSetupError::InvalidPeriod {
            period: config.period.clone(),
            reason: "period must be longer than zero".to_string(),
        })
}

#[async_trait]
impl RateLimitService for GovernorRateLimiter {
    async fn limit(&self, key: &str) -> RateLimitDecision {
        self.check(key)
    }
}
