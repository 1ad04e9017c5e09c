//! Connection lifecycle for UI subscribers.
//!
//! [`ResilientSubscription`] wraps [`LiveAnalytics::subscribe`] with
//! exponential-backoff retries. After the attempt budget is exhausted the
//! wrapper stays [`ConnectionState::Failed`] until a manual
//! [`ResilientSubscription::reconnect`]; there is no background retry.

use std::sync::Arc;
use std::time::Duration;

use crate::config::RealtimeConfig;
use crate::error::{Error, Result};

use super::{LiveAnalytics, SubscriptionId, UpdateCallback};

/// Lifecycle state of a subscriber's connection to a survey feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No subscription held
    Unsubscribed,
    /// First subscribe attempt in flight
    Connecting,
    /// Subscription established
    Active,
    /// Retrying after a failed attempt
    Reconnecting { attempt: u32 },
    /// Attempt budget exhausted; waiting for a manual reconnect
    Failed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Unsubscribed => "unsubscribed",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Active => "active",
            ConnectionState::Reconnecting { .. } => "reconnecting",
            ConnectionState::Failed => "failed",
        }
    }
}

/// Exponential-backoff retry policy.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Total subscribe attempts before giving up
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles each attempt after
    pub base_delay: Duration,
    /// Delay cap
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30000),
        }
    }
}

impl ReconnectPolicy {
    pub fn from_config(config: &RealtimeConfig) -> Self {
        Self {
            max_attempts: config.reconnect_max_attempts,
            base_delay: Duration::from_millis(config.reconnect_base_delay_ms),
            max_delay: Duration::from_millis(config.reconnect_max_delay_ms),
        }
    }

    /// Delay after the given zero-based failed attempt: `base * 2^attempt`,
    /// capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        let ms = base_ms.saturating_mul(1u64.checked_shl(attempt).unwrap_or(u64::MAX));
        Duration::from_millis(ms.min(self.max_delay.as_millis() as u64))
    }
}

/// A subscription handle that retries setup with backoff.
pub struct ResilientSubscription {
    analytics: Arc<LiveAnalytics>,
    survey_id: String,
    callback: UpdateCallback,
    policy: ReconnectPolicy,
    state: ConnectionState,
    subscription: Option<SubscriptionId>,
}

impl ResilientSubscription {
    pub fn new(
        analytics: Arc<LiveAnalytics>,
        survey_id: impl Into<String>,
        callback: UpdateCallback,
    ) -> Self {
        let policy = ReconnectPolicy::from_config(analytics.config());
        Self::with_policy(analytics, survey_id, callback, policy)
    }

    pub fn with_policy(
        analytics: Arc<LiveAnalytics>,
        survey_id: impl Into<String>,
        callback: UpdateCallback,
        policy: ReconnectPolicy,
    ) -> Self {
        Self {
            analytics,
            survey_id: survey_id.into(),
            callback,
            policy,
            state: ConnectionState::Unsubscribed,
            subscription: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Establish the subscription, retrying with backoff on failure.
    ///
    /// Leaves the wrapper [`ConnectionState::Failed`] and returns the last
    /// error once the attempt budget is spent.
    pub async fn connect(&mut self) -> Result<()> {
        let mut last_error =
            Error::Feed(format!("no subscribe attempts made for {}", self.survey_id));

        for attempt in 0..self.policy.max_attempts {
            self.state = if attempt == 0 {
                ConnectionState::Connecting
            } else {
                ConnectionState::Reconnecting { attempt }
            };

            match self
                .analytics
                .subscribe(&self.survey_id, self.callback.clone())
            {
                Ok(id) => {
                    self.subscription = Some(id);
                    self.state = ConnectionState::Active;
                    tracing::info!(
                        survey_id = %self.survey_id,
                        attempt,
                        "Live subscription established"
                    );
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(
                        survey_id = %self.survey_id,
                        attempt,
                        error = %e,
                        "Subscribe attempt failed"
                    );
                    last_error = e;
                    if attempt + 1 < self.policy.max_attempts {
                        tokio::time::sleep(self.policy.delay_for(attempt)).await;
                    }
                }
            }
        }

        self.state = ConnectionState::Failed;
        tracing::error!(
            survey_id = %self.survey_id,
            attempts = self.policy.max_attempts,
            "Giving up on live subscription; manual reconnect required"
        );
        Err(last_error)
    }

    /// Manual retry after the wrapper entered [`ConnectionState::Failed`].
    pub async fn reconnect(&mut self) -> Result<()> {
        self.drop_subscription();
        self.connect().await
    }

    /// Tear down the subscription deterministically.
    ///
    /// Callers must invoke this (rather than relying on drop order) so the
    /// shared feed registration is released.
    pub fn disconnect(&mut self) {
        self.drop_subscription();
        self.state = ConnectionState::Unsubscribed;
    }

    fn drop_subscription(&mut self) {
        if let Some(id) = self.subscription.take() {
            self.analytics.unsubscribe(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::{ChangeFeed, ResponseSource};
    use crate::types::ResponseRecord;
    use chrono::{DateTime, Utc};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EmptySource;

    impl ResponseSource for EmptySource {
        fn responses_since(
            &self,
            _survey_id: &str,
            _since: DateTime<Utc>,
        ) -> Result<Vec<ResponseRecord>> {
            Ok(Vec::new())
        }
    }

    /// Feed that fails registration until `failures_remaining` reaches zero.
    struct FlakyFeed {
        failures_remaining: Mutex<u32>,
        attempts: AtomicUsize,
    }

    impl FlakyFeed {
        fn failing(failures: u32) -> Self {
            Self {
                failures_remaining: Mutex::new(failures),
                attempts: AtomicUsize::new(0),
            }
        }
    }

    impl ChangeFeed for FlakyFeed {
        fn register(&self, survey_id: &str) -> Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let mut remaining = self.failures_remaining.lock();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(Error::Feed(format!("transport down for {}", survey_id)));
            }
            Ok(())
        }

        fn unregister(&self, _survey_id: &str) {}
    }

    fn fast_policy(max_attempts: u32) -> ReconnectPolicy {
        ReconnectPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        }
    }

    fn make_subscription(feed: Arc<FlakyFeed>, policy: ReconnectPolicy) -> ResilientSubscription {
        let analytics = Arc::new(LiveAnalytics::new(
            Arc::new(EmptySource),
            feed,
            crate::config::RealtimeConfig::default(),
        ));
        ResilientSubscription::with_policy(analytics, "survey-1", Arc::new(|_, _| {}), policy)
    }

    #[test]
    fn test_backoff_schedule() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(4000));
        assert_eq!(policy.delay_for(4), Duration::from_millis(16000));
        // Capped at 30s from attempt 5 on.
        assert_eq!(policy.delay_for(5), Duration::from_millis(30000));
        assert_eq!(policy.delay_for(12), Duration::from_millis(30000));
    }

    #[tokio::test]
    async fn test_connect_succeeds_first_try() {
        let feed = Arc::new(FlakyFeed::failing(0));
        let mut sub = make_subscription(feed.clone(), fast_policy(5));

        sub.connect().await.unwrap();
        assert_eq!(sub.state(), ConnectionState::Active);
        assert_eq!(feed.attempts.load(Ordering::SeqCst), 1);

        sub.disconnect();
        assert_eq!(sub.state(), ConnectionState::Unsubscribed);
    }

    #[tokio::test]
    async fn test_connect_retries_then_succeeds() {
        let feed = Arc::new(FlakyFeed::failing(2));
        let mut sub = make_subscription(feed.clone(), fast_policy(5));

        sub.connect().await.unwrap();
        assert_eq!(sub.state(), ConnectionState::Active);
        assert_eq!(feed.attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_requires_manual_reconnect() {
        let feed = Arc::new(FlakyFeed::failing(10));
        let mut sub = make_subscription(feed.clone(), fast_policy(3));

        assert!(sub.connect().await.is_err());
        assert_eq!(sub.state(), ConnectionState::Failed);
        assert_eq!(feed.attempts.load(Ordering::SeqCst), 3);

        // No automatic retries happen in Failed; a manual reconnect once
        // the transport recovers brings the subscription up.
        *feed.failures_remaining.lock() = 0;
        sub.reconnect().await.unwrap();
        assert_eq!(sub.state(), ConnectionState::Active);
    }
}
