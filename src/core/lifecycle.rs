/// Lifecycle Tracking
///
/// Counts served tool calls and the time of the last one, and decides when a
/// long-running deployment has used up its request budget. The core only
/// raises a `ShutdownSignal`; stopping the process is left to the transport.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::watch;

/// Default advisory TTL reported in health responses.
pub const DEFAULT_TTL_EXTEND_SECONDS: u64 = 3600;

/// Default delay between budget exhaustion and the transport stopping.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_millis(1000);

/// Lifecycle policy, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleConfig {
    /// Request budget. `None` means unlimited.
    pub max_requests: Option<u64>,
    /// Advisory idle TTL for an external supervisor. Never enforced here.
    pub ttl_extend_seconds: u64,
    pub shutdown_grace: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            max_requests: None,
            ttl_extend_seconds: DEFAULT_TTL_EXTEND_SECONDS,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

/// Point-in-time view of the lifecycle counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleStatus {
    #[serde(rename = "requests")]
    pub request_count: u64,
    pub max_requests: Option<u64>,
    pub requests_remaining: Option<u64>,
    /// Milliseconds since the Unix epoch.
    pub last_activity_time: u64,
    pub ttl_extend_seconds: u64,
}

/// One-shot shutdown request shared between the dispatcher and its transport.
#[derive(Debug)]
pub struct ShutdownSignal {
    tx: watch::Sender<bool>,
    grace: Duration,
}

impl ShutdownSignal {
    pub fn new(grace: Duration) -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx, grace }
    }

    /// Request shutdown. Returns `true` only for the first trigger.
    pub fn trigger(&self) -> bool {
        self.tx.send_if_modified(|requested| {
            if *requested {
                false
            } else {
                *requested = true;
                true
            }
        })
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    /// Resolves once shutdown has been requested and the grace delay elapsed.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|requested| *requested).await;
        tokio::time::sleep(self.grace).await;
    }
}

/// Process-wide request counters and budget policy.
#[derive(Debug)]
pub struct Lifecycle {
    request_count: AtomicU64,
    last_activity_ms: AtomicU64,
    max_requests: Option<u64>,
    ttl_extend_seconds: u64,
    shutdown: ShutdownSignal,
}

impl Lifecycle {
    pub fn new(config: LifecycleConfig) -> Self {
        Self {
            request_count: AtomicU64::new(0),
            last_activity_ms: AtomicU64::new(now_millis()),
            max_requests: config.max_requests,
            ttl_extend_seconds: config.ttl_extend_seconds,
            shutdown: ShutdownSignal::new(config.shutdown_grace),
        }
    }

    /// Count one served request and refresh the activity time.
    ///
    /// Returns the new request count.
    pub fn record_request(&self) -> u64 {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst) + 1;
        self.last_activity_ms.fetch_max(now_millis(), Ordering::SeqCst);
        count
    }

    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    pub fn max_requests(&self) -> Option<u64> {
        self.max_requests
    }

    pub fn requests_remaining(&self) -> Option<u64> {
        self.max_requests
            .map(|max| max.saturating_sub(self.request_count()))
    }

    /// True once the configured budget has been used up; stays true afterwards.
    pub fn should_shutdown(&self) -> bool {
        matches!(self.max_requests, Some(max) if self.request_count() >= max)
    }

    pub fn status(&self) -> LifecycleStatus {
        let request_count = self.request_count();
        LifecycleStatus {
            request_count,
            max_requests: self.max_requests,
            requests_remaining: self.max_requests.map(|max| max.saturating_sub(request_count)),
            last_activity_time: self.last_activity_ms.load(Ordering::SeqCst),
            ttl_extend_seconds: self.ttl_extend_seconds,
        }
    }

    pub fn shutdown_signal(&self) -> &ShutdownSignal {
        &self.shutdown
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new(LifecycleConfig::default())
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
