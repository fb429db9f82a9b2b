use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::{
    domain::GroupId,
    messaging::{port::MessagingPort, types::MessagingCapabilities},
    Result,
};

#[derive(Clone, Copy, Debug)]
pub struct ThrottleConfig {
    /// Minimum spacing between *any* two sends.
    pub global_min_interval: Duration,
    /// Minimum spacing between sends to the same group.
    pub per_group_min_interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        // Signal rate-limits bursts from a single account.
        Self {
            global_min_interval: Duration::from_millis(250),
            per_group_min_interval: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug)]
struct IntervalLimiter {
    interval: Duration,
    next: Instant,
}

impl IntervalLimiter {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now(),
        }
    }

    /// Reserve the next slot and return the wait duration required before executing.
    fn reserve(&mut self) -> Duration {
        let now = Instant::now();
        let start = if now >= self.next { now } else { self.next };
        self.next = start + self.interval;
        start.saturating_duration_since(now)
    }
}

/// MessagingPort decorator that spaces out outbound sends.
pub struct ThrottledMessenger {
    inner: Arc<dyn MessagingPort>,
    cfg: ThrottleConfig,
    global: Mutex<IntervalLimiter>,
    per_group: Mutex<HashMap<GroupId, Arc<Mutex<IntervalLimiter>>>>,
}

impl ThrottledMessenger {
    pub fn new(inner: Arc<dyn MessagingPort>, cfg: ThrottleConfig) -> Self {
        Self {
            inner,
            cfg,
            global: Mutex::new(IntervalLimiter::new(cfg.global_min_interval)),
            per_group: Mutex::new(HashMap::new()),
        }
    }

    async fn limiter_for_group(&self, group: &GroupId) -> Arc<Mutex<IntervalLimiter>> {
        let mut map = self.per_group.lock().await;
        map.entry(group.clone())
            .or_insert_with(|| {
                Arc::new(Mutex::new(IntervalLimiter::new(
                    self.cfg.per_group_min_interval,
                )))
            })
            .clone()
    }

    async fn throttle_group(&self, group: &GroupId) {
        let global_wait = { self.global.lock().await.reserve() };
        let group_wait = {
            let lim = self.limiter_for_group(group).await;
            let mut guard = lim.lock().await;
            guard.reserve()
        };

        let wait = global_wait.max(group_wait);
        if !wait.is_zero() {
            sleep(wait).await;
        }
    }
}

#[async_trait::async_trait]
impl MessagingPort for ThrottledMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        self.inner.capabilities()
    }

    async fn send_text(&self, group: &GroupId, text: &str) -> Result<()> {
        self.throttle_group(group).await;
        self.inner.send_text(group, text).await
    }
}
