//! Config change notification
//!
//! One-shot, key-scoped publish/subscribe used by long-poll requests. A
//! subscription receives at most one config and must be renewed afterwards.
//! Subscribing after a notification has fired waits for the next change.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::oneshot;

use tamarind_persistence::{Config, ConfigKey};

/// Default long-poll window
pub const DEFAULT_WATCH_TIMEOUT: Duration = Duration::from_secs(30);

struct Waiter {
    id: u64,
    sender: oneshot::Sender<Config>,
}

#[derive(Default)]
struct WatcherInner {
    waiters: DashMap<ConfigKey, Vec<Waiter>>,
    next_id: AtomicU64,
}

/// Result of a long-poll wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
    /// The key changed; carries the new config or the deletion sentinel
    Changed(Config),
    /// The window elapsed without a change
    Timeout,
}

/// Registry of pending long-poll subscriptions
#[derive(Clone, Default)]
pub struct Watcher {
    inner: Arc<WatcherInner>,
}

impl Watcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register interest in the next change of `key`
    pub fn subscribe(&self, key: ConfigKey) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = oneshot::channel();

        self.inner
            .waiters
            .entry(key.clone())
            .or_default()
            .push(Waiter { id, sender });

        Subscription {
            key,
            id,
            receiver,
            watcher: self.inner.clone(),
        }
    }

    /// Deliver `config` to every subscriber of its key and clear them
    ///
    /// Never blocks. Subscribers that went away in the meantime are skipped.
    /// Returns the number of subscribers reached.
    pub fn notify(&self, config: &Config) -> usize {
        let Some((_, waiters)) = self.inner.waiters.remove(&config.config_key()) else {
            return 0;
        };

        waiters
            .into_iter()
            .map(|waiter| waiter.sender.send(config.clone()))
            .filter(Result::is_ok)
            .count()
    }

    /// Block until `key` changes or `timeout` elapses
    ///
    /// Cancelling the returned future releases the subscription.
    pub async fn wait(&self, key: ConfigKey, timeout: Duration) -> WatchOutcome {
        match tokio::time::timeout(timeout, self.subscribe(key)).await {
            Ok(Some(config)) => WatchOutcome::Changed(config),
            _ => WatchOutcome::Timeout,
        }
    }

    /// Number of pending subscriptions for a key
    pub fn subscriber_count(&self, key: &ConfigKey) -> usize {
        self.inner.waiters.get(key).map(|w| w.len()).unwrap_or(0)
    }

    /// Number of keys with at least one pending subscription
    pub fn watched_keys(&self) -> usize {
        self.inner.waiters.len()
    }
}

/// Pending subscription resolving to the next config of its key
///
/// Dropping it before delivery removes it from the registry.
pub struct Subscription {
    key: ConfigKey,
    id: u64,
    receiver: oneshot::Receiver<Config>,
    watcher: Arc<WatcherInner>,
}

impl Future for Subscription {
    type Output = Option<Config>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        Pin::new(&mut this.receiver).poll(cx).map(Result::ok)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(mut waiters) = self.watcher.waiters.get_mut(&self.key) {
            waiters.retain(|w| w.id != self.id);
            if waiters.is_empty() {
                drop(waiters);
                self.watcher
                    .waiters
                    .remove_if(&self.key, |_, w| w.is_empty());
            }
        }
    }
}
