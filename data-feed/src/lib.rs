use std::pin::Pin;
use std::time::Duration;

use futures_core::Stream;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use chart_core::Tick;

pub mod synthetic;

pub use synthetic::{default_universe, SeriesSpec, SyntheticConfig, SyntheticFeed, TickShape};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("feed closed")]
    Closed,
}

/// Connection health reported alongside data. Transport failures are
/// non-fatal status, never panics; reconnection policy belongs to the
/// transport itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedStatus {
    Connected,
    Disconnected { reason: String },
    Closed,
}

/// Events delivered to a chart host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataEvent {
    /// One batch of ticks, possibly spanning several symbols.
    Batch(Vec<Tick>),
    Status(FeedStatus),
}

/// Consumer interface for feed events. The core is agnostic to whether a live
/// push transport or a local synthetic generator sits behind it.
pub trait DataSink: Send {
    fn on_event(&mut self, event: DataEvent);
}

impl<F> DataSink for F
where
    F: FnMut(DataEvent) + Send,
{
    fn on_event(&mut self, event: DataEvent) {
        self(event)
    }
}

/// Abstract batch source; concrete transports live elsewhere.
pub type BatchStream<E> = Pin<Box<dyn Stream<Item = Result<Vec<Tick>, E>> + Send + 'static>>;

pub trait DataSource {
    type Error;

    fn subscribe(&self, symbols: &[String]) -> BatchStream<Self::Error>;
}

/// Handle to a running feed task. Dropping it (or calling
/// [`Subscription::stop`]) aborts the task; holding on to a dead chart's
/// subscription is a resource leak.
#[derive(Debug)]
pub struct Subscription {
    handle: tokio::task::JoinHandle<()>,
}

impl Subscription {
    pub fn stop(self) {
        self.handle.abort();
        debug!("feed subscription stopped");
    }

    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Drive a synthetic feed into a sink: the initial batch immediately, then
/// one batch per interval, until the subscription is dropped.
pub fn spawn_feed<S>(mut feed: SyntheticFeed, interval: Duration, mut sink: S) -> Subscription
where
    S: DataSink + 'static,
{
    let handle = tokio::spawn(async move {
        sink.on_event(DataEvent::Status(FeedStatus::Connected));
        let mut timer = tokio::time::interval(interval);
        loop {
            timer.tick().await;
            sink.on_event(DataEvent::Batch(feed.next_batch()));
        }
    });
    Subscription { handle }
}

/// Fan a fallible transport result into sink events: batches pass through,
/// errors degrade to a logged `Disconnected` status.
pub fn deliver<S: DataSink>(sink: &mut S, result: Result<Vec<Tick>, FeedError>) {
    match result {
        Ok(batch) => sink.on_event(DataEvent::Batch(batch)),
        Err(err) => {
            warn!(%err, "feed transport failure");
            sink.on_event(DataEvent::Status(FeedStatus::Disconnected {
                reason: err.to_string(),
            }));
        }
    }
}
