//! Fetch coordinator: one request-status machine per concern
//!
//! Every trigger bumps a generation counter. The in-flight task of the
//! previous generation is aborted, and any response that still reaches
//! `settle` with an old generation is dropped, so only the latest trigger can
//! ever update state.

use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;

use crate::{
    error::{FailureKind, ProviderError, TransitionError},
    metrics::{FetchMetrics, MetricsCollector},
    types::{Concern, DashboardEvent, EventKind, RequestStatus},
};

/// Network work for one trigger
pub type FetchFuture<T> = BoxFuture<'static, Result<T, ProviderError>>;

/// Read-only view of a concern at one point in time
///
/// `data` is only ever present while `status` is `Success`, so a reader cannot
/// see a previous key's result under a newer key's Loading or Error state.
#[derive(Debug)]
pub struct FetchSnapshot<T> {
    pub status: RequestStatus,
    /// Trigger key of the latest request (e.g. the asset id)
    pub key: Option<String>,
    pub generation: u64,
    pub failure: Option<FailureKind>,
    data: Option<Arc<T>>,
}

impl<T> Clone for FetchSnapshot<T> {
    fn clone(&self) -> Self {
        Self {
            status: self.status,
            key: self.key.clone(),
            generation: self.generation,
            failure: self.failure,
            data: self.data.clone(),
        }
    }
}

impl<T> FetchSnapshot<T> {
    pub fn data(&self) -> Option<&Arc<T>> {
        self.data.as_ref()
    }

    pub fn into_data(self) -> Option<Arc<T>> {
        self.data
    }
}

struct FetchSlot<T> {
    status: RequestStatus,
    key: Option<String>,
    generation: u64,
    data: Option<Arc<T>>,
    failure: Option<FailureKind>,
    in_flight: Option<JoinHandle<()>>,
}

impl<T> FetchSlot<T> {
    fn set_status(&mut self, next: RequestStatus) -> Result<(), TransitionError> {
        self.status = self.status.transition(next)?;
        Ok(())
    }
}

/// Shared pieces a spawned fetch task needs to settle its result
struct Settler<T> {
    concern: Concern,
    slot: Arc<RwLock<FetchSlot<T>>>,
    events: broadcast::Sender<DashboardEvent>,
    metrics: Arc<MetricsCollector>,
}

fn emit(events: &broadcast::Sender<DashboardEvent>, kind: EventKind) {
    // No subscribers is fine
    let _ = events.send(DashboardEvent::new(kind));
}

impl<T: Send + Sync + 'static> Settler<T> {
    async fn settle(
        self,
        key: String,
        generation: u64,
        result: Result<T, ProviderError>,
        elapsed: Duration,
    ) {
        let mut slot = self.slot.write().await;

        if slot.generation != generation {
            drop(slot);
            tracing::debug!(
                concern = %self.concern,
                key = %key,
                generation,
                "Discarding stale response"
            );
            self.metrics.record_superseded().await;
            emit(
                &self.events,
                EventKind::FetchSuperseded {
                    concern: self.concern,
                    key,
                    generation,
                },
            );
            return;
        }

        slot.in_flight = None;

        let next = if result.is_ok() {
            RequestStatus::Success
        } else {
            RequestStatus::Error
        };
        if let Err(e) = slot.set_status(next) {
            tracing::warn!(concern = %self.concern, error = %e, "Ignoring response");
            return;
        }

        match result {
            Ok(data) => {
                slot.data = Some(Arc::new(data));
                drop(slot);

                tracing::debug!(
                    concern = %self.concern,
                    key = %key,
                    generation,
                    latency_ms = elapsed.as_millis() as u64,
                    "Fetch succeeded"
                );
                self.metrics.record_request(elapsed, true).await;
                emit(
                    &self.events,
                    EventKind::FetchSucceeded {
                        concern: self.concern,
                        key,
                        generation,
                    },
                );
            }
            Err(e) => {
                let failure = e.kind();
                slot.failure = Some(failure);
                drop(slot);

                tracing::warn!(
                    concern = %self.concern,
                    key = %key,
                    generation,
                    failure = ?failure,
                    error = %e,
                    "Fetch failed"
                );
                self.metrics.record_request(elapsed, false).await;
                emit(
                    &self.events,
                    EventKind::FetchFailed {
                        concern: self.concern,
                        key,
                        generation,
                        failure,
                    },
                );
            }
        }
    }
}

/// Owns the status and latest result of one fetch concern
pub struct FetchCoordinator<T> {
    concern: Concern,
    slot: Arc<RwLock<FetchSlot<T>>>,
    events: broadcast::Sender<DashboardEvent>,
    metrics: Arc<MetricsCollector>,
}

impl<T: Send + Sync + 'static> FetchCoordinator<T> {
    pub fn new(concern: Concern, events: broadcast::Sender<DashboardEvent>) -> Self {
        Self {
            concern,
            slot: Arc::new(RwLock::new(FetchSlot {
                status: RequestStatus::Idle,
                key: None,
                generation: 0,
                data: None,
                failure: None,
                in_flight: None,
            })),
            events,
            metrics: Arc::new(MetricsCollector::new(concern)),
        }
    }

    pub fn concern(&self) -> Concern {
        self.concern
    }

    /// Starts a fetch for `key` unless that key is already loading or loaded
    ///
    /// Repeated triggers with the same key are no-ops, so re-renders never
    /// re-issue the request. A key whose last fetch failed is fetched again.
    /// Returns the new generation, or `None` when nothing was started.
    pub async fn trigger(&self, key: &str, fetch: FetchFuture<T>) -> Option<u64> {
        let mut slot = self.slot.write().await;
        let same_key = slot.key.as_deref() == Some(key);
        if same_key && matches!(slot.status, RequestStatus::Loading | RequestStatus::Success) {
            tracing::trace!(concern = %self.concern, key, "Trigger key unchanged, skipping fetch");
            return None;
        }
        Some(self.begin_locked(&mut slot, key, fetch).await)
    }

    /// Unconditionally starts a fetch for `key`, superseding any request in flight
    pub async fn begin_fetch(&self, key: &str, fetch: FetchFuture<T>) -> u64 {
        let mut slot = self.slot.write().await;
        self.begin_locked(&mut slot, key, fetch).await
    }

    async fn begin_locked(&self, slot: &mut FetchSlot<T>, key: &str, fetch: FetchFuture<T>) -> u64 {
        self.abort_in_flight(slot).await;

        if slot.status != RequestStatus::Loading {
            if let Err(e) = slot.set_status(RequestStatus::Loading) {
                tracing::warn!(concern = %self.concern, error = %e, "Unexpected status");
                slot.status = RequestStatus::Loading;
            }
        }
        slot.generation += 1;
        slot.key = Some(key.to_string());
        slot.data = None;
        slot.failure = None;

        let generation = slot.generation;
        tracing::debug!(concern = %self.concern, key, generation, "Fetch started");
        emit(
            &self.events,
            EventKind::FetchStarted {
                concern: self.concern,
                key: key.to_string(),
                generation,
            },
        );

        let settler = Settler {
            concern: self.concern,
            slot: self.slot.clone(),
            events: self.events.clone(),
            metrics: self.metrics.clone(),
        };
        let key = key.to_string();
        slot.in_flight = Some(tokio::spawn(async move {
            let started = Instant::now();
            let result = fetch.await;
            settler
                .settle(key, generation, result, started.elapsed())
                .await;
        }));

        generation
    }

    async fn abort_in_flight(&self, slot: &mut FetchSlot<T>) {
        let Some(handle) = slot.in_flight.take() else {
            return;
        };
        if handle.is_finished() {
            return;
        }
        handle.abort();

        let key = slot.key.clone().unwrap_or_default();
        tracing::debug!(
            concern = %self.concern,
            key = %key,
            generation = slot.generation,
            "Superseding in-flight request"
        );
        self.metrics.record_superseded().await;
        emit(
            &self.events,
            EventKind::FetchSuperseded {
                concern: self.concern,
                key,
                generation: slot.generation,
            },
        );
    }

    /// Aborts any in-flight request; its result will never be applied
    ///
    /// A concern cancelled while Loading is reset to Idle with no key, so the
    /// next trigger starts a fresh fetch even for the same key. Settled
    /// results are kept.
    pub async fn cancel(&self) {
        let mut slot = self.slot.write().await;
        self.abort_in_flight(&mut slot).await;
        slot.generation += 1;

        if slot.status == RequestStatus::Loading {
            // reset, not a transition: no request is outstanding any more
            slot.status = RequestStatus::Idle;
            slot.key = None;
            slot.data = None;
            slot.failure = None;
            tracing::debug!(concern = %self.concern, "Fetch cancelled, concern reset to idle");
        }
    }

    pub async fn snapshot(&self) -> FetchSnapshot<T> {
        let slot = self.slot.read().await;
        FetchSnapshot {
            status: slot.status,
            key: slot.key.clone(),
            generation: slot.generation,
            failure: slot.failure,
            data: slot.data.clone(),
        }
    }

    pub async fn status(&self) -> RequestStatus {
        self.slot.read().await.status
    }

    /// Latest result, only while the concern is in Success
    pub async fn data(&self) -> Option<Arc<T>> {
        self.slot.read().await.data.clone()
    }

    pub async fn metrics(&self) -> FetchMetrics {
        self.metrics.snapshot().await
    }
}
