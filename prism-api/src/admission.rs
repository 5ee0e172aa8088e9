//! Admission control for generation jobs and artifact downloads.
//!
//! Two independent counting semaphores bound how many generation jobs and
//! how many downloads are in flight. Slots are only handed out as
//! [`AdmissionPermit`] guards, so a slot is returned on every exit path,
//! including cancellation of the future that holds it.

use crate::telemetry::METRICS;
use prism_core::{PrismError, PrismResult};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

/// Which bounded resource a slot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotKind {
    Generation,
    Download,
}

impl SlotKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotKind::Generation => "generation",
            SlotKind::Download => "download",
        }
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct Limit {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl Limit {
    fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    fn in_flight(&self) -> usize {
        self.capacity
            .saturating_sub(self.semaphore.available_permits())
    }
}

/// Process-wide admission limits.
#[derive(Debug)]
pub struct AdmissionController {
    generation: Limit,
    download: Limit,
}

impl AdmissionController {
    /// Both capacities must be at least one.
    pub fn new(max_generations: usize, max_downloads: usize) -> PrismResult<Self> {
        if max_generations == 0 {
            return Err(PrismError::config(
                "MAX_CONCURRENT_GENERATIONS",
                "must be at least 1",
            ));
        }
        if max_downloads == 0 {
            return Err(PrismError::config(
                "MAX_CONCURRENT_DOWNLOADS",
                "must be at least 1",
            ));
        }
        Ok(Self {
            generation: Limit::new(max_generations),
            download: Limit::new(max_downloads),
        })
    }

    fn limit(&self, kind: SlotKind) -> &Limit {
        match kind {
            SlotKind::Generation => &self.generation,
            SlotKind::Download => &self.download,
        }
    }

    /// Wait for a free slot. Waiters are served roughly in arrival order.
    pub async fn acquire(&self, kind: SlotKind) -> PrismResult<AdmissionPermit> {
        let waited = Instant::now();
        let permit = Arc::clone(&self.limit(kind).semaphore)
            .acquire_owned()
            .await
            .map_err(|_| PrismError::internal(format!("{} admission closed", kind)))?;
        let permit = AdmissionPermit::new(kind, permit, waited.elapsed());
        tracing::debug!(
            slot = %kind,
            in_flight = self.in_flight(kind),
            capacity = self.capacity(kind),
            waited_ms = permit.waited.as_millis() as u64,
            "admission slot acquired"
        );
        Ok(permit)
    }

    /// Take a slot only if one is free right now.
    pub fn try_acquire(&self, kind: SlotKind) -> Option<AdmissionPermit> {
        Arc::clone(&self.limit(kind).semaphore)
            .try_acquire_owned()
            .ok()
            .map(|permit| AdmissionPermit::new(kind, permit, Duration::ZERO))
    }

    pub fn in_flight(&self, kind: SlotKind) -> usize {
        self.limit(kind).in_flight()
    }

    pub fn capacity(&self, kind: SlotKind) -> usize {
        self.limit(kind).capacity
    }

    pub fn snapshot(&self) -> AdmissionSnapshot {
        AdmissionSnapshot {
            generation_in_flight: self.in_flight(SlotKind::Generation),
            generation_capacity: self.capacity(SlotKind::Generation),
            download_in_flight: self.in_flight(SlotKind::Download),
            download_capacity: self.capacity(SlotKind::Download),
        }
    }
}

/// Point-in-time view of both limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AdmissionSnapshot {
    pub generation_in_flight: usize,
    pub generation_capacity: usize,
    pub download_in_flight: usize,
    pub download_capacity: usize,
}

/// One held admission slot. Dropping it frees the slot.
#[derive(Debug)]
pub struct AdmissionPermit {
    kind: SlotKind,
    waited: Duration,
    _permit: OwnedSemaphorePermit,
}

impl AdmissionPermit {
    fn new(kind: SlotKind, permit: OwnedSemaphorePermit, waited: Duration) -> Self {
        if let Ok(metrics) = METRICS.as_ref() {
            metrics.admission_acquired(kind.as_str());
        }
        Self {
            kind,
            waited,
            _permit: permit,
        }
    }

    pub fn kind(&self) -> SlotKind {
        self.kind
    }

    /// Time spent queued before the slot was granted.
    pub fn waited(&self) -> Duration {
        self.waited
    }
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        if let Ok(metrics) = METRICS.as_ref() {
            metrics.admission_released(self.kind.as_str());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_zero_capacity_is_rejected() {
        assert!(AdmissionController::new(0, 1).is_err());
        assert!(AdmissionController::new(1, 0).is_err());
    }

    #[tokio::test]
    async fn test_burst_never_exceeds_capacity() {
        let admission = Arc::new(AdmissionController::new(3, 2).unwrap());
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..12 {
            let admission = Arc::clone(&admission);
            let current = Arc::clone(&current);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                let _slot = admission.acquire(SlotKind::Generation).await.unwrap();
                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                current.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(peak.load(Ordering::SeqCst), 3);
        assert_eq!(admission.in_flight(SlotKind::Generation), 0);
    }

    #[tokio::test]
    async fn test_limits_are_independent() {
        let admission = AdmissionController::new(1, 1).unwrap();
        let _generation = admission.acquire(SlotKind::Generation).await.unwrap();
        assert!(admission.try_acquire(SlotKind::Generation).is_none());

        let download = admission.try_acquire(SlotKind::Download);
        assert!(download.is_some());
        assert_eq!(
            admission.snapshot(),
            AdmissionSnapshot {
                generation_in_flight: 1,
                generation_capacity: 1,
                download_in_flight: 1,
                download_capacity: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_slot_released_when_holder_errors() {
        let admission = AdmissionController::new(1, 1).unwrap();

        async fn failing(admission: &AdmissionController) -> PrismResult<()> {
            let _slot = admission.acquire(SlotKind::Download).await?;
            Err(PrismError::internal("boom"))
        }

        assert!(failing(&admission).await.is_err());
        assert_eq!(admission.in_flight(SlotKind::Download), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slot_released_when_holder_is_cancelled() {
        let admission = Arc::new(AdmissionController::new(1, 1).unwrap());
        let holder = {
            let admission = Arc::clone(&admission);
            tokio::spawn(async move {
                let _slot = admission.acquire(SlotKind::Generation).await.unwrap();
                tokio::time::sleep(Duration::from_secs(3600)).await;
            })
        };
        tokio::task::yield_now().await;
        assert_eq!(admission.in_flight(SlotKind::Generation), 1);

        holder.abort();
        let _ = holder.await;
        assert_eq!(admission.in_flight(SlotKind::Generation), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiter_reports_queue_time() {
        let admission = Arc::new(AdmissionController::new(1, 1).unwrap());
        let first = admission.acquire(SlotKind::Generation).await.unwrap();

        let waiter = {
            let admission = Arc::clone(&admission);
            tokio::spawn(async move { admission.acquire(SlotKind::Generation).await.unwrap().waited() })
        };
        tokio::time::sleep(Duration::from_secs(5)).await;
        drop(first);
        assert!(waiter.await.unwrap() >= Duration::from_secs(5));
    }
}
