use std::sync::Arc;

use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

/// Bounds how many analyses run at once.
///
/// Cloning shares the same slots. Each orchestrator owns its own instance.
#[derive(Clone, Debug)]
pub struct AdmissionControl {
    slots: Arc<Semaphore>,
    capacity: usize,
}

impl AdmissionControl {
    /// Capacity must be at least 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Wait for a free slot. The slot is returned when the permit drops.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, AcquireError> {
        Arc::clone(&self.slots).acquire_owned().await
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently held.
    pub fn in_flight(&self) -> usize {
        self.capacity.saturating_sub(self.slots.available_permits())
    }

    /// Stop admitting; pending and future `acquire` calls fail.
    pub fn close(&self) {
        self.slots.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_slots_are_bounded() {
        let admission = AdmissionControl::new(2);
        let first = admission.acquire().await.unwrap();
        let _second = admission.acquire().await.unwrap();
        assert_eq!(admission.in_flight(), 2);

        let blocked = tokio::time::timeout(Duration::from_millis(20), admission.acquire()).await;
        assert!(blocked.is_err());

        drop(first);
        assert_eq!(admission.in_flight(), 1);
        assert!(admission.acquire().await.is_ok());
    }

    #[tokio::test]
    async fn test_clones_share_slots() {
        let admission = AdmissionControl::new(1);
        let clone = admission.clone();
        let _permit = clone.acquire().await.unwrap();
        assert_eq!(admission.in_flight(), 1);
    }

    #[tokio::test]
    async fn test_closed_admission_rejects() {
        let admission = AdmissionControl::new(1);
        admission.close();
        assert!(admission.acquire().await.is_err());
    }
}
