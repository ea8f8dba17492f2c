// libs/appointment-cell/src/services/locks.rs
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;
use uuid::Uuid;

/// A professional's calendar day; the unit of booking serialization.
pub type DayKey = (Uuid, NaiveDate);

const PRUNE_THRESHOLD: usize = 1024;

/// Hands out one async mutex per professional/day so that the availability
/// check and the write that depends on it happen as one unit.
#[derive(Default)]
pub struct DayLockRegistry {
    locks: Mutex<HashMap<DayKey, Arc<AsyncMutex<()>>>>,
}

/// Held for the duration of a check-then-write. Releases on drop.
pub struct DayGuard {
    keys: Vec<DayKey>,
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl DayGuard {
    pub fn keys(&self) -> &[DayKey] {
        &self.keys
    }
}

impl DayLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock_day(&self, professional_id: Uuid, date: NaiveDate) -> DayGuard {
        self.lock_days(vec![(professional_id, date)]).await
    }

    /// Keys are sorted and deduplicated first, so two callers asking for the
    /// same pair of days in opposite order cannot deadlock.
    pub async fn lock_days(&self, mut keys: Vec<DayKey>) -> DayGuard {
        keys.sort();
        keys.dedup();

        let mut guards = Vec::with_capacity(keys.len());
        for key in &keys {
            let handle = self.handle(*key);
            guards.push(handle.lock_owned().await);
        }

        debug!("Acquired {} day lock(s)", keys.len());
        DayGuard { keys, _guards: guards }
    }

    pub fn tracked_days(&self) -> usize {
        self.locks.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    fn handle(&self, key: DayKey) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());

        if locks.len() >= PRUNE_THRESHOLD {
            // only the registry holds idle entries
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }

        locks.entry(key).or_default().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    #[tokio::test]
    async fn same_day_is_exclusive() {
        let registry = Arc::new(DayLockRegistry::new());
        let professional = Uuid::new_v4();

        let guard = registry.lock_day(professional, day(2)).await;

        let contender = {
            let registry = registry.clone();
            tokio::spawn(async move {
                registry.lock_day(professional, day(2)).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn different_days_do_not_block() {
        let registry = DayLockRegistry::new();
        let professional = Uuid::new_v4();

        let _monday = registry.lock_day(professional, day(2)).await;
        let tuesday = tokio::time::timeout(
            Duration::from_millis(100),
            registry.lock_day(professional, day(3)),
        )
        .await;
        assert!(tuesday.is_ok());
    }

    #[tokio::test]
    async fn multi_day_keys_are_sorted_and_deduplicated() {
        let registry = DayLockRegistry::new();
        let professional = Uuid::new_v4();

        let guard = registry
            .lock_days(vec![(professional, day(5)), (professional, day(2)), (professional, day(5))])
            .await;
        assert_eq!(guard.keys(), &[(professional, day(2)), (professional, day(5))]);
        assert_eq!(registry.tracked_days(), 2);
    }
}
