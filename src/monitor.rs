//! Per-package monitor task.
//!
//! One task runs per actively tracked record. It advances the record's
//! active time once per tick, stops the moment the coordinator clears
//! `is_active`, and on hitting the limit kills the package, starts the ban
//! window, and exits.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::enforce::Enforcer;
use crate::record::SharedRecord;

/// Spawn the monitor task for one record.
///
/// The caller must have set `is_active = true` on the record before
/// spawning; the task clears it again on its own exit.
pub fn spawn_monitor(
    record: SharedRecord,
    limit: Duration,
    tick: Duration,
    enforcer: Arc<dyn Enforcer>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        run_monitor(record, limit, tick, enforcer).await;
    })
}

async fn run_monitor(
    record: SharedRecord,
    limit: Duration,
    tick: Duration,
    enforcer: Arc<dyn Enforcer>,
) {
    // Fold the pause since the last observed activity into the session,
    // resetting it if the gap crossed the idle threshold.
    {
        let mut rec = record.lock().await;
        if rec.fold_pause_gap(Instant::now()) {
            info!("{} was idle past threshold, session reset", rec.package);
        }
    }

    loop {
        let package = {
            let mut rec = record.lock().await;
            if !rec.is_active {
                debug!("monitor for {} cancelled", rec.package);
                return;
            }

            let now = Instant::now();
            rec.recompute_active(now);

            // Limit comparison at whole-second granularity, >= tie-break
            if rec.accumulated_active.as_secs() >= limit.as_secs() {
                rec.is_limited = true;
                rec.ban_started_at = Some(now);
                rec.session_start = None;
                rec.is_active = false;
                info!(
                    "time's up for {} after {:?} active",
                    rec.package, rec.accumulated_active
                );
                Some(rec.package.clone())
            } else {
                if !rec.is_limited {
                    rec.last_paused_at = Some(now);
                }
                None
            }
        };

        // Enforcement runs outside the record lock
        if let Some(package) = package {
            enforcer.kill(&package).await;
            enforcer.notify("Time's Up").await;
            return;
        }

        tokio::time::sleep(tick).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::UsageRecord;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::sync::Mutex;

    const TICK: Duration = Duration::from_millis(10);

    /// Mock enforcer that counts invocations
    #[derive(Default)]
    struct MockEnforcer {
        kills: AtomicU32,
        notifies: AtomicU32,
    }

    #[async_trait]
    impl Enforcer for MockEnforcer {
        async fn kill(&self, _package: &str) {
            self.kills.fetch_add(1, Ordering::SeqCst);
        }

        async fn notify(&self, _message: &str) {
            self.notifies.fetch_add(1, Ordering::SeqCst);
        }

        async fn notify_bottom(&self, _message: &str) {
            self.notifies.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn active_record() -> SharedRecord {
        let mut rec =
            UsageRecord::new("com.example.app", Duration::from_secs(10), Duration::from_secs(5));
        rec.is_active = true;
        Arc::new(Mutex::new(rec))
    }

    #[tokio::test]
    async fn limit_reached_enforces_once_and_starts_ban() {
        let record = active_record();
        {
            let mut rec = record.lock().await;
            rec.session_start = Some(Instant::now() - Duration::from_secs(2));
        }
        let enforcer = Arc::new(MockEnforcer::default());

        let handle = spawn_monitor(
            Arc::clone(&record),
            Duration::from_secs(1),
            TICK,
            Arc::clone(&enforcer) as Arc<dyn Enforcer>,
        );
        handle.await.unwrap();

        let rec = record.lock().await;
        assert!(rec.is_limited);
        assert!(rec.ban_started_at.is_some());
        assert!(rec.session_start.is_none());
        assert!(!rec.is_active, "task exit must clear is_active");
        assert_eq!(enforcer.kills.load(Ordering::SeqCst), 1);
        assert_eq!(enforcer.notifies.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn clearing_is_active_cancels_within_one_tick() {
        let record = active_record();
        let enforcer = Arc::new(MockEnforcer::default());

        let handle = spawn_monitor(
            Arc::clone(&record),
            Duration::from_secs(3600),
            TICK,
            Arc::clone(&enforcer) as Arc<dyn Enforcer>,
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        record.lock().await.is_active = false;

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("monitor must observe cancellation promptly")
            .unwrap();

        let rec = record.lock().await;
        assert!(!rec.is_limited);
        assert_eq!(enforcer.kills.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn accumulated_time_tracks_wall_clock_minus_pauses() {
        let record = active_record();
        let enforcer = Arc::new(MockEnforcer::default());

        let handle = spawn_monitor(
            Arc::clone(&record),
            Duration::from_secs(3600),
            TICK,
            enforcer as Arc<dyn Enforcer>,
        );

        tokio::time::sleep(Duration::from_millis(200)).await;
        {
            let rec = record.lock().await;
            let elapsed = rec.session_start.unwrap().elapsed();
            let drift = elapsed
                .saturating_sub(rec.accumulated_active)
                .saturating_sub(rec.total_paused);
            assert!(
                drift <= Duration::from_millis(100),
                "accumulation lagged by {:?}",
                drift
            );
        }

        record.lock().await.is_active = false;
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn idle_gap_on_entry_resets_session() {
        let record = active_record();
        {
            let mut rec = record.lock().await;
            rec.accumulated_active = Duration::from_secs(4);
            rec.total_paused = Duration::from_secs(1);
            rec.last_paused_at = Some(Instant::now() - Duration::from_secs(6));
        }
        let enforcer = Arc::new(MockEnforcer::default());

        let handle = spawn_monitor(
            Arc::clone(&record),
            Duration::from_secs(3600),
            TICK,
            enforcer as Arc<dyn Enforcer>,
        );
        tokio::time::sleep(Duration::from_millis(50)).await;

        {
            let rec = record.lock().await;
            // New session: active time restarts from ~zero
            assert!(rec.accumulated_active < Duration::from_secs(1));
            assert_eq!(rec.total_paused, Duration::ZERO);
        }

        record.lock().await.is_active = false;
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn short_gap_on_entry_keeps_accumulated_time() {
        let record = active_record();
        {
            let mut rec = record.lock().await;
            rec.session_start = Some(Instant::now() - Duration::from_secs(5));
            rec.last_paused_at = Some(Instant::now() - Duration::from_secs(2));
        }
        let enforcer = Arc::new(MockEnforcer::default());

        let handle = spawn_monitor(
            Arc::clone(&record),
            Duration::from_secs(3600),
            TICK,
            enforcer as Arc<dyn Enforcer>,
        );
        tokio::time::sleep(Duration::from_millis(50)).await;

        {
            let rec = record.lock().await;
            // 5s wall clock minus the 2s pause gap
            assert_eq!(rec.accumulated_active.as_secs(), 3);
            assert_eq!(rec.total_paused.as_secs(), 2);
        }

        record.lock().await.is_active = false;
        handle.await.unwrap();
    }
}
