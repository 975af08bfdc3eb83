//! Background alert jobs and their schedulers.

pub mod cron;
pub mod expiry;
pub mod low_stock;

use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use chrono::Utc;
use tokio::task::JoinHandle;

use self::cron::CronSchedule;
pub use self::{expiry::ExpiryAlertJob, low_stock::LowStockAlertJob};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome<T> {
    Completed(T),
    /// Another run of the same job was still in progress.
    AlreadyRunning,
}

/// Single-flight flag shared by every trigger of one job.
#[derive(Debug, Default, Clone)]
pub struct RunGuard(Arc<AtomicBool>);

/// Held for the duration of a run; releases the guard on drop.
#[derive(Debug)]
pub struct RunPermit(Arc<AtomicBool>);

impl RunGuard {
    pub fn try_acquire(&self) -> Option<RunPermit> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunPermit(self.0.clone()))
    }
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs `run` immediately and then again `delay` after each run finishes.
pub fn spawn_fixed_delay<F, Fut>(name: &'static str, delay: Duration, run: F) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        tracing::info!(job = name, ?delay, "Job scheduled");
        loop {
            run().await;
            tokio::time::sleep(delay).await;
        }
    })
}

/// Runs `run` at every time matched by `schedule`, passing the fire time.
pub fn spawn_cron<F, Fut>(name: &'static str, schedule: CronSchedule, run: F) -> JoinHandle<()>
where
    F: Fn(chrono::DateTime<Utc>) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        tracing::info!(job = name, %schedule, "Job scheduled");
        loop {
            let now = Utc::now();
            let Some(next) = schedule.next_after(now) else {
                tracing::error!(job = name, %schedule, "Schedule never fires, stopping");
                return;
            };
            let wait = (next - now).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;
            run(next).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_admits_one_run_at_a_time() {
        let guard = RunGuard::default();
        let permit = guard.try_acquire().unwrap();
        assert!(guard.clone().try_acquire().is_none());
        drop(permit);
        assert!(guard.try_acquire().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn fixed_delay_reruns_after_each_pass() {
        let runs = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = runs.clone();
        let handle = spawn_fixed_delay("test", Duration::from_secs(60), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_secs(150)).await;
        handle.abort();
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }
}
