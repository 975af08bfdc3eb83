//! Periodic low-stock mail to the stock admins, rate-limited per product.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::{RunGuard, RunOutcome};
use crate::{
    app_error::AppError,
    config::StockAlertConfig,
    models::{ProductEntity, StockAlertLogEntity},
    notify::Mailer,
    store::{Store, finish},
};

#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LowStockRun {
    /// Products at or below the threshold.
    pub low: usize,
    pub alerted: usize,
    pub failed: usize,
}

pub struct LowStockAlertJob {
    store: Arc<dyn Store>,
    mailer: Arc<dyn Mailer>,
    config: StockAlertConfig,
    guard: RunGuard,
}

impl LowStockAlertJob {
    pub fn new(store: Arc<dyn Store>, mailer: Arc<dyn Mailer>, config: StockAlertConfig) -> Self {
        Self {
            store,
            mailer,
            config,
            guard: RunGuard::default(),
        }
    }

    pub fn interval(&self) -> std::time::Duration {
        self.config.interval
    }

    pub async fn run(&self) -> Result<RunOutcome<LowStockRun>, AppError> {
        self.run_at(Utc::now()).await
    }

    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<RunOutcome<LowStockRun>, AppError> {
        let Some(_permit) = self.guard.try_acquire() else {
            tracing::info!("Low-stock job still running, skipping");
            return Ok(RunOutcome::AlreadyRunning);
        };

        let recipients = &self.config.admin_emails;
        if recipients.is_empty() {
            return Ok(RunOutcome::Completed(LowStockRun::default()));
        }

        let mut tx = self.store.begin().await?;
        let result = async {
            let low = tx.products_at_or_below(self.config.low_threshold).await?;
            let mut logs = HashMap::new();
            for product in &low {
                if let Some(log) = tx.find_alert_log(product.id).await? {
                    logs.insert(product.id, log);
                }
            }
            Ok::<_, AppError>((low, logs))
        }
        .await;
        let (low, logs) = finish(tx, result).await?;

        let mut run = LowStockRun {
            low: low.len(),
            ..Default::default()
        };
        for product in &low {
            if !self.should_alert(product, logs.get(&product.id), now) {
                continue;
            }

            let (subject, body) = self.message(product);
            if let Err(err) = self.mailer.send(recipients, &subject, &body).await {
                tracing::warn!(product_id = product.id, error = %err, "Low-stock alert failed");
                run.failed += 1;
                continue;
            }

            let mut tx = self.store.begin().await?;
            let saved = tx
                .save_alert_log(StockAlertLogEntity {
                    product_id: product.id,
                    last_alert_at: now,
                    last_quantity: product.quantity,
                })
                .await
                .map_err(AppError::from);
            finish(tx, saved).await?;
            run.alerted += 1;
        }

        tracing::info!(
            low = run.low,
            alerted = run.alerted,
            failed = run.failed,
            "Low-stock job finished"
        );
        Ok(RunOutcome::Completed(run))
    }

    /// Alert when never alerted, when the cooldown has passed, or when the
    /// quantity moved since the last alert.
    fn should_alert(
        &self,
        product: &ProductEntity,
        log: Option<&StockAlertLogEntity>,
        now: DateTime<Utc>,
    ) -> bool {
        match log {
            None => true,
            Some(log) => {
                log.last_alert_at < now - self.config.cooldown
                    || log.last_quantity != product.quantity
            }
        }
    }

    fn message(&self, product: &ProductEntity) -> (String, String) {
        let subject = format!("LOW STOCK ALERT: {}", product.name);
        let body = format!(
            "Low stock detected.\n\n\
             Product: {} (ID: {})\n\
             Quantity left: {}\n\
             Threshold: {}\n\n\
             Please restock soon.",
            product.name, product.id, product.quantity, self.config.low_threshold
        );
        (subject, body)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::{
        store::MemoryStore,
        test_utils::{RecordingMailer, seed_category, seed_product},
    };

    fn config() -> StockAlertConfig {
        StockAlertConfig {
            low_threshold: 10,
            admin_emails: vec!["stock@pharma.test".to_string()],
            ..Default::default()
        }
    }

    fn job(store: &MemoryStore, mailer: &Arc<RecordingMailer>, config: StockAlertConfig) -> LowStockAlertJob {
        LowStockAlertJob::new(Arc::new(store.clone()), mailer.clone(), config)
    }

    fn completed(outcome: RunOutcome<LowStockRun>) -> LowStockRun {
        match outcome {
            RunOutcome::Completed(run) => run,
            RunOutcome::AlreadyRunning => panic!("job was not expected to be busy"),
        }
    }

    async fn set_quantity(store: &MemoryStore, product: &ProductEntity, quantity: i32) {
        let mut tx = store.begin().await.unwrap();
        let current = tx.find_product(product.id).await.unwrap().unwrap().quantity;
        tx.decrement_stock(product.id, current - quantity).await.unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn threshold_is_inclusive() {
        let store = MemoryStore::new();
        let mailer = RecordingMailer::new();
        let category = seed_category(&store, "Pain relief").await.unwrap();
        seed_product(&store, category.id, "At threshold", 10, 1.0).await.unwrap();
        seed_product(&store, category.id, "Above threshold", 11, 1.0).await.unwrap();

        let run = completed(job(&store, &mailer, config()).run().await.unwrap());
        assert_eq!(run, LowStockRun { low: 1, alerted: 1, failed: 0 });

        let mails = mailer.sent();
        assert_eq!(mails[0].recipients, vec!["stock@pharma.test"]);
        assert_eq!(mails[0].subject, "LOW STOCK ALERT: At threshold");
        assert!(mails[0].body.contains("Quantity left: 10"));
        assert!(mails[0].body.contains("Threshold: 10"));
    }

    #[tokio::test]
    async fn cooldown_suppresses_repeats_until_quantity_changes() {
        let store = MemoryStore::new();
        let mailer = RecordingMailer::new();
        let category = seed_category(&store, "Pain relief").await.unwrap();
        let product = seed_product(&store, category.id, "Naproxen", 3, 1.0).await.unwrap();
        let job = job(&store, &mailer, config());
        let start = Utc::now();

        completed(job.run_at(start).await.unwrap());
        let again = completed(job.run_at(start + Duration::minutes(5)).await.unwrap());
        assert_eq!(again.alerted, 0);
        assert_eq!(mailer.sent().len(), 1);

        set_quantity(&store, &product, 2).await;
        let moved = completed(job.run_at(start + Duration::minutes(10)).await.unwrap());
        assert_eq!(moved.alerted, 1);

        let expired = completed(job.run_at(start + Duration::minutes(75)).await.unwrap());
        assert_eq!(expired.alerted, 1);
        assert_eq!(mailer.sent().len(), 3);
    }

    #[tokio::test]
    async fn failed_send_leaves_log_untouched() {
        let store = MemoryStore::new();
        let mailer = RecordingMailer::new();
        let category = seed_category(&store, "Pain relief").await.unwrap();
        let product = seed_product(&store, category.id, "Diclofenac", 1, 1.0).await.unwrap();
        let job = job(&store, &mailer, config());

        mailer.set_failing(true);
        let run = completed(job.run().await.unwrap());
        assert_eq!((run.alerted, run.failed), (0, 1));
        let mut tx = store.begin().await.unwrap();
        assert!(tx.find_alert_log(product.id).await.unwrap().is_none());
        tx.rollback().await.unwrap();

        mailer.set_failing(false);
        let run = completed(job.run().await.unwrap());
        assert_eq!(run.alerted, 1);
    }

    #[tokio::test]
    async fn no_recipients_means_no_work() {
        let store = MemoryStore::new();
        let mailer = RecordingMailer::new();
        let category = seed_category(&store, "Pain relief").await.unwrap();
        seed_product(&store, category.id, "Codeine", 0, 1.0).await.unwrap();

        let quiet = StockAlertConfig {
            admin_emails: Vec::new(),
            ..config()
        };
        let run = completed(job(&store, &mailer, quiet).run().await.unwrap());
        assert_eq!(run, LowStockRun::default());
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn overlapping_run_is_skipped() {
        let store = MemoryStore::new();
        let mailer = RecordingMailer::new();
        let job = job(&store, &mailer, config());

        let _permit = job.guard.try_acquire().unwrap();
        assert_eq!(job.run().await.unwrap(), RunOutcome::AlreadyRunning);
    }
}
