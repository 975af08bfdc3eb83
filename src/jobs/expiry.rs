//! Daily digest of products that expire soon.

use std::{collections::HashMap, fmt::Write as _, sync::Arc};

use chrono::{Days, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::{RunGuard, RunOutcome};
use crate::{
    app_error::AppError,
    config::ExpiryAlertConfig,
    models::{CategoryEntity, ProductDetailsEntity, ProductEntity},
    notify::Mailer,
    store::{Store, finish},
};

const NAME_WIDTH: usize = 28;
const CATEGORY_WIDTH: usize = 14;

#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpiryRun {
    /// Detail rows inside the window and not yet alerted today.
    pub matched: usize,
    pub dispatched: bool,
}

pub struct ExpiryAlertJob {
    store: Arc<dyn Store>,
    mailer: Arc<dyn Mailer>,
    config: ExpiryAlertConfig,
    guard: RunGuard,
}

impl ExpiryAlertJob {
    pub fn new(store: Arc<dyn Store>, mailer: Arc<dyn Mailer>, config: ExpiryAlertConfig) -> Self {
        Self {
            store,
            mailer,
            config,
            guard: RunGuard::default(),
        }
    }

    pub fn schedule(&self) -> &super::cron::CronSchedule {
        &self.config.cron
    }

    pub async fn run(&self) -> Result<RunOutcome<ExpiryRun>, AppError> {
        self.run_on(Utc::now().date_naive()).await
    }

    pub async fn run_on(&self, today: NaiveDate) -> Result<RunOutcome<ExpiryRun>, AppError> {
        let Some(_permit) = self.guard.try_acquire() else {
            tracing::info!("Expiry job still running, skipping");
            return Ok(RunOutcome::AlreadyRunning);
        };

        let recipients = &self.config.admin_emails;
        if recipients.is_empty() {
            return Ok(RunOutcome::Completed(ExpiryRun::default()));
        }

        let days = u64::try_from(self.config.alert_days).unwrap_or(0);
        let end = today.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX);

        let mut tx = self.store.begin().await?;
        let result = async {
            let expiring = tx.expiring_not_alerted(today, end, today).await?;
            if expiring.is_empty() {
                return Ok((expiring, HashMap::new(), HashMap::new()));
            }

            let mut product_ids: Vec<i32> = expiring.iter().map(|d| d.product_id).collect();
            product_ids.sort_unstable();
            product_ids.dedup();
            let products: HashMap<i32, ProductEntity> = tx
                .find_products(&product_ids)
                .await?
                .into_iter()
                .map(|p| (p.id, p))
                .collect();

            let mut category_ids: Vec<i32> = products.values().map(|p| p.category_id).collect();
            category_ids.sort_unstable();
            category_ids.dedup();
            let categories: HashMap<i32, CategoryEntity> = tx
                .find_categories(&category_ids)
                .await?
                .into_iter()
                .map(|c| (c.id, c))
                .collect();

            Ok::<_, AppError>((expiring, products, categories))
        }
        .await;
        let (expiring, products, categories) = finish(tx, result).await?;

        if expiring.is_empty() {
            return Ok(RunOutcome::Completed(ExpiryRun::default()));
        }

        let subject = format!(
            "PharmaConnect: Expiry Alert (Next {} days)",
            self.config.alert_days
        );
        let body = digest(today, self.config.alert_days, &expiring, &products, &categories);
        if let Err(err) = self.mailer.send(recipients, &subject, &body).await {
            tracing::warn!(matched = expiring.len(), error = %err, "Expiry digest failed");
            return Ok(RunOutcome::Completed(ExpiryRun {
                matched: expiring.len(),
                dispatched: false,
            }));
        }

        let ids: Vec<i32> = expiring.iter().map(|d| d.id).collect();
        let mut tx = self.store.begin().await?;
        let marked = tx.mark_expiry_alerted(&ids, today).await.map_err(AppError::from);
        finish(tx, marked).await?;

        tracing::info!(matched = ids.len(), %today, "Expiry digest sent");
        Ok(RunOutcome::Completed(ExpiryRun {
            matched: ids.len(),
            dispatched: true,
        }))
    }
}

/// Keeps at most `max` characters, ending in `...` when cut.
fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        return value.to_string();
    }
    let kept: String = value.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

fn digest(
    today: NaiveDate,
    days: i64,
    expiring: &[ProductDetailsEntity],
    products: &HashMap<i32, ProductEntity>,
    categories: &HashMap<i32, CategoryEntity>,
) -> String {
    let mut body = String::new();
    let _ = writeln!(body, "Expiry alert: Products expiring within next {days} days");
    let _ = writeln!(body, "Date: {today}\n");
    let _ = writeln!(
        body,
        "{:<6} | {:<28} | {:<14} | {:<6} | {:<12}",
        "ID", "Product", "Category", "Stock", "Expiry"
    );
    let _ = writeln!(body, "{}", "-".repeat(76));

    for details in expiring {
        let product = products.get(&details.product_id);
        let name = product.map_or("Unknown", |p| p.name.as_str());
        let category = product
            .and_then(|p| categories.get(&p.category_id))
            .map_or("-", |c| c.name.as_str());
        let stock = product.map_or(0, |p| p.quantity);
        let expiry = details
            .expiry_date
            .map_or_else(|| "-".to_string(), |d| d.to_string());

        let _ = writeln!(
            body,
            "{:<6} | {:<28} | {:<14} | {:<6} | {:<12}",
            details.product_id,
            truncate(name, NAME_WIDTH),
            truncate(category, CATEGORY_WIDTH),
            stock,
            expiry
        );
    }

    body.push_str("\nAction: Review inventory, discount/remove near-expiry items, restock if needed.\n");
    body
}
