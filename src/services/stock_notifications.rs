//! Back-in-stock subscriptions.

use futures::{FutureExt, StreamExt, future::BoxFuture, stream};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    app_error::AppError,
    models::{CreateStockSubscriptionEntity, ProductEntity, StockSubscriptionEntity},
    notify::{MailError, Mailer, is_valid_email},
    store::{Store, finish},
};

/// Back-in-stock mails in flight at once.
const MAIL_CONCURRENCY: usize = 4;

#[derive(Deserialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeReq {
    pub product_id: i32,
    pub email: String,
}

/// Registers interest in a product. Subscribing again re-arms a subscription
/// that was already notified.
pub async fn subscribe(
    store: &dyn Store,
    product_id: i32,
    email: &str,
) -> Result<StockSubscriptionEntity, AppError> {
    let email = email.trim();
    if !is_valid_email(email) {
        return Err(AppError::Validation(format!("`{email}` is not a valid email")));
    }

    let mut tx = store.begin().await?;
    let result = async {
        tx.find_product(product_id)
            .await?
            .ok_or_else(|| AppError::not_found("Product", "productId", product_id))?;

        match tx.find_subscription(product_id, email).await? {
            Some(existing) => {
                tx.set_subscriptions_notified(&[existing.id], false).await?;
                Ok(StockSubscriptionEntity {
                    notified: false,
                    ..existing
                })
            }
            None => Ok(tx
                .insert_subscription(CreateStockSubscriptionEntity {
                    product_id,
                    email: email.to_string(),
                    notified: false,
                })
                .await?),
        }
    }
    .await;
    finish(tx, result).await
}

pub fn back_in_stock_subject(product: &ProductEntity) -> String {
    format!("Back in stock: {}", product.name)
}

pub fn back_in_stock_body(product: &ProductEntity) -> String {
    format!(
        "Good news!\n\n{} is back in stock.\nAvailable quantity: {}\n\nOpen the app to order now.",
        product.name, product.quantity
    )
}

/// Mails waiting subscribers when a product goes from none to some stock.
/// Sends are independent: a rejected address is logged and stays pending.
/// Returns how many subscribers were notified.
pub async fn on_quantity_changed(
    store: &dyn Store,
    mailer: &dyn Mailer,
    product: &ProductEntity,
    old_quantity: i32,
) -> Result<usize, AppError> {
    if !(old_quantity <= 0 && product.quantity > 0) {
        return Ok(0);
    }

    let mut tx = store.begin().await?;
    let pending = tx.pending_subscriptions(product.id).await;
    let pending = finish(tx, pending.map_err(AppError::from)).await?;
    if pending.is_empty() {
        return Ok(0);
    }

    let subject = back_in_stock_subject(product);
    let body = back_in_stock_body(product);
    let sends: Vec<BoxFuture<'_, (StockSubscriptionEntity, Result<(), MailError>)>> = pending
        .iter()
        .cloned()
        .map(|subscription| {
            let (subject, body) = (subject.clone(), body.clone());
            async move {
                let sent = mailer
                    .send(std::slice::from_ref(&subscription.email), &subject, &body)
                    .await;
                (subscription, sent)
            }
            .boxed()
        })
        .collect();
    let outcomes: Vec<_> = stream::iter(sends)
        .buffered(MAIL_CONCURRENCY)
        .collect()
        .await;

    let mut notified = Vec::with_capacity(pending.len());
    for (subscription, sent) in outcomes {
        match sent {
            Ok(()) => notified.push(subscription.id),
            Err(err) => tracing::warn!(
                product_id = product.id,
                email = %subscription.email,
                error = %err,
                "Back-in-stock mail failed"
            ),
        }
    }

    if !notified.is_empty() {
        let mut tx = store.begin().await?;
        let marked = tx.set_subscriptions_notified(&notified, true).await;
        finish(tx, marked.map_err(AppError::from)).await?;
    }

    tracing::info!(
        product_id = product.id,
        notified = notified.len(),
        pending = pending.len(),
        "Back-in-stock notifications dispatched"
    );
    Ok(notified.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        store::{MemoryStore, StoreTx},
        test_utils::{RecordingMailer, seed_category, seed_product},
    };

    async fn restock(store: &MemoryStore, product: &ProductEntity, quantity: i32) -> ProductEntity {
        let mut tx = store.begin().await.unwrap();
        let updated = tx.decrement_stock(product.id, -quantity).await.unwrap().unwrap();
        tx.commit().await.unwrap();
        updated
    }

    async fn subscriptions(store: &MemoryStore, product_id: i32) -> Vec<StockSubscriptionEntity> {
        let mut tx: Box<dyn StoreTx> = store.begin().await.unwrap();
        let mut rows = Vec::new();
        for email in ["a@pharma.test", "b@pharma.test", "c@pharma.test"] {
            if let Some(row) = tx.find_subscription(product_id, email).await.unwrap() {
                rows.push(row);
            }
        }
        rows
    }

    #[tokio::test]
    async fn subscribing_twice_keeps_one_pending_row() {
        let store = MemoryStore::new();
        let category = seed_category(&store, "Allergy").await.unwrap();
        let product = seed_product(&store, category.id, "Loratadine", 0, 3.0).await.unwrap();

        let first = subscribe(&store, product.id, "a@pharma.test").await.unwrap();
        let mut tx = store.begin().await.unwrap();
        tx.set_subscriptions_notified(&[first.id], true).await.unwrap();
        tx.commit().await.unwrap();

        let second = subscribe(&store, product.id, " a@pharma.test ").await.unwrap();
        assert_eq!(second.id, first.id);
        assert!(!second.notified);

        let rows = subscriptions(&store, product.id).await;
        assert_eq!(rows.len(), 1);
        assert!(!rows[0].notified);
    }

    #[tokio::test]
    async fn subscribe_validates_input() {
        let store = MemoryStore::new();
        assert!(matches!(
            subscribe(&store, 1, "not-an-email").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            subscribe(&store, 1, "a@pharma.test").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn restock_notifies_each_pending_subscriber_once() {
        let store = MemoryStore::new();
        let mailer = RecordingMailer::new();
        let category = seed_category(&store, "Allergy").await.unwrap();
        let product = seed_product(&store, category.id, "Loratadine", 0, 3.0).await.unwrap();
        subscribe(&store, product.id, "a@pharma.test").await.unwrap();
        subscribe(&store, product.id, "b@pharma.test").await.unwrap();

        let restocked = restock(&store, &product, 7).await;
        let sent = on_quantity_changed(&store, mailer.as_ref(), &restocked, 0)
            .await
            .unwrap();
        assert_eq!(sent, 2);

        let mails = mailer.sent();
        assert_eq!(mails.len(), 2);
        assert_eq!(mails[0].recipients, vec!["a@pharma.test"]);
        assert_eq!(mails[0].subject, "Back in stock: Loratadine");
        assert!(mails[0].body.contains("Available quantity: 7"));
        assert!(subscriptions(&store, product.id).await.iter().all(|s| s.notified));

        // A second restock event finds nobody pending.
        let sent = on_quantity_changed(&store, mailer.as_ref(), &restocked, 0)
            .await
            .unwrap();
        assert_eq!(sent, 0);
        assert_eq!(mailer.sent().len(), 2);
    }

    #[tokio::test]
    async fn only_a_zero_to_positive_transition_notifies() {
        let store = MemoryStore::new();
        let mailer = RecordingMailer::new();
        let category = seed_category(&store, "Allergy").await.unwrap();
        let product = seed_product(&store, category.id, "Fexofenadine", 4, 3.0).await.unwrap();
        subscribe(&store, product.id, "a@pharma.test").await.unwrap();

        // 4 -> 9: was already in stock.
        let more = restock(&store, &product, 5).await;
        assert_eq!(on_quantity_changed(&store, mailer.as_ref(), &more, 4).await.unwrap(), 0);

        // -2 -> 0: still out of stock.
        let still_out = ProductEntity {
            quantity: 0,
            ..more.clone()
        };
        assert_eq!(
            on_quantity_changed(&store, mailer.as_ref(), &still_out, -2).await.unwrap(),
            0
        );
        assert!(mailer.sent().is_empty());

        // 5 -> 0: selling out never notifies.
        let sold_out = ProductEntity {
            quantity: 0,
            ..more.clone()
        };
        assert_eq!(on_quantity_changed(&store, mailer.as_ref(), &sold_out, 5).await.unwrap(), 0);
        assert!(mailer.sent().is_empty());

        // -2 -> 3 counts as back in stock.
        let back = ProductEntity { quantity: 3, ..more };
        assert_eq!(on_quantity_changed(&store, mailer.as_ref(), &back, -2).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn failed_sends_stay_pending() {
        let store = MemoryStore::new();
        let mailer = RecordingMailer::new();
        let category = seed_category(&store, "Allergy").await.unwrap();
        let product = seed_product(&store, category.id, "Desloratadine", 0, 3.0).await.unwrap();
        subscribe(&store, product.id, "a@pharma.test").await.unwrap();
        subscribe(&store, product.id, "b@pharma.test").await.unwrap();
        mailer.fail_for("b@pharma.test");

        let restocked = restock(&store, &product, 2).await;
        let sent = on_quantity_changed(&store, mailer.as_ref(), &restocked, 0)
            .await
            .unwrap();
        assert_eq!(sent, 1);

        let rows = subscriptions(&store, product.id).await;
        let by_email = |email: &str| rows.iter().find(|s| s.email == email).unwrap().notified;
        assert!(by_email("a@pharma.test"));
        assert!(!by_email("b@pharma.test"));
    }
}
