use std::sync::Arc;

use crate::{
    config::Config,
    jobs::{ExpiryAlertJob, LowStockAlertJob},
    notify::Mailer,
    store::Store,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub mailer: Arc<dyn Mailer>,
    pub config: Arc<Config>,
    pub low_stock_job: Arc<LowStockAlertJob>,
    pub expiry_job: Arc<ExpiryAlertJob>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, mailer: Arc<dyn Mailer>, config: Config) -> Self {
        let low_stock_job = Arc::new(LowStockAlertJob::new(
            store.clone(),
            mailer.clone(),
            config.stock.clone(),
        ));
        let expiry_job = Arc::new(ExpiryAlertJob::new(
            store.clone(),
            mailer.clone(),
            config.expiry.clone(),
        ));
        Self {
            store,
            mailer,
            config: Arc::new(config),
            low_stock_job,
            expiry_job,
        }
    }
}
