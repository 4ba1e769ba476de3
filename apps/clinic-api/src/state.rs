//! Shared handler state

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use clinic_core::{BillingPolicy, WorkingHours};
use sqlx::SqlitePool;

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub billing: BillingPolicy,
    pub hours: WorkingHours,
    pub clinic_name: Arc<str>,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: &AppConfig) -> Self {
        Self {
            pool,
            billing: config.billing,
            hours: WorkingHours::default(),
            clinic_name: Arc::from(config.clinic_name.as_str()),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}
