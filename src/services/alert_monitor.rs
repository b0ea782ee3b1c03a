use std::sync::Arc;

use chrono::Utc;
use futures_util::{future, stream, StreamExt};
use tokio::{sync::watch, time};

use crate::{
    config::SchedulerSettings,
    error::{MarketDataError, NotifyError, StoreError},
    models::Alert,
    services::{
        alerts_service::{self, AlertStore},
        condition::{self, ListingSnapshot},
        market_data::MarketData,
        notifier::{FireContext, Notifier},
        snooze,
    },
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub loaded: usize,
    pub evaluated: usize,
    pub fired: usize,
    pub snoozed: usize,
    pub exhausted: usize,
    pub eval_failures: usize,
    pub notify_failures: usize,
    pub persist_failures: usize,
    // own data prevents delivery; left unchanged
    pub malformed: usize,
    // not started because the scheduler stopped mid-tick
    pub cancelled: usize,
}

#[derive(Debug)]
enum Outcome {
    Inactive,
    Exhausted { retired: bool },
    EvalFailed,
    NotMet,
    Snoozed,
    Malformed,
    Fired { notified: bool, persisted: bool },
}

pub struct AlertMonitor {
    store: Arc<dyn AlertStore>,
    market: Arc<dyn MarketData>,
    notifier: Notifier,
    settings: SchedulerSettings,
}

impl AlertMonitor {
    pub fn new(
        store: Arc<dyn AlertStore>,
        market: Arc<dyn MarketData>,
        notifier: Notifier,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            store,
            market,
            notifier,
            settings,
        }
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    // stops picking up new alerts once `cancel` flips to true
    pub async fn run_tick(&self, cancel: &watch::Receiver<bool>) -> Result<TickReport, StoreError> {
        self.run_tick_at(Utc::now().timestamp(), cancel).await
    }

    pub async fn run_tick_at(
        &self,
        now: i64,
        cancel: &watch::Receiver<bool>,
    ) -> Result<TickReport, StoreError> {
        let alerts = self.store.find_active().await?;

        let mut report = TickReport {
            loaded: alerts.len(),
            ..Default::default()
        };
        if alerts.is_empty() {
            return Ok(report);
        }

        let listings = ListingSnapshot::new();

        let outcomes: Vec<Outcome> = stream::iter(alerts)
            .take_while(|_| future::ready(!*cancel.borrow()))
            .map(|alert| self.process(alert, now, &listings))
            .buffer_unordered(self.settings.alert_concurrency.max(1))
            .collect()
            .await;

        report.cancelled = report.loaded - outcomes.len();

        for outcome in outcomes {
            match outcome {
                Outcome::Inactive => {}
                Outcome::Exhausted { retired } => {
                    report.exhausted += 1;
                    if !retired {
                        report.persist_failures += 1;
                    }
                }
                Outcome::EvalFailed => {
                    report.evaluated += 1;
                    report.eval_failures += 1;
                }
                Outcome::NotMet => report.evaluated += 1,
                Outcome::Snoozed => {
                    report.evaluated += 1;
                    report.snoozed += 1;
                }
                Outcome::Malformed => {
                    report.evaluated += 1;
                    report.malformed += 1;
                }
                Outcome::Fired { notified, persisted } => {
                    report.evaluated += 1;
                    report.fired += 1;
                    if !notified {
                        report.notify_failures += 1;
                    }
                    if !persisted {
                        report.persist_failures += 1;
                    }
                }
            }
        }

        Ok(report)
    }

    async fn process(&self, mut alert: Alert, now: i64, listings: &ListingSnapshot) -> Outcome {
        if !alert.is_active {
            return Outcome::Inactive;
        }

        if !snooze::has_capacity(&alert) {
            // full but still active: retire it so it stops being loaded
            alert.is_active = false;
            let retired = match self.store.upsert(&alert).await {
                Ok(()) => true,
                Err(e) => {
                    tracing::error!(alert_id = %alert.id, error = %e, "failed to retire exhausted alert");
                    false
                }
            };
            tracing::info!(alert_id = %alert.id, retired, "alert reached max repeat count");
            return Outcome::Exhausted { retired };
        }

        let evaluation = match time::timeout(
            self.settings.alert_timeout,
            condition::evaluate(&alert, self.market.as_ref(), listings),
        )
        .await
        .unwrap_or_else(|_| Err(MarketDataError::Timeout(self.settings.alert_timeout.as_millis())))
        {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(
                    alert_id = %alert.id,
                    symbol = %alert.symbol,
                    class = %alert.alert_class,
                    error = %e,
                    "market data unavailable, treating alert as not met"
                );
                return Outcome::EvalFailed;
            }
        };

        if !evaluation.met {
            return Outcome::NotMet;
        }

        let decision = snooze::decide(&alert, now, self.settings.specific_time_tolerance_secs);
        if !decision.is_fire() {
            tracing::debug!(alert_id = %alert.id, ?decision, "alert condition met but snoozed");
            return Outcome::Snoozed;
        }

        let fire = FireContext {
            now,
            observed: evaluation.observed,
        };

        let notified = match time::timeout(
            self.settings.alert_timeout,
            self.notifier.notify(&alert, fire),
        )
        .await
        .unwrap_or_else(|_| Err(NotifyError::Timeout(self.settings.alert_timeout.as_millis())))
        {
            Ok(()) => true,
            Err(e) if e.is_malformed_alert() => {
                tracing::error!(alert_id = %alert.id, error = %e, "skipping malformed alert");
                return Outcome::Malformed;
            }
            Err(e) => {
                tracing::warn!(alert_id = %alert.id, error = %e, "alert notification failed");
                false
            }
        };

        alerts_service::apply_fire(&mut alert, now);

        let persisted = match self.store.upsert(&alert).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(alert_id = %alert.id, error = %e, "failed to persist fired alert");
                false
            }
        };

        tracing::info!(
            alert_id = %alert.id,
            symbol = %alert.symbol,
            class = %alert.alert_class,
            repeat_count = alert.repeat_count,
            is_active = alert.is_active,
            notified,
            "alert fired"
        );

        Outcome::Fired { notified, persisted }
    }
}
