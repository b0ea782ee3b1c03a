#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use crypto_alerts::{
    config::SchedulerSettings,
    error::{MarketDataError, NotifyError, StoreError},
    models::{Alert, AlertClass, SnoozeCondition, UserContact},
    services::{
        alert_monitor::{AlertMonitor, TickReport},
        alerts_service::MemoryAlertStore,
        mailer::Mailer,
        market_data::{MarketData, SymbolChanges},
        notifier::Notifier,
        user_service::UserDirectory,
    },
    templates,
};
use mongodb::bson::oid::ObjectId;
use tokio::sync::watch;

pub const T0: i64 = 1_700_000_000;

#[derive(Default)]
pub struct FakeMarket {
    prices: Mutex<HashMap<(AlertClass, String), f64>>,
    failing: Mutex<HashSet<String>>,
    changes: Mutex<SymbolChanges>,
    listing_fails: AtomicBool,
    delay: Mutex<Option<Duration>>,
    pub price_calls: AtomicUsize,
    pub listing_calls: AtomicUsize,
}

impl FakeMarket {
    pub fn set_price(&self, class: AlertClass, symbol: &str, value: f64) {
        self.prices
            .lock()
            .unwrap()
            .insert((class, symbol.to_string()), value);
    }

    pub fn fail(&self, symbol: &str) {
        self.failing.lock().unwrap().insert(symbol.to_string());
    }

    pub fn add_new_symbol(&self, symbol: &str) {
        self.changes.lock().unwrap().new.insert(symbol.to_string());
    }

    pub fn add_delisted_symbol(&self, symbol: &str) {
        self.changes.lock().unwrap().delisted.insert(symbol.to_string());
    }

    pub fn fail_listings(&self) {
        self.listing_fails.store(true, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    async fn price(&self, class: AlertClass, symbol: &str) -> Result<f64, MarketDataError> {
        self.price_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }

        if self.failing.lock().unwrap().contains(symbol) {
            return Err(MarketDataError::Status {
                endpoint: "fake".to_string(),
                status: 503,
                body: "unavailable".to_string(),
            });
        }

        self.prices
            .lock()
            .unwrap()
            .get(&(class, symbol.to_string()))
            .copied()
            .ok_or_else(|| MarketDataError::Parse(format!("no price for {symbol}")))
    }
}

#[async_trait]
impl MarketData for FakeMarket {
    async fn spot_price(&self, symbol: &str) -> Result<f64, MarketDataError> {
        self.price(AlertClass::Spot, symbol).await
    }

    async fn future_price(&self, symbol: &str) -> Result<f64, MarketDataError> {
        self.price(AlertClass::Future, symbol).await
    }

    async fn funding_rate(&self, symbol: &str) -> Result<f64, MarketDataError> {
        self.price(AlertClass::FundingRate, symbol).await
    }

    async fn symbol_changes(&self) -> Result<SymbolChanges, MarketDataError> {
        self.listing_calls.fetch_add(1, Ordering::SeqCst);
        if self.listing_fails.load(Ordering::SeqCst) {
            return Err(MarketDataError::Parse("exchangeInfo down".to_string()));
        }
        Ok(self.changes.lock().unwrap().clone())
    }
}

#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<SentMail>>,
    failing: AtomicBool,
}

impl RecordingMailer {
    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<SentMail> {
        self.sent.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Smtp("connection refused".to_string()));
        }
        self.sent.lock().unwrap().push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: html_body.to_string(),
        });
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeUsers {
    users: Mutex<HashMap<ObjectId, UserContact>>,
}

impl FakeUsers {
    pub fn add(&self, email: &str, username: Option<&str>) -> ObjectId {
        let id = ObjectId::new();
        self.users.lock().unwrap().insert(
            id,
            UserContact {
                id,
                email: email.to_string(),
                username: username.map(str::to_string),
            },
        );
        id
    }
}

#[async_trait]
impl UserDirectory for FakeUsers {
    async fn contact(&self, user_id: ObjectId) -> Result<Option<UserContact>, StoreError> {
        Ok(self.users.lock().unwrap().get(&user_id).cloned())
    }
}

pub fn test_settings() -> SchedulerSettings {
    SchedulerSettings {
        tick_interval: Duration::from_millis(20),
        alert_concurrency: 4,
        alert_timeout: Duration::from_millis(500),
        store_timeout: Duration::from_millis(500),
        specific_time_tolerance_secs: 30,
    }
}

pub struct Harness {
    pub store: Arc<MemoryAlertStore>,
    pub market: Arc<FakeMarket>,
    pub mailer: Arc<RecordingMailer>,
    pub users: Arc<FakeUsers>,
    pub monitor: Arc<AlertMonitor>,
    pub user_id: ObjectId,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(test_settings())
    }

    pub fn with_settings(settings: SchedulerSettings) -> Self {
        let store = Arc::new(MemoryAlertStore::new());
        let market = Arc::new(FakeMarket::default());
        let mailer = Arc::new(RecordingMailer::default());
        let users = Arc::new(FakeUsers::default());
        let user_id = users.add("trader@example.com", Some("trader"));

        let notifier = Notifier::new(users.clone(), mailer.clone(), templates::build_handlebars());
        let monitor = Arc::new(AlertMonitor::new(
            store.clone(),
            market.clone(),
            notifier,
            settings,
        ));

        Self {
            store,
            market,
            mailer,
            users,
            monitor,
            user_id,
        }
    }

    /// A new alert owned by the harness user, created an hour before `T0`.
    pub fn alert(&self, symbol: &str, class: AlertClass, policy: SnoozeCondition) -> Alert {
        Alert::new(self.user_id.to_hex(), symbol, class, policy, T0 - 3_600)
    }

    pub async fn save(&self, alert: &Alert) {
        use crypto_alerts::services::alerts_service::AlertStore;
        self.store.upsert(alert).await.expect("save alert");
    }

    pub async fn tick(&self, now: i64) -> TickReport {
        let (_cancel, rx) = watch::channel(false);
        self.monitor.run_tick_at(now, &rx).await.expect("tick")
    }

    pub fn stored(&self, alert: &Alert) -> Alert {
        self.store.get(&alert.id).expect("alert in store")
    }
}
