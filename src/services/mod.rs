pub mod db_init;
pub mod market_data;

pub mod alerts_service;
pub mod user_service;
pub mod mailer;

pub mod condition;
pub mod snooze;
pub mod notifier;
pub mod alert_monitor;
pub mod scheduler;
