pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod templates;

pub mod controllers;
pub mod routes;

use std::sync::Arc;

use services::scheduler::AlertScheduler;

#[derive(Clone)]
pub struct AppState {
    pub db: mongodb::Database,
    pub settings: config::Settings,
    pub scheduler: Arc<AlertScheduler>,
}
