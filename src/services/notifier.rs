use std::sync::Arc;

use chrono::{TimeZone, Utc};
use mongodb::bson::oid::ObjectId;
use serde_json::json;

use crate::{
    error::NotifyError,
    models::{Alert, AlertClass, NotificationMethod},
    services::{mailer::Mailer, user_service::UserDirectory},
    templates::{self, Hbs},
};

#[derive(Debug, Clone, Copy)]
pub struct FireContext {
    pub now: i64,
    pub observed: Option<f64>,
}

#[derive(Clone)]
pub struct Notifier {
    users: Arc<dyn UserDirectory>,
    mailer: Arc<dyn Mailer>,
    hbs: Hbs,
}

impl Notifier {
    pub fn new(users: Arc<dyn UserDirectory>, mailer: Arc<dyn Mailer>, hbs: Hbs) -> Self {
        Self { users, mailer, hbs }
    }

    pub async fn notify(&self, alert: &Alert, fire: FireContext) -> Result<(), NotifyError> {
        if alert.notification_method != NotificationMethod::Email {
            return Err(NotifyError::UnsupportedMethod(format!(
                "{:?}",
                alert.notification_method
            )));
        }

        let user_id = ObjectId::parse_str(alert.user_id.trim())
            .map_err(|_| NotifyError::InvalidUserId(alert.user_id.clone()))?;

        let contact = self
            .users
            .contact(user_id)
            .await?
            .ok_or_else(|| NotifyError::UserNotFound(alert.user_id.clone()))?;

        let subject = subject_for(alert);
        let body = self.render_body(alert, fire, contact.display_name())?;

        self.mailer.send(&contact.email, &subject, &body).await
    }

    fn render_body(&self, alert: &Alert, fire: FireContext, name: &str) -> Result<String, NotifyError> {
        let fired_at = Utc
            .timestamp_opt(fire.now, 0)
            .single()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| fire.now.to_string());

        let repeat = if alert.max_repeat_count > 0 {
            format!("{} of {}", alert.repeat_count + 1, alert.max_repeat_count)
        } else {
            format!("#{}", alert.repeat_count + 1)
        };

        let ctx = json!({
            "name": name,
            "symbol": alert.symbol,
            "alert_class": alert.alert_class.as_str(),
            "has_condition": alert.alert_class.is_price(),
            "condition": alert.condition.as_str(),
            "threshold": alert.threshold,
            "observed": fire.observed.map(|v| v.to_string()),
            "snooze": alert.snooze_condition.as_str(),
            "fired_at": fired_at,
            "repeat": repeat,
            "message": alert.message,
        });

        Ok(self.hbs.render(templates::ALERT_FIRED, &ctx)?)
    }
}

pub fn subject_for(alert: &Alert) -> String {
    let what = match alert.alert_class {
        AlertClass::Spot => "spot price",
        AlertClass::Future => "futures price",
        AlertClass::FundingRate => "funding rate",
        AlertClass::NewListing => "new listing",
        AlertClass::Delisting => "delisting",
        AlertClass::Unknown => "market",
    };
    format!("[Crypto Alert] {} {} alert triggered", alert.symbol, what)
}
