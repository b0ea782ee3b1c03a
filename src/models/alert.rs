use std::fmt;

use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

// unrecognized strings land in `Unknown`, which is never met
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AlertClass {
    #[serde(rename = "spot")]
    Spot,
    #[serde(rename = "future")]
    Future,
    #[serde(rename = "funding_rate")]
    FundingRate,
    #[serde(rename = "new_listing")]
    NewListing,
    #[serde(rename = "delisting")]
    Delisting,
    #[default]
    #[serde(other)]
    Unknown,
}

impl AlertClass {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertClass::Spot => "spot",
            AlertClass::Future => "future",
            AlertClass::FundingRate => "funding_rate",
            AlertClass::NewListing => "new_listing",
            AlertClass::Delisting => "delisting",
            AlertClass::Unknown => "unknown",
        }
    }

    pub fn is_price(self) -> bool {
        matches!(
            self,
            AlertClass::Spot | AlertClass::Future | AlertClass::FundingRate
        )
    }

    pub fn is_listing(self) -> bool {
        matches!(self, AlertClass::NewListing | AlertClass::Delisting)
    }
}

impl fmt::Display for AlertClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Condition {
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = ">=")]
    AtLeast,
    #[serde(rename = "<=")]
    AtMost,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Condition {
    pub fn as_str(self) -> &'static str {
        match self {
            Condition::Equal => "==",
            Condition::AtLeast => ">=",
            Condition::AtMost => "<=",
            Condition::Unknown => "?",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SnoozeCondition {
    #[serde(rename = "Only once")]
    OnlyOnce,
    #[serde(rename = "Once a day")]
    OnceADay,
    #[serde(rename = "Once per 10 seconds")]
    OncePer10Seconds,
    #[serde(rename = "Once per 5 minutes")]
    OncePer5Minutes,
    #[serde(rename = "At Specific Time")]
    AtSpecificTime,
    #[serde(rename = "Forever")]
    Forever,
    #[default]
    #[serde(other)]
    Unknown,
}

impl SnoozeCondition {
    pub fn cooldown_secs(self) -> Option<i64> {
        match self {
            SnoozeCondition::OnceADay => Some(24 * 60 * 60),
            SnoozeCondition::OncePer10Seconds => Some(10),
            SnoozeCondition::OncePer5Minutes => Some(5 * 60),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SnoozeCondition::OnlyOnce => "Only once",
            SnoozeCondition::OnceADay => "Once a day",
            SnoozeCondition::OncePer10Seconds => "Once per 10 seconds",
            SnoozeCondition::OncePer5Minutes => "Once per 5 minutes",
            SnoozeCondition::AtSpecificTime => "At Specific Time",
            SnoozeCondition::Forever => "Forever",
            SnoozeCondition::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SnoozeCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NotificationMethod {
    #[default]
    #[serde(rename = "email")]
    Email,
    #[serde(other)]
    Unsupported,
}

/// A user-defined market alert as stored in the `alerts` collection.
/// Timestamps are unix seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    // hex ObjectId of the owning user
    pub user_id: String,
    pub symbol: String,

    #[serde(default)]
    pub alert_class: AlertClass,
    #[serde(default)]
    pub condition: Condition,
    #[serde(default)]
    pub threshold: f64,

    pub is_active: bool,

    #[serde(default)]
    pub notification_method: NotificationMethod,
    #[serde(default)]
    pub snooze_condition: SnoozeCondition,

    // 0 = unlimited
    #[serde(default)]
    pub max_repeat_count: i64,
    #[serde(default)]
    pub repeat_count: i64,
    #[serde(default)]
    pub next_trigger_time: Option<i64>,

    pub created_at: i64,
    // doubles as "last fired at"
    pub updated_at: i64,

    #[serde(default)]
    pub message: String,
}

impl Alert {
    pub fn new(
        user_id: impl Into<String>,
        symbol: impl Into<String>,
        alert_class: AlertClass,
        snooze_condition: SnoozeCondition,
        now: i64,
    ) -> Self {
        let symbol: String = symbol.into();
        Self {
            id: ObjectId::new(),
            user_id: user_id.into(),
            symbol: symbol.to_uppercase(),
            alert_class,
            condition: Condition::Unknown,
            threshold: 0.0,
            is_active: true,
            notification_method: NotificationMethod::Email,
            snooze_condition,
            max_repeat_count: 0,
            repeat_count: 0,
            next_trigger_time: None,
            created_at: now,
            updated_at: now,
            message: String::new(),
        }
    }

    pub fn with_price_condition(mut self, condition: Condition, threshold: f64) -> Self {
        self.condition = condition;
        self.threshold = threshold;
        self
    }

    pub fn with_max_repeat_count(mut self, max: i64) -> Self {
        self.max_repeat_count = max;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn last_fired_at(&self) -> Option<i64> {
        (self.repeat_count > 0).then_some(self.updated_at)
    }
}
