use std::{
    collections::HashMap,
    future::Future,
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;
use futures_util::StreamExt;
use mongodb::{
    bson::{self, doc, oid::ObjectId, Document},
    error::{ErrorKind, WriteFailure},
    Collection, Database,
};

use crate::{error::StoreError, models::Alert};

const ALERTS: &str = "alerts";

#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn find_active(&self) -> Result<Vec<Alert>, StoreError>;

    /// Writes the engine-owned fields of a still-active alert, or inserts the
    /// alert when its id is unknown. An alert retired by someone else in the
    /// meantime is left as it is.
    async fn upsert(&self, alert: &Alert) -> Result<(), StoreError>;
}

pub fn apply_fire(alert: &mut Alert, now: i64) {
    use crate::models::SnoozeCondition;

    alert.repeat_count = alert.repeat_count.saturating_add(1);

    if alert.max_repeat_count > 0 && alert.repeat_count >= alert.max_repeat_count {
        alert.is_active = false;
    }

    match alert.snooze_condition {
        SnoozeCondition::OnlyOnce | SnoozeCondition::AtSpecificTime => alert.is_active = false,
        policy => {
            if let Some(secs) = policy.cooldown_secs() {
                alert.next_trigger_time = Some(now.saturating_add(secs));
            }
        }
    }

    alert.updated_at = alert.updated_at.max(now);
}

// fields the engine owns; everything else belongs to the alert API
fn engine_state(alert: &Alert) -> Document {
    doc! {
        "repeatCount": alert.repeat_count,
        "isActive": alert.is_active,
        "nextTriggerTime": alert.next_trigger_time,
        "updatedAt": alert.updated_at,
    }
}

#[derive(Clone)]
pub struct MongoAlertStore {
    docs: Collection<Document>,
    alerts: Collection<Alert>,
    deadline: Duration,
}

impl MongoAlertStore {
    pub fn new(db: &Database, deadline: Duration) -> Self {
        Self {
            docs: db.collection::<Document>(ALERTS),
            alerts: db.collection::<Alert>(ALERTS),
            deadline,
        }
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, mongodb::error::Error>>,
    {
        match tokio::time::timeout(self.deadline, fut).await {
            Ok(res) => res.map_err(StoreError::from),
            Err(_) => Err(StoreError::Timeout(self.deadline.as_millis())),
        }
    }
}

#[async_trait]
impl AlertStore for MongoAlertStore {
    async fn find_active(&self) -> Result<Vec<Alert>, StoreError> {
        let mut cursor = self
            .bounded(self.docs.find(doc! { "isActive": true }, None))
            .await?;

        let mut items = Vec::new();
        loop {
            let next = match tokio::time::timeout(self.deadline, cursor.next()).await {
                Ok(next) => next,
                Err(_) => return Err(StoreError::Timeout(self.deadline.as_millis())),
            };
            let Some(res) = next else { break };
            let raw = res?;

            // one bad document must not hide the others
            match bson::from_document::<Alert>(raw.clone()) {
                Ok(alert) => items.push(alert),
                Err(e) => {
                    tracing::warn!(
                        id = ?raw.get("_id"),
                        error = %e,
                        "skipping malformed alert document"
                    );
                }
            }
        }

        Ok(items)
    }

    async fn upsert(&self, alert: &Alert) -> Result<(), StoreError> {
        let res = self
            .bounded(self.docs.update_one(
                doc! { "_id": alert.id, "isActive": true },
                doc! { "$set": engine_state(alert) },
                None,
            ))
            .await?;

        if res.matched_count > 0 {
            return Ok(());
        }

        match tokio::time::timeout(self.deadline, self.alerts.insert_one(alert, None)).await {
            Ok(Ok(_)) => Ok(()),
            // the id exists but is no longer active: retired concurrently
            Ok(Err(e)) if is_duplicate_key(&e) => {
                tracing::debug!(alert_id = %alert.id, "alert retired before write, skipping");
                Ok(())
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(StoreError::Timeout(self.deadline.as_millis())),
        }
    }
}

fn is_duplicate_key(e: &mongodb::error::Error) -> bool {
    matches!(
        e.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(we)) if we.code == 11000
    )
}

// same upsert semantics as MongoAlertStore
#[derive(Default)]
pub struct MemoryAlertStore {
    alerts: Mutex<HashMap<ObjectId, Alert>>,
}

impl MemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_alerts(alerts: impl IntoIterator<Item = Alert>) -> Self {
        let store = Self::new();
        if let Ok(mut map) = store.alerts.lock() {
            map.extend(alerts.into_iter().map(|a| (a.id, a)));
        }
        store
    }

    pub fn get(&self, id: &ObjectId) -> Option<Alert> {
        self.alerts.lock().ok()?.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.alerts.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AlertStore for MemoryAlertStore {
    async fn find_active(&self) -> Result<Vec<Alert>, StoreError> {
        let map = self.alerts.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(map.values().filter(|a| a.is_active).cloned().collect())
    }

    async fn upsert(&self, alert: &Alert) -> Result<(), StoreError> {
        let mut map = self.alerts.lock().map_err(|_| StoreError::Poisoned)?;
        match map.get_mut(&alert.id) {
            Some(existing) if !existing.is_active => {}
            Some(existing) => {
                existing.repeat_count = alert.repeat_count;
                existing.is_active = alert.is_active;
                existing.next_trigger_time = alert.next_trigger_time;
                existing.updated_at = alert.updated_at;
            }
            None => {
                map.insert(alert.id, alert.clone());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlertClass, SnoozeCondition};

    fn alert(policy: SnoozeCondition) -> Alert {
        Alert::new("u1", "BTCUSDT", AlertClass::Spot, policy, 1_000)
    }

    #[test]
    fn only_once_retires_after_first_fire() {
        let mut a = alert(SnoozeCondition::OnlyOnce);
        apply_fire(&mut a, 2_000);
        assert_eq!(a.repeat_count, 1);
        assert!(!a.is_active);
        assert_eq!(a.updated_at, 2_000);
    }

    #[test]
    fn cooldown_policies_advance_next_trigger_time() {
        let mut a = alert(SnoozeCondition::OncePer5Minutes);
        apply_fire(&mut a, 2_000);
        assert!(a.is_active);
        assert_eq!(a.next_trigger_time, Some(2_300));

        let mut d = alert(SnoozeCondition::OnceADay);
        apply_fire(&mut d, 2_000);
        assert_eq!(d.next_trigger_time, Some(2_000 + 86_400));
    }

    #[test]
    fn capacity_exhaustion_retires_forever_alert() {
        let mut a = alert(SnoozeCondition::Forever).with_max_repeat_count(2);
        apply_fire(&mut a, 2_000);
        assert!(a.is_active);
        apply_fire(&mut a, 2_001);
        assert_eq!(a.repeat_count, 2);
        assert!(!a.is_active);
    }

    #[test]
    fn updated_at_never_moves_backwards() {
        let mut a = alert(SnoozeCondition::Forever);
        a.updated_at = 5_000;
        apply_fire(&mut a, 4_000);
        assert_eq!(a.updated_at, 5_000);
    }

    #[test]
    fn fire_at_saturated_counters_does_not_overflow() {
        let mut a = alert(SnoozeCondition::OncePer10Seconds);
        a.repeat_count = i64::MAX;
        apply_fire(&mut a, i64::MAX - 1);
        assert_eq!(a.repeat_count, i64::MAX);
        assert_eq!(a.next_trigger_time, Some(i64::MAX));
    }

    #[tokio::test]
    async fn upsert_leaves_retired_alert_alone() {
        let mut retired = alert(SnoozeCondition::Forever);
        retired.is_active = false;
        let store = MemoryAlertStore::with_alerts([retired.clone()]);

        let mut stale = retired.clone();
        stale.is_active = true;
        apply_fire(&mut stale, 2_000);
        store.upsert(&stale).await.unwrap();

        assert_eq!(store.get(&retired.id), Some(retired));
    }

    #[test]
    fn specific_time_is_one_shot() {
        let mut a = alert(SnoozeCondition::AtSpecificTime);
        a.next_trigger_time = Some(2_000);
        apply_fire(&mut a, 2_000);
        assert!(!a.is_active);
    }
}
