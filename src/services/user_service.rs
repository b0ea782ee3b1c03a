use std::time::Duration;

use async_trait::async_trait;
use mongodb::{
    bson::{doc, oid::ObjectId},
    options::FindOneOptions,
    Collection, Database,
};

use crate::{error::StoreError, models::UserContact};

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn contact(&self, user_id: ObjectId) -> Result<Option<UserContact>, StoreError>;
}

#[derive(Clone)]
pub struct MongoUserDirectory {
    users: Collection<UserContact>,
    deadline: Duration,
}

impl MongoUserDirectory {
    pub fn new(db: &Database, deadline: Duration) -> Self {
        Self {
            users: db.collection::<UserContact>("users"),
            deadline,
        }
    }
}

#[async_trait]
impl UserDirectory for MongoUserDirectory {
    async fn contact(&self, user_id: ObjectId) -> Result<Option<UserContact>, StoreError> {
        let opts = FindOneOptions::builder()
            .projection(doc! { "email": 1, "username": 1 })
            .build();

        match tokio::time::timeout(
            self.deadline,
            self.users.find_one(doc! { "_id": user_id }, opts),
        )
        .await
        {
            Ok(res) => res.map_err(StoreError::from),
            Err(_) => Err(StoreError::Timeout(self.deadline.as_millis())),
        }
    }
}
