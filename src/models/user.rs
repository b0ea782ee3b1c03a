use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

// projection of a `users` document: what delivery needs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserContact {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub email: String,

    #[serde(default)]
    pub username: Option<String>,
}

impl UserContact {
    pub fn display_name(&self) -> &str {
        self.username
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or(&self.email)
    }
}
