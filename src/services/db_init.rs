use mongodb::{
    bson::doc,
    options::IndexOptions,
    Database, IndexModel,
};

use crate::error::StoreError;

pub async fn ensure_indexes(db: &Database) -> Result<(), StoreError> {
    // alerts: the trigger loop scans isActive == true every tick
    {
        let col = db.collection::<mongodb::bson::Document>("alerts");
        let model = IndexModel::builder()
            .keys(doc! { "isActive": 1 })
            .build();

        col.create_index(model, None).await?;
    }

    // alerts: owner lookups from the alert API
    {
        let col = db.collection::<mongodb::bson::Document>("alerts");
        let model = IndexModel::builder()
            .keys(doc! { "userId": 1, "createdAt": -1 })
            .build();

        col.create_index(model, None).await?;
    }

    // users: unique email
    {
        let col = db.collection::<mongodb::bson::Document>("users");
        let model = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        // an existing duplicate must not block the trigger loop from booting
        if let Err(e) = col.create_index(model, None).await {
            tracing::warn!(error = %e, "could not ensure unique users.email index");
        }
    }

    Ok(())
}
