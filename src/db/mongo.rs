use log::{info, warn};
use mongodb::{
    bson::doc,
    options::{ClientOptions, ServerApi, ServerApiVersion},
    Client, Collection,
};
use serde::{de::DeserializeOwned, Serialize};
use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;

pub const TOURS: &str = "tours";
pub const BOOKINGS: &str = "bookings";
pub const PROFILES: &str = "profiles";
pub const CHATS: &str = "chats";
pub const CONTACT_MESSAGES: &str = "contact_messages";

pub async fn create_mongo_client(uri: &str) -> Result<Arc<Client>, mongodb::error::Error> {
    info!("Connecting to MongoDB");

    let mut client_options = ClientOptions::parse(uri).await?;

    client_options.app_name = Some("tour-booking-api".to_string());
    client_options.connect_timeout = Some(Duration::from_secs(10));
    client_options.server_selection_timeout = Some(Duration::from_secs(10));
    client_options.max_pool_size = Some(10);
    client_options.min_pool_size = Some(1);

    let server_api = ServerApi::builder().version(ServerApiVersion::V1).build();
    client_options.server_api = Some(server_api);

    let client = Client::with_options(client_options)?;

    // A failed ping is not fatal; handlers report store errors per request.
    match client.database("admin").run_command(doc! {"ping": 1}).await {
        Ok(_) => info!("Connected to MongoDB and verified with ping"),
        Err(e) => warn!("Connected to MongoDB but ping failed: {}", e),
    }

    Ok(Arc::new(client))
}

pub fn collection<T>(client: &Client, config: &AppConfig, name: &str) -> Collection<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    client.database(&config.database).collection(name)
}

/// Unique email index on profiles; duplicate sign-ups then surface as write error 11000.
pub async fn ensure_indexes(client: &Client, config: &AppConfig) -> Result<(), mongodb::error::Error> {
    use mongodb::{options::IndexOptions, IndexModel};

    let profiles: Collection<mongodb::bson::Document> = collection(client, config, PROFILES);
    let unique_email = IndexModel::builder()
        .keys(doc! { "email": 1 })
        .options(IndexOptions::builder().unique(true).build())
        .build();
    profiles.create_index(unique_email).await?;

    let bookings: Collection<mongodb::bson::Document> = collection(client, config, BOOKINGS);
    bookings
        .create_index(IndexModel::builder().keys(doc! { "user_id": 1, "created_at": -1 }).build())
        .await?;

    let chats: Collection<mongodb::bson::Document> = collection(client, config, CHATS);
    chats
        .create_index(IndexModel::builder().keys(doc! { "user_id": 1, "timestamp": -1 }).build())
        .await?;

    Ok(())
}

pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteError, WriteFailure};

    matches!(
        *err.kind,
        ErrorKind::Write(WriteFailure::WriteError(WriteError { code: 11000, .. }))
    )
}

/// Stored timestamps are fixed-width RFC 3339 strings (nanoseconds, `Z`), so string
/// order in sorts and `$set` updates agrees with time order.
pub fn stored_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn timestamp_now() -> String {
    stored_timestamp(&Utc::now())
}

/// `serialize_with` helpers for timestamp fields of stored documents.
pub mod stored_time {
    use chrono::{DateTime, Utc};
    use serde::Serializer;

    pub fn serialize<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::stored_timestamp(at))
    }

    pub fn serialize_option<S: Serializer>(
        at: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match at {
            Some(at) => serializer.serialize_str(&super::stored_timestamp(at)),
            None => serializer.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_stored_timestamps_sort_like_time() {
        let whole = Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap();
        let later = whole + chrono::Duration::milliseconds(500);

        let a = stored_timestamp(&whole);
        let b = stored_timestamp(&later);
        assert_eq!(a.len(), b.len());
        assert!(a < b);
        assert_eq!(a, "2026-10-18T09:30:00.000000000Z");
    }

    #[test]
    fn test_stored_time_serializer_is_fixed_width() {
        #[derive(Serialize)]
        struct Row {
            #[serde(serialize_with = "stored_time::serialize")]
            at: DateTime<Utc>,
            #[serde(serialize_with = "stored_time::serialize_option")]
            maybe: Option<DateTime<Utc>>,
        }

        let at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let json = serde_json::to_value(Row { at, maybe: None }).unwrap();
        assert_eq!(json["at"], "2026-01-02T03:04:05.000000000Z");
        assert!(json["maybe"].is_null());
    }
}
