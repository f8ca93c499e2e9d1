use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContactMessage {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: Option<ObjectId>,
    pub full_name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    #[serde(serialize_with = "crate::db::mongo::stored_time::serialize")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ContactInput {
    pub full_name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContactView {
    pub id: String,
    pub user_id: Option<String>,
    pub full_name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl From<ContactMessage> for ContactView {
    fn from(msg: ContactMessage) -> Self {
        Self {
            id: msg.id.map(|id| id.to_hex()).unwrap_or_default(),
            user_id: msg.user_id.map(|id| id.to_hex()),
            full_name: msg.full_name,
            email: msg.email,
            subject: msg.subject,
            message: msg.message,
            created_at: msg.created_at,
        }
    }
}
