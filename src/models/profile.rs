use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub email: String,
    pub password: String, // Always hashed
    pub full_name: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(serialize_with = "crate::db::mongo::stored_time::serialize_option")]
    pub last_signin: Option<DateTime<Utc>>,
    pub failed_signins: Option<i32>,
    #[serde(serialize_with = "crate::db::mongo::stored_time::serialize_option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(serialize_with = "crate::db::mongo::stored_time::serialize_option")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SignUpInput {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SignInInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RoleUpdate {
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileView {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<Profile> for ProfileView {
    fn from(profile: Profile) -> Self {
        Self {
            id: profile.id.map(|id| id.to_hex()).unwrap_or_default(),
            email: profile.email,
            full_name: profile.full_name,
            phone: profile.phone,
            role: profile.role,
            created_at: profile.created_at,
        }
    }
}

/// Session value returned by sign-in/sign-up. Sign-out returns one with no token.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub auth_token: Option<String>,
    pub profile: Option<ProfileView>,
}
