use chrono::{DateTime, NaiveDate, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    /// Lifecycle `pending -> confirmed -> completed`, with `pending|confirmed -> cancelled`.
    ///
    /// Admin status updates do not consult this; they overwrite the field (last write wins).
    /// Customer cancellation does.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Pending, BookingStatus::Confirmed)
                | (BookingStatus::Confirmed, BookingStatus::Completed)
                | (BookingStatus::Pending, BookingStatus::Cancelled)
                | (BookingStatus::Confirmed, BookingStatus::Cancelled)
        )
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Booking {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub tour_id: ObjectId,
    pub booking_date: NaiveDate,
    pub number_of_people: u32,
    pub total_price: f64,
    pub status: BookingStatus,
    pub special_requests: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    #[serde(serialize_with = "crate::db::mongo::stored_time::serialize")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "crate::db::mongo::stored_time::serialize_option")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Headcount as typed into a form: clients send either a number or the raw text.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum HeadcountInput {
    Number(i64),
    Text(String),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BookingInput {
    pub tour_id: String,
    pub booking_date: NaiveDate,
    pub number_of_people: HeadcountInput,
    pub special_requests: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct StatusUpdate {
    pub status: BookingStatus,
}

#[derive(Debug, Deserialize)]
pub struct BookingQuery {
    pub status: Option<BookingStatus>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BookingView {
    pub id: String,
    pub user_id: String,
    pub tour_id: String,
    pub tour_title: Option<String>,
    pub booking_date: NaiveDate,
    pub number_of_people: u32,
    pub total_price: f64,
    pub status: BookingStatus,
    pub special_requests: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl BookingView {
    pub fn new(booking: Booking, tour_title: Option<String>) -> Self {
        Self {
            id: booking.id.map(|id| id.to_hex()).unwrap_or_default(),
            user_id: booking.user_id.to_hex(),
            tour_id: booking.tour_id.to_hex(),
            tour_title,
            booking_date: booking.booking_date,
            number_of_people: booking.number_of_people,
            total_price: booking.total_price,
            status: booking.status,
            special_requests: booking.special_requests,
            contact_phone: booking.contact_phone,
            contact_email: booking.contact_email,
            created_at: booking.created_at,
        }
    }
}
